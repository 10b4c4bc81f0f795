use crate::output::print_json;
use anyhow::Context;
use chrono::{DateTime, Utc};
use daybook_core::config::Config;
use daybook_core::progress::{complete_day, toggle_day_item, BlockProgress};
use daybook_core::schedule::DayResolver;
use daybook_core::store::FileStore;
use std::path::Path;

/// Document id given on the command line, else the user's current day.
fn day_id_for(
    store: &FileStore,
    config: &Config,
    user_id: &str,
    day: Option<String>,
    as_of: DateTime<Utc>,
) -> anyhow::Result<String> {
    if let Some(day) = day {
        return Ok(day);
    }
    let resolver = DayResolver::new(store, store, &config.schedule);
    let user = resolver.find_user(user_id)?;
    let resolved = resolver
        .resolve_day(&user, as_of)
        .with_context(|| format!("failed to resolve current day for '{user_id}'"))?;
    Ok(resolved.entry.id)
}

fn report(user_id: &str, day_id: &str, block: &BlockProgress, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(&serde_json::json!({
            "user_id": user_id,
            "day_id": day_id,
            "progress": block,
        }));
    }
    let status = block
        .status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "open".to_string());
    println!(
        "{user_id}: {day_id} -> {status} ({} item(s) done)",
        block.items_completed.len()
    );
    Ok(())
}

pub fn run_day(
    root: &Path,
    user: &str,
    day: Option<String>,
    at: Option<DateTime<Utc>>,
    json: bool,
) -> anyhow::Result<()> {
    let (mut store, config) = super::open(root)?;
    let at = super::as_of(&config, at)?;
    let user_id = DayResolver::new(&store, &store, &config.schedule)
        .find_user(user)?
        .id;
    let day_id = day_id_for(&store, &config, &user_id, day, at)?;

    let block = complete_day(&mut store, &user_id, &day_id, at)
        .with_context(|| format!("failed to complete '{day_id}'"))?;
    report(&user_id, &day_id, &block, json)
}

pub fn run_item(
    root: &Path,
    user: &str,
    item: &str,
    day: Option<String>,
    undo: bool,
    at: Option<DateTime<Utc>>,
    json: bool,
) -> anyhow::Result<()> {
    let (mut store, config) = super::open(root)?;
    let at = super::as_of(&config, at)?;
    let user_id = DayResolver::new(&store, &store, &config.schedule)
        .find_user(user)?
        .id;
    let day_id = day_id_for(&store, &config, &user_id, day, at)?;

    let block = toggle_day_item(&mut store, &user_id, &day_id, item, !undo, at)
        .with_context(|| format!("failed to update '{item}' on '{day_id}'"))?;
    report(&user_id, &day_id, &block, json)
}
