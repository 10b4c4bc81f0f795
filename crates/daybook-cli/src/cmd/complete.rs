use crate::output::print_json;
use anyhow::Context;
use chrono::{DateTime, Utc};
use daybook_core::progress::record_completion;
use daybook_core::schedule::DayResolver;
use daybook_core::types::ProgressStatus;
use std::path::Path;

pub fn run(
    root: &Path,
    user: &str,
    action: &str,
    status: &str,
    at: Option<DateTime<Utc>>,
    json: bool,
) -> anyhow::Result<()> {
    let (mut store, config) = super::open(root)?;
    let status: ProgressStatus = status.parse()?;
    let at = super::as_of(&config, at)?;
    let user_id = DayResolver::new(&store, &store, &config.schedule)
        .find_user(user)?
        .id;

    record_completion(&mut store, &user_id, action, status, at)
        .with_context(|| format!("failed to record progress for '{action}'"))?;

    if json {
        return print_json(&serde_json::json!({
            "user_id": user_id,
            "action_id": action,
            "status": status,
            "at": at,
        }));
    }
    println!("{user_id}: {action} -> {status}");
    Ok(())
}
