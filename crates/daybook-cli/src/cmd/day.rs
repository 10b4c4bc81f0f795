use crate::output::print_json;
use anyhow::Context;
use chrono::{DateTime, Utc};
use daybook_core::schedule::DayResolver;
use std::path::Path;

pub fn run(root: &Path, user: &str, at: Option<DateTime<Utc>>, json: bool) -> anyhow::Result<()> {
    let (store, config) = super::open(root)?;
    let as_of = super::as_of(&config, at)?;
    let resolver = DayResolver::new(&store, &store, &config.schedule);
    let found = resolver.find_user(user)?;
    let day = resolver
        .resolve_day(&found, as_of)
        .with_context(|| format!("failed to resolve day for '{user}'"))?;

    if json {
        let value = serde_json::json!({
            "user_id": day.user_id,
            "state": day.position.state,
            "calendar_day": day.position.calendar_day,
            "day_number": day.position.day_number,
            "day_id": day.entry.id,
            "phase": day.phase,
            "week": day.week,
            "as_of": as_of,
        });
        return print_json(&value);
    }

    println!("user:    {}", day.user_id);
    println!("state:   {}", day.position.state);
    println!("day:     {}", day.position.day_number);
    if let Some(cal) = day.position.calendar_day {
        if cal != day.position.day_number {
            println!("calendar day: {cal}");
        }
    }
    println!("document: {}", day.entry.id);
    println!("phase:   {}", day.phase);
    if let Some(week) = day.week {
        println!("week:    {week}");
    }
    Ok(())
}
