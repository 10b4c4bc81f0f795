use crate::output::{print_json, print_table};
use chrono::{DateTime, Utc};
use daybook_core::view::{Composer, Stores};
use std::path::Path;

pub fn run(root: &Path, user: &str, at: Option<DateTime<Utc>>, json: bool) -> anyhow::Result<()> {
    let (store, config) = super::open(root)?;
    let as_of = super::as_of(&config, at)?;
    let composer = Composer::new(Stores::uniform(&store), &config);
    let missed = composer.missed_days(user, as_of)?;
    let unlocked = composer.unlocked_content(user, as_of)?;

    if json {
        return print_json(&serde_json::json!({
            "missed_days": missed,
            "unlocked_content": unlocked,
        }));
    }

    if missed.is_empty() {
        println!("All caught up.");
    } else {
        let rows = missed
            .iter()
            .map(|m| {
                vec![
                    m.day_number.to_string(),
                    m.day_id.clone(),
                    m.week.map(|w| w.to_string()).unwrap_or_default(),
                    m.phase.clone(),
                    m.status.to_string(),
                ]
            })
            .collect();
        print_table(&["DAY", "DOCUMENT", "WEEK", "PHASE", "STATUS"], rows);
    }
    println!();
    println!("{} content item(s) unlocked", unlocked.len());
    Ok(())
}
