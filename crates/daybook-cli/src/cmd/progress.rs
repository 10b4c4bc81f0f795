use crate::output::{print_json, print_table};
use daybook_core::progress::ProgressAggregator;
use daybook_core::schedule::DayResolver;
use std::path::Path;

pub fn run(root: &Path, user: &str, actions: &[String], json: bool) -> anyhow::Result<()> {
    let (store, config) = super::open(root)?;
    let user = DayResolver::new(&store, &store, &config.schedule).find_user(user)?;
    let aggregate = ProgressAggregator::new(&store, &config.progress).aggregate(&user.id, actions)?;

    if json {
        return print_json(&aggregate);
    }

    let rows = actions
        .iter()
        .filter_map(|id| aggregate.statuses.get(id).map(|r| (id, r)))
        .map(|(id, r)| {
            vec![
                id.clone(),
                r.status.to_string(),
                r.source.map(|s| s.to_string()).unwrap_or_else(|| "-".into()),
                r.at.map(|t| t.to_rfc3339()).unwrap_or_else(|| "-".into()),
            ]
        })
        .collect();
    print_table(&["ACTION", "STATUS", "SOURCE", "AT"], rows);

    for c in &aggregate.conflicts {
        let seen: Vec<String> = c
            .observations
            .iter()
            .map(|o| format!("{}={}", o.source, o.status))
            .collect();
        println!(
            "conflict: {} resolved to {} ({})",
            c.action_id,
            c.resolved,
            seen.join(", ")
        );
    }
    Ok(())
}
