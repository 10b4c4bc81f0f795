use crate::output::{check_mark, print_json, print_table};
use anyhow::Context;
use chrono::{DateTime, Utc};
use daybook_core::view::{ActionView, Composer, ContentState, DayView, Stores};
use std::path::Path;

pub fn run(root: &Path, user: &str, at: Option<DateTime<Utc>>, json: bool) -> anyhow::Result<()> {
    let (store, config) = super::open(root)?;
    let as_of = super::as_of(&config, at)?;
    let view = Composer::new(Stores::uniform(&store), &config)
        .compose_day_view(user, as_of)
        .with_context(|| format!("failed to compose day view for '{user}'"))?;

    if json {
        return print_json(&view);
    }
    print_view(&view);
    Ok(())
}

fn content_cell(content: &ContentState) -> String {
    match content {
        ContentState::Resolved { item } => item
            .url
            .clone()
            .unwrap_or_else(|| format!("{} ({})", item.title, item.collection)),
        ContentState::Link { url } => url.clone(),
        ContentState::Unavailable { content_ref, .. } => {
            format!("UNAVAILABLE {} '{}'", content_ref.content_type, content_ref.id)
        }
        ContentState::Unbound => "-".to_string(),
    }
}

fn action_row(a: &ActionView) -> Vec<String> {
    let need = match (a.required, a.counted) {
        (true, true) => "required",
        (true, false) => "habit",
        _ => "optional",
    };
    vec![
        check_mark(a.status).to_string(),
        a.action_id.clone(),
        a.label.clone(),
        need.to_string(),
        content_cell(&a.content),
    ]
}

fn print_view(view: &DayView) {
    let week = view
        .week
        .map(|w| format!(", week {w}"))
        .unwrap_or_default();
    println!(
        "{}: day {} ({}{}) [{}]",
        view.user_id, view.day_number, view.phase, week, view.state
    );
    if let Some(title) = &view.title {
        println!("{title}");
    }
    println!();

    if view.actions.is_empty() {
        println!("No actions scheduled.");
    } else {
        print_table(
            &["", "ID", "ACTION", "NEED", "CONTENT"],
            view.actions.iter().map(action_row).collect(),
        );
    }

    if !view.weekly_resources.is_empty() {
        println!();
        println!("This week:");
        for r in &view.weekly_resources {
            println!(
                "  {} {} ({}) {}",
                check_mark(r.status),
                r.label,
                r.kind,
                content_cell(&r.content)
            );
        }
    }

    println!();
    println!(
        "{}/{} required complete",
        view.completed_required_count, view.required_count
    );
    if !view.conflicts.is_empty() {
        println!(
            "{} progress conflict(s); run with --json for details",
            view.conflicts.len()
        );
    }
}
