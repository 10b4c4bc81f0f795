use crate::config::{Config, WarnLevel};
use crate::content::{ContentRef, ContentResolver};
use crate::error::{DaybookError, Result};
use crate::evaluator::{bind_content, ContentBinding};
use crate::plan::{parse_day_id, DailyPlanEntry};
use crate::progress::ProgressAggregator;
use crate::view::Stores;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    DuplicateDayNumber,
    DayIdMismatch,
    BrokenContentRef,
    ContentDivergence,
    OrphanProgress,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub level: WarnLevel,
    pub kind: FindingKind,
    /// Document, content or user id the finding is about.
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditReport {
    pub findings: Vec<Finding>,
}

impl AuditReport {
    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(|f| f.level == WarnLevel::Error)
    }

    pub fn count(&self, kind: FindingKind) -> usize {
        self.findings.iter().filter(|f| f.kind == kind).count()
    }

    fn push(&mut self, level: WarnLevel, kind: FindingKind, subject: &str, message: String) {
        self.findings.push(Finding {
            level,
            kind,
            subject: subject.to_string(),
            message,
        });
    }
}

/// Cross-check plan, content and progress data. Read-only; nothing here is
/// consulted when composing a view.
pub fn audit(stores: Stores<'_>, config: &Config) -> Result<AuditReport> {
    let mut report = AuditReport::default();
    let entries = stores.plan.all_entries()?;

    check_day_numbers(&entries, &mut report);
    check_content_refs(&entries, stores, config, &mut report)?;
    check_content_divergence(stores, config, &mut report)?;
    check_orphans(&entries, stores, config, &mut report)?;

    tracing::info!(
        findings = report.findings.len(),
        errors = report.has_errors(),
        "audit complete"
    );
    Ok(report)
}

fn check_day_numbers(entries: &[DailyPlanEntry], report: &mut AuditReport) {
    let mut by_day: BTreeMap<i64, Vec<&str>> = BTreeMap::new();
    for e in entries {
        by_day.entry(e.day_number).or_default().push(&e.id);
        if let Ok(n) = parse_day_id(&e.id) {
            if n != e.day_number {
                report.push(
                    WarnLevel::Warning,
                    FindingKind::DayIdMismatch,
                    &e.id,
                    format!("document id says day {n} but dayNumber is {}", e.day_number),
                );
            }
        }
    }
    for (day, ids) in by_day {
        if ids.len() > 1 {
            report.push(
                WarnLevel::Error,
                FindingKind::DuplicateDayNumber,
                &format!("day {day}"),
                format!("dayNumber {day} is claimed by {}", ids.join(", ")),
            );
        }
    }
}

fn check_content_refs(
    entries: &[DailyPlanEntry],
    stores: Stores<'_>,
    config: &Config,
    report: &mut AuditReport,
) -> Result<()> {
    let resolver = ContentResolver::new(stores.content, &config.content);
    let mut checked: HashSet<(String, String)> = HashSet::new();
    for e in entries {
        let mut refs: Vec<(String, ContentRef)> = Vec::new();
        for (id, action) in e.identified_actions() {
            if let ContentBinding::Library { content_ref } = bind_content(action) {
                refs.push((id, content_ref));
            }
        }
        for res in &e.weekly_resources {
            if let Some(r) = &res.content_ref {
                refs.push((res.id.clone(), r.clone()));
            }
        }
        for (owner, r) in refs {
            if !checked.insert((r.content_type.clone(), r.id.clone())) {
                continue;
            }
            match resolver.resolve(&r) {
                Ok(_) => {}
                Err(DaybookError::ContentNotFound { .. }) => report.push(
                    WarnLevel::Error,
                    FindingKind::BrokenContentRef,
                    &e.id,
                    format!(
                        "{owner} references {} '{}' which no collection holds",
                        r.content_type, r.id
                    ),
                ),
                Err(other) => return Err(other),
            }
        }
    }
    Ok(())
}

fn check_content_divergence(
    stores: Stores<'_>,
    config: &Config,
    report: &mut AuditReport,
) -> Result<()> {
    let mut titles: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
    for collection in config.content.all_collections() {
        for doc in stores.content.list_collection(&collection)? {
            titles
                .entry(doc.id.clone())
                .or_default()
                .push((collection.clone(), doc.title.trim().to_string()));
        }
    }
    for (id, sources) in titles {
        let distinct: BTreeSet<&str> = sources.iter().map(|(_, t)| t.as_str()).collect();
        if sources.len() > 1 && distinct.len() > 1 {
            let listing: Vec<String> = sources
                .iter()
                .map(|(c, t)| format!("{c}: \"{t}\""))
                .collect();
            report.push(
                WarnLevel::Warning,
                FindingKind::ContentDivergence,
                &id,
                format!("titles differ across collections ({})", listing.join("; ")),
            );
        }
    }
    Ok(())
}

fn check_orphans(
    entries: &[DailyPlanEntry],
    stores: Stores<'_>,
    config: &Config,
    report: &mut AuditReport,
) -> Result<()> {
    let mut known: HashSet<String> = HashSet::new();
    for e in entries {
        known.extend(e.identified_actions().map(|(id, _)| id));
        known.extend(e.weekly_resources.iter().map(|r| r.id.clone()));
    }
    let aggregator = ProgressAggregator::new(stores.progress, &config.progress);
    for user in stores.directory.list_users()? {
        for id in aggregator.orphans(&user.id, &known)? {
            report.push(
                WarnLevel::Warning,
                FindingKind::OrphanProgress,
                &user.id,
                format!("progress recorded for '{id}', which no plan action defines"),
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cohort::User;
    use crate::content::ContentDocument;
    use crate::plan::Action;
    use crate::progress::ActionProgress;
    use crate::store::MemoryStore;
    use crate::types::ProgressStatus;
    use chrono::Utc;

    fn doc(id: &str, title: &str) -> ContentDocument {
        ContentDocument {
            id: id.into(),
            content_type: "VIDEO".into(),
            title: title.into(),
            ..ContentDocument::default()
        }
    }

    fn watch(id: &str, content: &str) -> Action {
        let mut a = Action::new(id, "video");
        a.content_ref = Some(ContentRef::new("VIDEO", content));
        a
    }

    fn run(store: &MemoryStore) -> AuditReport {
        audit(Stores::uniform(store), &Config::new("test")).unwrap()
    }

    #[test]
    fn clean_data_has_no_findings() {
        let mut store = MemoryStore::new();
        store.put_content("content_library", doc("v1", "Intro"));
        store.put_plan_entry(
            DailyPlanEntry::new("day-001", 1, "foundation").with_action(watch("w1", "v1")),
        );
        let report = run(&store);
        assert!(report.findings.is_empty(), "{:?}", report.findings);
        assert!(!report.has_errors());
    }

    #[test]
    fn flags_duplicate_and_mismatched_days() {
        let mut store = MemoryStore::new();
        store.put_plan_entry(DailyPlanEntry::new("day-005", 5, "foundation"));
        store.put_plan_entry(DailyPlanEntry::new("day-006", 5, "foundation"));
        let report = run(&store);
        assert_eq!(report.count(FindingKind::DuplicateDayNumber), 1);
        assert_eq!(report.count(FindingKind::DayIdMismatch), 1);
        assert!(report.has_errors());
    }

    #[test]
    fn flags_broken_refs_once_per_item() {
        let mut store = MemoryStore::new();
        store.put_plan_entry(
            DailyPlanEntry::new("day-001", 1, "foundation")
                .with_action(watch("w1", "ghost"))
                .with_action(watch("w2", "ghost")),
        );
        let report = run(&store);
        assert_eq!(report.count(FindingKind::BrokenContentRef), 1);
    }

    #[test]
    fn flags_divergent_titles() {
        let mut store = MemoryStore::new();
        store.put_content("content_library", doc("v1", "Start With Why"));
        store.put_content("content_videos", doc("v1", "Start with Why (2009)"));
        store.put_content("content_library", doc("v2", "Same"));
        store.put_content("content_videos", doc("v2", "Same"));
        let report = run(&store);
        assert_eq!(report.count(FindingKind::ContentDivergence), 1);
        assert_eq!(report.findings[0].subject, "v1");
        assert!(!report.has_errors());
    }

    #[test]
    fn flags_orphan_progress() {
        let mut store = MemoryStore::new();
        store.put_user(User::new("ada", "ada@example.com"));
        store.put_plan_entry(
            DailyPlanEntry::new("day-001", 1, "foundation").with_action(Action::new("w1", "video")),
        );
        store.put_action_progress(
            "ada",
            ActionProgress::new("w1", ProgressStatus::Completed, Utc::now()),
        );
        store.put_action_progress(
            "ada",
            ActionProgress::new("retired", ProgressStatus::Completed, Utc::now()),
        );
        let report = run(&store);
        assert_eq!(report.count(FindingKind::OrphanProgress), 1);
        assert!(report.findings[0].message.contains("retired"));
    }
}
