use crate::error::{DaybookError, Result};
use crate::evaluator::{bind_content, ContentBinding};
use crate::plan::DailyPlanEntry;
use crate::types::{ProgramState, ProgressStatus};
use crate::view::Composer;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// A past program day whose per-day progress is not completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissedDay {
    pub day_id: String,
    pub day_number: i64,
    pub phase: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week: Option<u32>,
    pub status: ProgressStatus,
}

/// Surface duplicate day numbers in a batch of entries the same way a
/// single-day lookup does.
fn reject_duplicates(entries: &[DailyPlanEntry]) -> Result<()> {
    let mut by_day: BTreeMap<i64, Vec<String>> = BTreeMap::new();
    for e in entries {
        by_day.entry(e.day_number).or_default().push(e.id.clone());
    }
    match by_day.into_iter().find(|(_, ids)| ids.len() > 1) {
        Some((day_number, document_ids)) => Err(DaybookError::AmbiguousDay {
            day_number,
            document_ids,
        }),
        None => Ok(()),
    }
}

impl<'a> Composer<'a> {
    /// Days `1 <= dayNumber < current` not marked completed in the per-day
    /// progress map, oldest first. Empty before the program starts.
    pub fn missed_days(&self, user_key: &str, as_of: DateTime<Utc>) -> Result<Vec<MissedDay>> {
        let resolver = self.resolver();
        let user = resolver.find_user(user_key)?;
        let position = resolver.position(&user, as_of)?;
        if position.state != ProgramState::Active || position.day_number <= 1 {
            return Ok(Vec::new());
        }

        let entries = self
            .stores
            .plan
            .daily_plan_in_range(1, position.day_number - 1)?;
        reject_duplicates(&entries)?;
        let progress = self.stores.progress.dev_plan_progress(&user.id)?;

        let missed: Vec<MissedDay> = entries
            .into_iter()
            .filter_map(|e| {
                let block = progress.daily_progress.get(&e.id);
                if block.is_some_and(|b| b.is_completed()) {
                    return None;
                }
                Some(MissedDay {
                    week: self.config.schedule.week_of(e.day_number),
                    status: block
                        .and_then(|b| b.status)
                        .unwrap_or(ProgressStatus::NotStarted),
                    day_id: e.id,
                    day_number: e.day_number,
                    phase: e.phase,
                })
            })
            .collect();
        tracing::debug!(user_id = %user.id, missed = missed.len(), "missed days computed");
        Ok(missed)
    }

    /// Content ids referenced by actions on every day up to and including
    /// the current one, deduplicated in day order.
    pub fn unlocked_content(&self, user_key: &str, as_of: DateTime<Utc>) -> Result<Vec<String>> {
        let resolver = self.resolver();
        let user = resolver.find_user(user_key)?;
        let position = resolver.position(&user, as_of)?;

        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        for entry in self.stores.plan.all_entries()? {
            if entry.day_number > position.day_number {
                break;
            }
            for action in &entry.actions {
                if let ContentBinding::Library { content_ref } = bind_content(action) {
                    if seen.insert(content_ref.id.clone()) {
                        ids.push(content_ref.id);
                    }
                }
            }
            for res in &entry.weekly_resources {
                if let Some(r) = &res.content_ref {
                    if seen.insert(r.id.clone()) {
                        ids.push(r.id.clone());
                    }
                }
            }
        }
        Ok(ids)
    }
}
