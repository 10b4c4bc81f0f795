use crate::config::ProgressConfig;
use crate::error::Result;
use crate::store::ProgressStore;
use crate::types::{ProgressSource, ProgressStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

// ---------------------------------------------------------------------------
// Stored records
// ---------------------------------------------------------------------------

/// One write to the per-action store. Writes are appended, never
/// deduplicated; duplicates are reconciled when read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionProgress {
    #[serde(alias = "actionId", alias = "itemId")]
    pub action_id: String,
    pub status: ProgressStatus,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "completedAt")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "updatedAt")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ActionProgress {
    pub fn new(action_id: impl Into<String>, status: ProgressStatus, at: DateTime<Utc>) -> Self {
        Self {
            action_id: action_id.into(),
            status,
            completed_at: status.is_completed().then_some(at),
            updated_at: Some(at),
        }
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.updated_at.or(self.completed_at)
    }
}

/// Progress for one day (dev plan) or one week (legacy modules).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockProgress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProgressStatus>,
    #[serde(default, alias = "itemsCompleted")]
    pub items_completed: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "completedAt")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "lastUpdated")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl BlockProgress {
    pub fn is_completed(&self) -> bool {
        self.status == Some(ProgressStatus::Completed)
    }

    /// When the block's item list was last known to be true.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.last_updated.or(self.completed_at)
    }
}

/// Per-day progress map embedded in the development-plan document, keyed by
/// day document id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDevPlan")]
pub struct DevPlanProgress {
    pub daily_progress: BTreeMap<String, BlockProgress>,
}

/// Older writers left `dailyProgress.<day>` (or `dailyProgress.<day>.<field>`)
/// as flattened top-level keys. Those override the nested map, matching the
/// order the host applied them in. Any unreadable day entry fails the whole
/// document.
#[derive(Deserialize)]
#[serde(transparent)]
struct RawDevPlan(BTreeMap<String, serde_yaml::Value>);

impl TryFrom<RawDevPlan> for DevPlanProgress {
    type Error = serde_yaml::Error;

    fn try_from(raw: RawDevPlan) -> std::result::Result<Self, Self::Error> {
        let mut fields = raw.0;
        let nested = fields
            .remove("daily_progress")
            .or_else(|| fields.remove("dailyProgress"));
        let mut daily: BTreeMap<String, BlockProgress> = match nested {
            Some(value) => serde_yaml::from_value(value)?,
            None => BTreeMap::new(),
        };
        for (key, value) in fields {
            let Some(path) = key
                .strip_prefix("dailyProgress.")
                .or_else(|| key.strip_prefix("daily_progress."))
            else {
                continue;
            };
            tracing::debug!(key = %key, "merging flattened daily progress key");
            match path.split_once('.') {
                None => {
                    daily.insert(path.to_string(), serde_yaml::from_value(value)?);
                }
                Some((day, field)) => {
                    let block = daily.entry(day.to_string()).or_default();
                    apply_block_field(block, field, value)?;
                }
            }
        }
        Ok(Self {
            daily_progress: daily,
        })
    }
}

fn apply_block_field(
    block: &mut BlockProgress,
    field: &str,
    value: serde_yaml::Value,
) -> std::result::Result<(), serde_yaml::Error> {
    match field {
        "status" => block.status = serde_yaml::from_value(value)?,
        "completedAt" | "completed_at" => block.completed_at = serde_yaml::from_value(value)?,
        "lastUpdated" | "last_updated" => block.last_updated = serde_yaml::from_value(value)?,
        "itemsCompleted" | "items_completed" => {
            block.items_completed = serde_yaml::from_value(value)?
        }
        _ => {}
    }
    Ok(())
}

/// Per-week module blobs from the oldest schema, keyed `week-NN`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyModuleState {
    #[serde(default, alias = "weekProgress")]
    pub week_progress: BTreeMap<String, BlockProgress>,
}

// ---------------------------------------------------------------------------
// Aggregation output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub source: ProgressSource,
    pub status: ProgressStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedStatus {
    pub status: ProgressStatus,
    /// Store the status came from; `None` when no store has a record.
    pub source: Option<ProgressSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at: Option<DateTime<Utc>>,
}

impl ResolvedStatus {
    fn not_started() -> Self {
        Self {
            status: ProgressStatus::NotStarted,
            source: None,
            at: None,
        }
    }
}

/// Diagnostic: the stores disagree about one action. Never blocks a view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressConflict {
    pub action_id: String,
    pub resolved: ProgressStatus,
    pub observations: Vec<Observation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub statuses: BTreeMap<String, ResolvedStatus>,
    pub conflicts: Vec<ProgressConflict>,
}

impl Aggregate {
    pub fn status_of(&self, action_id: &str) -> ProgressStatus {
        self.statuses
            .get(action_id)
            .map(|r| r.status)
            .unwrap_or(ProgressStatus::NotStarted)
    }
}

// ---------------------------------------------------------------------------
// Observations
// ---------------------------------------------------------------------------

/// Every record the configured stores hold for one user, grouped by id.
#[derive(Debug, Default)]
pub struct Observations {
    by_id: BTreeMap<String, Vec<Observation>>,
}

impl Observations {
    fn push(&mut self, id: &str, obs: Observation) {
        self.by_id.entry(id.to_string()).or_default().push(obs);
    }

    fn push_blocks<'b>(
        &mut self,
        source: ProgressSource,
        blocks: impl Iterator<Item = &'b BlockProgress>,
    ) {
        for block in blocks {
            for id in &block.items_completed {
                self.push(
                    id,
                    Observation {
                        source,
                        status: ProgressStatus::Completed,
                        at: block.timestamp(),
                    },
                );
            }
        }
    }

    pub fn for_id(&self, id: &str) -> &[Observation] {
        self.by_id.get(id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.by_id.keys().map(|k| k.as_str())
    }
}

/// Latest timestamp wins; equal (or missing) timestamps fall back to status
/// rank so the choice never depends on record order.
fn pick_latest<'o>(records: impl Iterator<Item = &'o Observation>) -> Option<&'o Observation> {
    records.max_by(|a, b| {
        a.at.cmp(&b.at)
            .then_with(|| a.status.rank().cmp(&b.status.rank()))
    })
}

// ---------------------------------------------------------------------------
// ProgressAggregator
// ---------------------------------------------------------------------------

pub struct ProgressAggregator<'a> {
    store: &'a dyn ProgressStore,
    config: &'a ProgressConfig,
}

impl<'a> ProgressAggregator<'a> {
    pub fn new(store: &'a dyn ProgressStore, config: &'a ProgressConfig) -> Self {
        Self { store, config }
    }

    /// Load the stores named in `progress.precedence` for `user_id`.
    pub fn observe(&self, user_id: &str) -> Result<Observations> {
        let mut obs = Observations::default();
        let sources: BTreeSet<ProgressSource> = self.config.precedence.iter().copied().collect();
        for source in sources {
            match source {
                ProgressSource::ActionProgress => {
                    for rec in self.store.action_progress(user_id)? {
                        obs.push(
                            &rec.action_id,
                            Observation {
                                source,
                                status: rec.status,
                                at: rec.timestamp(),
                            },
                        );
                    }
                }
                ProgressSource::DevPlan => {
                    let plan = self.store.dev_plan_progress(user_id)?;
                    obs.push_blocks(source, plan.daily_progress.values());
                }
                ProgressSource::LegacyModules => {
                    let legacy = self.store.legacy_module_state(user_id)?;
                    obs.push_blocks(source, legacy.week_progress.values());
                }
            }
        }
        Ok(obs)
    }

    /// Canonical status for each of `action_ids`.
    ///
    /// The first store in precedence order holding a record for an id decides
    /// it; later stores only fill ids absent from earlier ones. Disagreement
    /// between any two records for an id is reported in `conflicts`.
    pub fn aggregate(&self, user_id: &str, action_ids: &[String]) -> Result<Aggregate> {
        let obs = self.observe(user_id)?;
        Ok(self.resolve(&obs, action_ids))
    }

    pub fn resolve(&self, obs: &Observations, action_ids: &[String]) -> Aggregate {
        let mut out = Aggregate::default();
        for id in action_ids {
            if out.statuses.contains_key(id) {
                continue;
            }
            let records = obs.for_id(id);
            let winner = self.config.precedence.iter().find_map(|source| {
                pick_latest(records.iter().filter(|o| o.source == *source))
            });
            let resolved = match winner {
                Some(w) => ResolvedStatus {
                    status: w.status,
                    source: Some(w.source),
                    at: w.at,
                },
                None => ResolvedStatus::not_started(),
            };

            let distinct: HashSet<ProgressStatus> = records.iter().map(|o| o.status).collect();
            if distinct.len() > 1 {
                tracing::warn!(
                    action_id = %id,
                    resolved = %resolved.status,
                    records = records.len(),
                    "conflicting progress records"
                );
                out.conflicts.push(ProgressConflict {
                    action_id: id.clone(),
                    resolved: resolved.status,
                    observations: records.to_vec(),
                });
            }
            out.statuses.insert(id.clone(), resolved);
        }
        out
    }

    /// Ids with progress records that no known plan action defines.
    pub fn orphans(&self, user_id: &str, known_ids: &HashSet<String>) -> Result<Vec<String>> {
        let obs = self.observe(user_id)?;
        Ok(obs
            .ids()
            .filter(|id| !known_ids.contains(*id))
            .map(str::to_string)
            .collect())
    }
}

/// Record a status change in the per-action store. Safe to retry: the same
/// (user, action, status, timestamp) always aggregates to the same result.
pub fn record_completion(
    store: &mut dyn ProgressStore,
    user_id: &str,
    action_id: &str,
    status: ProgressStatus,
    at: DateTime<Utc>,
) -> Result<()> {
    crate::paths::validate_id(user_id)?;
    store.record_completion(user_id, action_id, status, at)?;
    tracing::info!(user_id, action_id, status = %status, "progress recorded");
    Ok(())
}

/// Add `item_id` to (or remove it from) the completed items of `day_id` in
/// the per-day store. The day's own status is left alone.
pub fn toggle_day_item(
    store: &mut dyn ProgressStore,
    user_id: &str,
    day_id: &str,
    item_id: &str,
    complete: bool,
    at: DateTime<Utc>,
) -> Result<BlockProgress> {
    crate::paths::validate_id(user_id)?;
    crate::paths::validate_id(day_id)?;
    crate::paths::validate_id(item_id)?;
    let plan = store.update_dev_plan(user_id, &mut |plan| {
        let block = plan.daily_progress.entry(day_id.to_string()).or_default();
        if complete {
            if !block.items_completed.iter().any(|i| i == item_id) {
                block.items_completed.push(item_id.to_string());
            }
        } else {
            block.items_completed.retain(|i| i != item_id);
        }
        block.last_updated = Some(at);
    })?;
    tracing::info!(user_id, day_id, item_id, complete, "day item updated");
    Ok(plan.daily_progress.get(day_id).cloned().unwrap_or_default())
}

/// Mark `day_id` completed in the per-day store, keeping its item list.
pub fn complete_day(
    store: &mut dyn ProgressStore,
    user_id: &str,
    day_id: &str,
    at: DateTime<Utc>,
) -> Result<BlockProgress> {
    crate::paths::validate_id(user_id)?;
    crate::paths::validate_id(day_id)?;
    let plan = store.update_dev_plan(user_id, &mut |plan| {
        let block = plan.daily_progress.entry(day_id.to_string()).or_default();
        block.status = Some(ProgressStatus::Completed);
        block.completed_at = Some(at);
    })?;
    tracing::info!(user_id, day_id, "day completed");
    Ok(plan.daily_progress.get(day_id).cloned().unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
