//! Read/write seams between the resolution logic and wherever records live.
//!
//! [`MemoryStore`] backs tests and embedding hosts; [`FileStore`] persists
//! YAML documents under `.daybook/`.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::cohort::{Cohort, User};
use crate::content::ContentDocument;
use crate::error::Result;
use crate::plan::DailyPlanEntry;
use crate::progress::{ActionProgress, DevPlanProgress, LegacyModuleState};
use crate::types::ProgressStatus;
use chrono::{DateTime, Utc};

pub trait DirectoryStore {
    fn get_user(&self, id: &str) -> Result<Option<User>>;

    /// Lookup by normalized email.
    fn user_by_email(&self, email: &str) -> Result<Option<User>>;

    fn get_cohort(&self, id: &str) -> Result<Option<Cohort>>;

    fn list_users(&self) -> Result<Vec<User>>;
}

pub trait PlanStore {
    /// Every entry whose `day_number` field equals `day`. More than one is a
    /// data error the caller must surface.
    fn daily_plan_by_day_number(&self, day: i64) -> Result<Vec<DailyPlanEntry>>;

    /// All entries, ordered by `(day_number, id)`.
    fn all_entries(&self) -> Result<Vec<DailyPlanEntry>>;

    /// Entries with `first <= day_number <= last`, ordered by `(day_number, id)`.
    fn daily_plan_in_range(&self, first: i64, last: i64) -> Result<Vec<DailyPlanEntry>> {
        Ok(self
            .all_entries()?
            .into_iter()
            .filter(|e| (first..=last).contains(&e.day_number))
            .collect())
    }
}

pub trait ContentStore {
    fn get_content(&self, collection: &str, id: &str) -> Result<Option<ContentDocument>>;

    fn list_collection(&self, collection: &str) -> Result<Vec<ContentDocument>>;
}

pub trait ProgressStore {
    /// Per-action records, in write order.
    fn action_progress(&self, user_id: &str) -> Result<Vec<ActionProgress>>;

    fn dev_plan_progress(&self, user_id: &str) -> Result<DevPlanProgress>;

    fn legacy_module_state(&self, user_id: &str) -> Result<LegacyModuleState>;

    /// Append a record to the per-action store.
    fn record_completion(
        &mut self,
        user_id: &str,
        action_id: &str,
        status: ProgressStatus,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// Read-modify-write the per-day progress map. Returns the saved map.
    fn update_dev_plan(
        &mut self,
        user_id: &str,
        edit: &mut dyn FnMut(&mut DevPlanProgress),
    ) -> Result<DevPlanProgress>;
}

pub(crate) fn sort_entries(entries: &mut [DailyPlanEntry]) {
    entries.sort_by(|a, b| a.day_number.cmp(&b.day_number).then_with(|| a.id.cmp(&b.id)));
}
