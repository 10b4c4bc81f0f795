use super::{sort_entries, ContentStore, DirectoryStore, PlanStore, ProgressStore};
use crate::cohort::{normalize_email, Cohort, User};
use crate::content::ContentDocument;
use crate::error::Result;
use crate::plan::DailyPlanEntry;
use crate::progress::{ActionProgress, DevPlanProgress, LegacyModuleState};
use crate::types::ProgressStatus;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// In-process store. Plan entries are kept as a list so duplicate
/// `day_number` values survive for the resolver to report.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    users: BTreeMap<String, User>,
    cohorts: BTreeMap<String, Cohort>,
    plan: Vec<DailyPlanEntry>,
    content: BTreeMap<(String, String), ContentDocument>,
    action_progress: BTreeMap<String, Vec<ActionProgress>>,
    dev_plans: BTreeMap<String, DevPlanProgress>,
    legacy: BTreeMap<String, LegacyModuleState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_user(&mut self, user: User) {
        self.users.insert(user.id.clone(), user);
    }

    pub fn put_cohort(&mut self, cohort: Cohort) {
        self.cohorts.insert(cohort.id.clone(), cohort);
    }

    /// Replaces an entry with the same document id; a different id with the
    /// same day number is kept alongside it.
    pub fn put_plan_entry(&mut self, entry: DailyPlanEntry) {
        self.plan.retain(|e| e.id != entry.id);
        self.plan.push(entry);
    }

    pub fn put_content(&mut self, collection: &str, doc: ContentDocument) {
        self.content
            .insert((collection.to_string(), doc.id.clone()), doc);
    }

    pub fn put_action_progress(&mut self, user_id: &str, record: ActionProgress) {
        self.action_progress
            .entry(user_id.to_string())
            .or_default()
            .push(record);
    }

    pub fn put_dev_plan(&mut self, user_id: &str, progress: DevPlanProgress) {
        self.dev_plans.insert(user_id.to_string(), progress);
    }

    pub fn put_legacy_modules(&mut self, user_id: &str, state: LegacyModuleState) {
        self.legacy.insert(user_id.to_string(), state);
    }
}

impl DirectoryStore for MemoryStore {
    fn get_user(&self, id: &str) -> Result<Option<User>> {
        Ok(self.users.get(id).cloned())
    }

    fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = normalize_email(email);
        Ok(self.users.values().find(|u| u.matches_email(&email)).cloned())
    }

    fn get_cohort(&self, id: &str) -> Result<Option<Cohort>> {
        Ok(self.cohorts.get(id).cloned())
    }

    fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.users.values().cloned().collect())
    }
}

impl PlanStore for MemoryStore {
    fn daily_plan_by_day_number(&self, day: i64) -> Result<Vec<DailyPlanEntry>> {
        let mut found: Vec<DailyPlanEntry> = self
            .plan
            .iter()
            .filter(|e| e.day_number == day)
            .cloned()
            .collect();
        sort_entries(&mut found);
        Ok(found)
    }

    fn all_entries(&self) -> Result<Vec<DailyPlanEntry>> {
        let mut all = self.plan.clone();
        sort_entries(&mut all);
        Ok(all)
    }
}

impl ContentStore for MemoryStore {
    fn get_content(&self, collection: &str, id: &str) -> Result<Option<ContentDocument>> {
        Ok(self
            .content
            .get(&(collection.to_string(), id.to_string()))
            .cloned())
    }

    fn list_collection(&self, collection: &str) -> Result<Vec<ContentDocument>> {
        Ok(self
            .content
            .iter()
            .filter(|((c, _), _)| c == collection)
            .map(|(_, d)| d.clone())
            .collect())
    }
}

impl ProgressStore for MemoryStore {
    fn action_progress(&self, user_id: &str) -> Result<Vec<ActionProgress>> {
        Ok(self
            .action_progress
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    fn dev_plan_progress(&self, user_id: &str) -> Result<DevPlanProgress> {
        Ok(self.dev_plans.get(user_id).cloned().unwrap_or_default())
    }

    fn legacy_module_state(&self, user_id: &str) -> Result<LegacyModuleState> {
        Ok(self.legacy.get(user_id).cloned().unwrap_or_default())
    }

    fn record_completion(
        &mut self,
        user_id: &str,
        action_id: &str,
        status: ProgressStatus,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.put_action_progress(user_id, ActionProgress::new(action_id, status, at));
        Ok(())
    }

    fn update_dev_plan(
        &mut self,
        user_id: &str,
        edit: &mut dyn FnMut(&mut DevPlanProgress),
    ) -> Result<DevPlanProgress> {
        let plan = self.dev_plans.entry(user_id.to_string()).or_default();
        edit(plan);
        Ok(plan.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_day_numbers_are_kept() {
        let mut store = MemoryStore::new();
        store.put_plan_entry(DailyPlanEntry::new("day-005", 5, "foundation"));
        store.put_plan_entry(DailyPlanEntry::new("day-005-v2", 5, "foundation"));
        store.put_plan_entry(DailyPlanEntry::new("day-005", 5, "growth"));
        let found = store.daily_plan_by_day_number(5).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].phase, "growth");
    }

    #[test]
    fn range_query_is_ordered() {
        let mut store = MemoryStore::new();
        for n in [9, 1, 3, 8] {
            store.put_plan_entry(DailyPlanEntry::new(crate::plan::format_day_id(n), n, "x"));
        }
        let days: Vec<i64> = store
            .daily_plan_in_range(1, 7)
            .unwrap()
            .iter()
            .map(|e| e.day_number)
            .collect();
        assert_eq!(days, vec![1, 3]);
    }

    #[test]
    fn email_lookup_is_normalized() {
        let mut store = MemoryStore::new();
        store.put_user(User::new("u1", "Ada@Example.com"));
        let found = store.user_by_email(" ADA@example.COM").unwrap().unwrap();
        assert_eq!(found.id, "u1");
        assert!(store.user_by_email("bob@example.com").unwrap().is_none());
    }
}
