use crate::cohort::{effective_start, parse_utc_offset, EffectiveStart, User};
use crate::config::ScheduleConfig;
use crate::error::{DaybookError, Result};
use crate::plan::{DailyPlanEntry, WeeklyResource};
use crate::store::{DirectoryStore, PlanStore};
use crate::types::ProgramState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ---------------------------------------------------------------------------
// Day arithmetic
// ---------------------------------------------------------------------------

/// Calendar day of `as_of` relative to `start`, both read as local dates in
/// the start's offset. The start date itself is day 1; earlier dates are
/// zero or negative.
pub fn calendar_day(start: &EffectiveStart, as_of: DateTime<Utc>) -> i64 {
    let first = start.start.with_timezone(&start.offset).date_naive();
    let today = as_of.with_timezone(&start.offset).date_naive();
    (today - first).num_days() + 1
}

/// Where a user stands in the program at some instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayPosition {
    pub state: ProgramState,
    /// Raw calendar day; `None` when no start date is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_day: Option<i64>,
    /// dayNumber of the plan entry to serve. Pre-start and unassigned users
    /// are pinned to the onboarding day, which keeps this non-decreasing.
    pub day_number: i64,
}

// ---------------------------------------------------------------------------
// ResolvedDay
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedDay {
    pub user_id: String,
    #[serde(flatten)]
    pub position: DayPosition,
    pub phase: String,
    /// Program week; `None` for pre-start entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week: Option<u32>,
    pub entry: DailyPlanEntry,
    /// Union of the week's weekly resources, deduplicated by id.
    pub weekly_resources: Vec<WeeklyResource>,
}

// ---------------------------------------------------------------------------
// DayResolver
// ---------------------------------------------------------------------------

pub struct DayResolver<'a> {
    directory: &'a dyn DirectoryStore,
    plan: &'a dyn PlanStore,
    config: &'a ScheduleConfig,
}

impl<'a> DayResolver<'a> {
    pub fn new(
        directory: &'a dyn DirectoryStore,
        plan: &'a dyn PlanStore,
        config: &'a ScheduleConfig,
    ) -> Self {
        Self {
            directory,
            plan,
            config,
        }
    }

    /// Look a user up by id, or by normalized email when `key` contains `@`.
    pub fn find_user(&self, key: &str) -> Result<User> {
        let found = if key.contains('@') {
            self.directory.user_by_email(key)?
        } else {
            self.directory.get_user(key)?
        };
        found.ok_or_else(|| DaybookError::UserNotFound(key.to_string()))
    }

    /// A cohort id that points nowhere is a data error; no cohort at all is
    /// not.
    pub fn effective_start(&self, user: &User) -> Result<Option<EffectiveStart>> {
        let cohort = match user.cohort_id.as_deref() {
            Some(id) => Some(
                self.directory
                    .get_cohort(id)?
                    .ok_or_else(|| DaybookError::CohortNotFound(id.to_string()))?,
            ),
            None => None,
        };
        let fallback = parse_utc_offset(&self.config.default_utc_offset)?;
        effective_start(user, cohort.as_ref(), fallback)
    }

    pub fn position(&self, user: &User, as_of: DateTime<Utc>) -> Result<DayPosition> {
        let Some(start) = self.effective_start(user)? else {
            tracing::debug!(user_id = %user.id, "no effective start date");
            return Ok(DayPosition {
                state: ProgramState::Unassigned,
                calendar_day: None,
                day_number: self.config.onboarding_day,
            });
        };
        let day = calendar_day(&start, as_of);
        Ok(if day >= 1 {
            DayPosition {
                state: ProgramState::Active,
                calendar_day: Some(day),
                day_number: day,
            }
        } else {
            DayPosition {
                state: ProgramState::PreStart,
                calendar_day: Some(day),
                day_number: self.config.onboarding_day,
            }
        })
    }

    /// The single plan entry whose `day_number` field equals `day`.
    pub fn entry_for(&self, day: i64) -> Result<DailyPlanEntry> {
        let mut found = self.plan.daily_plan_by_day_number(day)?;
        match found.len() {
            0 => Err(DaybookError::DayNotScheduled(day)),
            1 => Ok(found.remove(0)),
            _ => {
                let document_ids: Vec<String> = found.into_iter().map(|e| e.id).collect();
                tracing::error!(
                    day_number = day,
                    documents = %document_ids.join(", "),
                    "multiple plan documents claim one day"
                );
                Err(DaybookError::AmbiguousDay {
                    day_number: day,
                    document_ids,
                })
            }
        }
    }

    /// Week number and merged weekly resources for `entry`.
    pub fn weekly_resources(
        &self,
        entry: &DailyPlanEntry,
    ) -> Result<(Option<u32>, Vec<WeeklyResource>)> {
        if entry.is_pre_start() {
            return Ok((None, Vec::new()));
        }
        let Some(week) = self.config.week_of(entry.day_number) else {
            return Ok((None, Vec::new()));
        };
        let (first, last) = self.config.week_range(week);
        let mut seen = HashSet::new();
        let mut resources = Vec::new();
        for day in self.plan.daily_plan_in_range(first, last)? {
            for res in day.weekly_resources {
                if seen.insert(res.id.clone()) {
                    resources.push(res);
                }
            }
        }
        Ok((Some(week), resources))
    }

    pub fn resolve_day(&self, user: &User, as_of: DateTime<Utc>) -> Result<ResolvedDay> {
        let position = self.position(user, as_of)?;
        let entry = self.entry_for(position.day_number)?;
        let (week, weekly_resources) = self.weekly_resources(&entry)?;
        tracing::debug!(
            user_id = %user.id,
            day_number = position.day_number,
            state = %position.state,
            document = %entry.id,
            "day resolved"
        );
        Ok(ResolvedDay {
            user_id: user.id.clone(),
            position,
            phase: entry.phase.clone(),
            week,
            entry,
            weekly_resources,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cohort::Cohort;
    use crate::plan::{format_day_id, PRE_START_PHASE};
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone};

    fn ts(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn resource(id: &str) -> WeeklyResource {
        WeeklyResource {
            id: id.to_string(),
            label: id.to_string(),
            kind: "coaching".to_string(),
            content_ref: None,
            url: None,
        }
    }

    /// Cohort starting Monday 2025-01-06 at local midnight in -05:00, with
    /// plan entries for days 0..=21.
    fn fixture() -> MemoryStore {
        let mut store = MemoryStore::new();
        let mut cohort = Cohort::new("winter", "Winter", ts(2025, 1, 6, 5, 0));
        cohort.utc_offset = "-05:00".to_string();
        store.put_cohort(cohort);
        store.put_user(User::new("ada", "ada@example.com").with_cohort("winter"));
        store.put_plan_entry(DailyPlanEntry::new("day-000", 0, PRE_START_PHASE));
        for n in 1..=21 {
            store.put_plan_entry(DailyPlanEntry::new(format_day_id(n), n, "foundation"));
        }
        store
    }

    fn resolve(store: &MemoryStore, user: &str, at: DateTime<Utc>) -> Result<ResolvedDay> {
        let cfg = ScheduleConfig::default();
        let resolver = DayResolver::new(store, store, &cfg);
        let user = resolver.find_user(user)?;
        resolver.resolve_day(&user, at)
    }

    #[test]
    fn first_day_and_day_fourteen() {
        let store = fixture();
        let d1 = resolve(&store, "ada", ts(2025, 1, 6, 14, 0)).unwrap();
        assert_eq!(d1.position.day_number, 1);
        assert_eq!(d1.position.state, ProgramState::Active);
        assert_eq!(d1.entry.id, "day-001");

        let d14 = resolve(&store, "ada", ts(2025, 1, 19, 14, 0)).unwrap();
        assert_eq!(d14.position.day_number, 14);
        assert_eq!(d14.week, Some(2));
    }

    #[test]
    fn days_are_counted_in_cohort_offset() {
        let store = fixture();
        // 23:59 local on Jan 6 is still day 1, though it is Jan 7 in UTC.
        let late = resolve(&store, "ada", ts(2025, 1, 7, 4, 59)).unwrap();
        assert_eq!(late.position.day_number, 1);
        let midnight = resolve(&store, "ada", ts(2025, 1, 7, 5, 0)).unwrap();
        assert_eq!(midnight.position.day_number, 2);
    }

    #[test]
    fn day_number_is_monotonic() {
        let store = fixture();
        let mut at = ts(2024, 12, 30, 0, 0);
        let mut last = i64::MIN;
        while at < ts(2025, 1, 25, 0, 0) {
            let day = resolve(&store, "ada", at).unwrap().position.day_number;
            assert!(day >= last, "day went backwards at {at}: {last} -> {day}");
            last = day;
            at += Duration::hours(7);
        }
    }

    #[test]
    fn pre_start_serves_onboarding_entry() {
        let store = fixture();
        let view = resolve(&store, "ada", ts(2025, 1, 2, 12, 0)).unwrap();
        assert_eq!(view.position.state, ProgramState::PreStart);
        assert_eq!(view.position.calendar_day, Some(-3));
        assert_eq!(view.position.day_number, 0);
        assert_eq!(view.entry.id, "day-000");
        assert_eq!(view.week, None);
    }

    #[test]
    fn no_cohort_is_unassigned_not_an_error() {
        let mut store = fixture();
        store.put_user(User::new("bob", "bob@example.com"));
        let view = resolve(&store, "bob", ts(2025, 1, 10, 12, 0)).unwrap();
        assert_eq!(view.position.state, ProgramState::Unassigned);
        assert_eq!(view.position.calendar_day, None);
        assert_eq!(view.entry.id, "day-000");
    }

    #[test]
    fn dangling_cohort_is_an_error() {
        let mut store = fixture();
        store.put_user(User::new("eve", "eve@example.com").with_cohort("gone"));
        let err = resolve(&store, "eve", ts(2025, 1, 10, 12, 0)).unwrap_err();
        assert!(matches!(err, DaybookError::CohortNotFound(ref id) if id == "gone"));
    }

    #[test]
    fn user_override_shifts_day() {
        let mut store = fixture();
        store.put_user(
            User::new("late", "late@example.com")
                .with_cohort("winter")
                .with_start_date(ts(2025, 1, 13, 5, 0)),
        );
        let view = resolve(&store, "late", ts(2025, 1, 19, 14, 0)).unwrap();
        assert_eq!(view.position.day_number, 7);
    }

    #[test]
    fn duplicate_day_number_is_ambiguous() {
        let mut store = fixture();
        store.put_plan_entry(DailyPlanEntry::new("legacy-day-5", 5, "foundation"));
        let err = resolve(&store, "ada", ts(2025, 1, 10, 14, 0)).unwrap_err();
        match err {
            DaybookError::AmbiguousDay {
                day_number,
                document_ids,
            } => {
                assert_eq!(day_number, 5);
                assert_eq!(document_ids, vec!["day-005", "legacy-day-5"]);
            }
            other => panic!("expected AmbiguousDay, got {other:?}"),
        }
    }

    #[test]
    fn missing_day_is_reported() {
        let store = fixture();
        let err = resolve(&store, "ada", ts(2025, 3, 1, 14, 0)).unwrap_err();
        assert!(matches!(err, DaybookError::DayNotScheduled(_)));
    }

    #[test]
    fn lookup_by_email_is_case_insensitive() {
        let store = fixture();
        let view = resolve(&store, "ADA@Example.com", ts(2025, 1, 6, 14, 0)).unwrap();
        assert_eq!(view.user_id, "ada");
        assert!(matches!(
            resolve(&store, "nobody", ts(2025, 1, 6, 14, 0)),
            Err(DaybookError::UserNotFound(_))
        ));
    }

    #[test]
    fn weekly_resources_come_from_the_whole_week() {
        let mut store = fixture();
        let mut d2 = DailyPlanEntry::new("day-002", 2, "foundation");
        d2.weekly_resources = vec![resource("office-hours"), resource("community-call")];
        let mut d6 = DailyPlanEntry::new("day-006", 6, "foundation");
        d6.weekly_resources = vec![resource("office-hours")];
        let mut d9 = DailyPlanEntry::new("day-009", 9, "foundation");
        d9.weekly_resources = vec![resource("week-two-call")];
        store.put_plan_entry(d2);
        store.put_plan_entry(d6);
        store.put_plan_entry(d9);

        let view = resolve(&store, "ada", ts(2025, 1, 8, 14, 0)).unwrap();
        assert_eq!(view.position.day_number, 3);
        assert_eq!(view.week, Some(1));
        let ids: Vec<&str> = view.weekly_resources.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["office-hours", "community-call"]);
    }

    #[test]
    fn pre_start_phase_gets_no_weekly_resources() {
        let mut store = fixture();
        // Phase says pre-start even though the day number is in week 1.
        let mut d3 = DailyPlanEntry::new("day-003", 3, PRE_START_PHASE);
        d3.weekly_resources = vec![resource("office-hours")];
        store.put_plan_entry(d3);
        let view = resolve(&store, "ada", ts(2025, 1, 8, 14, 0)).unwrap();
        assert!(view.weekly_resources.is_empty());
        assert_eq!(view.week, None);
    }
}
