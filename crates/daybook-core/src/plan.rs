use crate::content::ContentRef;
use crate::error::{DaybookError, Result};
use crate::types::type_key;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

pub const PRE_START_PHASE: &str = "pre-start";

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// A single assignable task within a day, exactly as authored.
///
/// `required` is tri-state and `optional` may contradict it; reduce the two
/// with [`crate::evaluator::evaluate`], never inline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", alias = "actionType", default)]
    pub action_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "resourceType")]
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "resourceId")]
    pub resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "contentRef")]
    pub content_ref: Option<ContentRef>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        alias = "estimatedMinutes",
        alias = "estimatedTime"
    )]
    pub estimated_minutes: Option<u32>,
}

impl Action {
    pub fn new(id: impl Into<String>, action_type: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            action_type: action_type.into(),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// WeeklyResource
// ---------------------------------------------------------------------------

/// A coaching or community item attached to a program week rather than a day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyResource {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "contentRef")]
    pub content_ref: Option<ContentRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

// ---------------------------------------------------------------------------
// DailyPlanEntry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPlanEntry {
    /// Document id, usually `day-NNN`. Not authoritative for the day number.
    pub id: String,
    #[serde(alias = "dayNumber")]
    pub day_number: i64,
    #[serde(default)]
    pub phase: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", alias = "weeklyResources")]
    pub weekly_resources: Vec<WeeklyResource>,
}

impl DailyPlanEntry {
    pub fn new(id: impl Into<String>, day_number: i64, phase: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            day_number,
            phase: phase.into(),
            title: None,
            actions: Vec::new(),
            weekly_resources: Vec::new(),
        }
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    /// Phase string is canonical for pre-start classification; day ranges are
    /// a display concern only.
    pub fn is_pre_start(&self) -> bool {
        type_key(&self.phase) == type_key(PRE_START_PHASE)
    }

    /// Stable id for the action at `index`, falling back to
    /// `daily-<doc id>-<index>` for actions authored without one.
    pub fn action_id(&self, index: usize) -> Option<String> {
        let action = self.actions.get(index)?;
        Some(match &action.id {
            Some(id) if !id.trim().is_empty() => id.clone(),
            _ => format!("daily-{}-{}", self.id, index),
        })
    }

    /// `(id, action)` pairs with fallback ids applied.
    pub fn identified_actions(&self) -> impl Iterator<Item = (String, &Action)> + '_ {
        self.actions
            .iter()
            .enumerate()
            .filter_map(|(i, a)| self.action_id(i).map(|id| (id, a)))
    }
}

// ---------------------------------------------------------------------------
// Day ids
// ---------------------------------------------------------------------------

static DAY_ID_RE: OnceLock<Regex> = OnceLock::new();

fn day_id_re() -> &'static Regex {
    DAY_ID_RE.get_or_init(|| Regex::new(r"^day-(-?\d{1,4})$").unwrap())
}

pub fn format_day_id(day_number: i64) -> String {
    if day_number < 0 {
        format!("day--{:03}", -day_number)
    } else {
        format!("day-{day_number:03}")
    }
}

/// Parse a `day-NNN` document id. Only used to cross-check documents; lookups
/// go through the `day_number` field.
pub fn parse_day_id(id: &str) -> Result<i64> {
    let caps = day_id_re()
        .captures(id)
        .ok_or_else(|| DaybookError::InvalidDayId(id.to_string()))?;
    caps[1]
        .parse()
        .map_err(|_| DaybookError::InvalidDayId(id.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_ids_roundtrip_through_format() {
        for n in [0, 1, 14, 71, 365, -14, -1] {
            assert_eq!(parse_day_id(&format_day_id(n)).unwrap(), n);
        }
        assert_eq!(format_day_id(5), "day-005");
    }

    #[test]
    fn parse_day_id_rejects_other_schemes() {
        for id in ["week-01", "day5", "day-", "day-abc", "prep-day-1"] {
            assert!(parse_day_id(id).is_err(), "expected invalid: {id}");
        }
    }

    #[test]
    fn fallback_action_ids() {
        let mut unnamed = Action::new("x", "video");
        unnamed.id = None;
        let entry = DailyPlanEntry::new("day-003", 3, "foundation")
            .with_action(Action::new("watch-intro", "video"))
            .with_action(unnamed);
        let ids: Vec<String> = entry.identified_actions().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["watch-intro", "daily-day-003-1"]);
        assert_eq!(entry.action_id(7), None);
    }

    #[test]
    fn pre_start_matches_phase_string_only() {
        assert!(DailyPlanEntry::new("day-000", 0, "pre-start").is_pre_start());
        assert!(DailyPlanEntry::new("d", 3, "Pre_Start").is_pre_start());
        // A low day number alone does not make a day pre-start.
        assert!(!DailyPlanEntry::new("day-001", 1, "foundation").is_pre_start());
    }

    #[test]
    fn entry_accepts_legacy_document_shape() {
        let yaml = r#"
id: day-005
dayNumber: 5
phase: foundation
actions:
  - id: rep-1
    type: daily_rep
    label: Grounding rep
    required: true
  - label: Read chapter one
    type: reading
    resourceId: rr_atomic-habits
    resourceType: READ_REP
    optional: true
weeklyResources:
  - id: coach-1
    type: coaching
    label: Open office hours
"#;
        let entry: DailyPlanEntry = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(entry.day_number, 5);
        assert_eq!(entry.actions[0].action_type, "daily_rep");
        assert_eq!(entry.actions[0].required, Some(true));
        assert_eq!(entry.actions[1].required, None);
        assert_eq!(entry.actions[1].optional, Some(true));
        assert_eq!(
            entry.actions[1].resource_id.as_deref(),
            Some("rr_atomic-habits")
        );
        assert!(!entry.actions[1].hidden);
        assert_eq!(entry.weekly_resources[0].kind, "coaching");
    }
}
