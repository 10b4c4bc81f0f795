use crate::error::DaybookError;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// ProgressStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    #[serde(alias = "pending", alias = "not-started")]
    NotStarted,
    #[serde(alias = "in-progress")]
    InProgress,
    Completed,
    Skipped,
}

impl ProgressStatus {
    pub fn all() -> &'static [ProgressStatus] {
        &[
            ProgressStatus::NotStarted,
            ProgressStatus::InProgress,
            ProgressStatus::Completed,
            ProgressStatus::Skipped,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProgressStatus::NotStarted => "not_started",
            ProgressStatus::InProgress => "in_progress",
            ProgressStatus::Completed => "completed",
            ProgressStatus::Skipped => "skipped",
        }
    }

    /// Tie-break order for records carrying the same timestamp.
    pub fn rank(self) -> u8 {
        match self {
            ProgressStatus::NotStarted => 0,
            ProgressStatus::Skipped => 1,
            ProgressStatus::InProgress => 2,
            ProgressStatus::Completed => 3,
        }
    }

    pub fn is_completed(self) -> bool {
        self == ProgressStatus::Completed
    }
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProgressStatus {
    type Err = DaybookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" | "not-started" | "pending" => Ok(ProgressStatus::NotStarted),
            "in_progress" | "in-progress" => Ok(ProgressStatus::InProgress),
            "completed" => Ok(ProgressStatus::Completed),
            "skipped" => Ok(ProgressStatus::Skipped),
            _ => Err(DaybookError::InvalidStatus(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// ProgressSource
// ---------------------------------------------------------------------------

/// One of the independent stores a user's completion state is scattered across.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressSource {
    /// Per-action records, the freshest store in normal operation.
    ActionProgress,
    /// Per-day progress map embedded in the development-plan document.
    DevPlan,
    /// Per-week module blobs from the oldest schema.
    LegacyModules,
}

impl ProgressSource {
    pub fn all() -> &'static [ProgressSource] {
        &[
            ProgressSource::ActionProgress,
            ProgressSource::DevPlan,
            ProgressSource::LegacyModules,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProgressSource::ActionProgress => "action_progress",
            ProgressSource::DevPlan => "dev_plan",
            ProgressSource::LegacyModules => "legacy_modules",
        }
    }
}

impl fmt::Display for ProgressSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ProgramState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgramState {
    /// No effective start date could be resolved (no cohort, no override).
    Unassigned,
    /// The start date lies in the future; the onboarding entry is served.
    PreStart,
    Active,
}

impl fmt::Display for ProgramState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProgramState::Unassigned => "unassigned",
            ProgramState::PreStart => "pre_start",
            ProgramState::Active => "active",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Type keys
// ---------------------------------------------------------------------------

/// Canonical form for free-form type strings: `"Daily-Rep"`, `"DAILY_REP"`
/// and `" daily_rep "` all compare equal.
pub fn type_key(s: &str) -> String {
    s.trim().to_ascii_lowercase().replace(['-', ' '], "_")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
