use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaybookError {
    #[error("not initialized: run 'daybook init'")]
    NotInitialized,

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("cohort not found: {0}")]
    CohortNotFound(String),

    #[error("content not found: {content_type} '{id}'")]
    ContentNotFound { content_type: String, id: String },

    #[error("ambiguous day {day_number}: claimed by documents {}", document_ids.join(", "))]
    AmbiguousDay {
        day_number: i64,
        document_ids: Vec<String>,
    },

    #[error("no plan document is scheduled for day {0}")]
    DayNotScheduled(i64),

    #[error("invalid utc offset '{0}': expected Z, UTC, or +HH:MM")]
    InvalidUtcOffset(String),

    #[error("invalid id '{0}': must be alphanumeric with '-' or '_'")]
    InvalidId(String),

    #[error("invalid progress status: {0}")]
    InvalidStatus(String),

    #[error("invalid day id '{0}': expected day-NNN")]
    InvalidDayId(String),

    #[error("clock offset {0}s is out of range")]
    ClockOffsetOutOfRange(i64),

    #[error("{0} is held by another writer (remove it if no daybook process is running)")]
    Locked(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DaybookError>;
