use crate::cohort::parse_utc_offset;
use crate::error::{DaybookError, Result};
use crate::paths;
use crate::types::{type_key, ProgressSource};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ScheduleConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Offset applied when a user has a start override but no cohort.
    #[serde(default = "default_utc_offset")]
    pub default_utc_offset: String,
    /// dayNumber of the onboarding entry served to pre-start users.
    #[serde(default)]
    pub onboarding_day: i64,
    #[serde(default = "default_days_per_week")]
    pub days_per_week: u32,
    /// Shift applied to the wall clock when the host does not pass an
    /// explicit as-of instant. Used to preview future program days.
    #[serde(default)]
    pub clock_offset_seconds: i64,
}

fn default_utc_offset() -> String {
    "+00:00".to_string()
}

fn default_days_per_week() -> u32 {
    7
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            default_utc_offset: default_utc_offset(),
            onboarding_day: 0,
            days_per_week: default_days_per_week(),
            clock_offset_seconds: 0,
        }
    }
}

/// Largest accepted `clock_offset_seconds` in either direction (100 years).
pub const MAX_CLOCK_OFFSET_SECONDS: i64 = 100 * 366 * 86_400;

fn clock_offset_in_range(seconds: i64) -> bool {
    seconds.unsigned_abs() <= MAX_CLOCK_OFFSET_SECONDS.unsigned_abs()
}

impl ScheduleConfig {
    pub fn effective_now(&self, wall_clock: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let out_of_range = || DaybookError::ClockOffsetOutOfRange(self.clock_offset_seconds);
        if !clock_offset_in_range(self.clock_offset_seconds) {
            return Err(out_of_range());
        }
        let shift = Duration::try_seconds(self.clock_offset_seconds).ok_or_else(out_of_range)?;
        wall_clock.checked_add_signed(shift).ok_or_else(out_of_range)
    }

    /// Week containing `day_number`; `None` for pre-start days.
    pub fn week_of(&self, day_number: i64) -> Option<u32> {
        if day_number < 1 {
            return None;
        }
        let per_week = i64::from(self.days_per_week.max(1));
        u32::try_from((day_number - 1) / per_week + 1).ok()
    }

    /// Inclusive dayNumber range covered by `week`.
    pub fn week_range(&self, week: u32) -> (i64, i64) {
        let per_week = i64::from(self.days_per_week.max(1));
        let first = (i64::from(week) - 1) * per_week + 1;
        (first, first + per_week - 1)
    }
}

// ---------------------------------------------------------------------------
// ContentConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    #[serde(default = "default_unified_collection")]
    pub unified_collection: String,
    /// Content type key -> legacy collections to probe, in priority order.
    #[serde(default = "default_legacy_collections")]
    pub legacy_collections: BTreeMap<String, Vec<String>>,
}

fn default_unified_collection() -> String {
    "content_library".to_string()
}

fn default_legacy_collections() -> BTreeMap<String, Vec<String>> {
    let mut m = BTreeMap::new();
    let mut add = |key: &str, cols: &[&str]| {
        m.insert(
            key.to_string(),
            cols.iter().map(|c| c.to_string()).collect::<Vec<_>>(),
        );
    };
    add("video", &["content_videos"]);
    add("document", &["content_documents", "content_readings"]);
    add("reading", &["content_readings", "content_documents"]);
    add("read_rep", &["content_readings"]);
    add("course", &["content_courses"]);
    add("community", &["content_community"]);
    add("coaching", &["content_coaching"]);
    add("daily_rep", &["content_daily_reps"]);
    m
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            unified_collection: default_unified_collection(),
            legacy_collections: default_legacy_collections(),
        }
    }
}

impl ContentConfig {
    pub fn legacy_for(&self, content_type: &str) -> &[String] {
        self.legacy_collections
            .get(&type_key(content_type))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Every collection the resolver may consult: unified first, then each
    /// legacy collection once, in first-mention order.
    pub fn all_collections(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = vec![self.unified_collection.clone()];
        seen.insert(self.unified_collection.clone());
        for cols in self.legacy_collections.values() {
            for c in cols {
                if seen.insert(c.clone()) {
                    out.push(c.clone());
                }
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// ActionsConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionsConfig {
    /// Habitual action types that never count toward the required total.
    #[serde(default = "default_uncounted_types")]
    pub uncounted_types: Vec<String>,
}

fn default_uncounted_types() -> Vec<String> {
    vec!["daily_rep".to_string()]
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            uncounted_types: default_uncounted_types(),
        }
    }
}

impl ActionsConfig {
    pub fn is_uncounted(&self, action_type: &str) -> bool {
        let key = type_key(action_type);
        self.uncounted_types.iter().any(|t| type_key(t) == key)
    }
}

// ---------------------------------------------------------------------------
// ProgressConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Stores consulted in order; the first with a record for an id wins.
    #[serde(default = "default_precedence")]
    pub precedence: Vec<ProgressSource>,
}

fn default_precedence() -> Vec<ProgressSource> {
    ProgressSource::all().to_vec()
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            precedence: default_precedence(),
        }
    }
}

// ---------------------------------------------------------------------------
// ProgramConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    pub program: ProgramConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub actions: ActionsConfig,
    #[serde(default)]
    pub progress: ProgressConfig,
}

fn default_version() -> u32 {
    1
}

impl Config {
    pub fn new(program_name: impl Into<String>) -> Self {
        Self {
            version: 1,
            program: ProgramConfig {
                name: program_name.into(),
                description: None,
            },
            schedule: ScheduleConfig::default(),
            content: ContentConfig::default(),
            actions: ActionsConfig::default(),
            progress: ProgressConfig::default(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(DaybookError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    /// Write a default config unless one exists. Returns true if written.
    pub fn init(root: &Path, program_name: &str) -> Result<bool> {
        let data = serde_yaml::to_string(&Self::new(program_name))?;
        crate::io::write_if_missing(&paths::config_path(root), data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut push = |level: WarnLevel, message: String| {
            warnings.push(ConfigWarning { level, message });
        };

        if parse_utc_offset(&self.schedule.default_utc_offset).is_err() {
            push(
                WarnLevel::Error,
                format!(
                    "schedule.default_utc_offset '{}' is not a valid offset",
                    self.schedule.default_utc_offset
                ),
            );
        }

        // A positive onboarding day would put pre-start users ahead of day 1.
        if self.schedule.onboarding_day > 0 {
            push(
                WarnLevel::Error,
                format!(
                    "schedule.onboarding_day {} must be zero or negative",
                    self.schedule.onboarding_day
                ),
            );
        }

        if !clock_offset_in_range(self.schedule.clock_offset_seconds) {
            push(
                WarnLevel::Error,
                format!(
                    "schedule.clock_offset_seconds {} is beyond +/-{MAX_CLOCK_OFFSET_SECONDS}",
                    self.schedule.clock_offset_seconds
                ),
            );
        }

        if self.schedule.days_per_week == 0 {
            push(
                WarnLevel::Error,
                "schedule.days_per_week must be at least 1".to_string(),
            );
        }

        if self.content.unified_collection.trim().is_empty() {
            push(
                WarnLevel::Error,
                "content.unified_collection is empty".to_string(),
            );
        }

        for (key, cols) in &self.content.legacy_collections {
            if cols.is_empty() {
                push(
                    WarnLevel::Warning,
                    format!("content.legacy_collections.{key} lists no collections"),
                );
            }
            if *key != type_key(key) {
                push(
                    WarnLevel::Warning,
                    format!(
                        "content.legacy_collections key '{key}' is not normalized; \
                         it will never match (use '{}')",
                        type_key(key)
                    ),
                );
            }
        }

        if self.progress.precedence.is_empty() {
            push(
                WarnLevel::Error,
                "progress.precedence is empty: no progress store would be read".to_string(),
            );
        }
        let mut seen = HashSet::new();
        for source in &self.progress.precedence {
            if !seen.insert(*source) {
                push(
                    WarnLevel::Warning,
                    format!("progress.precedence lists '{source}' more than once"),
                );
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::new("foundation");
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.program.name, "foundation");
        assert_eq!(parsed.content.unified_collection, "content_library");
        assert_eq!(parsed.progress.precedence, ProgressSource::all());
    }

    #[test]
    fn minimal_yaml_fills_defaults() {
        let yaml = "program:\n  name: foundation\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.version, 1);
        assert_eq!(cfg.schedule.days_per_week, 7);
        assert_eq!(cfg.schedule.onboarding_day, 0);
        assert_eq!(cfg.actions.uncounted_types, vec!["daily_rep"]);
        assert_eq!(cfg.content.legacy_for("VIDEO"), ["content_videos"]);
    }

    #[test]
    fn precedence_override_parses() {
        let yaml = r#"
program:
  name: foundation
progress:
  precedence: [dev_plan, action_progress]
"#;
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            cfg.progress.precedence,
            vec![ProgressSource::DevPlan, ProgressSource::ActionProgress]
        );
    }

    #[test]
    fn load_missing_is_not_initialized() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Config::load(dir.path()),
            Err(DaybookError::NotInitialized)
        ));
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::new("foundation");
        cfg.schedule.clock_offset_seconds = 86_400;
        cfg.save(dir.path()).unwrap();
        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.schedule.clock_offset_seconds, 86_400);
    }

    #[test]
    fn init_keeps_existing_config() {
        let dir = TempDir::new().unwrap();
        assert!(Config::init(dir.path(), "first").unwrap());
        assert!(!Config::init(dir.path(), "second").unwrap());
        assert_eq!(Config::load(dir.path()).unwrap().program.name, "first");
    }

    #[test]
    fn uncounted_types_match_loosely() {
        let cfg = ActionsConfig::default();
        assert!(cfg.is_uncounted("daily_rep"));
        assert!(cfg.is_uncounted("Daily-Rep"));
        assert!(!cfg.is_uncounted("video"));
    }

    #[test]
    fn week_math() {
        let s = ScheduleConfig::default();
        assert_eq!(s.week_of(0), None);
        assert_eq!(s.week_of(-3), None);
        assert_eq!(s.week_of(1), Some(1));
        assert_eq!(s.week_of(7), Some(1));
        assert_eq!(s.week_of(8), Some(2));
        assert_eq!(s.week_of(14), Some(2));
        assert_eq!(s.week_range(2), (8, 14));
    }

    #[test]
    fn effective_now_applies_offset() {
        let mut s = ScheduleConfig::default();
        s.clock_offset_seconds = 3 * 86_400;
        let now = Utc.with_ymd_and_hms(2025, 1, 6, 12, 0, 0).unwrap();
        assert_eq!(
            s.effective_now(now).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 9, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn huge_clock_offset_is_rejected_not_panicking() {
        let now = Utc.with_ymd_and_hms(2025, 1, 6, 12, 0, 0).unwrap();
        for secs in [i64::MAX, i64::MIN, MAX_CLOCK_OFFSET_SECONDS + 1] {
            let mut cfg = Config::new("test");
            cfg.schedule.clock_offset_seconds = secs;
            assert!(matches!(
                cfg.schedule.effective_now(now),
                Err(DaybookError::ClockOffsetOutOfRange(s)) if s == secs
            ));
            assert!(cfg
                .validate()
                .iter()
                .any(|w| w.level == WarnLevel::Error && w.message.contains("clock_offset_seconds")));
        }

        let mut s = ScheduleConfig::default();
        s.clock_offset_seconds = -MAX_CLOCK_OFFSET_SECONDS;
        assert!(s.effective_now(now).is_ok());
    }

    #[test]
    fn all_collections_dedupes() {
        let cfg = ContentConfig::default();
        let all = cfg.all_collections();
        assert_eq!(all[0], "content_library");
        let readings = all.iter().filter(|c| *c == "content_readings").count();
        assert_eq!(readings, 1);
    }

    #[test]
    fn validate_default_config_no_warnings() {
        assert!(Config::new("foundation").validate().is_empty());
    }

    #[test]
    fn validate_flags_bad_schedule() {
        let mut cfg = Config::new("foundation");
        cfg.schedule.default_utc_offset = "Mars/Olympus".to_string();
        cfg.schedule.onboarding_day = 3;
        cfg.schedule.days_per_week = 0;
        let warnings = cfg.validate();
        assert_eq!(
            warnings
                .iter()
                .filter(|w| w.level == WarnLevel::Error)
                .count(),
            3
        );
    }

    #[test]
    fn validate_flags_precedence_problems() {
        let mut cfg = Config::new("foundation");
        cfg.progress.precedence = vec![];
        assert!(cfg
            .validate()
            .iter()
            .any(|w| w.message.contains("precedence is empty")));

        cfg.progress.precedence = vec![ProgressSource::DevPlan, ProgressSource::DevPlan];
        assert!(cfg
            .validate()
            .iter()
            .any(|w| w.message.contains("more than once")));
    }

    #[test]
    fn validate_flags_unnormalized_legacy_key() {
        let mut cfg = Config::new("foundation");
        cfg.content
            .legacy_collections
            .insert("Video-Clip".to_string(), vec!["content_clips".to_string()]);
        assert!(cfg
            .validate()
            .iter()
            .any(|w| w.message.contains("'video_clip'")));
    }
}
