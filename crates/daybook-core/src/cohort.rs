use crate::error::{DaybookError, Result};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Cohort
// ---------------------------------------------------------------------------

/// A group of users sharing one program start date.
///
/// `start_date` must not change once users are assigned: every member's day
/// number is derived from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cohort {
    pub id: String,
    pub name: String,
    #[serde(alias = "startDate")]
    pub start_date: DateTime<Utc>,
    /// Local offset in which calendar days are counted, e.g. `-05:00`.
    #[serde(default = "default_offset", alias = "utcOffset", alias = "timezone")]
    pub utc_offset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
}

fn default_offset() -> String {
    "+00:00".to_string()
}

impl Cohort {
    pub fn new(id: impl Into<String>, name: impl Into<String>, start_date: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            start_date,
            utc_offset: default_offset(),
            capacity: None,
        }
    }

    pub fn offset(&self) -> Result<FixedOffset> {
        parse_utc_offset(&self.utc_offset)
    }
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "cohortId")]
    pub cohort_id: Option<String>,
    /// Takes precedence over the cohort's start date when present.
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "startDate")]
    pub start_date: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(id: impl Into<String>, email: &str) -> Self {
        Self {
            id: id.into(),
            email: normalize_email(email),
            cohort_id: None,
            start_date: None,
        }
    }

    pub fn with_cohort(mut self, cohort_id: impl Into<String>) -> Self {
        self.cohort_id = Some(cohort_id.into());
        self
    }

    pub fn with_start_date(mut self, start: DateTime<Utc>) -> Self {
        self.start_date = Some(start);
        self
    }

    pub fn matches_email(&self, email: &str) -> bool {
        normalize_email(&self.email) == normalize_email(email)
    }
}

// ---------------------------------------------------------------------------
// EffectiveStart
// ---------------------------------------------------------------------------

/// The instant day 1 is counted from, with the offset that defines calendar
/// days for this user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveStart {
    pub start: DateTime<Utc>,
    pub offset: FixedOffset,
}

/// Resolve the user's start: their override if present, else the cohort's.
///
/// Both are read in the cohort's offset; `fallback_offset` applies only when
/// the user has an override and no cohort. Returns `None` when neither source
/// provides a start date.
pub fn effective_start(
    user: &User,
    cohort: Option<&Cohort>,
    fallback_offset: FixedOffset,
) -> Result<Option<EffectiveStart>> {
    let offset = match cohort {
        Some(c) => c.offset()?,
        None => fallback_offset,
    };
    let start = user.start_date.or(cohort.map(|c| c.start_date));
    Ok(start.map(|start| EffectiveStart { start, offset }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Emails are compared trimmed and lowercased everywhere.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Parse `Z`, `UTC`, `+HH:MM`, `-HH:MM`, or `+HHMM`.
pub fn parse_utc_offset(s: &str) -> Result<FixedOffset> {
    let invalid = || DaybookError::InvalidUtcOffset(s.to_string());
    let t = s.trim();
    if t.eq_ignore_ascii_case("z") || t.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }
    let (sign, rest) = match t.as_bytes().first() {
        Some(b'+') => (1, &t[1..]),
        Some(b'-') => (-1, &t[1..]),
        _ => return Err(invalid()),
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let hours: i32 = digits[..2].parse().map_err(|_| invalid())?;
    let minutes: i32 = digits[2..].parse().map_err(|_| invalid())?;
    if hours > 14 || minutes > 59 {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn parses_offsets() {
        assert_eq!(parse_utc_offset("Z").unwrap().local_minus_utc(), 0);
        assert_eq!(parse_utc_offset("utc").unwrap().local_minus_utc(), 0);
        assert_eq!(
            parse_utc_offset("-05:00").unwrap().local_minus_utc(),
            -5 * 3600
        );
        assert_eq!(
            parse_utc_offset("+0530").unwrap().local_minus_utc(),
            5 * 3600 + 30 * 60
        );
    }

    #[test]
    fn rejects_bad_offsets() {
        for s in ["", "05:00", "+5", "+25:00", "+05:75", "America/Chicago"] {
            assert!(parse_utc_offset(s).is_err(), "expected invalid: {s}");
        }
    }

    #[test]
    fn email_is_normalized_on_construction() {
        let user = User::new("u1", "  Ada@Example.COM ");
        assert_eq!(user.email, "ada@example.com");
        assert!(user.matches_email("ADA@example.com"));
    }

    #[test]
    fn user_override_beats_cohort() {
        let cohort_start = Utc.with_ymd_and_hms(2025, 1, 6, 5, 0, 0).unwrap();
        let override_start = Utc.with_ymd_and_hms(2025, 2, 3, 5, 0, 0).unwrap();
        let mut cohort = Cohort::new("c1", "Winter", cohort_start);
        cohort.utc_offset = "-05:00".to_string();
        let user = User::new("u1", "a@b.c")
            .with_cohort("c1")
            .with_start_date(override_start);

        let eff = effective_start(&user, Some(&cohort), utc()).unwrap().unwrap();
        assert_eq!(eff.start, override_start);
        assert_eq!(eff.offset.local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn no_cohort_no_override_is_none() {
        let user = User::new("u1", "a@b.c");
        assert!(effective_start(&user, None, utc()).unwrap().is_none());
    }

    #[test]
    fn override_without_cohort_uses_fallback_offset() {
        let start = Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 0).unwrap();
        let user = User::new("u1", "a@b.c").with_start_date(start);
        let fallback = FixedOffset::east_opt(3600).unwrap();
        let eff = effective_start(&user, None, fallback).unwrap().unwrap();
        assert_eq!(eff.offset, fallback);
    }

    #[test]
    fn cohort_accepts_camel_case_fields() {
        let yaml = "id: c1\nname: Winter\nstartDate: 2025-01-06T05:00:00Z\ntimezone: \"-05:00\"\n";
        let cohort: Cohort = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cohort.offset().unwrap().local_minus_utc(), -5 * 3600);
    }
}
