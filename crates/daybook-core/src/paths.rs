use crate::error::{DaybookError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const DAYBOOK_DIR: &str = ".daybook";
pub const COHORTS_DIR: &str = ".daybook/cohorts";
pub const USERS_DIR: &str = ".daybook/users";
pub const PLAN_DIR: &str = ".daybook/plan";
pub const CONTENT_DIR: &str = ".daybook/content";
pub const PROGRESS_DIR: &str = ".daybook/progress";

pub const CONFIG_FILE: &str = ".daybook/config.yaml";

pub const ACTION_PROGRESS_FILE: &str = "action_progress.yaml";
pub const DEV_PLAN_FILE: &str = "dev_plan.yaml";
pub const LEGACY_MODULES_FILE: &str = "legacy_modules.yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn daybook_dir(root: &Path) -> PathBuf {
    root.join(DAYBOOK_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn cohort_path(root: &Path, id: &str) -> PathBuf {
    root.join(COHORTS_DIR).join(format!("{id}.yaml"))
}

pub fn user_path(root: &Path, id: &str) -> PathBuf {
    root.join(USERS_DIR).join(format!("{id}.yaml"))
}

pub fn plan_path(root: &Path, doc_id: &str) -> PathBuf {
    root.join(PLAN_DIR).join(format!("{doc_id}.yaml"))
}

pub fn collection_dir(root: &Path, collection: &str) -> PathBuf {
    root.join(CONTENT_DIR).join(collection)
}

pub fn content_path(root: &Path, collection: &str, id: &str) -> PathBuf {
    collection_dir(root, collection).join(format!("{id}.yaml"))
}

pub fn progress_dir(root: &Path, user_id: &str) -> PathBuf {
    root.join(PROGRESS_DIR).join(user_id)
}

// ---------------------------------------------------------------------------
// Id validation
// ---------------------------------------------------------------------------

static ID_RE: OnceLock<Regex> = OnceLock::new();

fn id_re() -> &'static Regex {
    ID_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_\-]*$").unwrap())
}

/// Ids become file names in the file store, so they must not contain path
/// separators, dots, or whitespace.
pub fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() || id.len() > 128 || !id_re().is_match(id) {
        return Err(DaybookError::InvalidId(id.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
