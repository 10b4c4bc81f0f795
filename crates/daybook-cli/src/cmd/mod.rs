pub mod catch_up;
pub mod check;
pub mod complete;
pub mod complete_day;
pub mod config;
pub mod content;
pub mod day;
pub mod init;
pub mod progress;
pub mod today;

use anyhow::Context;
use chrono::{DateTime, Utc};
use daybook_core::config::Config;
use daybook_core::store::FileStore;
use std::path::Path;

/// Open the file store and its config together.
pub fn open(root: &Path) -> anyhow::Result<(FileStore, Config)> {
    let store = FileStore::open(root).context("failed to open .daybook")?;
    let config = Config::load(root).context("failed to load config")?;
    Ok((store, config))
}

/// `--at` if given, else the wall clock shifted by
/// `schedule.clock_offset_seconds`.
pub fn as_of(config: &Config, at: Option<DateTime<Utc>>) -> anyhow::Result<DateTime<Utc>> {
    match at {
        Some(at) => Ok(at),
        None => config
            .schedule
            .effective_now(Utc::now())
            .context("invalid schedule.clock_offset_seconds"),
    }
}
