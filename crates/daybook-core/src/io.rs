use crate::error::{DaybookError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::ffi::{OsStr, OsString};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;

const LOCK_ATTEMPTS: u32 = 100;
const LOCK_RETRY: Duration = Duration::from_millis(20);

/// Atomically write `data` to `path` using a tempfile in the same directory.
/// Readers never observe a half-written document.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Create a directory and all parents, idempotent.
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)?;
    Ok(())
}

/// Write a file only if it does not already exist. Returns true if written.
pub fn write_if_missing(path: &Path, data: &[u8]) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    atomic_write(path, data)?;
    Ok(true)
}

/// Read a YAML document, returning `None` when the file does not exist.
pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read_to_string(path)?;
    Ok(Some(serde_yaml::from_str(&data)?))
}

pub fn write_yaml<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let data = serde_yaml::to_string(value)?;
    atomic_write(path, data.as_bytes())
}

/// Load every `*.yaml` document in `dir`, sorted by file stem.
///
/// Returns `(stem, document)` pairs. A missing directory is an empty listing.
pub fn read_yaml_dir<T: DeserializeOwned>(dir: &Path) -> Result<Vec<(String, T)>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut docs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type()?.is_file() || path.extension() != Some(OsStr::new("yaml")) {
            continue;
        }
        let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };
        let data = std::fs::read_to_string(&path)?;
        docs.push((stem, serde_yaml::from_str(&data)?));
    }
    docs.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(docs)
}

/// Exclusive writer lock on a document: a sibling `<file>.lock` created with
/// `create_new`. Released when dropped.
#[derive(Debug)]
pub struct LockFile {
    path: PathBuf,
}

impl LockFile {
    /// Wait up to two seconds for `target`'s lock.
    pub fn acquire(target: &Path) -> Result<Self> {
        let mut name = OsString::from(target.as_os_str());
        name.push(".lock");
        let path = PathBuf::from(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        for attempt in 0..LOCK_ATTEMPTS {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(Self { path }),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if attempt == 0 {
                        tracing::debug!(path = %path.display(), "waiting for lock");
                    }
                    std::thread::sleep(LOCK_RETRY);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(DaybookError::Locked(path.display().to_string()))
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/c/test.yaml");
        atomic_write(&path, b"data").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "data");
    }

    #[test]
    fn write_if_missing_skips_existing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("existing.yaml");
        std::fs::write(&path, b"original").unwrap();
        assert!(!write_if_missing(&path, b"new").unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "original");
    }

    #[test]
    fn lock_is_exclusive_until_dropped() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("progress/ada/action_progress.yaml");
        let held = LockFile::acquire(&target).unwrap();
        assert!(dir.path().join("progress/ada/action_progress.yaml.lock").exists());
        assert!(matches!(
            LockFile::acquire(&target),
            Err(DaybookError::Locked(_))
        ));
        drop(held);
        assert!(!dir.path().join("progress/ada/action_progress.yaml.lock").exists());
        assert!(LockFile::acquire(&target).is_ok());
    }

    #[test]
    fn read_yaml_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let value: Option<Vec<String>> = read_yaml(&dir.path().join("nope.yaml")).unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn read_yaml_dir_sorts_and_skips_other_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.yaml"), "2").unwrap();
        std::fs::write(dir.path().join("a.yaml"), "1").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        let docs: Vec<(String, u32)> = read_yaml_dir(dir.path()).unwrap();
        assert_eq!(docs, vec![("a".to_string(), 1), ("b".to_string(), 2)]);
    }
}
