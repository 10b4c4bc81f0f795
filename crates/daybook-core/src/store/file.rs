use super::{sort_entries, ContentStore, DirectoryStore, PlanStore, ProgressStore};
use crate::cohort::{normalize_email, Cohort, User};
use crate::content::ContentDocument;
use crate::error::{DaybookError, Result};
use crate::io;
use crate::paths;
use crate::plan::DailyPlanEntry;
use crate::progress::{ActionProgress, DevPlanProgress, LegacyModuleState};
use crate::types::ProgressStatus;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// YAML documents under `<root>/.daybook/`, one file per record.
///
/// ```text
/// .daybook/
///   config.yaml
///   cohorts/<id>.yaml
///   users/<id>.yaml
///   plan/<doc id>.yaml
///   content/<collection>/<id>.yaml
///   progress/<user id>/{action_progress,dev_plan,legacy_modules}.yaml
/// ```
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open an initialized project root.
    pub fn open(root: &Path) -> Result<Self> {
        if !paths::daybook_dir(root).is_dir() {
            return Err(DaybookError::NotInitialized);
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Create the directory skeleton. Idempotent.
    pub fn init(root: &Path) -> Result<Self> {
        for dir in [
            paths::COHORTS_DIR,
            paths::USERS_DIR,
            paths::PLAN_DIR,
            paths::CONTENT_DIR,
            paths::PROGRESS_DIR,
        ] {
            io::ensure_dir(&root.join(dir))?;
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn put_user(&self, user: &User) -> Result<()> {
        paths::validate_id(&user.id)?;
        io::write_yaml(&paths::user_path(&self.root, &user.id), user)
    }

    pub fn put_cohort(&self, cohort: &Cohort) -> Result<()> {
        paths::validate_id(&cohort.id)?;
        io::write_yaml(&paths::cohort_path(&self.root, &cohort.id), cohort)
    }

    pub fn put_plan_entry(&self, entry: &DailyPlanEntry) -> Result<()> {
        paths::validate_id(&entry.id)?;
        io::write_yaml(&paths::plan_path(&self.root, &entry.id), entry)
    }

    pub fn put_content(&self, collection: &str, doc: &ContentDocument) -> Result<()> {
        paths::validate_id(collection)?;
        paths::validate_id(&doc.id)?;
        io::write_yaml(&paths::content_path(&self.root, collection, &doc.id), doc)
    }

    pub fn put_dev_plan(&self, user_id: &str, progress: &DevPlanProgress) -> Result<()> {
        io::write_yaml(&self.progress_file(user_id, paths::DEV_PLAN_FILE)?, progress)
    }

    pub fn put_legacy_modules(&self, user_id: &str, state: &LegacyModuleState) -> Result<()> {
        io::write_yaml(
            &self.progress_file(user_id, paths::LEGACY_MODULES_FILE)?,
            state,
        )
    }

    fn progress_file(&self, user_id: &str, file: &str) -> Result<PathBuf> {
        paths::validate_id(user_id)?;
        Ok(paths::progress_dir(&self.root, user_id).join(file))
    }
}

impl DirectoryStore for FileStore {
    fn get_user(&self, id: &str) -> Result<Option<User>> {
        if paths::validate_id(id).is_err() {
            return Ok(None);
        }
        io::read_yaml(&paths::user_path(&self.root, id))
    }

    fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = normalize_email(email);
        Ok(self
            .list_users()?
            .into_iter()
            .find(|u| u.matches_email(&email)))
    }

    fn get_cohort(&self, id: &str) -> Result<Option<Cohort>> {
        if paths::validate_id(id).is_err() {
            return Ok(None);
        }
        io::read_yaml(&paths::cohort_path(&self.root, id))
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let docs: Vec<(String, User)> = io::read_yaml_dir(&self.root.join(paths::USERS_DIR))?;
        Ok(docs.into_iter().map(|(_, u)| u).collect())
    }
}

impl PlanStore for FileStore {
    fn daily_plan_by_day_number(&self, day: i64) -> Result<Vec<DailyPlanEntry>> {
        Ok(self
            .all_entries()?
            .into_iter()
            .filter(|e| e.day_number == day)
            .collect())
    }

    fn all_entries(&self) -> Result<Vec<DailyPlanEntry>> {
        let docs: Vec<(String, DailyPlanEntry)> =
            io::read_yaml_dir(&self.root.join(paths::PLAN_DIR))?;
        let mut entries: Vec<DailyPlanEntry> = docs.into_iter().map(|(_, e)| e).collect();
        sort_entries(&mut entries);
        Ok(entries)
    }
}

impl ContentStore for FileStore {
    fn get_content(&self, collection: &str, id: &str) -> Result<Option<ContentDocument>> {
        if paths::validate_id(collection).is_err() || paths::validate_id(id).is_err() {
            return Ok(None);
        }
        io::read_yaml(&paths::content_path(&self.root, collection, id))
    }

    fn list_collection(&self, collection: &str) -> Result<Vec<ContentDocument>> {
        if paths::validate_id(collection).is_err() {
            return Ok(Vec::new());
        }
        let docs: Vec<(String, ContentDocument)> =
            io::read_yaml_dir(&paths::collection_dir(&self.root, collection))?;
        Ok(docs.into_iter().map(|(_, d)| d).collect())
    }
}

impl ProgressStore for FileStore {
    fn action_progress(&self, user_id: &str) -> Result<Vec<ActionProgress>> {
        let path = self.progress_file(user_id, paths::ACTION_PROGRESS_FILE)?;
        Ok(io::read_yaml(&path)?.unwrap_or_default())
    }

    fn dev_plan_progress(&self, user_id: &str) -> Result<DevPlanProgress> {
        let path = self.progress_file(user_id, paths::DEV_PLAN_FILE)?;
        Ok(io::read_yaml(&path)?.unwrap_or_default())
    }

    fn legacy_module_state(&self, user_id: &str) -> Result<LegacyModuleState> {
        let path = self.progress_file(user_id, paths::LEGACY_MODULES_FILE)?;
        Ok(io::read_yaml(&path)?.unwrap_or_default())
    }

    fn record_completion(
        &mut self,
        user_id: &str,
        action_id: &str,
        status: ProgressStatus,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let path = self.progress_file(user_id, paths::ACTION_PROGRESS_FILE)?;
        let _lock = io::LockFile::acquire(&path)?;
        let mut records: Vec<ActionProgress> = io::read_yaml(&path)?.unwrap_or_default();
        records.push(ActionProgress::new(action_id, status, at));
        io::write_yaml(&path, &records)
    }

    fn update_dev_plan(
        &mut self,
        user_id: &str,
        edit: &mut dyn FnMut(&mut DevPlanProgress),
    ) -> Result<DevPlanProgress> {
        let path = self.progress_file(user_id, paths::DEV_PLAN_FILE)?;
        let _lock = io::LockFile::acquire(&path)?;
        let mut plan: DevPlanProgress = io::read_yaml(&path)?.unwrap_or_default();
        edit(&mut plan);
        io::write_yaml(&path, &plan)?;
        Ok(plan)
    }
}
