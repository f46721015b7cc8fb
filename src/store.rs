//! Storage layer for devtasks
//!
//! Persists the whole task collection for one project as a single JSON
//! document. No domain logic lives here.
//!
//! # Directory Structure
//!
//! ```text
//! <project>/
//!   .devtasks/                # Reserved directory (configurable)
//!     tasks.json              # Task document
//!     .gitignore              # Ignores lock and temp files
//!     tasks.json.lock         # Advisory lock for mutation cycles
//! ```
//!
//! Saves replace the whole file. Concurrent writers are last-writer-wins at
//! this layer; `TaskManager` serializes its own mutation cycles.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::lock;
use crate::task::{Task, TaskDocument};

/// File name of the task document inside the reserved directory
pub const DOCUMENT_FILE: &str = "tasks.json";

/// File name of the ignore file inside the reserved directory
pub const IGNORE_FILE: &str = ".gitignore";

/// Fixed content of the ignore file, written once
pub const IGNORE_CONTENT: &str = "# Written by devtasks. tasks.json is meant to be committed.\n*.lock\n.tmp*\n";

const FALLBACK_PROJECT_NAME: &str = "project";

/// Document storage for a single project root
#[derive(Debug, Clone)]
pub struct Store {
    project_root: PathBuf,
    config: StoreConfig,
}

impl Store {
    /// Create a store rooted at `project_root`
    pub fn new(project_root: impl Into<PathBuf>, config: StoreConfig) -> Self {
        Self {
            project_root: project_root.into(),
            config,
        }
    }

    // =========================================================================
    // Path accessors
    // =========================================================================

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Path to the reserved directory
    pub fn store_dir(&self) -> PathBuf {
        self.project_root.join(&self.config.dir)
    }

    /// Path to the task document
    pub fn document_path(&self) -> PathBuf {
        self.store_dir().join(DOCUMENT_FILE)
    }

    /// Path to the ignore file next to the document
    pub fn ignore_file_path(&self) -> PathBuf {
        self.store_dir().join(IGNORE_FILE)
    }

    /// Path to the advisory lock guarding mutation cycles
    pub fn lock_path(&self) -> PathBuf {
        self.store_dir().join(format!("{DOCUMENT_FILE}.lock"))
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Check whether the task document exists
    pub fn is_initialized(&self) -> bool {
        self.document_path().is_file()
    }

    /// Create the reserved directory and an empty document.
    ///
    /// Overwrites an existing document; callers check `is_initialized` first.
    pub fn initialize(&self, project_name: Option<String>) -> Result<TaskDocument> {
        fs::create_dir_all(self.store_dir())?;

        let project_name = project_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| self.default_project_name());

        let mut document = TaskDocument::empty(Some(project_name));
        self.save(&mut document)?;
        self.ensure_ignore_file()?;

        tracing::info!(
            path = %self.document_path().display(),
            project = document.project_name.as_deref().unwrap_or_default(),
            "initialized task store"
        );
        Ok(document)
    }

    fn ensure_ignore_file(&self) -> Result<bool> {
        let path = self.ignore_file_path();
        if path.exists() {
            return Ok(false);
        }
        fs::write(&path, IGNORE_CONTENT)?;
        Ok(true)
    }

    fn default_project_name(&self) -> String {
        let resolved = self
            .project_root
            .canonicalize()
            .unwrap_or_else(|_| self.project_root.clone());
        resolved
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| FALLBACK_PROJECT_NAME.to_string())
    }

    // =========================================================================
    // Document I/O
    // =========================================================================

    /// Read the whole document
    pub fn load(&self) -> Result<TaskDocument> {
        let path = self.document_path();
        if !path.is_file() {
            return Err(Error::NotInitialized(self.project_root.clone()));
        }
        let content = fs::read_to_string(&path)?;
        let document = serde_json::from_str(&content)
            .map_err(|source| Error::CorruptData { path: path.clone(), source })?;
        tracing::debug!(path = %path.display(), "loaded task document");
        Ok(document)
    }

    /// Stamp `last_updated` and replace the document on disk
    pub fn save(&self, document: &mut TaskDocument) -> Result<()> {
        document.last_updated = Utc::now();
        let json = serde_json::to_string_pretty(document)?;
        let path = self.document_path();
        lock::write_atomic(&path, json.as_bytes())?;
        tracing::debug!(
            path = %path.display(),
            tasks = document.tasks.len(),
            "saved task document"
        );
        Ok(())
    }

    /// Convenience: `load().tasks`
    pub fn get_tasks(&self) -> Result<Vec<Task>> {
        Ok(self.load()?.tasks)
    }

    /// Convenience: replace the task sequence of the current document
    pub fn save_tasks(&self, tasks: Vec<Task>) -> Result<()> {
        let mut document = self.load()?;
        document.tasks = tasks;
        self.save(&mut document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{TaskPriority, TaskStatus, DOCUMENT_VERSION};
    use tempfile::tempdir;

    fn store_in(root: &Path) -> Store {
        Store::new(root, StoreConfig::default())
    }

    #[test]
    fn uninitialized_store_reports_not_initialized() {
        let dir = tempdir().expect("tempdir");
        let store = store_in(dir.path());

        assert!(!store.is_initialized());
        let err = store.load().expect_err("load should fail");
        assert!(matches!(err, Error::NotInitialized(_)));
    }

    #[test]
    fn initialize_writes_document_and_ignore_file() {
        let dir = tempdir().expect("tempdir");
        let root = dir.path().join("my-app");
        fs::create_dir_all(&root).expect("create root");
        let store = store_in(&root);

        let document = store.initialize(None).expect("initialize");
        assert!(store.is_initialized());
        assert_eq!(document.version, DOCUMENT_VERSION);
        assert_eq!(document.project_name.as_deref(), Some("my-app"));
        assert!(document.tasks.is_empty());

        let ignore = fs::read_to_string(store.ignore_file_path()).expect("ignore file");
        assert_eq!(ignore, IGNORE_CONTENT);

        let loaded = store.load().expect("load");
        assert_eq!(loaded, document);
    }

    #[test]
    fn initialize_keeps_existing_ignore_file() {
        let dir = tempdir().expect("tempdir");
        let store = store_in(dir.path());
        fs::create_dir_all(store.store_dir()).expect("create dir");
        fs::write(store.ignore_file_path(), "custom\n").expect("write ignore");

        store.initialize(Some("Named".to_string())).expect("initialize");

        let ignore = fs::read_to_string(store.ignore_file_path()).expect("ignore file");
        assert_eq!(ignore, "custom\n");
        assert_eq!(
            store.load().expect("load").project_name.as_deref(),
            Some("Named")
        );
    }

    #[test]
    fn corrupt_document_is_reported() {
        let dir = tempdir().expect("tempdir");
        let store = store_in(dir.path());
        store.initialize(None).expect("initialize");
        fs::write(store.document_path(), "{ not json").expect("corrupt");

        let err = store.load().expect_err("corrupt");
        match err {
            Error::CorruptData { path, .. } => assert_eq!(path, store.document_path()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn save_refreshes_last_updated() {
        let dir = tempdir().expect("tempdir");
        let store = store_in(dir.path());
        let mut document = store.initialize(None).expect("initialize");
        let before = document.last_updated;

        std::thread::sleep(std::time::Duration::from_millis(5));
        store.save(&mut document).expect("save");
        assert!(document.last_updated > before);
        assert_eq!(store.load().expect("load").last_updated, document.last_updated);
    }

    #[test]
    fn save_tasks_round_trips_every_field() {
        let dir = tempdir().expect("tempdir");
        let store = store_in(dir.path());
        store.initialize(None).expect("initialize");

        let now = Utc::now();
        let tasks = vec![Task {
            id: "1".to_string(),
            title: "Ship it".to_string(),
            description: "All of it".to_string(),
            status: TaskStatus::Blocked,
            priority: TaskPriority::Low,
            dependencies: vec!["7".to_string()],
            subtasks: vec![crate::task::Subtask {
                id: "1".to_string(),
                title: "Step".to_string(),
                description: None,
                status: TaskStatus::Done,
                created_at: now,
                updated_at: now,
            }],
            details: Some("notes".to_string()),
            test_strategy: None,
            created_at: now,
            updated_at: now,
        }];

        store.save_tasks(tasks.clone()).expect("save tasks");
        assert_eq!(store.get_tasks().expect("get tasks"), tasks);
    }

    #[test]
    fn custom_store_dir_is_respected() {
        let dir = tempdir().expect("tempdir");
        let store = Store::new(
            dir.path(),
            StoreConfig {
                dir: "planning".to_string(),
                ..StoreConfig::default()
            },
        );
        store.initialize(None).expect("initialize");
        assert!(dir.path().join("planning").join(DOCUMENT_FILE).is_file());
    }
}
