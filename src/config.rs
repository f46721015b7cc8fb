//! Configuration loading and management
//!
//! Handles parsing of the optional `.devtasks.toml` file at the project root.

use serde::Deserialize;
use std::path::{Component, Path, PathBuf};

use crate::lock::DEFAULT_LOCK_TIMEOUT_MS;

/// Name of the configuration file at the project root
pub const CONFIG_FILE: &str = ".devtasks.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Task store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Checklist rendering configuration
    #[serde(default)]
    pub checklist: ChecklistConfig,
}

/// Task store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Reserved directory holding the task document, relative to the project root
    #[serde(default = "default_store_dir")]
    pub dir: String,

    /// How long a mutation waits for the document lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_store_dir() -> String {
    ".devtasks".to_string()
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: default_store_dir(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

/// Checklist rendering configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ChecklistConfig {
    /// Output path, relative to the project root
    #[serde(default = "default_checklist_path")]
    pub path: String,

    /// Render details and test strategy under each task
    #[serde(default)]
    pub include_details: bool,
}

fn default_checklist_path() -> String {
    "TASKS.md".to_string()
}

impl Default for ChecklistConfig {
    fn default() -> Self {
        Self {
            path: default_checklist_path(),
            include_details: false,
        }
    }
}

impl Config {
    /// Load configuration from a `.devtasks.toml` file
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the project root, or return defaults
    pub fn load_from_project(project_root: &Path) -> Self {
        let config_path = project_root.join(CONFIG_FILE);
        if !config_path.exists() {
            return Self::default();
        }
        match Self::load(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(
                    path = %config_path.display(),
                    error = %err,
                    "ignoring invalid config, using defaults"
                );
                Self::default()
            }
        }
    }

    /// Point the checklist at `path`, which must stay inside the project root
    pub fn set_checklist_path(&mut self, path: &str) -> crate::error::Result<()> {
        check_relative_path(path, "checklist output")
            .map_err(crate::error::Error::InvalidArgument)?;
        self.checklist.path = path.trim().to_string();
        Ok(())
    }

    /// Resolve the checklist output path against the project root
    pub fn checklist_path(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.checklist.path)
    }

    fn validate(&self) -> crate::error::Result<()> {
        check_relative_path(&self.store.dir, "store.dir")
            .map_err(crate::error::Error::InvalidConfig)?;
        if self.store.lock_timeout_ms == 0 {
            return Err(crate::error::Error::InvalidConfig(
                "store.lock_timeout_ms must be > 0".to_string(),
            ));
        }
        check_relative_path(&self.checklist.path, "checklist.path")
            .map_err(crate::error::Error::InvalidConfig)?;
        Ok(())
    }
}

/// Empty, absolute and `..` paths are rejected with a message naming `field`
fn check_relative_path(value: &str, field: &str) -> Result<(), String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("{field} cannot be empty"));
    }
    let escapes = Path::new(trimmed)
        .components()
        .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(format!(
            "{field} must be a relative path inside the project: '{trimmed}'"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_are_expected() {
        let cfg = Config::default();
        assert_eq!(cfg.store.dir, ".devtasks");
        assert_eq!(cfg.store.lock_timeout_ms, 5000);
        assert_eq!(cfg.checklist.path, "TASKS.md");
        assert!(!cfg.checklist.include_details);
    }

    #[test]
    fn load_parses_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        let content = r#"
[store]
dir = "planning/tasks"
lock_timeout_ms = 250

[checklist]
path = "docs/CHECKLIST.md"
include_details = true
"#;
        fs::write(&path, content.trim()).expect("write config");

        let cfg = Config::load(&path).expect("load config");
        assert_eq!(cfg.store.dir, "planning/tasks");
        assert_eq!(cfg.store.lock_timeout_ms, 250);
        assert_eq!(cfg.checklist.path, "docs/CHECKLIST.md");
        assert!(cfg.checklist.include_details);
        assert_eq!(
            cfg.checklist_path(dir.path()),
            dir.path().join("docs/CHECKLIST.md")
        );
    }

    #[test]
    fn escaping_store_dir_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[store]\ndir = \"../elsewhere\"").expect("write config");

        let err = Config::load(&path).expect_err("invalid config");
        match err {
            crate::error::Error::InvalidConfig(_) => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn zero_lock_timeout_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[store]\nlock_timeout_ms = 0").expect("write config");

        assert!(matches!(
            Config::load(&path),
            Err(crate::error::Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn load_from_project_defaults_when_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = Config::load_from_project(dir.path());
        assert_eq!(cfg.store.dir, ".devtasks");
    }

    #[test]
    fn checklist_override_must_stay_inside_the_project() {
        let mut cfg = Config::default();
        cfg.set_checklist_path(" docs/PLAN.md ").expect("relative path");
        assert_eq!(cfg.checklist.path, "docs/PLAN.md");

        for bad in ["../outside.md", "/tmp/outside.md", "docs/../../x.md", "  "] {
            match cfg.set_checklist_path(bad) {
                Err(crate::error::Error::InvalidArgument(message)) => {
                    assert!(message.contains("checklist output"), "{message}")
                }
                other => panic!("{bad}: unexpected result {other:?}"),
            }
        }
        assert_eq!(cfg.checklist.path, "docs/PLAN.md");
    }
}
