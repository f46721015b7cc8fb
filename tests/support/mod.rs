#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

use devtasks::config::StoreConfig;
use devtasks::{Store, TaskManager};

pub struct TestProject {
    dir: TempDir,
}

impl TestProject {
    /// Empty project directory without a task store
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        Self { dir }
    }

    /// Project directory with an initialized task store
    pub fn initialized() -> Self {
        let project = Self::new();
        project
            .manager()
            .initialize(Some("fixture".to_string()))
            .expect("initialize store");
        project
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn manager(&self) -> TaskManager {
        TaskManager::new(Store::new(self.dir.path(), StoreConfig::default()))
    }

    pub fn document_path(&self) -> PathBuf {
        self.dir.path().join(".devtasks").join("tasks.json")
    }

    pub fn write_file(&self, rel_path: &str, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn read_document(&self) -> Value {
        let contents = fs::read_to_string(self.document_path()).expect("read tasks.json");
        serde_json::from_str(&contents).expect("tasks.json is JSON")
    }

    /// `devtasks` pointed at this project, with tracing and env overrides cleared
    pub fn cmd(&self) -> Command {
        let mut cmd = devtasks_cmd();
        cmd.arg("--project").arg(self.dir.path());
        cmd
    }

    /// Run with `--json` and return the parsed success envelope
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self
            .cmd()
            .arg("--json")
            .args(args)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&output).expect("json envelope")
    }
}

pub fn devtasks_cmd() -> Command {
    let mut cmd = Command::cargo_bin("devtasks").expect("binary");
    cmd.env_remove("DEVTASKS_PROJECT");
    cmd.env_remove("RUST_LOG");
    cmd
}
