//! devtasks init command implementation
//!
//! Creates the reserved directory, the empty task document and its
//! ignore file.

use std::path::PathBuf;

use crate::config::CONFIG_FILE;
use crate::error::{Error, Result};
use crate::manager::TaskManager;
use crate::output::{emit_success, HumanOutput, OutputOptions};

pub struct InitOptions {
    pub project: PathBuf,
    pub name: Option<String>,
    pub force: bool,
    pub output: OutputOptions,
}

#[derive(serde::Serialize)]
struct InitReport {
    project: PathBuf,
    project_name: Option<String>,
    document: PathBuf,
    reinitialized: bool,
}

pub fn run(options: InitOptions) -> Result<()> {
    if !options.project.is_dir() {
        return Err(Error::InvalidArgument(format!(
            "project directory does not exist: {}",
            options.project.display()
        )));
    }

    let manager = TaskManager::for_project(&options.project);
    let reinitialized = manager.is_initialized();
    if reinitialized && !options.force {
        return Err(Error::AlreadyInitialized(options.project));
    }

    let document = manager.initialize(options.name)?;
    let report = InitReport {
        project: options.project.clone(),
        project_name: document.project_name.clone(),
        document: manager.store().document_path(),
        reinitialized,
    };

    let header = if reinitialized {
        "devtasks init: reinitialized task store"
    } else {
        "devtasks init: initialized task store"
    };
    let mut human = HumanOutput::new(header);
    human.push_summary("project", options.project.display().to_string());
    human.push_summary(
        "name",
        document.project_name.clone().unwrap_or_default(),
    );
    human.push_summary("document", report.document.display().to_string());
    if reinitialized {
        human.push_warning("existing tasks were discarded");
    }
    if !options.project.join(CONFIG_FILE).exists() {
        human.push_detail(format!("optional settings go in {CONFIG_FILE}"));
    }
    human.push_next_step("devtasks add \"<title>\"");
    human.push_next_step("devtasks extract --file <notes.md> --create");

    emit_success(options.output, "init", &report, Some(&human))
}
