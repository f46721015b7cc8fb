//! devtasks checklist and extract commands.

use std::io::Read;
use std::path::PathBuf;

use crate::checklist::{render_checklist, write_checklist, ChecklistOptions as RenderOptions};
use crate::cli::initialized_manager;
use crate::config::Config;
use crate::error::Result;
use crate::extract::extract_task_titles;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::task::{NewTask, Task, TaskPriority};

pub struct ChecklistOptions {
    pub project: PathBuf,
    pub path: Option<String>,
    pub stdout: bool,
    pub output: OutputOptions,
}

pub struct ExtractOptions {
    pub project: PathBuf,
    pub file: Option<PathBuf>,
    pub create: bool,
    pub priority: Option<String>,
    pub output: OutputOptions,
}

#[derive(serde::Serialize)]
struct ChecklistReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    markdown: Option<String>,
    tasks: usize,
}

#[derive(serde::Serialize)]
struct ExtractReport {
    titles: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    created: Vec<Task>,
}

pub fn run_checklist(options: ChecklistOptions) -> Result<()> {
    let manager = initialized_manager(&options.project)?;
    let mut config = Config::load_from_project(&options.project);

    if options.stdout {
        let document = manager.document()?;
        let markdown = render_checklist(&document, RenderOptions::from(&config));
        if !options.output.json {
            print!("{markdown}");
            return Ok(());
        }
        let report = ChecklistReport {
            path: None,
            markdown: Some(markdown),
            tasks: document.tasks.len(),
        };
        return emit_success(options.output, "checklist", &report, None);
    }

    if let Some(path) = options.path.as_deref() {
        config.set_checklist_path(path)?;
    }
    let path = write_checklist(&manager, &config)?;
    let tasks = manager.get_tasks(None)?.len();

    let mut human = HumanOutput::new(format!("Wrote checklist to {}", path.display()));
    human.push_summary("Tasks", tasks.to_string());
    let report = ChecklistReport {
        path: Some(path),
        markdown: None,
        tasks,
    };
    emit_success(options.output, "checklist", &report, Some(&human))
}

pub fn run_extract(options: ExtractOptions) -> Result<()> {
    let text = match options.file.as_ref() {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };
    let titles = extract_task_titles(&text);

    let mut created = Vec::new();
    if options.create {
        let manager = initialized_manager(&options.project)?;
        let priority = options
            .priority
            .as_deref()
            .map(str::parse::<TaskPriority>)
            .transpose()?;
        for title in &titles {
            created.push(manager.create_task(NewTask {
                priority,
                ..NewTask::titled(title.clone())
            })?);
        }
    }

    let header = if options.create {
        format!("Created {} task(s)", created.len())
    } else {
        format!("Found {} task title(s)", titles.len())
    };
    let mut human = HumanOutput::new(header);
    if created.is_empty() {
        for title in &titles {
            human.push_detail(title.clone());
        }
        if !titles.is_empty() && !options.create {
            human.push_next_step("rerun with --create to add them");
        }
    } else {
        for task in &created {
            human.push_detail(format!("{} {}", task.id, task.title));
        }
    }

    let report = ExtractReport { titles, created };
    emit_success(options.output, "extract", &report, Some(&human))
}
