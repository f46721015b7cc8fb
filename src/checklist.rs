//! Markdown checklist derived from the task document.
//!
//! The checklist is a regenerable view; `tasks.json` stays authoritative.

use std::path::PathBuf;

use crate::config::Config;
use crate::error::Result;
use crate::lock;
use crate::manager::TaskManager;
use crate::task::{Task, TaskDocument, TaskStats, TaskStatus};

#[derive(Debug, Clone, Copy, Default)]
pub struct ChecklistOptions {
    /// Render details and test strategy under each task
    pub include_details: bool,
}

impl From<&Config> for ChecklistOptions {
    fn from(config: &Config) -> Self {
        Self {
            include_details: config.checklist.include_details,
        }
    }
}

pub fn render_checklist(document: &TaskDocument, options: ChecklistOptions) -> String {
    let mut lines = Vec::new();
    let title = document.project_name.as_deref().unwrap_or("Project");
    lines.push(format!("# {title} Tasks"));
    lines.push(String::new());

    let stats = TaskStats::from_tasks(&document.tasks);
    lines.push(format!(
        "Progress: {}/{} done ({}%)",
        stats.done, stats.total, stats.completion_percentage
    ));
    lines.push(format!(
        "Last updated: {}",
        document.last_updated.format("%Y-%m-%d %H:%M UTC")
    ));
    lines.push(String::new());

    if document.tasks.is_empty() {
        lines.push("_No tasks yet._".to_string());
    }

    for task in &document.tasks {
        push_task(&mut lines, task, options);
    }

    let mut rendered = lines.join("\n");
    rendered.push('\n');
    rendered
}

/// Render the checklist and write it to the configured path
pub fn write_checklist(manager: &TaskManager, config: &Config) -> Result<PathBuf> {
    let document = manager.document()?;
    let rendered = render_checklist(&document, ChecklistOptions::from(config));
    let path = config.checklist_path(manager.store().project_root());
    lock::write_atomic_str(&path, &rendered)?;
    tracing::info!(path = %path.display(), tasks = document.tasks.len(), "wrote checklist");
    Ok(path)
}

fn push_task(lines: &mut Vec<String>, task: &Task, options: ChecklistOptions) {
    lines.push(format!(
        "- {} **{}. {}** ({}, {})",
        checkbox(task.status),
        task.id,
        task.title,
        task.priority,
        task.status
    ));
    if !task.description.trim().is_empty() {
        lines.push(format!("  {}", task.description.trim()));
    }
    if !task.dependencies.is_empty() {
        lines.push(format!("  - Depends on: {}", task.dependencies.join(", ")));
    }
    if options.include_details {
        if let Some(details) = task.details.as_deref() {
            push_block(lines, "Details", details);
        }
        if let Some(strategy) = task.test_strategy.as_deref() {
            push_block(lines, "Test strategy", strategy);
        }
    }
    for subtask in &task.subtasks {
        let mut line = format!(
            "  - {} {}.{} {}",
            checkbox(subtask.status),
            task.id,
            subtask.id,
            subtask.title
        );
        if !matches!(subtask.status, TaskStatus::Pending | TaskStatus::Done) {
            line.push_str(&format!(" ({})", subtask.status));
        }
        lines.push(line);
    }
}

fn push_block(lines: &mut Vec<String>, label: &str, text: &str) {
    let mut body = text.lines().map(str::trim).filter(|line| !line.is_empty());
    let Some(first) = body.next() else {
        return;
    };
    lines.push(format!("  - {label}: {first}"));
    for line in body {
        lines.push(format!("    {line}"));
    }
}

fn checkbox(status: TaskStatus) -> &'static str {
    if status == TaskStatus::Done {
        "[x]"
    } else {
        "[ ]"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Subtask, TaskPriority};
    use chrono::{TimeZone, Utc};

    fn document() -> TaskDocument {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        TaskDocument {
            version: "1.0".to_string(),
            project_name: Some("demo".to_string()),
            tasks: vec![
                Task {
                    id: "1".to_string(),
                    title: "Set up CI".to_string(),
                    description: String::new(),
                    status: TaskStatus::Done,
                    priority: TaskPriority::High,
                    dependencies: Vec::new(),
                    subtasks: Vec::new(),
                    details: Some("Use the shared runner\nCache cargo".to_string()),
                    test_strategy: None,
                    created_at: at,
                    updated_at: at,
                },
                Task {
                    id: "2".to_string(),
                    title: "Release".to_string(),
                    description: "Cut 1.0".to_string(),
                    status: TaskStatus::InProgress,
                    priority: TaskPriority::Medium,
                    dependencies: vec!["1".to_string()],
                    subtasks: vec![
                        Subtask {
                            id: "1".to_string(),
                            title: "Changelog".to_string(),
                            description: None,
                            status: TaskStatus::Done,
                            created_at: at,
                            updated_at: at,
                        },
                        Subtask {
                            id: "2".to_string(),
                            title: "Tag".to_string(),
                            description: None,
                            status: TaskStatus::Blocked,
                            created_at: at,
                            updated_at: at,
                        },
                    ],
                    details: None,
                    test_strategy: None,
                    created_at: at,
                    updated_at: at,
                },
            ],
            last_updated: at,
        }
    }

    #[test]
    fn renders_tasks_and_subtasks() {
        let rendered = render_checklist(&document(), ChecklistOptions::default());

        assert!(rendered.starts_with("# demo Tasks\n"));
        assert!(rendered.contains("Progress: 1/2 done (50%)"));
        assert!(rendered.contains("Last updated: 2024-05-01 12:30 UTC"));
        assert!(rendered.contains("- [x] **1. Set up CI** (high, done)"));
        assert!(rendered.contains("- [ ] **2. Release** (medium, in-progress)"));
        assert!(rendered.contains("  Cut 1.0"));
        assert!(rendered.contains("  - Depends on: 1"));
        assert!(rendered.contains("  - [x] 2.1 Changelog\n"));
        assert!(rendered.contains("  - [ ] 2.2 Tag (blocked)"));
        assert!(!rendered.contains("Details"));
    }

    #[test]
    fn details_render_when_enabled() {
        let rendered = render_checklist(
            &document(),
            ChecklistOptions {
                include_details: true,
            },
        );
        assert!(rendered.contains("  - Details: Use the shared runner\n    Cache cargo"));
    }

    #[test]
    fn empty_document_renders_placeholder() {
        let mut doc = document();
        doc.tasks.clear();
        let rendered = render_checklist(&doc, ChecklistOptions::default());
        assert!(rendered.contains("Progress: 0/0 done (0%)"));
        assert!(rendered.contains("_No tasks yet._"));
    }
}
