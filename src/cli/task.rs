//! devtasks task command implementations.

use std::path::PathBuf;

use crate::cli::initialized_manager;
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::task::{
    NewSubtask, NewTask, StatusFilter, Task, TaskFilter, TaskPriority, TaskRef, TaskStatus,
    TaskUpdate,
};

pub struct ListOptions {
    pub project: PathBuf,
    pub status: Vec<String>,
    pub priority: Option<String>,
    pub output: OutputOptions,
}

pub struct ShowOptions {
    pub project: PathBuf,
    pub id: String,
    pub output: OutputOptions,
}

pub struct AddOptions {
    pub project: PathBuf,
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub depends_on: Vec<String>,
    pub details: Option<String>,
    pub test_strategy: Option<String>,
    pub output: OutputOptions,
}

pub struct UpdateOptions {
    pub project: PathBuf,
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub depends_on: Vec<String>,
    pub clear_deps: bool,
    pub details: Option<String>,
    pub test_strategy: Option<String>,
    pub output: OutputOptions,
}

pub struct RmOptions {
    pub project: PathBuf,
    pub id: String,
    pub output: OutputOptions,
}

pub struct StatusOptions {
    pub project: PathBuf,
    pub id: String,
    pub status: String,
    pub output: OutputOptions,
}

pub struct SubtaskOptions {
    pub project: PathBuf,
    pub task_id: String,
    pub title: String,
    pub description: Option<String>,
    pub output: OutputOptions,
}

#[derive(serde::Serialize)]
struct ListReport {
    total: usize,
    tasks: Vec<Task>,
}

#[derive(serde::Serialize)]
struct ShowReport {
    task: TaskRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent: Option<Task>,
}

#[derive(serde::Serialize)]
struct RmReport {
    id: String,
    deleted: bool,
}

#[derive(serde::Serialize)]
struct NextReport {
    task: Option<Task>,
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let manager = initialized_manager(&options.project)?;
    let filter = build_filter(&options.status, options.priority.as_deref())?;
    let tasks = manager.get_tasks(filter.as_ref())?;

    let mut human = HumanOutput::new(format!("Tasks ({})", tasks.len()));
    for task in &tasks {
        human.push_detail(format_task_line(task));
    }
    if tasks.is_empty() {
        human.push_next_step("devtasks add \"<title>\"");
    }

    let report = ListReport {
        total: tasks.len(),
        tasks,
    };
    emit_success(options.output, "list", &report, Some(&human))
}

pub fn run_show(options: ShowOptions) -> Result<()> {
    let manager = initialized_manager(&options.project)?;
    let task = manager
        .get_task(&options.id)?
        .ok_or_else(|| Error::TaskNotFound(options.id.trim().to_string()))?;

    let parent = match &task {
        TaskRef::Task(_) => None,
        TaskRef::Subtask { .. } => manager.get_parent_task(&options.id)?,
    };

    let mut human = HumanOutput::new(format!("{} {}", task.display_id(), task.title()));
    human.push_summary("Status", task.status().to_string());
    match &task {
        TaskRef::Task(task) => push_task_summary(&mut human, task),
        TaskRef::Subtask { subtask, .. } => {
            if let Some(parent) = parent.as_ref() {
                human.push_summary("Parent", format!("{} {}", parent.id, parent.title));
            }
            if let Some(description) = subtask.description.as_deref() {
                human.push_summary("Description", description);
            }
        }
    }
    human.push_summary("Updated", task.updated_at().to_rfc3339());

    let report = ShowReport { task, parent };
    emit_success(options.output, "show", &report, Some(&human))
}

pub fn run_add(options: AddOptions) -> Result<()> {
    let manager = initialized_manager(&options.project)?;
    let input = NewTask {
        title: options.title,
        description: options.description,
        status: parse_status_opt(options.status.as_deref())?,
        priority: parse_priority_opt(options.priority.as_deref())?,
        dependencies: options.depends_on,
        details: options.details,
        test_strategy: options.test_strategy,
    };
    let task = manager.create_task(input)?;

    let mut human = HumanOutput::new(format!("Created task {}", task.id));
    push_task_summary(&mut human, &task);
    push_dangling_warnings(&mut human, &manager.get_tasks(None)?, &task);

    emit_success(options.output, "add", &task, Some(&human))
}

pub fn run_update(options: UpdateOptions) -> Result<()> {
    let manager = initialized_manager(&options.project)?;
    let dependencies = if options.clear_deps {
        Some(Vec::new())
    } else if options.depends_on.is_empty() {
        None
    } else {
        Some(options.depends_on)
    };
    let update = TaskUpdate {
        title: options.title,
        description: options.description,
        status: parse_status_opt(options.status.as_deref())?,
        priority: parse_priority_opt(options.priority.as_deref())?,
        dependencies,
        details: options.details,
        test_strategy: options.test_strategy,
    };
    if update.is_empty() {
        return Err(Error::InvalidArgument(
            "nothing to update (pass at least one field flag)".to_string(),
        ));
    }

    let task = manager
        .update_task(&options.id, update)?
        .ok_or_else(|| Error::TaskNotFound(options.id.trim().to_string()))?;

    let mut human = HumanOutput::new(format!("Updated task {}", task.id));
    push_task_summary(&mut human, &task);
    push_dangling_warnings(&mut human, &manager.get_tasks(None)?, &task);

    emit_success(options.output, "update", &task, Some(&human))
}

pub fn run_rm(options: RmOptions) -> Result<()> {
    let manager = initialized_manager(&options.project)?;
    let id = options.id.trim().to_string();
    if !manager.delete_task(&id)? {
        return Err(Error::TaskNotFound(id));
    }

    let mut human = HumanOutput::new(format!("Deleted task {id}"));
    human.push_detail("removed from every dependency list");
    let report = RmReport { id, deleted: true };
    emit_success(options.output, "rm", &report, Some(&human))
}

pub fn run_status(options: StatusOptions) -> Result<()> {
    let manager = initialized_manager(&options.project)?;
    let status: TaskStatus = options.status.parse()?;
    let changed = manager
        .set_status(&options.id, status)?
        .ok_or_else(|| Error::TaskNotFound(options.id.trim().to_string()))?;

    let mut human = HumanOutput::new(format!(
        "{} {} -> {}",
        changed.display_id(),
        changed.title(),
        changed.status()
    ));
    if status == TaskStatus::Done {
        human.push_next_step("devtasks next");
    }
    emit_success(options.output, "status", &changed, Some(&human))
}

pub fn run_subtask(options: SubtaskOptions) -> Result<()> {
    let manager = initialized_manager(&options.project)?;
    let task_id = options.task_id.trim().to_string();
    let subtask = manager
        .add_subtask(
            &task_id,
            NewSubtask {
                title: options.title,
                description: options.description,
            },
        )?
        .ok_or_else(|| Error::TaskNotFound(task_id.clone()))?;

    let human = HumanOutput::new(format!(
        "Added subtask {task_id}.{} {}",
        subtask.id, subtask.title
    ));
    emit_success(options.output, "subtask", &subtask, Some(&human))
}

pub fn run_next(project: PathBuf, output: OutputOptions) -> Result<()> {
    let manager = initialized_manager(&project)?;
    let task = manager.get_next_task()?;

    let human = match task.as_ref() {
        Some(task) => {
            let mut human = HumanOutput::new(format!("Next: {} {}", task.id, task.title));
            push_task_summary(&mut human, task);
            if task.status != TaskStatus::InProgress {
                human.push_next_step(format!("devtasks status {} in-progress", task.id));
            }
            human
        }
        None => {
            let mut human = HumanOutput::new("No task is ready to work on");
            human.push_next_step("devtasks list --status blocked");
            human
        }
    };

    emit_success(output, "next", &NextReport { task }, Some(&human))
}

pub fn run_stats(project: PathBuf, output: OutputOptions) -> Result<()> {
    let manager = initialized_manager(&project)?;
    let stats = manager.get_stats()?;

    let mut human = HumanOutput::new("Task stats");
    human.push_summary("Total", stats.total.to_string());
    for status in TaskStatus::all() {
        human.push_summary(status.as_str(), stats.count(*status).to_string());
    }
    human.push_summary("Complete", format!("{}%", stats.completion_percentage));

    emit_success(output, "stats", &stats, Some(&human))
}

fn build_filter(statuses: &[String], priority: Option<&str>) -> Result<Option<TaskFilter>> {
    let statuses = statuses
        .iter()
        .map(|value| value.parse::<TaskStatus>())
        .collect::<Result<Vec<_>>>()?;
    let priority = parse_priority_opt(priority)?;

    if statuses.is_empty() && priority.is_none() {
        return Ok(None);
    }
    let status = match statuses.len() {
        0 => None,
        1 => Some(StatusFilter::One(statuses[0])),
        _ => Some(StatusFilter::Any(statuses)),
    };
    Ok(Some(TaskFilter { status, priority }))
}

fn parse_status_opt(value: Option<&str>) -> Result<Option<TaskStatus>> {
    value.map(str::parse::<TaskStatus>).transpose()
}

fn parse_priority_opt(value: Option<&str>) -> Result<Option<TaskPriority>> {
    value.map(str::parse::<TaskPriority>).transpose()
}

fn format_task_line(task: &Task) -> String {
    let mut line = format!(
        "{} [{}] {} ({})",
        task.id, task.status, task.title, task.priority
    );
    if !task.subtasks.is_empty() {
        let done = task
            .subtasks
            .iter()
            .filter(|subtask| subtask.status == TaskStatus::Done)
            .count();
        line.push_str(&format!(" {done}/{} subtasks", task.subtasks.len()));
    }
    if !task.dependencies.is_empty() {
        line.push_str(&format!(" deps: {}", task.dependencies.join(",")));
    }
    line
}

fn push_task_summary(human: &mut HumanOutput, task: &Task) {
    human.push_summary("Status", task.status.to_string());
    human.push_summary("Priority", task.priority.to_string());
    if !task.description.is_empty() {
        human.push_summary("Description", task.description.clone());
    }
    if !task.dependencies.is_empty() {
        human.push_summary("Depends on", task.dependencies.join(", "));
    }
    if let Some(details) = task.details.as_deref() {
        human.push_summary("Details", details);
    }
    if let Some(strategy) = task.test_strategy.as_deref() {
        human.push_summary("Test strategy", strategy);
    }
    for subtask in &task.subtasks {
        human.push_detail(format!(
            "{}.{} [{}] {}",
            task.id, subtask.id, subtask.status, subtask.title
        ));
    }
}

/// Dangling dependencies are stored as given; they keep the task from ever
/// being picked by `next`.
fn push_dangling_warnings(human: &mut HumanOutput, tasks: &[Task], task: &Task) {
    for dep in &task.dependencies {
        if !tasks.iter().any(|other| &other.id == dep) {
            human.push_warning(format!("dependency {dep} does not exist"));
        }
    }
}
