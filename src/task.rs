//! Task data model for devtasks.
//!
//! The whole collection lives in one JSON document (`.devtasks/tasks.json`).
//! This module holds the persisted types plus the pure domain rules that
//! operate on them: id generation, dotted id addressing, filtering,
//! next-task selection and statistics.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Format version stamped into new documents
pub const DOCUMENT_VERSION: &str = "1.0";

const TASK_STATUSES: [TaskStatus; 5] = [
    TaskStatus::Pending,
    TaskStatus::InProgress,
    TaskStatus::Done,
    TaskStatus::Blocked,
    TaskStatus::Deferred,
];

/// Status shared by tasks and subtasks. Any status may follow any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Done,
    Blocked,
    Deferred,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Done => "done",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Deferred => "deferred",
        }
    }

    pub fn all() -> &'static [TaskStatus] {
        &TASK_STATUSES
    }

    /// Whether `get_next_task` may pick a task in this status
    pub fn is_selectable(&self) -> bool {
        !matches!(
            self,
            TaskStatus::Done | TaskStatus::Blocked | TaskStatus::Deferred
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace('_', "-");
        TASK_STATUSES
            .iter()
            .copied()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "unknown task status '{}' (expected pending|in-progress|done|blocked|deferred)",
                    value.trim()
                ))
            })
    }
}

/// Task priority. Unrecognized stored values read back as `Medium`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum TaskPriority {
    High,
    #[default]
    Medium,
    Low,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::High => "high",
            TaskPriority::Medium => "medium",
            TaskPriority::Low => "low",
        }
    }

    /// Sort rank used by next-task selection (lower goes first)
    pub fn rank(&self) -> u8 {
        match self {
            TaskPriority::High => 0,
            TaskPriority::Medium => 1,
            TaskPriority::Low => 2,
        }
    }
}

impl From<String> for TaskPriority {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(TaskPriority::High),
            "medium" => Ok(TaskPriority::Medium),
            "low" => Ok(TaskPriority::Low),
            other => Err(Error::InvalidArgument(format!(
                "unknown task priority '{other}' (expected high|medium|low)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_strategy: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn subtask(&self, subtask_id: &str) -> Option<&Subtask> {
        self.subtasks.iter().find(|subtask| subtask.id == subtask_id)
    }

    pub fn subtask_mut(&mut self, subtask_id: &str) -> Option<&mut Subtask> {
        self.subtasks
            .iter_mut()
            .find(|subtask| subtask.id == subtask_id)
    }

    /// Whether every dependency is in `done_ids`. Dangling ids never are.
    pub fn dependencies_satisfied(&self, done_ids: &HashSet<&str>) -> bool {
        self.dependencies
            .iter()
            .all(|dep| done_ids.contains(dep.as_str()))
    }
}

/// The persisted root document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDocument {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    pub last_updated: DateTime<Utc>,
}

impl TaskDocument {
    pub fn empty(project_name: Option<String>) -> Self {
        Self {
            version: DOCUMENT_VERSION.to_string(),
            project_name,
            tasks: Vec::new(),
            last_updated: Utc::now(),
        }
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == task_id)
    }

    pub fn task_mut(&mut self, task_id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| task.id == task_id)
    }

    pub fn next_task_id(&self) -> String {
        next_numeric_id(self.tasks.iter().map(|task| task.id.as_str()))
    }
}

/// Input for `TaskManager::create_task`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub test_strategy: Option<String>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Input for `TaskManager::add_subtask`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubtask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewSubtask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
        }
    }
}

/// Fields `TaskManager::update_task` may change.
///
/// `id`, `createdAt`, `updatedAt` and `subtasks` are not part of the
/// allow-list; deserializing an update that names them fails.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TaskUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub dependencies: Option<Vec<String>>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub test_strategy: Option<String>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        self == &TaskUpdate::default()
    }

    /// Overwrite the listed fields; everything else keeps its value
    pub fn apply_to(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(dependencies) = self.dependencies {
            task.dependencies = dedupe_ids(dependencies);
        }
        if let Some(details) = self.details {
            task.details = Some(details);
        }
        if let Some(test_strategy) = self.test_strategy {
            task.test_strategy = Some(test_strategy);
        }
    }
}

/// Status filter: a single status or any of several
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusFilter {
    One(TaskStatus),
    Any(Vec<TaskStatus>),
}

impl StatusFilter {
    pub fn matches(&self, status: TaskStatus) -> bool {
        match self {
            StatusFilter::One(expected) => *expected == status,
            StatusFilter::Any(expected) => expected.contains(&status),
        }
    }
}

impl From<TaskStatus> for StatusFilter {
    fn from(status: TaskStatus) -> Self {
        StatusFilter::One(status)
    }
}

impl From<Vec<TaskStatus>> for StatusFilter {
    fn from(statuses: Vec<TaskStatus>) -> Self {
        StatusFilter::Any(statuses)
    }
}

/// Filters for `TaskManager::get_tasks`; present filters combine with AND
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFilter {
    #[serde(default)]
    pub status: Option<StatusFilter>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        let status_ok = self
            .status
            .as_ref()
            .map(|filter| filter.matches(task.status))
            .unwrap_or(true);
        let priority_ok = self
            .priority
            .map(|priority| priority == task.priority)
            .unwrap_or(true);
        status_ok && priority_ok
    }
}

/// A task id, optionally addressing one of its subtasks (`"7"` or `"7.2"`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskAddress<'a> {
    pub task_id: &'a str,
    pub subtask_id: Option<&'a str>,
}

impl<'a> TaskAddress<'a> {
    /// Split on the first dot. `"7.2.1"` addresses subtask `"2.1"` of task
    /// `"7"`, which never exists.
    pub fn parse(id: &'a str) -> Self {
        let id = id.trim();
        match id.split_once('.') {
            Some((task_id, subtask_id)) => Self {
                task_id,
                subtask_id: Some(subtask_id),
            },
            None => Self {
                task_id: id,
                subtask_id: None,
            },
        }
    }
}

/// Result of resolving a possibly dotted id
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskRef {
    Task(Task),
    Subtask { parent_id: String, subtask: Subtask },
}

impl TaskRef {
    /// Resolve `id` against `tasks`
    pub fn resolve(tasks: &[Task], id: &str) -> Option<TaskRef> {
        let address = TaskAddress::parse(id);
        let task = tasks.iter().find(|task| task.id == address.task_id)?;
        match address.subtask_id {
            None => Some(TaskRef::Task(task.clone())),
            Some(subtask_id) => task.subtask(subtask_id).map(|subtask| TaskRef::Subtask {
                parent_id: task.id.clone(),
                subtask: subtask.clone(),
            }),
        }
    }

    pub fn display_id(&self) -> String {
        match self {
            TaskRef::Task(task) => task.id.clone(),
            TaskRef::Subtask { parent_id, subtask } => format!("{parent_id}.{}", subtask.id),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            TaskRef::Task(task) => &task.title,
            TaskRef::Subtask { subtask, .. } => &subtask.title,
        }
    }

    pub fn status(&self) -> TaskStatus {
        match self {
            TaskRef::Task(task) => task.status,
            TaskRef::Subtask { subtask, .. } => subtask.status,
        }
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        match self {
            TaskRef::Task(task) => task.updated_at,
            TaskRef::Subtask { subtask, .. } => subtask.updated_at,
        }
    }
}

/// Aggregate counts over the task collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub done: usize,
    pub blocked: usize,
    pub deferred: usize,
    pub completion_percentage: u32,
}

impl TaskStats {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let mut stats = TaskStats {
            total: tasks.len(),
            ..TaskStats::default()
        };
        for task in tasks {
            match task.status {
                TaskStatus::Pending => stats.pending += 1,
                TaskStatus::InProgress => stats.in_progress += 1,
                TaskStatus::Done => stats.done += 1,
                TaskStatus::Blocked => stats.blocked += 1,
                TaskStatus::Deferred => stats.deferred += 1,
            }
        }
        stats.completion_percentage = completion_percentage(stats.done, stats.total);
        stats
    }

    pub fn count(&self, status: TaskStatus) -> usize {
        match status {
            TaskStatus::Pending => self.pending,
            TaskStatus::InProgress => self.in_progress,
            TaskStatus::Done => self.done,
            TaskStatus::Blocked => self.blocked,
            TaskStatus::Deferred => self.deferred,
        }
    }
}

/// `round(done / total * 100)`, 0 for an empty collection
pub fn completion_percentage(done: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((done as f64 / total as f64) * 100.0).round() as u32
}

/// `max(numeric ids) + 1`; ids that are not decimal digits count as 0.
///
/// Works on the decimal text, so ids of any length keep increasing.
pub fn next_numeric_id<'a>(ids: impl IntoIterator<Item = &'a str>) -> String {
    let max = ids.into_iter().map(numeric_id).max().unwrap_or(NumericId("0"));
    increment_decimal(max.0)
}

/// Decimal id without leading zeros, ordered by value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NumericId<'a>(&'a str);

impl Ord for NumericId<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(other.0))
    }
}

impl PartialOrd for NumericId<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn numeric_id(id: &str) -> NumericId<'_> {
    let id = id.trim();
    if id.is_empty() || !id.bytes().all(|byte| byte.is_ascii_digit()) {
        return NumericId("0");
    }
    match id.trim_start_matches('0') {
        "" => NumericId("0"),
        digits => NumericId(digits),
    }
}

fn increment_decimal(digits: &str) -> String {
    let mut bytes = digits.as_bytes().to_vec();
    for byte in bytes.iter_mut().rev() {
        if *byte == b'9' {
            *byte = b'0';
        } else {
            *byte += 1;
            return bytes.into_iter().map(char::from).collect();
        }
    }
    std::iter::once('1')
        .chain(bytes.into_iter().map(char::from))
        .collect()
}

/// Pick the task to work on next.
///
/// The first selectable `in-progress` task in storage order wins outright.
/// Otherwise candidates are ordered by priority rank, then by ascending
/// numeric id.
pub fn select_next_task(tasks: &[Task]) -> Option<&Task> {
    let done_ids: HashSet<&str> = tasks
        .iter()
        .filter(|task| task.status == TaskStatus::Done)
        .map(|task| task.id.as_str())
        .collect();

    let mut candidates: Vec<&Task> = tasks
        .iter()
        .filter(|task| task.status.is_selectable() && task.dependencies_satisfied(&done_ids))
        .collect();

    if let Some(active) = candidates
        .iter()
        .copied()
        .find(|task| task.status == TaskStatus::InProgress)
    {
        return Some(active);
    }

    candidates.sort_by(|left, right| {
        left.priority
            .rank()
            .cmp(&right.priority.rank())
            .then_with(|| numeric_id(&left.id).cmp(&numeric_id(&right.id)))
    });
    candidates.into_iter().next()
}

/// Trim, drop empties and duplicates, keep first-seen order
pub fn dedupe_ids(ids: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty() && seen.insert(id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, status: TaskStatus, priority: TaskPriority, deps: &[&str]) -> Task {
        let now = Utc::now();
        Task {
            id: id.to_string(),
            title: format!("Task {id}"),
            description: String::new(),
            status,
            priority,
            dependencies: deps.iter().map(|dep| dep.to_string()).collect(),
            subtasks: Vec::new(),
            details: None,
            test_strategy: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn next_numeric_id_starts_at_one() {
        assert_eq!(next_numeric_id(Vec::<&str>::new()), "1");
    }

    #[test]
    fn next_numeric_id_uses_maximum_not_count() {
        assert_eq!(next_numeric_id(["1", "5", "3"]), "6");
    }

    #[test]
    fn next_numeric_id_treats_garbage_as_zero() {
        assert_eq!(next_numeric_id(["abc", "", "2"]), "3");
        assert_eq!(next_numeric_id(["abc"]), "1");
    }

    #[test]
    fn next_numeric_id_carries_past_integer_limits() {
        assert_eq!(next_numeric_id(["18446744073709551615"]), "18446744073709551616");
        assert_eq!(
            next_numeric_id(["18446744073709551616", "7"]),
            "18446744073709551617"
        );
        assert_eq!(next_numeric_id(["99", "100"]), "101");
        assert_eq!(next_numeric_id(["999"]), "1000");
        assert_eq!(next_numeric_id(["007", " 3 "]), "8");
        assert_eq!(next_numeric_id(["0"]), "1");
    }

    #[test]
    fn status_parses_cli_spellings() {
        assert_eq!("in-progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert_eq!("IN_PROGRESS".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert_eq!(" done ".parse::<TaskStatus>().unwrap(), TaskStatus::Done);
        assert!(matches!(
            "finished".parse::<TaskStatus>(),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn status_serializes_kebab_case() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
    }

    #[test]
    fn unknown_stored_priority_reads_as_medium() {
        let priority: TaskPriority = serde_json::from_str("\"urgent\"").unwrap();
        assert_eq!(priority, TaskPriority::Medium);
        let priority: TaskPriority = serde_json::from_str("\"HIGH\"").unwrap();
        assert_eq!(priority, TaskPriority::High);
    }

    #[test]
    fn address_splits_on_first_dot() {
        assert_eq!(
            TaskAddress::parse("7"),
            TaskAddress {
                task_id: "7",
                subtask_id: None
            }
        );
        assert_eq!(
            TaskAddress::parse("7.2"),
            TaskAddress {
                task_id: "7",
                subtask_id: Some("2")
            }
        );
        assert_eq!(TaskAddress::parse("7.2.1").subtask_id, Some("2.1"));
    }

    #[test]
    fn resolve_returns_tagged_refs() {
        let mut parent = task("1", TaskStatus::Pending, TaskPriority::Medium, &[]);
        let now = Utc::now();
        parent.subtasks.push(Subtask {
            id: "1".to_string(),
            title: "Child".to_string(),
            description: None,
            status: TaskStatus::Pending,
            created_at: now,
            updated_at: now,
        });
        let tasks = vec![parent];

        assert!(matches!(TaskRef::resolve(&tasks, "1"), Some(TaskRef::Task(_))));
        match TaskRef::resolve(&tasks, "1.1") {
            Some(TaskRef::Subtask { parent_id, subtask }) => {
                assert_eq!(parent_id, "1");
                assert_eq!(subtask.title, "Child");
            }
            other => panic!("unexpected lookup: {other:?}"),
        }
        assert!(TaskRef::resolve(&tasks, "1.2").is_none());
        assert!(TaskRef::resolve(&tasks, "1.1.1").is_none());
        assert!(TaskRef::resolve(&tasks, "2").is_none());
    }

    #[test]
    fn filter_combines_status_and_priority() {
        let pending_high = task("1", TaskStatus::Pending, TaskPriority::High, &[]);
        let done_high = task("2", TaskStatus::Done, TaskPriority::High, &[]);
        let pending_low = task("3", TaskStatus::Pending, TaskPriority::Low, &[]);

        let filter = TaskFilter {
            status: Some(TaskStatus::Pending.into()),
            priority: Some(TaskPriority::High),
        };
        assert!(filter.matches(&pending_high));
        assert!(!filter.matches(&done_high));
        assert!(!filter.matches(&pending_low));

        let any = TaskFilter {
            status: Some(vec![TaskStatus::Pending, TaskStatus::Done].into()),
            priority: None,
        };
        assert!(any.matches(&pending_high));
        assert!(any.matches(&done_high));
        assert!(TaskFilter::default().matches(&pending_low));
    }

    #[test]
    fn status_filter_accepts_string_or_array() {
        let one: StatusFilter = serde_json::from_str("\"done\"").unwrap();
        assert_eq!(one, StatusFilter::One(TaskStatus::Done));
        let many: StatusFilter = serde_json::from_str("[\"done\", \"blocked\"]").unwrap();
        assert_eq!(
            many,
            StatusFilter::Any(vec![TaskStatus::Done, TaskStatus::Blocked])
        );
    }

    #[test]
    fn next_task_prefers_in_progress_over_priority() {
        let tasks = vec![
            task("1", TaskStatus::Pending, TaskPriority::High, &[]),
            task("2", TaskStatus::InProgress, TaskPriority::Low, &[]),
            task("3", TaskStatus::InProgress, TaskPriority::High, &[]),
        ];
        assert_eq!(select_next_task(&tasks).map(|t| t.id.as_str()), Some("2"));
    }

    #[test]
    fn next_task_orders_by_priority_then_id() {
        let tasks = vec![
            task("10", TaskStatus::Pending, TaskPriority::Medium, &[]),
            task("9", TaskStatus::Pending, TaskPriority::Medium, &[]),
            task("11", TaskStatus::Pending, TaskPriority::Low, &[]),
        ];
        assert_eq!(select_next_task(&tasks).map(|t| t.id.as_str()), Some("9"));
    }

    #[test]
    fn next_task_skips_closed_and_unsatisfied() {
        let tasks = vec![
            task("1", TaskStatus::Done, TaskPriority::High, &[]),
            task("2", TaskStatus::Blocked, TaskPriority::High, &[]),
            task("3", TaskStatus::Deferred, TaskPriority::High, &[]),
            task("4", TaskStatus::Pending, TaskPriority::High, &["2"]),
            task("5", TaskStatus::Pending, TaskPriority::High, &["99"]),
            task("6", TaskStatus::Pending, TaskPriority::Low, &["1"]),
        ];
        assert_eq!(select_next_task(&tasks).map(|t| t.id.as_str()), Some("6"));
    }

    #[test]
    fn next_task_none_when_everything_is_done() {
        let tasks = vec![task("1", TaskStatus::Done, TaskPriority::High, &[])];
        assert!(select_next_task(&tasks).is_none());
        assert!(select_next_task(&[]).is_none());
    }

    #[test]
    fn stats_count_each_status() {
        let tasks = vec![
            task("1", TaskStatus::Done, TaskPriority::High, &[]),
            task("2", TaskStatus::Done, TaskPriority::High, &[]),
            task("3", TaskStatus::Pending, TaskPriority::High, &[]),
            task("4", TaskStatus::InProgress, TaskPriority::High, &[]),
            task("5", TaskStatus::Blocked, TaskPriority::High, &[]),
            task("6", TaskStatus::Deferred, TaskPriority::High, &[]),
        ];
        let stats = TaskStats::from_tasks(&tasks);
        assert_eq!(stats.total, 6);
        assert_eq!(stats.done, 2);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.in_progress, 1);
        assert_eq!(stats.blocked, 1);
        assert_eq!(stats.deferred, 1);
        assert_eq!(stats.completion_percentage, 33);
        assert_eq!(stats.count(TaskStatus::Done), 2);
    }

    #[test]
    fn completion_percentage_rounds() {
        assert_eq!(completion_percentage(0, 0), 0);
        assert_eq!(completion_percentage(1, 3), 33);
        assert_eq!(completion_percentage(2, 3), 67);
        assert_eq!(completion_percentage(1, 8), 13);
        assert_eq!(completion_percentage(4, 4), 100);
    }

    #[test]
    fn update_rejects_protected_fields() {
        let err = serde_json::from_str::<TaskUpdate>(r#"{"id": "9"}"#).unwrap_err();
        assert!(err.to_string().contains("unknown field"));
        assert!(serde_json::from_str::<TaskUpdate>(r#"{"subtasks": []}"#).is_err());
        assert!(serde_json::from_str::<TaskUpdate>(r#"{"createdAt": "x"}"#).is_err());

        let update: TaskUpdate =
            serde_json::from_str(r#"{"title": "New", "testStrategy": "unit"}"#).unwrap();
        assert_eq!(update.title.as_deref(), Some("New"));
        assert_eq!(update.test_strategy.as_deref(), Some("unit"));
    }

    #[test]
    fn update_only_touches_listed_fields() {
        let mut target = task("1", TaskStatus::Pending, TaskPriority::Low, &["2"]);
        target.details = Some("keep".to_string());
        TaskUpdate {
            priority: Some(TaskPriority::High),
            dependencies: Some(vec!["3".to_string(), " 3 ".to_string(), String::new()]),
            ..TaskUpdate::default()
        }
        .apply_to(&mut target);

        assert_eq!(target.priority, TaskPriority::High);
        assert_eq!(target.dependencies, vec!["3".to_string()]);
        assert_eq!(target.status, TaskStatus::Pending);
        assert_eq!(target.details.as_deref(), Some("keep"));
        assert_eq!(target.title, "Task 1");
    }

    #[test]
    fn task_json_uses_camel_case_and_omits_absent_fields() {
        let value = serde_json::to_value(task("1", TaskStatus::InProgress, TaskPriority::High, &[]))
            .unwrap();
        assert_eq!(value["status"], "in-progress");
        assert!(value.get("createdAt").is_some());
        assert!(value.get("testStrategy").is_none());
        assert!(value.get("details").is_none());
    }
}
