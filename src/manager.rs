//! Domain operations over the task store.
//!
//! Every operation re-reads the document. Mutations run as one
//! load-mutate-save cycle under the store's advisory lock; lookups that
//! miss return `None`/`false` and leave the document untouched.

use std::path::Path;

use chrono::Utc;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::lock::FileLock;
use crate::store::Store;
use crate::task::{
    dedupe_ids, next_numeric_id, select_next_task, NewSubtask, NewTask, Subtask, Task,
    TaskAddress, TaskDocument, TaskFilter, TaskRef, TaskStats, TaskStatus, TaskUpdate,
};

#[derive(Debug, Clone)]
pub struct TaskManager {
    store: Store,
}

impl TaskManager {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Manager for `project_root` using its `.devtasks.toml` (or defaults)
    pub fn for_project(project_root: &Path) -> Self {
        let config = Config::load_from_project(project_root);
        Self::new(Store::new(project_root, config.store))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn is_initialized(&self) -> bool {
        self.store.is_initialized()
    }

    pub fn initialize(&self, project_name: Option<String>) -> Result<TaskDocument> {
        self.store.initialize(project_name)
    }

    /// Load the whole document, for read-only consumers such as the checklist
    pub fn document(&self) -> Result<TaskDocument> {
        self.store.load()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn get_tasks(&self, filter: Option<&TaskFilter>) -> Result<Vec<Task>> {
        let mut tasks = self.store.get_tasks()?;
        if let Some(filter) = filter {
            tasks.retain(|task| filter.matches(task));
        }
        Ok(tasks)
    }

    /// Look up `"N"` or `"N.M"`
    pub fn get_task(&self, id: &str) -> Result<Option<TaskRef>> {
        let tasks = self.store.get_tasks()?;
        Ok(TaskRef::resolve(&tasks, id))
    }

    /// The task named by the first segment of `id`, whatever follows it
    pub fn get_parent_task(&self, id: &str) -> Result<Option<Task>> {
        let address = TaskAddress::parse(id);
        let tasks = self.store.get_tasks()?;
        Ok(tasks.into_iter().find(|task| task.id == address.task_id))
    }

    pub fn get_next_task(&self) -> Result<Option<Task>> {
        let tasks = self.store.get_tasks()?;
        Ok(select_next_task(&tasks).cloned())
    }

    pub fn get_stats(&self) -> Result<TaskStats> {
        let tasks = self.store.get_tasks()?;
        Ok(TaskStats::from_tasks(&tasks))
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    pub fn create_task(&self, input: NewTask) -> Result<Task> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(Error::InvalidArgument("title cannot be empty".to_string()));
        }

        let created = self.update_document(|document| {
            let now = Utc::now();
            let task = Task {
                id: document.next_task_id(),
                title,
                description: input.description.unwrap_or_default(),
                status: input.status.unwrap_or_default(),
                priority: input.priority.unwrap_or_default(),
                dependencies: dedupe_ids(input.dependencies),
                subtasks: Vec::new(),
                details: input.details,
                test_strategy: input.test_strategy,
                created_at: now,
                updated_at: now,
            };
            document.tasks.push(task.clone());
            Some(task)
        })?;

        let task = created.ok_or_else(|| {
            Error::OperationFailed("task creation produced no task".to_string())
        })?;
        tracing::info!(id = %task.id, priority = %task.priority, "created task");
        Ok(task)
    }

    pub fn update_task(&self, id: &str, mut update: TaskUpdate) -> Result<Option<Task>> {
        if let Some(title) = update.title.take() {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(Error::InvalidArgument("title cannot be empty".to_string()));
            }
            update.title = Some(title);
        }

        let updated = self.update_document(|document| {
            let task = document.task_mut(id.trim())?;
            update.apply_to(task);
            task.updated_at = Utc::now();
            Some(task.clone())
        })?;

        if let Some(task) = updated.as_ref() {
            tracing::info!(id = %task.id, "updated task");
        }
        Ok(updated)
    }

    /// Remove a task and every dependency edge pointing at it
    pub fn delete_task(&self, id: &str) -> Result<bool> {
        let id = id.trim();
        let deleted = self.update_document(|document| {
            let index = document.tasks.iter().position(|task| task.id == id)?;
            document.tasks.remove(index);
            for task in &mut document.tasks {
                task.dependencies.retain(|dep| dep != id);
            }
            Some(())
        })?;

        if deleted.is_some() {
            tracing::info!(id, "deleted task");
        }
        Ok(deleted.is_some())
    }

    /// Set the status of a task (`"N"`) or subtask (`"N.M"`).
    ///
    /// A subtask change also refreshes the parent's `updated_at`; the
    /// parent's own status is left alone.
    pub fn set_status(&self, id: &str, status: TaskStatus) -> Result<Option<TaskRef>> {
        let address = TaskAddress::parse(id);
        let changed = self.update_document(|document| {
            let now = Utc::now();
            let task = document.task_mut(address.task_id)?;
            match address.subtask_id {
                None => {
                    task.status = status;
                    task.updated_at = now;
                    Some(TaskRef::Task(task.clone()))
                }
                Some(subtask_id) => {
                    let subtask = task.subtask_mut(subtask_id)?;
                    subtask.status = status;
                    subtask.updated_at = now;
                    let subtask = subtask.clone();
                    task.updated_at = now;
                    Some(TaskRef::Subtask {
                        parent_id: task.id.clone(),
                        subtask,
                    })
                }
            }
        })?;

        if let Some(target) = changed.as_ref() {
            tracing::info!(id = %target.display_id(), %status, "status changed");
        }
        Ok(changed)
    }

    pub fn add_subtask(&self, task_id: &str, input: NewSubtask) -> Result<Option<Subtask>> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(Error::InvalidArgument("title cannot be empty".to_string()));
        }

        let added = self.update_document(|document| {
            let task = document.task_mut(task_id.trim())?;
            let now = Utc::now();
            let subtask = Subtask {
                id: next_numeric_id(task.subtasks.iter().map(|subtask| subtask.id.as_str())),
                title,
                description: input.description,
                status: TaskStatus::Pending,
                created_at: now,
                updated_at: now,
            };
            task.subtasks.push(subtask.clone());
            task.updated_at = now;
            Some(subtask)
        })?;

        if let Some(subtask) = added.as_ref() {
            tracing::info!(task = task_id, subtask = %subtask.id, "added subtask");
        }
        Ok(added)
    }

    /// Run one locked load-mutate-save cycle.
    ///
    /// `mutate` returns `None` when its target does not exist; nothing is
    /// written in that case.
    fn update_document<T, F>(&self, mutate: F) -> Result<Option<T>>
    where
        F: FnOnce(&mut TaskDocument) -> Option<T>,
    {
        if !self.store.is_initialized() {
            return Err(Error::NotInitialized(self.store.project_root().to_path_buf()));
        }

        let _lock = FileLock::acquire(self.store.lock_path(), self.store.config().lock_timeout_ms)?;
        let mut document = self.store.load()?;
        let result = mutate(&mut document);
        if result.is_some() {
            self.store.save(&mut document)?;
        }
        Ok(result)
    }
}
