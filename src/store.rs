use chrono::Utc;

use crate::models::{Filter, Task, TaskId};

#[derive(Debug, PartialEq, Eq)]
pub enum TaskError {
    /// `add` and `edit` reject text that trims to nothing.
    EmptyText,
}

impl std::fmt::Display for TaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskError::EmptyText => write!(f, "task text cannot be empty"),
        }
    }
}

impl std::error::Error for TaskError {}

/// Owns the ordered task list and the id counter.
///
/// Mutations take `&mut self` and run to completion; there is no interior
/// locking. Getters hand out cloned snapshots, so a caller can never mutate
/// the list behind the store's back.
#[derive(Debug, Clone)]
pub struct TaskStore {
    tasks: Vec<Task>,
    next_id: TaskId,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStore {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            next_id: 1,
        }
    }

    /// Appends a new task and returns it with its assigned id. The text is
    /// trimmed; an empty due date counts as no due date.
    pub fn add(&mut self, text: &str, due_date: Option<String>) -> Result<Task, TaskError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TaskError::EmptyText);
        }

        let task = Task {
            id: self.next_id,
            text: text.to_string(),
            completed: false,
            due_date: due_date.filter(|date| !date.is_empty()),
            created_at: Utc::now(),
        };
        self.next_id = self.next_id.saturating_add(1);
        self.tasks.push(task.clone());
        Ok(task)
    }

    /// Removes the task with the given id, keeping the relative order of the
    /// rest. Returns whether anything was removed.
    pub fn remove(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        self.tasks.len() < before
    }

    /// Flips the completion flag and returns the updated task, or `None` if
    /// no task has that id.
    pub fn toggle_complete(&mut self, id: TaskId) -> Option<Task> {
        if let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) {
            task.completed = !task.completed;
            return Some(task.clone());
        }
        None
    }

    /// Replaces the text of an existing task with the trimmed value; every
    /// other field is untouched. `Ok(None)` when the id is unknown, and the
    /// stored text is only modified on success.
    pub fn edit(&mut self, id: TaskId, new_text: &str) -> Result<Option<Task>, TaskError> {
        let new_text = new_text.trim();
        if new_text.is_empty() {
            return Err(TaskError::EmptyText);
        }

        match self.tasks.iter_mut().find(|task| task.id == id) {
            Some(task) => {
                task.text = new_text.to_string();
                Ok(Some(task.clone()))
            }
            None => Ok(None),
        }
    }

    /// Snapshot of the tasks matching `filter`, in insertion order.
    pub fn filtered(&self, filter: Filter) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect()
    }

    /// Snapshot of all tasks in insertion order.
    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.clone()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// The id the next `add` will assign.
    pub fn next_id(&self) -> TaskId {
        self.next_id
    }

    /// Replaces the whole collection (a load path, not a user action) and
    /// recomputes the id counter from the incoming ids. Incoming tasks are
    /// trusted to have been validated when they were first created; an id at
    /// the integer ceiling pins the counter there instead of overflowing it.
    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
        let max_id = self.tasks.iter().map(|task| task.id).max().unwrap_or(0);
        self.next_id = max_id.saturating_add(1);
    }

    /// Raises the id counter to `floor` if it is currently lower. Loaders use
    /// this to apply a persisted counter without ever moving ids backwards.
    pub fn restore_next_id(&mut self, floor: TaskId) {
        if floor > self.next_id {
            self.next_id = floor;
        }
    }
}
