use crate::kv::KeyValueStore;
use crate::models::{Task, TaskId};

const TASKS_KEY: &str = "todoTasks";
const COUNTER_KEY: &str = "todoTaskIdCounter";
const PROBE_KEY: &str = "__storage_test__";
const DEFAULT_COUNTER: TaskId = 1;

#[derive(Debug)]
enum StorageError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(err) => write!(f, "io error: {err}"),
            StorageError::Json(err) => write!(f, "json error: {err}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(value: std::io::Error) -> Self {
        StorageError::Io(value)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(value: serde_json::Error) -> Self {
        StorageError::Json(value)
    }
}

/// Persistence gateway for the task list and the id counter.
///
/// Every operation is fail-soft: an unavailable or corrupted backend degrades
/// to `false`/empty/default return values and a log record, never to an error
/// or a panic. Persistence is a convenience here, not a correctness
/// dependency; callers keep working in memory when a save reports `false`.
#[derive(Debug, Clone)]
pub struct Storage<S> {
    store: S,
}

impl<S: KeyValueStore> Storage<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Writes the task list. `false` means "not persisted, state lives on in
    /// memory".
    pub fn save_tasks(&self, tasks: &[Task]) -> bool {
        match self.try_save_tasks(tasks) {
            Ok(()) => true,
            Err(error) => {
                log::error!("failed to save tasks: {error}");
                false
            }
        }
    }

    /// Reads the task list. An absent key is a normal first run and yields an
    /// empty list; unreadable content also yields an empty list.
    pub fn load_tasks(&self) -> Vec<Task> {
        match self.try_load_tasks() {
            Ok(tasks) => tasks,
            Err(error) => {
                log::error!("failed to load tasks: {error}");
                Vec::new()
            }
        }
    }

    pub fn save_counter(&self, counter: TaskId) -> bool {
        match self.store.set(COUNTER_KEY, &counter.to_string()) {
            Ok(()) => true,
            Err(error) => {
                log::error!("failed to save task counter: {error}");
                false
            }
        }
    }

    /// Reads the persisted id counter, defaulting to 1 when the key is absent
    /// or its content does not parse.
    pub fn load_counter(&self) -> TaskId {
        let raw = match self.store.get(COUNTER_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return DEFAULT_COUNTER,
            Err(error) => {
                log::error!("failed to load task counter: {error}");
                return DEFAULT_COUNTER;
            }
        };
        match raw.trim().parse() {
            Ok(counter) => counter,
            Err(error) => {
                log::error!("persisted task counter is unreadable: {error}");
                DEFAULT_COUNTER
            }
        }
    }

    /// Removes both entries.
    pub fn clear_all(&self) -> bool {
        match self.try_clear_all() {
            Ok(()) => true,
            Err(error) => {
                log::error!("failed to clear storage: {error}");
                false
            }
        }
    }

    /// Probes the backend with a throwaway write/remove cycle. The probe key
    /// is cleaned up on every outcome the backend lets us control.
    pub fn is_available(&self) -> bool {
        if self.store.set(PROBE_KEY, PROBE_KEY).is_err() {
            return false;
        }
        self.store.remove(PROBE_KEY).is_ok()
    }

    fn try_save_tasks(&self, tasks: &[Task]) -> Result<(), StorageError> {
        let json = serde_json::to_string(tasks)?;
        self.store.set(TASKS_KEY, &json)?;
        Ok(())
    }

    fn try_load_tasks(&self) -> Result<Vec<Task>, StorageError> {
        match self.store.get(TASKS_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    fn try_clear_all(&self) -> Result<(), StorageError> {
        self.store.remove(TASKS_KEY)?;
        self.store.remove(COUNTER_KEY)?;
        Ok(())
    }
}
