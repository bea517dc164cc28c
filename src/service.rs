use crate::kv::KeyValueStore;
use crate::models::{Filter, Task, TaskId};
use crate::storage::Storage;
use crate::store::{TaskError, TaskStore};

/// Application coordinator: a [`TaskStore`] wired to a [`Storage`] gateway.
///
/// Every effective mutation is persisted immediately. A failed persist is
/// absorbed: the gateway has already logged it and the in-memory state stays
/// authoritative. Hosts that want to warn the user can check
/// [`TodoApp::flush`] or [`TodoApp::storage_available`].
pub struct TodoApp<S> {
    store: TaskStore,
    storage: Storage<S>,
}

impl<S: KeyValueStore> TodoApp<S> {
    /// Starts empty over the given backend; call [`TodoApp::load`] to pick up
    /// persisted state.
    pub fn new(backend: S) -> Self {
        Self {
            store: TaskStore::new(),
            storage: Storage::new(backend),
        }
    }

    /// Seeds the store from persisted state. The loaded list replaces
    /// whatever is in memory and recomputes the id counter; the persisted
    /// counter is then applied as a floor, so ids freed by deletions in an
    /// earlier session are not handed out again.
    pub fn load(&mut self) {
        let tasks = self.storage.load_tasks();
        let count = tasks.len();
        self.store.replace_all(tasks);
        self.store.restore_next_id(self.storage.load_counter());
        log::info!(
            "storage state loaded tasks={count} next_id={}",
            self.store.next_id()
        );
    }

    pub fn add_task(&mut self, text: &str, due_date: Option<String>) -> Result<Task, TaskError> {
        let task = self.store.add(text, due_date)?;
        self.flush();
        Ok(task)
    }

    pub fn delete_task(&mut self, id: TaskId) -> bool {
        let removed = self.store.remove(id);
        if removed {
            self.flush();
        }
        removed
    }

    pub fn toggle_complete(&mut self, id: TaskId) -> Option<Task> {
        let task = self.store.toggle_complete(id)?;
        self.flush();
        Some(task)
    }

    pub fn edit_task(&mut self, id: TaskId, new_text: &str) -> Result<Option<Task>, TaskError> {
        let task = self.store.edit(id, new_text)?;
        if task.is_some() {
            self.flush();
        }
        Ok(task)
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.store.tasks()
    }

    pub fn filtered_tasks(&self, filter: Filter) -> Vec<Task> {
        self.store.filtered(filter)
    }

    /// Persists the current list and counter. `false` means at least one of
    /// the two writes did not go through; in-memory state is unaffected.
    pub fn flush(&self) -> bool {
        let tasks_saved = self.storage.save_tasks(&self.store.tasks());
        let counter_saved = self.storage.save_counter(self.store.next_id());
        tasks_saved && counter_saved
    }

    /// Whether the backend currently accepts writes; hosts use this once at
    /// startup to warn that persistence is disabled.
    pub fn storage_available(&self) -> bool {
        self.storage.is_available()
    }

    pub fn storage(&self) -> &Storage<S> {
        &self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;
    use chrono::{TimeZone, Utc};
    use std::io;

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> io::Result<Option<String>> {
            Err(io::Error::other("store offline"))
        }

        fn set(&self, _key: &str, _value: &str) -> io::Result<()> {
            Err(io::Error::other("store offline"))
        }

        fn remove(&self, _key: &str) -> io::Result<()> {
            Err(io::Error::other("store offline"))
        }
    }

    fn make_task(id: TaskId, text: &str) -> Task {
        Task {
            id,
            text: text.to_string(),
            completed: false,
            due_date: None,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).single().unwrap(),
        }
    }

    #[test]
    fn load_seeds_store_and_applies_counter_floor() {
        let backend = MemoryStore::new();
        let seed = Storage::new(&backend);
        seed.save_tasks(&[make_task(5, "older"), make_task(2, "newer")]);
        seed.save_counter(9);

        let mut app = TodoApp::new(&backend);
        app.load();

        // Insertion order survives the round trip.
        let ids: Vec<TaskId> = app.tasks().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![5, 2]);

        // The stored counter (9) outranks the recomputed max+1 (6).
        assert_eq!(app.add_task("next", None).unwrap().id, 9);
    }

    #[test]
    fn load_ignores_a_stale_counter_below_the_recomputed_one() {
        let backend = MemoryStore::new();
        let seed = Storage::new(&backend);
        seed.save_tasks(&[make_task(5, "only")]);
        seed.save_counter(3);

        let mut app = TodoApp::new(&backend);
        app.load();
        assert_eq!(app.add_task("next", None).unwrap().id, 6);
    }

    #[test]
    fn load_survives_persisted_values_at_the_integer_ceiling() {
        let backend = MemoryStore::new();
        backend
            .set(
                "todoTasks",
                r#"[{"id":18446744073709551615,"text":"edge","completed":false,"dueDate":null,"createdAt":"2024-05-01T09:00:00Z"}]"#,
            )
            .unwrap();
        backend
            .set("todoTaskIdCounter", "18446744073709551615")
            .unwrap();

        let mut app = TodoApp::new(&backend);
        app.load();

        let task = app.add_task("after the edge", None).unwrap();
        assert_eq!(task.id, TaskId::MAX);
        assert_eq!(app.tasks().len(), 2);
    }

    #[test]
    fn mutations_persist_immediately() {
        let backend = MemoryStore::new();
        let mut app = TodoApp::new(&backend);

        let task = app.add_task("Buy milk", None).unwrap();
        let readback = Storage::new(&backend);
        assert_eq!(readback.load_tasks(), app.tasks());
        assert_eq!(readback.load_counter(), 2);

        app.toggle_complete(task.id).unwrap();
        assert!(readback.load_tasks()[0].completed);

        app.edit_task(task.id, "Buy oat milk").unwrap().unwrap();
        assert_eq!(readback.load_tasks()[0].text, "Buy oat milk");

        assert!(app.delete_task(task.id));
        assert_eq!(readback.load_tasks(), Vec::new());
    }

    #[test]
    fn ineffective_mutations_do_not_touch_the_backend() {
        let backend = MemoryStore::new();
        let mut app = TodoApp::new(&backend);

        assert_eq!(app.add_task("   ", None), Err(TaskError::EmptyText));
        assert!(!app.delete_task(7));
        assert_eq!(app.toggle_complete(7), None);
        assert_eq!(app.edit_task(7, "x"), Ok(None));

        assert_eq!(backend.get("todoTasks").unwrap(), None);
        assert_eq!(backend.get("todoTaskIdCounter").unwrap(), None);
    }

    #[test]
    fn deleted_high_ids_are_not_reused_across_sessions() {
        let backend = MemoryStore::new();

        let mut first = TodoApp::new(&backend);
        first.add_task("a", None).unwrap();
        first.add_task("b", None).unwrap();
        let c = first.add_task("c", None).unwrap();
        assert!(first.delete_task(c.id));
        drop(first);

        let mut second = TodoApp::new(&backend);
        second.load();
        assert_eq!(second.tasks().len(), 2);
        assert_eq!(second.add_task("d", None).unwrap().id, 4);
    }

    #[test]
    fn keeps_working_in_memory_when_the_backend_is_down() {
        let mut app = TodoApp::new(FailingStore);
        app.load();

        let task = app.add_task("still works", None).unwrap();
        assert_eq!(task.id, 1);
        assert!(app.toggle_complete(task.id).unwrap().completed);
        assert_eq!(app.filtered_tasks(Filter::Completed).len(), 1);

        assert!(!app.flush());
        assert!(!app.storage_available());
    }

    #[test]
    fn cleared_storage_reloads_empty() {
        let backend = MemoryStore::new();
        let mut app = TodoApp::new(&backend);
        app.add_task("a", None).unwrap();

        assert!(app.storage().clear_all());

        let mut fresh = TodoApp::new(&backend);
        fresh.load();
        assert!(fresh.tasks().is_empty());
        assert_eq!(fresh.add_task("b", None).unwrap().id, 1);
    }
}
