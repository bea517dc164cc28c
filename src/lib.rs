mod kv;
pub mod logging;
mod models;
mod service;
mod storage;
mod store;

pub use kv::{FileStore, KeyValueStore, MemoryStore};
pub use models::{Filter, Task, TaskId};
pub use service::TodoApp;
pub use storage::Storage;
pub use store::{TaskError, TaskStore};
