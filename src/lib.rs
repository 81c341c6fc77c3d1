// unitasks - University assignment tracker over a local key-value store

pub mod blob;
pub mod config;
pub mod error;
pub mod filter;
pub mod models;
pub mod render;
pub mod shell;
pub mod store;

// Re-export main types for convenience
pub use blob::{BlobStore, FileBlobStore, MemoryBlobStore, SqliteBlobStore};
pub use config::{Backend, Config};
pub use error::TaskError;
pub use filter::Filter;
pub use models::{Priority, Stats, Task, TaskFields};
pub use render::{Action, Renderer};
pub use shell::Shell;
pub use store::{Confirm, DEFAULT_STORAGE_KEY, DeleteOutcome, TaskStore};
