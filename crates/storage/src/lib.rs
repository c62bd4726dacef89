#![forbid(unsafe_code)]

pub mod json_dir;
pub mod repository;
pub mod sqlite;
pub mod store;

pub use json_dir::JsonDirRepository;
pub use repository::{InMemoryRepository, ProgressRepository, Storage, StorageError};
pub use sqlite::{SqliteInitError, SqliteRepository};
pub use store::ProgressStore;
