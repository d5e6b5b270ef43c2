//! Storage backends for the shortly URL shortener.
//!
//! Three interchangeable implementations of [`shortly_core::Storage`]:
//! an in-memory map, an append-only file log with an in-memory index,
//! and a Postgres-backed store. [`StorageConfig`] selects and
//! constructs one of them.

pub mod config;
pub mod file;
pub mod memory;
pub mod postgres;

pub use config::StorageConfig;
pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use postgres::PostgresStorage;

pub use shortly_core::{Result, Storage, StorageError};
