//! Core types and traits for the shortly URL-shortener storage layer.
//!
//! This crate defines the data model, the error taxonomy, and the
//! [`Storage`] contract that every backend implements.

pub mod error;
pub mod model;
pub mod short_id;
pub mod storage;

pub use error::{Result, StorageError};
pub use model::{
    BatchDeleteRequest, BatchSaveEntry, BatchSaveResult, SaveOutcome, Stat, UrlPair, UrlRecord,
};
pub use short_id::ShortId;
pub use storage::Storage;
