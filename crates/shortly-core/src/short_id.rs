use crate::error::StorageError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Length of every short identifier.
pub const SHORT_ID_LENGTH: usize = 8;

/// A validated short identifier for a shortened URL.
///
/// Short ids are exactly 8 characters drawn from `[A-Za-z0-9]`.
/// Uniqueness is enforced by the storage backend, not by this type.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShortId(String);

impl ShortId {
    /// Creates a new `ShortId` after validating the input.
    pub fn new(id: impl Into<String>) -> Result<Self, StorageError> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    /// Creates a `ShortId` without validation.
    ///
    /// Use this only for ids produced by trusted internal sources
    /// (e.g. an id generator guaranteed to produce valid output).
    pub fn new_unchecked(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the short id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(id: &str) -> Result<(), StorageError> {
        if id.len() != SHORT_ID_LENGTH {
            return Err(StorageError::InvalidData(format!(
                "short id must be {} characters, got {}",
                SHORT_ID_LENGTH,
                id.len()
            )));
        }
        if !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(StorageError::InvalidData(format!(
                "short id must contain only alphanumeric characters: '{}'",
                id
            )));
        }
        Ok(())
    }
}

impl Display for ShortId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ShortId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
