use thiserror::Error;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Error taxonomy shared by every storage backend.
///
/// `NotFound` and `Gone` are deliberately distinct: a soft-deleted id
/// must never be indistinguishable from one that never existed.
/// A save hitting an already-shortened URL is not an error at all,
/// see [`crate::SaveOutcome`].
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("short id not found: {0}")]
    NotFound(String),
    #[error("short id is deleted: {0}")]
    Gone(String),
    #[error("backend has no connectivity to probe")]
    PingUnsupported,
    #[error("partial delete failure: {}", .0.join("; "))]
    PartialDelete(Vec<String>),
    #[error("io error: {0}")]
    Io(String),
    #[error("serialization failed: {0}")]
    Serialization(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_delete_joins_issues() {
        let err = StorageError::PartialDelete(vec![
            "short id not found: aaaa0000".to_string(),
            "short id bbbb0000 is not owned by u1".to_string(),
        ]);
        let display = err.to_string();
        assert!(display.contains("aaaa0000"));
        assert!(display.contains("; "));
        assert!(display.contains("bbbb0000"));
    }

    #[test]
    fn gone_and_not_found_are_distinct() {
        let gone = StorageError::Gone("AAAAAAAA".to_string());
        let not_found = StorageError::NotFound("AAAAAAAA".to_string());
        assert!(matches!(gone, StorageError::Gone(_)));
        assert!(matches!(not_found, StorageError::NotFound(_)));
        assert_ne!(gone.to_string(), not_found.to_string());
    }
}
