use crate::short_id::ShortId;
use serde::{Deserialize, Serialize};

/// A stored URL mapping.
///
/// Records are created once and never mutated except to flip
/// `deleted`; soft-deleted records keep their content but must never
/// be returned by lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    /// The original URL that was shortened.
    pub original_url: String,
    /// The user that owns this mapping.
    pub user_id: String,
    /// Soft-delete marker.
    pub deleted: bool,
}

impl UrlRecord {
    /// Creates a new, non-deleted record.
    pub fn new(original_url: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            original_url: original_url.into(),
            user_id: user_id.into(),
            deleted: false,
        }
    }
}

/// A `(short id, original URL)` pair returned by per-user listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlPair {
    pub short_id: ShortId,
    pub original_url: String,
}

/// One entry of a batch save request.
///
/// The correlation id is caller-supplied and echoed back unchanged in
/// the paired [`BatchSaveResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSaveEntry {
    pub correlation_id: String,
    pub original_url: String,
}

/// One entry of a batch save response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSaveResult {
    pub correlation_id: String,
    pub short_id: ShortId,
}

/// A unit of work for the delete pipeline: a set of short ids to
/// soft-delete on behalf of one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchDeleteRequest {
    pub user_id: String,
    pub short_ids: Vec<ShortId>,
}

impl BatchDeleteRequest {
    pub fn new(user_id: impl Into<String>, short_ids: Vec<ShortId>) -> Self {
        Self {
            user_id: user_id.into(),
            short_ids,
        }
    }
}

/// Aggregate counts over the stored record set, recomputed on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stat {
    /// Number of stored URL records.
    pub urls: u64,
    /// Number of distinct owners.
    pub users: u64,
}

/// Result of a save: either a freshly created mapping or the
/// pre-existing one for a URL that was already shortened.
///
/// `Existing` is the conflict signal: the backend returns the short id
/// that already maps to the URL instead of creating a duplicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Created(ShortId),
    Existing(ShortId),
}

impl SaveOutcome {
    /// The short id for the URL, whether created now or pre-existing.
    pub fn short_id(&self) -> &ShortId {
        match self {
            SaveOutcome::Created(id) | SaveOutcome::Existing(id) => id,
        }
    }

    /// True when the save hit an already-shortened URL.
    pub fn is_conflict(&self) -> bool {
        matches!(self, SaveOutcome::Existing(_))
    }

    /// Consumes the outcome, returning the short id.
    pub fn into_short_id(self) -> ShortId {
        match self {
            SaveOutcome::Created(id) | SaveOutcome::Existing(id) => id,
        }
    }
}
