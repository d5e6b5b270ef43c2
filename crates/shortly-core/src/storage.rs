use crate::error::Result;
use crate::model::{BatchDeleteRequest, BatchSaveEntry, BatchSaveResult, SaveOutcome, Stat, UrlPair};
use crate::short_id::ShortId;
use async_trait::async_trait;

/// The uniform contract implemented by every storage backend.
///
/// The three backends (in-memory, file-log, relational) are
/// interchangeable behind this trait; callers pick one at startup and
/// pass it down explicitly. Deletions go through
/// `delete_user_urls` only from the delete pipeline's consumer task,
/// never directly from request handling.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    /// Persists a mapping for `url` owned by `user_id`.
    ///
    /// Returns [`SaveOutcome::Existing`] when the backend detects that
    /// the URL is already shortened (relational backend only); the
    /// existing short id is returned, no duplicate is created.
    async fn save_url(&self, user_id: &str, url: &str) -> Result<SaveOutcome>;

    /// Persists one mapping per entry, echoing each entry's
    /// correlation id in the paired result.
    async fn save_url_batch(
        &self,
        user_id: &str,
        batch: Vec<BatchSaveEntry>,
    ) -> Result<Vec<BatchSaveResult>>;

    /// Looks up the original URL for a short id.
    ///
    /// Returns `Err(NotFound)` for an unknown id and `Err(Gone)` for a
    /// soft-deleted one; deleted content is never returned.
    async fn find_url(&self, id: &ShortId) -> Result<String>;

    /// Lists every mapping owned by `user_id`. An empty list is not an
    /// error.
    async fn find_user_urls(&self, user_id: &str) -> Result<Vec<UrlPair>>;

    /// Soft-deletes the requested short ids on behalf of the request's
    /// user. Ownership handling is backend-specific: the in-memory and
    /// file backends report per-id failures as
    /// [`crate::StorageError::PartialDelete`] while still applying
    /// every id that validated; the relational backend silently skips
    /// non-matching rows.
    async fn delete_user_urls(&self, request: &BatchDeleteRequest) -> Result<()>;

    /// Recomputes aggregate counts over the stored record set.
    async fn find_stats(&self) -> Result<Stat>;

    /// Probes backend connectivity. Backends without an external
    /// dependency return `Err(PingUnsupported)`.
    async fn ping(&self) -> Result<()>;

    /// Releases backend resources. Write-through backends have already
    /// flushed every write, so this performs no extra flush.
    async fn close(&self) -> Result<()>;
}
