use async_trait::async_trait;
use shortly_core::{
    BatchDeleteRequest, BatchSaveEntry, BatchSaveResult, Result, SaveOutcome, ShortId, Stat,
    Storage, StorageError, UrlPair, UrlRecord,
};
use shortly_generator::{IdGenerator, RandomGenerator};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// The lock-free index shared by the in-memory and file backends.
///
/// Maintains both access paths: short id to record for point lookups,
/// and owner to insertion-ordered id list for per-user listings.
/// Callers provide the locking; [`MemoryStorage`] wraps this in a
/// reader/writer lock and [`crate::FileStorage`] embeds it under its
/// own exclusive lock next to the log file.
#[derive(Debug, Default)]
pub(crate) struct MemoryIndex {
    items: HashMap<String, UrlRecord>,
    user_urls: HashMap<String, Vec<String>>,
}

impl MemoryIndex {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, id: &ShortId, record: UrlRecord) {
        self.user_urls
            .entry(record.user_id.clone())
            .or_default()
            .push(id.as_str().to_owned());
        self.items.insert(id.as_str().to_owned(), record);
    }

    pub(crate) fn find(&self, id: &ShortId) -> Result<&UrlRecord> {
        let record = self
            .items
            .get(id.as_str())
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        if record.deleted {
            return Err(StorageError::Gone(id.to_string()));
        }
        Ok(record)
    }

    pub(crate) fn user_urls(&self, user_id: &str) -> Vec<UrlPair> {
        let Some(ids) = self.user_urls.get(user_id) else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|id| {
                self.items.get(id).map(|record| UrlPair {
                    short_id: ShortId::new_unchecked(id.clone()),
                    original_url: record.original_url.clone(),
                })
            })
            .collect()
    }

    /// Flips the deleted flag on every id that exists and is owned by
    /// the request's user; collects one issue per id that fails either
    /// check. Partial success is the norm: valid ids are applied even
    /// when others in the same request fail.
    pub(crate) fn delete_user_urls(&mut self, request: &BatchDeleteRequest) -> Result<()> {
        let mut issues = Vec::new();
        for id in &request.short_ids {
            match self.items.get_mut(id.as_str()) {
                None => issues.push(format!("short id not found: {}", id)),
                Some(record) if record.user_id != request.user_id => issues.push(format!(
                    "short id {} is not owned by {}",
                    id, request.user_id
                )),
                Some(record) => record.deleted = true,
            }
        }
        if issues.is_empty() {
            Ok(())
        } else {
            Err(StorageError::PartialDelete(issues))
        }
    }

    pub(crate) fn stats(&self) -> Stat {
        Stat {
            urls: self.items.len() as u64,
            users: self.user_urls.len() as u64,
        }
    }
}

/// Canonical in-memory backend.
///
/// All operations go through a single reader/writer lock: reads may
/// proceed concurrently, writes are exclusive. The backend does not
/// dedup by URL (that is a relational-backend behavior) and does not
/// re-check generated ids before insert, so an id collision overwrites
/// the previous record.
#[derive(Debug)]
pub struct MemoryStorage<G = RandomGenerator> {
    index: RwLock<MemoryIndex>,
    generator: G,
}

impl MemoryStorage<RandomGenerator> {
    /// Creates an in-memory backend with the default random generator.
    pub fn new() -> Self {
        Self::with_generator(RandomGenerator::new())
    }
}

impl Default for MemoryStorage<RandomGenerator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: IdGenerator> MemoryStorage<G> {
    /// Creates an in-memory backend with a custom id generator.
    pub fn with_generator(generator: G) -> Self {
        Self {
            index: RwLock::new(MemoryIndex::new()),
            generator,
        }
    }
}

#[async_trait]
impl<G: IdGenerator> Storage for MemoryStorage<G> {
    async fn save_url(&self, user_id: &str, url: &str) -> Result<SaveOutcome> {
        let id = self.generator.generate();
        let mut index = self.index.write().await;
        index.insert(&id, UrlRecord::new(url, user_id));
        debug!(user_id, short_id = %id, "saved url");
        Ok(SaveOutcome::Created(id))
    }

    async fn save_url_batch(
        &self,
        user_id: &str,
        batch: Vec<BatchSaveEntry>,
    ) -> Result<Vec<BatchSaveResult>> {
        let mut index = self.index.write().await;
        let mut results = Vec::with_capacity(batch.len());
        for entry in batch {
            let id = self.generator.generate();
            index.insert(&id, UrlRecord::new(entry.original_url, user_id));
            results.push(BatchSaveResult {
                correlation_id: entry.correlation_id,
                short_id: id,
            });
        }
        Ok(results)
    }

    async fn find_url(&self, id: &ShortId) -> Result<String> {
        let index = self.index.read().await;
        let record = index.find(id)?;
        Ok(record.original_url.clone())
    }

    async fn find_user_urls(&self, user_id: &str) -> Result<Vec<UrlPair>> {
        let index = self.index.read().await;
        Ok(index.user_urls(user_id))
    }

    async fn delete_user_urls(&self, request: &BatchDeleteRequest) -> Result<()> {
        let mut index = self.index.write().await;
        index.delete_user_urls(request)
    }

    async fn find_stats(&self) -> Result<Stat> {
        let index = self.index.read().await;
        Ok(index.stats())
    }

    async fn ping(&self) -> Result<()> {
        Err(StorageError::PingUnsupported)
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shortly_generator::seq::FixedGenerator;
    use shortly_generator::SeqGenerator;
    use std::sync::Arc;

    fn delete_request(user_id: &str, ids: &[&str]) -> BatchDeleteRequest {
        BatchDeleteRequest::new(
            user_id,
            ids.iter().map(|id| ShortId::new_unchecked(*id)).collect(),
        )
    }

    #[tokio::test]
    async fn save_and_find() {
        let storage = MemoryStorage::new();

        let outcome = storage.save_url("u1", "https://example.com").await.unwrap();
        assert!(!outcome.is_conflict());

        let url = storage.find_url(outcome.short_id()).await.unwrap();
        assert_eq!(url, "https://example.com");
    }

    #[tokio::test]
    async fn find_unknown_id_is_not_found() {
        let storage = MemoryStorage::new();

        let err = storage
            .find_url(&ShortId::new_unchecked("AAAAAAAA"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn deleted_id_is_gone_not_not_found() {
        let storage = MemoryStorage::new();

        let id = storage
            .save_url("u1", "https://example.com")
            .await
            .unwrap()
            .into_short_id();
        storage
            .delete_user_urls(&BatchDeleteRequest::new("u1", vec![id.clone()]))
            .await
            .unwrap();

        let err = storage.find_url(&id).await.unwrap_err();
        assert!(matches!(err, StorageError::Gone(_)));
    }

    #[tokio::test]
    async fn user_urls_empty_for_unknown_user() {
        let storage = MemoryStorage::new();

        let pairs = storage.find_user_urls("nobody").await.unwrap();
        assert!(pairs.is_empty());
    }

    #[tokio::test]
    async fn user_urls_lists_owned_records_in_insert_order() {
        let storage = MemoryStorage::with_generator(SeqGenerator::default());

        storage.save_url("u1", "https://a.test").await.unwrap();
        storage.save_url("u2", "https://b.test").await.unwrap();
        storage.save_url("u1", "https://c.test").await.unwrap();

        let pairs = storage.find_user_urls("u1").await.unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].original_url, "https://a.test");
        assert_eq!(pairs[1].original_url, "https://c.test");
    }

    #[tokio::test]
    async fn batch_save_preserves_correlation_ids() {
        let storage = MemoryStorage::new();

        let batch = vec![
            BatchSaveEntry {
                correlation_id: "first".to_string(),
                original_url: "https://a.test".to_string(),
            },
            BatchSaveEntry {
                correlation_id: "second".to_string(),
                original_url: "https://b.test".to_string(),
            },
        ];
        let results = storage.save_url_batch("u1", batch).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].correlation_id, "first");
        assert_eq!(results[1].correlation_id, "second");
        assert_ne!(results[0].short_id, results[1].short_id);
    }

    #[tokio::test]
    async fn delete_applies_valid_ids_and_reports_invalid_ones() {
        let storage = MemoryStorage::new();

        let mine = storage
            .save_url("u1", "https://mine.test")
            .await
            .unwrap()
            .into_short_id();
        let foreign = storage
            .save_url("u2", "https://foreign.test")
            .await
            .unwrap()
            .into_short_id();

        let request = BatchDeleteRequest::new(
            "u1",
            vec![
                mine.clone(),
                foreign.clone(),
                ShortId::new_unchecked("missing0"),
            ],
        );
        let err = storage.delete_user_urls(&request).await.unwrap_err();

        match err {
            StorageError::PartialDelete(issues) => assert_eq!(issues.len(), 2),
            other => panic!("expected PartialDelete, got {other:?}"),
        }

        // The owned id was deleted despite the failures.
        assert!(matches!(
            storage.find_url(&mine).await.unwrap_err(),
            StorageError::Gone(_)
        ));
        // The foreign record is untouched.
        assert_eq!(
            storage.find_url(&foreign).await.unwrap(),
            "https://foreign.test"
        );
    }

    #[tokio::test]
    async fn delete_with_foreign_owner_does_not_delete() {
        let storage = MemoryStorage::new();

        let id = storage
            .save_url("u1", "https://example.com")
            .await
            .unwrap()
            .into_short_id();

        let err = storage
            .delete_user_urls(&delete_request("u2", &[id.as_str()]))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::PartialDelete(_)));

        assert_eq!(storage.find_url(&id).await.unwrap(), "https://example.com");
    }

    #[tokio::test]
    async fn stats_count_records_and_owners() {
        let storage = MemoryStorage::new();

        storage.save_url("u1", "https://a.test").await.unwrap();
        storage.save_url("u1", "https://b.test").await.unwrap();
        storage.save_url("u2", "https://c.test").await.unwrap();

        let stats = storage.find_stats().await.unwrap();
        assert_eq!(stats, Stat { urls: 3, users: 2 });
    }

    #[tokio::test]
    async fn ping_is_unsupported() {
        let storage = MemoryStorage::new();

        let err = storage.ping().await.unwrap_err();
        assert!(matches!(err, StorageError::PingUnsupported));
    }

    // Known limitation: generated ids are not re-checked before insert,
    // so a colliding id overwrites the previous record (last write wins).
    #[tokio::test]
    async fn colliding_id_overwrites_previous_record() {
        let generator = FixedGenerator::new(ShortId::new_unchecked("AAAAAAAA"));
        let storage = MemoryStorage::with_generator(generator);

        storage.save_url("u1", "https://first.test").await.unwrap();
        storage.save_url("u1", "https://second.test").await.unwrap();

        let url = storage
            .find_url(&ShortId::new_unchecked("AAAAAAAA"))
            .await
            .unwrap();
        assert_eq!(url, "https://second.test");
    }

    #[tokio::test]
    async fn concurrent_saves_lose_no_updates() {
        let storage = Arc::new(MemoryStorage::with_generator(SeqGenerator::default()));
        let mut handles = vec![];

        for i in 0..50u64 {
            let storage = Arc::clone(&storage);
            handles.push(tokio::spawn(async move {
                storage
                    .save_url(&format!("user-{}", i % 5), &format!("https://site{}.test", i))
                    .await
                    .unwrap()
            }));
        }

        let mut ids = std::collections::HashSet::new();
        for handle in handles {
            let outcome = handle.await.unwrap();
            ids.insert(outcome.into_short_id());
        }

        assert_eq!(ids.len(), 50);
        let stats = storage.find_stats().await.unwrap();
        assert_eq!(stats.urls, 50);
        assert_eq!(stats.users, 5);
    }
}
