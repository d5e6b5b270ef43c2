use async_trait::async_trait;
use shortly_core::{
    BatchDeleteRequest, BatchSaveEntry, BatchSaveResult, Result, SaveOutcome, ShortId, Stat,
    Storage, StorageError, UrlPair,
};
use shortly_generator::{IdGenerator, RandomGenerator};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::debug;

/// Postgres implementation of the storage contract.
///
/// Dedup-on-conflict lives here: saves run an insert-or-nothing upsert
/// keyed on `original_url` and read back the winning short id in the
/// same round trip, so an already-shortened URL yields its existing
/// mapping instead of a duplicate. Soft delete is a flag update that
/// silently skips rows the requesting user does not own, unlike the
/// in-memory and file backends which report those per id.
#[derive(Debug)]
pub struct PostgresStorage<G = RandomGenerator> {
    pool: PgPool,
    generator: G,
}

impl PostgresStorage<RandomGenerator> {
    /// Opens a pooled connection and applies the schema migrations,
    /// using the default random generator.
    pub async fn connect(database_url: &str) -> Result<Self> {
        Self::connect_with_generator(database_url, RandomGenerator::new()).await
    }
}

impl<G: IdGenerator> PostgresStorage<G> {
    /// Opens a pooled connection with a custom id generator.
    pub async fn connect_with_generator(database_url: &str, generator: G) -> Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Self::new(pool, generator).await
    }

    /// Creates a storage from an existing pool, applying the schema
    /// migrations first. Construction fails rather than starting with
    /// a partially-applied schema.
    pub async fn new(pool: PgPool, generator: G) -> Result<Self> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StorageError::Query(format!("apply migrations: {e}")))?;
        Ok(Self { pool, generator })
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// Insert the new mapping unless the URL is already shortened, then
// select back whichever short id owns the URL now. Comparing the
// returned id with the generated one detects the conflict.
const UPSERT_SQL: &str = r#"
WITH new_row AS (
    INSERT INTO shortener (short_url, original_url, user_id)
    VALUES ($1, $2, $3)
    ON CONFLICT (original_url) DO NOTHING
    RETURNING short_url
)
SELECT short_url FROM new_row
UNION
SELECT short_url FROM shortener WHERE original_url = $2
"#;

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

#[async_trait]
impl<G: IdGenerator> Storage for PostgresStorage<G> {
    async fn save_url(&self, user_id: &str, url: &str) -> Result<SaveOutcome> {
        let generated = self.generator.generate();

        let stored: String = sqlx::query_scalar(UPSERT_SQL)
            .bind(generated.as_str())
            .bind(url)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if stored == generated.as_str() {
            Ok(SaveOutcome::Created(generated))
        } else {
            debug!(user_id, short_id = %stored, "url already shortened");
            Ok(SaveOutcome::Existing(ShortId::new_unchecked(stored)))
        }
    }

    /// Runs the same upsert per entry inside one transaction; any
    /// failure rolls back the whole batch.
    async fn save_url_batch(
        &self,
        user_id: &str,
        batch: Vec<BatchSaveEntry>,
    ) -> Result<Vec<BatchSaveResult>> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let mut results = Vec::with_capacity(batch.len());
        for entry in batch {
            let generated = self.generator.generate();
            let stored: String = sqlx::query_scalar(UPSERT_SQL)
                .bind(generated.as_str())
                .bind(&entry.original_url)
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
            results.push(BatchSaveResult {
                correlation_id: entry.correlation_id,
                short_id: ShortId::new_unchecked(stored),
            });
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(results)
    }

    async fn find_url(&self, id: &ShortId) -> Result<String> {
        let row = sqlx::query(
            "SELECT original_url, is_deleted FROM shortener WHERE short_url = $1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Err(StorageError::NotFound(id.to_string()));
        };

        let is_deleted: bool = row.try_get("is_deleted").map_err(map_sqlx_error)?;
        if is_deleted {
            return Err(StorageError::Gone(id.to_string()));
        }
        row.try_get("original_url").map_err(map_sqlx_error)
    }

    async fn find_user_urls(&self, user_id: &str) -> Result<Vec<UrlPair>> {
        let rows = sqlx::query(
            "SELECT short_url, original_url FROM shortener WHERE user_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|row| {
                let short_url: String = row.try_get("short_url").map_err(map_sqlx_error)?;
                let original_url: String = row.try_get("original_url").map_err(map_sqlx_error)?;
                Ok(UrlPair {
                    short_id: ShortId::new_unchecked(short_url),
                    original_url,
                })
            })
            .collect()
    }

    /// One dynamically-built `UPDATE ... WHERE short_url IN (...)` in
    /// a single transaction. Ids that don't exist or belong to another
    /// user simply match no row: a silent no-op, not an error. That
    /// intentionally differs from the in-memory and file backends.
    async fn delete_user_urls(&self, request: &BatchDeleteRequest) -> Result<()> {
        if request.short_ids.is_empty() {
            return Ok(());
        }

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE shortener SET is_deleted = TRUE WHERE user_id = ");
        builder.push_bind(&request.user_id);
        builder.push(" AND short_url IN (");
        let mut ids = builder.separated(", ");
        for id in &request.short_ids {
            ids.push_bind(id.as_str());
        }
        ids.push_unseparated(")");

        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        let result = builder
            .build()
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        tx.commit().await.map_err(map_sqlx_error)?;

        debug!(
            user_id = %request.user_id,
            requested = request.short_ids.len(),
            updated = result.rows_affected(),
            "deleted user urls"
        );
        Ok(())
    }

    async fn find_stats(&self) -> Result<Stat> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS urls, COUNT(DISTINCT user_id) AS users FROM shortener",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let urls: i64 = row.try_get("urls").map_err(map_sqlx_error)?;
        let users: i64 = row.try_get("users").map_err(map_sqlx_error)?;
        Ok(Stat {
            urls: urls as u64,
            users: users as u64,
        })
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}
