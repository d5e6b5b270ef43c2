use crate::memory::MemoryIndex;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shortly_core::{
    BatchDeleteRequest, BatchSaveEntry, BatchSaveResult, Result, SaveOutcome, ShortId, Stat,
    Storage, StorageError, UrlPair, UrlRecord,
};
use shortly_generator::{IdGenerator, RandomGenerator};
use std::collections::HashMap;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// One line of the append-only log.
///
/// The log is newline-delimited JSON; on replay the last line for a
/// given short id wins, line order implies nothing else.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LogRecord {
    #[serde(rename = "uuid")]
    sequence: i64,
    short_url: String,
    original_url: String,
    user_id: String,
    is_deleted: bool,
}

impl LogRecord {
    fn into_record(self) -> UrlRecord {
        UrlRecord {
            original_url: self.original_url,
            user_id: self.user_id,
            deleted: self.is_deleted,
        }
    }
}

#[derive(Debug)]
struct FileState {
    file: File,
    index: MemoryIndex,
    sequence: i64,
}

/// Durable backend: an append-only record log plus an in-memory index.
///
/// Every write appends to the file and flushes before touching the
/// index, so a crash between the two leaves the index re-derivable
/// from the file on the next startup. Both steps happen under one
/// exclusive lock; reads are served from the index alone.
///
/// Soft-delete compacts: the whole file is re-read, targeted records
/// get their flag flipped, and the log is truncated and rewritten in
/// full. Deletes are infrequent and batched, so the O(n) rewrite is
/// the accepted price of append-only durability.
#[derive(Debug)]
pub struct FileStorage<G = RandomGenerator> {
    path: PathBuf,
    state: RwLock<FileState>,
    generator: G,
}

impl FileStorage<RandomGenerator> {
    /// Opens (or creates) the log at `path`, replaying it into a fresh
    /// in-memory index. A malformed record aborts with an error; there
    /// is no partial recovery.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with_generator(path, RandomGenerator::new()).await
    }
}

impl<G: IdGenerator> FileStorage<G> {
    /// Opens (or creates) the log at `path` with a custom id generator.
    pub async fn open_with_generator(path: impl Into<PathBuf>, generator: G) -> Result<Self> {
        let path = path.into();
        let (index, sequence) = replay(&path).await?;
        info!(path = %path.display(), records = sequence, "replayed file log");

        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)
            .await
            .map_err(|e| StorageError::Io(format!("open {}: {e}", path.display())))?;

        Ok(Self {
            path,
            state: RwLock::new(FileState {
                file,
                index,
                sequence,
            }),
            generator,
        })
    }
}

/// Reads the log sequentially and rebuilds the index in file order,
/// so the last write for a given short id wins.
async fn replay(path: &Path) -> Result<(MemoryIndex, i64)> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(StorageError::Io(format!("read {}: {e}", path.display()))),
    };

    let mut index = MemoryIndex::new();
    let mut sequence = 0i64;
    for (line_number, line) in contents.lines().enumerate() {
        let record: LogRecord = serde_json::from_str(line).map_err(|e| {
            StorageError::InvalidData(format!("malformed log record at line {line_number}: {e}"))
        })?;
        let id = ShortId::new_unchecked(record.short_url.clone());
        index.insert(&id, record.into_record());
        sequence += 1;
    }
    Ok((index, sequence))
}

fn encode(record: &LogRecord) -> Result<Vec<u8>> {
    let mut buf = serde_json::to_vec(record)
        .map_err(|e| StorageError::Serialization(format!("encode log record: {e}")))?;
    buf.push(b'\n');
    Ok(buf)
}

async fn append(file: &mut File, record: &LogRecord) -> Result<()> {
    let buf = encode(record)?;
    file.write_all(&buf)
        .await
        .map_err(|e| StorageError::Io(format!("append log record: {e}")))
}

async fn flush(file: &mut File) -> Result<()> {
    file.flush()
        .await
        .map_err(|e| StorageError::Io(format!("flush log: {e}")))
}

#[async_trait]
impl<G: IdGenerator> Storage for FileStorage<G> {
    async fn save_url(&self, user_id: &str, url: &str) -> Result<SaveOutcome> {
        let id = self.generator.generate();
        let mut state = self.state.write().await;

        state.sequence += 1;
        let record = LogRecord {
            sequence: state.sequence,
            short_url: id.as_str().to_owned(),
            original_url: url.to_owned(),
            user_id: user_id.to_owned(),
            is_deleted: false,
        };
        append(&mut state.file, &record).await?;
        flush(&mut state.file).await?;

        state.index.insert(&id, UrlRecord::new(url, user_id));
        debug!(user_id, short_id = %id, "saved url to file log");
        Ok(SaveOutcome::Created(id))
    }

    async fn save_url_batch(
        &self,
        user_id: &str,
        batch: Vec<BatchSaveEntry>,
    ) -> Result<Vec<BatchSaveResult>> {
        let mut state = self.state.write().await;
        let mut results = Vec::with_capacity(batch.len());

        for entry in batch {
            let id = self.generator.generate();
            state.sequence += 1;
            let record = LogRecord {
                sequence: state.sequence,
                short_url: id.as_str().to_owned(),
                original_url: entry.original_url.clone(),
                user_id: user_id.to_owned(),
                is_deleted: false,
            };
            append(&mut state.file, &record).await?;
            state.index.insert(&id, UrlRecord::new(entry.original_url, user_id));
            results.push(BatchSaveResult {
                correlation_id: entry.correlation_id,
                short_id: id,
            });
        }
        flush(&mut state.file).await?;

        Ok(results)
    }

    async fn find_url(&self, id: &ShortId) -> Result<String> {
        let state = self.state.read().await;
        let record = state.index.find(id)?;
        Ok(record.original_url.clone())
    }

    async fn find_user_urls(&self, user_id: &str) -> Result<Vec<UrlPair>> {
        let state = self.state.read().await;
        Ok(state.index.user_urls(user_id))
    }

    /// Soft-deletes by rewriting the whole log: the file is re-read
    /// into a short-id-keyed map (later lines win), the targeted
    /// records are flag-flipped with the same ownership checks as the
    /// in-memory backend, and the log plus index are rebuilt from the
    /// result. The exclusive lock is held for the entire rewrite.
    async fn delete_user_urls(&self, request: &BatchDeleteRequest) -> Result<()> {
        let mut state = self.state.write().await;

        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| StorageError::Io(format!("read {}: {e}", self.path.display())))?;
        let mut content: HashMap<String, LogRecord> = HashMap::new();
        for (line_number, line) in contents.lines().enumerate() {
            let record: LogRecord = serde_json::from_str(line).map_err(|e| {
                StorageError::InvalidData(format!(
                    "malformed log record at line {line_number}: {e}"
                ))
            })?;
            content.insert(record.short_url.clone(), record);
        }

        let mut issues = Vec::new();
        for id in &request.short_ids {
            match content.get_mut(id.as_str()) {
                None => issues.push(format!("short id not found: {}", id)),
                Some(record) if record.user_id != request.user_id => issues.push(format!(
                    "short id {} is not owned by {}",
                    id, request.user_id
                )),
                Some(record) => record.is_deleted = true,
            }
        }

        state
            .file
            .set_len(0)
            .await
            .map_err(|e| StorageError::Io(format!("truncate log: {e}")))?;
        state
            .file
            .seek(SeekFrom::Start(0))
            .await
            .map_err(|e| StorageError::Io(format!("seek log: {e}")))?;

        let mut index = MemoryIndex::new();
        for record in content.into_values() {
            append(&mut state.file, &record).await?;
            let id = ShortId::new_unchecked(record.short_url.clone());
            index.insert(&id, record.into_record());
        }
        flush(&mut state.file).await?;
        state.index = index;

        if issues.is_empty() {
            Ok(())
        } else {
            Err(StorageError::PartialDelete(issues))
        }
    }

    async fn find_stats(&self) -> Result<Stat> {
        let state = self.state.read().await;
        Ok(state.index.stats())
    }

    async fn ping(&self) -> Result<()> {
        Err(StorageError::PingUnsupported)
    }

    async fn close(&self) -> Result<()> {
        // Every write already flushed synchronously; the handle is
        // closed when the storage is dropped.
        Ok(())
    }
}
