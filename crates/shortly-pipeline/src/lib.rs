//! Asynchronous batch-delete pipeline.
//!
//! Deletions are never applied on the request path: callers enqueue a
//! [`BatchDeleteRequest`] and get an acknowledgement as soon as it is
//! queued, while a single long-lived consumer task applies requests to
//! the active backend in FIFO order. Deletion is at-most-once and
//! best-effort: a failed delete is logged and dropped, never retried.

use shortly_core::{BatchDeleteRequest, Storage};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Default queue capacity. Small on purpose: a burst of delete
/// requests backpressures producers instead of growing unbounded.
pub const DEFAULT_CAPACITY: usize = 3;

/// Error returned by [`DeletePipeline::submit`] after shutdown.
#[derive(Debug, Clone, Error)]
#[error("delete pipeline is shut down")]
pub struct PipelineClosed;

/// A bounded queue of delete requests with exactly one consumer task.
///
/// Requests are processed in submission order, but a delete is not
/// ordered relative to concurrent saves: a save racing an enqueued
/// delete can observe the pre-delete state until the consumer catches
/// up.
#[derive(Debug)]
pub struct DeletePipeline {
    tx: mpsc::Sender<BatchDeleteRequest>,
    worker: JoinHandle<()>,
}

impl DeletePipeline {
    /// Spawns the consumer task over `storage` with the default queue
    /// capacity.
    pub fn spawn(storage: Arc<dyn Storage>) -> Self {
        Self::with_capacity(storage, DEFAULT_CAPACITY)
    }

    /// Spawns the consumer task with an explicit queue capacity.
    pub fn with_capacity(storage: Arc<dyn Storage>, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        let worker = tokio::spawn(consume(storage, rx));
        Self { tx, worker }
    }

    /// Enqueues a delete request, waiting only if the queue is full.
    ///
    /// Returning `Ok` means the request is queued, not applied;
    /// deletion is eventually consistent from the caller's point of
    /// view.
    pub async fn submit(&self, request: BatchDeleteRequest) -> Result<(), PipelineClosed> {
        self.tx.send(request).await.map_err(|_| PipelineClosed)
    }

    /// Closes the queue and waits for the consumer to drain it.
    ///
    /// Requests queued before shutdown are completed, not abandoned;
    /// nothing can be enqueued afterwards.
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.worker.await {
            error!(error = %e, "delete pipeline worker panicked");
        }
    }
}

async fn consume(storage: Arc<dyn Storage>, mut rx: mpsc::Receiver<BatchDeleteRequest>) {
    // recv returns None only once the channel is closed and drained,
    // so in-flight requests survive shutdown.
    while let Some(request) = rx.recv().await {
        debug!(
            user_id = %request.user_id,
            ids = request.short_ids.len(),
            "processing delete request"
        );
        if let Err(e) = storage.delete_user_urls(&request).await {
            // Best-effort by design: log and move on.
            error!(user_id = %request.user_id, error = %e, "delete user urls failed");
        }
    }
}
