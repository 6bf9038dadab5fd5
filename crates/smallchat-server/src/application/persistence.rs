//! Persistence Worker
//!
//! A single background task owns the durable repository. Producers submit
//! jobs through a bounded channel; jobs run one at a time, in submission
//! order, so durable store calls never overlap.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;

use smallchat::{ChatMessage, DomainError, MessageRepository};

/// Persistence worker configuration
#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    /// Maximum number of queued jobs before new ones are dropped
    pub queue_capacity: usize,
    /// Upper bound on a single durable store call
    pub io_timeout: Duration,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            io_timeout: Duration::from_secs(10),
        }
    }
}

type LoadReply = oneshot::Sender<Result<Vec<ChatMessage>, DomainError>>;

enum PersistJob {
    Save(ChatMessage),
    DeleteBefore(DateTime<Utc>),
    LoadSince {
        cutoff: DateTime<Utc>,
        reply: LoadReply,
    },
}

impl PersistJob {
    fn kind(&self) -> &'static str {
        match self {
            PersistJob::Save(_) => "save",
            PersistJob::DeleteBefore(_) => "delete",
            PersistJob::LoadSince { .. } => "load",
        }
    }
}

/// Submission side of the persistence worker
#[derive(Clone)]
pub struct PersistenceHandle {
    tx: mpsc::Sender<PersistJob>,
}

impl PersistenceHandle {
    /// Queue a message for persistence without waiting
    pub fn save(&self, message: ChatMessage) {
        self.submit(PersistJob::Save(message));
    }

    /// Queue a best-effort delete of everything older than `cutoff`
    pub fn delete_before(&self, cutoff: DateTime<Utc>) {
        self.submit(PersistJob::DeleteBefore(cutoff));
    }

    /// Load everything at or after `cutoff`, waiting behind queued jobs
    pub async fn load_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<ChatMessage>, DomainError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(PersistJob::LoadSince { cutoff, reply })
            .await
            .map_err(|_| worker_stopped())?;

        rx.await.map_err(|_| worker_stopped())?
    }

    fn submit(&self, job: PersistJob) {
        let kind = job.kind();
        match self.tx.try_send(job) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::warn!("Persistence queue full, dropping {} job", kind);
            }
            Err(TrySendError::Closed(_)) => {
                tracing::warn!("Persistence worker stopped, dropping {} job", kind);
            }
        }
    }
}

fn worker_stopped() -> DomainError {
    DomainError::ExternalService("persistence worker stopped".to_string())
}

/// Spawn the worker task. It exits once every handle has been dropped.
pub fn spawn<R>(repo: Arc<R>, config: PersistenceConfig) -> PersistenceHandle
where
    R: MessageRepository + ?Sized + 'static,
{
    let (tx, mut rx) = mpsc::channel::<PersistJob>(config.queue_capacity.max(1));
    let io_timeout = config.io_timeout;

    tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            match job {
                PersistJob::Save(message) => {
                    match with_timeout(io_timeout, repo.save(&message)).await {
                        Ok(()) => tracing::debug!("Persisted message {}", message.id),
                        Err(e) => {
                            tracing::warn!("Failed to persist message {}: {}", message.id, e)
                        }
                    }
                }
                PersistJob::DeleteBefore(cutoff) => {
                    match with_timeout(io_timeout, repo.delete_before(cutoff)).await {
                        Ok(0) => {}
                        Ok(deleted) => {
                            tracing::info!("Durable store cleanup deleted {} old messages", deleted)
                        }
                        Err(e) => tracing::warn!("Durable store cleanup failed: {}", e),
                    }
                }
                PersistJob::LoadSince { cutoff, reply } => {
                    let result = with_timeout(io_timeout, repo.load_since(cutoff)).await;
                    // The caller may have given up waiting; nothing to do then.
                    let _ = reply.send(result);
                }
            }
        }

        tracing::debug!("Persistence worker stopped");
    });

    PersistenceHandle { tx }
}

async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, DomainError>
where
    F: Future<Output = Result<T, DomainError>>,
{
    tokio::time::timeout(limit, call).await.map_err(|_| {
        DomainError::ExternalService(format!("durable store call timed out after {:?}", limit))
    })?
}
