//! Message Store (Use Case)
//!
//! Authoritative in-memory chat history, bounded by a retention window and
//! mirrored best-effort to the durable store. Memory always wins: durable
//! store failures are logged and never reach the caller.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use tokio::sync::RwLock;

use smallchat::{ChatMessage, DomainError, MessageRepository};

use super::persistence::{self, PersistenceConfig, PersistenceHandle};

struct StoredMessage {
    /// Store order, used to break timestamp ties
    seq: u64,
    message: ChatMessage,
}

#[derive(Default)]
struct Messages {
    by_id: HashMap<String, StoredMessage>,
    next_seq: u64,
}

impl Messages {
    /// Replace in place when the id is known, otherwise append
    fn upsert(&mut self, message: ChatMessage) {
        if let Some(stored) = self.by_id.get_mut(&message.id) {
            stored.message = message;
            return;
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.by_id
            .insert(message.id.clone(), StoredMessage { seq, message });
    }
}

/// In-memory message store with optional durable mirroring
pub struct MessageStore {
    messages: RwLock<Messages>,
    persistence: Option<PersistenceHandle>,
}

impl MessageStore {
    /// Create a store on top of `repo`.
    ///
    /// The persistence worker is only started when the repository reports
    /// itself enabled; that decision is fixed for the store's lifetime.
    pub fn new<R>(repo: Arc<R>, config: PersistenceConfig) -> Self
    where
        R: MessageRepository + ?Sized + 'static,
    {
        let persistence = if repo.is_enabled() {
            Some(persistence::spawn(repo, config))
        } else {
            tracing::info!("Durable store disabled - messages are kept in memory only");
            None
        };

        Self {
            messages: RwLock::new(Messages::default()),
            persistence,
        }
    }

    /// Whether saves are mirrored to a durable store
    pub fn persistence_enabled(&self) -> bool {
        self.persistence.is_some()
    }

    /// Insert or overwrite a message by id.
    ///
    /// The in-memory update is complete when this returns; the durable copy
    /// is written later by the persistence worker.
    pub async fn save(&self, message: ChatMessage) -> Result<(), DomainError> {
        message.validate()?;

        let mirror = self
            .persistence
            .as_ref()
            .map(|handle| (handle, message.clone()));

        self.messages.write().await.upsert(message);

        if let Some((handle, message)) = mirror {
            handle.save(message);
        }

        Ok(())
    }

    /// All messages, oldest first. JOIN/LEAVE are dropped unless `include_system`.
    pub async fn get_all(&self, include_system: bool) -> Vec<ChatMessage> {
        let mut snapshot: Vec<(u64, ChatMessage)> = {
            let messages = self.messages.read().await;
            messages
                .by_id
                .values()
                .filter(|stored| include_system || !stored.message.is_system())
                .map(|stored| (stored.seq, stored.message.clone()))
                .collect()
        };

        snapshot.sort_by(|(seq_a, a), (seq_b, b)| {
            a.timestamp.cmp(&b.timestamp).then(seq_a.cmp(seq_b))
        });

        snapshot.into_iter().map(|(_, message)| message).collect()
    }

    /// The newest `limit` messages, oldest first
    pub async fn get_recent(&self, limit: usize, include_system: bool) -> Vec<ChatMessage> {
        let all = self.get_all(include_system).await;
        let skip = all.len().saturating_sub(limit);
        all.into_iter().skip(skip).collect()
    }

    /// Number of stored messages of every type
    pub async fn count(&self) -> usize {
        self.messages.read().await.by_id.len()
    }

    /// Drop everything held in memory. The durable store is left untouched.
    pub async fn clear_all(&self) {
        self.messages.write().await.by_id.clear();
    }

    /// Evict messages older than `retention` from memory and, best-effort,
    /// from the durable store. Returns the number evicted from memory.
    pub async fn evict_older_than(&self, retention: Duration) -> usize {
        self.evict_before(Utc::now() - retention).await
    }

    /// Evict messages with `timestamp < cutoff`.
    ///
    /// The cutoff is truncated to whole milliseconds so memory and the
    /// durable store agree on which side of it a message falls.
    pub async fn evict_before(&self, cutoff: DateTime<Utc>) -> usize {
        let cutoff = window_start(cutoff);
        let removed = {
            let mut messages = self.messages.write().await;
            let before = messages.by_id.len();
            messages
                .by_id
                .retain(|_, stored| stored.message.timestamp >= cutoff);
            before - messages.by_id.len()
        };

        // Rows may exist in the durable store even when memory had nothing
        // to evict (e.g. after a clear), so the delete is always queued.
        if let Some(handle) = &self.persistence {
            handle.delete_before(cutoff);
        }

        if removed > 0 {
            tracing::info!("Cleaned up {} old messages from memory", removed);
        }

        removed
    }

    /// Load the retention window from the durable store into memory.
    ///
    /// Meant for startup. Failures are logged and leave the store as it was.
    pub async fn hydrate(&self, retention: Duration) -> usize {
        let Some(handle) = &self.persistence else {
            tracing::info!("Skipping hydration: durable store disabled");
            return 0;
        };

        match self.load_window(handle, Utc::now() - retention).await {
            Ok(loaded) => {
                tracing::info!("Hydrated {} messages from durable store", loaded);
                loaded
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to hydrate from durable store: {}. Continuing with in-memory state.",
                    e
                );
                0
            }
        }
    }

    /// Clear memory, then reload the retention window from the durable store.
    ///
    /// Returns the number of messages loaded; 0 when the durable store is
    /// disabled or the load fails, in which case the store stays empty.
    pub async fn reload(&self, retention: Duration) -> usize {
        self.clear_all().await;

        let Some(handle) = &self.persistence else {
            tracing::info!("Reload requested but durable store is disabled");
            return 0;
        };

        match self.load_window(handle, Utc::now() - retention).await {
            Ok(loaded) => {
                tracing::info!("Reloaded {} messages from durable store", loaded);
                loaded
            }
            Err(e) => {
                tracing::warn!("Reload from durable store failed: {}", e);
                0
            }
        }
    }

    async fn load_window(
        &self,
        handle: &PersistenceHandle,
        cutoff: DateTime<Utc>,
    ) -> Result<usize, DomainError> {
        let mut loaded: Vec<ChatMessage> = handle
            .load_since(window_start(cutoff))
            .await?
            .into_iter()
            .filter(|message| match message.validate() {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!("Skipping stored message {:?}: {}", message.id, e);
                    false
                }
            })
            .collect();

        // Insert oldest first so store order matches timestamp order; a
        // later row for the same id replaces the earlier one.
        loaded.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        let count = loaded
            .iter()
            .map(|message| message.id.as_str())
            .collect::<HashSet<_>>()
            .len();

        let mut messages = self.messages.write().await;
        for message in loaded {
            messages.upsert(message);
        }

        Ok(count)
    }
}

/// Cutoffs are compared at millisecond precision
fn window_start(cutoff: DateTime<Utc>) -> DateTime<Utc> {
    cutoff.trunc_subsecs(3)
}
