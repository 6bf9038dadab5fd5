//! Test helpers shared by the server's unit tests

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use smallchat::{ChatMessage, DomainError, MessageRepository};

/// Route `tracing` output through the test harness (`RUST_LOG` to tune)
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Rows are keyed by (epoch millis, id), so an overwrite that changes the
/// timestamp leaves the old row behind, as in Postgres
fn row_key(message: &ChatMessage) -> (i64, String) {
    (message.timestamp.timestamp_millis(), message.id.clone())
}

/// In-memory stand-in for the durable store with failure switches
#[derive(Default)]
pub struct FakeMessageRepository {
    rows: Mutex<HashMap<(i64, String), ChatMessage>>,
    undeletable: Mutex<HashSet<String>>,
    fail_saves: AtomicBool,
    fail_loads: AtomicBool,
    save_calls: AtomicUsize,
    delay: Option<Duration>,
}

impl FakeMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_messages(messages: Vec<ChatMessage>) -> Self {
        let repo = Self::new();
        {
            let mut rows = repo.rows.lock().unwrap();
            for message in messages {
                rows.insert(row_key(&message), message);
            }
        }
        repo
    }

    /// Every call sleeps this long first
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Deleting this row will fail
    pub fn mark_undeletable(&self, id: &str) {
        self.undeletable.lock().unwrap().insert(id.to_string());
    }

    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl MessageRepository for FakeMessageRepository {
    async fn save(&self, message: &ChatMessage) -> Result<(), DomainError> {
        self.pause().await;
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(DomainError::Repository("save refused".to_string()));
        }
        self.rows
            .lock()
            .unwrap()
            .insert(row_key(message), message.clone());
        Ok(())
    }

    async fn load_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<ChatMessage>, DomainError> {
        self.pause().await;
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(DomainError::ExternalService("store unreachable".to_string()));
        }
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|m| m.timestamp >= cutoff)
            .cloned()
            .collect())
    }

    async fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<usize, DomainError> {
        self.pause().await;
        let undeletable = self.undeletable.lock().unwrap().clone();
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|_, m| m.timestamp >= cutoff || undeletable.contains(&m.id));
        Ok(before - rows.len())
    }

    fn is_enabled(&self) -> bool {
        true
    }
}
