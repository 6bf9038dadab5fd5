//! Scheduler Service - Retention sweep
//!
//! Evicts messages older than the retention window at a fixed interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};

use crate::application::MessageStore;

/// Sweep configuration
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Interval between sweeps
    pub interval: Duration,
    /// How long messages are kept
    pub retention: chrono::Duration,
    /// Enable/disable the sweep
    pub enabled: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600), // 1 hour
            retention: chrono::Duration::days(3),
            enabled: true,
        }
    }
}

/// Periodic retention sweep
///
/// One task runs the loop, so sweeps never overlap.
pub struct RetentionSweep {
    store: Arc<MessageStore>,
    config: SweepConfig,
}

impl RetentionSweep {
    /// Creates a new sweep
    pub fn new(store: Arc<MessageStore>, config: Option<SweepConfig>) -> Self {
        Self {
            store,
            config: config.unwrap_or_default(),
        }
    }

    /// Start the sweep (runs in background)
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Run a single sweep now
    pub async fn run_once(&self) -> usize {
        self.store.evict_older_than(self.config.retention).await
    }

    /// Run the sweep loop
    async fn run(self) {
        if !self.config.enabled {
            tracing::info!("🧹 Retention sweep disabled");
            return;
        }

        tracing::info!(
            "🧹 Retention sweep started (interval: {:?}, retention: {} days)",
            self.config.interval,
            self.config.retention.num_days()
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // Skip the first immediate tick
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let removed = self.run_once().await;
            tracing::debug!("🧹 Sweep finished ({} evicted from memory)", removed);
        }
    }
}

/// Start the sweep unless disabled
pub fn maybe_start_sweep(
    store: Arc<MessageStore>,
    config: SweepConfig,
) -> Option<tokio::task::JoinHandle<()>> {
    if !config.enabled {
        return None;
    }

    Some(RetentionSweep::new(store, Some(config)).start())
}
