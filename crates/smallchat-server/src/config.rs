//! Server configuration
//!
//! Read from Shuttle secrets (Secrets.toml). Every key is optional.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::application::PersistenceConfig;
use crate::services::scheduler::SweepConfig;

const DEFAULT_RETENTION_DAYS: i64 = 3;
const MAX_RETENTION_DAYS: i64 = 36_500;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3600;
const DEFAULT_PERSIST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PERSIST_QUEUE: usize = 1024;
const DEFAULT_PARTITION: &str = "default";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Runtime configuration of the chat server
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Bearer key guarding admin routes (None = auth disabled)
    pub api_key: Option<String>,
    /// Retention window in days
    pub retention_days: i64,
    /// Interval between retention sweeps
    pub sweep_interval: Duration,
    pub sweep_enabled: bool,
    /// Use the Postgres durable store
    pub persistence_enabled: bool,
    /// Partition key for this deployment's rows
    pub partition: String,
    pub persist_timeout: Duration,
    pub persist_queue: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            retention_days: DEFAULT_RETENTION_DAYS,
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            sweep_enabled: true,
            persistence_enabled: true,
            partition: DEFAULT_PARTITION.to_string(),
            persist_timeout: Duration::from_secs(DEFAULT_PERSIST_TIMEOUT_SECS),
            persist_queue: DEFAULT_PERSIST_QUEUE,
        }
    }
}

impl ChatConfig {
    /// Build the config from a key lookup (e.g. `|k| secrets.get(k)`)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_key = lookup("SMALLCHAT_API_KEY").filter(|k| !k.trim().is_empty());

        let retention_days: i64 = parse(&lookup, "SMALLCHAT_RETENTION_DAYS")?
            .unwrap_or(defaults.retention_days);
        if !(1..=MAX_RETENTION_DAYS).contains(&retention_days) {
            return Err(invalid(
                "SMALLCHAT_RETENTION_DAYS",
                retention_days,
                "must be between 1 and 36500",
            ));
        }

        let sweep_secs: u64 = parse(&lookup, "SMALLCHAT_SWEEP_INTERVAL_SECS")?
            .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS);
        if sweep_secs == 0 {
            return Err(invalid("SMALLCHAT_SWEEP_INTERVAL_SECS", sweep_secs, "must be at least 1"));
        }

        let persist_queue: usize =
            parse(&lookup, "SMALLCHAT_PERSIST_QUEUE")?.unwrap_or(defaults.persist_queue);
        if persist_queue == 0 {
            return Err(invalid("SMALLCHAT_PERSIST_QUEUE", persist_queue, "must be at least 1"));
        }

        let persist_timeout_secs: u64 = parse(&lookup, "SMALLCHAT_PERSIST_TIMEOUT_SECS")?
            .unwrap_or(DEFAULT_PERSIST_TIMEOUT_SECS);
        if persist_timeout_secs == 0 {
            return Err(invalid(
                "SMALLCHAT_PERSIST_TIMEOUT_SECS",
                persist_timeout_secs,
                "must be at least 1",
            ));
        }

        Ok(Self {
            api_key,
            retention_days,
            sweep_interval: Duration::from_secs(sweep_secs),
            sweep_enabled: parse(&lookup, "SMALLCHAT_SWEEP_ENABLED")?
                .unwrap_or(defaults.sweep_enabled),
            persistence_enabled: parse(&lookup, "SMALLCHAT_PERSISTENCE_ENABLED")?
                .unwrap_or(defaults.persistence_enabled),
            partition: lookup("SMALLCHAT_PARTITION")
                .filter(|p| !p.trim().is_empty())
                .unwrap_or(defaults.partition),
            persist_timeout: Duration::from_secs(persist_timeout_secs),
            persist_queue,
        })
    }

    /// Retention window as a time delta
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.retention_days)
    }

    pub fn persistence(&self) -> PersistenceConfig {
        PersistenceConfig {
            queue_capacity: self.persist_queue,
            io_timeout: self.persist_timeout,
        }
    }

    pub fn sweep(&self) -> SweepConfig {
        SweepConfig {
            interval: self.sweep_interval,
            retention: self.retention(),
            enabled: self.sweep_enabled,
        }
    }
}

fn parse<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid {
                key,
                value: raw,
                reason: "could not be parsed",
            }),
    }
}

fn invalid(key: &'static str, value: impl ToString, reason: &'static str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<ChatConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ChatConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.retention_days, 3);
        assert_eq!(config.retention(), chrono::Duration::days(3));
        assert_eq!(config.sweep_interval, Duration::from_secs(3600));
        assert!(config.sweep_enabled);
        assert!(config.persistence_enabled);
        assert_eq!(config.partition, "default");
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("SMALLCHAT_API_KEY", "secret"),
            ("SMALLCHAT_RETENTION_DAYS", "7"),
            ("SMALLCHAT_SWEEP_INTERVAL_SECS", "60"),
            ("SMALLCHAT_PERSISTENCE_ENABLED", "false"),
            ("SMALLCHAT_PARTITION", "room-1"),
            ("SMALLCHAT_PERSIST_QUEUE", "8"),
        ])
        .unwrap();

        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.sweep().retention, chrono::Duration::days(7));
        assert_eq!(config.sweep().interval, Duration::from_secs(60));
        assert!(!config.persistence_enabled);
        assert_eq!(config.partition, "room-1");
        assert_eq!(config.persistence().queue_capacity, 8);
    }

    #[test]
    fn test_blank_api_key_disables_auth() {
        let config = config(&[("SMALLCHAT_API_KEY", "  ")]).unwrap();
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(config(&[("SMALLCHAT_RETENTION_DAYS", "three")]).is_err());
        assert!(config(&[("SMALLCHAT_RETENTION_DAYS", "0")]).is_err());
        assert!(config(&[("SMALLCHAT_SWEEP_INTERVAL_SECS", "0")]).is_err());
        assert!(config(&[("SMALLCHAT_PERSISTENCE_ENABLED", "maybe")]).is_err());

        let err = config(&[("SMALLCHAT_PERSIST_TIMEOUT_SECS", "0")]).unwrap_err();
        assert!(err.to_string().contains("SMALLCHAT_PERSIST_TIMEOUT_SECS"));

        let err = config(&[("SMALLCHAT_PERSIST_QUEUE", "0")]).unwrap_err();
        assert!(err.to_string().contains("SMALLCHAT_PERSIST_QUEUE"));
    }
}
