// src/config.rs
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::drivers::FeedTimeouts;

/// Replay period of the "Load LOG" mode.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_WINDOW_CAPACITY: usize = 100;
/// Exclusive upper bound: 24 h at one sample every 10 s.
pub const MAX_WINDOW_CAPACITY: usize = 8640;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub window_capacity: usize,
    pub poll_interval_ms: u64,
    pub connect_timeout_ms: u64,
    pub read_idle_timeout_ms: u64,
    /// Initial channel for custom log files.
    pub channel: usize,
    /// Source registry document.
    pub servers: PathBuf,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            connect_timeout_ms: 3_000,
            read_idle_timeout_ms: 30_000,
            channel: 1,
            servers: PathBuf::from("servers.json"),
        }
    }
}

impl MonitorConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: MonitorConfig = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.window_capacity > 0 && self.window_capacity < MAX_WINDOW_CAPACITY,
            "window_capacity must be in 1..{MAX_WINDOW_CAPACITY}, got {}",
            self.window_capacity
        );
        anyhow::ensure!(self.poll_interval_ms > 0, "poll_interval_ms must be positive");
        anyhow::ensure!(self.channel <= 1, "channel must be 0 or 1, got {}", self.channel);
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn feed_timeouts(&self) -> FeedTimeouts {
        FeedTimeouts {
            connect: Duration::from_millis(self.connect_timeout_ms),
            read_idle: Duration::from_millis(self.read_idle_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config: MonitorConfig = serde_json::from_str(r#"{"window_capacity": 250}"#).unwrap();
        assert_eq!(config.window_capacity, 250);
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.servers, PathBuf::from("servers.json"));
        config.validate().unwrap();
    }

    #[test]
    fn out_of_range_values_fail_validation() {
        let mut config = MonitorConfig {
            window_capacity: MAX_WINDOW_CAPACITY,
            ..MonitorConfig::default()
        };
        assert!(config.validate().is_err());
        config.window_capacity = 10;
        config.channel = 2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_reads_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monitor.json");
        std::fs::write(&path, r#"{"poll_interval_ms": 250, "read_idle_timeout_ms": 500}"#).unwrap();
        let config = MonitorConfig::load(&path).unwrap();
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.feed_timeouts().read_idle, Duration::from_millis(500));
        assert!(MonitorConfig::load(&dir.path().join("absent.json")).is_err());
    }
}
