//! Configuration for the monitor and ping services.

use std::time::Duration;

use netpulse_core::Thresholds;
use netpulse_probe::ProbeConfig;
use serde::Deserialize;

/// `[monitor]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Targets measured when a command names none.
    #[serde(default)]
    pub targets: Vec<String>,

    /// Measurement period in milliseconds while monitoring is active.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Per-probe timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Records kept per target.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    #[serde(default)]
    pub thresholds: Thresholds,

    #[serde(default)]
    pub probe: ProbeConfig,
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            interval_ms: default_interval_ms(),
            timeout_ms: default_timeout_ms(),
            history_limit: default_history_limit(),
            thresholds: Thresholds::default(),
            probe: ProbeConfig::default(),
        }
    }
}

/// `[ping]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PingConfig {
    /// Host pinged when a request names none.
    #[serde(default)]
    pub target: Option<String>,

    /// Pings per sequence.
    #[serde(default = "default_count")]
    pub count: u32,

    /// Continuous-mode period in milliseconds; 0 runs a single sequence.
    #[serde(default)]
    pub interval_ms: u64,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Extra attempts per ping while the host stays down.
    #[serde(default)]
    pub retries: u32,

    /// Samples kept per target.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    #[serde(default)]
    pub probe: ProbeConfig,
}

impl Default for PingConfig {
    fn default() -> Self {
        Self {
            target: None,
            count: default_count(),
            interval_ms: 0,
            timeout_ms: default_timeout_ms(),
            retries: 0,
            history_limit: default_history_limit(),
            probe: ProbeConfig::default(),
        }
    }
}

fn default_interval_ms() -> u64 {
    60_000
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_history_limit() -> usize {
    100
}

fn default_count() -> u32 {
    1
}
