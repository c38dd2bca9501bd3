//! Core domain types for discovery scans and performance monitoring.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Probing ───────────────────────────────────────────────────────

/// Which probing method produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ProbeMethod {
    /// The external `ping` executable.
    ExternalProcess,
    /// In-process ICMP echo.
    Library,
    /// TCP connect to a commonly open port.
    TcpFallback,
    /// Every method answered, none reported the host alive.
    None,
    /// No method was able to produce an answer.
    Error,
}

/// Outcome of probing a single address. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProbeResult {
    pub alive: bool,
    pub latency_ms: Option<f64>,
    pub method: ProbeMethod,
    pub error: Option<String>,
    /// Port that answered, for TCP fallback probes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Only set when the method actually measured loss.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packet_loss_pct: Option<f64>,
}

impl ProbeResult {
    pub fn alive(method: ProbeMethod, latency_ms: Option<f64>) -> Self {
        Self {
            alive: true,
            latency_ms,
            method,
            error: None,
            port: None,
            packet_loss_pct: None,
        }
    }

    pub fn unreachable(method: ProbeMethod, error: impl Into<String>) -> Self {
        Self {
            alive: false,
            latency_ms: None,
            method,
            error: Some(error.into()),
            port: None,
            packet_loss_pct: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_packet_loss(mut self, pct: f64) -> Self {
        self.packet_loss_pct = Some(pct);
        self
    }
}

// ── Discovery ─────────────────────────────────────────────────────

/// An alive host found during a sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub address: String,
    pub alive: bool,
    pub response_time_ms: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub detection_method: ProbeMethod,
    /// Reverse-resolved name; `None` when not requested or not resolvable.
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_ports: Option<Vec<u16>>,
}

impl Device {
    pub fn from_probe(address: &str, result: &ProbeResult, timestamp: DateTime<Utc>) -> Self {
        Self {
            address: address.to_string(),
            alive: result.alive,
            response_time_ms: result.latency_ms,
            timestamp,
            detection_method: result.method,
            hostname: None,
            open_ports: None,
        }
    }
}

/// Effective options a scan ran with, echoed back in its report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanOptions {
    pub port_range: String,
    pub timeout_ms: u64,
    pub concurrent: usize,
    pub include_hostnames: bool,
    pub include_ports: bool,
}

/// The single report emitted per discovery scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryReport {
    pub scan_id: Uuid,
    pub subnet: String,
    pub total_hosts: usize,
    pub alive_hosts: usize,
    pub devices: Vec<Device>,
    pub scan_options: ScanOptions,
    pub scan_duration_ms: u64,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

// ── Performance monitoring ────────────────────────────────────────

/// One measurement of one target, kept in that target's history ring.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerformanceRecord {
    pub target: String,
    pub timestamp: DateTime<Utc>,
    pub alive: bool,
    pub latency_ms: Option<f64>,
    pub packet_loss_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PerformanceRecord {
    pub fn from_probe(target: &str, result: &ProbeResult, timestamp: DateTime<Utc>) -> Self {
        Self {
            target: target.to_string(),
            timestamp,
            alive: result.alive,
            latency_ms: if result.alive { result.latency_ms } else { None },
            packet_loss_pct: if result.alive {
                result.packet_loss_pct
            } else {
                None
            },
            error: result.error.clone(),
        }
    }
}

/// Alerting thresholds, read-only during a monitoring session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Thresholds {
    #[serde(default = "default_latency_threshold")]
    pub latency_ms: f64,
    #[serde(default = "default_packet_loss_threshold")]
    pub packet_loss_pct: f64,
    #[serde(default = "default_availability_threshold")]
    pub availability_pct: f64,
}

fn default_latency_threshold() -> f64 {
    100.0
}

fn default_packet_loss_threshold() -> f64 {
    5.0
}

fn default_availability_threshold() -> f64 {
    95.0
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            latency_ms: default_latency_threshold(),
            packet_loss_pct: default_packet_loss_threshold(),
            availability_pct: default_availability_threshold(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    Latency,
    Availability,
    PacketLoss,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub target: String,
    pub value: f64,
    pub threshold: f64,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

/// Statistics over one measurement batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregateStats {
    pub total_targets: usize,
    pub alive_targets: usize,
    pub down_targets: usize,
    pub availability_pct: f64,
    /// Rounded to the nearest millisecond.
    pub average_latency_ms: Option<f64>,
    pub min_latency_ms: Option<f64>,
    pub max_latency_ms: Option<f64>,
    /// Mean over targets whose loss was measured; `None` if none were.
    pub packet_loss_pct: Option<f64>,
    pub jitter_ms: f64,
}

/// Emitted once per measurement batch on the results channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub timestamp: DateTime<Utc>,
    pub measurements: Vec<PerformanceRecord>,
    pub aggregate: AggregateStats,
    pub recent_alerts: Vec<Alert>,
}

/// Direction of latency change over a recent window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    InsufficientData,
    NoLatencyData,
    Stable,
    Increasing,
    Decreasing,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetSummary {
    pub total_measurements: usize,
    pub availability_pct: f64,
    pub average_latency_ms: Option<f64>,
    pub min_latency_ms: Option<f64>,
    pub max_latency_ms: Option<f64>,
    pub last_measurement: Option<PerformanceRecord>,
    pub trend: Trend,
}

/// Snapshot produced by the `get-report` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub timestamp: DateTime<Utc>,
    pub monitoring_active: bool,
    pub targets: Vec<String>,
    pub summary: BTreeMap<String, TargetSummary>,
    pub recent_alerts: Vec<Alert>,
}

// ── Ping sessions ─────────────────────────────────────────────────

/// A single ping of one target, as kept in ping history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PingSample {
    pub target: String,
    pub result: ProbeResult,
    /// 1-based attempt number that produced this result.
    pub attempt: u32,
    pub timestamp: DateTime<Utc>,
}

/// Aggregated statistics for a ping sequence (or a single continuous ping).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PingStatistics {
    pub host: String,
    pub total_pings: usize,
    pub successful_pings: usize,
    pub failed_pings: usize,
    pub success_rate: f64,
    pub average_time_ms: f64,
    pub min_response_time_ms: f64,
    pub max_response_time_ms: f64,
    pub jitter_ms: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<PingSample>,
    pub timestamp: DateTime<Utc>,
}
