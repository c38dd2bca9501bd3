//! Event envelope for everything the services emit.
//!
//! Each event carries a `topic` and its `payload`, and is classified into one
//! of three logical output channels: primary results, alerts/failures, and
//! reported errors.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::types::{
    Alert, BatchReport, DiscoveryReport, PerformanceReport, PingSample, PingStatistics,
};

/// Unique identifier for an event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct EventId(pub Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

/// An event emitted by a netpulse service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: DateTime<Utc>,
    pub source: EventSource,
    /// Output channel derived from the payload when the event is built.
    pub channel: Channel,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl Event {
    pub fn new(source: EventSource, payload: EventPayload) -> Self {
        Self {
            id: EventId::new(),
            timestamp: Utc::now(),
            source,
            channel: payload.channel(),
            payload,
        }
    }

    pub fn error(source: EventSource, message: impl Into<String>) -> Self {
        Self::new(
            source,
            EventPayload::Error {
                message: message.into(),
            },
        )
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Serialize as a single JSON line (no trailing newline).
    pub fn to_json_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Which service emitted the event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    Discover,
    Monitor,
    Ping,
}

/// Logical output channel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Results,
    Alerts,
    Errors,
}

/// The event payload, tagged by topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "topic", content = "payload", rename_all = "kebab-case")]
pub enum EventPayload {
    // ── Discovery ─────────────────────────────────────────────
    NetworkDiscovery(DiscoveryReport),

    // ── Performance monitoring ────────────────────────────────
    NetworkPerformance(BatchReport),
    NetworkAlerts(Vec<Alert>),
    NetworkPerformanceReport(PerformanceReport),

    // ── Ping sessions ─────────────────────────────────────────
    /// One continuous-mode ping, with the most recent history for its target.
    PingResult {
        sample: PingSample,
        statistics: PingStatistics,
        history: Vec<PingSample>,
    },
    PingStatistics(PingStatistics),
    HistoryData(BTreeMap<String, Vec<PingSample>>),

    // ── Failures ──────────────────────────────────────────────
    Error { message: String },
}

impl EventPayload {
    pub fn channel(&self) -> Channel {
        match self {
            Self::NetworkAlerts(_) => Channel::Alerts,
            Self::PingResult { sample, .. } if !sample.result.alive => Channel::Alerts,
            Self::PingStatistics(stats) if stats.success_rate <= 50.0 => Channel::Alerts,
            Self::Error { .. } => Channel::Errors,
            _ => Channel::Results,
        }
    }
}
