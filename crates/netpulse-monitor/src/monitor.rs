//! Performance monitor state: targets, per-target history, alert log.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use futures::FutureExt;
use netpulse_core::types::{BatchReport, PerformanceReport};
use netpulse_core::{Alert, PerformanceRecord, ProbeMethod, ProbeResult, Thresholds};
use netpulse_probe::{filter_valid_targets, ProbeChain};

use crate::alerts;
use crate::config::MonitorConfig;
use crate::error::{MonitorError, Result};
use crate::history::{AlertLog, HistoryRing};
use crate::stats;

/// Alerts attached to each batch report.
pub const BATCH_ALERTS: usize = 5;

/// Alerts attached to a performance report.
pub const REPORT_ALERTS: usize = 20;

/// Outcome of recording one batch.
#[derive(Debug, Clone)]
pub struct Measurement {
    pub batch: BatchReport,
    /// Alerts raised by this batch only.
    pub alerts: Vec<Alert>,
}

/// Probe every target concurrently with no fan-out bound. A strategy that
/// panics is reported as an error result for its own target only.
pub async fn measure(
    chain: &ProbeChain,
    targets: &[String],
    timeout: Duration,
) -> Vec<(String, ProbeResult)> {
    join_all(targets.iter().map(|target| async move {
        let result = AssertUnwindSafe(chain.probe(target, timeout))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                tracing::error!(host = %target, "Strategy panicked");
                ProbeResult::unreachable(ProbeMethod::Error, "strategy panicked")
            });
        (target.clone(), result)
    }))
    .await
}

pub struct PerformanceMonitor {
    targets: Vec<String>,
    thresholds: Thresholds,
    history_limit: usize,
    history: BTreeMap<String, HistoryRing<PerformanceRecord>>,
    alerts: AlertLog,
}

impl PerformanceMonitor {
    pub fn new(config: &MonitorConfig) -> Self {
        Self {
            targets: config.targets.clone(),
            thresholds: config.thresholds,
            history_limit: config.history_limit,
            history: BTreeMap::new(),
            alerts: AlertLog::default(),
        }
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    /// The valid subset of `requested`, or of the configured targets when
    /// `requested` is `None`. Invalid entries are dropped with a warning.
    pub fn select_targets(&self, requested: Option<&[String]>) -> Result<Vec<String>> {
        let candidates = requested.unwrap_or(&self.targets);
        if candidates.is_empty() {
            return Err(MonitorError::NoTargets);
        }
        let valid = filter_valid_targets(candidates);
        if valid.is_empty() {
            return Err(MonitorError::NoValidTargets);
        }
        Ok(valid)
    }

    /// Append a batch taken at `timestamp` to history and evaluate thresholds.
    pub fn record_batch(
        &mut self,
        timestamp: DateTime<Utc>,
        results: Vec<(String, ProbeResult)>,
    ) -> Measurement {
        let limit = self.history_limit;
        let records: Vec<PerformanceRecord> = results
            .iter()
            .map(|(target, result)| PerformanceRecord::from_probe(target, result, timestamp))
            .collect();

        let mut raised = Vec::new();
        for record in &records {
            self.history
                .entry(record.target.clone())
                .or_insert_with(|| HistoryRing::new(limit))
                .push(record.clone());
            raised.extend(alerts::evaluate(record, &self.thresholds));
        }
        self.alerts.extend(raised.iter().cloned());

        let aggregate = stats::aggregate(&records);
        Measurement {
            batch: BatchReport {
                timestamp,
                measurements: records,
                aggregate,
                recent_alerts: self.alerts.recent(BATCH_ALERTS),
            },
            alerts: raised,
        }
    }

    /// Summary of every target with history.
    pub fn report(&self, monitoring_active: bool) -> PerformanceReport {
        let summary = self
            .history
            .iter()
            .map(|(target, ring)| (target.clone(), stats::summarize(&ring.to_vec())))
            .collect();

        PerformanceReport {
            timestamp: Utc::now(),
            monitoring_active,
            targets: self.history.keys().cloned().collect(),
            summary,
            recent_alerts: self.alerts.recent(REPORT_ALERTS),
        }
    }

    /// Drop all history and alerts. Targets are kept.
    pub fn clear(&mut self) {
        self.history.clear();
        self.alerts.clear();
    }

    /// Returns `false` if `target` was already configured.
    pub fn add_target(&mut self, target: &str) -> bool {
        if target.is_empty() || self.targets.iter().any(|t| t == target) {
            return false;
        }
        self.targets.push(target.to_string());
        true
    }

    /// Remove `target` and its history. Returns `false` if it was not configured.
    pub fn remove_target(&mut self, target: &str) -> bool {
        let Some(index) = self.targets.iter().position(|t| t == target) else {
            return false;
        };
        self.targets.remove(index);
        self.history.remove(target);
        true
    }

    pub fn history_len(&self, target: &str) -> usize {
        self.history.get(target).map_or(0, HistoryRing::len)
    }

    pub fn alert_count(&self) -> usize {
        self.alerts.len()
    }
}
