//! Monitor service: drives a [`PerformanceMonitor`] from commands and a timer.
//!
//! The service owns the monitor and is the only task that mutates it.
//! Measurements run on spawned tasks and are recorded when they complete.
//! While monitoring is active a tick that finds a measurement still in
//! flight is skipped.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use netpulse_core::{Event, EventPayload, EventSource, ProbeResult};
use netpulse_probe::ProbeChain;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use crate::config::MonitorConfig;
use crate::monitor::{measure, Measurement, PerformanceMonitor};

/// Control commands, e.g. `{"command":"add-target","target":"10.0.0.7"}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum MonitorCommand {
    /// Begin periodic measurement. Measures immediately.
    Start {
        #[serde(default)]
        targets: Option<Vec<String>>,
        #[serde(default, alias = "interval")]
        interval_ms: Option<u64>,
    },
    Stop,
    GetReport,
    ClearData,
    AddTarget {
        target: String,
    },
    RemoveTarget {
        target: String,
    },
    /// One measurement, outside any schedule.
    Measure {
        #[serde(default)]
        targets: Option<Vec<String>>,
    },
}

type Batch = (DateTime<Utc>, Vec<(String, ProbeResult)>);

pub struct MonitorService {
    monitor: PerformanceMonitor,
    chain: Arc<ProbeChain>,
    interval: Duration,
    timeout: Duration,
    events: mpsc::Sender<Event>,
    ticker: Option<Interval>,
    /// Targets named by `start`; `None` measures the configured targets.
    scheduled_targets: Option<Vec<String>>,
    in_flight: JoinSet<Batch>,
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

impl MonitorService {
    pub fn new(config: &MonitorConfig, chain: ProbeChain, events: mpsc::Sender<Event>) -> Self {
        Self {
            monitor: PerformanceMonitor::new(config),
            chain: Arc::new(chain),
            interval: config.interval(),
            timeout: config.timeout(),
            events,
            ticker: None,
            scheduled_targets: None,
            in_flight: JoinSet::new(),
        }
    }

    pub fn spawn(self, commands: mpsc::Receiver<MonitorCommand>) -> JoinHandle<()> {
        tokio::spawn(self.run(commands))
    }

    /// Process commands until the sender side closes, then wait for
    /// in-flight measurements and record them.
    pub async fn run(mut self, mut commands: mpsc::Receiver<MonitorCommand>) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => break,
                },
                _ = next_tick(&mut self.ticker) => self.on_tick().await,
                Some(joined) = self.in_flight.join_next() => self.on_measured(joined).await,
            }
        }

        self.ticker = None;
        while let Some(joined) = self.in_flight.join_next().await {
            self.on_measured(joined).await;
        }
        tracing::info!("Monitor service stopped");
    }

    async fn handle(&mut self, command: MonitorCommand) {
        tracing::debug!(command = ?command, "Monitor command");
        match command {
            MonitorCommand::Start {
                targets,
                interval_ms,
            } => self.start(targets, interval_ms).await,
            MonitorCommand::Stop => self.stop(),
            MonitorCommand::GetReport => {
                let report = self.monitor.report(self.ticker.is_some());
                self.emit(EventPayload::NetworkPerformanceReport(report))
                    .await;
            }
            MonitorCommand::ClearData => {
                self.monitor.clear();
                tracing::info!("Performance data cleared");
            }
            MonitorCommand::AddTarget { target } => {
                if self.monitor.add_target(&target) {
                    tracing::info!(host = %target, "Target added");
                }
            }
            MonitorCommand::RemoveTarget { target } => {
                if self.monitor.remove_target(&target) {
                    tracing::info!(host = %target, "Target removed");
                }
            }
            MonitorCommand::Measure { targets } => {
                self.begin_measurement(targets.as_deref()).await;
            }
        }
    }

    async fn start(&mut self, targets: Option<Vec<String>>, interval_ms: Option<u64>) {
        if self.ticker.is_some() {
            tracing::warn!("Monitoring already active");
            return;
        }
        if let Err(e) = self.monitor.select_targets(targets.as_deref()) {
            tracing::error!(error = %e, "Cannot start monitoring");
            self.emit(EventPayload::Error {
                message: format!("No targets specified for monitoring: {e}"),
            })
            .await;
            return;
        }

        let period = interval_ms
            .filter(|&ms| ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(self.interval);
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.ticker = Some(ticker);
        self.scheduled_targets = targets;

        tracing::info!(
            interval_ms = period.as_millis() as u64,
            targets = ?self.scheduled_targets.as_deref().unwrap_or(self.monitor.targets()),
            "Monitoring started"
        );
        let scheduled = self.scheduled_targets.clone();
        self.begin_measurement(scheduled.as_deref()).await;
    }

    fn stop(&mut self) {
        if self.ticker.take().is_some() {
            self.scheduled_targets = None;
            tracing::info!(in_flight = self.in_flight.len(), "Monitoring stopped");
        }
    }

    async fn on_tick(&mut self) {
        if !self.in_flight.is_empty() {
            tracing::debug!("Measurement still in flight, skipping tick");
            return;
        }
        let scheduled = self.scheduled_targets.clone();
        self.begin_measurement(scheduled.as_deref()).await;
    }

    async fn begin_measurement(&mut self, requested: Option<&[String]>) {
        let targets = match self.monitor.select_targets(requested) {
            Ok(targets) => targets,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping measurement");
                self.emit(EventPayload::Error {
                    message: e.to_string(),
                })
                .await;
                return;
            }
        };

        let chain = self.chain.clone();
        let timeout = self.timeout;
        tracing::debug!(count = targets.len(), "Starting measurement");
        self.in_flight.spawn(async move {
            let timestamp = Utc::now();
            let results = measure(&chain, &targets, timeout).await;
            (timestamp, results)
        });
    }

    async fn on_measured(&mut self, joined: Result<Batch, JoinError>) {
        let (timestamp, results) = match joined {
            Ok(batch) => batch,
            Err(e) => {
                tracing::error!(error = %e, "Measurement task failed");
                self.emit(EventPayload::Error {
                    message: format!("Performance measurement failed: {e}"),
                })
                .await;
                return;
            }
        };

        let Measurement { batch, alerts } = self.monitor.record_batch(timestamp, results);
        tracing::info!(
            alive = batch.aggregate.alive_targets,
            total = batch.aggregate.total_targets,
            average_latency_ms = ?batch.aggregate.average_latency_ms,
            alerts = alerts.len(),
            "Measurement recorded"
        );

        if !alerts.is_empty() {
            self.emit(EventPayload::NetworkAlerts(alerts)).await;
        }
        self.emit(EventPayload::NetworkPerformance(batch)).await;
    }

    async fn emit(&self, payload: EventPayload) {
        let event = Event::new(EventSource::Monitor, payload);
        if self.events.send(event).await.is_err() {
            tracing::debug!("Event receiver dropped");
        }
    }
}
