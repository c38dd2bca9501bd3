//! Ping sessions for a single host.
//!
//! A `ping` request either runs a sequence of `count` pings spaced
//! [`SEQUENCE_SPACING`] apart and reports aggregate statistics, or, with a
//! non-zero interval, pings continuously and reports every result together
//! with the host's most recent history. A new request replaces any running
//! continuous session.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use netpulse_core::types::PingSample;
use netpulse_core::{Event, EventPayload, EventSource};
use netpulse_probe::{is_valid_target, ProbeChain};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use crate::config::PingConfig;
use crate::error::{MonitorError, Result};
use crate::history::HistoryRing;
use crate::stats;

/// Delay between the starts of consecutive pings in a sequence.
pub const SEQUENCE_SPACING: Duration = Duration::from_millis(100);

/// History samples attached to each continuous-mode result.
pub const CONTINUOUS_HISTORY: usize = 10;

/// Overrides for one ping request. Unset fields fall back to [`PingConfig`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingRequest {
    #[serde(alias = "ip")]
    pub target: Option<String>,
    pub count: Option<u32>,
    #[serde(alias = "interval")]
    pub interval_ms: Option<u64>,
    #[serde(alias = "timeout")]
    pub timeout_ms: Option<u64>,
    pub retries: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum PingCommand {
    Ping(PingRequest),
    /// End continuous mode.
    Stop,
    ClearHistory,
    GetHistory,
}

#[derive(Debug, Clone)]
struct PingPlan {
    target: String,
    count: u32,
    interval: Option<Duration>,
    timeout: Duration,
    retries: u32,
}

struct Session {
    target: String,
    timeout: Duration,
    retries: u32,
    ticker: Interval,
}

enum Outcome {
    Continuous(PingSample),
    Sequence {
        target: String,
        samples: Vec<PingSample>,
    },
}

/// One ping through the chain, retried while the host stays down.
pub async fn ping_once(
    chain: &ProbeChain,
    target: &str,
    timeout: Duration,
    retries: u32,
) -> PingSample {
    let (result, attempt) = chain.probe_with_retries(target, timeout, retries).await;
    PingSample {
        target: target.to_string(),
        result,
        attempt,
        timestamp: Utc::now(),
    }
}

async fn next_tick(session: &mut Option<Session>) {
    match session {
        Some(session) => {
            session.ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

pub struct PingService {
    config: PingConfig,
    chain: Arc<ProbeChain>,
    events: mpsc::Sender<Event>,
    history: BTreeMap<String, HistoryRing<PingSample>>,
    session: Option<Session>,
    pending: JoinSet<Outcome>,
}

impl PingService {
    pub fn new(config: PingConfig, chain: ProbeChain, events: mpsc::Sender<Event>) -> Self {
        Self {
            config,
            chain: Arc::new(chain),
            events,
            history: BTreeMap::new(),
            session: None,
            pending: JoinSet::new(),
        }
    }

    pub fn spawn(self, commands: mpsc::Receiver<PingCommand>) -> JoinHandle<()> {
        tokio::spawn(self.run(commands))
    }

    /// Process commands until the sender side closes, then finish pending pings.
    pub async fn run(mut self, mut commands: mpsc::Receiver<PingCommand>) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => break,
                },
                _ = next_tick(&mut self.session) => self.on_tick(),
                Some(joined) = self.pending.join_next() => self.on_outcome(joined).await,
            }
        }

        self.session = None;
        while let Some(joined) = self.pending.join_next().await {
            self.on_outcome(joined).await;
        }
        tracing::info!("Ping service stopped");
    }

    async fn handle(&mut self, command: PingCommand) {
        match command {
            PingCommand::Ping(request) => {
                self.stop_session();
                match self.plan(request) {
                    Ok(plan) => self.begin(plan),
                    Err(e) => {
                        tracing::error!(error = %e, "Rejected ping request");
                        self.emit(EventPayload::Error {
                            message: e.to_string(),
                        })
                        .await;
                    }
                }
            }
            PingCommand::Stop => self.stop_session(),
            PingCommand::ClearHistory => {
                self.history.clear();
                tracing::info!("Ping history cleared");
            }
            PingCommand::GetHistory => {
                let history = self
                    .history
                    .iter()
                    .map(|(target, ring)| (target.clone(), ring.to_vec()))
                    .collect();
                self.emit(EventPayload::HistoryData(history)).await;
            }
        }
    }

    fn plan(&self, request: PingRequest) -> Result<PingPlan> {
        let target = request
            .target
            .or_else(|| self.config.target.clone())
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(MonitorError::MissingTarget)?;
        if !is_valid_target(&target) {
            return Err(MonitorError::InvalidTarget { target });
        }

        Ok(PingPlan {
            target,
            count: request.count.unwrap_or(self.config.count).max(1),
            interval: Some(request.interval_ms.unwrap_or(self.config.interval_ms))
                .filter(|&ms| ms > 0)
                .map(Duration::from_millis),
            timeout: Duration::from_millis(
                request
                    .timeout_ms
                    .filter(|&ms| ms > 0)
                    .unwrap_or(self.config.timeout_ms),
            ),
            retries: request.retries.unwrap_or(self.config.retries),
        })
    }

    fn begin(&mut self, plan: PingPlan) {
        match plan.interval {
            Some(period) => {
                tracing::info!(
                    host = %plan.target,
                    interval_ms = period.as_millis() as u64,
                    "Continuous ping started"
                );
                let mut ticker = interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                self.session = Some(Session {
                    target: plan.target,
                    timeout: plan.timeout,
                    retries: plan.retries,
                    ticker,
                });
                self.on_tick();
            }
            None => {
                tracing::info!(host = %plan.target, count = plan.count, "Ping sequence started");
                let chain = self.chain.clone();
                let PingPlan {
                    target,
                    count,
                    timeout,
                    retries,
                    ..
                } = plan;
                self.pending.spawn(async move {
                    let (chain, host) = (&chain, target.as_str());
                    let samples = join_all((0..count).map(|i| async move {
                        tokio::time::sleep(SEQUENCE_SPACING * i).await;
                        ping_once(chain, host, timeout, retries).await
                    }))
                    .await;
                    Outcome::Sequence { target, samples }
                });
            }
        }
    }

    fn stop_session(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::info!(host = %session.target, "Continuous ping stopped");
        }
    }

    fn on_tick(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        let chain = self.chain.clone();
        let target = session.target.clone();
        let (timeout, retries) = (session.timeout, session.retries);
        self.pending.spawn(async move {
            Outcome::Continuous(ping_once(&chain, &target, timeout, retries).await)
        });
    }

    fn record(&mut self, sample: &PingSample) {
        let limit = self.config.history_limit;
        self.history
            .entry(sample.target.clone())
            .or_insert_with(|| HistoryRing::new(limit))
            .push(sample.clone());
    }

    async fn on_outcome(&mut self, joined: std::result::Result<Outcome, JoinError>) {
        match joined {
            Ok(Outcome::Continuous(sample)) => {
                self.record(&sample);
                let statistics =
                    stats::ping_statistics(&sample.target, std::slice::from_ref(&sample), false);
                let history = self
                    .history
                    .get(&sample.target)
                    .map(|ring| ring.recent(CONTINUOUS_HISTORY))
                    .unwrap_or_default();
                tracing::debug!(
                    host = %sample.target,
                    alive = sample.result.alive,
                    latency_ms = ?sample.result.latency_ms,
                    "Ping"
                );
                self.emit(EventPayload::PingResult {
                    sample,
                    statistics,
                    history,
                })
                .await;
            }
            Ok(Outcome::Sequence { target, samples }) => {
                for sample in &samples {
                    self.record(sample);
                }
                let statistics = stats::ping_statistics(&target, &samples, true);
                tracing::info!(
                    host = %target,
                    success_rate = statistics.success_rate,
                    average_time_ms = statistics.average_time_ms,
                    "Ping sequence complete"
                );
                self.emit(EventPayload::PingStatistics(statistics)).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Ping task failed");
                self.emit(EventPayload::Error {
                    message: format!("Ping failed: {e}"),
                })
                .await;
            }
        }
    }

    async fn emit(&self, payload: EventPayload) {
        let event = Event::new(EventSource::Ping, payload);
        if self.events.send(event).await.is_err() {
            tracing::debug!("Event receiver dropped");
        }
    }
}
