//! Scan coordination: one sweep at a time over an expanded address list.
//!
//! A scan resolves its options against the configured defaults, expands the
//! subnet, probes every address with at most `concurrent` probes in flight,
//! enriches the alive hosts, and returns a single [`DiscoveryReport`].
//! A second scan requested while one is running is rejected, not queued.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::stream::{self, StreamExt};
use netpulse_core::types::ScanOptions;
use netpulse_core::{Device, DiscoveryReport};
use netpulse_probe::{HostnameResolver, ProbeChain};
use serde::Deserialize;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::config::DiscoverConfig;
use crate::enrich::{parse_port_spec, Enricher, EnrichmentPlan};
use crate::error::{DiscoverError, Result};
use crate::limiter::ConcurrencyLimiter;
use crate::range;

/// Per-request overrides. Unset fields fall back to [`DiscoverConfig`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    pub subnet: Option<String>,
    pub port_range: Option<String>,
    #[serde(alias = "timeout")]
    pub timeout_ms: Option<u64>,
    pub concurrent: Option<usize>,
    pub include_hostnames: Option<bool>,
    pub include_ports: Option<bool>,
}

impl ScanRequest {
    pub fn for_subnet(subnet: impl Into<String>) -> Self {
        Self {
            subnet: Some(subnet.into()),
            ..Self::default()
        }
    }

    /// Merge with `config`. Zero timeout or concurrency counts as unset.
    pub fn resolve(self, config: &DiscoverConfig) -> Result<(String, ScanOptions)> {
        let subnet = self
            .subnet
            .unwrap_or_else(|| config.subnet.clone())
            .trim()
            .to_string();
        if subnet.is_empty() {
            return Err(DiscoverError::EmptySubnet);
        }

        let options = ScanOptions {
            port_range: self
                .port_range
                .unwrap_or_else(|| config.port_range.clone()),
            timeout_ms: self
                .timeout_ms
                .filter(|&t| t > 0)
                .unwrap_or(config.timeout_ms),
            concurrent: self
                .concurrent
                .filter(|&c| c > 0)
                .unwrap_or(config.concurrent),
            include_hostnames: self.include_hostnames.unwrap_or(config.include_hostnames),
            include_ports: self.include_ports.unwrap_or(config.include_ports),
        };
        Ok((subnet, options))
    }
}

#[derive(Debug)]
pub enum ScanOutcome {
    Completed(DiscoveryReport),
    /// Another scan held the coordinator; nothing was probed.
    AlreadyRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Scanning,
}

/// Progress of the current (or last) sweep.
#[derive(Debug, Default)]
struct ScanProgress {
    scanned: AtomicUsize,
    total: AtomicUsize,
}

impl ScanProgress {
    fn reset(&self, total: usize) {
        self.scanned.store(0, Ordering::SeqCst);
        self.total.store(total, Ordering::SeqCst);
    }

    fn record(&self) -> usize {
        self.scanned.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn snapshot(&self) -> (usize, usize) {
        (
            self.scanned.load(Ordering::SeqCst),
            self.total.load(Ordering::SeqCst),
        )
    }
}

/// Clears the scanning flag on every exit path.
struct ScanGuard<'a>(&'a AtomicBool);

impl<'a> ScanGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct DiscoveryCoordinator {
    config: DiscoverConfig,
    prober: Arc<ProbeChain>,
    enricher: Enricher,
    scanning: AtomicBool,
    progress: Arc<ScanProgress>,
}

impl DiscoveryCoordinator {
    pub fn new(
        config: DiscoverConfig,
        prober: ProbeChain,
        resolver: Arc<dyn HostnameResolver>,
    ) -> Self {
        Self {
            config,
            prober: Arc::new(prober),
            enricher: Enricher::new(resolver),
            scanning: AtomicBool::new(false),
            progress: Arc::new(ScanProgress::default()),
        }
    }

    pub fn state(&self) -> ScanState {
        if self.scanning.load(Ordering::Acquire) {
            ScanState::Scanning
        } else {
            ScanState::Idle
        }
    }

    /// `(scanned, total)` for the current or most recent sweep.
    pub fn progress(&self) -> (usize, usize) {
        self.progress.snapshot()
    }

    pub async fn scan(&self, request: ScanRequest) -> Result<ScanOutcome> {
        let Some(_guard) = ScanGuard::acquire(&self.scanning) else {
            tracing::warn!("Scan already in progress");
            return Ok(ScanOutcome::AlreadyRunning);
        };

        let (subnet, options) = request.resolve(&self.config)?;
        self.run(subnet, options).await.map(ScanOutcome::Completed)
    }

    async fn run(&self, subnet: String, options: ScanOptions) -> Result<DiscoveryReport> {
        let scan_id = Uuid::new_v4();
        let started_at = Utc::now();
        let clock = Instant::now();

        let ports = if options.include_ports {
            Some(parse_port_spec(&options.port_range)?)
        } else {
            None
        };

        let addresses = range::expand(&subnet)?;
        if addresses.is_empty() {
            return Err(DiscoverError::NoAddresses { subnet });
        }
        let total = addresses.len();
        let timeout = Duration::from_millis(options.timeout_ms);

        tracing::info!(
            scan_id = %scan_id,
            subnet = %subnet,
            total,
            concurrent = options.concurrent,
            timeout_ms = options.timeout_ms,
            "Starting network discovery"
        );

        let found = self.sweep(addresses, timeout, options.concurrent).await;

        let plan = EnrichmentPlan {
            include_hostnames: options.include_hostnames,
            ports,
            timeout,
        };
        let devices: Vec<Device> = if plan.is_empty() {
            found
        } else {
            stream::iter(found)
                .map(|device| self.enricher.enrich(device, &plan))
                .buffered(options.concurrent.max(1))
                .collect()
                .await
        };

        let completed_at = Utc::now();
        let scan_duration_ms = clock.elapsed().as_millis() as u64;
        tracing::info!(
            scan_id = %scan_id,
            total,
            alive = devices.len(),
            duration_ms = scan_duration_ms,
            "Network discovery complete"
        );

        Ok(DiscoveryReport {
            scan_id,
            subnet,
            total_hosts: total,
            alive_hosts: devices.len(),
            devices,
            scan_options: options,
            scan_duration_ms,
            started_at,
            completed_at,
        })
    }

    /// Probe every address, returning alive devices in address-list order.
    async fn sweep(&self, addresses: Vec<String>, timeout: Duration, concurrent: usize) -> Vec<Device> {
        let total = addresses.len();
        let limiter = ConcurrencyLimiter::new(concurrent);
        self.progress.reset(total);

        let mut tasks = JoinSet::new();
        for (index, address) in addresses.into_iter().enumerate() {
            let slot = limiter.acquire().await;
            let prober = self.prober.clone();
            let progress = self.progress.clone();

            tasks.spawn(async move {
                let result = prober.probe(&address, timeout).await;
                let probed_at = Utc::now();
                drop(slot);
                let scanned = progress.record();
                tracing::debug!(host = %address, scanned, total, alive = result.alive, "Probed");
                (index, result.alive.then(|| Device::from_probe(&address, &result, probed_at)))
            });
        }

        let mut found = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Some(device))) => {
                    tracing::info!(
                        host = %device.address,
                        latency_ms = ?device.response_time_ms,
                        method = ?device.detection_method,
                        "Found alive host"
                    );
                    found.push((index, device));
                }
                Ok((_, None)) => {}
                Err(e) => {
                    self.progress.record();
                    tracing::warn!(error = %e, "Probe task failed");
                }
            }
        }

        tracing::debug!(peak_in_flight = limiter.peak(), "Sweep finished");
        found.sort_by_key(|(index, _)| *index);
        found.into_iter().map(|(_, device)| device).collect()
    }
}
