//! In-process ICMP echo probe.
//!
//! Uses `surge-ping`. Where the privilege model denies ICMP sockets every
//! echo fails to send, which is reported as a method error so the chain can
//! fall through to TCP.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use netpulse_core::{ProbeMethod, ProbeResult};
use surge_ping::SurgeError;

use crate::error::{ProbeError, Result};
use crate::strategy::ProbeStrategy;

/// Round-trip summary of an echo sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct EchoSummary {
    pub sent: usize,
    pub received: usize,
    /// Round trip of the final echo, if it was answered.
    pub time_ms: Option<f64>,
    pub avg_ms: Option<f64>,
    pub min_ms: Option<f64>,
}

impl EchoSummary {
    /// Summarize per-echo round trips (`None` = lost).
    pub fn from_samples(samples: &[Option<f64>]) -> Self {
        let replies: Vec<f64> = samples.iter().flatten().copied().collect();
        let avg_ms = if replies.is_empty() {
            None
        } else {
            Some(replies.iter().sum::<f64>() / replies.len() as f64)
        };
        let min_ms = replies.iter().copied().reduce(f64::min);

        Self {
            sent: samples.len(),
            received: replies.len(),
            time_ms: samples.last().copied().flatten(),
            avg_ms,
            min_ms,
        }
    }

    /// Latency with the `time` → `avg` → `min` field fallback.
    pub fn latency_ms(&self) -> Option<f64> {
        self.time_ms.or(self.avg_ms).or(self.min_ms)
    }

    pub fn packet_loss_pct(&self) -> f64 {
        if self.sent == 0 {
            return 100.0;
        }
        (self.sent - self.received) as f64 / self.sent as f64 * 100.0
    }
}

/// ICMP echo through an in-process socket.
pub struct IcmpProbe {
    count: u16,
    payload: Vec<u8>,
}

impl IcmpProbe {
    pub fn new(count: u16, payload_size: usize) -> Self {
        Self {
            count: count.max(1),
            payload: vec![0; payload_size],
        }
    }
}

async fn resolve(target: &str, timeout: Duration) -> Result<IpAddr> {
    if let Ok(ip) = target.parse::<IpAddr>() {
        return Ok(ip);
    }

    let resolve_err = || ProbeError::Resolve {
        target: target.to_string(),
    };
    let mut addrs = tokio::time::timeout(timeout, tokio::net::lookup_host((target, 0)))
        .await
        .map_err(|_| resolve_err())?
        .map_err(|_| resolve_err())?;
    addrs.next().map(|a| a.ip()).ok_or_else(resolve_err)
}

#[async_trait]
impl ProbeStrategy for IcmpProbe {
    fn name(&self) -> &'static str {
        "icmp"
    }

    async fn probe(&self, target: &str, timeout: Duration) -> Result<ProbeResult> {
        let ip = resolve(target, timeout).await?;

        let mut samples = Vec::with_capacity(self.count as usize);
        let mut send_error = None;
        let mut timed_out = false;

        for _ in 0..self.count {
            match tokio::time::timeout(timeout, surge_ping::ping(ip, &self.payload)).await {
                Ok(Ok((_packet, rtt))) => samples.push(Some(rtt.as_secs_f64() * 1000.0)),
                Ok(Err(SurgeError::Timeout { .. })) | Err(_) => {
                    timed_out = true;
                    samples.push(None);
                }
                Ok(Err(e)) => {
                    send_error = Some(e.to_string());
                    samples.push(None);
                }
            }
        }

        let summary = EchoSummary::from_samples(&samples);
        if summary.received == 0 {
            if let (Some(e), false) = (send_error, timed_out) {
                return Err(ProbeError::Icmp(e));
            }
            return Ok(
                ProbeResult::unreachable(ProbeMethod::Library, "no echo reply")
                    .with_packet_loss(summary.packet_loss_pct()),
            );
        }

        tracing::debug!(
            host = %target,
            received = summary.received,
            sent = summary.sent,
            "ICMP echo answered"
        );
        Ok(
            ProbeResult::alive(ProbeMethod::Library, summary.latency_ms())
                .with_packet_loss(summary.packet_loss_pct()),
        )
    }
}
