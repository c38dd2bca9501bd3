//! Post-sweep enrichment of alive hosts: reverse names and open ports.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use netpulse_core::Device;
use netpulse_probe::tcp::check_port;
use netpulse_probe::HostnameResolver;

use crate::error::{DiscoverError, Result};

/// Port connects in flight per host.
pub const PORT_SCAN_PARALLELISM: usize = 256;

/// Parse a port list such as `22,80-82,443` into ports in listed order.
pub fn parse_port_spec(spec: &str) -> Result<Vec<u16>> {
    let invalid = |reason: String| DiscoverError::InvalidPortSpec {
        spec: spec.to_string(),
        reason,
    };
    let parse_port = |raw: &str| -> Result<u16> {
        match raw.trim().parse::<u16>() {
            Ok(port) if port > 0 => Ok(port),
            _ => Err(invalid(format!("{} is not a port number", raw.trim()))),
        }
    };

    let mut ports = Vec::new();
    for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                let (start, end) = (parse_port(start)?, parse_port(end)?);
                if start > end {
                    return Err(invalid(format!("range {part} is reversed")));
                }
                ports.extend(start..=end);
            }
            None => ports.push(parse_port(part)?),
        }
    }
    Ok(ports)
}

/// What to add to each alive device.
#[derive(Debug, Clone)]
pub struct EnrichmentPlan {
    pub include_hostnames: bool,
    /// Ports to check; `None` skips the port scan.
    pub ports: Option<Vec<u16>>,
    pub timeout: Duration,
}

impl EnrichmentPlan {
    pub fn is_empty(&self) -> bool {
        !self.include_hostnames && self.ports.is_none()
    }
}

pub struct Enricher {
    resolver: Arc<dyn HostnameResolver>,
}

impl Enricher {
    pub fn new(resolver: Arc<dyn HostnameResolver>) -> Self {
        Self { resolver }
    }

    /// Reverse-resolve `address`. Any failure, including timeout, yields `None`.
    pub async fn resolve_hostname(&self, address: &str, timeout: Duration) -> Option<String> {
        let ip: IpAddr = address.parse().ok()?;
        match tokio::time::timeout(timeout, self.resolver.reverse(ip)).await {
            Ok(Ok(name)) => name,
            Ok(Err(e)) => {
                tracing::debug!(host = %address, error = %e, "Reverse lookup failed");
                None
            }
            Err(_) => {
                tracing::debug!(host = %address, "Reverse lookup timed out");
                None
            }
        }
    }

    /// Ports from `ports` that accept a connection, in input order.
    pub async fn scan_ports(&self, address: &str, ports: &[u16], timeout: Duration) -> Vec<u16> {
        stream::iter(ports.iter().copied())
            .map(|port| async move { check_port(address, port, timeout).await.then_some(port) })
            .buffered(PORT_SCAN_PARALLELISM)
            .filter_map(|open| async move { open })
            .collect()
            .await
    }

    pub async fn enrich(&self, mut device: Device, plan: &EnrichmentPlan) -> Device {
        if plan.include_hostnames {
            device.hostname = self.resolve_hostname(&device.address, plan.timeout).await;
        }
        if let Some(ports) = &plan.ports {
            let open = self.scan_ports(&device.address, ports, plan.timeout).await;
            tracing::debug!(host = %device.address, open = ?open, "Port scan complete");
            device.open_ports = Some(open);
        }
        device
    }
}
