//! TCP connect checks.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use netpulse_core::{ProbeMethod, ProbeResult};
use tokio::net::TcpStream;

use crate::error::Result;
use crate::strategy::ProbeStrategy;

/// Ports commonly open on hosts that drop ICMP, tried in this order.
pub const COMMON_PORTS: [u16; 6] = [80, 443, 22, 3389, 135, 445];

/// Whether a TCP connection to `host:port` completes within `timeout`.
pub async fn check_port(host: &str, port: u16, timeout: Duration) -> bool {
    matches!(
        tokio::time::timeout(timeout, TcpStream::connect((host, port))).await,
        Ok(Ok(_))
    )
}

/// Last-resort reachability: any accepted connection on a common port.
pub struct TcpProbe {
    ports: Vec<u16>,
    port_timeout_cap: Duration,
}

impl TcpProbe {
    pub fn new(ports: Vec<u16>, port_timeout_cap: Duration) -> Self {
        Self {
            ports,
            port_timeout_cap,
        }
    }
}

#[async_trait]
impl ProbeStrategy for TcpProbe {
    fn name(&self) -> &'static str {
        "tcp"
    }

    async fn probe(&self, target: &str, timeout: Duration) -> Result<ProbeResult> {
        let per_port = timeout.min(self.port_timeout_cap);

        for &port in &self.ports {
            let start = Instant::now();
            if check_port(target, port, per_port).await {
                let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
                tracing::debug!(host = %target, port, elapsed_ms, "TCP connect succeeded");
                return Ok(
                    ProbeResult::alive(ProbeMethod::TcpFallback, Some(elapsed_ms.round()))
                        .with_port(port),
                );
            }
        }

        Ok(ProbeResult::unreachable(
            ProbeMethod::TcpFallback,
            "No TCP ports responded",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn test_check_port_open_and_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let open = listener.local_addr().unwrap().port();
        let closed = closed_port().await;

        assert!(check_port("127.0.0.1", open, Duration::from_secs(1)).await);
        assert!(!check_port("127.0.0.1", closed, Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn test_first_open_port_wins() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let open = listener.local_addr().unwrap().port();
        let closed = closed_port().await;

        let probe = TcpProbe::new(vec![closed, open], Duration::from_secs(2));
        let result = probe
            .probe("127.0.0.1", Duration::from_secs(1))
            .await
            .unwrap();
        assert!(result.alive);
        assert_eq!(result.method, ProbeMethod::TcpFallback);
        assert_eq!(result.port, Some(open));
    }

    #[tokio::test]
    async fn test_no_open_ports() {
        let closed = closed_port().await;
        let probe = TcpProbe::new(vec![closed], Duration::from_secs(2));
        let result = probe
            .probe("127.0.0.1", Duration::from_millis(500))
            .await
            .unwrap();
        assert!(!result.alive);
        assert_eq!(result.error.as_deref(), Some("No TCP ports responded"));
    }
}
