//! Ordered fallback over probe strategies.

use std::time::Duration;

use netpulse_core::{ProbeMethod, ProbeResult};

use crate::config::ProbeConfig;
use crate::exec::ExecProbe;
use crate::icmp::IcmpProbe;
use crate::strategy::ProbeStrategy;
use crate::tcp::TcpProbe;

/// Fixed delay between retries of a whole chain run.
pub const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Tries each strategy in order and stops at the first one reporting alive.
pub struct ProbeChain {
    strategies: Vec<Box<dyn ProbeStrategy>>,
}

impl ProbeChain {
    pub fn new(strategies: Vec<Box<dyn ProbeStrategy>>) -> Self {
        Self { strategies }
    }

    /// The standard exec → ICMP → TCP chain, minus any strategy disabled in config.
    pub fn from_config(config: &ProbeConfig) -> Self {
        let mut strategies: Vec<Box<dyn ProbeStrategy>> = Vec::new();
        if config.exec {
            strategies.push(Box::new(
                ExecProbe::new(&config.ping_path).with_grace(config.exec_grace()),
            ));
        }
        if config.icmp {
            strategies.push(Box::new(IcmpProbe::new(
                config.echo_count,
                config.payload_size,
            )));
        }
        if config.tcp {
            strategies.push(Box::new(TcpProbe::new(
                config.tcp_ports.clone(),
                config.tcp_port_timeout_cap(),
            )));
        }
        Self::new(strategies)
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Probe `target` once through the whole chain. Never fails: method
    /// errors fall through, and exhaustion is reported as data.
    pub async fn probe(&self, target: &str, timeout: Duration) -> ProbeResult {
        let mut answered = false;
        let mut last_error = None;

        for strategy in &self.strategies {
            match strategy.probe(target, timeout).await {
                Ok(result) if result.alive => {
                    tracing::debug!(
                        host = %target,
                        strategy = strategy.name(),
                        latency_ms = ?result.latency_ms,
                        "Host alive"
                    );
                    return result;
                }
                Ok(result) => {
                    answered = true;
                    tracing::debug!(
                        host = %target,
                        strategy = strategy.name(),
                        reason = ?result.error,
                        "No answer via method"
                    );
                }
                Err(e) => {
                    tracing::debug!(
                        host = %target,
                        strategy = strategy.name(),
                        error = %e,
                        "Probe method failed"
                    );
                    last_error = Some(e.to_string());
                }
            }
        }

        if answered {
            ProbeResult::unreachable(ProbeMethod::None, "All probe methods failed")
        } else {
            ProbeResult::unreachable(
                ProbeMethod::Error,
                last_error.unwrap_or_else(|| "No probe methods configured".to_string()),
            )
        }
    }

    /// Probe with up to `retries` additional attempts while the target stays
    /// down, waiting [`RETRY_BACKOFF`] between attempts. Returns the final
    /// result and the number of attempts made.
    pub async fn probe_with_retries(
        &self,
        target: &str,
        timeout: Duration,
        retries: u32,
    ) -> (ProbeResult, u32) {
        let mut attempts = 0;
        loop {
            let result = self.probe(target, timeout).await;
            attempts += 1;
            if result.alive || attempts > retries {
                return (result, attempts);
            }
            tracing::debug!(host = %target, attempt = attempts, "Retrying probe");
            tokio::time::sleep(RETRY_BACKOFF).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ProbeError, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    enum Answer {
        Alive(ProbeMethod, f64),
        Down(ProbeMethod),
        Fail,
    }

    struct Scripted {
        answer: Answer,
        calls: Arc<AtomicUsize>,
    }

    impl Scripted {
        fn boxed(answer: Answer, calls: &Arc<AtomicUsize>) -> Box<dyn ProbeStrategy> {
            Box::new(Self {
                answer,
                calls: calls.clone(),
            })
        }
    }

    #[async_trait]
    impl ProbeStrategy for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn probe(&self, _target: &str, _timeout: Duration) -> Result<ProbeResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.answer {
                Answer::Alive(method, ms) => Ok(ProbeResult::alive(method, Some(ms))),
                Answer::Down(method) => Ok(ProbeResult::unreachable(method, "down")),
                Answer::Fail => Err(ProbeError::Icmp("operation not permitted".to_string())),
            }
        }
    }

    #[tokio::test]
    async fn test_first_alive_short_circuits() {
        let later = Arc::new(AtomicUsize::new(0));
        let first = Arc::new(AtomicUsize::new(0));
        let chain = ProbeChain::new(vec![
            Scripted::boxed(Answer::Alive(ProbeMethod::ExternalProcess, 1.5), &first),
            Scripted::boxed(Answer::Fail, &later),
            Scripted::boxed(Answer::Down(ProbeMethod::TcpFallback), &later),
        ]);

        let result = chain.probe("10.0.0.1", Duration::from_secs(1)).await;
        assert!(result.alive);
        assert_eq!(result.method, ProbeMethod::ExternalProcess);
        assert_eq!(result.latency_ms, Some(1.5));
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(later.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_falls_through_errors_to_tcp() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = ProbeChain::new(vec![
            Scripted::boxed(Answer::Down(ProbeMethod::ExternalProcess), &calls),
            Scripted::boxed(Answer::Fail, &calls),
            Scripted::boxed(Answer::Alive(ProbeMethod::TcpFallback, 7.0), &calls),
        ]);

        let result = chain.probe("10.0.0.1", Duration::from_secs(1)).await;
        assert!(result.alive);
        assert_eq!(result.method, ProbeMethod::TcpFallback);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_all_down_is_method_none() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = ProbeChain::new(vec![
            Scripted::boxed(Answer::Down(ProbeMethod::ExternalProcess), &calls),
            Scripted::boxed(Answer::Fail, &calls),
        ]);

        let result = chain.probe("10.0.0.1", Duration::from_secs(1)).await;
        assert!(!result.alive);
        assert_eq!(result.method, ProbeMethod::None);
        assert_eq!(result.error.as_deref(), Some("All probe methods failed"));
    }

    #[tokio::test]
    async fn test_all_errors_is_method_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = ProbeChain::new(vec![Scripted::boxed(Answer::Fail, &calls)]);

        let result = chain.probe("10.0.0.1", Duration::from_secs(1)).await;
        assert!(!result.alive);
        assert_eq!(result.method, ProbeMethod::Error);
        assert!(result.error.unwrap().contains("operation not permitted"));

        let empty = ProbeChain::new(vec![]).probe("10.0.0.1", Duration::from_secs(1)).await;
        assert_eq!(empty.method, ProbeMethod::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_with_backoff() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = ProbeChain::new(vec![Scripted::boxed(
            Answer::Down(ProbeMethod::Library),
            &calls,
        )]);

        let started = tokio::time::Instant::now();
        let (result, attempts) = chain
            .probe_with_retries("10.0.0.1", Duration::from_secs(1), 2)
            .await;
        assert!(!result.alive);
        assert_eq!(attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(started.elapsed(), RETRY_BACKOFF * 2);
    }

    #[test]
    fn test_from_config_respects_flags() {
        let config = ProbeConfig {
            icmp: false,
            ..ProbeConfig::default()
        };
        assert_eq!(
            ProbeChain::from_config(&config).strategy_names(),
            vec!["exec", "tcp"]
        );
    }
}
