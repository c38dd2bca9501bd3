//! External `ping` process wrapper.
//!
//! Runs a single echo request through the system `ping` binary via
//! `tokio::process::Command` and classifies the combined output with a
//! per-platform text grammar.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use netpulse_core::{ProbeMethod, ProbeResult};
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::process::Command;

use crate::error::{ProbeError, Result};
use crate::strategy::ProbeStrategy;

/// Extra wall-clock time granted to the ping process beyond the probe timeout.
pub const DEFAULT_GRACE: Duration = Duration::from_millis(1000);

static UNIX_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"time=(\d+\.?\d*)").expect("valid regex"));

static WINDOWS_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)time[<=](\d+)ms").expect("valid regex"));

/// Output grammar family of the local ping binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingPlatform {
    Windows,
    Unix,
}

impl PingPlatform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Unix
        }
    }

    /// Arguments for a single echo bounded by `timeout`.
    pub fn echo_args(&self, timeout: Duration) -> Vec<String> {
        match self {
            Self::Windows => vec![
                "-n".to_string(),
                "1".to_string(),
                "-w".to_string(),
                timeout.as_millis().to_string(),
            ],
            // -W takes whole seconds; 0 would mean "wait forever" on some builds.
            Self::Unix => vec![
                "-c".to_string(),
                "1".to_string(),
                "-W".to_string(),
                timeout.as_secs().max(1).to_string(),
            ],
        }
    }
}

/// What a ping transcript says about the target.
#[derive(Debug, Clone, PartialEq)]
pub enum EchoOutcome {
    Replied { latency_ms: Option<f64> },
    NoReply,
}

/// Classify combined stdout/stderr of one ping invocation.
pub fn parse_echo_output(platform: PingPlatform, output: &str) -> EchoOutcome {
    match platform {
        PingPlatform::Windows => {
            if output.contains("TTL=") || output.contains("time=") {
                let latency_ms = WINDOWS_TIME
                    .captures(output)
                    .and_then(|c| c[1].parse::<f64>().ok());
                EchoOutcome::Replied { latency_ms }
            } else {
                EchoOutcome::NoReply
            }
        }
        PingPlatform::Unix => {
            const MARKERS: [&str; 4] = [
                " 0% packet loss",
                " 0.0% packet loss",
                "1 received",
                "1 packets received",
            ];
            if MARKERS.iter().any(|m| output.contains(m)) {
                let latency_ms = UNIX_TIME
                    .captures(output)
                    .and_then(|c| c[1].parse::<f64>().ok());
                EchoOutcome::Replied { latency_ms }
            } else {
                EchoOutcome::NoReply
            }
        }
    }
}

/// Probe through the external ping executable.
pub struct ExecProbe {
    program: String,
    platform: PingPlatform,
    grace: Duration,
}

impl ExecProbe {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            platform: PingPlatform::current(),
            grace: DEFAULT_GRACE,
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }
}

#[async_trait]
impl ProbeStrategy for ExecProbe {
    fn name(&self) -> &'static str {
        "exec"
    }

    async fn probe(&self, target: &str, timeout: Duration) -> Result<ProbeResult> {
        let args = self.platform.echo_args(timeout);
        tracing::debug!(host = %target, program = %self.program, ?args, "Executing ping");

        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .arg(target)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(timeout + self.grace, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ProbeError::Spawn {
                    program: self.program.clone(),
                    source: e,
                })
            }
            Err(_) => {
                return Ok(ProbeResult::unreachable(
                    ProbeMethod::ExternalProcess,
                    format!(
                        "ping did not finish within {}ms",
                        (timeout + self.grace).as_millis()
                    ),
                ))
            }
        };

        if !output.status.success() {
            return Ok(ProbeResult::unreachable(
                ProbeMethod::ExternalProcess,
                format!("ping exited with {}", output.status),
            ));
        }

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        match parse_echo_output(self.platform, &combined) {
            EchoOutcome::Replied { latency_ms } => Ok(ProbeResult::alive(
                ProbeMethod::ExternalProcess,
                Some(latency_ms.unwrap_or(0.0)),
            )),
            EchoOutcome::NoReply => Ok(ProbeResult::unreachable(
                ProbeMethod::ExternalProcess,
                "no reply marker in ping output",
            )),
        }
    }
}
