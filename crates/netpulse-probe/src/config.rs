//! Probe chain configuration, nested as `[<service>.probe]` in the config file.

use std::time::Duration;

use serde::Deserialize;

use crate::tcp::COMMON_PORTS;

/// Which strategies the chain runs and how they are tuned.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ProbeConfig {
    /// Path to the ping executable (default: "ping").
    #[serde(default = "default_ping_path")]
    pub ping_path: String,

    /// Wall-clock grace added on top of the probe timeout for the ping process.
    #[serde(default = "default_exec_grace_ms")]
    pub exec_grace_ms: u64,

    /// Echo requests sent by the in-process ICMP probe.
    #[serde(default = "default_echo_count")]
    pub echo_count: u16,

    /// ICMP payload size in bytes.
    #[serde(default = "default_payload_size")]
    pub payload_size: usize,

    /// Ports tried, in order, by the TCP fallback.
    #[serde(default = "default_tcp_ports")]
    pub tcp_ports: Vec<u16>,

    /// Upper bound on the per-port connect timeout of the TCP fallback.
    #[serde(default = "default_tcp_port_timeout_cap_ms")]
    pub tcp_port_timeout_cap_ms: u64,

    #[serde(default = "default_true")]
    pub exec: bool,

    #[serde(default = "default_true")]
    pub icmp: bool,

    #[serde(default = "default_true")]
    pub tcp: bool,
}

impl ProbeConfig {
    pub fn exec_grace(&self) -> Duration {
        Duration::from_millis(self.exec_grace_ms)
    }

    pub fn tcp_port_timeout_cap(&self) -> Duration {
        Duration::from_millis(self.tcp_port_timeout_cap_ms)
    }
}

fn default_ping_path() -> String {
    "ping".to_string()
}

fn default_exec_grace_ms() -> u64 {
    1000
}

fn default_echo_count() -> u16 {
    1
}

fn default_payload_size() -> usize {
    32
}

fn default_tcp_ports() -> Vec<u16> {
    COMMON_PORTS.to_vec()
}

fn default_tcp_port_timeout_cap_ms() -> u64 {
    2000
}

fn default_true() -> bool {
    true
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            ping_path: default_ping_path(),
            exec_grace_ms: default_exec_grace_ms(),
            echo_count: default_echo_count(),
            payload_size: default_payload_size(),
            tcp_ports: default_tcp_ports(),
            tcp_port_timeout_cap_ms: default_tcp_port_timeout_cap_ms(),
            exec: true,
            icmp: true,
            tcp: true,
        }
    }
}
