//! Configuration for the discover service.

use netpulse_probe::ProbeConfig;
use serde::Deserialize;

/// Defaults for a scan; each field can be overridden per request.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoverConfig {
    /// Subnet used when a request names none.
    #[serde(default = "default_subnet")]
    pub subnet: String,

    #[serde(default = "default_port_range")]
    pub port_range: String,

    /// Per-probe timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Probes allowed in flight at once.
    #[serde(default = "default_concurrent")]
    pub concurrent: usize,

    #[serde(default)]
    pub include_hostnames: bool,

    #[serde(default)]
    pub include_ports: bool,

    #[serde(default)]
    pub probe: ProbeConfig,
}

fn default_subnet() -> String {
    "192.168.1.0/24".to_string()
}

fn default_port_range() -> String {
    "22,80,443".to_string()
}

fn default_timeout_ms() -> u64 {
    3000
}

fn default_concurrent() -> usize {
    10
}

impl Default for DiscoverConfig {
    fn default() -> Self {
        Self {
            subnet: default_subnet(),
            port_range: default_port_range(),
            timeout_ms: default_timeout_ms(),
            concurrent: default_concurrent(),
            include_hostnames: false,
            include_ports: false,
            probe: ProbeConfig::default(),
        }
    }
}
