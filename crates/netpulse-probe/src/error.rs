//! Error types for the netpulse-probe crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not resolve {target}")]
    Resolve { target: String },

    #[error("ICMP echo unavailable: {0}")]
    Icmp(String),

    #[error("Reverse lookup failed for {address}: {reason}")]
    Lookup { address: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ProbeError>;
