//! Error types for the netpulse-discover crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiscoverError {
    #[error("No subnet specified")]
    EmptySubnet,

    #[error("Invalid CIDR block {spec}: {reason}")]
    InvalidCidr { spec: String, reason: String },

    #[error("Invalid IP range {spec}: {reason}")]
    InvalidRange { spec: String, reason: String },

    #[error("IP range {spec} spans {count} addresses (limit {limit})")]
    RangeTooLarge { spec: String, count: u64, limit: u64 },

    #[error("No IPs generated from subnet {subnet}")]
    NoAddresses { subnet: String },

    #[error("Invalid port specification {spec}: {reason}")]
    InvalidPortSpec { spec: String, reason: String },
}

pub type Result<T> = std::result::Result<T, DiscoverError>;
