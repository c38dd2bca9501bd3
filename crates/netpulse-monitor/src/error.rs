//! Error types for the netpulse-monitor crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("No targets specified")]
    NoTargets,

    #[error("No valid targets to ping")]
    NoValidTargets,

    #[error("No IP address provided")]
    MissingTarget,

    #[error("Invalid IP address or hostname format: {target}")]
    InvalidTarget { target: String },
}

pub type Result<T> = std::result::Result<T, MonitorError>;
