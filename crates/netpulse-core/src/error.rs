use thiserror::Error;

/// Top-level error type shared by the netpulse crates.
#[derive(Error, Debug)]
pub enum NetpulseError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, NetpulseError>;
