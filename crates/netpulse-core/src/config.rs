//! Configuration management for netpulse services.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (`NETPULSE_` prefix, `__` between nested keys)
//! 2. Config file (`netpulse.toml` unless overridden)
//! 3. Defaults

use serde::de::DeserializeOwned;

use crate::error::Result;

/// Environment prefix shared by all services.
pub const ENV_PREFIX: &str = "NETPULSE";

/// Load one top-level section (e.g. `discover`, `monitor`) of the layered config.
///
/// A missing section falls back to `T::default()`; a present but malformed
/// section is an error.
pub fn load_section<T>(file_prefix: &str, section: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    match cfg.get::<T>(section) {
        Ok(c) => Ok(c),
        Err(config::ConfigError::NotFound(_)) => {
            tracing::debug!(section, "Config section absent, using defaults");
            Ok(T::default())
        }
        Err(e) => Err(e.into()),
    }
}
