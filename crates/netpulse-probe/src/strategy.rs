//! The probing method abstraction shared by every link of the chain.

use std::time::Duration;

use async_trait::async_trait;
use netpulse_core::ProbeResult;

use crate::error::Result;

/// One reachability method.
///
/// `Ok` with `alive: false` means the method ran and the target did not
/// answer. `Err` means the method itself could not run (missing binary,
/// socket permission, unresolvable name); the chain treats both as a reason
/// to fall through to the next method.
#[async_trait]
pub trait ProbeStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Probe `target`, resolving within roughly `timeout`.
    async fn probe(&self, target: &str, timeout: Duration) -> Result<ProbeResult>;
}
