//! netpulse-probe: Layered reachability probing.
//!
//! A [`ProbeChain`] tries an ordered list of [`ProbeStrategy`] implementations
//! (external `ping`, in-process ICMP echo, TCP connect) until one reports the
//! target alive. Also provides target validation, a bounded TCP port check,
//! and the reverse name resolution capability used for enrichment.

pub mod chain;
pub mod config;
pub mod error;
pub mod exec;
pub mod icmp;
pub mod resolver;
pub mod strategy;
pub mod tcp;
pub mod validator;

pub use chain::ProbeChain;
pub use config::ProbeConfig;
pub use error::{ProbeError, Result};
pub use resolver::{HostnameResolver, SystemResolver};
pub use strategy::ProbeStrategy;
pub use validator::{filter_valid_targets, is_valid_target};
