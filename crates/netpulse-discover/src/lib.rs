//! netpulse-discover: Host discovery for an address range.
//!
//! Expands a subnet specification, probes every address through the layered
//! probe chain under a concurrency bound, enriches alive hosts with hostnames
//! and open ports, and assembles a single discovery report per scan.

pub mod config;
pub mod coordinator;
pub mod enrich;
pub mod error;
pub mod limiter;
pub mod range;
