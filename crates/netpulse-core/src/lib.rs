//! netpulse-core: Shared types, events, configuration, and error handling.
//!
//! This crate provides the foundational types used across all netpulse components:
//! - Probe results, discovered devices, and discovery reports
//! - Performance records, thresholds, alerts, and monitoring reports
//! - The event envelope emitted by the scanner and monitor services
//! - Layered configuration loading
//! - Common error types

pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use error::NetpulseError;
pub use events::{Channel, Event, EventPayload, EventSource};
pub use types::{
    Alert, AlertType, Device, DiscoveryReport, PerformanceRecord, ProbeMethod, ProbeResult,
    Severity, Thresholds,
};
