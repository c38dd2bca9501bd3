//! netpulse-monitor: Latency and availability monitoring.
//!
//! - [`monitor::PerformanceMonitor`] owns per-target history and the alert log
//! - [`service::MonitorService`] drives it from commands and a measurement timer
//! - [`ping::PingService`] runs ping sequences and continuous ping sessions

pub mod alerts;
pub mod config;
pub mod error;
pub mod history;
pub mod monitor;
pub mod ping;
pub mod service;
pub mod stats;
