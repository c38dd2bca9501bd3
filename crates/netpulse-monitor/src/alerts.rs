//! Threshold evaluation for a single performance record.

use netpulse_core::{Alert, AlertType, PerformanceRecord, Severity, Thresholds};

/// Alerts raised by `record`, in latency, availability, packet-loss order.
pub fn evaluate(record: &PerformanceRecord, thresholds: &Thresholds) -> Vec<Alert> {
    let mut alerts = Vec::new();
    let raise = |kind, value, threshold, level| Alert {
        alert_type: kind,
        target: record.target.clone(),
        value,
        threshold,
        severity: level,
        timestamp: record.timestamp,
    };

    if record.alive {
        if let Some(latency) = record.latency_ms.filter(|&l| l > thresholds.latency_ms) {
            alerts.push(raise(
                AlertType::Latency,
                latency,
                thresholds.latency_ms,
                severity(latency, thresholds.latency_ms),
            ));
        }
    } else {
        alerts.push(raise(
            AlertType::Availability,
            0.0,
            thresholds.availability_pct,
            Severity::Critical,
        ));
    }

    if let Some(loss) = record
        .packet_loss_pct
        .filter(|&l| l > thresholds.packet_loss_pct)
    {
        alerts.push(raise(
            AlertType::PacketLoss,
            loss,
            thresholds.packet_loss_pct,
            severity(loss, thresholds.packet_loss_pct),
        ));
    }

    alerts
}

/// Critical iff `value` exceeds twice `threshold`.
pub fn severity(value: f64, threshold: f64) -> Severity {
    if value > threshold * 2.0 {
        Severity::Critical
    } else {
        Severity::Warning
    }
}
