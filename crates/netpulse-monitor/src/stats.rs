//! Statistics over measurement batches, target histories, and ping samples.

use chrono::Utc;
use netpulse_core::types::{AggregateStats, PingSample, PingStatistics, TargetSummary, Trend};
use netpulse_core::PerformanceRecord;

/// Records summarized per target in a report.
pub const REPORT_WINDOW: usize = 24;

/// Records considered for the latency trend.
pub const TREND_WINDOW: usize = 10;

/// Half-to-half mean change below which latency counts as stable.
pub const TREND_STABLE_MS: f64 = 5.0;

/// Mean absolute difference between consecutive latencies; 0 with fewer than two.
pub fn jitter(latencies: &[f64]) -> f64 {
    if latencies.len() < 2 {
        return 0.0;
    }
    let total: f64 = latencies.windows(2).map(|w| (w[1] - w[0]).abs()).sum();
    total / (latencies.len() - 1) as f64
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn min(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::min)
}

fn max(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn alive_latencies(records: &[PerformanceRecord]) -> Vec<f64> {
    records
        .iter()
        .filter(|r| r.alive)
        .filter_map(|r| r.latency_ms)
        .collect()
}

/// Compare mean latency of the older and newer halves of `records`.
pub fn trend(records: &[PerformanceRecord]) -> Trend {
    if records.len() < 2 {
        return Trend::InsufficientData;
    }
    let latencies = alive_latencies(records);
    if latencies.len() < 2 {
        return Trend::NoLatencyData;
    }

    let (older, newer) = latencies.split_at(latencies.len() / 2);
    let diff = mean(newer).unwrap_or(0.0) - mean(older).unwrap_or(0.0);
    if diff.abs() < TREND_STABLE_MS {
        Trend::Stable
    } else if diff > 0.0 {
        Trend::Increasing
    } else {
        Trend::Decreasing
    }
}

/// Statistics for one measurement batch.
pub fn aggregate(records: &[PerformanceRecord]) -> AggregateStats {
    let alive = records.iter().filter(|r| r.alive).count();
    let latencies = alive_latencies(records);
    let losses: Vec<f64> = records.iter().filter_map(|r| r.packet_loss_pct).collect();

    AggregateStats {
        total_targets: records.len(),
        alive_targets: alive,
        down_targets: records.len() - alive,
        availability_pct: percent(alive, records.len()),
        average_latency_ms: mean(&latencies).map(f64::round),
        min_latency_ms: min(&latencies),
        max_latency_ms: max(&latencies),
        packet_loss_pct: mean(&losses),
        jitter_ms: jitter(&latencies),
    }
}

/// Summary of one target's history (oldest first).
pub fn summarize(history: &[PerformanceRecord]) -> TargetSummary {
    let window = &history[history.len().saturating_sub(REPORT_WINDOW)..];
    let recent = &history[history.len().saturating_sub(TREND_WINDOW)..];
    let alive = window.iter().filter(|r| r.alive).count();
    let latencies = alive_latencies(window);

    TargetSummary {
        total_measurements: window.len(),
        availability_pct: percent(alive, window.len()),
        average_latency_ms: mean(&latencies),
        min_latency_ms: min(&latencies),
        max_latency_ms: max(&latencies),
        last_measurement: history.last().cloned(),
        trend: trend(recent),
    }
}

/// Statistics over a ping sequence. Alive samples without a latency count as 0 ms.
pub fn ping_statistics(host: &str, samples: &[PingSample], keep_samples: bool) -> PingStatistics {
    let times: Vec<f64> = samples
        .iter()
        .filter(|s| s.result.alive)
        .map(|s| s.result.latency_ms.unwrap_or(0.0))
        .collect();

    PingStatistics {
        host: host.to_string(),
        total_pings: samples.len(),
        successful_pings: times.len(),
        failed_pings: samples.len() - times.len(),
        success_rate: percent(times.len(), samples.len()),
        average_time_ms: mean(&times).unwrap_or(0.0),
        min_response_time_ms: min(&times).unwrap_or(0.0),
        max_response_time_ms: max(&times).unwrap_or(0.0),
        jitter_ms: jitter(&times),
        results: if keep_samples {
            samples.to_vec()
        } else {
            Vec::new()
        },
        timestamp: Utc::now(),
    }
}
