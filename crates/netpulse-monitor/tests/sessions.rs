//! Service-level tests for the monitor and ping actors.
//!
//! Probing goes through a scripted strategy and the clock is paused, so
//! schedules, overlap skipping, and retry backoff are exact.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use netpulse_core::types::Trend;
use netpulse_core::{AlertType, Channel, Event, EventPayload, ProbeMethod, ProbeResult, Severity};
use netpulse_monitor::config::{MonitorConfig, PingConfig};
use netpulse_monitor::ping::{PingCommand, PingRequest, PingService};
use netpulse_monitor::service::{MonitorCommand, MonitorService};
use netpulse_probe::{ProbeChain, ProbeStrategy};
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Hosts answer with a fixed latency after `delay`; unknown hosts are down.
struct Scripted {
    latencies: HashMap<String, f64>,
    delay: Duration,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl ProbeStrategy for Scripted {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn probe(&self, target: &str, _timeout: Duration) -> netpulse_probe::Result<ProbeResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(match self.latencies.get(target) {
            Some(&ms) => ProbeResult::alive(ProbeMethod::ExternalProcess, Some(ms)),
            None => ProbeResult::unreachable(ProbeMethod::ExternalProcess, "timeout"),
        })
    }
}

fn scripted(hosts: &[(&str, f64)], delay: Duration) -> (ProbeChain, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let strategy = Scripted {
        latencies: hosts.iter().map(|(h, ms)| (h.to_string(), *ms)).collect(),
        delay,
        calls: calls.clone(),
    };
    (ProbeChain::new(vec![Box::new(strategy)]), calls)
}

fn monitor_config(targets: &[&str]) -> MonitorConfig {
    MonitorConfig {
        targets: targets.iter().map(|t| t.to_string()).collect(),
        interval_ms: 1000,
        ..MonitorConfig::default()
    }
}

async fn next(events: &mut mpsc::Receiver<Event>) -> Event {
    tokio::time::timeout(Duration::from_secs(30), events.recv())
        .await
        .expect("no event within 30s")
        .expect("event channel closed")
}

async fn assert_quiet(events: &mut mpsc::Receiver<Event>, window: Duration) {
    if let Ok(Some(event)) = tokio::time::timeout(window, events.recv()).await {
        panic!("unexpected event: {:?}", event.payload);
    }
}

// ── Monitor service ──────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_start_measures_immediately_then_on_interval() {
    let (chain, _calls) = scripted(&[("10.0.0.1", 250.0)], Duration::ZERO);
    let (cmd_tx, cmd_rx) = mpsc::channel(8);
    let (ev_tx, mut ev_rx) = mpsc::channel(64);
    MonitorService::new(&monitor_config(&["10.0.0.1", "10.0.0.2"]), chain, ev_tx).spawn(cmd_rx);

    let started = Instant::now();
    cmd_tx
        .send(MonitorCommand::Start {
            targets: None,
            interval_ms: None,
        })
        .await
        .unwrap();

    let alerts = next(&mut ev_rx).await;
    assert_eq!(alerts.channel(), Channel::Alerts);
    let EventPayload::NetworkAlerts(alerts) = alerts.payload else {
        panic!("expected alerts first");
    };
    let kinds: Vec<(AlertType, Severity)> =
        alerts.iter().map(|a| (a.alert_type, a.severity)).collect();
    assert_eq!(
        kinds,
        vec![
            (AlertType::Latency, Severity::Critical),
            (AlertType::Availability, Severity::Critical),
        ]
    );

    let batch = next(&mut ev_rx).await;
    assert_eq!(batch.channel(), Channel::Results);
    let EventPayload::NetworkPerformance(batch) = batch.payload else {
        panic!("expected a performance batch");
    };
    assert_eq!(batch.aggregate.total_targets, 2);
    assert_eq!(batch.aggregate.alive_targets, 1);
    assert_eq!(started.elapsed(), Duration::ZERO);

    next(&mut ev_rx).await;
    let second = next(&mut ev_rx).await;
    assert!(matches!(second.payload, EventPayload::NetworkPerformance(_)));
    assert_eq!(started.elapsed(), Duration::from_millis(1000));

    cmd_tx.send(MonitorCommand::Stop).await.unwrap();
    assert_quiet(&mut ev_rx, Duration::from_secs(5)).await;
}

#[tokio::test(start_paused = true)]
async fn test_tick_skipped_while_measurement_in_flight() {
    let (chain, calls) = scripted(&[("10.0.0.1", 5.0)], Duration::from_millis(1500));
    let (cmd_tx, cmd_rx) = mpsc::channel(8);
    let (ev_tx, mut ev_rx) = mpsc::channel(64);
    MonitorService::new(&monitor_config(&["10.0.0.1"]), chain, ev_tx).spawn(cmd_rx);

    let started = Instant::now();
    cmd_tx
        .send(MonitorCommand::Start {
            targets: None,
            interval_ms: None,
        })
        .await
        .unwrap();

    // t=0 starts the first measurement; the t=1000 tick is skipped.
    assert!(matches!(
        next(&mut ev_rx).await.payload,
        EventPayload::NetworkPerformance(_)
    ));
    assert_eq!(started.elapsed(), Duration::from_millis(1500));

    // t=2000 starts the second; t=3000 is skipped.
    assert!(matches!(
        next(&mut ev_rx).await.payload,
        EventPayload::NetworkPerformance(_)
    ));
    assert_eq!(started.elapsed(), Duration::from_millis(3500));
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    cmd_tx.send(MonitorCommand::Stop).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_stop_still_records_in_flight_measurement() {
    let (chain, _calls) = scripted(&[("10.0.0.1", 5.0)], Duration::from_millis(500));
    let (cmd_tx, cmd_rx) = mpsc::channel(8);
    let (ev_tx, mut ev_rx) = mpsc::channel(64);
    MonitorService::new(&monitor_config(&["10.0.0.1"]), chain, ev_tx).spawn(cmd_rx);

    cmd_tx
        .send(MonitorCommand::Start {
            targets: None,
            interval_ms: Some(200),
        })
        .await
        .unwrap();
    cmd_tx.send(MonitorCommand::Stop).await.unwrap();

    assert!(matches!(
        next(&mut ev_rx).await.payload,
        EventPayload::NetworkPerformance(_)
    ));

    cmd_tx.send(MonitorCommand::GetReport).await.unwrap();
    let EventPayload::NetworkPerformanceReport(report) = next(&mut ev_rx).await.payload else {
        panic!("expected a report");
    };
    assert!(!report.monitoring_active);
    assert_eq!(report.summary["10.0.0.1"].total_measurements, 1);
    assert_quiet(&mut ev_rx, Duration::from_secs(2)).await;
}

#[tokio::test(start_paused = true)]
async fn test_measure_and_report() {
    let (chain, _calls) = scripted(&[("10.0.0.1", 10.0), ("10.0.0.2", 40.0)], Duration::ZERO);
    let (cmd_tx, cmd_rx) = mpsc::channel(8);
    let (ev_tx, mut ev_rx) = mpsc::channel(64);
    MonitorService::new(&monitor_config(&["10.0.0.1"]), chain, ev_tx).spawn(cmd_rx);

    cmd_tx
        .send(MonitorCommand::AddTarget {
            target: "10.0.0.2".into(),
        })
        .await
        .unwrap();
    for _ in 0..3 {
        cmd_tx
            .send(MonitorCommand::Measure { targets: None })
            .await
            .unwrap();
        let EventPayload::NetworkPerformance(batch) = next(&mut ev_rx).await.payload else {
            panic!("expected a performance batch");
        };
        assert_eq!(batch.aggregate.average_latency_ms, Some(25.0));
        assert_eq!(batch.aggregate.jitter_ms, 30.0);
    }

    cmd_tx.send(MonitorCommand::GetReport).await.unwrap();
    let EventPayload::NetworkPerformanceReport(report) = next(&mut ev_rx).await.payload else {
        panic!("expected a report");
    };
    assert_eq!(report.targets, vec!["10.0.0.1", "10.0.0.2"]);
    let summary = &report.summary["10.0.0.2"];
    assert_eq!(summary.total_measurements, 3);
    assert_eq!(summary.availability_pct, 100.0);
    assert_eq!(summary.trend, Trend::Stable);
    assert!(report.recent_alerts.is_empty());

    cmd_tx
        .send(MonitorCommand::RemoveTarget {
            target: "10.0.0.2".into(),
        })
        .await
        .unwrap();
    cmd_tx.send(MonitorCommand::ClearData).await.unwrap();
    cmd_tx.send(MonitorCommand::GetReport).await.unwrap();
    let EventPayload::NetworkPerformanceReport(report) = next(&mut ev_rx).await.payload else {
        panic!("expected a report");
    };
    assert!(report.targets.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_invalid_targets_reported_as_error() {
    let (chain, calls) = scripted(&[], Duration::ZERO);
    let (cmd_tx, cmd_rx) = mpsc::channel(8);
    let (ev_tx, mut ev_rx) = mpsc::channel(64);
    MonitorService::new(&monitor_config(&[]), chain, ev_tx).spawn(cmd_rx);

    cmd_tx
        .send(MonitorCommand::Measure {
            targets: Some(vec!["1700000000000".into()]),
        })
        .await
        .unwrap();
    let event = next(&mut ev_rx).await;
    assert_eq!(event.channel(), Channel::Errors);

    cmd_tx
        .send(MonitorCommand::Start {
            targets: None,
            interval_ms: None,
        })
        .await
        .unwrap();
    let event = next(&mut ev_rx).await;
    let EventPayload::Error { message } = event.payload else {
        panic!("expected an error");
    };
    assert!(message.contains("No targets specified for monitoring"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_drains_in_flight_measurement() {
    let (chain, _calls) = scripted(&[("10.0.0.1", 5.0)], Duration::from_millis(300));
    let (cmd_tx, cmd_rx) = mpsc::channel(8);
    let (ev_tx, mut ev_rx) = mpsc::channel(64);
    let handle = MonitorService::new(&monitor_config(&["10.0.0.1"]), chain, ev_tx).spawn(cmd_rx);

    cmd_tx
        .send(MonitorCommand::Measure { targets: None })
        .await
        .unwrap();
    drop(cmd_tx);

    assert!(matches!(
        next(&mut ev_rx).await.payload,
        EventPayload::NetworkPerformance(_)
    ));
    assert!(ev_rx.recv().await.is_none());
    handle.await.unwrap();
}

// ── Ping service ─────────────────────────────────────────────────

fn ping_request(target: &str) -> PingRequest {
    PingRequest {
        target: Some(target.to_string()),
        ..PingRequest::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_ping_sequence_statistics() {
    let (chain, calls) = scripted(&[("10.0.0.1", 12.0)], Duration::ZERO);
    let (cmd_tx, cmd_rx) = mpsc::channel(8);
    let (ev_tx, mut ev_rx) = mpsc::channel(64);
    PingService::new(PingConfig::default(), chain, ev_tx).spawn(cmd_rx);

    let started = Instant::now();
    cmd_tx
        .send(PingCommand::Ping(PingRequest {
            count: Some(3),
            ..ping_request("10.0.0.1")
        }))
        .await
        .unwrap();

    let event = next(&mut ev_rx).await;
    assert_eq!(event.channel(), Channel::Results);
    let EventPayload::PingStatistics(stats) = event.payload else {
        panic!("expected ping statistics");
    };
    assert_eq!(stats.total_pings, 3);
    assert_eq!(stats.successful_pings, 3);
    assert_eq!(stats.success_rate, 100.0);
    assert_eq!(stats.average_time_ms, 12.0);
    assert_eq!(stats.jitter_ms, 0.0);
    assert_eq!(stats.results.len(), 3);
    assert_eq!(started.elapsed(), Duration::from_millis(200));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_ping_sequence_retries_down_host() {
    let (chain, calls) = scripted(&[], Duration::ZERO);
    let (cmd_tx, cmd_rx) = mpsc::channel(8);
    let (ev_tx, mut ev_rx) = mpsc::channel(64);
    PingService::new(PingConfig::default(), chain, ev_tx).spawn(cmd_rx);

    let started = Instant::now();
    cmd_tx
        .send(PingCommand::Ping(PingRequest {
            count: Some(2),
            retries: Some(1),
            ..ping_request("10.0.0.9")
        }))
        .await
        .unwrap();

    let event = next(&mut ev_rx).await;
    assert_eq!(event.channel(), Channel::Alerts);
    let EventPayload::PingStatistics(stats) = event.payload else {
        panic!("expected ping statistics");
    };
    assert_eq!(stats.success_rate, 0.0);
    assert_eq!(stats.failed_pings, 2);
    assert!(stats.results.iter().all(|s| s.attempt == 2));
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(started.elapsed(), Duration::from_millis(600));
}

#[tokio::test(start_paused = true)]
async fn test_continuous_ping_carries_history() {
    let (chain, _calls) = scripted(&[("10.0.0.1", 3.0)], Duration::ZERO);
    let (cmd_tx, cmd_rx) = mpsc::channel(8);
    let (ev_tx, mut ev_rx) = mpsc::channel(64);
    PingService::new(PingConfig::default(), chain, ev_tx).spawn(cmd_rx);

    let started = Instant::now();
    cmd_tx
        .send(PingCommand::Ping(PingRequest {
            interval_ms: Some(1000),
            ..ping_request("10.0.0.1")
        }))
        .await
        .unwrap();

    for expected in 1..=3usize {
        let event = next(&mut ev_rx).await;
        assert_eq!(event.channel(), Channel::Results);
        let EventPayload::PingResult {
            sample,
            statistics,
            history,
        } = event.payload
        else {
            panic!("expected a ping result");
        };
        assert!(sample.result.alive);
        assert_eq!(statistics.success_rate, 100.0);
        assert_eq!(history.len(), expected);
        assert_eq!(
            started.elapsed(),
            Duration::from_millis(1000 * (expected as u64 - 1))
        );
    }

    cmd_tx.send(PingCommand::Stop).await.unwrap();
    assert_quiet(&mut ev_rx, Duration::from_secs(5)).await;
}

#[tokio::test(start_paused = true)]
async fn test_continuous_ping_of_down_host_goes_to_alerts() {
    let (chain, _calls) = scripted(&[], Duration::ZERO);
    let (cmd_tx, cmd_rx) = mpsc::channel(8);
    let (ev_tx, mut ev_rx) = mpsc::channel(64);
    PingService::new(PingConfig::default(), chain, ev_tx).spawn(cmd_rx);

    cmd_tx
        .send(PingCommand::Ping(PingRequest {
            interval_ms: Some(1000),
            ..ping_request("10.0.0.9")
        }))
        .await
        .unwrap();
    let event = next(&mut ev_rx).await;
    assert_eq!(event.channel(), Channel::Alerts);

    // A new request replaces the running session.
    cmd_tx
        .send(PingCommand::Ping(ping_request("10.0.0.9")))
        .await
        .unwrap();
    assert!(matches!(
        next(&mut ev_rx).await.payload,
        EventPayload::PingStatistics(_)
    ));
    assert_quiet(&mut ev_rx, Duration::from_secs(5)).await;
}

#[tokio::test(start_paused = true)]
async fn test_ping_history_commands() {
    let (chain, _calls) = scripted(&[("10.0.0.1", 3.0)], Duration::ZERO);
    let (cmd_tx, cmd_rx) = mpsc::channel(8);
    let (ev_tx, mut ev_rx) = mpsc::channel(64);
    let config = PingConfig {
        history_limit: 2,
        ..PingConfig::default()
    };
    PingService::new(config, chain, ev_tx).spawn(cmd_rx);

    cmd_tx
        .send(PingCommand::Ping(PingRequest {
            count: Some(3),
            ..ping_request("10.0.0.1")
        }))
        .await
        .unwrap();
    next(&mut ev_rx).await;

    cmd_tx.send(PingCommand::GetHistory).await.unwrap();
    let EventPayload::HistoryData(history) = next(&mut ev_rx).await.payload else {
        panic!("expected history data");
    };
    assert_eq!(history["10.0.0.1"].len(), 2);

    cmd_tx.send(PingCommand::ClearHistory).await.unwrap();
    cmd_tx.send(PingCommand::GetHistory).await.unwrap();
    let EventPayload::HistoryData(history) = next(&mut ev_rx).await.payload else {
        panic!("expected history data");
    };
    assert!(history.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_invalid_ping_target_is_error_event() {
    let (chain, calls) = scripted(&[], Duration::ZERO);
    let (cmd_tx, cmd_rx) = mpsc::channel(8);
    let (ev_tx, mut ev_rx) = mpsc::channel(64);
    PingService::new(PingConfig::default(), chain, ev_tx).spawn(cmd_rx);

    cmd_tx
        .send(PingCommand::Ping(ping_request("1700000000000")))
        .await
        .unwrap();
    let event = next(&mut ev_rx).await;
    assert_eq!(event.channel(), Channel::Errors);
    let EventPayload::Error { message } = event.payload else {
        panic!("expected an error");
    };
    assert!(message.contains("Invalid IP address or hostname format"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}
