//! CLI entry point for the netpulse-discover host scanner.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use netpulse_core::config::load_section;
use netpulse_core::{Event, EventPayload, EventSource};
use netpulse_probe::{ProbeChain, SystemResolver};

use netpulse_discover::config::DiscoverConfig;
use netpulse_discover::coordinator::{DiscoveryCoordinator, ScanOutcome, ScanRequest};

#[derive(Parser)]
#[command(name = "netpulse-discover")]
#[command(about = "Find reachable hosts in an address range")]
struct Cli {
    /// Subnet to scan: CIDR (10.0.1.0/24), range (10.0.1.1-50), or a single host.
    #[arg(short, long)]
    subnet: Option<String>,

    /// Ports to check on alive hosts, e.g. 22,80-82,443.
    #[arg(short, long)]
    ports: Option<String>,

    /// Per-probe timeout in milliseconds.
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Probes allowed in flight at once.
    #[arg(short = 'n', long)]
    concurrent: Option<usize>,

    /// Reverse-resolve hostnames of alive hosts.
    #[arg(long)]
    hostnames: bool,

    /// Scan the configured ports on alive hosts.
    #[arg(long)]
    port_scan: bool,

    /// Config file prefix (default: netpulse).
    #[arg(short, long, default_value = "netpulse")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .json()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config: DiscoverConfig = load_section(&cli.config, "discover")?;

    let prober = ProbeChain::from_config(&config.probe);
    tracing::info!(strategies = ?prober.strategy_names(), "Probe chain ready");

    let coordinator = DiscoveryCoordinator::new(config, prober, Arc::new(SystemResolver));
    let request = ScanRequest {
        subnet: cli.subnet,
        port_range: cli.ports,
        timeout_ms: cli.timeout,
        concurrent: cli.concurrent,
        include_hostnames: cli.hostnames.then_some(true),
        include_ports: cli.port_scan.then_some(true),
    };

    let (event, code) = match coordinator.scan(request).await {
        Ok(ScanOutcome::Completed(report)) => (
            Event::new(
                EventSource::Discover,
                EventPayload::NetworkDiscovery(report),
            ),
            ExitCode::SUCCESS,
        ),
        Ok(ScanOutcome::AlreadyRunning) => return Ok(ExitCode::FAILURE),
        Err(e) => {
            tracing::error!(error = %e, "Network discovery failed");
            (
                Event::error(
                    EventSource::Discover,
                    format!("Network discovery failed: {e}"),
                ),
                ExitCode::FAILURE,
            )
        }
    };

    println!("{}", event.to_json_line()?);
    Ok(code)
}
