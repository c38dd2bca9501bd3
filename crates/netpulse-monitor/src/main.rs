//! CLI entry point for netpulse-monitor.

use std::io::BufRead;

use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tracing_subscriber::{fmt, EnvFilter};

use netpulse_core::config::load_section;
use netpulse_core::Event;
use netpulse_probe::ProbeChain;

use netpulse_monitor::config::{MonitorConfig, PingConfig};
use netpulse_monitor::ping::{PingCommand, PingRequest, PingService};
use netpulse_monitor::service::{MonitorCommand, MonitorService};

#[derive(Parser)]
#[command(name = "netpulse-monitor")]
#[command(about = "Latency and availability monitoring")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file prefix (default: netpulse).
    #[arg(short, long, default_value = "netpulse", global = true)]
    config: String,
}

#[derive(Subcommand)]
enum Command {
    /// Measure targets on an interval. Further JSON commands are read from
    /// stdin, one per line; runs until stdin closes or Ctrl-C.
    Watch {
        /// Target to monitor (repeatable). Defaults to the configured targets.
        #[arg(short, long)]
        target: Vec<String>,

        /// Measurement interval in milliseconds.
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Ping one host, either as a sequence or continuously with --interval.
    Ping {
        target: String,

        /// Pings in the sequence.
        #[arg(short = 'n', long)]
        count: Option<u32>,

        /// Continuous mode period in milliseconds; runs until Ctrl-C.
        #[arg(short, long)]
        interval: Option<u64>,

        /// Extra attempts per ping while the host is down.
        #[arg(short, long)]
        retries: Option<u32>,

        /// Per-ping timeout in milliseconds.
        #[arg(short, long)]
        timeout: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .json()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let (ev_tx, ev_rx) = mpsc::channel(256);
    let printer = tokio::spawn(print_events(ev_rx));

    match cli.command {
        Command::Watch { target, interval } => {
            let config: MonitorConfig = load_section(&cli.config, "monitor")?;
            let chain = ProbeChain::from_config(&config.probe);
            tracing::info!(strategies = ?chain.strategy_names(), "Probe chain ready");

            let (cmd_tx, cmd_rx) = mpsc::channel(32);
            let mut service = MonitorService::new(&config, chain, ev_tx).spawn(cmd_rx);

            cmd_tx
                .send(MonitorCommand::Start {
                    targets: (!target.is_empty()).then_some(target),
                    interval_ms: interval,
                })
                .await?;

            spawn_stdin_reader(cmd_tx);
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Interrupted");
                    service.abort();
                }
                joined = &mut service => joined?,
            }
        }
        Command::Ping {
            target,
            count,
            interval,
            retries,
            timeout,
        } => {
            let config: PingConfig = load_section(&cli.config, "ping")?;
            let chain = ProbeChain::from_config(&config.probe);
            let continuous = interval.unwrap_or(config.interval_ms) > 0;

            let (cmd_tx, cmd_rx) = mpsc::channel(8);
            let service = PingService::new(config, chain, ev_tx).spawn(cmd_rx);

            cmd_tx
                .send(PingCommand::Ping(PingRequest {
                    target: Some(target),
                    count,
                    interval_ms: interval,
                    timeout_ms: timeout,
                    retries,
                }))
                .await?;

            if continuous {
                tokio::signal::ctrl_c().await?;
                cmd_tx.send(PingCommand::Stop).await?;
            }
            drop(cmd_tx);
            service.await?;
        }
    }

    printer.await?;
    Ok(())
}

/// Forward JSON commands from stdin until EOF on a dedicated thread, so a
/// pending read never holds up runtime shutdown. Malformed lines are skipped.
fn spawn_stdin_reader<C>(commands: mpsc::Sender<C>)
where
    C: DeserializeOwned + Send + 'static,
{
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to read stdin");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<C>(&line) {
                Ok(command) => {
                    if commands.blocking_send(command).is_err() {
                        break;
                    }
                }
                Err(e) => tracing::warn!(error = %e, line = %line, "Ignoring malformed command"),
            }
        }
    });
}

async fn print_events(mut events: mpsc::Receiver<Event>) {
    while let Some(event) = events.recv().await {
        match event.to_json_line() {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::error!(error = %e, "Failed to serialize event"),
        }
    }
}
