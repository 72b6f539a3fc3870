use anyhow::Context;
use board_netlist::config::EngineConfig;
use board_netlist::server::{handle_line, ServerState};
use board_netlist::worker::StraightLinePathfinder;
use clap::Parser;
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// How long to wait for input before checking for finished jobs
const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Parser)]
#[command(name = "netlist_server")]
#[command(about = "JSON-RPC netlist authoring server over stdin/stdout", long_about = None)]
#[command(version)]
struct Args {
    /// Engine configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Scan resolution; overrides the config file
    #[arg(long)]
    dpi: Option<f64>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn write_line<T: Serialize>(out: &mut impl Write, message: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string(message).context("Failed to serialize message")?;
    writeln!(out, "{}", json).context("Failed to write to stdout")?;
    out.flush().context("Failed to flush stdout")
}

fn flush_notifications(state: &mut ServerState, out: &mut impl Write) -> anyhow::Result<()> {
    for notification in state.pending_notifications() {
        write_line(out, &notification)?;
    }
    Ok(())
}

fn load_config(args: &Args) -> anyhow::Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    if let Some(dpi) = args.dpi {
        anyhow::ensure!(dpi > 0.0, "--dpi must be positive, got {}", dpi);
        config.dpi = dpi;
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // stdout carries the protocol, so logs go to stderr
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let config = load_config(&args)?;
    tracing::info!("[Server] Starting netlist server (dpi {})", config.dpi);

    let mut state = ServerState::new(config).with_pathfinder(Arc::new(StraightLinePathfinder));
    let mut stdout = io::stdout();

    let (line_tx, line_rx) = mpsc::channel::<String>();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if line_tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!("[Server] Error reading stdin: {}", e);
                    break;
                }
            }
        }
    });

    loop {
        match line_rx.recv_timeout(POLL_INTERVAL) {
            Ok(line) => {
                if let Some(response) = handle_line(&mut state, &line) {
                    write_line(&mut stdout, &response)?;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        flush_notifications(&mut state, &mut stdout)?;
    }

    if state.jobs.pending() > 0 {
        tracing::warn!("[Server] Exiting with {} unfinished jobs", state.jobs.pending());
    }
    tracing::info!("[Server] Shutting down...");
    Ok(())
}
