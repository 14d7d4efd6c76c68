//! vigild — the Vigil daemon.
//!
//! Loads the monitor configuration, starts one probe loop per service and
//! serves the status endpoint.
//!
//! # Usage
//!
//! ```text
//! vigild run --config monitor_config.json --listen 0.0.0.0:8080
//! vigild check --config monitor_config.json
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use vigil_core::MonitorConfig;
use vigil_health::{Monitor, StatusTracker};
use vigil_notify::AlertDispatcher;

#[derive(Parser)]
#[command(name = "vigild", about = "Service health monitor")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Monitor every configured service and serve the status endpoint.
    Run {
        /// Path to the monitor configuration (JSON, or TOML by extension).
        #[arg(long, default_value = "monitor_config.json")]
        config: PathBuf,

        /// Status endpoint address. Overrides `status.listen`.
        #[arg(long)]
        listen: Option<SocketAddr>,
    },
    /// Validate a configuration file and print a summary.
    Check {
        #[arg(long, default_value = "monitor_config.json")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,vigil=debug"));
    if cli.json_logs {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    match cli.command {
        Command::Run { config, listen } => run(config, listen).await,
        Command::Check { config } => check(config),
    }
}

fn load(path: &Path) -> anyhow::Result<MonitorConfig> {
    MonitorConfig::from_file(path).with_context(|| format!("loading {}", path.display()))
}

fn check(path: PathBuf) -> anyhow::Result<()> {
    let config = load(&path)?;

    println!("{}: {} service(s)", path.display(), config.services.len());
    for spec in &config.services {
        println!(
            "  {:<20} {} {} every {:?} ({} attempt(s){})",
            spec.name,
            spec.method,
            spec.url,
            spec.check_interval,
            spec.retry_attempts,
            if spec.critical { ", critical" } else { "" },
        );
    }
    println!(
        "chat webhook: {}",
        if config.slack().is_some() { "configured" } else { "not configured" }
    );
    println!(
        "pager:        {}",
        if config.pagerduty().is_some() { "configured" } else { "not configured" }
    );
    Ok(())
}

async fn run(path: PathBuf, listen: Option<SocketAddr>) -> anyhow::Result<()> {
    let config = load(&path)?;
    info!(path = %path.display(), services = config.services.len(), "configuration loaded");

    // ── Initialize subsystems ──────────────────────────────────

    let tracker = Arc::new(StatusTracker::from_specs(&config.services));

    let dispatcher = Arc::new(AlertDispatcher::from_config(&config)?);
    info!(
        chat = dispatcher.has_chat(),
        pager = dispatcher.has_pager(),
        "alert dispatcher initialized"
    );

    let monitor = Monitor::new(tracker.clone(), dispatcher);
    let loops = monitor.start(&config.services);

    // ── Start status endpoint ──────────────────────────────────

    let router = vigil_api::build_router(tracker);
    let addr = listen.unwrap_or(config.status.listen);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding status endpoint on {addr}"))?;
    info!(%addr, "status endpoint listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown signal received");
            }
        })
        .await?;

    loops.abort_all();
    info!("vigil daemon stopped");
    Ok(())
}
