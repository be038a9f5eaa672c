//! Sensor statistics service entry point.

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sensor_stats::api::{create_router, AppState};
use sensor_stats::config::Config;
use sensor_stats::metrics;
use sensor_stats::probe::{HealthProbe, ProbeOutcome};
use sensor_stats::utils::shutdown_signal;

/// Sensor measurement ingestion and statistics service.
#[derive(Parser, Debug)]
#[command(name = "sensor-stats")]
#[command(about = "Ingest sensor measurements and serve aggregate statistics")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Command>,

    /// HTTP server port (overrides PORT).
    #[arg(short, long, global = true)]
    port: Option<u16>,

    /// Downstream liveness URL (overrides PROBE_URL).
    #[arg(long, global = true)]
    probe_url: Option<String>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Run the HTTP server (default).
    Serve,

    /// Check configuration validity.
    CheckConfig,

    /// Run the health probe once and report the outcome.
    Probe,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("sensor_stats=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(args.json_logs.then(|| fmt::layer().json()))
        .with((!args.json_logs).then(fmt::layer))
        .with(filter)
        .init();

    match args.command {
        Some(Command::Serve) | None => cmd_serve(args.port, args.probe_url).await,
        Some(Command::CheckConfig) => cmd_check_config(),
        Some(Command::Probe) => cmd_probe(args.port, args.probe_url).await,
    }
}

/// Load and validate configuration, applying CLI overrides.
fn load_config(port: Option<u16>, probe_url: Option<String>) -> anyhow::Result<Config> {
    let mut config = Config::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    if let Some(port) = port {
        config.port = port;
    }
    if let Some(probe_url) = probe_url {
        config.probe_url = probe_url;
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }

    Ok(config)
}

/// Check configuration validity.
fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("SENSOR STATS - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Listen: {}:{}", config.host, config.port);
    println!("  Probe URL: {}", config.probe_url);
    println!("  Probe Timeout: {}ms", config.probe_timeout_ms);
    println!("  Stats Scope: {}", config.stats_scope);
    println!("  Metrics: {}", if config.metrics_enabled { "Enabled" } else { "Disabled" });
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Probe the downstream once.
async fn cmd_probe(port: Option<u16>, probe_url: Option<String>) -> anyhow::Result<()> {
    let config = load_config(port, probe_url)?;
    let probe = HealthProbe::from_config(&config)?;

    println!("Probing {} (timeout {:?})...", probe.url(), probe.timeout());
    match probe.check().await {
        ProbeOutcome::Ready => {
            println!("READY");
            Ok(())
        }
        ProbeOutcome::Failed(reason) => {
            println!("NOT READY: {}", reason);
            Err(anyhow::anyhow!("Probe failed: {}", reason))
        }
    }
}

/// Run the HTTP server until shutdown.
async fn cmd_serve(port: Option<u16>, probe_url: Option<String>) -> anyhow::Result<()> {
    info!("Loading configuration...");
    let config = load_config(port, probe_url)?;

    info!("Configuration loaded successfully");
    info!("Probe URL: {} (timeout {}ms)", config.probe_url, config.probe_timeout_ms);
    info!("Stats scope: {}", config.stats_scope);

    let probe = HealthProbe::from_config(&config)?;
    let mut app_state = AppState::new(probe, config.stats_scope);

    if config.metrics_enabled {
        app_state = app_state.with_metrics(metrics::install_recorder()?);
        info!("Prometheus metrics enabled at /metrics");
    }

    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, create_router(app_state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped");
    Ok(())
}
