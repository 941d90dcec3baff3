//! Synth Surface - interactive control surface for a remote synth server

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use synth_surface::config::AppConfig;
use synth_surface::remote::SynthClient;
use synth_surface::simulator::{self, SimState, DEFAULT_SIM_PORT};
use synth_surface::surface::Surface;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_CONFIG: &str = "config.yaml";

/// Synth Surface - Knobs for a remote synthesizer, with debounced sync
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Synth server base URL (overrides the config file)
    #[arg(short, long, env = "SYNTH_SURFACE_SERVER")]
    server: Option<String>,

    /// Run against an in-process simulated synth server
    #[arg(long)]
    simulate: bool,

    /// Simulator port (0 picks a free port)
    #[arg(long, default_value_t = DEFAULT_SIM_PORT)]
    sim_port: u16,

    /// Write logs to daily files in this directory instead of the terminal
    #[arg(long)]
    log_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let _log_guard = init_logging(&args.log_level, args.log_dir.as_deref())?;

    info!("Starting Synth Surface v{}...", env!("CARGO_PKG_VERSION"));

    let mut config = load_config(&args.config).await?;
    if let Some(url) = &args.server {
        config.server.url = url.clone();
    }

    if args.simulate {
        let state = Arc::new(SimState::new(config.surface.oscillators));
        let (addr, _server) = simulator::spawn_server(state, args.sim_port).await?;
        config.server.url = format!("http://{}", addr);
    }
    config.validate()?;

    let client = SynthClient::new(&config.server.url, config.server.request_timeout())
        .context("Failed to create HTTP client")?;
    let mut surface = Surface::start(Arc::new(client), &config)?;

    if let Err(e) = surface.release_all_notes().await {
        warn!("Could not release held notes: {}", e);
    }
    if let Err(e) = surface.wait_loaded().await {
        warn!("{}", e);
    }

    tokio::select! {
        result = synth_surface::cli::run_repl(&mut surface) => result?,
        _ = shutdown_signal() => {}
    }

    surface.shutdown().await;
    info!("Synth Surface shutdown complete");
    Ok(())
}

/// Missing default config means defaults; an explicit path must exist
async fn load_config(path: &str) -> Result<AppConfig> {
    if path == DEFAULT_CONFIG && !Path::new(path).exists() {
        info!("No {} found, using defaults", DEFAULT_CONFIG);
        return Ok(AppConfig::default());
    }
    let config = AppConfig::load(path).await?;
    info!("Configuration loaded from {}", path);
    Ok(config)
}

fn init_logging(
    level: &str,
    log_dir: Option<&str>,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "synth-surface.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false),
                )
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(false)
                        .with_thread_ids(false)
                        .with_thread_names(false),
                )
                .init();
            Ok(None)
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for CTRL+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
