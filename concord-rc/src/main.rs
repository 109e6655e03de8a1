//! concord-rc - Claim reconciliation CLI and HTTP service
//!
//! `concord-rc analyze request.json` runs one reconciliation and prints the
//! result document. `concord-rc serve` exposes the same engine over HTTP.

use std::fs::OpenOptions;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use concord_common::config::{resolve_config, ConfigOverrides, LoggingConfig, TomlConfig};
use concord_rc::api::analyze::AnalysisWithViews;
use concord_rc::reconcile::views::build_views;
use concord_rc::reconcile::{AnalysisRequest, ReconcileConfig, Reconciler};
use concord_rc::{build_router, AppState};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for concord-rc
#[derive(Parser, Debug)]
#[command(name = "concord-rc")]
#[command(about = "Cross-check README, API spec, and test claims about an HTTP API")]
#[command(version)]
struct Args {
    /// Config file (default: <config_dir>/concord/concord.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level or filter directive (e.g. debug, concord_rc=trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconcile the claims in a request file and print the result document
    Analyze {
        /// JSON analysis request
        input: PathBuf,

        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Include endpoint, coverage, and recommendation views
        #[arg(long)]
        views: bool,
    },

    /// Run the HTTP API
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let overrides = ConfigOverrides {
        config_path: args.config.clone(),
        port: match &args.command {
            Command::Serve { port } => *port,
            Command::Analyze { .. } => None,
        },
        log_level: args.log_level.clone(),
    };
    let config = resolve_config(&overrides).context("Failed to resolve configuration")?;

    init_tracing(&config.logging)?;

    // Build identification first, before any work
    info!(
        "Starting concord-rc v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match args.command {
        Command::Analyze {
            input,
            output,
            views,
        } => analyze(&config, input, output, views),
        Command::Serve { .. } => serve(config).await,
    }
}

/// Stderr logging, or a log file when one is configured
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&logging.level)
        .with_context(|| format!("Invalid log level '{}'", logging.level))?;

    let file_layer = match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };
    let stderr_layer = file_layer
        .is_none()
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to initialize tracing")?;

    Ok(())
}

fn analyze(
    config: &TomlConfig,
    input: PathBuf,
    output: Option<PathBuf>,
    with_views: bool,
) -> Result<()> {
    let content = std::fs::read_to_string(&input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let request = AnalysisRequest::from_json(&content)
        .with_context(|| format!("Invalid analysis request in {}", input.display()))?;

    let reconciler = Reconciler::new(ReconcileConfig::with_policy(config.policy));
    let result = reconciler
        .analyze(request)
        .context("Analysis run failed")?;

    let rendered = if with_views {
        let views = build_views(&result);
        serde_json::to_string_pretty(&AnalysisWithViews { result, views })?
    } else {
        serde_json::to_string_pretty(&result)?
    };

    match output {
        Some(path) => {
            std::fs::write(&path, rendered + "\n")
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Result written to {}", path.display());
        }
        None => println!("{}", rendered),
    }

    Ok(())
}

async fn serve(config: TomlConfig) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid listen address {}:{}",
                config.server.host, config.server.port
            )
        })?;

    let app = build_router(AppState::new(config));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
