//! qrmint-web - QR code generation service
//!
//! Serves a form that accepts email addresses (typed or uploaded as CSV),
//! renders one styled QR code per address, and offers all codes as a zip.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use qrmint_common::config::{ConfigOverrides, ServiceConfig};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

use qrmint_web::api::buildinfo::BuildInfo;
use qrmint_web::{build_router, AppState};

/// Command-line arguments for qrmint-web
#[derive(Parser, Debug)]
#[command(name = "qrmint-web")]
#[command(about = "Generate QR codes for volunteer email addresses")]
#[command(version)]
struct Args {
    /// TOML config file (default: <config dir>/qrmint/config.toml)
    #[arg(short, long, env = "QRMINT_CONFIG")]
    config: Option<PathBuf>,

    /// Interface to listen on
    #[arg(long, env = "QRMINT_BIND")]
    bind: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Directory for generated PNGs
    #[arg(short, long, env = "QRMINT_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Logo embedded in the centre of each code, if the file exists
    #[arg(long, env = "QRMINT_LOGO")]
    logo: Option<PathBuf>,

    /// Delete stored codes after the zip download (true/false)
    #[arg(long, env = "QRMINT_CLEAR_ON_DOWNLOAD")]
    clear_on_download: Option<bool>,

    /// Log level when RUST_LOG is unset
    #[arg(long, env = "QRMINT_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            bind_address: self.bind.clone(),
            port: self.port,
            output_dir: self.output_dir.clone(),
            logo_path: self.logo.clone(),
            clear_on_download: self.clear_on_download,
            log_level: self.log_level.clone(),
        }
    }
}

/// Filter for the service crates at `level`
fn level_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!(
        "qrmint_web={level},qrmint_common={level},tower_http={level}"
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Installed before the config file is read. RUST_LOG wins, then the
    // CLI/env level, then the file's level.
    let env_filter = EnvFilter::try_from_default_env().ok();
    let rust_log_set = env_filter.is_some();
    let initial_level = args.log_level.clone().unwrap_or_else(|| "info".to_string());
    let (filter, filter_handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|| level_filter(&initial_level)));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let build = BuildInfo::current();
    info!(
        "Starting qrmint-web v{} [{}] built {} ({})",
        build.version, build.git_hash, build.build_timestamp, build.build_profile
    );

    let config = ServiceConfig::load(args.config.as_deref())
        .context("Failed to load configuration")?
        .with_overrides(args.overrides());

    if !rust_log_set && config.logging.level != initial_level {
        filter_handle
            .reload(level_filter(&config.logging.level))
            .context("Failed to apply configured log level")?;
        info!("Log level: {}", config.logging.level);
    }

    config.validate().context("Invalid configuration")?;
    info!("Output directory: {}", config.output_dir.display());
    info!(
        "Clear on download: {}",
        if config.clear_on_download { "enabled" } else { "disabled" }
    );

    let state = AppState::from_config(&config).context("Failed to initialize artifact store")?;
    if state.generator.has_logo() {
        info!("Logo: {}", config.logo_path.display());
    }

    let app = build_router(state);

    let addr = config.listen_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("qrmint-web listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
