//! hemis-stats - student contingent reporting service
//!
//! Serves the faculty × education-form table, the dashboard summary derived from it,
//! and attendance reports, all sourced from the HEMIS REST API.

use anyhow::{Context, Result};
use clap::Parser;
use hemis_common::config::{ConfigSource, LoggingConfig, TomlConfig};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_subscriber::EnvFilter;

use hemis_stats::attendance::AttendanceService;
use hemis_stats::cache::InMemoryCache;
use hemis_stats::report::ReportService;
use hemis_stats::upstream::{HemisApi, HemisClient};
use hemis_stats::{build_router, AppState};

#[derive(Debug, Parser)]
#[command(name = "hemis-stats", version, about = "HEMIS student contingent reporting service")]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "HEMIS_STATS_CONFIG")]
    config: Option<PathBuf>,

    /// Bind address (overrides server.host)
    #[arg(long)]
    host: Option<String>,

    /// HTTP port (overrides server.port)
    #[arg(short, long)]
    port: Option<u16>,

    /// HEMIS base URL (overrides upstream.base_url)
    #[arg(long)]
    base_url: Option<String>,
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Cannot open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Configuration decides the real subscriber; warnings raised while loading it go
    // to a stderr-only subscriber scoped to this call
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("warn"))
        .finish();
    let (mut config, source) =
        tracing::subscriber::with_default(bootstrap, || TomlConfig::load(args.config.as_deref()))?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(base_url) = args.base_url {
        config.upstream.base_url = base_url;
    }
    config.validate()?;

    init_tracing(&config.logging)?;

    // Build identification immediately after tracing init
    info!(
        "Starting HEMIS contingent statistics (hemis-stats) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &source {
        ConfigSource::CompiledDefaults => {
            tracing::warn!("No config file found, using compiled defaults")
        }
        _ => info!("Loaded configuration from {}", source),
    }
    info!(
        base_url = %config.upstream.base_url,
        max_workers = config.aggregation.max_workers,
        cache_ttl_secs = config.aggregation.cache_ttl_secs,
        "Configuration loaded"
    );
    if config.upstream.token.is_empty() {
        tracing::warn!("No HEMIS token configured; upstream requests will be unauthenticated");
    }

    let client = HemisClient::new(&config.upstream).context("Failed to build HEMIS client")?;
    let api: Arc<dyn HemisApi> = Arc::new(client);
    let cache = Arc::new(InMemoryCache::new());

    let state = AppState::new(
        ReportService::new(api.clone(), cache, &config.aggregation),
        AttendanceService::new(api),
    );
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("hemis-stats listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
