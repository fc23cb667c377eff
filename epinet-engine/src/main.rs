//! epinet-engine - hourly epinet aggregation service
//!
//! Warms per-tenant hourly funnel bins from each tenant's event store and
//! serves funnel graphs and aggregate counts from the warmed cache.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use epinet_common::config::{load_config, resolve_config_path, TomlConfig, CONFIG_ENV_VAR};
use tokio::signal;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use epinet_engine::services::EpinetCache;
use epinet_engine::tenant::TenantRegistry;
use epinet_engine::AppState;

/// Command-line arguments for epinet-engine
#[derive(Parser, Debug)]
#[command(name = "epinet-engine")]
#[command(about = "Hourly epinet aggregation and funnel graph service")]
#[command(version)]
struct Cli {
    /// Config file (falls back to EPINET_CONFIG, then ~/.config/epinet/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service with background warming (default)
    Serve,
    /// Warm once and exit
    Warm {
        /// Only this tenant; all active tenants when omitted
        #[arg(long)]
        tenant: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path: Option<PathBuf> = resolve_config_path(cli.config.as_deref(), CONFIG_ENV_VAR);
    let config = load_config(config_path.as_deref()).context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},tower_http=info", config.logging.level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting epinet-engine v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &config_path {
        Some(path) => info!("Config: {}", path.display()),
        None => info!("Config: compiled defaults"),
    }

    let cache = Arc::new(EpinetCache::new());
    let registry = TenantRegistry::open(&config.tenants, cache.clone()).await;
    info!(
        active = registry.active().len(),
        unavailable = registry.unavailable().len(),
        "Tenant registry opened"
    );

    let state = AppState::new(cache, registry, config.warming.clone(), &config.graph);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(state, &config).await,
        Command::Warm { tenant } => warm_once(state, tenant).await,
    }
}

async fn serve(state: AppState, config: &TomlConfig) -> Result<()> {
    if config.warming.warm_on_startup {
        let warm_state = state.clone();
        tokio::spawn(async move {
            let report = warm_state
                .orchestrator
                .warm_all_tenants(&warm_state.registry)
                .await;
            if let Err(e) = report.into_result() {
                error!("Startup warming incomplete: {}", e);
                warm_state.record_error(e.to_string()).await;
            }
        });
    }

    tokio::spawn(maintenance_loop(
        state.clone(),
        Duration::from_secs(config.warming.refresh_interval_secs.max(1)),
    ));

    let app = epinet_engine::build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn warm_once(state: AppState, tenant: Option<String>) -> Result<()> {
    match tenant {
        Some(tenant_id) => {
            let ctx = state.registry.get(&tenant_id)?;
            let stats = state.orchestrator.warm_tenant(ctx).await?;
            info!(
                tenant_id = %tenant_id,
                batches = stats.batches,
                bins = stats.bins_written,
                "Warm complete"
            );
        }
        None => {
            let succeeded = state
                .orchestrator
                .warm_all_tenants(&state.registry)
                .await
                .into_result()?;
            info!(succeeded, "Warm complete");
        }
    }
    Ok(())
}

/// Periodically rebuild missing, expired and current hours; purge expired bins
async fn maintenance_loop(state: AppState, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // First tick completes immediately; startup warming covers it
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let now = Utc::now();

        let report = state.orchestrator.refresh_all_tenants(&state.registry, now).await;
        if !report.is_success() {
            let names: Vec<&str> = report.failures.iter().map(|f| f.tenant_id.as_str()).collect();
            warn!(failed = names.len(), "Refresh failed for: {}", names.join(", "));
            state
                .record_error(format!("refresh failed for: {}", names.join(", ")))
                .await;
        }

        let purged = state.cache.purge_expired(now).await;
        debug!(refreshed = report.succeeded, purged, "Maintenance tick");
    }
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
            Ok(mut sig) => {
                sig.recv().await;
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
