mod api;
mod auth;
mod cancel;
mod metrics;
mod orchestrator;
mod security;
mod state;
mod ws;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, Method};
use clap::Parser;
use ib_cache::CommandCache;
use ib_domain::config::{Config, ConfigSeverity, CorsConfig};
use ib_model::{AnthropicToolUseClient, ModelClient};
use ib_rooms::{InMemorySnapshotStore, RoomManager, SnapshotStore, SqliteSnapshotStore};
use tower::limit::ConcurrencyLimitLayer;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::GovernorLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::metrics::Metrics;
use crate::state::AppState;

const MAX_CONCURRENT_REQUESTS: usize = 1024;

#[derive(Parser, Debug)]
#[command(name = "ib-gateway", about = "Whiteboard collaboration gateway")]
struct Cli {
    /// Path to a TOML config file. Missing file ⇒ built-in defaults.
    #[arg(long, default_value = "ib-gateway.toml")]
    config: PathBuf,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();
}

fn load_config(path: &PathBuf) -> Result<Config> {
    match std::fs::read_to_string(path) {
        Ok(raw) => toml::from_str(&raw).with_context(|| format!("parsing config file {}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "no config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => Err(e).with_context(|| format!("reading config file {}", path.display())),
    }
}

async fn build_snapshot_store(config: &Config) -> Result<Arc<dyn SnapshotStore>> {
    match &config.rooms.sqlite_path {
        Some(path) => {
            let store = SqliteSnapshotStore::open(std::path::Path::new(path))
                .with_context(|| format!("opening sqlite snapshot store at {path}"))?;
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(InMemorySnapshotStore::new())),
    }
}

fn build_model_client(config: &Config) -> Option<Arc<dyn ModelClient>> {
    let api_key = std::env::var(&config.model.api_key_env).ok().filter(|k| !k.is_empty())?;
    match AnthropicToolUseClient::new(api_key, config.model.model.clone()) {
        Ok(client) => Some(Arc::new(client) as Arc<dyn ModelClient>),
        Err(e) => {
            tracing::warn!(error = %e, "failed to build model client, running without a provider");
            None
        }
    }
}

/// Mirrors the teacher gateway's CORS layer: a literal `"*"` is permissive
/// CORS; an `origin:*` suffix allows any port on that host without opening
/// the door to an unrelated origin sharing the same prefix.
fn build_cors_layer(cors: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if cors.allowed_origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS allow-list contains \"*\" — permitting any origin");
        return layer.allow_origin(tower_http::cors::Any);
    }

    let port_wildcards: Vec<String> = cors
        .allowed_origins
        .iter()
        .filter_map(|o| o.strip_suffix(":*").map(str::to_string))
        .collect();
    let exact: Vec<HeaderValue> = cors
        .allowed_origins
        .iter()
        .filter(|o| !o.ends_with(":*"))
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    if port_wildcards.is_empty() {
        return layer.allow_origin(AllowOrigin::list(exact)).allow_credentials(true);
    }

    layer
        .allow_origin(AllowOrigin::predicate(move |origin, _| {
            let Ok(origin) = origin.to_str() else { return false };
            if exact.iter().any(|e| e == origin) {
                return true;
            }
            port_wildcards.iter().any(|prefix| {
                origin
                    .strip_prefix(prefix.as_str())
                    .and_then(|rest| rest.strip_prefix(':'))
                    .is_some_and(|port| !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()))
            })
        }))
        .allow_credentials(true)
}

async fn run_server(config: Arc<Config>) -> Result<()> {
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Error => tracing::error!("{issue}"),
            ConfigSeverity::Warning => tracing::warn!("{issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!("refusing to start with invalid configuration");
    }

    let store = build_snapshot_store(&config).await?;
    let rooms = Arc::new(RoomManager::new(store, Duration::from_millis(config.rooms.idle_timeout_ms)));
    tracing::info!("room manager ready");

    let cache = Arc::new(CommandCache::new(config.cache.capacity, config.cache.max_actions_per_recipe));
    tracing::info!("command cache ready");

    let model = build_model_client(&config);
    tracing::info!(configured = model.is_some(), "model client ready");

    let api_token = std::env::var(&config.server.api_token_env).ok().filter(|t| !t.is_empty());

    let state = AppState {
        config: config.clone(),
        rooms: rooms.clone(),
        cache,
        model,
        api_token: Arc::new(api_token),
        metrics: Arc::new(Metrics::new()),
    };

    {
        let rooms = rooms.clone();
        let interval = Duration::from_millis(config.rooms.snapshot_interval_ms.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                rooms.snapshot_tick().await;
            }
        });
    }
    {
        let rooms = rooms.clone();
        let interval = Duration::from_millis(config.rooms.eviction_check_interval_ms.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                rooms.evict_idle().await;
            }
        });
    }

    let cors = build_cors_layer(&config.server.cors);
    let concurrency = ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS);

    let mut app = api::router(state.clone()).with_state(state).layer(cors).layer(concurrency);

    if let Some(rate_limit) = &config.server.rate_limit {
        let governor_conf = Arc::new(
            GovernorConfigBuilder::default()
                .per_second(rate_limit.requests_per_second)
                .burst_size(rate_limit.burst_size)
                .finish()
                .context("building rate-limit config")?,
        );
        app = app.layer(GovernorLayer { config: governor_conf });
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.server.host, config.server.port))?;

    let listener = tokio::net::TcpListener::bind(addr).await.with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "ib-gateway listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server loop exited with an error")?;

    tracing::info!("final snapshot flush");
    rooms.snapshot_tick().await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("installing SIGTERM handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = Arc::new(load_config(&cli.config)?);
    run_server(config).await
}
