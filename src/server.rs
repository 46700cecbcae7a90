//! HTTP server bootstrap.
//!
//! This module wires together:
//! - configuration
//! - the shared chain-query cache and confirmation policy
//! - the anchoring coordinator (when a wallet key is configured)
//! - the panel registry and audit log
//! - the Axum router

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::anchor::{AnchorConfig, AnchoringCoordinator};
use crate::audit::AuditLogService;
use crate::chain::{ChainQueryCache, ChainQueryConfig, ConfirmationPolicy, ConfirmationTracker, HttpChainSource};
use crate::classify::PanelRegistry;
use crate::domain::{CapsuleBuilder, CredentialVerifier, StubVerifier};
use crate::telemetry::{init_tracing, TelemetryConfig};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server listen address.
    pub listen_addr: SocketAddr,
    /// Base URL of the chain-data REST API.
    pub chain_api_url: String,
    /// Project name stamped into capsule metadata.
    pub project: String,
    /// Path to a JSON file of classification panels.
    pub panels_path: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let listen_addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .expect("Invalid listen address");

        let chain_api_url = std::env::var("CHAIN_API_URL")
            .unwrap_or_else(|_| "https://api.whatsonchain.com/v1/bsv/main".to_string());

        Self {
            listen_addr,
            chain_api_url,
            project: std::env::var("PROJECT_NAME").unwrap_or_else(|_| "leicca".to_string()),
            panels_path: std::env::var("PANELS_PATH").ok(),
        }
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub chain: Arc<ChainQueryCache>,
    pub tracker: Arc<ConfirmationTracker>,
    pub coordinator: Option<Arc<AnchoringCoordinator>>,
    pub audit: Arc<AuditLogService>,
    pub panels: Arc<PanelRegistry>,
    pub builder: Arc<CapsuleBuilder>,
    pub verifier: Arc<dyn CredentialVerifier>,
}

/// Start the HTTP server.
pub async fn run() -> anyhow::Result<()> {
    init_tracing(&TelemetryConfig::from_env());

    info!("Starting capsa-anchor v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env();

    // A malformed wallet key fails here, at startup of the anchoring path,
    // not at the first anchoring attempt. An absent key only disables the
    // anchoring routes.
    let anchor_config = AnchorConfig::from_env()
        .map_err(|e| anyhow::anyhow!("invalid ANCHOR_WALLET_KEY: {e}"))?;
    let basket = anchor_config
        .as_ref()
        .map(|c| c.basket.clone())
        .unwrap_or_else(|| "leicca-audit".to_string());
    let coordinator = match anchor_config {
        Some(ref config) => {
            info!(basket = %config.basket, "anchoring wallet configured");
            Some(Arc::new(AnchoringCoordinator::from_config(config)))
        }
        None => {
            warn!("ANCHOR_WALLET_KEY not set; anchoring routes disabled");
            None
        }
    };

    let chain_api_url = config.chain_api_url.clone();
    let chain = ChainQueryCache::shared_with(move || {
        ChainQueryCache::new(
            Arc::new(HttpChainSource::new(chain_api_url)),
            ChainQueryConfig::from_env(),
        )
    });

    let mut panels = PanelRegistry::new();
    if let Some(ref path) = config.panels_path {
        let json = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read panels file {path}: {e}"))?;
        let count = panels
            .load_json(&json)
            .map_err(|e| anyhow::anyhow!("panels file {path} rejected: {e}"))?;
        info!(count, path = %path, "classification panels loaded");
    } else {
        warn!("PANELS_PATH not set; no classification panels loaded");
    }

    let state = AppState {
        chain,
        tracker: Arc::new(ConfirmationTracker::new(ConfirmationPolicy::from_env())),
        audit: Arc::new(AuditLogService::new(coordinator.clone())),
        coordinator,
        panels: Arc::new(panels),
        builder: Arc::new(CapsuleBuilder::new(config.project.clone(), basket)),
        verifier: Arc::new(StubVerifier),
    };

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
        .allow_origin(Any);

    let app = crate::api::router()
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    info!("Listening on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining requests");
}
