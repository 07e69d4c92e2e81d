//! HTTP surface of the relay.
//!
//! - `PUT /` accepts an upload: identifying headers plus the concatenated files
//! - `POST /webhook` accepts signed CI notifications; a completed check suite
//!   drains its batch and publishes it in the background

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::routing::{post, put};
use axum::Router;
use log::{info, warn};

use crate::ci::gate::SerializedLogSource;
use crate::ci::github::GitHubClient;
use crate::ci::{CiProvider, JobLogSource};
use crate::config::RelayConfig;
use crate::constants::MAX_WEBHOOK_BODY_BYTES;
use crate::pipeline::{
    ManifestResolver, PublisherRegistry, ReportAggregator, SuiteAggregator, SuiteProcessor, UploadGate,
};

/// HTTP error type
pub mod error;

/// Upload endpoint
pub mod upload;

/// Notification endpoint
pub mod webhook;

/// Shared state of every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub ci: Arc<dyn CiProvider>,
    pub gate: Arc<UploadGate>,
    pub aggregator: Arc<SuiteAggregator>,
    pub processor: Arc<SuiteProcessor>,
}

impl AppState {
    pub fn new(
        config: Arc<RelayConfig>,
        ci: Arc<dyn CiProvider>,
        aggregator: Arc<SuiteAggregator>,
        processor: Arc<SuiteProcessor>,
    ) -> Self {
        Self {
            gate: Arc::new(UploadGate::from_config(&config)),
            config,
            ci,
            aggregator,
            processor,
        }
    }

    /// Wire the GitHub client and the configured storages.
    pub fn from_config(config: RelayConfig) -> Result<Self> {
        let github = GitHubClient::new(&config.github_api_url, config.github_auth_token.clone())?;
        if config.github_auth_token.is_none() {
            warn!("No github_auth_token configured, GitHub API calls are unauthenticated");
        }

        let logs: Arc<dyn JobLogSource> = if config.serialize_log_retrieval {
            Arc::new(SerializedLogSource::new(github.clone()))
        } else {
            Arc::new(github.clone())
        };

        let resolver = ManifestResolver::new(&config.manifest_pattern)?;
        info!("Build manifests are located with pattern {}", resolver.pattern());

        let github = Arc::new(github);
        let processor = SuiteProcessor::new(
            github.clone(),
            logs,
            resolver,
            Arc::new(PublisherRegistry::from_config(&config)?),
            ReportAggregator::new(github.clone()),
            config.log_timeout(),
        );

        Ok(Self::new(
            Arc::new(config),
            github,
            Arc::new(SuiteAggregator::new()),
            Arc::new(processor),
        ))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", put(upload::handle_upload))
        .route("/webhook", post(webhook::handle_webhook))
        .layer(DefaultBodyLimit::max(MAX_WEBHOOK_BODY_BYTES))
        .with_state(state)
}

/// Serve until Ctrl-C.
pub async fn serve(state: AppState, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Relay listening on {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested, finishing in-flight requests");
}
