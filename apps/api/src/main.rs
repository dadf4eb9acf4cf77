mod config;
mod db;
mod errors;
mod generation;
mod llm_client;
mod models;
mod routes;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::generation::adapt::ResumeAdapter;
use crate::generation::audit::{AuditQueue, PgGenerationLogSink};
use crate::generation::content::LlmContentGenerator;
use crate::generation::generator::IterativeGenerator;
use crate::generation::jd_parser::RequirementsExtractor;
use crate::llm_client::{CompletionProvider, LlmClient, ModelTier};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(config.log_directive())
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Tailor API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize LLM client
    let llm: Arc<dyn CompletionProvider> = Arc::new(
        LlmClient::new(config.llm_api_key.clone(), config.llm_api_url.clone())
            .context("Failed to build LLM client")?,
    );
    info!(
        "LLM client initialized (fast: {}, balanced: {})",
        ModelTier::Fast.model_id(),
        ModelTier::Balanced.model_id()
    );

    // Audit worker runs until the server (and with it every queue handle) is dropped
    let (audit, audit_worker) = AuditQueue::spawn(Arc::new(PgGenerationLogSink::new(db.clone())));

    let generator = IterativeGenerator::new(
        RequirementsExtractor::new(llm.clone()),
        Arc::new(LlmContentGenerator::new(llm.clone())),
        audit,
        config.quality_threshold,
    );
    info!("Quality threshold: {}", config.quality_threshold);

    // Build app state
    let state = AppState {
        db,
        generator: Arc::new(generator),
        adapter: Arc::new(ResumeAdapter::new(llm)),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router owned the last queue handle; wait for queued log entries to land.
    info!("Server stopped, draining generation audit log...");
    if let Err(e) = audit_worker.await {
        error!("Audit worker ended abnormally: {e}");
    }
    info!("Shutdown complete");

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, finishing in-flight requests...");
}
