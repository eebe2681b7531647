//! DIPFlow API - D Improvement Proposal Registry
//!
//! Parses DIP markdown documents, validates their metadata table, and tracks
//! each proposal through the review lifecycle:
//! - Draft
//! - Community Review rounds
//! - Final Review
//! - Accepted / Rejected / Withdrawn (or Postponed along the way)

mod config;
mod dip;
mod error;
mod models;
mod routes;
mod state;

use crate::config::Settings;
use crate::dip::DipLoader;
use crate::routes::create_router;
use crate::state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for structured logging
    init_tracing();

    info!("Starting DIPFlow - DIP Registry...");

    // Load configuration
    let settings = Settings::load()?;
    info!("Configuration loaded successfully");

    let state = Arc::new(AppState::new(settings.registry.strict));

    // Seed the registry from disk; an absent directory just means an empty registry
    let loader = DipLoader::new(settings.registry.strict);
    match loader.load_dir(&state.registry, &settings.registry.dips_dir).await {
        Ok(report) => {
            for warning in &report.warnings {
                warn!(
                    "DIP{} ({}) has {} violation(s)",
                    warning.id,
                    warning.path.display(),
                    warning.violations.len()
                );
            }
        }
        Err(e) => warn!(
            "Could not load DIPs from {}: {}",
            settings.registry.dips_dir.display(),
            e
        ),
    }

    // Build the router
    let app = create_router(state, &settings);

    // Create socket address
    let addr = SocketAddr::from((settings.server.host, settings.server.port));

    info!("Server listening on http://{}", addr);
    info!("API Endpoints:");
    info!("   GET  /health                     - Health check");
    info!("   GET  /api/dips                   - List DIPs (?status=&author=)");
    info!("   POST /api/dips                   - Register a DIP (raw markdown body)");
    info!("   POST /api/dips/validate          - Validate without registering");
    info!("   GET  /api/dips/{{id}}              - Get a DIP");
    info!("   POST /api/dips/{{id}}/transitions  - Move a DIP through review");
    info!("   GET  /api/dips/{{id}}/history      - Transition history");
    info!("   GET  /api/stats                  - Counts by status");

    // Create TCP listener and serve
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing with structured logging.
///
/// `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,dipflow_api=debug,tower_http=debug"));

    let json = std::env::var("LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(fmt::layer().json().with_target(true).with_current_span(true))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .compact(),
            )
            .init();
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("Received terminate signal, initiating graceful shutdown...");
        },
    }
}
