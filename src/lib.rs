//! Intrusion Ledger
//!
//! HTTP gateway over an append-only intrusion ledger, plus the ingestion loop
//! that feeds it classifier verdicts.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      INTRUSION LEDGER                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐   ┌─────────────┐   ┌─────────────────────┐  │
//! │  │  Ingestion │──▶│   Write     │   │   Query Service     │  │
//! │  │  Loop      │   │   Service   │   │   (GET /get_logs)   │  │
//! │  └────────────┘   └──────┬──────┘   └──────────┬──────────┘  │
//! │                          └──────────┬──────────┘             │
//! │                                     ▼                        │
//! │                          ┌────────────────────┐              │
//! │                          │   Ledger Client    │              │
//! │                          │   (JSON-RPC)       │              │
//! │                          └─────────┬──────────┘              │
//! └────────────────────────────────────┼─────────────────────────┘
//!                                      ▼
//!                              ledger contract
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod monitor;
pub mod services;
pub mod telemetry;

use axum::{
    Router,
    routing::{get, post},
};
use std::path::Path;
use tokio::{signal, sync::watch};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
    services::ServeDir,
};

pub use context::LedgerContext;
pub use error::{AppError, AppResult};

use services::{QueryService, WriteService};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub query: QueryService,
    pub write: WriteService,
}

impl AppState {
    pub fn new(context: &LedgerContext) -> Self {
        Self {
            query: context.query_service(),
            write: context.write_service(),
        }
    }
}

/// Create the main router.
///
/// When `frontend_dir` is given, unmatched paths are served from it.
pub fn create_router(state: AppState, frontend_dir: Option<&Path>) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health::check))
        .route("/get_logs", get(handlers::logs::get_logs))
        .route("/log_intrusion", post(handlers::logs::log_intrusion));

    if let Some(dir) = frontend_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

/// Watch channel that flips to `true` on Ctrl+C.
///
/// Shared by the HTTP server and the ingestion loop so both stop together.
pub fn shutdown_signal() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install CTRL+C handler: {}", e);
            // Hold the sender so receivers never see a spurious shutdown.
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown requested");
        let _ = tx.send(true);
    });
    rx
}
