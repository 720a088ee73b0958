//! Health check handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: i64,
    ledger: LedgerHealth,
}

#[derive(Serialize)]
pub struct LedgerHealth {
    reachable: bool,
    events: Option<u64>,
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    let ledger = match state.query.count().await {
        Ok(events) => LedgerHealth { reachable: true, events: Some(events) },
        Err(e) => {
            tracing::warn!("Health check could not reach ledger: {}", e);
            LedgerHealth { reachable: false, events: None }
        }
    };

    Json(HealthResponse {
        status: if ledger.reachable { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
        ledger,
    })
}
