//! Intrusion log handlers

use axum::{extract::State, Json};

use crate::{AppResult, AppState};
use crate::extract::{ValidatedJson, ValidatedQuery};
use crate::models::{LogEntry, LogIntrusionRequest, LogIntrusionResponse, LogsQuery};

/// List logged events, newest first
pub async fn get_logs(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<LogsQuery>,
) -> AppResult<Json<Vec<LogEntry>>> {
    let events = state.query.collect_events(query.limit).await?;
    Ok(Json(events.into_iter().map(LogEntry::from).collect()))
}

/// Append one verdict and wait until it is final
pub async fn log_intrusion(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LogIntrusionRequest>,
) -> AppResult<Json<LogIntrusionResponse>> {
    let receipt = state.write.submit(&req.device, req.intrusion).await?;

    Ok(Json(LogIntrusionResponse {
        message: "Intrusion logged successfully!".to_string(),
        tx_hash: receipt.tx_hash,
    }))
}
