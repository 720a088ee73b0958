//! Wire types for the front-end API

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::event::IntrusionEvent;

/// One row of `GET /get_logs`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub device: String,
    pub timestamp: u64,
    /// "Yes" or "No"
    pub intrusion: String,
    #[serde(rename = "blockNum")]
    pub block_num: u64,
}

impl From<IntrusionEvent> for LogEntry {
    fn from(event: IntrusionEvent) -> Self {
        Self {
            id: event.index,
            device: event.device,
            timestamp: event.timestamp,
            intrusion: event.intrusion.label().to_string(),
            block_num: event.block_number,
        }
    }
}

#[derive(Debug, Deserialize, Validate, Default)]
pub struct LogsQuery {
    /// Only return the most recent `limit` events
    pub limit: Option<usize>,
}

/// Body of `POST /log_intrusion`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LogIntrusionRequest {
    #[validate(length(min = 1, message = "device must not be empty"))]
    pub device: String,
    #[validate(range(min = 0, max = 1, message = "intrusion must be 0 or 1"))]
    pub intrusion: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogIntrusionResponse {
    pub message: String,
    pub tx_hash: String,
}
