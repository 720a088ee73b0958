//! Where verdicts go once classified

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::models::{IntrusionFlag, LogIntrusionResponse, TransactionReceipt};
use crate::services::{WriteError, WriteService};

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Write(#[from] WriteError),

    #[error("gateway unreachable: {0}")]
    Unreachable(String),

    #[error("gateway answered {status}: {message}")]
    Gateway { status: u16, message: String },

    #[error("unexpected gateway response: {0}")]
    Parse(String),
}

#[async_trait]
pub trait EventSubmitter: Send + Sync {
    async fn submit(&self, device: &str, flag: IntrusionFlag) -> Result<TransactionReceipt, SubmitError>;
}

/// In-process submission, used when the gateway runs the loop itself.
#[async_trait]
impl EventSubmitter for WriteService {
    async fn submit(&self, device: &str, flag: IntrusionFlag) -> Result<TransactionReceipt, SubmitError> {
        Ok(WriteService::submit(self, device, i64::from(flag.as_u8())).await?)
    }
}

#[derive(Debug, Deserialize)]
struct GatewayError {
    error: String,
}

/// Submits through the gateway's `POST /log_intrusion`.
pub struct HttpSubmitter {
    endpoint: String,
    http_client: reqwest::Client,
}

impl HttpSubmitter {
    pub fn new(gateway_url: &str, timeout: Duration) -> Result<Self, SubmitError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SubmitError::Unreachable(e.to_string()))?;

        Ok(Self {
            endpoint: format!("{}/log_intrusion", gateway_url.trim_end_matches('/')),
            http_client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl EventSubmitter for HttpSubmitter {
    async fn submit(&self, device: &str, flag: IntrusionFlag) -> Result<TransactionReceipt, SubmitError> {
        let response = self.http_client
            .post(&self.endpoint)
            .json(&json!({ "device": device, "intrusion": flag.as_u8() }))
            .send()
            .await
            .map_err(|e| SubmitError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let body: LogIntrusionResponse = response
                .json()
                .await
                .map_err(|e| SubmitError::Parse(e.to_string()))?;

            Ok(TransactionReceipt {
                tx_hash: body.tx_hash,
                block_number: None,
            })
        } else {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GatewayError>(&text)
                .map(|e| e.error)
                .unwrap_or(text);

            Err(SubmitError::Gateway {
                status: status.as_u16(),
                message,
            })
        }
    }
}
