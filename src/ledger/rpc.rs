//! JSON-RPC 2.0 transport to the ledger node

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("node answered HTTP {0}")]
    Http(u16),
    #[error("node error {code}: {message}")]
    Node { code: i64, message: String },
    #[error("unexpected response: {0}")]
    Decode(String),
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// One HTTP endpoint, one connection pool.
pub struct RpcTransport {
    url: String,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl RpcTransport {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        Ok(Self {
            url: url.to_string(),
            http,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Call `method` and decode its `result`.
    ///
    /// A `null` result decodes into `Option::None` when `T` is an option.
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let response = self.http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RpcError::Http(response.status().as_u16()));
        }

        let body: RpcResponse = response.json().await
            .map_err(|e| RpcError::Decode(e.to_string()))?;

        if let Some(error) = body.error {
            tracing::debug!(method, code = error.code, "RPC error: {}", error.message);
            return Err(RpcError::Node {
                code: error.code,
                message: error.message,
            });
        }

        serde_json::from_value(body.result.unwrap_or(Value::Null))
            .map_err(|e| RpcError::Decode(format!("{}: {}", method, e)))
    }
}

/// Parse a hex quantity such as `0x539`
pub fn parse_quantity(raw: &str) -> Result<u64, RpcError> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    if digits.is_empty() {
        return Err(RpcError::Decode(format!("empty quantity '{}'", raw)));
    }
    u64::from_str_radix(digits, 16).map_err(|_| RpcError::Decode(format!("bad quantity '{}'", raw)))
}
