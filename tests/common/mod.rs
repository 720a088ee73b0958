//! Shared fixtures: an in-process JSON-RPC node hosting the ledger contract

#![allow(dead_code)]

use axum::{extract::State, routing::post, Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use intrusion_ledger::config::GatewayConfig;
use alloy_primitives::U256;
use alloy_sol_types::SolCall;

use intrusion_ledger::ledger::abi::{self, getEventCall, getEventsCountCall, logIntrusionCall};
use intrusion_ledger::ledger::address::to_wire;
use intrusion_ledger::ledger::{Address, LedgerSettings};

pub const CONTRACT: Address = Address::new([0xc0; 20]);
pub const NODE_ACCOUNT: Address = Address::new([0x1a; 20]);
pub const CHAIN_ID: u64 = 1337;

#[derive(Debug, Clone)]
struct StoredEvent {
    device: String,
    timestamp: u64,
    intrusion: u8,
    block: u64,
}

/// Contract state and fault switches of the fake node
#[derive(Default)]
pub struct NodeState {
    events: Mutex<Vec<StoredEvent>>,
    receipts: Mutex<HashMap<String, Value>>,
    tx_counter: Mutex<u64>,
    pub undeployed: AtomicBool,
    pub revert_writes: AtomicBool,
    pub withhold_receipts: AtomicBool,
}

impl NodeState {
    pub fn event_count(&self) -> usize {
        self.events.lock().len()
    }

    /// Seed an event directly into contract storage
    pub fn seed(&self, device: &str, intrusion: u8) {
        let mut events = self.events.lock();
        let block = events.len() as u64 + 1;
        events.push(StoredEvent {
            device: device.to_string(),
            timestamp: 1_700_000_000 + block,
            intrusion,
            block,
        });
    }
}

pub struct FakeNode {
    pub url: String,
    pub state: Arc<NodeState>,
}

impl FakeNode {
    pub async fn start() -> Self {
        let state = Arc::new(NodeState::default());
        let app = Router::new()
            .route("/", post(handle))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}", addr),
            state,
        }
    }

    pub fn settings(&self) -> LedgerSettings {
        LedgerSettings {
            rpc_url: self.url.clone(),
            contract: CONTRACT,
            rpc_timeout: Duration::from_secs(5),
            receipt_timeout: Duration::from_millis(300),
            poll_interval: Duration::from_millis(20),
        }
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            port: 0,
            rpc_url: self.url.clone(),
            contract_address: CONTRACT,
            signer: None,
            rpc_timeout: Duration::from_secs(5),
            receipt_timeout: Duration::from_millis(300),
            receipt_poll_interval: Duration::from_millis(20),
            frontend_dir: None,
            monitor_enabled: false,
        }
    }
}

async fn handle(State(state): State<Arc<NodeState>>, Json(request): Json<Value>) -> Json<Value> {
    let id = request["id"].clone();
    let method = request["method"].as_str().unwrap_or_default();
    let params = &request["params"];

    let outcome = match method {
        "eth_chainId" => Ok(json!(format!("0x{:x}", CHAIN_ID))),
        "eth_accounts" => Ok(json!([to_wire(&NODE_ACCOUNT)])),
        "eth_getCode" => {
            if state.undeployed.load(Ordering::SeqCst) {
                Ok(json!("0x"))
            } else {
                Ok(json!("0x6080604052"))
            }
        }
        "eth_call" => eth_call(&state, params[0]["data"].as_str().unwrap_or_default()),
        "eth_sendTransaction" => send_transaction(&state, &params[0]),
        "eth_getTransactionReceipt" => {
            let hash = params[0].as_str().unwrap_or_default();
            Ok(state.receipts.lock().get(hash).cloned().unwrap_or(Value::Null))
        }
        other => Err((-32601, format!("method {} not supported", other))),
    };

    Json(match outcome {
        Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
        Err((code, message)) => {
            json!({ "jsonrpc": "2.0", "id": id, "error": { "code": code, "message": message } })
        }
    })
}

fn eth_call(state: &NodeState, data: &str) -> Result<Value, (i64, String)> {
    let calldata = abi::from_hex(data).map_err(|e| (-32602, e.to_string()))?;
    let selector = calldata.get(..4).unwrap_or_default();

    if selector == getEventsCountCall::SELECTOR {
        let count = U256::from(state.events.lock().len());
        let output = getEventsCountCall::abi_encode_returns(&(count,));
        return Ok(json!(abi::to_hex(&output)));
    }

    if let Ok(call) = getEventCall::abi_decode(&calldata, true) {
        let index = u64::try_from(call.index).map_or(usize::MAX, |i| i as usize);
        let events = state.events.lock();
        let event = events
            .get(index)
            .ok_or((-32000, "execution reverted: index out of bounds".to_string()))?;
        let output = getEventCall::abi_encode_returns(&(
            event.device.clone(),
            U256::from(event.timestamp),
            event.intrusion,
            U256::from(event.block),
        ));
        return Ok(json!(abi::to_hex(&output)));
    }

    Err((-32000, "execution reverted".to_string()))
}

fn send_transaction(state: &NodeState, tx: &Value) -> Result<Value, (i64, String)> {
    let calldata = abi::from_hex(tx["data"].as_str().unwrap_or_default())
        .map_err(|e| (-32602, e.to_string()))?;
    let call = logIntrusionCall::abi_decode(&calldata, true).map_err(|e| (-32000, e.to_string()))?;
    let (device, intrusion) = (call.device, call.intrusion);

    let tx_hash = {
        let mut counter = state.tx_counter.lock();
        *counter += 1;
        format!("0x{:064x}", *counter)
    };

    let reverted = state.revert_writes.load(Ordering::SeqCst);
    let block = if reverted {
        state.events.lock().len() as u64 + 1
    } else {
        state.seed(&device, intrusion);
        state.events.lock().len() as u64
    };

    if !state.withhold_receipts.load(Ordering::SeqCst) {
        state.receipts.lock().insert(
            tx_hash.clone(),
            json!({
                "transactionHash": tx_hash,
                "blockNumber": format!("0x{:x}", block),
                "status": if reverted { "0x0" } else { "0x1" },
            }),
        );
    }

    Ok(json!(tx_hash))
}
