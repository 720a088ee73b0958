//! Ledger contract client over Ethereum JSON-RPC

use alloy_primitives::U256;
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::time::Instant;

use super::abi::{self, getEventCall, getEventsCountCall, logIntrusionCall};
use super::address::{parse_address, to_wire};
use super::rpc::{parse_quantity, RpcError, RpcTransport};
use super::{Address, Ledger, LedgerError, LedgerResult, Signer};
use crate::models::{IntrusionEvent, IntrusionFlag, TransactionReceipt};

/// Connection parameters for [`EthLedgerClient`]
#[derive(Debug, Clone)]
pub struct LedgerSettings {
    pub rpc_url: String,
    pub contract: Address,
    pub rpc_timeout: Duration,
    pub receipt_timeout: Duration,
    pub poll_interval: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: String,
    #[serde(default)]
    block_number: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

pub struct EthLedgerClient {
    rpc: RpcTransport,
    contract: Address,
    receipt_timeout: Duration,
    poll_interval: Duration,
}

impl EthLedgerClient {
    pub fn new(settings: &LedgerSettings) -> LedgerResult<Self> {
        let rpc = RpcTransport::new(&settings.rpc_url, settings.rpc_timeout)?;

        Ok(Self {
            rpc,
            contract: settings.contract,
            receipt_timeout: settings.receipt_timeout,
            poll_interval: settings.poll_interval,
        })
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    pub fn endpoint(&self) -> &str {
        self.rpc.url()
    }

    /// Chain id of the node; also confirms it answers
    pub async fn chain_id(&self) -> LedgerResult<u64> {
        let raw: String = self.rpc.call("eth_chainId", json!([])).await?;
        Ok(parse_quantity(&raw)?)
    }

    /// Whether any contract code lives at the configured address
    pub async fn is_deployed(&self) -> LedgerResult<bool> {
        let code: String = self.rpc
            .call("eth_getCode", json!([to_wire(&self.contract), "latest"]))
            .await?;
        Ok(!abi::from_hex(&code)?.is_empty())
    }

    /// Accounts the node signs for
    pub async fn accounts(&self) -> LedgerResult<Vec<Address>> {
        let raw: Vec<String> = self.rpc.call("eth_accounts", json!([])).await?;
        raw.iter()
            .map(|a| {
                parse_address(a)
                    .map_err(|e| LedgerError::InvalidResponse(e.to_string()))
            })
            .collect()
    }

    async fn eth_call(&self, data: Vec<u8>) -> Result<Vec<u8>, RpcError> {
        let call = json!({
            "to": to_wire(&self.contract),
            "data": abi::to_hex(&data),
        });
        let raw: String = self.rpc.call("eth_call", json!([call, "latest"])).await?;
        abi::from_hex(&raw).map_err(|e| RpcError::Decode(e.to_string()))
    }

    /// Poll for the receipt until it shows up or the wait bound runs out
    async fn wait_for_receipt(&self, tx_hash: &str) -> LedgerResult<RawReceipt> {
        let started = Instant::now();
        let deadline = started + self.receipt_timeout;

        loop {
            let receipt: Option<RawReceipt> = self.rpc
                .call("eth_getTransactionReceipt", json!([tx_hash]))
                .await?;

            if let Some(receipt) = receipt {
                return Ok(receipt);
            }

            if Instant::now() >= deadline {
                return Err(LedgerError::Timeout {
                    tx_hash: tx_hash.to_string(),
                    waited: started.elapsed(),
                });
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Distinguish an out-of-range read from any other failed call
    async fn classify_read_failure(&self, index: u64, reason: String) -> LedgerError {
        match self.count().await {
            Ok(count) if index >= count => LedgerError::OutOfRange { index, count },
            Ok(_) => LedgerError::Rejected(reason),
            Err(e) => e,
        }
    }
}

fn to_u64(value: U256, field: &str) -> LedgerResult<u64> {
    u64::try_from(value)
        .map_err(|_| LedgerError::InvalidResponse(format!("{} {} does not fit in 64 bits", field, value)))
}

#[async_trait]
impl Ledger for EthLedgerClient {
    async fn count(&self) -> LedgerResult<u64> {
        let output = self.eth_call(getEventsCountCall {}.abi_encode()).await?;
        let decoded = getEventsCountCall::abi_decode_returns(&output, true).map_err(abi::AbiError::from)?;
        to_u64(decoded.count, "event count")
    }

    async fn get(&self, index: u64) -> LedgerResult<IntrusionEvent> {
        let data = getEventCall { index: U256::from(index) }.abi_encode();

        let output = match self.eth_call(data).await {
            Ok(output) if output.is_empty() => {
                return Err(self.classify_read_failure(index, "empty call result".to_string()).await);
            }
            Ok(output) => output,
            Err(RpcError::Node { message, .. }) => {
                return Err(self.classify_read_failure(index, message).await);
            }
            Err(e) => return Err(e.into()),
        };

        let event = getEventCall::abi_decode_returns(&output, true).map_err(abi::AbiError::from)?;

        Ok(IntrusionEvent {
            index,
            device: event.device,
            timestamp: to_u64(event.timestamp, "timestamp")?,
            intrusion: IntrusionFlag::from_ledger(u64::from(event.intrusion)),
            block_number: to_u64(event.blockNumber, "block number")?,
        })
    }

    async fn append(
        &self,
        device: &str,
        flag: IntrusionFlag,
        signer: &Signer,
    ) -> LedgerResult<TransactionReceipt> {
        let data = logIntrusionCall {
            device: device.to_string(),
            intrusion: flag.as_u8(),
        }
        .abi_encode();

        let tx = json!({
            "from": to_wire(&signer.address()),
            "to": to_wire(&self.contract),
            "data": abi::to_hex(&data),
        });

        let tx_hash: String = self.rpc.call("eth_sendTransaction", json!([tx])).await?;
        tracing::debug!(tx_hash = %tx_hash, device, "transaction submitted, waiting for receipt");

        let receipt = self.wait_for_receipt(&tx_hash).await?;

        if receipt.status.as_deref() == Some("0x0") {
            return Err(LedgerError::Rejected(format!("transaction {} reverted", tx_hash)));
        }

        let block_number = receipt.block_number
            .as_deref()
            .map(parse_quantity)
            .transpose()?;

        Ok(TransactionReceipt {
            tx_hash: receipt.transaction_hash,
            block_number,
        })
    }
}
