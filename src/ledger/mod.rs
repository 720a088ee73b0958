//! Ledger client
//!
//! The ledger is an external, append-only, sequentially indexed event store.
//! [`Ledger`] is the seam the services talk to; [`EthLedgerClient`] binds it to
//! the deployed contract over JSON-RPC and [`MemoryLedger`] keeps everything in
//! process for local runs and tests.

pub mod abi;
pub mod address;
pub mod client;
pub mod memory;
pub mod rpc;

use async_trait::async_trait;
use std::time::Duration;

use crate::models::{IntrusionEvent, IntrusionFlag, TransactionReceipt};

pub use address::{parse_address, Address, AddressError};
pub use client::{EthLedgerClient, LedgerSettings};
pub use memory::MemoryLedger;

pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger unreachable: {0}")]
    Connectivity(String),

    #[error("event index {index} out of range (count {count})")]
    OutOfRange { index: u64, count: u64 },

    #[error("ledger rejected the request: {0}")]
    Rejected(String),

    #[error("transaction {tx_hash} not final after {waited:?}")]
    Timeout { tx_hash: String, waited: Duration },

    #[error("unexpected ledger response: {0}")]
    InvalidResponse(String),
}

impl From<abi::AbiError> for LedgerError {
    fn from(err: abi::AbiError) -> Self {
        LedgerError::InvalidResponse(err.to_string())
    }
}

impl From<rpc::RpcError> for LedgerError {
    fn from(err: rpc::RpcError) -> Self {
        match err {
            rpc::RpcError::Transport(msg) => LedgerError::Connectivity(msg),
            rpc::RpcError::Http(status) => {
                LedgerError::Connectivity(format!("node answered HTTP {}", status))
            }
            rpc::RpcError::Node { message, .. } => LedgerError::Rejected(message),
            rpc::RpcError::Decode(msg) => LedgerError::InvalidResponse(msg),
        }
    }
}

/// Identity that signs ledger writes.
///
/// The key itself stays with the node; the gateway only names the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signer {
    address: Address,
}

impl Signer {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }
}

/// Operations the gateway needs from the ledger.
///
/// Implementations hold no event state of their own: every call is answered by
/// the ledger.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Number of confirmed events
    async fn count(&self) -> LedgerResult<u64>;

    /// Event at `index`; `OutOfRange` when `index >= count()`
    async fn get(&self, index: u64) -> LedgerResult<IntrusionEvent>;

    /// Append one event and wait until it is final
    async fn append(
        &self,
        device: &str,
        flag: IntrusionFlag,
        signer: &Signer,
    ) -> LedgerResult<TransactionReceipt>;
}
