//! In-process ledger
//!
//! Behaves like the contract (sequential indices, ledger-side timestamps, one
//! block per write) and exposes fault switches so callers can simulate an
//! unreachable node or an unauthorized signer.

use async_trait::async_trait;
use parking_lot::RwLock;
use alloy_primitives::keccak256;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use super::{abi, Address, Ledger, LedgerError, LedgerResult, Signer};
use crate::models::{IntrusionEvent, IntrusionFlag, TransactionReceipt};

pub struct MemoryLedger {
    events: RwLock<Vec<IntrusionEvent>>,
    authorized: Option<Address>,
    reachable: AtomicBool,
    failing_index: RwLock<Option<u64>>,
    append_calls: AtomicU64,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedger {
    /// Ledger that accepts writes from any signer
    pub fn new() -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            authorized: None,
            reachable: AtomicBool::new(true),
            failing_index: RwLock::new(None),
            append_calls: AtomicU64::new(0),
        }
    }

    /// Ledger that rejects writes from everyone but `signer`
    pub fn with_authorized_signer(signer: Address) -> Self {
        Self {
            authorized: Some(signer),
            ..Self::new()
        }
    }

    /// Simulate the node going away (or coming back)
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Make reads of one index fail with a connectivity error
    pub fn fail_reads_at(&self, index: Option<u64>) {
        *self.failing_index.write() = index;
    }

    /// Number of `append` calls received, failed ones included
    pub fn append_calls(&self) -> u64 {
        self.append_calls.load(Ordering::SeqCst)
    }

    fn ensure_reachable(&self) -> LedgerResult<()> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(LedgerError::Connectivity("connection refused".to_string()))
        }
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn count(&self) -> LedgerResult<u64> {
        self.ensure_reachable()?;
        Ok(self.events.read().len() as u64)
    }

    async fn get(&self, index: u64) -> LedgerResult<IntrusionEvent> {
        self.ensure_reachable()?;
        if *self.failing_index.read() == Some(index) {
            return Err(LedgerError::Connectivity(format!("read of event {} dropped", index)));
        }

        let events = self.events.read();
        usize::try_from(index)
            .ok()
            .and_then(|i| events.get(i))
            .cloned()
            .ok_or(LedgerError::OutOfRange {
                index,
                count: events.len() as u64,
            })
    }

    async fn append(
        &self,
        device: &str,
        flag: IntrusionFlag,
        signer: &Signer,
    ) -> LedgerResult<TransactionReceipt> {
        self.append_calls.fetch_add(1, Ordering::SeqCst);
        self.ensure_reachable()?;

        if let Some(authorized) = self.authorized {
            if authorized != signer.address() {
                return Err(LedgerError::Rejected(format!(
                    "sender {} is not authorized",
                    signer.address()
                )));
            }
        }

        let mut events = self.events.write();
        let index = events.len() as u64;
        let block_number = index + 1;

        events.push(IntrusionEvent {
            index,
            device: device.to_string(),
            timestamp: chrono::Utc::now().timestamp().max(0) as u64,
            intrusion: flag,
            block_number,
        });

        let mut preimage = signer.address().to_vec();
        preimage.extend_from_slice(&index.to_be_bytes());
        preimage.extend_from_slice(device.as_bytes());
        preimage.push(flag.as_u8());

        Ok(TransactionReceipt {
            tx_hash: abi::to_hex(keccak256(&preimage).as_slice()),
            block_number: Some(block_number),
        })
    }
}
