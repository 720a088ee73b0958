//! Write path: validated, confirmed appends

use std::sync::Arc;

use crate::ledger::{Ledger, LedgerError, Signer};
use crate::models::{IntrusionFlag, TransactionReceipt};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WriteError {
    /// Rejected before the ledger was contacted
    #[error("invalid submission: {0}")]
    Validation(String),

    #[error("write failed: {0}")]
    WriteFailed(#[from] LedgerError),
}

/// A submission that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub device: String,
    pub flag: IntrusionFlag,
}

impl Submission {
    pub fn new(device: &str, flag: i64) -> Result<Self, WriteError> {
        if device.trim().is_empty() {
            return Err(WriteError::Validation("device must not be empty".to_string()));
        }

        let flag = IntrusionFlag::try_from(flag)
            .map_err(|e| WriteError::Validation(e.to_string()))?;

        Ok(Self {
            device: device.to_string(),
            flag,
        })
    }
}

#[derive(Clone)]
pub struct WriteService {
    ledger: Arc<dyn Ledger>,
    signer: Signer,
}

impl WriteService {
    pub fn new(ledger: Arc<dyn Ledger>, signer: Signer) -> Self {
        Self { ledger, signer }
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    /// Validate, append with the configured signer, and wait for finality.
    ///
    /// Exactly one event is appended on success and none on failure; the
    /// ledger's transaction boundary makes the append atomic.
    pub async fn submit(&self, device: &str, flag: i64) -> Result<TransactionReceipt, WriteError> {
        let submission = Submission::new(device, flag)?;
        self.submit_validated(&submission).await
    }

    pub async fn submit_validated(&self, submission: &Submission) -> Result<TransactionReceipt, WriteError> {
        let receipt = self.ledger
            .append(&submission.device, submission.flag, &self.signer)
            .await?;

        tracing::info!(
            device = %submission.device,
            intrusion = submission.flag.as_u8(),
            tx_hash = %receipt.tx_hash,
            "Intrusion event appended"
        );

        Ok(receipt)
    }
}
