//! Ledger context
//!
//! Built once at startup and handed to every service and to the ingestion
//! loop: the ledger connection plus the identity that signs writes.

use std::fmt;
use std::sync::Arc;

use crate::config::{ConfigError, GatewayConfig};
use crate::ledger::{EthLedgerClient, Ledger, LedgerError, Signer};
use crate::services::{QueryService, WriteService};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("ledger check failed: {0}")]
    Ledger(#[from] LedgerError),
}

#[derive(Clone)]
pub struct LedgerContext {
    ledger: Arc<dyn Ledger>,
    signer: Signer,
}

impl fmt::Debug for LedgerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerContext")
            .field("signer", &self.signer)
            .finish_non_exhaustive()
    }
}

impl LedgerContext {
    pub fn new(ledger: Arc<dyn Ledger>, signer: Signer) -> Self {
        Self { ledger, signer }
    }

    /// Connect to the configured node and verify it can serve the gateway:
    /// the node answers, the contract is deployed, and a signer is available.
    pub async fn connect(config: &GatewayConfig) -> Result<Self, StartupError> {
        let client = EthLedgerClient::new(&config.ledger_settings())?;

        let chain_id = client.chain_id().await?;
        tracing::info!(
            "Connected to ledger node {} (chain id {})",
            client.endpoint(),
            chain_id
        );

        if !client.is_deployed().await? {
            return Err(ConfigError::NotDeployed(client.contract()).into());
        }
        tracing::info!("Loaded ledger contract at address: {}", client.contract());

        let signer = match config.signer {
            Some(address) => address,
            None => client
                .accounts()
                .await?
                .into_iter()
                .next()
                .ok_or(ConfigError::NoSigner)?,
        };
        tracing::info!("Using signer account: {}", signer);

        Ok(Self::new(Arc::new(client), Signer::new(signer)))
    }

    pub fn ledger(&self) -> &Arc<dyn Ledger> {
        &self.ledger
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    pub fn query_service(&self) -> QueryService {
        QueryService::new(Arc::clone(&self.ledger))
    }

    pub fn write_service(&self) -> WriteService {
        WriteService::new(Arc::clone(&self.ledger), self.signer)
    }
}
