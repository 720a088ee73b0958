//! Intrusion event model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classifier verdict recorded with every event.
///
/// Stored on the ledger as a `uint8`: `0` for benign traffic, `1` for an
/// intrusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "i64")]
pub enum IntrusionFlag {
    Benign,
    Malicious,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("intrusion flag must be 0 or 1, got {0}")]
pub struct InvalidFlag(pub i64);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("prediction must be 0, 1 or a text label, got '{0}'")]
pub struct InvalidPrediction(pub String);

impl IntrusionFlag {
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Benign => 0,
            Self::Malicious => 1,
        }
    }

    pub fn is_malicious(self) -> bool {
        self == Self::Malicious
    }

    /// Display label used by the front end ("Yes" / "No")
    pub fn label(self) -> &'static str {
        match self {
            Self::Malicious => "Yes",
            Self::Benign => "No",
        }
    }

    /// Interpret the raw `uint8` read back from the ledger.
    ///
    /// Only `1` counts as an intrusion; any other stored value reads as benign.
    pub fn from_ledger(raw: u64) -> Self {
        if raw == 1 {
            Self::Malicious
        } else {
            Self::Benign
        }
    }

    /// Coerce a raw model prediction into a flag.
    ///
    /// Numeric labels must be exactly `0` or `1`; textual labels are malicious
    /// when they mention an attack (e.g. `mirai_udp_attack`).
    pub fn from_prediction(label: &str) -> Result<Self, InvalidPrediction> {
        let label = label.trim();
        if let Ok(value) = label.parse::<f64>() {
            return match value {
                v if v == 0.0 => Ok(Self::Benign),
                v if v == 1.0 => Ok(Self::Malicious),
                _ => Err(InvalidPrediction(label.to_string())),
            };
        }

        if label.to_ascii_lowercase().contains("attack") {
            Ok(Self::Malicious)
        } else {
            Ok(Self::Benign)
        }
    }
}

impl TryFrom<i64> for IntrusionFlag {
    type Error = InvalidFlag;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Benign),
            1 => Ok(Self::Malicious),
            other => Err(InvalidFlag(other)),
        }
    }
}

impl From<IntrusionFlag> for u8 {
    fn from(flag: IntrusionFlag) -> Self {
        flag.as_u8()
    }
}

impl fmt::Display for IntrusionFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Benign => write!(f, "Benign"),
            Self::Malicious => write!(f, "INTRUSION"),
        }
    }
}

/// One verdict as recorded by the ledger.
///
/// `index`, `timestamp` and `block_number` are assigned by the ledger at append
/// time; the gateway never fabricates or caches them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntrusionEvent {
    pub index: u64,
    pub device: String,
    pub timestamp: u64,
    pub intrusion: IntrusionFlag,
    pub block_number: u64,
}

/// Confirmation of a finalized append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    /// `0x`-prefixed transaction hash
    pub tx_hash: String,
    /// Block that included the transaction, when the submitter knows it
    pub block_number: Option<u64>,
}

impl TransactionReceipt {
    /// Shortened hash for log lines
    pub fn short_hash(&self) -> &str {
        let end = self.tx_hash.len().min(10);
        &self.tx_hash[..end]
    }
}
