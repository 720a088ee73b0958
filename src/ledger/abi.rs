//! Ledger contract interface
//!
//! Calls are encoded with `alloy-sol-types`; the JSON ABI shipped with the
//! deployment is only checked against the same signatures at startup.

use alloy_primitives::hex;
use alloy_sol_types::{sol, SolCall};
use serde::Deserialize;

sol! {
    function getEventsCount() external view returns (uint256 count);
    function getEvent(uint256 index) external view returns (string device, uint256 timestamp, uint8 intrusion, uint256 blockNumber);
    function logIntrusion(string device, uint8 intrusion) external;
}

#[derive(Debug, thiserror::Error)]
pub enum AbiError {
    #[error("interface definition is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("interface definition has no function '{0}'")]
    MissingFunction(&'static str),
    #[error("function '{name}' has signature {found}, expected {expected}")]
    SignatureMismatch {
        name: &'static str,
        expected: String,
        found: String,
    },
    #[error("malformed ABI data: {0}")]
    Decode(#[from] alloy_sol_types::Error),
    #[error("bad hex '{raw}': {reason}")]
    Hex { raw: String, reason: String },
}

/// `0x`-prefixed lowercase hex
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode_prefixed(bytes)
}

pub fn from_hex(raw: &str) -> Result<Vec<u8>, AbiError> {
    hex::decode(raw).map_err(|e| AbiError::Hex {
        raw: raw.to_string(),
        reason: e.to_string(),
    })
}

// ============================================================================
// INTERFACE DEFINITION
// ============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum AbiDocument {
    Bare(Vec<AbiEntry>),
    Artifact { abi: Vec<AbiEntry> },
}

#[derive(Deserialize)]
struct AbiEntry {
    #[serde(rename = "type", default = "default_entry_type")]
    kind: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    inputs: Vec<AbiParam>,
    #[serde(default)]
    outputs: Vec<AbiParam>,
}

#[derive(Deserialize)]
struct AbiParam {
    #[serde(rename = "type")]
    kind: String,
}

fn default_entry_type() -> String {
    "function".to_string()
}

/// A function the gateway calls, as declared above
struct Expected {
    name: &'static str,
    signature: &'static str,
    outputs: &'static [&'static str],
}

const EXPECTED: [Expected; 3] = [
    Expected {
        name: "getEventsCount",
        signature: getEventsCountCall::SIGNATURE,
        outputs: &["uint256"],
    },
    Expected {
        name: "getEvent",
        signature: getEventCall::SIGNATURE,
        outputs: &["string", "uint256", "uint8", "uint256"],
    },
    Expected {
        name: "logIntrusion",
        signature: logIntrusionCall::SIGNATURE,
        outputs: &[],
    },
];

/// Check an ABI document (bare array or build artifact with an `abi` key)
/// declares the ledger functions with the signatures the gateway encodes.
pub fn check_interface(raw: &str) -> Result<(), AbiError> {
    let entries = match serde_json::from_str::<AbiDocument>(raw)? {
        AbiDocument::Bare(entries) => entries,
        AbiDocument::Artifact { abi } => abi,
    };

    for expected in &EXPECTED {
        let entry = entries
            .iter()
            .find(|e| e.kind == "function" && e.name.as_deref() == Some(expected.name))
            .ok_or(AbiError::MissingFunction(expected.name))?;

        let inputs: Vec<&str> = entry.inputs.iter().map(|p| canonical(&p.kind)).collect();
        let outputs: Vec<&str> = entry.outputs.iter().map(|p| canonical(&p.kind)).collect();
        let signature = format!("{}({})", expected.name, inputs.join(","));

        if signature != expected.signature || outputs != expected.outputs {
            return Err(AbiError::SignatureMismatch {
                name: expected.name,
                expected: format!("{} -> ({})", expected.signature, expected.outputs.join(",")),
                found: format!("{} -> ({})", signature, outputs.join(",")),
            });
        }
    }

    Ok(())
}

fn canonical(kind: &str) -> &str {
    match kind {
        "uint" => "uint256",
        "int" => "int256",
        other => other,
    }
}
