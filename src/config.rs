//! Configuration module
//!
//! Everything comes from environment variables (optionally seeded from a
//! `.env` file by `dotenvy`). Loading returns a `Result`: a missing file or a
//! malformed value stops startup instead of being papered over with a default.

use std::env;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::ledger::abi::{self, AbiError};
use crate::ledger::{parse_address, Address, AddressError, LedgerSettings};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} has an invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("could not read {what} at {}: {source}", path.display())]
    Io {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ledger interface definition at {} is unusable: {source}", path.display())]
    Interface {
        path: PathBuf,
        #[source]
        source: AbiError,
    },

    #[error("contract address from {origin} is invalid: {source}")]
    ContractAddress {
        origin: String,
        #[source]
        source: AddressError,
    },

    #[error("no contract code at {0}; is the ledger contract deployed?")]
    NotDeployed(Address),

    #[error("SIGNER_ADDRESS is not set and the node exposes no accounts")]
    NoSigner,
}

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// HTTP port
    pub port: u16,

    /// Ledger node JSON-RPC endpoint
    pub rpc_url: String,

    /// Deployed ledger contract
    pub contract_address: Address,

    /// Explicit signer; the node's first account when unset
    pub signer: Option<Address>,

    pub rpc_timeout: Duration,
    pub receipt_timeout: Duration,
    pub receipt_poll_interval: Duration,

    /// Static front end served on unmatched paths
    pub frontend_dir: Option<PathBuf>,

    /// Run the ingestion loop inside the gateway process
    pub monitor_enabled: bool,
}

impl GatewayConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let rpc_url = lookup("LEDGER_RPC_URL")
            .unwrap_or_else(|| "http://127.0.0.1:7545".to_string());
        if !(rpc_url.starts_with("http://") || rpc_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                var: "LEDGER_RPC_URL",
                value: rpc_url,
                reason: "must be an http:// or https:// URL".to_string(),
            });
        }

        let contract_address = match lookup("CONTRACT_ADDRESS") {
            Some(raw) => parse_address(&raw).map_err(|source| ConfigError::ContractAddress {
                origin: "CONTRACT_ADDRESS".to_string(),
                source,
            })?,
            None => {
                let path = path_or(&lookup, "CONTRACT_ADDRESS_PATH", "contract_address.txt");
                let raw = read_file(&path, "contract address")?;
                parse_address(&raw).map_err(|source| ConfigError::ContractAddress {
                    origin: path.display().to_string(),
                    source,
                })?
            }
        };

        let abi_path = path_or(&lookup, "CONTRACT_ABI_PATH", "contract_abi.json");
        abi::check_interface(&read_file(&abi_path, "contract ABI")?)
            .map_err(|source| ConfigError::Interface {
                path: abi_path.clone(),
                source,
            })?;

        let signer = match lookup("SIGNER_ADDRESS") {
            None => None,
            Some(raw) => Some(parse_address(&raw).map_err(|e| ConfigError::Invalid {
                var: "SIGNER_ADDRESS",
                value: raw.clone(),
                reason: e.to_string(),
            })?),
        };

        Ok(Self {
            port: parsed(&lookup, "PORT", 5000)?,
            rpc_url,
            contract_address,
            signer,
            rpc_timeout: Duration::from_secs(parsed(&lookup, "RPC_TIMEOUT_SECS", 30)?),
            receipt_timeout: Duration::from_secs(parsed(&lookup, "RECEIPT_TIMEOUT_SECS", 120)?),
            receipt_poll_interval: Duration::from_millis(parsed(&lookup, "RECEIPT_POLL_INTERVAL_MS", 100)?),
            frontend_dir: lookup("FRONTEND_DIR").map(PathBuf::from),
            monitor_enabled: switch(&lookup, "MONITOR_ENABLED", false)?,
        })
    }

    pub fn ledger_settings(&self) -> LedgerSettings {
        LedgerSettings {
            rpc_url: self.rpc_url.clone(),
            contract: self.contract_address,
            rpc_timeout: self.rpc_timeout,
            receipt_timeout: self.receipt_timeout,
            poll_interval: self.receipt_poll_interval,
        }
    }
}

/// Ingestion loop configuration
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Gateway base URL used by the standalone monitor
    pub gateway_url: String,

    /// CSV pool the loop samples from
    pub sample_path: PathBuf,

    /// Threshold model; replay recorded labels when unset
    pub model_path: Option<PathBuf>,

    pub min_interval: Duration,
    pub max_interval: Duration,

    /// Stop after this many cycles
    pub max_cycles: Option<u64>,

    /// Fixed RNG seed for reproducible runs
    pub seed: Option<u64>,

    /// Upper bound on one HTTP submission, finality wait included
    pub submit_timeout: Duration,
}

impl MonitorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let min_ms: u64 = parsed(&lookup, "MONITOR_MIN_INTERVAL_MS", 3000)?;
        let max_ms: u64 = parsed(&lookup, "MONITOR_MAX_INTERVAL_MS", 5000)?;
        if min_ms > max_ms {
            return Err(ConfigError::Invalid {
                var: "MONITOR_MAX_INTERVAL_MS",
                value: max_ms.to_string(),
                reason: format!("must not be below MONITOR_MIN_INTERVAL_MS ({})", min_ms),
            });
        }

        Ok(Self {
            gateway_url: lookup("GATEWAY_URL")
                .unwrap_or_else(|| "http://127.0.0.1:5000".to_string()),
            sample_path: path_or(&lookup, "SAMPLE_DATA_PATH", "data/monitor_sample.csv"),
            model_path: lookup("MODEL_PATH").map(PathBuf::from),
            min_interval: Duration::from_millis(min_ms),
            max_interval: Duration::from_millis(max_ms),
            max_cycles: optional(&lookup, "MONITOR_MAX_CYCLES")?,
            seed: optional(&lookup, "MONITOR_SEED")?,
            submit_timeout: Duration::from_secs(parsed(&lookup, "SUBMIT_TIMEOUT_SECS", 180)?),
        })
    }
}

// Helper functions

fn parsed<T, F>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    Ok(optional(lookup, var)?.unwrap_or(default))
}

fn optional<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|e: T::Err| ConfigError::Invalid {
            var,
            value: raw,
            reason: e.to_string(),
        }),
    }
}

fn switch<F>(lookup: &F, var: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => Err(ConfigError::Invalid {
            var,
            value: v,
            reason: "expected true or false".to_string(),
        }),
    }
}

fn path_or<F>(lookup: &F, var: &str, default: &str) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    PathBuf::from(lookup(var).unwrap_or_else(|| default.to_string()))
}

fn read_file(path: &Path, what: &'static str) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        what,
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const ADDRESS: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    const ABI: &str = r#"[
        {"type": "function", "name": "getEventsCount", "inputs": [], "outputs": [{"type": "uint256"}]},
        {"type": "function", "name": "getEvent", "inputs": [{"type": "uint256"}],
         "outputs": [{"type": "string"}, {"type": "uint256"}, {"type": "uint8"}, {"type": "uint256"}]},
        {"type": "function", "name": "logIntrusion", "inputs": [{"type": "string"}, {"type": "uint8"}], "outputs": []}
    ]"#;

    fn temp_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn lookup(vars: HashMap<&'static str, String>) -> impl Fn(&str) -> Option<String> {
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_gateway_config_from_files() {
        let abi = temp_file(ABI);
        let address = temp_file(&format!("{}\n", ADDRESS));

        let vars = HashMap::from([
            ("CONTRACT_ABI_PATH", abi.path().display().to_string()),
            ("CONTRACT_ADDRESS_PATH", address.path().display().to_string()),
        ]);
        let config = GatewayConfig::from_lookup(lookup(vars)).unwrap();

        assert_eq!(config.port, 5000);
        assert_eq!(config.rpc_url, "http://127.0.0.1:7545");
        assert_eq!(config.contract_address.to_string(), ADDRESS);
        assert_eq!(config.signer, None);
        assert_eq!(config.receipt_timeout, Duration::from_secs(120));
        assert!(!config.monitor_enabled);
    }

    #[test]
    fn test_contract_address_env_overrides_file() {
        let abi = temp_file(ABI);
        let vars = HashMap::from([
            ("CONTRACT_ABI_PATH", abi.path().display().to_string()),
            ("CONTRACT_ADDRESS", ADDRESS.to_lowercase()),
            ("CONTRACT_ADDRESS_PATH", "/definitely/not/here.txt".to_string()),
            ("SIGNER_ADDRESS", ADDRESS.to_string()),
            ("MONITOR_ENABLED", "true".to_string()),
        ]);
        let config = GatewayConfig::from_lookup(lookup(vars)).unwrap();
        assert_eq!(config.signer.map(|s| s.to_string()), Some(ADDRESS.to_string()));
        assert!(config.monitor_enabled);
    }

    #[test]
    fn test_missing_address_file_is_fatal() {
        let abi = temp_file(ABI);
        let vars = HashMap::from([
            ("CONTRACT_ABI_PATH", abi.path().display().to_string()),
            ("CONTRACT_ADDRESS_PATH", "/definitely/not/here.txt".to_string()),
        ]);
        assert!(matches!(
            GatewayConfig::from_lookup(lookup(vars)),
            Err(ConfigError::Io { what: "contract address", .. })
        ));
    }

    #[test]
    fn test_missing_abi_is_fatal() {
        let vars = HashMap::from([
            ("CONTRACT_ADDRESS", ADDRESS.to_string()),
            ("CONTRACT_ABI_PATH", "/definitely/not/abi.json".to_string()),
        ]);
        assert!(matches!(
            GatewayConfig::from_lookup(lookup(vars)),
            Err(ConfigError::Io { what: "contract ABI", .. })
        ));
    }

    #[test]
    fn test_incomplete_abi_is_fatal() {
        let abi = temp_file(r#"[{"type": "function", "name": "getEventsCount", "inputs": [], "outputs": [{"type": "uint256"}]}]"#);
        let vars = HashMap::from([
            ("CONTRACT_ADDRESS", ADDRESS.to_string()),
            ("CONTRACT_ABI_PATH", abi.path().display().to_string()),
        ]);
        assert!(matches!(
            GatewayConfig::from_lookup(lookup(vars)),
            Err(ConfigError::Interface { .. })
        ));
    }

    #[test]
    fn test_malformed_values_are_rejected() {
        let abi = temp_file(ABI);
        let base = || {
            HashMap::from([
                ("CONTRACT_ABI_PATH", abi.path().display().to_string()),
                ("CONTRACT_ADDRESS", ADDRESS.to_string()),
            ])
        };

        let mut bad_port = base();
        bad_port.insert("PORT", "eighty".to_string());
        assert!(matches!(
            GatewayConfig::from_lookup(lookup(bad_port)),
            Err(ConfigError::Invalid { var: "PORT", .. })
        ));

        let mut bad_url = base();
        bad_url.insert("LEDGER_RPC_URL", "127.0.0.1:7545".to_string());
        assert!(matches!(
            GatewayConfig::from_lookup(lookup(bad_url)),
            Err(ConfigError::Invalid { var: "LEDGER_RPC_URL", .. })
        ));

        let mut bad_switch = base();
        bad_switch.insert("MONITOR_ENABLED", "maybe".to_string());
        assert!(GatewayConfig::from_lookup(lookup(bad_switch)).is_err());

        let mut bad_address = base();
        bad_address.insert("CONTRACT_ADDRESS", "0x5AAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".to_string());
        assert!(matches!(
            GatewayConfig::from_lookup(lookup(bad_address)),
            Err(ConfigError::ContractAddress { .. })
        ));

        let mut bad_signer = base();
        bad_signer.insert("SIGNER_ADDRESS", "1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a".to_string());
        assert!(matches!(
            GatewayConfig::from_lookup(lookup(bad_signer)),
            Err(ConfigError::Invalid { var: "SIGNER_ADDRESS", .. })
        ));
    }

    #[test]
    fn test_monitor_config_defaults() {
        let config = MonitorConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.gateway_url, "http://127.0.0.1:5000");
        assert_eq!(config.sample_path, PathBuf::from("data/monitor_sample.csv"));
        assert_eq!(config.min_interval, Duration::from_secs(3));
        assert_eq!(config.max_interval, Duration::from_secs(5));
        assert_eq!(config.max_cycles, None);
    }

    #[test]
    fn test_monitor_config_rejects_inverted_interval() {
        let vars = HashMap::from([
            ("MONITOR_MIN_INTERVAL_MS", "5000".to_string()),
            ("MONITOR_MAX_INTERVAL_MS", "1000".to_string()),
        ]);
        assert!(MonitorConfig::from_lookup(lookup(vars)).is_err());
    }
}
