//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the flow
//! runner. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FlowConfig {
    /// RPC connection settings.
    pub chain: ChainConfig,

    /// Confirmation polling settings.
    pub confirmation: ConfirmationConfig,

    /// Wallet / session settings.
    pub wallet: WalletConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Chain connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs, used for reads only.
    #[serde(default)]
    pub failover_urls: Vec<String>,

    /// Chain ID (e.g., 1 for Ethereum mainnet, 31337 for local Anvil).
    pub chain_id: u64,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Interval between receipt lookups while a transaction is pending.
    pub receipt_poll_interval_ms: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            failover_urls: Vec::new(),
            chain_id: 31337,
            rpc_timeout_secs: 10,
            receipt_poll_interval_ms: 2000,
        }
    }
}

/// Confirmation polling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    /// Confirmation depth used when a flow does not specify one.
    pub default_depth: u64,

    /// Fixed sleep between chain-head polls, in milliseconds.
    pub poll_interval_ms: u64,

    /// Optional wall-clock limit on waiting for confirmations.
    /// Unbounded when unset.
    pub timeout_secs: Option<u64>,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            default_depth: 1,
            poll_interval_ms: 2000,
            timeout_secs: None,
        }
    }
}

/// Wallet configuration.
///
/// Private keys are never part of the config file; only the name of the
/// environment variable holding one.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Environment variable the signing key is read from.
    pub private_key_env: String,

    /// Account to use for read-only sessions when no key is present.
    pub account: Option<String>,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            private_key_env: crate::blockchain::wallet::PRIVATE_KEY_ENV_VAR.to_string(),
            account: None,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
