//! Chain-specific types and error definitions.

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, U256};
use alloy::rpc::types::TransactionRequest;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-export ChainConfig from config module to avoid duplication
pub use crate::config::schema::ChainConfig;

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

/// Errors raised by the chain client layer.
#[derive(Debug, Error)]
pub enum ChainError {
    /// RPC request failed. The message is surfaced verbatim.
    #[error("{0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// A contract call reverted during simulation.
    #[error("Execution reverted: {}", reason.as_deref().unwrap_or("no reason"))]
    CallReverted { reason: Option<String> },

    /// Return data could not be decoded against the expected ABI.
    #[error("Failed to decode contract return data: {0}")]
    Decode(String),

    /// Invalid private key format or derivation error.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// The client has no signer attached and cannot submit transactions.
    #[error("No signer configured")]
    NoSigner,

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },
}

/// Result type for chain client operations.
pub type ChainResult<T> = Result<T, ChainError>;

/// Final status of a mined transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Success,
    Reverted,
}

/// The parts of a transaction receipt the flow cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptSummary {
    pub status: TxStatus,
    pub block_number: u64,
}

/// A contract call to be simulated and then submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractRequest {
    /// Account the call is made from.
    pub from: Address,
    /// Contract being called.
    pub to: Address,
    /// ABI-encoded calldata (selector + arguments).
    pub input: Bytes,
    /// Native value attached to the call.
    pub value: Option<U256>,
}

impl ContractRequest {
    /// Convert into an alloy transaction request.
    pub fn to_transaction_request(&self) -> TransactionRequest {
        let tx = TransactionRequest::default()
            .with_from(self.from)
            .with_to(self.to)
            .with_input(self.input.clone());
        match self.value {
            Some(value) => tx.with_value(value),
            None => tx,
        }
    }
}

/// Output of a successful simulation.
///
/// `request` is exactly what gets submitted afterwards, so the parameters
/// cannot drift between simulation and submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedRequest {
    pub request: ContractRequest,
    /// Return data produced by the simulated call.
    pub result: Bytes,
}

/// Wallet connection status as reported by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connected,
    Connecting,
    Disconnected,
}
