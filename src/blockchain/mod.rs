//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Environment Variables (private key) + FlowConfig (RPC URL)
//!     → wallet.rs (key loading)
//!     → client.rs (RPC connection with timeouts, ChainReader / ChainWriter)
//!     → session.rs (ProviderContext → WalletSession handed to flows)
//!     → abi.rs (token interfaces, call encoding)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts

pub mod abi;
pub mod client;
pub mod session;
pub mod types;
pub mod wallet;

#[cfg(test)]
pub(crate) mod mock;

pub use abi::TargetCall;
pub use client::{AlloyChainClient, ChainReader, ChainWriter};
pub use session::{DisconnectedSession, LocalSession, ProviderContext, WalletSession};
pub use types::{
    ChainError, ChainId, ChainResult, ConnectionStatus, ContractRequest, ReceiptSummary,
    SimulatedRequest, TxStatus,
};
pub use wallet::Wallet;
