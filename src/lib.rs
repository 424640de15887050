//! EVM token transaction flow library.
//!
//! Drives a contract call that spends tokens through allowance check,
//! optional approval, execution and confirmation, exposing the current step
//! to observers.

pub mod blockchain;
pub mod config;
pub mod flow;
pub mod observability;

pub use blockchain::{ProviderContext, TargetCall, WalletSession};
pub use config::FlowConfig;
pub use flow::{FlowError, FlowParams, FlowState, FlowStep, TokenStandard, TransactionFlow};
