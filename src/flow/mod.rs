//! Token transaction flow.
//!
//! # Data Flow
//! ```text
//! FlowParams + WalletSession
//!     → orchestrator.rs (state machine, generation guard, watch channel)
//!     → allowance.rs (is spending already authorized?)
//!     → approve.rs (approve / setApprovalForAll)
//!     → execute.rs (simulate, then submit the target call)
//!     → confirm.rs (receipt + confirmation depth)
//! ```
//!
//! # Design Decisions
//! - Delegates are plain async functions over `ChainReader` / `ChainWriter`
//!   and know nothing about flow state
//! - Only the orchestrator writes `FlowState`
//! - Observers use `TransactionFlow::subscribe`, never polling

pub mod allowance;
pub mod approve;
pub mod confirm;
pub mod execute;
pub mod orchestrator;
pub mod params;
pub mod types;

pub use allowance::{check_allowance, AllowanceQuery};
pub use approve::{approve, ApprovalRequest};
pub use confirm::{confirm_transaction, ConfirmOptions};
pub use execute::execute_contract_function;
pub use orchestrator::TransactionFlow;
pub use params::FlowParams;
pub use types::{FlowError, FlowResult, FlowState, FlowStep, TokenStandard};
