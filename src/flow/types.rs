//! Flow types: token standards, steps, observable state and errors.

use alloy::primitives::TxHash;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::blockchain::types::ChainError;

/// Token standard a flow spends from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TokenStandard {
    Erc20,
    Erc721,
    Erc1155,
    Native,
}

impl TokenStandard {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenStandard::Erc20 => "ERC20",
            TokenStandard::Erc721 => "ERC721",
            TokenStandard::Erc1155 => "ERC1155",
            TokenStandard::Native => "NATIVE",
        }
    }

    /// Whether spending requires an allowance or operator approval.
    pub fn requires_approval(&self) -> bool {
        !matches!(self, TokenStandard::Native)
    }
}

impl fmt::Display for TokenStandard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenStandard {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "").as_str() {
            "ERC20" => Ok(TokenStandard::Erc20),
            "ERC721" => Ok(TokenStandard::Erc721),
            "ERC1155" => Ok(TokenStandard::Erc1155),
            "NATIVE" => Ok(TokenStandard::Native),
            _ => Err(FlowError::UnsupportedStandard(s.to_string())),
        }
    }
}

/// Step of a transaction flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FlowStep {
    #[default]
    Idle,
    CheckingAllowance,
    Ready,
    WaitingForApproval,
    WaitingForApprovalConfirmation,
    Executing,
    WaitingForExecutionConfirmation,
    Success,
    Error,
}

impl FlowStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowStep::Idle => "idle",
            FlowStep::CheckingAllowance => "checkingAllowance",
            FlowStep::Ready => "ready",
            FlowStep::WaitingForApproval => "waitingForApproval",
            FlowStep::WaitingForApprovalConfirmation => "waitingForApprovalConfirmation",
            FlowStep::Executing => "executing",
            FlowStep::WaitingForExecutionConfirmation => "waitingForExecutionConfirmation",
            FlowStep::Success => "success",
            FlowStep::Error => "error",
        }
    }

    /// Steps from which `run()` may be started.
    pub fn can_run(&self) -> bool {
        matches!(self, FlowStep::Idle | FlowStep::Ready | FlowStep::Error)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowStep::Success | FlowStep::Error)
    }
}

impl fmt::Display for FlowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable state of a flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowState {
    pub step: FlowStep,
    pub error: Option<String>,
    pub approve_hash: Option<TxHash>,
    pub execute_hash: Option<TxHash>,
}

impl FlowState {
    pub fn is_idle(&self) -> bool {
        self.step == FlowStep::Idle
    }

    pub fn is_ready_to_execute(&self) -> bool {
        self.step == FlowStep::Ready
    }

    pub fn is_checking_allowance(&self) -> bool {
        self.step == FlowStep::CheckingAllowance
    }

    pub fn is_waiting_for_approval(&self) -> bool {
        self.step == FlowStep::WaitingForApproval
    }

    pub fn is_waiting_for_approval_confirmation(&self) -> bool {
        self.step == FlowStep::WaitingForApprovalConfirmation
    }

    /// Approval submitted or being confirmed.
    pub fn is_pending_approve(&self) -> bool {
        self.is_waiting_for_approval() || self.is_waiting_for_approval_confirmation()
    }

    pub fn is_executing(&self) -> bool {
        self.step == FlowStep::Executing
    }

    pub fn is_waiting_for_execution_confirmation(&self) -> bool {
        self.step == FlowStep::WaitingForExecutionConfirmation
    }

    /// Execution submitted or being confirmed.
    pub fn is_pending_executing(&self) -> bool {
        self.is_executing() || self.is_waiting_for_execution_confirmation()
    }

    pub fn is_success(&self) -> bool {
        self.step == FlowStep::Success
    }

    pub fn is_error(&self) -> bool {
        self.step == FlowStep::Error
    }
}

/// Errors surfaced by flow delegates and the orchestrator.
#[derive(Debug, Error)]
pub enum FlowError {
    /// No wallet, account, or live connection.
    #[error("{0}")]
    MissingContext(String),

    /// A field required by the selected standard is absent.
    #[error("{0}")]
    MissingParameter(String),

    #[error("Unsupported token type: {0}")]
    UnsupportedStandard(String),

    #[error("{0}")]
    UnsupportedOperation(String),

    /// Simulation or submission of the target call failed.
    #[error("Execution error: {message}")]
    Execution {
        message: String,
        revert_reason: Option<String>,
    },

    /// The transaction was mined but reverted.
    #[error("Transaction reverted: {0}")]
    Reverted(TxHash),

    /// Waiting for confirmations failed.
    #[error("Transaction confirmation failed: {0}")]
    Confirmation(String),

    /// The session cannot run a flow.
    #[error("{0}")]
    Precondition(String),

    /// Flow parameters are incomplete for the selected standard.
    #[error("{0}")]
    Parameter(String),

    /// Chain client failure, passed through unchanged.
    #[error(transparent)]
    Chain(#[from] ChainError),

    /// The run was reset or replaced by a newer run.
    #[error("Flow was reset while running")]
    Superseded,
}

/// Result type for flow operations.
pub type FlowResult<T> = Result<T, FlowError>;
