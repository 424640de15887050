//! Flow parameters.

use alloy::primitives::{Address, U256};

use crate::blockchain::abi::TargetCall;
use crate::flow::types::{FlowError, FlowResult, TokenStandard};

/// Immutable description of one token transaction flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowParams {
    /// Token standard being spent.
    pub standard: TokenStandard,
    /// Token contract address.
    pub token: Address,
    /// Who will spend the tokens, if approval is needed.
    pub spender: Option<Address>,
    /// Item id for ERC721 / ERC1155.
    pub token_id: Option<U256>,
    /// Amount for ERC20 / ERC1155, or native value for NATIVE.
    pub amount: Option<U256>,
    /// Confirmation depth for each submitted transaction.
    pub confirmations: u64,
    /// Always run the approval sub-path, whatever the current allowance.
    pub require_explicit_approval: bool,
    /// The call to execute once spending is authorized.
    pub target: TargetCall,
}

impl FlowParams {
    /// Parameters with a confirmation depth of 1 and no optional fields set.
    pub fn new(standard: TokenStandard, token: Address, target: TargetCall) -> Self {
        Self {
            standard,
            token,
            spender: None,
            token_id: None,
            amount: None,
            confirmations: 1,
            require_explicit_approval: false,
            target,
        }
    }

    pub fn with_spender(mut self, spender: Address) -> Self {
        self.spender = Some(spender);
        self
    }

    pub fn with_token_id(mut self, token_id: U256) -> Self {
        self.token_id = Some(token_id);
        self
    }

    pub fn with_amount(mut self, amount: U256) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_confirmations(mut self, confirmations: u64) -> Self {
        self.confirmations = confirmations;
        self
    }

    pub fn with_explicit_approval(mut self, required: bool) -> Self {
        self.require_explicit_approval = required;
        self
    }

    /// Native value attached to the target call. Only NATIVE flows send value.
    pub fn native_value(&self) -> Option<U256> {
        match self.standard {
            TokenStandard::Native => self.amount,
            _ => None,
        }
    }

    /// Check that every field the standard needs before running is present.
    ///
    /// Zero amounts count as absent.
    pub fn validate(&self) -> FlowResult<()> {
        let amount = self.amount.filter(|a| !a.is_zero());
        let ok = match self.standard {
            TokenStandard::Native => return Ok(()),
            TokenStandard::Erc20 => self.spender.is_some() && amount.is_some(),
            TokenStandard::Erc721 => self.spender.is_some() && self.token_id.is_some(),
            TokenStandard::Erc1155 => {
                self.spender.is_some() && (amount.is_some() || self.token_id.is_some())
            }
        };

        if ok {
            Ok(())
        } else {
            Err(FlowError::Parameter(
                "Spender and amount required for tokens".to_string(),
            ))
        }
    }
}
