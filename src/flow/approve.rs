//! Approval submission per token standard.
//!
//! ERC721 and ERC1155 approvals use `setApprovalForAll`, which authorizes the
//! spender over every item the owner holds in that collection, not only the
//! item the flow is about.

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::sol_types::SolCall;

use crate::blockchain::abi::{IERC1155, IERC20, IERC721};
use crate::blockchain::client::ChainWriter;
use crate::blockchain::types::{ContractRequest, SimulatedRequest};
use crate::flow::types::{FlowError, FlowResult, TokenStandard};

/// Inputs to an approval.
#[derive(Debug, Clone, Copy)]
pub struct ApprovalRequest {
    pub standard: TokenStandard,
    pub token: Address,
    pub spender: Address,
    pub account: Option<Address>,
    pub amount: Option<U256>,
}

/// Submit the approval transaction for `request.standard` and return its hash.
///
/// Errors from the write interface are returned unchanged.
pub async fn approve(
    request: &ApprovalRequest,
    writer: Option<&dyn ChainWriter>,
) -> FlowResult<TxHash> {
    let (account, writer) = match (request.account, writer) {
        (Some(account), Some(writer)) => (account, writer),
        _ => {
            return Err(FlowError::MissingContext(
                "Missing wallet or wallet client".to_string(),
            ))
        }
    };

    let calldata: Bytes = match request.standard {
        TokenStandard::Erc20 => {
            let amount = request.amount.filter(|a| !a.is_zero()).ok_or_else(|| {
                FlowError::MissingParameter("Amount is required for ERC20 approval".to_string())
            })?;
            IERC20::approveCall {
                spender: request.spender,
                amount,
            }
            .abi_encode()
            .into()
        }
        TokenStandard::Erc721 => {
            tracing::warn!(
                token = %request.token,
                spender = %request.spender,
                "Granting operator approval over all ERC721 holdings"
            );
            IERC721::setApprovalForAllCall {
                operator: request.spender,
                approved: true,
            }
            .abi_encode()
            .into()
        }
        TokenStandard::Erc1155 => {
            tracing::warn!(
                token = %request.token,
                spender = %request.spender,
                "Granting operator approval over all ERC1155 holdings"
            );
            IERC1155::setApprovalForAllCall {
                operator: request.spender,
                approved: true,
            }
            .abi_encode()
            .into()
        }
        TokenStandard::Native => {
            return Err(FlowError::UnsupportedOperation(
                "NATIVE does not require approval".to_string(),
            ))
        }
    };

    // Approvals are written directly, without a separate simulation step.
    let submission = SimulatedRequest {
        request: ContractRequest {
            from: account,
            to: request.token,
            input: calldata,
            value: None,
        },
        result: Bytes::new(),
    };

    let hash = writer.write_contract(submission).await?;
    tracing::info!(
        tx_hash = %hash,
        standard = %request.standard,
        token = %request.token,
        spender = %request.spender,
        "Approval submitted"
    );
    Ok(hash)
}
