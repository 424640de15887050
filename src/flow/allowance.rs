//! Allowance checking per token standard.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::{SolCall, SolType, SolValue};

use crate::blockchain::abi::{IERC1155, IERC20, IERC721};
use crate::blockchain::client::ChainReader;
use crate::blockchain::types::ChainError;
use crate::flow::types::{FlowError, FlowResult, TokenStandard};

/// Inputs to an allowance check.
#[derive(Debug, Clone, Copy)]
pub struct AllowanceQuery {
    pub standard: TokenStandard,
    pub token: Address,
    pub spender: Address,
    pub owner: Option<Address>,
    pub token_id: Option<U256>,
    pub amount: Option<U256>,
}

/// Whether `spender` may already spend what the flow needs from `owner`.
///
/// - ERC20: `allowance(owner, spender) >= amount` (absent amount is zero)
/// - ERC721: single-item approval equals spender, or blanket operator approval
/// - ERC1155: blanket operator approval
/// - NATIVE: always sufficient, no reads
pub async fn check_allowance(
    query: &AllowanceQuery,
    reader: Option<&dyn ChainReader>,
) -> FlowResult<bool> {
    let (owner, reader) = match (query.owner, reader) {
        (Some(owner), Some(reader)) => (owner, reader),
        _ => {
            return Err(FlowError::MissingContext(
                "Missing wallet or public client".to_string(),
            ))
        }
    };

    let sufficient = match query.standard {
        TokenStandard::Erc20 => {
            let call = IERC20::allowanceCall {
                owner,
                spender: query.spender,
            };
            let allowance: U256 = read(reader, query.token, &call).await?;
            let needed = query.amount.unwrap_or(U256::ZERO);
            tracing::debug!(%owner, spender = %query.spender, %allowance, %needed, "ERC20 allowance");
            allowance >= needed
        }
        TokenStandard::Erc721 => {
            let token_id = query.token_id.ok_or_else(|| {
                FlowError::MissingParameter("Missing tokenId for ERC721".to_string())
            })?;
            let approved_call = IERC721::getApprovedCall { tokenId: token_id };
            let operator_call = IERC721::isApprovedForAllCall {
                owner,
                operator: query.spender,
            };
            let (approved, is_operator): (Address, bool) = tokio::try_join!(
                read(reader, query.token, &approved_call),
                read(reader, query.token, &operator_call),
            )?;
            tracing::debug!(%owner, spender = %query.spender, %approved, is_operator, "ERC721 approval");
            is_operator || approved == query.spender
        }
        TokenStandard::Erc1155 => {
            let call = IERC1155::isApprovedForAllCall {
                account: owner,
                operator: query.spender,
            };
            let is_operator: bool = read(reader, query.token, &call).await?;
            tracing::debug!(%owner, spender = %query.spender, is_operator, "ERC1155 approval");
            is_operator
        }
        TokenStandard::Native => true,
    };

    Ok(sufficient)
}

/// Read a single-value view function and decode its return.
async fn read<C, T>(reader: &dyn ChainReader, token: Address, call: &C) -> FlowResult<T>
where
    C: SolCall,
    T: SolValue + From<<T::SolType as SolType>::RustType>,
{
    let data: Bytes = reader.read_contract(token, call.abi_encode().into()).await?;
    T::abi_decode(&data).map_err(|e| {
        FlowError::Chain(ChainError::Decode(format!("{}: {}", C::SIGNATURE, e)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::mock::MockChain;

    const TOKEN: Address = Address::repeat_byte(0x11);
    const SPENDER: Address = Address::repeat_byte(0x22);
    const OWNER: Address = Address::repeat_byte(0x44);

    fn query(standard: TokenStandard) -> AllowanceQuery {
        AllowanceQuery {
            standard,
            token: TOKEN,
            spender: SPENDER,
            owner: Some(OWNER),
            token_id: None,
            amount: Some(U256::from(100)),
        }
    }

    #[tokio::test]
    async fn test_erc20_compares_against_amount() {
        let chain = MockChain {
            allowance: U256::from(50),
            ..Default::default()
        };
        assert!(!check_allowance(&query(TokenStandard::Erc20), Some(&chain)).await.unwrap());

        let chain = MockChain {
            allowance: U256::from(100),
            ..Default::default()
        };
        assert!(check_allowance(&query(TokenStandard::Erc20), Some(&chain)).await.unwrap());

        let reads = chain.reads.lock().unwrap();
        assert_eq!(reads.len(), 1);
        assert_eq!(reads[0].0, TOKEN);
        let decoded = IERC20::allowanceCall::abi_decode(&reads[0].1).unwrap();
        assert_eq!(decoded.owner, OWNER);
        assert_eq!(decoded.spender, SPENDER);
    }

    #[tokio::test]
    async fn test_erc20_absent_amount_is_zero() {
        let chain = MockChain::default();
        let mut q = query(TokenStandard::Erc20);
        q.amount = None;
        assert!(check_allowance(&q, Some(&chain)).await.unwrap());
    }

    #[tokio::test]
    async fn test_erc721_item_or_operator() {
        let mut q = query(TokenStandard::Erc721);
        q.token_id = Some(U256::from(7));

        let chain = MockChain {
            approved: SPENDER,
            ..Default::default()
        };
        assert!(check_allowance(&q, Some(&chain)).await.unwrap());

        let chain = MockChain {
            operator: true,
            ..Default::default()
        };
        assert!(check_allowance(&q, Some(&chain)).await.unwrap());

        let chain = MockChain {
            approved: Address::repeat_byte(0x99),
            ..Default::default()
        };
        assert!(!check_allowance(&q, Some(&chain)).await.unwrap());
    }

    #[tokio::test]
    async fn test_erc721_requires_token_id() {
        let chain = MockChain::default();
        let err = check_allowance(&query(TokenStandard::Erc721), Some(&chain))
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::MissingParameter(_)));
        assert!(chain.reads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_erc1155_operator_only() {
        let chain = MockChain {
            operator: true,
            ..Default::default()
        };
        assert!(check_allowance(&query(TokenStandard::Erc1155), Some(&chain)).await.unwrap());

        // Item approval does not exist for ERC1155.
        let chain = MockChain {
            approved: SPENDER,
            ..Default::default()
        };
        assert!(!check_allowance(&query(TokenStandard::Erc1155), Some(&chain)).await.unwrap());
    }

    #[tokio::test]
    async fn test_native_always_sufficient() {
        let chain = MockChain::default();
        let mut q = query(TokenStandard::Native);
        q.amount = Some(U256::MAX);
        assert!(check_allowance(&q, Some(&chain)).await.unwrap());
        assert!(chain.reads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_context() {
        let chain = MockChain::default();
        let mut q = query(TokenStandard::Erc20);
        q.owner = None;
        let err = check_allowance(&q, Some(&chain)).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing wallet or public client");

        let err = check_allowance(&query(TokenStandard::Erc20), None).await.unwrap_err();
        assert!(matches!(err, FlowError::MissingContext(_)));
    }
}
