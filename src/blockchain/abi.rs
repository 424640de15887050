//! Token standard interfaces and call encoding helpers.

use alloy::dyn_abi::{DynSolValue, JsonAbiExt, Specifier};
use alloy::json_abi::Function;
use alloy::primitives::{Address, Bytes};
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::blockchain::types::{ChainError, ChainResult};

sol! {
    /// Subset of ERC-20 used for allowance management.
    #[derive(Debug, PartialEq, Eq)]
    interface IERC20 {
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function balanceOf(address account) external view returns (uint256);
    }

    /// Subset of ERC-721 used for approval management.
    #[derive(Debug, PartialEq, Eq)]
    interface IERC721 {
        function getApproved(uint256 tokenId) external view returns (address);
        function isApprovedForAll(address owner, address operator) external view returns (bool);
        function setApprovalForAll(address operator, bool approved) external;
    }

    /// Subset of ERC-1155 used for approval management.
    #[derive(Debug, PartialEq, Eq)]
    interface IERC1155 {
        function isApprovedForAll(address account, address operator) external view returns (bool);
        function setApprovalForAll(address operator, bool approved) external;
    }
}

/// A contract function call: target address, function name and encoded arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetCall {
    /// Contract to call.
    pub contract: Address,
    /// Human-readable function signature, used for logging.
    pub function: String,
    /// Full calldata (selector + ABI-encoded arguments).
    pub calldata: Bytes,
}

impl TargetCall {
    /// Build from a statically typed `sol!` call.
    pub fn from_sol_call<C: SolCall>(contract: Address, call: &C) -> Self {
        Self {
            contract,
            function: C::SIGNATURE.to_string(),
            calldata: call.abi_encode().into(),
        }
    }

    /// Build from a signature such as `withdraw(uint256)` and already typed values.
    pub fn from_signature(
        contract: Address,
        signature: &str,
        args: &[DynSolValue],
    ) -> ChainResult<Self> {
        let function = parse_function(signature)?;
        let calldata = function
            .abi_encode_input(args)
            .map_err(|e| ChainError::Decode(format!("cannot encode arguments for '{}': {}", signature, e)))?;

        Ok(Self {
            contract,
            function: function.signature(),
            calldata: calldata.into(),
        })
    }

    /// Build from a signature and string arguments, coercing each string to
    /// the declared parameter type.
    pub fn from_signature_str(
        contract: Address,
        signature: &str,
        args: &[String],
    ) -> ChainResult<Self> {
        let function = parse_function(signature)?;
        if function.inputs.len() != args.len() {
            return Err(ChainError::Decode(format!(
                "'{}' expects {} arguments, got {}",
                signature,
                function.inputs.len(),
                args.len()
            )));
        }

        let values = function
            .inputs
            .iter()
            .zip(args)
            .map(|(param, raw)| {
                let ty = param
                    .resolve()
                    .map_err(|e| ChainError::Decode(format!("bad parameter type '{}': {}", param.ty, e)))?;
                ty.coerce_str(raw)
                    .map_err(|e| ChainError::Decode(format!("cannot parse '{}' as {}: {}", raw, param.ty, e)))
            })
            .collect::<ChainResult<Vec<_>>>()?;

        Self::from_signature(contract, signature, &values)
    }

    /// The 4-byte function selector.
    pub fn selector(&self) -> Option<[u8; 4]> {
        self.calldata.get(..4).and_then(|s| s.try_into().ok())
    }
}

fn parse_function(signature: &str) -> ChainResult<Function> {
    Function::parse(signature)
        .map_err(|e| ChainError::Decode(format!("invalid function signature '{}': {}", signature, e)))
}
