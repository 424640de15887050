//! Target call execution: simulate, then submit exactly what was simulated.

use alloy::primitives::{Address, TxHash, U256};

use crate::blockchain::abi::TargetCall;
use crate::blockchain::client::{ChainReader, ChainWriter};
use crate::blockchain::types::{ChainError, ContractRequest};
use crate::flow::types::{FlowError, FlowResult};

/// Simulate `call` from `account` and, if it would succeed, submit it.
///
/// Returns the submitted transaction hash.
pub async fn execute_contract_function(
    reader: Option<&dyn ChainReader>,
    writer: Option<&dyn ChainWriter>,
    call: &TargetCall,
    account: Address,
    value: Option<U256>,
) -> FlowResult<TxHash> {
    let (reader, writer) = match (reader, writer) {
        (Some(reader), Some(writer)) => (reader, writer),
        _ => {
            return Err(FlowError::MissingContext(
                "Wallet or Public client not available".to_string(),
            ))
        }
    };

    let request = ContractRequest {
        from: account,
        to: call.contract,
        input: call.calldata.clone(),
        value,
    };

    let simulated = reader.simulate_contract(request).await.map_err(|e| {
        tracing::warn!(contract = %call.contract, function = %call.function, error = %e, "Simulation failed");
        execution_error(e)
    })?;

    tracing::debug!(
        contract = %call.contract,
        function = %call.function,
        "Simulation succeeded, submitting"
    );

    let hash = writer.write_contract(simulated).await.map_err(|e| {
        tracing::warn!(contract = %call.contract, function = %call.function, error = %e, "Submission failed");
        execution_error(e)
    })?;

    tracing::info!(
        tx_hash = %hash,
        contract = %call.contract,
        function = %call.function,
        "Execution submitted"
    );
    Ok(hash)
}

fn execution_error(err: ChainError) -> FlowError {
    let revert_reason = match &err {
        ChainError::CallReverted { reason } => reason.clone(),
        _ => None,
    };
    FlowError::Execution {
        message: err.to_string(),
        revert_reason,
    }
}
