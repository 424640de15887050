//! Shared utilities for flow integration tests.

#![allow(dead_code)]

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::sol_types::{SolCall, SolValue};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use tokio::sync::{watch, Notify};

use evm_txflow::blockchain::abi::{IERC20, IERC721};
use evm_txflow::blockchain::{
    ChainError, ChainReader, ChainResult, ChainWriter, ContractRequest, LocalSession,
    ReceiptSummary, SimulatedRequest, TargetCall, TxStatus,
};
use evm_txflow::flow::{ConfirmOptions, FlowParams, FlowState, TokenStandard, TransactionFlow};

pub const TOKEN: Address = Address::repeat_byte(0x11);
pub const SPENDER: Address = Address::repeat_byte(0x22);
pub const TARGET: Address = Address::repeat_byte(0x33);
pub const ACCOUNT: Address = Address::repeat_byte(0x44);
pub const RECEIPT_BLOCK: u64 = 100;

/// A chain interaction, in the order the flow made it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Allowance,
    GetApproved,
    IsApprovedForAll,
    Head,
    Receipt(TxHash),
    Simulate(ContractRequest),
    Write { to: Address, input: Bytes },
}

/// A call plus the flow state observed when it was made.
#[derive(Debug, Clone)]
pub struct Event {
    pub call: Call,
    pub state: Option<FlowState>,
}

/// Scripted chain that records every call with the flow state at that moment.
#[derive(Default)]
pub struct ScriptedChain {
    pub allowance: U256,
    pub approved: Address,
    pub operator: bool,
    /// Writes to this address fail with the given message.
    pub fail_writes_to: Option<(Address, String)>,
    /// Simulation reverts with this reason.
    pub simulate_revert: Option<String>,
    /// Receipts for these hashes report a revert.
    pub reverted: Vec<TxHash>,
    /// Held before returning contract reads.
    pub read_gate: Option<Arc<Notify>>,
    /// Held before returning receipts.
    pub receipt_gate: Option<Arc<Notify>>,
    /// State feed of the flow under test, set by `observe`.
    pub observer: OnceLock<watch::Receiver<FlowState>>,
    pub events: Mutex<Vec<Event>>,
    /// Head polls so far; the chain head is `RECEIPT_BLOCK + 1 + head`.
    pub head: AtomicU64,
    /// Successful writes so far; the next hash ends in `writes + 1`.
    pub writes: AtomicU64,
}

impl ScriptedChain {
    /// Attach the flow whose state each event should capture.
    pub fn observe(&self, flow: &TransactionFlow) {
        let _ = self.observer.set(flow.subscribe());
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.events().into_iter().map(|e| e.call).collect()
    }

    pub fn writes_to(&self, to: Address) -> Vec<Bytes> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Write { to: t, input } if t == to => Some(input),
                _ => None,
            })
            .collect()
    }

    pub fn simulations(&self) -> Vec<ContractRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Simulate(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        let state = self.observer.get().map(|rx| rx.borrow().clone());
        self.events.lock().unwrap().push(Event { call, state });
    }
}

#[async_trait]
impl ChainReader for ScriptedChain {
    async fn read_contract(&self, _address: Address, calldata: Bytes) -> ChainResult<Bytes> {
        let selector: [u8; 4] = calldata[..4].try_into().unwrap();
        let (call, out) = match selector {
            IERC20::allowanceCall::SELECTOR => (Call::Allowance, self.allowance.abi_encode()),
            IERC721::getApprovedCall::SELECTOR => (Call::GetApproved, self.approved.abi_encode()),
            IERC721::isApprovedForAllCall::SELECTOR => {
                (Call::IsApprovedForAll, self.operator.abi_encode())
            }
            other => return Err(ChainError::Rpc(format!("unexpected selector {:?}", other))),
        };
        self.record(call);
        if let Some(gate) = &self.read_gate {
            gate.notified().await;
        }
        Ok(out.into())
    }

    async fn get_balance(&self, _address: Address) -> ChainResult<U256> {
        Ok(U256::ZERO)
    }

    async fn get_block_number(&self) -> ChainResult<u64> {
        self.record(Call::Head);
        Ok(RECEIPT_BLOCK + 1 + self.head.fetch_add(1, Ordering::SeqCst))
    }

    async fn wait_for_transaction_receipt(
        &self,
        hash: TxHash,
        _confirmations: u64,
    ) -> ChainResult<ReceiptSummary> {
        self.record(Call::Receipt(hash));
        if let Some(gate) = &self.receipt_gate {
            gate.notified().await;
        }
        let status = if self.reverted.contains(&hash) {
            TxStatus::Reverted
        } else {
            TxStatus::Success
        };
        Ok(ReceiptSummary {
            status,
            block_number: RECEIPT_BLOCK,
        })
    }

    async fn simulate_contract(&self, request: ContractRequest) -> ChainResult<SimulatedRequest> {
        self.record(Call::Simulate(request.clone()));
        if let Some(reason) = &self.simulate_revert {
            return Err(ChainError::CallReverted {
                reason: Some(reason.clone()),
            });
        }
        Ok(SimulatedRequest {
            request,
            result: Bytes::new(),
        })
    }
}

#[async_trait]
impl ChainWriter for ScriptedChain {
    async fn write_contract(&self, request: SimulatedRequest) -> ChainResult<TxHash> {
        self.record(Call::Write {
            to: request.request.to,
            input: request.request.input.clone(),
        });
        if let Some((to, message)) = &self.fail_writes_to {
            if *to == request.request.to {
                return Err(ChainError::Rpc(message.clone()));
            }
        }
        let n = self.writes.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(TxHash::with_last_byte(n as u8))
    }
}

/// The call every flow in these tests executes.
pub fn target() -> TargetCall {
    TargetCall::from_signature_str(TARGET, "deposit(uint256)", &["100".to_string()]).unwrap()
}

/// Parameters with spender and amount set.
pub fn params(standard: TokenStandard) -> FlowParams {
    FlowParams::new(standard, TOKEN, target())
        .with_spender(SPENDER)
        .with_amount(U256::from(100))
        .with_token_id(U256::from(7))
}

/// Fast confirmation polling.
pub fn fast_confirm() -> ConfirmOptions {
    ConfirmOptions {
        poll_interval: Duration::from_millis(1),
        timeout: Some(Duration::from_secs(5)),
    }
}

/// A signing flow over `chain`, wired so the chain records flow state.
pub fn signing_flow(chain: &Arc<ScriptedChain>, params: FlowParams) -> TransactionFlow {
    let session = LocalSession::signing(chain.clone(), ACCOUNT);
    let flow = TransactionFlow::new(Arc::new(session), params).with_confirm_options(fast_confirm());
    chain.observe(&flow);
    flow
}
