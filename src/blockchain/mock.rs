//! In-memory chain double for unit tests.

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::sol_types::{SolCall, SolValue};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::blockchain::abi::{IERC20, IERC721};
use crate::blockchain::client::{ChainReader, ChainWriter};
use crate::blockchain::types::{
    ChainError, ChainResult, ContractRequest, ReceiptSummary, SimulatedRequest, TxStatus,
};

/// Scripted chain state. Unscripted queues fall back to the defaults.
pub struct MockChain {
    pub allowance: U256,
    pub approved: Address,
    pub operator: bool,
    pub balance: U256,
    pub receipt: ChainResult<ReceiptSummary>,
    pub heads: Mutex<VecDeque<ChainResult<u64>>>,
    pub simulate_error: Option<ChainError>,
    pub write_error: Option<String>,
    pub reads: Mutex<Vec<(Address, Bytes)>>,
    pub receipt_waits: Mutex<Vec<(TxHash, u64)>>,
    pub head_polls: Mutex<u32>,
    pub simulated: Mutex<Vec<ContractRequest>>,
    pub written: Mutex<Vec<SimulatedRequest>>,
}

impl Default for MockChain {
    fn default() -> Self {
        Self {
            allowance: U256::ZERO,
            approved: Address::ZERO,
            operator: false,
            balance: U256::ZERO,
            receipt: Ok(ReceiptSummary {
                status: TxStatus::Success,
                block_number: 100,
            }),
            heads: Mutex::new(VecDeque::new()),
            simulate_error: None,
            write_error: None,
            reads: Mutex::new(Vec::new()),
            receipt_waits: Mutex::new(Vec::new()),
            head_polls: Mutex::new(0),
            simulated: Mutex::new(Vec::new()),
            written: Mutex::new(Vec::new()),
        }
    }
}

impl MockChain {
    pub fn with_heads(self, heads: impl IntoIterator<Item = ChainResult<u64>>) -> Self {
        *self.heads.lock().unwrap() = heads.into_iter().collect();
        self
    }

    pub fn written_calldata(&self) -> Vec<Bytes> {
        self.written
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.request.input.clone())
            .collect()
    }

    pub fn head_polls(&self) -> u32 {
        *self.head_polls.lock().unwrap()
    }
}

fn selector(data: &[u8]) -> [u8; 4] {
    let mut out = [0u8; 4];
    out.copy_from_slice(&data[..4]);
    out
}

#[async_trait]
impl ChainReader for MockChain {
    async fn read_contract(&self, address: Address, calldata: Bytes) -> ChainResult<Bytes> {
        self.reads.lock().unwrap().push((address, calldata.clone()));
        let out = match selector(&calldata) {
            IERC20::allowanceCall::SELECTOR => self.allowance.abi_encode(),
            IERC20::balanceOfCall::SELECTOR => self.balance.abi_encode(),
            IERC721::getApprovedCall::SELECTOR => self.approved.abi_encode(),
            // ERC721 and ERC1155 share this selector.
            IERC721::isApprovedForAllCall::SELECTOR => self.operator.abi_encode(),
            other => {
                return Err(ChainError::Rpc(format!("unexpected selector {:?}", other)));
            }
        };
        Ok(out.into())
    }

    async fn get_balance(&self, _address: Address) -> ChainResult<U256> {
        Ok(self.balance)
    }

    async fn get_block_number(&self) -> ChainResult<u64> {
        *self.head_polls.lock().unwrap() += 1;
        self.heads
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ChainError::Rpc("no head scripted".to_string())))
    }

    async fn wait_for_transaction_receipt(
        &self,
        hash: TxHash,
        confirmations: u64,
    ) -> ChainResult<ReceiptSummary> {
        self.receipt_waits.lock().unwrap().push((hash, confirmations));
        match &self.receipt {
            Ok(r) => Ok(*r),
            Err(e) => Err(ChainError::Rpc(e.to_string())),
        }
    }

    async fn simulate_contract(&self, request: ContractRequest) -> ChainResult<SimulatedRequest> {
        self.simulated.lock().unwrap().push(request.clone());
        match &self.simulate_error {
            Some(ChainError::CallReverted { reason }) => Err(ChainError::CallReverted {
                reason: reason.clone(),
            }),
            Some(e) => Err(ChainError::Rpc(e.to_string())),
            None => Ok(SimulatedRequest {
                request,
                result: Bytes::new(),
            }),
        }
    }
}

#[async_trait]
impl ChainWriter for MockChain {
    async fn write_contract(&self, request: SimulatedRequest) -> ChainResult<TxHash> {
        if let Some(msg) = &self.write_error {
            return Err(ChainError::Rpc(msg.clone()));
        }
        let mut written = self.written.lock().unwrap();
        written.push(request);
        Ok(TxHash::with_last_byte(written.len() as u8))
    }
}
