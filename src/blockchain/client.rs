//! Chain access: the read/write interfaces the flow depends on, and their
//! alloy-backed implementation.
//!
//! # Responsibilities
//! - Define `ChainReader` (contract reads, balances, block height, receipts,
//!   call simulation) and `ChainWriter` (transaction submission)
//! - Connect to JSON-RPC endpoints with per-call timeouts
//! - Fail over across read providers
//! - Decode revert reasons from failed simulations

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionReceipt;
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::TransportError;
use async_trait::async_trait;
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};

use crate::blockchain::types::{
    ChainConfig, ChainError, ChainId, ChainResult, ContractRequest, ReceiptSummary,
    SimulatedRequest, TxStatus,
};
use crate::observability::metrics;

/// Read-only chain queries.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Execute a read-only contract call and return the raw return data.
    async fn read_contract(&self, address: Address, calldata: Bytes) -> ChainResult<Bytes>;

    /// Native balance of an address.
    async fn get_balance(&self, address: Address) -> ChainResult<U256>;

    /// Current chain head.
    async fn get_block_number(&self) -> ChainResult<u64>;

    /// Wait until the transaction has been mined with at least
    /// `confirmations` blocks on top (1 = mined).
    async fn wait_for_transaction_receipt(
        &self,
        hash: TxHash,
        confirmations: u64,
    ) -> ChainResult<ReceiptSummary>;

    /// Dry-run a contract call against current state.
    async fn simulate_contract(&self, request: ContractRequest) -> ChainResult<SimulatedRequest>;
}

/// Transaction submission.
#[async_trait]
pub trait ChainWriter: Send + Sync {
    /// Submit a previously simulated request and return its hash.
    async fn write_contract(&self, request: SimulatedRequest) -> ChainResult<TxHash>;
}

type DynProvider = Arc<dyn Provider + Send + Sync>;

/// Alloy-backed chain client with read failover and an optional signer.
#[derive(Clone)]
pub struct AlloyChainClient {
    /// Read providers (primary + failovers).
    providers: Vec<DynProvider>,
    /// Signing provider, present when a wallet is attached.
    signer: Option<DynProvider>,
    /// Configuration.
    config: ChainConfig,
    /// Request timeout duration.
    timeout_duration: Duration,
}

impl AlloyChainClient {
    /// Create a read-only client.
    pub fn new(config: ChainConfig) -> ChainResult<Self> {
        let timeout_duration = Duration::from_secs(config.rpc_timeout_secs);
        let mut providers = Vec::new();

        let primary_url = parse_url(&config.rpc_url)?;
        providers.push(Arc::new(ProviderBuilder::new().connect_http(primary_url)) as DynProvider);

        for url_str in &config.failover_urls {
            if let Ok(url) = url_str.parse() {
                providers.push(Arc::new(ProviderBuilder::new().connect_http(url)) as DynProvider);
            } else {
                tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL");
            }
        }

        tracing::info!(
            rpc_url = %config.rpc_url,
            chain_id = config.chain_id,
            failovers = providers.len() - 1,
            "Chain client initialized"
        );

        Ok(Self {
            providers,
            signer: None,
            config,
            timeout_duration,
        })
    }

    /// Attach a signer. Writes always go through the primary RPC URL.
    pub fn with_signer(mut self, signer: PrivateKeySigner) -> ChainResult<Self> {
        let url = parse_url(&self.config.rpc_url)?;
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url);
        self.signer = Some(Arc::new(provider) as DynProvider);
        Ok(self)
    }

    /// Whether a signer is attached.
    pub fn has_signer(&self) -> bool {
        self.signer.is_some()
    }

    /// Verify the connected chain ID matches configuration.
    pub async fn verify_chain_id(&self) -> ChainResult<()> {
        let chain_id = self.get_chain_id().await?;
        if chain_id.0 != self.config.chain_id {
            return Err(ChainError::ChainMismatch {
                expected: self.config.chain_id,
                actual: chain_id.0,
            });
        }
        Ok(())
    }

    /// Get the chain ID from the RPC.
    pub async fn get_chain_id(&self) -> ChainResult<ChainId> {
        self.with_failover("get_chain_id", |p| async move { p.get_chain_id().await })
            .await
            .map(ChainId)
    }

    /// Check if the chain is reachable.
    pub async fn is_healthy(&self) -> bool {
        let healthy = self.get_block_number().await.is_ok();
        metrics::record_rpc_health(healthy);
        healthy
    }

    /// Get the configuration.
    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Run a read against each provider in turn until one answers.
    async fn with_failover<T, F, Fut>(&self, op: &'static str, f: F) -> ChainResult<T>
    where
        F: Fn(DynProvider) -> Fut,
        Fut: IntoFuture<Output = Result<T, TransportError>>,
    {
        let mut last_error = None;
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, f(provider.clone())).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => {
                    tracing::warn!(provider_idx = i, op, error = %e, "RPC error, trying next provider");
                    last_error = Some(e.to_string());
                }
                Err(_) => {
                    tracing::warn!(provider_idx = i, op, "RPC timeout, trying next provider");
                    last_error = Some(format!("timeout after {}s", self.config.rpc_timeout_secs));
                }
            }
        }
        Err(ChainError::Rpc(format!(
            "All RPC providers failed to {}: {}",
            op,
            last_error.unwrap_or_default()
        )))
    }

    async fn get_transaction_receipt(&self, hash: TxHash) -> ChainResult<Option<TransactionReceipt>> {
        self.with_failover("get_transaction_receipt", |p| async move {
            p.get_transaction_receipt(hash).await
        })
        .await
    }

    fn signer(&self) -> ChainResult<&DynProvider> {
        self.signer.as_ref().ok_or(ChainError::NoSigner)
    }
}

#[async_trait]
impl ChainReader for AlloyChainClient {
    async fn read_contract(&self, address: Address, calldata: Bytes) -> ChainResult<Bytes> {
        let request = ContractRequest {
            from: Address::ZERO,
            to: address,
            input: calldata,
            value: None,
        };
        let tx = request.to_transaction_request();
        self.with_failover("read_contract", |p| {
            let tx = tx.clone();
            async move { p.call(tx).await }
        })
        .await
    }

    async fn get_balance(&self, address: Address) -> ChainResult<U256> {
        self.with_failover("get_balance", |p| async move { p.get_balance(address).await })
            .await
    }

    async fn get_block_number(&self) -> ChainResult<u64> {
        self.with_failover("get_block_number", |p| async move { p.get_block_number().await })
            .await
    }

    async fn wait_for_transaction_receipt(
        &self,
        hash: TxHash,
        confirmations: u64,
    ) -> ChainResult<ReceiptSummary> {
        let poll_interval = Duration::from_millis(self.config.receipt_poll_interval_ms);
        let required = confirmations.max(1);

        loop {
            let receipt = match self.get_transaction_receipt(hash).await? {
                Some(r) => r,
                None => {
                    tracing::debug!(tx_hash = %hash, "Transaction pending");
                    sleep(poll_interval).await;
                    continue;
                }
            };

            let tx_block = receipt.block_number.unwrap_or_default();
            let status = if receipt.status() {
                TxStatus::Success
            } else {
                TxStatus::Reverted
            };

            // Reverted receipts are final regardless of depth.
            if status == TxStatus::Reverted || required == 1 {
                return Ok(ReceiptSummary {
                    status,
                    block_number: tx_block,
                });
            }

            let head = self.get_block_number().await?;
            if head.saturating_sub(tx_block) + 1 >= required {
                return Ok(ReceiptSummary {
                    status,
                    block_number: tx_block,
                });
            }

            tracing::debug!(tx_hash = %hash, head, tx_block, required, "Waiting for receipt depth");
            sleep(poll_interval).await;
        }
    }

    async fn simulate_contract(&self, request: ContractRequest) -> ChainResult<SimulatedRequest> {
        let tx = request.to_transaction_request();
        let fut = self.providers[0].call(tx);
        match timeout(self.timeout_duration, fut).await {
            Ok(Ok(result)) => Ok(SimulatedRequest { request, result }),
            Ok(Err(e)) => Err(revert_or_rpc(e)),
            Err(_) => Err(ChainError::Timeout(self.config.rpc_timeout_secs)),
        }
    }
}

#[async_trait]
impl ChainWriter for AlloyChainClient {
    async fn write_contract(&self, simulated: SimulatedRequest) -> ChainResult<TxHash> {
        let provider = self.signer()?;
        let tx = simulated.request.to_transaction_request();

        let fut = provider.send_transaction(tx);
        match timeout(self.timeout_duration, fut).await {
            Ok(Ok(pending)) => Ok(*pending.tx_hash()),
            Ok(Err(e)) => Err(revert_or_rpc(e)),
            Err(_) => Err(ChainError::Timeout(self.config.rpc_timeout_secs)),
        }
    }
}

impl std::fmt::Debug for AlloyChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlloyChainClient")
            .field("rpc_url", &self.config.rpc_url)
            .field("chain_id", &self.config.chain_id)
            .field("timeout_secs", &self.config.rpc_timeout_secs)
            .field("has_signer", &self.signer.is_some())
            .finish()
    }
}

fn parse_url(raw: &str) -> ChainResult<url::Url> {
    raw.parse()
        .map_err(|e| ChainError::Rpc(format!("Invalid RPC URL '{}': {}", raw, e)))
}

/// Classify a transport error, decoding revert data when the node returned any.
fn revert_or_rpc(err: TransportError) -> ChainError {
    if let Some(payload) = err.as_error_resp() {
        if let Some(data) = payload.as_revert_data() {
            return ChainError::CallReverted {
                reason: decode_revert_reason(&data),
            };
        }
        if payload.message.contains("revert") {
            return ChainError::CallReverted { reason: None };
        }
    }
    ChainError::Rpc(err.to_string())
}

/// Decode `Error(string)` / `Panic(uint256)` revert payloads.
pub fn decode_revert_reason(data: &[u8]) -> Option<String> {
    alloy::sol_types::decode_revert_reason(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::sol_types::{Revert, SolError};

    fn test_config() -> ChainConfig {
        ChainConfig {
            rpc_url: "http://localhost:8545".to_string(),
            failover_urls: Vec::new(),
            chain_id: 31337, // Anvil default
            rpc_timeout_secs: 1,
            receipt_poll_interval_ms: 100,
        }
    }

    #[test]
    fn test_client_creation() {
        let client = AlloyChainClient::new(test_config()).unwrap();
        assert!(!client.has_signer());
    }

    #[test]
    fn test_invalid_primary_url() {
        let mut config = test_config();
        config.rpc_url = "not a url".to_string();
        let err = AlloyChainClient::new(config).unwrap_err();
        assert!(err.to_string().contains("Invalid RPC URL"));
    }

    #[test]
    fn test_invalid_failover_is_skipped() {
        let mut config = test_config();
        config.failover_urls.push("::bad::".to_string());
        config.failover_urls.push("http://localhost:8546".to_string());
        let client = AlloyChainClient::new(config).unwrap();
        assert_eq!(client.providers.len(), 2);
    }

    #[tokio::test]
    async fn test_write_without_signer() {
        let client = AlloyChainClient::new(test_config()).unwrap();
        let simulated = SimulatedRequest {
            request: ContractRequest {
                from: Address::ZERO,
                to: Address::ZERO,
                input: Bytes::new(),
                value: None,
            },
            result: Bytes::new(),
        };
        let err = client.write_contract(simulated).await.unwrap_err();
        assert!(matches!(err, ChainError::NoSigner));
    }

    #[test]
    fn test_decode_revert_reason() {
        let data = Revert {
            reason: "ERC20: insufficient allowance".to_string(),
        }
        .abi_encode();
        let reason = decode_revert_reason(&data).unwrap();
        assert!(reason.contains("ERC20: insufficient allowance"));
    }
}
