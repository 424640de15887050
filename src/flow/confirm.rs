//! Waiting for a transaction to reach a confirmation depth.

use alloy::primitives::TxHash;
use std::time::Duration;
use tokio::time::{sleep, timeout};

use crate::blockchain::client::ChainReader;
use crate::blockchain::types::TxStatus;
use crate::config::ConfirmationConfig;
use crate::flow::types::{FlowError, FlowResult};
use crate::observability::metrics;

/// How to poll while confirming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmOptions {
    /// Fixed sleep between chain-head polls.
    pub poll_interval: Duration,
    /// Wall-clock limit. `None` waits as long as it takes.
    pub timeout: Option<Duration>,
}

impl Default for ConfirmOptions {
    fn default() -> Self {
        ConfirmOptions::from(&ConfirmationConfig::default())
    }
}

impl From<&ConfirmationConfig> for ConfirmOptions {
    fn from(config: &ConfirmationConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            timeout: config.timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Wait until `hash` is mined and `depth - 1` further blocks sit on top of it.
///
/// A depth of 0 is treated as 1. Reverted receipts fail at any depth.
pub async fn confirm_transaction(
    hash: TxHash,
    depth: u64,
    reader: &dyn ChainReader,
    options: ConfirmOptions,
) -> FlowResult<()> {
    let wait = wait_for_depth(hash, depth.max(1), reader, options.poll_interval);

    match options.timeout {
        Some(limit) => match timeout(limit, wait).await {
            Ok(result) => result,
            Err(_) => Err(FlowError::Confirmation(format!(
                "timed out after {}s waiting for {}",
                limit.as_secs(),
                hash
            ))),
        },
        None => wait.await,
    }
}

async fn wait_for_depth(
    hash: TxHash,
    depth: u64,
    reader: &dyn ChainReader,
    poll_interval: Duration,
) -> FlowResult<()> {
    let receipt = reader
        .wait_for_transaction_receipt(hash, 1)
        .await
        .map_err(|e| FlowError::Confirmation(e.to_string()))?;

    if receipt.status == TxStatus::Reverted {
        tracing::warn!(tx_hash = %hash, block = receipt.block_number, "Transaction reverted");
        return Err(FlowError::Reverted(hash));
    }

    if depth == 1 {
        tracing::info!(tx_hash = %hash, block = receipt.block_number, "Transaction confirmed");
        return Ok(());
    }

    let target = receipt.block_number.saturating_add(depth - 1);
    loop {
        metrics::record_confirmation_poll();
        let head = reader
            .get_block_number()
            .await
            .map_err(|e| FlowError::Confirmation(e.to_string()))?;

        if head >= target {
            tracing::info!(
                tx_hash = %hash,
                block = receipt.block_number,
                head,
                depth,
                "Transaction confirmed"
            );
            return Ok(());
        }

        tracing::debug!(tx_hash = %hash, head, target, "Waiting for confirmations");
        sleep(poll_interval).await;
    }
}
