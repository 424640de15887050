//! Wallet sessions and the provider context they are built from.
//!
//! A `WalletSession` is what the flow sees of a connected wallet: an
//! account, a connection status, and the read/write interfaces. Any wallet
//! connector can back a flow by implementing it.
//!
//! # Lifecycle
//! ```text
//! FlowConfig (loaded once at startup)
//!     → ProviderContext::new (constructed once, passed in explicitly)
//!     → ProviderContext::connect → LocalSession
//!     → shared via Arc with every TransactionFlow
//! ```
//! The context lives until application exit; nothing is held in globals.

use alloy::primitives::Address;
use std::sync::Arc;

use crate::blockchain::client::{AlloyChainClient, ChainReader, ChainWriter};
use crate::blockchain::types::{ChainResult, ConnectionStatus};
use crate::blockchain::wallet::Wallet;
use crate::config::FlowConfig;

/// A connected (or not) wallet as seen by a flow.
pub trait WalletSession: Send + Sync {
    /// Connected account, if any.
    fn account(&self) -> Option<Address>;

    /// Current connection status.
    fn connection_status(&self) -> ConnectionStatus;

    /// Read interface, if a connection is live.
    fn reader(&self) -> Option<Arc<dyn ChainReader>>;

    /// Write interface, if a signer is available.
    fn writer(&self) -> Option<Arc<dyn ChainWriter>>;

    /// Whether a signer is available.
    fn is_writer_ready(&self) -> bool {
        self.writer().is_some()
    }

    /// Whether account, reader and writer are all present.
    fn is_ready(&self) -> bool {
        self.account().is_some() && self.reader().is_some() && self.writer().is_some()
    }
}

/// Explicitly constructed application-wide provider configuration.
///
/// Replaces process-wide client singletons: build one at startup and pass
/// it to whatever needs a session.
#[derive(Debug, Clone)]
pub struct ProviderContext {
    config: FlowConfig,
}

impl ProviderContext {
    pub fn new(config: FlowConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Connect a session.
    ///
    /// With the configured key variable set, the session can sign. Without
    /// it, the session is read-only and uses `wallet.account` (if any) as
    /// the account.
    pub fn connect(&self) -> ChainResult<LocalSession> {
        let client = AlloyChainClient::new(self.config.chain.clone())?;

        let key_env = &self.config.wallet.private_key_env;
        if std::env::var_os(key_env).is_some() {
            let wallet = Wallet::from_env(key_env, self.config.chain.chain_id)?;
            let account = wallet.address();
            let client = client.with_signer(wallet.signer())?;
            return Ok(LocalSession::signing(Arc::new(client), account));
        }

        let account = self
            .config
            .wallet
            .account
            .as_deref()
            .and_then(|a| a.parse().ok());
        tracing::info!(
            env = %key_env,
            account = ?account,
            "No signing key in environment, session is read-only"
        );
        Ok(LocalSession::read_only(Arc::new(client), account))
    }
}

/// Session backed by a local chain client.
#[derive(Clone)]
pub struct LocalSession {
    account: Option<Address>,
    reader: Arc<dyn ChainReader>,
    writer: Option<Arc<dyn ChainWriter>>,
}

impl LocalSession {
    /// A session that can both read and sign.
    pub fn signing<C>(client: Arc<C>, account: Address) -> Self
    where
        C: ChainReader + ChainWriter + 'static,
    {
        Self {
            account: Some(account),
            reader: client.clone(),
            writer: Some(client),
        }
    }

    /// A session that can only read.
    pub fn read_only(reader: Arc<dyn ChainReader>, account: Option<Address>) -> Self {
        Self {
            account,
            reader,
            writer: None,
        }
    }

    /// A session with independently supplied interfaces.
    pub fn from_parts(
        account: Option<Address>,
        reader: Arc<dyn ChainReader>,
        writer: Option<Arc<dyn ChainWriter>>,
    ) -> Self {
        Self {
            account,
            reader,
            writer,
        }
    }
}

impl WalletSession for LocalSession {
    fn account(&self) -> Option<Address> {
        self.account
    }

    fn connection_status(&self) -> ConnectionStatus {
        if self.account.is_some() {
            ConnectionStatus::Connected
        } else {
            ConnectionStatus::Disconnected
        }
    }

    fn reader(&self) -> Option<Arc<dyn ChainReader>> {
        Some(self.reader.clone())
    }

    fn writer(&self) -> Option<Arc<dyn ChainWriter>> {
        self.writer.clone()
    }
}

impl std::fmt::Debug for LocalSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSession")
            .field("account", &self.account)
            .field("has_writer", &self.writer.is_some())
            .finish()
    }
}

/// A session with nothing connected.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisconnectedSession;

impl WalletSession for DisconnectedSession {
    fn account(&self) -> Option<Address> {
        None
    }

    fn connection_status(&self) -> ConnectionStatus {
        ConnectionStatus::Disconnected
    }

    fn reader(&self) -> Option<Arc<dyn ChainReader>> {
        None
    }

    fn writer(&self) -> Option<Arc<dyn ChainWriter>> {
        None
    }
}
