//! Transaction flow state machine.
//!
//! # States
//! ```text
//! Idle → CheckingAllowance → Ready → WaitingForApproval
//!      → WaitingForApprovalConfirmation → Executing
//!      → WaitingForExecutionConfirmation → Success
//!
//! any state → Error
//! ```
//!
//! # Branches
//! - NATIVE: Idle → Executing (no allowance read, no approval)
//! - allowance sufficient: CheckingAllowance → Executing
//! - allowance insufficient: CheckingAllowance → WaitingForApproval
//! - explicit approval: Idle → Ready → WaitingForApproval, allowance not read
//!
//! # Generations
//! Every `run()` and `reset()` starts a new generation. State writes carry
//! the generation they were issued under and are dropped if it is no longer
//! current, so a reset flow never shows results of an earlier run. A
//! superseded run stops at its next step boundary; I/O already in flight is
//! not cancelled.

use alloy::primitives::{Address, TxHash};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::Instrument;
use uuid::Uuid;

use crate::blockchain::session::WalletSession;
use crate::flow::allowance::{check_allowance, AllowanceQuery};
use crate::flow::approve::{approve, ApprovalRequest};
use crate::flow::confirm::{confirm_transaction, ConfirmOptions};
use crate::flow::execute::execute_contract_function;
use crate::flow::params::FlowParams;
use crate::flow::types::{FlowError, FlowResult, FlowState, FlowStep};
use crate::observability::metrics;

/// Orchestrates allowance check, approval, execution and confirmation for
/// one set of parameters.
pub struct TransactionFlow {
    id: Uuid,
    session: Arc<dyn WalletSession>,
    params: FlowParams,
    confirm: ConfirmOptions,
    state: watch::Sender<FlowState>,
    generation: AtomicU64,
}

impl TransactionFlow {
    /// Create an idle flow.
    pub fn new(session: Arc<dyn WalletSession>, params: FlowParams) -> Self {
        let (state, _) = watch::channel(FlowState::default());
        Self {
            id: Uuid::new_v4(),
            session,
            params,
            confirm: ConfirmOptions::default(),
            state,
            generation: AtomicU64::new(0),
        }
    }

    /// Override confirmation polling.
    pub fn with_confirm_options(mut self, options: ConfirmOptions) -> Self {
        self.confirm = options;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn params(&self) -> &FlowParams {
        &self.params
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> FlowState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<FlowState> {
        self.state.subscribe()
    }

    /// Whether the session has an account, a reader and a signer.
    pub fn is_session_ready(&self) -> bool {
        self.session.is_ready()
    }

    /// Return to Idle and clear the error and both hashes.
    ///
    /// Always allowed. Results of a run that is still in flight are discarded.
    pub fn reset(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|s| *s = FlowState::default());
        tracing::debug!(flow_id = %self.id, generation, "Flow reset");
    }

    /// Read the current allowance ahead of `run()`.
    ///
    /// Moves Idle → CheckingAllowance → Ready and returns whether the existing
    /// allowance already covers the flow. NATIVE is always sufficient.
    pub async fn check_allowance(&self) -> FlowResult<bool> {
        let generation = self.generation.load(Ordering::SeqCst);
        let span = tracing::debug_span!("allowance_preflight", flow_id = %self.id, generation);

        let result = self.preflight(generation).instrument(span).await;

        if let Err(e) = &result {
            self.fail(generation, e);
        }
        result
    }

    /// Run the whole flow and return the execution transaction hash.
    ///
    /// Clears the error and both hashes left by an earlier run. On failure the flow settles in `Error` with the error's message, and
    /// the same error is returned. Do not call again until the previous call
    /// has returned; a newer call supersedes the older one.
    pub async fn run(&self) -> FlowResult<TxHash> {
        let previous = self.state.borrow().step;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if !previous.can_run() {
            tracing::warn!(
                flow_id = %self.id,
                generation,
                previous = %previous,
                "Starting run from a busy or finished step, earlier run is superseded"
            );
        }
        self.apply(generation, |s| {
            s.error = None;
            s.approve_hash = None;
            s.execute_hash = None;
        });

        let span = tracing::info_span!(
            "flow_run",
            flow_id = %self.id,
            generation,
            standard = %self.params.standard
        );
        let result = self.drive(generation).instrument(span).await;

        match &result {
            Ok(hash) => {
                metrics::record_run_outcome("success");
                tracing::info!(flow_id = %self.id, generation, tx_hash = %hash, "Flow succeeded");
            }
            Err(FlowError::Superseded) => {
                metrics::record_run_outcome("superseded");
                tracing::debug!(flow_id = %self.id, generation, "Flow superseded");
            }
            Err(e) => {
                metrics::record_run_outcome("error");
                tracing::warn!(flow_id = %self.id, generation, error = %e, "Flow failed");
                self.fail(generation, e);
            }
        }
        result
    }

    async fn preflight(&self, generation: u64) -> FlowResult<bool> {
        if !self.params.standard.requires_approval() {
            self.transition(generation, FlowStep::Ready)?;
            return Ok(true);
        }

        self.transition(generation, FlowStep::CheckingAllowance)?;
        let reader = self.session.reader();
        let sufficient = check_allowance(&self.allowance_query()?, reader.as_deref()).await?;
        self.transition(generation, FlowStep::Ready)?;
        Ok(sufficient)
    }

    async fn drive(&self, generation: u64) -> FlowResult<TxHash> {
        if !self.session.is_ready() {
            return Err(FlowError::Precondition("Wallet client not ready".to_string()));
        }

        let reader = self.session.reader();
        let writer = self.session.writer();
        let account = self.session.account();
        let depth = self.params.confirmations;

        if self.params.standard.requires_approval() {
            self.params.validate()?;

            let needs_approval = if self.params.require_explicit_approval {
                self.transition(generation, FlowStep::Ready)?;
                true
            } else {
                self.transition(generation, FlowStep::CheckingAllowance)?;
                let sufficient =
                    check_allowance(&self.allowance_query()?, reader.as_deref()).await?;
                !sufficient
            };

            if needs_approval {
                self.transition(generation, FlowStep::WaitingForApproval)?;
                let hash = approve(&self.approval_request()?, writer.as_deref()).await?;
                self.record(generation, FlowStep::WaitingForApprovalConfirmation, |s| {
                    s.approve_hash = Some(hash)
                })?;

                let reader = reader.as_deref().ok_or_else(missing_reader)?;
                confirm_transaction(hash, depth, reader, self.confirm).await?;
            }
        }

        self.transition(generation, FlowStep::Executing)?;
        let account = account.ok_or_else(|| {
            FlowError::MissingContext("Missing wallet account".to_string())
        })?;
        let hash = execute_contract_function(
            reader.as_deref(),
            writer.as_deref(),
            &self.params.target,
            account,
            self.params.native_value(),
        )
        .await?;
        self.record(generation, FlowStep::WaitingForExecutionConfirmation, |s| {
            s.execute_hash = Some(hash)
        })?;

        let reader = reader.as_deref().ok_or_else(missing_reader)?;
        confirm_transaction(hash, depth, reader, self.confirm).await?;
        self.transition(generation, FlowStep::Success)?;

        Ok(hash)
    }

    fn allowance_query(&self) -> FlowResult<AllowanceQuery> {
        Ok(AllowanceQuery {
            standard: self.params.standard,
            token: self.params.token,
            spender: self.spender()?,
            owner: self.session.account(),
            token_id: self.params.token_id,
            amount: self.params.amount,
        })
    }

    fn approval_request(&self) -> FlowResult<ApprovalRequest> {
        Ok(ApprovalRequest {
            standard: self.params.standard,
            token: self.params.token,
            spender: self.spender()?,
            account: self.session.account(),
            amount: self.params.amount,
        })
    }

    fn spender(&self) -> FlowResult<Address> {
        self.params.spender.ok_or_else(|| {
            FlowError::Parameter("Spender and amount required for tokens".to_string())
        })
    }

    /// Enter `step`, or report that this generation has been superseded.
    fn transition(&self, generation: u64, step: FlowStep) -> FlowResult<()> {
        self.record(generation, step, |_| {})
    }

    /// Enter `step` and apply `f` in a single state update.
    fn record(
        &self,
        generation: u64,
        step: FlowStep,
        f: impl FnOnce(&mut FlowState),
    ) -> FlowResult<()> {
        let applied = self.apply(generation, |s| {
            f(s);
            s.step = step;
        });
        if !applied {
            return Err(FlowError::Superseded);
        }
        metrics::record_step_transition(step.as_str());
        tracing::debug!(flow_id = %self.id, generation, step = %step, "Step");
        Ok(())
    }

    fn fail(&self, generation: u64, err: &FlowError) {
        let message = err.to_string();
        self.apply(generation, |s| {
            s.error = Some(message);
            s.step = FlowStep::Error;
        });
    }

    /// Apply `f` if `generation` is still current. Returns whether it was applied.
    fn apply(&self, generation: u64, f: impl FnOnce(&mut FlowState)) -> bool {
        let mut applied = false;
        self.state.send_if_modified(|s| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            f(s);
            applied = true;
            true
        });
        if !applied {
            tracing::debug!(flow_id = %self.id, generation, "Dropping stale state update");
        }
        applied
    }
}

impl std::fmt::Debug for TransactionFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionFlow")
            .field("id", &self.id)
            .field("params", &self.params)
            .field("state", &*self.state.borrow())
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish()
    }
}

fn missing_reader() -> FlowError {
    FlowError::MissingContext("Missing public client".to_string())
}
