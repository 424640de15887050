//! Metrics collection.
//!
//! # Metrics
//! - `txflow_step_transitions_total` (counter): transitions by target step
//! - `txflow_runs_total` (counter): finished runs by outcome
//! - `txflow_confirmation_polls_total` (counter): chain-head polls while confirming
//! - `txflow_rpc_provider_healthy` (gauge): 1=healthy, 0=unhealthy

use ::metrics::{counter, gauge};

/// Record a flow entering a step.
pub fn record_step_transition(step: &'static str) {
    counter!("txflow_step_transitions_total", "step" => step).increment(1);
}

/// Record a finished run.
pub fn record_run_outcome(outcome: &'static str) {
    counter!("txflow_runs_total", "outcome" => outcome).increment(1);
}

/// Record one chain-head poll during confirmation.
pub fn record_confirmation_poll() {
    counter!("txflow_confirmation_polls_total").increment(1);
}

/// Record RPC health for the primary provider.
pub fn record_rpc_health(healthy: bool) {
    gauge!("txflow_rpc_provider_healthy").set(if healthy { 1.0 } else { 0.0 });
}
