//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, depth >= 1)
//! - Check that every URL and address parses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: FlowConfig → Result<(), Vec<ValidationError>>

use std::fmt;

use alloy::primitives::Address;

use crate::config::schema::FlowConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `chain.rpc_url`.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &FlowConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = config.chain.rpc_url.parse::<url::Url>() {
        errors.push(ValidationError::new(
            "chain.rpc_url",
            format!("invalid URL '{}': {}", config.chain.rpc_url, e),
        ));
    }

    for (i, failover) in config.chain.failover_urls.iter().enumerate() {
        if let Err(e) = failover.parse::<url::Url>() {
            errors.push(ValidationError::new(
                &format!("chain.failover_urls[{}]", i),
                format!("invalid URL '{}': {}", failover, e),
            ));
        }
    }

    if config.chain.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("chain.rpc_timeout_secs", "must be greater than 0"));
    }

    if config.chain.receipt_poll_interval_ms == 0 {
        errors.push(ValidationError::new(
            "chain.receipt_poll_interval_ms",
            "must be greater than 0",
        ));
    }

    if config.confirmation.default_depth == 0 {
        errors.push(ValidationError::new("confirmation.default_depth", "must be at least 1"));
    }

    if config.confirmation.timeout_secs == Some(0) {
        errors.push(ValidationError::new(
            "confirmation.timeout_secs",
            "must be greater than 0 when set",
        ));
    }

    if config.wallet.private_key_env.trim().is_empty() {
        errors.push(ValidationError::new("wallet.private_key_env", "must not be empty"));
    }

    if let Some(account) = &config.wallet.account {
        if account.parse::<Address>().is_err() {
            errors.push(ValidationError::new(
                "wallet.account",
                format!("invalid address '{}'", account),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
