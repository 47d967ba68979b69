//! Configuration validation.
//!
//! Serde handles syntax; this pass checks values that must parse into
//! addresses, URLs and selectors before anything touches the network.
//! Every problem is collected, not just the first.

use std::net::SocketAddr;
use std::time::Duration;

use alloy::primitives::Address;
use thiserror::Error;

use crate::blockchain::transaction::parse_selector;
use crate::config::schema::{RelayConfig, StoreBackend};

/// Lowest gas limit a call transaction can carry.
const MIN_GAS_LIMIT: u64 = 21_000;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::new("listener.request_timeout_secs", "must be > 0"));
    }

    if let Err(e) = config.chain.rpc_url.parse::<url::Url>() {
        errors.push(ValidationError::new("chain.rpc_url", e.to_string()));
    }
    for failover in &config.chain.failover_urls {
        if let Err(e) = failover.parse::<url::Url>() {
            errors.push(ValidationError::new(
                "chain.failover_urls",
                format!("'{}': {}", failover, e),
            ));
        }
    }
    if config.chain.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("chain.rpc_timeout_secs", "must be > 0"));
    }

    if config.relayer.count == 0 {
        errors.push(ValidationError::new("relayer.count", "pool needs at least one sender"));
    }
    if config.relayer.key_env_prefix.is_empty() {
        errors.push(ValidationError::new("relayer.key_env_prefix", "must not be empty"));
    }
    match config.relayer.contract_address.parse::<Address>() {
        Ok(addr) if addr.is_zero() => {
            errors.push(ValidationError::new("relayer.contract_address", "zero address"));
        }
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::new(
            "relayer.contract_address",
            format!("'{}': {}", config.relayer.contract_address, e),
        )),
    }
    if let Err(e) = parse_selector(&config.relayer.call_selector) {
        errors.push(ValidationError::new("relayer.call_selector", e));
    }
    if config.relayer.gas_limit < MIN_GAS_LIMIT {
        errors.push(ValidationError::new(
            "relayer.gas_limit",
            format!("must be at least {}", MIN_GAS_LIMIT),
        ));
    }

    let budget = config.dispatch_budget();
    if config.listener.request_timeout_secs > 0
        && Duration::from_secs(config.listener.request_timeout_secs) <= budget
    {
        errors.push(ValidationError::new(
            "listener.request_timeout_secs",
            format!(
                "must exceed the worst-case redemption time of {}s (relayer.count x calls per relayer x chain call deadline)",
                budget.as_secs()
            ),
        ));
    }

    if config.store.audit_log_limit == 0 {
        errors.push(ValidationError::new("store.audit_log_limit", "must be > 0"));
    }
    if config.store.backend == StoreBackend::Redis {
        if let Err(e) = config.store.redis_url.parse::<url::Url>() {
            errors.push(ValidationError::new("store.redis_url", e.to_string()));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
