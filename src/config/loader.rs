//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{RelayConfig, StoreBackend};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: RelayConfig = toml::from_str(&content)?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Seconds added on top of the redemption budget when sizing a default request timeout.
const REQUEST_TIMEOUT_HEADROOM_SECS: u64 = 10;

/// Build a configuration from defaults plus environment, for deployments
/// that run without a config file.
///
/// Unless `REQUEST_TIMEOUT_SECS` is set, the request timeout grows with the
/// pool so a slow redemption is never cut off by the listener.
pub fn load_from_env() -> Result<RelayConfig, ConfigError> {
    let mut config = RelayConfig::default();
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    if std::env::var("REQUEST_TIMEOUT_SECS").is_err() {
        fit_request_timeout(&mut config);
    }
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Raise the request timeout to cover the redemption budget plus headroom.
pub fn fit_request_timeout(config: &mut RelayConfig) {
    let needed = config
        .dispatch_budget()
        .as_secs()
        .saturating_add(REQUEST_TIMEOUT_HEADROOM_SECS);
    config.listener.request_timeout_secs = config.listener.request_timeout_secs.max(needed);
}

/// Apply the deployment environment variables on top of file values.
///
/// Recognized: `RPC_URL`, `CHAIN_ID`, `CONTRACT_ADDR`, `RELAYER_COUNT`,
/// `REQUEST_TIMEOUT_SECS`, `REDIS_ADDR`.
/// `REDIS_ADDR` also switches the store backend to Redis.
pub fn apply_env_overrides<F>(config: &mut RelayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("RPC_URL") {
        config.chain.rpc_url = url;
    }
    if let Some(chain_id) = lookup("CHAIN_ID").and_then(|v| v.trim().parse().ok()) {
        config.chain.chain_id = chain_id;
    }
    if let Some(contract) = lookup("CONTRACT_ADDR") {
        config.relayer.contract_address = contract;
    }
    if let Some(count) = lookup("RELAYER_COUNT").and_then(|v| v.trim().parse().ok()) {
        config.relayer.count = count;
    }
    if let Some(secs) = lookup("REQUEST_TIMEOUT_SECS").and_then(|v| v.trim().parse().ok()) {
        config.listener.request_timeout_secs = secs;
    }
    if let Some(addr) = lookup("REDIS_ADDR") {
        config.store.backend = StoreBackend::Redis;
        config.store.redis_url = if addr.starts_with("redis://") || addr.starts_with("rediss://") {
            addr
        } else {
            format!("redis://{}", addr)
        };
    }
}
