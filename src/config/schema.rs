//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relayer.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use alloy::primitives::U256;
use serde::{Deserialize, Deserializer, Serialize};

/// Root configuration for the voucher relayer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// HTTP listener settings.
    pub listener: ListenerConfig,

    /// Chain RPC settings.
    pub chain: ChainConfig,

    /// Sender pool and mint call settings.
    pub relayer: RelayerConfig,

    /// Voucher store backend.
    pub store: StoreConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Whole-request timeout in seconds. Must exceed
    /// [`RelayConfig::dispatch_budget`].
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 120,
        }
    }
}

/// Chain RPC configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs.
    pub failover_urls: Vec<String>,

    /// Chain ID used for EIP-155 signing.
    pub chain_id: u64,

    /// Upper bound for one RPC call against one provider, in seconds.
    pub rpc_timeout_secs: u64,

    /// Refuse to submit above this gas price (gwei). Unset means no cap.
    pub max_gas_price_gwei: Option<u64>,
}

impl ChainConfig {
    /// Endpoints a single call may try: the primary plus every failover.
    pub fn provider_count(&self) -> u32 {
        u32::try_from(self.failover_urls.len())
            .unwrap_or(u32::MAX)
            .saturating_add(1)
    }

    /// Deadline for one gateway call, long enough to reach the last failover.
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs).saturating_mul(self.provider_count())
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            failover_urls: Vec::new(),
            chain_id: 31337,
            rpc_timeout_secs: 10,
            max_gas_price_gwei: None,
        }
    }
}

/// Sender pool and mint call configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayerConfig {
    /// Number of sender keys to load (`{key_env_prefix}0` .. `{key_env_prefix}{count-1}`).
    pub count: usize,

    /// Environment variable prefix holding the hex private keys.
    pub key_env_prefix: String,

    /// Target contract receiving the mint call.
    pub contract_address: String,

    /// Hex-encoded 4-byte call selector.
    pub call_selector: String,

    /// Fixed gas limit for every mint transaction.
    pub gas_limit: u64,

    /// Senders holding less than this (wei) are skipped. Accepts an integer
    /// or a decimal / `0x` string for amounts beyond `i64`.
    #[serde(deserialize_with = "deserialize_wei")]
    pub min_balance_wei: U256,

    /// Same-sender resubmissions allowed after a nonce resync.
    pub stale_sequence_retries: u32,
}

impl Default for RelayerConfig {
    fn default() -> Self {
        Self {
            count: 1,
            key_env_prefix: "RELAYER_PRIVATE_KEY_".to_string(),
            contract_address: String::new(),
            call_selector: "0x6a627842".to_string(),
            gas_limit: 250_000,
            min_balance_wei: U256::from(10_000_000_000_000_000u64), // 0.01 native token
            stale_sequence_retries: 1,
        }
    }
}

impl RelayerConfig {
    /// Gateway calls one candidate can make: a balance query, then per
    /// submission round a fee estimate, the broadcast and a nonce resync.
    pub fn calls_per_candidate(&self) -> u32 {
        self.stale_sequence_retries
            .saturating_add(1)
            .saturating_mul(3)
            .saturating_add(1)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WeiAmount {
    Integer(u64),
    Text(String),
}

fn deserialize_wei<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
    D: Deserializer<'de>,
{
    match WeiAmount::deserialize(deserializer)? {
        WeiAmount::Integer(value) => Ok(U256::from(value)),
        WeiAmount::Text(text) => text
            .trim()
            .parse::<U256>()
            .map_err(|e| serde::de::Error::custom(format!("invalid wei amount '{}': {}", text, e))),
    }
}

/// Which voucher store implementation to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local store; vouchers are lost on restart.
    #[default]
    Memory,
    /// Shared Redis store.
    Redis,
}

/// Voucher store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,

    /// Redis connection URL (only read for the redis backend).
    pub redis_url: String,

    /// Prefix for every key the relayer touches.
    pub key_prefix: String,

    /// Maximum number of audit records retained.
    pub audit_log_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: "vault".to_string(),
            audit_log_limit: 1000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

impl RelayConfig {
    /// Longest one redemption can spend waiting on the chain: every pool
    /// identity making every call it can, each at the full call deadline.
    pub fn dispatch_budget(&self) -> Duration {
        let pool = u32::try_from(self.relayer.count).unwrap_or(u32::MAX);
        self.chain
            .call_timeout()
            .saturating_mul(self.relayer.calls_per_candidate())
            .saturating_mul(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.relayer.gas_limit, 250_000);
        assert_eq!(config.relayer.call_selector, "0x6a627842");
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert!(config.chain.max_gas_price_gwei.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: RelayConfig = toml::from_str(
            r#"
            [relayer]
            count = 3
            contract_address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"

            [store]
            backend = "redis"
            "#,
        )
        .unwrap();

        assert_eq!(config.relayer.count, 3);
        assert_eq!(config.relayer.stale_sequence_retries, 1);
        assert_eq!(config.store.backend, StoreBackend::Redis);
        assert_eq!(config.store.key_prefix, "vault");
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
    }

    #[test]
    fn test_call_timeout_covers_failovers() {
        let mut config = ChainConfig::default();
        assert_eq!(config.call_timeout(), Duration::from_secs(10));

        config.failover_urls = vec!["http://b:8545".into(), "http://c:8545".into()];
        assert_eq!(config.provider_count(), 3);
        assert_eq!(config.call_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_dispatch_budget() {
        let mut config = RelayConfig::default();
        // balance + 2 rounds of (fee, submit, resync)
        assert_eq!(config.relayer.calls_per_candidate(), 7);
        assert_eq!(config.dispatch_budget(), Duration::from_secs(70));

        config.relayer.count = 3;
        config.relayer.stale_sequence_retries = 0;
        assert_eq!(config.dispatch_budget(), Duration::from_secs(120));
    }

    #[test]
    fn test_min_balance_accepts_large_amounts() {
        let config: RelayConfig = toml::from_str(
            r#"
            [relayer]
            min_balance_wei = "50000000000000000000"
            "#,
        )
        .unwrap();
        let fifty_ether = U256::from(50u64) * U256::from(1_000_000_000_000_000_000u64);
        assert_eq!(config.relayer.min_balance_wei, fifty_ether);

        let config: RelayConfig = toml::from_str("[relayer]\nmin_balance_wei = 1000\n").unwrap();
        assert_eq!(config.relayer.min_balance_wei, U256::from(1000u64));

        let bad = toml::from_str::<RelayConfig>("[relayer]\nmin_balance_wei = \"lots\"\n");
        assert!(bad.is_err());
    }
}
