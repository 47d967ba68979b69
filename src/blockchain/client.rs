//! Blockchain RPC client with timeout and error handling.
//!
//! # Responsibilities
//! - Connect to the primary JSON-RPC endpoint plus failovers
//! - Query balances, pending nonces and gas price
//! - Broadcast raw transactions and classify node rejections
//! - Handle timeouts and network errors gracefully

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::transports::TransportError;
use async_trait::async_trait;
use tokio::time::timeout;

use crate::blockchain::gateway::ChainGateway;
use crate::blockchain::types::{ChainConfig, ChainId, GatewayError, GatewayResult, SignedTransaction};

/// Node error fragments meaning "this nonce is already taken".
const STALE_NONCE_MARKERS: &[&str] = &[
    "nonce too low",
    "nonce is too low",
    "invalid nonce",
    "replacement transaction underpriced",
];

/// Node error fragments meaning "this exact transaction is already in the pool".
const ALREADY_KNOWN_MARKERS: &[&str] = &["already known", "known transaction"];

/// Map a transport error from `eth_sendRawTransaction` into a gateway error.
pub(crate) fn classify_submit_error(message: &str) -> GatewayError {
    let lower = message.to_lowercase();
    if STALE_NONCE_MARKERS.iter().any(|m| lower.contains(m)) {
        GatewayError::SequenceTooLow(message.to_string())
    } else {
        GatewayError::Rpc(message.to_string())
    }
}

fn is_already_known(message: &str) -> bool {
    let lower = message.to_lowercase();
    ALREADY_KNOWN_MARKERS.iter().any(|m| lower.contains(m))
}

/// JSON-RPC gateway with failover support.
#[derive(Clone)]
pub struct RpcGateway {
    /// List of providers (primary + failovers).
    providers: Vec<Arc<dyn Provider + Send + Sync>>,
    /// Configuration.
    config: ChainConfig,
    /// Per-provider request timeout.
    timeout_duration: Duration,
}

impl RpcGateway {
    /// Create a new gateway.
    ///
    /// Only the primary URL is mandatory; malformed failover URLs are skipped.
    pub fn new(config: ChainConfig) -> GatewayResult<Self> {
        let timeout_duration = Duration::from_secs(config.rpc_timeout_secs);
        let mut providers = Vec::new();

        let primary_url: url::Url = config.rpc_url.parse().map_err(|e| {
            GatewayError::Rpc(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        providers.push(
            Arc::new(ProviderBuilder::new().connect_http(primary_url)) as Arc<dyn Provider + Send + Sync>
        );

        for url_str in &config.failover_urls {
            if let Ok(url) = url_str.parse() {
                providers.push(
                    Arc::new(ProviderBuilder::new().connect_http(url)) as Arc<dyn Provider + Send + Sync>
                );
            } else {
                tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL");
            }
        }

        tracing::info!(
            rpc_url = %config.rpc_url,
            failovers = providers.len() - 1,
            chain_id = config.chain_id,
            "RPC gateway initialized"
        );

        Ok(Self {
            providers,
            config,
            timeout_duration,
        })
    }

    /// Verify the connected chain ID matches configuration.
    pub async fn verify_chain_id(&self) -> GatewayResult<()> {
        let chain_id = self.get_chain_id().await?;
        if chain_id.0 != self.config.chain_id {
            return Err(GatewayError::ChainMismatch {
                expected: self.config.chain_id,
                actual: chain_id.0,
            });
        }
        Ok(())
    }

    /// Get the chain ID from the RPC.
    pub async fn get_chain_id(&self) -> GatewayResult<ChainId> {
        for (i, provider) in self.providers.iter().enumerate() {
            let fut = provider.get_chain_id();
            match timeout(self.timeout_duration, fut).await {
                Ok(Ok(result)) => return Ok(ChainId(result)),
                Ok(Err(e)) => {
                    tracing::warn!(provider_idx = i, error = %e, "RPC error, trying next provider");
                }
                Err(_) => {
                    tracing::warn!(provider_idx = i, "RPC timeout, trying next provider");
                }
            }
        }
        Err(GatewayError::Rpc("All RPC providers failed".to_string()))
    }

    fn all_failed(&self, what: &str, last_timed_out: bool) -> GatewayError {
        if last_timed_out {
            GatewayError::Timeout(self.timeout_duration)
        } else {
            GatewayError::Rpc(format!("All providers failed to {}", what))
        }
    }

    fn handle_submit_error(
        &self,
        index: usize,
        tx: &SignedTransaction,
        error: TransportError,
    ) -> Result<Option<TxHash>, GatewayError> {
        let message = error.to_string();
        if is_already_known(&message) {
            tracing::debug!(provider_idx = index, tx_hash = %tx.hash, "Transaction already in pool");
            return Ok(Some(tx.hash));
        }
        match classify_submit_error(&message) {
            stale @ GatewayError::SequenceTooLow(_) => Err(stale),
            _ => {
                tracing::warn!(provider_idx = index, error = %message, "Broadcast failed, trying next provider");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl ChainGateway for RpcGateway {
    async fn get_balance(&self, address: Address) -> GatewayResult<U256> {
        let mut timed_out = false;
        for (i, provider) in self.providers.iter().enumerate() {
            let fut = provider.get_balance(address);
            match timeout(self.timeout_duration, fut).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => {
                    timed_out = false;
                    tracing::warn!(provider_idx = i, error = %e, "RPC error");
                }
                Err(_) => {
                    timed_out = true;
                    tracing::warn!(provider_idx = i, "RPC timeout");
                }
            }
        }
        Err(self.all_failed("get balance", timed_out))
    }

    async fn get_next_sequence(&self, address: Address) -> GatewayResult<u64> {
        let mut timed_out = false;
        for (i, provider) in self.providers.iter().enumerate() {
            let fut = provider.get_transaction_count(address).pending();
            match timeout(self.timeout_duration, fut).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => {
                    timed_out = false;
                    tracing::warn!(provider_idx = i, error = %e, "RPC error");
                }
                Err(_) => {
                    timed_out = true;
                    tracing::warn!(provider_idx = i, "RPC timeout");
                }
            }
        }
        Err(self.all_failed("get pending nonce", timed_out))
    }

    async fn get_fee_estimate(&self) -> GatewayResult<u128> {
        let mut timed_out = false;
        for (i, provider) in self.providers.iter().enumerate() {
            let fut = provider.get_gas_price();
            match timeout(self.timeout_duration, fut).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => {
                    timed_out = false;
                    tracing::warn!(provider_idx = i, error = %e, "RPC error");
                }
                Err(_) => {
                    timed_out = true;
                    tracing::warn!(provider_idx = i, "RPC timeout");
                }
            }
        }
        Err(self.all_failed("get gas price", timed_out))
    }

    /// Broadcast through each provider until one accepts.
    ///
    /// Rebroadcasting the same signed bytes is harmless: a node that already
    /// holds the transaction answers "already known", which counts as
    /// accepted. A stale-nonce rejection is returned immediately since every
    /// node would give the same answer.
    async fn submit_transaction(&self, tx: &SignedTransaction) -> GatewayResult<TxHash> {
        let mut timed_out = false;
        for (i, provider) in self.providers.iter().enumerate() {
            let fut = provider.send_raw_transaction(&tx.raw);
            match timeout(self.timeout_duration, fut).await {
                Ok(Ok(pending)) => return Ok(*pending.tx_hash()),
                Ok(Err(e)) => {
                    timed_out = false;
                    if let Some(hash) = self.handle_submit_error(i, tx, e)? {
                        return Ok(hash);
                    }
                }
                Err(_) => {
                    timed_out = true;
                    tracing::warn!(provider_idx = i, tx_hash = %tx.hash, "Broadcast timeout");
                }
            }
        }
        Err(self.all_failed("broadcast transaction", timed_out))
    }
}

impl std::fmt::Debug for RpcGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcGateway")
            .field("rpc_url", &self.config.rpc_url)
            .field("chain_id", &self.config.chain_id)
            .field("timeout_secs", &self.config.rpc_timeout_secs)
            .finish()
    }
}
