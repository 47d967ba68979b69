//! Startup orchestration.
//!
//! # Responsibilities
//! - Load sender keys from the environment
//! - Seed every identity's nonce from the chain
//! - Connect the voucher store and surface stale reservations
//! - Assemble the dispatcher

use std::sync::Arc;

use thiserror::Error;

use crate::blockchain::{ChainGateway, GatewayError, MintTemplate, RpcGateway, Wallet};
use crate::config::{RelayConfig, StoreBackend, StoreConfig, ValidationError};
use crate::relay::{DispatchSettings, PoolError, RelayDispatcher, SenderIdentity, SignerPool};
use crate::store::{MemoryVoucherStore, RedisVoucherStore, StoreError, VoucherStore};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Invalid key in {var}: {source}")]
    Key {
        var: String,
        #[source]
        source: GatewayError,
    },

    #[error("No relayer keys found under {prefix}0..{prefix}{last}")]
    NoKeys { prefix: String, last: usize },

    #[error("Failed to seed nonce for {address}: {source}")]
    NonceSeed {
        address: String,
        #[source]
        source: GatewayError,
    },

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("Chain error: {0}")]
    Chain(#[from] GatewayError),

    #[error("Voucher store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] ValidationError),
}

/// Read `{prefix}{i}` for `i` in `0..count`. Unset variables are skipped.
pub fn load_wallets<F>(prefix: &str, count: usize, chain_id: u64, lookup: F) -> Result<Vec<Wallet>, StartupError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut wallets = Vec::with_capacity(count);
    for i in 0..count {
        let var = format!("{}{}", prefix, i);
        let Some(value) = lookup(&var).filter(|v| !v.trim().is_empty()) else {
            tracing::warn!(var = %var, "Relayer key not set, skipping");
            continue;
        };
        let wallet = Wallet::from_private_key(&value, chain_id)
            .map_err(|source| StartupError::Key { var: var.clone(), source })?;
        tracing::info!(index = i, address = %wallet.address(), "Loaded relayer key");
        wallets.push(wallet);
    }

    if wallets.is_empty() {
        return Err(StartupError::NoKeys {
            prefix: prefix.to_string(),
            last: count.saturating_sub(1),
        });
    }
    Ok(wallets)
}

/// Query each wallet's pending nonce and build the pool.
pub async fn build_pool(wallets: Vec<Wallet>, gateway: &dyn ChainGateway) -> Result<SignerPool, StartupError> {
    let mut identities = Vec::with_capacity(wallets.len());
    for (index, wallet) in wallets.into_iter().enumerate() {
        let address = wallet.address();
        let next = gateway
            .get_next_sequence(address)
            .await
            .map_err(|source| StartupError::NonceSeed {
                address: address.to_string(),
                source,
            })?;
        tracing::info!(index, %address, nonce = next, "Relayer nonce seeded");
        identities.push(SenderIdentity::new(index, wallet, next));
    }
    Ok(SignerPool::new(identities)?)
}

/// Connect the configured store backend.
pub async fn build_store(config: &StoreConfig) -> Result<Arc<dyn VoucherStore>, StartupError> {
    let store: Arc<dyn VoucherStore> = match config.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory voucher store; state is lost on restart");
            Arc::new(MemoryVoucherStore::new(config.audit_log_limit))
        }
        StoreBackend::Redis => Arc::new(
            RedisVoucherStore::connect(&config.redis_url, &config.key_prefix, config.audit_log_limit).await?,
        ),
    };
    Ok(store)
}

/// Log every voucher left in flight by an earlier process.
///
/// These may or may not have been minted; they are never put back automatically.
pub async fn report_stale_reservations(store: &dyn VoucherStore) -> Result<usize, StartupError> {
    let stale = store.in_flight().await?;
    for voucher in &stale {
        tracing::warn!(voucher = %voucher, "Stale voucher reservation found; reconcile against chain before restoring");
    }
    Ok(stale.len())
}

/// Build the dispatcher from configuration and environment.
pub async fn bootstrap(config: &RelayConfig) -> Result<Arc<RelayDispatcher>, StartupError> {
    let template = MintTemplate::from_config(&config.relayer)?;

    let gateway = RpcGateway::new(config.chain.clone())?;
    gateway.verify_chain_id().await?;

    let wallets = load_wallets(
        &config.relayer.key_env_prefix,
        config.relayer.count,
        config.chain.chain_id,
        |var| std::env::var(var).ok(),
    )?;
    let pool = build_pool(wallets, &gateway).await?;

    let store = build_store(&config.store).await?;
    report_stale_reservations(store.as_ref()).await?;

    tracing::info!(
        pool_size = pool.len(),
        contract = %template.contract,
        chain_id = config.chain.chain_id,
        "Relay dispatcher ready"
    );

    Ok(Arc::new(RelayDispatcher::new(
        Arc::new(pool),
        Arc::new(gateway),
        store,
        template,
        DispatchSettings::from_config(config),
    )))
}
