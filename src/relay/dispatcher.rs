//! Voucher redemption orchestration.
//!
//! # Flow
//! ```text
//! relay_mint(destination, voucher)
//!     → store.reserve            (false: VoucherInvalid, no chain calls)
//!     → for each candidate in one rotation:
//!           lock identity
//!           balance < reserve?   → SkipBalance
//!           fee → build → sign → submit
//!               ok               → nonce += 1, Success
//!               nonce too low    → resync, retry same identity (bounded)
//!               other / timeout  → RetryTransient
//!     → Success:    store.finalize (used + counters + audit, one batch)
//!     → Exhausted:  store.release  (failure: RollbackFailed)
//! ```
//!
//! Each redemption runs on its own task. Dropping the caller's future
//! (client disconnect, listener timeout) never stops it between `reserve`
//! and `finalize`/`release`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy::primitives::{Address, TxHash, U256};
use chrono::Utc;
use tracing::Instrument;
use uuid::Uuid;

use crate::blockchain::{ChainGateway, GatewayError, GatewayResult, MintTemplate};
use crate::config::RelayConfig;
use crate::observability::metrics;
use crate::relay::error::{RelayError, RelayResult};
use crate::relay::outcome::{CandidateOutcome, MintReceipt};
use crate::relay::pool::{SenderIdentity, SignerPool};
use crate::resilience::with_timeout;
use crate::store::stats::{cumulative_sales, SalesPoint};
use crate::store::{MintAttemptRecord, MintOutcome, StoreResult, VoucherState, VoucherStore};

const WEI_PER_GWEI: u128 = 1_000_000_000;

/// Tunables for the failover loop.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    /// Candidates with a balance strictly below this are skipped.
    pub min_balance: U256,
    /// Deadline for each gateway call, long enough for the gateway to fail
    /// over through every configured provider.
    pub call_timeout: Duration,
    /// Resync-and-retry rounds per candidate after a stale nonce.
    pub stale_sequence_retries: u32,
    /// Fee estimates above this (wei) fail the candidate.
    pub max_gas_price: Option<u128>,
}

impl DispatchSettings {
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            min_balance: config.relayer.min_balance_wei,
            call_timeout: config.chain.call_timeout(),
            stale_sequence_retries: config.relayer.stale_sequence_retries,
            max_gas_price: config
                .chain
                .max_gas_price_gwei
                .map(|gwei| u128::from(gwei) * WEI_PER_GWEI),
        }
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self::from_config(&RelayConfig::default())
    }
}

/// One redemption request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintRequest {
    pub destination: Address,
    pub voucher_id: String,
    pub client_ip: Option<String>,
}

impl MintRequest {
    pub fn new(destination: Address, voucher_id: impl Into<String>) -> Self {
        Self {
            destination,
            voucher_id: voucher_id.into(),
            client_ip: None,
        }
    }

    pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = Some(ip.into());
        self
    }
}

/// Redeems vouchers by minting through a pool of sender identities.
///
/// Cloning is cheap and shares the pool, gateway and store.
#[derive(Clone)]
pub struct RelayDispatcher {
    pool: Arc<SignerPool>,
    gateway: Arc<dyn ChainGateway>,
    store: Arc<dyn VoucherStore>,
    template: MintTemplate,
    settings: DispatchSettings,
}

impl RelayDispatcher {
    pub fn new(
        pool: Arc<SignerPool>,
        gateway: Arc<dyn ChainGateway>,
        store: Arc<dyn VoucherStore>,
        template: MintTemplate,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            pool,
            gateway,
            store,
            template,
            settings,
        }
    }

    pub fn pool(&self) -> &SignerPool {
        &self.pool
    }

    /// Redeem `voucher_id` by minting to `destination`.
    pub async fn relay_mint(&self, destination: Address, voucher_id: &str) -> RelayResult<MintReceipt> {
        self.relay(MintRequest::new(destination, voucher_id)).await
    }

    /// Redeem with full request context.
    ///
    /// The redemption is detached onto its own task and always runs to a
    /// definitive outcome, even if the returned future is dropped.
    pub async fn relay(&self, request: MintRequest) -> RelayResult<MintReceipt> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "relay_mint",
            %request_id,
            voucher = %request.voucher_id,
            destination = %request.destination,
        );

        let dispatcher = self.clone();
        let task = tokio::spawn(
            async move {
                let start_time = Instant::now();
                let result = dispatcher.dispatch(request_id, &request).await;

                let outcome = match &result {
                    Ok(_) => "submitted",
                    Err(e) => e.kind(),
                };
                metrics::record_mint(outcome, start_time);
                result
            }
            .instrument(span),
        );

        match task.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(%request_id, error = %e, "Redemption task failed");
                Err(RelayError::Interrupted(e.to_string()))
            }
        }
    }

    async fn dispatch(&self, request_id: Uuid, request: &MintRequest) -> RelayResult<MintReceipt> {
        if !self.store.reserve(&request.voucher_id).await? {
            tracing::info!("Voucher not redeemable");
            return Err(RelayError::VoucherInvalid);
        }

        match self.failover(request.destination).await {
            Some(receipt) => {
                self.commit(request_id, request, &receipt).await;
                tracing::info!(
                    tx_hash = %receipt.tx_hash,
                    sender = %receipt.sender,
                    nonce = receipt.nonce,
                    "Mint submitted"
                );
                Ok(receipt)
            }
            None => {
                self.rollback(request_id, request).await?;
                tracing::warn!(pool_size = self.pool.len(), "All relayers exhausted, voucher returned");
                Err(RelayError::AllRelayersExhausted)
            }
        }
    }

    /// Try each identity at most once.
    async fn failover(&self, destination: Address) -> Option<MintReceipt> {
        for identity in self.pool.rotation() {
            let outcome = self.attempt(identity, destination).await;
            metrics::record_candidate(outcome.label());

            match outcome {
                CandidateOutcome::Success(receipt) => return Some(receipt),
                CandidateOutcome::SkipBalance { balance } => {
                    tracing::debug!(sender = %identity.address(), %balance, "Balance below reserve, skipping");
                }
                CandidateOutcome::RetryStaleSequence => {
                    tracing::warn!(sender = %identity.address(), "Nonce still stale after resync, trying next relayer");
                }
                CandidateOutcome::RetryTransient(error) => {
                    tracing::warn!(sender = %identity.address(), %error, "Submission failed, trying next relayer");
                }
            }
        }
        None
    }

    /// Run one candidate while holding its guard. The guard drops on every return.
    async fn attempt(&self, identity: &SenderIdentity, destination: Address) -> CandidateOutcome {
        let mut sequence = identity.lock().await;
        let sender = identity.address();

        let balance = match self.bounded(self.gateway.get_balance(sender)).await {
            Ok(balance) => balance,
            Err(e) => return CandidateOutcome::RetryTransient(e),
        };
        if balance < self.settings.min_balance {
            return CandidateOutcome::SkipBalance { balance };
        }

        let mut resyncs = 0;
        loop {
            let nonce = *sequence;
            match self.submit_once(identity, destination, nonce).await {
                Ok(tx_hash) => {
                    *sequence = nonce + 1;
                    return CandidateOutcome::Success(MintReceipt { tx_hash, sender, nonce });
                }
                Err(e) if e.is_sequence_stale() => {
                    let chain_next = match self.bounded(self.gateway.get_next_sequence(sender)).await {
                        Ok(next) => next,
                        Err(e) => return CandidateOutcome::RetryTransient(e),
                    };
                    // Cached nonce never moves backwards
                    *sequence = chain_next.max(nonce);
                    tracing::debug!(%sender, stale = nonce, resynced = *sequence, "Nonce resynchronized");

                    if resyncs >= self.settings.stale_sequence_retries {
                        return CandidateOutcome::RetryStaleSequence;
                    }
                    resyncs += 1;
                }
                Err(e) => return CandidateOutcome::RetryTransient(e),
            }
        }
    }

    async fn submit_once(
        &self,
        identity: &SenderIdentity,
        destination: Address,
        nonce: u64,
    ) -> GatewayResult<TxHash> {
        let gas_price = self.bounded(self.gateway.get_fee_estimate()).await?;
        if let Some(max) = self.settings.max_gas_price {
            if gas_price > max {
                return Err(GatewayError::GasPriceTooHigh {
                    current_gwei: u64::try_from(gas_price / WEI_PER_GWEI).unwrap_or(u64::MAX),
                    max_gwei: u64::try_from(max / WEI_PER_GWEI).unwrap_or(u64::MAX),
                });
            }
        }

        let request = self.template.request(identity.address(), destination, nonce, gas_price);
        let signed = identity.wallet().sign(request).await?;
        self.bounded(self.gateway.submit_transaction(&signed)).await
    }

    async fn bounded<F, T>(&self, call: F) -> GatewayResult<T>
    where
        F: std::future::Future<Output = GatewayResult<T>>,
    {
        with_timeout(self.settings.call_timeout, call).await
    }

    /// Finalize after a successful submission.
    ///
    /// The mint already happened, so a store failure here is logged and
    /// counted but never turned into a caller-visible error. The voucher stays
    /// in the in-flight set, which keeps it unredeemable.
    async fn commit(&self, request_id: Uuid, request: &MintRequest, receipt: &MintReceipt) {
        let record = MintAttemptRecord {
            request_id,
            voucher_id: request.voucher_id.clone(),
            destination: request.destination,
            tx_hash: Some(receipt.tx_hash),
            sender: Some(receipt.sender),
            client_ip: request.client_ip.clone(),
            timestamp: Utc::now(),
            outcome: MintOutcome::Submitted,
        };
        if let Err(e) = self.store.finalize(&record).await {
            metrics::record_finalize_failure();
            tracing::error!(
                error = %e,
                tx_hash = %receipt.tx_hash,
                "Mint submitted but voucher finalization failed; voucher left in flight"
            );
        }
    }

    /// Return the voucher after every candidate failed.
    async fn rollback(&self, request_id: Uuid, request: &MintRequest) -> RelayResult<()> {
        let released = self.store.release(&request.voucher_id).await;

        let record = MintAttemptRecord {
            request_id,
            voucher_id: request.voucher_id.clone(),
            destination: request.destination,
            tx_hash: None,
            sender: None,
            client_ip: request.client_ip.clone(),
            timestamp: Utc::now(),
            outcome: MintOutcome::Exhausted,
        };
        if let Err(e) = self.store.record_usage(&record).await {
            tracing::warn!(error = %e, "Failed to write audit entry");
        }

        released.map_err(|source| {
            metrics::record_rollback_failure();
            tracing::error!(error = %source, "Voucher rollback failed; voucher needs manual restore");
            RelayError::RollbackFailed {
                voucher_id: request.voucher_id.clone(),
                source,
            }
        })
    }

    /// Read-only voucher lookup.
    pub async fn verify_voucher(&self, voucher_id: &str) -> StoreResult<VoucherState> {
        self.store.voucher_state(voucher_id).await
    }

    /// Cumulative sales series, oldest day first.
    pub async fn sales_stats(&self) -> StoreResult<Vec<SalesPoint>> {
        let daily = self.store.daily_mints().await?;
        Ok(cumulative_sales(&daily))
    }

    pub async fn recent_mints(&self, limit: usize) -> StoreResult<Vec<MintAttemptRecord>> {
        self.store.recent_mints(limit).await
    }

    /// Destination a redeemed voucher minted to.
    pub async fn voucher_binding(&self, voucher_id: &str) -> StoreResult<Option<Address>> {
        self.store.binding(voucher_id).await
    }

    pub async fn is_publisher(&self, address: &str) -> StoreResult<bool> {
        self.store.is_publisher(address).await
    }
}

impl std::fmt::Debug for RelayDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayDispatcher")
            .field("pool_size", &self.pool.len())
            .field("template", &self.template)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
