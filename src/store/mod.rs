//! Voucher store subsystem.
//!
//! # Voucher Lifecycle
//! ```text
//!            reserve (atomic move)           finalize
//!   Valid ──────────────────────▶ InFlight ────────────▶ Used
//!     ▲                              │
//!     └──────────── release ─────────┘
//! ```
//!
//! # Design Decisions
//! - Reservation moves the id into an in-flight set rather than deleting it,
//!   so a crash between chain submission and finalization leaves a visible
//!   trace instead of a silently lost voucher
//! - Success bookkeeping (used set, counters, audit entry) is one atomic batch
//! - The dispatcher never reads-then-writes voucher state; it only calls the
//!   atomic primitives below

pub mod memory;
pub mod redis_store;
pub mod stats;

use std::collections::BTreeMap;

use alloy::primitives::{Address, TxHash};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use memory::MemoryVoucherStore;
pub use redis_store::RedisVoucherStore;

/// Errors raised by a voucher store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend-agnostic failure (used by in-process stores and test doubles).
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Where a voucher currently sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoucherState {
    /// Redeemable.
    Valid,
    /// Reserved by an in-flight redemption.
    Reserved,
    /// Consumed by a submitted mint.
    Used,
    /// Never provisioned.
    Unknown,
}

/// Definitive result of one redemption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MintOutcome {
    /// The chain accepted the mint transaction.
    Submitted,
    /// Every sender failed; the voucher was returned.
    Exhausted,
}

/// Audit entry written once per definitive redemption outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintAttemptRecord {
    pub request_id: Uuid,
    pub voucher_id: String,
    pub destination: Address,
    pub tx_hash: Option<TxHash>,
    pub sender: Option<Address>,
    pub client_ip: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub outcome: MintOutcome,
}

impl MintAttemptRecord {
    /// UTC day bucket used by the daily counters.
    pub fn day_key(&self) -> String {
        self.timestamp.format("%Y-%m-%d").to_string()
    }

    pub fn is_success(&self) -> bool {
        self.outcome == MintOutcome::Submitted
    }
}

/// Atomic voucher set operations plus usage bookkeeping.
///
/// `reserve` must be linearizable across every process sharing the backing
/// store: two concurrent reservations of the same id never both see `true`.
#[async_trait]
pub trait VoucherStore: Send + Sync {
    /// Atomically move `voucher_id` from valid to in-flight.
    /// Returns false when the voucher was not valid.
    async fn reserve(&self, voucher_id: &str) -> StoreResult<bool>;

    /// Return a reserved voucher to the valid set.
    async fn release(&self, voucher_id: &str) -> StoreResult<()>;

    /// Move a reserved voucher to the used set.
    async fn mark_used(&self, voucher_id: &str) -> StoreResult<()>;

    /// Append an audit entry; successful records also bump the counters.
    async fn record_usage(&self, record: &MintAttemptRecord) -> StoreResult<()>;

    /// Mark used and record usage as one batch.
    ///
    /// The default runs the two steps back to back; backends that can apply
    /// them atomically override it.
    async fn finalize(&self, record: &MintAttemptRecord) -> StoreResult<()> {
        self.mark_used(&record.voucher_id).await?;
        self.record_usage(record).await
    }

    /// Current state of a voucher. Read-only.
    async fn voucher_state(&self, voucher_id: &str) -> StoreResult<VoucherState>;

    /// Vouchers currently reserved. Outside of live requests these are
    /// leftovers from a crash and need operator attention.
    async fn in_flight(&self) -> StoreResult<Vec<String>>;

    /// Successful mints per UTC day.
    async fn daily_mints(&self) -> StoreResult<BTreeMap<String, u64>>;

    /// Newest audit entries first.
    async fn recent_mints(&self, limit: usize) -> StoreResult<Vec<MintAttemptRecord>>;

    /// Destination recorded when `voucher_id` was redeemed.
    async fn binding(&self, voucher_id: &str) -> StoreResult<Option<Address>>;

    /// Whether `address` is in the publisher role set. Case-insensitive.
    async fn is_publisher(&self, address: &str) -> StoreResult<bool>;
}
