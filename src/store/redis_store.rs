//! Redis-backed voucher store.
//!
//! Key layout under the configured prefix `{p}`:
//! - `{p}:codes:valid` / `{p}:codes:inflight` / `{p}:codes:used` - sets of voucher ids
//! - `{p}:stats:daily_mints` - hash of `YYYY-MM-DD` to successful mints
//! - `{p}:stats:destinations` - hash of destination address to successful mints
//! - `{p}:mint_info:{voucher}` - hash describing the mint that consumed a voucher
//! - `{p}:audit:mints` - list of JSON `MintAttemptRecord`s, newest first
//! - `{p}:roles:publishers` - set of publisher addresses, any case

use std::collections::BTreeMap;

use alloy::primitives::Address;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::store::{MintAttemptRecord, StoreResult, VoucherState, VoucherStore};

#[derive(Debug, Clone)]
struct Keys {
    valid: String,
    in_flight: String,
    used: String,
    daily_mints: String,
    destinations: String,
    audit: String,
    publishers: String,
    prefix: String,
}

impl Keys {
    fn new(prefix: &str) -> Self {
        Self {
            valid: format!("{}:codes:valid", prefix),
            in_flight: format!("{}:codes:inflight", prefix),
            used: format!("{}:codes:used", prefix),
            daily_mints: format!("{}:stats:daily_mints", prefix),
            destinations: format!("{}:stats:destinations", prefix),
            audit: format!("{}:audit:mints", prefix),
            publishers: format!("{}:roles:publishers", prefix),
            prefix: prefix.to_string(),
        }
    }

    fn mint_info(&self, voucher_id: &str) -> String {
        format!("{}:mint_info:{}", self.prefix, voucher_id)
    }
}

/// [`VoucherStore`] over a shared Redis instance.
///
/// Every voucher transition is a single command or a `MULTI` block, so
/// several relayer processes can share one store safely.
#[derive(Clone)]
pub struct RedisVoucherStore {
    conn: ConnectionManager,
    keys: Keys,
    audit_limit: usize,
}

impl RedisVoucherStore {
    /// Connect to Redis. The connection manager reconnects on its own afterwards.
    pub async fn connect(redis_url: &str, key_prefix: &str, audit_limit: usize) -> StoreResult<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;

        tracing::info!(prefix = %key_prefix, "Connected to Redis voucher store");

        Ok(Self {
            conn,
            keys: Keys::new(key_prefix),
            audit_limit,
        })
    }

    fn last_audit_index(&self) -> isize {
        self.audit_limit.saturating_sub(1) as isize
    }

    fn append_usage(&self, pipe: &mut redis::Pipeline, record: &MintAttemptRecord, entry: &str) {
        if record.is_success() {
            let destination = record.destination.to_string();
            let tx_hash = record.tx_hash.map(|h| h.to_string()).unwrap_or_default();
            let sender = record.sender.map(|a| a.to_string()).unwrap_or_default();
            let ip = record.client_ip.clone().unwrap_or_default();

            pipe.hincr(&self.keys.daily_mints, record.day_key(), 1)
                .ignore()
                .hincr(&self.keys.destinations, &destination, 1)
                .ignore()
                .hset_multiple(
                    self.keys.mint_info(&record.voucher_id),
                    &[
                        ("address", destination),
                        ("tx_hash", tx_hash),
                        ("sender", sender),
                        ("ip", ip),
                        ("time", record.timestamp.to_rfc3339()),
                    ],
                )
                .ignore();
        }
        pipe.lpush(&self.keys.audit, entry)
            .ignore()
            .ltrim(&self.keys.audit, 0, self.last_audit_index())
            .ignore();
    }
}

#[async_trait]
impl VoucherStore for RedisVoucherStore {
    async fn reserve(&self, voucher_id: &str) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let moved: bool = conn
            .smove(&self.keys.valid, &self.keys.in_flight, voucher_id)
            .await?;
        Ok(moved)
    }

    async fn release(&self, voucher_id: &str) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let () = redis::pipe()
            .atomic()
            .srem(&self.keys.in_flight, voucher_id)
            .ignore()
            .sadd(&self.keys.valid, voucher_id)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn mark_used(&self, voucher_id: &str) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let () = redis::pipe()
            .atomic()
            .srem(&self.keys.in_flight, voucher_id)
            .ignore()
            .sadd(&self.keys.used, voucher_id)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn record_usage(&self, record: &MintAttemptRecord) -> StoreResult<()> {
        let entry = serde_json::to_string(record)?;
        let mut pipe = redis::pipe();
        pipe.atomic();
        self.append_usage(&mut pipe, record, &entry);

        let mut conn = self.conn.clone();
        let () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn finalize(&self, record: &MintAttemptRecord) -> StoreResult<()> {
        let entry = serde_json::to_string(record)?;
        let mut pipe = redis::pipe();
        pipe.atomic()
            .srem(&self.keys.in_flight, &record.voucher_id)
            .ignore()
            .sadd(&self.keys.used, &record.voucher_id)
            .ignore();
        self.append_usage(&mut pipe, record, &entry);

        let mut conn = self.conn.clone();
        let () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn voucher_state(&self, voucher_id: &str) -> StoreResult<VoucherState> {
        let mut conn = self.conn.clone();
        let (valid, in_flight, used): (bool, bool, bool) = redis::pipe()
            .sismember(&self.keys.valid, voucher_id)
            .sismember(&self.keys.in_flight, voucher_id)
            .sismember(&self.keys.used, voucher_id)
            .query_async(&mut conn)
            .await?;

        let state = match (valid, in_flight, used) {
            (true, _, _) => VoucherState::Valid,
            (_, true, _) => VoucherState::Reserved,
            (_, _, true) => VoucherState::Used,
            _ => VoucherState::Unknown,
        };
        Ok(state)
    }

    async fn in_flight(&self) -> StoreResult<Vec<String>> {
        let mut conn = self.conn.clone();
        let mut ids: Vec<String> = conn.smembers(&self.keys.in_flight).await?;
        ids.sort();
        Ok(ids)
    }

    async fn daily_mints(&self) -> StoreResult<BTreeMap<String, u64>> {
        let mut conn = self.conn.clone();
        let counts: BTreeMap<String, u64> = conn.hgetall(&self.keys.daily_mints).await?;
        Ok(counts)
    }

    async fn recent_mints(&self, limit: usize) -> StoreResult<Vec<MintAttemptRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        let entries: Vec<String> = conn
            .lrange(&self.keys.audit, 0, limit.saturating_sub(1) as isize)
            .await?;

        let mut records = Vec::with_capacity(entries.len());
        for entry in entries {
            match serde_json::from_str(&entry) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(error = %e, "Skipping malformed audit entry"),
            }
        }
        Ok(records)
    }

    async fn binding(&self, voucher_id: &str) -> StoreResult<Option<Address>> {
        let mut conn = self.conn.clone();
        let stored: Option<String> = conn.hget(self.keys.mint_info(voucher_id), "address").await?;

        Ok(stored.and_then(|raw| match raw.parse::<Address>() {
            Ok(address) => Some(address),
            Err(e) => {
                tracing::warn!(voucher = %voucher_id, error = %e, "Malformed stored binding");
                None
            }
        }))
    }

    async fn is_publisher(&self, address: &str) -> StoreResult<bool> {
        let wanted = address.trim().to_lowercase();
        if wanted.is_empty() {
            return Ok(false);
        }
        let mut conn = self.conn.clone();
        let members: Vec<String> = conn.smembers(&self.keys.publishers).await?;
        Ok(members.iter().any(|member| member.to_lowercase() == wanted))
    }
}

impl std::fmt::Debug for RedisVoucherStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisVoucherStore")
            .field("prefix", &self.keys.prefix)
            .field("audit_limit", &self.audit_limit)
            .finish_non_exhaustive()
    }
}
