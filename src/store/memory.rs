//! Process-local voucher store.
//!
//! Every operation takes one lock over all sets, which makes each call
//! (including the finalize batch) atomic with respect to the others.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use alloy::primitives::Address;
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::store::{MintAttemptRecord, StoreResult, VoucherState, VoucherStore};

#[derive(Debug, Default)]
struct Sets {
    valid: HashSet<String>,
    in_flight: HashSet<String>,
    used: HashSet<String>,
    daily_mints: BTreeMap<String, u64>,
    destinations: HashMap<Address, u64>,
    mint_info: HashMap<String, MintAttemptRecord>,
    audit: VecDeque<MintAttemptRecord>,
    /// Lowercased.
    publishers: HashSet<String>,
}

impl Sets {
    fn move_to_used(&mut self, voucher_id: &str) {
        self.in_flight.remove(voucher_id);
        self.used.insert(voucher_id.to_string());
    }

    fn append(&mut self, record: &MintAttemptRecord, limit: usize) {
        if record.is_success() {
            *self.daily_mints.entry(record.day_key()).or_insert(0) += 1;
            *self.destinations.entry(record.destination).or_insert(0) += 1;
            self.mint_info.insert(record.voucher_id.clone(), record.clone());
        }
        self.audit.push_front(record.clone());
        self.audit.truncate(limit);
    }
}

/// In-memory [`VoucherStore`].
#[derive(Debug)]
pub struct MemoryVoucherStore {
    sets: Mutex<Sets>,
    audit_limit: usize,
}

impl MemoryVoucherStore {
    pub fn new(audit_limit: usize) -> Self {
        Self {
            sets: Mutex::new(Sets::default()),
            audit_limit,
        }
    }

    /// Create a store pre-seeded with valid vouchers.
    pub fn with_vouchers<I, S>(audit_limit: usize, vouchers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new(audit_limit);
        store.provision(vouchers);
        store
    }

    /// Add vouchers to the valid set. Ids that were ever reserved or used are ignored.
    pub fn provision<I, S>(&self, vouchers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut sets = self.sets.lock();
        for id in vouchers {
            let id = id.into();
            if !sets.used.contains(&id) && !sets.in_flight.contains(&id) {
                sets.valid.insert(id);
            }
        }
    }

    /// Successful mints per destination.
    pub fn mints_to(&self, destination: &Address) -> u64 {
        self.sets.lock().destinations.get(destination).copied().unwrap_or(0)
    }

    /// Grant the publisher role.
    pub fn add_publisher(&self, address: &str) {
        self.sets.lock().publishers.insert(address.trim().to_lowercase());
    }
}

impl Default for MemoryVoucherStore {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[async_trait]
impl VoucherStore for MemoryVoucherStore {
    async fn reserve(&self, voucher_id: &str) -> StoreResult<bool> {
        let mut sets = self.sets.lock();
        if sets.valid.remove(voucher_id) {
            sets.in_flight.insert(voucher_id.to_string());
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn release(&self, voucher_id: &str) -> StoreResult<()> {
        let mut sets = self.sets.lock();
        sets.in_flight.remove(voucher_id);
        sets.valid.insert(voucher_id.to_string());
        Ok(())
    }

    async fn mark_used(&self, voucher_id: &str) -> StoreResult<()> {
        self.sets.lock().move_to_used(voucher_id);
        Ok(())
    }

    async fn record_usage(&self, record: &MintAttemptRecord) -> StoreResult<()> {
        self.sets.lock().append(record, self.audit_limit);
        Ok(())
    }

    async fn finalize(&self, record: &MintAttemptRecord) -> StoreResult<()> {
        let mut sets = self.sets.lock();
        sets.move_to_used(&record.voucher_id);
        sets.append(record, self.audit_limit);
        Ok(())
    }

    async fn voucher_state(&self, voucher_id: &str) -> StoreResult<VoucherState> {
        let sets = self.sets.lock();
        let state = if sets.valid.contains(voucher_id) {
            VoucherState::Valid
        } else if sets.in_flight.contains(voucher_id) {
            VoucherState::Reserved
        } else if sets.used.contains(voucher_id) {
            VoucherState::Used
        } else {
            VoucherState::Unknown
        };
        Ok(state)
    }

    async fn in_flight(&self) -> StoreResult<Vec<String>> {
        let mut ids: Vec<_> = self.sets.lock().in_flight.iter().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    async fn daily_mints(&self) -> StoreResult<BTreeMap<String, u64>> {
        Ok(self.sets.lock().daily_mints.clone())
    }

    async fn recent_mints(&self, limit: usize) -> StoreResult<Vec<MintAttemptRecord>> {
        Ok(self.sets.lock().audit.iter().take(limit).cloned().collect())
    }

    async fn binding(&self, voucher_id: &str) -> StoreResult<Option<Address>> {
        Ok(self.sets.lock().mint_info.get(voucher_id).map(|record| record.destination))
    }

    async fn is_publisher(&self, address: &str) -> StoreResult<bool> {
        Ok(self.sets.lock().publishers.contains(&address.trim().to_lowercase()))
    }
}
