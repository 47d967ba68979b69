//! Sender identity pool.
//!
//! # Responsibilities
//! - Own the fixed set of sender identities for the life of the process
//! - Rotate through them with a shared atomic cursor
//! - Serialize use of each identity's nonce behind its own guard

use std::sync::atomic::{AtomicUsize, Ordering};

use alloy::primitives::Address;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};

use crate::blockchain::Wallet;

/// Exclusive access to one identity's cached next nonce.
///
/// Dropping the guard releases the identity.
pub type SequenceGuard<'a> = MutexGuard<'a, u64>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("Signer pool needs at least one identity")]
    Empty,

    #[error("Identity at position {position} carries index {index}")]
    Misnumbered { position: usize, index: usize },
}

/// One pooled sender account.
#[derive(Debug)]
pub struct SenderIdentity {
    index: usize,
    wallet: Wallet,
    sequence: Mutex<u64>,
}

impl SenderIdentity {
    /// `next_sequence` must be the chain's pending nonce for the wallet address.
    pub fn new(index: usize, wallet: Wallet, next_sequence: u64) -> Self {
        Self {
            index,
            wallet,
            sequence: Mutex::new(next_sequence),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    /// Wait for exclusive use of this identity.
    pub async fn lock(&self) -> SequenceGuard<'_> {
        self.sequence.lock().await
    }

    /// Cached nonce, or `None` while a request holds the guard.
    pub fn try_peek_sequence(&self) -> Option<u64> {
        self.sequence.try_lock().ok().map(|guard| *guard)
    }
}

/// Point-in-time view of one identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentitySnapshot {
    pub index: usize,
    pub address: Address,
    /// `None` while the identity is busy.
    pub next_sequence: Option<u64>,
}

/// Fixed-size round-robin pool.
#[derive(Debug)]
pub struct SignerPool {
    identities: Vec<SenderIdentity>,
    cursor: AtomicUsize,
}

impl SignerPool {
    /// Each identity's index must equal its position in `identities`.
    pub fn new(identities: Vec<SenderIdentity>) -> Result<Self, PoolError> {
        if identities.is_empty() {
            return Err(PoolError::Empty);
        }
        if let Some((position, identity)) = identities
            .iter()
            .enumerate()
            .find(|(position, identity)| identity.index != *position)
        {
            return Err(PoolError::Misnumbered {
                position,
                index: identity.index,
            });
        }
        Ok(Self {
            identities,
            cursor: AtomicUsize::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// Advance the cursor and return the identity it pointed at.
    ///
    /// Does not lock the identity or look at its balance.
    pub fn acquire_next(&self) -> &SenderIdentity {
        let position = self.cursor.fetch_add(1, Ordering::Relaxed) % self.identities.len();
        &self.identities[position]
    }

    pub fn identity_at(&self, index: usize) -> Option<&SenderIdentity> {
        self.identities.get(index)
    }

    /// One full rotation of distinct candidates for a single request.
    ///
    /// Starts at [`acquire_next`](Self::acquire_next) and walks the rest of
    /// the ring from there. The cursor moves once per call, so N sequential
    /// requests start on N consecutive identities.
    pub fn rotation(&self) -> impl Iterator<Item = &SenderIdentity> + '_ {
        let start = self.acquire_next().index();
        let len = self.identities.len();
        (0..len).map(move |i| &self.identities[(start + i) % len])
    }

    /// Non-blocking snapshot of every identity.
    pub fn snapshot(&self) -> Vec<IdentitySnapshot> {
        self.identities
            .iter()
            .map(|identity| IdentitySnapshot {
                index: identity.index(),
                address: identity.address(),
                next_sequence: identity.try_peek_sequence(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYS: [&str; 3] = [
        "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d",
        "5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a",
    ];

    fn pool() -> SignerPool {
        let identities = KEYS
            .iter()
            .enumerate()
            .map(|(i, key)| SenderIdentity::new(i, Wallet::from_private_key(key, 31337).unwrap(), 10 * i as u64))
            .collect();
        SignerPool::new(identities).unwrap()
    }

    #[test]
    fn test_empty_pool_rejected() {
        assert_eq!(SignerPool::new(Vec::new()).unwrap_err(), PoolError::Empty);
    }

    #[test]
    fn test_misnumbered_identities_rejected() {
        let identities = vec![SenderIdentity::new(1, Wallet::from_private_key(KEYS[0], 31337).unwrap(), 0)];
        assert_eq!(
            SignerPool::new(identities).unwrap_err(),
            PoolError::Misnumbered { position: 0, index: 1 }
        );
    }

    #[test]
    fn test_rotation_shares_cursor_with_acquire_next() {
        let pool = pool();
        assert_eq!(pool.acquire_next().index(), 0);
        let order: Vec<_> = pool.rotation().map(|id| id.index()).collect();
        assert_eq!(order, vec![1, 2, 0]);
        assert_eq!(pool.acquire_next().index(), 2);
    }

    #[test]
    fn test_acquire_next_wraps() {
        let pool = pool();
        let order: Vec<_> = (0..7).map(|_| pool.acquire_next().index()).collect();
        assert_eq!(order, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn test_rotation_visits_each_once() {
        let pool = pool();
        let first: Vec<_> = pool.rotation().map(|id| id.index()).collect();
        assert_eq!(first, vec![0, 1, 2]);

        let second: Vec<_> = pool.rotation().map(|id| id.index()).collect();
        assert_eq!(second, vec![1, 2, 0]);
    }

    #[test]
    fn test_identity_at() {
        let pool = pool();
        assert_eq!(pool.identity_at(2).unwrap().index(), 2);
        assert!(pool.identity_at(3).is_none());
    }

    #[tokio::test]
    async fn test_snapshot_hides_busy_identity() {
        let pool = pool();
        let guard = pool.identity_at(1).unwrap().lock().await;

        let snapshot = pool.snapshot();
        assert_eq!(snapshot[0].next_sequence, Some(0));
        assert_eq!(snapshot[1].next_sequence, None);
        assert_eq!(snapshot[2].next_sequence, Some(20));

        drop(guard);
        assert_eq!(pool.snapshot()[1].next_sequence, Some(10));
    }

    #[tokio::test]
    async fn test_guard_mutation_persists() {
        let pool = pool();
        let identity = pool.identity_at(0).unwrap();
        {
            let mut seq = identity.lock().await;
            *seq += 1;
        }
        assert_eq!(identity.try_peek_sequence(), Some(1));
    }
}
