//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{address, Address, TxHash, U256};
use async_trait::async_trait;
use parking_lot::Mutex;

use voucher_relayer::blockchain::{
    ChainGateway, GatewayError, GatewayResult, MintTemplate, SignedTransaction, Wallet,
    DEFAULT_MINT_SELECTOR,
};
use voucher_relayer::lifecycle::startup::build_pool;
use voucher_relayer::relay::{DispatchSettings, RelayDispatcher};
use voucher_relayer::store::{
    MemoryVoucherStore, MintAttemptRecord, StoreError, StoreResult, VoucherState, VoucherStore,
};

pub const CHAIN_ID: u64 = 31337;

/// Anvil development keys 0..3.
pub const KEYS: [&str; 4] = [
    "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
    "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d",
    "5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a",
    "7c852118294e51e653712a81e05800f419141751be58f605c371e15141b007a6",
];

pub const ADDRESSES: [Address; 4] = [
    address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266"),
    address!("70997970C51812dc3A010C7d01b50e0d17dc79C8"),
    address!("3C44CdDdB6a900fa2b585dd299e03d12FA4293BC"),
    address!("90F79bf6EB2c4f870365E785982E1f101E93b906"),
];

pub const CONTRACT: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");

pub const ONE_GWEI: u128 = 1_000_000_000;

pub fn one_ether() -> U256 {
    U256::from(1_000_000_000_000_000_000u128)
}

/// `0xDEAD`, left-padded.
pub fn dead() -> Address {
    address!("000000000000000000000000000000000000dEaD")
}

/// Scripted response for the next submission from a sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scripted {
    /// Another party consumed the nonce: the chain nonce jumps past it.
    StaleNonce,
    /// Generic node failure.
    Transient,
    /// Never answers.
    Hang,
}

/// A gateway call as observed by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    Balance(Address),
    NextSequence(Address),
    Fee,
    Submit { sender: Address, nonce: u64 },
}

impl GatewayCall {
    pub fn address(&self) -> Option<Address> {
        match self {
            GatewayCall::Balance(a) | GatewayCall::NextSequence(a) => Some(*a),
            GatewayCall::Submit { sender, .. } => Some(*sender),
            GatewayCall::Fee => None,
        }
    }
}

#[derive(Debug, Default)]
struct ChainState {
    balances: HashMap<Address, U256>,
    nonces: HashMap<Address, u64>,
    scripts: HashMap<Address, VecDeque<Scripted>>,
    calls: Vec<GatewayCall>,
    accepted: Vec<SignedTransaction>,
}

/// In-process chain: tracks nonces like a node and replays scripted failures.
///
/// Unknown addresses hold one ether and start at nonce zero.
#[derive(Debug)]
pub struct ScriptedGateway {
    state: Mutex<ChainState>,
    fee: u128,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ChainState::default()),
            fee: ONE_GWEI,
        }
    }

    pub fn with_balance(self, address: Address, balance: U256) -> Self {
        self.state.lock().balances.insert(address, balance);
        self
    }

    pub fn with_nonce(self, address: Address, nonce: u64) -> Self {
        self.state.lock().nonces.insert(address, nonce);
        self
    }

    pub fn with_script(self, address: Address, script: &[Scripted]) -> Self {
        self.state
            .lock()
            .scripts
            .entry(address)
            .or_default()
            .extend(script.iter().copied());
        self
    }

    /// Script every future submission from `address`.
    pub fn always(self, address: Address, response: Scripted) -> Self {
        self.with_script(address, &[response; 64])
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn accepted(&self) -> Vec<SignedTransaction> {
        self.state.lock().accepted.clone()
    }

    pub fn chain_nonce(&self, address: Address) -> u64 {
        self.state.lock().nonces.get(&address).copied().unwrap_or(0)
    }

    pub fn submissions(&self) -> Vec<(Address, u64)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                GatewayCall::Submit { sender, nonce } => Some((sender, nonce)),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ChainGateway for ScriptedGateway {
    async fn get_balance(&self, address: Address) -> GatewayResult<U256> {
        let mut state = self.state.lock();
        state.calls.push(GatewayCall::Balance(address));
        Ok(state.balances.get(&address).copied().unwrap_or_else(one_ether))
    }

    async fn get_next_sequence(&self, address: Address) -> GatewayResult<u64> {
        let mut state = self.state.lock();
        state.calls.push(GatewayCall::NextSequence(address));
        Ok(state.nonces.get(&address).copied().unwrap_or(0))
    }

    async fn get_fee_estimate(&self) -> GatewayResult<u128> {
        self.state.lock().calls.push(GatewayCall::Fee);
        Ok(self.fee)
    }

    async fn submit_transaction(&self, tx: &SignedTransaction) -> GatewayResult<TxHash> {
        let scripted = {
            let mut state = self.state.lock();
            state.calls.push(GatewayCall::Submit {
                sender: tx.sender,
                nonce: tx.nonce,
            });
            let scripted = state.scripts.get_mut(&tx.sender).and_then(VecDeque::pop_front);

            match scripted {
                Some(Scripted::StaleNonce) => {
                    let next = state.nonces.entry(tx.sender).or_insert(0);
                    *next = (*next).max(tx.nonce + 1);
                    return Err(GatewayError::SequenceTooLow("nonce too low".to_string()));
                }
                Some(Scripted::Transient) => {
                    return Err(GatewayError::Rpc("connection reset by peer".to_string()));
                }
                Some(Scripted::Hang) => Some(Scripted::Hang),
                None => {
                    let next = state.nonces.entry(tx.sender).or_insert(0);
                    if tx.nonce < *next {
                        return Err(GatewayError::SequenceTooLow(format!(
                            "nonce too low: next nonce {}, tx nonce {}",
                            next, tx.nonce
                        )));
                    }
                    *next = tx.nonce + 1;
                    state.accepted.push(tx.clone());
                    None
                }
            }
        };

        if scripted == Some(Scripted::Hang) {
            tokio::time::sleep(Duration::from_secs(30)).await;
            return Err(GatewayError::Rpc("hung call returned".to_string()));
        }
        Ok(tx.hash)
    }
}

/// Memory store with switchable failures.
#[derive(Debug, Default)]
pub struct FlakyStore {
    pub inner: MemoryVoucherStore,
    pub fail_reserve: AtomicBool,
    pub fail_release: AtomicBool,
    pub fail_finalize: AtomicBool,
}

impl FlakyStore {
    pub fn with_vouchers(vouchers: &[&str]) -> Self {
        Self {
            inner: MemoryVoucherStore::with_vouchers(100, vouchers.iter().copied()),
            ..Self::default()
        }
    }

    fn check(flag: &AtomicBool, op: &str) -> StoreResult<()> {
        if flag.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable(format!("{} failed", op)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl VoucherStore for FlakyStore {
    async fn reserve(&self, voucher_id: &str) -> StoreResult<bool> {
        Self::check(&self.fail_reserve, "reserve")?;
        self.inner.reserve(voucher_id).await
    }

    async fn release(&self, voucher_id: &str) -> StoreResult<()> {
        Self::check(&self.fail_release, "release")?;
        self.inner.release(voucher_id).await
    }

    async fn mark_used(&self, voucher_id: &str) -> StoreResult<()> {
        self.inner.mark_used(voucher_id).await
    }

    async fn record_usage(&self, record: &MintAttemptRecord) -> StoreResult<()> {
        self.inner.record_usage(record).await
    }

    async fn finalize(&self, record: &MintAttemptRecord) -> StoreResult<()> {
        Self::check(&self.fail_finalize, "finalize")?;
        self.inner.finalize(record).await
    }

    async fn voucher_state(&self, voucher_id: &str) -> StoreResult<VoucherState> {
        self.inner.voucher_state(voucher_id).await
    }

    async fn in_flight(&self) -> StoreResult<Vec<String>> {
        self.inner.in_flight().await
    }

    async fn daily_mints(&self) -> StoreResult<BTreeMap<String, u64>> {
        self.inner.daily_mints().await
    }

    async fn recent_mints(&self, limit: usize) -> StoreResult<Vec<MintAttemptRecord>> {
        self.inner.recent_mints(limit).await
    }

    async fn binding(&self, voucher_id: &str) -> StoreResult<Option<Address>> {
        self.inner.binding(voucher_id).await
    }

    async fn is_publisher(&self, address: &str) -> StoreResult<bool> {
        self.inner.is_publisher(address).await
    }
}

pub fn test_settings() -> DispatchSettings {
    DispatchSettings {
        min_balance: U256::from(10_000_000_000_000_000u64),
        call_timeout: Duration::from_millis(200),
        stale_sequence_retries: 1,
        max_gas_price: None,
    }
}

pub fn template() -> MintTemplate {
    MintTemplate::new(CONTRACT, DEFAULT_MINT_SELECTOR, 250_000)
}

/// A dispatcher wired to the scripted chain and a flaky memory store.
pub struct Harness {
    pub dispatcher: Arc<RelayDispatcher>,
    pub gateway: Arc<ScriptedGateway>,
    pub store: Arc<FlakyStore>,
}

impl Harness {
    pub async fn new(pool_size: usize, vouchers: &[&str], gateway: ScriptedGateway) -> Self {
        Self::with_settings(pool_size, vouchers, gateway, test_settings()).await
    }

    pub async fn with_settings(
        pool_size: usize,
        vouchers: &[&str],
        gateway: ScriptedGateway,
        settings: DispatchSettings,
    ) -> Self {
        let gateway = Arc::new(gateway);
        let store = Arc::new(FlakyStore::with_vouchers(vouchers));

        let wallets = KEYS[..pool_size]
            .iter()
            .map(|key| Wallet::from_private_key(key, CHAIN_ID).unwrap())
            .collect();
        let pool = build_pool(wallets, gateway.as_ref()).await.unwrap();
        // Seeding queried every nonce; tests only look at relay traffic
        gateway.clear_calls();

        let dispatcher = Arc::new(RelayDispatcher::new(
            Arc::new(pool),
            gateway.clone(),
            store.clone(),
            template(),
            settings,
        ));

        Self {
            dispatcher,
            gateway,
            store,
        }
    }

    pub async fn state(&self, voucher: &str) -> VoucherState {
        self.store.voucher_state(voucher).await.unwrap()
    }

    /// Poll until `voucher` reaches `want`, for redemptions still running
    /// after their caller went away.
    pub async fn wait_for_state(&self, voucher: &str, want: VoucherState) -> VoucherState {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
        loop {
            let state = self.state(voucher).await;
            if state == want || tokio::time::Instant::now() >= deadline {
                return state;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}
