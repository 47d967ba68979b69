//! Relay dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! HTTP handler / caller
//!     → dispatcher.rs (reserve, failover loop, commit or rollback)
//!     → pool.rs (round-robin candidates, per-identity nonce guard)
//!     → blockchain (balance, fee, nonce, submit)
//!     → store (voucher sets, counters, audit log)
//! ```
//!
//! # Design Decisions
//! - One guard per identity, no pool-wide lock
//! - Per-candidate failures are values (`CandidateOutcome`), not errors
//! - Only terminal failures leave the dispatcher (`RelayError`)

pub mod dispatcher;
pub mod error;
pub mod outcome;
pub mod pool;

pub use dispatcher::{DispatchSettings, MintRequest, RelayDispatcher};
pub use error::{RelayError, RelayResult};
pub use outcome::{CandidateOutcome, MintReceipt};
pub use pool::{IdentitySnapshot, PoolError, SenderIdentity, SequenceGuard, SignerPool};
