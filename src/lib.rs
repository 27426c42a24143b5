//! Sucker Monitor: cross-chain transfer tracking core
//!
//! Tracks the lifecycle of asset transfers moving through paired "sucker"
//! bridge contracts, reconciling each transfer's true state across three
//! independent sources of truth: the source chain's outbox, the
//! destination-side claims backend, and the locally persisted transfer
//! ledger.
//!
//! - **Discovery** - worklist traversal of the cross-chain sucker-pair graph
//! - **Classification** - which bridge technology backs a sucker, and its
//!   per-direction cost/timing/step profile
//! - **Reconciliation** - the background scheduler advancing transfer
//!   statuses from outbox counters and backend claim records
//! - **Ledger** - the persisted transfer store with change notification
//! - **Proof codec** - normalization of backend proofs into the fixed-width
//!   structure the destination claim call validates
//!
//! Wallets, forms, and progress bars are somebody else's problem: callers
//! drive discovery and observe the ledger; the reconciler does the rest.

pub mod backend;
pub mod cache;
pub mod chain;
pub mod classifier;
pub mod config;
pub mod contracts;
pub mod discovery;
pub mod ledger;
pub mod metrics;
pub mod proof;
pub mod reconciler;
pub mod server;
pub mod types;

// Re-export commonly used items at the crate root
pub use backend::{ClaimsBackend, HttpClaimsBackend};
pub use chain::{ChainQuery, EvmChainQuery};
pub use classifier::{
    direction_of, BridgeClassification, BridgeClassifier, BridgeKind, BridgeProfile, Direction,
};
pub use discovery::{DiscoveryResult, PairDiscoveryEngine, ProjectSuckerMapping};
pub use ledger::{BridgeTransfer, LedgerEvent, NewBridgeTransfer, TransactionLedger};
pub use proof::{normalize_proof, RawProofElement, PROOF_DEPTH, ZERO_HASH};
pub use reconciler::{ReconcilerConfig, StateReconciler};
pub use types::{
    pair_id, ClaimLeaf, ClaimRecord, OutboxSnapshot, RawSuckerPair, SuckerEndpoint, SuckerPair,
    TransferStatus,
};
