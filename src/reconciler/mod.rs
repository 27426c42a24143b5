//! State reconciliation scheduler
//!
//! Periodically reconciles every locally known transfer against the two
//! remote sources of truth: the source chain's outbox (`outbox.rs`) and the
//! destination-side claims backend (`claims.rs`). All reconciliation is
//! cooperative polling — timed sweeps, nothing event-driven — and a failure
//! anywhere resolves to "no change this cycle", never a crash.
//!
//! Two timers drive the loop: a full sweep (on-chain pass plus, when due,
//! the rate-limited backend pass) and a faster on-chain-only path. A sweep
//! never starts while a prior one is in flight; the overlapping sweep is
//! skipped, since running it would only double-count RPC calls.

use alloy::primitives::Address;
use eyre::Result;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::backend::ClaimsBackend;
use crate::cache::TtlCache;
use crate::chain::ChainQuery;
use crate::classifier::BridgeClassifier;
use crate::ledger::TransactionLedger;
use crate::metrics;
use crate::types::OutboxSnapshot;

mod claims;
mod outbox;

pub use outbox::should_advance;

/// Outbox snapshots cached per (source chain, sucker, token)
pub(crate) type OutboxKey = (u64, Address, Address);

/// Max distinct outbox groups cached between sweeps
const OUTBOX_CACHE_SIZE: usize = 1024;

/// Scheduler cadence and cache policy.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconcilerConfig {
    /// Full-ledger sweep interval
    pub sweep_interval_secs: u64,
    /// On-chain-only fast path interval
    pub fast_path_interval_secs: u64,
    /// Outbox snapshot TTL
    pub outbox_ttl_secs: u64,
    /// Minimum spacing between claims backend calls
    pub backend_min_interval_secs: u64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 30,
            fast_path_interval_secs: 15,
            outbox_ttl_secs: 30,
            backend_min_interval_secs: 60,
        }
    }
}

/// The background scheduler reconciling ledger state against chain and
/// backend truth.
pub struct StateReconciler {
    config: ReconcilerConfig,
    ledger: TransactionLedger,
    chain: Arc<dyn ChainQuery>,
    backend: Arc<dyn ClaimsBackend>,
    classifier: Arc<BridgeClassifier>,
    outbox_cache: TtlCache<OutboxKey, OutboxSnapshot>,
    in_flight: AtomicBool,
    last_backend_pass: Option<Instant>,
}

impl StateReconciler {
    pub fn new(
        config: ReconcilerConfig,
        ledger: TransactionLedger,
        chain: Arc<dyn ChainQuery>,
        backend: Arc<dyn ClaimsBackend>,
        classifier: Arc<BridgeClassifier>,
    ) -> Self {
        let outbox_cache = TtlCache::with_ttl(
            OUTBOX_CACHE_SIZE,
            Duration::from_secs(config.outbox_ttl_secs),
        );
        Self {
            config,
            ledger,
            chain,
            backend,
            classifier,
            outbox_cache,
            in_flight: AtomicBool::new(false),
            last_backend_pass: None,
        }
    }

    /// Run the reconciliation loop until shutdown.
    ///
    /// A sweep in progress is never interrupted; on shutdown the loop exits
    /// after the current await point and the timers die with it.
    pub async fn run(mut self, mut shutdown: mpsc::Receiver<()>) -> Result<()> {
        tracing::info!(
            sweep_interval_secs = self.config.sweep_interval_secs,
            fast_path_interval_secs = self.config.fast_path_interval_secs,
            backend_min_interval_secs = self.config.backend_min_interval_secs,
            "Starting state reconciler"
        );

        let mut full = tokio::time::interval(Duration::from_secs(self.config.sweep_interval_secs));
        full.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut fast =
            tokio::time::interval(Duration::from_secs(self.config.fast_path_interval_secs));
        fast.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, stopping reconciler");
                    break;
                }
                _ = full.tick() => {
                    self.sweep(true).await;
                }
                _ = fast.tick() => {
                    self.sweep(false).await;
                }
            }
        }

        Ok(())
    }

    /// Run one reconciliation cycle. Returns false if skipped because a
    /// prior cycle was still in flight.
    pub async fn sweep(&mut self, include_backend: bool) -> bool {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            tracing::warn!("Sweep already in flight, skipping this cycle");
            metrics::SWEEPS_SKIPPED.inc();
            return false;
        }
        metrics::SWEEPS_TOTAL.inc();

        if let Err(e) = self.outbox_pass().await {
            metrics::RECONCILE_ERRORS.with_label_values(&["outbox"]).inc();
            tracing::error!(error = %e, "On-chain reconciliation pass failed");
        }

        if include_backend && self.backend_pass_due() {
            if let Err(e) = self.claims_pass().await {
                metrics::RECONCILE_ERRORS.with_label_values(&["claims"]).inc();
                tracing::error!(error = %e, "Backend reconciliation pass failed");
            }
            self.last_backend_pass = Some(Instant::now());
        }

        self.in_flight.store(false, Ordering::SeqCst);
        true
    }

    fn backend_pass_due(&self) -> bool {
        match self.last_backend_pass {
            Some(last) => last.elapsed() >= Duration::from_secs(self.config.backend_min_interval_secs),
            None => true,
        }
    }

    pub(crate) fn ledger(&self) -> &TransactionLedger {
        &self.ledger
    }

    pub(crate) fn chain(&self) -> &Arc<dyn ChainQuery> {
        &self.chain
    }

    pub(crate) fn backend(&self) -> &Arc<dyn ClaimsBackend> {
        &self.backend
    }

    pub(crate) fn classifier(&self) -> &Arc<BridgeClassifier> {
        &self.classifier
    }

    /// Outbox snapshot for a group, via the TTL cache
    pub(crate) async fn outbox_snapshot(&mut self, key: OutboxKey) -> Result<OutboxSnapshot> {
        if let Some(snapshot) = self.outbox_cache.get(&key) {
            return Ok(snapshot);
        }
        let (chain_id, sucker, token) = key;
        let snapshot = self.chain.outbox_of(chain_id, sucker, token).await?;
        metrics::OUTBOX_FETCHES
            .with_label_values(&[chain_id.to_string().as_str()])
            .inc();
        self.outbox_cache.insert(key, snapshot.clone());
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReconcilerConfig::default();
        assert_eq!(config.sweep_interval_secs, 30);
        assert_eq!(config.fast_path_interval_secs, 15);
        assert_eq!(config.outbox_ttl_secs, 30);
        assert_eq!(config.backend_min_interval_secs, 60);
    }
}
