//! Prometheus metrics for the sucker monitor
//!
//! Exposed on /metrics for scraping.

#![allow(dead_code)]

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, Counter, CounterVec, Gauge,
};

lazy_static! {
    // Reconciliation sweeps
    pub static ref SWEEPS_TOTAL: Counter = register_counter!(
        "monitor_sweeps_total",
        "Total number of reconciliation sweeps started"
    ).unwrap();

    pub static ref SWEEPS_SKIPPED: Counter = register_counter!(
        "monitor_sweeps_skipped_total",
        "Sweeps skipped because a prior one was still in flight"
    ).unwrap();

    // Collaborator traffic
    pub static ref OUTBOX_FETCHES: CounterVec = register_counter_vec!(
        "monitor_outbox_fetches_total",
        "Outbox snapshot fetches issued (cache misses)",
        &["chain"]
    ).unwrap();

    pub static ref CLAIMS_REQUESTS: CounterVec = register_counter_vec!(
        "monitor_claims_requests_total",
        "Claims backend requests issued",
        &["chain"]
    ).unwrap();

    // Transfer progress
    pub static ref TRANSFERS_ADVANCED: CounterVec = register_counter_vec!(
        "monitor_transfers_advanced_total",
        "Status transitions applied by the reconciler",
        &["status"]
    ).unwrap();

    pub static ref TRANSFERS_MATERIALIZED: CounterVec = register_counter_vec!(
        "monitor_transfers_materialized_total",
        "Transfers created from backend claim data alone",
        &["chain"]
    ).unwrap();

    // Error counts
    pub static ref RECONCILE_ERRORS: CounterVec = register_counter_vec!(
        "monitor_reconcile_errors_total",
        "Reconciliation failures by pass",
        &["pass"]
    ).unwrap();

    // Discovery
    pub static ref DISCOVERED_PAIRS: Gauge = register_gauge!(
        "monitor_discovered_pairs",
        "Sucker pairs found by the most recent discovery run"
    ).unwrap();

    // Health
    pub static ref UP: Gauge = register_gauge!(
        "monitor_up",
        "Whether the monitor is running (1 = up)"
    ).unwrap();
}
