// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for flagstore.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The hosting application is responsible for choosing the exporter
//! (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `flagstore_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `operation`: features, get, get_multi, get_all, add, remove, clear, enable, disable
//! - `outcome`: success, error

use std::time::Duration;

use metrics::{counter, histogram};

/// Record a read served from the secondary after a matched primary failure.
pub fn record_failover(operation: &str) {
    counter!(
        "flagstore_failover_total",
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Record one reconciliation pass and its duration.
pub fn record_sync_pass(outcome: &str, duration: Duration) {
    counter!(
        "flagstore_sync_pass_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
    histogram!(
        "flagstore_sync_pass_seconds",
        "outcome" => outcome.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record a throttled reconciliation attempt (interval not elapsed, or a
/// pass already in flight).
pub fn record_sync_skip() {
    counter!("flagstore_sync_skip_total").increment(1);
}

/// Record the mutations a reconciliation pass applied to the local store.
pub fn record_reconcile_ops(kind: &str, count: usize) {
    if count > 0 {
        counter!(
            "flagstore_reconcile_ops_total",
            "kind" => kind.to_string()
        )
        .increment(count as u64);
    }
}
