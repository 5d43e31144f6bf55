// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! One full-state reconciliation pass from a remote adapter into a local one.
//!
//! Each pass snapshots the remote's complete feature state and applies the
//! difference to the local store. Passes are self-correcting: a missed
//! interval or an aborted pass is absorbed by the next one, because every
//! pass diffs against the remote's state at call time rather than feeding an
//! incremental change log.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::storage::traits::{Adapter, AdapterError};

/// Counts of the mutations one pass applied to the local store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    /// Features registered locally because the remote has them.
    pub added: usize,
    /// Features removed locally because the remote no longer has them.
    pub removed: usize,
    /// Features whose gate state was brought up to date.
    pub updated: usize,
}

impl PassStats {
    /// True when the pass found local and remote already identical.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.added == 0 && self.removed == 0 && self.updated == 0
    }
}

/// Copies remote feature state into a local adapter, one pass at a time.
///
/// With `raise_exceptions` unset (the default) a failed pass is logged and
/// discarded: the local store keeps serving its last-known-good state, plus
/// whatever mutations the pass had applied before failing. There is no
/// all-or-nothing guarantee within a pass, only at-least-once per entity
/// across passes.
pub struct Synchronizer {
    local: Arc<dyn Adapter>,
    remote: Arc<dyn Adapter>,
    raise_exceptions: bool,
}

impl Synchronizer {
    #[must_use]
    pub fn new(
        local: Arc<dyn Adapter>,
        remote: Arc<dyn Adapter>,
        raise_exceptions: bool,
    ) -> Self {
        Self {
            local,
            remote,
            raise_exceptions,
        }
    }

    /// Run one reconciliation pass.
    pub async fn run(&self) -> Result<PassStats, AdapterError> {
        let started = Instant::now();
        match self.reconcile().await {
            Ok(stats) => {
                crate::metrics::record_sync_pass("success", started.elapsed());
                crate::metrics::record_reconcile_ops("add", stats.added);
                crate::metrics::record_reconcile_ops("remove", stats.removed);
                crate::metrics::record_reconcile_ops("update", stats.updated);
                if !stats.is_noop() {
                    debug!(
                        added = stats.added,
                        removed = stats.removed,
                        updated = stats.updated,
                        "reconciliation pass applied changes"
                    );
                }
                Ok(stats)
            }
            Err(err) if !self.raise_exceptions => {
                crate::metrics::record_sync_pass("error", started.elapsed());
                warn!(error = %err, "reconciliation pass failed, keeping last known local state");
                Ok(PassStats::default())
            }
            Err(err) => {
                crate::metrics::record_sync_pass("error", started.elapsed());
                Err(err)
            }
        }
    }

    async fn reconcile(&self) -> Result<PassStats, AdapterError> {
        let remote_all = self.remote.get_all().await?;
        let local_all = self.local.get_all().await?;
        let mut stats = PassStats::default();

        for feature in local_all.keys() {
            if !remote_all.contains_key(feature) {
                self.local.remove(feature).await?;
                stats.removed += 1;
            }
        }

        for (feature, remote_state) in &remote_all {
            match local_all.get(feature) {
                None => {
                    self.local.add(feature).await?;
                    for (gate, value) in remote_state.iter() {
                        self.local.enable(feature, gate, value).await?;
                    }
                    stats.added += 1;
                }
                Some(local_state) if local_state != remote_state => {
                    for (gate, value) in remote_state.iter() {
                        if local_state.gate(gate) != Some(value) {
                            self.local.enable(feature, gate, value).await?;
                        }
                    }
                    for (gate, value) in local_state.iter() {
                        if remote_state.gate(gate).is_none() {
                            self.local.disable(feature, gate, value).await?;
                        }
                    }
                    stats.updated += 1;
                }
                Some(_) => {}
            }
        }

        Ok(stats)
    }
}
