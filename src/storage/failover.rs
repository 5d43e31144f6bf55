// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Failover composition: a primary adapter with error-matched fallback to a
//! secondary.
//!
//! Reads go to the primary; when the primary fails with a configured error
//! kind, the same read is served from the secondary instead. Errors outside
//! the configured set propagate unchanged, so callers can still distinguish
//! "primary is down" from "the request was invalid". Writes always target
//! the primary; with `dual_write` set they are mirrored to the secondary as
//! a side effect whose failure also propagates. Replication is best-effort,
//! never silently dropped.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use super::traits::{Adapter, AdapterError};
use crate::config::FailoverConfig;
use crate::state::GateValues;

/// Serves reads from `primary` with fallback to `secondary` on matched
/// error kinds; routes writes to `primary` with optional dual-write.
///
/// There is no atomicity across the pair: a dual-write failure surfaces to
/// the caller even though the primary write already took effect.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use flagstore::{Adapter, ErrorKind, FailoverAdapter, FailoverConfig, MemoryAdapter};
///
/// # fn wire(primary: Arc<dyn Adapter>) {
/// let secondary: Arc<dyn Adapter> = Arc::new(MemoryAdapter::new());
/// let failover = FailoverAdapter::new(
///     primary,
///     secondary,
///     FailoverConfig {
///         dual_write: true,
///         error_kinds: Some(vec![ErrorKind::Connection, ErrorKind::Timeout]),
///     },
/// );
/// # }
/// ```
pub struct FailoverAdapter {
    primary: Arc<dyn Adapter>,
    secondary: Arc<dyn Adapter>,
    config: FailoverConfig,
}

impl FailoverAdapter {
    #[must_use]
    pub fn new(
        primary: Arc<dyn Adapter>,
        secondary: Arc<dyn Adapter>,
        config: FailoverConfig,
    ) -> Self {
        Self {
            primary,
            secondary,
            config,
        }
    }

    /// Failover on every error kind, no dual-write.
    #[must_use]
    pub fn with_defaults(primary: Arc<dyn Adapter>, secondary: Arc<dyn Adapter>) -> Self {
        Self::new(primary, secondary, FailoverConfig::default())
    }

    fn fails_over(&self, err: &AdapterError) -> bool {
        self.config.matches(err.kind())
    }

    fn note_failover(&self, operation: &str, err: &AdapterError) {
        warn!(
            operation,
            error = %err,
            kind = ?err.kind(),
            "primary read failed, serving from secondary"
        );
        crate::metrics::record_failover(operation);
    }
}

#[async_trait]
impl Adapter for FailoverAdapter {
    async fn features(&self) -> Result<BTreeSet<String>, AdapterError> {
        match self.primary.features().await {
            Err(err) if self.fails_over(&err) => {
                self.note_failover("features", &err);
                self.secondary.features().await
            }
            result => result,
        }
    }

    async fn get(&self, feature: &str) -> Result<GateValues, AdapterError> {
        match self.primary.get(feature).await {
            Err(err) if self.fails_over(&err) => {
                self.note_failover("get", &err);
                self.secondary.get(feature).await
            }
            result => result,
        }
    }

    async fn get_multi(
        &self,
        features: &[&str],
    ) -> Result<BTreeMap<String, GateValues>, AdapterError> {
        match self.primary.get_multi(features).await {
            Err(err) if self.fails_over(&err) => {
                self.note_failover("get_multi", &err);
                self.secondary.get_multi(features).await
            }
            result => result,
        }
    }

    async fn get_all(&self) -> Result<BTreeMap<String, GateValues>, AdapterError> {
        match self.primary.get_all().await {
            Err(err) if self.fails_over(&err) => {
                self.note_failover("get_all", &err);
                self.secondary.get_all().await
            }
            result => result,
        }
    }

    async fn add(&self, feature: &str) -> Result<(), AdapterError> {
        self.primary.add(feature).await?;
        if self.config.dual_write {
            self.secondary.add(feature).await?;
        }
        Ok(())
    }

    async fn remove(&self, feature: &str) -> Result<(), AdapterError> {
        self.primary.remove(feature).await?;
        if self.config.dual_write {
            self.secondary.remove(feature).await?;
        }
        Ok(())
    }

    async fn clear(&self, feature: &str) -> Result<(), AdapterError> {
        self.primary.clear(feature).await?;
        if self.config.dual_write {
            self.secondary.clear(feature).await?;
        }
        Ok(())
    }

    async fn enable(
        &self,
        feature: &str,
        gate: &str,
        thing: &Value,
    ) -> Result<(), AdapterError> {
        self.primary.enable(feature, gate, thing).await?;
        if self.config.dual_write {
            self.secondary.enable(feature, gate, thing).await?;
        }
        Ok(())
    }

    async fn disable(
        &self,
        feature: &str,
        gate: &str,
        thing: &Value,
    ) -> Result<(), AdapterError> {
        self.primary.disable(feature, gate, thing).await?;
        if self.config.dual_write {
            self.secondary.disable(feature, gate, thing).await?;
        }
        Ok(())
    }
}
