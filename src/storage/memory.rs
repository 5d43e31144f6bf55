use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use super::traits::{Adapter, AdapterError};
use crate::state::GateValues;

/// Concurrent in-memory adapter.
///
/// The reference implementation of [`Adapter`]: the usual `local` side of a
/// [`SyncAdapter`](crate::SyncAdapter) and the workhorse of the test suite.
/// Presence in the map is what "registered" means; gate state lives inline.
pub struct MemoryAdapter {
    data: DashMap<String, GateValues>,
}

impl MemoryAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
        }
    }

    /// Number of registered features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Default for MemoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for MemoryAdapter {
    async fn features(&self) -> Result<BTreeSet<String>, AdapterError> {
        Ok(self.data.iter().map(|e| e.key().clone()).collect())
    }

    async fn get(&self, feature: &str) -> Result<GateValues, AdapterError> {
        Ok(self
            .data
            .get(feature)
            .map(|e| e.value().clone())
            .unwrap_or_default())
    }

    async fn get_all(&self) -> Result<BTreeMap<String, GateValues>, AdapterError> {
        Ok(self
            .data
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect())
    }

    async fn add(&self, feature: &str) -> Result<(), AdapterError> {
        self.data.entry(feature.to_string()).or_default();
        Ok(())
    }

    async fn remove(&self, feature: &str) -> Result<(), AdapterError> {
        self.data.remove(feature);
        Ok(())
    }

    async fn clear(&self, feature: &str) -> Result<(), AdapterError> {
        if let Some(mut entry) = self.data.get_mut(feature) {
            entry.reset();
        }
        Ok(())
    }

    async fn enable(
        &self,
        feature: &str,
        gate: &str,
        thing: &Value,
    ) -> Result<(), AdapterError> {
        self.data
            .entry(feature.to_string())
            .or_default()
            .set(gate, thing.clone());
        Ok(())
    }

    async fn disable(
        &self,
        feature: &str,
        gate: &str,
        _thing: &Value,
    ) -> Result<(), AdapterError> {
        if let Some(mut entry) = self.data.get_mut(feature) {
            entry.unset(gate);
        }
        Ok(())
    }
}
