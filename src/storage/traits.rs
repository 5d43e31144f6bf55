use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::state::GateValues;

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("connection to storage backend failed: {0}")]
    Connection(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("data corruption detected for feature '{feature}': {detail}")]
    Corruption { feature: String, detail: String },
    #[error("invalid request: {0}")]
    Validation(String),
}

impl AdapterError {
    /// Stable classification of this error, used for failover matching.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection(_) => ErrorKind::Connection,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Backend(_) => ErrorKind::Backend,
            Self::Corruption { .. } => ErrorKind::Corruption,
            Self::Validation(_) => ErrorKind::Validation,
        }
    }
}

/// Tagged error classification.
///
/// Failover decisions match on kind, never on error structure: an explicit
/// enum keeps the "which failures qualify" question answerable from
/// configuration alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Connection,
    Timeout,
    Backend,
    Corruption,
    Validation,
}

impl ErrorKind {
    /// Every kind, in declaration order.
    pub const ALL: [ErrorKind; 5] = [
        ErrorKind::Connection,
        ErrorKind::Timeout,
        ErrorKind::Backend,
        ErrorKind::Corruption,
        ErrorKind::Validation,
    ];
}

/// The abstract storage contract for feature/gate state.
///
/// Concrete stores and both composers implement this trait, so composers
/// nest freely: a [`SyncAdapter`](crate::SyncAdapter)'s remote may itself be
/// a [`FailoverAdapter`](crate::FailoverAdapter), and so on.
///
/// Gate values are opaque to this layer. Implementations copy and forward
/// them; only the flag data model on the far side interprets them.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// The set of features known to the store.
    async fn features(&self) -> Result<BTreeSet<String>, AdapterError>;

    /// Gate values for a single feature. Unknown features yield an empty
    /// structure, they are not an error.
    async fn get(&self, feature: &str) -> Result<GateValues, AdapterError>;

    /// Gate values for several features at once.
    ///
    /// The result carries an entry for every requested feature. Default
    /// implementation loops over [`Adapter::get`]; stores with a cheaper
    /// batch read should override it.
    async fn get_multi(
        &self,
        features: &[&str],
    ) -> Result<BTreeMap<String, GateValues>, AdapterError> {
        let mut out = BTreeMap::new();
        for feature in features {
            out.insert((*feature).to_string(), self.get(feature).await?);
        }
        Ok(out)
    }

    /// Gate values for every known feature.
    async fn get_all(&self) -> Result<BTreeMap<String, GateValues>, AdapterError>;

    /// Register a feature. Registering an existing feature is a no-op.
    async fn add(&self, feature: &str) -> Result<(), AdapterError>;

    /// Unregister a feature and drop its gate state.
    async fn remove(&self, feature: &str) -> Result<(), AdapterError>;

    /// Reset a feature's gate state without unregistering it.
    async fn clear(&self, feature: &str) -> Result<(), AdapterError>;

    /// Set `gate` to `thing` for `feature`. The value is opaque here.
    async fn enable(&self, feature: &str, gate: &str, thing: &Value)
        -> Result<(), AdapterError>;

    /// Retract `thing` from `gate` for `feature`.
    async fn disable(&self, feature: &str, gate: &str, thing: &Value)
        -> Result<(), AdapterError>;
}
