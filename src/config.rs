//! Construction-time configuration for the composers.
//!
//! # Example
//!
//! ```
//! use flagstore::{ErrorKind, FailoverConfig, SyncConfig};
//!
//! // Fail over on availability errors only; everything else propagates.
//! let failover = FailoverConfig {
//!     dual_write: false,
//!     error_kinds: Some(vec![ErrorKind::Connection, ErrorKind::Timeout]),
//! };
//! assert!(failover.matches(ErrorKind::Timeout));
//! assert!(!failover.matches(ErrorKind::Validation));
//!
//! // Sync defaults: 10s spacing, swallow failed passes, refresh on read.
//! let sync = SyncConfig::default();
//! assert_eq!(sync.interval().as_secs(), 10);
//! assert!(!sync.raise_exceptions);
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::storage::traits::ErrorKind;

/// Configuration for [`FailoverAdapter`](crate::FailoverAdapter).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FailoverConfig {
    /// Mirror writes to the secondary adapter after the primary write.
    #[serde(default)]
    pub dual_write: bool,

    /// Error kinds that qualify for read failover. `None` matches every kind.
    #[serde(default)]
    pub error_kinds: Option<Vec<ErrorKind>>,
}

impl FailoverConfig {
    /// Whether a primary read failure of this kind routes to the secondary.
    #[must_use]
    pub fn matches(&self, kind: ErrorKind) -> bool {
        match &self.error_kinds {
            None => true,
            Some(kinds) => kinds.contains(&kind),
        }
    }
}

/// How a [`SyncAdapter`](crate::SyncAdapter) keeps its local store fresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshMode {
    /// Reads trigger a reconciliation attempt, throttled by the interval.
    /// A read may block for one pass duration when the interval has elapsed.
    #[default]
    OnRead,
    /// A background task reconciles on the interval; reads never block on a
    /// pass and never trigger one.
    Background,
}

/// Configuration for [`SyncAdapter`](crate::SyncAdapter).
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Minimum spacing between reconciliation attempts, in seconds.
    /// Fractional values are accepted.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: f64,

    /// Propagate a failed pass to the caller instead of keeping the
    /// last-known-good local state.
    #[serde(default)]
    pub raise_exceptions: bool,

    #[serde(default)]
    pub refresh: RefreshMode,
}

fn default_interval_secs() -> f64 {
    crate::sync::DEFAULT_INTERVAL.as_secs_f64()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            raise_exceptions: false,
            refresh: RefreshMode::OnRead,
        }
    }
}

impl SyncConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.interval_secs)
    }
}
