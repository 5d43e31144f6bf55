//! # flagstore
//!
//! Resilient storage composition for a feature-flag backend.
//!
//! Two decorator adapters wrap the abstract [`Adapter`] contract without
//! changing its shape: a failover composer that adds availability, and a
//! sync composer that adds staleness-bounded local caching backed by
//! interval-throttled reconciliation.
//!
//! ## Architecture
//!
//! ```text
//!                          caller
//!                            │
//!            ┌───────────────┴────────────────┐
//!            ▼                                ▼
//! ┌─────────────────────────┐   ┌──────────────────────────────┐
//! │      SyncAdapter        │   │       FailoverAdapter        │
//! │ reads  ← local store    │   │ reads  ← primary, secondary  │
//! │          (gated sync)   │   │          on matched errors   │
//! │ writes → remote,        │   │ writes → primary, optional   │
//! │          mirrored local │   │          dual-write          │
//! └───────────┬─────────────┘   └──────────────┬───────────────┘
//!             │                                │
//!             ▼                                ▼
//!      Arc<dyn Adapter>                 Arc<dyn Adapter>
//!   (memory, remote store, or another composer)
//! ```
//!
//! Both composers implement [`Adapter`] themselves, so they nest: a
//! [`SyncAdapter`]'s remote can be a [`FailoverAdapter`] over two stores,
//! and so on.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use flagstore::{Adapter, MemoryAdapter, SyncAdapter, SyncConfig};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), flagstore::AdapterError> {
//!     // In production the remote is a shared store; here, memory.
//!     let remote: Arc<dyn Adapter> = Arc::new(MemoryAdapter::new());
//!     remote.enable("search_v2", "groups", &json!(["admins"])).await?;
//!
//!     let local = Arc::new(MemoryAdapter::new());
//!     let flags = SyncAdapter::new(local, remote, SyncConfig::default()).await?;
//!
//!     // Reads come from the local store, refreshed at most every interval.
//!     let state = flags.get("search_v2").await?;
//!     println!("search_v2: {:?}", state);
//!
//!     // Writes go to the remote and mirror into local synchronously.
//!     flags.enable("search_v2", "boolean", &json!(true)).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Failure semantics
//!
//! - Failover reads: only configured [`ErrorKind`]s route to the secondary;
//!   anything else propagates unchanged.
//! - Dual-writes and local mirrors are best-effort but never silent: a
//!   replication failure after a successful authoritative write surfaces to
//!   the caller. There is no atomicity across an adapter pair.
//! - Reconciliation pass failures are swallowed by default (reads keep
//!   serving last-known-good local state) or propagated with
//!   `raise_exceptions`.
//! - This layer never retries and never wraps errors.
//!
//! ## Modules
//!
//! - [`storage`]: the [`Adapter`] contract, [`MemoryAdapter`], and both
//!   composers
//! - [`sync`]: [`Synchronizer`] and [`IntervalSynchronizer`]
//! - [`config`]: construction-time configuration
//! - [`state`]: the opaque [`GateValues`] structure
//! - [`metrics`]: backend-agnostic instrumentation

pub mod config;
pub mod metrics;
pub mod state;
pub mod storage;
pub mod sync;

pub use config::{FailoverConfig, RefreshMode, SyncConfig};
pub use state::GateValues;
pub use storage::failover::FailoverAdapter;
pub use storage::memory::MemoryAdapter;
pub use storage::sync::SyncAdapter;
pub use storage::traits::{Adapter, AdapterError, ErrorKind};
pub use sync::{IntervalSynchronizer, PassStats, Synchronizer, DEFAULT_INTERVAL};
