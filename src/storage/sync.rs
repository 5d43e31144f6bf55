//! Sync composition: staleness-bounded local reads over a remote source of
//! truth.
//!
//! Reads are served from the local adapter after giving the interval-gated
//! synchronizer a chance to run; writes go to the remote and are mirrored
//! into the local store unconditionally. The local store lags the remote by
//! at most one interval plus one in-flight pass duration.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::traits::{Adapter, AdapterError};
use crate::config::{RefreshMode, SyncConfig};
use crate::state::GateValues;
use crate::sync::{IntervalSynchronizer, Synchronizer};

/// Serves reads from a local adapter kept eventually consistent with a
/// remote one; routes writes to the remote, mirrored into local.
///
/// Construction runs one unconditional reconciliation pass, so the first
/// read is never served from a store that has not seen the remote at least
/// once. A local mirror failure after a successful remote write propagates:
/// local must not silently diverge from remote after an authoritative write.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use flagstore::{Adapter, MemoryAdapter, SyncAdapter, SyncConfig};
/// use serde_json::json;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), flagstore::AdapterError> {
/// let remote: Arc<dyn Adapter> = Arc::new(MemoryAdapter::new());
/// remote.enable("search_v2", "groups", &json!(["admins"])).await?;
///
/// let local = Arc::new(MemoryAdapter::new());
/// let sync = SyncAdapter::new(local, remote, SyncConfig::default()).await?;
///
/// // Populated at construction: no interval wait before the first read.
/// let state = sync.get("search_v2").await?;
/// assert_eq!(state.gate("groups"), Some(&json!(["admins"])));
/// # Ok(())
/// # }
/// ```
pub struct SyncAdapter {
    local: Arc<dyn Adapter>,
    remote: Arc<dyn Adapter>,
    synchronizer: Arc<IntervalSynchronizer>,
    refresh: RefreshMode,
    shutdown_tx: watch::Sender<bool>,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for SyncAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncAdapter")
            .field("refresh", &self.refresh)
            .finish_non_exhaustive()
    }
}

impl SyncAdapter {
    /// Build a sync composer and run the initial reconciliation pass.
    ///
    /// The initial pass follows the configured `raise_exceptions` policy: by
    /// default an unreachable remote is logged and the composer starts from
    /// whatever the local store already holds.
    pub async fn new(
        local: Arc<dyn Adapter>,
        remote: Arc<dyn Adapter>,
        config: SyncConfig,
    ) -> Result<Self, AdapterError> {
        let synchronizer = Arc::new(IntervalSynchronizer::new(
            Synchronizer::new(local.clone(), remote.clone(), config.raise_exceptions),
            config.interval(),
        ));

        synchronizer.force().await?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let refresh_task = match config.refresh {
            RefreshMode::Background => Some(Self::spawn_refresh(
                synchronizer.clone(),
                config.interval(),
                shutdown_rx,
            )),
            RefreshMode::OnRead => None,
        };

        Ok(Self {
            local,
            remote,
            synchronizer,
            refresh: config.refresh,
            shutdown_tx,
            refresh_task: Mutex::new(refresh_task),
        })
    }

    /// The interval-gated synchronizer backing this composer.
    #[must_use]
    pub fn synchronizer(&self) -> &IntervalSynchronizer {
        &self.synchronizer
    }

    /// Stop the background refresh task, if one is running.
    ///
    /// A no-op in `OnRead` mode.
    pub async fn shutdown(&self) {
        let task = self.refresh_task.lock().take();
        if let Some(task) = task {
            let _ = self.shutdown_tx.send(true);
            let _ = task.await;
        }
    }

    fn spawn_refresh(
        synchronizer: Arc<IntervalSynchronizer>,
        interval: Duration,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            // The constructor already ran a pass; start one interval out.
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(err) = synchronizer.force().await {
                            warn!(error = %err, "background reconciliation pass failed");
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        debug!("background refresh stopped");
                        break;
                    }
                }
            }
        })
    }

    async fn synchronize(&self) -> Result<(), AdapterError> {
        match self.refresh {
            RefreshMode::OnRead => self.synchronizer.attempt().await.map(|_| ()),
            // The background task owns the cadence; reads never block on it.
            RefreshMode::Background => Ok(()),
        }
    }
}

#[async_trait]
impl Adapter for SyncAdapter {
    async fn features(&self) -> Result<BTreeSet<String>, AdapterError> {
        self.synchronize().await?;
        self.local.features().await
    }

    async fn get(&self, feature: &str) -> Result<GateValues, AdapterError> {
        self.synchronize().await?;
        self.local.get(feature).await
    }

    async fn get_multi(
        &self,
        features: &[&str],
    ) -> Result<BTreeMap<String, GateValues>, AdapterError> {
        self.synchronize().await?;
        self.local.get_multi(features).await
    }

    async fn get_all(&self) -> Result<BTreeMap<String, GateValues>, AdapterError> {
        self.synchronize().await?;
        self.local.get_all().await
    }

    async fn add(&self, feature: &str) -> Result<(), AdapterError> {
        self.remote.add(feature).await?;
        self.local.add(feature).await
    }

    async fn remove(&self, feature: &str) -> Result<(), AdapterError> {
        self.remote.remove(feature).await?;
        self.local.remove(feature).await
    }

    async fn clear(&self, feature: &str) -> Result<(), AdapterError> {
        self.remote.clear(feature).await?;
        self.local.clear(feature).await
    }

    async fn enable(
        &self,
        feature: &str,
        gate: &str,
        thing: &Value,
    ) -> Result<(), AdapterError> {
        self.remote.enable(feature, gate, thing).await?;
        self.local.enable(feature, gate, thing).await
    }

    async fn disable(
        &self,
        feature: &str,
        gate: &str,
        thing: &Value,
    ) -> Result<(), AdapterError> {
        self.remote.disable(feature, gate, thing).await?;
        self.local.disable(feature, gate, thing).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryAdapter;
    use crate::storage::traits::ErrorKind;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    /// Remote wrapper counting reconciliation snapshots (`get_all` calls)
    /// and optionally failing reads or writes.
    struct CountingRemote {
        inner: MemoryAdapter,
        snapshots: AtomicU64,
        reads_down: AtomicBool,
        writes_down: AtomicBool,
    }

    impl CountingRemote {
        fn new() -> Self {
            Self {
                inner: MemoryAdapter::new(),
                snapshots: AtomicU64::new(0),
                reads_down: AtomicBool::new(false),
                writes_down: AtomicBool::new(false),
            }
        }

        fn snapshots(&self) -> u64 {
            self.snapshots.load(Ordering::SeqCst)
        }

        fn set_reads_down(&self, down: bool) {
            self.reads_down.store(down, Ordering::SeqCst);
        }

        fn set_writes_down(&self, down: bool) {
            self.writes_down.store(down, Ordering::SeqCst);
        }

        fn check_reads(&self) -> Result<(), AdapterError> {
            if self.reads_down.load(Ordering::SeqCst) {
                Err(AdapterError::Connection("remote unreachable".to_string()))
            } else {
                Ok(())
            }
        }

        fn check_writes(&self) -> Result<(), AdapterError> {
            if self.writes_down.load(Ordering::SeqCst) {
                Err(AdapterError::Connection("remote unreachable".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl Adapter for CountingRemote {
        async fn features(&self) -> Result<BTreeSet<String>, AdapterError> {
            self.check_reads()?;
            self.inner.features().await
        }

        async fn get(&self, feature: &str) -> Result<GateValues, AdapterError> {
            self.check_reads()?;
            self.inner.get(feature).await
        }

        async fn get_all(&self) -> Result<BTreeMap<String, GateValues>, AdapterError> {
            self.snapshots.fetch_add(1, Ordering::SeqCst);
            self.check_reads()?;
            self.inner.get_all().await
        }

        async fn add(&self, feature: &str) -> Result<(), AdapterError> {
            self.check_writes()?;
            self.inner.add(feature).await
        }

        async fn remove(&self, feature: &str) -> Result<(), AdapterError> {
            self.check_writes()?;
            self.inner.remove(feature).await
        }

        async fn clear(&self, feature: &str) -> Result<(), AdapterError> {
            self.check_writes()?;
            self.inner.clear(feature).await
        }

        async fn enable(
            &self,
            feature: &str,
            gate: &str,
            thing: &Value,
        ) -> Result<(), AdapterError> {
            self.check_writes()?;
            self.inner.enable(feature, gate, thing).await
        }

        async fn disable(
            &self,
            feature: &str,
            gate: &str,
            thing: &Value,
        ) -> Result<(), AdapterError> {
            self.check_writes()?;
            self.inner.disable(feature, gate, thing).await
        }
    }

    /// Local wrapper whose writes can be broken to test mirror failures.
    struct BrittleLocal {
        inner: MemoryAdapter,
        writes_down: AtomicBool,
    }

    impl BrittleLocal {
        fn new() -> Self {
            Self {
                inner: MemoryAdapter::new(),
                writes_down: AtomicBool::new(false),
            }
        }

        fn set_writes_down(&self, down: bool) {
            self.writes_down.store(down, Ordering::SeqCst);
        }

        fn check_writes(&self) -> Result<(), AdapterError> {
            if self.writes_down.load(Ordering::SeqCst) {
                Err(AdapterError::Backend("local store read-only".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl Adapter for BrittleLocal {
        async fn features(&self) -> Result<BTreeSet<String>, AdapterError> {
            self.inner.features().await
        }

        async fn get(&self, feature: &str) -> Result<GateValues, AdapterError> {
            self.inner.get(feature).await
        }

        async fn get_all(&self) -> Result<BTreeMap<String, GateValues>, AdapterError> {
            self.inner.get_all().await
        }

        async fn add(&self, feature: &str) -> Result<(), AdapterError> {
            self.check_writes()?;
            self.inner.add(feature).await
        }

        async fn remove(&self, feature: &str) -> Result<(), AdapterError> {
            self.check_writes()?;
            self.inner.remove(feature).await
        }

        async fn clear(&self, feature: &str) -> Result<(), AdapterError> {
            self.check_writes()?;
            self.inner.clear(feature).await
        }

        async fn enable(
            &self,
            feature: &str,
            gate: &str,
            thing: &Value,
        ) -> Result<(), AdapterError> {
            self.check_writes()?;
            self.inner.enable(feature, gate, thing).await
        }

        async fn disable(
            &self,
            feature: &str,
            gate: &str,
            thing: &Value,
        ) -> Result<(), AdapterError> {
            self.check_writes()?;
            self.inner.disable(feature, gate, thing).await
        }
    }

    fn on_read_config(interval_secs: f64) -> SyncConfig {
        SyncConfig {
            interval_secs,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_construction_populates_local() {
        let remote = Arc::new(CountingRemote::new());
        remote.inner.enable("search_v2", "groups", &json!(["admins"])).await.unwrap();
        let local = Arc::new(MemoryAdapter::new());

        let sync = SyncAdapter::new(local, remote, on_read_config(60.0))
            .await
            .unwrap();

        // Immediately visible, no 60s wait.
        let state = sync.get("search_v2").await.unwrap();
        assert_eq!(state.gate("groups"), Some(&json!(["admins"])));
    }

    #[tokio::test]
    async fn test_construction_survives_down_remote_by_default() {
        let remote = Arc::new(CountingRemote::new());
        remote.set_reads_down(true);
        let local: Arc<dyn Adapter> = Arc::new(MemoryAdapter::new());

        let sync = SyncAdapter::new(local, remote, on_read_config(60.0))
            .await
            .unwrap();

        assert!(sync.features().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_construction_propagates_when_raising() {
        let remote = Arc::new(CountingRemote::new());
        remote.set_reads_down(true);
        let local: Arc<dyn Adapter> = Arc::new(MemoryAdapter::new());

        let config = SyncConfig {
            raise_exceptions: true,
            ..on_read_config(60.0)
        };
        let err = SyncAdapter::new(local, remote, config).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reads_within_interval_trigger_one_pass_at_most() {
        let remote = Arc::new(CountingRemote::new());
        let local: Arc<dyn Adapter> = Arc::new(MemoryAdapter::new());

        let sync = SyncAdapter::new(local, remote.clone(), on_read_config(60.0))
            .await
            .unwrap();
        assert_eq!(remote.snapshots(), 1); // construction pass

        tokio::time::advance(Duration::from_secs(30)).await;
        sync.get("a").await.unwrap();
        sync.features().await.unwrap();
        sync.get_all().await.unwrap();

        assert_eq!(remote.snapshots(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_after_interval_triggers_fresh_pass() {
        let remote = Arc::new(CountingRemote::new());
        let local: Arc<dyn Adapter> = Arc::new(MemoryAdapter::new());

        let sync = SyncAdapter::new(local, remote.clone(), on_read_config(60.0))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(60)).await;
        remote.inner.enable("late", "boolean", &json!(true)).await.unwrap();
        let state = sync.get("late").await.unwrap();

        assert_eq!(remote.snapshots(), 2);
        assert_eq!(state.gate("boolean"), Some(&json!(true)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_reads_between_passes() {
        let remote = Arc::new(CountingRemote::new());
        remote.inner.enable("a", "percentage", &json!(10)).await.unwrap();
        let local: Arc<dyn Adapter> = Arc::new(MemoryAdapter::new());

        let sync = SyncAdapter::new(local, remote.clone(), on_read_config(60.0))
            .await
            .unwrap();

        // Remote moves on; local serves the last snapshot until the
        // interval elapses.
        remote.inner.enable("a", "percentage", &json!(99)).await.unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;
        let stale = sync.get("a").await.unwrap();
        assert_eq!(stale.gate("percentage"), Some(&json!(10)));

        tokio::time::advance(Duration::from_secs(30)).await;
        let fresh = sync.get("a").await.unwrap();
        assert_eq!(fresh.gate("percentage"), Some(&json!(99)));
    }

    #[tokio::test]
    async fn test_writes_go_remote_then_mirror_local() {
        let remote = Arc::new(CountingRemote::new());
        let local = Arc::new(MemoryAdapter::new());

        let sync = SyncAdapter::new(local.clone(), remote.clone(), on_read_config(3600.0))
            .await
            .unwrap();

        sync.enable("new_flag", "boolean", &json!(true)).await.unwrap();

        // Authoritative write landed.
        let remote_state = remote.inner.get("new_flag").await.unwrap();
        assert_eq!(remote_state.gate("boolean"), Some(&json!(true)));
        // Mirror landed too, so the very next read sees it with no pass.
        let read = sync.get("new_flag").await.unwrap();
        assert_eq!(read.gate("boolean"), Some(&json!(true)));
        assert_eq!(remote.snapshots(), 1);
    }

    #[tokio::test]
    async fn test_write_fails_when_remote_down_and_local_untouched() {
        let remote = Arc::new(CountingRemote::new());
        let local = Arc::new(MemoryAdapter::new());

        let sync = SyncAdapter::new(local.clone(), remote.clone(), on_read_config(3600.0))
            .await
            .unwrap();
        remote.set_writes_down(true);

        let err = sync.enable("flag", "boolean", &json!(true)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert!(local.is_empty());
    }

    #[tokio::test]
    async fn test_mirror_failure_propagates_after_remote_applied() {
        let remote = Arc::new(CountingRemote::new());
        let local = Arc::new(BrittleLocal::new());

        let sync = SyncAdapter::new(local.clone(), remote.clone(), on_read_config(3600.0))
            .await
            .unwrap();
        local.set_writes_down(true);

        let err = sync.enable("flag", "boolean", &json!(true)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Backend);

        // The remote write stands; the caller knows the pair diverged.
        let remote_state = remote.inner.get("flag").await.unwrap();
        assert_eq!(remote_state.gate("boolean"), Some(&json!(true)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_refresh_runs_without_reads() {
        let remote = Arc::new(CountingRemote::new());
        let local: Arc<dyn Adapter> = Arc::new(MemoryAdapter::new());

        let config = SyncConfig {
            interval_secs: 10.0,
            raise_exceptions: false,
            refresh: RefreshMode::Background,
        };
        let sync = SyncAdapter::new(local, remote.clone(), config).await.unwrap();
        assert_eq!(remote.snapshots(), 1);

        remote.inner.enable("a", "boolean", &json!(true)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(11)).await;
        tokio::task::yield_now().await;

        assert_eq!(remote.snapshots(), 2);
        let state = sync.get("a").await.unwrap();
        assert_eq!(state.gate("boolean"), Some(&json!(true)));
        // The read itself did not schedule a pass.
        assert_eq!(remote.snapshots(), 2);

        sync.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_background_refresh() {
        let remote = Arc::new(CountingRemote::new());
        let local: Arc<dyn Adapter> = Arc::new(MemoryAdapter::new());

        let config = SyncConfig {
            interval_secs: 10.0,
            raise_exceptions: false,
            refresh: RefreshMode::Background,
        };
        let sync = SyncAdapter::new(local, remote.clone(), config).await.unwrap();

        sync.shutdown().await;
        let after_shutdown = remote.snapshots();

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(remote.snapshots(), after_shutdown);
    }

    #[tokio::test]
    async fn test_shutdown_is_noop_in_on_read_mode() {
        let remote = Arc::new(CountingRemote::new());
        let local: Arc<dyn Adapter> = Arc::new(MemoryAdapter::new());

        let sync = SyncAdapter::new(local, remote, on_read_config(60.0))
            .await
            .unwrap();
        sync.shutdown().await;
        sync.shutdown().await;
    }
}
