//! Live configuration cache.
//!
//! # Data Flow
//! ```text
//! get::<T>() (first call per key)
//!     → Loader::load() if no snapshot yet
//!     → binder → Entry<T> stored, Bound<T> handed out
//!
//! refresh cycle (worker tick, file trigger or refresh_now)
//!     → Loader::load()          failure → Watcher::on_error, snapshot kept
//!     → diff against snapshot   empty   → done
//!     → rebind every entry, swap each Bound<T> to its new value
//!     → Watcher callbacks: created → deleted → modified
//! ```
//!
//! # Design Decisions
//! - One coarse mutex guards the snapshot and the entry map; binds are rare and cheap
//! - A refresh gate serialises cycles, so two refreshes never interleave
//! - Callers hold a stable `Bound<T>` indirection; rebinds swap the value behind it
//! - Watcher callbacks run after the mutex and the refresh gate are released

mod entry;
mod worker;

pub use entry::Bound;
pub use worker::RefreshHandle;

use crate::binder::BindError;
use crate::diff::{self, Diff, DiffOutcome};
use crate::loader::{Loader, LoaderError};
use crate::observability::metrics;
use crate::record::Record;
use crate::schema::ConfigShape;
use crate::watcher::{self, DefaultWatcher, Watcher};
use entry::{CacheKey, Entry, Slot};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use worker::WorkerHandle;

/// Errors surfaced by the live cache.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to load records: {0}")]
    Loader(#[from] LoaderError),

    #[error("failed to bind {target}: {source}")]
    Bind {
        target: &'static str,
        #[source]
        source: BindError,
    },

    #[error("live cache is closed")]
    Closed,

    #[error("a refresh interval requires a running tokio runtime")]
    NoRuntime,
}

/// What a single refresh cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// First snapshot stored; no diff performed and no events fired.
    Initial,
    Unchanged,
    Changed(Diff),
    /// The loader failed; the previous snapshot was kept.
    Failed,
    Closed,
}

impl RefreshOutcome {
    fn label(&self) -> &'static str {
        match self {
            RefreshOutcome::Initial => "initial",
            RefreshOutcome::Unchanged => "unchanged",
            RefreshOutcome::Changed(_) => "changed",
            RefreshOutcome::Failed => "failed",
            RefreshOutcome::Closed => "closed",
        }
    }
}

#[derive(Default)]
struct State {
    snapshot: Option<Arc<Vec<Record>>>,
    entries: HashMap<CacheKey, Box<dyn Slot>>,
}

/// State shared between the cache and its refresh worker.
pub(crate) struct Shared {
    loader: Box<dyn Loader>,
    watcher: Arc<dyn Watcher>,
    state: Mutex<State>,
    refresh_gate: Mutex<()>,
    closed: AtomicBool,
    loader_released: AtomicBool,
}

impl Shared {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn get<T: ConfigShape>(
        &self,
        group: Option<&str>,
        excluded: &[&str],
    ) -> Result<Bound<T>, CacheError> {
        let key = CacheKey::new::<T>(group, excluded);
        let target = std::any::type_name::<T>();

        let mut state = self.state.lock();
        if self.is_closed() {
            return Err(CacheError::Closed);
        }
        if let Some(handle) = lookup::<T>(&state, &key) {
            tracing::debug!(target_type = target, mode = "cache", "Config resolved");
            metrics::record_bind("cache");
            return Ok(handle);
        }

        // The first load has to be ordered with refresh cycles.
        let mut _gate = None;
        if state.snapshot.is_none() {
            drop(state);
            _gate = Some(self.refresh_gate.lock());
            state = self.state.lock();

            if self.is_closed() {
                return Err(CacheError::Closed);
            }
            if let Some(handle) = lookup::<T>(&state, &key) {
                metrics::record_bind("cache");
                return Ok(handle);
            }
        }

        let records = match state.snapshot.clone() {
            Some(records) => records,
            None => {
                let loaded = Arc::new(self.load().map_err(|e| {
                    tracing::error!(loader = %self.loader.describe(), error = %e, "Initial load failed");
                    e
                })?);
                tracing::debug!(size = loaded.len(), "Initial snapshot loaded");
                metrics::record_snapshot_size(loaded.len());
                state.snapshot = Some(loaded.clone());
                loaded
            }
        };

        let entry = Entry::<T>::bind(&records, T::schema(), group, excluded).map_err(|source| {
            tracing::error!(target_type = target, error = %source, mode = "new", "Config bind failed");
            CacheError::Bind { target, source }
        })?;

        let handle = entry.handle.clone();
        state.entries.insert(key, Box::new(entry));
        tracing::info!(target_type = target, group = ?group, mode = "new", "Config bound");
        metrics::record_bind("new");
        Ok(handle)
    }

    pub(crate) fn refresh(&self) -> RefreshOutcome {
        let gate = self.refresh_gate.lock();
        if self.is_closed() {
            return RefreshOutcome::Closed;
        }

        let loaded = match self.load() {
            Ok(records) => records,
            Err(err) => {
                drop(gate);
                tracing::warn!(
                    loader = %self.loader.describe(),
                    error = %err,
                    "Refresh failed; keeping last good snapshot"
                );
                metrics::record_refresh(RefreshOutcome::Failed.label());
                watcher::dispatch_error(self.watcher.as_ref(), &CacheError::Loader(err));
                return RefreshOutcome::Failed;
            }
        };

        let (outcome, failures) = {
            let mut guard = self.state.lock();
            if self.is_closed() {
                return RefreshOutcome::Closed;
            }
            let state = &mut *guard;
            let loaded = Arc::new(loaded);
            let compared = diff::diff(state.snapshot.as_deref().map(Vec::as_slice), &loaded);

            let mut failures = Vec::new();
            let outcome = match compared {
                DiffOutcome::NotPerformed => RefreshOutcome::Initial,
                DiffOutcome::Compared(diff) if diff.is_empty() => RefreshOutcome::Unchanged,
                DiffOutcome::Compared(diff) => {
                    for slot in state.entries.values() {
                        if let Err(source) = slot.rebind(&loaded) {
                            tracing::error!(
                                target_type = slot.target(),
                                error = %source,
                                "Rebind failed; entry keeps its previous value"
                            );
                            failures.push(CacheError::Bind {
                                target: slot.target(),
                                source,
                            });
                        }
                    }
                    RefreshOutcome::Changed(diff)
                }
            };

            metrics::record_snapshot_size(loaded.len());
            state.snapshot = Some(loaded);
            (outcome, failures)
        };
        // Callbacks may call back into the cache.
        drop(gate);

        metrics::record_refresh(outcome.label());
        if let RefreshOutcome::Changed(diff) = &outcome {
            tracing::info!(
                created = diff.created.len(),
                deleted = diff.deleted.len(),
                modified = diff.modified.len(),
                "Config changed"
            );
            metrics::record_changes(diff);
        } else {
            tracing::trace!(outcome = outcome.label(), "Refresh cycle finished");
        }

        for failure in &failures {
            watcher::dispatch_error(self.watcher.as_ref(), failure);
        }
        if let RefreshOutcome::Changed(diff) = &outcome {
            watcher::dispatch(self.watcher.as_ref(), diff);
        }

        outcome
    }

    /// Run the loader, turning a panic into a load failure.
    fn load(&self) -> Result<Vec<Record>, LoaderError> {
        catch_unwind(AssertUnwindSafe(|| self.loader.load())).unwrap_or_else(|payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(LoaderError::Panicked(message))
        })
    }

    /// Close the loader exactly once.
    pub(crate) fn release_loader(&self) {
        if !self.loader_released.swap(true, Ordering::SeqCst) {
            tracing::debug!(loader = %self.loader.describe(), "Releasing loader");
            self.loader.close();
        }
    }
}

fn lookup<T: ConfigShape>(state: &State, key: &CacheKey) -> Option<Bound<T>> {
    state
        .entries
        .get(key)
        .and_then(|slot| slot.as_any().downcast_ref::<Entry<T>>())
        .map(|entry| entry.handle.clone())
}

/// Binds records into typed objects and keeps them current.
///
/// ```
/// use live_config::cache::LiveCache;
/// use live_config::loader::MemoryLoader;
/// use live_config::record::Record;
/// use live_config::schema::{ConfigShape, ScalarKind, TargetSchema};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// struct AppConfig {
///     a: i64,
/// }
///
/// impl ConfigShape for AppConfig {
///     fn schema() -> TargetSchema {
///         TargetSchema::builder().group("app").field("a", ScalarKind::Int).build()
///     }
/// }
///
/// let cache = LiveCache::new(MemoryLoader::new(vec![Record::new("app", "a", "1")]));
/// let config = cache.get::<AppConfig>().unwrap();
/// assert_eq!(config.load().a, 1);
/// ```
pub struct LiveCache {
    shared: Arc<Shared>,
    worker: Mutex<Option<WorkerHandle>>,
}

impl LiveCache {
    /// A cache without background refresh: bind once, serve forever.
    pub fn new(loader: impl Loader + 'static) -> Self {
        let builder = Self::builder(loader);
        Self {
            shared: builder.shared(),
            worker: Mutex::new(None),
        }
    }

    pub fn builder(loader: impl Loader + 'static) -> LiveCacheBuilder {
        LiveCacheBuilder {
            loader: Box::new(loader),
            watcher: Arc::new(DefaultWatcher),
            refresh_interval: Duration::ZERO,
        }
    }

    /// Bound object for `T` in its default group.
    pub fn get<T: ConfigShape>(&self) -> Result<Bound<T>, CacheError> {
        self.shared.get(None, &[])
    }

    /// Bound object for `T` in an explicit group.
    pub fn get_group<T: ConfigShape>(&self, group: &str) -> Result<Bound<T>, CacheError> {
        self.shared.get(Some(group), &[])
    }

    /// Bound object for `T` with an optional group and extra excluded fields.
    ///
    /// The first call for a key loads (if needed) and binds; later calls
    /// return the same live handle.
    pub fn get_with<T: ConfigShape>(
        &self,
        group: Option<&str>,
        excluded: &[&str],
    ) -> Result<Bound<T>, CacheError> {
        self.shared.get(group, excluded)
    }

    /// Last successfully loaded snapshot; empty before the first load.
    pub fn raw_records(&self) -> Arc<Vec<Record>> {
        self.shared.state.lock().snapshot.clone().unwrap_or_default()
    }

    /// Run one refresh cycle on the calling thread.
    pub fn refresh_now(&self) -> RefreshOutcome {
        self.shared.refresh()
    }

    /// Trigger for the background worker, if one is running.
    pub fn refresh_handle(&self) -> Option<RefreshHandle> {
        self.worker.lock().as_ref().map(WorkerHandle::refresh_handle)
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Stop the worker, drop every entry and release the loader. Idempotent.
    ///
    /// A running refresh cycle is not interrupted; with a worker the loader
    /// is released once that cycle has finished.
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.shared.state.lock().entries.clear();

        match self.worker.lock().as_ref() {
            Some(worker) => worker.stop(),
            None => {
                // Let an in-flight refresh_now finish with the loader first.
                let _gate = self.shared.refresh_gate.lock();
                self.shared.release_loader();
            }
        }
        tracing::info!("Live cache closed");
    }

    /// Wait for the background worker to exit. Returns at once without one.
    pub async fn join(&self) {
        let task = self.worker.lock().as_mut().and_then(WorkerHandle::take_task);
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Refresh worker ended abnormally");
            }
        }
    }
}

impl Drop for LiveCache {
    fn drop(&mut self) {
        self.close();
    }
}

pub struct LiveCacheBuilder {
    loader: Box<dyn Loader>,
    watcher: Arc<dyn Watcher>,
    refresh_interval: Duration,
}

impl LiveCacheBuilder {
    pub fn watcher(self, watcher: impl Watcher + 'static) -> Self {
        self.shared_watcher(Arc::new(watcher))
    }

    pub fn shared_watcher(mut self, watcher: Arc<dyn Watcher>) -> Self {
        self.watcher = watcher;
        self
    }

    /// Interval between background refreshes. Zero disables the worker.
    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    fn shared(self) -> Arc<Shared> {
        Arc::new(Shared {
            loader: self.loader,
            watcher: self.watcher,
            state: Mutex::new(State::default()),
            refresh_gate: Mutex::new(()),
            closed: AtomicBool::new(false),
            loader_released: AtomicBool::new(false),
        })
    }

    /// Build the cache, spawning the refresh worker on the current tokio
    /// runtime when an interval is set.
    pub fn build(self) -> Result<LiveCache, CacheError> {
        let interval = self.refresh_interval;
        let shared = self.shared();

        let worker = if interval.is_zero() {
            None
        } else {
            let runtime = tokio::runtime::Handle::try_current().map_err(|_| CacheError::NoRuntime)?;
            Some(worker::spawn(&runtime, shared.clone(), interval))
        };

        Ok(LiveCache {
            shared,
            worker: Mutex::new(worker),
        })
    }
}
