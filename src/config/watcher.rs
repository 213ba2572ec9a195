//! Source file watcher for immediate refresh.

use crate::cache::RefreshHandle;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher as _};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Requests a cache refresh whenever the source file changes.
pub struct FileTrigger {
    path: PathBuf,
    refresh: RefreshHandle,
}

impl FileTrigger {
    pub fn new(path: &Path, refresh: RefreshHandle) -> Self {
        Self {
            path: path.to_path_buf(),
            refresh,
        }
    }

    /// Start watching. Dropping the returned watcher stops it.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let refresh = self.refresh.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Source file change detected, requesting refresh");
                        if !refresh.request() {
                            tracing::debug!("Refresh worker has stopped; ignoring change");
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Source file watcher started");
        Ok(watcher)
    }
}
