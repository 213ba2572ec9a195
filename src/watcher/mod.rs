//! Change observers.
//!
//! # Responsibilities
//! - Define the callbacks the live cache fires after a refresh cycle
//! - Deliver a diff in a fixed order: created → deleted → modified
//! - Contain observer panics so they never stop the refresh worker

use crate::cache::CacheError;
use crate::diff::Diff;
use crate::record::Record;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tokio::sync::mpsc;

/// Observer of configuration changes.
///
/// Every method has a default: change callbacks do nothing and
/// [`on_error`](Watcher::on_error) logs the error.
pub trait Watcher: Send + Sync {
    fn on_create(&self, _record: &Record) {}

    /// Called once per modified record, however many of its fields changed.
    fn on_modify(&self, _record: &Record) {}

    fn on_delete(&self, _record: &Record) {}

    fn on_error(&self, error: &CacheError) {
        tracing::error!(error = %error, "Configuration refresh failed");
    }
}

/// Watcher that only logs errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultWatcher;

impl Watcher for DefaultWatcher {}

/// A change event as forwarded by [`ChannelWatcher`].
#[derive(Debug, Clone)]
pub enum ConfigEvent {
    Created(Record),
    Modified(Record),
    Deleted(Record),
    /// Rendered error message.
    Error(String),
}

/// Watcher that forwards every callback into a channel.
pub struct ChannelWatcher {
    tx: mpsc::UnboundedSender<ConfigEvent>,
}

impl ChannelWatcher {
    /// Create a watcher and the receiver its events arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ConfigEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: ConfigEvent) {
        // A dropped receiver just means nobody is listening any more.
        let _ = self.tx.send(event);
    }
}

impl Watcher for ChannelWatcher {
    fn on_create(&self, record: &Record) {
        self.send(ConfigEvent::Created(record.clone()));
    }

    fn on_modify(&self, record: &Record) {
        self.send(ConfigEvent::Modified(record.clone()));
    }

    fn on_delete(&self, record: &Record) {
        self.send(ConfigEvent::Deleted(record.clone()));
    }

    fn on_error(&self, error: &CacheError) {
        tracing::warn!(error = %error, "Configuration refresh failed");
        self.send(ConfigEvent::Error(error.to_string()));
    }
}

/// Fire one callback per changed record, created → deleted → modified.
pub fn dispatch(watcher: &dyn Watcher, diff: &Diff) {
    for record in &diff.created {
        guarded("on_create", || watcher.on_create(record));
    }
    for record in &diff.deleted {
        guarded("on_delete", || watcher.on_delete(record));
    }
    for record in &diff.modified {
        guarded("on_modify", || watcher.on_modify(record));
    }
}

/// Report an error to the watcher.
pub fn dispatch_error(watcher: &dyn Watcher, error: &CacheError) {
    guarded("on_error", || watcher.on_error(error));
}

fn guarded(callback: &'static str, f: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(f)).is_err() {
        tracing::error!(callback, "Watcher callback panicked; continuing");
    }
}
