//! Shared shapes and observers for the integration tests.

#![allow(dead_code)]

use live_config::cache::CacheError;
use live_config::record::Record;
use live_config::schema::{ConfigShape, FieldKind, ScalarKind, TargetSchema};
use live_config::watcher::Watcher;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// `app.a`, `app.b` plus a field the binder must never touch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub a: i64,
    pub b: bool,
    pub local: String,
}

impl ConfigShape for AppConfig {
    fn schema() -> TargetSchema {
        TargetSchema::builder()
            .group("app")
            .field("a", ScalarKind::Int)
            .field("b", ScalarKind::Bool)
            .excluded("local", FieldKind::Scalar(ScalarKind::String))
            .build()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DbConfig {
    pub url: String,
    pub pool: u32,
    pub timeout: Option<Duration>,
}

impl ConfigShape for DbConfig {
    fn schema() -> TargetSchema {
        TargetSchema::builder()
            .group("db")
            .field("url", ScalarKind::String)
            .field("pool", ScalarKind::UInt)
            .field("timeout", ScalarKind::Duration)
            .build()
    }
}

pub fn app_records(a: &str, b: &str) -> Vec<Record> {
    vec![Record::new("app", "a", a), Record::new("app", "b", b)]
}

/// What a [`RecordingWatcher`] saw, in callback order.
#[derive(Debug, Clone, PartialEq)]
pub enum Seen {
    Created(String),
    Deleted(String),
    Modified(String),
    Error(String),
}

#[derive(Default)]
pub struct RecordingWatcher {
    seen: Mutex<Vec<Seen>>,
}

impl RecordingWatcher {
    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().clone()
    }

    pub fn errors(&self) -> usize {
        self.seen
            .lock()
            .iter()
            .filter(|s| matches!(s, Seen::Error(_)))
            .count()
    }
}

fn key(record: &Record) -> String {
    format!("{}.{}", record.group, record.name)
}

impl Watcher for RecordingWatcher {
    fn on_create(&self, record: &Record) {
        self.seen.lock().push(Seen::Created(key(record)));
    }

    fn on_modify(&self, record: &Record) {
        self.seen.lock().push(Seen::Modified(key(record)));
    }

    fn on_delete(&self, record: &Record) {
        self.seen.lock().push(Seen::Deleted(key(record)));
    }

    fn on_error(&self, error: &CacheError) {
        self.seen.lock().push(Seen::Error(error.to_string()));
    }
}

/// Poll `check` until it holds or `timeout` passes.
pub async fn eventually<F>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
