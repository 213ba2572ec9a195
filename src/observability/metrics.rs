//! Metrics collection.
//!
//! # Metrics
//! - `live_config_refresh_total` (counter): refresh cycles by outcome
//! - `live_config_changes_total` (counter): changed records by kind
//! - `live_config_binds_total` (counter): `get` resolutions by mode (new, cache)
//! - `live_config_snapshot_records` (gauge): size of the last good snapshot

use crate::diff::Diff;

pub fn record_refresh(outcome: &'static str) {
    ::metrics::counter!("live_config_refresh_total", "outcome" => outcome).increment(1);
}

pub fn record_changes(diff: &Diff) {
    ::metrics::counter!("live_config_changes_total", "kind" => "created")
        .increment(diff.created.len() as u64);
    ::metrics::counter!("live_config_changes_total", "kind" => "deleted")
        .increment(diff.deleted.len() as u64);
    ::metrics::counter!("live_config_changes_total", "kind" => "modified")
        .increment(diff.modified.len() as u64);
}

pub fn record_bind(mode: &'static str) {
    ::metrics::counter!("live_config_binds_total", "mode" => mode).increment(1);
}

pub fn record_snapshot_size(size: usize) {
    ::metrics::gauge!("live_config_snapshot_records").set(size as f64);
}
