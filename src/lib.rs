//! Live configuration library.
//!
//! Flat `(group, name, value)` records from a [`Loader`] are bound into
//! typed configuration objects. A [`LiveCache`] hands out one live
//! [`Bound`] handle per target, refreshes the records in the background
//! and notifies a [`Watcher`] about what changed.

pub mod binder;
pub mod cache;
pub mod config;
pub mod diff;
pub mod loader;
pub mod observability;
pub mod record;
pub mod schema;
pub mod watcher;

pub use binder::{bind, BindError};
pub use cache::{Bound, CacheError, LiveCache, RefreshHandle, RefreshOutcome};
pub use diff::{Diff, DiffOutcome};
pub use loader::{Loader, LoaderError, MemoryLoader, PropertiesLoader, TomlLoader};
pub use record::Record;
pub use schema::{ConfigShape, FieldKind, ScalarKind, TargetSchema};
pub use watcher::{ChannelWatcher, ConfigEvent, Watcher};
