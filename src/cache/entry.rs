//! Cache entries and the live handle handed out to callers.

use crate::binder::{self, BindError};
use crate::record::Record;
use crate::schema::{ConfigShape, TargetSchema};
use arc_swap::{ArcSwap, Guard};
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// A live, bound configuration object.
///
/// Cloning is cheap and every clone observes the same value: when the
/// cache rebinds after a change, all handles see the new value on their
/// next [`load`](Bound::load). Hold the handle, not the loaded value.
pub struct Bound<T> {
    inner: Arc<ArcSwap<T>>,
}

impl<T> Bound<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(value)),
        }
    }

    /// Borrow the current value. Cheap; do not hold across long operations.
    pub fn load(&self) -> Guard<Arc<T>> {
        self.inner.load()
    }

    /// Take an owned reference to the current value.
    pub fn snapshot(&self) -> Arc<T> {
        self.inner.load_full()
    }

    /// Whether two handles refer to the same cache entry.
    pub fn ptr_eq(&self, other: &Bound<T>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn store(&self, value: T) {
        self.inner.store(Arc::new(value));
    }
}

impl<T> Clone for Bound<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Bound<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Bound").field(&**self.inner.load()).finish()
    }
}

/// Key of one cache entry: target type, group and call-level exclusions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct CacheKey {
    type_id: TypeId,
    group: Option<String>,
    excluded: Vec<String>,
}

impl CacheKey {
    pub(crate) fn new<T: 'static>(group: Option<&str>, excluded: &[&str]) -> Self {
        let mut excluded: Vec<String> = excluded.iter().map(|s| s.to_string()).collect();
        excluded.sort();
        excluded.dedup();

        Self {
            type_id: TypeId::of::<T>(),
            group: group.map(str::to_ascii_lowercase),
            excluded,
        }
    }
}

/// Type-erased cache entry, so entries of different shapes share one map.
pub(crate) trait Slot: Send + Sync {
    /// Rebind from a new snapshot and publish the result.
    fn rebind(&self, records: &[Record]) -> Result<(), BindError>;

    fn target(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;
}

pub(crate) struct Entry<T> {
    pub(crate) handle: Bound<T>,
    schema: TargetSchema,
    group: Option<String>,
    excluded: Vec<String>,
}

impl<T: ConfigShape> Entry<T> {
    /// Bind `T` for the first time.
    pub(crate) fn bind(
        records: &[Record],
        schema: TargetSchema,
        group: Option<&str>,
        excluded: &[&str],
    ) -> Result<Self, BindError> {
        let value: T = binder::bind_with_schema(records, &schema, group, excluded)?;

        Ok(Self {
            handle: Bound::new(value),
            schema,
            group: group.map(str::to_string),
            excluded: excluded.iter().map(|s| s.to_string()).collect(),
        })
    }
}

impl<T: ConfigShape> Slot for Entry<T> {
    fn rebind(&self, records: &[Record]) -> Result<(), BindError> {
        let current = self.handle.snapshot();
        let excluded: Vec<&str> = self.excluded.iter().map(String::as_str).collect();
        let next = binder::rebind_onto(
            records,
            &self.schema,
            current.as_ref(),
            self.group.as_deref(),
            &excluded,
        )?;
        self.handle.store(next);
        Ok(())
    }

    fn target(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
