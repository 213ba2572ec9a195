//! Snapshot change detection.
//!
//! Compares two record snapshots and sorts every difference into exactly
//! one of three buckets: created, deleted or modified.
//!
//! # Design Decisions
//! - Correspondence is by `(group, name)`, case-sensitive
//! - Only non-identity content decides "modified" (see [`Record::content_eq`])
//! - A missing old snapshot means "no diff performed", never "all created"
//! - Records sharing one identity within a snapshot pair up in order of appearance

use crate::record::Record;
use serde::Serialize;
use std::collections::HashMap;

/// Differences between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diff {
    /// Records present only in the new snapshot.
    pub created: Vec<Record>,
    /// Records present only in the old snapshot.
    pub deleted: Vec<Record>,
    /// New versions of records whose content changed.
    pub modified: Vec<Record>,
}

impl Diff {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.deleted.is_empty() && self.modified.is_empty()
    }

    /// Total number of changed records.
    pub fn len(&self) -> usize {
        self.created.len() + self.deleted.len() + self.modified.len()
    }
}

/// Result of comparing against a possibly absent previous snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffOutcome {
    /// There was no previous snapshot to compare with.
    NotPerformed,
    Compared(Diff),
}

/// Compare `new` against `old`, if there is an `old`.
pub fn diff(old: Option<&[Record]>, new: &[Record]) -> DiffOutcome {
    match old {
        Some(old) => DiffOutcome::Compared(diff_snapshots(old, new)),
        None => DiffOutcome::NotPerformed,
    }
}

/// Compare two snapshots with the default content equality.
pub fn diff_snapshots(old: &[Record], new: &[Record]) -> Diff {
    diff_snapshots_with(old, new, Record::content_eq)
}

/// Compare two snapshots with a custom equality policy for corresponding records.
pub fn diff_snapshots_with<F>(old: &[Record], new: &[Record], same: F) -> Diff
where
    F: Fn(&Record, &Record) -> bool,
{
    let old_index = index(old);
    let new_index = index(new);
    let mut diff = Diff::default();

    for (position, record) in new.iter().enumerate() {
        if counterpart(&old_index, record, occurrence(&new_index, record, position)).is_none() {
            diff.created.push(record.clone());
        }
    }

    for (position, record) in old.iter().enumerate() {
        if counterpart(&new_index, record, occurrence(&old_index, record, position)).is_none() {
            diff.deleted.push(record.clone());
        }
    }

    for (position, record) in old.iter().enumerate() {
        let nth = occurrence(&old_index, record, position);
        if let Some(new_position) = counterpart(&new_index, record, nth) {
            let updated = &new[new_position];
            if !same(record, updated) {
                diff.modified.push(updated.clone());
            }
        }
    }

    diff
}

type Index<'a> = HashMap<(&'a str, &'a str), Vec<usize>>;

/// Positions of every record, grouped by identity.
fn index(records: &[Record]) -> Index<'_> {
    let mut index: Index<'_> = HashMap::new();
    for (position, record) in records.iter().enumerate() {
        index.entry(record.identity()).or_default().push(position);
    }
    index
}

/// Which occurrence of its identity the record at `position` is.
fn occurrence(index: &Index<'_>, record: &Record, position: usize) -> usize {
    index
        .get(&record.identity())
        .and_then(|positions| positions.iter().position(|&p| p == position))
        .unwrap_or(0)
}

fn counterpart(index: &Index<'_>, record: &Record, nth: usize) -> Option<usize> {
    index
        .get(&record.identity())
        .and_then(|positions| positions.get(nth))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    fn snapshot() -> Vec<Record> {
        vec![
            Record::new("app", "a", "1"),
            Record::new("app", "b", "0").with_description("flag"),
            Record::new("db", "url", "postgres://localhost"),
        ]
    }

    #[test]
    fn test_identical_snapshots_have_no_diff() {
        let records = snapshot();
        let diff = diff_snapshots(&records, &records);

        assert!(diff.is_empty());
        assert_eq!(diff.len(), 0);
        assert!(diff_snapshots(&[], &[]).is_empty());
    }

    #[test]
    fn test_missing_old_snapshot_is_not_performed() {
        assert_eq!(diff(None, &snapshot()), DiffOutcome::NotPerformed);
        assert_eq!(
            diff(Some(&snapshot()), &snapshot()),
            DiffOutcome::Compared(Diff::default())
        );
    }

    #[test]
    fn test_buckets() {
        let old = snapshot();
        let new = vec![
            Record::new("app", "a", "2"),
            Record::new("app", "b", "0").with_description("flag"),
            Record::new("cache", "ttl", "30s"),
        ];

        let diff = diff_snapshots(&old, &new);

        assert_eq!(diff.created, vec![Record::new("cache", "ttl", "30s")]);
        assert_eq!(diff.deleted, vec![Record::new("db", "url", "postgres://localhost")]);
        assert_eq!(diff.modified, vec![Record::new("app", "a", "2")]);
    }

    #[test]
    fn test_multi_field_change_is_one_modification() {
        let old = vec![Record::new("app", "a", "1")];
        let new = vec![Record::new("app", "a", "2")
            .with_description("changed")
            .with_sequence_no(4)
            .disabled()];

        let diff = diff_snapshots(&old, &new);
        assert_eq!(diff.modified.len(), 1);
        assert!(diff.created.is_empty() && diff.deleted.is_empty());
    }

    #[test]
    fn test_update_time_alone_is_not_a_change() {
        let old = vec![Record::new("app", "a", "1").with_update_time(SystemTime::UNIX_EPOCH)];
        let new = vec![Record::new("app", "a", "1")
            .with_update_time(SystemTime::UNIX_EPOCH + Duration::from_secs(5))];

        assert!(diff_snapshots(&old, &new).is_empty());
    }

    #[test]
    fn test_identity_is_case_sensitive() {
        let old = vec![Record::new("app", "a", "1")];
        let new = vec![Record::new("app", "A", "1")];

        let diff = diff_snapshots(&old, &new);
        assert_eq!(diff.created.len(), 1);
        assert_eq!(diff.deleted.len(), 1);
        assert!(diff.modified.is_empty());
    }

    #[test]
    fn test_duplicate_identities_pair_in_order() {
        let old = vec![Record::new("app", "a", "1"), Record::new("app", "a", "2")];
        let new = vec![
            Record::new("app", "a", "1"),
            Record::new("app", "a", "3"),
            Record::new("app", "a", "4"),
        ];

        let diff = diff_snapshots(&old, &new);
        assert_eq!(diff.modified, vec![Record::new("app", "a", "3")]);
        assert_eq!(diff.created, vec![Record::new("app", "a", "4")]);
        assert!(diff.deleted.is_empty());
    }

    #[test]
    fn test_custom_equality_policy() {
        let old = vec![Record::new("app", "a", "1").with_description("old")];
        let new = vec![Record::new("app", "a", "1").with_description("new")];

        let value_only = diff_snapshots_with(&old, &new, |a, b| a.value == b.value);
        assert!(value_only.is_empty());
        assert_eq!(diff_snapshots(&old, &new).modified.len(), 1);
    }
}
