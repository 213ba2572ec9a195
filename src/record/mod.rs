//! Configuration records.
//!
//! A [`Record`] is one flat configuration entry as produced by a loader.
//! Records are grouped by `group` (the config "type") and addressed inside
//! the group by `name`.
//!
//! # Design Decisions
//! - Diff identity is `(group, name)`, case-sensitive
//! - Binding matches group and name case-insensitively
//! - `update_time` is provenance only and never takes part in equality

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// One configuration entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Logical namespace the entry belongs to.
    pub group: String,

    /// Field-level key within the group.
    pub name: String,

    /// Raw textual value. `None` means "unset".
    #[serde(default)]
    pub value: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Ordering hint among entries.
    #[serde(default)]
    pub sequence_no: i32,

    /// Disabled entries never take part in binding.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub update_time: Option<SystemTime>,
}

fn default_enabled() -> bool {
    true
}

impl Record {
    /// Create an enabled record with a value.
    pub fn new(group: impl Into<String>, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            value: Some(value.into()),
            description: None,
            sequence_no: 0,
            enabled: true,
            update_time: None,
        }
    }

    /// Create an enabled record without a value.
    pub fn unset(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            value: None,
            ..Self::new(group, name, "")
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_sequence_no(mut self, sequence_no: i32) -> Self {
        self.sequence_no = sequence_no;
        self
    }

    pub fn with_update_time(mut self, update_time: SystemTime) -> Self {
        self.update_time = Some(update_time);
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn disabled(self) -> Self {
        self.with_enabled(false)
    }

    /// Diff identity: `(group, name)`, compared case-sensitively.
    pub fn identity(&self) -> (&str, &str) {
        (&self.group, &self.name)
    }

    /// Compare the non-identity content that counts as a modification.
    pub fn content_eq(&self, other: &Record) -> bool {
        self.value == other.value
            && self.description == other.description
            && self.sequence_no == other.sequence_no
            && self.enabled == other.enabled
    }

    /// Case-insensitive group match used by the binder.
    pub fn matches_group(&self, group: &str) -> bool {
        self.group.eq_ignore_ascii_case(group)
    }

    /// Case-insensitive field name match used by the binder.
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.group, self.name)?;
        match &self.value {
            Some(value) => write!(f, "={}", value)?,
            None => write!(f, " (unset)")?,
        }
        if !self.enabled {
            write!(f, " [disabled]")?;
        }
        Ok(())
    }
}
