//! Settings schema definitions.

use crate::loader::SourceFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root settings of the binary.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Where records come from.
    pub source: SourceSettings,

    /// Background refresh behaviour.
    pub refresh: RefreshSettings,

    pub observability: ObservabilitySettings,
}

/// Record source settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct SourceSettings {
    /// Path of the records file.
    pub path: Option<PathBuf>,

    /// File format; guessed from the extension when absent.
    pub format: Option<SourceFormat>,
}

impl SourceSettings {
    pub fn resolved_format(&self) -> Option<SourceFormat> {
        self.format
            .or_else(|| self.path.as_deref().and_then(SourceFormat::from_path))
    }
}

/// Refresh settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RefreshSettings {
    /// Interval between background refreshes in milliseconds (0 = never).
    pub interval_ms: u64,

    /// Request a refresh as soon as the source file changes.
    pub watch_file: bool,
}

impl RefreshSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            interval_ms: 5_000,
            watch_file: true,
        }
    }
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilitySettings {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilitySettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
