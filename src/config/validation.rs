//! Settings validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: Settings → Result<(), Vec<ValidationError>>

use crate::config::schema::Settings;
use std::path::PathBuf;
use thiserror::Error;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Shortest accepted refresh interval.
pub const MIN_INTERVAL_MS: u64 = 10;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no source file configured")]
    MissingSource,

    #[error("cannot tell the format of {}; set source.format", .0.display())]
    UnknownFormat(PathBuf),

    #[error("refresh interval {0}ms is below the minimum of {min}ms", min = MIN_INTERVAL_MS)]
    IntervalTooShort(u64),

    #[error("watching the source file needs a non-zero refresh interval")]
    WatchWithoutWorker,

    #[error("unknown log level `{0}`")]
    InvalidLogLevel(String),
}

pub fn validate_settings(settings: &Settings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match &settings.source.path {
        None => errors.push(ValidationError::MissingSource),
        Some(path) if settings.source.resolved_format().is_none() => {
            errors.push(ValidationError::UnknownFormat(path.clone()))
        }
        Some(_) => {}
    }

    let interval_ms = settings.refresh.interval_ms;
    if interval_ms > 0 && interval_ms < MIN_INTERVAL_MS {
        errors.push(ValidationError::IntervalTooShort(interval_ms));
    }
    if settings.refresh.watch_file && interval_ms == 0 {
        errors.push(ValidationError::WatchWithoutWorker);
    }

    let level = settings.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::InvalidLogLevel(
            settings.observability.log_level.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
