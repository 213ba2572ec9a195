//! Record sources.
//!
//! # Data Flow
//! ```text
//! source (memory / .properties / TOML / ...)
//!     → Loader::load()
//!     → ordered Vec<Record> or LoaderError
//!     → live cache (snapshot, diff, bind)
//! ```
//!
//! # Design Decisions
//! - A loader is stateless from the cache's point of view: every call returns a full snapshot
//! - Timeouts and retries belong to the loader; the cache never retries on its own
//! - Any failure, including "unavailable", keeps the last good snapshot in the cache

pub mod memory;
pub mod properties;
pub mod toml_file;

pub use memory::MemoryLoader;
pub use properties::PropertiesLoader;
pub use toml_file::TomlLoader;

use crate::record::Record;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by record sources.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("invalid TOML in {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid records in {}: {message}", path.display())]
    Invalid { path: PathBuf, message: String },

    /// The source could not produce a snapshot right now.
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// The loader panicked instead of returning.
    #[error("loader panicked: {0}")]
    Panicked(String),
}

/// A source of configuration records.
pub trait Loader: Send + Sync {
    /// Load the complete current record set.
    fn load(&self) -> Result<Vec<Record>, LoaderError>;

    /// Release underlying resources. Called once when the cache closes.
    fn close(&self) {}

    /// Short human-readable description for logs.
    fn describe(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}

impl<L: Loader + ?Sized> Loader for Arc<L> {
    fn load(&self) -> Result<Vec<Record>, LoaderError> {
        (**self).load()
    }

    fn close(&self) {
        (**self).close()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

impl<L: Loader + ?Sized> Loader for Box<L> {
    fn load(&self) -> Result<Vec<Record>, LoaderError> {
        (**self).load()
    }

    fn close(&self) {
        (**self).close()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// On-disk record formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    #[value(alias = "props")]
    Properties,
    Toml,
}

impl SourceFormat {
    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "properties" | "props" => Some(SourceFormat::Properties),
            "toml" => Some(SourceFormat::Toml),
            _ => None,
        }
    }
}

/// Open a file-backed loader for `path`.
pub fn file_loader(path: &Path, format: SourceFormat) -> Box<dyn Loader> {
    match format {
        SourceFormat::Properties => Box::new(PropertiesLoader::new(path)),
        SourceFormat::Toml => Box::new(TomlLoader::new(path)),
    }
}

fn modified_time(path: &Path) -> Option<std::time::SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn read_source(path: &Path) -> Result<String, LoaderError> {
    std::fs::read_to_string(path).map_err(|source| LoaderError::Io {
        path: path.to_path_buf(),
        source,
    })
}
