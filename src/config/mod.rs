//! Settings for the `live-config` binary.
//!
//! # Data Flow
//! ```text
//! settings file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → CLI flag overrides
//!     → validation.rs (semantic checks)
//!     → Settings → LiveCache builder + FileTrigger
//!
//! On source file change:
//!     watcher.rs detects change
//!     → RefreshHandle::request()
//!     → refresh worker runs a cycle
//! ```
//!
//! # Design Decisions
//! - Every section has defaults so an empty file is valid
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use schema::Settings;
pub use schema::SourceSettings;
pub use schema::RefreshSettings;
pub use schema::ObservabilitySettings;
