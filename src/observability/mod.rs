//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! binder / cache / loaders produce:
//!     → tracing events (structured fields: target_type, mode, loader, error)
//!     → metrics.rs (counters and gauges through the `metrics` facade)
//!
//! Consumers:
//!     → logging.rs subscriber (binary), or the host application's own
//!     → whatever metrics recorder the host installs
//! ```
//!
//! # Design Decisions
//! - The library never installs a subscriber or recorder itself
//! - Metric updates are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
