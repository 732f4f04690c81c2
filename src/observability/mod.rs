//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! messenger / transports / transaction engine produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms via the metrics facade)
//!
//! Consumers:
//!     → whatever subscriber and recorder the embedding application installs
//! ```
//!
//! # Design Decisions
//! - The library never installs a metrics exporter; without a recorder every
//!   update is a no-op
//! - `init_logging` is a convenience for binaries and tests, not called implicitly

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
