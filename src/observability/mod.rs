//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging for machine parsing
//! - Request ID flows through every request span
//! - Metric updates are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::{init_metrics, MetricsError};
