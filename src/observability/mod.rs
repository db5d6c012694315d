//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Selection paths produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Selection hot path logs at debug only; warn/error near the recursion cap
//! - Metrics are cheap (atomic increments) and labelled by aggregate name
//! - Without an installed recorder, metric calls are no-ops

pub mod logging;
pub mod metrics;
