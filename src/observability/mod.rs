//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → Log aggregation (stdout, file, remote)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging for machine parsing
//! - Request ID flows through all subsystems
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
