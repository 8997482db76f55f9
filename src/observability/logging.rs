//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the logging subsystem once at startup
//! - Honor `RUST_LOG` with a sensible default filter
//!
//! # Design Decisions
//! - Uses the tracing crate for structured logging
//! - Fields over interpolation: `client = %key`, not string building

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global tracing subscriber.
pub fn init() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gatekeeper=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
