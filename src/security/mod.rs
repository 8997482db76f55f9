//! Request-admission subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → client_key.rs (derive caller identity)
//!     → blacklist.rs (whitelist-then-blacklist admit/deny)
//!     → rate_limit.rs (sliding-window admission control)
//!     → sanitize.rs (neutralize hostile payload content)
//!     → Pass to handler
//! ```
//!
//! # Design Decisions
//! - Fixed evaluation order; any step may short-circuit with a denial and
//!   downstream steps never run
//! - The three components share no state with each other, so each is
//!   testable in isolation
//! - Fail closed on guard and limiter; the sanitizer never fails

pub mod blacklist;
pub mod client_key;
pub mod error;
pub mod rate_limit;
pub mod sanitize;
pub mod validate;

pub use blacklist::{BlacklistGuard, GuardStats};
pub use client_key::{derive_client_key, ClientKey, UNKNOWN_CLIENT};
pub use error::SecurityError;
pub use rate_limit::{AdmitDecision, LimiterStats, SlidingWindowLimiter};
pub use sanitize::{clean_string, sanitize};
pub use validate::{validate_fields, FieldKind, FieldRule};
