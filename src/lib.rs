//! Request-admission gateway library.
//!
//! Three components sit in a fixed order in front of business logic:
//! a blacklist guard, a sliding-window rate limiter, and a deep sanitizer.
//! Any step may short-circuit with a denial; the admin surface manages
//! the shared state at runtime.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::GatekeeperConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
