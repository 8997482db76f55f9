//! HTTP boundary subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, admission chain wiring)
//!     → request.rs (request ID)
//!     → security::* middleware (guard → limiter → sanitizer)
//!     → handler
//!     → response.rs (denial / error envelopes)
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use response::Denial;
pub use server::{AppState, HttpServer};
