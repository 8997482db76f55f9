//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     Load config → Validate → Initialize subsystems → Start listener
//!
//! Shutdown (shutdown.rs):
//!     SIGINT / test trigger → Stop accepting → Drain → Exit
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
