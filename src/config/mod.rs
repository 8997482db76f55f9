//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatekeeperConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::AccessConfig;
pub use schema::AdminConfig;
pub use schema::GatekeeperConfig;
pub use schema::ListenerConfig;
pub use schema::RateLimitConfig;
