//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check seed addresses are IP-shaped and the two lists are disjoint
//! - Validate value ranges (window > 0, limits > 0)
//! - Refuse the placeholder admin key when the admin API is enabled
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: GatekeeperConfig → Result<(), Vec<_>>
//! - Runs before the config is accepted into the system

use thiserror::Error;

use crate::config::schema::{AdminConfig, GatekeeperConfig};
use crate::security::blacklist::is_ip_shaped;

/// A single semantic problem found in a configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("rate_limit.window_secs must be greater than zero")]
    ZeroWindow,

    #[error("rate_limit.max_requests must be greater than zero")]
    ZeroMaxRequests,

    #[error("rate_limit.sweep_probability must be between 0.0 and 1.0")]
    SweepProbabilityOutOfRange,

    #[error("{list} seed is not an IP-shaped address: {address}")]
    MalformedSeed { list: &'static str, address: String },

    #[error("address appears in both blacklist and whitelist seeds: {0}")]
    ConflictingSeed(String),

    #[error("admin API is enabled but api_key is the default placeholder")]
    PlaceholderAdminKey,
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &GatekeeperConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.rate_limit.window_secs == 0 {
        errors.push(ValidationError::ZeroWindow);
    }
    if config.rate_limit.max_requests == 0 {
        errors.push(ValidationError::ZeroMaxRequests);
    }
    if !(0.0..=1.0).contains(&config.rate_limit.sweep_probability) {
        errors.push(ValidationError::SweepProbabilityOutOfRange);
    }

    for address in &config.access.blacklist {
        if !is_ip_shaped(address) {
            errors.push(ValidationError::MalformedSeed {
                list: "blacklist",
                address: address.clone(),
            });
        }
    }
    for address in &config.access.whitelist {
        if !is_ip_shaped(address) {
            errors.push(ValidationError::MalformedSeed {
                list: "whitelist",
                address: address.clone(),
            });
        }
    }

    for address in &config.access.blacklist {
        if config.access.whitelist.contains(address) {
            errors.push(ValidationError::ConflictingSeed(address.clone()));
        }
    }

    if config.admin.enabled && config.admin.api_key == AdminConfig::default().api_key {
        errors.push(ValidationError::PlaceholderAdminKey);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
