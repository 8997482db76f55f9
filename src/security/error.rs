//! Error taxonomy for administrative security operations.
//!
//! Denials from the guard or the limiter are not errors; they are
//! first-class negative results carried by [`crate::http::response::Denial`].
//! The variants here cover malformed administrative input only and are
//! translated into 400-class responses at the boundary.

use thiserror::Error;

/// Errors returned by blacklist administration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SecurityError {
    /// The supplied value is not an IPv4- or IPv6-shaped string.
    #[error("invalid address format: {0}")]
    InvalidAddressFormat(String),

    /// The address is whitelisted and may not be blacklisted.
    #[error("address is whitelisted and cannot be blacklisted: {0}")]
    WhitelistConflict(String),
}
