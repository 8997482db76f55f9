//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! gateway. All types derive Serde traits for deserialization from config
//! files.

use serde::{Deserialize, Serialize};

/// Root configuration for the admission gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatekeeperConfig {
    /// Listener configuration (bind address, body limits).
    pub listener: ListenerConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Blacklist and whitelist seed lists.
    pub access: AccessConfig,

    /// Admin API settings.
    pub admin: AdminConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Maximum request body size the sanitizer will buffer.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Sliding window duration in seconds.
    pub window_secs: u64,

    /// Maximum requests per client within the window.
    pub max_requests: usize,

    /// Probability (0.0–1.0) of sweeping stale records on an admitted
    /// request.
    pub sweep_probability: f64,

    /// Default number of top clients reported by stats.
    pub stats_top_n: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: 600,
            max_requests: 1000,
            sweep_probability: 0.01,
            stats_top_n: 10,
        }
    }
}

/// Blacklist and whitelist seeds, applied at startup.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AccessConfig {
    /// Addresses denied on arrival.
    pub blacklist: Vec<String>,

    /// Addresses that always pass the guard; also protected from
    /// blacklisting.
    pub whitelist: Vec<String>,
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin routes.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Exporter bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
