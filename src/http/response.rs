//! Denial and error envelopes.
//!
//! # Responsibilities
//! - Render admission denials as structured HTTP responses
//! - Map administrative errors to 400-class responses
//!
//! # Design Decisions
//! - Denials are values, not errors: a denied request is a normal outcome
//!   of the chain, distinguishable from an internal failure
//! - The blacklist denial body is deliberately generic; revealing why a
//!   client was refused would confirm the block to the attacker

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::security::error::SecurityError;

/// A short-circuit outcome of the admission chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    /// Client address is blacklisted. Carries no metadata.
    Blacklisted,

    /// Client exceeded the sliding-window limit.
    RateLimited { limit: usize, retry_after_secs: u64 },
}

impl Denial {
    /// Machine-distinguishable reason tag.
    pub fn reason(&self) -> &'static str {
        match self {
            Denial::Blacklisted => "forbidden",
            Denial::RateLimited { .. } => "rate_limited",
        }
    }
}

impl IntoResponse for Denial {
    fn into_response(self) -> Response {
        match self {
            Denial::Blacklisted => (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "access denied" })),
            )
                .into_response(),
            Denial::RateLimited {
                limit,
                retry_after_secs,
            } => (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({
                    "error": "rate limit exceeded",
                    "reason": "rate_limited",
                    "limit": limit,
                    "retry_after_secs": retry_after_secs,
                })),
            )
                .into_response(),
        }
    }
}

impl IntoResponse for SecurityError {
    fn into_response(self) -> Response {
        let (reason, value) = match &self {
            SecurityError::InvalidAddressFormat(v) => ("invalid_address_format", v.clone()),
            SecurityError::WhitelistConflict(v) => ("whitelist_conflict", v.clone()),
        };
        (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": self.to_string(),
                "reason": reason,
                "value": value,
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_tags_are_distinct() {
        assert_eq!(Denial::Blacklisted.reason(), "forbidden");
        assert_eq!(
            Denial::RateLimited {
                limit: 10,
                retry_after_secs: 5
            }
            .reason(),
            "rate_limited"
        );
    }

    #[tokio::test]
    async fn blacklist_denial_is_generic_403() {
        let response = Denial::Blacklisted.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "error": "access denied" }));
    }

    #[tokio::test]
    async fn rate_limit_denial_carries_metadata() {
        let response = Denial::RateLimited {
            limit: 100,
            retry_after_secs: 42,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["limit"], 100);
        assert_eq!(body["retry_after_secs"], 42);
    }

    #[tokio::test]
    async fn security_errors_are_bad_requests() {
        let response =
            SecurityError::InvalidAddressFormat("bogus".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["value"], "bogus");
        assert_eq!(body["reason"], "invalid_address_format");
    }
}
