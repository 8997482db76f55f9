//! Client identity derivation.
//!
//! Every admission decision is keyed by a `ClientKey`: a canonicalized
//! address string derived from the request. It is never validated as a
//! real address; it is only a map key. Derivation precedence:
//!
//! 1. A pre-resolved trusted client address supplied by the transport layer
//! 2. The first comma-separated entry of `X-Forwarded-For`, trimmed
//! 3. `X-Real-IP`
//! 4. The raw transport-layer peer address
//! 5. The sentinel `"0.0.0.0"`

use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

/// Sentinel key used when no address can be derived.
pub const UNKNOWN_CLIENT: &str = "0.0.0.0";

/// Derived caller identity, attached to the request as an extension so the
/// guard and the limiter agree on the same key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientKey(pub String);

/// Derive the client key for a request.
pub fn derive_client_key(
    trusted: Option<IpAddr>,
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
) -> String {
    if let Some(ip) = trusted {
        return ip.to_string();
    }

    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }

    if let Some(addr) = peer {
        return addr.ip().to_string();
    }

    UNKNOWN_CLIENT.to_string()
}
