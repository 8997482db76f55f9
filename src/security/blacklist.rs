//! Blacklist guard: binary admit/deny decision keyed by client address.
//!
//! # Responsibilities
//! - Evaluate whitelist-then-blacklist membership per request
//! - Administer both sets (add, remove, stats)
//! - Reject malformed or whitelist-conflicting administrative input
//!
//! # Design Decisions
//! - One mutex guards both sets, so the whitelist-conflict check and the
//!   insert happen in a single critical section
//! - Format check only: an address must merely be IPv4- or IPv6-shaped,
//!   since the key is a map key, not a routable address
//! - Denial carries no reason detail to the client

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{LazyLock, Mutex};

use crate::http::response::Denial;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::security::client_key::{derive_client_key, ClientKey};
use crate::security::error::SecurityError;

static IPV4_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,3}(\.\d{1,3}){3}$").expect("valid regex"));

static IPV6_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Fa-f:]+$").expect("valid regex"));

/// Check whether a string is plausibly an IPv4 or IPv6 address.
///
/// This is a shape check, not address validation: `999.999.999.999`
/// passes, `not-an-ip` does not.
pub fn is_ip_shaped(addr: &str) -> bool {
    IPV4_SHAPE.is_match(addr) || (addr.contains(':') && IPV6_SHAPE.is_match(addr))
}

/// Both sets behind one lock.
#[derive(Default)]
struct GuardSets {
    blacklist: HashSet<String>,
    whitelist: HashSet<String>,
}

/// Snapshot of guard state for the admin surface.
///
/// Entries are sorted so repeated calls produce identical output.
#[derive(Debug, Serialize)]
pub struct GuardStats {
    pub blacklist: Vec<String>,
    pub whitelist: Vec<String>,
    pub blacklist_count: usize,
    pub whitelist_count: usize,
}

/// Admit/deny gate keyed by client address, with a whitelist override.
pub struct BlacklistGuard {
    sets: Mutex<GuardSets>,
}

impl BlacklistGuard {
    /// Create a guard seeded from configuration.
    ///
    /// Seed lists are validated at config load; entries are taken as-is.
    pub fn from_seeds<I, J>(blacklist: I, whitelist: J) -> Self
    where
        I: IntoIterator<Item = String>,
        J: IntoIterator<Item = String>,
    {
        Self {
            sets: Mutex::new(GuardSets {
                blacklist: blacklist.into_iter().collect(),
                whitelist: whitelist.into_iter().collect(),
            }),
        }
    }

    /// Create an empty guard.
    pub fn new() -> Self {
        Self::from_seeds([], [])
    }

    /// Decide whether a client may proceed.
    ///
    /// Whitelist membership always wins; unknown clients are admitted.
    pub fn admit(&self, client_key: &str) -> bool {
        let sets = self.sets.lock().expect("guard mutex poisoned");
        if sets.whitelist.contains(client_key) {
            return true;
        }
        !sets.blacklist.contains(client_key)
    }

    /// Add an address to the blacklist.
    ///
    /// Returns `Ok(true)` if the address was newly inserted, `Ok(false)` if
    /// it was already present.
    pub fn add_to_blacklist(&self, address: &str) -> Result<bool, SecurityError> {
        if !is_ip_shaped(address) {
            return Err(SecurityError::InvalidAddressFormat(address.to_string()));
        }
        let mut sets = self.sets.lock().expect("guard mutex poisoned");
        if sets.whitelist.contains(address) {
            return Err(SecurityError::WhitelistConflict(address.to_string()));
        }
        Ok(sets.blacklist.insert(address.to_string()))
    }

    /// Remove an address from the blacklist.
    ///
    /// Returns whether an entry was actually removed.
    pub fn remove_from_blacklist(&self, address: &str) -> Result<bool, SecurityError> {
        if !is_ip_shaped(address) {
            return Err(SecurityError::InvalidAddressFormat(address.to_string()));
        }
        let mut sets = self.sets.lock().expect("guard mutex poisoned");
        Ok(sets.blacklist.remove(address))
    }

    /// Current contents of both sets, sorted for reproducible output.
    pub fn stats(&self) -> GuardStats {
        let sets = self.sets.lock().expect("guard mutex poisoned");
        let mut blacklist: Vec<String> = sets.blacklist.iter().cloned().collect();
        let mut whitelist: Vec<String> = sets.whitelist.iter().cloned().collect();
        blacklist.sort();
        whitelist.sort();
        GuardStats {
            blacklist_count: blacklist.len(),
            whitelist_count: whitelist.len(),
            blacklist,
            whitelist,
        }
    }
}

impl Default for BlacklistGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// Middleware enforcing the guard. First step of the admission chain.
///
/// Derives the client key once and attaches it as a request extension so
/// downstream steps key on the same identity.
pub async fn blacklist_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let key = derive_client_key(None, request.headers(), Some(addr));
    request.extensions_mut().insert(ClientKey(key.clone()));

    if state.guard.admit(&key) {
        next.run(request).await
    } else {
        tracing::warn!(client = %key, "request denied by blacklist");
        metrics::record_denied("blacklist");
        Denial::Blacklisted.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_clients_are_admitted() {
        let guard = BlacklistGuard::new();
        assert!(guard.admit("10.0.0.1"));
    }

    #[test]
    fn blacklisted_clients_are_denied() {
        let guard = BlacklistGuard::new();
        guard.add_to_blacklist("10.0.0.1").unwrap();
        assert!(!guard.admit("10.0.0.1"));
        assert!(guard.admit("10.0.0.2"));
    }

    #[test]
    fn whitelist_overrides_blacklist() {
        let guard = BlacklistGuard::from_seeds(
            ["10.0.0.1".to_string()],
            ["10.0.0.1".to_string()],
        );
        assert!(guard.admit("10.0.0.1"));
    }

    #[test]
    fn add_is_idempotent() {
        let guard = BlacklistGuard::new();
        assert_eq!(guard.add_to_blacklist("10.0.0.1"), Ok(true));
        assert_eq!(guard.add_to_blacklist("10.0.0.1"), Ok(false));
        assert_eq!(guard.stats().blacklist_count, 1);
    }

    #[test]
    fn whitelisted_address_cannot_be_blacklisted() {
        let guard = BlacklistGuard::from_seeds([], ["10.0.0.1".to_string()]);
        assert_eq!(
            guard.add_to_blacklist("10.0.0.1"),
            Err(SecurityError::WhitelistConflict("10.0.0.1".to_string()))
        );
        let stats = guard.stats();
        assert_eq!(stats.blacklist_count, 0);
        assert_eq!(stats.whitelist_count, 1);
    }

    #[test]
    fn malformed_addresses_are_rejected() {
        let guard = BlacklistGuard::new();
        assert_eq!(
            guard.add_to_blacklist("not-an-ip"),
            Err(SecurityError::InvalidAddressFormat("not-an-ip".to_string()))
        );
        assert_eq!(
            guard.remove_from_blacklist(""),
            Err(SecurityError::InvalidAddressFormat(String::new()))
        );
    }

    #[test]
    fn remove_reports_whether_entry_existed() {
        let guard = BlacklistGuard::new();
        guard.add_to_blacklist("10.0.0.1").unwrap();
        assert_eq!(guard.remove_from_blacklist("10.0.0.1"), Ok(true));
        assert_eq!(guard.remove_from_blacklist("10.0.0.1"), Ok(false));
        assert!(guard.admit("10.0.0.1"));
    }

    #[test]
    fn stats_are_sorted() {
        let guard = BlacklistGuard::new();
        guard.add_to_blacklist("10.0.0.9").unwrap();
        guard.add_to_blacklist("10.0.0.1").unwrap();
        guard.add_to_blacklist("10.0.0.5").unwrap();
        let stats = guard.stats();
        assert_eq!(stats.blacklist, vec!["10.0.0.1", "10.0.0.5", "10.0.0.9"]);
    }

    #[test]
    fn ip_shape_check() {
        assert!(is_ip_shaped("192.168.1.1"));
        assert!(is_ip_shaped("999.999.999.999")); // shape only, not validity
        assert!(is_ip_shaped("::1"));
        assert!(is_ip_shaped("2001:db8::ff00:42:8329"));
        assert!(!is_ip_shaped("example.com"));
        assert!(!is_ip_shaped("192.168.1"));
        assert!(!is_ip_shaped(""));
    }
}
