//! Deep sanitization of structured request data.
//!
//! # Responsibilities
//! - Recursively clean JSON bodies, query maps, and path parameters
//! - Drop mapping keys that look like injection vectors (`$`-prefixed,
//!   dotted, or mutated by cleaning)
//! - Neutralize script tags, inline event handlers, and `javascript:`
//!   scheme prefixes inside strings, then entity-encode markup characters
//!
//! # Design Decisions
//! - Pure functions returning new values: no aliasing hazards when the
//!   same substructure is referenced by concurrent requests
//! - Total: malformed or unexpected input passes through unchanged rather
//!   than failing; this filter is best-effort, not a parser-based
//!   HTML sanitizer
//! - Dropped keys are a logged observation, not an error

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

use crate::http::server::AppState;
use crate::observability::metrics;

static SCRIPT_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script[^>]*>").expect("valid regex")
});

static EVENT_HANDLER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bon\w+\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]*)"#).expect("valid regex")
});

static JS_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)javascript:").expect("valid regex"));

/// Clean a single string value.
///
/// Steps run in a fixed order: script spans, event-handler assignments,
/// `javascript:` prefixes, then entity encoding. `&` is encoded first so
/// entities produced by the later replacements are not double-encoded.
pub fn clean_string(input: &str) -> String {
    let cleaned = SCRIPT_SPAN.replace_all(input, "");
    let cleaned = EVENT_HANDLER.replace_all(&cleaned, "");
    let cleaned = JS_SCHEME.replace_all(&cleaned, "");

    cleaned
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
        .replace('/', "&#x2F;")
}

/// Whether a mapping entry should be dropped entirely.
///
/// Keys that change under cleaning, start with `$`, or contain `.` defeat
/// operator-injection and path-traversal patterns.
fn is_hostile_key(key: &str) -> bool {
    key.starts_with('$') || key.contains('.') || clean_string(key) != key
}

/// Recursively sanitize a structured value, depth-first.
///
/// Mappings lose hostile entries; sequences keep order and length;
/// strings are cleaned; other primitives pass through unchanged.
pub fn sanitize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, inner) in map {
                if is_hostile_key(key) {
                    tracing::warn!(key = %key, "sanitizer dropped suspicious key");
                    metrics::record_dropped_key();
                    continue;
                }
                out.insert(key.clone(), sanitize(inner));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sanitize).collect()),
        Value::String(s) => Value::String(clean_string(s)),
        other => other.clone(),
    }
}

/// Middleware sanitizing JSON request bodies. Last step of the admission
/// chain before the handler.
///
/// Non-JSON bodies pass through untouched; bodies that fail to parse as
/// JSON also pass through (the handler's own extraction decides their
/// fate). Oversized bodies are rejected with 413.
pub async fn sanitize_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let is_json = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));

    if !is_json {
        return next.run(request).await;
    }

    let (mut parts, body) = request.into_parts();
    let limit = state.config.listener.max_body_bytes;
    let bytes = match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return (StatusCode::PAYLOAD_TOO_LARGE, "request body too large").into_response();
        }
    };

    let bytes = match serde_json::from_slice::<Value>(&bytes) {
        Ok(value) => Bytes::from(serde_json::to_vec(&sanitize(&value)).unwrap_or_default()),
        Err(_) => bytes,
    };

    // The body length may have changed; let hyper recompute it.
    parts.headers.remove(header::CONTENT_LENGTH);

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clean_round_trip_preserves_structure() {
        let value = json!({
            "name": "alice",
            "age": 30,
            "active": true,
            "note": null,
            "tags": ["one", "two"],
            "nested": { "city": "berlin", "zip": 10115 }
        });
        assert_eq!(sanitize(&value), value);
    }

    #[test]
    fn defeats_operator_and_traversal_keys() {
        let value = json!({
            "$where": "1==1",
            "a.b": 1,
            "name": "<script>alert(1)</script>"
        });
        let out = sanitize(&value);
        let map = out.as_object().unwrap();

        assert!(!map.contains_key("$where"));
        assert!(!map.contains_key("a.b"));
        let name = map["name"].as_str().unwrap();
        assert!(!name.to_lowercase().contains("<script"));
        assert!(!name.contains('<'));
        assert!(!name.contains('>'));
    }

    #[test]
    fn hostile_keys_are_dropped_at_depth() {
        let value = json!({ "outer": { "$gt": 5, "ok": "fine" } });
        let out = sanitize(&value);
        let inner = out["outer"].as_object().unwrap();
        assert!(!inner.contains_key("$gt"));
        assert_eq!(inner["ok"], "fine");
    }

    #[test]
    fn script_spans_removed_case_insensitively() {
        assert_eq!(clean_string("a<SCRIPT src=x>payload</ScRiPt >b"), "ab");
        assert_eq!(
            clean_string("<script>one</script>mid<script>two</script>"),
            "mid"
        );
    }

    #[test]
    fn event_handlers_removed() {
        let out = clean_string(r#"<img src=x onerror="alert(1)">"#);
        assert!(!out.to_lowercase().contains("onerror"));
    }

    #[test]
    fn javascript_scheme_removed() {
        assert_eq!(clean_string("JavaScript:alert(1)"), "alert(1)");
    }

    #[test]
    fn entity_encoding_order_avoids_double_encoding() {
        assert_eq!(clean_string("&"), "&amp;");
        assert_eq!(clean_string("<"), "&lt;");
        assert_eq!(clean_string("a & b < c"), "a &amp; b &lt; c");
        assert_eq!(clean_string("\"'/"), "&quot;&#x27;&#x2F;");
    }

    #[test]
    fn sequences_keep_order_and_length() {
        let value = json!(["<b>", 1, true, null, "plain"]);
        let out = sanitize(&value);
        let items = out.as_array().unwrap();
        assert_eq!(items.len(), 5);
        assert_eq!(items[0], "&lt;b&gt;");
        assert_eq!(items[1], 1);
        assert_eq!(items[4], "plain");
    }

    #[test]
    fn non_string_primitives_unchanged() {
        assert_eq!(sanitize(&json!(42)), json!(42));
        assert_eq!(sanitize(&json!(false)), json!(false));
        assert_eq!(sanitize(&json!(null)), json!(null));
        assert_eq!(sanitize(&json!(1.5)), json!(1.5));
    }

    #[test]
    fn key_mutated_by_cleaning_is_dropped() {
        let value = json!({ "na<me": "x", "safe": "y" });
        let out = sanitize(&value);
        let map = out.as_object().unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["safe"], "y");
    }
}
