//! Request identification.
//!
//! Every request gets a UUID v4 request ID as early as possible so log
//! lines across the admission chain correlate. The ID is propagated back
//! to the client on the response.

use axum::http::{HeaderName, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Header carrying the request ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates a fresh UUID v4 per request.
#[derive(Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_unique_parseable_ids() {
        let mut maker = MakeRequestUuid;
        let req = Request::new(());
        let a = maker.make_request_id(&req).unwrap();
        let b = maker.make_request_id(&req).unwrap();
        assert_ne!(a.header_value(), b.header_value());
        Uuid::parse_str(a.header_value().to_str().unwrap()).unwrap();
    }
}
