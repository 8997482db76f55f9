use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::http::server::AppState;

/// Bearer-token check for the admin surface.
///
/// The key comes from configuration; validation refuses the placeholder
/// value when the admin API is enabled.
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    if let Some(auth_val) = auth_header {
        if auth_val == format!("Bearer {}", state.config.admin.api_key) {
            return Ok(next.run(request).await);
        }
    }

    tracing::warn!("admin request rejected: missing or invalid API key");
    Err(StatusCode::UNAUTHORIZED)
}
