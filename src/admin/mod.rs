pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{delete, get},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

/// Assemble the admin routes, protected by the API-key middleware.
///
/// Mounted outside the admission chain so operators can always reach it.
pub fn admin_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/blacklist", get(get_blacklist).post(add_blacklist))
        .route("/admin/blacklist/{address}", delete(remove_blacklist))
        .route("/admin/rate-limit", get(get_rate_limit))
        .route("/admin/rate-limit/{key}", delete(reset_rate_limit))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ))
        .with_state(state)
}
