//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router and shared application state
//! - Wire the admission chain in its fixed order:
//!   blacklist guard → rate limiter → sanitizer → handler
//! - Mount the admin surface (key-protected, outside the chain)
//! - Wire cross-cutting middleware (request ID, tracing, timeout)
//! - Bind the server to a listener and run until shutdown
//!
//! # Design Decisions
//! - The chain is expressed as middleware layers so a denial at any step
//!   short-circuits everything downstream, including the handler
//! - Admin routes sit outside the chain: an operator locked out by their
//!   own blacklist entry could otherwise never remove it

use axum::{
    body::Bytes,
    extract::Query,
    http::Uri,
    middleware,
    response::Json,
    routing::any,
    Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::admin_router;
use crate::config::GatekeeperConfig;
use crate::http::request::{MakeRequestUuid, X_REQUEST_ID};
use crate::security::blacklist::{blacklist_middleware, BlacklistGuard};
use crate::security::rate_limit::{rate_limit_middleware, SlidingWindowLimiter};
use crate::security::sanitize::{clean_string, sanitize, sanitize_middleware};

/// Application state injected into middleware and handlers.
#[derive(Clone)]
pub struct AppState {
    pub guard: Arc<BlacklistGuard>,
    pub limiter: Arc<SlidingWindowLimiter>,
    pub config: Arc<GatekeeperConfig>,
}

/// HTTP server fronting the admission chain.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new server with the given configuration.
    pub fn new(config: GatekeeperConfig) -> Self {
        let state = AppState {
            guard: Arc::new(BlacklistGuard::from_seeds(
                config.access.blacklist.clone(),
                config.access.whitelist.clone(),
            )),
            limiter: Arc::new(SlidingWindowLimiter::new(&config.rate_limit)),
            config: Arc::new(config),
        };

        let router = Self::build_router(state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        // Layers execute top-down per request in reverse declaration
        // order: the last .layer() call is the outermost.
        let protected = Router::new()
            .route("/", any(echo_handler))
            .route("/{*path}", any(echo_handler))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                sanitize_middleware,
            ))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                rate_limit_middleware,
            ))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                blacklist_middleware,
            ));

        let mut app = protected;
        if state.config.admin.enabled {
            app = app.merge(admin_router(state.clone()));
        }

        app.layer(TimeoutLayer::new(Duration::from_secs(
            state.config.listener.request_timeout_secs,
        )))
        .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(
            listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("shutdown signal received");
        })
        .await
    }
}

/// Demonstration handler behind the admission chain.
///
/// Echoes back the sanitized view of path, query, and body; the body has
/// already been rewritten by the sanitizing middleware, the query and
/// path are cleaned at the handler seam.
async fn echo_handler(
    uri: Uri,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> Json<Value> {
    let body = serde_json::from_slice::<Value>(&body).unwrap_or(Value::Null);
    let query = serde_json::to_value(params).unwrap_or(Value::Null);

    Json(json!({
        "path": clean_string(uri.path()),
        "query": sanitize(&query),
        "body": body,
    }))
}
