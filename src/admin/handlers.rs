use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::http::server::AppState;
use crate::security::blacklist::GuardStats;
use crate::security::error::SecurityError;
use crate::security::rate_limit::LimiterStats;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
}

#[derive(Deserialize)]
pub struct AddressPayload {
    pub address: String,
}

#[derive(Deserialize)]
pub struct StatsQuery {
    pub top: Option<usize>,
}

pub async fn get_status() -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
    })
}

pub async fn get_blacklist(State(state): State<AppState>) -> Json<GuardStats> {
    Json(state.guard.stats())
}

pub async fn add_blacklist(
    State(state): State<AppState>,
    Json(payload): Json<AddressPayload>,
) -> Result<Json<Value>, SecurityError> {
    let added = state.guard.add_to_blacklist(&payload.address)?;
    tracing::info!(address = %payload.address, added, "blacklist add");
    Ok(Json(json!({ "address": payload.address, "added": added })))
}

pub async fn remove_blacklist(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<Value>, SecurityError> {
    let removed = state.guard.remove_from_blacklist(&address)?;
    tracing::info!(address = %address, removed, "blacklist remove");
    Ok(Json(json!({ "address": address, "removed": removed })))
}

pub async fn get_rate_limit(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Json<LimiterStats> {
    let top_n = query.top.unwrap_or(state.config.rate_limit.stats_top_n);
    Json(state.limiter.stats(top_n))
}

pub async fn reset_rate_limit(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<Value> {
    let existed = state.limiter.reset(&key);
    tracing::info!(client = %key, existed, "rate limit reset");
    Json(json!({ "key": key, "reset": existed }))
}
