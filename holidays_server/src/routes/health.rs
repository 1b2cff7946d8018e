use crate::server::AppState;
use axum::{Extension, Json};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_ms: u64,
}

#[tracing::instrument(level = "debug", skip_all)]
pub async fn get_health(Extension(state): Extension<Arc<AppState>>) -> Json<HealthResponse> {
    let uptime_ms = u64::try_from(state.started_at.elapsed().as_millis()).unwrap_or(u64::MAX);
    Json(HealthResponse {
        status: "ok",
        uptime_ms,
    })
}
