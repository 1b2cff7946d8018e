use crate::error::ApiError;
use crate::server::AppState;
use axum::routing::get;
use axum::{Extension, Json};
use holidays_core::query::CountryResponse;
use std::sync::Arc;

#[tracing::instrument(level = "debug", skip_all)]
pub fn router() -> axum::Router {
    axum::Router::new().route("/countries", get(list))
}

#[tracing::instrument(level = "debug", skip_all)]
pub async fn list(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<CountryResponse>>, ApiError> {
    Ok(Json(state.query.list_countries().await?))
}
