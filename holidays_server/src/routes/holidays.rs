use crate::error::ApiError;
use crate::server::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::Query;
use axum::routing::{get, post};
use axum::{Extension, Json};
use chrono::NaiveDate;
use holidays_core::models::HolidayType;
use holidays_core::query::{HolidayResponse, HolidaySearchQuery};
use holidays_core::store::{Page, PageRequest, SortOrder};
use holidays_core::sync::{DeleteSummary, RefreshSummary, SyncSummary};
use serde::Deserialize;
use std::sync::Arc;

/// Body for refresh and delete: one country, one year.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryYearRequest {
    pub country_code: String,
    pub year: i32,
}

#[tracing::instrument(level = "debug", skip_all)]
pub fn router() -> axum::Router {
    axum::Router::new()
        .route("/holidays", get(search).delete(delete))
        .route("/holidays/sync", post(sync))
        .route("/holidays/refresh", post(refresh))
}

#[tracing::instrument(level = "info", skip_all)]
pub async fn sync(Extension(state): Extension<Arc<AppState>>) -> Result<Json<SyncSummary>, ApiError> {
    Ok(Json(state.sync.sync_all().await?))
}

#[tracing::instrument(level = "info", skip_all)]
pub async fn refresh(
    Extension(state): Extension<Arc<AppState>>,
    body: Result<Json<CountryYearRequest>, JsonRejection>,
) -> Result<Json<RefreshSummary>, ApiError> {
    let Json(req) = body?;
    Ok(Json(state.sync.refresh_one(&req.country_code, req.year).await?))
}

#[tracing::instrument(level = "info", skip_all)]
pub async fn delete(
    Extension(state): Extension<Arc<AppState>>,
    body: Result<Json<CountryYearRequest>, JsonRejection>,
) -> Result<Json<DeleteSummary>, ApiError> {
    let Json(req) = body?;
    Ok(Json(state.sync.delete_one(&req.country_code, req.year).await?))
}

/// `GET /holidays?countryCode&year&from&to&type&page&size&sort`; `sort` may repeat.
#[tracing::instrument(level = "debug", skip_all)]
pub async fn search(
    Extension(state): Extension<Arc<AppState>>,
    params: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<Page<HolidayResponse>>, ApiError> {
    let Query(params) = params?;
    let (query, page) = parse_search_params(&params)?;
    Ok(Json(state.query.search(&query, &page).await?))
}

fn parse_search_params(
    params: &[(String, String)],
) -> Result<(HolidaySearchQuery, PageRequest), ApiError> {
    let mut query = HolidaySearchQuery::default();
    let mut page = 0u32;
    let mut size = PageRequest::DEFAULT_SIZE;
    let mut sort = Vec::new();

    for (key, value) in params {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match key.as_str() {
            "countryCode" => query.country_code = value.to_string(),
            "year" => query.year = Some(parse_param(key, value)?),
            "from" => query.from = Some(parse_date(key, value)?),
            "to" => query.to = Some(parse_date(key, value)?),
            "type" => query.holiday_type = Some(value.parse::<HolidayType>()?),
            "page" => page = parse_param(key, value)?,
            "size" => size = parse_param(key, value)?,
            "sort" => sort.push(SortOrder::parse(value)?),
            _ => {}
        }
    }

    if query.country_code.is_empty() {
        return Err(ApiError::InvalidInput("countryCode is required".to_string()));
    }
    Ok((query, PageRequest::new(page, size, sort)?))
}

fn parse_param<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ApiError> {
    value
        .parse()
        .map_err(|_| ApiError::InvalidInput(format!("{key} has an invalid value: {value}")))
}

fn parse_date(key: &str, value: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        ApiError::InvalidInput(format!("{key} must be an ISO date (yyyy-MM-dd): {value}"))
    })
}
