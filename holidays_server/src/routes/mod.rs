use axum::routing::get;
use axum::Router;

pub mod countries;
pub mod health;
pub mod holidays;

#[tracing::instrument(level = "debug", skip_all)]
pub fn router() -> Router {
    Router::new().nest(
        "/api/v1",
        Router::new()
            .route("/health", get(health::get_health))
            .merge(holidays::router())
            .merge(countries::router()),
    )
}
