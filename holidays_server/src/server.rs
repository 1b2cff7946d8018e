use crate::routes;
use axum::{Extension, Router};
use chrono::Utc;
use holidays_core::config::{HolidaysConfig, StoreBackend};
use holidays_core::query::QueryEngine;
use holidays_core::source::{HolidaySource, RetryingSource};
use holidays_core::store::{HolidayStore, InMemoryHolidayStore, SqliteHolidayStore};
use holidays_core::sync::{SyncEngine, SyncScheduler};
use holidays_core::year_range::{SystemClock, YearRangePolicy};
use holidays_integrations::NagerClient;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub sync: Arc<SyncEngine>,
    pub query: Arc<QueryEngine>,
    pub started_at: Instant,
}

impl AppState {
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn new(
        source: Arc<dyn HolidaySource>,
        store: Arc<dyn HolidayStore>,
        policy: Arc<YearRangePolicy>,
        cfg: &HolidaysConfig,
    ) -> holidays_core::Result<Self> {
        let sync = SyncEngine::new(source, store.clone(), policy.clone(), cfg.sync)?;
        Ok(Self {
            sync: Arc::new(sync),
            query: Arc::new(QueryEngine::new(store, policy)),
            started_at: Instant::now(),
        })
    }
}

/// Wire the configured store, provider client and canonical-zone clock.
#[tracing::instrument(level = "info", skip_all)]
pub async fn build_state(cfg: &HolidaysConfig) -> anyhow::Result<AppState> {
    let store: Arc<dyn HolidayStore> = match cfg.store_backend() {
        StoreBackend::Memory => {
            tracing::warn!("using in-memory holiday store; data is lost on exit");
            Arc::new(InMemoryHolidayStore::new())
        }
        StoreBackend::Sqlite(url) => {
            tracing::info!(database_url = %url, "opening sqlite holiday store");
            Arc::new(SqliteHolidayStore::connect(&url).await?)
        }
    };

    let nager = NagerClient::new(cfg.provider.base_url.clone(), cfg.provider.timeout)?;
    let source: Arc<dyn HolidaySource> = Arc::new(RetryingSource::new(Arc::new(nager), cfg.retry));

    let clock = Arc::new(SystemClock::new(cfg.timezone));
    let policy = Arc::new(YearRangePolicy::new(clock, cfg.window_years)?);

    Ok(AppState::new(source, store, policy, cfg)?)
}

#[tracing::instrument(level = "debug", skip_all)]
pub fn router(state: AppState) -> Router {
    let state = Arc::new(state);
    let request_id = axum::http::HeaderName::from_static("x-request-id");

    Router::new()
        .merge(routes::router())
        .layer(Extension(state))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

#[tracing::instrument(level = "info", skip_all)]
pub async fn serve(addr: SocketAddr, state: AppState, cfg: &HolidaysConfig) -> anyhow::Result<()> {
    if cfg.scheduler.enabled {
        let scheduler = SyncScheduler::new(
            state.sync.clone(),
            &cfg.scheduler.cron,
            cfg.timezone,
            cfg.scheduler.poll_interval,
            Utc::now(),
        )?;
        tokio::spawn(async move {
            if let Err(e) = scheduler.run_loop().await {
                tracing::error!(error = %e, "holiday sync scheduler stopped");
            }
        });
    } else {
        tracing::info!("holiday sync scheduler disabled");
    }

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "holidays server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
