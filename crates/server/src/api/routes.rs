use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};
use tower_http::catch_panic::CatchPanicLayer;

use super::limits::{self, ConcurrencyLimiter, RateLimiter};
use super::{handlers, middleware};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let limits_config = &state.config().limits;
    let request_deadline = Duration::from_secs(state.config().api.timeout_secs);

    let concurrency = ConcurrencyLimiter::new(limits_config.search_concurrency);
    let rate = RateLimiter::new(limits_config.search_rate, request_deadline);

    // mutating endpoints require the admin token
    let admin = Router::new()
        .route("/api/db/update", post(handlers::update_db))
        .route("/api/db", delete(handlers::drop_db))
        .layer(from_fn_with_state(state.clone(), middleware::require_token));

    Router::new()
        .route("/api/ping", get(handlers::ping))
        .route("/api/login", post(handlers::login))
        .route(
            "/api/search",
            get(handlers::search)
                .layer(from_fn_with_state(concurrency, limits::concurrency_limit)),
        )
        .route(
            "/api/isearch",
            get(handlers::isearch).layer(from_fn_with_state(rate, limits::rate_limit)),
        )
        .route("/api/db/stats", get(handlers::db_stats))
        .route("/api/db/status", get(handlers::db_status))
        .route("/api/config", get(handlers::get_config))
        .route("/metrics", get(handlers::metrics))
        .merge(admin)
        .layer(axum::middleware::from_fn(middleware::metrics_middleware))
        .layer(CatchPanicLayer::new())
        .with_state(state)
}
