use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth::require_auth;
use super::handlers;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    // Public routes — no authentication required
    let public = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::render));

    // Protected API routes — require Bearer token when API_TOKEN is set
    let protected = Router::new()
        // Partners
        .route(
            "/api/partners",
            get(handlers::partners::list).post(handlers::partners::apply),
        )
        .route("/api/partners/:id/approve", post(handlers::partners::approve))
        .route("/api/partners/:id/reject", post(handlers::partners::reject))
        .route("/api/partners/:id/ban", post(handlers::partners::ban))
        .route("/api/partners/:id/accounts", post(handlers::partners::link_account))
        // Dashboard + commission analytics
        .route("/api/partners/:id/dashboard", get(handlers::dashboard::overview))
        .route("/api/partners/:id/commission", get(handlers::commission::analytics))
        .route("/api/partners/:id/downline", get(handlers::commission::downline))
        // Withdrawals
        .route(
            "/api/partners/:id/withdrawals",
            get(handlers::withdrawals::list).post(handlers::withdrawals::create),
        )
        .route(
            "/api/partners/:id/withdrawals/summary",
            get(handlers::withdrawals::summary),
        )
        .route("/api/withdrawals/:id/status", post(handlers::withdrawals::set_status))
        // Sync control
        .route("/api/sync/trigger", post(handlers::sync::trigger))
        .route("/api/sync/status", get(handlers::sync::status))
        .layer(middleware::from_fn(require_auth));

    // CORS: the portal frontend is served from another origin in dev
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    public
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
