//! Route table assembly.

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, options, post},
    Router,
};
use runtime::Runtime;
use tower_http::trace::TraceLayer;

use crate::{auth, handlers, AppState};

/// Builds the full router: public probes, the sentinel, the Basic-auth-gated
/// control API under `/capi/v1`, and the catch-all that hands everything
/// else to the engine.
pub fn build_router<RT: Runtime>(state: Arc<AppState<RT>>) -> Router {
    let control_api = Router::new()
        .route("/launch/{plan}", post(handlers::launch_plan::<RT>))
        .route("/remove", post(handlers::remove::<RT>))
        .route("/status", post(handlers::status::<RT>))
        .route("/config", post(handlers::config::<RT>))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_basic_auth::<RT>));

    Router::new()
        .route("/health-check", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .route("/cloudfoundryapplication", options(handlers::cloudfoundryapplication))
        .route("/314159265358979323", get(handlers::sentinel))
        .nest("/capi/v1", control_api)
        .fallback(handlers::catch_all::<RT>)
        .layer(middleware::from_fn(handlers::redirect_https))
        .layer(middleware::from_fn(handlers::track_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
