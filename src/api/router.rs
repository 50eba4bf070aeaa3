use axum::{middleware, routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::admin;
use super::health;
use super::metrics_middleware;
use super::practice;
use super::state::AppState;
use super::stream;
use super::training;

/// Create the full router with application state
pub fn create_router_with_state(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health_check))
        .route("/live", get(health::live_check))
        // Real-time translation
        .route("/gesture-ws", get(stream::gesture_stream))
        .nest("/training", training::create_training_router())
        .nest("/admin", admin::create_admin_router())
        .nest("/practice", practice::create_practice_router())
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
