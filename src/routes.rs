// src/routes.rs
use axum::routing::get;
use axum::Router;
use http::header::{HeaderValue, InvalidHeaderValue, CONTENT_TYPE};
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{self, AppState};

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/poll",
            get(handlers::get_poll_by_query)
                .post(handlers::create_poll)
                .put(handlers::submit_availability),
        )
        .route("/api/poll/{id}", get(handlers::get_poll))
        .route("/api/poll/{id}/grid", get(handlers::get_grid))
        .route("/api/poll/{id}/results", get(handlers::get_results))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Any origin unless one is configured.
pub fn cors_layer(origin: Option<&str>) -> Result<CorsLayer, InvalidHeaderValue> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([CONTENT_TYPE]);
    Ok(match origin {
        Some(origin) => layer.allow_origin(HeaderValue::from_str(origin)?),
        None => layer.allow_origin(Any),
    })
}
