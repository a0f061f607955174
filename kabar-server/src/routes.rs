use axum::http::{header, Method};
use axum::{routing::{get, post}, Extension, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::controllers;
use crate::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(controllers::health))
        .route("/send-message", post(controllers::send_message))
        .route("/receive-message", get(controllers::receive_message))
        .route("/events", post(controllers::ingest_event))
        .route("/ws", get(controllers::ws_handler))
        .layer(Extension(state))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

// CORS aperto: il bridge è pensato per frontend serviti da origini arbitrarie
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::ORIGIN, header::CONTENT_TYPE, header::AUTHORIZATION])
}
