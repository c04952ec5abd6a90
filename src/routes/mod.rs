use axum::{
    http::{HeaderName, StatusCode},
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::{
    middleware::{fragment_errors_middleware, make_span_with_request_id, request_id_middleware},
    services::{corner::CornerService, pairing::PairingService},
};

pub mod corner;
pub mod couple;
pub mod invites;
pub mod payload;

/// Response header read by the fragment client to fire follow-up events
pub const HX_TRIGGER: HeaderName = HeaderName::from_static("hx-trigger");

/// Shared application state
pub struct AppState {
    pub corner: CornerService,
    pub pairing: PairingService,
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(middleware::from_fn(fragment_errors_middleware)),
        )
}

/// API routes under /api/v1
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Corner canvas
        .route("/corner", get(corner::view))
        .route("/corner/colors", post(corner::couple_colors))
        .route("/corner/items", post(corner::place))
        .route("/corner/items/:id", axum::routing::delete(corner::delete))
        .route("/corner/items/:id/delete", post(corner::delete))
        .route("/corner/items/:id/nudge", post(corner::nudge))
        .route("/corner/items/:id/height", post(corner::height))
        .route("/corner/items/:id/position", post(corner::position))
        .route("/corner/items/:id/scale", post(corner::scale))
        .route("/corner/items/:id/layer", post(corner::layer))
        .route("/corner/items/:id/stack", post(corner::stack))
        .route("/corner/items/:id/tilt", post(corner::tilt))
        .route("/corner/items/:id/flip", post(corner::flip))
        .route("/corner/items/:id/color", post(corner::color))
        // Couple & pairing
        .route("/couple", get(couple::get_couple))
        .route("/couple/start-date", post(couple::set_start_date))
        .route("/join", post(couple::join))
        .route("/invites", get(invites::list).post(invites::create))
        .route("/invites/:code", get(invites::get))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
