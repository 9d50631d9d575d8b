//! Router construction for the webhook server.

use axum::{
    routing::{get, post},
    Extension, Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/udm", post(handlers::udm::udm))
        .route("/doord", post(handlers::doord::doord))
        .route("/health", get(handlers::health::health))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(state))
}
