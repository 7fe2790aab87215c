//! API routes.

pub mod health;
pub mod pipeline;

use crate::AppState;
use axum::Router;

/// Build the main API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(pipeline::router())
        .merge(health::router())
        .with_state(state)
}
