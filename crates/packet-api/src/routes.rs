use axum::{
    Json, Router,
    routing::{get, post},
};
use packet_types::api::HealthResponse;

use crate::collection::get_collection;
use crate::signup::signup;
use crate::state::AppState;

/// `/api` routes. Static files and middleware are layered on by the server.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/signup", post(signup))
        .route("/api/collection/{user_id}", get(get_collection))
        .route("/api/health", get(health))
        .with_state(state)
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
    })
}
