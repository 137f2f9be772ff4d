use axum::{
    Json,
    extract::{Path, State},
};
use packet_game::collection::summarize;
use packet_types::api::CollectionResponse;
use tracing::error;

use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/collection/{user_id}. An unknown id yields an empty collection.
pub async fn get_collection(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<CollectionResponse>, ApiError> {
    let db = state.db.clone();
    let entries = tokio::task::spawn_blocking(move || db.get_collection(&user_id))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Storage("Database error")
        })?
        .map_err(|e| {
            error!("DB get_collection error: {}", e);
            ApiError::Storage("Database error")
        })?;

    Ok(Json(summarize(&state.catalog, &entries)))
}
