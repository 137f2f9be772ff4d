use axum::{Json, extract::State, extract::rejection::JsonRejection};
use packet_db::DbError;
use packet_game::notify::{self, PacketNotice};
use packet_types::api::{SignupRequest, SignupResponse};
use tracing::{error, info};

use crate::error::ApiError;
use crate::state::AppState;

const WELCOME: &str =
    "Welcome! Check your email for your first monster. Tomorrow you'll get another!";

/// POST /api/signup: create the user, grant the first packet, and send the
/// notice in the background.
pub async fn signup(
    State(state): State<AppState>,
    body: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<Json<SignupResponse>, ApiError> {
    // A missing or unparsable body is treated like a missing email.
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let email = validate_email(req.email.as_deref())?;

    let db = state.db.clone();
    let user = tokio::task::spawn_blocking(move || db.create_user(&email))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Storage("Signup failed")
        })?
        .map_err(|e| match e {
            DbError::DuplicateEmail => ApiError::Conflict,
            e => {
                error!("DB create_user error: {}", e);
                ApiError::Storage("Signup failed")
            }
        })?;

    info!(user_id = %user.id, "New signup");

    let outcome = state.grants.grant(user.id.clone()).await.map_err(|e| {
        error!(user_id = %user.id, "First packet grant failed: {}", e);
        ApiError::Storage("Signup failed")
    })?;

    // Not awaited: delivery never delays or fails the response.
    notify::dispatch(state.notifier.clone(), PacketNotice::from(&outcome));

    Ok(Json(SignupResponse {
        user_id: user.id,
        message: WELCOME.to_string(),
    }))
}

fn validate_email(email: Option<&str>) -> Result<String, ApiError> {
    let email = email.map(str::trim).unwrap_or_default();
    if email.is_empty() {
        return Err(ApiError::Validation("Email required"));
    }

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(ApiError::Validation("Invalid email"));
    }

    Ok(email.to_string())
}
