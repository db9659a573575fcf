use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::core::auth::{hash_password, verify_password};
use crate::core::error::ApiError;
use crate::core::store::types::UserRecord;
use crate::interfaces::web::AppState;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserRecord>), ApiError> {
    let username = payload.username.trim();
    if username.is_empty() || payload.password.is_empty() {
        return Err(ApiError::Conflict(
            "Username and password are required".to_string(),
        ));
    }

    let hashed = hash_password(&payload.password);
    match state.store.create_user(username, &payload.email, &hashed).await? {
        Some(user) => Ok((StatusCode::CREATED, Json(user))),
        None => Err(ApiError::Conflict(
            "Username or email already registered".to_string(),
        )),
    }
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    // One 401 for unknown user, wrong password, and deactivated account.
    let user = state
        .store
        .user_by_username(&payload.username)
        .await?
        .filter(|u| u.is_active && verify_password(&payload.password, &u.hashed_password))
        .ok_or(ApiError::Unauthorized)?;

    let access_token = state.auth.issue_token(&user.username)?;
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
    }))
}
