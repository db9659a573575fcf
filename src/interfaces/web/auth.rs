use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::AppState;
use crate::core::error::ApiError;
use crate::core::store::types::UserRecord;

/// The authenticated account for the current request, resolved by
/// `require_auth` and read by handlers through request extensions.
#[derive(Clone)]
pub(crate) struct CurrentUser(pub UserRecord);

/// Bearer-token middleware. Every failure mode (missing header, bad
/// signature, expired token, unknown or deactivated subject) yields the same
/// 401 response.
pub(crate) async fn require_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::to_string);

    let Some(token) = token else {
        return ApiError::Unauthorized.into_response();
    };
    let Ok(username) = state.auth.verify_token(&token) else {
        return ApiError::Unauthorized.into_response();
    };

    let user = match state.store.user_by_username(&username).await {
        Ok(Some(user)) if user.is_active => user,
        Ok(_) => return ApiError::Unauthorized.into_response(),
        Err(e) => return ApiError::from(e).into_response(),
    };

    req.extensions_mut().insert(CurrentUser(user));
    next.run(req).await
}
