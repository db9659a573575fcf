use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;

use super::Pagination;
use crate::core::error::ApiError;
use crate::core::store::types::AgentRecord;
use crate::interfaces::web::AppState;
use crate::interfaces::web::auth::CurrentUser;

#[derive(Deserialize)]
pub struct AgentPayload {
    pub name: String,
    pub description: Option<String>,
    pub model: Option<String>,
}

pub async fn list_agents(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<AgentRecord>>, ApiError> {
    let agents = state.store.list_agents(user.id, page.skip, page.limit).await?;
    Ok(Json(agents))
}

pub async fn create_agent(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<AgentPayload>,
) -> Result<(StatusCode, Json<AgentRecord>), ApiError> {
    let model = payload.model.as_deref().unwrap_or(&state.settings.default_model);
    let agent = state
        .store
        .create_agent(user.id, &payload.name, payload.description.as_deref(), model)
        .await?;
    Ok((StatusCode::CREATED, Json(agent)))
}

pub async fn get_agent(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(agent_id): Path<i64>,
) -> Result<Json<AgentRecord>, ApiError> {
    let agent = state
        .store
        .owned_agent(user.id, agent_id)
        .await?
        .ok_or(ApiError::NotFound("Agent"))?;
    Ok(Json(agent))
}

pub async fn update_agent(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(agent_id): Path<i64>,
    Json(payload): Json<AgentPayload>,
) -> Result<Json<AgentRecord>, ApiError> {
    let model = payload.model.as_deref().unwrap_or(&state.settings.default_model);
    let agent = state
        .store
        .update_agent(
            user.id,
            agent_id,
            &payload.name,
            payload.description.as_deref(),
            model,
        )
        .await?
        .ok_or(ApiError::NotFound("Agent"))?;
    Ok(Json(agent))
}

pub async fn delete_agent(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(agent_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.store.delete_agent(user.id, agent_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Agent"))
    }
}
