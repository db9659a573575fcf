use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;

use super::Pagination;
use crate::core::error::ApiError;
use crate::core::store::types::{AgentToolRecord, ToolRecord};
use crate::interfaces::web::AppState;
use crate::interfaces::web::auth::CurrentUser;

#[derive(Deserialize)]
pub struct CreateToolRequest {
    pub name: String,
    pub description: String,
    pub icon: Option<String>,
}

#[derive(Deserialize)]
pub struct AttachToolRequest {
    pub tool_id: i64,
    pub config: Option<String>,
}

pub async fn list_tools(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<ToolRecord>>, ApiError> {
    let tools = state.store.list_tools(page.skip, page.limit).await?;
    Ok(Json(tools))
}

pub async fn create_tool(
    State(state): State<AppState>,
    Json(payload): Json<CreateToolRequest>,
) -> Result<(StatusCode, Json<ToolRecord>), ApiError> {
    match state
        .store
        .create_tool(&payload.name, &payload.description, payload.icon.as_deref())
        .await?
    {
        Some(tool) => Ok((StatusCode::CREATED, Json(tool))),
        None => Err(ApiError::Conflict("Tool already exists".to_string())),
    }
}

pub async fn get_tool(
    State(state): State<AppState>,
    Path(tool_id): Path<i64>,
) -> Result<Json<ToolRecord>, ApiError> {
    let tool = state
        .store
        .tool_by_id(tool_id)
        .await?
        .ok_or(ApiError::NotFound("Tool"))?;
    Ok(Json(tool))
}

pub async fn add_tool_to_agent(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(agent_id): Path<i64>,
    Json(payload): Json<AttachToolRequest>,
) -> Result<(StatusCode, Json<AgentToolRecord>), ApiError> {
    state
        .store
        .owned_agent(user.id, agent_id)
        .await?
        .ok_or(ApiError::NotFound("Agent"))?;
    state
        .store
        .tool_by_id(payload.tool_id)
        .await?
        .ok_or(ApiError::NotFound("Tool"))?;

    match state
        .store
        .attach_tool(agent_id, payload.tool_id, payload.config.as_deref())
        .await?
    {
        Some(agent_tool) => Ok((StatusCode::CREATED, Json(agent_tool))),
        None => Err(ApiError::Conflict("Tool already added to agent".to_string())),
    }
}

pub async fn remove_tool_from_agent(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((agent_id, tool_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    state
        .store
        .owned_agent(user.id, agent_id)
        .await?
        .ok_or(ApiError::NotFound("Agent"))?;

    if state.store.detach_tool(agent_id, tool_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Tool"))
    }
}
