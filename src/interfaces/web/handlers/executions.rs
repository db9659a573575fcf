use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;

use super::Pagination;
use crate::core::error::ApiError;
use crate::core::store::types::{ExecutionLogRecord, ExecutionRecord};
use crate::interfaces::web::AppState;
use crate::interfaces::web::auth::CurrentUser;

#[derive(Deserialize)]
pub struct CreateExecutionRequest {
    pub agent_id: i64,
    pub input: String,
}

pub async fn list_executions(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<ExecutionRecord>>, ApiError> {
    let executions = state
        .store
        .list_executions(user.id, page.skip, page.limit)
        .await?;
    Ok(Json(executions))
}

/// Accepts the execution for processing: the response carries the pending
/// record, and the terminal state is observed by polling `get_execution`.
pub async fn create_execution(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<CreateExecutionRequest>,
) -> Result<(StatusCode, Json<ExecutionRecord>), ApiError> {
    // Ownership check before any row is created.
    let agent = state
        .store
        .owned_agent(user.id, payload.agent_id)
        .await?
        .ok_or(ApiError::NotFound("Agent"))?;

    let execution = state.engine.submit(&agent, &payload.input).await?;
    Ok((StatusCode::CREATED, Json(execution)))
}

pub async fn get_execution(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(execution_id): Path<i64>,
) -> Result<Json<ExecutionRecord>, ApiError> {
    let execution = state
        .store
        .owned_execution(user.id, execution_id)
        .await?
        .ok_or(ApiError::NotFound("Execution"))?;
    Ok(Json(execution))
}

pub async fn get_execution_logs(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(execution_id): Path<i64>,
) -> Result<Json<Vec<ExecutionLogRecord>>, ApiError> {
    state
        .store
        .owned_execution(user.id, execution_id)
        .await?
        .ok_or(ApiError::NotFound("Execution"))?;
    let logs = state.store.execution_logs(execution_id).await?;
    Ok(Json(logs))
}

pub async fn delete_execution(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(execution_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.store.delete_execution(user.id, execution_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Execution"))
    }
}
