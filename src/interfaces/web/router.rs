use axum::http::{HeaderValue, Method};
use axum::routing::{delete, get, post};
use axum::{Json, Router, middleware};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

use super::auth;
use super::handlers::{agents, auth as auth_handlers, executions, tools};
use super::AppState;
use crate::config::Settings;

fn build_cors(settings: &Settings) -> CorsLayer {
    if settings.allow_any_origin() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }
    let origins: Vec<HeaderValue> = settings
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring malformed CORS origin {origin:?}");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Welcome to Evolve API - Free AI Assistant",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub(crate) fn build_api_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/v1/auth/register", post(auth_handlers::register))
        .route("/api/v1/auth/login", post(auth_handlers::login))
        .with_state(state.clone());

    let authed_routes = Router::new()
        .route(
            "/api/v1/agents",
            get(agents::list_agents).post(agents::create_agent),
        )
        .route(
            "/api/v1/agents/{agent_id}",
            get(agents::get_agent)
                .put(agents::update_agent)
                .delete(agents::delete_agent),
        )
        .route(
            "/api/v1/executions",
            get(executions::list_executions).post(executions::create_execution),
        )
        .route(
            "/api/v1/executions/{execution_id}",
            get(executions::get_execution).delete(executions::delete_execution),
        )
        .route(
            "/api/v1/executions/{execution_id}/logs",
            get(executions::get_execution_logs),
        )
        .route(
            "/api/v1/tools",
            get(tools::list_tools).post(tools::create_tool),
        )
        .route("/api/v1/tools/{tool_id}", get(tools::get_tool))
        .route(
            "/api/v1/tools/agent/{agent_id}",
            post(tools::add_tool_to_agent),
        )
        .route(
            "/api/v1/tools/agent/{agent_id}/tool/{tool_id}",
            delete(tools::remove_tool_from_agent),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ))
        .with_state(state.clone());

    public_routes
        .merge(authed_routes)
        .layer(build_cors(&state.settings))
}
