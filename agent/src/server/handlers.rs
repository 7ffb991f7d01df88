//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::deploy::orchestrator::PushMatch;
use crate::errors::AgentError;
use crate::models::project::ProjectSummary;
use crate::server::state::ServerState;
use crate::utils::version_info;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    let version = version_info();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "hookdeploy".to_string(),
        version: version.version,
    })
}

/// Version response
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    let version = version_info();
    Json(VersionResponse {
        version: version.version,
        git_hash: version.git_hash,
        build_time: version.build_time,
    })
}

/// Projects response
#[derive(Debug, Serialize)]
pub struct ProjectsResponse {
    pub projects: Vec<ProjectSummary>,
    pub total: usize,
}

/// Configured projects handler
pub async fn projects_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let projects = state.orchestrator.registry().summaries();
    let total = projects.len();
    Json(ProjectsResponse { projects, total })
}

/// Push notification body. Only the fields we act on are decoded.
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub repository: Option<RepositoryRef>,

    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RepositoryRef {
    pub name: Option<String>,
}

/// Trigger response
#[derive(Debug, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub status: String,
    pub message: String,
}

fn reply(code: StatusCode, status: &str, message: String) -> (StatusCode, Json<TriggerResponse>) {
    (
        code,
        Json(TriggerResponse {
            status: status.to_string(),
            message,
        }),
    )
}

/// Webhook handler.
///
/// Responds as soon as the push is classified; deployment runs in the background.
pub async fn webhook_handler(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<WebhookPayload>, JsonRejection>,
) -> (StatusCode, Json<TriggerResponse>) {
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => {
            warn!("Rejected webhook body: {}", rejection.body_text());
            return reply(
                StatusCode::BAD_REQUEST,
                "error",
                "Invalid webhook payload".to_string(),
            );
        }
    };

    let (Some(name), Some(git_ref)) = (payload.repository.and_then(|r| r.name), payload.git_ref)
    else {
        return reply(
            StatusCode::BAD_REQUEST,
            "error",
            "Invalid webhook payload".to_string(),
        );
    };

    match state.orchestrator.match_push(&name, &git_ref) {
        Ok(PushMatch::Deploy { branch }) => {
            info!(project = %name, "Branch {} matched. Pulling updates...", branch);
            state.orchestrator.spawn_deploy(name.clone());
            reply(
                StatusCode::ACCEPTED,
                "accepted",
                format!("Processing update for {} on branch {}", name, branch),
            )
        }
        Ok(PushMatch::Skip { pushed, .. }) => reply(
            StatusCode::OK,
            "skipped",
            format!("No update needed for {} on branch {}", name, pushed),
        ),
        Err(AgentError::NotFound(_)) => reply(
            StatusCode::NOT_FOUND,
            "error",
            format!("No config found for {}", name),
        ),
        Err(e) => reply(StatusCode::INTERNAL_SERVER_ERROR, "error", e.to_string()),
    }
}

/// Reload handler: re-read every project file and redeploy everything
pub async fn reload_handler(
    State(state): State<Arc<ServerState>>,
) -> (StatusCode, Json<TriggerResponse>) {
    info!("Reload requested over HTTP");
    state.orchestrator.spawn_reload_all();
    reply(
        StatusCode::ACCEPTED,
        "accepted",
        "Reloading configuration and redeploying all projects".to_string(),
    )
}
