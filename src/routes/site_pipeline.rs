/**
 * Site Pipeline Routes
 * Forward generate/deploy requests to the static-site pipeline
 */
use axum::{extract::State, http::StatusCode, Json};
use mongodb::bson::doc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::models::{Collections, SiteFields};
use crate::error::{AppError, Result};
use crate::pipeline::{DeploySiteRequest, GenerateSiteRequest, PipelineResponse};
use crate::state::AppState;

/// Request body for POST /api/generate-site
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateSiteBody {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub optimize: Option<bool>,
}

/// Request body for POST /api/deploy-site
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploySiteBody {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation(format!("{} is required", field)))
}

async fn ensure_site_exists(state: &AppState, project_id: &str) -> Result<()> {
    let store = state.store()?;
    let site = store
        .find_one(Collections::SITES, doc! { SiteFields::PROJECT_ID: project_id })
        .await?;
    match site {
        Some(_) => Ok(()),
        None => Err(AppError::NotFound(format!(
            "No site with projectId '{}'",
            project_id
        ))),
    }
}

fn into_response(response: PipelineResponse) -> (StatusCode, Json<PipelineResponse>) {
    let status = if response.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };
    (status, Json(response))
}

/// POST /api/generate-site
pub async fn generate_site(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GenerateSiteBody>,
) -> Result<(StatusCode, Json<PipelineResponse>)> {
    let project_id = required(payload.project_id, "projectId")?;
    let pipeline = state.pipeline()?;
    ensure_site_exists(&state, &project_id).await?;

    let optimize = payload.optimize.unwrap_or(false);
    tracing::info!(project_id = %project_id, optimize, "generating site");

    let response = pipeline
        .generate(&GenerateSiteRequest {
            project_id,
            optimize,
        })
        .await?;
    Ok(into_response(response))
}

/// POST /api/deploy-site
pub async fn deploy_site(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DeploySiteBody>,
) -> Result<(StatusCode, Json<PipelineResponse>)> {
    let project_id = required(payload.project_id, "projectId")?;
    let token = required(payload.token, "token")?;
    let pipeline = state.pipeline()?;
    ensure_site_exists(&state, &project_id).await?;

    tracing::info!(project_id = %project_id, "deploying site");

    let response = pipeline
        .deploy(&DeploySiteRequest { project_id, token })
        .await?;

    if let Some(deployments) = &response.deployments {
        for deployment in deployments {
            tracing::info!(
                success = deployment.success,
                url = deployment.url.as_deref().unwrap_or("-"),
                "deployment result"
            );
        }
    }
    Ok(into_response(response))
}
