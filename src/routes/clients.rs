/**
 * Client Routes
 * Create client accounts (user + site) and list them
 */
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::accounts::{self, NewClient};
use crate::db::{json, models::Role};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Request body for POST /api/clients
#[derive(Debug, Deserialize, Serialize)]
pub struct CreateClientRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

fn parse_role(role: Option<&str>) -> Result<Role> {
    match role.map(str::trim).filter(|r| !r.is_empty()) {
        None => Ok(Role::default()),
        Some(role) => role
            .parse()
            .map_err(|_| AppError::Validation(format!("Invalid role '{}'", role))),
    }
}

#[derive(Debug, Serialize)]
pub struct CreateClientResponse {
    pub success: bool,
    pub user: Value,
    pub site: Value,
}

/// POST /api/clients
pub async fn create_client(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateClientRequest>,
) -> Result<(StatusCode, Json<CreateClientResponse>)> {
    let email = payload.email.unwrap_or_default();
    let password = payload.password.unwrap_or_default();
    if email.trim().is_empty() || password.is_empty() {
        return Err(AppError::Validation(
            "Email and password are required".to_string(),
        ));
    }

    let role = parse_role(payload.role.as_deref())?;

    let store = state.store()?;
    let created = accounts::create_client(
        store,
        NewClient {
            email,
            password,
            name: payload.name,
            role,
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateClientResponse {
            success: true,
            user: json::document_to_json(created.user),
            site: json::document_to_json(created.site),
        }),
    ))
}

/// GET /api/clients
pub async fn list_clients(State(state): State<Arc<AppState>>) -> Result<Json<Value>> {
    let store = state.store()?;
    let clients = accounts::list_clients(store).await?;
    Ok(Json(json::documents_to_json(clients)))
}
