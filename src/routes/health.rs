/**
 * Health Routes
 * Endpoints for checking backend health status
 */
use axum::{extract::State, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::state::AppState;

// Track server start time for uptime calculation
lazy_static::lazy_static! {
    static ref SERVER_START: Instant = Instant::now();
}

/// Initialize the server start time
pub fn init_start_time() {
    lazy_static::initialize(&SERVER_START);
}

/// Health ping response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub uptime: u64,
    pub environment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

/// Single service check result
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCheck {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET /api/health - Simple health ping
pub async fn health_ping(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
        uptime: SERVER_START.elapsed().as_secs(),
        environment: state.config.environment.to_string(),
        api_url: state.config.public_api_url.clone(),
    })
}

/// GET /api/health/database - Database health check
pub async fn health_database(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store = match state.store() {
        Ok(store) => store,
        Err(e) => {
            return Json(ServiceCheck {
                status: "unhealthy".to_string(),
                backend: None,
                response_time: None,
                error: Some(e.to_string()),
            });
        }
    };

    // Always 200: the body carries the verdict
    match crate::db::health_check(store).await {
        Ok(duration) => Json(ServiceCheck {
            status: "healthy".to_string(),
            backend: Some(store.backend_tag().to_string()),
            response_time: Some(duration.as_millis() as u64),
            error: None,
        }),
        Err(e) => Json(ServiceCheck {
            status: "unhealthy".to_string(),
            backend: Some(store.backend_tag().to_string()),
            response_time: None,
            error: Some(e.to_string()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::routes::testing::{app_with, get_json};
    use axum::http::StatusCode;

    #[test]
    fn test_service_check_skips_empty_fields() {
        let check = ServiceCheck {
            status: "healthy".to_string(),
            backend: None,
            response_time: Some(10),
            error: None,
        };
        let json = serde_json::to_string(&check).unwrap();
        assert!(json.contains("responseTime"));
        assert!(!json.contains("error"));
    }

    #[tokio::test]
    async fn test_health_ping_returns_ok() {
        init_start_time();
        let (status, body) = get_json(app_with(None, None), "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["environment"], "development");
    }

    #[tokio::test]
    async fn test_health_database_without_store_is_unhealthy() {
        let (status, body) = get_json(app_with(None, None), "/api/health/database").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "unhealthy");
        assert_eq!(body["error"], "Database not available");
    }

    #[tokio::test]
    async fn test_health_database_with_store_is_healthy() {
        let store = Arc::new(MemoryStore::new());
        let (status, body) = get_json(app_with(Some(store), None), "/api/health/database").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["backend"], "memory");
    }

    #[tokio::test]
    async fn test_health_database_failing_store_is_unhealthy() {
        let store = Arc::new(MemoryStore::new());
        store.set_failing(true);
        let (_, body) = get_json(app_with(Some(store), None), "/api/health/database").await;
        assert_eq!(body["status"], "unhealthy");
    }
}
