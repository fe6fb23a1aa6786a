//! Client for the external static-site generation/deployment pipeline.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{AppError, Result};

static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(120))
        .build()
        .unwrap_or_default()
});

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateSiteRequest {
    pub project_id: String,
    #[serde(default)]
    pub optimize: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploySiteRequest {
    pub project_id: String,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Response shape shared by the generate and deploy endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployments: Option<Vec<Deployment>>,
}

#[derive(Debug, Clone)]
pub struct SitePipeline {
    base_url: String,
    http: reqwest::Client,
}

impl SitePipeline {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: HTTP_CLIENT.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn generate(&self, request: &GenerateSiteRequest) -> Result<PipelineResponse> {
        self.post("generate", request).await
    }

    pub async fn deploy(&self, request: &DeploySiteRequest) -> Result<PipelineResponse> {
        self.post("deploy", request).await
    }

    async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<PipelineResponse> {
        let url = format!("{}/{}", self.base_url, path);

        let response = self.http.post(&url).json(body).send().await.map_err(|e| {
            tracing::error!(path = %path, error = %e, "site pipeline request failed");
            AppError::Upstream("Site pipeline request failed".to_string())
        })?;

        let status = response.status();
        let parsed = response.json::<PipelineResponse>().await;

        match parsed {
            Ok(body) => {
                if !status.is_success() {
                    tracing::warn!(path = %path, status = %status, "site pipeline returned error");
                }
                Ok(body)
            }
            Err(e) => {
                tracing::error!(
                    path = %path,
                    status = %status,
                    error = %e,
                    "failed to parse site pipeline response"
                );
                Err(AppError::Upstream(format!(
                    "Site pipeline returned an unreadable response (status {})",
                    status.as_u16()
                )))
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use axum::{routing::post, Json, Router};
    use serde_json::{json, Value};

    /// Serves a fake pipeline on an ephemeral port and returns its base URL.
    pub async fn spawn_fake_pipeline() -> String {
        let app = Router::new()
            .route(
                "/generate",
                post(|Json(body): Json<Value>| async move {
                    if body["projectId"] == "broken" {
                        return Json(json!({ "success": false, "message": "build failed" }));
                    }
                    Json(json!({
                        "success": true,
                        "message": format!("generated {} (optimize={})", body["projectId"], body["optimize"]),
                    }))
                }),
            )
            .route(
                "/deploy",
                post(|Json(body): Json<Value>| async move {
                    Json(json!({
                        "success": true,
                        "deployments": [
                            { "success": true, "url": format!("https://{}.example.app", body["projectId"].as_str().unwrap_or_default()) }
                        ]
                    }))
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_parses_optional_fields() {
        let body = r#"{"success":true,"deployments":[{"success":true,"url":"https://x.app"},{"success":false}]}"#;
        let parsed: PipelineResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.success);
        assert!(parsed.message.is_none());
        let deployments = parsed.deployments.unwrap();
        assert_eq!(deployments.len(), 2);
        assert_eq!(deployments[0].url.as_deref(), Some("https://x.app"));
        assert!(!deployments[1].success);
    }

    #[test]
    fn test_generate_request_wire_format() {
        let json = serde_json::to_value(GenerateSiteRequest {
            project_id: "jane-abc123".to_string(),
            optimize: true,
        })
        .unwrap();
        assert_eq!(json["projectId"], "jane-abc123");
        assert_eq!(json["optimize"], true);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let pipeline = SitePipeline::new("http://pipeline.local/");
        assert_eq!(pipeline.base_url(), "http://pipeline.local");
    }

    #[tokio::test]
    async fn test_generate_and_deploy_against_fake_pipeline() {
        let pipeline = SitePipeline::new(testing::spawn_fake_pipeline().await);

        let generated = pipeline
            .generate(&GenerateSiteRequest {
                project_id: "jane".to_string(),
                optimize: false,
            })
            .await
            .unwrap();
        assert!(generated.success);

        let deployed = pipeline
            .deploy(&DeploySiteRequest {
                project_id: "jane".to_string(),
                token: "t0k3n".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(
            deployed.deployments.unwrap()[0].url.as_deref(),
            Some("https://jane.example.app")
        );
    }

    #[tokio::test]
    async fn test_unreachable_pipeline_is_upstream_error() {
        let pipeline = SitePipeline::new("http://127.0.0.1:1");
        let err = pipeline
            .generate(&GenerateSiteRequest {
                project_id: "jane".to_string(),
                optimize: false,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }
}
