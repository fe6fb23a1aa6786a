/**
 * Routes Module
 * API route handlers
 */
use serde::{Deserialize, Serialize};

pub mod clients;
pub mod collections;
pub mod health;
pub mod site_pipeline;

/// Error body shared by every route
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
