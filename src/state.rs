use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::DocumentStore;
use crate::error::{AppError, Result};
use crate::pipeline::SitePipeline;

/// Shared state handed to every handler.
pub struct AppState {
    pub config: AppConfig,
    store: Option<Arc<dyn DocumentStore>>,
    pipeline: Option<SitePipeline>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Option<Arc<dyn DocumentStore>>,
        pipeline: Option<SitePipeline>,
    ) -> Self {
        Self {
            config,
            store,
            pipeline,
        }
    }

    pub fn store(&self) -> Result<&dyn DocumentStore> {
        self.store
            .as_deref()
            .ok_or_else(|| AppError::Unavailable("Database not available".to_string()))
    }

    pub fn pipeline(&self) -> Result<&SitePipeline> {
        self.pipeline
            .as_ref()
            .ok_or_else(|| AppError::Unavailable("Site pipeline not configured".to_string()))
    }
}
