//! Portfolio CMS Backend - admin API, migration and credential tooling

pub mod accounts;
pub mod atlas;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod migration;
pub mod pipeline;
pub mod routes;
pub mod state;

use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::db::DocumentStore;
use crate::pipeline::SitePipeline;
use crate::state::AppState;

/// Configure CORS from the configured origin list.
pub fn configure_cors(origins: &[String]) -> CorsLayer {
    let allowed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
        .allow_credentials(true)
}

/// Create and configure the application router.
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = configure_cors(&state.config.allowed_origins);

    Router::new()
        .route("/api/health", get(routes::health::health_ping))
        .route("/api/health/database", get(routes::health::health_database))
        .route(
            "/api/clients",
            get(routes::clients::list_clients).post(routes::clients::create_client),
        )
        .route(
            "/api/generate-site",
            post(routes::site_pipeline::generate_site),
        )
        .route("/api/deploy-site", post(routes::site_pipeline::deploy_site))
        .route(
            "/api/{collection}",
            get(routes::collections::list_documents),
        )
        .route(
            "/api/{collection}/{id}",
            get(routes::collections::get_document),
        )
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        // Global 2 MB request body cap
        .layer(RequestBodyLimitLayer::new(2 * 1024 * 1024))
        .layer(cors)
        .with_state(state)
}

/// Builds the shared state: connects the store (once per process) and the
/// site pipeline when they are configured.
pub async fn build_state(config: AppConfig) -> AppState {
    let store: Option<Arc<dyn DocumentStore>> = match db::DbConfig::from_app_config(&config) {
        Some(db_config) => match db::connect(&db_config).await {
            Ok(store) => {
                db::prepare_indexes(store.as_ref()).await;
                Some(store as Arc<dyn DocumentStore>)
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to connect to MongoDB: {}. Continuing without database.",
                    e
                );
                None
            }
        },
        None => {
            tracing::info!("MONGODB_URI not set. Running without database connection.");
            None
        }
    };

    let pipeline = match &config.site_pipeline_url {
        Some(url) => {
            tracing::info!(url = %url, "Site pipeline configured");
            Some(SitePipeline::new(url.clone()))
        }
        None => {
            tracing::info!("SITE_PIPELINE_URL not set. Site generation is disabled.");
            None
        }
    };

    AppState::new(config, store, pipeline)
}

/// Run the server (used by main).
pub async fn run() {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env();

    // Dropping the guards shuts down the background log writers
    let _log_guards = logging::init(config.environment);

    routes::health::init_start_time();

    if let Err(e) = config.validate() {
        panic!("FATAL: {}. Refusing to start.", e);
    }
    if let Some(url) = &config.public_api_url {
        tracing::info!("Public API URL: {}", url);
    }

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .expect("Invalid HOST/PORT configuration");

    let state = Arc::new(build_state(config).await);
    let app = create_app(state);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app).await.expect("Server error");
}
