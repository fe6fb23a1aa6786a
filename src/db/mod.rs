pub mod json;
pub mod memory;
pub mod models;
pub mod mongo;

use async_trait::async_trait;
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::config::AppConfig;
use crate::error::{AppError, Result};

pub use memory::MemoryStore;
pub use mongo::MongoStore;

static MONGO_STORE: OnceCell<Arc<MongoStore>> = OnceCell::const_new();

/// Storage seam used by the handlers, the migration and the tests.
///
/// Filters are plain BSON documents: each entry is either an equality match
/// or `{field: {"$exists": bool}}`. Updates are the body of a `$set`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    async fn ping(&self) -> Result<Duration>;

    async fn find(&self, collection: &str, filter: Document) -> Result<Vec<Document>>;

    async fn find_one(&self, collection: &str, filter: Document) -> Result<Option<Document>>;

    /// Inserts a document and returns its `_id`.
    async fn insert_one(&self, collection: &str, document: Document) -> Result<Bson>;

    /// Returns the number of matched documents (0 or 1).
    async fn update_one(&self, collection: &str, filter: Document, set: Document) -> Result<u64>;

    /// Returns the number of documents actually modified.
    async fn update_many(&self, collection: &str, filter: Document, set: Document)
        -> Result<u64>;

    /// Returns the number of deleted documents (0 or 1).
    async fn delete_one(&self, collection: &str, filter: Document) -> Result<u64>;

    async fn ensure_indexes(&self) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub uri: String,
    pub database: String,
    pub max_pool_size: u32,
    pub server_selection_timeout_secs: u64,
    pub app_name: String,
}

impl DbConfig {
    pub fn from_app_config(config: &AppConfig) -> Option<Self> {
        config.mongodb_uri.as_ref().map(|uri| Self {
            uri: uri.clone(),
            database: config.mongodb_db.clone(),
            max_pool_size: config.db_pool_max,
            server_selection_timeout_secs: 10,
            app_name: "portfolio-cms-backend".to_string(),
        })
    }
}

/// Connects to MongoDB once per process; later calls return the same store.
pub async fn connect(config: &DbConfig) -> Result<Arc<MongoStore>> {
    MONGO_STORE
        .get_or_try_init(|| async {
            tracing::info!("Initializing MongoDB client...");
            tracing::debug!("MongoDB URI: {}", redact_uri(&config.uri));

            let store = MongoStore::connect(config).await?;

            tracing::info!(
                database = %store.database_name(),
                "MongoDB client initialized successfully"
            );
            Ok::<_, AppError>(Arc::new(store))
        })
        .await
        .cloned()
}

/// Builds the unique indexes. Legacy data can hold duplicate emails, which
/// makes the build fail; the store stays usable and the failure is only
/// logged. Returns whether the indexes are in place.
pub async fn prepare_indexes(store: &dyn DocumentStore) -> bool {
    match store.ensure_indexes().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                backend = store.backend_tag(),
                error = %e,
                "Could not build unique indexes; duplicate emails are not prevented until the data is cleaned up"
            );
            false
        }
    }
}

pub async fn health_check(store: &dyn DocumentStore) -> Result<Duration> {
    store.ping().await
}

/// Filter on `_id`: 24-hex ids match an ObjectId, anything else a string id.
pub fn id_filter(id: &str) -> Document {
    match ObjectId::parse_str(id) {
        Ok(oid) => doc! { "_id": oid },
        Err(_) => doc! { "_id": id },
    }
}

/// Hides the password component of a connection string.
pub fn redact_uri(uri: &str) -> String {
    let Some(scheme_end) = uri.find("://") else {
        return uri.to_string();
    };
    let rest = &uri[scheme_end + 3..];
    let authority_end = rest.find('/').unwrap_or(rest.len());
    let authority = &rest[..authority_end];

    match (authority.rfind('@'), authority.find(':')) {
        (Some(at), Some(colon)) if colon < at => format!(
            "{}{}:****{}",
            &uri[..scheme_end + 3],
            &authority[..colon],
            &rest[at..]
        ),
        _ => uri.to_string(),
    }
}
