/**
 * Collection Routes
 * Read-only passthrough endpoints for the site content collections
 */
use axum::{
    extract::{Path, State},
    Json,
};
use mongodb::bson::doc;
use serde_json::Value;
use std::sync::Arc;

use crate::db::{self, json, models::CollectionName};
use crate::error::{AppError, Result};
use crate::state::AppState;

fn resolve(collection: &str) -> Result<CollectionName> {
    collection
        .parse::<CollectionName>()
        .map_err(|_| AppError::NotFound(format!("Unknown collection '{}'", collection)))
}

/// GET /api/{collection} - every document in the collection
pub async fn list_documents(
    State(state): State<Arc<AppState>>,
    Path(collection): Path<String>,
) -> Result<Json<Value>> {
    let collection = resolve(&collection)?;
    let store = state.store()?;

    let documents = store.find(collection.as_str(), doc! {}).await?;
    tracing::debug!(collection = %collection, count = documents.len(), "listed documents");

    Ok(Json(json::documents_to_json(documents)))
}

/// GET /api/{collection}/{id} - a single document by id
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<Value>> {
    let collection = resolve(&collection)?;
    let store = state.store()?;

    match store.find_one(collection.as_str(), db::id_filter(&id)).await? {
        Some(document) => Ok(Json(json::document_to_json(document))),
        None => Err(AppError::NotFound("Document not found".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DocumentStore, MemoryStore};
    use crate::routes::testing::{app_with, get_json};
    use axum::http::StatusCode;
    use mongodb::bson::{oid::ObjectId, Bson};

    #[tokio::test]
    async fn test_every_known_collection_lists_as_array() {
        let store = Arc::new(MemoryStore::new());
        for name in CollectionName::ALL {
            let (status, body) =
                get_json(app_with(Some(store.clone()), None), &format!("/api/{}", name)).await;
            assert_eq!(status, StatusCode::OK, "collection {}", name);
            assert_eq!(body, Value::Array(vec![]), "collection {}", name);
        }
    }

    #[tokio::test]
    async fn test_list_returns_documents_with_hex_ids() {
        let store = Arc::new(MemoryStore::new());
        let id = store
            .insert_one("quotes", doc! { "text": "Stay hungry" })
            .await
            .unwrap();
        let Bson::ObjectId(oid) = id else {
            panic!("expected ObjectId");
        };

        let (status, body) = get_json(app_with(Some(store), None), "/api/quotes").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["_id"], oid.to_hex());
        assert_eq!(body[0]["text"], "Stay hungry");
    }

    #[tokio::test]
    async fn test_get_by_id() {
        let store = Arc::new(MemoryStore::new());
        let id = store
            .insert_one("sites", doc! { "title": "Jane" })
            .await
            .unwrap();
        let Bson::ObjectId(oid) = id else {
            panic!("expected ObjectId");
        };

        let (status, body) = get_json(
            app_with(Some(store), None),
            &format!("/api/sites/{}", oid.to_hex()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Jane");
    }

    #[tokio::test]
    async fn test_missing_id_returns_404() {
        let store = Arc::new(MemoryStore::new());
        let (status, body) = get_json(
            app_with(Some(store.clone()), None),
            &format!("/api/blogposts/{}", ObjectId::new().to_hex()),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Document not found");

        let (status, _) = get_json(app_with(Some(store), None), "/api/media/not-an-id").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_collection_returns_404() {
        let store = Arc::new(MemoryStore::new());
        let (status, _) = get_json(app_with(Some(store), None), "/api/users").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_store_failure_returns_500_with_message() {
        let store = Arc::new(MemoryStore::new());
        store.set_failing(true);
        let (status, body) = get_json(app_with(Some(store), None), "/api/sites").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "memory store unavailable");
    }

    #[tokio::test]
    async fn test_without_database_returns_503() {
        let (status, _) = get_json(app_with(None, None), "/api/sites").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
