use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, Bson, Document};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

use super::{models::Collections, models::UserFields, DocumentStore};
use crate::error::{AppError, Result};

/// In-process store with the filter semantics and unique constraints of the
/// MongoDB backend.
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Vec<Document>>>,
    unique: Vec<(&'static str, &'static str)>,
    indexed: AtomicBool,
    fail: AtomicBool,
    rejected_inserts: std::sync::Mutex<Option<String>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            collections: Mutex::new(HashMap::new()),
            unique: vec![(Collections::USERS, UserFields::EMAIL)],
            indexed: AtomicBool::new(true),
            fail: AtomicBool::new(false),
            rejected_inserts: std::sync::Mutex::new(None),
        }
    }
}

impl MemoryStore {
    /// A store whose unique indexes are already built.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding legacy data: unique constraints apply only after
    /// `ensure_indexes` succeeds.
    pub fn without_indexes() -> Self {
        let store = Self::default();
        store.indexed.store(false, Ordering::Relaxed);
        store
    }

    /// Makes every subsequent operation fail with a storage error.
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::Relaxed);
    }

    /// Makes inserts into `collection` fail while everything else keeps working.
    pub fn reject_inserts_into(&self, collection: &str) {
        if let Ok(mut rejected) = self.rejected_inserts.lock() {
            *rejected = Some(collection.to_string());
        }
    }

    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .await
            .get(collection)
            .map(Vec::len)
            .unwrap_or(0)
    }

    fn check_available(&self) -> Result<()> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(AppError::Store("memory store unavailable".to_string()));
        }
        Ok(())
    }
}

fn matches(document: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, expected)| match expected {
        Bson::Document(op) if op.contains_key("$exists") => {
            let wanted = op.get_bool("$exists").unwrap_or(true);
            document.contains_key(key) == wanted
        }
        _ => document.get(key) == Some(expected),
    })
}

fn apply_set(document: &mut Document, set: &Document) -> bool {
    let mut changed = false;
    for (key, value) in set {
        if document.get(key) != Some(value) {
            document.insert(key.clone(), value.clone());
            changed = true;
        }
    }
    changed
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<Duration> {
        self.check_available()?;
        Ok(Duration::ZERO)
    }

    async fn find(&self, collection: &str, filter: Document) -> Result<Vec<Document>> {
        self.check_available()?;
        let collections = self.collections.lock().await;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| matches(doc, &filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn find_one(&self, collection: &str, filter: Document) -> Result<Option<Document>> {
        self.check_available()?;
        let collections = self.collections.lock().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| matches(doc, &filter)).cloned()))
    }

    async fn insert_one(&self, collection: &str, mut document: Document) -> Result<Bson> {
        self.check_available()?;
        let rejected = self
            .rejected_inserts
            .lock()
            .map(|rejected| rejected.as_deref() == Some(collection))
            .unwrap_or(false);
        if rejected {
            return Err(AppError::Store(format!("insert into {} rejected", collection)));
        }

        let mut collections = self.collections.lock().await;
        let docs = collections.entry(collection.to_string()).or_default();

        let indexed = self.indexed.load(Ordering::Relaxed);
        for (unique_collection, field) in &self.unique {
            if !indexed || *unique_collection != collection {
                continue;
            }
            if let Some(value) = document.get(*field) {
                if docs.iter().any(|existing| existing.get(*field) == Some(value)) {
                    return Err(AppError::Conflict("Document already exists".to_string()));
                }
            }
        }

        if !document.contains_key("_id") {
            document.insert("_id", ObjectId::new());
        }
        let id = document.get("_id").cloned().unwrap_or(Bson::Null);
        if docs.iter().any(|existing| existing.get("_id") == Some(&id)) {
            return Err(AppError::Conflict("Document already exists".to_string()));
        }

        docs.push(document);
        Ok(id)
    }

    async fn update_one(&self, collection: &str, filter: Document, set: Document) -> Result<u64> {
        self.check_available()?;
        let mut collections = self.collections.lock().await;
        let matched = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|doc| matches(doc, &filter)));

        match matched {
            Some(document) => {
                apply_set(document, &set);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        set: Document,
    ) -> Result<u64> {
        self.check_available()?;
        let mut collections = self.collections.lock().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };

        let mut modified = 0;
        for document in docs.iter_mut().filter(|doc| matches(doc, &filter)) {
            if apply_set(document, &set) {
                modified += 1;
            }
        }
        Ok(modified)
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> Result<u64> {
        self.check_available()?;
        let mut collections = self.collections.lock().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        match docs.iter().position(|doc| matches(doc, &filter)) {
            Some(index) => {
                docs.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn ensure_indexes(&self) -> Result<()> {
        self.check_available()?;
        let collections = self.collections.lock().await;

        for (collection, field) in &self.unique {
            let Some(docs) = collections.get(*collection) else {
                continue;
            };
            let mut seen = Vec::new();
            for value in docs.iter().filter_map(|doc| doc.get(*field)) {
                if seen.contains(&value) {
                    return Err(AppError::Store(format!(
                        "duplicate key on {}.{}: {}",
                        collection, field, value
                    )));
                }
                seen.push(value);
            }
        }

        self.indexed.store(true, Ordering::Relaxed);
        Ok(())
    }
}
