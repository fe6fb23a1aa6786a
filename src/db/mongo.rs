use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, Document},
    error::{ErrorKind, WriteFailure},
    options::{ClientOptions, IndexOptions},
    Client, Collection, Database, IndexModel,
};
use std::time::{Duration, Instant};

use super::{models::Collections, models::UserFields, DbConfig, DocumentStore};
use crate::error::{AppError, Result};

const DUPLICATE_KEY: i32 = 11000;

pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub async fn connect(config: &DbConfig) -> Result<Self> {
        let mut options = ClientOptions::parse(&config.uri).await?;
        options.max_pool_size = Some(config.max_pool_size);
        options.app_name = Some(config.app_name.clone());
        options.server_selection_timeout =
            Some(Duration::from_secs(config.server_selection_timeout_secs));

        let database = options
            .default_database
            .clone()
            .unwrap_or_else(|| config.database.clone());

        let client = Client::with_options(options)?;
        let db = client.database(&database);
        db.run_command(doc! { "ping": 1 }).await?;

        Ok(Self { db })
    }

    pub fn database_name(&self) -> &str {
        self.db.name()
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection::<Document>(name)
    }
}

fn map_write_error(err: mongodb::error::Error) -> AppError {
    if let ErrorKind::Write(WriteFailure::WriteError(ref write_error)) = *err.kind {
        if write_error.code == DUPLICATE_KEY {
            return AppError::Conflict("Document already exists".to_string());
        }
    }
    AppError::Database(err)
}

#[async_trait]
impl DocumentStore for MongoStore {
    fn backend_tag(&self) -> &'static str {
        "mongodb"
    }

    async fn ping(&self) -> Result<Duration> {
        let start = Instant::now();
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(start.elapsed())
    }

    async fn find(&self, collection: &str, filter: Document) -> Result<Vec<Document>> {
        let cursor = self.collection(collection).find(filter).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_one(&self, collection: &str, filter: Document) -> Result<Option<Document>> {
        Ok(self.collection(collection).find_one(filter).await?)
    }

    async fn insert_one(&self, collection: &str, document: Document) -> Result<Bson> {
        let result = self
            .collection(collection)
            .insert_one(document)
            .await
            .map_err(map_write_error)?;
        Ok(result.inserted_id)
    }

    async fn update_one(&self, collection: &str, filter: Document, set: Document) -> Result<u64> {
        let result = self
            .collection(collection)
            .update_one(filter, doc! { "$set": set })
            .await
            .map_err(map_write_error)?;
        Ok(result.matched_count)
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        set: Document,
    ) -> Result<u64> {
        let result = self
            .collection(collection)
            .update_many(filter, doc! { "$set": set })
            .await
            .map_err(map_write_error)?;
        Ok(result.modified_count)
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> Result<u64> {
        let result = self.collection(collection).delete_one(filter).await?;
        Ok(result.deleted_count)
    }

    async fn ensure_indexes(&self) -> Result<()> {
        let email_index = IndexModel::builder()
            .keys(doc! { UserFields::EMAIL: 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        self.collection(Collections::USERS)
            .create_index(email_index)
            .await?;

        tracing::debug!("Ensured unique index on users.email");
        Ok(())
    }
}
