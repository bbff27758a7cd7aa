use async_trait::async_trait;
use bson::{Document, doc, oid::ObjectId};
use mongodb::{Client, Collection as MongoCollection, options::ClientOptions};
use tracing::{debug, trace};
use vaultdoc_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{StoreError, StoreResult},
};


#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    /// Name of the database documents are stored in.
    pub fn database(&self) -> &str {
        &self.database
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }

    async fn ping(&self) -> StoreResult<()> {
        self.client
            .database(&self.database)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| StoreError::Initialization(e.to_string()))?;

        Ok(())
    }

    async fn shutdown(self) -> StoreResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn upsert_document(&self, collection: &str, id: ObjectId, document: Document) -> StoreResult<()> {
        let result = self.get_collection(collection)
            .replace_one(doc! { "_id": id }, document)
            .upsert(true)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        trace!(
            target: "vaultdoc::store",
            collection,
            id = %id,
            inserted = result.upserted_id.is_some(),
            "Upserted document"
        );

        Ok(())
    }

    async fn find_document(&self, collection: &str, id: ObjectId) -> StoreResult<Document> {
        self.get_collection(collection)
            .find_one(doc! { "_id": id })
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?
            .ok_or_else(|| StoreError::DocumentNotFound(id.to_hex(), collection.to_string()))
    }

    async fn remove_document(&self, collection: &str, id: ObjectId) -> StoreResult<()> {
        let result = self.get_collection(collection)
            .delete_one(doc! { "_id": id })
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        if result.deleted_count == 0 {
            return Err(StoreError::DocumentNotFound(id.to_hex(), collection.to_string()));
        }

        Ok(())
    }

    async fn shutdown(self) -> StoreResult<()> {
        self.shutdown().await
    }
}

pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
    verify_connection: bool,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
            verify_connection: true,
        }
    }

    /// Whether `build` pings the server before returning. Enabled by default.
    pub fn verify_connection(mut self, verify: bool) -> Self {
        self.verify_connection = verify;
        self
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> StoreResult<Self::Backend> {
        let store = MongoDbStore::new(
            Client::with_options(
                ClientOptions::parse(&self.dsn)
                    .await
                    .map_err(|e| StoreError::Initialization(e.to_string()))?,
            )
            .map_err(|e| StoreError::Initialization(e.to_string()))?,
            self.database,
        );

        if self.verify_connection {
            store.ping().await?;
            debug!(target: "vaultdoc::store", database = %store.database, "Connected to MongoDB");
        }

        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn malformed_connection_string_fails_at_build() {
        let err = MongoDbStore::builder("not-a-mongodb-uri", "app")
            .verify_connection(false)
            .build()
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Initialization(_)));
    }
}
