//! MongoDB document store.
//!
//! Transactions need a replica set deployment (MongoDB 4.0+).

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::options::IndexOptions;
use mongodb::{Client, ClientSession, Collection, Database, IndexModel};
use tracing::{debug, info};

use common::{AppResult, DatabaseConfig};

use super::store::{DocumentStore, Filter, StoreSession};

/// MongoDB-backed store.
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    database: Database,
}

impl MongoStore {
    /// Connect to the configured deployment.
    ///
    /// The driver connects lazily, so this does not prove the server is
    /// reachable; use [`DocumentStore::ping`] for that.
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        let client = Client::with_uri_str(&config.url).await?;
        let database = client.database(&config.database);
        info!(database = %config.database, "MongoDB client initialised");
        Ok(Self { client, database })
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.database.collection::<Document>(name)
    }
}

/// Driver session wrapper.
pub struct MongoSession(ClientSession);

#[async_trait]
impl StoreSession for MongoSession {
    async fn start_transaction(&mut self) -> AppResult<()> {
        self.0.start_transaction().await?;
        Ok(())
    }

    async fn commit_transaction(&mut self) -> AppResult<()> {
        self.0.commit_transaction().await?;
        Ok(())
    }

    async fn abort_transaction(&mut self) -> AppResult<()> {
        self.0.abort_transaction().await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    type Session = MongoSession;

    async fn start_session(&self) -> AppResult<MongoSession> {
        let session = self.client.start_session().await?;
        Ok(MongoSession(session))
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        session: Option<&mut MongoSession>,
    ) -> AppResult<Vec<Document>> {
        let coll = self.collection(collection);
        let query = filter.to_document();

        let documents: Vec<Document> = match session {
            Some(MongoSession(session)) => {
                let mut cursor = coll.find(query).session(&mut *session).await?;
                cursor.stream(session).try_collect().await?
            }
            None => coll.find(query).await?.try_collect().await?,
        };
        Ok(documents)
    }

    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
        session: Option<&mut MongoSession>,
    ) -> AppResult<()> {
        let coll = self.collection(collection);
        match session {
            Some(MongoSession(session)) => {
                coll.insert_one(document).session(session).await?;
            }
            None => {
                coll.insert_one(document).await?;
            }
        }
        Ok(())
    }

    async fn replace_one(
        &self,
        collection: &str,
        id: &str,
        document: Document,
        session: Option<&mut MongoSession>,
    ) -> AppResult<bool> {
        let coll = self.collection(collection);
        let query = doc! { "_id": id };
        let result = match session {
            Some(MongoSession(session)) => {
                coll.replace_one(query, document).session(session).await?
            }
            None => coll.replace_one(query, document).await?,
        };
        Ok(result.matched_count > 0)
    }

    async fn delete_one(
        &self,
        collection: &str,
        id: &str,
        session: Option<&mut MongoSession>,
    ) -> AppResult<bool> {
        let coll = self.collection(collection);
        let query = doc! { "_id": id };
        let result = match session {
            Some(MongoSession(session)) => coll.delete_one(query).session(session).await?,
            None => coll.delete_one(query).await?,
        };
        Ok(result.deleted_count > 0)
    }

    async fn ensure_unique_index(&self, collection: &str, field: &str) -> AppResult<()> {
        let mut keys = Document::new();
        keys.insert(field, 1);
        let index = IndexModel::builder()
            .keys(keys)
            .options(IndexOptions::builder().unique(true).build())
            .build();

        let created = self.collection(collection).create_index(index).await?;
        debug!(collection, index = %created.index_name, "unique index ensured");
        Ok(())
    }

    async fn ping(&self) -> AppResult<()> {
        self.database.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}
