//! Generic entity repository.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use mongodb::bson::{self, oid::ObjectId, Document};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;

use common::{AppError, AppResult};

use crate::infra::{DocumentStore, Filter};

/// Session shared by a unit of work and its repositories.
///
/// `Some` while a transaction is active; `None` means operations run in the
/// ambient, non-transactional context.
pub type SessionSlot<S> = Arc<Mutex<Option<S>>>;

/// A persisted document type.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection the entity is stored in
    const COLLECTION: &'static str;

    /// Stored field names that must be unique across the collection
    const UNIQUE_FIELDS: &'static [&'static str] = &[];

    fn id(&self) -> &str;

    fn assign_id(&mut self, id: String);
}

/// Per-entity accessor bound to a unit of work's session slot.
///
/// Writes join the unit of work's transaction when one is active; otherwise
/// each write is applied on its own.
pub struct Repository<T, S: DocumentStore> {
    store: Arc<S>,
    session: SessionSlot<S::Session>,
    _entity: PhantomData<fn() -> T>,
}

impl<T, S: DocumentStore> fmt::Debug for Repository<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("entity", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: Entity, S: DocumentStore> Repository<T, S> {
    pub(crate) fn new(store: Arc<S>, session: SessionSlot<S::Session>) -> Self {
        Self {
            store,
            session,
            _entity: PhantomData,
        }
    }

    pub async fn get_all(&self) -> AppResult<Vec<T>> {
        self.find(Filter::All).await
    }

    pub async fn get_by_id(&self, id: &str) -> AppResult<Option<T>> {
        self.find_one(Filter::by_id(id)).await
    }

    /// Insert the entity, assigning a fresh ObjectId when its id is empty.
    pub async fn create(&self, mut entity: T) -> AppResult<T> {
        if entity.id().is_empty() {
            entity.assign_id(ObjectId::new().to_hex());
        }
        let document = encode(&entity)?;

        let mut slot = self.session.lock().await;
        self.store
            .insert_one(T::COLLECTION, document, slot.as_mut())
            .await?;
        Ok(entity)
    }

    /// Replace by id. Returns whether a record existed.
    pub async fn update(&self, entity: &T) -> AppResult<bool> {
        let document = encode(entity)?;

        let mut slot = self.session.lock().await;
        self.store
            .replace_one(T::COLLECTION, entity.id(), document, slot.as_mut())
            .await
    }

    /// Delete by id. Returns whether a record existed.
    pub async fn delete(&self, id: &str) -> AppResult<bool> {
        let mut slot = self.session.lock().await;
        self.store
            .delete_one(T::COLLECTION, id, slot.as_mut())
            .await
    }

    pub(crate) async fn find(&self, filter: Filter) -> AppResult<Vec<T>> {
        let documents = {
            let mut slot = self.session.lock().await;
            self.store
                .find(T::COLLECTION, &filter, slot.as_mut())
                .await?
        };
        documents.into_iter().map(decode).collect()
    }

    pub(crate) async fn find_one(&self, filter: Filter) -> AppResult<Option<T>> {
        Ok(self.find(filter).await?.into_iter().next())
    }
}

fn encode<T: Entity>(entity: &T) -> AppResult<Document> {
    bson::to_document(entity)
        .map_err(|e| AppError::internal(format!("{} encode failed: {}", T::COLLECTION, e)))
}

fn decode<T: Entity>(document: Document) -> AppResult<T> {
    bson::from_document(document)
        .map_err(|e| AppError::internal(format!("{} decode failed: {}", T::COLLECTION, e)))
}
