//! Document store abstraction.
//!
//! Repositories talk to a [`DocumentStore`] through these traits only, so the
//! same unit of work runs over MongoDB or the in-memory store. Every data
//! operation takes an optional session: `Some` joins that session (and its
//! transaction, if one is open), `None` uses the ambient non-transactional
//! context.

use async_trait::async_trait;
use mongodb::bson::{doc, Bson, Document};

use common::AppResult;

/// Store-side session handle, optionally carrying a transaction.
///
/// Dropping a session releases it; an open transaction is discarded.
#[async_trait]
pub trait StoreSession: Send + 'static {
    async fn start_transaction(&mut self) -> AppResult<()>;

    async fn commit_transaction(&mut self) -> AppResult<()>;

    async fn abort_transaction(&mut self) -> AppResult<()>;
}

/// Collection-oriented document store.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    type Session: StoreSession;

    /// Open a new session.
    async fn start_session(&self) -> AppResult<Self::Session>;

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        session: Option<&mut Self::Session>,
    ) -> AppResult<Vec<Document>>;

    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
        session: Option<&mut Self::Session>,
    ) -> AppResult<()>;

    /// Replace the document with `_id == id`. Returns whether one existed.
    async fn replace_one(
        &self,
        collection: &str,
        id: &str,
        document: Document,
        session: Option<&mut Self::Session>,
    ) -> AppResult<bool>;

    /// Delete the document with `_id == id`. Returns whether one existed.
    async fn delete_one(
        &self,
        collection: &str,
        id: &str,
        session: Option<&mut Self::Session>,
    ) -> AppResult<bool>;

    /// Reject writes that would give two documents the same `field` value.
    /// Idempotent.
    async fn ensure_unique_index(&self, collection: &str, field: &str) -> AppResult<()>;

    /// Check connectivity.
    async fn ping(&self) -> AppResult<()>;
}

/// Query filter understood by every store.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Every document in the collection
    All,
    /// Field equals value
    Eq { field: String, value: Bson },
    /// Case-insensitive substring match of `term` on any of `fields`.
    /// The term is matched literally.
    ContainsAny { fields: Vec<String>, term: String },
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Filter::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn by_id(id: &str) -> Self {
        Filter::eq("_id", id)
    }

    pub fn contains_any(fields: &[&str], term: impl Into<String>) -> Self {
        Filter::ContainsAny {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            term: term.into(),
        }
    }

    /// MongoDB query document.
    pub fn to_document(&self) -> Document {
        match self {
            Filter::All => Document::new(),
            Filter::Eq { field, value } => {
                let mut query = Document::new();
                query.insert(field.clone(), value.clone());
                query
            }
            Filter::ContainsAny { fields, term } => {
                let pattern = regex::escape(term);
                let conditions: Vec<Bson> = fields
                    .iter()
                    .map(|field| {
                        let mut condition = Document::new();
                        condition.insert(
                            field.clone(),
                            doc! { "$regex": pattern.clone(), "$options": "i" },
                        );
                        Bson::Document(condition)
                    })
                    .collect();
                doc! { "$or": conditions }
            }
        }
    }

    /// Evaluate the filter against a document held in memory.
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq { field, value } => document.get(field) == Some(value),
            Filter::ContainsAny { fields, term } => {
                let needle = term.to_lowercase();
                fields.iter().any(|field| {
                    document
                        .get_str(field)
                        .map(|text| text.to_lowercase().contains(&needle))
                        .unwrap_or(false)
                })
            }
        }
    }
}
