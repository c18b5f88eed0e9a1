//! In-process document store.
//!
//! Mirrors the session semantics the unit of work relies on: writes inside a
//! transaction are buffered on the session and visible only to that session,
//! commit applies them atomically, abort or drop discards them. Unique
//! indexes are enforced on every insert and replace. Commit and abort
//! failures can be injected to exercise the error paths.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use mongodb::bson::Document;
use tokio::sync::RwLock;
use tracing::debug;

use common::{AppError, AppResult};

use super::store::{DocumentStore, Filter, StoreSession};

type Collections = HashMap<String, BTreeMap<String, Document>>;
type UniqueFields = HashMap<String, Vec<String>>;

#[derive(Default)]
struct Inner {
    collections: RwLock<Collections>,
    unique_fields: RwLock<UniqueFields>,
    fail_commits: AtomicBool,
    fail_aborts: AtomicBool,
    open_sessions: AtomicUsize,
    commits: AtomicUsize,
}

/// Shared, cloneable in-memory store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent commit fail with a transient error.
    pub fn fail_commits(&self, fail: bool) {
        self.inner.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent abort fail after discarding its writes.
    pub fn fail_aborts(&self, fail: bool) {
        self.inner.fail_aborts.store(fail, Ordering::SeqCst);
    }

    /// Sessions started and not yet dropped.
    pub fn open_sessions(&self) -> usize {
        self.inner.open_sessions.load(Ordering::SeqCst)
    }

    /// Transactions successfully committed so far.
    pub fn committed_transactions(&self) -> usize {
        self.inner.commits.load(Ordering::SeqCst)
    }

    /// Number of committed documents in a collection.
    pub async fn count(&self, collection: &str) -> usize {
        self.inner
            .collections
            .read()
            .await
            .get(collection)
            .map_or(0, BTreeMap::len)
    }
}

#[derive(Debug, Clone)]
enum PendingWrite {
    Insert {
        collection: String,
        id: String,
        document: Document,
    },
    Replace {
        collection: String,
        id: String,
        document: Document,
    },
    Delete {
        collection: String,
        id: String,
    },
}

impl PendingWrite {
    fn collection(&self) -> &str {
        match self {
            PendingWrite::Insert { collection, .. }
            | PendingWrite::Replace { collection, .. }
            | PendingWrite::Delete { collection, .. } => collection,
        }
    }

    /// Apply to one collection's documents. Returns whether the target existed.
    fn apply_to(
        &self,
        documents: &mut BTreeMap<String, Document>,
        unique: &[String],
    ) -> AppResult<bool> {
        match self {
            PendingWrite::Insert { id, document, .. } => {
                if documents.contains_key(id) {
                    return Err(AppError::conflict(format!("Document {}", id)));
                }
                check_unique(documents, id, document, unique)?;
                documents.insert(id.clone(), document.clone());
                Ok(false)
            }
            PendingWrite::Replace { id, document, .. } => {
                if !documents.contains_key(id) {
                    return Ok(false);
                }
                check_unique(documents, id, document, unique)?;
                documents.insert(id.clone(), document.clone());
                Ok(true)
            }
            PendingWrite::Delete { id, .. } => Ok(documents.remove(id).is_some()),
        }
    }
}

/// Session over a [`MemoryStore`].
pub struct MemorySession {
    store: Arc<Inner>,
    in_transaction: bool,
    pending: Vec<PendingWrite>,
}

impl MemorySession {
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Writes buffered by the open transaction.
    pub fn pending_writes(&self) -> usize {
        self.pending.len()
    }

    fn overlay(&self, collection: &str, base: &mut BTreeMap<String, Document>) {
        for write in self.pending.iter().filter(|w| w.collection() == collection) {
            // Buffered writes were checked when they were recorded.
            let _ = write.apply_to(base, &[]);
        }
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.store.open_sessions.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl StoreSession for MemorySession {
    async fn start_transaction(&mut self) -> AppResult<()> {
        if self.in_transaction {
            return Err(AppError::AlreadyInTransaction);
        }
        self.in_transaction = true;
        self.pending.clear();
        Ok(())
    }

    async fn commit_transaction(&mut self) -> AppResult<()> {
        if !self.in_transaction {
            return Err(AppError::NoTransactionInProgress);
        }
        if self.store.fail_commits.load(Ordering::SeqCst) {
            return Err(AppError::store_unavailable("injected commit failure"));
        }

        let unique_fields = self.store.unique_fields.read().await.clone();
        let mut collections = self.store.collections.write().await;
        let mut staged = collections.clone();
        for write in &self.pending {
            let unique = unique_fields
                .get(write.collection())
                .map_or(&[][..], Vec::as_slice);
            write.apply_to(staged.entry(write.collection().to_string()).or_default(), unique)?;
        }
        *collections = staged;

        debug!(writes = self.pending.len(), "memory transaction committed");
        self.pending.clear();
        self.in_transaction = false;
        self.store.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn abort_transaction(&mut self) -> AppResult<()> {
        if !self.in_transaction {
            return Err(AppError::NoTransactionInProgress);
        }
        self.pending.clear();
        self.in_transaction = false;
        if self.store.fail_aborts.load(Ordering::SeqCst) {
            return Err(AppError::store_unavailable("injected abort failure"));
        }
        Ok(())
    }
}

impl MemoryStore {
    /// Committed documents of a collection, with the session's buffered
    /// writes layered on top.
    async fn view(
        &self,
        collection: &str,
        session: Option<&MemorySession>,
    ) -> BTreeMap<String, Document> {
        let mut documents = self
            .inner
            .collections
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default();
        if let Some(session) = session.filter(|s| s.in_transaction) {
            session.overlay(collection, &mut documents);
        }
        documents
    }

    async fn unique_fields(&self, collection: &str) -> Vec<String> {
        self.inner
            .unique_fields
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Buffer the write on a transactional session, or apply it immediately.
    ///
    /// Buffered writes are checked against the session's view now and again
    /// against the committed data at commit.
    async fn write(
        &self,
        write: PendingWrite,
        session: Option<&mut MemorySession>,
    ) -> AppResult<bool> {
        let unique = self.unique_fields(write.collection()).await;
        match session {
            Some(session) if session.in_transaction => {
                let mut documents = self.view(write.collection(), Some(&*session)).await;
                let existed = write.apply_to(&mut documents, &unique)?;
                session.pending.push(write);
                Ok(existed)
            }
            _ => {
                let mut collections = self.inner.collections.write().await;
                write.apply_to(
                    collections.entry(write.collection().to_string()).or_default(),
                    &unique,
                )
            }
        }
    }
}

/// Conflict when another document already holds one of `document`'s values
/// for a unique field.
fn check_unique(
    documents: &BTreeMap<String, Document>,
    id: &str,
    document: &Document,
    unique: &[String],
) -> AppResult<()> {
    for field in unique {
        let Some(value) = document.get(field) else {
            continue;
        };
        let taken = documents
            .iter()
            .any(|(other_id, other)| other_id != id && other.get(field) == Some(value));
        if taken {
            return Err(AppError::conflict(field.clone()));
        }
    }
    Ok(())
}

fn document_id(document: &Document) -> AppResult<String> {
    document
        .get_str("_id")
        .map(str::to_string)
        .map_err(|_| AppError::validation("document has no string _id"))
}

#[async_trait]
impl DocumentStore for MemoryStore {
    type Session = MemorySession;

    async fn start_session(&self) -> AppResult<MemorySession> {
        self.inner.open_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(MemorySession {
            store: self.inner.clone(),
            in_transaction: false,
            pending: Vec::new(),
        })
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        session: Option<&mut MemorySession>,
    ) -> AppResult<Vec<Document>> {
        let documents = self.view(collection, session.as_deref()).await;
        Ok(documents
            .into_values()
            .filter(|document| filter.matches(document))
            .collect())
    }

    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
        session: Option<&mut MemorySession>,
    ) -> AppResult<()> {
        let id = document_id(&document)?;
        self.write(
            PendingWrite::Insert {
                collection: collection.to_string(),
                id,
                document,
            },
            session,
        )
        .await?;
        Ok(())
    }

    async fn replace_one(
        &self,
        collection: &str,
        id: &str,
        mut document: Document,
        session: Option<&mut MemorySession>,
    ) -> AppResult<bool> {
        document.insert("_id", id);
        self.write(
            PendingWrite::Replace {
                collection: collection.to_string(),
                id: id.to_string(),
                document,
            },
            session,
        )
        .await
    }

    async fn delete_one(
        &self,
        collection: &str,
        id: &str,
        session: Option<&mut MemorySession>,
    ) -> AppResult<bool> {
        self.write(
            PendingWrite::Delete {
                collection: collection.to_string(),
                id: id.to_string(),
            },
            session,
        )
        .await
    }

    async fn ensure_unique_index(&self, collection: &str, field: &str) -> AppResult<()> {
        let mut unique_fields = self.inner.unique_fields.write().await;
        let fields = unique_fields.entry(collection.to_string()).or_default();
        if fields.iter().any(|f| f == field) {
            return Ok(());
        }

        let collections = self.inner.collections.read().await;
        if let Some(documents) = collections.get(collection) {
            let mut seen = Vec::new();
            for value in documents.values().filter_map(|d| d.get(field)) {
                if seen.contains(&value) {
                    return Err(AppError::conflict(field.to_string()));
                }
                seen.push(value);
            }
        }

        fields.push(field.to_string());
        debug!(collection, field, "unique index ensured");
        Ok(())
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}
