//! Unit of Work pattern implementation.
//!
//! A [`UnitOfWork`] is created per logical business operation. It:
//! - Lazily creates one repository per entity type and caches it for its lifetime
//! - Owns at most one session, shared with those repositories
//! - Manages the transaction lifecycle (begin, commit, rollback)
//! - Never commits implicitly: dropping it with an open transaction rolls back
//!
//! State machine: `Idle -> TransactionActive -> Idle`, through commit or rollback.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, error, warn};
use uuid::Uuid;

use common::{AppError, AppResult};
use domain::{Customer, Order, Product};

use crate::infra::{DocumentStore, StoreSession};
use crate::repository::{Entity, Repository, SessionSlot};

/// Boxed future returned by transactional closures.
pub type TransactionFuture<'a, T> = Pin<Box<dyn Future<Output = AppResult<T>> + Send + 'a>>;

/// Transaction state of a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Idle,
    TransactionActive,
}

#[derive(Debug, Clone, Copy)]
enum Finish {
    Commit,
    Abort,
}

/// Coordinates repositories and the transaction they share.
pub struct UnitOfWork<S: DocumentStore> {
    id: Uuid,
    store: Arc<S>,
    session: SessionSlot<S::Session>,
    repositories: Mutex<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl<S: DocumentStore> UnitOfWork<S> {
    pub fn new(store: Arc<S>) -> Self {
        let id = Uuid::new_v4();
        debug!(uow = %id, "unit of work created");
        Self {
            id,
            store,
            session: Arc::new(tokio::sync::Mutex::new(None)),
            repositories: Mutex::new(HashMap::new()),
        }
    }

    /// Identifier used as the `uow` field in logs
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub async fn state(&self) -> TransactionState {
        if self.session.lock().await.is_some() {
            TransactionState::TransactionActive
        } else {
            TransactionState::Idle
        }
    }

    pub async fn in_transaction(&self) -> bool {
        self.state().await == TransactionState::TransactionActive
    }

    /// Repository for `T`, created on first access and reused afterwards.
    pub fn repository<T: Entity>(&self) -> Arc<Repository<T, S>> {
        let mut cache = self
            .repositories
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let entry = cache
            .entry(TypeId::of::<T>())
            .or_insert_with(|| {
                debug!(uow = %self.id, collection = T::COLLECTION, "repository created");
                Arc::new(Repository::<T, S>::new(
                    self.store.clone(),
                    self.session.clone(),
                )) as Arc<dyn Any + Send + Sync>
            })
            .clone();

        match entry.downcast::<Repository<T, S>>() {
            Ok(repository) => repository,
            Err(_) => unreachable!("repository cache is keyed by entity type"),
        }
    }

    pub fn customers(&self) -> Arc<Repository<Customer, S>> {
        self.repository::<Customer>()
    }

    pub fn orders(&self) -> Arc<Repository<Order, S>> {
        self.repository::<Order>()
    }

    pub fn products(&self) -> Arc<Repository<Product, S>> {
        self.repository::<Product>()
    }

    /// Start a session and open a transaction on it.
    ///
    /// # Errors
    /// `AlreadyInTransaction` if a transaction is active.
    pub async fn begin_transaction(&self) -> AppResult<()> {
        let mut slot = self.session.lock().await;
        if slot.is_some() {
            return Err(AppError::AlreadyInTransaction);
        }

        let mut session = self.store.start_session().await?;
        session.start_transaction().await?;
        *slot = Some(session);

        debug!(uow = %self.id, "transaction started");
        Ok(())
    }

    /// Commit every write made since `begin_transaction`.
    ///
    /// On failure the transaction is aborted before the commit error is
    /// returned. Either way the unit of work is idle afterwards.
    ///
    /// # Errors
    /// `NoTransactionInProgress` if no transaction is active.
    pub async fn commit_transaction(&self) -> AppResult<()> {
        let session = self
            .session
            .lock()
            .await
            .take()
            .ok_or(AppError::NoTransactionInProgress)?;

        Self::finish(self.id, session, Finish::Commit).await?;
        debug!(uow = %self.id, "transaction committed");
        Ok(())
    }

    /// Discard every write made since `begin_transaction`.
    ///
    /// # Errors
    /// `NoTransactionInProgress` if no transaction is active.
    pub async fn rollback_transaction(&self) -> AppResult<()> {
        let session = self
            .session
            .lock()
            .await
            .take()
            .ok_or(AppError::NoTransactionInProgress)?;

        Self::finish(self.id, session, Finish::Abort).await?;
        debug!(uow = %self.id, "transaction rolled back");
        Ok(())
    }

    /// Execute a closure within a transaction.
    ///
    /// The transaction is committed when the closure returns `Ok` and rolled
    /// back when it returns `Err`. A failed rollback is logged; the closure's
    /// error is returned.
    pub async fn run_in_transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(&'a Self) -> TransactionFuture<'a, T> + Send,
        T: Send,
    {
        self.begin_transaction().await?;

        match f(self).await {
            Ok(result) => {
                self.commit_transaction().await?;
                Ok(result)
            }
            Err(e) => {
                if let Err(rollback_err) = self.rollback_transaction().await {
                    error!(uow = %self.id, "Transaction rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }

    /// Release the unit of work, rolling back an open transaction.
    pub async fn dispose(self) {
        let session = self.session.lock().await.take();
        if let Some(session) = session {
            warn!(uow = %self.id, "disposed with an open transaction, rolling back");
            if let Err(e) = Self::finish(self.id, session, Finish::Abort).await {
                error!(uow = %self.id, "Implicit rollback failed: {}", e);
            }
        }
    }

    /// Commit or abort on a detached task so the outcome does not depend on
    /// the caller's future being polled to completion.
    async fn finish(id: Uuid, mut session: S::Session, action: Finish) -> AppResult<()> {
        let task = tokio::spawn(async move {
            match action {
                Finish::Commit => {
                    let result = session.commit_transaction().await;
                    if let Err(commit_err) = &result {
                        debug!(uow = %id, "commit failed, aborting: {}", commit_err);
                        if let Err(abort_err) = session.abort_transaction().await {
                            error!(uow = %id, "Abort after failed commit failed: {}", abort_err);
                        }
                    }
                    result
                }
                Finish::Abort => session.abort_transaction().await,
            }
        });

        task.await
            .map_err(|e| AppError::internal(format!("transaction task failed: {}", e)))?
    }
}

impl<S: DocumentStore> Drop for UnitOfWork<S> {
    fn drop(&mut self) {
        let session = match self.session.try_lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        let Some(mut session) = session else {
            return;
        };

        warn!(uow = %self.id, "dropped with an open transaction, rolling back");
        // Without a runtime the session is simply dropped, which discards the
        // transaction on the store side.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let id = self.id;
            handle.spawn(async move {
                if let Err(e) = session.abort_transaction().await {
                    error!(uow = %id, "Implicit rollback failed: {}", e);
                }
            });
        }
    }
}

/// Hands out a fresh [`UnitOfWork`] per operation over a shared store.
pub struct Persistence<S: DocumentStore> {
    store: Arc<S>,
}

impl<S: DocumentStore> Clone for Persistence<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: DocumentStore> Persistence<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// New unit of work; never pooled or shared between operations.
    pub fn unit_of_work(&self) -> UnitOfWork<S> {
        UnitOfWork::new(self.store.clone())
    }

    /// Check store connectivity.
    pub async fn ping(&self) -> AppResult<()> {
        self.store.ping().await
    }

    /// Create the unique indexes every entity declares. Run once at startup,
    /// before the first write.
    pub async fn ensure_indexes(&self) -> AppResult<()> {
        self.ensure_indexes_for::<Customer>().await?;
        self.ensure_indexes_for::<Order>().await?;
        self.ensure_indexes_for::<Product>().await
    }

    async fn ensure_indexes_for<T: Entity>(&self) -> AppResult<()> {
        for field in T::UNIQUE_FIELDS {
            self.store.ensure_unique_index(T::COLLECTION, field).await?;
        }
        Ok(())
    }
}

/// Simpler API for executing transactional operations.
///
/// ```ignore
/// let order = with_transaction!(uow, |tx| {
///     let order = tx.orders().create(order).await?;
///     tx.customers().update(&customer).await?;
///     Ok(order)
/// })?;
/// ```
#[macro_export]
macro_rules! with_transaction {
    ($uow:expr, |$ctx:ident| $body:expr) => {
        $uow.run_in_transaction(|$ctx| Box::pin(async move { $body }))
            .await
    };
}
