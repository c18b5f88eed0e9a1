//! Unit of work tests against the in-memory store.

use std::sync::Arc;

use common::AppError;
use data_service_lib::{with_transaction, MemoryStore, Persistence, TransactionState};
use domain::{CreateCustomer, Customer};

fn setup() -> (MemoryStore, Persistence<MemoryStore>) {
    let store = MemoryStore::new();
    let persistence = Persistence::new(store.clone());
    (store, persistence)
}

fn create_test_customer(email: &str, address: &str) -> Customer {
    Customer::new(
        CreateCustomer {
            email: email.to_string(),
            password: String::new(),
            first_name: "Test".to_string(),
            last_name: "Customer".to_string(),
            phone: "555-0100".to_string(),
            address: address.to_string(),
        },
        "hashed".to_string(),
        false,
    )
}

/// Let detached commit and abort tasks run to completion.
async fn settle(store: &MemoryStore) {
    for _ in 0..16 {
        if store.open_sessions() == 0 {
            return;
        }
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_repositories_are_memoized() {
    let (_, persistence) = setup();
    let uow = persistence.unit_of_work();

    let before = uow.customers();
    uow.begin_transaction().await.unwrap();
    let after = uow.customers();

    assert!(Arc::ptr_eq(&before, &after));
    assert!(Arc::ptr_eq(&uow.products(), &uow.products()));
    assert!(Arc::ptr_eq(&uow.orders(), &uow.repository::<domain::Order>()));
    uow.rollback_transaction().await.unwrap();
}

#[tokio::test]
async fn test_rollback_discards_insert() {
    let (store, persistence) = setup();
    let uow = persistence.unit_of_work();

    uow.begin_transaction().await.unwrap();
    let created = uow
        .customers()
        .create(create_test_customer("new@example.com", "new address"))
        .await
        .unwrap();
    assert_eq!(created.id.len(), 24);
    assert!(uow.customers().get_by_id(&created.id).await.unwrap().is_some());

    uow.rollback_transaction().await.unwrap();
    assert_eq!(uow.state().await, TransactionState::Idle);

    let fresh = persistence.unit_of_work();
    assert!(fresh.customers().get_by_id(&created.id).await.unwrap().is_none());
    assert_eq!(store.count("Customers").await, 0);
    assert_eq!(store.open_sessions(), 0);
}

#[tokio::test]
async fn test_begin_after_rollback_starts_clean() {
    let (_, persistence) = setup();
    let uow = persistence.unit_of_work();

    uow.begin_transaction().await.unwrap();
    uow.customers()
        .create(create_test_customer("leak@example.com", "x"))
        .await
        .unwrap();
    uow.rollback_transaction().await.unwrap();

    uow.begin_transaction().await.unwrap();
    assert!(uow.in_transaction().await);
    assert!(uow.customers().get_all().await.unwrap().is_empty());
    uow.commit_transaction().await.unwrap();
}

#[tokio::test]
async fn test_commit_applies_all_writes() {
    let (store, persistence) = setup();
    let uow = persistence.unit_of_work();

    uow.begin_transaction().await.unwrap();
    let first = uow
        .customers()
        .create(create_test_customer("a@example.com", "1 Main St"))
        .await
        .unwrap();
    uow.customers()
        .create(create_test_customer("b@example.com", "2 Main St"))
        .await
        .unwrap();

    // Not visible outside the transaction yet
    let outsider = persistence.unit_of_work();
    assert!(outsider.customers().get_all().await.unwrap().is_empty());

    uow.commit_transaction().await.unwrap();
    assert_eq!(uow.state().await, TransactionState::Idle);
    assert_eq!(store.committed_transactions(), 1);
    assert_eq!(store.open_sessions(), 0);

    let found = outsider.customers().get_by_id(&first.id).await.unwrap();
    assert_eq!(found.unwrap().address, "1 Main St");
    assert_eq!(outsider.customers().get_all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_commit_failure_leaves_no_partial_writes() {
    let (store, persistence) = setup();
    let uow = persistence.unit_of_work();

    uow.begin_transaction().await.unwrap();
    uow.customers()
        .create(create_test_customer("a@example.com", "x"))
        .await
        .unwrap();

    store.fail_commits(true);
    let err = uow.commit_transaction().await.unwrap_err();
    assert!(err.is_transient());
    assert_eq!(uow.state().await, TransactionState::Idle);

    store.fail_commits(false);
    let fresh = persistence.unit_of_work();
    assert!(fresh.customers().get_all().await.unwrap().is_empty());
    assert_eq!(store.open_sessions(), 0);
}

#[tokio::test]
async fn test_failed_abort_does_not_mask_commit_error() {
    let (store, persistence) = setup();
    let uow = persistence.unit_of_work();

    uow.begin_transaction().await.unwrap();
    store.fail_commits(true);
    store.fail_aborts(true);

    let err = uow.commit_transaction().await.unwrap_err();
    assert!(matches!(err, AppError::StoreUnavailable(msg) if msg.contains("commit")));
    assert!(!uow.in_transaction().await);
}

#[tokio::test]
async fn test_transaction_misuse_is_reported() {
    let (_, persistence) = setup();
    let uow = persistence.unit_of_work();

    let err = uow.commit_transaction().await.unwrap_err();
    assert!(matches!(err, AppError::NoTransactionInProgress));
    assert!(err.is_defect());

    let err = uow.rollback_transaction().await.unwrap_err();
    assert!(matches!(err, AppError::NoTransactionInProgress));

    uow.begin_transaction().await.unwrap();
    let err = uow.begin_transaction().await.unwrap_err();
    assert!(matches!(err, AppError::AlreadyInTransaction));
    assert!(uow.in_transaction().await);
}

#[tokio::test]
async fn test_ambient_writes_without_transaction() {
    let (store, persistence) = setup();
    let uow = persistence.unit_of_work();

    let mut customer = uow
        .customers()
        .create(create_test_customer("a@example.com", "old"))
        .await
        .unwrap();
    assert_eq!(store.count("Customers").await, 1);

    customer.address = "new".to_string();
    assert!(uow.customers().update(&customer).await.unwrap());
    assert!(uow.customers().delete(&customer.id).await.unwrap());
    assert!(!uow.customers().update(&customer).await.unwrap());
    assert!(!uow.customers().delete(&customer.id).await.unwrap());
    assert_eq!(store.open_sessions(), 0);
}

#[tokio::test]
async fn test_dispose_rolls_back_open_transaction() {
    let (store, persistence) = setup();
    let uow = persistence.unit_of_work();

    uow.begin_transaction().await.unwrap();
    uow.customers()
        .create(create_test_customer("a@example.com", "x"))
        .await
        .unwrap();
    uow.dispose().await;

    assert_eq!(store.open_sessions(), 0);
    assert_eq!(store.count("Customers").await, 0);
}

#[tokio::test]
async fn test_drop_never_commits() {
    let (store, persistence) = setup();
    {
        let uow = persistence.unit_of_work();
        uow.begin_transaction().await.unwrap();
        uow.customers()
            .create(create_test_customer("a@example.com", "x"))
            .await
            .unwrap();
    }
    settle(&store).await;

    assert_eq!(store.count("Customers").await, 0);
    assert_eq!(store.committed_transactions(), 0);
    assert_eq!(store.open_sessions(), 0);
}

#[tokio::test]
async fn test_commit_completes_after_caller_gives_up() {
    let (store, persistence) = setup();
    let uow = persistence.unit_of_work();
    uow.begin_transaction().await.unwrap();
    uow.customers()
        .create(create_test_customer("a@example.com", "x"))
        .await
        .unwrap();

    {
        let mut commit = Box::pin(uow.commit_transaction());
        assert!(futures::poll!(&mut commit).is_pending());
    }
    settle(&store).await;

    assert_eq!(uow.state().await, TransactionState::Idle);
    assert_eq!(store.committed_transactions(), 1);
    assert_eq!(store.open_sessions(), 0);
    assert_eq!(store.count("Customers").await, 1);
}

#[tokio::test]
async fn test_rollback_completes_after_caller_gives_up() {
    let (store, persistence) = setup();
    let uow = persistence.unit_of_work();
    uow.begin_transaction().await.unwrap();
    uow.customers()
        .create(create_test_customer("a@example.com", "x"))
        .await
        .unwrap();

    {
        let mut rollback = Box::pin(uow.rollback_transaction());
        assert!(futures::poll!(&mut rollback).is_pending());
    }
    settle(&store).await;

    assert_eq!(uow.state().await, TransactionState::Idle);
    assert_eq!(store.open_sessions(), 0);
    assert_eq!(store.count("Customers").await, 0);
    uow.begin_transaction().await.unwrap();
    uow.rollback_transaction().await.unwrap();
}

#[tokio::test]
async fn test_repository_outliving_unit_of_work_uses_ambient_context() {
    let (store, persistence) = setup();
    let customers = {
        let uow = persistence.unit_of_work();
        uow.begin_transaction().await.unwrap();
        let customers = uow.customers();
        uow.rollback_transaction().await.unwrap();
        customers
    };

    customers
        .create(create_test_customer("late@example.com", "x"))
        .await
        .unwrap();
    assert_eq!(store.count("Customers").await, 1);
}

#[tokio::test]
async fn test_run_in_transaction_commits_on_ok() {
    let (store, persistence) = setup();
    let uow = persistence.unit_of_work();

    let created = uow
        .run_in_transaction(|tx| {
            Box::pin(async move {
                let customer = tx
                    .customers()
                    .create(create_test_customer("a@example.com", "x"))
                    .await?;
                Ok::<_, AppError>(customer)
            })
        })
        .await
        .unwrap();

    assert_eq!(store.committed_transactions(), 1);
    assert!(uow.customers().get_by_id(&created.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_with_transaction_rolls_back_on_err() {
    let (store, persistence) = setup();
    let uow = persistence.unit_of_work();

    let result: Result<(), AppError> = with_transaction!(uow, |tx| {
        tx.customers()
            .create(create_test_customer("a@example.com", "x"))
            .await?;
        Err::<(), _>(AppError::validation("order rejected"))
    });

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(!uow.in_transaction().await);
    assert_eq!(store.count("Customers").await, 0);
}
