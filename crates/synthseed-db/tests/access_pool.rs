use std::sync::Arc;
use std::time::Duration;

use synthseed_core::{ConnectionConfig, ConnectionParams, GeneratedValue, Vendor};
use synthseed_db::{DataRow, DbAccess, DbError, MemoryDriver, MemoryResponse, Query};

fn config(pool_size: u32) -> ConnectionConfig {
    let mut config = ConnectionConfig::new(Vendor::Postgres, ConnectionParams::default());
    config.pool_size = pool_size;
    config
}

fn access(driver: &MemoryDriver, pool_size: u32) -> DbAccess {
    DbAccess::with_driver(config(pool_size), Arc::new(driver.clone()))
}

#[tokio::test]
async fn acquire_beyond_capacity_waits_for_release() {
    let driver = MemoryDriver::new(Vendor::Postgres);
    let access = access(&driver, 2);

    let first = access.acquire_client().await.expect("first client");
    let second = access.acquire_client().await.expect("second client");
    assert_eq!(access.clients_in_use(), 2);

    let blocked = tokio::time::timeout(Duration::from_millis(50), access.acquire_client()).await;
    assert!(blocked.is_err(), "third acquire must wait while the pool is full");

    access.release_client(Some(first));
    let third = tokio::time::timeout(Duration::from_secs(1), access.acquire_client())
        .await
        .expect("released slot becomes available")
        .expect("third client");
    assert_eq!(access.clients_in_use(), 2);

    access.release_client(Some(second));
    access.release_client(Some(third));
    assert_eq!(access.clients_in_use(), 0);
}

#[tokio::test]
async fn releasing_nothing_is_a_no_op() {
    let driver = MemoryDriver::new(Vendor::MySql);
    let access = access(&driver, 1);
    access.release_client(None);
    assert_eq!(access.clients_in_use(), 0);
    assert_eq!(driver.connect_count(), 0);
}

#[tokio::test]
async fn pool_is_created_once_under_concurrent_callers() {
    let driver = MemoryDriver::new(Vendor::Postgres);
    let access = access(&driver, 4);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let access = access.clone();
        handles.push(tokio::spawn(async move {
            access
                .query(Query::new("test", "SELECT 1"))
                .await
                .map(|_| ())
        }));
    }
    for handle in handles {
        handle.await.expect("task joins").expect("query succeeds");
    }

    assert_eq!(driver.connect_count(), 1);
    assert_eq!(driver.statements().len(), 8);
    assert_eq!(access.clients_in_use(), 0);
}

#[tokio::test]
async fn fail_fast_returns_error_and_releases_client() {
    let driver = MemoryDriver::with_handler(Vendor::Postgres, |_, _| {
        MemoryResponse::Fail("relation does not exist".to_string())
    });
    let access = access(&driver, 1);

    let err = access
        .query(Query::new("loader", "SELECT * FROM missing"))
        .await
        .expect_err("fail-fast surfaces the error");
    match err {
        DbError::Query { caller, message } => {
            assert_eq!(caller, "loader");
            assert!(message.contains("relation does not exist"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(access.clients_in_use(), 0);
}

#[tokio::test]
async fn report_mode_returns_error_in_outcome() {
    let driver = MemoryDriver::with_handler(Vendor::MySql, |_, _| {
        MemoryResponse::Fail("duplicate entry".to_string())
    });
    let access = access(&driver, 1);

    let outcome = access
        .query(Query::new("insert", "INSERT INTO t VALUES (1)").report_errors())
        .await
        .expect("report mode does not fail");
    assert!(outcome.data.is_none());
    assert!(outcome.error.is_some());
    assert_eq!(access.clients_in_use(), 0);
}

#[tokio::test]
async fn kept_client_is_reused_and_holds_its_slot() {
    let driver = MemoryDriver::with_handler(Vendor::Postgres, |sql, _| {
        if sql.starts_with("SELECT") {
            MemoryResponse::Rows(vec![DataRow::new().with("id", Some("1"))])
        } else {
            MemoryResponse::Affected(1)
        }
    });
    let access = access(&driver, 1);

    let outcome = access
        .query(Query::new("test", "SELECT id FROM t").keep_client())
        .await
        .expect("select");
    assert_eq!(outcome.rows().len(), 1);
    assert_eq!(access.clients_in_use(), 1);

    let client = outcome.client.expect("client kept");
    let bindings = [GeneratedValue::Int(2)];
    let outcome = access
        .query(
            Query::new("test", "UPDATE t SET id = $1")
                .bind(&bindings)
                .with_client(client),
        )
        .await
        .expect("update");
    assert!(outcome.client.is_none());
    assert_eq!(access.clients_in_use(), 0);

    let statements = driver.statements();
    assert_eq!(statements.len(), 2);
    assert_eq!(statements[1].bindings, bindings.to_vec());
}

#[tokio::test]
async fn connection_failure_is_reported_per_mode() {
    let driver = MemoryDriver::unreachable(Vendor::Postgres, "connection refused");
    let access = access(&driver, 1);

    let err = access
        .query(Query::new("test", "SELECT 1"))
        .await
        .expect_err("fail-fast");
    assert!(matches!(err, DbError::Connection { .. }));

    let outcome = access
        .query(Query::new("test", "SELECT 1").report_errors())
        .await
        .expect("report mode");
    assert!(matches!(outcome.error, Some(DbError::Connection { .. })));
    assert_eq!(access.clients_in_use(), 0);
}
