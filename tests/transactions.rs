// Transaction Tests
//
// beginTransaction/commit/rollBack expectations, nesting errors and the
// ignore-transactions switch.

mod common;

use common::{connection, connection_with_errmode, db_error};
use pdo_mock::prelude::*;

#[test]
fn test_expected_transaction() -> anyhow::Result<()> {
    let conn = connection();
    conn.expect_begin_transaction()?;
    conn.expect("update books set price = 0").affecting(3);
    conn.expect_commit()?;

    assert!(conn.begin_transaction()?);
    assert!(conn.in_transaction());
    assert_eq!(conn.exec("update books set price = 0")?, Some(3));
    assert!(conn.commit()?);
    assert!(!conn.in_transaction());
    conn.assert_expectations_fulfilled()?;
    Ok(())
}

#[test]
fn test_expect_transaction_wraps_body() -> anyhow::Result<()> {
    let conn = connection();
    let insert = conn.expect_transaction(|c| c.expect("insert into log values (1)"))?;

    conn.begin_transaction()?;
    conn.exec("insert into log values (1)")?;
    conn.commit()?;
    assert!(insert.is_fulfilled());
    conn.assert_expectations_fulfilled()?;
    Ok(())
}

#[test]
fn test_rollback() -> anyhow::Result<()> {
    let conn = connection();
    conn.expect_begin_transaction()?;
    conn.expect_rollback()?;
    conn.begin_transaction()?;
    assert!(conn.rollback()?);
    assert!(!conn.in_transaction());
    Ok(())
}

#[test]
fn test_nested_begin_is_an_error() -> anyhow::Result<()> {
    let conn = connection();
    conn.expect_begin_transaction()?;
    conn.begin_transaction()?;

    let err = conn.begin_transaction().unwrap_err();
    let exception = err.exception().expect("PDOException");
    assert_eq!(exception.message, "There is already an active transaction");
    assert!(conn.in_transaction());
    Ok(())
}

#[test]
fn test_commit_without_transaction_is_an_error() {
    // Raised whatever the error mode
    let conn = connection_with_errmode(ErrorMode::Silent);
    let err = conn.commit().unwrap_err();
    assert_eq!(
        err.exception().map(|e| e.message.as_str()),
        Some("There is no active transaction")
    );
    assert!(conn.rollback().is_err());
}

#[test]
fn test_unexpected_transaction_call_fails() {
    let conn = connection();
    conn.expect("select 1");
    let err = conn.begin_transaction().unwrap_err();
    assert!(err.is_expectation_failure());
    assert!(!conn.in_transaction());
}

#[test]
fn test_transaction_calls_in_wrong_order_fail() -> anyhow::Result<()> {
    let conn = connection();
    conn.expect_begin_transaction()?;
    conn.expect_rollback()?;
    conn.begin_transaction()?;
    assert!(conn.commit().unwrap_err().is_expectation_failure());
    Ok(())
}

#[test]
fn test_ignore_transactions() -> anyhow::Result<()> {
    let conn = connection();
    conn.ignore_transactions(true)?;
    conn.expect("delete from books").affecting(2);

    conn.begin_transaction()?;
    assert!(conn.in_transaction());
    conn.exec("delete from books")?;
    conn.commit()?;
    conn.assert_expectations_fulfilled()?;

    // Nesting rules still apply
    assert!(conn.commit().is_err());
    assert!(matches!(
        conn.expect_begin_transaction(),
        Err(PdoError::InvalidArgument(_))
    ));
    Ok(())
}

#[test]
fn test_ignore_rejected_with_queued_transaction_expectations() -> anyhow::Result<()> {
    let conn = connection();
    conn.expect_begin_transaction()?;
    assert!(matches!(
        conn.ignore_transactions(true),
        Err(PdoError::InvalidArgument(_))
    ));
    Ok(())
}

#[test]
fn test_failed_commit_keeps_transaction_open() -> anyhow::Result<()> {
    let conn = connection_with_errmode(ErrorMode::Silent);
    conn.expect_begin_transaction()?;
    conn.expect_commit()?
        .and_fail_on_execute(db_error("40001", 1213, "Deadlock found"));

    conn.begin_transaction()?;
    assert!(!conn.commit()?);
    assert!(conn.in_transaction());
    assert_eq!(conn.error_code().as_deref(), Some("40001"));
    Ok(())
}
