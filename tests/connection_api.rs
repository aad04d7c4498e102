// Connection and Statement API Tests
//
// Attributes, DSN handling, quoting, insert ids and statement bookkeeping.

mod common;

use common::{books, connection, str_of};
use pdo_mock::prelude::*;

// ============================================================================
// Connection
// ============================================================================

#[test]
fn test_from_dsn() -> anyhow::Result<()> {
    let conn = MockConnection::from_dsn("pgsql:host=db;dbname=app;server_version=16.2")?;
    assert_eq!(
        conn.get_attribute(Attribute::DriverName)?,
        Val::from("pgsql")
    );
    assert_eq!(
        conn.get_attribute(Attribute::ServerVersion)?,
        Val::from("16.2")
    );
    assert_eq!(
        conn.get_attribute(Attribute::ClientVersion)?,
        Val::from("1.0.0")
    );

    assert!(matches!(
        MockConnection::from_dsn(""),
        Err(PdoError::InvalidArgument(_))
    ));
    Ok(())
}

#[test]
fn test_available_drivers() {
    assert_eq!(MockConnection::available_drivers(), ["mock"]);
}

#[test]
fn test_generic_attributes_are_stored() -> anyhow::Result<()> {
    let conn = connection();
    assert_eq!(conn.get_attribute(Attribute::Timeout)?, Val::Null);
    conn.set_attribute(Attribute::Timeout, 30)?;
    assert_eq!(conn.get_attribute(Attribute::Timeout)?, Val::Int(30));

    conn.set_attribute(Attribute::Autocommit, false)?;
    assert_eq!(conn.get_attribute(Attribute::Autocommit)?, Val::Bool(false));
    Ok(())
}

#[test]
fn test_default_fetch_mode_validation() -> anyhow::Result<()> {
    let conn = connection();
    assert_eq!(
        conn.get_attribute(Attribute::DefaultFetchMode)?,
        Val::Int(consts::FETCH_BOTH)
    );
    conn.set_attribute(Attribute::DefaultFetchMode, consts::FETCH_OBJ)?;
    assert_eq!(
        conn.get_attribute(Attribute::DefaultFetchMode)?,
        Val::Int(consts::FETCH_OBJ)
    );
    assert!(conn
        .set_attribute(Attribute::DefaultFetchMode, consts::FETCH_CLASS)
        .is_err());
    assert!(conn
        .set_attribute(Attribute::DefaultFetchMode, consts::FETCH_INTO)
        .is_err());
    Ok(())
}

#[test]
fn test_quote() {
    let conn = connection();
    assert_eq!(conn.quote("it's", ParamType::Str), "'it''s'");
    assert_eq!(conn.quote("", ParamType::Str), "''");
}

#[test]
fn test_last_insert_id() -> anyhow::Result<()> {
    let conn = connection();
    assert_eq!(conn.last_insert_id(None)?, "0");

    conn.expect("insert into books (title) values ('Dune')")
        .with_insert_id(12)
        .affecting(1);
    conn.exec("insert into books (title) values ('Dune')")?;
    assert_eq!(conn.last_insert_id(None)?, "12");

    conn.expect("insert into books (title) values (?)")
        .with_insert_id("abc-1");
    let mut stmt = conn
        .prepare("insert into books (title) values (?)")?
        .expect("statement");
    stmt.execute(Some(&ArrayData::list(["Emma"])))?;
    assert_eq!(conn.last_insert_id(Some("books_id_seq"))?, "abc-1");
    Ok(())
}

#[test]
fn test_exec_reports_affected_rows() -> anyhow::Result<()> {
    let conn = connection();
    conn.expect("delete from books");
    conn.expect("delete from books where id > 1").affecting(2);
    assert_eq!(conn.exec("delete from books")?, Some(0));
    assert_eq!(conn.exec("delete from books where id > 1")?, Some(2));
    Ok(())
}

#[test]
fn test_query_returns_executed_statement() -> anyhow::Result<()> {
    let conn = connection();
    conn.expect("select * from books").and_fetch(books());
    let mut stmt = conn
        .query("select * from books", Some(consts::FETCH_COLUMN), FetchArgs::Column(1))?
        .expect("statement");
    assert!(!stmt.is_prepared());
    assert_eq!(stmt.column_count(), 4);
    assert_eq!(stmt.fetch(None)?, Some(Val::from("Dune")));
    Ok(())
}

#[test]
fn test_clones_share_connection() -> anyhow::Result<()> {
    let conn = connection();
    let other = conn.clone();
    other.expect("select 1");
    conn.exec("select 1")?;
    other.assert_expectations_fulfilled()?;
    Ok(())
}

// ============================================================================
// Statement
// ============================================================================

#[test]
fn test_row_count_only_after_execute() -> anyhow::Result<()> {
    let conn = connection();
    conn.expect("update books set price = 1").affecting(7);
    let mut stmt = conn
        .prepare("update books set price = 1")?
        .expect("statement");
    assert_eq!(stmt.row_count(), 0);
    stmt.execute(None)?;
    assert_eq!(stmt.row_count(), 7);
    Ok(())
}

#[test]
fn test_bind_param_is_read_at_execute_time() -> anyhow::Result<()> {
    let conn = connection();
    conn.expect("select * from books where title = ?")
        .with(["Dune"]);
    conn.expect("select * from books where title = ?")
        .with(["Emma"]);

    let mut stmt = conn
        .prepare("select * from books where title = ?")?
        .expect("statement");
    let title = VarRef::new("Dune");
    stmt.bind_param(1usize, &title, ParamType::Str)?;
    stmt.execute(None)?;
    title.set("Emma");
    stmt.execute(None)?;
    conn.assert_expectations_fulfilled()?;
    Ok(())
}

#[test]
fn test_expectation_records_executed_query() -> anyhow::Result<()> {
    let conn = connection();
    let expectation = conn.expect("select * from books where id = {{\\d+}}");
    let mut stmt = conn
        .prepare("select * from books where id = 5")?
        .expect("statement");
    stmt.execute(None)?;
    assert_eq!(
        expectation.executed_query().as_deref(),
        Some("select * from books where id = 5")
    );
    assert!(stmt.expectation().is_some_and(|e| e.ptr_eq(&expectation)));
    Ok(())
}

#[test]
fn test_debug_dump_params() -> anyhow::Result<()> {
    let conn = connection();
    let mut stmt = conn
        .prepare("select * from books where id = ?")?
        .expect("statement");
    stmt.bind_value(1usize, 5, ParamType::Int)?;
    assert_eq!(
        stmt.debug_dump_params(),
        "SQL: [32] select * from books where id = ?\n\
         Params:  1\n\
         Key: Position #0:\n\
         paramno=0\n\
         name=[0] \"\"\n\
         is_param=1\n\
         param_type=1\n"
    );
    Ok(())
}

#[test]
fn test_fetch_object_with_registered_class() -> anyhow::Result<()> {
    let conn = connection();
    conn.register_class(ClassDef::new("Book").with_property("read", false));
    conn.expect("select * from books").and_fetch(books());
    let mut stmt = conn.prepare("select * from books")?.expect("statement");
    stmt.execute(None)?;

    let book = stmt.fetch_object(Some("book"), Vec::new())?.expect("row");
    assert_eq!(book.class_name(), "Book");
    assert_eq!(book.get("read"), Some(Val::Bool(false)));
    assert_eq!(str_of(book.get("title").as_ref()), "Dune");

    // No constructor: arguments are rejected
    assert!(matches!(
        stmt.fetch_object(Some("Book"), vec![Val::Int(1)]),
        Err(PdoError::Value(_))
    ));
    Ok(())
}
