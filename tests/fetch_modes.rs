// Fetch Mode Tests
//
// Output shapes of fetch/fetchAll/fetchColumn/fetchObject per fetch mode,
// and the connection attributes that affect fetched values.

mod common;

use common::{books, connection};
use pdo_mock::prelude::*;

fn executed(conn: &MockConnection, rs: ResultSet) -> anyhow::Result<MockStatement> {
    conn.expect("select * from books").and_fetch(rs);
    let mut stmt = conn.prepare("select * from books")?.expect("statement");
    stmt.execute(None)?;
    Ok(stmt)
}

// ============================================================================
// Array modes
// ============================================================================

#[test]
fn test_fetch_assoc_num_both() -> anyhow::Result<()> {
    let conn = connection();
    let mut stmt = executed(&conn, books())?;

    let assoc = stmt.fetch(Some(consts::FETCH_ASSOC))?.expect("row");
    assert_eq!(assoc.get("title"), Some(&Val::from("Dune")));
    assert_eq!(assoc.as_array().map(ArrayData::len), Some(4));

    let num = stmt.fetch(Some(consts::FETCH_NUM))?.expect("row");
    assert_eq!(num.get(1), Some(&Val::from("Emma")));
    assert_eq!(num.get("title"), None);

    let both = stmt.fetch(Some(consts::FETCH_BOTH))?.expect("row");
    assert_eq!(both.get(0), Some(&Val::Int(3)));
    assert_eq!(both.get("id"), Some(&Val::Int(3)));
    assert_eq!(both.as_array().map(ArrayData::len), Some(8));

    assert_eq!(stmt.fetch(None)?, None);
    Ok(())
}

#[test]
fn test_default_mode_is_both() -> anyhow::Result<()> {
    let conn = connection();
    let mut stmt = executed(&conn, books())?;
    let row = stmt.fetch(None)?.expect("row");
    assert_eq!(row.as_array().map(ArrayData::len), Some(8));
    Ok(())
}

#[test]
fn test_connection_default_fetch_mode() -> anyhow::Result<()> {
    let conn = connection();
    conn.set_attribute(Attribute::DefaultFetchMode, consts::FETCH_NUM)?;
    let mut stmt = executed(&conn, books())?;
    let row = stmt.fetch(None)?.expect("row");
    assert_eq!(row.get(0), Some(&Val::Int(1)));
    assert_eq!(row.as_array().map(ArrayData::len), Some(4));
    Ok(())
}

#[test]
fn test_fetch_named_keeps_duplicates() -> anyhow::Result<()> {
    let conn = connection();
    let rs = ResultSet::new(["id", "name", "name"]).add_row([
        Val::Int(1),
        Val::from("a"),
        Val::from("b"),
    ]);
    let mut stmt = executed(&conn, rs)?;
    let row = stmt.fetch(Some(consts::FETCH_NAMED))?.expect("row");
    assert_eq!(
        row.get("name"),
        Some(&Val::Array(ArrayData::list(["a", "b"])))
    );
    Ok(())
}

#[test]
fn test_fetch_all_column_and_key_pair() -> anyhow::Result<()> {
    let conn = connection();
    let mut stmt = executed(&conn, books())?;
    let titles = stmt.fetch_all(Some(consts::FETCH_COLUMN), FetchArgs::Column(1))?;
    assert_eq!(titles, ArrayData::list(["Dune", "Emma", "Ulysses"]));

    let rs = ResultSet::new(["id", "title"])
        .with_rows([[Val::Int(1), Val::from("Dune")], [Val::Int(2), Val::from("Emma")]]);
    let mut stmt = executed(&conn, rs)?;
    let pairs = stmt.fetch_all(Some(consts::FETCH_KEY_PAIR), FetchArgs::None)?;
    assert_eq!(pairs.get(2), Some(&Val::from("Emma")));

    let mut stmt = executed(&conn, books())?;
    assert!(stmt
        .fetch_all(Some(consts::FETCH_KEY_PAIR), FetchArgs::None)
        .is_err());
    Ok(())
}

#[test]
fn test_integer_keys_at_int_max() -> anyhow::Result<()> {
    let conn = connection();
    let rs = ResultSet::new(["id", "title"])
        .with_rows([[Val::Int(i64::MAX), Val::from("x")], [Val::Int(1), Val::from("y")]]);
    let mut stmt = executed(&conn, rs)?;
    let pairs = stmt.fetch_all(Some(consts::FETCH_KEY_PAIR), FetchArgs::None)?;
    assert_eq!(pairs.len(), 2);
    assert_eq!(pairs.get(i64::MAX), Some(&Val::from("x")));
    assert_eq!(pairs.get(1), Some(&Val::from("y")));

    let rs = ResultSet::new(["id", "name"])
        .with_rows([[Val::Int(i64::MAX), Val::from("a")], [Val::Int(i64::MAX), Val::from("b")]]);
    let mut stmt = executed(&conn, rs)?;
    let grouped = stmt.fetch_all(
        Some(consts::FETCH_COLUMN | consts::FETCH_GROUP),
        FetchArgs::None,
    )?;
    assert_eq!(
        grouped.get(i64::MAX),
        Some(&Val::Array(ArrayData::list(["a", "b"])))
    );
    Ok(())
}

#[test]
fn test_fetch_all_group_and_unique() -> anyhow::Result<()> {
    let conn = connection();
    let rs = ResultSet::new(["dept", "name"]).with_rows([
        ["eng", "ann"],
        ["ops", "bob"],
        ["eng", "cid"],
    ]);
    let mut stmt = executed(&conn, rs)?;
    let grouped = stmt.fetch_all(
        Some(consts::FETCH_COLUMN | consts::FETCH_GROUP),
        FetchArgs::None,
    )?;
    assert_eq!(
        grouped.get("eng"),
        Some(&Val::Array(ArrayData::list(["ann", "cid"])))
    );
    assert_eq!(grouped.len(), 2);

    let rs = ResultSet::new(["id", "name"]).with_rows([[Val::Int(1), Val::from("a")]]);
    let mut stmt = executed(&conn, rs)?;
    let unique = stmt.fetch_all(
        Some(consts::FETCH_ASSOC | consts::FETCH_UNIQUE),
        FetchArgs::None,
    )?;
    assert_eq!(
        unique.get(1),
        Some(&Val::Array(ArrayData::assoc([("name", "a")])))
    );
    Ok(())
}

#[test]
fn test_fetch_all_func() -> anyhow::Result<()> {
    let conn = connection();
    let mut stmt = executed(&conn, books())?;
    let labels = stmt.fetch_all(
        Some(consts::FETCH_FUNC),
        FetchArgs::func(|cols| {
            Ok(Val::from(format!(
                "{} by {}",
                cols[1].to_php_string(),
                cols[2].to_php_string()
            )))
        }),
    )?;
    assert_eq!(labels.get(0), Some(&Val::from("Dune by Herbert")));

    let mut stmt = executed(&conn, books())?;
    assert!(stmt.fetch(Some(consts::FETCH_FUNC)).is_err());
    Ok(())
}

#[test]
fn test_fetch_all_rejects_lazy() -> anyhow::Result<()> {
    let conn = connection();
    let mut stmt = executed(&conn, books())?;
    let err = stmt
        .fetch_all(Some(consts::FETCH_LAZY), FetchArgs::None)
        .unwrap_err();
    assert!(matches!(err, PdoError::Value(_)));

    let lazy = stmt.fetch(Some(consts::FETCH_LAZY))?.expect("row");
    assert_eq!(
        lazy.as_object().map(ObjectRef::class_name).as_deref(),
        Some("PDORow")
    );
    Ok(())
}

#[test]
fn test_invalid_fetch_mode() -> anyhow::Result<()> {
    let conn = connection();
    let mut stmt = executed(&conn, books())?;
    assert!(matches!(stmt.fetch(Some(99)), Err(PdoError::Value(_))));
    assert!(matches!(
        stmt.fetch(Some(consts::FETCH_ASSOC | consts::FETCH_SERIALIZE)),
        Err(PdoError::Value(_))
    ));
    Ok(())
}

// ============================================================================
// Object modes
// ============================================================================

#[test]
fn test_fetch_obj_and_fetch_object() -> anyhow::Result<()> {
    let conn = connection();
    let mut stmt = executed(&conn, books())?;
    let obj = stmt.fetch(Some(consts::FETCH_OBJ))?.expect("row");
    assert_eq!(
        obj.as_object().map(ObjectRef::class_name).as_deref(),
        Some("stdClass")
    );
    assert_eq!(obj.prop("author"), Some(Val::from("Herbert")));

    let obj = stmt.fetch_object(None, Vec::new())?.expect("row");
    assert_eq!(obj.get("title"), Some(Val::from("Emma")));

    assert!(stmt.fetch_object(Some("Missing"), Vec::new()).is_err());
    Ok(())
}

#[test]
fn test_fetch_class_early_and_late_props() -> anyhow::Result<()> {
    let conn = connection();
    conn.register_class(
        ClassDef::new("Book")
            .with_property("label", "")
            .with_constructor(|obj, args| {
                let prefix = args.first().map(Val::to_php_string).unwrap_or_default();
                let title = obj.get("title").unwrap_or_default().to_php_string();
                obj.set("label", format!("{}{}", prefix, title));
                Ok(())
            }),
    );

    let mut stmt = executed(&conn, books())?;
    let early = stmt.fetch_all(
        Some(consts::FETCH_CLASS),
        FetchArgs::class_with_args("Book", vec![Val::from("#")]),
    )?;
    let first = early.get(0).expect("row");
    assert_eq!(
        first.as_object().map(ObjectRef::class_name).as_deref(),
        Some("Book")
    );
    assert_eq!(first.prop("label"), Some(Val::from("#Dune")));

    let mut stmt = executed(&conn, books())?;
    stmt.set_fetch_mode(
        consts::FETCH_CLASS | consts::FETCH_PROPS_LATE,
        FetchArgs::class_with_args("Book", vec![Val::from("#")]),
    )?;
    let late = stmt.fetch(None)?.expect("row");
    // The constructor ran before the title was assigned
    assert_eq!(late.prop("label"), Some(Val::from("#")));
    assert_eq!(late.prop("title"), Some(Val::from("Dune")));
    Ok(())
}

#[test]
fn test_fetch_classtype() -> anyhow::Result<()> {
    let conn = connection();
    conn.register_class(ClassDef::new("Admin"));
    let rs = ResultSet::new(["kind", "name"]).with_rows([["Admin", "ann"], ["Guest", "bob"]]);
    let mut stmt = executed(&conn, rs)?;
    let users = stmt.fetch_all(
        Some(consts::FETCH_CLASS | consts::FETCH_CLASSTYPE),
        FetchArgs::None,
    )?;
    let classes: Vec<String> = users
        .values()
        .filter_map(|u| u.as_object().map(ObjectRef::class_name))
        .collect();
    assert_eq!(classes, ["Admin", "stdClass"]);
    assert_eq!(
        users.get(1).and_then(|u| u.prop("name")),
        Some(Val::from("bob"))
    );
    Ok(())
}

#[test]
fn test_fetch_into_updates_object() -> anyhow::Result<()> {
    let conn = connection();
    let target = ObjectRef::std_class();
    let mut stmt = executed(&conn, books())?;
    stmt.set_fetch_mode(consts::FETCH_INTO, FetchArgs::Into(target.clone()))?;
    stmt.fetch(None)?;
    assert_eq!(target.get("title"), Some(Val::from("Dune")));
    stmt.fetch(None)?;
    assert_eq!(target.get("title"), Some(Val::from("Emma")));
    Ok(())
}

// ============================================================================
// Bound columns and fetchColumn
// ============================================================================

#[test]
fn test_fetch_bound_writes_through_references() -> anyhow::Result<()> {
    let conn = connection();
    let mut stmt = executed(&conn, books())?;
    let id = VarRef::default();
    let title = VarRef::default();
    stmt.bind_column(1usize, &id, Some(ParamType::Int))?;
    stmt.bind_column(":title", &title, None)?;

    let mut seen = Vec::new();
    while stmt.fetch(Some(consts::FETCH_BOUND))?.is_some() {
        seen.push(format!("{}:{}", id.get(), title.get()));
    }
    assert_eq!(seen, ["1:Dune", "2:Emma", "3:Ulysses"]);
    Ok(())
}

#[test]
fn test_fetch_bound_invalid_column() -> anyhow::Result<()> {
    let conn = connection();
    let mut stmt = executed(&conn, books())?;
    stmt.bind_column(9usize, &VarRef::default(), None)?;
    assert!(matches!(
        stmt.fetch(Some(consts::FETCH_BOUND)),
        Err(PdoError::Value(_))
    ));
    Ok(())
}

#[test]
fn test_fetch_column() -> anyhow::Result<()> {
    let conn = connection();
    let mut stmt = executed(&conn, books())?;
    assert_eq!(stmt.fetch_column(1)?, Some(Val::from("Dune")));
    assert_eq!(stmt.fetch_column(0)?, Some(Val::Int(2)));
    assert!(stmt.fetch_column(8).is_err());
    assert_eq!(stmt.fetch_column(0)?, None);
    Ok(())
}

#[test]
fn test_row_arity_checked_at_fetch() -> anyhow::Result<()> {
    let conn = connection();
    let rs = ResultSet::new(["id", "title"]).with_rows([vec![Val::Int(1)]]);
    let mut stmt = executed(&conn, rs)?;
    assert!(matches!(
        stmt.fetch(Some(consts::FETCH_ASSOC)),
        Err(PdoError::Value(_))
    ));

    let rs = ResultSet::new(["id", "title"]).with_rows([vec![Val::Int(1)]]);
    let mut stmt = executed(&conn, rs)?;
    let row = stmt.fetch(Some(consts::FETCH_NUM))?.expect("row");
    assert_eq!(row.as_array().map(ArrayData::len), Some(1));
    Ok(())
}

// ============================================================================
// Value casting attributes
// ============================================================================

#[test]
fn test_case_folding() -> anyhow::Result<()> {
    let conn = connection();
    conn.set_attribute(Attribute::Case, consts::CASE_UPPER)?;
    let mut stmt = executed(&conn, books())?;
    let row = stmt.fetch(Some(consts::FETCH_ASSOC))?.expect("row");
    assert_eq!(row.get("TITLE"), Some(&Val::from("Dune")));
    assert_eq!(row.get("title"), None);
    Ok(())
}

#[test]
fn test_oracle_nulls() -> anyhow::Result<()> {
    let conn = connection();
    conn.set_attribute(Attribute::OracleNulls, consts::NULL_TO_STRING)?;
    let mut stmt = executed(&conn, books())?;
    let rows = stmt.fetch_all(Some(consts::FETCH_ASSOC), FetchArgs::None)?;
    assert_eq!(
        rows.get(2).and_then(|r| r.get("price")),
        Some(&Val::from(""))
    );

    conn.set_attribute(Attribute::OracleNulls, consts::NULL_EMPTY_STRING)?;
    let rs = ResultSet::new(["note"]).with_rows([[""]]);
    let mut stmt = executed(&conn, rs)?;
    assert_eq!(stmt.fetch_column(0)?, Some(Val::Null));
    Ok(())
}

#[test]
fn test_stringify_fetches() -> anyhow::Result<()> {
    let conn = connection();
    conn.set_attribute(Attribute::StringifyFetches, true)?;
    let mut stmt = executed(&conn, books())?;
    let row = stmt.fetch(Some(consts::FETCH_ASSOC))?.expect("row");
    assert_eq!(row.get("id"), Some(&Val::from("1")));
    assert_eq!(row.get("price"), Some(&Val::from("9.5")));

    let id = VarRef::default();
    stmt.bind_column("id", &id, Some(ParamType::Int))?;
    stmt.fetch(Some(consts::FETCH_BOUND))?;
    // Stringify wins over the declared column type
    assert_eq!(id.get(), Val::from("2"));

    let row = stmt.fetch(Some(consts::FETCH_ASSOC))?.expect("row");
    assert_eq!(row.get("price"), Some(&Val::Null));
    Ok(())
}

#[test]
fn test_stringify_booleans() -> anyhow::Result<()> {
    let conn = connection();
    conn.set_attribute(Attribute::StringifyFetches, true)?;
    let rs = ResultSet::new(["active"]).with_rows([[false], [true]]);
    let mut stmt = executed(&conn, rs)?;
    assert_eq!(stmt.fetch_column(0)?, Some(Val::from("0")));
    assert_eq!(stmt.fetch_column(0)?, Some(Val::from("1")));
    Ok(())
}

#[test]
fn test_stringify_with_declared_bound_types() -> anyhow::Result<()> {
    let conn = connection();
    conn.set_attribute(Attribute::StringifyFetches, true)?;
    let rs = ResultSet::new(["flag", "label"]).with_rows([
        [Val::Int(0), Val::Bool(false)],
        [Val::from("yes"), Val::Bool(true)],
    ]);
    let mut stmt = executed(&conn, rs)?;
    let flag = VarRef::default();
    let label = VarRef::default();
    stmt.bind_column("flag", &flag, Some(ParamType::Bool))?;
    stmt.bind_column("label", &label, Some(ParamType::Str))?;

    // Declared type first, then stringified
    stmt.fetch(Some(consts::FETCH_BOUND))?;
    assert_eq!(flag.get(), Val::from("0"));
    assert_eq!(label.get(), Val::from(""));

    stmt.fetch(Some(consts::FETCH_BOUND))?;
    assert_eq!(flag.get(), Val::from("1"));
    assert_eq!(label.get(), Val::from("1"));
    Ok(())
}

// ============================================================================
// Result set sources
// ============================================================================

#[test]
fn test_json_and_row_fixtures() -> anyhow::Result<()> {
    let conn = connection();
    conn.expect("select * from books")
        .and_fetch_json(r#"[{"id": 1, "title": "Dune"}, {"id": 2, "title": "Emma"}]"#)?;
    let mut stmt = conn.prepare("select * from books")?.expect("statement");
    stmt.execute(None)?;
    assert_eq!(stmt.column_count(), 2);
    assert_eq!(stmt.row_count(), 2);
    let rows = stmt.fetch_all(Some(consts::FETCH_ASSOC), FetchArgs::None)?;
    assert_eq!(
        rows.get(1).and_then(|r| r.get("title")),
        Some(&Val::from("Emma"))
    );

    conn.expect("select * from books").and_fetch_row(ArrayData::assoc([
        ("id", Val::Int(9)),
        ("title", Val::from("Ulysses")),
    ]))?;
    let stmt = conn.query("select * from books", Some(consts::FETCH_NUM), FetchArgs::None)?;
    let mut stmt = stmt.expect("statement");
    assert_eq!(
        stmt.fetch(None)?.and_then(|r| r.get(0).cloned()),
        Some(Val::Int(9))
    );
    Ok(())
}

#[test]
fn test_row_fixtures_with_reordered_keys() -> anyhow::Result<()> {
    let conn = connection();
    conn.expect("select * from books").and_fetch_rows([
        ArrayData::assoc([("id", Val::Int(1)), ("title", Val::from("A"))]),
        ArrayData::assoc([("title", Val::from("B")), ("id", Val::Int(2))]),
    ])?;
    let mut stmt = conn.prepare("select * from books")?.expect("statement");
    stmt.execute(None)?;
    let rows = stmt.fetch_all(Some(consts::FETCH_ASSOC), FetchArgs::None)?;
    assert_eq!(rows.get(1).and_then(|r| r.get("id")), Some(&Val::Int(2)));
    assert_eq!(
        rows.get(1).and_then(|r| r.get("title")),
        Some(&Val::from("B"))
    );

    let mismatched = conn.expect("select * from books").and_fetch_rows([
        ArrayData::assoc([("id", Val::Int(1))]),
        ArrayData::assoc([("name", Val::from("B"))]),
    ]);
    assert!(matches!(mismatched, Err(PdoError::InvalidArgument(_))));
    Ok(())
}

#[test]
fn test_lazy_result_set() -> anyhow::Result<()> {
    let conn = connection();
    let rows = (1..=1000).map(|i| vec![Val::Int(i)]);
    let rs = ResultSet::lazy(["n"], rows);
    let mut stmt = executed(&conn, rs)?;
    // Unknown size until consumed
    assert_eq!(stmt.row_count(), 0);
    assert_eq!(stmt.fetch_column(0)?, Some(Val::Int(1)));
    let rest = stmt.fetch_all(Some(consts::FETCH_COLUMN), FetchArgs::None)?;
    assert_eq!(rest.len(), 999);
    Ok(())
}

#[test]
fn test_close_cursor_and_reexecute() -> anyhow::Result<()> {
    let conn = connection();
    conn.expect("select * from books").and_fetch(books());
    conn.expect("select * from books").and_fetch(books());
    let mut stmt = conn.prepare("select * from books")?.expect("statement");

    stmt.execute(None)?;
    stmt.fetch(None)?;
    assert!(stmt.close_cursor());
    assert_eq!(stmt.fetch(None)?, None);

    stmt.execute(None)?;
    let row = stmt.fetch(Some(consts::FETCH_ASSOC))?.expect("row");
    assert_eq!(row.get("id"), Some(&Val::Int(1)));
    assert_eq!(stmt.query_string(), "select * from books");
    Ok(())
}
