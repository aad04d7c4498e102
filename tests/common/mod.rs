//! Common test helpers for mock PDO tests

#![allow(dead_code)]

use pdo_mock::prelude::*;

/// Connection with default configuration (ERRMODE_EXCEPTION)
pub fn connection() -> MockConnection {
    MockConnection::new()
}

/// Connection in the given error mode
pub fn connection_with_errmode(mode: ErrorMode) -> MockConnection {
    MockConnection::with_config(MockConfig::default().with_error_mode(mode))
}

/// `id`, `title`, `author`, `price` with three rows
pub fn books() -> ResultSet {
    ResultSet::new(["id", "title", "author", "price"])
        .add_row([Val::Int(1), Val::from("Dune"), Val::from("Herbert"), Val::Float(9.5)])
        .add_row([Val::Int(2), Val::from("Emma"), Val::from("Austen"), Val::Float(7.0)])
        .add_row([Val::Int(3), Val::from("Ulysses"), Val::from("Joyce"), Val::Null])
}

/// Error raised by the database, as `andFailOnExecute` expects it
pub fn db_error(sqlstate: &str, code: i64, message: &str) -> PdoException {
    PdoException::new("").with_error_info(sqlstate, Some(code), Some(message))
}

/// String value of an array element or object property
pub fn str_of(value: Option<&Val>) -> String {
    value.map(Val::to_php_string).unwrap_or_default()
}
