//! PDO Driver Traits
//!
//! The API surface application code is written against. `MockConnection` and
//! `MockStatement` implement it, so code generic over these traits runs
//! unchanged against the mock.
//!
//! Return values follow PHP: `Ok(None)`/`Ok(false)` is PHP's `false`
//! sentinel in SILENT and WARNING mode, `Err` is a thrown error.
//!
//! Reference: $PHP_SRC_PATH/ext/pdo/php_pdo_driver.h

use super::error::PdoError;
use super::types::{Attribute, ErrorInfo, FetchArgs, ParamIdentifier, ParamType};
use crate::core::value::{ArrayData, ObjectRef, Val, VarRef};

/// PDO connection trait
/// Reference: pdo_dbh_t structure and pdo_dbh_methods
pub trait PdoConnection {
    type Statement: PdoStatement;

    /// Prepare a SQL statement
    /// Reference: pdo_dbh_prepare_func
    fn prepare(&self, sql: &str) -> Result<Option<Self::Statement>, PdoError>;

    /// Execute a statement (no result set) and return affected rows
    /// Reference: pdo_dbh_do_func
    fn exec(&self, sql: &str) -> Result<Option<i64>, PdoError>;

    /// Prepare and execute in one step, optionally setting the fetch mode
    fn query(
        &self,
        sql: &str,
        fetch_mode: Option<i64>,
        args: FetchArgs,
    ) -> Result<Option<Self::Statement>, PdoError>;

    /// Quote a string for safe SQL inclusion
    /// Reference: pdo_dbh_quote_func
    fn quote(&self, value: &str, param_type: ParamType) -> String;

    /// Reference: pdo_dbh_txn_func (beginTransaction)
    fn begin_transaction(&self) -> Result<bool, PdoError>;

    /// Reference: pdo_dbh_txn_func (commit)
    fn commit(&self) -> Result<bool, PdoError>;

    /// Reference: pdo_dbh_txn_func (rollback)
    fn rollback(&self) -> Result<bool, PdoError>;

    fn in_transaction(&self) -> bool;

    /// Reference: pdo_dbh_last_id_func
    fn last_insert_id(&self, name: Option<&str>) -> Result<String, PdoError>;

    /// Reference: pdo_dbh_set_attr_func
    fn set_attribute(&self, attr: Attribute, value: impl Into<Val>) -> Result<bool, PdoError>;

    fn get_attribute(&self, attr: Attribute) -> Result<Val, PdoError>;

    /// SQLSTATE of the last operation, `None` before any operation ran
    fn error_code(&self) -> Option<String>;

    /// Error information (SQLSTATE, driver code, driver message)
    fn error_info(&self) -> ErrorInfo;
}

/// PDO statement trait
/// Reference: pdo_stmt_t structure and pdo_stmt_methods
pub trait PdoStatement {
    /// Bind a value by 1-based position or name
    /// Reference: pdo_stmt_param_hook_func
    fn bind_value(
        &mut self,
        param: impl Into<ParamIdentifier>,
        value: impl Into<Val>,
        param_type: ParamType,
    ) -> Result<bool, PdoError>;

    /// Bind a variable by reference; its value is read at execute time
    fn bind_param(
        &mut self,
        param: impl Into<ParamIdentifier>,
        var: &VarRef,
        param_type: ParamType,
    ) -> Result<bool, PdoError>;

    /// Bind an output variable for FETCH_BOUND
    fn bind_column(
        &mut self,
        column: impl Into<ParamIdentifier>,
        var: &VarRef,
        param_type: Option<ParamType>,
    ) -> Result<bool, PdoError>;

    /// Execute the prepared statement
    /// Reference: pdo_stmt_execute_func
    fn execute(&mut self, params: Option<&ArrayData>) -> Result<bool, PdoError>;

    /// Fetch the next row, `None` when there is none
    /// Reference: pdo_stmt_fetch_func
    fn fetch(&mut self, fetch_mode: Option<i64>) -> Result<Option<Val>, PdoError>;

    /// Fetch all remaining rows
    fn fetch_all(&mut self, fetch_mode: Option<i64>, args: FetchArgs)
    -> Result<ArrayData, PdoError>;

    /// Single column of the next row
    fn fetch_column(&mut self, column: usize) -> Result<Option<Val>, PdoError>;

    /// Next row as an instance of `class` (stdClass when `None`)
    fn fetch_object(
        &mut self,
        class: Option<&str>,
        ctor_args: Vec<Val>,
    ) -> Result<Option<ObjectRef>, PdoError>;

    fn set_fetch_mode(&mut self, fetch_mode: i64, args: FetchArgs) -> Result<bool, PdoError>;

    /// Get number of rows affected by last DELETE, INSERT, or UPDATE
    fn row_count(&self) -> i64;

    /// Get number of columns in result set
    fn column_count(&self) -> usize;

    fn close_cursor(&mut self) -> bool;

    fn query_string(&self) -> &str;

    /// SQLSTATE of the last operation, `None` before execute
    fn error_code(&self) -> Option<String>;

    /// Error information (SQLSTATE, driver code, driver message)
    fn error_info(&self) -> ErrorInfo;
}
