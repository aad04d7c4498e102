//! Mock PDO statement
//!
//! A `MockStatement` is handed out by `MockConnection::prepare`/`query`. It
//! stores bindings until `execute`, which pulls the next expectation, checks
//! it and switches the cursor to the expectation's result set.
//!
//! Reference: $PHP_SRC_PATH/ext/pdo/pdo_stmt.c

use super::connection::ConnectionState;
use super::expectation::Expectation;
use super::fetch::{self, FetchContext};
use super::manager::ExpectationManager;
use super::result_set::RowIterator;
use crate::core::value::{ArrayData, ObjectRef, Val, VarRef};
use crate::pdo::driver::PdoStatement;
use crate::pdo::error::PdoError;
use crate::pdo::object::ClassDef;
use crate::pdo::types::{
    ErrorInfo, FetchArgs, FetchFlags, FetchMode, FetchStyle, Param, ParamIdentifier, ParamSet,
    ParamType,
};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt::Write;
use std::rc::Rc;
use tracing::debug;

#[derive(Debug, Clone)]
enum BoundValue {
    Value(Val),
    /// bindParam: read when the statement executes
    Ref(VarRef),
}

#[derive(Debug, Clone)]
struct BoundParam {
    value: BoundValue,
    ty: ParamType,
}

#[derive(Debug, Clone)]
struct BoundColumn {
    var: VarRef,
    ty: Option<ParamType>,
}

#[derive(Debug)]
pub struct MockStatement {
    state: Rc<RefCell<ConnectionState>>,
    manager: Rc<RefCell<ExpectationManager>>,
    query: String,
    prepared: bool,
    bound_params: IndexMap<ParamIdentifier, BoundParam>,
    bound_columns: IndexMap<ParamIdentifier, BoundColumn>,
    /// setFetchMode; `None` follows the connection default
    fetch_style: Option<FetchStyle>,
    fetch_args: FetchArgs,
    cursor: Option<RowIterator>,
    columns: Vec<String>,
    executed: bool,
    row_count: i64,
    error: Option<ErrorInfo>,
    expectation: Option<Expectation>,
}

fn check_position(id: &ParamIdentifier, what: &str) -> Result<(), PdoError> {
    if *id == ParamIdentifier::Position(0) {
        return Err(PdoError::Value(format!(
            "PDOStatement::{}(): Argument #1 ($param) must be greater than or equal to 1",
            what
        )));
    }
    Ok(())
}

impl MockStatement {
    pub(crate) fn new(
        state: Rc<RefCell<ConnectionState>>,
        manager: Rc<RefCell<ExpectationManager>>,
        query: &str,
        prepared: bool,
    ) -> Self {
        Self {
            state,
            manager,
            query: query.to_string(),
            prepared,
            bound_params: IndexMap::new(),
            bound_columns: IndexMap::new(),
            fetch_style: None,
            fetch_args: FetchArgs::None,
            cursor: None,
            columns: Vec::new(),
            executed: false,
            row_count: 0,
            error: None,
            expectation: None,
        }
    }

    /// Whether the statement came from `prepare()` rather than `query()`
    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// The expectation consumed by the last execution
    pub fn expectation(&self) -> Option<&Expectation> {
        self.expectation.as_ref()
    }

    fn bound_param_set(&self) -> ParamSet {
        let mut set = ParamSet::new();
        for (id, bound) in &self.bound_params {
            let value = match &bound.value {
                BoundValue::Value(v) => v.clone(),
                BoundValue::Ref(var) => var.get(),
            };
            set.insert(id.clone(), Param::new(value, Some(bound.ty)));
        }
        set
    }

    /// Shared by `execute()` and `PDO::query()`; `call_site` prefixes warnings
    #[tracing::instrument(level = "trace", skip(self, params), fields(query = %self.query))]
    pub(crate) fn execute_from(
        &mut self,
        call_site: &str,
        params: Option<&ArrayData>,
    ) -> Result<bool, PdoError> {
        self.error = Some(ErrorInfo::success());
        self.cursor = None;
        self.executed = false;
        self.row_count = 0;

        // An explicit array replaces the bindings for this call
        let actual = match params {
            Some(arr) => ParamSet::from_array(arr),
            None => self.bound_param_set(),
        };

        let validator = self.manager.borrow().config().validator.clone();
        let expectation = self
            .manager
            .borrow_mut()
            .pull_query_expectation(&self.query)?;
        expectation.assert_query_match(validator.as_ref(), &self.query)?;
        expectation.assert_params_match(validator.as_ref(), &actual)?;
        expectation.assert_prepared_state(validator.as_ref(), self.prepared)?;
        expectation.record_execution(&self.query, actual);
        self.expectation = Some(expectation.clone());

        if let Some(exception) = expectation.execute_failure() {
            debug!(query = %self.query, "execute failure induced");
            self.error = Some(exception.error_info());
            self.state.borrow_mut().handle_failure(call_site, exception)?;
            return Ok(false);
        }

        self.row_count = expectation.row_count();
        if let Some(rs) = expectation.take_result_set() {
            self.columns = rs.columns().to_vec();
            self.cursor = Some(rs.into_cursor());
        } else {
            self.columns.clear();
        }
        if let Some(id) = expectation.insert_id() {
            self.state.borrow_mut().last_insert_id = id;
        }
        self.executed = true;
        debug!(query = %self.query, rows = self.row_count, "statement executed");
        Ok(true)
    }

    fn fetch_context(&self) -> FetchContext {
        self.state.borrow().fetch_context()
    }

    /// FETCH_DEFAULT resolves to setFetchMode, then to the connection default.
    /// Flags given alongside FETCH_DEFAULT apply to the resolved mode.
    fn resolve_style(&self, raw: Option<i64>) -> Result<FetchStyle, PdoError> {
        let style = FetchStyle::parse(raw.unwrap_or(0))?;
        if style.mode != FetchMode::Default {
            return Ok(style);
        }
        let base = self
            .fetch_style
            .unwrap_or_else(|| self.state.borrow().default_fetch);
        Ok(FetchStyle {
            mode: base.mode,
            flags: if style.flags == FetchFlags::NONE {
                base.flags
            } else {
                style.flags
            },
        })
    }

    /// Arguments stored by setFetchMode apply while the mode is unchanged
    fn stored_args(&self, style: FetchStyle) -> FetchArgs {
        match self.fetch_style {
            Some(stored) if stored.mode == style.mode => self.fetch_args.clone(),
            _ => FetchArgs::None,
        }
    }

    fn next_row(&mut self) -> Option<(usize, Vec<Val>)> {
        if !self.executed {
            return None;
        }
        let cursor = self.cursor.as_mut()?;
        let row = cursor.next_row()?;
        Some((cursor.rows_read(), row))
    }

    /// Copy the row into the bindColumn slots
    /// Reference: $PHP_SRC_PATH/ext/pdo/pdo_stmt.c - do_fetch_common
    fn fetch_bound(&self, ctx: &FetchContext, row: Vec<Val>) -> Result<(), PdoError> {
        let names = ctx.column_names(&self.columns);
        for (id, col) in &self.bound_columns {
            let index = match id {
                ParamIdentifier::Position(p) => p - 1,
                ParamIdentifier::Name(name) => names
                    .iter()
                    .position(|c| c == name)
                    .ok_or_else(|| PdoError::Value(format!("Invalid column index :{}", name)))?,
            };
            let raw = row
                .get(index)
                .cloned()
                .ok_or_else(|| PdoError::Value(format!("Invalid column index {}", index + 1)))?;
            col.var.set(ctx.cast(raw, col.ty));
        }
        Ok(())
    }

    /// PHP's `debugDumpParams()` output
    /// Reference: $PHP_SRC_PATH/ext/pdo/pdo_stmt.c - PDOStatement::debugDumpParams
    pub fn debug_dump_params(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "SQL: [{}] {}", self.query.len(), self.query);
        let _ = writeln!(out, "Params:  {}", self.bound_params.len());
        for (id, bound) in &self.bound_params {
            match id {
                ParamIdentifier::Position(p) => {
                    let _ = writeln!(out, "Key: Position #{}:", p - 1);
                    let _ = writeln!(out, "paramno={}", p - 1);
                    let _ = writeln!(out, "name=[0] \"\"");
                }
                ParamIdentifier::Name(name) => {
                    let _ = writeln!(out, "Key: Name: [{}] :{}", name.len() + 1, name);
                    let _ = writeln!(out, "paramno=-1");
                    let _ = writeln!(out, "name=[{}] \":{}\"", name.len() + 1, name);
                }
            }
            let _ = writeln!(out, "is_param=1");
            let _ = writeln!(out, "param_type={}", bound.ty as i64);
        }
        out
    }
}

impl PdoStatement for MockStatement {
    fn bind_value(
        &mut self,
        param: impl Into<ParamIdentifier>,
        value: impl Into<Val>,
        param_type: ParamType,
    ) -> Result<bool, PdoError> {
        let id = param.into();
        check_position(&id, "bindValue")?;
        self.bound_params.insert(
            id,
            BoundParam {
                value: BoundValue::Value(value.into()),
                ty: param_type,
            },
        );
        Ok(true)
    }

    fn bind_param(
        &mut self,
        param: impl Into<ParamIdentifier>,
        var: &VarRef,
        param_type: ParamType,
    ) -> Result<bool, PdoError> {
        let id = param.into();
        check_position(&id, "bindParam")?;
        self.bound_params.insert(
            id,
            BoundParam {
                value: BoundValue::Ref(var.clone()),
                ty: param_type,
            },
        );
        Ok(true)
    }

    fn bind_column(
        &mut self,
        column: impl Into<ParamIdentifier>,
        var: &VarRef,
        param_type: Option<ParamType>,
    ) -> Result<bool, PdoError> {
        let id = column.into();
        check_position(&id, "bindColumn")?;
        self.bound_columns.insert(
            id,
            BoundColumn {
                var: var.clone(),
                ty: param_type,
            },
        );
        Ok(true)
    }

    fn execute(&mut self, params: Option<&ArrayData>) -> Result<bool, PdoError> {
        self.execute_from("PDOStatement::execute()", params)
    }

    fn fetch(&mut self, fetch_mode: Option<i64>) -> Result<Option<Val>, PdoError> {
        let style = self.resolve_style(fetch_mode)?;
        let args = self.stored_args(style);
        fetch::validate(style, &args, false)?;

        let Some((row_no, row)) = self.next_row() else {
            return Ok(None);
        };
        let ctx = self.fetch_context();
        if style.mode == FetchMode::Bound {
            self.fetch_bound(&ctx, row)?;
            return Ok(Some(Val::Bool(true)));
        }
        fetch::make_row(&ctx, style, &args, &self.columns, row, row_no).map(Some)
    }

    fn fetch_all(
        &mut self,
        fetch_mode: Option<i64>,
        args: FetchArgs,
    ) -> Result<ArrayData, PdoError> {
        let style = self.resolve_style(fetch_mode)?;
        let args = if args.is_none() {
            self.stored_args(style)
        } else {
            args
        };
        fetch::validate(style, &args, true)?;

        if !self.executed {
            return Ok(ArrayData::new());
        }
        let Some(cursor) = self.cursor.as_mut() else {
            return Ok(ArrayData::new());
        };
        let start = cursor.rows_read();
        let rows = cursor.enumerate().map(|(i, row)| (start + i + 1, row));
        let ctx = self.state.borrow().fetch_context();
        fetch::collect_all(&ctx, style, &args, &self.columns, rows)
    }

    fn fetch_column(&mut self, column: usize) -> Result<Option<Val>, PdoError> {
        let Some((_, row)) = self.next_row() else {
            return Ok(None);
        };
        let raw = row.into_iter().nth(column).ok_or_else(|| {
            PdoError::Value(format!(
                "PDOStatement::fetchColumn(): Argument #1 ($column) must be less than the number of columns, column {} given",
                column
            ))
        })?;
        Ok(Some(self.fetch_context().cast(raw, None)))
    }

    fn fetch_object(
        &mut self,
        class: Option<&str>,
        ctor_args: Vec<Val>,
    ) -> Result<Option<ObjectRef>, PdoError> {
        let ctx = self.fetch_context();
        let class = match class {
            Some(name) => fetch::resolve_class(&ctx, name)?,
            None => ClassDef::std_class(),
        };
        let Some((row_no, row)) = self.next_row() else {
            return Ok(None);
        };
        fetch::check_arity(&self.columns, &row, row_no)?;
        let names = ctx.column_names(&self.columns);
        let values = row.into_iter().map(|v| ctx.cast(v, None)).collect();
        fetch::hydrate(&class, &ctor_args, false, &names, values).map(Some)
    }

    /// Reference: $PHP_SRC_PATH/ext/pdo/pdo_stmt.c - pdo_stmt_setup_fetch_mode
    fn set_fetch_mode(&mut self, fetch_mode: i64, args: FetchArgs) -> Result<bool, PdoError> {
        let style = FetchStyle::parse(fetch_mode)?;
        if style.mode == FetchMode::Default {
            self.fetch_style = None;
            self.fetch_args = FetchArgs::None;
            return Ok(true);
        }
        fetch::validate(style, &args, false)?;
        self.fetch_style = Some(style);
        self.fetch_args = args;
        Ok(true)
    }

    fn row_count(&self) -> i64 {
        self.row_count
    }

    fn column_count(&self) -> usize {
        if self.executed { self.columns.len() } else { 0 }
    }

    fn close_cursor(&mut self) -> bool {
        self.cursor = None;
        true
    }

    fn query_string(&self) -> &str {
        &self.query
    }

    fn error_code(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.sqlstate.clone())
    }

    fn error_info(&self) -> ErrorInfo {
        self.error.clone().unwrap_or_else(ErrorInfo::empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::connection::MockConnection;
    use crate::mock::result_set::ResultSet;
    use crate::pdo::driver::PdoConnection;

    fn books() -> ResultSet {
        ResultSet::new(["id", "title"])
            .add_row([Val::Int(1), Val::from("Dune")])
            .add_row([Val::Int(2), Val::from("Emma")])
    }

    #[test]
    fn test_zero_position_rejected() {
        let conn = MockConnection::new();
        let mut stmt = conn.prepare("select ?").unwrap().unwrap();
        assert!(stmt.bind_value(0usize, 1, ParamType::Int).is_err());
        let var = VarRef::new(1);
        assert!(stmt.bind_param(0usize, &var, ParamType::Int).is_err());
        assert!(stmt.bind_column(0usize, &VarRef::default(), None).is_err());
        assert!(stmt.bind_value(1usize, 1, ParamType::Int).unwrap());
    }

    #[test]
    fn test_state_before_execute() {
        let conn = MockConnection::new();
        conn.expect("select * from books").and_fetch(books()).affecting(5);
        let mut stmt = conn.prepare("select * from books").unwrap().unwrap();
        assert_eq!(stmt.row_count(), 0);
        assert_eq!(stmt.column_count(), 0);
        assert_eq!(stmt.fetch(None).unwrap(), None);
        assert!(stmt.fetch_all(None, FetchArgs::None).unwrap().is_empty());
        assert_eq!(stmt.error_code(), None);

        assert!(stmt.execute(None).unwrap());
        assert_eq!(stmt.row_count(), 5);
        assert_eq!(stmt.column_count(), 2);
        assert_eq!(stmt.error_code().as_deref(), Some("00000"));
    }

    #[test]
    fn test_bind_param_reads_at_execute() {
        let conn = MockConnection::new();
        conn.expect("select * from books where id = ?").with([2]);
        let mut stmt = conn
            .prepare("select * from books where id = ?")
            .unwrap()
            .unwrap();
        let id = VarRef::new(1);
        stmt.bind_param(1usize, &id, ParamType::Int).unwrap();
        id.set(2);
        assert!(stmt.execute(None).unwrap());
    }

    #[test]
    fn test_bound_columns_by_position_and_name() {
        let conn = MockConnection::new();
        conn.expect("select * from books").and_fetch(books());
        let mut stmt = conn.prepare("select * from books").unwrap().unwrap();
        stmt.execute(None).unwrap();

        let id = VarRef::default();
        let title = VarRef::default();
        stmt.bind_column(1usize, &id, Some(ParamType::Str)).unwrap();
        stmt.bind_column("title", &title, None).unwrap();

        assert_eq!(
            stmt.fetch(Some(FetchMode::Bound as i64)).unwrap(),
            Some(Val::Bool(true))
        );
        assert_eq!(id.get(), Val::from("1"));
        assert_eq!(title.get(), Val::from("Dune"));

        stmt.bind_column("missing", &VarRef::default(), None).unwrap();
        assert!(stmt.fetch(Some(FetchMode::Bound as i64)).is_err());
    }

    #[test]
    fn test_fetch_mode_resolution() {
        let conn = MockConnection::new();
        conn.expect("select * from books").and_fetch(books());
        let mut stmt = conn.prepare("select * from books").unwrap().unwrap();
        stmt.execute(None).unwrap();

        stmt.set_fetch_mode(FetchMode::Column as i64, FetchArgs::Column(1))
            .unwrap();
        assert_eq!(stmt.fetch(None).unwrap(), Some(Val::from("Dune")));
        let row = stmt.fetch(Some(FetchMode::Num as i64)).unwrap().unwrap();
        assert_eq!(row.get(0), Some(&Val::Int(2)));
        assert_eq!(stmt.fetch(None).unwrap(), None);
    }

    #[test]
    fn test_debug_dump_params() {
        let conn = MockConnection::new();
        let mut stmt = conn.prepare("select :id").unwrap().unwrap();
        stmt.bind_value(":id", 7, ParamType::Int).unwrap();
        let dump = stmt.debug_dump_params();
        assert!(dump.starts_with("SQL: [10] select :id\nParams:  1\n"));
        assert!(dump.contains("Key: Name: [3] :id\n"));
        assert!(dump.contains("param_type=1\n"));
    }
}
