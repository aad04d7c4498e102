//! Mock PDO connection
//!
//! `MockConnection` behaves like a `PDO` instance whose every interaction is
//! checked against the expectation queue. Besides the emulated API it carries
//! the test-side surface: `expect`, `expect_function`, transaction
//! expectations and `assert_expectations_fulfilled`.
//!
//! Reference: $PHP_SRC_PATH/ext/pdo/pdo_dbh.c

use super::config::MockConfig;
use super::expectation::Expectation;
use super::fetch::FetchContext;
use super::manager::ExpectationManager;
use super::statement::MockStatement;
use crate::core::value::Val;
use crate::pdo::driver::{PdoConnection, PdoStatement};
use crate::pdo::dsn::{self, dsn_option, parse_dsn};
use crate::pdo::error::{PdoError, PdoException};
use crate::pdo::object::{ClassDef, ClassRegistry};
use crate::pdo::types::{
    Attribute, CaseMode, ErrorInfo, ErrorMode, FetchArgs, FetchMode, FetchStyle, OracleNulls,
    ParamSet, ParamType,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, warn};

const TRANSACTION_FUNCTIONS: &[&str] = &["beginTransaction", "commit", "rollBack"];

/// Connection-scoped state, shared with the statements it creates
#[derive(Debug)]
pub(crate) struct ConnectionState {
    pub error_mode: ErrorMode,
    pub case: CaseMode,
    pub oracle_nulls: OracleNulls,
    pub stringify: bool,
    pub default_fetch: FetchStyle,
    pub driver_name: String,
    pub server_version: String,
    pub client_version: String,
    /// Attributes without dedicated handling, stored as given
    pub attributes: HashMap<Attribute, Val>,
    pub in_transaction: bool,
    pub ignore_transactions: bool,
    pub last_insert_id: String,
    pub error: Option<ErrorInfo>,
    pub warnings: Vec<String>,
    pub classes: Rc<ClassRegistry>,
}

impl ConnectionState {
    fn new(config: &MockConfig) -> Self {
        let mut attributes = HashMap::new();
        attributes.insert(Attribute::Autocommit, Val::Bool(true));
        attributes.insert(Attribute::EmulatePrep, Val::Bool(false));
        attributes.insert(Attribute::Persistent, Val::Bool(false));
        Self {
            error_mode: config.error_mode,
            case: CaseMode::Natural,
            oracle_nulls: OracleNulls::Natural,
            stringify: false,
            default_fetch: FetchStyle::default(),
            driver_name: config.driver_name.clone(),
            server_version: config.server_version.clone(),
            client_version: config.client_version.clone(),
            attributes,
            in_transaction: false,
            ignore_transactions: false,
            last_insert_id: "0".to_string(),
            error: None,
            warnings: Vec::new(),
            classes: Rc::new(ClassRegistry::new()),
        }
    }

    pub fn fetch_context(&self) -> FetchContext {
        FetchContext {
            case: self.case,
            oracle_nulls: self.oracle_nulls,
            stringify: self.stringify,
            classes: self.classes.clone(),
        }
    }

    /// Route a simulated database error through the error mode
    ///
    /// EXCEPTION raises it; WARNING records an E_WARNING and lets the caller
    /// return its false sentinel; SILENT only lets the caller return.
    /// Reference: $PHP_SRC_PATH/ext/pdo/pdo_dbh.c - pdo_handle_error
    pub fn handle_failure(
        &mut self,
        call_site: &str,
        exception: PdoException,
    ) -> Result<(), PdoError> {
        match self.error_mode {
            ErrorMode::Exception => Err(PdoError::Exception(exception)),
            ErrorMode::Warning => {
                let message = format!("{}: {}", call_site, exception.message);
                warn!(call_site, message = %exception.message, "simulated database error");
                self.warnings.push(message);
                Ok(())
            }
            ErrorMode::Silent => Ok(()),
        }
    }
}

/// A `PDO` double driven by programmed expectations
///
/// Clones share the same connection.
#[derive(Debug, Clone)]
pub struct MockConnection {
    state: Rc<RefCell<ConnectionState>>,
    manager: Rc<RefCell<ExpectationManager>>,
}

impl MockConnection {
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    pub fn with_config(config: MockConfig) -> Self {
        Self {
            state: Rc::new(RefCell::new(ConnectionState::new(&config))),
            manager: Rc::new(RefCell::new(ExpectationManager::new(config))),
        }
    }

    /// Connection impersonating the DSN's driver; `server_version` and
    /// `client_version` keys set the reported versions
    pub fn from_dsn(dsn: &str) -> Result<Self, PdoError> {
        Self::from_dsn_with_config(dsn, MockConfig::default())
    }

    pub fn from_dsn_with_config(dsn: &str, mut config: MockConfig) -> Result<Self, PdoError> {
        let (driver, conn_str) = parse_dsn(dsn)?;
        config.driver_name = driver.to_string();
        if let Some(version) = dsn_option(conn_str, "server_version") {
            config.server_version = version.to_string();
        }
        if let Some(version) = dsn_option(conn_str, "client_version") {
            config.client_version = version.to_string();
        }
        Ok(Self::with_config(config))
    }

    /// `PDO::getAvailableDrivers()`
    pub fn available_drivers() -> Vec<String> {
        dsn::available_drivers()
    }

    // ---- expectations ----

    /// Expect a query; returns the expectation for further configuration
    pub fn expect(&self, query: &str) -> Expectation {
        self.manager.borrow_mut().expect_query(query)
    }

    pub fn expect_query(&self, query: &str) -> Expectation {
        self.expect(query)
    }

    /// Expect a bare call such as `beginTransaction`
    pub fn expect_function(&self, name: &str) -> Expectation {
        self.manager.borrow_mut().expect_function(name)
    }

    fn expect_transaction_function(&self, name: &str) -> Result<Expectation, PdoError> {
        if self.state.borrow().ignore_transactions {
            return Err(PdoError::InvalidArgument(format!(
                "Cannot expect {}() while transactions are ignored",
                name
            )));
        }
        Ok(self.expect_function(name))
    }

    pub fn expect_begin_transaction(&self) -> Result<Expectation, PdoError> {
        self.expect_transaction_function("beginTransaction")
    }

    pub fn expect_commit(&self) -> Result<Expectation, PdoError> {
        self.expect_transaction_function("commit")
    }

    pub fn expect_rollback(&self) -> Result<Expectation, PdoError> {
        self.expect_transaction_function("rollBack")
    }

    /// Expect `beginTransaction`, whatever `body` expects, then `commit`
    pub fn expect_transaction<F, R>(&self, body: F) -> Result<R, PdoError>
    where
        F: FnOnce(&Self) -> R,
    {
        self.expect_begin_transaction()?;
        let result = body(self);
        self.expect_commit()?;
        Ok(result)
    }

    /// Fails if queued expectations were never consumed
    pub fn assert_expectations_fulfilled(&self) -> Result<(), PdoError> {
        self.manager.borrow().assert_expectations_fulfilled()
    }

    pub fn pending_expectations(&self) -> usize {
        self.manager.borrow().pending()
    }

    /// Let transaction calls toggle state without consuming expectations
    pub fn ignore_transactions(&self, ignore: bool) -> Result<(), PdoError> {
        if ignore
            && self
                .manager
                .borrow()
                .has_function_expectation(TRANSACTION_FUNCTIONS)
        {
            return Err(PdoError::InvalidArgument(
                "Transaction expectations are queued; they cannot be ignored".to_string(),
            ));
        }
        self.state.borrow_mut().ignore_transactions = ignore;
        Ok(())
    }

    /// Make a class available to FETCH_CLASS, FETCH_CLASSTYPE and fetchObject
    pub fn register_class(&self, class: ClassDef) {
        let mut state = self.state.borrow_mut();
        Rc::make_mut(&mut state.classes).register(class);
    }

    /// E_WARNING messages raised in PDO::ERRMODE_WARNING
    pub fn warnings(&self) -> Vec<String> {
        self.state.borrow().warnings.clone()
    }

    pub fn take_warnings(&self) -> Vec<String> {
        std::mem::take(&mut self.state.borrow_mut().warnings)
    }

    // ---- internals ----

    fn validator(&self) -> Rc<dyn super::assertion::AssertionValidator> {
        self.manager.borrow().config().validator.clone()
    }

    fn clear_error(&self) {
        self.state.borrow_mut().error = Some(ErrorInfo::success());
    }

    fn fail(&self, call_site: &str, exception: PdoException) -> Result<(), PdoError> {
        let mut state = self.state.borrow_mut();
        state.error = Some(exception.error_info());
        state.handle_failure(call_site, exception)
    }

    /// `prepare` for both PDO::prepare() and PDO::query()
    fn prepare_statement(
        &self,
        sql: &str,
        prepared: bool,
        call_site: &str,
    ) -> Result<Option<MockStatement>, PdoError> {
        self.clear_error();

        let head = self.manager.borrow().peek().cloned();
        if let Some(head) = head {
            if head.fails_on_prepare_of(sql)? {
                let expectation = self.manager.borrow_mut().pull_query_expectation(sql)?;
                expectation.record_execution(sql, ParamSet::new());
                if let Some(exception) = expectation.prepare_failure() {
                    debug!(sql, "prepare failure induced");
                    self.fail(call_site, exception)?;
                    return Ok(None);
                }
            }
        }

        Ok(Some(MockStatement::new(
            self.state.clone(),
            self.manager.clone(),
            sql,
            prepared,
        )))
    }

    fn transaction_call(&self, name: &str, call_site: &str) -> Result<bool, PdoError> {
        let ignore = self.state.borrow().ignore_transactions;
        if !ignore {
            let expectation = self.manager.borrow_mut().pull_function_expectation(name)?;
            if let Some(exception) = expectation.execute_failure() {
                self.fail(call_site, exception)?;
                return Ok(false);
            }
        }
        self.clear_error();
        Ok(true)
    }
}

impl Default for MockConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl PdoConnection for MockConnection {
    type Statement = MockStatement;

    #[tracing::instrument(level = "trace", skip(self))]
    fn prepare(&self, sql: &str) -> Result<Option<MockStatement>, PdoError> {
        self.prepare_statement(sql, true, "PDO::prepare()")
    }

    #[tracing::instrument(level = "trace", skip(self))]
    fn exec(&self, sql: &str) -> Result<Option<i64>, PdoError> {
        self.clear_error();
        let validator = self.validator();
        let expectation = self.manager.borrow_mut().pull_query_expectation(sql)?;
        let params = ParamSet::new();
        expectation.assert_query_match(validator.as_ref(), sql)?;
        expectation.assert_params_match(validator.as_ref(), &params)?;
        expectation.assert_prepared_state(validator.as_ref(), false)?;
        expectation.record_execution(sql, params);

        if let Some(exception) = expectation.execute_failure() {
            self.fail("PDO::exec()", exception)?;
            return Ok(None);
        }
        if let Some(id) = expectation.insert_id() {
            self.state.borrow_mut().last_insert_id = id;
        }
        Ok(Some(expectation.row_count()))
    }

    #[tracing::instrument(level = "trace", skip(self, args))]
    fn query(
        &self,
        sql: &str,
        fetch_mode: Option<i64>,
        args: FetchArgs,
    ) -> Result<Option<MockStatement>, PdoError> {
        let Some(mut stmt) = self.prepare_statement(sql, false, "PDO::query()")? else {
            return Ok(None);
        };
        if let Some(mode) = fetch_mode {
            stmt.set_fetch_mode(mode, args)?;
        }
        match stmt.execute_from("PDO::query()", None) {
            Ok(true) => Ok(Some(stmt)),
            Ok(false) => {
                self.state.borrow_mut().error = Some(stmt.error_info());
                Ok(None)
            }
            Err(e) => {
                if e.exception().is_some() {
                    self.state.borrow_mut().error = Some(stmt.error_info());
                }
                Err(e)
            }
        }
    }

    fn quote(&self, value: &str, _param_type: ParamType) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    fn begin_transaction(&self) -> Result<bool, PdoError> {
        if self.state.borrow().in_transaction {
            return Err(PdoError::Exception(PdoException::new(
                "There is already an active transaction",
            )));
        }
        let ok = self.transaction_call("beginTransaction", "PDO::beginTransaction()")?;
        if ok {
            self.state.borrow_mut().in_transaction = true;
        }
        Ok(ok)
    }

    fn commit(&self) -> Result<bool, PdoError> {
        if !self.state.borrow().in_transaction {
            return Err(PdoError::Exception(PdoException::new(
                "There is no active transaction",
            )));
        }
        let ok = self.transaction_call("commit", "PDO::commit()")?;
        if ok {
            self.state.borrow_mut().in_transaction = false;
        }
        Ok(ok)
    }

    fn rollback(&self) -> Result<bool, PdoError> {
        if !self.state.borrow().in_transaction {
            return Err(PdoError::Exception(PdoException::new(
                "There is no active transaction",
            )));
        }
        let ok = self.transaction_call("rollBack", "PDO::rollBack()")?;
        if ok {
            self.state.borrow_mut().in_transaction = false;
        }
        Ok(ok)
    }

    fn in_transaction(&self) -> bool {
        self.state.borrow().in_transaction
    }

    fn last_insert_id(&self, _name: Option<&str>) -> Result<String, PdoError> {
        Ok(self.state.borrow().last_insert_id.clone())
    }

    /// Reference: $PHP_SRC_PATH/ext/pdo/pdo_dbh.c - pdo_dbh_attribute_set
    fn set_attribute(&self, attr: Attribute, value: impl Into<Val>) -> Result<bool, PdoError> {
        let value = value.into();
        let mut state = self.state.borrow_mut();
        match attr {
            Attribute::ErrorMode => {
                state.error_mode = ErrorMode::from_i64(value.to_int()).ok_or_else(|| {
                    PdoError::Value(
                        "Error mode must be one of the PDO::ERRMODE_* constants".to_string(),
                    )
                })?;
            }
            Attribute::Case => {
                state.case = CaseMode::from_i64(value.to_int()).ok_or_else(|| {
                    PdoError::Value(
                        "Case folding mode must be one of the PDO::CASE_* constants".to_string(),
                    )
                })?;
            }
            Attribute::OracleNulls => {
                state.oracle_nulls = OracleNulls::from_i64(value.to_int()).ok_or_else(|| {
                    PdoError::Value(
                        "Null conversion mode must be one of the PDO::NULL_* constants".to_string(),
                    )
                })?;
            }
            Attribute::StringifyFetches => state.stringify = value.to_bool(),
            Attribute::DefaultFetchMode => {
                let style = FetchStyle::parse(value.to_int())?;
                match style.mode {
                    FetchMode::Into | FetchMode::Class | FetchMode::Func | FetchMode::Bound => {
                        return Err(PdoError::Value(format!(
                            "Fetch mode {:?} cannot be set as the default fetch mode",
                            style.mode
                        )));
                    }
                    FetchMode::Default => {}
                    _ => state.default_fetch = style,
                }
            }
            Attribute::DriverName => state.driver_name = value.to_php_string(),
            Attribute::ServerVersion => state.server_version = value.to_php_string(),
            Attribute::ClientVersion => state.client_version = value.to_php_string(),
            other => {
                state.attributes.insert(other, value);
            }
        }
        Ok(true)
    }

    fn get_attribute(&self, attr: Attribute) -> Result<Val, PdoError> {
        let state = self.state.borrow();
        Ok(match attr {
            Attribute::ErrorMode => Val::Int(state.error_mode as i64),
            Attribute::Case => Val::Int(state.case as i64),
            Attribute::OracleNulls => Val::Int(state.oracle_nulls as i64),
            Attribute::StringifyFetches => Val::Bool(state.stringify),
            Attribute::DefaultFetchMode => Val::Int(state.default_fetch.raw()),
            Attribute::DriverName => Val::String(state.driver_name.clone()),
            Attribute::ServerVersion => Val::String(state.server_version.clone()),
            Attribute::ClientVersion => Val::String(state.client_version.clone()),
            other => state.attributes.get(&other).cloned().unwrap_or_default(),
        })
    }

    fn error_code(&self) -> Option<String> {
        self.state.borrow().error.as_ref().map(|e| e.sqlstate.clone())
    }

    fn error_info(&self) -> ErrorInfo {
        self.state
            .borrow()
            .error
            .clone()
            .unwrap_or_else(ErrorInfo::empty)
    }
}
