//! Programmed expectations
//!
//! An `Expectation` describes one interaction the code under test is expected
//! to perform: a query (with its parameters and prepared-ness) or a bare
//! function call such as `beginTransaction`. It also carries what the mock
//! answers with: rows, an affected-row count, an insert id or a failure.
//!
//! The handle is shared: the queue holds one clone, the test may keep another
//! to inspect `executed_params()` after the fact.

use super::assertion::AssertionValidator;
use super::comparator::{
    ExactComparator, IntoMatchOutcome, LooseParamComparator, ParamComparator, ParamExpectation,
    QueryComparator, StrictParamComparator,
};
use super::result_set::ResultSet;
use crate::core::value::{ArrayData, Val};
use crate::pdo::error::{PdoError, PdoException};
use crate::pdo::types::{Param, ParamIdentifier, ParamSet, ParamType};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectationKind {
    Query,
    Function(String),
}

/// What the statement did when it consumed the expectation
#[derive(Debug, Clone)]
struct Execution {
    query: String,
    params: ParamSet,
}

struct ExpectationState {
    kind: ExpectationKind,
    query: String,
    prepared: Option<bool>,
    params: Option<ParamExpectation>,
    query_comparator: Rc<dyn QueryComparator>,
    param_comparator: Rc<dyn ParamComparator>,
    affected: Option<i64>,
    result_set: Option<ResultSet>,
    insert_id: Option<String>,
    fail_on_execute: Option<PdoException>,
    fail_on_prepare: Option<PdoException>,
    execution: Option<Execution>,
    fulfilled: bool,
}

#[derive(Clone)]
pub struct Expectation(Rc<RefCell<ExpectationState>>);

impl Expectation {
    pub(crate) fn new(
        kind: ExpectationKind,
        query: impl Into<String>,
        query_comparator: Rc<dyn QueryComparator>,
        param_comparator: Rc<dyn ParamComparator>,
    ) -> Self {
        Expectation(Rc::new(RefCell::new(ExpectationState {
            kind,
            query: query.into(),
            prepared: None,
            params: None,
            query_comparator,
            param_comparator,
            affected: None,
            result_set: None,
            insert_id: None,
            fail_on_execute: None,
            fail_on_prepare: None,
            execution: None,
            fulfilled: false,
        })))
    }

    fn update(self, f: impl FnOnce(&mut ExpectationState)) -> Self {
        f(&mut *self.0.borrow_mut());
        self
    }

    /// Edit the concrete parameter set, replacing a predicate if one was set
    fn edit_params(state: &mut ExpectationState, f: impl FnOnce(&mut ParamSet)) {
        let mut set = match state.params.take() {
            Some(ParamExpectation::Exact(set)) => set,
            _ => ParamSet::new(),
        };
        f(&mut set);
        state.params = Some(ParamExpectation::Exact(set));
    }

    // ---- builder ----

    /// Require a prepared (`true`) or directly executed (`false`) statement
    pub fn to_be_prepared(self, prepared: bool) -> Self {
        self.update(|s| s.prepared = Some(prepared))
    }

    /// Positional parameters, 1-based in binding order
    pub fn with<I, V>(self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Val>,
    {
        let mut set = ParamSet::new();
        for (i, value) in values.into_iter().enumerate() {
            set.insert(ParamIdentifier::Position(i + 1), Param::new(value, None));
        }
        self.update(|s| s.params = Some(ParamExpectation::Exact(set)))
    }

    /// Named parameters; a leading ':' is optional
    pub fn with_named<I, K, V>(self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Val>,
    {
        let mut set = ParamSet::new();
        for (name, value) in pairs {
            set.insert(ParamIdentifier::name(name.as_ref()), Param::new(value, None));
        }
        self.update(|s| s.params = Some(ParamExpectation::Exact(set)))
    }

    /// Parameters as a PHP array: int keys are 0-based positions, string keys names
    pub fn with_array(self, params: &ArrayData) -> Self {
        let set = ParamSet::from_array(params);
        self.update(|s| s.params = Some(ParamExpectation::Exact(set)))
    }

    /// Declared types for the parameters set so far, in the same order.
    /// A callback predicate is kept as is and the types are ignored.
    pub fn with_types(self, types: impl IntoIterator<Item = ParamType>) -> Self {
        self.update(|s| {
            if let Some(ParamExpectation::Exact(set)) = &mut s.params {
                for ((_, param), ty) in set.iter_mut().zip(types) {
                    param.ty = Some(ty);
                }
            }
        })
    }

    /// Add one required parameter, with an optional declared type
    pub fn with_param(
        self,
        key: impl Into<ParamIdentifier>,
        value: impl Into<Val>,
        ty: impl Into<Option<ParamType>>,
    ) -> Self {
        let key = key.into();
        let param = Param::new(value, ty.into());
        self.update(|s| {
            Self::edit_params(s, |set| {
                set.insert(key, param);
            })
        })
    }

    /// Accept any parameters unless `predicate` explicitly returns `false`
    pub fn with_callback<F, R>(self, predicate: F) -> Self
    where
        F: Fn(&ParamSet) -> R + 'static,
        R: IntoMatchOutcome,
    {
        let params = ParamExpectation::predicate(predicate);
        self.update(|s| s.params = Some(params))
    }

    /// Row count reported for the execution
    pub fn affecting(self, rows: i64) -> Self {
        self.update(|s| s.affected = Some(rows))
    }

    pub fn and_fetch(self, result_set: ResultSet) -> Self {
        self.update(|s| s.result_set = Some(result_set))
    }

    /// Associative rows; columns are taken from the first row's keys
    pub fn and_fetch_rows(
        self,
        rows: impl IntoIterator<Item = ArrayData>,
    ) -> Result<Self, PdoError> {
        let rs = ResultSet::from_rows(rows)?;
        Ok(self.and_fetch(rs))
    }

    pub fn and_fetch_row(self, row: ArrayData) -> Result<Self, PdoError> {
        self.and_fetch_rows([row])
    }

    pub fn and_fetch_json(self, json: &str) -> Result<Self, PdoError> {
        let rs = ResultSet::from_json(json)?;
        Ok(self.and_fetch(rs))
    }

    /// Value of `lastInsertId()` once this expectation has executed
    pub fn with_insert_id(self, id: impl Into<Val>) -> Self {
        let id = id.into().to_php_string();
        self.update(|s| s.insert_id = Some(id))
    }

    pub fn and_fail_on_execute(self, exception: PdoException) -> Self {
        self.update(|s| s.fail_on_execute = Some(exception))
    }

    pub fn and_fail_on_prepare(self, exception: PdoException) -> Self {
        self.update(|s| s.fail_on_prepare = Some(exception))
    }

    pub fn compare_query_with(self, comparator: Rc<dyn QueryComparator>) -> Self {
        self.update(|s| s.query_comparator = comparator)
    }

    pub fn compare_params_with(self, comparator: Rc<dyn ParamComparator>) -> Self {
        self.update(|s| s.param_comparator = comparator)
    }

    pub fn exact_query(self) -> Self {
        self.compare_query_with(Rc::new(ExactComparator))
    }

    pub fn strict_params(self) -> Self {
        self.compare_params_with(Rc::new(StrictParamComparator))
    }

    pub fn loose_params(self) -> Self {
        self.compare_params_with(Rc::new(LooseParamComparator))
    }

    // ---- inspection ----

    pub fn kind(&self) -> ExpectationKind {
        self.0.borrow().kind.clone()
    }

    pub fn query(&self) -> String {
        self.0.borrow().query.clone()
    }

    /// Parameters the consuming statement was executed with
    pub fn executed_params(&self) -> Option<ParamSet> {
        self.0.borrow().execution.as_ref().map(|e| e.params.clone())
    }

    /// SQL the consuming statement was executed with
    pub fn executed_query(&self) -> Option<String> {
        self.0.borrow().execution.as_ref().map(|e| e.query.clone())
    }

    pub fn is_fulfilled(&self) -> bool {
        self.0.borrow().fulfilled
    }

    pub fn ptr_eq(&self, other: &Expectation) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    // ---- used by the connection and statements ----

    pub(crate) fn assert_query_match(
        &self,
        validator: &dyn AssertionValidator,
        actual: &str,
    ) -> Result<(), PdoError> {
        let (comparator, expected) = {
            let s = self.0.borrow();
            (s.query_comparator.clone(), s.query.clone())
        };
        validator.assert_query_match(comparator.as_ref(), &expected, actual)
    }

    /// No-op when no parameters were required
    pub(crate) fn assert_params_match(
        &self,
        validator: &dyn AssertionValidator,
        actual: &ParamSet,
    ) -> Result<(), PdoError> {
        let (comparator, expected) = {
            let s = self.0.borrow();
            match &s.params {
                Some(params) => (s.param_comparator.clone(), params.clone()),
                None => return Ok(()),
            }
        };
        validator.assert_params_match(comparator.as_ref(), &expected, actual)
    }

    /// No-op when prepared-ness was left open
    pub(crate) fn assert_prepared_state(
        &self,
        validator: &dyn AssertionValidator,
        prepared: bool,
    ) -> Result<(), PdoError> {
        let required = self.0.borrow().prepared;
        match required {
            Some(true) => validator.assert_is_prepared(prepared),
            Some(false) => validator.assert_is_not_prepared(prepared),
            None => Ok(()),
        }
    }

    /// Whether this is a query expectation that fails `prepare()` for `sql`
    pub(crate) fn fails_on_prepare_of(&self, sql: &str) -> Result<bool, PdoError> {
        let (comparator, expected) = {
            let s = self.0.borrow();
            if s.kind != ExpectationKind::Query || s.fail_on_prepare.is_none() {
                return Ok(false);
            }
            (s.query_comparator.clone(), s.query.clone())
        };
        comparator.compare(&expected, sql)
    }

    pub(crate) fn prepare_failure(&self) -> Option<PdoException> {
        self.0.borrow().fail_on_prepare.clone()
    }

    pub(crate) fn execute_failure(&self) -> Option<PdoException> {
        self.0.borrow().fail_on_execute.clone()
    }

    /// Affected rows if set, else the size of a materialized result set
    pub(crate) fn row_count(&self) -> i64 {
        let s = self.0.borrow();
        s.affected.unwrap_or_else(|| {
            s.result_set
                .as_ref()
                .and_then(ResultSet::row_count)
                .map_or(0, |n| n as i64)
        })
    }

    pub(crate) fn take_result_set(&self) -> Option<ResultSet> {
        self.0.borrow_mut().result_set.take()
    }

    pub(crate) fn insert_id(&self) -> Option<String> {
        self.0.borrow().insert_id.clone()
    }

    pub(crate) fn mark_fulfilled(&self) {
        self.0.borrow_mut().fulfilled = true;
    }

    pub(crate) fn record_execution(&self, query: &str, params: ParamSet) {
        let mut s = self.0.borrow_mut();
        s.execution = Some(Execution {
            query: query.to_string(),
            params,
        });
        s.fulfilled = true;
    }
}

impl fmt::Debug for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.0.borrow();
        let mut d = f.debug_struct("Expectation");
        match &s.kind {
            ExpectationKind::Query => d.field("query", &s.query),
            ExpectationKind::Function(name) => d.field("function", name),
        };
        d.field("prepared", &s.prepared)
            .field("params", &s.params)
            .field("fulfilled", &s.fulfilled)
            .finish()
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.0.borrow();
        match &s.kind {
            ExpectationKind::Query => write!(f, "query \"{}\"", s.query),
            ExpectationKind::Function(name) => write!(f, "{}()", name),
        }
    }
}
