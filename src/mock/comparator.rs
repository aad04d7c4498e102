//! Comparison strategies
//!
//! Query comparators decide whether an executed SQL string satisfies the
//! expected one; parameter comparators do the same for bound parameters.

use crate::core::value::Val;
use crate::pdo::error::PdoError;
use crate::pdo::types::{Param, ParamSet, ParamType};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::rc::Rc;

lazy_static! {
    /// `{{ <raw regex> }}` segment inside an expected query
    static ref PLACEHOLDER: Regex = Regex::new(r"\{\{\s*(.+?)\s*\}\}").unwrap();
}

pub trait QueryComparator: fmt::Debug {
    /// `Err` means the expectation itself is unusable, not a mismatch
    fn compare(&self, expected: &str, actual: &str) -> Result<bool, PdoError>;
}

/// Plain string equality
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactComparator;

impl QueryComparator for ExactComparator {
    fn compare(&self, expected: &str, actual: &str) -> Result<bool, PdoError> {
        Ok(expected == actual)
    }
}

/// Whitespace-insensitive comparison with embedded `{{ regex }}` segments
///
/// `select * from books where id = {{\d+}}` matches
/// `select *  from books\nwhere id = 42`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexComparator;

impl RegexComparator {
    /// Anchored pattern for an expected query
    pub fn compile(expected: &str) -> Result<Regex, PdoError> {
        let expected = normalize_whitespace(expected);
        if expected.is_empty() {
            return Err(PdoError::InvalidArgument(
                "Expected query must not be empty".to_string(),
            ));
        }

        let mut pattern = String::with_capacity(expected.len() + 2);
        pattern.push('^');
        let mut last = 0;
        for caps in PLACEHOLDER.captures_iter(&expected) {
            let (Some(whole), Some(raw)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            pattern.push_str(&regex::escape(&expected[last..whole.start()]));
            pattern.push_str(raw.as_str());
            last = whole.end();
        }
        pattern.push_str(&regex::escape(&expected[last..]));
        pattern.push('$');

        Regex::new(&pattern).map_err(|e| {
            PdoError::InvalidArgument(format!("Invalid query pattern '{}': {}", expected, e))
        })
    }
}

impl QueryComparator for RegexComparator {
    fn compare(&self, expected: &str, actual: &str) -> Result<bool, PdoError> {
        let re = Self::compile(expected)?;
        Ok(re.is_match(&normalize_whitespace(actual)))
    }
}

/// Collapse whitespace runs into single spaces and trim
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub trait ParamComparator: fmt::Debug {
    fn compare(&self, expected: &ParamSet, actual: &ParamSet) -> bool;
}

/// Identical value and kind, identical declared type
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictParamComparator;

impl ParamComparator for StrictParamComparator {
    fn compare(&self, expected: &ParamSet, actual: &ParamSet) -> bool {
        each_pair(expected, actual, |exp, act| {
            exp.value.strict_eq(&act.value) && exp.declared_type() == act.declared_type()
        })
    }
}

/// Loosely equal values (`==`), declared types ignored
#[derive(Debug, Clone, Copy, Default)]
pub struct LooseParamComparator;

impl ParamComparator for LooseParamComparator {
    fn compare(&self, expected: &ParamSet, actual: &ParamSet) -> bool {
        each_pair(expected, actual, |exp, act| exp.value.loose_eq(&act.value))
    }
}

/// Identical values, declared types inferred from the values' kinds
///
/// An undeclared type is inferred as null -> PARAM_NULL, bool -> PARAM_BOOL,
/// int -> PARAM_INT and anything else -> PARAM_STR. Each kind's inference can
/// be switched off, in which case PARAM_STR is expected for it.
#[derive(Debug, Clone, Copy)]
pub struct NaturalParamComparator {
    pub infer_null: bool,
    pub infer_bool: bool,
    pub infer_int: bool,
}

impl NaturalParamComparator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn infer_null(mut self, enabled: bool) -> Self {
        self.infer_null = enabled;
        self
    }

    pub fn infer_bool(mut self, enabled: bool) -> Self {
        self.infer_bool = enabled;
        self
    }

    pub fn infer_int(mut self, enabled: bool) -> Self {
        self.infer_int = enabled;
        self
    }

    fn infer(&self, value: &Val) -> ParamType {
        match ParamType::infer(value) {
            ParamType::Null if self.infer_null => ParamType::Null,
            ParamType::Bool if self.infer_bool => ParamType::Bool,
            ParamType::Int if self.infer_int => ParamType::Int,
            _ => ParamType::Str,
        }
    }

    fn effective_type(&self, param: &Param) -> ParamType {
        param.ty.unwrap_or_else(|| self.infer(&param.value))
    }
}

impl Default for NaturalParamComparator {
    fn default() -> Self {
        Self {
            infer_null: true,
            infer_bool: true,
            infer_int: true,
        }
    }
}

impl ParamComparator for NaturalParamComparator {
    fn compare(&self, expected: &ParamSet, actual: &ParamSet) -> bool {
        each_pair(expected, actual, |exp, act| {
            exp.value.strict_eq(&act.value) && self.effective_type(exp) == self.effective_type(act)
        })
    }
}

/// Same key set, then `matches` for every key; sizes are checked first
fn each_pair<F>(expected: &ParamSet, actual: &ParamSet, matches: F) -> bool
where
    F: Fn(&Param, &Param) -> bool,
{
    if expected.len() != actual.len() {
        return false;
    }
    expected
        .iter()
        .all(|(id, exp)| actual.get(id).is_some_and(|act| matches(exp, act)))
}

/// What a parameter predicate may return
///
/// Only an explicit `false` rejects; `()` and `None` accept.
pub trait IntoMatchOutcome {
    fn into_outcome(self) -> Option<bool>;
}

impl IntoMatchOutcome for () {
    fn into_outcome(self) -> Option<bool> {
        None
    }
}

impl IntoMatchOutcome for bool {
    fn into_outcome(self) -> Option<bool> {
        Some(self)
    }
}

impl IntoMatchOutcome for Option<bool> {
    fn into_outcome(self) -> Option<bool> {
        self
    }
}

pub type ParamPredicate = Rc<dyn Fn(&ParamSet) -> Option<bool>>;

/// Required parameters: a concrete set, or a predicate over the actual set
#[derive(Clone)]
pub enum ParamExpectation {
    Exact(ParamSet),
    Predicate(ParamPredicate),
}

impl ParamExpectation {
    pub fn predicate<F, R>(f: F) -> Self
    where
        F: Fn(&ParamSet) -> R + 'static,
        R: IntoMatchOutcome,
    {
        ParamExpectation::Predicate(Rc::new(move |params| f(params).into_outcome()))
    }

    pub fn matches(&self, comparator: &dyn ParamComparator, actual: &ParamSet) -> bool {
        match self {
            ParamExpectation::Exact(expected) => comparator.compare(expected, actual),
            ParamExpectation::Predicate(f) => f(actual) != Some(false),
        }
    }
}

impl fmt::Debug for ParamExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamExpectation::Exact(set) => write!(f, "{}", set),
            ParamExpectation::Predicate(_) => write!(f, "<callback>"),
        }
    }
}

impl fmt::Display for ParamExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
