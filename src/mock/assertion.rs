//! Assertion hooks
//!
//! Every check the mock makes goes through an `AssertionValidator`, which
//! turns a mismatch into an error and reports the assertion to an
//! `AssertionManager`. Test-framework integrations plug in here; the defaults
//! below need no framework.

use super::comparator::{ParamComparator, ParamExpectation, QueryComparator};
use crate::pdo::error::PdoError;
use crate::pdo::types::ParamSet;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Bookkeeping hook for frameworks that count assertions
pub trait AssertionManager: fmt::Debug {
    fn increment(&self, count: usize);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAssertionManager;

impl AssertionManager for NoopAssertionManager {
    fn increment(&self, _count: usize) {}
}

/// Counts assertions, for tests that check how many were made
#[derive(Debug, Default)]
pub struct AssertionCounter {
    count: Cell<usize>,
}

impl AssertionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.count.get()
    }
}

impl AssertionManager for AssertionCounter {
    fn increment(&self, count: usize) {
        self.count.set(self.count.get() + count);
    }
}

pub trait AssertionValidator: fmt::Debug {
    fn assert_query_match(
        &self,
        comparator: &dyn QueryComparator,
        expected: &str,
        actual: &str,
    ) -> Result<(), PdoError>;

    fn assert_params_match(
        &self,
        comparator: &dyn ParamComparator,
        expected: &ParamExpectation,
        actual: &ParamSet,
    ) -> Result<(), PdoError>;

    fn assert_is_prepared(&self, prepared: bool) -> Result<(), PdoError>;

    fn assert_is_not_prepared(&self, prepared: bool) -> Result<(), PdoError>;

    fn assert_function_match(&self, expected: &str, actual: &str) -> Result<(), PdoError>;

    /// Unconditional failure (empty queue, wrong expectation kind, leftovers)
    fn fail(&self, message: String) -> PdoError;
}

/// Raises `PdoError::ExpectationFailed` and counts through an `AssertionManager`
#[derive(Debug, Clone)]
pub struct DefaultAssertionValidator {
    manager: Rc<dyn AssertionManager>,
}

impl DefaultAssertionValidator {
    pub fn new(manager: Rc<dyn AssertionManager>) -> Self {
        Self { manager }
    }

    fn check(&self, ok: bool, message: impl FnOnce() -> String) -> Result<(), PdoError> {
        self.manager.increment(1);
        if ok {
            Ok(())
        } else {
            Err(PdoError::ExpectationFailed(message()))
        }
    }
}

impl Default for DefaultAssertionValidator {
    fn default() -> Self {
        Self::new(Rc::new(NoopAssertionManager))
    }
}

impl AssertionValidator for DefaultAssertionValidator {
    fn assert_query_match(
        &self,
        comparator: &dyn QueryComparator,
        expected: &str,
        actual: &str,
    ) -> Result<(), PdoError> {
        let matched = comparator.compare(expected, actual)?;
        self.check(matched, || {
            format!(
                "Query does not match the expectation.\nExpected: {}\nActual:   {}",
                expected, actual
            )
        })
    }

    fn assert_params_match(
        &self,
        comparator: &dyn ParamComparator,
        expected: &ParamExpectation,
        actual: &ParamSet,
    ) -> Result<(), PdoError> {
        self.check(expected.matches(comparator, actual), || {
            format!(
                "Parameters do not match the expectation.\nExpected: {}\nActual:   {}",
                expected, actual
            )
        })
    }

    fn assert_is_prepared(&self, prepared: bool) -> Result<(), PdoError> {
        self.check(prepared, || {
            "Statement is expected to be prepared, but it was executed directly".to_string()
        })
    }

    fn assert_is_not_prepared(&self, prepared: bool) -> Result<(), PdoError> {
        self.check(!prepared, || {
            "Statement is expected to be executed directly, but it was prepared".to_string()
        })
    }

    fn assert_function_match(&self, expected: &str, actual: &str) -> Result<(), PdoError> {
        self.check(expected.eq_ignore_ascii_case(actual), || {
            format!(
                "Unexpected function call: expected {}(), got {}()",
                expected, actual
            )
        })
    }

    fn fail(&self, message: String) -> PdoError {
        self.manager.increment(1);
        PdoError::ExpectationFailed(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::comparator::{ExactComparator, NaturalParamComparator};

    #[test]
    fn test_counter_tracks_every_assertion() {
        let counter = Rc::new(AssertionCounter::new());
        let validator = DefaultAssertionValidator::new(counter.clone());

        assert!(validator
            .assert_query_match(&ExactComparator, "select 1", "select 1")
            .is_ok());
        assert!(validator.assert_is_prepared(false).is_err());
        assert!(validator.assert_is_not_prepared(false).is_ok());
        let _ = validator.fail("boom".to_string());

        assert_eq!(counter.count(), 4);
    }

    #[test]
    fn test_mismatch_is_expectation_failure() {
        let validator = DefaultAssertionValidator::default();
        let err = validator
            .assert_query_match(&ExactComparator, "select 1", "select 2")
            .unwrap_err();
        assert!(err.is_expectation_failure());
        assert!(err.to_string().contains("select 2"));

        let params = ParamExpectation::Exact(ParamSet::new());
        let mut actual = ParamSet::new();
        actual.insert(
            crate::pdo::types::ParamIdentifier::Position(1),
            crate::pdo::types::Param::new(1, None),
        );
        assert!(validator
            .assert_params_match(&NaturalParamComparator::default(), &params, &actual)
            .is_err());
    }

    #[test]
    fn test_function_match_is_case_insensitive() {
        let validator = DefaultAssertionValidator::default();
        let folded = validator.assert_function_match("rollBack", "rollback");
        assert!(folded.is_ok());
        let other = validator.assert_function_match("commit", "rollBack");
        assert!(other.is_err());
    }
}
