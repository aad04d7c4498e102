//! Expectation queue
//!
//! Expectations are consumed strictly in the order they were created. The
//! manager enforces order and kind; matching the query text against the
//! pulled expectation happens in the caller.

use super::config::MockConfig;
use super::expectation::{Expectation, ExpectationKind};
use crate::pdo::error::PdoError;
use std::collections::VecDeque;
use tracing::{debug, trace};

#[derive(Debug)]
pub struct ExpectationManager {
    queue: VecDeque<Expectation>,
    config: MockConfig,
}

impl ExpectationManager {
    pub fn new(config: MockConfig) -> Self {
        Self {
            queue: VecDeque::new(),
            config,
        }
    }

    pub fn config(&self) -> &MockConfig {
        &self.config
    }

    fn enqueue(&mut self, kind: ExpectationKind, query: &str) -> Expectation {
        let expectation = Expectation::new(
            kind,
            query,
            self.config.query_comparator.clone(),
            self.config.param_comparator.clone(),
        );
        trace!(expectation = %expectation, position = self.queue.len(), "expectation queued");
        self.queue.push_back(expectation.clone());
        expectation
    }

    pub fn expect_query(&mut self, query: &str) -> Expectation {
        self.enqueue(ExpectationKind::Query, query)
    }

    pub fn expect_function(&mut self, name: &str) -> Expectation {
        self.enqueue(ExpectationKind::Function(name.to_string()), "")
    }

    /// Next expectation in line, without consuming it
    pub fn peek(&self) -> Option<&Expectation> {
        self.queue.front()
    }

    /// Expectations not consumed yet
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Whether a queued function expectation targets one of `names`
    pub fn has_function_expectation(&self, names: &[&str]) -> bool {
        self.queue.iter().any(|e| match e.kind() {
            ExpectationKind::Function(name) => names.iter().any(|n| n.eq_ignore_ascii_case(&name)),
            ExpectationKind::Query => false,
        })
    }

    /// Dequeue the head, which must be a query expectation
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn pull_query_expectation(&mut self, query: &str) -> Result<Expectation, PdoError> {
        let validator = self.config.validator.clone();
        let Some(head) = self.queue.front() else {
            return Err(validator.fail(format!(
                "Unexpected query: {}\nNo more expectations are queued",
                query
            )));
        };
        if let ExpectationKind::Function(name) = head.kind() {
            return Err(validator.fail(format!(
                "Unexpected query: {}\nExpected a call to {}() first",
                query, name
            )));
        }
        let expectation = self.pop()?;
        debug!(query, expected = %expectation.query(), "query expectation pulled");
        Ok(expectation)
    }

    /// Dequeue the head, which must be an expectation for `name()`
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn pull_function_expectation(&mut self, name: &str) -> Result<Expectation, PdoError> {
        let validator = self.config.validator.clone();
        let Some(head) = self.queue.front() else {
            return Err(validator.fail(format!(
                "Unexpected call to {}()\nNo more expectations are queued",
                name
            )));
        };
        match head.kind() {
            ExpectationKind::Query => Err(validator.fail(format!(
                "Unexpected call to {}()\nExpected query: {}",
                name,
                head.query()
            ))),
            ExpectationKind::Function(expected) => {
                validator.assert_function_match(&expected, name)?;
                let expectation = self.pop()?;
                expectation.mark_fulfilled();
                debug!(function = name, "function expectation pulled");
                Ok(expectation)
            }
        }
    }

    fn pop(&mut self) -> Result<Expectation, PdoError> {
        self.queue
            .pop_front()
            .ok_or_else(|| self.config.validator.fail("Expectation queue is empty".to_string()))
    }

    /// Fails when expectations are left over
    pub fn assert_expectations_fulfilled(&self) -> Result<(), PdoError> {
        if self.queue.is_empty() {
            self.config.assertion_manager.increment(1);
            return Ok(());
        }
        let leftovers: Vec<String> = self.queue.iter().map(|e| format!("  - {}", e)).collect();
        Err(self.config.validator.fail(format!(
            "{} expectation(s) were not fulfilled:\n{}",
            self.queue.len(),
            leftovers.join("\n")
        )))
    }
}
