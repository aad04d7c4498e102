//! Mock connection configuration
//!
//! Defaults shared by every expectation created on a connection. There is no
//! process-wide state: each connection gets its own `MockConfig`.

use super::assertion::{
    AssertionManager, AssertionValidator, DefaultAssertionValidator, NoopAssertionManager,
};
use super::comparator::{NaturalParamComparator, ParamComparator, QueryComparator, RegexComparator};
use crate::pdo::types::ErrorMode;
use std::rc::Rc;

/// Configuration for a mock connection
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Value of PDO::ATTR_DRIVER_NAME
    pub driver_name: String,
    /// Value of PDO::ATTR_SERVER_VERSION
    pub server_version: String,
    /// Value of PDO::ATTR_CLIENT_VERSION
    pub client_version: String,
    /// Initial PDO::ATTR_ERRMODE
    pub error_mode: ErrorMode,
    /// Query comparator for expectations that do not choose one
    pub query_comparator: Rc<dyn QueryComparator>,
    /// Parameter comparator for expectations that do not choose one
    pub param_comparator: Rc<dyn ParamComparator>,
    pub validator: Rc<dyn AssertionValidator>,
    pub assertion_manager: Rc<dyn AssertionManager>,
}

impl MockConfig {
    /// Report assertions to `manager`, using the default validator
    pub fn with_assertion_manager(mut self, manager: Rc<dyn AssertionManager>) -> Self {
        self.validator = Rc::new(DefaultAssertionValidator::new(manager.clone()));
        self.assertion_manager = manager;
        self
    }

    pub fn with_validator(mut self, validator: Rc<dyn AssertionValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_query_comparator(mut self, comparator: Rc<dyn QueryComparator>) -> Self {
        self.query_comparator = comparator;
        self
    }

    pub fn with_param_comparator(mut self, comparator: Rc<dyn ParamComparator>) -> Self {
        self.param_comparator = comparator;
        self
    }

    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }
}

impl Default for MockConfig {
    fn default() -> Self {
        let assertion_manager: Rc<dyn AssertionManager> = Rc::new(NoopAssertionManager);
        Self {
            driver_name: "mock".to_string(),
            server_version: "1.0.0".to_string(),
            client_version: "1.0.0".to_string(),
            error_mode: ErrorMode::Exception, // PHP 8 default
            query_comparator: Rc::new(RegexComparator),
            param_comparator: Rc::new(NaturalParamComparator::default()),
            validator: Rc::new(DefaultAssertionValidator::new(assertion_manager.clone())),
            assertion_manager,
        }
    }
}
