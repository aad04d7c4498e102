//! PDO Error Handling
//!
//! Four kinds of failure leave the mock:
//! - expectation failures (the test itself is wrong)
//! - simulated database exceptions (`PDOException`)
//! - usage errors of the emulated API (`ValueError`/`Error` in PHP)
//! - invalid mock configuration
//!
//! Reference: $PHP_SRC_PATH/ext/pdo/pdo_dbh.c - pdo_raise_impl_error

use super::types::ErrorInfo;
use std::fmt;

/// Errors surfaced by the mock connection and statements
#[derive(Debug, Clone, PartialEq)]
pub enum PdoError {
    /// Expectation protocol violation (empty queue, wrong kind, mismatch)
    ExpectationFailed(String),

    /// Simulated `PDOException`
    Exception(PdoException),

    /// Misuse of the emulated API, never gated by the error mode
    Value(String),

    /// Invalid mock configuration
    InvalidArgument(String),
}

impl PdoError {
    pub fn is_expectation_failure(&self) -> bool {
        matches!(self, PdoError::ExpectationFailed(_))
    }

    /// The simulated exception, if this is one
    pub fn exception(&self) -> Option<&PdoException> {
        match self {
            PdoError::Exception(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for PdoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdoError::ExpectationFailed(msg) => write!(f, "Expectation failed: {}", msg),
            PdoError::Exception(e) => write!(f, "{}", e),
            PdoError::Value(msg) => write!(f, "{}", msg),
            PdoError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
        }
    }
}

impl std::error::Error for PdoError {}

impl From<PdoError> for String {
    fn from(err: PdoError) -> String {
        err.to_string()
    }
}

impl From<PdoException> for PdoError {
    fn from(e: PdoException) -> Self {
        PdoError::Exception(e)
    }
}

/// A simulated `PDOException`
///
/// `code` is the SQLSTATE string, as `PDOException::getCode()` returns it
/// for driver errors.
#[derive(Debug, Clone, PartialEq)]
pub struct PdoException {
    pub message: String,
    pub code: String,
    pub error_info: Option<ErrorInfo>,
}

impl PdoException {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: String::new(),
            error_info: None,
        }
    }

    /// Attach the driver error triple; an empty message is derived from it
    pub fn with_error_info(
        mut self,
        sqlstate: impl Into<String>,
        driver_code: Option<i64>,
        driver_message: Option<&str>,
    ) -> Self {
        let info = ErrorInfo::new(sqlstate, driver_code, driver_message);
        if self.message.is_empty() {
            self.message = info.to_string();
        }
        self.code = info.sqlstate.clone();
        self.error_info = Some(info);
        self
    }

    pub fn from_error_info(info: ErrorInfo) -> Self {
        Self {
            message: info.to_string(),
            code: info.sqlstate.clone(),
            error_info: Some(info),
        }
    }

    /// Error triple recorded on the statement/connection when this is raised.
    /// Exceptions built without one report a general error carrying the message.
    pub fn error_info(&self) -> ErrorInfo {
        match &self.error_info {
            Some(info) => info.clone(),
            None => {
                let sqlstate = if self.code.len() == 5 {
                    self.code.as_str()
                } else {
                    "HY000"
                };
                ErrorInfo::new(sqlstate, None, Some(&self.message))
            }
        }
    }
}

impl fmt::Display for PdoException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PDOException: {}", self.message)
    }
}

impl std::error::Error for PdoException {}
