//! Mock PDO
//!
//! The expectation engine and the connection/statement pair driven by it:
//! - `expectation` / `manager`: programmed interactions and their FIFO queue
//! - `comparator`: query and parameter matching strategies
//! - `assertion`: validator and assertion-count hooks
//! - `result_set` / `fetch`: canned rows and fetch mode emulation
//! - `connection` / `statement`: the `PDO` and `PDOStatement` doubles

pub mod assertion;
pub mod comparator;
pub mod config;
pub mod connection;
pub mod expectation;
mod fetch;
pub mod manager;
pub mod result_set;
pub mod statement;

pub use assertion::{
    AssertionCounter, AssertionManager, AssertionValidator, DefaultAssertionValidator,
    NoopAssertionManager,
};
pub use comparator::{
    ExactComparator, LooseParamComparator, NaturalParamComparator, ParamComparator,
    ParamExpectation, QueryComparator, RegexComparator, StrictParamComparator,
};
pub use config::MockConfig;
pub use connection::MockConnection;
pub use expectation::{Expectation, ExpectationKind};
pub use result_set::{ResultSet, RowIterator};
pub use statement::MockStatement;
