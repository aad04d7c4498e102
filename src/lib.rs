//! A PDO test double
//!
//! Code written against `PdoConnection`/`PdoStatement` runs against a
//! `MockConnection` programmed with the queries it is expected to issue, the
//! parameters it should bind and the rows it gets back.

pub mod core;
pub mod mock;
pub mod pdo;

pub mod prelude {
    pub use crate::core::value::{ArrayData, ArrayKey, ObjectRef, Val, VarRef};
    pub use crate::mock::{
        Expectation, MockConfig, MockConnection, MockStatement, ResultSet,
    };
    pub use crate::pdo::consts;
    pub use crate::pdo::{
        Attribute, ClassDef, ErrorInfo, ErrorMode, FetchArgs, FetchMode, ParamType, PdoConnection,
        PdoError, PdoException, PdoStatement,
    };
}
