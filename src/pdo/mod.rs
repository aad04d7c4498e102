//! PDO API model
//!
//! Types, constants and traits of the PDO API emulated by the mock:
//! - `types`: enums, parameter identifiers, error info
//! - `consts`: `PDO::*` constant values
//! - `driver`: connection and statement traits
//! - `object`: class definitions used for object hydration
//!
//! Reference: $PHP_SRC_PATH/ext/pdo/

pub mod consts;
pub mod driver;
pub mod dsn;
pub mod error;
pub mod object;
pub mod types;

pub use driver::{PdoConnection, PdoStatement};
pub use error::{PdoError, PdoException};
pub use object::{ClassDef, ClassRegistry};
pub use types::{
    Attribute, CaseMode, ErrorInfo, ErrorMode, FetchArgs, FetchFlags, FetchMode, FetchStyle,
    OracleNulls, Param, ParamIdentifier, ParamSet, ParamType,
};
