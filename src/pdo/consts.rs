//! PDO class constants
//!
//! Integer values of the `PDO::*` constants the mock understands, under their
//! PHP names. Raw values are what `fetch`, `set_attribute` and friends accept.
//!
//! Reference: $PHP_SRC_PATH/ext/pdo/pdo_dbh.stub.php

// Parameter types
pub const PARAM_NULL: i64 = 0;
pub const PARAM_INT: i64 = 1;
pub const PARAM_STR: i64 = 2;
pub const PARAM_LOB: i64 = 3;
pub const PARAM_STMT: i64 = 4;
pub const PARAM_BOOL: i64 = 5;
pub const PARAM_STR_NATL: i64 = 0x4000_0000;
pub const PARAM_STR_CHAR: i64 = 0x2000_0000;
pub const PARAM_INPUT_OUTPUT: i64 = 0x8000_0000;

// Fetch modes
pub const FETCH_DEFAULT: i64 = 0;
pub const FETCH_LAZY: i64 = 1;
pub const FETCH_ASSOC: i64 = 2;
pub const FETCH_NUM: i64 = 3;
pub const FETCH_BOTH: i64 = 4;
pub const FETCH_OBJ: i64 = 5;
pub const FETCH_BOUND: i64 = 6;
pub const FETCH_COLUMN: i64 = 7;
pub const FETCH_CLASS: i64 = 8;
pub const FETCH_INTO: i64 = 9;
pub const FETCH_FUNC: i64 = 10;
pub const FETCH_NAMED: i64 = 11;
pub const FETCH_KEY_PAIR: i64 = 12;

// Fetch flags
pub const FETCH_GROUP: i64 = 0x10000;
pub const FETCH_UNIQUE: i64 = 0x30000;
pub const FETCH_CLASSTYPE: i64 = 0x40000;
pub const FETCH_SERIALIZE: i64 = 0x80000;
pub const FETCH_PROPS_LATE: i64 = 0x100000;

// Attributes
pub const ATTR_AUTOCOMMIT: i64 = 0;
pub const ATTR_PREFETCH: i64 = 1;
pub const ATTR_TIMEOUT: i64 = 2;
pub const ATTR_ERRMODE: i64 = 3;
pub const ATTR_SERVER_VERSION: i64 = 4;
pub const ATTR_CLIENT_VERSION: i64 = 5;
pub const ATTR_SERVER_INFO: i64 = 6;
pub const ATTR_CONNECTION_STATUS: i64 = 7;
pub const ATTR_CASE: i64 = 8;
pub const ATTR_CURSOR_NAME: i64 = 9;
pub const ATTR_CURSOR: i64 = 10;
pub const ATTR_ORACLE_NULLS: i64 = 11;
pub const ATTR_PERSISTENT: i64 = 12;
pub const ATTR_STATEMENT_CLASS: i64 = 13;
pub const ATTR_FETCH_TABLE_NAMES: i64 = 14;
pub const ATTR_FETCH_CATALOG_NAMES: i64 = 15;
pub const ATTR_DRIVER_NAME: i64 = 16;
pub const ATTR_STRINGIFY_FETCHES: i64 = 17;
pub const ATTR_MAX_COLUMN_LEN: i64 = 18;
pub const ATTR_DEFAULT_FETCH_MODE: i64 = 19;
pub const ATTR_EMULATE_PREPARES: i64 = 20;
pub const ATTR_DEFAULT_STR_PARAM: i64 = 21;

// Error modes
pub const ERRMODE_SILENT: i64 = 0;
pub const ERRMODE_WARNING: i64 = 1;
pub const ERRMODE_EXCEPTION: i64 = 2;

// Column name case
pub const CASE_NATURAL: i64 = 0;
pub const CASE_UPPER: i64 = 1;
pub const CASE_LOWER: i64 = 2;

// Null handling
pub const NULL_NATURAL: i64 = 0;
pub const NULL_EMPTY_STRING: i64 = 1;
pub const NULL_TO_STRING: i64 = 2;

pub const ERR_NONE: &str = "00000";
