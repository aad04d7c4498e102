//! PDO Types and Enumerations
//!
//! This module defines core types used throughout the mock:
//! - Error modes, fetch modes and flags, parameter types
//! - Attribute identifiers and their enumerated values
//! - Parameter identifiers (position/name) and parameter sets
//! - Error information triples
//!
//! Reference: $PHP_SRC_PATH/ext/pdo/php_pdo_driver.h

use super::error::PdoError;
use crate::core::value::{ArrayData, ArrayKey, ObjectRef, Val};
use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;

/// PDO error modes
/// Reference: enum pdo_error_mode in php_pdo_driver.h
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i64)]
pub enum ErrorMode {
    Silent = 0,    // PDO::ERRMODE_SILENT - just set error codes
    Warning = 1,   // PDO::ERRMODE_WARNING - raise E_WARNING
    Exception = 2, // PDO::ERRMODE_EXCEPTION - throw exceptions
}

impl ErrorMode {
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(ErrorMode::Silent),
            1 => Some(ErrorMode::Warning),
            2 => Some(ErrorMode::Exception),
            _ => None,
        }
    }
}

/// PDO fetch modes
/// Reference: enum pdo_fetch_type in php_pdo_driver.h
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i64)]
pub enum FetchMode {
    Default = 0,  // PDO::FETCH_DEFAULT - use the statement/connection default
    Lazy = 1,     // PDO::FETCH_LAZY - PDORow object
    Assoc = 2,    // PDO::FETCH_ASSOC - associative array
    Num = 3,      // PDO::FETCH_NUM - numeric array
    Both = 4,     // PDO::FETCH_BOTH - both numeric and associative
    Obj = 5,      // PDO::FETCH_OBJ - anonymous object
    Bound = 6,    // PDO::FETCH_BOUND - fetch into bound variables
    Column = 7,   // PDO::FETCH_COLUMN - single column
    Class = 8,    // PDO::FETCH_CLASS - class instance
    Into = 9,     // PDO::FETCH_INTO - existing object
    Func = 10,    // PDO::FETCH_FUNC - callback result (fetchAll only)
    Named = 11,   // PDO::FETCH_NAMED - assoc, duplicate names collected
    KeyPair = 12, // PDO::FETCH_KEY_PAIR - first column => second column
}

impl FetchMode {
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(FetchMode::Default),
            1 => Some(FetchMode::Lazy),
            2 => Some(FetchMode::Assoc),
            3 => Some(FetchMode::Num),
            4 => Some(FetchMode::Both),
            5 => Some(FetchMode::Obj),
            6 => Some(FetchMode::Bound),
            7 => Some(FetchMode::Column),
            8 => Some(FetchMode::Class),
            9 => Some(FetchMode::Into),
            10 => Some(FetchMode::Func),
            11 => Some(FetchMode::Named),
            12 => Some(FetchMode::KeyPair),
            _ => None,
        }
    }

    /// Modes whose rows are keyed by column name
    pub fn maps_names(self) -> bool {
        matches!(
            self,
            FetchMode::Lazy
                | FetchMode::Assoc
                | FetchMode::Both
                | FetchMode::Obj
                | FetchMode::Class
                | FetchMode::Into
                | FetchMode::Named
        )
    }
}

/// Fetch mode modifier bits
/// Reference: PDO_FETCH_GROUP and friends in php_pdo_driver.h
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FetchFlags(i64);

impl FetchFlags {
    pub const NONE: FetchFlags = FetchFlags(0);
    pub const GROUP: FetchFlags = FetchFlags(0x10000);
    pub const UNIQUE: FetchFlags = FetchFlags(0x30000);
    pub const CLASSTYPE: FetchFlags = FetchFlags(0x40000);
    pub const SERIALIZE: FetchFlags = FetchFlags(0x80000);
    pub const PROPS_LATE: FetchFlags = FetchFlags(0x100000);

    const ALL: i64 = 0x10000 | 0x30000 | 0x40000 | 0x80000 | 0x100000;

    pub fn bits(self) -> i64 {
        self.0
    }

    pub fn contains(self, other: FetchFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// UNIQUE shares the GROUP bit, so grouping only applies without it
    pub fn is_group(self) -> bool {
        self.contains(Self::GROUP) && !self.is_unique()
    }

    pub fn is_unique(self) -> bool {
        self.contains(Self::UNIQUE)
    }
}

/// A parsed fetch mode: base mode plus modifier flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchStyle {
    pub mode: FetchMode,
    pub flags: FetchFlags,
}

impl FetchStyle {
    pub fn new(mode: FetchMode) -> Self {
        Self {
            mode,
            flags: FetchFlags::NONE,
        }
    }

    /// Split a raw `PDO::FETCH_*` integer into mode and flags
    /// Reference: $PHP_SRC_PATH/ext/pdo/pdo_stmt.c - pdo_stmt_verify_mode
    pub fn parse(raw: i64) -> Result<Self, PdoError> {
        let flags = raw & !0xFFFF;
        if flags & !FetchFlags::ALL != 0 {
            return Err(PdoError::Value(
                "Fetch mode must be a bitmask of PDO::FETCH_* constants".into(),
            ));
        }
        let mode = FetchMode::from_i64(raw & 0xFFFF).ok_or_else(|| {
            PdoError::Value("Fetch mode must be a bitmask of PDO::FETCH_* constants".into())
        })?;
        let flags = FetchFlags(flags);

        if flags.contains(FetchFlags::SERIALIZE) {
            return Err(PdoError::Value(
                "PDO::FETCH_SERIALIZE is not supported".into(),
            ));
        }
        if (flags.contains(FetchFlags::CLASSTYPE) || flags.contains(FetchFlags::PROPS_LATE))
            && mode != FetchMode::Class
        {
            return Err(PdoError::Value(
                "PDO::FETCH_CLASSTYPE and PDO::FETCH_PROPS_LATE can only be used together with PDO::FETCH_CLASS"
                    .into(),
            ));
        }
        Ok(Self { mode, flags })
    }

    pub fn raw(self) -> i64 {
        self.mode as i64 | self.flags.bits()
    }
}

impl Default for FetchStyle {
    fn default() -> Self {
        Self::new(FetchMode::Both)
    }
}

/// Callback for `PDO::FETCH_FUNC`: receives the row's column values
pub type RowFunc = Rc<dyn Fn(&[Val]) -> Result<Val, PdoError>>;

/// Extra arguments of a fetch mode (`setFetchMode`, `fetchAll`, `query`)
#[derive(Clone, Default)]
pub enum FetchArgs {
    #[default]
    None,
    /// FETCH_COLUMN: 0-based column index
    Column(usize),
    /// FETCH_CLASS: class name and constructor arguments
    Class { class: String, ctor_args: Vec<Val> },
    /// FETCH_INTO: object updated in place
    Into(ObjectRef),
    /// FETCH_FUNC
    Func(RowFunc),
}

impl FetchArgs {
    pub fn class(name: impl Into<String>) -> Self {
        FetchArgs::Class {
            class: name.into(),
            ctor_args: Vec::new(),
        }
    }

    pub fn class_with_args(name: impl Into<String>, ctor_args: Vec<Val>) -> Self {
        FetchArgs::Class {
            class: name.into(),
            ctor_args,
        }
    }

    pub fn func<F>(f: F) -> Self
    where
        F: Fn(&[Val]) -> Result<Val, PdoError> + 'static,
    {
        FetchArgs::Func(Rc::new(f))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, FetchArgs::None)
    }
}

impl fmt::Debug for FetchArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchArgs::None => write!(f, "None"),
            FetchArgs::Column(i) => write!(f, "Column({})", i),
            FetchArgs::Class { class, ctor_args } => f
                .debug_struct("Class")
                .field("class", class)
                .field("ctor_args", ctor_args)
                .finish(),
            FetchArgs::Into(obj) => write!(f, "Into({:?})", obj),
            FetchArgs::Func(_) => write!(f, "Func(<callback>)"),
        }
    }
}

/// PDO parameter types
/// Reference: enum pdo_param_type in php_pdo_driver.h
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i64)]
pub enum ParamType {
    Null = 0, // PDO::PARAM_NULL
    Int = 1,  // PDO::PARAM_INT
    Str = 2,  // PDO::PARAM_STR
    Lob = 3,  // PDO::PARAM_LOB - large object
    Stmt = 4, // PDO::PARAM_STMT - statement (not commonly used)
    Bool = 5, // PDO::PARAM_BOOL
}

impl ParamType {
    /// Modifier bits (PARAM_STR_NATL, PARAM_STR_CHAR, PARAM_INPUT_OUTPUT) are ignored
    pub fn from_i64(value: i64) -> Option<Self> {
        match value & !(0x4000_0000 | 0x2000_0000 | 0x8000_0000) {
            0 => Some(ParamType::Null),
            1 => Some(ParamType::Int),
            2 => Some(ParamType::Str),
            3 => Some(ParamType::Lob),
            4 => Some(ParamType::Stmt),
            5 => Some(ParamType::Bool),
            _ => None,
        }
    }

    /// Type a value would naturally be bound as
    pub fn infer(value: &Val) -> Self {
        match value {
            Val::Null => ParamType::Null,
            Val::Bool(_) => ParamType::Bool,
            Val::Int(_) => ParamType::Int,
            _ => ParamType::Str,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ParamType::Null => "PDO::PARAM_NULL",
            ParamType::Int => "PDO::PARAM_INT",
            ParamType::Str => "PDO::PARAM_STR",
            ParamType::Lob => "PDO::PARAM_LOB",
            ParamType::Stmt => "PDO::PARAM_STMT",
            ParamType::Bool => "PDO::PARAM_BOOL",
        }
    }
}

/// PDO attributes
/// Reference: PDO attribute constants in pdo.c
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i64)]
pub enum Attribute {
    Autocommit = 0,         // PDO::ATTR_AUTOCOMMIT
    Prefetch = 1,           // PDO::ATTR_PREFETCH
    Timeout = 2,            // PDO::ATTR_TIMEOUT
    ErrorMode = 3,          // PDO::ATTR_ERRMODE
    ServerVersion = 4,      // PDO::ATTR_SERVER_VERSION
    ClientVersion = 5,      // PDO::ATTR_CLIENT_VERSION
    ServerInfo = 6,         // PDO::ATTR_SERVER_INFO
    ConnectionStatus = 7,   // PDO::ATTR_CONNECTION_STATUS
    Case = 8,               // PDO::ATTR_CASE
    CursorName = 9,         // PDO::ATTR_CURSOR_NAME
    Cursor = 10,            // PDO::ATTR_CURSOR
    OracleNulls = 11,       // PDO::ATTR_ORACLE_NULLS
    Persistent = 12,        // PDO::ATTR_PERSISTENT
    StatementClass = 13,    // PDO::ATTR_STATEMENT_CLASS
    FetchTableNames = 14,   // PDO::ATTR_FETCH_TABLE_NAMES
    FetchCatalogNames = 15, // PDO::ATTR_FETCH_CATALOG_NAMES
    DriverName = 16,        // PDO::ATTR_DRIVER_NAME
    StringifyFetches = 17,  // PDO::ATTR_STRINGIFY_FETCHES
    MaxColumnLen = 18,      // PDO::ATTR_MAX_COLUMN_LEN
    DefaultFetchMode = 19,  // PDO::ATTR_DEFAULT_FETCH_MODE
    EmulatePrep = 20,       // PDO::ATTR_EMULATE_PREPARES
    DefaultStrParam = 21,   // PDO::ATTR_DEFAULT_STR_PARAM
}

impl Attribute {
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(Attribute::Autocommit),
            1 => Some(Attribute::Prefetch),
            2 => Some(Attribute::Timeout),
            3 => Some(Attribute::ErrorMode),
            4 => Some(Attribute::ServerVersion),
            5 => Some(Attribute::ClientVersion),
            6 => Some(Attribute::ServerInfo),
            7 => Some(Attribute::ConnectionStatus),
            8 => Some(Attribute::Case),
            9 => Some(Attribute::CursorName),
            10 => Some(Attribute::Cursor),
            11 => Some(Attribute::OracleNulls),
            12 => Some(Attribute::Persistent),
            13 => Some(Attribute::StatementClass),
            14 => Some(Attribute::FetchTableNames),
            15 => Some(Attribute::FetchCatalogNames),
            16 => Some(Attribute::DriverName),
            17 => Some(Attribute::StringifyFetches),
            18 => Some(Attribute::MaxColumnLen),
            19 => Some(Attribute::DefaultFetchMode),
            20 => Some(Attribute::EmulatePrep),
            21 => Some(Attribute::DefaultStrParam),
            _ => None,
        }
    }
}

/// Column name case folding (PDO::ATTR_CASE)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i64)]
pub enum CaseMode {
    #[default]
    Natural = 0, // PDO::CASE_NATURAL
    Upper = 1, // PDO::CASE_UPPER
    Lower = 2, // PDO::CASE_LOWER
}

impl CaseMode {
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(CaseMode::Natural),
            1 => Some(CaseMode::Upper),
            2 => Some(CaseMode::Lower),
            _ => None,
        }
    }

    pub fn apply(self, name: &str) -> String {
        match self {
            CaseMode::Natural => name.to_string(),
            CaseMode::Upper => name.to_uppercase(),
            CaseMode::Lower => name.to_lowercase(),
        }
    }
}

/// Null/empty string conversion on fetch (PDO::ATTR_ORACLE_NULLS)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i64)]
pub enum OracleNulls {
    #[default]
    Natural = 0, // PDO::NULL_NATURAL
    EmptyString = 1, // PDO::NULL_EMPTY_STRING - "" becomes null
    ToString = 2,    // PDO::NULL_TO_STRING - null becomes ""
}

impl OracleNulls {
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(OracleNulls::Natural),
            1 => Some(OracleNulls::EmptyString),
            2 => Some(OracleNulls::ToString),
            _ => None,
        }
    }
}

/// Parameter identifier (position or name)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamIdentifier {
    Position(usize), // ?1, ?2, ... (1-based)
    Name(String),    // :name, :id, ... (stored without the colon)
}

impl ParamIdentifier {
    pub fn name(name: &str) -> Self {
        ParamIdentifier::Name(name.strip_prefix(':').unwrap_or(name).to_string())
    }

    /// Identifier for an execute()/with() array key: 0-based ints shift to 1-based
    pub fn from_array_key(key: &ArrayKey) -> Self {
        match key {
            ArrayKey::Int(i) if *i >= 0 => ParamIdentifier::Position(*i as usize + 1),
            ArrayKey::Int(i) => ParamIdentifier::Name(i.to_string()),
            ArrayKey::Str(s) => ParamIdentifier::name(s),
        }
    }
}

impl From<usize> for ParamIdentifier {
    fn from(position: usize) -> Self {
        ParamIdentifier::Position(position)
    }
}

impl From<i32> for ParamIdentifier {
    fn from(position: i32) -> Self {
        ParamIdentifier::Position(position.max(0) as usize)
    }
}

impl From<&str> for ParamIdentifier {
    fn from(name: &str) -> Self {
        ParamIdentifier::name(name)
    }
}

impl From<String> for ParamIdentifier {
    fn from(name: String) -> Self {
        ParamIdentifier::name(&name)
    }
}

impl fmt::Display for ParamIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamIdentifier::Position(p) => write!(f, "{}", p),
            ParamIdentifier::Name(n) => write!(f, ":{}", n),
        }
    }
}

/// A parameter value with its declared type; `None` means "not declared"
/// (array passed to execute(), or an expectation without explicit type)
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub value: Val,
    pub ty: Option<ParamType>,
}

impl Param {
    pub fn new(value: impl Into<Val>, ty: Option<ParamType>) -> Self {
        Self {
            value: value.into(),
            ty,
        }
    }

    /// Declared type, PARAM_STR when nothing was declared (PDO's default)
    pub fn declared_type(&self) -> ParamType {
        self.ty.unwrap_or(ParamType::Str)
    }
}

/// Parameters keyed by identifier, in binding order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamSet {
    params: IndexMap<ParamIdentifier, Param>,
}

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize a PHP parameter array: int keys are 0-based positions
    pub fn from_array(arr: &ArrayData) -> Self {
        let mut set = Self::new();
        for (key, value) in arr.iter() {
            set.insert(
                ParamIdentifier::from_array_key(key),
                Param::new(value.clone(), None),
            );
        }
        set
    }

    pub fn insert(&mut self, id: ParamIdentifier, param: Param) -> Option<Param> {
        self.params.insert(id, param)
    }

    pub fn get(&self, id: &ParamIdentifier) -> Option<&Param> {
        self.params.get(id)
    }

    pub fn get_mut(&mut self, id: &ParamIdentifier) -> Option<&mut Param> {
        self.params.get_mut(id)
    }

    /// Value of a parameter, `None` when it was not bound
    pub fn value(&self, id: impl Into<ParamIdentifier>) -> Option<&Val> {
        self.params.get(&id.into()).map(|p| &p.value)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParamIdentifier, &Param)> {
        self.params.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&ParamIdentifier, &mut Param)> {
        self.params.iter_mut()
    }
}

impl fmt::Display for ParamSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items: Vec<String> = self
            .params
            .iter()
            .map(|(id, p)| match p.ty {
                Some(ty) => format!("{} => {} ({})", id, p.value.describe(), ty.name()),
                None => format!("{} => {}", id, p.value.describe()),
            })
            .collect();
        write!(f, "[{}]", items.join(", "))
    }
}

/// SQLSTATE, driver-specific code, driver message
/// Reference: PDO::errorInfo()
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub sqlstate: String,
    pub driver_code: Option<i64>,
    pub message: Option<String>,
}

impl ErrorInfo {
    pub const SUCCESS: &'static str = "00000";

    pub fn new(
        sqlstate: impl Into<String>,
        driver_code: Option<i64>,
        message: Option<&str>,
    ) -> Self {
        Self {
            sqlstate: sqlstate.into(),
            driver_code,
            message: message.map(str::to_string),
        }
    }

    /// State before any operation ran: `["", null, null]`
    pub fn empty() -> Self {
        Self::new("", None, None)
    }

    pub fn success() -> Self {
        Self::new(Self::SUCCESS, None, None)
    }

    pub fn is_success(&self) -> bool {
        self.sqlstate == Self::SUCCESS
    }

    /// The triple as PHP returns it from errorInfo()
    pub fn to_array(&self) -> ArrayData {
        ArrayData::list([
            Val::String(self.sqlstate.clone()),
            self.driver_code.map(Val::Int).unwrap_or(Val::Null),
            self.message.clone().map(Val::String).unwrap_or(Val::Null),
        ])
    }
}

/// Human readable text for the SQLSTATE classes the mock reports
/// Reference: $PHP_SRC_PATH/ext/pdo/pdo_sqlstate.c
pub fn sqlstate_description(sqlstate: &str) -> &'static str {
    match sqlstate {
        "00000" => "No error",
        "01000" => "Warning",
        "08001" => "SQL client unable to establish SQL connection",
        "08003" => "Connection does not exist",
        "08S01" => "Communication link failure",
        "21S01" => "Insert value list does not match column list",
        "22001" => "String data, right truncated",
        "22003" => "Numeric value out of range",
        "22012" => "Division by zero",
        "23000" => "Integrity constraint violation",
        "25000" => "Invalid transaction state",
        "40001" => "Serialization failure",
        "42000" => "Syntax error or access violation",
        "42S01" => "Base table or view already exists",
        "42S02" => "Base table or view not found",
        "42S22" => "Column not found",
        "HY093" => "Invalid parameter number",
        "IM001" => "Driver does not support this function",
        _ => "General error",
    }
}

/// Same text PDO puts in an exception or warning:
/// `SQLSTATE[HY000]: General error: 1 no such table`
/// Reference: $PHP_SRC_PATH/ext/pdo/pdo_dbh.c - pdo_handle_error
impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SQLSTATE[{}]: {}",
            self.sqlstate,
            sqlstate_description(&self.sqlstate)
        )?;
        match (self.driver_code, &self.message) {
            (Some(code), Some(msg)) => write!(f, ": {} {}", code, msg),
            (None, Some(msg)) => write!(f, ": {}", msg),
            (Some(code), None) => write!(f, ": {}", code),
            (None, None) => Ok(()),
        }
    }
}
