//! Fetch mode emulation
//!
//! Turns positional result rows into the shapes PDO produces for each fetch
//! mode, after running every value through the connection's casting rules
//! (oracle nulls, stringify fetches, declared column types) and folding
//! column names per `PDO::ATTR_CASE`.
//!
//! Reference: $PHP_SRC_PATH/ext/pdo/pdo_stmt.c - do_fetch, fetch_value

use crate::core::value::{ArrayData, ArrayKey, ObjectRef, Val};
use crate::pdo::error::PdoError;
use crate::pdo::object::{ClassDef, ClassRegistry};
use crate::pdo::types::{
    CaseMode, FetchArgs, FetchFlags, FetchMode, FetchStyle, OracleNulls, ParamType,
};
use std::rc::Rc;

/// Connection attributes that shape fetched values
#[derive(Debug, Clone)]
pub(crate) struct FetchContext {
    pub case: CaseMode,
    pub oracle_nulls: OracleNulls,
    pub stringify: bool,
    pub classes: Rc<ClassRegistry>,
}

impl FetchContext {
    /// Cast one fetched value
    ///
    /// `declared` is the bound column type on the FETCH_BOUND path.
    pub fn cast(&self, raw: Val, declared: Option<ParamType>) -> Val {
        let mut value = raw;

        if self.oracle_nulls == OracleNulls::EmptyString
            && matches!(&value, Val::String(s) if s.is_empty())
        {
            value = Val::Null;
        }

        if !value.is_null() {
            value = match declared {
                Some(ParamType::Null) => Val::Null,
                Some(ParamType::Int) => Val::Int(value.to_int()),
                Some(ParamType::Str) | Some(ParamType::Lob) => Val::String(value.to_php_string()),
                Some(ParamType::Bool) => Val::Bool(value.to_bool()),
                _ => value,
            };
        }

        // false becomes "0", not ""
        // Reference: $PHP_SRC_PATH/ext/pdo/pdo_stmt.c - fetch_value
        if self.stringify {
            value = match value {
                Val::Bool(b) => Val::from(if b { "1" } else { "0" }),
                scalar @ (Val::Int(_) | Val::Float(_)) => Val::String(scalar.to_php_string()),
                other => other,
            };
        }

        if self.oracle_nulls == OracleNulls::ToString && value.is_null() {
            value = Val::String(String::new());
        }
        value
    }

    pub fn column_names(&self, columns: &[String]) -> Vec<String> {
        columns.iter().map(|c| self.case.apply(c)).collect()
    }

    fn cast_row(&self, row: Vec<Val>) -> Vec<Val> {
        row.into_iter().map(|v| self.cast(v, None)).collect()
    }
}

/// Position-to-name modes need exactly one value per declared column
pub(crate) fn check_arity(columns: &[String], row: &[Val], row_no: usize) -> Result<(), PdoError> {
    if columns.is_empty() {
        return Err(PdoError::Value(
            "The result set declares no columns; only PDO::FETCH_NUM, PDO::FETCH_COLUMN and PDO::FETCH_FUNC can be used"
                .to_string(),
        ));
    }
    if row.len() != columns.len() {
        return Err(PdoError::Value(format!(
            "Row {} has {} value(s) but the result set declares {} column(s)",
            row_no,
            row.len(),
            columns.len()
        )));
    }
    Ok(())
}

/// Reject mode/argument combinations up front
/// Reference: $PHP_SRC_PATH/ext/pdo/pdo_stmt.c - pdo_stmt_setup_fetch_mode
pub(crate) fn validate(
    style: FetchStyle,
    args: &FetchArgs,
    fetch_all: bool,
) -> Result<(), PdoError> {
    match style.mode {
        FetchMode::Lazy if fetch_all => Err(PdoError::Value(
            "PDOStatement::fetchAll(): Argument #1 ($mode) cannot be PDO::FETCH_LAZY".to_string(),
        )),
        FetchMode::Bound if fetch_all => Err(PdoError::Value(
            "PDOStatement::fetchAll(): Argument #1 ($mode) cannot be PDO::FETCH_BOUND".to_string(),
        )),
        FetchMode::Func if !fetch_all => Err(PdoError::Value(
            "PDO::FETCH_FUNC can only be used with PDOStatement::fetchAll()".to_string(),
        )),
        FetchMode::Func if !matches!(args, FetchArgs::Func(_)) => Err(PdoError::Value(
            "PDO::FETCH_FUNC requires a callback".to_string(),
        )),
        FetchMode::Into if !matches!(args, FetchArgs::Into(_)) => Err(PdoError::Value(
            "PDO::FETCH_INTO requires an object".to_string(),
        )),
        FetchMode::Column if !matches!(args, FetchArgs::None | FetchArgs::Column(_)) => Err(
            PdoError::Value("PDO::FETCH_COLUMN requires a column index".to_string()),
        ),
        FetchMode::Class if !matches!(args, FetchArgs::None | FetchArgs::Class { .. }) => Err(
            PdoError::Value("PDO::FETCH_CLASS requires a class name".to_string()),
        ),
        _ if (style.flags.is_group() || style.flags.is_unique()) && !fetch_all => {
            Err(PdoError::Value(
                "PDO::FETCH_GROUP and PDO::FETCH_UNIQUE can only be used with PDOStatement::fetchAll()"
                    .to_string(),
            ))
        }
        _ => Ok(()),
    }
}

fn invalid_column(index: usize) -> PdoError {
    PdoError::Value(format!("Invalid column index {}", index))
}

/// Build one row in any mode except FETCH_BOUND
pub(crate) fn make_row(
    ctx: &FetchContext,
    style: FetchStyle,
    args: &FetchArgs,
    columns: &[String],
    row: Vec<Val>,
    row_no: usize,
) -> Result<Val, PdoError> {
    if style.mode.maps_names() || style.mode == FetchMode::KeyPair {
        check_arity(columns, &row, row_no)?;
    }
    let names = ctx.column_names(columns);
    let values = ctx.cast_row(row);

    match style.mode {
        FetchMode::Num => Ok(Val::Array(ArrayData::list(values))),
        FetchMode::Assoc => Ok(Val::Array(assoc(&names, values))),
        FetchMode::Both => {
            let mut arr = ArrayData::new();
            for (i, (name, value)) in names.iter().zip(values).enumerate() {
                arr.insert(ArrayKey::from(name.as_str()), value.clone());
                arr.insert(ArrayKey::Int(i as i64), value);
            }
            Ok(Val::Array(arr))
        }
        FetchMode::Named => Ok(Val::Array(named(&names, values))),
        FetchMode::Obj => Ok(Val::Object(object("stdClass", &names, values))),
        FetchMode::Lazy => Ok(Val::Object(object("PDORow", &names, values))),
        FetchMode::Column => {
            let index = match args {
                FetchArgs::Column(i) => *i,
                _ => 0,
            };
            values
                .into_iter()
                .nth(index)
                .ok_or_else(|| invalid_column(index))
        }
        FetchMode::KeyPair => {
            if values.len() != 2 {
                return Err(PdoError::Value(
                    "PDO::FETCH_KEY_PAIR fetch mode requires the result set to contain exactly 2 columns"
                        .to_string(),
                ));
            }
            let mut it = values.into_iter();
            let (key, value) = (it.next().unwrap_or_default(), it.next().unwrap_or_default());
            let mut arr = ArrayData::new();
            arr.insert(ArrayKey::from_val(&key), value);
            Ok(Val::Array(arr))
        }
        FetchMode::Class => {
            let late = style.flags.contains(FetchFlags::PROPS_LATE);
            let (class, ctor_args, names, values) =
                if style.flags.contains(FetchFlags::CLASSTYPE) {
                    let mut names = names.into_iter();
                    let mut values = values.into_iter();
                    names.next();
                    let class_name = values.next().unwrap_or_default().to_php_string();
                    (
                        ctx.classes.resolve(&class_name),
                        Vec::new(),
                        names.collect(),
                        values.collect(),
                    )
                } else {
                    let (class, ctor_args) = class_from_args(ctx, args)?;
                    (class, ctor_args, names, values)
                };
            let obj = hydrate(&class, &ctor_args, late, &names, values)?;
            Ok(Val::Object(obj))
        }
        FetchMode::Into => {
            let FetchArgs::Into(obj) = args else {
                return Err(PdoError::Value("PDO::FETCH_INTO requires an object".to_string()));
            };
            for (name, value) in names.into_iter().zip(values) {
                obj.set(name, value);
            }
            Ok(Val::Object(obj.clone()))
        }
        FetchMode::Func => {
            let FetchArgs::Func(f) = args else {
                return Err(PdoError::Value("PDO::FETCH_FUNC requires a callback".to_string()));
            };
            f(&values)
        }
        FetchMode::Bound | FetchMode::Default => Err(PdoError::Value(format!(
            "Fetch mode {:?} cannot build a row",
            style.mode
        ))),
    }
}

/// All remaining rows, honoring FETCH_GROUP/FETCH_UNIQUE and FETCH_KEY_PAIR
pub(crate) fn collect_all(
    ctx: &FetchContext,
    style: FetchStyle,
    args: &FetchArgs,
    columns: &[String],
    rows: impl Iterator<Item = (usize, Vec<Val>)>,
) -> Result<ArrayData, PdoError> {
    let mut result = ArrayData::new();
    let grouped = style.flags.is_group() || style.flags.is_unique();

    for (row_no, row) in rows {
        if grouped {
            if row.is_empty() {
                return Err(invalid_column(0));
            }
            if style.mode.maps_names() {
                check_arity(columns, &row, row_no)?;
            }
            let mut values = row.into_iter();
            let key = ctx.cast(values.next().unwrap_or_default(), None);
            let rest_columns = columns.get(1..).unwrap_or_default();
            let item = make_row(ctx, style, args, rest_columns, values.collect(), row_no)?;
            let key = ArrayKey::from_val(&key);
            if style.flags.is_unique() {
                result.insert(key, item);
            } else {
                match result.get_mut(&key) {
                    Some(Val::Array(group)) => {
                        group.push(item);
                    }
                    _ => {
                        result.insert(key, Val::Array(ArrayData::list([item])));
                    }
                }
            }
        } else if style.mode == FetchMode::KeyPair {
            if let Val::Array(pair) = make_row(ctx, style, args, columns, row, row_no)? {
                for (k, v) in pair.map {
                    result.insert(k, v);
                }
            }
        } else {
            result.push(make_row(ctx, style, args, columns, row, row_no)?);
        }
    }
    Ok(result)
}

fn assoc(names: &[String], values: Vec<Val>) -> ArrayData {
    let mut arr = ArrayData::new();
    for (name, value) in names.iter().zip(values) {
        arr.insert(ArrayKey::from(name.as_str()), value);
    }
    arr
}

/// Like assoc, but repeated column names collect their values in a list
fn named(names: &[String], values: Vec<Val>) -> ArrayData {
    let mut arr = ArrayData::new();
    for (name, value) in names.iter().zip(values) {
        let key = ArrayKey::from(name.as_str());
        match arr.get_mut(&key) {
            Some(Val::Array(list)) => {
                list.push(value);
            }
            Some(existing) => {
                let first = std::mem::take(existing);
                *existing = Val::Array(ArrayData::list([first, value]));
            }
            None => {
                arr.insert(key, value);
            }
        }
    }
    arr
}

fn object(class: &str, names: &[String], values: Vec<Val>) -> ObjectRef {
    let obj = ObjectRef::new(class);
    for (name, value) in names.iter().zip(values) {
        obj.set(name.clone(), value);
    }
    obj
}

fn class_from_args(ctx: &FetchContext, args: &FetchArgs) -> Result<(ClassDef, Vec<Val>), PdoError> {
    match args {
        FetchArgs::Class { class, ctor_args } => {
            let def = resolve_class(ctx, class)?;
            Ok((def, ctor_args.clone()))
        }
        _ => Ok((ClassDef::std_class(), Vec::new())),
    }
}

/// A registered class, or stdClass; other names are unknown
pub(crate) fn resolve_class(ctx: &FetchContext, name: &str) -> Result<ClassDef, PdoError> {
    if let Some(def) = ctx.classes.get(name) {
        return Ok(def.clone());
    }
    if name.eq_ignore_ascii_case("stdClass") {
        return Ok(ClassDef::std_class());
    }
    Err(PdoError::Value(format!("Class \"{}\" not found", name)))
}

/// Instantiate and populate: properties before the constructor runs, or after
/// it with FETCH_PROPS_LATE
pub(crate) fn hydrate(
    class: &ClassDef,
    ctor_args: &[Val],
    props_late: bool,
    names: &[String],
    values: Vec<Val>,
) -> Result<ObjectRef, PdoError> {
    let obj = class.instantiate();
    if props_late {
        class.construct(&obj, ctor_args)?;
    }
    for (name, value) in names.iter().zip(values) {
        obj.set(name.clone(), value);
    }
    if !props_late {
        class.construct(&obj, ctor_args)?;
    }
    Ok(obj)
}
