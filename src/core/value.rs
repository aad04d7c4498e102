//! PHP value model
//!
//! Every value that crosses the mocked PDO surface is a `Val`: bound
//! parameters, canned column values, and the arrays/objects produced by the
//! different fetch modes. Arrays keep insertion order like PHP hash tables,
//! objects have reference semantics.
//!
//! Reference: $PHP_SRC_PATH/Zend/zend_types.h

use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Ordered PHP array
/// Reference: $PHP_SRC_PATH/Zend/zend_hash.h - HashTable::nNextFreeElement
#[derive(Debug, Clone, Default)]
pub struct ArrayData {
    pub map: IndexMap<ArrayKey, Val>,
    pub next_free: i64, // Cached next auto-increment index
}

impl ArrayData {
    pub fn new() -> Self {
        Self {
            map: IndexMap::new(),
            next_free: 0,
        }
    }

    /// Build a list (`[0 => a, 1 => b, ...]`)
    pub fn list<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Val>,
    {
        let mut arr = Self::new();
        for value in values {
            arr.push(value.into());
        }
        arr
    }

    /// Build an array from key/value pairs, keeping the given order
    pub fn assoc<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<ArrayKey>,
        V: Into<Val>,
    {
        let mut arr = Self::new();
        for (key, value) in pairs {
            arr.insert(key.into(), value.into());
        }
        arr
    }

    /// Insert a key-value pair and update next_free if needed
    /// Reference: $PHP_SRC_PATH/Zend/zend_hash.c - _zend_hash_index_add_or_update_i
    pub fn insert(&mut self, key: ArrayKey, value: Val) -> Option<Val> {
        if let ArrayKey::Int(i) = &key {
            if *i >= self.next_free {
                self.next_free = i.saturating_add(1);
            }
        }
        self.map.insert(key, value)
    }

    /// Append a value with auto-incremented key. Returns false when the next
    /// index is already taken, which only happens once `i64::MAX` is used.
    /// Reference: $PHP_SRC_PATH/Zend/zend_hash.c - zend_hash_next_index_insert
    pub fn push(&mut self, value: Val) -> bool {
        let key = ArrayKey::Int(self.next_free);
        if self.map.contains_key(&key) {
            return false;
        }
        self.map.insert(key, value);
        self.next_free = self.next_free.saturating_add(1);
        true
    }

    pub fn get(&self, key: impl Into<ArrayKey>) -> Option<&Val> {
        self.map.get(&key.into())
    }

    pub fn get_mut(&mut self, key: &ArrayKey) -> Option<&mut Val> {
        self.map.get_mut(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ArrayKey, &Val)> {
        self.map.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ArrayKey> {
        self.map.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &Val> {
        self.map.values()
    }
}

impl PartialEq for ArrayData {
    fn eq(&self, other: &Self) -> bool {
        self.map == other.map
        // Don't compare next_free as it's cached metadata
    }
}

impl<V: Into<Val>> FromIterator<V> for ArrayData {
    fn from_iter<T: IntoIterator<Item = V>>(iter: T) -> Self {
        Self::list(iter)
    }
}

#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub enum ArrayKey {
    Int(i64),
    Str(String),
}

impl ArrayKey {
    /// Convert a value used as an array offset
    /// Reference: $PHP_SRC_PATH/Zend/zend_execute.c - zend_fetch_dimension_address_inner
    pub fn from_val(val: &Val) -> ArrayKey {
        match val {
            Val::Int(i) => ArrayKey::Int(*i),
            Val::Bool(b) => ArrayKey::Int(*b as i64),
            Val::Float(f) => ArrayKey::Int(*f as i64),
            Val::Null => ArrayKey::Str(String::new()),
            Val::String(s) => ArrayKey::from(s.as_str()),
            other => ArrayKey::Str(other.to_php_string()),
        }
    }
}

impl From<i64> for ArrayKey {
    fn from(i: i64) -> Self {
        ArrayKey::Int(i)
    }
}

impl From<i32> for ArrayKey {
    fn from(i: i32) -> Self {
        ArrayKey::Int(i as i64)
    }
}

impl From<usize> for ArrayKey {
    fn from(i: usize) -> Self {
        ArrayKey::Int(i as i64)
    }
}

/// Canonical decimal integer strings become integer keys ("12" but not "012" or "1.5")
impl From<&str> for ArrayKey {
    fn from(s: &str) -> Self {
        let digits = s.strip_prefix('-').unwrap_or(s);
        let canonical = !digits.is_empty()
            && digits.bytes().all(|b| b.is_ascii_digit())
            && (digits == "0" || !digits.starts_with('0'))
            && s != "-0";
        if canonical {
            if let Ok(i) = s.parse::<i64>() {
                return ArrayKey::Int(i);
            }
        }
        ArrayKey::Str(s.to_string())
    }
}

impl From<String> for ArrayKey {
    fn from(s: String) -> Self {
        ArrayKey::from(s.as_str())
    }
}

impl fmt::Display for ArrayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrayKey::Int(i) => write!(f, "{}", i),
            ArrayKey::Str(s) => write!(f, "'{}'", s),
        }
    }
}

/// Object payload: class name plus ordered properties
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectData {
    pub class: String,
    pub properties: IndexMap<String, Val>,
}

/// Shared object handle. Cloning the handle aliases the same object.
#[derive(Clone)]
pub struct ObjectRef(Rc<RefCell<ObjectData>>);

impl ObjectRef {
    pub fn new(class: impl Into<String>) -> Self {
        ObjectRef(Rc::new(RefCell::new(ObjectData {
            class: class.into(),
            properties: IndexMap::new(),
        })))
    }

    pub fn std_class() -> Self {
        Self::new("stdClass")
    }

    pub fn class_name(&self) -> String {
        self.0.borrow().class.clone()
    }

    pub fn get(&self, name: &str) -> Option<Val> {
        self.0.borrow().properties.get(name).cloned()
    }

    pub fn set(&self, name: impl Into<String>, value: impl Into<Val>) {
        self.0
            .borrow_mut()
            .properties
            .insert(name.into(), value.into());
    }

    pub fn has(&self, name: &str) -> bool {
        self.0.borrow().properties.contains_key(name)
    }

    /// Snapshot of the properties in declaration/assignment order
    pub fn properties(&self) -> IndexMap<String, Val> {
        self.0.borrow().properties.clone()
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.0.borrow() == *other.0.borrow()
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.0.borrow();
        f.debug_struct(&data.class)
            .field("properties", &data.properties)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub enum Val {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(ArrayData),
    Object(ObjectRef),
}

impl PartialEq for Val {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Val::Null, Val::Null) => true,
            (Val::Bool(a), Val::Bool(b)) => a == b,
            (Val::Int(a), Val::Int(b)) => a == b,
            (Val::Float(a), Val::Float(b)) => a == b,
            (Val::String(a), Val::String(b)) => a == b,
            (Val::Array(a), Val::Array(b)) => a == b,
            (Val::Object(a), Val::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl Val {
    pub fn type_name(&self) -> &'static str {
        match self {
            Val::Null => "null",
            Val::Bool(_) => "bool",
            Val::Int(_) => "int",
            Val::Float(_) => "float",
            Val::String(_) => "string",
            Val::Array(_) => "array",
            Val::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Val::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Val::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Val::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayData> {
        match self {
            Val::Array(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Val::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Array element lookup; `None` for non-arrays and missing keys
    pub fn get(&self, key: impl Into<ArrayKey>) -> Option<&Val> {
        self.as_array().and_then(|arr| arr.get(key))
    }

    /// Object property lookup; `None` for non-objects and missing properties
    pub fn prop(&self, name: &str) -> Option<Val> {
        self.as_object().and_then(|obj| obj.get(name))
    }

    /// Convert to string following PHP's zend_make_printable_zval semantics
    /// Reference: $PHP_SRC_PATH/Zend/zend_operators.c - zend_make_printable_zval
    pub fn to_php_string(&self) -> String {
        match self {
            Val::Null => String::new(),
            Val::Bool(b) => {
                if *b {
                    "1".to_string()
                } else {
                    String::new()
                }
            }
            Val::Int(i) => i.to_string(),
            Val::Float(f) => format_float(*f),
            Val::String(s) => s.clone(),
            Val::Array(_) => "Array".to_string(),
            Val::Object(_) => "Object".to_string(),
        }
    }

    /// Convert to boolean following PHP's zend_is_true semantics
    /// Reference: $PHP_SRC_PATH/Zend/zend_operators.c - zend_is_true
    pub fn to_bool(&self) -> bool {
        match self {
            Val::Null => false,
            Val::Bool(b) => *b,
            Val::Int(i) => *i != 0,
            Val::Float(f) => *f != 0.0 && !f.is_nan(),
            // Empty string or "0" is false
            Val::String(s) => !(s.is_empty() || s == "0"),
            Val::Array(arr) => !arr.is_empty(),
            Val::Object(_) => true,
        }
    }

    /// Convert to integer following PHP's convert_to_long semantics
    /// Reference: $PHP_SRC_PATH/Zend/zend_operators.c - convert_to_long
    pub fn to_int(&self) -> i64 {
        match self {
            Val::Null => 0,
            Val::Bool(b) => *b as i64,
            Val::Int(i) => *i,
            Val::Float(f) => *f as i64,
            Val::String(s) => match numeric_prefix(s) {
                Some(Val::Int(i)) => i,
                Some(Val::Float(f)) => f as i64,
                _ => 0,
            },
            Val::Array(arr) => !arr.is_empty() as i64,
            Val::Object(_) => 1,
        }
    }

    /// Convert to float following PHP's convert_to_double semantics
    /// Reference: $PHP_SRC_PATH/Zend/zend_operators.c - convert_to_double
    pub fn to_float(&self) -> f64 {
        match self {
            Val::Float(f) => *f,
            Val::String(s) => match numeric_prefix(s) {
                Some(Val::Int(i)) => i as f64,
                Some(Val::Float(f)) => f,
                _ => 0.0,
            },
            other => other.to_int() as f64,
        }
    }

    /// Numeric value of an int, float or fully numeric string
    fn numeric(&self) -> Option<Val> {
        match self {
            Val::Int(_) | Val::Float(_) => Some(self.clone()),
            Val::String(s) => numeric_string(s),
            _ => None,
        }
    }

    /// PHP identity (`===`): same type and same value, objects by handle
    pub fn strict_eq(&self, other: &Val) -> bool {
        match (self, other) {
            (Val::Object(a), Val::Object(b)) => a.ptr_eq(b),
            (Val::Array(a), Val::Array(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|((ka, va), (kb, vb))| ka == kb && va.strict_eq(vb))
            }
            _ => self == other,
        }
    }

    /// PHP 8 loose equality (`==`) with type juggling
    /// Reference: $PHP_SRC_PATH/Zend/zend_operators.c - zend_compare
    pub fn loose_eq(&self, other: &Val) -> bool {
        match (self, other) {
            (Val::Null, Val::Null) => true,
            (Val::Bool(x), _) => *x == other.to_bool(),
            (_, Val::Bool(y)) => self.to_bool() == *y,
            (Val::Null, Val::String(s)) | (Val::String(s), Val::Null) => s.is_empty(),
            (Val::Null, _) => !other.to_bool(),
            (_, Val::Null) => !self.to_bool(),
            (Val::String(x), Val::String(y)) => match (self.numeric(), other.numeric()) {
                (Some(a), Some(b)) => numeric_eq(&a, &b),
                _ => x == y,
            },
            (Val::Int(_) | Val::Float(_), Val::Int(_) | Val::Float(_)) => numeric_eq(self, other),
            (Val::Int(_) | Val::Float(_), Val::String(s)) => match other.numeric() {
                Some(n) => numeric_eq(self, &n),
                None => self.to_php_string() == *s,
            },
            (Val::String(s), Val::Int(_) | Val::Float(_)) => match self.numeric() {
                Some(n) => numeric_eq(&n, other),
                None => *s == other.to_php_string(),
            },
            (Val::Array(a), Val::Array(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.map.get(k).is_some_and(|w| v.loose_eq(w)))
            }
            (Val::Object(a), Val::Object(b)) => {
                a.ptr_eq(b)
                    || (a.class_name() == b.class_name() && {
                        let (pa, pb) = (a.properties(), b.properties());
                        pa.len() == pb.len()
                            && pa
                                .iter()
                                .all(|(k, v)| pb.get(k).is_some_and(|w| v.loose_eq(w)))
                    })
            }
            _ => false,
        }
    }

    /// Short `var_export`-like rendering used in assertion messages
    pub fn describe(&self) -> String {
        match self {
            Val::Null => "NULL".to_string(),
            Val::Bool(b) => b.to_string(),
            Val::Int(i) => i.to_string(),
            Val::Float(f) => format_float(*f),
            Val::String(s) => format!("'{}'", s.replace('\'', "\\'")),
            Val::Array(arr) => {
                let items: Vec<String> = arr
                    .iter()
                    .map(|(k, v)| format!("{} => {}", k, v.describe()))
                    .collect();
                format!("[{}]", items.join(", "))
            }
            Val::Object(obj) => format!("{}#object", obj.class_name()),
        }
    }
}

fn numeric_eq(a: &Val, b: &Val) -> bool {
    match (a, b) {
        (Val::Int(x), Val::Int(y)) => x == y,
        _ => a.to_float() == b.to_float(),
    }
}

/// PHP float to string: shortest round-trip form, integral values without ".0"
fn format_float(f: f64) -> String {
    if f.is_nan() {
        "NAN".to_string()
    } else if f.is_infinite() {
        (if f > 0.0 { "INF" } else { "-INF" }).to_string()
    } else if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{:.0}", f)
    } else {
        format!("{}", f)
    }
}

/// Fully numeric string (surrounding whitespace allowed, as in PHP 8)
/// Reference: $PHP_SRC_PATH/Zend/zend_operators.c - is_numeric_string_ex
fn numeric_string(s: &str) -> Option<Val> {
    let trimmed = s.trim_matches(|c: char| c == ' ' || c == '\t' || c == '\n' || c == '\r');
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Some(Val::Int(i));
    }
    let looks_numeric = trimmed
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'));
    if looks_numeric {
        if let Ok(f) = trimmed.parse::<f64>() {
            return Some(Val::Float(f));
        }
    }
    None
}

/// Leading numeric prefix, used by integer/float casts ("12abc" -> 12)
fn numeric_prefix(s: &str) -> Option<Val> {
    if let Some(n) = numeric_string(s) {
        return Some(n);
    }
    let trimmed = s.trim_start();
    let end = trimmed
        .char_indices()
        .take_while(|(i, c)| c.is_ascii_digit() || (*i == 0 && (*c == '-' || *c == '+')))
        .map(|(i, c)| i + c.len_utf8())
        .last()?;
    trimmed[..end].parse::<i64>().ok().map(Val::Int)
}

impl fmt::Display for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_php_string())
    }
}

impl From<bool> for Val {
    fn from(b: bool) -> Self {
        Val::Bool(b)
    }
}

impl From<i64> for Val {
    fn from(i: i64) -> Self {
        Val::Int(i)
    }
}

impl From<i32> for Val {
    fn from(i: i32) -> Self {
        Val::Int(i as i64)
    }
}

impl From<u32> for Val {
    fn from(i: u32) -> Self {
        Val::Int(i as i64)
    }
}

impl From<usize> for Val {
    fn from(i: usize) -> Self {
        Val::Int(i as i64)
    }
}

impl From<f64> for Val {
    fn from(f: f64) -> Self {
        Val::Float(f)
    }
}

impl From<&str> for Val {
    fn from(s: &str) -> Self {
        Val::String(s.to_string())
    }
}

impl From<String> for Val {
    fn from(s: String) -> Self {
        Val::String(s)
    }
}

impl From<&String> for Val {
    fn from(s: &String) -> Self {
        Val::String(s.clone())
    }
}

impl From<ArrayData> for Val {
    fn from(arr: ArrayData) -> Self {
        Val::Array(arr)
    }
}

impl From<ObjectRef> for Val {
    fn from(obj: ObjectRef) -> Self {
        Val::Object(obj)
    }
}

impl<T: Into<Val>> From<Option<T>> for Val {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Val::Null)
    }
}

/// JSON fixtures: objects become associative arrays, like json_decode(.., true)
impl From<serde_json::Value> for Val {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Val::Null,
            serde_json::Value::Bool(b) => Val::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Val::Int(i),
                None => Val::Float(n.as_f64().unwrap_or(0.0)),
            },
            serde_json::Value::String(s) => Val::String(s),
            serde_json::Value::Array(items) => Val::Array(ArrayData::list(items)),
            serde_json::Value::Object(map) => Val::Array(ArrayData::assoc(map)),
        }
    }
}

/// By-reference slot for `bindParam`/`bindColumn`
///
/// The caller keeps one clone, the statement keeps another; whatever the
/// statement writes is visible through the caller's handle.
#[derive(Debug, Clone, Default)]
pub struct VarRef(Rc<RefCell<Val>>);

impl VarRef {
    pub fn new(value: impl Into<Val>) -> Self {
        VarRef(Rc::new(RefCell::new(value.into())))
    }

    pub fn get(&self) -> Val {
        self.0.borrow().clone()
    }

    pub fn set(&self, value: impl Into<Val>) {
        *self.0.borrow_mut() = value.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_php_string_conversion() {
        assert_eq!(Val::Null.to_php_string(), "");
        assert_eq!(Val::Bool(true).to_php_string(), "1");
        assert_eq!(Val::Bool(false).to_php_string(), "");
        assert_eq!(Val::Float(1.0).to_php_string(), "1");
        assert_eq!(Val::Float(1.5).to_php_string(), "1.5");
        assert_eq!(Val::Int(-3).to_php_string(), "-3");
    }

    #[test]
    fn test_strict_equality() {
        assert!(Val::Int(7).strict_eq(&Val::Int(7)));
        assert!(!Val::Int(7).strict_eq(&Val::from("7")));
        assert!(!Val::Int(1).strict_eq(&Val::Float(1.0)));

        let a = ObjectRef::std_class();
        let b = ObjectRef::std_class();
        assert!(Val::Object(a.clone()).strict_eq(&Val::Object(a.clone())));
        assert!(!Val::Object(a).strict_eq(&Val::Object(b)));
    }

    #[test]
    fn test_loose_equality() {
        assert!(Val::Int(7).loose_eq(&Val::from("7")));
        assert!(Val::from("1e1").loose_eq(&Val::from("10")));
        assert!(Val::Null.loose_eq(&Val::Bool(false)));
        assert!(Val::Null.loose_eq(&Val::from("")));
        assert!(!Val::Null.loose_eq(&Val::from("0")));
        assert!(!Val::Int(0).loose_eq(&Val::from("abc")));
        assert!(Val::Float(7.0).loose_eq(&Val::Int(7)));
        assert!(!Val::from("abc").loose_eq(&Val::from("ABC")));
    }

    #[test]
    fn test_array_keys_normalization() {
        assert_eq!(ArrayKey::from("12"), ArrayKey::Int(12));
        assert_eq!(ArrayKey::from("-4"), ArrayKey::Int(-4));
        assert_eq!(ArrayKey::from("012"), ArrayKey::Str("012".into()));
        assert_eq!(ArrayKey::from("1.5"), ArrayKey::Str("1.5".into()));
        assert_eq!(ArrayKey::from_val(&Val::Bool(true)), ArrayKey::Int(1));
        assert_eq!(ArrayKey::from_val(&Val::Null), ArrayKey::Str(String::new()));
    }

    #[test]
    fn test_array_push_after_insert() {
        let mut arr = ArrayData::new();
        arr.insert(ArrayKey::Int(5), Val::Int(1));
        arr.push(Val::Int(2));
        assert_eq!(arr.get(6), Some(&Val::Int(2)));
    }

    #[test]
    fn test_array_key_at_int_max() {
        let mut arr = ArrayData::new();
        arr.insert(ArrayKey::Int(i64::MAX), Val::from("x"));
        assert_eq!(arr.next_free, i64::MAX);
        assert!(!arr.push(Val::from("y")));
        assert_eq!(arr.len(), 1);
        assert_eq!(arr.get(i64::MAX), Some(&Val::from("x")));
    }

    #[test]
    fn test_int_cast_of_numeric_prefix() {
        assert_eq!(Val::from("12abc").to_int(), 12);
        assert_eq!(Val::from(" 42 ").to_int(), 42);
        assert_eq!(Val::from("abc").to_int(), 0);
        assert_eq!(Val::from("2.9").to_int(), 2);
    }

    #[test]
    fn test_var_ref_aliasing() {
        let var = VarRef::new(Val::Null);
        let alias = var.clone();
        alias.set(42);
        assert_eq!(var.get(), Val::Int(42));
    }

    #[test]
    fn test_from_json() {
        let json: serde_json::Value = serde_json::from_str(r#"{"id": 1, "tags": ["a"]}"#).unwrap();
        let val = Val::from(json);
        assert_eq!(val.get("id"), Some(&Val::Int(1)));
        assert_eq!(val.get("tags"), Some(&Val::Array(ArrayData::list(["a"]))));
    }
}
