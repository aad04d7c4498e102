//! Classes for object hydration
//!
//! `FETCH_CLASS`, `FETCH_CLASSTYPE` and `fetchObject` instantiate user
//! classes. A `ClassDef` describes such a class: declared property defaults
//! plus an optional native constructor.
//!
//! Reference: $PHP_SRC_PATH/ext/pdo/pdo_stmt.c - do_fetch_class_prepare

use super::error::PdoError;
use crate::core::value::{ObjectRef, Val};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Native constructor: receives the new instance and the constructor args
pub type Constructor = Rc<dyn Fn(&ObjectRef, &[Val]) -> Result<(), PdoError>>;

#[derive(Clone)]
pub struct ClassDef {
    pub name: String,
    pub defaults: IndexMap<String, Val>,
    pub constructor: Option<Constructor>,
}

impl ClassDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            defaults: IndexMap::new(),
            constructor: None,
        }
    }

    pub fn std_class() -> Self {
        Self::new("stdClass")
    }

    /// Declare a property with its default value
    pub fn with_property(mut self, name: impl Into<String>, default: impl Into<Val>) -> Self {
        self.defaults.insert(name.into(), default.into());
        self
    }

    pub fn with_constructor<F>(mut self, ctor: F) -> Self
    where
        F: Fn(&ObjectRef, &[Val]) -> Result<(), PdoError> + 'static,
    {
        self.constructor = Some(Rc::new(ctor));
        self
    }

    /// Allocate an instance with declared defaults, without running the constructor
    pub fn instantiate(&self) -> ObjectRef {
        let obj = ObjectRef::new(self.name.clone());
        for (name, value) in &self.defaults {
            obj.set(name.clone(), value.clone());
        }
        obj
    }

    /// Run the constructor on an instance
    ///
    /// Passing arguments to a class without a constructor is an error, as in PHP.
    pub fn construct(&self, obj: &ObjectRef, args: &[Val]) -> Result<(), PdoError> {
        match &self.constructor {
            Some(ctor) => ctor(obj, args),
            None if args.is_empty() => Ok(()),
            None => Err(PdoError::Value(format!(
                "User-supplied statement does not accept constructor arguments ({})",
                self.name
            ))),
        }
    }
}

impl fmt::Debug for ClassDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDef")
            .field("name", &self.name)
            .field("defaults", &self.defaults)
            .field("constructor", &self.constructor.is_some())
            .finish()
    }
}

/// Classes known to a connection, looked up case-insensitively like PHP class names
#[derive(Debug, Clone, Default)]
pub struct ClassRegistry {
    classes: HashMap<String, ClassDef>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, class: ClassDef) {
        self.classes.insert(class.name.to_ascii_lowercase(), class);
    }

    pub fn get(&self, name: &str) -> Option<&ClassDef> {
        self.classes.get(&name.to_ascii_lowercase())
    }

    /// Resolve a class, unknown names fall back to `stdClass`
    pub fn resolve(&self, name: &str) -> ClassDef {
        self.get(name).cloned().unwrap_or_else(ClassDef::std_class)
    }
}
