//! Type dispatch table: which handler flattens and restores which kind of value.

use core::fmt;
use std::rc::Rc;

use hashbrown::HashMap;
use serde_json::{Map, Value as Json};

use super::{Pickler, Unpickler, Value};
use crate::errors::Result;

/// The value kinds that are encoded by a registered handler rather than by the
/// engine itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    DType,
    Scalar,
    Array,
}

impl TypeTag {
    pub const ALL: [TypeTag; 3] = [TypeTag::DType, TypeTag::Scalar, TypeTag::Array];

    /// Wire name, stored under the `@type` key.
    pub const fn name(self) -> &'static str {
        match self {
            TypeTag::DType => "dtype",
            TypeTag::Scalar => "scalar",
            TypeTag::Array => "ndarray",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tag| tag.name() == name)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Converts one tagged value to and from the fields of its portable object.
///
/// The engine writes the `@type` (and, for arrays, `@id`) keys itself;
/// handlers add their own fields next to them. Nested values must go back
/// through the pickler so identity is tracked across the whole graph.
pub trait Handler {
    fn flatten(&self, value: &Value, data: &mut Map<String, Json>, pickler: &mut Pickler<'_>) -> Result<()>;

    fn restore(&self, data: &Map<String, Json>, unpickler: &mut Unpickler<'_>) -> Result<Value>;
}

#[derive(Default, Clone)]
pub struct Registry {
    handlers: HashMap<TypeTag, Rc<dyn Handler>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `handler` for `tag`, returning the handler it replaces.
    pub fn register(&mut self, tag: TypeTag, handler: Rc<dyn Handler>) -> Option<Rc<dyn Handler>> {
        self.handlers.insert(tag, handler)
    }

    pub fn unregister(&mut self, tag: TypeTag) -> Option<Rc<dyn Handler>> {
        self.handlers.remove(&tag)
    }

    pub fn get(&self, tag: TypeTag) -> Option<&Rc<dyn Handler>> {
        self.handlers.get(&tag)
    }

    pub fn contains(&self, tag: TypeTag) -> bool {
        self.handlers.contains_key(&tag)
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}
