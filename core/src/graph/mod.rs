//! A small identity-preserving object-graph engine.
//!
//! [`Value`] trees are flattened to `serde_json::Value` and back. Plain data
//! maps onto JSON directly; descriptors, scalars and arrays are handed to the
//! handler registered for their [`TypeTag`]. Arrays are tracked by identity
//! within one top-level call: the first occurrence carries an `@id`, later
//! ones become `{"@ref": id}` and restore to the same `Rc`.

mod pickler;
pub mod registry;

#[cfg(test)]
mod graph_test;

use std::rc::Rc;

use serde_json::Value as Json;

pub use pickler::{Pickler, Unpickler};
pub use registry::{Handler, Registry, TypeTag};

use crate::array::ArrayValue;
use crate::dtype::{DType, Element, Scalar};
use crate::errors::{Error, Result};

pub const TYPE_KEY: &str = "@type";
pub const ID_KEY: &str = "@id";
pub const REF_KEY: &str = "@ref";
pub const FLOAT_KEY: &str = "@float";
pub const COMPLEX_KEY: &str = "@complex";
pub const BYTES_KEY: &str = "@bytes";
pub const TUPLE_KEY: &str = "@tuple";

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Complex(f64, f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    /// String-keyed map; keys keep their insertion order.
    Dict(Vec<(String, Value)>),
    DType(DType),
    Scalar(Scalar),
    Array(Rc<ArrayValue>),
}

impl Value {
    pub fn array(array: ArrayValue) -> Self {
        Value::Array(Rc::new(array))
    }

    /// The handler tag for values the engine does not encode itself.
    pub fn tag(&self) -> Option<TypeTag> {
        match self {
            Value::DType(_) => Some(TypeTag::DType),
            Value::Scalar(_) => Some(TypeTag::Scalar),
            Value::Array(_) => Some(TypeTag::Array),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Rc<ArrayValue>> {
        match self {
            Value::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::Complex(..) => "complex",
            Value::Str(_) => "str",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Dict(_) => "dict",
            Value::DType(_) => "dtype",
            Value::Scalar(_) => "scalar",
            Value::Array(_) => "ndarray",
        }
    }

    /// The plain-data form of one array element. Records become tuples.
    pub fn from_element(element: Element) -> Self {
        match element {
            Element::Bool(b) => Value::Bool(b),
            Element::Int(i) => Value::Int(i),
            Element::UInt(u) => Value::UInt(u),
            Element::Float(x) => Value::Float(x),
            Element::Complex(re, im) => Value::Complex(re, im),
            Element::Bytes(b) | Element::Void(b) => Value::Bytes(b),
            Element::Str(s) => Value::Str(s),
            Element::Record(fields) => {
                Value::Tuple(fields.into_iter().map(Value::from_element).collect())
            }
        }
    }

    /// Interpret a plain-data value as one array element.
    pub fn to_element(&self) -> Result<Element> {
        Ok(match self {
            Value::Bool(b) => Element::Bool(*b),
            Value::Int(i) => Element::Int(*i),
            Value::UInt(u) => Element::UInt(*u),
            Value::Float(x) => Element::Float(*x),
            Value::Complex(re, im) => Element::Complex(*re, *im),
            Value::Bytes(b) => Element::Bytes(b.clone()),
            Value::Str(s) => Element::Str(s.clone()),
            Value::Tuple(fields) | Value::List(fields) => Element::Record(
                fields.iter().map(Value::to_element).collect::<Result<_>>()?,
            ),
            Value::Scalar(scalar) => scalar.element()?,
            _ => return Err(Error::UnexpectedValue { expected: "array element" }),
        })
    }
}

impl From<DType> for Value {
    fn from(dtype: DType) -> Self {
        Value::DType(dtype)
    }
}

impl From<Scalar> for Value {
    fn from(scalar: Scalar) -> Self {
        Value::Scalar(scalar)
    }
}

impl From<ArrayValue> for Value {
    fn from(array: ArrayValue) -> Self {
        Value::array(array)
    }
}

impl From<Rc<ArrayValue>> for Value {
    fn from(array: Rc<ArrayValue>) -> Self {
        Value::Array(array)
    }
}

impl ArrayValue {
    /// Nested lists mirroring the array's dimensions, elements in logical
    /// order. A zero-dimensional array yields its single element.
    pub fn to_value(&self) -> Result<Value> {
        let mut elements = self.elements()?.into_iter().map(Value::from_element);
        Ok(nest(self.shape(), &mut elements))
    }
}

fn nest(shape: &[usize], elements: &mut impl Iterator<Item = Value>) -> Value {
    match shape.split_first() {
        None => elements.next().unwrap_or(Value::None),
        Some((&dim, rest)) => Value::List((0..dim).map(|_| nest(rest, elements)).collect()),
    }
}

/// Flatten `value` to its portable JSON form.
pub fn to_portable(value: &Value, registry: &Registry) -> Result<Json> {
    Pickler::new(registry).flatten(value)
}

/// Restore a value from its portable JSON form.
pub fn from_portable(json: &Json, registry: &Registry) -> Result<Value> {
    Unpickler::new(registry).restore(json)
}

/// Encode `value` as JSON text.
pub fn encode(value: &Value, registry: &Registry) -> Result<String> {
    Ok(serde_json::to_string(&to_portable(value, registry)?)?)
}

/// Decode a value from JSON text produced by [`encode`].
pub fn decode(text: &str, registry: &Registry) -> Result<Value> {
    let json: Json = serde_json::from_str(text)?;
    from_portable(&json, registry)
}
