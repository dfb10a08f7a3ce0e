//! Codecs for descriptors, scalars and arrays.
//!
//! The array codecs are layered: [`ViewArrayCodec`] handles arrays that alias
//! another array's storage and hands everything else to
//! [`BinaryArrayCodec`], which in turn falls back to [`NestedArrayCodec`] for
//! arrays below its size threshold. [`register_codecs`] installs the view
//! codec for arrays, next to the descriptor and scalar codecs.

mod binary;
mod dtype;
mod nested;
mod options;
mod scalar;
mod view;


use std::rc::Rc;

use serde_json::{Map, Value as Json};

pub use binary::BinaryArrayCodec;
pub use dtype::DTypeCodec;
pub use nested::{NestedArrayCodec, array_from_nested};
pub use options::{AliasPolicy, CodecOptions};
pub use scalar::ScalarCodec;
pub use view::ViewArrayCodec;

use crate::array::{Order, Shape};
use crate::dtype::{DType, decode_dtype, encode_dtype};
use crate::errors::{Error, Result};
use crate::graph::{Registry, TypeTag};

pub const DTYPE: &str = "dtype";
pub const VALUE: &str = "value";
pub const VALUES: &str = "values";
pub const SHAPE: &str = "shape";
pub const ORDER: &str = "order";
pub const BASE: &str = "base";
pub const OFFSET: &str = "offset";
pub const STRIDES: &str = "strides";

/// Install the descriptor, scalar and array codecs. Calling it again replaces
/// the previous registration.
pub fn register_codecs(registry: &mut Registry, options: CodecOptions) {
    registry.register(TypeTag::DType, Rc::new(DTypeCodec));
    registry.register(TypeTag::Scalar, Rc::new(ScalarCodec));
    registry.register(TypeTag::Array, Rc::new(ViewArrayCodec::new(options)));
}

/// Remove the codecs installed by [`register_codecs`]. A no-op when they are
/// not installed.
pub fn unregister_codecs(registry: &mut Registry) {
    for tag in TypeTag::ALL {
        registry.unregister(tag);
    }
}

fn field<'a>(data: &'a Map<String, Json>, name: &'static str) -> Result<&'a Json> {
    data.get(name).ok_or(Error::MissingField { field: name })
}

fn write_dtype(data: &mut Map<String, Json>, dtype: &DType) {
    data.insert(DTYPE.into(), Json::String(encode_dtype(dtype)));
}

fn read_dtype(data: &Map<String, Json>) -> Result<DType> {
    match field(data, DTYPE)? {
        Json::String(text) => decode_dtype(text),
        other => Err(Error::invalid_field(DTYPE, format!("expected a string, found {}", other))),
    }
}

fn write_usizes(data: &mut Map<String, Json>, name: &str, values: &[usize]) {
    data.insert(name.into(), values.iter().map(|&v| Json::from(v)).collect());
}

fn read_shape(data: &Map<String, Json>) -> Result<Option<Shape>> {
    let Some(shape) = data.get(SHAPE) else {
        return Ok(None);
    };
    let dims = shape
        .as_array()
        .ok_or_else(|| Error::invalid_field(SHAPE, "expected a list of integers"))?;
    dims.iter()
        .map(|dim| {
            dim.as_u64()
                .and_then(|dim| usize::try_from(dim).ok())
                .ok_or_else(|| Error::invalid_field(SHAPE, format!("invalid dimension {}", dim)))
        })
        .collect::<Result<Shape>>()
        .map(Some)
}

fn write_order(data: &mut Map<String, Json>, order: Order) {
    if order == Order::F {
        data.insert(ORDER.into(), Json::from("F"));
    }
}

fn read_order(data: &Map<String, Json>) -> Result<Order> {
    match data.get(ORDER) {
        None => Ok(Order::C),
        Some(Json::String(order)) if order == "C" => Ok(Order::C),
        Some(Json::String(order)) if order == "F" => Ok(Order::F),
        Some(other) => Err(Error::invalid_field(ORDER, format!("expected \"C\" or \"F\", found {}", other))),
    }
}
