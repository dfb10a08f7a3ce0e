//! ndpickle - portable JSON encoding for typed n-dimensional arrays
//!
//! # Overview
//!
//! ndpickle turns strided, typed arrays into JSON and back without losing
//! element type, shape, memory order or aliasing:
//!
//! - Small arrays become nested lists of their elements.
//! - Large arrays become their raw bytes, compressed and base64 encoded.
//! - Views become a reference to their base plus offset and strides, so views
//!   decoded together with their base share its storage again.
//!
//! # Quick Start
//!
//! ```
//! use std::rc::Rc;
//!
//! use ndpickle::{ArrayValue, CodecOptions, DType, Element, Order, Registry, Value};
//!
//! let mut registry = Registry::new();
//! ndpickle::register_codecs(&mut registry, CodecOptions::default());
//!
//! let elements: Vec<Element> = (0..6).map(Element::Int).collect();
//! let base = Rc::new(ArrayValue::from_elements(DType::int64(), &[6], Order::C, &elements).unwrap());
//! let tail = Rc::new(base.slice(0, Some(1), None, 1).unwrap());
//!
//! let value = Value::List(vec![Value::Array(base), Value::Array(tail)]);
//! let text = ndpickle::encode(&value, &registry).unwrap();
//!
//! let Value::List(items) = ndpickle::decode(&text, &registry).unwrap() else {
//!     unreachable!()
//! };
//! let (Value::Array(base), Value::Array(tail)) = (&items[0], &items[1]) else {
//!     unreachable!()
//! };
//! assert!(tail.shares_buffer_with(base));
//! ```
//!
//! # Configuration
//!
//! [`CodecOptions`] is passed to [`register_codecs`] and fixes, for that
//! registration, the binary size threshold, the compression strategy, the
//! byte-to-text strategy and the [`AliasPolicy`] applied to views that cannot
//! be encoded by reference.

// Re-export public API from ndpickle_core
pub use ndpickle_core::codec::{
    AliasPolicy, BinaryArrayCodec, CodecOptions, DTypeCodec, NestedArrayCodec, ScalarCodec, ViewArrayCodec,
    register_codecs, unregister_codecs,
};
pub use ndpickle_core::graph::{
    Handler, Pickler, Registry, TypeTag, Unpickler, Value, decode, encode, from_portable, to_portable,
};

// Re-export the data model
pub use ndpickle_core::array::{self, ArrayValue, Base, Buffer, Order};
pub use ndpickle_core::dtype::{self, DType, Element, Scalar, decode_dtype, encode_dtype};

// Re-export strategies
pub use ndpickle_core::compression::{self, Bz2, Compression, Gzip, Zlib};
pub use ndpickle_core::text::{self, Base64, Base64UrlSafe, ByteEncoding};

// Re-export errors
pub use ndpickle_core::errors::{Error, Result};

/// The portable form produced by [`to_portable`].
pub use serde_json::Value as Json;
