use std::rc::Rc;
use std::sync::Arc;

use serde_json::{Map, Value as Json};
use tracing::debug;

use super::{
    CodecOptions, NestedArrayCodec, SHAPE, VALUES, field, read_dtype, read_order, read_shape, write_dtype,
    write_order, write_usizes,
};
use crate::array::{ArrayValue, layout};
use crate::compression::Compression;
use crate::errors::{Error, Result};
use crate::graph::{Handler, Pickler, Unpickler, Value};
use crate::text::ByteEncoding;

/// Encodes large arrays as their raw bytes, optionally compressed, in text
/// form. Arrays under the size threshold use [`NestedArrayCodec`].
#[derive(Debug, Clone)]
pub struct BinaryArrayCodec {
    nested: NestedArrayCodec,
    size_threshold: Option<usize>,
    compression: Option<Arc<dyn Compression>>,
    text_encoding: Arc<dyn ByteEncoding>,
}

impl BinaryArrayCodec {
    pub fn new(options: &CodecOptions) -> Self {
        BinaryArrayCodec {
            nested: NestedArrayCodec,
            size_threshold: options.size_threshold,
            compression: options.compression.clone(),
            text_encoding: options.text_encoding.clone(),
        }
    }

    pub fn uses_binary(&self, array: &ArrayValue) -> bool {
        self.size_threshold
            .is_some_and(|threshold| array.element_count() >= threshold)
    }

    pub fn flatten_array(
        &self,
        array: &ArrayValue,
        data: &mut Map<String, Json>,
        pickler: &mut Pickler<'_>,
    ) -> Result<()> {
        if !self.uses_binary(array) {
            return self.nested.flatten_array(array, data, pickler);
        }
        let order = array.order();
        let mut bytes = array.to_bytes(order);
        if let Some(compression) = &self.compression {
            bytes = compression.compress(&bytes)?;
        }
        debug!(
            shape = ?array.shape(),
            bytes = bytes.len(),
            "encoding array as binary values"
        );
        write_dtype(data, array.dtype());
        let text = Value::Str(self.text_encoding.encode(&bytes));
        data.insert(VALUES.into(), pickler.flatten(&text)?);
        write_usizes(data, SHAPE, array.shape());
        write_order(data, order);
        Ok(())
    }

    /// The restored array always owns its storage.
    pub fn restore_array(&self, data: &Map<String, Json>, unpickler: &mut Unpickler<'_>) -> Result<ArrayValue> {
        let values = unpickler.restore(field(data, VALUES)?)?;
        // Binary payloads are text and always carry a shape; a zero-dimensional
        // string array in nested form has no shape.
        let (Value::Str(text), Some(shape)) = (&values, read_shape(data)?) else {
            return self.nested.restore_from_values(&values, data);
        };
        let dtype = read_dtype(data)?;
        let order = read_order(data)?;
        let expected = layout::byte_len(&shape, dtype.itemsize())?;
        let mut bytes = self.text_encoding.decode(text)?;
        if let Some(compression) = &self.compression {
            // One byte past the expected size is enough to report a mismatch.
            bytes = compression.decompress(&bytes, expected.saturating_add(1))?;
        }
        // The decoded Vec becomes the new buffer outright; nothing else holds it.
        ArrayValue::from_bytes(dtype, &shape, order, bytes)
    }
}

impl Default for BinaryArrayCodec {
    fn default() -> Self {
        Self::new(&CodecOptions::default())
    }
}

impl Handler for BinaryArrayCodec {
    fn flatten(&self, value: &Value, data: &mut Map<String, Json>, pickler: &mut Pickler<'_>) -> Result<()> {
        let array = value.as_array().ok_or(Error::UnexpectedValue { expected: "ndarray" })?;
        self.flatten_array(array, data, pickler)
    }

    fn restore(&self, data: &Map<String, Json>, unpickler: &mut Unpickler<'_>) -> Result<Value> {
        self.restore_array(data, unpickler).map(|array| Value::Array(Rc::new(array)))
    }
}
