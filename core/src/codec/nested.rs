use std::rc::Rc;

use serde_json::{Map, Value as Json};
use smallvec::SmallVec;
use tracing::debug;

use super::{SHAPE, VALUES, field, read_dtype, read_order, read_shape, write_dtype, write_order, write_usizes};
use crate::array::{ArrayValue, Order, Shape};
use crate::dtype::{DType, Element};
use crate::errors::{Error, Result};
use crate::graph::{Handler, Pickler, Unpickler, Value};

/// Encodes an array as nested lists of its elements.
///
/// `shape` is written only when a dimension is zero, since the nesting of an
/// empty list cannot carry it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NestedArrayCodec;

impl NestedArrayCodec {
    pub fn flatten_array(
        &self,
        array: &ArrayValue,
        data: &mut Map<String, Json>,
        pickler: &mut Pickler<'_>,
    ) -> Result<()> {
        debug!(shape = ?array.shape(), "encoding array as nested values");
        write_dtype(data, array.dtype());
        data.insert(VALUES.into(), pickler.flatten(&array.to_value()?)?);
        if array.shape().contains(&0) {
            write_usizes(data, SHAPE, array.shape());
        }
        write_order(data, array.order());
        Ok(())
    }

    pub fn restore_array(&self, data: &Map<String, Json>, unpickler: &mut Unpickler<'_>) -> Result<ArrayValue> {
        let values = unpickler.restore(field(data, VALUES)?)?;
        self.restore_from_values(&values, data)
    }

    /// Finish a restore whose `values` payload has already been restored.
    pub(super) fn restore_from_values(&self, values: &Value, data: &Map<String, Json>) -> Result<ArrayValue> {
        let dtype = read_dtype(data)?;
        let order = read_order(data)?;
        let shape = read_shape(data)?;
        array_from_nested(values, dtype, order, shape.as_deref())
    }
}

impl Handler for NestedArrayCodec {
    fn flatten(&self, value: &Value, data: &mut Map<String, Json>, pickler: &mut Pickler<'_>) -> Result<()> {
        let array = value.as_array().ok_or(Error::UnexpectedValue { expected: "ndarray" })?;
        self.flatten_array(array, data, pickler)
    }

    fn restore(&self, data: &Map<String, Json>, unpickler: &mut Unpickler<'_>) -> Result<Value> {
        self.restore_array(data, unpickler).map(|array| Value::Array(Rc::new(array)))
    }
}

/// Build an owned array from nested lists.
///
/// The shape is inferred from the nesting; every list at one depth must have
/// the same length. An explicit `shape` then reshapes the result and must
/// hold the same number of elements.
pub fn array_from_nested(values: &Value, dtype: DType, order: Order, shape: Option<&[usize]>) -> Result<ArrayValue> {
    let mut inferred: Shape = SmallVec::new();
    let mut probe = values;
    while let Value::List(items) = probe {
        inferred.push(items.len());
        match items.first() {
            Some(first) => probe = first,
            None => break,
        }
    }

    let mut elements = Vec::new();
    collect_leaves(values, &inferred, 0, &mut elements)?;

    match shape {
        Some(shape) if shape != inferred.as_slice() => {
            let count = crate::array::layout::element_count(shape)?;
            if count != elements.len() {
                return Err(Error::ShapeMismatch {
                    expected: count,
                    actual: elements.len(),
                });
            }
            ArrayValue::from_elements(dtype, shape, order, &elements)
        }
        _ => ArrayValue::from_elements(dtype, &inferred, order, &elements),
    }
}

fn collect_leaves(value: &Value, shape: &[usize], depth: usize, out: &mut Vec<Element>) -> Result<()> {
    match (value, shape.get(depth)) {
        (Value::List(items), Some(&dim)) if items.len() == dim => {
            for item in items {
                collect_leaves(item, shape, depth + 1, out)?;
            }
            Ok(())
        }
        (Value::List(_), _) => Err(Error::RaggedNesting { depth }),
        (_, Some(_)) => Err(Error::RaggedNesting { depth }),
        (leaf, None) => {
            out.push(leaf.to_element()?);
            Ok(())
        }
    }
}
