use serde_json::{Map, Value as Json};

use super::{VALUE, field, read_dtype, write_dtype};
use crate::dtype::Scalar;
use crate::errors::{Error, Result};
use crate::graph::{Handler, Pickler, Unpickler, Value};

/// Encodes a typed scalar as its descriptor plus the element in plain-data
/// form under `value`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarCodec;

impl Handler for ScalarCodec {
    fn flatten(&self, value: &Value, data: &mut Map<String, Json>, pickler: &mut Pickler<'_>) -> Result<()> {
        let Value::Scalar(scalar) = value else {
            return Err(Error::UnexpectedValue { expected: "scalar" });
        };
        write_dtype(data, scalar.dtype());
        let payload = Value::from_element(scalar.element()?);
        data.insert(VALUE.into(), pickler.flatten(&payload)?);
        Ok(())
    }

    fn restore(&self, data: &Map<String, Json>, unpickler: &mut Unpickler<'_>) -> Result<Value> {
        let dtype = read_dtype(data)?;
        let payload = unpickler.restore(field(data, VALUE)?)?;
        let scalar = Scalar::new(dtype, &payload.to_element()?)?;
        Ok(Value::Scalar(scalar))
    }
}
