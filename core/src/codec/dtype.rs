use serde_json::{Map, Value as Json};

use super::{read_dtype, write_dtype};
use crate::errors::{Error, Result};
use crate::graph::{Handler, Pickler, Unpickler, Value};

/// Encodes a bare descriptor as `{"dtype": <text>}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DTypeCodec;

impl Handler for DTypeCodec {
    fn flatten(&self, value: &Value, data: &mut Map<String, Json>, _: &mut Pickler<'_>) -> Result<()> {
        let Value::DType(dtype) = value else {
            return Err(Error::UnexpectedValue { expected: "dtype" });
        };
        write_dtype(data, dtype);
        Ok(())
    }

    fn restore(&self, data: &Map<String, Json>, _: &mut Unpickler<'_>) -> Result<Value> {
        read_dtype(data).map(Value::DType)
    }
}
