use std::rc::Rc;

use serde_json::{Map, Value as Json};
use tracing::debug;

use super::{
    AliasPolicy, BASE, BinaryArrayCodec, CodecOptions, OFFSET, SHAPE, STRIDES, read_dtype, read_shape,
    write_dtype, write_usizes,
};
use crate::array::{ArrayValue, Base, Order, layout};
use crate::errors::{Error, Result};
use crate::graph::{Handler, Pickler, Unpickler, Value};

/// The array codec installed by `register_codecs`.
///
/// Views of contiguous arrays are encoded as a reference to the base plus
/// shape, byte offset and strides, so several views restored in one call share
/// one buffer. Arrays without a base go to [`BinaryArrayCodec`]. Views of
/// anything else are copied, subject to the alias policy.
#[derive(Debug, Clone)]
pub struct ViewArrayCodec {
    binary: BinaryArrayCodec,
    alias_policy: AliasPolicy,
}

impl ViewArrayCodec {
    pub fn new(options: CodecOptions) -> Self {
        ViewArrayCodec {
            binary: BinaryArrayCodec::new(&options),
            alias_policy: options.alias_policy,
        }
    }

    pub fn alias_policy(&self) -> AliasPolicy {
        self.alias_policy
    }

    pub fn flatten_array(
        &self,
        array: &ArrayValue,
        data: &mut Map<String, Json>,
        pickler: &mut Pickler<'_>,
    ) -> Result<()> {
        match array.base() {
            None => self.binary.flatten_array(array, data, pickler),
            Some(Base::Array(base)) if base.is_contiguous() => self.flatten_view(array, base, data, pickler),
            Some(base) => {
                let what = match base {
                    Base::Array(_) => "a non-contiguous array",
                    Base::Foreign(_) => "a foreign buffer",
                };
                match self.alias_policy {
                    AliasPolicy::Raise => return Err(Error::UnsupportedAliasing),
                    AliasPolicy::Warn => pickler.warn(format!(
                        "array with shape {:?} is a view of {}; encoding an independent copy",
                        array.shape(),
                        what
                    )),
                    AliasPolicy::Silent => {}
                }
                debug!(shape = ?array.shape(), "encoding a copy of an aliased array");
                let copy = array.to_contiguous(Order::C)?;
                self.binary.flatten_array(&copy, data, pickler)
            }
        }
    }

    fn flatten_view(
        &self,
        array: &ArrayValue,
        base: &Rc<ArrayValue>,
        data: &mut Map<String, Json>,
        pickler: &mut Pickler<'_>,
    ) -> Result<()> {
        debug!(shape = ?array.shape(), "encoding array as a view of its base");
        write_dtype(data, array.dtype());
        data.insert(BASE.into(), pickler.flatten(&Value::Array(base.clone()))?);
        write_usizes(data, SHAPE, array.shape());
        let offset = array.offset() as isize - base.offset() as isize;
        if offset != 0 {
            data.insert(OFFSET.into(), Json::from(offset));
        }
        let natural = layout::standard_strides(array.shape(), array.itemsize(), base.order());
        if array.strides() != natural.as_slice() {
            data.insert(STRIDES.into(), array.strides().iter().map(|&s| Json::from(s)).collect());
        }
        Ok(())
    }

    pub fn restore_array(&self, data: &Map<String, Json>, unpickler: &mut Unpickler<'_>) -> Result<Rc<ArrayValue>> {
        let Some(base) = data.get(BASE) else {
            return self.binary.restore_array(data, unpickler).map(Rc::new);
        };
        let base = match unpickler.restore(base)? {
            Value::Array(base) => base,
            other => {
                return Err(Error::InvalidBaseStorage {
                    reason: format!("base is a {}, not an array", other.kind()),
                });
            }
        };
        if !base.is_contiguous() {
            return Err(Error::InvalidBaseStorage {
                reason: format!("base with strides {:?} is not contiguous", base.strides()),
            });
        }

        let dtype = read_dtype(data)?;
        let shape = read_shape(data)?.ok_or(Error::MissingField { field: SHAPE })?;
        let offset = match data.get(OFFSET) {
            None => 0,
            Some(offset) => offset
                .as_i64()
                .and_then(|offset| isize::try_from(offset).ok())
                .ok_or_else(|| Error::invalid_field(OFFSET, format!("expected an integer, found {}", offset)))?,
        };
        let strides = data.get(STRIDES).map(read_strides).transpose()?;
        let view = ArrayValue::view(&base, dtype, &shape, offset, strides.as_deref())?;
        Ok(Rc::new(view))
    }
}

fn read_strides(strides: &Json) -> Result<Vec<isize>> {
    strides
        .as_array()
        .ok_or_else(|| Error::invalid_field(STRIDES, "expected a list of integers"))?
        .iter()
        .map(|stride| {
            stride
                .as_i64()
                .and_then(|stride| isize::try_from(stride).ok())
                .ok_or_else(|| Error::invalid_field(STRIDES, format!("invalid stride {}", stride)))
        })
        .collect()
}

impl Default for ViewArrayCodec {
    fn default() -> Self {
        Self::new(CodecOptions::default())
    }
}

impl Handler for ViewArrayCodec {
    fn flatten(&self, value: &Value, data: &mut Map<String, Json>, pickler: &mut Pickler<'_>) -> Result<()> {
        let array = value.as_array().ok_or(Error::UnexpectedValue { expected: "ndarray" })?;
        self.flatten_array(array, data, pickler)
    }

    fn restore(&self, data: &Map<String, Json>, unpickler: &mut Unpickler<'_>) -> Result<Value> {
        self.restore_array(data, unpickler).map(Value::Array)
    }
}
