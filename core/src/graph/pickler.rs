use std::rc::Rc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use hashbrown::HashMap;
use serde_json::{Map, Number, Value as Json, json};
use tracing::warn;

use super::{
    BYTES_KEY, COMPLEX_KEY, FLOAT_KEY, ID_KEY, REF_KEY, Registry, TUPLE_KEY, TYPE_KEY, TypeTag,
    Value,
};
use crate::array::ArrayValue;
use crate::errors::{Error, Result};

/// Flattens one value graph. Use a fresh pickler per top-level call.
pub struct Pickler<'r> {
    registry: &'r Registry,
    ids: HashMap<*const ArrayValue, u64>,
    // Keeps every identified array alive so its address cannot be reused.
    seen: Vec<Rc<ArrayValue>>,
    warnings: Vec<String>,
}

impl<'r> Pickler<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Pickler {
            registry,
            ids: HashMap::new(),
            seen: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn flatten(&mut self, value: &Value) -> Result<Json> {
        Ok(match value {
            Value::None => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::UInt(u) => Json::from(*u),
            Value::Float(x) => flatten_float(*x),
            Value::Complex(re, im) => json!({ COMPLEX_KEY: [flatten_float(*re), flatten_float(*im)] }),
            Value::Str(s) => Json::String(s.clone()),
            Value::Bytes(b) => json!({ BYTES_KEY: STANDARD.encode(b) }),
            Value::List(items) => Json::Array(self.flatten_all(items)?),
            Value::Tuple(items) => json!({ TUPLE_KEY: self.flatten_all(items)? }),
            Value::Dict(entries) => {
                let mut map = Map::with_capacity(entries.len());
                for (key, value) in entries {
                    if key.starts_with('@') {
                        return Err(Error::ReservedKey { key: key.clone() });
                    }
                    map.insert(key.clone(), self.flatten(value)?);
                }
                Json::Object(map)
            }
            Value::DType(_) | Value::Scalar(_) => self.flatten_tagged(value, None)?,
            Value::Array(array) => {
                let key = Rc::as_ptr(array);
                if let Some(&id) = self.ids.get(&key) {
                    return Ok(json!({ REF_KEY: id }));
                }
                let id = self.seen.len() as u64;
                self.ids.insert(key, id);
                self.seen.push(array.clone());
                self.flatten_tagged(value, Some(id))?
            }
        })
    }

    fn flatten_all(&mut self, items: &[Value]) -> Result<Vec<Json>> {
        items.iter().map(|item| self.flatten(item)).collect()
    }

    fn flatten_tagged(&mut self, value: &Value, id: Option<u64>) -> Result<Json> {
        let Some(tag) = value.tag() else {
            return Err(Error::UnexpectedValue { expected: "tagged" });
        };
        let handler = self
            .registry
            .get(tag)
            .cloned()
            .ok_or(Error::UnregisteredType { tag: tag.name() })?;
        let mut data = Map::new();
        data.insert(TYPE_KEY.into(), Json::from(tag.name()));
        if let Some(id) = id {
            data.insert(ID_KEY.into(), Json::from(id));
        }
        handler.flatten(value, &mut data, self)?;
        Ok(Json::Object(data))
    }

    /// Record a non-fatal diagnostic for this call.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.warnings.push(message);
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

fn flatten_float(x: f64) -> Json {
    match Number::from_f64(x) {
        Some(n) => Json::Number(n),
        None if x.is_nan() => json!({ FLOAT_KEY: "nan" }),
        None if x > 0.0 => json!({ FLOAT_KEY: "inf" }),
        None => json!({ FLOAT_KEY: "-inf" }),
    }
}

/// Restores one value graph. Use a fresh unpickler per top-level call.
pub struct Unpickler<'r> {
    registry: &'r Registry,
    objects: HashMap<u64, Rc<ArrayValue>>,
}

impl<'r> Unpickler<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Unpickler {
            registry,
            objects: HashMap::new(),
        }
    }

    pub fn restore(&mut self, json: &Json) -> Result<Value> {
        Ok(match json {
            Json::Null => Value::None,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::UInt(u)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Json::String(s) => Value::Str(s.clone()),
            Json::Array(items) => Value::List(self.restore_all(items)?),
            Json::Object(map) => self.restore_object(map)?,
        })
    }

    fn restore_all(&mut self, items: &[Json]) -> Result<Vec<Value>> {
        items.iter().map(|item| self.restore(item)).collect()
    }

    fn restore_object(&mut self, map: &Map<String, Json>) -> Result<Value> {
        if let Some(id) = map.get(REF_KEY) {
            let id = id
                .as_u64()
                .ok_or_else(|| Error::invalid_field(REF_KEY, "expected an object id"))?;
            return self
                .objects
                .get(&id)
                .map(|array| Value::Array(array.clone()))
                .ok_or(Error::DanglingReference { id });
        }
        if let Some(text) = map.get(FLOAT_KEY) {
            return restore_float(text).map(Value::Float);
        }
        if let Some(parts) = map.get(COMPLEX_KEY) {
            return match parts.as_array().map(Vec::as_slice) {
                Some([re, im]) => Ok(Value::Complex(restore_float(re)?, restore_float(im)?)),
                _ => Err(Error::invalid_field(COMPLEX_KEY, "expected [re, im]")),
            };
        }
        if let Some(text) = map.get(BYTES_KEY) {
            let text = text
                .as_str()
                .ok_or_else(|| Error::invalid_field(BYTES_KEY, "expected a string"))?;
            return STANDARD
                .decode(text)
                .map(Value::Bytes)
                .map_err(|e| Error::TextDecoding(e.to_string()));
        }
        if let Some(items) = map.get(TUPLE_KEY) {
            let items = items
                .as_array()
                .ok_or_else(|| Error::invalid_field(TUPLE_KEY, "expected a list"))?;
            return self.restore_all(items).map(Value::Tuple);
        }
        if let Some(name) = map.get(TYPE_KEY) {
            return self.restore_tagged(name, map);
        }

        let mut entries = Vec::with_capacity(map.len());
        for (key, value) in map {
            if key.starts_with('@') {
                return Err(Error::ReservedKey { key: key.clone() });
            }
            entries.push((key.clone(), self.restore(value)?));
        }
        Ok(Value::Dict(entries))
    }

    fn restore_tagged(&mut self, name: &Json, map: &Map<String, Json>) -> Result<Value> {
        let tag = name
            .as_str()
            .and_then(TypeTag::from_name)
            .ok_or_else(|| Error::invalid_field(TYPE_KEY, format!("unknown type {}", name)))?;
        let handler = self
            .registry
            .get(tag)
            .cloned()
            .ok_or(Error::UnregisteredType { tag: tag.name() })?;
        let value = handler.restore(map, self)?;
        if let (Some(id), Value::Array(array)) = (map.get(ID_KEY), &value) {
            let id = id
                .as_u64()
                .ok_or_else(|| Error::invalid_field(ID_KEY, "expected an object id"))?;
            self.objects.insert(id, array.clone());
        }
        Ok(value)
    }
}

fn restore_float(json: &Json) -> Result<f64> {
    match json {
        Json::Number(n) => n
            .as_f64()
            .ok_or_else(|| Error::invalid_field(FLOAT_KEY, "expected a number")),
        Json::Object(map) => match map.get(FLOAT_KEY).and_then(Json::as_str) {
            Some("nan") => Ok(f64::NAN),
            Some("inf") => Ok(f64::INFINITY),
            Some("-inf") => Ok(f64::NEG_INFINITY),
            _ => Err(Error::invalid_field(FLOAT_KEY, "expected nan, inf or -inf")),
        },
        Json::String(text) => match text.as_str() {
            "nan" => Ok(f64::NAN),
            "inf" => Ok(f64::INFINITY),
            "-inf" => Ok(f64::NEG_INFINITY),
            _ => Err(Error::invalid_field(FLOAT_KEY, "expected nan, inf or -inf")),
        },
        _ => Err(Error::invalid_field(FLOAT_KEY, "expected a number")),
    }
}
