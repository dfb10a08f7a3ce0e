use std::rc::Rc;

use pretty_assertions::assert_eq;
use serde_json::json;

use super::{Registry, Value, decode, encode, from_portable, to_portable};
use crate::array::{ArrayValue, Order};
use crate::codec::{CodecOptions, register_codecs};
use crate::dtype::{DType, Element};
use crate::errors::Error;

fn codecs() -> Registry {
    let mut registry = Registry::new();
    register_codecs(&mut registry, CodecOptions::default());
    registry
}

#[test]
fn test_plain_data_maps_onto_json() {
    let registry = Registry::new();
    let value = Value::Dict(vec![
        ("name".into(), Value::Str("grid".into())),
        ("size".into(), Value::List(vec![Value::Int(2), Value::UInt(u64::MAX)])),
        ("scale".into(), Value::Float(0.25)),
        ("flags".into(), Value::List(vec![Value::Bool(true), Value::None])),
    ]);
    let json = to_portable(&value, &registry).unwrap();
    assert_eq!(
        json,
        json!({"name": "grid", "size": [2, u64::MAX], "scale": 0.25, "flags": [true, null]})
    );
    assert_eq!(from_portable(&json, &registry).unwrap(), value);
}

#[test]
fn test_wrapped_values() {
    let registry = Registry::new();
    let value = Value::Tuple(vec![
        Value::Bytes(vec![0, 255]),
        Value::Complex(1.0, -2.0),
        Value::Float(f64::NEG_INFINITY),
    ]);
    let json = to_portable(&value, &registry).unwrap();
    assert_eq!(
        json,
        json!({"@tuple": [{"@bytes": "AP8="}, {"@complex": [1.0, -2.0]}, {"@float": "-inf"}]})
    );
    assert_eq!(from_portable(&json, &registry).unwrap(), value);
}

#[test]
fn test_nan_survives_text() {
    let registry = Registry::new();
    let text = encode(&Value::Float(f64::NAN), &registry).unwrap();
    assert_eq!(text, r#"{"@float":"nan"}"#);
    let Value::Float(x) = decode(&text, &registry).unwrap() else {
        panic!("expected a float");
    };
    assert!(x.is_nan());
}

#[test]
fn test_reserved_keys_are_rejected() {
    let registry = Registry::new();
    let value = Value::Dict(vec![("@type".into(), Value::Int(1))]);
    assert!(matches!(
        to_portable(&value, &registry),
        Err(Error::ReservedKey { .. })
    ));
    assert!(matches!(
        from_portable(&json!({"@other": 1}), &registry),
        Err(Error::ReservedKey { .. })
    ));
}

#[test]
fn test_unknown_and_unregistered_types() {
    let registry = Registry::new();
    assert!(matches!(
        to_portable(&Value::DType(DType::bool()), &registry),
        Err(Error::UnregisteredType { tag: "dtype" })
    ));
    assert!(matches!(
        from_portable(&json!({"@type": "matrix"}), &registry),
        Err(Error::InvalidField { field: "@type", .. })
    ));
}

#[test]
fn test_dangling_reference() {
    let registry = codecs();
    assert!(matches!(
        from_portable(&json!([{"@ref": 3}]), &registry),
        Err(Error::DanglingReference { id: 3 })
    ));
}

#[test]
fn test_repeated_array_is_written_once() {
    let registry = codecs();
    let array = Rc::new(
        ArrayValue::from_elements(DType::uint8(), &[2], Order::C, &[Element::UInt(7), Element::UInt(9)]).unwrap(),
    );
    let value = Value::Dict(vec![
        ("a".into(), Value::Array(array.clone())),
        ("b".into(), Value::Array(array.clone())),
    ]);
    let json = to_portable(&value, &registry).unwrap();
    assert_eq!(json["b"], json!({"@ref": 0}));

    let Value::Dict(entries) = decode(&encode(&value, &registry).unwrap(), &registry).unwrap() else {
        panic!("expected a dict");
    };
    let (Value::Array(a), Value::Array(b)) = (&entries[0].1, &entries[1].1) else {
        panic!("expected arrays");
    };
    assert!(Rc::ptr_eq(a, b));
    assert_eq!(**a, *array);
}

#[test]
fn test_array_to_value_nests_by_dimension() {
    let elements: Vec<Element> = (0..6).map(Element::Int).collect();
    let array = ArrayValue::from_elements(DType::int16(), &[3, 2], Order::C, &elements).unwrap();
    assert_eq!(
        array.to_value().unwrap(),
        Value::List(vec![
            Value::List(vec![Value::Int(0), Value::Int(1)]),
            Value::List(vec![Value::Int(2), Value::Int(3)]),
            Value::List(vec![Value::Int(4), Value::Int(5)]),
        ])
    );
}
