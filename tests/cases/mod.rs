#![allow(dead_code, unused_macros)]

use std::rc::Rc;

use ndpickle::dtype::ScalarKind;
use ndpickle::*;
use once_cell::sync::Lazy;

/// Descriptor texts paired with the canonical text they encode back to.
pub static DESCRIPTOR_CASES: Lazy<Vec<(&'static str, &'static str)>> = Lazy::new(|| {
    vec![
        ("<i4", "<i4"),
        (">f8", ">f8"),
        ("|b1", "|b1"),
        ("bool", "|b1"),
        ("|u1", "|u1"),
        ("<u2", "<u2"),
        (">c16", ">c16"),
        ("<f2", "<f2"),
        ("|S5", "|S5"),
        (">U3", ">U3"),
        ("|V4", "|V4"),
        ("[('x', '<i4'), ('y', '<f8')]", "[('x', '<i4'), ('y', '<f8')]"),
        (
            "{'names': ['a', 'b'], 'formats': ['|u1', '<i4'], 'offsets': [0, 4], 'itemsize': 8}",
            "{'names': ['a', 'b'], 'formats': ['|u1', '<i4'], 'offsets': [0, 4], 'itemsize': 8}",
        ),
        (
            "[('pos', [('x', '<f4'), ('y', '<f4')]), ('id', '<u8')]",
            "[('pos', [('x', '<f4'), ('y', '<f4')]), ('id', '<u8')]",
        ),
    ]
});

pub fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with_test_writer()
        .try_init();
}

pub fn registry_with(options: CodecOptions) -> Registry {
    let mut registry = Registry::new();
    register_codecs(&mut registry, options);
    registry
}

pub fn default_registry() -> Registry {
    registry_with(CodecOptions::default())
}

/// A deterministic element of `dtype`, varying with `i`.
pub fn sample_element(dtype: &DType, i: usize) -> Element {
    if let Some(structured) = dtype.as_structured() {
        return Element::Record(
            structured
                .fields()
                .iter()
                .map(|field| sample_element(&field.dtype, i))
                .collect(),
        );
    }
    match dtype.as_scalar().map(|s| s.kind()) {
        Some(ScalarKind::Bool) => Element::Bool(i % 3 == 0),
        Some(ScalarKind::UInt) => Element::UInt((i % 100) as u64),
        Some(ScalarKind::Float) => Element::Float(i as f64 * 0.5 - 3.0),
        Some(ScalarKind::Complex) => Element::Complex(i as f64, -(i as f64)),
        Some(ScalarKind::Bytes) => Element::Bytes(format!("b{}", i % 10).into_bytes()),
        Some(ScalarKind::Unicode) => Element::Str(format!("é{}", i % 10)),
        Some(ScalarKind::Void) => Element::Void(vec![i as u8; dtype.itemsize()]),
        _ => Element::Int(i as i64 % 100 - 50),
    }
}

pub fn sample_elements(dtype: &DType, count: usize) -> Vec<Element> {
    (0..count).map(|i| sample_element(dtype, i)).collect()
}

pub fn sample_array(descriptor: &str, shape: &[usize], order: Order) -> Rc<ArrayValue> {
    let dtype = decode_dtype(descriptor).unwrap();
    let count = shape.iter().product();
    let elements = sample_elements(&dtype, count);
    Rc::new(ArrayValue::from_elements(dtype, shape, order, &elements).unwrap())
}

pub fn expect_array(value: Value) -> Rc<ArrayValue> {
    match value {
        Value::Array(array) => array,
        other => panic!("expected an array, got {:?}", other),
    }
}

pub fn roundtrip(value: &Value, registry: &Registry) -> Value {
    let text = encode(value, registry).unwrap();
    decode(&text, registry).unwrap()
}

/// Encode then decode one array and check that the restored array matches.
macro_rules! roundtrip_case {
    ($name:ident, dtype: $dtype:expr, shape: $shape:expr, order: $order:expr, mode: $mode:literal $(,)?) => {
        #[test]
        fn $name() {
            let registry = cases::default_registry();
            let array = cases::sample_array($dtype, &$shape, $order);
            let json = to_portable(&Value::Array(array.clone()), &registry).unwrap();
            let mode = if json["values"].is_string() { "binary" } else { "nested" };
            assert_eq!(mode, $mode);

            let restored = cases::expect_array(cases::roundtrip(&Value::Array(array.clone()), &registry));
            assert_eq!(restored.dtype(), array.dtype());
            assert_eq!(restored.shape(), array.shape());
            assert_eq!(restored.order(), array.order());
            assert_eq!(restored.elements().unwrap(), array.elements().unwrap());
            if $mode == "binary" {
                assert_eq!(restored.buffer().to_vec(), array.buffer().to_vec());
            }
        }
    };
}
