#[macro_use]
mod cases;

use std::rc::Rc;

use indoc::indoc;
use ndpickle::*;
use pretty_assertions::assert_eq;

fn int_array(shape: &[usize]) -> Rc<ArrayValue> {
    let count = shape.iter().product::<usize>() as i64;
    let elements: Vec<Element> = (0..count).map(Element::Int).collect();
    Rc::new(ArrayValue::from_elements(decode_dtype("<i8").unwrap(), shape, Order::C, &elements).unwrap())
}

fn ints(values: impl IntoIterator<Item = i64>) -> Vec<Element> {
    values.into_iter().map(Element::Int).collect()
}

fn decode_pair(value: &Value, registry: &Registry) -> (Rc<ArrayValue>, Rc<ArrayValue>) {
    let Value::Tuple(items) = cases::roundtrip(value, registry) else {
        panic!("expected a tuple");
    };
    let mut arrays = items.into_iter().map(cases::expect_array);
    match (arrays.next(), arrays.next()) {
        (Some(first), Some(second)) => (first, second),
        _ => panic!("expected two arrays"),
    }
}

#[test]
fn view_shares_storage_with_base() {
    let registry = cases::default_registry();
    let base = int_array(&[40]);
    let view = Rc::new(base.slice(0, Some(1), None, 1).unwrap());

    let (base_out, view_out) = decode_pair(&Value::Tuple(vec![Value::Array(base), Value::Array(view.clone())]), &registry);
    assert!(view_out.shares_buffer_with(&base_out));
    assert_eq!(view_out.elements().unwrap(), view.elements().unwrap());
    assert_eq!(view_out.offset(), 8);

    base_out.set(&[1], &Element::Int(-1)).unwrap();
    assert_eq!(view_out.get(&[0]).unwrap(), Element::Int(-1));
}

#[test]
fn view_encoded_before_its_base() {
    let registry = cases::default_registry();
    let base = int_array(&[4, 4]);
    let column = Rc::new(base.slice(1, Some(2), Some(3), 1).unwrap());

    let (column_out, base_out) =
        decode_pair(&Value::Tuple(vec![Value::Array(column.clone()), Value::Array(base)]), &registry);
    assert!(column_out.shares_buffer_with(&base_out));
    assert_eq!(column_out.shape(), &[4, 1]);
    assert_eq!(column_out.elements().unwrap(), ints([2, 6, 10, 14]));
}

#[test]
fn several_views_serialize_base_once() {
    let registry = cases::default_registry();
    let base = int_array(&[64]);
    let views: Vec<Value> = (0..4)
        .map(|i| Value::array(base.slice(0, Some(i * 16), Some((i + 1) * 16), 1).unwrap()))
        .collect();

    let text = encode(&Value::List(views), &registry).unwrap();
    let json: Json = serde_json::from_str(&text).unwrap();
    let inline_bases = json
        .as_array()
        .unwrap()
        .iter()
        .filter(|view| view["base"].get("values").is_some())
        .count();
    assert_eq!(inline_bases, 1);

    let Value::List(items) = decode(&text, &registry).unwrap() else {
        panic!("expected a list");
    };
    let restored: Vec<Rc<ArrayValue>> = items.into_iter().map(cases::expect_array).collect();
    assert!(restored.windows(2).all(|pair| pair[0].shares_buffer_with(&pair[1])));
    assert_eq!(restored[3].elements().unwrap(), ints(48..64));
}

#[test]
fn reversed_and_transposed_views() {
    let registry = cases::default_registry();
    let base = int_array(&[3, 4]);
    let reversed = Rc::new(base.slice(0, None, None, -1).unwrap());
    let transposed = Rc::new(base.transpose());

    let (reversed_out, transposed_out) = decode_pair(
        &Value::Tuple(vec![Value::Array(reversed.clone()), Value::Array(transposed.clone())]),
        &registry,
    );
    assert!(reversed_out.shares_buffer_with(&transposed_out));
    assert_eq!(reversed_out.elements().unwrap(), reversed.elements().unwrap());
    assert_eq!(transposed_out.elements().unwrap(), transposed.elements().unwrap());
    assert_eq!(transposed_out.order(), Order::F);
}

#[test]
fn view_alone_restores_its_base() {
    let registry = cases::default_registry();
    let base = int_array(&[10]);
    let view = base.slice(0, Some(2), Some(8), 3).unwrap();
    let restored = cases::expect_array(cases::roundtrip(&Value::array(view), &registry));
    assert_eq!(restored.elements().unwrap(), ints([2, 5]));
    match restored.base() {
        Some(Base::Array(base_out)) => assert_eq!(base_out.element_count(), 10),
        other => panic!("expected an array base, got {:?}", other),
    }
}

#[test]
fn foreign_base_under_raise() {
    let registry = cases::registry_with(CodecOptions {
        alias_policy: AliasPolicy::Raise,
        ..CodecOptions::default()
    });
    let buffer = Buffer::from_vec((0u8..32).collect());
    let foreign = ArrayValue::from_foreign(buffer, DType::uint8(), &[32], Order::C).unwrap();
    assert!(matches!(
        encode(&Value::array(foreign), &registry),
        Err(Error::UnsupportedAliasing)
    ));
}

#[test]
fn foreign_base_under_warn() {
    cases::init_test_logging();
    let registry = cases::default_registry();
    let buffer = Buffer::from_vec((0u8..32).collect());
    let foreign = Rc::new(ArrayValue::from_foreign(buffer.clone(), DType::uint8(), &[32], Order::C).unwrap());

    let mut pickler = Pickler::new(&registry);
    let json = pickler.flatten(&Value::Array(foreign.clone())).unwrap();
    assert_eq!(pickler.warnings().len(), 1);
    assert!(json.get("base").is_none());

    let restored = cases::expect_array(from_portable(&json, &registry).unwrap());
    assert_eq!(restored.elements().unwrap(), foreign.elements().unwrap());
    assert!(restored.base().is_none());

    buffer.borrow_mut()[0] = 99;
    assert_eq!(restored.get(&[0]).unwrap(), Element::UInt(0));
}

#[test]
fn non_contiguous_base_claimed_by_payload() {
    let registry = cases::default_registry();
    let payload = indoc! {r#"
        {
          "@type": "ndarray",
          "dtype": "<i8",
          "shape": [2],
          "base": {
            "@type": "ndarray",
            "dtype": "<i8",
            "shape": [3],
            "strides": [16],
            "base": {"@type": "ndarray", "dtype": "<i8", "values": [0, 1, 2, 3, 4, 5]}
          }
        }
    "#};
    assert!(matches!(
        decode(payload, &registry),
        Err(Error::InvalidBaseStorage { .. })
    ));
}

#[test]
fn view_of_contiguous_view_restores() {
    let registry = cases::default_registry();
    let payload = indoc! {r#"
        {
          "@type": "ndarray",
          "dtype": "<i8",
          "shape": [2],
          "offset": 8,
          "base": {
            "@type": "ndarray",
            "dtype": "<i8",
            "shape": [4],
            "offset": 16,
            "base": {"@type": "ndarray", "dtype": "<i8", "values": [0, 1, 2, 3, 4, 5]}
          }
        }
    "#};
    let outer = cases::expect_array(decode(payload, &registry).unwrap());
    assert_eq!(outer.elements().unwrap(), ints([3, 4]));
    assert_eq!(outer.offset(), 24);
}

#[test]
fn corrupt_view_offset_is_rejected() {
    let registry = cases::default_registry();
    let payload = indoc! {r#"
        {
          "@type": "ndarray",
          "dtype": "<i8",
          "shape": [3],
          "offset": 32,
          "base": {"@type": "ndarray", "dtype": "<i8", "values": [0, 1, 2, 3, 4, 5]}
        }
    "#};
    assert!(matches!(
        decode(payload, &registry),
        Err(Error::ViewOutOfBounds { .. })
    ));
}

#[test]
fn view_shape_overflow_is_rejected() {
    let registry = cases::default_registry();
    let payload = indoc! {r#"
        {
          "@type": "ndarray",
          "dtype": "|u1",
          "shape": [4294967296, 4294967296, 16],
          "strides": [0, 0, 0],
          "base": {"@type": "ndarray", "dtype": "|u1", "values": [1, 2, 3]}
        }
    "#};
    assert!(matches!(decode(payload, &registry), Err(Error::ShapeOverflow)));
}
