mod cases;

use indoc::indoc;
use ndpickle::*;

#[test]
fn unknown_element_type() {
    for name in [
        "<x4",
        "int7",
        "",
        "<i3",
        "U",
        "|S18446744073709551615",
        "{'names': ['a', 'b'], 'formats': ['S18446744073709551615', 'S18446744073709551615']}",
    ] {
        assert!(
            matches!(decode_dtype(name), Err(Error::UnknownElementType { .. })),
            "{:?}",
            name
        );
    }
}

#[test]
fn malformed_type_descriptor() {
    for text in [
        "[('x', '<i4')",
        "[('x', '<i4'), ('x', '<f8')]",
        "{'names': ['a'], 'formats': ['<i4', '<i4']}",
        "{'names': ['a'], 'formats': ['<i8'], 'itemsize': 4}",
        "[('x', '<i4', (2,))]",
        "{'names': ['a'], 'formats': ['<i4'], 'shape': 3}",
        "{'names': ['a', 'b', 'c'], 'formats': ['S9223372036854775807', 'S9223372036854775807', 'S9223372036854775807']}",
        "[('a', 'S9223372036854775807'), ('b', 'S9223372036854775807'), ('c', 'S9223372036854775807')]",
        "{'names': ['a', 'b'], 'formats': ['S9223372036854775807', 'S9223372036854775807']}",
        "{'names': ['a'], 'formats': ['<i4'], 'itemsize': 18446744073709551615}",
    ] {
        assert!(
            matches!(decode_dtype(text), Err(Error::MalformedTypeDescriptor { .. })),
            "{}",
            text
        );
    }
}

#[test]
fn unknown_dtype_inside_array_payload() {
    let registry = cases::default_registry();
    let payload = r#"{"@type": "ndarray", "dtype": "<z8", "values": [1, 2]}"#;
    assert!(matches!(
        decode(payload, &registry),
        Err(Error::UnknownElementType { .. })
    ));
}

#[test]
fn oversized_dtype_inside_payloads() {
    let registry = cases::default_registry();
    let payloads = [
        r#"{"@type": "scalar", "dtype": "|S18446744073709551615", "value": {"@bytes": ""}}"#,
        r#"{"@type": "ndarray", "dtype": "|S18446744073709551615", "values": [{"@bytes": ""}]}"#,
        r#"{"@type": "ndarray", "dtype": "|V18446744073709551615", "values": "", "shape": [1]}"#,
    ];
    for payload in payloads {
        assert!(
            matches!(decode(payload, &registry), Err(Error::UnknownElementType { .. })),
            "{}",
            payload
        );
    }
}

#[test]
fn shape_mismatch() {
    let registry = cases::default_registry();
    let payload = r#"{"@type": "ndarray", "dtype": "<i4", "values": [[1, 2], [3, 4]], "shape": [3]}"#;
    assert!(matches!(
        decode(payload, &registry),
        Err(Error::ShapeMismatch {
            expected: 3,
            actual: 4
        })
    ));
}

#[test]
fn corrupt_buffer_rejection() {
    let registry = cases::default_registry();
    let array = cases::sample_array("<i4", &[20], Order::C);
    let mut json = to_portable(&Value::Array(array), &registry).unwrap();
    json["shape"] = Json::from(vec![21]);
    assert!(matches!(
        from_portable(&json, &registry),
        Err(Error::BufferSizeMismatch {
            expected: 84,
            actual: 80
        })
    ));
}

#[test]
fn oversized_decompressed_buffer() {
    let registry = cases::default_registry();
    let packed = Zlib::default().compress(&vec![0u8; 1 << 20]).unwrap();
    let payload = serde_json::json!({
        "@type": "ndarray",
        "dtype": "<i4",
        "values": Base64.encode(&packed),
        "shape": [4],
    });
    assert!(matches!(
        from_portable(&payload, &registry),
        Err(Error::BufferSizeMismatch {
            expected: 16,
            actual: 17
        })
    ));
}

#[test]
fn truncated_text_payload() {
    let registry = cases::registry_with(CodecOptions {
        compression: None,
        ..CodecOptions::default()
    });
    let payload = indoc! {r#"
        {"@type": "ndarray", "dtype": "<i4", "values": "AAAA!", "shape": [1]}
    "#};
    assert!(matches!(decode(payload, &registry), Err(Error::TextDecoding(_))));
}

#[test]
fn malformed_fields() {
    let registry = cases::default_registry();
    let bad_order = r#"{"@type": "ndarray", "dtype": "<i4", "values": [1], "order": "K"}"#;
    assert!(matches!(
        decode(bad_order, &registry),
        Err(Error::InvalidField { field: "order", .. })
    ));

    let bad_shape = r#"{"@type": "ndarray", "dtype": "<i4", "values": [1], "shape": [-1]}"#;
    assert!(matches!(
        decode(bad_shape, &registry),
        Err(Error::InvalidField { field: "shape", .. })
    ));

    let no_values = r#"{"@type": "ndarray", "dtype": "<i4"}"#;
    assert!(matches!(
        decode(no_values, &registry),
        Err(Error::MissingField { field: "values" })
    ));

    assert!(matches!(decode("{not json", &registry), Err(Error::Json(_))));
}

#[test]
fn errors_render_readably() {
    let err = decode_dtype("<x4").unwrap_err();
    assert_eq!(err.to_string(), "unknown element type `<x4`");
    assert_eq!(
        Error::BufferSizeMismatch {
            expected: 8,
            actual: 7
        }
        .to_string(),
        "buffer size mismatch: expected 8 bytes, got 7"
    );
}
