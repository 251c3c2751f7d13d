//! Encode/parse round-trip coverage for the value model.

use std::collections::BTreeMap;

use voxloop_value_core::{parse, ParseOutcome, Serde, SerdeState, Value, ValueSerde};

fn round_trip(value: &Value) {
    let encoded = value.encode();
    match parse(format!("{} ", encoded).as_bytes()) {
        ParseOutcome::Done { value: parsed, consumed } => {
            assert_eq!(&parsed, value, "encoding was {:?}", encoded);
            assert_eq!(consumed, encoded.len());
        }
        other => panic!("round trip failed for {:?}: {:?}", encoded, other),
    }
}

fn sample_values() -> Vec<Value> {
    let mut object = BTreeMap::new();
    object.insert("user".to_string(), Value::string("alice"));
    object.insert("volume".to_string(), Value::Number(70.0));
    object.insert("fraction".to_string(), Value::Number(-0.125));
    object.insert("flags".to_string(), Value::List(vec![Value::Bool(true), Value::Null]));

    vec![
        Value::Null,
        Value::Bool(true),
        Value::Bool(false),
        Value::Number(0.0),
        Value::Number(-17.0),
        Value::Number(1.0e9),
        Value::Number(3.141592653589793),
        Value::string(""),
        Value::string("loop alpha"),
        Value::string("quote \" backslash \\ newline \n unicode \u{1f600}"),
        Value::List(vec![]),
        Value::List(vec![Value::Number(1.0), Value::string("two"), Value::Null]),
        Value::Object(BTreeMap::new()),
        Value::Object(object),
    ]
}

#[test]
fn parse_of_encode_is_identity() {
    for value in sample_values() {
        round_trip(&value);
    }
}

#[test]
fn nested_structures_round_trip() {
    let inner = Value::object([
        ("participants".to_string(), Value::List(vec![
            Value::object([
                ("user".to_string(), Value::string("bob")),
                ("role".to_string(), Value::string("operator")),
            ]),
        ])),
        ("state".to_string(), Value::string("send")),
    ]);
    let outer = Value::object([
        ("event".to_string(), Value::string("switch_loop_state")),
        ("response".to_string(), inner),
    ]);
    round_trip(&outer);
}

#[test]
fn framing_survives_byte_at_a_time_delivery() {
    let value = Value::object([
        ("event".to_string(), Value::string("talking")),
        ("parameter".to_string(), Value::object([
            ("loop".to_string(), Value::string("L1")),
            ("state".to_string(), Value::Bool(true)),
        ])),
    ]);
    let encoded = value.encode();

    let mut serde = ValueSerde::new();
    let bytes = encoded.as_bytes();
    for (i, byte) in bytes.iter().enumerate() {
        let state = serde.add_raw(std::slice::from_ref(byte)).expect("valid input");
        if i + 1 < bytes.len() {
            assert_eq!(state, SerdeState::Progress, "at octet {}", i);
        } else {
            assert_eq!(state, SerdeState::End);
        }
    }
    assert_eq!(serde.pop_datum(), Some(value));
}
