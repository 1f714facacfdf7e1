//! Shared builders and proptest strategies for unit tests.
use crate::{
    document::{FieldBuffer, ValueBuffer},
    value::Value,
};
use proptest::{collection::vec, prelude::*};

pub(crate) fn doc<const N: usize>(fields: [(&str, Value); N]) -> Value {
    let mut buf = FieldBuffer::new();
    for (name, value) in fields {
        buf.add(name, value);
    }

    Value::from(buf)
}

pub(crate) fn list<const N: usize>(items: [Value; N]) -> Value {
    Value::from(items.into_iter().collect::<ValueBuffer>())
}

pub(crate) fn text(s: &str) -> Value {
    Value::from(s)
}

pub(crate) fn blob(bytes: &[u8]) -> Value {
    Value::from(bytes)
}

#[expect(clippy::cast_precision_loss)]
fn int_as_double(n: i64) -> Value {
    Value::Double(n as f64)
}

// Scalars biased toward values that collide across representations.
fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        (-4i64..4).prop_map(Value::Integer),
        any::<f64>().prop_map(Value::Double),
        (-8i32..8).prop_map(|n| Value::Double(f64::from(n) / 2.0)),
        any::<i64>().prop_map(int_as_double),
        Just(Value::Double(f64::NAN)),
        Just(Value::Double(-0.0)),
        "[a-c\\x00]{0,4}".prop_map(Value::Text),
        vec(prop_oneof![Just(0u8), Just(b'a'), Just(b'b'), any::<u8>()], 0..4)
            .prop_map(Value::Blob),
    ]
}

/// Arbitrary values up to three container levels deep.
pub(crate) fn arb_value() -> impl Strategy<Value = Value> {
    arb_scalar().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            vec(inner.clone(), 0..4).prop_map(Value::from_list),
            vec(("[a-c]{0,2}", inner), 0..4).prop_map(|fields| {
                Value::from(fields.into_iter().collect::<FieldBuffer>())
            }),
        ]
    })
}

/// Arbitrary top-level documents.
pub(crate) fn arb_document() -> impl Strategy<Value = FieldBuffer> {
    vec(("[a-e]{1,3}", arb_value()), 0..6)
        .prop_map(|fields| fields.into_iter().collect::<FieldBuffer>())
}
