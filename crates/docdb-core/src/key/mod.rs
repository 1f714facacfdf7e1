//! Order-preserving index keys.
//!
//! `encode_key(a).cmp(&encode_key(b))` agrees with
//! [`canonical_cmp`](crate::value::canonical_cmp) for every pair of values,
//! so a storage engine can keep index entries in plain byte order.
//!
//! Layout: one canonical rank byte, then a rank-local payload.
//! - Null: nothing
//! - Bool: `0` / `1`
//! - Number: ordered f64 image of the nearest double, then the biased i64
//!   distance from that double (zero for doubles)
//! - Text / Blob: escaped bytes (`00` -> `00 FF`) terminated by `00 00`
//! - Array: `01 key` per element, then `00`
//! - Document: `01 name key` per field, then `00`
//!
//! Every key is self-delimiting, so keys concatenate into composite keys.


use crate::{
    MAX_NESTING_DEPTH,
    document::Document,
    error::{Error, ErrorOrigin},
    value::Value,
};
use thiserror::Error as ThisError;

const ITEM_MARKER: u8 = 0x01;
const END_MARKER: u8 = 0x00;
const SIGN_BIT: u64 = 1 << 63;

///
/// KeyError
///

#[derive(Debug, ThisError)]
pub enum KeyError {
    #[error("value nests deeper than {max_depth} levels")]
    TooDeep { max_depth: usize },
}

impl From<KeyError> for Error {
    fn from(err: KeyError) -> Self {
        Self::invalid_input(ErrorOrigin::Key, format!("value is not key-encodable: {err}"))
    }
}

/// Encode one value into comparator-ordered key bytes.
///
/// A top-level document counts depth like an encoded record: its fields sit
/// at depth 0.
pub fn encode_key(value: &Value) -> Result<Vec<u8>, Error> {
    let mut out = Vec::new();
    push_root(&mut out, value)?;

    Ok(out)
}

/// Encode a tuple of values; byte order is lexicographic over components.
pub fn encode_composite_key(values: &[Value]) -> Result<Vec<u8>, Error> {
    let mut out = Vec::new();
    for value in values {
        push_root(&mut out, value)?;
    }

    Ok(out)
}

fn push_root(out: &mut Vec<u8>, value: &Value) -> Result<(), Error> {
    match value {
        Value::Document(doc) => {
            out.push(value.canonical_rank());
            push_fields(out, doc.as_ref(), 0)
        }
        _ => push_value(out, value, 0),
    }
}

fn push_value(out: &mut Vec<u8>, value: &Value, depth: usize) -> Result<(), Error> {
    out.push(value.canonical_rank());

    match value {
        Value::Null => {}
        Value::Bool(v) => out.push(u8::from(*v)),
        Value::Integer(v) => push_integer(out, *v),
        Value::Double(v) => push_number(out, *v, 0),
        Value::Text(v) => push_terminated_bytes(out, v.as_bytes()),
        Value::Blob(v) => push_terminated_bytes(out, v),
        Value::Array(array) => {
            let depth = enter(depth)?;
            array.iterate(&mut |_, item| {
                out.push(ITEM_MARKER);
                push_value(out, item, depth)
            })?;
            out.push(END_MARKER);
        }
        Value::Document(doc) => push_fields(out, doc.as_ref(), enter(depth)?)?,
    }

    Ok(())
}

// `depth` is the depth of the fields themselves.
fn push_fields(out: &mut Vec<u8>, doc: &dyn Document, depth: usize) -> Result<(), Error> {
    doc.iterate(&mut |name, item| {
        out.push(ITEM_MARKER);
        push_terminated_bytes(out, name.as_bytes());
        push_value(out, item, depth)
    })?;
    out.push(END_MARKER);

    Ok(())
}

fn enter(depth: usize) -> Result<usize, KeyError> {
    let next = depth + 1;
    if next > MAX_NESTING_DEPTH {
        return Err(KeyError::TooDeep {
            max_depth: MAX_NESTING_DEPTH,
        });
    }

    Ok(next)
}

// An integer sorts as its nearest double, ties broken by the exact distance
// from it; |distance| stays below 2^10 for every i64.
#[expect(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn push_integer(out: &mut Vec<u8>, value: i64) {
    let approx = value as f64;
    let residual = i128::from(value) - approx as i128;

    push_number(out, approx, residual as i64);
}

fn push_number(out: &mut Vec<u8>, approx: f64, residual: i64) {
    out.extend_from_slice(&ordered_f64_bytes(approx));
    out.extend_from_slice(&ordered_i64_bytes(residual));
}

// NaN maps below every other image; -0.0 shares the image of 0.0.
const fn ordered_f64_bytes(value: f64) -> [u8; 8] {
    if value.is_nan() {
        return [0; 8];
    }

    let bits = if value == 0.0 { 0 } else { value.to_bits() };
    let ordered = if bits & SIGN_BIT == 0 {
        bits ^ SIGN_BIT
    } else {
        !bits
    };

    ordered.to_be_bytes()
}

const fn ordered_i64_bytes(value: i64) -> [u8; 8] {
    let biased = value.cast_unsigned() ^ SIGN_BIT;
    biased.to_be_bytes()
}

// Byte strings are escaped so element and field boundaries stay unambiguous.
fn push_terminated_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    for &byte in bytes {
        if byte == 0 {
            out.extend_from_slice(&[0, 0xFF]);
        } else {
            out.push(byte);
        }
    }

    out.extend_from_slice(&[0, 0]);
}
