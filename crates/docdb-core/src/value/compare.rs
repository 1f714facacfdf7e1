use crate::{
    document::{Array, Document, borrow_fields, borrow_values, next_depth},
    error::{Error, ErrorOrigin},
    value::Value,
};
use std::cmp::Ordering;

// -2^63 and 2^63; both exactly representable as f64.
const I64_MIN_F64: f64 = -9_223_372_036_854_775_808.0;
const I64_END_F64: f64 = 9_223_372_036_854_775_808.0;

/// Total canonical comparator used by sorting, membership and index keys.
///
/// Ordering rules:
/// 1. Canonical kind rank
/// 2. Kind-specific comparison for same-ranked values
///
/// Only lazily backed payloads can fail, when their bytes do not decode, or
/// when nesting exceeds [`MAX_NESTING_DEPTH`](crate::MAX_NESTING_DEPTH). Two
/// top-level documents count depth like encoded records: their fields sit at
/// depth 0.
pub fn canonical_cmp(left: &Value, right: &Value) -> Result<Ordering, Error> {
    match (left, right) {
        (Value::Document(a), Value::Document(b)) => cmp_documents(a.as_ref(), b.as_ref(), 0),
        _ => cmp_at_depth(left, right, 0),
    }
}

fn cmp_at_depth(left: &Value, right: &Value, depth: usize) -> Result<Ordering, Error> {
    let rank = left.canonical_rank().cmp(&right.canonical_rank());
    if rank != Ordering::Equal {
        return Ok(rank);
    }

    cmp_same_rank(left, right, depth)
}

fn cmp_same_rank(left: &Value, right: &Value, depth: usize) -> Result<Ordering, Error> {
    let ord = match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
        (Value::Integer(a), Value::Double(b)) => cmp_integer_double(*a, *b),
        (Value::Double(a), Value::Integer(b)) => cmp_integer_double(*b, *a).reverse(),
        (Value::Double(a), Value::Double(b)) => cmp_double(*a, *b),
        (Value::Array(a), Value::Array(b)) => {
            let depth = next_depth(depth, ErrorOrigin::Value)?;
            return cmp_arrays(a.as_ref(), b.as_ref(), depth);
        }
        (Value::Document(a), Value::Document(b)) => {
            let depth = next_depth(depth, ErrorOrigin::Value)?;
            return cmp_documents(a.as_ref(), b.as_ref(), depth);
        }
        _ => match (left.byte_content(), right.byte_content()) {
            (Some(a), Some(b)) => a.cmp(b),
            // Null against Null
            _ => Ordering::Equal,
        },
    };

    Ok(ord)
}

// NaN equals NaN and sits below every other number; -0.0 equals 0.0.
fn cmp_double(left: f64, right: f64) -> Ordering {
    match (left.is_nan(), right.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => left.partial_cmp(&right).unwrap_or(Ordering::Equal),
    }
}

// Exact mixed comparison: no rounding of the integer through f64.
#[expect(clippy::cast_possible_truncation)]
fn cmp_integer_double(int: i64, double: f64) -> Ordering {
    if double.is_nan() {
        return Ordering::Greater;
    }
    if double >= I64_END_F64 {
        return Ordering::Less;
    }
    if double < I64_MIN_F64 {
        return Ordering::Greater;
    }

    // In range, so the truncated part converts exactly.
    let whole = double.trunc();
    match int.cmp(&(whole as i64)) {
        Ordering::Equal => {
            if double > whole {
                Ordering::Less
            } else if double < whole {
                Ordering::Greater
            } else {
                Ordering::Equal
            }
        }
        ord => ord,
    }
}

fn cmp_arrays(left: &dyn Array, right: &dyn Array, depth: usize) -> Result<Ordering, Error> {
    let left = borrow_values(left)?;
    let right = borrow_values(right)?;

    for (left, right) in left.iter().zip(right.iter()) {
        let cmp = cmp_at_depth(left, right, depth)?;
        if cmp != Ordering::Equal {
            return Ok(cmp);
        }
    }

    Ok(left.len().cmp(&right.len()))
}

// Documents order by successive (name, value) pairs, then by field count.
fn cmp_documents(
    left: &dyn Document,
    right: &dyn Document,
    depth: usize,
) -> Result<Ordering, Error> {
    let left = borrow_fields(left)?;
    let right = borrow_fields(right)?;

    for (left, right) in left.iter().zip(right.iter()) {
        let name_cmp = left.name.as_bytes().cmp(right.name.as_bytes());
        if name_cmp != Ordering::Equal {
            return Ok(name_cmp);
        }

        let value_cmp = cmp_at_depth(&left.value, &right.value, depth)?;
        if value_cmp != Ordering::Equal {
            return Ok(value_cmp);
        }
    }

    Ok(left.len().cmp(&right.len()))
}
