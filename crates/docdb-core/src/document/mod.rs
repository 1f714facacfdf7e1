//! Document and array abstractions.
//!
//! Both contracts are object-safe and polymorphic over materialized buffers
//! ([`FieldBuffer`], [`ValueBuffer`]) and lazy sources (encoded record views,
//! deferred JSON text). Iteration is visitor-driven: the first error returned
//! by the visitor, or raised while producing a value, aborts the walk and is
//! returned unchanged.

mod array;
mod buffer;
mod create;
mod json;


use crate::{
    MAX_NESTING_DEPTH,
    error::{Error, ErrorOrigin},
    value::Value,
};
use std::{borrow::Cow, fmt};

// re-exports
pub use array::{ValueBuffer, array_contains, sort_array};
pub use buffer::{Field, FieldBuffer};
pub use create::{from_csv, from_map};
pub use json::{JsonDocument, ParseError, from_json};

///
/// Document
///
/// Ordered field-name → value mapping.
///

pub trait Document: fmt::Debug + Send + Sync {
    /// Look up one field by name; `FieldNotFound` if absent.
    fn get_by_field(&self, name: &str) -> Result<Value, Error>;

    /// Visit every (name, value) pair once, in field order.
    fn iterate(
        &self,
        visit: &mut dyn FnMut(&str, &Value) -> Result<(), Error>,
    ) -> Result<(), Error>;

    /// Borrowed fields for materialized implementations.
    fn as_fields(&self) -> Option<&[Field]> {
        None
    }
}

///
/// Array
///
/// Ordered sequence of values.
///

pub trait Array: fmt::Debug + Send + Sync {
    /// Look up one element by position; `ValueNotFound` if out of range.
    fn get_by_index(&self, index: usize) -> Result<Value, Error>;

    /// Visit every (index, value) pair once, in order.
    fn iterate(
        &self,
        visit: &mut dyn FnMut(usize, &Value) -> Result<(), Error>,
    ) -> Result<(), Error>;

    /// Borrowed values for materialized implementations.
    fn as_values(&self) -> Option<&[Value]> {
        None
    }
}

/// Drain any document into owned fields, in field order.
pub fn fields(doc: &dyn Document) -> Result<Vec<Field>, Error> {
    if let Some(fields) = doc.as_fields() {
        return Ok(fields.to_vec());
    }

    let mut out = Vec::new();
    doc.iterate(&mut |name, value| {
        out.push(Field::new(name, value.clone()));
        Ok(())
    })?;

    Ok(out)
}

/// Drain any array into owned values, in order.
pub fn values(array: &dyn Array) -> Result<Vec<Value>, Error> {
    if let Some(values) = array.as_values() {
        return Ok(values.to_vec());
    }

    let mut out = Vec::new();
    array.iterate(&mut |_, value| {
        out.push(value.clone());
        Ok(())
    })?;

    Ok(out)
}

// Borrow materialized fields, draining only lazy sources.
pub(crate) fn borrow_fields(doc: &dyn Document) -> Result<Cow<'_, [Field]>, Error> {
    match doc.as_fields() {
        Some(fields) => Ok(Cow::Borrowed(fields)),
        None => fields(doc).map(Cow::Owned),
    }
}

// Borrow materialized values, draining only lazy sources.
pub(crate) fn borrow_values(array: &dyn Array) -> Result<Cow<'_, [Value]>, Error> {
    match array.as_values() {
        Some(values) => Ok(Cow::Borrowed(values)),
        None => values(array).map(Cow::Owned),
    }
}

/// Deep-copy a value so that every nested array/document is a buffer.
///
/// Lazy payloads are decoded in full; scalars are cloned as-is.
pub(crate) fn materialize(value: &Value, depth: usize) -> Result<Value, Error> {
    match value {
        Value::Array(array) => {
            let depth = next_depth(depth, ErrorOrigin::Document)?;
            let mut buf = ValueBuffer::new();
            array.iterate(&mut |_, item| {
                buf.append(materialize(item, depth)?);
                Ok(())
            })?;

            Ok(Value::from(buf))
        }
        Value::Document(doc) => {
            let depth = next_depth(depth, ErrorOrigin::Document)?;
            let mut buf = FieldBuffer::new();
            doc.iterate(&mut |name, item| {
                buf.add(name, materialize(item, depth)?);
                Ok(())
            })?;

            Ok(Value::from(buf))
        }
        scalar => Ok(scalar.clone()),
    }
}

/// Step one nesting level down, failing past [`MAX_NESTING_DEPTH`].
pub(crate) fn next_depth(depth: usize, origin: ErrorOrigin) -> Result<usize, Error> {
    let next = depth + 1;
    if next > MAX_NESTING_DEPTH {
        return Err(Error::depth_exceeded(origin, MAX_NESTING_DEPTH));
    }

    Ok(next)
}
