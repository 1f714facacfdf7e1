use crate::{
    document::{Array, borrow_values, materialize},
    error::{Error, ErrorKind, ErrorOrigin},
    value::{Value, canonical_cmp},
};
use derive_more::{Deref, IntoIterator};
use serde::{Serialize, Serializer, ser::SerializeSeq};
use std::cmp::Ordering;

///
/// ValueBuffer
///
/// Materialized, growable array.
///

#[derive(Clone, Debug, Default, Deref, IntoIterator, PartialEq)]
#[into_iterator(owned, ref)]
pub struct ValueBuffer(Vec<Value>);

impl ValueBuffer {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Build a buffer by deep-copying any array.
    pub fn from_array(array: &dyn Array) -> Result<Self, Error> {
        let mut buf = Self::new();
        buf.copy(array)?;

        Ok(buf)
    }

    /// Parse a JSON array into a buffer.
    pub fn from_json(text: &str) -> Result<Self, Error> {
        super::json::parse_array(text)
    }

    pub fn append(&mut self, value: impl Into<Value>) -> &mut Self {
        self.0.push(value.into());
        self
    }

    /// Builder form of [`append`](Self::append).
    #[must_use]
    pub fn with(mut self, value: impl Into<Value>) -> Self {
        self.0.push(value.into());
        self
    }

    /// Overwrite the element at `index`.
    pub fn replace(&mut self, index: usize, value: impl Into<Value>) -> Result<(), Error> {
        let slot = self
            .0
            .get_mut(index)
            .ok_or_else(|| Error::value_not_found(ErrorOrigin::Document, index))?;
        *slot = value.into();

        Ok(())
    }

    /// Deep-copy every element of `array` onto the end of this buffer.
    pub fn copy(&mut self, array: &dyn Array) -> Result<(), Error> {
        array.iterate(&mut |_, value| {
            self.0.push(materialize(value, 0)?);
            Ok(())
        })
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Value> {
        self.0
    }
}

impl Array for ValueBuffer {
    fn get_by_index(&self, index: usize) -> Result<Value, Error> {
        self.0
            .get(index)
            .cloned()
            .ok_or_else(|| Error::value_not_found(ErrorOrigin::Document, index))
    }

    fn iterate(
        &self,
        visit: &mut dyn FnMut(usize, &Value) -> Result<(), Error>,
    ) -> Result<(), Error> {
        for (i, value) in self.0.iter().enumerate() {
            visit(i, value)?;
        }

        Ok(())
    }

    fn as_values(&self) -> Option<&[Value]> {
        Some(&self.0)
    }
}

impl From<Vec<Value>> for ValueBuffer {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl<V: Into<Value>> FromIterator<V> for ValueBuffer {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl Serialize for ValueBuffer {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for value in &self.0 {
            seq.serialize_element(value)?;
        }
        seq.end()
    }
}

///
/// OPERATIONS
///

/// Whether any element compares equal to `value` under the canonical
/// comparator, so `Integer(1)` matches `Double(1.0)` and text matches a blob
/// with the same bytes. Elements after the first match are not visited.
pub fn array_contains(array: &dyn Array, value: &Value) -> Result<bool, Error> {
    let mut found = false;
    let walk = array.iterate(&mut |_, item| {
        if canonical_cmp(item, value)? == Ordering::Equal {
            found = true;
            // stop the walk; mapped back to a hit below
            return Err(Error::new(ErrorKind::InvalidInput, ErrorOrigin::Document, ""));
        }
        Ok(())
    });

    match walk {
        Ok(()) => Ok(false),
        Err(_) if found => Ok(true),
        Err(err) => Err(err),
    }
}

/// Stable ascending sort under the canonical comparator.
///
/// The input is not modified; elements that compare equal keep their
/// relative order. Lazy elements are materialized up front, so decode and
/// depth failures surface before any comparison runs.
pub fn sort_array(array: &dyn Array) -> Result<ValueBuffer, Error> {
    let mut items = borrow_values(array)?
        .iter()
        .map(|item| materialize(item, 0))
        .collect::<Result<Vec<_>, _>>()?;
    let mut failure = None;

    items.sort_by(|a, b| match canonical_cmp(a, b) {
        Ok(ord) => ord,
        Err(err) => {
            failure.get_or_insert(err);
            Ordering::Equal
        }
    });

    match failure {
        Some(err) => Err(err),
        None => Ok(ValueBuffer(items)),
    }
}
