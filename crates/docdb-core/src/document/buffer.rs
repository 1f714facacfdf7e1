use crate::{
    document::{Document, materialize},
    error::{Error, ErrorOrigin},
    value::Value,
};
use serde::{Serialize, Serializer, ser::SerializeMap};
use std::collections::HashMap;

///
/// Field
/// One named value of a document.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub name: String,
    pub value: Value,
}

impl Field {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

///
/// FieldBuffer
///
/// Materialized, mutable document owned by its creator.
///
/// Field names are unique: adding a name that already exists replaces its
/// value in place (last write wins) and keeps the original position. The
/// record encoder applies the same rule to any document it is given.
///
/// Lookups by name go through a name -> position index kept in step with
/// `fields`, so building an n-field document is linear in n.
///

#[derive(Clone, Debug, Default)]
pub struct FieldBuffer {
    fields: Vec<Field>,
    index: HashMap<String, usize>,
}

impl FieldBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a buffer by deep-copying any document.
    pub fn from_document(doc: &dyn Document) -> Result<Self, Error> {
        let mut buf = Self::new();
        buf.copy(doc)?;

        Ok(buf)
    }

    /// Append a field, or replace the value of an existing one.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let name = name.into();
        let value = value.into();

        match self.position(&name) {
            Some(i) => self.fields[i].value = value,
            None => self.push(name, value),
        }

        self
    }

    /// Builder form of [`add`](Self::add).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add(name, value);
        self
    }

    /// Replace-or-append, returning the previous value when there was one.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let name = name.into();
        let value = value.into();

        match self.position(&name) {
            Some(i) => Some(std::mem::replace(&mut self.fields[i].value, value)),
            None => {
                self.push(name, value);
                None
            }
        }
    }

    /// Replace the value of an existing field.
    pub fn replace(&mut self, name: &str, value: impl Into<Value>) -> Result<(), Error> {
        let i = self
            .position(name)
            .ok_or_else(|| Error::field_not_found(ErrorOrigin::Document, name))?;
        self.fields[i].value = value.into();

        Ok(())
    }

    /// Remove a field, returning its value.
    pub fn delete(&mut self, name: &str) -> Result<Value, Error> {
        let i = self
            .position(name)
            .ok_or_else(|| Error::field_not_found(ErrorOrigin::Document, name))?;

        let field = self.fields.remove(i);
        self.index.remove(&field.name);
        for (pos, later) in self.fields.iter().enumerate().skip(i) {
            if let Some(slot) = self.index.get_mut(&later.name) {
                *slot = pos;
            }
        }

        Ok(field.value)
    }

    /// Deep-copy every field of `doc` into this buffer.
    ///
    /// Lazy sources are driven to completion; nested arrays and documents
    /// are materialized as buffers. On error the buffer keeps the fields
    /// copied so far.
    pub fn copy(&mut self, doc: &dyn Document) -> Result<(), Error> {
        doc.iterate(&mut |name, value| {
            self.add(name, materialize(value, 0)?);
            Ok(())
        })
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.position(name).map(|i| &self.fields[i].value)
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.fields.iter()
    }

    /// Drop every field, keeping the allocation.
    pub fn reset(&mut self) {
        self.fields.clear();
        self.index.clear();
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    // Caller has checked that `name` is not present.
    fn push(&mut self, name: String, value: Value) {
        self.index.insert(name.clone(), self.fields.len());
        self.fields.push(Field { name, value });
    }
}

// Equality is over the ordered fields; the index is derived from them.
impl PartialEq for FieldBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl Document for FieldBuffer {
    fn get_by_field(&self, name: &str) -> Result<Value, Error> {
        self.get(name)
            .cloned()
            .ok_or_else(|| Error::field_not_found(ErrorOrigin::Document, name))
    }

    fn iterate(
        &self,
        visit: &mut dyn FnMut(&str, &Value) -> Result<(), Error>,
    ) -> Result<(), Error> {
        for field in &self.fields {
            visit(&field.name, &field.value)?;
        }

        Ok(())
    }

    fn as_fields(&self) -> Option<&[Field]> {
        Some(&self.fields)
    }
}

impl<'a> IntoIterator for &'a FieldBuffer {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

impl<K, V> FromIterator<(K, V)> for FieldBuffer
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut buf = Self::new();
        for (name, value) in iter {
            buf.add(name, value);
        }

        buf
    }
}

impl Serialize for FieldBuffer {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for field in &self.fields {
            map.serialize_entry(&field.name, &field.value)?;
        }
        map.end()
    }
}
