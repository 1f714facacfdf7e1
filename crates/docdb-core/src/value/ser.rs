use crate::{
    document::{Document, borrow_fields, borrow_values, next_depth},
    error::ErrorOrigin,
    value::Value,
};
use serde::{
    Serialize, Serializer,
    ser::{Error as _, SerializeMap, SerializeSeq},
};

///
/// Serialize
///
/// Renders a value in its natural data-model shape: arrays as sequences,
/// documents as maps in field order, blobs as bytes. Lazy payloads that fail
/// to decode surface as serializer errors, as does nesting deeper than
/// [`MAX_NESTING_DEPTH`](crate::MAX_NESTING_DEPTH). A top-level document's
/// fields sit at depth 0, as in an encoded record.
///

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Document(doc) => serialize_fields(serializer, doc.as_ref(), 0),
            value => Guarded { value, depth: 0 }.serialize(serializer),
        }
    }
}

// A value together with the number of containers above it.
struct Guarded<'a> {
    value: &'a Value,
    depth: usize,
}

impl Serialize for Guarded<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.value {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Integer(v) => serializer.serialize_i64(*v),
            Value::Double(v) => serializer.serialize_f64(*v),
            Value::Text(v) => serializer.serialize_str(v),
            Value::Blob(v) => serializer.serialize_bytes(v),
            Value::Array(array) => {
                let depth = next_depth(self.depth, ErrorOrigin::Value).map_err(S::Error::custom)?;
                let items = borrow_values(array.as_ref()).map_err(S::Error::custom)?;
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for value in items.iter() {
                    seq.serialize_element(&Guarded { value, depth })?;
                }
                seq.end()
            }
            Value::Document(doc) => {
                let depth = next_depth(self.depth, ErrorOrigin::Value).map_err(S::Error::custom)?;
                serialize_fields(serializer, doc.as_ref(), depth)
            }
        }
    }
}

// `depth` is the depth of the fields themselves.
fn serialize_fields<S>(serializer: S, doc: &dyn Document, depth: usize) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let fields = borrow_fields(doc).map_err(S::Error::custom)?;
    let mut map = serializer.serialize_map(Some(fields.len()))?;
    for field in fields.iter() {
        map.serialize_entry(
            &field.name,
            &Guarded {
                value: &field.value,
                depth,
            },
        )?;
    }
    map.end()
}
