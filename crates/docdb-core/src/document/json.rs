//! Deferred JSON document producer.
//!
//! Text is parsed with `serde_json` through a seed that builds buffers
//! directly, keeping source key order and the integer/double split.
use crate::{
    MAX_NESTING_DEPTH,
    document::{Document, Field, FieldBuffer, ValueBuffer},
    error::{Error, ErrorOrigin},
    obs::sink::{self, MetricsEvent},
    value::Value,
};
use serde::de::{self, DeserializeSeed, Deserializer, MapAccess, SeqAccess, Visitor};
use std::{fmt, sync::OnceLock};
use thiserror::Error as ThisError;

///
/// ParseError
///

#[derive(Debug, ThisError)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    Syntax(#[from] serde_json::Error),
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Self::invalid_input(ErrorOrigin::Producer, err.to_string())
    }
}

///
/// JsonDocument
///
/// Document over JSON text, parsed on first access.
///
/// Construction never fails. The first `get_by_field` / `iterate` runs the
/// parser once and caches the outcome, so an invalid source reports the same
/// `InvalidInput` error on every access.
///

#[derive(Debug)]
pub struct JsonDocument {
    source: String,
    parsed: OnceLock<Result<FieldBuffer, Error>>,
}

impl JsonDocument {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            parsed: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether the parser has already run.
    #[must_use]
    pub fn is_parsed(&self) -> bool {
        self.parsed.get().is_some()
    }

    fn buffer(&self) -> Result<&FieldBuffer, Error> {
        self.parsed
            .get_or_init(|| parse_document(&self.source))
            .as_ref()
            .map_err(Clone::clone)
    }
}

impl Document for JsonDocument {
    fn get_by_field(&self, name: &str) -> Result<Value, Error> {
        self.buffer()?.get_by_field(name)
    }

    fn iterate(
        &self,
        visit: &mut dyn FnMut(&str, &Value) -> Result<(), Error>,
    ) -> Result<(), Error> {
        self.buffer()?.iterate(visit)
    }

    fn as_fields(&self) -> Option<&[Field]> {
        self.buffer().ok().and_then(|buf| buf.as_fields())
    }
}

/// Wrap JSON object text as a lazily parsed document.
pub fn from_json(text: impl Into<String>) -> JsonDocument {
    JsonDocument::new(text)
}

pub(crate) fn parse_document(text: &str) -> Result<FieldBuffer, Error> {
    observe(parse_with(text, DocumentSeed { depth: 0 }))
}

pub(crate) fn parse_array(text: &str) -> Result<ValueBuffer, Error> {
    observe(parse_with(text, ArraySeed { depth: 0 }))
}

fn parse_with<'de, S>(text: &'de str, seed: S) -> Result<S::Value, ParseError>
where
    S: DeserializeSeed<'de>,
{
    let mut de = serde_json::Deserializer::from_str(text);
    let out = seed.deserialize(&mut de)?;
    de.end()?;

    Ok(out)
}

fn observe<T>(result: Result<T, ParseError>) -> Result<T, Error> {
    sink::record(MetricsEvent::JsonParse {
        ok: result.is_ok(),
    });

    result.map_err(|err| {
        tracing::debug!(error = %err, "rejected JSON input");
        Error::from(err)
    })
}

fn step<E: de::Error>(depth: usize) -> Result<usize, E> {
    let next = depth + 1;
    if next > MAX_NESTING_DEPTH {
        return Err(E::custom(format!(
            "nesting depth exceeds limit of {MAX_NESTING_DEPTH}"
        )));
    }

    Ok(next)
}

///
/// DocumentSeed
///

struct DocumentSeed {
    depth: usize,
}

impl<'de> DeserializeSeed<'de> for DocumentSeed {
    type Value = FieldBuffer;

    fn deserialize<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for DocumentSeed {
    type Value = FieldBuffer;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut buf = FieldBuffer::new();
        while let Some(name) = map.next_key::<String>()? {
            let value = map.next_value_seed(ValueSeed { depth: self.depth })?;
            buf.add(name, value);
        }

        Ok(buf)
    }
}

///
/// ArraySeed
///

struct ArraySeed {
    depth: usize,
}

impl<'de> DeserializeSeed<'de> for ArraySeed {
    type Value = ValueBuffer;

    fn deserialize<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for ArraySeed {
    type Value = ValueBuffer;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON array")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut buf = ValueBuffer::new();
        while let Some(value) = seq.next_element_seed(ValueSeed { depth: self.depth })? {
            buf.append(value);
        }

        Ok(buf)
    }
}

///
/// ValueSeed
///
/// Any JSON value. Integers that fit `i64` stay integers; everything else
/// numeric becomes a double.
///

struct ValueSeed {
    depth: usize,
}

impl<'de> DeserializeSeed<'de> for ValueSeed {
    type Value = Value;

    fn deserialize<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for ValueSeed {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Integer(v))
    }

    #[expect(clippy::cast_precision_loss)]
    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(i64::try_from(v).map_or(Value::Double(v as f64), Value::Integer))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Double(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::Text(v))
    }

    fn visit_seq<A>(self, seq: A) -> Result<Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        ArraySeed {
            depth: step(self.depth)?,
        }
        .visit_seq(seq)
        .map(Value::from)
    }

    fn visit_map<A>(self, map: A) -> Result<Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        DocumentSeed {
            depth: step(self.depth)?,
        }
        .visit_map(map)
        .map(Value::from)
    }
}
