//! Documents built from Rust data and CSV rows.
//!
//! `from_map` drives a private serde serializer that produces [`Value`]s
//! directly. It follows `serde_json`'s data-model conventions: unit variants
//! become text, other enum variants a one-field document keyed by the
//! variant name. Map keys must serialize as strings.
use crate::{
    MAX_NESTING_DEPTH,
    document::{FieldBuffer, ValueBuffer},
    error::{Error, ErrorOrigin},
    value::Value,
};
use serde::{
    Serialize,
    ser::{self, Impossible},
};
use std::fmt::Display;

impl ser::Error for Error {
    fn custom<T: Display>(msg: T) -> Self {
        Self::invalid_input(ErrorOrigin::Producer, msg.to_string())
    }
}

/// Build a document from any serializable map or struct.
///
/// Fails with `InvalidInput` when the top level is not a map/struct, when a
/// map key is not a string, or when an unsigned integer exceeds `i64::MAX`.
pub fn from_map<T>(input: &T) -> Result<FieldBuffer, Error>
where
    T: Serialize + ?Sized,
{
    match input.serialize(ValueSerializer { depth: 0 })? {
        Value::Document(doc) => FieldBuffer::from_document(doc.as_ref()),
        other => Err(Error::invalid_input(
            ErrorOrigin::Producer,
            format!(
                "expected a map or struct at top level, got {}",
                other.value_type()
            ),
        )),
    }
}

/// Pair CSV headers with one row of columns, as text fields.
pub fn from_csv<H, C>(headers: &[H], columns: &[C]) -> Result<FieldBuffer, Error>
where
    H: AsRef<str>,
    C: AsRef<str>,
{
    if headers.len() != columns.len() {
        return Err(Error::invalid_input(
            ErrorOrigin::Producer,
            format!(
                "csv row has {} columns for {} headers",
                columns.len(),
                headers.len()
            ),
        ));
    }

    Ok(headers
        .iter()
        .zip(columns)
        .map(|(h, c)| (h.as_ref(), c.as_ref()))
        .collect())
}

///
/// ValueSerializer
///
/// `depth` is the nesting level a container created here would sit at.
///

#[derive(Clone, Copy)]
struct ValueSerializer {
    depth: usize,
}

impl ValueSerializer {
    // Child serializer depth for a new container, failing past the limit.
    fn enter(self) -> Result<usize, Error> {
        if self.depth > MAX_NESTING_DEPTH {
            return Err(Error::depth_exceeded(
                ErrorOrigin::Producer,
                MAX_NESTING_DEPTH,
            ));
        }

        Ok(self.depth + 1)
    }

    fn seq(self, len: Option<usize>) -> Result<SeqBuilder, Error> {
        Ok(SeqBuilder {
            depth: self.enter()?,
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn map(self) -> Result<MapBuilder, Error> {
        Ok(MapBuilder {
            depth: self.enter()?,
            buf: FieldBuffer::new(),
            key: None,
        })
    }
}

impl ser::Serializer for ValueSerializer {
    type Ok = Value;
    type Error = Error;

    type SerializeSeq = SeqBuilder;
    type SerializeTuple = SeqBuilder;
    type SerializeTupleStruct = SeqBuilder;
    type SerializeTupleVariant = VariantBuilder<SeqBuilder>;
    type SerializeMap = MapBuilder;
    type SerializeStruct = MapBuilder;
    type SerializeStructVariant = VariantBuilder<MapBuilder>;

    fn serialize_bool(self, v: bool) -> Result<Value, Error> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value, Error> {
        Ok(Value::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<Value, Error> {
        Ok(Value::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<Value, Error> {
        Ok(Value::from(v))
    }

    fn serialize_i64(self, v: i64) -> Result<Value, Error> {
        Ok(Value::Integer(v))
    }

    fn serialize_u8(self, v: u8) -> Result<Value, Error> {
        Ok(Value::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<Value, Error> {
        Ok(Value::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<Value, Error> {
        Ok(Value::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<Value, Error> {
        i64::try_from(v).map(Value::Integer).map_err(|_| {
            Error::invalid_input(
                ErrorOrigin::Producer,
                format!("integer {v} does not fit a signed 64-bit value"),
            )
        })
    }

    fn serialize_f32(self, v: f32) -> Result<Value, Error> {
        Ok(Value::Double(f64::from(v)))
    }

    fn serialize_f64(self, v: f64) -> Result<Value, Error> {
        Ok(Value::Double(v))
    }

    fn serialize_char(self, v: char) -> Result<Value, Error> {
        Ok(Value::Text(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Value, Error> {
        Ok(Value::from(v))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Value, Error> {
        Ok(Value::from(v))
    }

    fn serialize_none(self) -> Result<Value, Error> {
        Ok(Value::Null)
    }

    fn serialize_some<T>(self, value: &T) -> Result<Value, Error>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value, Error> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value, Error> {
        Ok(Value::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<Value, Error> {
        Ok(Value::from(variant))
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<Value, Error>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value, Error>
    where
        T: Serialize + ?Sized,
    {
        let inner = value.serialize(Self {
            depth: self.enter()?,
        })?;

        Ok(FieldBuffer::new().with(variant, inner).into())
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqBuilder, Error> {
        self.seq(len)
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqBuilder, Error> {
        self.seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<SeqBuilder, Error> {
        self.seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<VariantBuilder<SeqBuilder>, Error> {
        let inner = Self {
            depth: self.enter()?,
        };

        Ok(VariantBuilder {
            variant,
            inner: inner.seq(Some(len))?,
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<MapBuilder, Error> {
        self.map()
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<MapBuilder, Error> {
        self.map()
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<VariantBuilder<MapBuilder>, Error> {
        let inner = Self {
            depth: self.enter()?,
        };

        Ok(VariantBuilder {
            variant,
            inner: inner.map()?,
        })
    }
}

///
/// SeqBuilder
///

struct SeqBuilder {
    depth: usize,
    items: Vec<Value>,
}

impl SeqBuilder {
    fn push<T>(&mut self, value: &T) -> Result<(), Error>
    where
        T: Serialize + ?Sized,
    {
        let value = value.serialize(ValueSerializer { depth: self.depth })?;
        self.items.push(value);

        Ok(())
    }

    fn finish(self) -> Value {
        ValueBuffer::from(self.items).into()
    }
}

impl ser::SerializeSeq for SeqBuilder {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), Error>
    where
        T: Serialize + ?Sized,
    {
        self.push(value)
    }

    fn end(self) -> Result<Value, Error> {
        Ok(self.finish())
    }
}

impl ser::SerializeTuple for SeqBuilder {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), Error>
    where
        T: Serialize + ?Sized,
    {
        self.push(value)
    }

    fn end(self) -> Result<Value, Error> {
        Ok(self.finish())
    }
}

impl ser::SerializeTupleStruct for SeqBuilder {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<(), Error>
    where
        T: Serialize + ?Sized,
    {
        self.push(value)
    }

    fn end(self) -> Result<Value, Error> {
        Ok(self.finish())
    }
}

///
/// MapBuilder
///

struct MapBuilder {
    depth: usize,
    buf: FieldBuffer,
    key: Option<String>,
}

impl MapBuilder {
    fn insert<T>(&mut self, name: String, value: &T) -> Result<(), Error>
    where
        T: Serialize + ?Sized,
    {
        let value = value.serialize(ValueSerializer { depth: self.depth })?;
        self.buf.add(name, value);

        Ok(())
    }

    fn finish(self) -> Value {
        self.buf.into()
    }
}

impl ser::SerializeMap for MapBuilder {
    type Ok = Value;
    type Error = Error;

    fn serialize_key<T>(&mut self, key: &T) -> Result<(), Error>
    where
        T: Serialize + ?Sized,
    {
        self.key = Some(key.serialize(KeySerializer)?);

        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<(), Error>
    where
        T: Serialize + ?Sized,
    {
        let name = self.key.take().ok_or_else(|| {
            Error::invalid_input(ErrorOrigin::Producer, "map value without a key")
        })?;

        self.insert(name, value)
    }

    fn end(self) -> Result<Value, Error> {
        Ok(self.finish())
    }
}

impl ser::SerializeStruct for MapBuilder {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<(), Error>
    where
        T: Serialize + ?Sized,
    {
        self.insert(key.to_string(), value)
    }

    fn end(self) -> Result<Value, Error> {
        Ok(self.finish())
    }
}

///
/// VariantBuilder
/// Wraps an enum variant's payload as `{ variant: payload }`.
///

struct VariantBuilder<B> {
    variant: &'static str,
    inner: B,
}

impl<B> VariantBuilder<B> {
    fn wrap(variant: &'static str, payload: Value) -> Value {
        FieldBuffer::new().with(variant, payload).into()
    }
}

impl ser::SerializeTupleVariant for VariantBuilder<SeqBuilder> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<(), Error>
    where
        T: Serialize + ?Sized,
    {
        self.inner.push(value)
    }

    fn end(self) -> Result<Value, Error> {
        Ok(Self::wrap(self.variant, self.inner.finish()))
    }
}

impl ser::SerializeStructVariant for VariantBuilder<MapBuilder> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<(), Error>
    where
        T: Serialize + ?Sized,
    {
        self.inner.insert(key.to_string(), value)
    }

    fn end(self) -> Result<Value, Error> {
        Ok(Self::wrap(self.variant, self.inner.finish()))
    }
}

///
/// KeySerializer
/// Accepts only string-like map keys.
///

struct KeySerializer;

fn key_error(kind: &str) -> Error {
    Error::invalid_input(
        ErrorOrigin::Producer,
        format!("map keys must be strings, got {kind}"),
    )
}

macro_rules! reject_keys {
    ( $( $method:ident ( $( $arg:ty ),* ) => $kind:literal ),* $(,)? ) => {
        $(
            fn $method(self $(, _: $arg )*) -> Result<String, Error> {
                Err(key_error($kind))
            }
        )*
    };
}

impl ser::Serializer for KeySerializer {
    type Ok = String;
    type Error = Error;

    type SerializeSeq = Impossible<String, Error>;
    type SerializeTuple = Impossible<String, Error>;
    type SerializeTupleStruct = Impossible<String, Error>;
    type SerializeTupleVariant = Impossible<String, Error>;
    type SerializeMap = Impossible<String, Error>;
    type SerializeStruct = Impossible<String, Error>;
    type SerializeStructVariant = Impossible<String, Error>;

    reject_keys! {
        serialize_bool(bool) => "bool",
        serialize_i8(i8) => "integer",
        serialize_i16(i16) => "integer",
        serialize_i32(i32) => "integer",
        serialize_i64(i64) => "integer",
        serialize_u8(u8) => "integer",
        serialize_u16(u16) => "integer",
        serialize_u32(u32) => "integer",
        serialize_u64(u64) => "integer",
        serialize_f32(f32) => "float",
        serialize_f64(f64) => "float",
        serialize_bytes(&[u8]) => "bytes",
        serialize_none() => "none",
        serialize_unit() => "unit",
        serialize_unit_struct(&'static str) => "unit struct",
    }

    fn serialize_char(self, v: char) -> Result<String, Error> {
        Ok(v.to_string())
    }

    fn serialize_str(self, v: &str) -> Result<String, Error> {
        Ok(v.to_string())
    }

    fn serialize_some<T>(self, _value: &T) -> Result<String, Error>
    where
        T: Serialize + ?Sized,
    {
        Err(key_error("option"))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<String, Error> {
        Ok(variant.to_string())
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<String, Error>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<String, Error>
    where
        T: Serialize + ?Sized,
    {
        Err(key_error("enum variant"))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, Error> {
        Err(key_error("sequence"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, Error> {
        Err(key_error("tuple"))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, Error> {
        Err(key_error("tuple struct"))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, Error> {
        Err(key_error("enum variant"))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, Error> {
        Err(key_error("map"))
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, Error> {
        Err(key_error("struct"))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, Error> {
        Err(key_error("enum variant"))
    }
}
