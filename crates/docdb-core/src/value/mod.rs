mod compare;
mod rank;
mod ser;
mod tag;


use crate::{
    document::{Array, Document, FieldBuffer, ValueBuffer, fields, values},
    error::Error,
};
use std::{cmp::Ordering, sync::Arc};

// re-exports
pub use compare::canonical_cmp;
pub use rank::canonical_rank;
pub use tag::ValueType;

///
/// Value
///
/// Closed tagged union over every kind the layer stores or compares.
///
/// Array and Document payloads are shared trait objects, so a value can carry
/// a materialized buffer or a lazy view over encoded bytes interchangeably.
///
/// `PartialEq` is structural: kinds must match (`Integer(1) != Double(1.0)`).
/// Use [`Value::canonical_cmp`] / [`Value::canonical_eq`] for query semantics.
///

#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    Text(String),
    Blob(Vec<u8>),
    Array(Arc<dyn Array>),
    Document(Arc<dyn Document>),
}

impl Value {
    ///
    /// CONSTRUCTION
    ///

    /// Wrap any array implementation.
    pub fn array(array: impl Array + 'static) -> Self {
        Self::Array(Arc::new(array))
    }

    /// Wrap any document implementation.
    pub fn document(document: impl Document + 'static) -> Self {
        Self::Document(Arc::new(document))
    }

    /// Build an array value from owned items.
    pub fn from_list<T>(items: Vec<T>) -> Self
    where
        T: Into<Self>,
    {
        Self::array(items.into_iter().map(Into::into).collect::<ValueBuffer>())
    }

    ///
    /// TYPES
    ///

    /// Kind tag of this value.
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        tag::value_type(self)
    }

    /// Stable canonical rank used by all cross-kind ordering surfaces.
    #[must_use]
    pub const fn canonical_rank(&self) -> u8 {
        rank::canonical_rank(self.value_type())
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn is_number(&self) -> bool {
        matches!(self, Self::Integer(_) | Self::Double(_))
    }

    ///
    /// ACCESSORS
    ///

    pub fn as_bool(&self) -> Result<bool, Error> {
        match self {
            Self::Bool(v) => Ok(*v),
            other => Err(other.mismatch(ValueType::Bool)),
        }
    }

    pub fn as_integer(&self) -> Result<i64, Error> {
        match self {
            Self::Integer(v) => Ok(*v),
            other => Err(other.mismatch(ValueType::Integer)),
        }
    }

    pub fn as_double(&self) -> Result<f64, Error> {
        match self {
            Self::Double(v) => Ok(*v),
            other => Err(other.mismatch(ValueType::Double)),
        }
    }

    pub fn as_text(&self) -> Result<&str, Error> {
        match self {
            Self::Text(v) => Ok(v.as_str()),
            other => Err(other.mismatch(ValueType::Text)),
        }
    }

    pub fn as_blob(&self) -> Result<&[u8], Error> {
        match self {
            Self::Blob(v) => Ok(v.as_slice()),
            other => Err(other.mismatch(ValueType::Blob)),
        }
    }

    pub fn as_array(&self) -> Result<&dyn Array, Error> {
        match self {
            Self::Array(v) => Ok(v.as_ref()),
            other => Err(other.mismatch(ValueType::Array)),
        }
    }

    pub fn as_document(&self) -> Result<&dyn Document, Error> {
        match self {
            Self::Document(v) => Ok(v.as_ref()),
            other => Err(other.mismatch(ValueType::Document)),
        }
    }

    fn mismatch(&self, expected: ValueType) -> Error {
        Error::type_mismatch(expected, self.value_type())
    }

    /// Byte content for the byte-string bucket (Text and Blob).
    #[must_use]
    pub(crate) fn byte_content(&self) -> Option<&[u8]> {
        match self {
            Self::Text(v) => Some(v.as_bytes()),
            Self::Blob(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    ///
    /// COMPARISON
    ///

    /// Total canonical comparator; see [`canonical_cmp`].
    pub fn canonical_cmp(left: &Self, right: &Self) -> Result<Ordering, Error> {
        compare::canonical_cmp(left, right)
    }

    /// Comparator equality: `Integer(1)` equals `Double(1.0)` and
    /// `Text("a")` equals `Blob(b"a")`.
    pub fn canonical_eq(left: &Self, right: &Self) -> Result<bool, Error> {
        Ok(compare::canonical_cmp(left, right)? == Ordering::Equal)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a.to_bits() == b.to_bits(),
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Blob(a), Self::Blob(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => {
                Arc::ptr_eq(a, b)
                    || matches!(
                        (values(a.as_ref()), values(b.as_ref())),
                        (Ok(a), Ok(b)) if a == b
                    )
            }
            (Self::Document(a), Self::Document(b)) => {
                Arc::ptr_eq(a, b)
                    || matches!(
                        (fields(a.as_ref()), fields(b.as_ref())),
                        (Ok(a), Ok(b)) if a == b
                    )
            }
            _ => false,
        }
    }
}

#[macro_export]
macro_rules! impl_value_from_for {
    ( $( $type:ty => $variant:ident ),* $(,)? ) => {
        $(
            impl From<$type> for Value {
                fn from(v: $type) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    };
}

impl_value_from_for! {
    bool    => Bool,
    i8      => Integer,
    i16     => Integer,
    i32     => Integer,
    i64     => Integer,
    u8      => Integer,
    u16     => Integer,
    u32     => Integer,
    f32     => Double,
    f64     => Double,
    &str    => Text,
    String  => Text,
    Vec<u8> => Blob,
    &[u8]   => Blob,
}

impl From<ValueBuffer> for Value {
    fn from(buf: ValueBuffer) -> Self {
        Self::array(buf)
    }
}

impl From<FieldBuffer> for Value {
    fn from(buf: FieldBuffer) -> Self {
        Self::document(buf)
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Self::Null
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}
