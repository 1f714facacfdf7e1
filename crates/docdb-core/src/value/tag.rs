use crate::value::Value;
use derive_more::Display;

///
/// ValueType
///
/// Stable value-kind tag written into record headers and array descriptors.
///
/// IMPORTANT:
/// Tag values are part of the persisted record format and must remain fixed.
///

#[repr(u8)]
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum ValueType {
    #[display("null")]
    Null = 1,
    #[display("bool")]
    Bool = 2,
    #[display("integer")]
    Integer = 3,
    #[display("double")]
    Double = 4,
    #[display("text")]
    Text = 5,
    #[display("blob")]
    Blob = 6,
    #[display("array")]
    Array = 7,
    #[display("document")]
    Document = 8,
}

impl ValueType {
    /// Stable wire byte tag for this kind.
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Resolve a wire byte tag, `None` for unknown tags.
    #[must_use]
    pub const fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::Null),
            2 => Some(Self::Bool),
            3 => Some(Self::Integer),
            4 => Some(Self::Double),
            5 => Some(Self::Text),
            6 => Some(Self::Blob),
            7 => Some(Self::Array),
            8 => Some(Self::Document),
            _ => None,
        }
    }

    /// Payload width for fixed-size kinds; `None` for variable-size kinds.
    #[must_use]
    pub const fn fixed_size(self) -> Option<usize> {
        match self {
            Self::Null => Some(0),
            Self::Bool => Some(1),
            Self::Integer | Self::Double => Some(8),
            Self::Text | Self::Blob | Self::Array | Self::Document => None,
        }
    }

    #[must_use]
    pub const fn is_number(self) -> bool {
        matches!(self, Self::Integer | Self::Double)
    }
}

/// Kind tag of a value.
#[must_use]
pub(super) const fn value_type(value: &Value) -> ValueType {
    match value {
        Value::Null => ValueType::Null,
        Value::Bool(_) => ValueType::Bool,
        Value::Integer(_) => ValueType::Integer,
        Value::Double(_) => ValueType::Double,
        Value::Text(_) => ValueType::Text,
        Value::Blob(_) => ValueType::Blob,
        Value::Array(_) => ValueType::Array,
        Value::Document(_) => ValueType::Document,
    }
}
