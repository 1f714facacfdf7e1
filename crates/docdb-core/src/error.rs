use crate::value::ValueType;
use std::fmt;
use thiserror::Error as ThisError;

///
/// Error
///
/// Structured error with a stable, machine-checkable classification.
/// Every fallible operation of the value layer returns this type; module-local
/// detail enums convert into it.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
        }
    }

    /// Construct a missed field lookup.
    pub fn field_not_found(origin: ErrorOrigin, name: &str) -> Self {
        Self::new(
            ErrorKind::FieldNotFound,
            origin,
            format!("field not found: '{name}'"),
        )
    }

    /// Construct a missed array index lookup.
    pub fn value_not_found(origin: ErrorOrigin, index: usize) -> Self {
        Self::new(
            ErrorKind::ValueNotFound,
            origin,
            format!("value not found at index {index}"),
        )
    }

    /// Construct a wrong-kind accessor failure.
    pub fn type_mismatch(expected: ValueType, actual: ValueType) -> Self {
        Self::new(
            ErrorKind::TypeMismatch,
            ErrorOrigin::Value,
            format!("type mismatch: expected {expected}, got {actual}"),
        )
    }

    /// Construct a malformed producer/caller input error.
    pub fn invalid_input(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, origin, message)
    }

    /// Construct a codec-origin corrupt/truncated bytes error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedEncoding, ErrorOrigin::Codec, message)
    }

    /// Construct a nesting-depth violation.
    ///
    /// Decoding reports it as malformed bytes; every other origin reports
    /// it as invalid input.
    pub(crate) fn depth_exceeded(origin: ErrorOrigin, max_depth: usize) -> Self {
        let kind = match origin {
            ErrorOrigin::Codec => ErrorKind::MalformedEncoding,
            _ => ErrorKind::InvalidInput,
        };

        Self::new(
            kind,
            origin,
            format!("nesting depth exceeds limit of {max_depth}"),
        )
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::FieldNotFound | ErrorKind::ValueNotFound
        )
    }

    #[must_use]
    pub fn display_with_kind(&self) -> String {
        format!("{}:{}: {}", self.origin, self.kind, self.message)
    }
}

///
/// ErrorKind
/// Stable error taxonomy callers match on.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorKind {
    FieldNotFound,
    ValueNotFound,
    TypeMismatch,
    InvalidInput,
    MalformedEncoding,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::FieldNotFound => "field_not_found",
            Self::ValueNotFound => "value_not_found",
            Self::TypeMismatch => "type_mismatch",
            Self::InvalidInput => "invalid_input",
            Self::MalformedEncoding => "malformed_encoding",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Which part of the layer raised the error.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorOrigin {
    Value,
    Document,
    Codec,
    Producer,
    Key,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Value => "value",
            Self::Document => "document",
            Self::Codec => "codec",
            Self::Producer => "producer",
            Self::Key => "key",
        };
        write!(f, "{label}")
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_violation_is_malformed_only_for_codec_origin() {
        let codec = Error::depth_exceeded(ErrorOrigin::Codec, 4);
        let value = Error::depth_exceeded(ErrorOrigin::Value, 4);

        assert_eq!(codec.kind(), ErrorKind::MalformedEncoding);
        assert_eq!(value.kind(), ErrorKind::InvalidInput);
        assert!(codec.message.contains("limit of 4"));
    }

    #[test]
    fn display_with_kind_prefixes_origin_and_kind() {
        let err = Error::field_not_found(ErrorOrigin::Document, "age");

        assert!(err.is_not_found());
        assert_eq!(
            err.display_with_kind(),
            "document:field_not_found: field not found: 'age'"
        );
    }

    #[test]
    fn type_mismatch_names_both_kinds() {
        let err = Error::type_mismatch(ValueType::Text, ValueType::Integer);

        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert_eq!(err.to_string(), "type mismatch: expected text, got integer");
    }
}
