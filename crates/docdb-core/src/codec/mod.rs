//! Binary record format.
//!
//! A record is a Header (field count, then per field: name, type tag, payload
//! size and body offset) followed by a Body of concatenated payloads. All
//! integers are big-endian. Decoding parses the header eagerly and leaves
//! payloads alone until a field is asked for.
//!
//! Format logic lives in `header` / `payload`; size and depth policy is
//! supplied by the caller through [`CodecLimits`].

mod encoded;
mod header;
mod payload;

#[cfg(test)]
mod tests;

use crate::{
    MAX_NESTING_DEPTH, MAX_RECORD_BYTES,
    document::Document,
    error::{Error, ErrorOrigin},
    obs::sink::{self, MetricsEvent},
    value::{Value, ValueType},
};
use thiserror::Error as ThisError;

// re-exports
pub use encoded::{EncodedArray, EncodedDocument};
pub use header::{FieldHeader, Format, Header};

///
/// CodecLimits
///
/// Caller policy for encode/decode. Depth counts container levels below the
/// top-level record, so a record of scalars has depth 0.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CodecLimits {
    pub max_depth: usize,
    pub max_record_bytes: usize,
}

impl CodecLimits {
    pub const DEFAULT: Self = Self {
        max_depth: MAX_NESTING_DEPTH,
        max_record_bytes: MAX_RECORD_BYTES,
    };

    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub const fn with_max_record_bytes(mut self, max_record_bytes: usize) -> Self {
        self.max_record_bytes = max_record_bytes;
        self
    }
}

impl Default for CodecLimits {
    fn default() -> Self {
        Self::DEFAULT
    }
}

///
/// FormatError
///
/// Structured reasons a byte string is not a valid record. Every variant
/// surfaces as `MalformedEncoding`.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum FormatError {
    #[error("truncated: need {needed} bytes at offset {at}, {available} available")]
    Truncated {
        at: usize,
        needed: usize,
        available: usize,
    },

    #[error("unknown type tag {tag}")]
    UnknownTag { tag: u8 },

    #[error("field name is not valid UTF-8")]
    InvalidName,

    #[error("duplicate field name '{name}'")]
    DuplicateName { name: String },

    #[error("payload {index} starts at offset {offset}, expected {expected}")]
    NonContiguous {
        index: usize,
        offset: u32,
        expected: u64,
    },

    #[error("body is {actual} bytes but the header declares {declared}")]
    BodySize { declared: u64, actual: usize },

    #[error("{ty} payload must be {expected} bytes, got {actual}")]
    FixedWidth {
        ty: ValueType,
        expected: usize,
        actual: usize,
    },

    #[error("bool payload must be 0 or 1, got {byte}")]
    InvalidBool { byte: u8 },

    #[error("text payload is not valid UTF-8")]
    InvalidText,

    #[error("record exceeds max size: {len} bytes (limit {max_bytes})")]
    TooLarge { len: usize, max_bytes: usize },

    #[error("nesting depth exceeds limit of {max_depth}")]
    TooDeep { max_depth: usize },
}

impl From<FormatError> for Error {
    fn from(err: FormatError) -> Self {
        Self::malformed(err.to_string())
    }
}

// Count and log a rejected record before handing the error to the caller.
pub(crate) fn reject(err: FormatError) -> Error {
    tracing::debug!(error = %err, "rejected malformed record");
    sink::record(MetricsEvent::MalformedRejected);

    Error::from(err)
}

///
/// ENCODE
///

/// Encode any document into the record format using the default limits.
pub fn encode(doc: &dyn Document) -> Result<Vec<u8>, Error> {
    encode_with(doc, CodecLimits::DEFAULT)
}

/// Encode any document under caller-supplied limits.
///
/// Fields are written in iteration order. A name seen twice keeps its first
/// position and its last value.
pub fn encode_with(doc: &dyn Document, limits: CodecLimits) -> Result<Vec<u8>, Error> {
    let (bytes, fields) = payload::encode_document(doc, 0, limits)?;
    if bytes.len() > limits.max_record_bytes {
        return Err(payload::oversized(bytes.len(), limits.max_record_bytes));
    }

    tracing::trace!(fields, bytes = bytes.len(), "encoded record");
    sink::record(MetricsEvent::RecordEncoded {
        fields: fields as u64,
        bytes: bytes.len() as u64,
    });

    Ok(bytes)
}

///
/// DECODE
///

/// Parse and validate a record header without decoding any payload.
pub fn decode(bytes: &[u8]) -> Result<Format<'_>, Error> {
    decode_with(bytes, CodecLimits::DEFAULT)
}

pub fn decode_with(bytes: &[u8], limits: CodecLimits) -> Result<Format<'_>, Error> {
    parse_format(bytes, limits)
}

/// Decode a single field, touching only the header and that field's payload.
pub fn decode_field(bytes: &[u8], name: &str) -> Result<Value, Error> {
    decode_field_with(bytes, name, CodecLimits::DEFAULT)
}

pub fn decode_field_with(bytes: &[u8], name: &str, limits: CodecLimits) -> Result<Value, Error> {
    decode_field_at(bytes, name, 0, limits)
}

// Shared header parse for every decode path, nested records included.
pub(crate) fn parse_format(bytes: &[u8], limits: CodecLimits) -> Result<Format<'_>, Error> {
    if bytes.len() > limits.max_record_bytes {
        return Err(reject(FormatError::TooLarge {
            len: bytes.len(),
            max_bytes: limits.max_record_bytes,
        }));
    }

    let format = Format::parse(bytes).map_err(reject)?;

    tracing::trace!(fields = format.header().fields_count(), "decoded record header");
    sink::record(MetricsEvent::HeaderDecoded {
        fields: u64::from(format.header().fields_count()),
    });

    Ok(format)
}

pub(crate) fn decode_field_at(
    bytes: &[u8],
    name: &str,
    depth: usize,
    limits: CodecLimits,
) -> Result<Value, Error> {
    let format = parse_format(bytes, limits)?;
    let Some(field) = format.header().find(name) else {
        sink::record(MetricsEvent::FieldLookup { hit: false });
        return Err(Error::field_not_found(ErrorOrigin::Codec, name));
    };

    sink::record(MetricsEvent::FieldLookup { hit: true });
    let payload = format.payload_of(field).map_err(reject)?;
    payload::decode_payload(field.ty(), payload, depth, limits)
}
