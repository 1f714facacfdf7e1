//! Per-kind payload encoding and decoding.
//!
//! Scalars are fixed width (Null 0, Bool 1, Integer 8, Double 8). Text and
//! Blob payloads are the raw bytes. A nested document payload is a complete
//! record; a nested array payload is
//! `count: u32, count × (type: u8, size: u32, offset: u32), body`.
use crate::{
    codec::{
        CodecLimits, EncodedArray, EncodedDocument, FormatError,
        header::check_fixed_width, reject,
    },
    document::{Array, Document},
    error::{Error, ErrorOrigin},
    obs::sink::{self, MetricsEvent},
    value::{Value, ValueType},
};
use std::collections::HashMap;

// type (u8) + size (u32) + offset (u32)
pub(super) const ELEMENT_DESCRIPTOR_BYTES: usize = 9;

///
/// ENCODE
///

// One field or element ready to be written.
struct Entry {
    ty: ValueType,
    payload: Vec<u8>,
}

/// Encode a document as a record, returning the bytes and the field count.
pub(super) fn encode_document(
    doc: &dyn Document,
    depth: usize,
    limits: CodecLimits,
) -> Result<(Vec<u8>, usize), Error> {
    let mut names: Vec<String> = Vec::new();
    let mut entries: Vec<Entry> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    doc.iterate(&mut |name, value| {
        let entry = encode_entry(value, depth, limits)?;
        match positions.get(name) {
            Some(&i) => entries[i] = entry,
            None => {
                positions.insert(name.to_string(), entries.len());
                names.push(name.to_string());
                entries.push(entry);
            }
        }

        Ok(())
    })?;

    let count = u32_len(names.len(), "field count")?;
    // count, then per field: name length, name, tag, size, offset
    let header_len: usize = 4 + names.iter().map(|n| n.len() + 11).sum::<usize>();
    let body_len: usize = entries.iter().map(|e| e.payload.len()).sum();

    let mut out = Vec::with_capacity(header_len + body_len);
    out.extend_from_slice(&count.to_be_bytes());

    let mut offset = 0usize;
    for (name, entry) in names.iter().zip(&entries) {
        let name_len = u16::try_from(name.len()).map_err(|_| {
            invalid(format!(
                "field name is {} bytes (limit {})",
                name.len(),
                u16::MAX
            ))
        })?;
        let size = u32_len(entry.payload.len(), "payload size")?;
        let at = u32_len(offset, "body offset")?;

        out.extend_from_slice(&name_len.to_be_bytes());
        out.extend_from_slice(name.as_bytes());
        out.push(entry.ty.to_u8());
        out.extend_from_slice(&size.to_be_bytes());
        out.extend_from_slice(&at.to_be_bytes());

        offset += entry.payload.len();
    }
    for entry in &entries {
        out.extend_from_slice(&entry.payload);
    }

    Ok((out, names.len()))
}

fn encode_array(array: &dyn Array, depth: usize, limits: CodecLimits) -> Result<Vec<u8>, Error> {
    let mut entries = Vec::new();
    array.iterate(&mut |_, value| {
        entries.push(encode_entry(value, depth, limits)?);
        Ok(())
    })?;

    let count = u32_len(entries.len(), "element count")?;
    let body_len: usize = entries.iter().map(|e| e.payload.len()).sum();

    let mut out = Vec::with_capacity(4 + entries.len() * ELEMENT_DESCRIPTOR_BYTES + body_len);
    out.extend_from_slice(&count.to_be_bytes());

    let mut offset = 0usize;
    for entry in &entries {
        out.push(entry.ty.to_u8());
        out.extend_from_slice(&u32_len(entry.payload.len(), "payload size")?.to_be_bytes());
        out.extend_from_slice(&u32_len(offset, "body offset")?.to_be_bytes());
        offset += entry.payload.len();
    }
    for entry in &entries {
        out.extend_from_slice(&entry.payload);
    }

    Ok(out)
}

// `depth` is the level of the container holding `value`.
fn encode_entry(value: &Value, depth: usize, limits: CodecLimits) -> Result<Entry, Error> {
    let payload = match value {
        Value::Null => Vec::new(),
        Value::Bool(v) => vec![u8::from(*v)],
        Value::Integer(v) => v.to_be_bytes().to_vec(),
        Value::Double(v) => v.to_bits().to_be_bytes().to_vec(),
        Value::Text(v) => v.as_bytes().to_vec(),
        Value::Blob(v) => v.clone(),
        Value::Array(array) => encode_array(array.as_ref(), enter(depth, limits)?, limits)?,
        Value::Document(doc) => encode_document(doc.as_ref(), enter(depth, limits)?, limits)?.0,
    };

    Ok(Entry {
        ty: value.value_type(),
        payload,
    })
}

fn enter(depth: usize, limits: CodecLimits) -> Result<usize, Error> {
    let next = depth + 1;
    if next > limits.max_depth {
        return Err(invalid(format!(
            "nesting depth exceeds limit of {}",
            limits.max_depth
        )));
    }

    Ok(next)
}

fn u32_len(len: usize, what: &str) -> Result<u32, Error> {
    u32::try_from(len).map_err(|_| invalid(format!("{what} {len} does not fit in 32 bits")))
}

fn invalid(message: String) -> Error {
    Error::invalid_input(ErrorOrigin::Codec, message)
}

pub(super) fn oversized(len: usize, max_bytes: usize) -> Error {
    invalid(format!(
        "record exceeds max size: {len} bytes (limit {max_bytes})"
    ))
}

///
/// DECODE
///

/// Decode one payload held by a container at level `depth`.
///
/// Nested documents and arrays become lazy views over a private copy of
/// their payload bytes; their headers are validated here.
pub(super) fn decode_payload(
    ty: ValueType,
    bytes: &[u8],
    depth: usize,
    limits: CodecLimits,
) -> Result<Value, Error> {
    let value = decode_inner(ty, bytes, depth, limits)?;
    sink::record(MetricsEvent::PayloadDecoded);

    Ok(value)
}

fn decode_inner(
    ty: ValueType,
    bytes: &[u8],
    depth: usize,
    limits: CodecLimits,
) -> Result<Value, Error> {
    check_fixed_width(ty, bytes.len()).map_err(reject)?;

    let value = match ty {
        ValueType::Null => Value::Null,
        ValueType::Bool => match bytes[0] {
            0 => Value::Bool(false),
            1 => Value::Bool(true),
            byte => return Err(reject(FormatError::InvalidBool { byte })),
        },
        ValueType::Integer => Value::Integer(i64::from_be_bytes(fixed8(bytes))),
        ValueType::Double => Value::Double(f64::from_bits(u64::from_be_bytes(fixed8(bytes)))),
        ValueType::Text => Value::Text(
            std::str::from_utf8(bytes)
                .map_err(|_| reject(FormatError::InvalidText))?
                .to_string(),
        ),
        ValueType::Blob => Value::Blob(bytes.to_vec()),
        ValueType::Array => {
            let depth = nested(depth, limits)?;
            Value::array(EncodedArray::parse(bytes.to_vec(), depth, limits)?)
        }
        ValueType::Document => {
            let depth = nested(depth, limits)?;
            Value::document(EncodedDocument::nested(bytes.to_vec(), depth, limits)?)
        }
    };

    Ok(value)
}

fn nested(depth: usize, limits: CodecLimits) -> Result<usize, Error> {
    let next = depth + 1;
    if next > limits.max_depth {
        return Err(reject(FormatError::TooDeep {
            max_depth: limits.max_depth,
        }));
    }

    Ok(next)
}

// Width already checked against the tag.
fn fixed8(bytes: &[u8]) -> [u8; 8] {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    buf
}
