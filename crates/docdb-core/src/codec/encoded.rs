use crate::{
    codec::{
        CodecLimits, Format, FormatError, decode_field_at,
        header::{Reader, check_body_size, check_fixed_width},
        parse_format,
        payload::{ELEMENT_DESCRIPTOR_BYTES, decode_payload},
        reject,
    },
    document::{Array, Document},
    error::{Error, ErrorOrigin},
    value::{Value, ValueType},
};
use std::{borrow::Cow, fmt};

///
/// EncodedDocument
///
/// Lazy document over record bytes.
///
/// `get_by_field` decodes the header plus one payload; `iterate` walks the
/// header once and decodes each payload only when it is visited. A
/// top-level view borrows its bytes and never copies them; views produced
/// for nested documents own a copy of just their own payload.
///

#[derive(Clone)]
pub struct EncodedDocument<'a> {
    bytes: Cow<'a, [u8]>,
    depth: usize,
    limits: CodecLimits,
}

impl<'a> EncodedDocument<'a> {
    /// Wrap record bytes without validating them; errors surface on access.
    #[must_use]
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self::with_limits(bytes, CodecLimits::DEFAULT)
    }

    #[must_use]
    pub const fn with_limits(bytes: &'a [u8], limits: CodecLimits) -> Self {
        Self {
            bytes: Cow::Borrowed(bytes),
            depth: 0,
            limits,
        }
    }

    /// Owned view over a nested document payload, header validated up front.
    pub(super) fn nested(
        bytes: Vec<u8>,
        depth: usize,
        limits: CodecLimits,
    ) -> Result<EncodedDocument<'static>, Error> {
        Format::parse(&bytes).map_err(reject)?;

        Ok(EncodedDocument {
            bytes: Cow::Owned(bytes),
            depth,
            limits,
        })
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Parsed header over the underlying bytes.
    pub fn format(&self) -> Result<Format<'_>, Error> {
        parse_format(&self.bytes, self.limits)
    }

    /// Detach from the borrowed input by copying it.
    #[must_use]
    pub fn into_owned(self) -> EncodedDocument<'static> {
        EncodedDocument {
            bytes: Cow::Owned(self.bytes.into_owned()),
            depth: self.depth,
            limits: self.limits,
        }
    }
}

impl fmt::Debug for EncodedDocument<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedDocument")
            .field("len", &self.bytes.len())
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}

impl Document for EncodedDocument<'_> {
    fn get_by_field(&self, name: &str) -> Result<Value, Error> {
        decode_field_at(&self.bytes, name, self.depth, self.limits)
    }

    fn iterate(
        &self,
        visit: &mut dyn FnMut(&str, &Value) -> Result<(), Error>,
    ) -> Result<(), Error> {
        let format = self.format()?;
        for field in format.header().field_headers() {
            let payload = format.payload_of(field).map_err(reject)?;
            let value = decode_payload(field.ty(), payload, self.depth, self.limits)?;
            visit(field.name(), &value)?;
        }

        Ok(())
    }
}

///
/// EncodedArray
///
/// Lazy array over a nested array payload. Element descriptors are fixed
/// width, so `get_by_index` reads one descriptor and one payload.
///

#[derive(Clone)]
pub struct EncodedArray {
    bytes: Vec<u8>,
    len: usize,
    depth: usize,
    limits: CodecLimits,
}

impl EncodedArray {
    // Validate every descriptor against the body; payloads stay encoded.
    pub(super) fn parse(bytes: Vec<u8>, depth: usize, limits: CodecLimits) -> Result<Self, Error> {
        let len = validate_array(&bytes).map_err(reject)?;

        Ok(Self {
            bytes,
            len,
            depth,
            limits,
        })
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn body_start(&self) -> usize {
        4 + self.len * ELEMENT_DESCRIPTOR_BYTES
    }

    // Type and payload of element `index`; the caller checks bounds.
    fn element(&self, index: usize) -> Result<(ValueType, &[u8]), FormatError> {
        let mut r = Reader::new(&self.bytes[4 + index * ELEMENT_DESCRIPTOR_BYTES..]);
        let ty = r.tag()?;
        let size = r.u32()? as usize;
        let offset = r.u32()? as usize;

        let mut body = Reader::new(&self.bytes[self.body_start()..]);
        body.take(offset)?;

        Ok((ty, body.take(size)?))
    }

    fn decode_element(&self, index: usize) -> Result<Value, Error> {
        let (ty, payload) = self.element(index).map_err(reject)?;
        decode_payload(ty, payload, self.depth, self.limits)
    }
}

impl fmt::Debug for EncodedArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedArray")
            .field("len", &self.len)
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}

impl Array for EncodedArray {
    fn get_by_index(&self, index: usize) -> Result<Value, Error> {
        if index >= self.len {
            return Err(Error::value_not_found(ErrorOrigin::Codec, index));
        }

        self.decode_element(index)
    }

    fn iterate(
        &self,
        visit: &mut dyn FnMut(usize, &Value) -> Result<(), Error>,
    ) -> Result<(), Error> {
        for index in 0..self.len {
            let value = self.decode_element(index)?;
            visit(index, &value)?;
        }

        Ok(())
    }
}

// Returns the element count of a well-formed array payload.
fn validate_array(bytes: &[u8]) -> Result<usize, FormatError> {
    let mut r = Reader::new(bytes);
    let len = r.u32()? as usize;
    r.reserve(len, ELEMENT_DESCRIPTOR_BYTES)?;

    let mut expected = 0u64;
    for index in 0..len {
        let ty = r.tag()?;
        let size = r.u32()?;
        let offset = r.u32()?;

        check_fixed_width(ty, size as usize)?;
        if u64::from(offset) != expected {
            return Err(FormatError::NonContiguous {
                index,
                offset,
                expected,
            });
        }
        expected += u64::from(size);
    }

    check_body_size(expected, r.rest())?;

    Ok(len)
}
