use crate::{codec::FormatError, value::ValueType};
use std::collections::HashSet;

// name length (u16) + tag (u8) + size (u32) + offset (u32)
const MIN_FIELD_HEADER_BYTES: usize = 11;

///
/// FieldHeader
/// One decoded header entry, borrowing its name from the record bytes.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FieldHeader<'a> {
    name_size: u16,
    name: &'a str,
    ty: ValueType,
    size: u32,
    offset: u32,
}

impl<'a> FieldHeader<'a> {
    #[must_use]
    pub const fn name_size(&self) -> u16 {
        self.name_size
    }

    #[must_use]
    pub const fn name(&self) -> &'a str {
        self.name
    }

    #[must_use]
    pub const fn ty(&self) -> ValueType {
        self.ty
    }

    /// Payload length in bytes.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Payload start, relative to the body.
    #[must_use]
    pub const fn offset(&self) -> u32 {
        self.offset
    }
}

///
/// Header
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Header<'a> {
    fields_count: u32,
    field_headers: Vec<FieldHeader<'a>>,
}

impl<'a> Header<'a> {
    #[must_use]
    pub const fn fields_count(&self) -> u32 {
        self.fields_count
    }

    #[must_use]
    pub fn field_headers(&self) -> &[FieldHeader<'a>] {
        &self.field_headers
    }

    /// Sum of all declared payload sizes.
    #[must_use]
    pub fn body_size(&self) -> usize {
        self.field_headers.iter().map(|f| f.size as usize).sum()
    }

    /// First (and, in a valid record, only) header entry for `name`.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&FieldHeader<'a>> {
        self.field_headers.iter().find(|f| f.name == name)
    }
}

///
/// Format
///
/// A validated record: parsed header plus the untouched body bytes. Only
/// [`decode`](crate::codec::decode) builds one, so its entries always fit the
/// body.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Format<'a> {
    header: Header<'a>,
    body: &'a [u8],
}

impl<'a> Format<'a> {
    /// Parse the header in one pass and check it against the body.
    pub(crate) fn parse(bytes: &'a [u8]) -> Result<Self, FormatError> {
        let mut r = Reader::new(bytes);
        let fields_count = r.u32()?;
        r.reserve(fields_count as usize, MIN_FIELD_HEADER_BYTES)?;

        let mut field_headers = Vec::with_capacity(fields_count as usize);
        let mut seen = HashSet::with_capacity(fields_count as usize);
        let mut expected = 0u64;

        for index in 0..fields_count as usize {
            let name_size = r.u16()?;
            let name = std::str::from_utf8(r.take(usize::from(name_size))?)
                .map_err(|_| FormatError::InvalidName)?;
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
            if !seen.insert(name) {
                return Err(FormatError::DuplicateName {
                    name: name.to_string(),
                });
            }

            expected += u64::from(size);
            field_headers.push(FieldHeader {
                name_size,
                name,
                ty,
                size,
                offset,
            });
        }

        let body = r.rest();
        check_body_size(expected, body)?;

        Ok(Self {
            header: Header {
                fields_count,
                field_headers,
            },
            body,
        })
    }

    #[must_use]
    pub const fn header(&self) -> &Header<'a> {
        &self.header
    }

    #[must_use]
    pub const fn body(&self) -> &'a [u8] {
        self.body
    }

    /// Payload bytes of one header entry; `None` when the entry does not
    /// address this body, e.g. one taken from another record.
    #[must_use]
    pub fn payload(&self, field: &FieldHeader<'_>) -> Option<&'a [u8]> {
        self.payload_of(field).ok()
    }

    pub(crate) fn payload_of(&self, field: &FieldHeader<'_>) -> Result<&'a [u8], FormatError> {
        let start = field.offset as usize;
        let size = field.size as usize;

        start
            .checked_add(size)
            .and_then(|end| self.body.get(start..end))
            .ok_or(FormatError::Truncated {
                at: start,
                needed: size,
                available: self.body.len().saturating_sub(start),
            })
    }
}

pub(super) fn check_fixed_width(ty: ValueType, size: usize) -> Result<(), FormatError> {
    match ty.fixed_size() {
        Some(expected) if expected != size => Err(FormatError::FixedWidth {
            ty,
            expected,
            actual: size,
        }),
        _ => Ok(()),
    }
}

pub(super) fn check_body_size(declared: u64, body: &[u8]) -> Result<(), FormatError> {
    if declared == body.len() as u64 {
        Ok(())
    } else {
        Err(FormatError::BodySize {
            declared,
            actual: body.len(),
        })
    }
}

///
/// Reader
/// Bounds-checked big-endian cursor.
///

pub(super) struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(super) const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub(super) fn take(&mut self, n: usize) -> Result<&'a [u8], FormatError> {
        let available = self.bytes.len() - self.pos;
        if n > available {
            return Err(FormatError::Truncated {
                at: self.pos,
                needed: n,
                available,
            });
        }

        let out = &self.bytes[self.pos..self.pos + n];
        self.pos += n;

        Ok(out)
    }

    // Fail early when `count` entries of at least `width` bytes cannot fit.
    pub(super) fn reserve(&self, count: usize, width: usize) -> Result<(), FormatError> {
        let available = self.bytes.len() - self.pos;
        let needed = count.saturating_mul(width);
        if needed > available {
            return Err(FormatError::Truncated {
                at: self.pos,
                needed,
                available,
            });
        }

        Ok(())
    }

    pub(super) fn u8(&mut self) -> Result<u8, FormatError> {
        Ok(self.take(1)?[0])
    }

    pub(super) fn u16(&mut self) -> Result<u16, FormatError> {
        let mut buf = [0u8; 2];
        buf.copy_from_slice(self.take(2)?);

        Ok(u16::from_be_bytes(buf))
    }

    pub(super) fn u32(&mut self) -> Result<u32, FormatError> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);

        Ok(u32::from_be_bytes(buf))
    }

    pub(super) fn tag(&mut self) -> Result<ValueType, FormatError> {
        let tag = self.u8()?;
        ValueType::from_u8(tag).ok_or(FormatError::UnknownTag { tag })
    }

    pub(super) fn rest(self) -> &'a [u8] {
        &self.bytes[self.pos..]
    }
}
