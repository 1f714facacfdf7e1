//! Core value layer for docdb: the schemaless value model, its canonical
//! ordering, the binary record format and lazy record views.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod codec;
pub mod document;
pub mod error;
pub mod key;
pub mod obs;
pub mod value;

#[cfg(test)]
mod test_support;

///
/// CONSTANTS
///

/// Maximum nesting depth of arrays/documents accepted anywhere in the layer.
///
/// Encoding, decoding, comparison, key derivation and the producers all stop
/// with an error past this depth instead of recursing further. The fields of
/// a top-level record or document sit at depth 0; each array or document
/// below them adds one level.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Max encoded bytes for a single record accepted by the default decode policy.
pub const MAX_RECORD_BYTES: usize = 4 * 1024 * 1024;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No codecs, sinks, or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        document::{Array, Document, FieldBuffer, ValueBuffer},
        error::{Error, ErrorKind},
        value::{Value, ValueType},
    };
}
