use crate::value::ValueType;

///
/// Canonical Value Rank
///
/// Stable rank used for cross-kind ordering.
///
/// Integer and Double share the number bucket; Text and Blob share the
/// byte-string bucket so equal bytes compare equal across the two kinds.
///
/// IMPORTANT:
/// Rank order is part of index-key ordering and must remain fixed.
///
#[must_use]
pub const fn canonical_rank(ty: ValueType) -> u8 {
    match ty {
        ValueType::Null => 0,
        ValueType::Bool => 1,
        ValueType::Integer | ValueType::Double => 2,
        ValueType::Text | ValueType::Blob => 3,
        ValueType::Array => 4,
        ValueType::Document => 5,
    }
}
