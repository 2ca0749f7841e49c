//! Type descriptors.
//!
//! A [`TypeDesc`] names the shape of a value: the logical type callers
//! record, or the physical type that ends up in the file. Descriptors are
//! persisted (as CBOR) next to each series so readers can interpret the
//! bytes without compile-time knowledge of the writer's types.
//!
//! ## Layout
//!
//! Fixed-size descriptors have a packed little-endian layout: scalars use
//! their natural width, aggregates concatenate their members with no
//! padding. [`TypeDesc::fixed_size`] computes that size and is the contract
//! every [`crate::Encoder`] is checked against.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Size in bytes of a file reference.
pub const FILE_REF_SIZE: usize = 8;

/// Header bytes of a batch node (`len` plus the trailing `next` link).
pub const BATCH_HEADER_SIZE: usize = 16;

/// Describes the shape of a logical or physical value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeDesc {
    /// The zero-sized unit type.
    Unit,
    /// A boolean stored as one byte.
    Bool,
    /// A Unicode scalar stored as a `u32`.
    Char,
    /// Unsigned 8-bit integer.
    U8,
    /// Signed 8-bit integer.
    I8,
    /// Unsigned 16-bit integer.
    U16,
    /// Signed 16-bit integer.
    I16,
    /// Unsigned 32-bit integer.
    U32,
    /// Signed 32-bit integer.
    I32,
    /// Unsigned 64-bit integer.
    U64,
    /// Signed 64-bit integer.
    I64,
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
    /// A fixed-length array.
    Array {
        /// Element type.
        elem: Box<TypeDesc>,
        /// Number of elements.
        len: usize,
    },
    /// An anonymous product type.
    Tuple(Vec<TypeDesc>),
    /// A product type with named fields.
    Record(Vec<Field>),
    /// A reference to a value of the given type elsewhere in the file.
    FileRef(Box<TypeDesc>),
    /// A raw-mode batch node holding up to `capacity` elements.
    Batch {
        /// Stored element type.
        elem: Box<TypeDesc>,
        /// Records per node.
        capacity: usize,
    },
    /// A variable-length encoded sequence of the given element type.
    Sequence(Box<TypeDesc>),
    /// A compressed series: adaptive model state plus its output sequence.
    Compressed {
        /// Model state type.
        model: Box<TypeDesc>,
        /// Encoded output type.
        sequence: Box<TypeDesc>,
    },
    /// A named blob of fixed size with no further structure.
    Opaque {
        /// Type name.
        name: String,
        /// Size in bytes.
        size: usize,
    },
}

/// A named field of a [`TypeDesc::Record`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    /// Field name.
    pub name: String,
    /// Field type.
    pub ty: TypeDesc,
}

impl Field {
    /// Creates a field.
    pub fn new(name: impl Into<String>, ty: TypeDesc) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

impl TypeDesc {
    /// Creates an array descriptor.
    #[must_use]
    pub fn array(elem: TypeDesc, len: usize) -> Self {
        Self::Array {
            elem: Box::new(elem),
            len,
        }
    }

    /// Creates a record descriptor from `(name, type)` pairs.
    #[must_use]
    pub fn record<N: Into<String>>(fields: impl IntoIterator<Item = (N, TypeDesc)>) -> Self {
        Self::Record(
            fields
                .into_iter()
                .map(|(name, ty)| Field::new(name, ty))
                .collect(),
        )
    }

    /// Creates a file reference descriptor.
    #[must_use]
    pub fn file_ref(target: TypeDesc) -> Self {
        Self::FileRef(Box::new(target))
    }

    /// Creates a batch node descriptor.
    #[must_use]
    pub fn batch(elem: TypeDesc, capacity: usize) -> Self {
        Self::Batch {
            elem: Box::new(elem),
            capacity,
        }
    }

    /// Creates a sequence descriptor.
    #[must_use]
    pub fn sequence(elem: TypeDesc) -> Self {
        Self::Sequence(Box::new(elem))
    }

    /// Returns the packed size of this type, or `None` if it has no fixed layout.
    #[must_use]
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            Self::Unit => Some(0),
            Self::Bool | Self::U8 | Self::I8 => Some(1),
            Self::U16 | Self::I16 => Some(2),
            Self::Char | Self::U32 | Self::I32 | Self::F32 => Some(4),
            Self::U64 | Self::I64 | Self::F64 => Some(8),
            Self::Array { elem, len } => elem.fixed_size()?.checked_mul(*len),
            Self::Tuple(items) => items
                .iter()
                .try_fold(0usize, |acc, t| acc.checked_add(t.fixed_size()?)),
            Self::Record(fields) => fields
                .iter()
                .try_fold(0usize, |acc, f| acc.checked_add(f.ty.fixed_size()?)),
            Self::FileRef(_) => Some(FILE_REF_SIZE),
            Self::Batch { elem, capacity } => {
                let data = elem.fixed_size()?.checked_mul(*capacity)?;
                let padded = data.checked_add(7)? & !7;
                padded.checked_add(BATCH_HEADER_SIZE)
            }
            Self::Sequence(_) | Self::Compressed { .. } => None,
            Self::Opaque { size, .. } => Some(*size),
        }
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => write!(f, "()"),
            Self::Bool => write!(f, "bool"),
            Self::Char => write!(f, "char"),
            Self::U8 => write!(f, "u8"),
            Self::I8 => write!(f, "i8"),
            Self::U16 => write!(f, "u16"),
            Self::I16 => write!(f, "i16"),
            Self::U32 => write!(f, "u32"),
            Self::I32 => write!(f, "i32"),
            Self::U64 => write!(f, "u64"),
            Self::I64 => write!(f, "i64"),
            Self::F32 => write!(f, "f32"),
            Self::F64 => write!(f, "f64"),
            Self::Array { elem, len } => write!(f, "[{elem}; {len}]"),
            Self::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Self::Record(fields) => {
                write!(f, "{{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.ty)?;
                }
                write!(f, "}}")
            }
            Self::FileRef(target) => write!(f, "fileref<{target}>"),
            Self::Batch { elem, capacity } => write!(f, "batch<{elem}; {capacity}>"),
            Self::Sequence(elem) => write!(f, "seq<{elem}>"),
            Self::Compressed { model, sequence } => write!(f, "compressed<{model}, {sequence}>"),
            Self::Opaque { name, .. } => write!(f, "{name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_sizes() {
        assert_eq!(TypeDesc::Unit.fixed_size(), Some(0));
        assert_eq!(TypeDesc::Bool.fixed_size(), Some(1));
        assert_eq!(TypeDesc::I16.fixed_size(), Some(2));
        assert_eq!(TypeDesc::Char.fixed_size(), Some(4));
        assert_eq!(TypeDesc::F64.fixed_size(), Some(8));
    }

    #[test]
    fn aggregate_sizes_are_packed() {
        let tick = TypeDesc::record([
            ("price", TypeDesc::F64),
            ("size", TypeDesc::U32),
            ("side", TypeDesc::Bool),
        ]);
        assert_eq!(tick.fixed_size(), Some(13));

        let pair = TypeDesc::Tuple(vec![TypeDesc::U8, TypeDesc::array(TypeDesc::U16, 3)]);
        assert_eq!(pair.fixed_size(), Some(7));
    }

    #[test]
    fn batch_size_pads_records() {
        // 16 header bytes + 3 * 5 = 15 record bytes padded to 16
        let batch = TypeDesc::batch(TypeDesc::array(TypeDesc::U8, 5), 3);
        assert_eq!(batch.fixed_size(), Some(32));
    }

    #[test]
    fn sequences_are_unsized() {
        assert_eq!(TypeDesc::sequence(TypeDesc::I64).fixed_size(), None);
        let nested = TypeDesc::Tuple(vec![TypeDesc::I64, TypeDesc::sequence(TypeDesc::U8)]);
        assert_eq!(nested.fixed_size(), None);
    }

    #[test]
    fn file_ref_is_one_word() {
        let r = TypeDesc::file_ref(TypeDesc::sequence(TypeDesc::U8));
        assert_eq!(r.fixed_size(), Some(8));
    }

    #[test]
    fn display_forms() {
        let tick = TypeDesc::record([("px", TypeDesc::F64), ("qty", TypeDesc::I32)]);
        assert_eq!(tick.to_string(), "{px: f64, qty: i32}");
        assert_eq!(TypeDesc::Tuple(vec![TypeDesc::U8]).to_string(), "(u8,)");
        assert_eq!(
            TypeDesc::file_ref(TypeDesc::array(TypeDesc::I64, 2)).to_string(),
            "fileref<[i64; 2]>"
        );
        assert_eq!(TypeDesc::batch(TypeDesc::U32, 10).to_string(), "batch<u32; 10>");
    }
}
