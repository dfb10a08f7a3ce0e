//! Element type descriptors.
//!
//! A [`DType`] describes the binary layout of one array element: either a
//! scalar (kind, width, byte order) or a structured record made of named
//! fields at fixed byte offsets.
//!
//! Descriptors round-trip through a textual form (see [`encode_dtype`] and
//! [`decode_dtype`]): scalars use the canonical `<i4` / `>f8` / `|S10` strings,
//! structured descriptors use a Python-literal field list or field dict.

mod descr;
mod element;
mod names;


use core::fmt;

pub use descr::{RECORD_PREFIX, decode_dtype, encode_dtype};
pub use element::{Element, Scalar};

use crate::errors::{Error, Result};

/// Byte order of a multi-byte element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    Little,
    Big,
    /// Single-byte types and byte strings.
    NotApplicable,
}

impl ByteOrder {
    pub const fn native() -> Self {
        if cfg!(target_endian = "little") {
            ByteOrder::Little
        } else {
            ByteOrder::Big
        }
    }

    pub const fn as_char(self) -> char {
        match self {
            ByteOrder::Little => '<',
            ByteOrder::Big => '>',
            ByteOrder::NotApplicable => '|',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    Int,
    UInt,
    Float,
    Complex,
    /// Fixed-width byte string (`S`).
    Bytes,
    /// Fixed-width UCS-4 string (`U`); the size is in bytes, four per character.
    Unicode,
    /// Uninterpreted bytes (`V`).
    Void,
}

impl ScalarKind {
    pub const fn as_char(self) -> char {
        match self {
            ScalarKind::Bool => 'b',
            ScalarKind::Int => 'i',
            ScalarKind::UInt => 'u',
            ScalarKind::Float => 'f',
            ScalarKind::Complex => 'c',
            ScalarKind::Bytes => 'S',
            ScalarKind::Unicode => 'U',
            ScalarKind::Void => 'V',
        }
    }

    pub const fn from_char(c: char) -> Option<Self> {
        Some(match c {
            'b' | '?' => ScalarKind::Bool,
            'i' => ScalarKind::Int,
            'u' => ScalarKind::UInt,
            'f' => ScalarKind::Float,
            'c' => ScalarKind::Complex,
            'S' | 'a' => ScalarKind::Bytes,
            'U' => ScalarKind::Unicode,
            'V' => ScalarKind::Void,
            _ => return None,
        })
    }

    fn accepts_size(self, size: usize) -> bool {
        if size > MAX_ITEMSIZE {
            return false;
        }
        match self {
            ScalarKind::Bool => size == 1,
            ScalarKind::Int | ScalarKind::UInt => matches!(size, 1 | 2 | 4 | 8),
            ScalarKind::Float => matches!(size, 2 | 4 | 8),
            ScalarKind::Complex => matches!(size, 8 | 16),
            ScalarKind::Bytes | ScalarKind::Void => size > 0,
            ScalarKind::Unicode => size > 0 && size % 4 == 0,
        }
    }
}

/// Largest item size in bytes; larger items could not be addressed.
pub const MAX_ITEMSIZE: usize = isize::MAX as usize;

/// A scalar element type: kind, width in bytes and byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScalarType {
    kind: ScalarKind,
    size: usize,
    order: ByteOrder,
}

impl ScalarType {
    /// Validate and normalize a scalar type.
    ///
    /// Types whose layout does not depend on byte order always get
    /// [`ByteOrder::NotApplicable`]; order-sensitive types given
    /// `NotApplicable` fall back to the native order.
    pub fn new(kind: ScalarKind, size: usize, order: ByteOrder) -> Result<Self> {
        if !kind.accepts_size(size) {
            return Err(Error::UnknownElementType {
                name: format!("{}{}", kind.as_char(), size),
            });
        }
        Ok(Self::normalized(kind, size, order))
    }

    const fn normalized(kind: ScalarKind, size: usize, order: ByteOrder) -> Self {
        let sensitive = match kind {
            ScalarKind::Bool | ScalarKind::Bytes | ScalarKind::Void => false,
            ScalarKind::Unicode => true,
            _ => size > 1,
        };
        let order = match (sensitive, order) {
            (false, _) => ByteOrder::NotApplicable,
            (true, ByteOrder::NotApplicable) => ByteOrder::native(),
            (true, order) => order,
        };
        ScalarType { kind, size, order }
    }

    pub const fn kind(&self) -> ScalarKind {
        self.kind
    }

    pub const fn size(&self) -> usize {
        self.size
    }

    pub const fn byte_order(&self) -> ByteOrder {
        self.order
    }

    /// The same type in another byte order.
    pub const fn with_byte_order(self, order: ByteOrder) -> Self {
        Self::normalized(self.kind, self.size, order)
    }

    /// Canonical layout string, e.g. `<i4`, `|b1`, `<U5`.
    pub fn descr(&self) -> String {
        let width = match self.kind {
            ScalarKind::Unicode => self.size / 4,
            _ => self.size,
        };
        format!("{}{}{}", self.order.as_char(), self.kind.as_char(), width)
    }
}

/// A named field of a structured descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub dtype: DType,
    pub offset: usize,
}

/// A record layout: ordered fields at fixed offsets within `itemsize` bytes.
#[derive(Debug, Clone)]
pub struct Structured {
    fields: Vec<Field>,
    itemsize: usize,
    record: bool,
}

impl Structured {
    pub fn new(fields: Vec<Field>, itemsize: usize) -> Result<Self> {
        if itemsize > MAX_ITEMSIZE {
            return Err(Error::malformed(
                "",
                format!("item size {} exceeds {}", itemsize, MAX_ITEMSIZE),
            ));
        }
        for (i, field) in fields.iter().enumerate() {
            if fields[..i].iter().any(|other| other.name == field.name) {
                return Err(Error::malformed(
                    &field.name,
                    format!("duplicate field name `{}`", field.name),
                ));
            }
            let end = field
                .offset
                .checked_add(field.dtype.itemsize())
                .ok_or(Error::ShapeOverflow)?;
            if end > itemsize {
                return Err(Error::malformed(
                    &field.name,
                    format!(
                        "field `{}` ends at byte {} past the item size {}",
                        field.name, end, itemsize
                    ),
                ));
            }
        }
        Ok(Structured {
            fields,
            itemsize,
            record: false,
        })
    }

    /// Lay fields out back to back with no padding.
    pub fn packed<N: Into<String>>(fields: impl IntoIterator<Item = (N, DType)>) -> Result<Self> {
        let mut offset = 0;
        let fields: Vec<Field> = fields
            .into_iter()
            .map(|(name, dtype)| {
                let field = Field {
                    name: name.into(),
                    offset,
                    dtype,
                };
                offset += field.dtype.itemsize();
                field
            })
            .collect();
        Self::new(fields, offset)
    }

    /// Mark the layout as a record type. Only affects the display form.
    pub fn into_record(mut self) -> Self {
        self.record = true;
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn itemsize(&self) -> usize {
        self.itemsize
    }

    pub fn is_record(&self) -> bool {
        self.record
    }

    /// True when fields are laid out back to back from offset 0 and fill the
    /// item exactly.
    pub fn is_packed(&self) -> bool {
        let mut offset = 0;
        for field in &self.fields {
            if field.offset != offset {
                return false;
            }
            offset += field.dtype.itemsize();
        }
        offset == self.itemsize
    }
}

// The record flag is presentation only; equality is about layout.
impl PartialEq for Structured {
    fn eq(&self, other: &Self) -> bool {
        self.itemsize == other.itemsize && self.fields == other.fields
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DType {
    Scalar(ScalarType),
    Structured(Structured),
}

macro_rules! native_scalar_constructors {
    ($($name:ident => ($kind:ident, $size:expr)),* $(,)?) => {
        $(
            pub const fn $name() -> Self {
                DType::Scalar(ScalarType::normalized(ScalarKind::$kind, $size, ByteOrder::native()))
            }
        )*
    };
}

impl DType {
    native_scalar_constructors! {
        bool => (Bool, 1),
        int8 => (Int, 1),
        int16 => (Int, 2),
        int32 => (Int, 4),
        int64 => (Int, 8),
        uint8 => (UInt, 1),
        uint16 => (UInt, 2),
        uint32 => (UInt, 4),
        uint64 => (UInt, 8),
        float16 => (Float, 2),
        float32 => (Float, 4),
        float64 => (Float, 8),
        complex64 => (Complex, 8),
        complex128 => (Complex, 16),
    }

    pub fn scalar(kind: ScalarKind, size: usize, order: ByteOrder) -> Result<Self> {
        ScalarType::new(kind, size, order).map(DType::Scalar)
    }

    /// Fixed-width byte string of `len` bytes.
    pub fn bytes(len: usize) -> Result<Self> {
        Self::scalar(ScalarKind::Bytes, len, ByteOrder::NotApplicable)
    }

    /// Fixed-width unicode string of `chars` characters.
    pub fn unicode(chars: usize) -> Result<Self> {
        let size = chars.checked_mul(4).ok_or(Error::ShapeOverflow)?;
        Self::scalar(ScalarKind::Unicode, size, ByteOrder::native())
    }

    pub fn itemsize(&self) -> usize {
        match self {
            DType::Scalar(scalar) => scalar.size,
            DType::Structured(structured) => structured.itemsize,
        }
    }

    pub fn as_scalar(&self) -> Option<&ScalarType> {
        match self {
            DType::Scalar(scalar) => Some(scalar),
            DType::Structured(_) => None,
        }
    }

    pub fn as_structured(&self) -> Option<&Structured> {
        match self {
            DType::Structured(structured) => Some(structured),
            DType::Scalar(_) => None,
        }
    }
}

impl From<ScalarType> for DType {
    fn from(scalar: ScalarType) -> Self {
        DType::Scalar(scalar)
    }
}

impl From<Structured> for DType {
    fn from(structured: Structured) -> Self {
        DType::Structured(structured)
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.descr())
    }
}

impl fmt::Display for Structured {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.record {
            write!(f, "{}", RECORD_PREFIX)?;
            descr::write_literal(self, f)?;
            write!(f, ")")
        } else {
            descr::write_literal(self, f)
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::Scalar(scalar) => scalar.fmt(f),
            DType::Structured(structured) => structured.fmt(f),
        }
    }
}
