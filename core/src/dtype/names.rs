//! Scalar type name lookup.

use hashbrown::HashMap;
use lazy_static::lazy_static;

use super::{ByteOrder, ScalarKind, ScalarType};
use crate::errors::{Error, Result};

lazy_static! {
    static ref SCALAR_NAMES: HashMap<&'static str, (ScalarKind, usize)> = {
        let mut names = HashMap::new();
        names.insert("bool", (ScalarKind::Bool, 1));
        names.insert("int8", (ScalarKind::Int, 1));
        names.insert("int16", (ScalarKind::Int, 2));
        names.insert("int32", (ScalarKind::Int, 4));
        names.insert("int64", (ScalarKind::Int, 8));
        names.insert("int", (ScalarKind::Int, 8));
        names.insert("uint8", (ScalarKind::UInt, 1));
        names.insert("uint16", (ScalarKind::UInt, 2));
        names.insert("uint32", (ScalarKind::UInt, 4));
        names.insert("uint64", (ScalarKind::UInt, 8));
        names.insert("float16", (ScalarKind::Float, 2));
        names.insert("float32", (ScalarKind::Float, 4));
        names.insert("float64", (ScalarKind::Float, 8));
        names.insert("float", (ScalarKind::Float, 8));
        names.insert("complex64", (ScalarKind::Complex, 8));
        names.insert("complex128", (ScalarKind::Complex, 16));
        names.insert("complex", (ScalarKind::Complex, 16));
        names
    };
}

/// Resolve a scalar name: a canonical layout string (`<i4`, `|S10`, `=f8`),
/// a bare shorthand (`i4`, `U3`), or a plain name (`float64`).
pub(super) fn parse_scalar(name: &str) -> Result<ScalarType> {
    let unknown = || Error::UnknownElementType { name: name.into() };
    let trimmed = name.trim();

    if let Some(&(kind, size)) = SCALAR_NAMES.get(trimmed) {
        return ScalarType::new(kind, size, ByteOrder::native());
    }

    let mut chars = trimmed.chars();
    let (order, rest) = match chars.next() {
        Some('<') => (ByteOrder::Little, chars.as_str()),
        Some('>') => (ByteOrder::Big, chars.as_str()),
        Some('|') => (ByteOrder::NotApplicable, chars.as_str()),
        Some('=') => (ByteOrder::native(), chars.as_str()),
        Some(_) => (ByteOrder::native(), trimmed),
        None => return Err(unknown()),
    };

    let mut chars = rest.chars();
    let kind = chars
        .next()
        .and_then(ScalarKind::from_char)
        .ok_or_else(unknown)?;
    let width: usize = chars.as_str().parse().map_err(|_| unknown())?;
    let size = match kind {
        ScalarKind::Unicode => width.checked_mul(4).ok_or_else(unknown)?,
        _ => width,
    };
    ScalarType::new(kind, size, order).map_err(|_| unknown())
}
