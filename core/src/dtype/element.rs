//! Reading and writing single elements.

use core::fmt;

use half::f16;

use super::{ByteOrder, DType, ScalarKind, ScalarType, Structured};
use crate::array::zeroed_bytes;
use crate::errors::{Error, Result};

/// The decoded value of one array item.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Complex(f64, f64),
    /// Byte string contents, trailing NULs stripped.
    Bytes(Vec<u8>),
    /// Unicode string contents, trailing NULs stripped.
    Str(String),
    Void(Vec<u8>),
    /// One element per field, in field order.
    Record(Vec<Element>),
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Bool(b) => write!(f, "{}", b),
            Element::Int(i) => write!(f, "{}", i),
            Element::UInt(u) => write!(f, "{}", u),
            Element::Float(x) => write!(f, "{}", x),
            Element::Complex(re, im) => write!(f, "({}{:+}j)", re, im),
            Element::Bytes(b) | Element::Void(b) => write!(f, "{:?}", b),
            Element::Str(s) => write!(f, "{:?}", s),
            Element::Record(fields) => {
                write!(f, "(")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", field)?;
                }
                write!(f, ")")
            }
        }
    }
}

fn mismatch(dtype: &impl fmt::Display, element: &Element) -> Error {
    Error::ElementMismatch {
        dtype: dtype.to_string(),
        found: element.to_string(),
    }
}

fn read_uint(bytes: &[u8], order: ByteOrder) -> u64 {
    let fold = |acc: u64, b: &u8| (acc << 8) | u64::from(*b);
    match order {
        ByteOrder::Big => bytes.iter().fold(0, fold),
        ByteOrder::Little | ByteOrder::NotApplicable => bytes.iter().rev().fold(0, fold),
    }
}

fn write_uint(value: u64, out: &mut [u8], order: ByteOrder) {
    let n = out.len();
    for i in 0..n {
        let byte = (value >> (8 * i)) as u8;
        match order {
            ByteOrder::Big => out[n - 1 - i] = byte,
            ByteOrder::Little | ByteOrder::NotApplicable => out[i] = byte,
        }
    }
}

fn read_float(bytes: &[u8], order: ByteOrder) -> f64 {
    let bits = read_uint(bytes, order);
    match bytes.len() {
        2 => f16::from_bits(bits as u16).to_f64(),
        4 => f64::from(f32::from_bits(bits as u32)),
        _ => f64::from_bits(bits),
    }
}

fn write_float(value: f64, out: &mut [u8], order: ByteOrder) {
    let bits = match out.len() {
        2 => u64::from(f16::from_f64(value).to_bits()),
        4 => u64::from((value as f32).to_bits()),
        _ => value.to_bits(),
    };
    write_uint(bits, out, order);
}

fn strip_nuls(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    &bytes[..end]
}

impl ScalarType {
    pub fn read_element(&self, bytes: &[u8]) -> Result<Element> {
        let order = self.byte_order();
        Ok(match self.kind() {
            ScalarKind::Bool => Element::Bool(bytes[0] != 0),
            ScalarKind::Int => {
                let shift = 64 - 8 * bytes.len() as u32;
                Element::Int(((read_uint(bytes, order) << shift) as i64) >> shift)
            }
            ScalarKind::UInt => Element::UInt(read_uint(bytes, order)),
            ScalarKind::Float => Element::Float(read_float(bytes, order)),
            ScalarKind::Complex => {
                let (re, im) = bytes.split_at(bytes.len() / 2);
                Element::Complex(read_float(re, order), read_float(im, order))
            }
            ScalarKind::Bytes => Element::Bytes(strip_nuls(bytes).to_vec()),
            ScalarKind::Void => Element::Void(bytes.to_vec()),
            ScalarKind::Unicode => {
                let codes: Vec<u32> = bytes
                    .chunks_exact(4)
                    .map(|unit| read_uint(unit, order) as u32)
                    .collect();
                // Only trailing NULs are padding.
                let end = codes.iter().rposition(|&code| code != 0).map_or(0, |i| i + 1);
                let text = codes[..end]
                    .iter()
                    .map(|&code| {
                        char::from_u32(code).ok_or_else(|| Error::ElementMismatch {
                            dtype: self.descr(),
                            found: format!("code point {:#x}", code),
                        })
                    })
                    .collect::<Result<String>>()?;
                Element::Str(text)
            }
        })
    }

    pub fn write_element(&self, element: &Element, out: &mut [u8]) -> Result<()> {
        let order = self.byte_order();
        let bits = 8 * self.size() as u32;
        match (self.kind(), element) {
            (ScalarKind::Bool, Element::Bool(b)) => out[0] = u8::from(*b),
            (ScalarKind::Bool, Element::Int(i)) => out[0] = u8::from(*i != 0),
            (ScalarKind::Bool, Element::UInt(u)) => out[0] = u8::from(*u != 0),

            (ScalarKind::Int, Element::Int(i)) => {
                let min = i64::MIN >> (64 - bits);
                let max = i64::MAX >> (64 - bits);
                if *i < min || *i > max {
                    return Err(mismatch(self, element));
                }
                write_uint(*i as u64, out, order);
            }
            (ScalarKind::Int, Element::UInt(u)) => {
                if *u > (i64::MAX >> (64 - bits)) as u64 {
                    return Err(mismatch(self, element));
                }
                write_uint(*u, out, order);
            }
            (ScalarKind::Int | ScalarKind::UInt, Element::Bool(b)) => {
                write_uint(u64::from(*b), out, order)
            }
            (ScalarKind::UInt, Element::UInt(u)) => {
                if bits < 64 && *u >> bits != 0 {
                    return Err(mismatch(self, element));
                }
                write_uint(*u, out, order);
            }
            (ScalarKind::UInt, Element::Int(i)) => {
                if *i < 0 || (bits < 64 && (*i as u64) >> bits != 0) {
                    return Err(mismatch(self, element));
                }
                write_uint(*i as u64, out, order);
            }

            (ScalarKind::Float, Element::Float(x)) => write_float(*x, out, order),
            (ScalarKind::Float, Element::Int(i)) => write_float(*i as f64, out, order),
            (ScalarKind::Float, Element::UInt(u)) => write_float(*u as f64, out, order),
            (ScalarKind::Float, Element::Bool(b)) => write_float(f64::from(u8::from(*b)), out, order),

            (ScalarKind::Complex, _) => {
                let (re, im) = match element {
                    Element::Complex(re, im) => (*re, *im),
                    Element::Float(x) => (*x, 0.0),
                    Element::Int(i) => (*i as f64, 0.0),
                    Element::UInt(u) => (*u as f64, 0.0),
                    _ => return Err(mismatch(self, element)),
                };
                let (re_out, im_out) = out.split_at_mut(out.len() / 2);
                write_float(re, re_out, order);
                write_float(im, im_out, order);
            }

            (ScalarKind::Bytes, Element::Bytes(bytes)) | (ScalarKind::Void, Element::Void(bytes))
            | (ScalarKind::Void, Element::Bytes(bytes)) => {
                if bytes.len() > out.len() {
                    return Err(mismatch(self, element));
                }
                out[..bytes.len()].copy_from_slice(bytes);
                out[bytes.len()..].fill(0);
            }
            (ScalarKind::Bytes, Element::Str(text)) if text.is_ascii() => {
                if text.len() > out.len() {
                    return Err(mismatch(self, element));
                }
                out[..text.len()].copy_from_slice(text.as_bytes());
                out[text.len()..].fill(0);
            }
            (ScalarKind::Unicode, Element::Str(text)) => {
                if text.chars().count() * 4 > out.len() {
                    return Err(mismatch(self, element));
                }
                out.fill(0);
                for (unit, c) in out.chunks_exact_mut(4).zip(text.chars()) {
                    write_uint(u64::from(u32::from(c)), unit, order);
                }
            }

            _ => return Err(mismatch(self, element)),
        }
        Ok(())
    }
}

impl Structured {
    pub fn read_element(&self, bytes: &[u8]) -> Result<Element> {
        self.fields()
            .iter()
            .map(|field| {
                let end = field.offset + field.dtype.itemsize();
                field.dtype.read_element(&bytes[field.offset..end])
            })
            .collect::<Result<_>>()
            .map(Element::Record)
    }

    pub fn write_element(&self, element: &Element, out: &mut [u8]) -> Result<()> {
        let Element::Record(values) = element else {
            return Err(mismatch(self, element));
        };
        if values.len() != self.fields().len() {
            return Err(mismatch(self, element));
        }
        out.fill(0);
        for (field, value) in self.fields().iter().zip(values) {
            let end = field.offset + field.dtype.itemsize();
            field.dtype.write_element(value, &mut out[field.offset..end])?;
        }
        Ok(())
    }
}

impl DType {
    /// Decode one element from exactly `itemsize` bytes.
    pub fn read_element(&self, bytes: &[u8]) -> Result<Element> {
        debug_assert_eq!(bytes.len(), self.itemsize());
        match self {
            DType::Scalar(scalar) => scalar.read_element(bytes),
            DType::Structured(structured) => structured.read_element(bytes),
        }
    }

    /// Encode one element into exactly `itemsize` bytes.
    pub fn write_element(&self, element: &Element, out: &mut [u8]) -> Result<()> {
        debug_assert_eq!(out.len(), self.itemsize());
        match self {
            DType::Scalar(scalar) => scalar.write_element(element, out),
            DType::Structured(structured) => structured.write_element(element, out),
        }
    }
}

/// A single typed value outside of any array.
#[derive(Debug, Clone, PartialEq)]
pub struct Scalar {
    dtype: DType,
    bytes: Vec<u8>,
}

impl Scalar {
    pub fn new(dtype: DType, element: &Element) -> Result<Self> {
        let mut bytes = zeroed_bytes(dtype.itemsize())?;
        dtype.write_element(element, &mut bytes)?;
        Ok(Scalar { dtype, bytes })
    }

    pub fn from_bytes(dtype: DType, bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() != dtype.itemsize() {
            return Err(Error::BufferSizeMismatch {
                expected: dtype.itemsize(),
                actual: bytes.len(),
            });
        }
        Ok(Scalar { dtype, bytes })
    }

    pub fn dtype(&self) -> &DType {
        &self.dtype
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn element(&self) -> Result<Element> {
        self.dtype.read_element(&self.bytes)
    }
}
