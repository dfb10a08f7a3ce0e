//! Textual descriptor codec.
//!
//! Scalars encode as their canonical layout string. Structured descriptors
//! encode as a Python-style literal: a field list when the fields are packed,
//! a field dict (names, formats, offsets, itemsize) otherwise.

use core::fmt;

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;

use super::names::parse_scalar;
use super::{DType, Field, Structured};
use crate::errors::{Error, Result};

/// Display prefix of record-flavoured structured descriptors.
pub const RECORD_PREFIX: &str = "(record, ";

#[derive(Parser)]
#[grammar = "dtype/descr.pest"]
struct DescriptorParser;

/// Encode a descriptor to its portable text form.
pub fn encode_dtype(dtype: &DType) -> String {
    match dtype {
        DType::Scalar(scalar) => scalar.descr(),
        DType::Structured(_) => {
            let text = dtype.to_string();
            match text.strip_prefix(RECORD_PREFIX) {
                Some(inner) => inner.strip_suffix(')').unwrap_or(inner).to_string(),
                None => text,
            }
        }
    }
}

/// Decode a descriptor from its portable text form.
///
/// Text starting with `[` or `{` is a structured literal; anything else is
/// looked up as a scalar type name.
pub fn decode_dtype(text: &str) -> Result<DType> {
    if text.trim_start().starts_with(['[', '{']) {
        let literal = parse_literal(text)?;
        structured_from_literal(&literal, text).map(DType::Structured)
    } else {
        parse_scalar(text).map(DType::Scalar)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Literal {
    Str(String),
    Int(i64),
    List(Vec<Literal>),
    Tuple(Vec<Literal>),
    Dict(Vec<(Literal, Literal)>),
}

impl Literal {
    fn kind(&self) -> &'static str {
        match self {
            Literal::Str(_) => "string",
            Literal::Int(_) => "integer",
            Literal::List(_) => "list",
            Literal::Tuple(_) => "tuple",
            Literal::Dict(_) => "dict",
        }
    }
}

fn parse_literal(text: &str) -> Result<Literal> {
    let mut pairs = DescriptorParser::parse(Rule::descriptor, text)
        .map_err(|e| Error::malformed(text, e.to_string()))?;
    let literal = pairs
        .next()
        .and_then(|descriptor| descriptor.into_inner().next())
        .ok_or_else(|| Error::malformed(text, "empty descriptor"))?;
    build_literal(literal, text)
}

fn build_literal(pair: Pair<'_, Rule>, text: &str) -> Result<Literal> {
    match pair.as_rule() {
        Rule::integer => pair
            .as_str()
            .parse()
            .map(Literal::Int)
            .map_err(|_| Error::malformed(text, format!("integer `{}` out of range", pair.as_str()))),
        Rule::string => {
            let inner = pair.into_inner().next().map(|p| p.as_str()).unwrap_or("");
            Ok(Literal::Str(unescape(inner)))
        }
        Rule::list => pair
            .into_inner()
            .map(|item| build_literal(item, text))
            .collect::<Result<_>>()
            .map(Literal::List),
        Rule::tuple => pair
            .into_inner()
            .map(|item| build_literal(item, text))
            .collect::<Result<_>>()
            .map(Literal::Tuple),
        Rule::dict => pair
            .into_inner()
            .map(|entry| {
                let mut parts = entry.into_inner();
                match (parts.next(), parts.next()) {
                    (Some(key), Some(value)) => {
                        Ok((build_literal(key, text)?, build_literal(value, text)?))
                    }
                    _ => Err(Error::malformed(text, "incomplete dict entry")),
                }
            })
            .collect::<Result<_>>()
            .map(Literal::Dict),
        rule => Err(Error::malformed(text, format!("unexpected {:?}", rule))),
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn structured_from_literal(literal: &Literal, text: &str) -> Result<Structured> {
    match literal {
        Literal::List(items) => from_field_list(items, text),
        Literal::Dict(entries) => from_field_dict(entries, text),
        other => Err(Error::malformed(
            text,
            format!("expected a field list or dict, found {}", other.kind()),
        )),
    }
}

fn dtype_from_format(format: &Literal, text: &str) -> Result<DType> {
    match format {
        Literal::Str(name) => decode_dtype(name),
        Literal::List(_) | Literal::Dict(_) => {
            structured_from_literal(format, text).map(DType::Structured)
        }
        other => Err(Error::malformed(
            text,
            format!("expected a field format, found {}", other.kind()),
        )),
    }
}

fn from_field_list(items: &[Literal], text: &str) -> Result<Structured> {
    let mut fields = Vec::with_capacity(items.len());
    let mut offset = 0usize;
    for item in items {
        let (name, format) = match item {
            Literal::Tuple(parts) if parts.len() == 2 => match &parts[0] {
                Literal::Str(name) => (name, &parts[1]),
                other => {
                    return Err(Error::malformed(
                        text,
                        format!("field name must be a string, found {}", other.kind()),
                    ));
                }
            },
            Literal::Tuple(parts) if parts.len() == 3 => {
                return Err(Error::malformed(text, "subarray fields are not supported"));
            }
            other => {
                return Err(Error::malformed(
                    text,
                    format!("expected a (name, format) tuple, found {}", other.kind()),
                ));
            }
        };
        let dtype = dtype_from_format(format, text)?;
        let size = dtype.itemsize();
        // Unnamed entries are padding.
        if !name.is_empty() {
            fields.push(Field {
                name: name.clone(),
                dtype,
                offset,
            });
        }
        offset = offset
            .checked_add(size)
            .ok_or_else(|| Error::malformed(text, "field sizes overflow"))?;
    }
    Structured::new(fields, offset).map_err(|e| relabel(e, text))
}

fn from_field_dict(entries: &[(Literal, Literal)], text: &str) -> Result<Structured> {
    let mut names = None;
    let mut formats = None;
    let mut offsets = None;
    let mut itemsize = None;

    for (key, value) in entries {
        let Literal::Str(key) = key else {
            return Err(Error::malformed(text, "dict keys must be strings"));
        };
        match (key.as_str(), value) {
            ("names", Literal::List(items)) => {
                let items = items
                    .iter()
                    .map(|item| match item {
                        Literal::Str(name) => Ok(name.clone()),
                        other => Err(Error::malformed(
                            text,
                            format!("field name must be a string, found {}", other.kind()),
                        )),
                    })
                    .collect::<Result<Vec<_>>>()?;
                names = Some(items);
            }
            ("formats", Literal::List(items)) => {
                let items = items
                    .iter()
                    .map(|item| dtype_from_format(item, text))
                    .collect::<Result<Vec<_>>>()?;
                formats = Some(items);
            }
            ("offsets", Literal::List(items)) => {
                let items = items
                    .iter()
                    .map(|item| non_negative(item, "offset", text))
                    .collect::<Result<Vec<_>>>()?;
                offsets = Some(items);
            }
            ("itemsize", value) => itemsize = Some(non_negative(value, "itemsize", text)?),
            ("titles" | "aligned", _) => {}
            (key, value) => {
                return Err(Error::malformed(
                    text,
                    format!("unexpected {} for key `{}`", value.kind(), key),
                ));
            }
        }
    }

    let names = names.ok_or_else(|| Error::malformed(text, "missing `names`"))?;
    let formats = formats.ok_or_else(|| Error::malformed(text, "missing `formats`"))?;
    if names.len() != formats.len() {
        return Err(Error::malformed(
            text,
            format!("{} names but {} formats", names.len(), formats.len()),
        ));
    }
    let offsets = match offsets {
        Some(offsets) if offsets.len() != names.len() => {
            return Err(Error::malformed(
                text,
                format!("{} names but {} offsets", names.len(), offsets.len()),
            ));
        }
        Some(offsets) => offsets,
        None => {
            let mut offsets = Vec::with_capacity(formats.len());
            let mut next = 0usize;
            for dtype in &formats {
                offsets.push(next);
                next = next
                    .checked_add(dtype.itemsize())
                    .ok_or_else(|| Error::malformed(text, "field sizes overflow"))?;
            }
            offsets
        }
    };

    let fields: Vec<Field> = names
        .into_iter()
        .zip(formats)
        .zip(offsets)
        .map(|((name, dtype), offset)| Field {
            name,
            dtype,
            offset,
        })
        .collect();
    let end = fields
        .iter()
        .map(|field| field.offset.saturating_add(field.dtype.itemsize()))
        .max()
        .unwrap_or(0);
    Structured::new(fields, itemsize.unwrap_or(end)).map_err(|e| relabel(e, text))
}

fn non_negative(literal: &Literal, what: &str, text: &str) -> Result<usize> {
    match literal {
        Literal::Int(value) if *value >= 0 => Ok(*value as usize),
        other => Err(Error::malformed(
            text,
            format!("{} must be a non-negative integer, found {}", what, other.kind()),
        )),
    }
}

// Report layout errors against the whole descriptor rather than one field.
fn relabel(error: Error, text: &str) -> Error {
    match error {
        Error::MalformedTypeDescriptor { reason, .. } => Error::malformed(text, reason),
        other => other,
    }
}

fn write_quoted(out: &mut impl fmt::Write, s: &str) -> fmt::Result {
    out.write_char('\'')?;
    for c in s.chars() {
        match c {
            '\'' => out.write_str("\\'")?,
            '\\' => out.write_str("\\\\")?,
            '\n' => out.write_str("\\n")?,
            c => out.write_char(c)?,
        }
    }
    out.write_char('\'')
}

fn write_format(out: &mut impl fmt::Write, dtype: &DType) -> fmt::Result {
    match dtype {
        DType::Scalar(scalar) => write_quoted(out, &scalar.descr()),
        DType::Structured(structured) => write_literal(structured, out),
    }
}

/// Write the literal form of a structured layout, without any record wrapper.
pub(super) fn write_literal(structured: &Structured, out: &mut impl fmt::Write) -> fmt::Result {
    if structured.is_packed() {
        out.write_char('[')?;
        for (i, field) in structured.fields().iter().enumerate() {
            if i > 0 {
                out.write_str(", ")?;
            }
            out.write_char('(')?;
            write_quoted(out, &field.name)?;
            out.write_str(", ")?;
            write_format(out, &field.dtype)?;
            out.write_char(')')?;
        }
        return out.write_char(']');
    }

    let fields = structured.fields();
    out.write_str("{'names': [")?;
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.write_str(", ")?;
        }
        write_quoted(out, &field.name)?;
    }
    out.write_str("], 'formats': [")?;
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.write_str(", ")?;
        }
        write_format(out, &field.dtype)?;
    }
    out.write_str("], 'offsets': [")?;
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.write_str(", ")?;
        }
        write!(out, "{}", field.offset)?;
    }
    write!(out, "], 'itemsize': {}}}", structured.itemsize())
}
