// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity Extractor - on-demand attribute parsing
//!
//! Parses the byte range of a single record into [`AttributeValue`]s using a
//! nom grammar. Nothing outside that range is read, so extraction can happen
//! in any order and on any thread.

use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, digit0, digit1, one_of},
    combinator::{map, map_res, opt, recognize},
    multi::separated_list0,
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

use crate::error::{Error, Result};
use crate::index::{EntityIndex, IndexedRecord};
use crate::registry::TypeCode;
use crate::schema::IfcType;

/// Three-valued STEP logical
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Logical {
    True,
    False,
    Unknown,
}

/// Decoded attribute value
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AttributeValue {
    /// `$`
    Null,
    /// `*`
    Derived,
    Integer(i64),
    Real(f64),
    /// Decoded string (escapes resolved)
    String(String),
    /// `.ELEMENT.` without the dots
    Enum(String),
    Logical(Logical),
    /// `#123`
    Ref(u32),
    List(Vec<AttributeValue>),
    /// `IFCLABEL('x')`; several arguments are wrapped in a `List`
    Typed(String, Box<AttributeValue>),
}

impl AttributeValue {
    /// Entity reference
    #[inline]
    pub fn as_ref_id(&self) -> Option<u32> {
        match self {
            AttributeValue::Ref(id) => Some(*id),
            _ => None,
        }
    }

    /// String value, looking through a typed wrapper
    pub fn as_string(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            AttributeValue::Typed(_, inner) => inner.as_string(),
            _ => None,
        }
    }

    /// Numeric value (integers widen), looking through a typed wrapper
    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttributeValue::Real(f) => Some(*f),
            AttributeValue::Integer(i) => Some(*i as f64),
            AttributeValue::Typed(_, inner) => inner.as_float(),
            _ => None,
        }
    }

    /// Integer value, looking through a typed wrapper
    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttributeValue::Integer(i) => Some(*i),
            AttributeValue::Typed(_, inner) => inner.as_int(),
            _ => None,
        }
    }

    /// Enumeration token
    pub fn as_enum(&self) -> Option<&str> {
        match self {
            AttributeValue::Enum(s) => Some(s),
            AttributeValue::Typed(_, inner) => inner.as_enum(),
            _ => None,
        }
    }

    /// Logical value
    pub fn as_logical(&self) -> Option<Logical> {
        match self {
            AttributeValue::Logical(l) => Some(*l),
            AttributeValue::Typed(_, inner) => inner.as_logical(),
            _ => None,
        }
    }

    /// Nested list
    #[inline]
    pub fn as_list(&self) -> Option<&[AttributeValue]> {
        match self {
            AttributeValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Entity references of a list; non-reference items are skipped
    pub fn as_ref_list(&self) -> Option<Vec<u32>> {
        self.as_list()
            .map(|items| items.iter().filter_map(AttributeValue::as_ref_id).collect())
    }

    /// Strip a typed wrapper
    pub fn untyped(&self) -> &AttributeValue {
        match self {
            AttributeValue::Typed(_, inner) => inner.untyped(),
            other => other,
        }
    }

    /// Wrapper type name of a typed value
    pub fn type_name(&self) -> Option<&str> {
        match self {
            AttributeValue::Typed(name, _) => Some(name),
            _ => None,
        }
    }

    /// `$` or `*`
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null | AttributeValue::Derived)
    }
}

/// A record parsed without consulting any index
#[derive(Debug, Clone, PartialEq)]
pub struct RawEntity<'a> {
    pub id: u32,
    pub type_name: &'a str,
    pub attributes: Vec<AttributeValue>,
}

/// An extracted entity, owned by the caller
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExtractedEntity {
    pub id: u32,
    pub type_code: TypeCode,
    pub ifc_type: Option<IfcType>,
    pub attributes: Vec<AttributeValue>,
}

impl ExtractedEntity {
    /// Get attribute by index
    #[inline]
    pub fn get(&self, index: usize) -> Option<&AttributeValue> {
        self.attributes.get(index)
    }

    pub fn get_ref(&self, index: usize) -> Option<u32> {
        self.get(index).and_then(AttributeValue::as_ref_id)
    }

    pub fn get_string(&self, index: usize) -> Option<&str> {
        self.get(index).and_then(AttributeValue::as_string)
    }

    pub fn get_float(&self, index: usize) -> Option<f64> {
        self.get(index).and_then(AttributeValue::as_float)
    }

    pub fn get_int(&self, index: usize) -> Option<i64> {
        self.get(index).and_then(AttributeValue::as_int)
    }

    pub fn get_enum(&self, index: usize) -> Option<&str> {
        self.get(index).and_then(AttributeValue::as_enum)
    }

    pub fn get_list(&self, index: usize) -> Option<&[AttributeValue]> {
        self.get(index).and_then(AttributeValue::as_list)
    }

    /// References held in a list attribute
    pub fn get_refs(&self, index: usize) -> Option<Vec<u32>> {
        self.get(index).and_then(AttributeValue::as_ref_list)
    }

    /// Missing attributes count as null
    pub fn is_null(&self, index: usize) -> bool {
        self.get(index).map_or(true, AttributeValue::is_null)
    }

    /// Number of top-level attributes
    #[inline]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

/// Extracts entities from a buffer through its index
pub struct EntityExtractor<'a> {
    buffer: &'a [u8],
    index: &'a EntityIndex,
}

impl<'a> EntityExtractor<'a> {
    pub fn new(buffer: &'a [u8], index: &'a EntityIndex) -> Self {
        Self { buffer, index }
    }

    /// Index this extractor reads through
    #[inline]
    pub fn index(&self) -> &'a EntityIndex {
        self.index
    }

    /// Source buffer
    #[inline]
    pub fn buffer(&self) -> &'a [u8] {
        self.buffer
    }

    /// Extract a record, reporting why it could not be read
    pub fn try_extract(&self, record: &IndexedRecord) -> Result<ExtractedEntity> {
        let bytes = self
            .buffer
            .get(record.offset..record.end())
            .ok_or(Error::EntityNotFound(record.id))?;
        let raw = parse_record(bytes).map_err(|e| match e {
            Error::Parse { position, message } => Error::Parse {
                position: record.offset + position,
                message,
            },
            other => other,
        })?;
        Ok(ExtractedEntity {
            id: record.id,
            type_code: record.type_code,
            ifc_type: self.index.registry().ifc_type(record.type_code),
            attributes: raw.attributes,
        })
    }

    /// Extract a record; unreadable records log a warning and yield `None`
    pub fn extract(&self, record: &IndexedRecord) -> Option<ExtractedEntity> {
        match self.try_extract(record) {
            Ok(entity) => Some(entity),
            Err(error) => {
                tracing::warn!(id = record.id, line = record.line, %error, "Skipping unreadable entity");
                None
            }
        }
    }

    /// Extract by express id
    pub fn try_extract_by_id(&self, id: u32) -> Result<ExtractedEntity> {
        let record = self.index.get(id).ok_or(Error::EntityNotFound(id))?;
        self.try_extract(record)
    }

    /// Extract by express id; `None` for unknown or unreadable ids
    pub fn extract_by_id(&self, id: u32) -> Option<ExtractedEntity> {
        self.index.get(id).and_then(|record| self.extract(record))
    }

    /// Follow a reference attribute
    pub fn resolve(&self, value: &AttributeValue) -> Option<ExtractedEntity> {
        value.as_ref_id().and_then(|id| self.extract_by_id(id))
    }

    /// Follow every reference in a list attribute
    pub fn resolve_list(&self, value: &AttributeValue) -> Vec<ExtractedEntity> {
        value
            .as_ref_list()
            .unwrap_or_default()
            .into_iter()
            .filter_map(|id| self.extract_by_id(id))
            .collect()
    }
}

/// Parse one complete record: `#id=TYPE(attrs);`
pub fn parse_record(bytes: &[u8]) -> Result<RawEntity<'_>> {
    let text = std::str::from_utf8(bytes).map_err(|_| Error::InvalidUtf8 {
        id: leading_id(bytes).unwrap_or(0),
    })?;

    match record(text) {
        Ok((rest, (id, type_name, attributes))) if rest.is_empty() => Ok(RawEntity {
            id,
            type_name,
            attributes,
        }),
        Ok((rest, (id, _, _))) => Err(diagnose(text, id).unwrap_or_else(|| {
            Error::parse(text.len() - rest.len(), "Unexpected trailing content")
        })),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            let id = leading_id(bytes).unwrap_or(0);
            Err(diagnose(text, id).unwrap_or_else(|| {
                Error::parse(text.len() - e.input.len(), format!("Unexpected token ({:?})", e.code))
            }))
        }
        Err(nom::Err::Incomplete(_)) => Err(Error::parse(text.len(), "Unexpected end of record")),
    }
}

/// Parse a bare `NAME(attrs)` statement, as found in the STEP header
pub(crate) fn parse_statement(text: &str) -> Option<(&str, Vec<AttributeValue>)> {
    pair(delimited(ws, type_name, ws), attribute_list)(text)
        .ok()
        .map(|(_, statement)| statement)
}

fn leading_id(bytes: &[u8]) -> Option<u32> {
    let start = bytes.iter().position(|&b| b == b'#')? + 1;
    let len = bytes[start..].iter().take_while(|b| b.is_ascii_digit()).count();
    lexical_core::parse::<u32>(&bytes[start..start + len]).ok()
}

/// Classify a malformed record by its quote and parenthesis structure
fn diagnose(text: &str, id: u32) -> Option<Error> {
    let mut depth: i32 = 0;
    let mut in_string = false;
    let mut chars = text.bytes().peekable();
    while let Some(b) = chars.next() {
        if in_string {
            if b == b'\'' {
                if chars.peek() == Some(&b'\'') {
                    chars.next();
                } else {
                    in_string = false;
                }
            }
            continue;
        }
        match b {
            b'\'' => in_string = true,
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth < 0 {
                    return Some(Error::UnbalancedParens { id });
                }
            }
            _ => {}
        }
    }
    if in_string {
        Some(Error::UnterminatedString { id })
    } else if depth != 0 {
        Some(Error::UnbalancedParens { id })
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Grammar
// ---------------------------------------------------------------------------

fn ws(input: &str) -> IResult<&str, &str> {
    take_while(|c: char| c.is_ascii_whitespace())(input)
}

fn record(input: &str) -> IResult<&str, (u32, &str, Vec<AttributeValue>)> {
    tuple((
        delimited(ws, preceded(char('#'), map_res(digit1, |s: &str| s.parse::<u32>())), ws),
        preceded(char('='), delimited(ws, type_name, ws)),
        terminated(attribute_list, tuple((ws, opt(char(';')), ws))),
    ))(input)
}

fn type_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)
}

fn attribute_list(input: &str) -> IResult<&str, Vec<AttributeValue>> {
    delimited(
        pair(char('('), ws),
        separated_list0(char(','), value),
        pair(ws, char(')')),
    )(input)
}

fn value(input: &str) -> IResult<&str, AttributeValue> {
    delimited(
        ws,
        alt((
            number,
            entity_ref,
            string,
            binary,
            enumeration,
            map(attribute_list, AttributeValue::List),
            typed,
            map(char('$'), |_| AttributeValue::Null),
            map(char('*'), |_| AttributeValue::Derived),
        )),
        ws,
    )(input)
}

fn entity_ref(input: &str) -> IResult<&str, AttributeValue> {
    map(
        preceded(char('#'), map_res(digit1, |s: &str| s.parse::<u32>())),
        AttributeValue::Ref,
    )(input)
}

/// Integer or real; a decimal point or exponent makes it real
fn number(input: &str) -> IResult<&str, AttributeValue> {
    map_res(
        recognize(tuple((
            opt(one_of("+-")),
            digit1,
            opt(pair(char('.'), digit0)),
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        ))),
        |s: &str| {
            let unsigned = s.strip_prefix('+').unwrap_or(s);
            if !unsigned.contains(['.', 'e', 'E']) {
                if let Ok(i) = lexical_core::parse::<i64>(unsigned.as_bytes()) {
                    return Ok(AttributeValue::Integer(i));
                }
            }
            fast_float::parse::<f64, _>(unsigned).map(AttributeValue::Real)
        },
    )(input)
}

/// Quoted string content with doubled quotes left in place
fn quoted(input: &str) -> IResult<&str, &str> {
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\'' {
            if bytes.get(i + 1) == Some(&b'\'') {
                i += 2;
                continue;
            }
            return Ok((&input[i..], &input[..i]));
        }
        i += 1;
    }
    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Char,
    )))
}

fn string(input: &str) -> IResult<&str, AttributeValue> {
    map(delimited(char('\''), quoted, char('\'')), |raw| {
        AttributeValue::String(decode_step_string(raw))
    })(input)
}

/// Binary literal `"0ABC"`, kept as its hex text
fn binary(input: &str) -> IResult<&str, AttributeValue> {
    map(
        delimited(
            char('"'),
            take_while(|c: char| c.is_ascii_hexdigit()),
            char('"'),
        ),
        |hex: &str| AttributeValue::String(hex.to_string()),
    )(input)
}

fn enumeration(input: &str) -> IResult<&str, AttributeValue> {
    map(
        delimited(
            char('.'),
            take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
            char('.'),
        ),
        |token: &str| match token {
            "T" | "TRUE" => AttributeValue::Logical(Logical::True),
            "F" | "FALSE" => AttributeValue::Logical(Logical::False),
            "U" | "UNKNOWN" => AttributeValue::Logical(Logical::Unknown),
            other => AttributeValue::Enum(other.to_string()),
        },
    )(input)
}

fn typed(input: &str) -> IResult<&str, AttributeValue> {
    map(pair(type_name, attribute_list), |(name, mut args)| {
        let inner = if args.len() == 1 {
            args.pop().unwrap_or(AttributeValue::Null)
        } else {
            AttributeValue::List(args)
        };
        AttributeValue::Typed(name.to_string(), Box::new(inner))
    })(input)
}

// ---------------------------------------------------------------------------
// String decoding
// ---------------------------------------------------------------------------

/// Decode STEP string escapes: `''`, `\\`, `\S\c`, `\X\hh`, `\X2\…\X0\`,
/// `\X4\…\X0\`. Code page switches (`\PA\`) are dropped.
pub fn decode_step_string(raw: &str) -> String {
    if !raw.contains(['\\', '\'']) {
        return raw.to_string();
    }

    let bytes = raw.as_bytes();
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' if bytes.get(i + 1) == Some(&b'\'') => {
                out.push('\'');
                i += 2;
            }
            b'\\' => i = decode_escape(raw, i, &mut out),
            _ => match raw[i..].chars().next() {
                Some(ch) => {
                    out.push(ch);
                    i += ch.len_utf8();
                }
                None => break,
            },
        }
    }
    out
}

/// Decode one escape at `start` (a backslash); returns the next position
fn decode_escape(raw: &str, start: usize, out: &mut String) -> usize {
    let rest = &raw[start..];
    let bytes = rest.as_bytes();

    if rest.starts_with("\\\\") {
        out.push('\\');
        return start + 2;
    }
    if rest.starts_with("\\S\\") {
        // ISO 8859 upper half for ASCII; anything else is kept as written
        if let Some(ch) = rest[3..].chars().next() {
            if ch.is_ascii() {
                out.push(char::from(ch as u8 + 0x80));
            } else {
                out.push(ch);
            }
            return start + 3 + ch.len_utf8();
        }
    }
    if rest.starts_with("\\X\\") {
        if let Some(byte) = rest.get(3..5).and_then(|h| u8::from_str_radix(h, 16).ok()) {
            out.push(char::from(byte));
            return start + 5;
        }
    }
    if rest.starts_with("\\X2\\") || rest.starts_with("\\X4\\") {
        let width = if bytes[2] == b'2' { 4 } else { 8 };
        if let Some(end) = rest[4..].find("\\X0\\") {
            let hex = &rest[4..4 + end];
            if decode_hex_run(hex, width, out) {
                return start + 4 + end + 4;
            }
        }
    }
    if bytes.len() >= 4 && bytes[1] == b'P' && bytes[3] == b'\\' {
        return start + 4;
    }

    out.push('\\');
    start + 1
}

/// Decode a run of fixed-width hex code units; false when malformed
fn decode_hex_run(hex: &str, width: usize, out: &mut String) -> bool {
    if hex.len() % width != 0 || !hex.is_ascii() {
        return false;
    }
    let mut units = Vec::with_capacity(hex.len() / width);
    for chunk in hex.as_bytes().chunks(width) {
        let Some(unit) = std::str::from_utf8(chunk)
            .ok()
            .and_then(|s| u32::from_str_radix(s, 16).ok())
        else {
            return false;
        };
        units.push(unit);
    }
    if width == 4 {
        let utf16 = units.into_iter().map(|u| u as u16);
        out.extend(char::decode_utf16(utf16).map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER)));
    } else {
        out.extend(
            units
                .into_iter()
                .map(|u| char::from_u32(u).unwrap_or(char::REPLACEMENT_CHARACTER)),
        );
    }
    true
}
