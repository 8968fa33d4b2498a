// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! STEP header inspection
//!
//! Reads the `HEADER; ... ENDSEC;` section of an ISO-10303-21 file:
//! `FILE_DESCRIPTION`, `FILE_NAME` and `FILE_SCHEMA`. The header is optional;
//! a buffer without one still parses, its schema defaults to IFC2X3.

use std::fmt;

use memchr::memmem;

use crate::extractor::{parse_statement, AttributeValue};

/// Marker that opens every ISO-10303-21 file
pub const STEP_MARKER: &[u8] = b"ISO-10303-21";

/// Only this many leading bytes are searched for the header
const HEADER_WINDOW: usize = 64 * 1024;

/// IFC schema release named by `FILE_SCHEMA`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SchemaVersion {
    #[default]
    Ifc2x3,
    Ifc4,
    Ifc4x3,
    Other(String),
}

impl SchemaVersion {
    /// Map a `FILE_SCHEMA` identifier (e.g. `IFC4X3_ADD2`)
    pub fn from_identifier(identifier: &str) -> Self {
        let upper = identifier.trim().to_ascii_uppercase();
        if upper.starts_with("IFC4X3") {
            SchemaVersion::Ifc4x3
        } else if upper.starts_with("IFC4") {
            SchemaVersion::Ifc4
        } else if upper.starts_with("IFC2X3") {
            SchemaVersion::Ifc2x3
        } else {
            SchemaVersion::Other(upper)
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SchemaVersion::Ifc2x3 => "IFC2X3",
            SchemaVersion::Ifc4 => "IFC4",
            SchemaVersion::Ifc4x3 => "IFC4X3",
            SchemaVersion::Other(name) => name,
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed header section
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StepHeader {
    /// `ISO-10303-21;` was present
    pub has_marker: bool,
    pub description: Vec<String>,
    pub file_name: Option<String>,
    pub time_stamp: Option<String>,
    pub authors: Vec<String>,
    pub organizations: Vec<String>,
    pub preprocessor: Option<String>,
    pub originating_system: Option<String>,
    /// Raw `FILE_SCHEMA` identifiers
    pub schema_identifiers: Vec<String>,
    pub schema: SchemaVersion,
    /// Byte offset just past `DATA;`, when present
    pub data_offset: Option<usize>,
}

/// True when the buffer starts (after whitespace) with the STEP marker
pub fn has_step_marker(buffer: &[u8]) -> bool {
    let start = buffer
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(buffer.len());
    buffer[start..].starts_with(STEP_MARKER)
}

/// Read the header section; missing statements leave their fields empty
pub fn parse_header(buffer: &[u8]) -> StepHeader {
    let window = &buffer[..buffer.len().min(HEADER_WINDOW)];
    let mut header = StepHeader {
        has_marker: has_step_marker(buffer),
        data_offset: memmem::find(window, b"DATA;").map(|p| p + 5),
        ..Default::default()
    };

    let section_end = header.data_offset.unwrap_or(window.len());
    let section = &window[..section_end];

    if let Some(args) = statement_args(section, b"FILE_DESCRIPTION") {
        header.description = strings(args.first());
    }

    if let Some(args) = statement_args(section, b"FILE_NAME") {
        header.file_name = string(args.first());
        header.time_stamp = string(args.get(1));
        header.authors = strings(args.get(2));
        header.organizations = strings(args.get(3));
        header.preprocessor = string(args.get(4));
        header.originating_system = string(args.get(5));
    }

    if let Some(args) = statement_args(section, b"FILE_SCHEMA") {
        header.schema_identifiers = strings(args.first());
        if let Some(first) = header.schema_identifiers.first() {
            header.schema = SchemaVersion::from_identifier(first);
        }
    }

    header
}

/// Schema of a buffer, IFC2X3 when the header does not name one
pub fn detect_schema(buffer: &[u8]) -> SchemaVersion {
    parse_header(buffer).schema
}

fn statement_args(section: &[u8], keyword: &[u8]) -> Option<Vec<AttributeValue>> {
    let start = memmem::find(section, keyword)?;
    let rest = &section[start..];
    let end = statement_end(rest);
    let text = std::str::from_utf8(&rest[..end]).ok()?;
    parse_statement(text).map(|(_, args)| args)
}

/// Position of the first `;` outside a quoted string
fn statement_end(bytes: &[u8]) -> usize {
    let mut in_string = false;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'\'' => in_string = !in_string,
            b';' if !in_string => return i,
            _ => {}
        }
    }
    bytes.len()
}

fn string(value: Option<&AttributeValue>) -> Option<String> {
    value
        .and_then(AttributeValue::as_string)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn strings(value: Option<&AttributeValue>) -> Vec<String> {
    match value {
        Some(AttributeValue::List(items)) => items
            .iter()
            .filter_map(AttributeValue::as_string)
            .map(str::to_string)
            .collect(),
        Some(other) => other.as_string().map(|s| vec![s.to_string()]).unwrap_or_default(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = r#"ISO-10303-21;
HEADER;
FILE_DESCRIPTION(('ViewDefinition [CoordinationView]'),'2;1');
FILE_NAME('model.ifc','2024-01-01T00:00:00',('Author'),('Org'),'Pre 1.0','Authoring Tool','');
FILE_SCHEMA(('IFC4X3_ADD2'));
ENDSEC;
DATA;
#1=IFCPROJECT('g1',$,'P',$,$,$,$,$,$);
ENDSEC;
END-ISO-10303-21;
"#;

    #[test]
    fn test_parse_header() {
        let header = parse_header(HEADER.as_bytes());
        assert!(header.has_marker);
        assert_eq!(header.description, vec!["ViewDefinition [CoordinationView]"]);
        assert_eq!(header.file_name.as_deref(), Some("model.ifc"));
        assert_eq!(header.authors, vec!["Author"]);
        assert_eq!(header.organizations, vec!["Org"]);
        assert_eq!(header.originating_system.as_deref(), Some("Authoring Tool"));
        assert_eq!(header.schema_identifiers, vec!["IFC4X3_ADD2"]);
        assert_eq!(header.schema, SchemaVersion::Ifc4x3);

        let data = header.data_offset.unwrap();
        assert!(HEADER[data..].trim_start().starts_with("#1="));
    }

    #[test]
    fn test_schema_identifiers() {
        assert_eq!(SchemaVersion::from_identifier("IFC2X3"), SchemaVersion::Ifc2x3);
        assert_eq!(SchemaVersion::from_identifier("ifc4"), SchemaVersion::Ifc4);
        assert_eq!(SchemaVersion::from_identifier("IFC4X3_TC1"), SchemaVersion::Ifc4x3);
        assert_eq!(
            SchemaVersion::from_identifier("AP214"),
            SchemaVersion::Other("AP214".into())
        );
        assert_eq!(SchemaVersion::Ifc4.to_string(), "IFC4");
    }

    #[test]
    fn test_headerless_buffer() {
        let header = parse_header(b"#1=IFCWALL('a');");
        assert!(!header.has_marker);
        assert_eq!(header.schema, SchemaVersion::Ifc2x3);
        assert_eq!(header.data_offset, None);
        assert!(header.file_name.is_none());
    }
}
