// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # IFC-Graph Core
//!
//! Byte-level STEP/IFC scanning built with [nom](https://docs.rs/nom) and
//! [memchr](https://docs.rs/memchr). Nothing is parsed up front: the scanner
//! finds record boundaries, the index maps ids and types to byte ranges, and
//! the extractor decodes a single record's attributes when asked.
//!
//! ## Overview
//!
//! - **Tokenizer**: strict and fast record scanning over a raw byte buffer
//! - **Entity Index**: O(1) id lookup and per-type id lists in source order
//! - **Entity Extractor**: on-demand attribute decoding into [`AttributeValue`]
//! - **Streaming Scan**: records interleaved with progress events
//! - **Header**: `FILE_SCHEMA` detection and header metadata
//!
//! ## Quick Start
//!
//! ```rust
//! use ifc_graph_core::{build_entity_index, EntityExtractor, IfcType, ScanMode};
//!
//! let content = b"#1=IFCPROJECT('g1',$,'P',$,$,$,$,$,$);\n#2=IFCSITE('g2',$,'S',$,$,$,$,$,$,$);";
//! let index = build_entity_index(content, ScanMode::Strict);
//! assert_eq!(index.ids_of(IfcType::IfcSite), &[2]);
//!
//! let extractor = EntityExtractor::new(content, &index);
//! let site = extractor.extract_by_id(2).unwrap();
//! assert_eq!(site.get_string(2), Some("S"));
//! ```
//!
//! ## Streaming
//!
//! ```rust
//! use ifc_graph_core::{parse_stream, ParseEvent, StreamConfig};
//!
//! let content = b"#1=IFCWALL('a',$,$,$,$,$,$,$);";
//! for event in parse_stream(content, StreamConfig::default()) {
//!     match event {
//!         ParseEvent::Entity(record) => println!("#{} {}", record.id, record.type_name),
//!         ParseEvent::Progress { .. } => {}
//!         ParseEvent::Complete { entities, .. } => assert_eq!(entities, 1),
//!     }
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization support for index and extracted data

pub mod error;
pub mod extractor;
pub mod header;
pub mod index;
pub mod registry;
pub mod schema;
pub mod streaming;
pub mod tokenizer;

pub use error::{Error, Result};
pub use extractor::{
    decode_step_string, parse_record, AttributeValue, EntityExtractor, ExtractedEntity, Logical,
    RawEntity,
};
pub use header::{detect_schema, has_step_marker, parse_header, SchemaVersion, StepHeader};
pub use index::{
    build_entity_index, EntityIndex, EntityIndexBuilder, IndexedRecord, UnindexedRecord,
};
pub use registry::{TypeCode, TypeRegistry};
pub use schema::IfcType;
pub use streaming::{parse_stream, ParseEvent, StreamConfig, StreamingScan};
pub use tokenizer::{scan, EntityRecord, EntityScanner, ScanMode};
