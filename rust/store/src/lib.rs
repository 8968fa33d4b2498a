// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # IFC-Graph Store
//!
//! Turns an IFC buffer into a read-only [`DataStore`]: a columnar entity
//! table, typed relationship graph, spatial hierarchy, property sets and a
//! query layer on top.
//!
//! ```rust
//! use ifc_graph_store::{parse, IfcType, StoreConfig};
//!
//! let content = b"#1=IFCPROJECT('0YvctVUKr0kugbFTf53O9L',$,'P',$,$,$,$,$,$);
//! #2=IFCSITE('1YvctVUKr0kugbFTf53O9L',$,'S',$,$,$,$,$,$,$);
//! #3=IFCRELAGGREGATES('2YvctVUKr0kugbFTf53O9L',$,$,$,#1,(#2));";
//!
//! let store = parse(&content[..], &StoreConfig::default(), |_| {}).unwrap();
//! assert_eq!(store.get_by_type(IfcType::IfcSite), &[2]);
//!
//! let site = store.node(2).unwrap();
//! assert_eq!(site.decomposed_by().map(|p| p.id()), Some(1));
//! ```
//!
//! ## Property strategies
//!
//! [`PropertyMode::Eager`] reads every property set during the parse;
//! [`PropertyMode::OnDemand`] reads an entity's sets when first asked.
//! Both answer every lookup identically.

pub mod classifications;
pub mod columnar;
pub mod config;
pub mod error;
pub mod graph;
pub mod materials;
pub mod node;
pub mod parse;
pub mod properties;
pub mod query;
pub mod relationships;
pub mod spatial;
pub mod store;
pub mod strings;
pub mod units;
pub mod warnings;
pub mod worker;

pub use classifications::ClassificationInfo;
pub use columnar::EntityTable;
pub use config::{PropertyMode, StoreConfig};
pub use error::{Error, Result};
pub use graph::{Direction, RelationshipGraph};
pub use materials::{MaterialComponent, MaterialInfo, MaterialKind};
pub use node::EntityNode;
pub use parse::{parse, Progress};
pub use properties::{
    Property, PropertyKind, PropertySet, PropertySource, PropertyValue, Quantity, QuantityKind,
    QuantitySet,
};
pub use query::{CompareOp, EntityQuery, PropertyFilter};
pub use relationships::{RelationEdge, RelationType};
pub use spatial::{SpatialHierarchy, SpatialNode};
pub use store::DataStore;
pub use strings::{StringId, StringTable};
pub use warnings::{ParseWarning, WarningKind};
pub use worker::{ParseWorker, WorkerEvent};

pub use ifc_graph_core::{IfcType, ScanMode, SchemaVersion};
