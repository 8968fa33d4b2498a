// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Property sets and quantity sets
//!
//! Two strategies implement [`PropertySource`]:
//!
//! - [`EagerProperties`] reads every linked definition during the parse.
//! - [`OnDemandProperties`] keeps owner → definition ids and reads the
//!   definitions of an owner the first time it is queried.
//!
//! Both read definitions with the same functions and keep definitions in the
//! order their `IfcRelDefinesByProperties` records appear, so they return
//! identical answers.

mod eager;
mod on_demand;
mod read;

use std::fmt;

use ifc_graph_core::{AttributeValue, Logical};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::config::PropertyMode;
use crate::relationships::{RelationEdge, RelationType};

pub use eager::EagerProperties;
pub use on_demand::OnDemandProperties;
pub use read::{read_definition, Definition};

/// Owner id → definition ids, in relationship order
pub type OwnerLinks = FxHashMap<u32, SmallVec<[u32; 4]>>;

/// Collect owner links from `DefinesByProperties` edges
pub fn owner_links(edges: &[RelationEdge]) -> OwnerLinks {
    let mut links = OwnerLinks::default();
    for edge in edges
        .iter()
        .filter(|e| e.relation == RelationType::DefinesByProperties)
    {
        let defs = links.entry(edge.target).or_default();
        if !defs.contains(&edge.source) {
            defs.push(edge.source);
        }
    }
    links
}

/// A property or quantity value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Enum(String),
    Reference(u32),
    List(Vec<PropertyValue>),
    Bounded {
        lower: Box<PropertyValue>,
        upper: Box<PropertyValue>,
        set_point: Box<PropertyValue>,
    },
    Table {
        defining: Vec<PropertyValue>,
        defined: Vec<PropertyValue>,
    },
    Complex(Vec<Property>),
}

impl PropertyValue {
    /// Numeric view
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Integer(i) => Some(*i as f64),
            PropertyValue::Real(f) => Some(*f),
            _ => None,
        }
    }

    /// Textual view of text and enumeration values
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) | PropertyValue::Enum(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }
}

impl From<&AttributeValue> for PropertyValue {
    fn from(value: &AttributeValue) -> Self {
        match value {
            AttributeValue::Null | AttributeValue::Derived => PropertyValue::Null,
            AttributeValue::Integer(i) => PropertyValue::Integer(*i),
            AttributeValue::Real(f) => PropertyValue::Real(*f),
            AttributeValue::String(s) => PropertyValue::Text(s.clone()),
            AttributeValue::Enum(s) => PropertyValue::Enum(s.clone()),
            AttributeValue::Logical(Logical::True) => PropertyValue::Boolean(true),
            AttributeValue::Logical(Logical::False) => PropertyValue::Boolean(false),
            AttributeValue::Logical(Logical::Unknown) => PropertyValue::Null,
            AttributeValue::Ref(id) => PropertyValue::Reference(*id),
            AttributeValue::List(items) => {
                PropertyValue::List(items.iter().map(PropertyValue::from).collect())
            }
            AttributeValue::Typed(_, inner) => PropertyValue::from(inner.as_ref()),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::Text(s.to_string())
    }
}

impl From<f64> for PropertyValue {
    fn from(f: f64) -> Self {
        PropertyValue::Real(f)
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Integer(i)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Boolean(b)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Null => f.write_str("null"),
            PropertyValue::Boolean(b) => write!(f, "{}", b),
            PropertyValue::Integer(i) => write!(f, "{}", i),
            PropertyValue::Real(r) => write!(f, "{}", r),
            PropertyValue::Text(s) => f.write_str(s),
            PropertyValue::Enum(s) => write!(f, ".{}.", s),
            PropertyValue::Reference(id) => write!(f, "#{}", id),
            PropertyValue::List(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str(")")
            }
            PropertyValue::Bounded { lower, upper, .. } => write!(f, "[{} .. {}]", lower, upper),
            PropertyValue::Table { defining, .. } => write!(f, "table({} rows)", defining.len()),
            PropertyValue::Complex(props) => write!(f, "complex({} properties)", props.len()),
        }
    }
}

/// Kind of property entity a value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    SingleValue,
    EnumeratedValue,
    BoundedValue,
    ListValue,
    TableValue,
    Complex,
}

/// A named property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub kind: PropertyKind,
    pub value: PropertyValue,
    /// Unit entity reference, when given
    pub unit: Option<u32>,
}

/// IfcPropertySet with its properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySet {
    pub id: u32,
    pub name: String,
    pub description: Option<String>,
    pub properties: Vec<Property>,
}

impl PropertySet {
    /// Property by exact name
    pub fn get(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// Physical quantity kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantityKind {
    Length,
    Area,
    Volume,
    Count,
    Weight,
    Time,
}

impl QuantityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            QuantityKind::Length => "length",
            QuantityKind::Area => "area",
            QuantityKind::Volume => "volume",
            QuantityKind::Count => "count",
            QuantityKind::Weight => "weight",
            QuantityKind::Time => "time",
        }
    }
}

/// A named quantity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub name: String,
    pub kind: QuantityKind,
    pub value: f64,
    pub unit: Option<u32>,
}

/// IfcElementQuantity with its quantities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantitySet {
    pub id: u32,
    pub name: String,
    pub method_of_measurement: Option<String>,
    pub quantities: Vec<Quantity>,
}

impl QuantitySet {
    /// Quantity by exact name
    pub fn get(&self, name: &str) -> Option<&Quantity> {
        self.quantities.iter().find(|q| q.name == name)
    }
}

/// Property and quantity lookups for an entity
pub trait PropertySource: Send + Sync {
    /// Strategy behind this source
    fn mode(&self) -> PropertyMode;

    /// Property sets attached to an entity, in relationship order
    fn get_for_entity(&self, id: u32) -> Vec<PropertySet>;

    /// Quantity sets attached to an entity, in relationship order
    fn get_quantities_for_entity(&self, id: u32) -> Vec<QuantitySet>;

    /// Value of one property; the first set with a matching name wins
    fn get_property_value(&self, id: u32, pset: &str, prop: &str) -> Option<PropertyValue> {
        self.get_for_entity(id)
            .into_iter()
            .filter(|set| set.name == pset)
            .find_map(|set| set.get(prop).map(|p| p.value.clone()))
    }

    /// Value of one quantity; the first set with a matching name wins
    fn get_quantity_value(&self, id: u32, qset: &str, quantity: &str) -> Option<f64> {
        self.get_quantities_for_entity(id)
            .into_iter()
            .filter(|set| set.name == qset)
            .find_map(|set| set.get(quantity).map(|q| q.value))
    }

    /// Entities that have at least one definition attached
    fn owner_count(&self) -> usize;
}
