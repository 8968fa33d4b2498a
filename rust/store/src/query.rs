// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fluent entity queries
//!
//! Execution order is fixed: candidates (explicit ids, a union of types, or
//! every entity) → property filters in declaration order → offset → limit →
//! materialization. `ids()` and `count()` stop before materialization.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use ifc_graph_core::{IfcType, TypeCode};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::node::EntityNode;
use crate::properties::PropertyValue;
use crate::store::DataStore;

/// Comparison applied by a property filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Contains,
    StartsWith,
}

impl CompareOp {
    pub fn as_str(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Contains => "contains",
            CompareOp::StartsWith => "startsWith",
        }
    }
}

impl FromStr for CompareOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "=" | "==" => Ok(CompareOp::Eq),
            "!=" => Ok(CompareOp::Ne),
            ">" => Ok(CompareOp::Gt),
            ">=" => Ok(CompareOp::Ge),
            "<" => Ok(CompareOp::Lt),
            "<=" => Ok(CompareOp::Le),
            "contains" => Ok(CompareOp::Contains),
            "startsWith" | "starts_with" => Ok(CompareOp::StartsWith),
            other => Err(format!("unknown operator '{}'", other)),
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order two values: numerically, textually, or by equality for the rest
fn order(actual: &PropertyValue, expected: &PropertyValue) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (actual.as_f64(), expected.as_f64()) {
        return a.partial_cmp(&b);
    }
    if let (Some(a), Some(b)) = (actual.as_text(), expected.as_text()) {
        return Some(a.cmp(b));
    }
    (actual == expected).then_some(Ordering::Equal)
}

/// Apply `op` to a property value and an operand
pub fn compare(actual: &PropertyValue, op: CompareOp, expected: &PropertyValue) -> bool {
    match op {
        CompareOp::Eq => order(actual, expected) == Some(Ordering::Equal),
        CompareOp::Ne => order(actual, expected) != Some(Ordering::Equal),
        CompareOp::Gt => order(actual, expected) == Some(Ordering::Greater),
        CompareOp::Ge => matches!(
            order(actual, expected),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        CompareOp::Lt => order(actual, expected) == Some(Ordering::Less),
        CompareOp::Le => matches!(
            order(actual, expected),
            Some(Ordering::Less | Ordering::Equal)
        ),
        CompareOp::Contains => match (actual.as_text(), expected.as_text()) {
            (Some(a), Some(b)) => a.contains(b),
            _ => actual.to_string().contains(&expected.to_string()),
        },
        CompareOp::StartsWith => match (actual.as_text(), expected.as_text()) {
            (Some(a), Some(b)) => a.starts_with(b),
            _ => actual.to_string().starts_with(&expected.to_string()),
        },
    }
}

/// One `(pset, prop, op, value)` predicate; an absent property never matches
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyFilter {
    pub pset: String,
    pub prop: String,
    pub op: CompareOp,
    pub value: PropertyValue,
}

impl PropertyFilter {
    fn matches(&self, store: &DataStore, id: u32) -> bool {
        store
            .get_property_value(id, &self.pset, &self.prop)
            .is_some_and(|actual| compare(&actual, self.op, &self.value))
    }
}

/// Query builder over a [`DataStore`]
#[derive(Debug, Clone)]
pub struct EntityQuery<'s> {
    store: &'s DataStore,
    ids: Option<Vec<u32>>,
    types: Option<Vec<TypeCode>>,
    filters: Vec<PropertyFilter>,
    offset: usize,
    limit: Option<usize>,
}

impl<'s> EntityQuery<'s> {
    /// Query over every entity
    pub fn new(store: &'s DataStore) -> Self {
        Self {
            store,
            ids: None,
            types: None,
            filters: Vec::new(),
            offset: 0,
            limit: None,
        }
    }

    /// Add a type to the candidate union
    pub fn of_type(mut self, ty: IfcType) -> Self {
        self.types.get_or_insert_with(Vec::new).push(ty.into());
        self
    }

    /// Add a type by name; a name absent from the file adds nothing
    pub fn of_type_name(mut self, type_name: &str) -> Self {
        let types = self.types.get_or_insert_with(Vec::new);
        if let Some(code) = self.store.index().registry().get(type_name) {
            types.push(code);
        }
        self
    }

    /// Start from explicit ids (kept in the given order)
    pub fn with_ids(mut self, ids: impl IntoIterator<Item = u32>) -> Self {
        self.ids = Some(ids.into_iter().collect());
        self
    }

    /// Keep entities whose property satisfies `op value`
    pub fn where_property(
        mut self,
        pset: impl Into<String>,
        prop: impl Into<String>,
        op: CompareOp,
        value: impl Into<PropertyValue>,
    ) -> Self {
        self.filters.push(PropertyFilter {
            pset: pset.into(),
            prop: prop.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn candidates(&self) -> Vec<u32> {
        let entities = self.store.entities();
        match (&self.ids, &self.types) {
            (Some(ids), types) => {
                let mut seen = FxHashSet::default();
                ids.iter()
                    .copied()
                    .filter(|&id| entities.contains(id) && seen.insert(id))
                    .filter(|&id| match types {
                        Some(types) => entities.type_code(id).is_some_and(|c| types.contains(&c)),
                        None => true,
                    })
                    .collect()
            }
            (None, Some(types)) => {
                let mut ids: Vec<u32> = types
                    .iter()
                    .collect::<FxHashSet<_>>()
                    .into_iter()
                    .flat_map(|&code| entities.get_by_type(code))
                    .copied()
                    .collect();
                ids.sort_unstable_by_key(|&id| entities.row_of(id));
                ids
            }
            (None, None) => entities.ids().to_vec(),
        }
    }

    /// Matching ids after filters, offset and limit
    pub fn ids(&self) -> Vec<u32> {
        let filtered = self
            .candidates()
            .into_iter()
            .filter(|&id| self.filters.iter().all(|f| f.matches(self.store, id)))
            .skip(self.offset);
        match self.limit {
            Some(limit) => filtered.take(limit).collect(),
            None => filtered.collect(),
        }
    }

    /// Number of matches, without building nodes
    pub fn count(&self) -> usize {
        self.ids().len()
    }

    /// Materialize the matches as nodes
    pub fn execute(&self) -> Vec<EntityNode<'s>> {
        self.ids()
            .into_iter()
            .map(|id| EntityNode::new(self.store, id))
            .collect()
    }

    /// First match
    pub fn first(&self) -> Option<EntityNode<'s>> {
        let mut first = self.clone();
        first.limit = Some(1);
        first.execute().into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_parsing() {
        for op in [
            CompareOp::Eq,
            CompareOp::Ne,
            CompareOp::Gt,
            CompareOp::Ge,
            CompareOp::Lt,
            CompareOp::Le,
            CompareOp::Contains,
            CompareOp::StartsWith,
        ] {
            assert_eq!(op.as_str().parse::<CompareOp>(), Ok(op));
        }
        assert!("~".parse::<CompareOp>().is_err());
    }

    #[test]
    fn test_numeric_comparisons() {
        let v = PropertyValue::Real(2.5);
        assert!(compare(&v, CompareOp::Gt, &PropertyValue::Integer(2)));
        assert!(compare(&v, CompareOp::Le, &2.5.into()));
        assert!(!compare(&v, CompareOp::Lt, &2.5.into()));
        assert!(compare(&v, CompareOp::Ne, &3.0.into()));
    }

    #[test]
    fn test_text_comparisons() {
        let v = PropertyValue::Text("REI60".into());
        assert!(compare(&v, CompareOp::Eq, &"REI60".into()));
        assert!(compare(&v, CompareOp::StartsWith, &"REI".into()));
        assert!(compare(&v, CompareOp::Contains, &"I6".into()));
        assert!(compare(&PropertyValue::Enum("NOTDEFINED".into()), CompareOp::Eq, &"NOTDEFINED".into()));
        assert!(!compare(&v, CompareOp::Gt, &1.0.into()));
    }

    #[test]
    fn test_enum_substring_matches_bare_token() {
        let v = PropertyValue::Enum("NOTDEFINED".into());
        assert!(compare(&v, CompareOp::StartsWith, &"NOT".into()));
        assert!(compare(&v, CompareOp::Contains, &"DEFINED".into()));
        assert!(!compare(&v, CompareOp::StartsWith, &".NOT".into()));
        assert!(compare(&PropertyValue::Real(12.5), CompareOp::StartsWith, &"12".into()));
    }

    #[test]
    fn test_boolean_equality() {
        let v = PropertyValue::Boolean(true);
        assert!(compare(&v, CompareOp::Eq, &true.into()));
        assert!(compare(&v, CompareOp::Ne, &false.into()));
        assert!(!compare(&v, CompareOp::Gt, &false.into()));
    }
}
