// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity handles with graph navigation

use std::fmt;

use ifc_graph_core::{ExtractedEntity, IfcType};
use rustc_hash::FxHashSet;

use crate::classifications::ClassificationInfo;
use crate::graph::Direction;
use crate::materials::MaterialInfo;
use crate::properties::{PropertySet, PropertyValue, QuantitySet};
use crate::relationships::RelationType;
use crate::store::DataStore;

/// A borrowed view of one entity in a [`DataStore`]
#[derive(Clone, Copy)]
pub struct EntityNode<'s> {
    store: &'s DataStore,
    id: u32,
}

impl<'s> EntityNode<'s> {
    pub(crate) fn new(store: &'s DataStore, id: u32) -> Self {
        Self { store, id }
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn ifc_type(&self) -> Option<IfcType> {
        self.store.ifc_type(self.id)
    }

    pub fn type_name(&self) -> Option<&'s str> {
        self.store.type_name(self.id)
    }

    pub fn name(&self) -> Option<&'s str> {
        self.store.get_name(self.id)
    }

    pub fn global_id(&self) -> Option<&'s str> {
        self.store.get_global_id(self.id)
    }

    pub fn description(&self) -> Option<&'s str> {
        self.store.get_description(self.id)
    }

    pub fn object_type(&self) -> Option<&'s str> {
        self.store.get_object_type(self.id)
    }

    /// All attributes, parsed from the record bytes
    pub fn attributes(&self) -> Option<ExtractedEntity> {
        self.store.get_entity(self.id)
    }

    pub fn property_sets(&self) -> Vec<PropertySet> {
        self.store.get_for_entity(self.id)
    }

    pub fn quantity_sets(&self) -> Vec<QuantitySet> {
        self.store.get_quantities_for_entity(self.id)
    }

    pub fn property(&self, pset: &str, prop: &str) -> Option<PropertyValue> {
        self.store.get_property_value(self.id, pset, prop)
    }

    pub fn quantity(&self, qset: &str, quantity: &str) -> Option<f64> {
        self.store.get_quantity_value(self.id, qset, quantity)
    }

    pub fn materials(&self) -> Vec<MaterialInfo> {
        self.store.materials_of(self.id)
    }

    pub fn classifications(&self) -> Vec<ClassificationInfo> {
        self.store.classifications_of(self.id)
    }

    fn wrap(&self, ids: &[u32]) -> Vec<EntityNode<'s>> {
        ids.iter()
            .map(|&id| EntityNode::new(self.store, id))
            .collect()
    }

    fn many(&self, relation: RelationType, direction: Direction) -> Vec<EntityNode<'s>> {
        self.wrap(self.store.graph.get_edges(self.id, relation, direction))
    }

    fn one(&self, relation: RelationType, direction: Direction) -> Option<EntityNode<'s>> {
        self.store
            .graph
            .get_one(self.id, relation, direction)
            .map(|id| EntityNode::new(self.store, id))
    }

    /// Neighbours along any relation type
    pub fn related(&self, relation: RelationType, direction: Direction) -> Vec<EntityNode<'s>> {
        self.many(relation, direction)
    }

    /// Elements held by this spatial container
    pub fn contains(&self) -> Vec<EntityNode<'s>> {
        self.many(RelationType::ContainsElements, Direction::Forward)
    }

    /// Spatial container holding this element
    pub fn contained_in(&self) -> Option<EntityNode<'s>> {
        self.one(RelationType::ContainsElements, Direction::Inverse)
    }

    /// Parts this entity aggregates
    pub fn decomposes(&self) -> Vec<EntityNode<'s>> {
        self.many(RelationType::Aggregates, Direction::Forward)
    }

    /// Whole this entity is a part of
    pub fn decomposed_by(&self) -> Option<EntityNode<'s>> {
        self.one(RelationType::Aggregates, Direction::Inverse)
    }

    /// Type object of this occurrence
    pub fn defining_type(&self) -> Option<EntityNode<'s>> {
        self.one(RelationType::DefinesByType, Direction::Inverse)
    }

    /// Occurrences of this type object
    pub fn instances(&self) -> Vec<EntityNode<'s>> {
        self.many(RelationType::DefinesByType, Direction::Forward)
    }

    /// Openings cut into this element
    pub fn openings(&self) -> Vec<EntityNode<'s>> {
        self.many(RelationType::VoidsElement, Direction::Forward)
    }

    /// Element this opening voids
    pub fn voids(&self) -> Option<EntityNode<'s>> {
        self.one(RelationType::VoidsElement, Direction::Inverse)
    }

    /// Elements (doors, windows) filling this opening
    pub fn filled_by(&self) -> Vec<EntityNode<'s>> {
        self.many(RelationType::FillsElement, Direction::Forward)
    }

    /// Opening this element fills
    pub fn fills(&self) -> Option<EntityNode<'s>> {
        self.one(RelationType::FillsElement, Direction::Inverse)
    }

    /// Breadth-first walk along one relation up to `depth` hops, excluding self
    pub fn traverse(
        &self,
        relation: RelationType,
        depth: usize,
        direction: Direction,
    ) -> Vec<EntityNode<'s>> {
        let mut visited = FxHashSet::default();
        visited.insert(self.id);
        let mut frontier = vec![self.id];
        let mut found = Vec::new();

        for _ in 0..depth {
            let mut next = Vec::new();
            for id in frontier {
                for &neighbour in self.store.graph.get_edges(id, relation, direction) {
                    if visited.insert(neighbour) {
                        next.push(neighbour);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            found.extend_from_slice(&next);
            frontier = next;
        }

        self.wrap(&found)
    }

    /// Spatial parent: the containing structure, else the aggregating whole
    fn parent(&self) -> Option<EntityNode<'s>> {
        self.contained_in().or_else(|| self.decomposed_by())
    }

    /// Nearest enclosing entity of a type, climbing containment then aggregation
    fn ancestor(&self, ty: IfcType) -> Option<EntityNode<'s>> {
        let mut visited = FxHashSet::default();
        visited.insert(self.id);
        let mut current = self.parent();
        while let Some(node) = current {
            if !visited.insert(node.id) {
                return None;
            }
            if node.ifc_type() == Some(ty) {
                return Some(node);
            }
            current = node.parent();
        }
        None
    }

    /// Storey above this entity
    pub fn storey(&self) -> Option<EntityNode<'s>> {
        self.ancestor(IfcType::IfcBuildingStorey)
    }

    /// Building above this entity
    pub fn building(&self) -> Option<EntityNode<'s>> {
        self.ancestor(IfcType::IfcBuilding)
    }

    /// Ids from the project down to this entity
    pub fn spatial_path(&self) -> Vec<u32> {
        self.store.spatial.get_path(self.id)
    }
}

impl PartialEq for EntityNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && std::ptr::eq(self.store, other.store)
    }
}

impl Eq for EntityNode<'_> {}

impl fmt::Debug for EntityNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityNode")
            .field("id", &self.id)
            .field("type", &self.type_name())
            .field("name", &self.name())
            .finish()
    }
}
