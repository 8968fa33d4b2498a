// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Read-only data store produced by [`parse`](crate::parse)

use std::fmt;
use std::sync::Arc;

use ifc_graph_core::{
    EntityExtractor, EntityIndex, ExtractedEntity, IfcType, SchemaVersion, StepHeader, TypeCode,
};

use crate::classifications::{read_classification, ClassificationInfo};
use crate::columnar::EntityTable;
use crate::config::StoreConfig;
use crate::graph::{Direction, RelationshipGraph};
use crate::materials::{read_material, MaterialInfo};
use crate::node::EntityNode;
use crate::properties::{PropertySet, PropertySource, PropertyValue, QuantitySet};
use crate::query::EntityQuery;
use crate::relationships::RelationType;
use crate::spatial::SpatialHierarchy;
use crate::warnings::ParseWarning;

/// Everything one parse produced. Immutable once built.
pub struct DataStore {
    pub(crate) source: Arc<[u8]>,
    pub(crate) index: Arc<EntityIndex>,
    pub(crate) entities: EntityTable,
    pub(crate) graph: RelationshipGraph,
    pub(crate) properties: Box<dyn PropertySource>,
    pub(crate) spatial: SpatialHierarchy,
    pub(crate) header: StepHeader,
    pub(crate) length_unit_scale: f64,
    pub(crate) warnings: Vec<ParseWarning>,
    pub(crate) config: StoreConfig,
}

impl DataStore {
    /// Rows in the columnar table (readable records)
    #[inline]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Records found by the scan, readable or not
    #[inline]
    pub fn record_count(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn contains(&self, id: u32) -> bool {
        self.entities.contains(id)
    }

    /// Source buffer
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    pub fn index(&self) -> &EntityIndex {
        &self.index
    }

    pub fn entities(&self) -> &EntityTable {
        &self.entities
    }

    pub fn graph(&self) -> &RelationshipGraph {
        &self.graph
    }

    pub fn properties(&self) -> &dyn PropertySource {
        self.properties.as_ref()
    }

    pub fn spatial(&self) -> &SpatialHierarchy {
        &self.spatial
    }

    pub fn header(&self) -> &StepHeader {
        &self.header
    }

    /// Schema named by `FILE_SCHEMA` (IFC2X3 when absent)
    pub fn schema(&self) -> &SchemaVersion {
        &self.header.schema
    }

    /// Factor from the project length unit to metres
    pub fn length_unit_scale(&self) -> f64 {
        self.length_unit_scale
    }

    /// Recoverable problems met during the parse, in source order
    pub fn warnings(&self) -> &[ParseWarning] {
        &self.warnings
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Extractor over the store's buffer and index
    pub fn extractor(&self) -> EntityExtractor<'_> {
        EntityExtractor::new(&self.source, &self.index)
    }

    // Identity lookups

    pub fn type_code(&self, id: u32) -> Option<TypeCode> {
        self.entities.type_code(id)
    }

    pub fn ifc_type(&self, id: u32) -> Option<IfcType> {
        self.type_code(id)
            .and_then(|code| self.index.registry().ifc_type(code))
    }

    pub fn type_name(&self, id: u32) -> Option<&str> {
        self.type_code(id)
            .and_then(|code| self.index.registry().name(code))
    }

    /// Ids of a schema type in source order
    pub fn get_by_type(&self, ty: IfcType) -> &[u32] {
        self.entities.get_by_type(ty.into())
    }

    /// Ids of any type name, including names outside the schema
    pub fn get_by_type_name(&self, type_name: &str) -> &[u32] {
        match self.index.registry().get(type_name) {
            Some(code) => self.entities.get_by_type(code),
            None => &[],
        }
    }

    /// Type names with their entity counts, most frequent first
    pub fn type_counts(&self) -> Vec<(&str, usize)> {
        let registry = self.index.registry();
        let mut counts: Vec<(&str, usize)> = self
            .entities
            .type_counts()
            .filter_map(|(code, n)| registry.name(code).map(|name| (name, n)))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        counts
    }

    pub fn get_name(&self, id: u32) -> Option<&str> {
        self.entities.get_name(id)
    }

    pub fn get_global_id(&self, id: u32) -> Option<&str> {
        self.entities.get_global_id(id)
    }

    pub fn get_description(&self, id: u32) -> Option<&str> {
        self.entities.get_description(id)
    }

    pub fn get_object_type(&self, id: u32) -> Option<&str> {
        self.entities.get_object_type(id)
    }

    pub fn find_by_global_id(&self, global_id: &str) -> Option<u32> {
        self.entities.find_by_global_id(global_id)
    }

    /// Full attribute list of an entity, parsed from its bytes
    pub fn get_entity(&self, id: u32) -> Option<ExtractedEntity> {
        if !self.contains(id) {
            return None;
        }
        self.extractor().extract_by_id(id)
    }

    // Properties and quantities

    pub fn get_for_entity(&self, id: u32) -> Vec<PropertySet> {
        self.properties.get_for_entity(id)
    }

    pub fn get_property_value(&self, id: u32, pset: &str, prop: &str) -> Option<PropertyValue> {
        self.properties.get_property_value(id, pset, prop)
    }

    pub fn get_quantities_for_entity(&self, id: u32) -> Vec<QuantitySet> {
        self.properties.get_quantities_for_entity(id)
    }

    pub fn get_quantity_value(&self, id: u32, qset: &str, quantity: &str) -> Option<f64> {
        self.properties.get_quantity_value(id, qset, quantity)
    }

    // Relationships

    pub fn get_edges(&self, id: u32, relation: RelationType, direction: Direction) -> &[u32] {
        self.graph.get_edges(id, relation, direction)
    }

    pub fn get_related(&self, id: u32, direction: Direction) -> Vec<u32> {
        self.graph.get_related(id, direction)
    }

    /// Materials associated with an entity, falling back to its type's
    pub fn materials_of(&self, id: u32) -> Vec<MaterialInfo> {
        let extractor = self.extractor();
        let read = |owner: u32| -> Vec<MaterialInfo> {
            self.graph
                .get_edges(owner, RelationType::AssociatesMaterial, Direction::Inverse)
                .iter()
                .filter_map(|&m| read_material(&extractor, m))
                .collect()
        };

        let direct = read(id);
        if !direct.is_empty() {
            return direct;
        }
        self.graph
            .get_one(id, RelationType::DefinesByType, Direction::Inverse)
            .map(read)
            .unwrap_or_default()
    }

    /// Classification references associated with an entity
    pub fn classifications_of(&self, id: u32) -> Vec<ClassificationInfo> {
        let extractor = self.extractor();
        self.graph
            .get_edges(id, RelationType::AssociatesClassification, Direction::Inverse)
            .iter()
            .filter_map(|&c| read_classification(&extractor, c))
            .collect()
    }

    // Query layer

    /// Start a query over every entity
    pub fn query(&self) -> EntityQuery<'_> {
        EntityQuery::new(self)
    }

    /// Node handle for graph navigation
    pub fn node(&self, id: u32) -> Option<EntityNode<'_>> {
        self.contains(id).then(|| EntityNode::new(self, id))
    }
}

impl fmt::Debug for DataStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataStore")
            .field("bytes", &self.source.len())
            .field("entities", &self.entities.len())
            .field("relationships", &self.graph.edge_count())
            .field("property_mode", &self.properties.mode())
            .field("spatial_nodes", &self.spatial.len())
            .field("schema", &self.header.schema)
            .field("warnings", &self.warnings.len())
            .finish()
    }
}
