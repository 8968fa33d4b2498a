// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Relationship extraction
//!
//! Each objectified relationship type is described by a positional
//! [`RelationSpec`]: which attribute holds the relating entity, which holds
//! the related entity (or list), and the [`RelationType`] the edge gets. An
//! edge always points from relating to related.

use std::fmt;

use ifc_graph_core::{AttributeValue, ExtractedEntity, IfcType};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Edge label in the relationship graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    /// Whole → part (IfcRelAggregates)
    Aggregates,
    /// Host → nested object (IfcRelNests)
    Nests,
    /// Spatial structure → element (IfcRelContainedInSpatialStructure)
    ContainsElements,
    /// Spatial structure → referenced element
    ReferencedInSpatialStructure,
    /// Property set or quantity set → object
    DefinesByProperties,
    /// Type object → occurrence
    DefinesByType,
    /// Material definition → object
    AssociatesMaterial,
    /// Classification (reference) → object
    AssociatesClassification,
    /// Element → opening
    VoidsElement,
    /// Opening → filling element
    FillsElement,
    /// Element → connected element
    ConnectsElements,
    /// Wall → connected wall
    ConnectsPathElements,
    /// Space → bounding element
    SpaceBoundary,
    /// Group → member
    AssignsToGroup,
}

impl RelationType {
    pub const COUNT: usize = 14;

    pub const ALL: [RelationType; Self::COUNT] = [
        RelationType::Aggregates,
        RelationType::Nests,
        RelationType::ContainsElements,
        RelationType::ReferencedInSpatialStructure,
        RelationType::DefinesByProperties,
        RelationType::DefinesByType,
        RelationType::AssociatesMaterial,
        RelationType::AssociatesClassification,
        RelationType::VoidsElement,
        RelationType::FillsElement,
        RelationType::ConnectsElements,
        RelationType::ConnectsPathElements,
        RelationType::SpaceBoundary,
        RelationType::AssignsToGroup,
    ];

    /// Dense index for per-relation tables
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RelationType::Aggregates => "aggregates",
            RelationType::Nests => "nests",
            RelationType::ContainsElements => "contains_elements",
            RelationType::ReferencedInSpatialStructure => "referenced_in_spatial_structure",
            RelationType::DefinesByProperties => "defines_by_properties",
            RelationType::DefinesByType => "defines_by_type",
            RelationType::AssociatesMaterial => "associates_material",
            RelationType::AssociatesClassification => "associates_classification",
            RelationType::VoidsElement => "voids_element",
            RelationType::FillsElement => "fills_element",
            RelationType::ConnectsElements => "connects_elements",
            RelationType::ConnectsPathElements => "connects_path_elements",
            RelationType::SpaceBoundary => "space_boundary",
            RelationType::AssignsToGroup => "assigns_to_group",
        }
    }

    /// Relation described by an entity type, if it is a supported relationship
    pub fn from_ifc_type(ty: IfcType) -> Option<Self> {
        spec_for(ty).map(|spec| spec.relation)
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a relationship type keeps its two ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationSpec {
    pub ifc_type: IfcType,
    pub relation: RelationType,
    /// Attribute index of the relating entity reference
    pub relating: usize,
    /// Attribute index of the related entity reference(s)
    pub related: usize,
    /// Related attribute is a list
    pub related_is_list: bool,
}

const fn spec(
    ifc_type: IfcType,
    relation: RelationType,
    relating: usize,
    related: usize,
    related_is_list: bool,
) -> RelationSpec {
    RelationSpec {
        ifc_type,
        relation,
        relating,
        related,
        related_is_list,
    }
}

/// Positional layout of every supported relationship type
pub const RELATION_SPECS: &[RelationSpec] = &[
    spec(IfcType::IfcRelAggregates, RelationType::Aggregates, 4, 5, true),
    spec(IfcType::IfcRelNests, RelationType::Nests, 4, 5, true),
    spec(IfcType::IfcRelContainedInSpatialStructure, RelationType::ContainsElements, 5, 4, true),
    spec(
        IfcType::IfcRelReferencedInSpatialStructure,
        RelationType::ReferencedInSpatialStructure,
        5,
        4,
        true,
    ),
    spec(IfcType::IfcRelDefinesByProperties, RelationType::DefinesByProperties, 5, 4, true),
    spec(IfcType::IfcRelDefinesByType, RelationType::DefinesByType, 5, 4, true),
    spec(IfcType::IfcRelAssociatesMaterial, RelationType::AssociatesMaterial, 5, 4, true),
    spec(
        IfcType::IfcRelAssociatesClassification,
        RelationType::AssociatesClassification,
        5,
        4,
        true,
    ),
    spec(IfcType::IfcRelVoidsElement, RelationType::VoidsElement, 4, 5, false),
    spec(IfcType::IfcRelFillsElement, RelationType::FillsElement, 4, 5, false),
    spec(IfcType::IfcRelConnectsElements, RelationType::ConnectsElements, 5, 6, false),
    spec(IfcType::IfcRelConnectsPathElements, RelationType::ConnectsPathElements, 5, 6, false),
    spec(IfcType::IfcRelSpaceBoundary, RelationType::SpaceBoundary, 4, 5, false),
    spec(IfcType::IfcRelAssignsToGroup, RelationType::AssignsToGroup, 6, 4, true),
];

/// Spec for a relationship entity type
pub fn spec_for(ty: IfcType) -> Option<&'static RelationSpec> {
    RELATION_SPECS.iter().find(|spec| spec.ifc_type == ty)
}

/// One directed edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationEdge {
    pub source: u32,
    pub relation: RelationType,
    pub target: u32,
}

/// Why a relationship record produced no edges
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    MissingRelating,
    MissingRelated,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::MissingRelating => f.write_str("relating attribute is not an entity reference"),
            DropReason::MissingRelated => f.write_str("related attribute holds no entity reference"),
        }
    }
}

/// Edges of one relationship record, relating → each related entity
pub fn extract_edges(
    entity: &ExtractedEntity,
    spec: &RelationSpec,
) -> Result<SmallVec<[RelationEdge; 4]>, DropReason> {
    let source = entity
        .get_ref(spec.relating)
        .ok_or(DropReason::MissingRelating)?;

    let targets: SmallVec<[u32; 4]> = match entity.get(spec.related) {
        Some(AttributeValue::List(items)) if spec.related_is_list => {
            items.iter().filter_map(AttributeValue::as_ref_id).collect()
        }
        Some(AttributeValue::Ref(id)) => SmallVec::from_slice(&[*id]),
        _ => return Err(DropReason::MissingRelated),
    };

    Ok(targets
        .into_iter()
        .map(|target| RelationEdge {
            source,
            relation: spec.relation,
            target,
        })
        .collect())
}
