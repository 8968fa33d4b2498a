// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Spatial hierarchy - project → site → building → storey → space tree.
//!
//! Built by an iterative depth-first walk from the project over
//! `Aggregates` and `ContainsElements` edges. Nodes live in an arena and
//! refer to each other by index. The reverse maps (`by_storey`,
//! `by_building`, `by_site`, `by_space`, `element_to_storey`) are filled in
//! the same walk and never edited afterwards.

use ifc_graph_core::{EntityExtractor, EntityIndex, IfcType};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::columnar::EntityTable;
use crate::graph::{Direction, RelationshipGraph};
use crate::relationships::RelationType;

/// IfcBuildingStorey: [9]=Elevation (after ObjectPlacement, Representation,
/// LongName and CompositionType)
const ATTR_STOREY_ELEVATION: usize = 9;

/// A spatial structure element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialNode {
    pub id: u32,
    pub ifc_type: IfcType,
    pub name: Option<String>,
    /// Arena index of the parent node
    pub parent: Option<usize>,
    /// Arena indices of child spatial nodes
    pub children: Vec<usize>,
    /// Elements placed directly in this node
    pub elements: Vec<u32>,
    /// Storey elevation
    pub elevation: Option<f64>,
    /// Distance from the root (0 for the project)
    pub depth: u16,
}

/// Nearest enclosing spatial nodes of a given kind
#[derive(Debug, Clone, Copy, Default)]
struct Enclosing {
    site: Option<u32>,
    building: Option<u32>,
    storey: Option<u32>,
    space: Option<u32>,
}

impl Enclosing {
    fn enter(mut self, id: u32, ty: IfcType) -> Self {
        match ty {
            IfcType::IfcSite => self.site = Some(id),
            IfcType::IfcBuilding => self.building = Some(id),
            IfcType::IfcBuildingStorey => self.storey = Some(id),
            IfcType::IfcSpace => self.space = Some(id),
            _ => {}
        }
        self
    }
}

/// Arena tree with element lookups
#[derive(Debug, Clone, Default)]
pub struct SpatialHierarchy {
    nodes: Vec<SpatialNode>,
    node_of: FxHashMap<u32, usize>,
    element_container: FxHashMap<u32, usize>,
    by_storey: FxHashMap<u32, Vec<u32>>,
    by_building: FxHashMap<u32, Vec<u32>>,
    by_site: FxHashMap<u32, Vec<u32>>,
    by_space: FxHashMap<u32, Vec<u32>>,
    element_to_storey: FxHashMap<u32, u32>,
}

/// Inputs the walk reads from
pub(crate) struct SpatialSource<'s> {
    pub graph: &'s RelationshipGraph,
    pub index: &'s EntityIndex,
    pub table: &'s EntityTable,
    pub extractor: &'s EntityExtractor<'s>,
}

impl SpatialSource<'_> {
    fn spatial_type(&self, id: u32) -> Option<IfcType> {
        self.index.ifc_type(id).filter(IfcType::is_spatial)
    }

    fn elevation(&self, id: u32, ty: IfcType) -> Option<f64> {
        if ty != IfcType::IfcBuildingStorey {
            return None;
        }
        self.extractor
            .extract_by_id(id)
            .and_then(|storey| storey.get_float(ATTR_STOREY_ELEVATION))
    }
}

impl SpatialHierarchy {
    /// Walk from the first IfcProject; an empty hierarchy when there is none
    pub(crate) fn build(source: &SpatialSource<'_>) -> Self {
        let mut hierarchy = Self::default();
        let Some(&project) = source.index.ids_of(IfcType::IfcProject).first() else {
            tracing::debug!("No IfcProject; spatial hierarchy is empty");
            return hierarchy;
        };

        let mut visited = FxHashSet::default();
        let mut placed = FxHashSet::default();
        // (entity, parent arena index, depth, enclosing nodes above it)
        let mut stack = vec![(project, None::<usize>, 0u16, Enclosing::default())];

        while let Some((id, parent, depth, enclosing)) = stack.pop() {
            // A revisit means no further children
            if !visited.insert(id) {
                continue;
            }
            let Some(ty) = source.spatial_type(id) else {
                continue;
            };

            let arena = hierarchy.nodes.len();
            hierarchy.nodes.push(SpatialNode {
                id,
                ifc_type: ty,
                name: source.table.get_name(id).map(str::to_string),
                parent,
                children: Vec::new(),
                elements: Vec::new(),
                elevation: source.elevation(id, ty),
                depth,
            });
            hierarchy.node_of.insert(id, arena);
            if let Some(parent) = parent {
                hierarchy.nodes[parent].children.push(arena);
            }

            let enclosing = enclosing.enter(id, ty);
            let mut child_nodes = Vec::new();
            let mut elements = Vec::new();
            for &child in source
                .graph
                .get_edges(id, RelationType::Aggregates, Direction::Forward)
            {
                if source.spatial_type(child).is_some() {
                    child_nodes.push(child);
                } else {
                    elements.push(child);
                }
            }
            elements.extend_from_slice(source.graph.get_edges(
                id,
                RelationType::ContainsElements,
                Direction::Forward,
            ));

            for element in elements {
                if !placed.insert(element) {
                    continue;
                }
                hierarchy.place(source.graph, element, arena, enclosing, &mut placed);
            }

            // Reversed so children pop in relationship order
            for &child in child_nodes.iter().rev() {
                stack.push((child, Some(arena), depth.saturating_add(1), enclosing));
            }
        }

        tracing::debug!(
            nodes = hierarchy.nodes.len(),
            elements = hierarchy.element_container.len(),
            storeys = hierarchy.by_storey.len(),
            "Built spatial hierarchy"
        );
        hierarchy
    }

    /// Record an element and its aggregated parts under a node; parts are
    /// listed in the node's `elements` alongside their whole
    fn place(
        &mut self,
        graph: &RelationshipGraph,
        element: u32,
        arena: usize,
        enclosing: Enclosing,
        placed: &mut FxHashSet<u32>,
    ) {
        let mut pending = vec![element];
        while let Some(id) = pending.pop() {
            self.nodes[arena].elements.push(id);
            self.element_container.insert(id, arena);
            if let Some(storey) = enclosing.storey {
                self.by_storey.entry(storey).or_default().push(id);
                self.element_to_storey.insert(id, storey);
            }
            if let Some(building) = enclosing.building {
                self.by_building.entry(building).or_default().push(id);
            }
            if let Some(site) = enclosing.site {
                self.by_site.entry(site).or_default().push(id);
            }
            if let Some(space) = enclosing.space {
                self.by_space.entry(space).or_default().push(id);
            }

            let parts = graph.get_edges(id, RelationType::Aggregates, Direction::Forward);
            for &part in parts.iter().rev() {
                if placed.insert(part) {
                    pending.push(part);
                }
            }
        }
    }

    /// Root node (the project)
    pub fn root(&self) -> Option<&SpatialNode> {
        self.nodes.first()
    }

    /// Id of the project the walk started from
    pub fn project(&self) -> Option<u32> {
        self.root().map(|n| n.id)
    }

    /// All nodes in walk order (pre-order)
    pub fn nodes(&self) -> &[SpatialNode] {
        &self.nodes
    }

    /// Node of a spatial entity
    pub fn node(&self, id: u32) -> Option<&SpatialNode> {
        self.node_of.get(&id).map(|&i| &self.nodes[i])
    }

    /// Ids of a node's child spatial nodes
    pub fn children_of(&self, id: u32) -> Vec<u32> {
        self.node(id)
            .map(|n| n.children.iter().map(|&c| self.nodes[c].id).collect())
            .unwrap_or_default()
    }

    /// Spatial node an element was placed in
    pub fn container_of(&self, element: u32) -> Option<u32> {
        self.element_container
            .get(&element)
            .map(|&i| self.nodes[i].id)
    }

    /// Elements anywhere below a storey
    pub fn by_storey(&self, storey: u32) -> &[u32] {
        lookup(&self.by_storey, storey)
    }

    /// Elements anywhere below a building
    pub fn by_building(&self, building: u32) -> &[u32] {
        lookup(&self.by_building, building)
    }

    /// Elements anywhere below a site
    pub fn by_site(&self, site: u32) -> &[u32] {
        lookup(&self.by_site, site)
    }

    /// Elements anywhere below a space
    pub fn by_space(&self, space: u32) -> &[u32] {
        lookup(&self.by_space, space)
    }

    /// Nearest storey above an element
    pub fn element_to_storey(&self, element: u32) -> Option<u32> {
        self.element_to_storey.get(&element).copied()
    }

    /// Storey ids ordered by elevation (storeys without one last, in walk order)
    pub fn storeys(&self) -> Vec<u32> {
        let mut storeys: Vec<&SpatialNode> = self
            .nodes
            .iter()
            .filter(|n| n.ifc_type == IfcType::IfcBuildingStorey)
            .collect();
        storeys.sort_by(|a, b| match (a.elevation, b.elevation) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        storeys.into_iter().map(|n| n.id).collect()
    }

    /// Ids from the root down to `id` (a node or a placed element), empty when unplaced
    pub fn get_path(&self, id: u32) -> Vec<u32> {
        let (mut current, tail) = match (self.node_of.get(&id), self.element_container.get(&id)) {
            (Some(&node), _) => (Some(node), None),
            (None, Some(&container)) => (Some(container), Some(id)),
            (None, None) => return Vec::new(),
        };

        let mut path = Vec::new();
        while let Some(i) = current {
            path.push(self.nodes[i].id);
            current = self.nodes[i].parent;
        }
        path.reverse();
        path.extend(tail);
        path
    }

    /// Number of spatial nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

fn lookup(map: &FxHashMap<u32, Vec<u32>>, id: u32) -> &[u32] {
    map.get(&id).map(Vec::as_slice).unwrap_or(&[])
}
