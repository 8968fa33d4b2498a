// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Relationship graph: forward and inverse adjacency per relation type.
//!
//! Every edge is written to both tables in the same call, so
//! `b ∈ edges(a, r, Forward)` exactly when `a ∈ edges(b, r, Inverse)`.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::relationships::{RelationEdge, RelationType};

/// Edge direction relative to the queried entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Relating → related
    Forward,
    /// Related → relating
    Inverse,
}

impl Direction {
    pub fn reverse(self) -> Self {
        match self {
            Direction::Forward => Direction::Inverse,
            Direction::Inverse => Direction::Forward,
        }
    }
}

type Adjacency = FxHashMap<u32, SmallVec<[u32; 4]>>;

/// Typed adjacency lists
#[derive(Debug, Clone)]
pub struct RelationshipGraph {
    forward: Vec<Adjacency>,
    inverse: Vec<Adjacency>,
    edge_count: usize,
}

impl Default for RelationshipGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl RelationshipGraph {
    pub fn new() -> Self {
        Self {
            forward: vec![Adjacency::default(); RelationType::COUNT],
            inverse: vec![Adjacency::default(); RelationType::COUNT],
            edge_count: 0,
        }
    }

    /// Build from a sequence of edges, keeping their order per entity
    pub fn from_edges(edges: impl IntoIterator<Item = RelationEdge>) -> Self {
        let mut graph = Self::new();
        for edge in edges {
            graph.add_edge(edge);
        }
        graph
    }

    /// Record an edge in both directions
    pub fn add_edge(&mut self, edge: RelationEdge) {
        let r = edge.relation.index();
        self.forward[r].entry(edge.source).or_default().push(edge.target);
        self.inverse[r].entry(edge.target).or_default().push(edge.source);
        self.edge_count += 1;
    }

    /// Neighbours of `id` along one relation type
    pub fn get_edges(&self, id: u32, relation: RelationType, direction: Direction) -> &[u32] {
        let table = match direction {
            Direction::Forward => &self.forward[relation.index()],
            Direction::Inverse => &self.inverse[relation.index()],
        };
        table.get(&id).map(|ids| ids.as_slice()).unwrap_or(&[])
    }

    /// First neighbour along a relation, for relations with a single relating end
    pub fn get_one(&self, id: u32, relation: RelationType, direction: Direction) -> Option<u32> {
        self.get_edges(id, relation, direction).first().copied()
    }

    /// Union of neighbours across every relation type, without duplicates
    pub fn get_related(&self, id: u32, direction: Direction) -> Vec<u32> {
        let mut seen = FxHashSet::default();
        RelationType::ALL
            .iter()
            .flat_map(|&relation| self.get_edges(id, relation, direction))
            .copied()
            .filter(|&other| seen.insert(other))
            .collect()
    }

    /// Whether the exact edge exists
    pub fn has_edge(&self, source: u32, relation: RelationType, target: u32) -> bool {
        self.get_edges(source, relation, Direction::Forward).contains(&target)
    }

    /// Every edge of one relation type (source order per source entity)
    pub fn edges(&self, relation: RelationType) -> impl Iterator<Item = RelationEdge> + '_ {
        self.forward[relation.index()]
            .iter()
            .flat_map(move |(&source, targets)| {
                targets.iter().map(move |&target| RelationEdge {
                    source,
                    relation,
                    target,
                })
            })
    }

    /// Number of edges of one relation type
    pub fn relation_count(&self, relation: RelationType) -> usize {
        self.forward[relation.index()].values().map(|t| t.len()).sum()
    }

    /// Total number of edges
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.edge_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(source: u32, relation: RelationType, target: u32) -> RelationEdge {
        RelationEdge {
            source,
            relation,
            target,
        }
    }

    fn sample() -> RelationshipGraph {
        RelationshipGraph::from_edges([
            edge(1, RelationType::Aggregates, 2),
            edge(2, RelationType::Aggregates, 3),
            edge(3, RelationType::ContainsElements, 10),
            edge(3, RelationType::ContainsElements, 11),
            edge(10, RelationType::VoidsElement, 20),
            edge(20, RelationType::FillsElement, 11),
            edge(50, RelationType::DefinesByProperties, 10),
            edge(50, RelationType::DefinesByProperties, 11),
        ])
    }

    #[test]
    fn test_forward_and_inverse() {
        let graph = sample();
        assert_eq!(graph.get_edges(3, RelationType::ContainsElements, Direction::Forward), &[10, 11]);
        assert_eq!(graph.get_edges(10, RelationType::ContainsElements, Direction::Inverse), &[3]);
        assert_eq!(graph.get_one(2, RelationType::Aggregates, Direction::Inverse), Some(1));
        assert!(graph.get_edges(10, RelationType::Aggregates, Direction::Forward).is_empty());
        assert!(graph.has_edge(10, RelationType::VoidsElement, 20));
        assert!(!graph.has_edge(20, RelationType::VoidsElement, 10));
        assert_eq!(graph.edge_count(), 8);
        assert_eq!(graph.relation_count(RelationType::DefinesByProperties), 2);
    }

    #[test]
    fn test_symmetry() {
        let graph = sample();
        for relation in RelationType::ALL {
            for e in graph.edges(relation) {
                assert!(graph
                    .get_edges(e.target, relation, Direction::Inverse)
                    .contains(&e.source));
            }
            for (&target, sources) in &graph.inverse[relation.index()] {
                for &source in sources {
                    assert!(graph.get_edges(source, relation, Direction::Forward).contains(&target));
                }
            }
        }
    }

    #[test]
    fn test_get_related_unions_relations() {
        let graph = sample();
        let mut related = graph.get_related(11, Direction::Inverse);
        related.sort_unstable();
        assert_eq!(related, vec![3, 20, 50]);
        assert_eq!(graph.get_related(10, Direction::Forward), vec![20]);
        assert!(graph.get_related(999, Direction::Forward).is_empty());
    }
}
