// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Property sets read up front

use ifc_graph_core::EntityExtractor;
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use super::{
    read_definition, Definition, OwnerLinks, PropertySet, PropertySource, QuantitySet,
};
use crate::config::PropertyMode;

/// Every linked definition, read during the parse
#[derive(Debug, Clone, Default)]
pub struct EagerProperties {
    property_sets: FxHashMap<u32, PropertySet>,
    quantity_sets: FxHashMap<u32, QuantitySet>,
    owners: OwnerLinks,
}

impl EagerProperties {
    /// Read each distinct definition referenced by `owners` once
    pub fn build(extractor: &EntityExtractor<'_>, owners: OwnerLinks, parallel: bool) -> Self {
        let mut definition_ids: Vec<u32> = owners.values().flatten().copied().collect();
        definition_ids.sort_unstable();
        definition_ids.dedup();

        let definitions: Vec<Definition> = if parallel {
            definition_ids
                .par_iter()
                .filter_map(|&id| read_definition(extractor, id))
                .collect()
        } else {
            definition_ids
                .iter()
                .filter_map(|&id| read_definition(extractor, id))
                .collect()
        };

        let mut property_sets = FxHashMap::default();
        let mut quantity_sets = FxHashMap::default();
        for definition in definitions {
            match definition {
                Definition::Properties(pset) => {
                    property_sets.insert(pset.id, pset);
                }
                Definition::Quantities(qset) => {
                    quantity_sets.insert(qset.id, qset);
                }
            }
        }

        tracing::debug!(
            owners = owners.len(),
            property_sets = property_sets.len(),
            quantity_sets = quantity_sets.len(),
            "Built eager property index"
        );

        Self {
            property_sets,
            quantity_sets,
            owners,
        }
    }

    /// Property set by its own id
    pub fn property_set(&self, id: u32) -> Option<&PropertySet> {
        self.property_sets.get(&id)
    }

    /// Quantity set by its own id
    pub fn quantity_set(&self, id: u32) -> Option<&QuantitySet> {
        self.quantity_sets.get(&id)
    }

    fn definitions_of(&self, id: u32) -> &[u32] {
        self.owners.get(&id).map(|d| d.as_slice()).unwrap_or(&[])
    }
}

impl PropertySource for EagerProperties {
    fn mode(&self) -> PropertyMode {
        PropertyMode::Eager
    }

    fn get_for_entity(&self, id: u32) -> Vec<PropertySet> {
        self.definitions_of(id)
            .iter()
            .filter_map(|def| self.property_sets.get(def).cloned())
            .collect()
    }

    fn get_quantities_for_entity(&self, id: u32) -> Vec<QuantitySet> {
        self.definitions_of(id)
            .iter()
            .filter_map(|def| self.quantity_sets.get(def).cloned())
            .collect()
    }

    fn owner_count(&self) -> usize {
        self.owners.len()
    }
}
