// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Property sets read on first query

use std::sync::Arc;

use ifc_graph_core::{EntityExtractor, EntityIndex};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::{read_definition, Definition, OwnerLinks, PropertySet, PropertySource, QuantitySet};
use crate::config::PropertyMode;

/// Definitions of one owner, in relationship order
#[derive(Debug, Default)]
struct OwnerDefinitions {
    property_sets: Vec<PropertySet>,
    quantity_sets: Vec<QuantitySet>,
}

/// Owner → definition ids; the definitions stay as bytes in the source
/// buffer until an owner is queried
pub struct OnDemandProperties {
    source: Arc<[u8]>,
    index: Arc<EntityIndex>,
    owners: OwnerLinks,
    cache: Option<RwLock<FxHashMap<u32, Arc<OwnerDefinitions>>>>,
}

impl OnDemandProperties {
    pub fn new(
        source: Arc<[u8]>,
        index: Arc<EntityIndex>,
        owners: OwnerLinks,
        cache: bool,
    ) -> Self {
        tracing::debug!(owners = owners.len(), cache, "Built on-demand property index");
        Self {
            source,
            index,
            owners,
            cache: cache.then(|| RwLock::new(FxHashMap::default())),
        }
    }

    /// Owners whose definitions are currently cached
    pub fn cached_owners(&self) -> usize {
        self.cache.as_ref().map(|c| c.read().len()).unwrap_or(0)
    }

    fn load(&self, id: u32) -> Arc<OwnerDefinitions> {
        let Some(definition_ids) = self.owners.get(&id) else {
            return Arc::default();
        };

        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.read().get(&id) {
                return Arc::clone(hit);
            }
        }

        let extractor = EntityExtractor::new(&self.source, &self.index);
        let mut loaded = OwnerDefinitions::default();
        for &def in definition_ids {
            match read_definition(&extractor, def) {
                Some(Definition::Properties(pset)) => loaded.property_sets.push(pset),
                Some(Definition::Quantities(qset)) => loaded.quantity_sets.push(qset),
                None => {}
            }
        }
        let loaded = Arc::new(loaded);

        if let Some(cache) = &self.cache {
            cache.write().insert(id, Arc::clone(&loaded));
        }
        loaded
    }
}

impl std::fmt::Debug for OnDemandProperties {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnDemandProperties")
            .field("owners", &self.owners.len())
            .field("cached_owners", &self.cached_owners())
            .finish()
    }
}

impl PropertySource for OnDemandProperties {
    fn mode(&self) -> PropertyMode {
        PropertyMode::OnDemand
    }

    fn get_for_entity(&self, id: u32) -> Vec<PropertySet> {
        self.load(id).property_sets.clone()
    }

    fn get_quantities_for_entity(&self, id: u32) -> Vec<QuantitySet> {
        self.load(id).quantity_sets.clone()
    }

    fn owner_count(&self) -> usize {
        self.owners.len()
    }
}
