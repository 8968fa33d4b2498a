// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Classification references attached through IfcRelAssociatesClassification

use ifc_graph_core::{EntityExtractor, ExtractedEntity, IfcType};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// A classification reference resolved up to its system
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassificationInfo {
    pub id: u32,
    /// Code within the system (`ItemReference` in IFC2X3)
    pub identification: Option<String>,
    pub name: Option<String>,
    pub location: Option<String>,
    /// Name of the owning IfcClassification
    pub system: Option<String>,
    pub edition: Option<String>,
    /// Identifications of enclosing references, outermost first
    pub parents: Vec<String>,
}

/// Read a classification reference or a bare classification
pub fn read_classification(extractor: &EntityExtractor<'_>, id: u32) -> Option<ClassificationInfo> {
    let entity = extractor.extract_by_id(id)?;
    match entity.ifc_type? {
        IfcType::IfcClassificationReference => Some(read_reference(extractor, &entity)),
        IfcType::IfcClassification => {
            let mut info = ClassificationInfo {
                id,
                ..Default::default()
            };
            apply_system(&mut info, &entity);
            Some(info)
        }
        _ => None,
    }
}

/// IfcClassificationReference: [0]=Location, [1]=Identification, [2]=Name,
/// [3]=ReferencedSource
fn read_reference(extractor: &EntityExtractor<'_>, entity: &ExtractedEntity) -> ClassificationInfo {
    let mut info = ClassificationInfo {
        id: entity.id,
        identification: text(entity, 1),
        name: text(entity, 2),
        location: text(entity, 0),
        ..Default::default()
    };

    let mut visited = FxHashSet::default();
    visited.insert(entity.id);
    let mut source = entity.get_ref(3);
    while let Some(id) = source {
        if !visited.insert(id) {
            tracing::debug!(reference = entity.id, "Classification source chain loops");
            break;
        }
        let Some(parent) = extractor.extract_by_id(id) else {
            break;
        };
        match parent.ifc_type {
            Some(IfcType::IfcClassificationReference) => {
                if let Some(code) = text(&parent, 1) {
                    info.parents.push(code);
                }
                source = parent.get_ref(3);
            }
            Some(IfcType::IfcClassification) => {
                apply_system(&mut info, &parent);
                break;
            }
            _ => break,
        }
    }

    info.parents.reverse();
    info
}

/// IfcClassification: [0]=Source, [1]=Edition, [2]=EditionDate, [3]=Name
fn apply_system(info: &mut ClassificationInfo, classification: &ExtractedEntity) {
    info.system = text(classification, 3);
    info.edition = text(classification, 1);
}

fn text(entity: &ExtractedEntity, index: usize) -> Option<String> {
    entity
        .get_string(index)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
