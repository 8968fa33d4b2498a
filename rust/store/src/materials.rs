// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Material definitions attached through IfcRelAssociatesMaterial

use ifc_graph_core::{EntityExtractor, ExtractedEntity, IfcType};
use serde::{Deserialize, Serialize};

/// Shape of a material definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialKind {
    Material,
    LayerSet,
    LayerSetUsage,
    List,
    ConstituentSet,
    ProfileSet,
    ProfileSetUsage,
}

/// One layer, constituent, profile or list entry
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MaterialComponent {
    /// IfcMaterial id
    pub material: Option<u32>,
    pub material_name: Option<String>,
    /// Name of the layer, constituent or profile itself
    pub name: Option<String>,
    pub thickness: Option<f64>,
    pub fraction: Option<f64>,
    pub category: Option<String>,
}

/// A material definition with its components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialInfo {
    pub id: u32,
    pub kind: MaterialKind,
    pub name: Option<String>,
    pub description: Option<String>,
    /// Empty for a single material
    pub components: Vec<MaterialComponent>,
}

impl MaterialInfo {
    /// Sum of layer thicknesses, when any layer has one
    pub fn total_thickness(&self) -> Option<f64> {
        let mut thicknesses = self.components.iter().filter_map(|c| c.thickness).peekable();
        thicknesses.peek()?;
        Some(thicknesses.sum())
    }
}

/// Read a material definition; usages resolve to the set they use
pub fn read_material(extractor: &EntityExtractor<'_>, id: u32) -> Option<MaterialInfo> {
    let entity = extractor.extract_by_id(id)?;
    let info = match entity.ifc_type? {
        // [0]=Name, [1]=Description, [2]=Category
        IfcType::IfcMaterial => MaterialInfo {
            id,
            kind: MaterialKind::Material,
            name: text(&entity, 0),
            description: text(&entity, 1),
            components: Vec::new(),
        },
        // [0]=MaterialLayers, [1]=LayerSetName, [2]=Description
        IfcType::IfcMaterialLayerSet => MaterialInfo {
            id,
            kind: MaterialKind::LayerSet,
            name: text(&entity, 1),
            description: text(&entity, 2),
            components: components(extractor, &entity, 0, read_layer),
        },
        // [0]=ForLayerSet
        IfcType::IfcMaterialLayerSetUsage => {
            let set = read_material(extractor, entity.get_ref(0)?)?;
            MaterialInfo {
                id,
                kind: MaterialKind::LayerSetUsage,
                ..set
            }
        }
        // [0]=Materials
        IfcType::IfcMaterialList => MaterialInfo {
            id,
            kind: MaterialKind::List,
            name: None,
            description: None,
            components: entity
                .get_refs(0)
                .unwrap_or_default()
                .into_iter()
                .map(|material| MaterialComponent {
                    material: Some(material),
                    material_name: material_name(extractor, material),
                    ..Default::default()
                })
                .collect(),
        },
        // [0]=Name, [1]=Description, [2]=MaterialConstituents
        IfcType::IfcMaterialConstituentSet => MaterialInfo {
            id,
            kind: MaterialKind::ConstituentSet,
            name: text(&entity, 0),
            description: text(&entity, 1),
            components: components(extractor, &entity, 2, read_constituent),
        },
        // [0]=Name, [1]=Description, [2]=MaterialProfiles
        IfcType::IfcMaterialProfileSet => MaterialInfo {
            id,
            kind: MaterialKind::ProfileSet,
            name: text(&entity, 0),
            description: text(&entity, 1),
            components: components(extractor, &entity, 2, read_profile),
        },
        // [0]=ForProfileSet
        IfcType::IfcMaterialProfileSetUsage => {
            let set = read_material(extractor, entity.get_ref(0)?)?;
            MaterialInfo {
                id,
                kind: MaterialKind::ProfileSetUsage,
                ..set
            }
        }
        _ => return None,
    };
    Some(info)
}

fn text(entity: &ExtractedEntity, index: usize) -> Option<String> {
    entity
        .get_string(index)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn material_name(extractor: &EntityExtractor<'_>, material: u32) -> Option<String> {
    extractor
        .extract_by_id(material)
        .filter(|m| m.ifc_type == Some(IfcType::IfcMaterial))
        .and_then(|m| text(&m, 0))
}

fn components(
    extractor: &EntityExtractor<'_>,
    entity: &ExtractedEntity,
    list: usize,
    read: fn(&EntityExtractor<'_>, &ExtractedEntity) -> MaterialComponent,
) -> Vec<MaterialComponent> {
    entity
        .get_refs(list)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|id| extractor.extract_by_id(id))
        .map(|part| read(extractor, &part))
        .collect()
}

/// IfcMaterialLayer: [0]=Material, [1]=LayerThickness, [2]=IsVentilated,
/// [3]=Name, [4]=Description, [5]=Category
fn read_layer(extractor: &EntityExtractor<'_>, layer: &ExtractedEntity) -> MaterialComponent {
    let material = layer.get_ref(0);
    MaterialComponent {
        material,
        material_name: material.and_then(|m| material_name(extractor, m)),
        name: text(layer, 3),
        thickness: layer.get_float(1),
        fraction: None,
        category: text(layer, 5),
    }
}

/// IfcMaterialConstituent: [0]=Name, [1]=Description, [2]=Material,
/// [3]=Fraction, [4]=Category
fn read_constituent(
    extractor: &EntityExtractor<'_>,
    constituent: &ExtractedEntity,
) -> MaterialComponent {
    let material = constituent.get_ref(2);
    MaterialComponent {
        material,
        material_name: material.and_then(|m| material_name(extractor, m)),
        name: text(constituent, 0),
        thickness: None,
        fraction: constituent.get_float(3),
        category: text(constituent, 4),
    }
}

/// IfcMaterialProfile: [0]=Name, [1]=Description, [2]=Material,
/// [3]=Profile, [4]=Priority, [5]=Category
fn read_profile(extractor: &EntityExtractor<'_>, profile: &ExtractedEntity) -> MaterialComponent {
    let material = profile.get_ref(2);
    MaterialComponent {
        material,
        material_name: material.and_then(|m| material_name(extractor, m)),
        name: text(profile, 0),
        thickness: None,
        fraction: None,
        category: text(profile, 5),
    }
}
