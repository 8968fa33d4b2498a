// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use ifc_graph_store::{
    parse, CompareOp, DataStore, Direction, IfcType, MaterialKind, PropertyMode, PropertyValue,
    RelationType, ScanMode, SchemaVersion, StoreConfig,
};
use std::fs;
use std::path::PathBuf;

fn get_test_file() -> Vec<u8> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("ifc")
        .join("small_house.ifc");
    fs::read(&path).unwrap_or_else(|e| panic!("Test IFC file {} unreadable: {}", path.display(), e))
}

fn load(config: &StoreConfig) -> DataStore {
    parse(get_test_file(), config, |_| {}).expect("fixture parses")
}

fn ids(nodes: Vec<ifc_graph_store::EntityNode<'_>>) -> Vec<u32> {
    nodes.into_iter().map(|n| n.id()).collect()
}

#[test]
fn test_header_and_units() {
    let store = load(&StoreConfig::default());
    assert_eq!(store.schema(), &SchemaVersion::Ifc4);
    assert_eq!(store.header().file_name.as_deref(), Some("small_house.ifc"));
    assert_eq!(store.length_unit_scale(), 0.001);
    assert!(store.warnings().is_empty(), "{:?}", store.warnings());
    assert_eq!(store.entity_count(), 49);
    assert_eq!(store.record_count(), 49);
}

#[test]
fn test_identity_columns() {
    let store = load(&StoreConfig::default());
    assert_eq!(store.get_by_type(IfcType::IfcWall), &[30, 31, 32]);
    assert_eq!(store.get_by_type_name("ifcwall"), &[30, 31, 32]);
    assert_eq!(store.get_name(30), Some("Wall North"));
    assert_eq!(store.get_description(30), Some("External wall"));
    assert_eq!(store.get_object_type(31), Some("Basic Wall:200"));
    assert_eq!(store.get_global_id(30), Some("2O2Fr$t4X7Zf8NOew3FLOH"));
    assert_eq!(store.find_by_global_id("2O2Fr$t4X7Zf8NOew3FLOH"), Some(30));
    // Property definitions are not rooted objects' names
    assert_eq!(store.get_name(51), None);
    assert_eq!(store.ifc_type(35), Some(IfcType::IfcDoor));
}

#[test]
fn test_get_by_type_has_no_false_positives() {
    let store = load(&StoreConfig::default());
    for ty in IfcType::ALL {
        for &id in store.get_by_type(*ty) {
            assert_eq!(store.ifc_type(id), Some(*ty));
        }
    }
}

#[test]
fn test_graph_navigation() {
    let store = load(&StoreConfig::default());
    let wall = store.node(30).unwrap();
    assert_eq!(wall.contained_in().map(|n| n.id()), Some(12));
    assert_eq!(wall.storey().map(|n| n.id()), Some(12));
    assert_eq!(wall.building().map(|n| n.id()), Some(11));
    assert_eq!(ids(wall.openings()), vec![34]);
    assert_eq!(wall.defining_type().map(|n| n.id()), Some(37));

    let opening = store.node(34).unwrap();
    assert_eq!(opening.voids().map(|n| n.id()), Some(30));
    assert_eq!(ids(opening.filled_by()), vec![35]);
    assert_eq!(store.node(35).unwrap().fills().map(|n| n.id()), Some(34));

    let wall_type = store.node(37).unwrap();
    assert_eq!(ids(wall_type.instances()), vec![30, 31]);

    let building = store.node(11).unwrap();
    assert_eq!(ids(building.decomposes()), vec![12, 13]);
    assert_eq!(building.decomposed_by().map(|n| n.id()), Some(10));

    // Furniture in a space climbs space → storey through aggregation
    let table = store.node(36).unwrap();
    assert_eq!(table.storey().map(|n| n.id()), Some(12));
    assert_eq!(table.building().map(|n| n.id()), Some(11));

    let project = store.node(1).unwrap();
    assert!(project.storey().is_none());
    assert_eq!(
        ids(project.traverse(RelationType::Aggregates, 3, Direction::Forward)),
        vec![10, 11, 12, 13]
    );
    assert_eq!(
        ids(project.traverse(RelationType::Aggregates, 1, Direction::Forward)),
        vec![10]
    );
}

#[test]
fn test_graph_symmetry() {
    let store = load(&StoreConfig::default());
    let graph = store.graph();
    for relation in RelationType::ALL {
        for edge in graph.edges(relation) {
            assert!(graph
                .get_edges(edge.target, relation, Direction::Inverse)
                .contains(&edge.source));
        }
    }
    let mut around_wall = store.get_related(30, Direction::Inverse);
    around_wall.extend(store.get_related(30, Direction::Forward));
    for id in [12, 34, 37] {
        assert!(around_wall.contains(&id), "{} not related to #30", id);
    }
}

#[test]
fn test_spatial_hierarchy() {
    let store = load(&StoreConfig::default());
    let spatial = store.spatial();
    assert_eq!(spatial.project(), Some(1));
    assert_eq!(spatial.storeys(), vec![12, 13]);
    assert_eq!(spatial.node(13).unwrap().elevation, Some(3000.0));
    assert_eq!(spatial.by_storey(12), &[30, 31, 33, 35, 36]);
    assert_eq!(spatial.by_storey(13), &[32]);
    assert_eq!(spatial.by_space(14), &[36]);
    assert_eq!(spatial.by_building(11).len(), 6);
    assert_eq!(spatial.by_site(10).len(), 6);
    assert_eq!(spatial.element_to_storey(32), Some(13));
    assert_eq!(spatial.element_to_storey(34), None);
    assert_eq!(spatial.get_path(36), vec![1, 10, 11, 12, 14, 36]);
    assert_eq!(store.node(36).unwrap().spatial_path(), vec![1, 10, 11, 12, 14, 36]);
}

#[test]
fn test_properties_and_quantities() {
    let store = load(&StoreConfig::default());
    assert_eq!(
        store.get_property_value(30, "Pset_WallCommon", "FireRating"),
        Some(PropertyValue::Text("REI60".into()))
    );
    assert_eq!(
        store.get_property_value(32, "Pset_WallCommon", "FireRating"),
        Some(PropertyValue::Text("EI30".into()))
    );
    assert_eq!(
        store.get_property_value(30, "Pset_WallCommon", "ThermalTransmittance"),
        Some(PropertyValue::Real(0.24))
    );
    assert_eq!(store.get_quantity_value(30, "Qto_WallBaseQuantities", "Length"), Some(5000.0));
    assert_eq!(store.get_quantity_value(31, "Qto_WallBaseQuantities", "Length"), None);
    assert_eq!(store.get_for_entity(30).len(), 1);
    assert_eq!(store.get_quantities_for_entity(30).len(), 1);
    assert_eq!(store.properties().owner_count(), 3);
}

#[test]
fn test_eager_and_on_demand_agree() {
    let eager = load(&StoreConfig::default());
    let lazy = load(&StoreConfig::default().with_property_mode(PropertyMode::OnDemand));
    let uncached = load(
        &StoreConfig::default()
            .with_property_mode(PropertyMode::OnDemand)
            .with_on_demand_cache(false),
    );

    for &id in eager.entities().ids() {
        let expected = eager.get_for_entity(id);
        assert_eq!(expected, lazy.get_for_entity(id));
        assert_eq!(expected, uncached.get_for_entity(id));
        assert_eq!(
            eager.get_quantities_for_entity(id),
            lazy.get_quantities_for_entity(id)
        );
        for (pset, prop) in [("Pset_WallCommon", "IsExternal"), ("Pset_WallCommon", "FireRating")] {
            assert_eq!(
                eager.get_property_value(id, pset, prop),
                lazy.get_property_value(id, pset, prop)
            );
        }
    }
}

#[test]
fn test_materials_and_classifications() {
    let store = load(&StoreConfig::default());

    let direct = store.materials_of(30);
    assert_eq!(direct.len(), 1);
    assert_eq!(direct[0].kind, MaterialKind::LayerSetUsage);
    assert_eq!(direct[0].total_thickness(), Some(200.0));

    // Inherited from the wall type
    let inherited = store.materials_of(31);
    assert_eq!(inherited.len(), 1);
    assert_eq!(inherited[0].kind, MaterialKind::LayerSet);
    assert_eq!(inherited[0].components[0].material_name.as_deref(), Some("Concrete"));

    assert!(store.materials_of(33).is_empty());

    let classes = store.node(31).unwrap().classifications();
    assert_eq!(classes.len(), 1);
    assert_eq!(classes[0].identification.as_deref(), Some("EF_25_10"));
    assert_eq!(classes[0].system.as_deref(), Some("Uniclass"));
}

#[test]
fn test_queries() {
    let store = load(&StoreConfig::default());

    let external = store
        .query()
        .of_type(IfcType::IfcWall)
        .where_property("Pset_WallCommon", "IsExternal", CompareOp::Eq, true);
    assert_eq!(external.ids(), vec![30, 31]);
    assert_eq!(external.count(), 2);

    let union = store.query().of_type(IfcType::IfcSlab).of_type(IfcType::IfcWall);
    assert_eq!(union.ids(), vec![30, 31, 32, 33]);

    let paged = store.query().of_type(IfcType::IfcWall).offset(1).limit(1);
    assert_eq!(paged.ids(), vec![31]);
    assert_eq!(paged.first().map(|n| n.name()), Some(Some("Wall South")));

    let explicit = store.query().with_ids([33, 30, 999, 30]).of_type(IfcType::IfcWall);
    assert_eq!(explicit.ids(), vec![30]);

    let unknown = store.query().of_type_name("IFCNOTATYPE");
    assert_eq!(unknown.count(), 0);

    let nodes = store
        .query()
        .where_property("Pset_WallCommon", "FireRating", CompareOp::StartsWith, "REI")
        .execute();
    assert_eq!(ids(nodes), vec![30, 31]);

    assert_eq!(store.query().count(), store.entity_count());
}

#[test]
fn test_filters_commute() {
    let store = load(&StoreConfig::default());
    let a = ("Pset_WallCommon", "IsExternal", CompareOp::Ne, PropertyValue::Boolean(false));
    let b = ("Pset_WallCommon", "FireRating", CompareOp::Contains, PropertyValue::from("60"));

    let ab = store
        .query()
        .where_property(a.0, a.1, a.2, a.3.clone())
        .where_property(b.0, b.1, b.2, b.3.clone())
        .ids();
    let ba = store
        .query()
        .where_property(b.0, b.1, b.2, b.3)
        .where_property(a.0, a.1, a.2, a.3)
        .ids();
    assert_eq!(ab, ba);
    assert_eq!(ab, vec![30, 31]);
}

#[test]
fn test_fast_and_strict_build_the_same_store() {
    let strict = load(&StoreConfig::default());
    let fast = load(&StoreConfig::default().with_scan_mode(ScanMode::Fast));
    assert_eq!(strict.entities().ids(), fast.entities().ids());
    for &id in strict.entities().ids() {
        assert_eq!(strict.type_name(id), fast.type_name(id));
        assert_eq!(strict.get_name(id), fast.get_name(id));
    }
    assert_eq!(strict.graph().edge_count(), fast.graph().edge_count());
}

/// Top-level attribute count of a record, read straight from its bytes
fn count_attributes(record: &[u8]) -> usize {
    let open = record.iter().position(|&b| b == b'(').expect("record has a body");
    let mut depth = 0u32;
    let mut commas = 0;
    let mut in_string = false;
    let mut empty = true;
    let mut i = open;
    while i < record.len() {
        let b = record[i];
        if in_string {
            if b == b'\'' {
                if record.get(i + 1) == Some(&b'\'') {
                    i += 1;
                } else {
                    in_string = false;
                }
            }
        } else {
            match b {
                b'\'' => in_string = true,
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                b',' if depth == 1 => commas += 1,
                _ => {}
            }
        }
        if depth >= 1 && i > open && !b.is_ascii_whitespace() {
            empty = false;
        }
        i += 1;
    }
    if empty {
        0
    } else {
        commas + 1
    }
}

#[test]
fn test_every_record_extracts_its_full_attribute_list() {
    let store = load(&StoreConfig::default());
    let extractor = store.extractor();
    assert_eq!(store.index().records().len(), 49);
    for record in store.index().records() {
        let entity = extractor
            .try_extract(record)
            .unwrap_or_else(|e| panic!("#{} unreadable: {}", record.id, e));
        let expected = count_attributes(record.bytes(store.source()));
        assert_eq!(entity.len(), expected, "#{}", record.id);
    }
}

#[test]
fn test_storey_maps_match_tree_both_ways() {
    let store = load(&StoreConfig::default());
    let spatial = store.spatial();
    let nodes = spatial.nodes();
    let storeys = spatial.storeys();
    assert_eq!(storeys.len(), 2);

    for (arena, node) in nodes.iter().enumerate() {
        if node.ifc_type != IfcType::IfcBuildingStorey {
            continue;
        }
        let mut below = Vec::new();
        let mut stack = vec![arena];
        while let Some(i) = stack.pop() {
            below.extend_from_slice(&nodes[i].elements);
            stack.extend_from_slice(&nodes[i].children);
        }
        below.sort_unstable();

        let mut mapped = spatial.by_storey(node.id).to_vec();
        mapped.sort_unstable();

        for id in &mapped {
            assert!(below.contains(id), "#{} mapped to storey #{} but not in its tree", id, node.id);
        }
        for id in &below {
            assert!(mapped.contains(id), "#{} under storey #{} but not mapped", id, node.id);
            assert_eq!(spatial.element_to_storey(*id), Some(node.id));
        }
    }
    assert_eq!(spatial.by_storey(12), &[30, 31, 33, 35, 36]);
    assert_eq!(spatial.by_storey(13), &[32]);
}
