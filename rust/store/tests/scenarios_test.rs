// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Small hand-written buffers covering recovery and edge cases

use ifc_graph_store::{
    parse, Error, IfcType, PropertyMode, ScanMode, StoreConfig, WarningKind,
};

fn step(data: &str) -> String {
    format!(
        "ISO-10303-21;\nHEADER;\nFILE_SCHEMA(('IFC2X3'));\nENDSEC;\nDATA;\n{}\nENDSEC;\nEND-ISO-10303-21;\n",
        data
    )
}

#[test]
fn test_project_site_aggregation() {
    let content = step(
        "#1=IFCPROJECT('g1',$,'P',$,$,$,$,$,$);\n\
         #2=IFCSITE('g2',$,'S',$,$,$,$,$,$,$);\n\
         #3=IFCRELAGGREGATES('r1',$,$,$,#1,(#2));",
    );
    for mode in [ScanMode::Strict, ScanMode::Fast] {
        let store = parse(content.as_bytes(), &StoreConfig::default().with_scan_mode(mode), |_| {})
            .unwrap();
        assert_eq!(store.record_count(), 3);
        assert_eq!(store.get_by_type_name("IFCSITE"), &[2]);
        assert_eq!(store.get_by_type(IfcType::IfcSite), &[2]);

        let project = store.node(1).unwrap();
        let parts: Vec<u32> = project.decomposes().iter().map(|n| n.id()).collect();
        assert_eq!(parts, vec![2]);
        assert_eq!(store.node(2).unwrap().decomposed_by(), Some(project));
        assert_eq!(store.get_name(1), Some("P"));
        assert_eq!(store.spatial().children_of(1), vec![2]);
    }
}

#[test]
fn test_unterminated_string_is_skipped_with_one_warning() {
    let content = step(
        "#1=IFCPROJECT('g1',$,'P',$,$,$,$,$,$);\n\
         #2=IFCWALL('broken,$,$,$,$,$,$,$);\n\
         #3=IFCSITE('g3',$,'S',$,$,$,$,$,$,$);",
    );
    let store = parse(content.as_bytes(), &StoreConfig::default(), |_| {}).unwrap();
    assert_eq!(store.record_count(), 3);
    assert_eq!(store.entity_count(), store.record_count() - 1);
    assert!(!store.contains(2));
    assert!(store.node(2).is_none());
    assert_eq!(store.get_name(3), Some("S"));

    let warnings = store.warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].kind, WarningKind::UnreadableEntity);
    assert_eq!(warnings[0].entity_id, 2);
}

#[test]
fn test_missing_entity_lookups_are_empty() {
    let content = step("#1=IFCPROJECT('g1',$,'P',$,$,$,$,$,$);");
    for mode in [PropertyMode::Eager, PropertyMode::OnDemand] {
        let store = parse(
            content.as_bytes(),
            &StoreConfig::default().with_property_mode(mode),
            |_| {},
        )
        .unwrap();
        assert_eq!(store.get_property_value(999, "Pset_X", "Y"), None);
        assert_eq!(store.get_quantity_value(999, "Qto_X", "Y"), None);
        assert!(store.get_for_entity(999).is_empty());
        assert!(store.materials_of(999).is_empty());
        assert!(store.node(999).is_none());
        assert!(store.get_name(999).is_none());
        assert!(store.spatial().get_path(999).is_empty());
    }
}

#[test]
fn test_unknown_types_kept_unless_strict() {
    let content = step(
        "#1=IFCPROJECT('g1',$,'P',$,$,$,$,$,$);\n\
         #2=IFCVENDORTHING('abc',1.5);",
    );
    let lenient = parse(content.as_bytes(), &StoreConfig::default(), |_| {}).unwrap();
    assert_eq!(lenient.entity_count(), 2);
    assert_eq!(lenient.type_name(2), Some("IFCVENDORTHING"));
    assert_eq!(lenient.ifc_type(2), None);
    assert_eq!(lenient.get_by_type_name("IfcVendorThing"), &[2]);
    assert!(lenient.warnings().is_empty());

    let strict = parse(
        content.as_bytes(),
        &StoreConfig::default().with_strict_types(true),
        |_| {},
    )
    .unwrap();
    assert_eq!(strict.entity_count(), 1);
    assert_eq!(strict.warnings().len(), 1);
    assert_eq!(strict.warnings()[0].kind, WarningKind::UnknownType);
}

#[test]
fn test_relationship_cycles_terminate() {
    // Two walls aggregating each other
    let content = step(
        "#1=IFCPROJECT('g1',$,'P',$,$,$,$,$,$);\n\
         #2=IFCWALL('g2',$,'A',$,$,$,$,$);\n\
         #3=IFCWALL('g3',$,'B',$,$,$,$,$);\n\
         #4=IFCRELAGGREGATES('r1',$,$,$,#2,(#3));\n\
         #5=IFCRELAGGREGATES('r2',$,$,$,#3,(#2));",
    );
    let store = parse(content.as_bytes(), &StoreConfig::default(), |_| {}).unwrap();
    let wall = store.node(2).unwrap();
    assert!(wall.storey().is_none());
    assert!(wall.building().is_none());
    let reached: Vec<u32> = wall
        .traverse(
            ifc_graph_store::RelationType::Aggregates,
            10,
            ifc_graph_store::Direction::Forward,
        )
        .iter()
        .map(|n| n.id())
        .collect();
    assert_eq!(reached, vec![3]);
}

#[test]
fn test_structural_failures() {
    let config = StoreConfig::default();
    assert!(matches!(
        parse(&b"  #1;  "[..], &config, |_| {}),
        Err(Error::Core(ifc_graph_core::Error::TooShort { .. }))
    ));
    assert!(matches!(
        parse(&b"this is certainly not a step file"[..], &config, |_| {}),
        Err(Error::Core(ifc_graph_core::Error::NotStepFormat(_)))
    ));

    // A marker with no records is an empty store, not an error
    let empty = parse(step("").as_bytes(), &config, |_| {}).unwrap();
    assert_eq!(empty.entity_count(), 0);
    assert!(empty.spatial().is_empty());
    assert_eq!(empty.length_unit_scale(), 1.0);
}

#[test]
fn test_header_path_with_comment_marker() {
    let content = "ISO-10303-21;\nHEADER;\nFILE_DESCRIPTION((''),'2;1');\n\
        FILE_NAME('C:/models/*.ifc','2024-01-01',(''),(''),'','','');\n\
        FILE_SCHEMA(('IFC4'));\nENDSEC;\nDATA;\n\
        #1=IFCPROJECT('g1',$,'P',$,$,$,$,$,$);\n\
        #2=IFCSITE('g2',$,'S',$,$,$,$,$,$,$);\n\
        ENDSEC;\nEND-ISO-10303-21;\n";
    for mode in [ScanMode::Strict, ScanMode::Fast] {
        let store = parse(content.as_bytes(), &StoreConfig::default().with_scan_mode(mode), |_| {})
            .unwrap();
        assert_eq!(store.record_count(), 2);
        assert_eq!(store.get_name(2), Some("S"));
        assert!(store.warnings().is_empty());
    }
}

#[test]
fn test_upper_half_escape_before_multibyte_text() {
    let content = step("#1=IFCPROJECT('g1',$,'P\\S\\äx',$,$,$,$,$,$);");
    let store = parse(content.as_bytes(), &StoreConfig::default(), |_| {}).unwrap();
    assert_eq!(store.get_name(1), Some("Päx"));
    assert!(store.warnings().is_empty());
}
