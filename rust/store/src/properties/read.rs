// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reading property and quantity definitions from extracted entities.

use ifc_graph_core::{AttributeValue, EntityExtractor, ExtractedEntity, IfcType};
use rustc_hash::FxHashSet;

use super::{
    Property, PropertyKind, PropertySet, PropertyValue, Quantity, QuantityKind, QuantitySet,
};

/// A definition attached through IfcRelDefinesByProperties
#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    Properties(PropertySet),
    Quantities(QuantitySet),
}

/// Read a property set or quantity set by id; other types yield `None`
pub fn read_definition(extractor: &EntityExtractor<'_>, id: u32) -> Option<Definition> {
    let entity = extractor.extract_by_id(id)?;
    match entity.ifc_type? {
        IfcType::IfcPropertySet => Some(Definition::Properties(read_property_set(
            extractor, &entity,
        ))),
        IfcType::IfcElementQuantity => Some(Definition::Quantities(read_quantity_set(
            extractor, &entity,
        ))),
        _ => None,
    }
}

/// IfcPropertySet: [2]=Name, [3]=Description, [4]=HasProperties
fn read_property_set(extractor: &EntityExtractor<'_>, entity: &ExtractedEntity) -> PropertySet {
    let mut visited = FxHashSet::default();
    visited.insert(entity.id);
    PropertySet {
        id: entity.id,
        name: entity.get_string(2).unwrap_or_default().to_string(),
        description: entity.get_string(3).map(str::to_string),
        properties: read_properties(extractor, entity.get(4), &mut visited),
    }
}

fn read_properties(
    extractor: &EntityExtractor<'_>,
    list: Option<&AttributeValue>,
    visited: &mut FxHashSet<u32>,
) -> Vec<Property> {
    list.and_then(AttributeValue::as_ref_list)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|id| {
            // A property referenced twice (or a complex property containing itself) is read once
            if !visited.insert(id) {
                return None;
            }
            let entity = extractor.extract_by_id(id)?;
            read_property(extractor, &entity, visited)
        })
        .collect()
}

/// All IfcProperty subtypes: [0]=Name, [1]=Description, then kind-specific values
fn read_property(
    extractor: &EntityExtractor<'_>,
    entity: &ExtractedEntity,
    visited: &mut FxHashSet<u32>,
) -> Option<Property> {
    let name = entity.get_string(0)?.to_string();
    let value_at = |i: usize| entity.get(i).map(PropertyValue::from).unwrap_or(PropertyValue::Null);
    let list_at = |i: usize| match entity.get(i).map(PropertyValue::from) {
        Some(PropertyValue::List(items)) => items,
        Some(PropertyValue::Null) | None => Vec::new(),
        Some(single) => vec![single],
    };

    let (kind, value, unit) = match entity.ifc_type? {
        // [2]=NominalValue, [3]=Unit
        IfcType::IfcPropertySingleValue => {
            (PropertyKind::SingleValue, value_at(2), entity.get_ref(3))
        }
        // [2]=EnumerationValues, [3]=EnumerationReference
        IfcType::IfcPropertyEnumeratedValue => (
            PropertyKind::EnumeratedValue,
            PropertyValue::List(list_at(2)),
            None,
        ),
        // [2]=UpperBoundValue, [3]=LowerBoundValue, [4]=Unit, [5]=SetPointValue
        IfcType::IfcPropertyBoundedValue => (
            PropertyKind::BoundedValue,
            PropertyValue::Bounded {
                lower: Box::new(value_at(3)),
                upper: Box::new(value_at(2)),
                set_point: Box::new(value_at(5)),
            },
            entity.get_ref(4),
        ),
        // [2]=ListValues, [3]=Unit
        IfcType::IfcPropertyListValue => (
            PropertyKind::ListValue,
            PropertyValue::List(list_at(2)),
            entity.get_ref(3),
        ),
        // [2]=DefiningValues, [3]=DefinedValues
        IfcType::IfcPropertyTableValue => (
            PropertyKind::TableValue,
            PropertyValue::Table {
                defining: list_at(2),
                defined: list_at(3),
            },
            None,
        ),
        // [2]=UsageName, [3]=HasProperties
        IfcType::IfcComplexProperty => (
            PropertyKind::Complex,
            PropertyValue::Complex(read_properties(extractor, entity.get(3), visited)),
            None,
        ),
        _ => return None,
    };

    Some(Property {
        name,
        kind,
        value,
        unit,
    })
}

/// IfcElementQuantity: [2]=Name, [4]=MethodOfMeasurement, [5]=Quantities
fn read_quantity_set(extractor: &EntityExtractor<'_>, entity: &ExtractedEntity) -> QuantitySet {
    let quantities = entity
        .get_refs(5)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|id| extractor.extract_by_id(id))
        .filter_map(|q| read_quantity(&q))
        .collect();

    QuantitySet {
        id: entity.id,
        name: entity.get_string(2).unwrap_or_default().to_string(),
        method_of_measurement: entity.get_string(4).map(str::to_string),
        quantities,
    }
}

/// IfcPhysicalSimpleQuantity: [0]=Name, [1]=Description, [2]=Unit, [3]=Value
fn read_quantity(entity: &ExtractedEntity) -> Option<Quantity> {
    let kind = match entity.ifc_type? {
        IfcType::IfcQuantityLength => QuantityKind::Length,
        IfcType::IfcQuantityArea => QuantityKind::Area,
        IfcType::IfcQuantityVolume => QuantityKind::Volume,
        IfcType::IfcQuantityCount => QuantityKind::Count,
        IfcType::IfcQuantityWeight => QuantityKind::Weight,
        IfcType::IfcQuantityTime => QuantityKind::Time,
        _ => return None,
    };

    Some(Quantity {
        name: entity.get_string(0)?.to_string(),
        kind,
        value: entity.get_float(3)?,
        unit: entity.get_ref(2),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifc_graph_core::{build_entity_index, ScanMode};

    const CONTENT: &str = r#"
#10=IFCPROPERTYSET('0aB3cD4eF5gH6iJ7kL8mN9',$,'Pset_WallCommon',$,(#11,#12,#13,#14,#15,#16));
#11=IFCPROPERTYSINGLEVALUE('IsExternal',$,IFCBOOLEAN(.T.),$);
#12=IFCPROPERTYSINGLEVALUE('FireRating',$,IFCLABEL('REI60'),$);
#13=IFCPROPERTYENUMERATEDVALUE('Status',$,(IFCLABEL('NEW')),$);
#14=IFCPROPERTYBOUNDEDVALUE('Range',$,IFCREAL(10.),IFCREAL(2.),#90,$);
#15=IFCPROPERTYTABLEVALUE('Curve',$,(IFCREAL(0.),IFCREAL(1.)),(IFCREAL(5.),IFCREAL(6.)),$,$,$);
#16=IFCCOMPLEXPROPERTY('Nested',$,'Usage',(#17,#16));
#17=IFCPROPERTYLISTVALUE('Layers',$,(IFCLABEL('a'),IFCLABEL('b')),$);
#20=IFCELEMENTQUANTITY('1aB3cD4eF5gH6iJ7kL8mN9',$,'Qto_WallBaseQuantities',$,'BaseQuantities',(#21,#22,#23));
#21=IFCQUANTITYLENGTH('Length',$,$,5000.,$);
#22=IFCQUANTITYVOLUME('NetVolume',$,$,2.5,$);
#23=IFCCARTESIANPOINT((0.,0.));
"#;

    fn with_extractor<T>(f: impl FnOnce(&EntityExtractor<'_>) -> T) -> T {
        let index = build_entity_index(CONTENT.as_bytes(), ScanMode::Strict);
        let extractor = EntityExtractor::new(CONTENT.as_bytes(), &index);
        f(&extractor)
    }

    #[test]
    fn test_read_property_set() {
        let Some(Definition::Properties(pset)) = with_extractor(|x| read_definition(x, 10)) else {
            panic!("expected a property set");
        };
        assert_eq!(pset.name, "Pset_WallCommon");
        assert_eq!(pset.properties.len(), 6);
        assert_eq!(pset.get("IsExternal").unwrap().value, PropertyValue::Boolean(true));
        assert_eq!(pset.get("FireRating").unwrap().value.as_text(), Some("REI60"));

        let status = pset.get("Status").unwrap();
        assert_eq!(status.kind, PropertyKind::EnumeratedValue);
        assert_eq!(status.value, PropertyValue::List(vec!["NEW".into()]));

        let range = pset.get("Range").unwrap();
        assert_eq!(range.unit, Some(90));
        assert_eq!(
            range.value,
            PropertyValue::Bounded {
                lower: Box::new(PropertyValue::Real(2.0)),
                upper: Box::new(PropertyValue::Real(10.0)),
                set_point: Box::new(PropertyValue::Null),
            }
        );

        let PropertyValue::Table { defining, defined } = &pset.get("Curve").unwrap().value else {
            panic!("expected a table");
        };
        assert_eq!(defining.len(), 2);
        assert_eq!(defined[1], PropertyValue::Real(6.0));
    }

    #[test]
    fn test_complex_property_cycle_is_cut() {
        let Some(Definition::Properties(pset)) = with_extractor(|x| read_definition(x, 10)) else {
            panic!("expected a property set");
        };
        let PropertyValue::Complex(inner) = &pset.get("Nested").unwrap().value else {
            panic!("expected a complex property");
        };
        assert_eq!(inner.len(), 1);
        assert_eq!(inner[0].name, "Layers");
        assert_eq!(inner[0].kind, PropertyKind::ListValue);
    }

    #[test]
    fn test_read_quantity_set() {
        let Some(Definition::Quantities(qset)) = with_extractor(|x| read_definition(x, 20)) else {
            panic!("expected a quantity set");
        };
        assert_eq!(qset.name, "Qto_WallBaseQuantities");
        assert_eq!(qset.method_of_measurement.as_deref(), Some("BaseQuantities"));
        assert_eq!(qset.quantities.len(), 2);
        assert_eq!(qset.get("Length").unwrap().value, 5000.0);
        assert_eq!(qset.get("NetVolume").unwrap().kind, QuantityKind::Volume);
    }

    #[test]
    fn test_other_types_are_not_definitions() {
        assert_eq!(with_extractor(|x| read_definition(x, 11)), None);
        assert_eq!(with_extractor(|x| read_definition(x, 999)), None);
    }
}
