// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Project units
//!
//! Follows IFCPROJECT → IFCUNITASSIGNMENT → IFCSIUNIT (or
//! IFCCONVERSIONBASEDUNIT → IFCMEASUREWITHUNIT → IFCSIUNIT) and returns the
//! factor that converts values of a unit type to SI base units.

use ifc_graph_core::{EntityExtractor, ExtractedEntity, IfcType};
use rustc_hash::FxHashSet;

/// IfcProject: [8]=UnitsInContext
const ATTR_UNITS_IN_CONTEXT: usize = 8;

/// Type name of the conversion factor entity (not part of [`IfcType`])
const MEASURE_WITH_UNIT: &str = "IFCMEASUREWITHUNIT";

/// SI prefix multipliers as defined by IfcSIPrefix
#[inline]
pub fn si_prefix_multiplier(prefix: &str) -> f64 {
    match prefix {
        "ATTO" => 1e-18,
        "FEMTO" => 1e-15,
        "PICO" => 1e-12,
        "NANO" => 1e-9,
        "MICRO" => 1e-6,
        "MILLI" => 1e-3,
        "CENTI" => 1e-2,
        "DECI" => 1e-1,
        "DECA" => 1e1,
        "HECTO" => 1e2,
        "KILO" => 1e3,
        "MEGA" => 1e6,
        "GIGA" => 1e9,
        "TERA" => 1e12,
        "PETA" => 1e15,
        "EXA" => 1e18,
        _ => 1.0,
    }
}

/// Scale from the project's length unit to metres (1.0 when undeclared)
pub fn length_unit_scale(extractor: &EntityExtractor<'_>, project_id: u32) -> f64 {
    unit_scale(extractor, project_id, "LENGTHUNIT").unwrap_or(1.0)
}

/// Scale of the project unit with the given IfcUnitEnum value (e.g. `AREAUNIT`)
pub fn unit_scale(extractor: &EntityExtractor<'_>, project_id: u32, unit_type: &str) -> Option<f64> {
    let project = extractor.extract_by_id(project_id)?;
    if project.ifc_type != Some(IfcType::IfcProject) {
        return None;
    }

    let assignment = extractor.extract_by_id(project.get_ref(ATTR_UNITS_IN_CONTEXT)?)?;
    if assignment.ifc_type != Some(IfcType::IfcUnitAssignment) {
        return None;
    }

    // IfcUnitAssignment: [0]=Units
    assignment
        .get_refs(0)?
        .into_iter()
        .filter_map(|id| extractor.extract_by_id(id))
        .filter(|unit| unit.get_enum(1) == Some(unit_type))
        .find_map(|unit| scale_of(extractor, &unit, &mut FxHashSet::default()))
}

/// Scale of one named unit entity to SI base units
fn scale_of(
    extractor: &EntityExtractor<'_>,
    unit: &ExtractedEntity,
    visited: &mut FxHashSet<u32>,
) -> Option<f64> {
    if !visited.insert(unit.id) {
        return None;
    }

    match unit.ifc_type? {
        // IfcSIUnit: [0]=Dimensions, [1]=UnitType, [2]=Prefix, [3]=Name
        IfcType::IfcSIUnit => Some(unit.get_enum(2).map(si_prefix_multiplier).unwrap_or(1.0)),
        // IfcConversionBasedUnit: [0]=Dimensions, [1]=UnitType, [2]=Name, [3]=ConversionFactor
        IfcType::IfcConversionBasedUnit => {
            let factor = extractor.extract_by_id(unit.get_ref(3)?)?;
            let type_name = extractor.index().type_name(factor.id)?;
            if !type_name.eq_ignore_ascii_case(MEASURE_WITH_UNIT) {
                return None;
            }
            // IfcMeasureWithUnit: [0]=ValueComponent, [1]=UnitComponent
            let value = factor.get_float(0)?;
            let base = match factor.get_ref(1) {
                Some(id) => {
                    let base = extractor.extract_by_id(id)?;
                    scale_of(extractor, &base, visited)?
                }
                None => 1.0,
            };
            Some(value * base)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifc_graph_core::{build_entity_index, ScanMode};

    fn scale(content: &str, unit_type: &str) -> Option<f64> {
        let index = build_entity_index(content.as_bytes(), ScanMode::Strict);
        let extractor = EntityExtractor::new(content.as_bytes(), &index);
        unit_scale(&extractor, 1, unit_type)
    }

    #[test]
    fn test_si_prefix_multipliers() {
        assert_eq!(si_prefix_multiplier("MILLI"), 0.001);
        assert_eq!(si_prefix_multiplier("CENTI"), 0.01);
        assert_eq!(si_prefix_multiplier("KILO"), 1000.0);
        assert_eq!(si_prefix_multiplier(""), 1.0);
        assert_eq!(si_prefix_multiplier("UNKNOWN"), 1.0);
    }

    #[test]
    fn test_millimetre_project() {
        let content = r#"
#1=IFCPROJECT('0001Project0000000000a',$,'P',$,$,$,$,$,#2);
#2=IFCUNITASSIGNMENT((#3,#4));
#3=IFCSIUNIT(*,.AREAUNIT.,$,.SQUARE_METRE.);
#4=IFCSIUNIT(*,.LENGTHUNIT.,.MILLI.,.METRE.);
"#;
        assert_eq!(scale(content, "LENGTHUNIT"), Some(0.001));
        assert_eq!(scale(content, "AREAUNIT"), Some(1.0));
        assert_eq!(scale(content, "VOLUMEUNIT"), None);
    }

    #[test]
    fn test_conversion_based_unit() {
        let content = r#"
#1=IFCPROJECT('0001Project0000000000a',$,'P',$,$,$,$,$,#2);
#2=IFCUNITASSIGNMENT((#3));
#3=IFCCONVERSIONBASEDUNIT(#5,.LENGTHUNIT.,'FOOT',#4);
#4=IFCMEASUREWITHUNIT(IFCLENGTHMEASURE(0.3048),#6);
#5=IFCDIMENSIONALEXPONENTS(1,0,0,0,0,0,0);
#6=IFCSIUNIT(*,.LENGTHUNIT.,$,.METRE.);
"#;
        let feet = scale(content, "LENGTHUNIT").unwrap();
        assert!((feet - 0.3048).abs() < 1e-12);
    }

    #[test]
    fn test_missing_units_default_to_metres() {
        let content = "#1=IFCPROJECT('0001Project0000000000a',$,'P',$,$,$,$,$,$);";
        let index = build_entity_index(content.as_bytes(), ScanMode::Strict);
        let extractor = EntityExtractor::new(content.as_bytes(), &index);
        assert_eq!(length_unit_scale(&extractor, 1), 1.0);
        assert_eq!(length_unit_scale(&extractor, 42), 1.0);
    }
}
