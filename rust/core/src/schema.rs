// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC Schema Types
//!
//! Fast type checking using an enum instead of string comparison. Only the
//! entity types the store reasons about are listed here; every other type
//! name still gets a dense code from the [`TypeRegistry`](crate::TypeRegistry).

use std::fmt;
use std::str::FromStr;

macro_rules! ifc_types {
    ($( $(#[$meta:meta])* $variant:ident => $name:literal ),+ $(,)?) => {
        /// IFC entity types with dedicated handling in the store
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[repr(u16)]
        pub enum IfcType {
            $( $(#[$meta])* $variant ),+
        }

        impl IfcType {
            /// Every known type, in discriminant order
            pub const ALL: &'static [IfcType] = &[ $( IfcType::$variant ),+ ];

            /// Parse an upper-case STEP type name
            pub fn from_name(s: &str) -> Option<Self> {
                match s {
                    $( $name => Some(IfcType::$variant), )+
                    _ => None,
                }
            }

            /// Get string representation (upper case, as written in STEP files)
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( IfcType::$variant => $name, )+
                }
            }
        }
    };
}

ifc_types! {
    // Spatial structure
    IfcProject => "IFCPROJECT",
    IfcSite => "IFCSITE",
    IfcBuilding => "IFCBUILDING",
    IfcBuildingStorey => "IFCBUILDINGSTOREY",
    IfcSpace => "IFCSPACE",
    IfcFacility => "IFCFACILITY",
    IfcFacilityPart => "IFCFACILITYPART",
    IfcBridge => "IFCBRIDGE",
    IfcRoad => "IFCROAD",

    // Building elements
    IfcWall => "IFCWALL",
    IfcWallStandardCase => "IFCWALLSTANDARDCASE",
    IfcSlab => "IFCSLAB",
    IfcBeam => "IFCBEAM",
    IfcColumn => "IFCCOLUMN",
    IfcRoof => "IFCROOF",
    IfcStair => "IFCSTAIR",
    IfcStairFlight => "IFCSTAIRFLIGHT",
    IfcRamp => "IFCRAMP",
    IfcRailing => "IFCRAILING",
    IfcCurtainWall => "IFCCURTAINWALL",
    IfcPlate => "IFCPLATE",
    IfcMember => "IFCMEMBER",
    IfcFooting => "IFCFOOTING",
    IfcPile => "IFCPILE",
    IfcCovering => "IFCCOVERING",
    IfcBuildingElementProxy => "IFCBUILDINGELEMENTPROXY",

    // Openings
    IfcDoor => "IFCDOOR",
    IfcWindow => "IFCWINDOW",
    IfcOpeningElement => "IFCOPENINGELEMENT",

    // MEP
    IfcPipeSegment => "IFCPIPESEGMENT",
    IfcDuctSegment => "IFCDUCTSEGMENT",
    IfcCableSegment => "IFCCABLESEGMENT",
    IfcFlowSegment => "IFCFLOWSEGMENT",
    IfcFlowFitting => "IFCFLOWFITTING",
    IfcFlowTerminal => "IFCFLOWTERMINAL",

    // Furniture and annotation
    IfcFurnishingElement => "IFCFURNISHINGELEMENT",
    IfcFurniture => "IFCFURNITURE",
    IfcAnnotation => "IFCANNOTATION",
    IfcGrid => "IFCGRID",

    // Type objects
    IfcWallType => "IFCWALLTYPE",
    IfcSlabType => "IFCSLABTYPE",
    IfcBeamType => "IFCBEAMTYPE",
    IfcColumnType => "IFCCOLUMNTYPE",
    IfcDoorType => "IFCDOORTYPE",
    IfcWindowType => "IFCWINDOWTYPE",
    IfcFurnitureType => "IFCFURNITURETYPE",
    IfcBuildingElementProxyType => "IFCBUILDINGELEMENTPROXYTYPE",

    // Groups
    IfcGroup => "IFCGROUP",
    IfcZone => "IFCZONE",
    IfcSystem => "IFCSYSTEM",

    // Relationships
    IfcRelAggregates => "IFCRELAGGREGATES",
    IfcRelNests => "IFCRELNESTS",
    IfcRelContainedInSpatialStructure => "IFCRELCONTAINEDINSPATIALSTRUCTURE",
    IfcRelReferencedInSpatialStructure => "IFCRELREFERENCEDINSPATIALSTRUCTURE",
    IfcRelDefinesByProperties => "IFCRELDEFINESBYPROPERTIES",
    IfcRelDefinesByType => "IFCRELDEFINESBYTYPE",
    IfcRelAssociatesMaterial => "IFCRELASSOCIATESMATERIAL",
    IfcRelAssociatesClassification => "IFCRELASSOCIATESCLASSIFICATION",
    IfcRelVoidsElement => "IFCRELVOIDSELEMENT",
    IfcRelFillsElement => "IFCRELFILLSELEMENT",
    IfcRelConnectsElements => "IFCRELCONNECTSELEMENTS",
    IfcRelConnectsPathElements => "IFCRELCONNECTSPATHELEMENTS",
    IfcRelSpaceBoundary => "IFCRELSPACEBOUNDARY",
    IfcRelAssignsToGroup => "IFCRELASSIGNSTOGROUP",

    // Properties
    IfcPropertySet => "IFCPROPERTYSET",
    IfcPropertySingleValue => "IFCPROPERTYSINGLEVALUE",
    IfcPropertyEnumeratedValue => "IFCPROPERTYENUMERATEDVALUE",
    IfcPropertyBoundedValue => "IFCPROPERTYBOUNDEDVALUE",
    IfcPropertyListValue => "IFCPROPERTYLISTVALUE",
    IfcPropertyTableValue => "IFCPROPERTYTABLEVALUE",
    IfcComplexProperty => "IFCCOMPLEXPROPERTY",
    IfcPropertyEnumeration => "IFCPROPERTYENUMERATION",

    // Quantities
    IfcElementQuantity => "IFCELEMENTQUANTITY",
    IfcQuantityLength => "IFCQUANTITYLENGTH",
    IfcQuantityArea => "IFCQUANTITYAREA",
    IfcQuantityVolume => "IFCQUANTITYVOLUME",
    IfcQuantityCount => "IFCQUANTITYCOUNT",
    IfcQuantityWeight => "IFCQUANTITYWEIGHT",
    IfcQuantityTime => "IFCQUANTITYTIME",

    // Materials
    IfcMaterial => "IFCMATERIAL",
    IfcMaterialLayer => "IFCMATERIALLAYER",
    IfcMaterialLayerSet => "IFCMATERIALLAYERSET",
    IfcMaterialLayerSetUsage => "IFCMATERIALLAYERSETUSAGE",
    IfcMaterialList => "IFCMATERIALLIST",
    IfcMaterialConstituent => "IFCMATERIALCONSTITUENT",
    IfcMaterialConstituentSet => "IFCMATERIALCONSTITUENTSET",
    IfcMaterialProfile => "IFCMATERIALPROFILE",
    IfcMaterialProfileSet => "IFCMATERIALPROFILESET",
    IfcMaterialProfileSetUsage => "IFCMATERIALPROFILESETUSAGE",

    // Classification
    IfcClassification => "IFCCLASSIFICATION",
    IfcClassificationReference => "IFCCLASSIFICATIONREFERENCE",

    // Units
    IfcUnitAssignment => "IFCUNITASSIGNMENT",
    IfcSIUnit => "IFCSIUNIT",
    IfcConversionBasedUnit => "IFCCONVERSIONBASEDUNIT",

    // Other common types
    IfcOwnerHistory => "IFCOWNERHISTORY",
    IfcPerson => "IFCPERSON",
    IfcOrganization => "IFCORGANIZATION",
    IfcApplication => "IFCAPPLICATION",
}

impl IfcType {
    /// Dense code of this type; stable across parses
    #[inline]
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Check if this is a spatial structure element
    pub fn is_spatial(&self) -> bool {
        matches!(
            self,
            Self::IfcProject
                | Self::IfcSite
                | Self::IfcBuilding
                | Self::IfcBuildingStorey
                | Self::IfcSpace
                | Self::IfcFacility
                | Self::IfcFacilityPart
                | Self::IfcBridge
                | Self::IfcRoad
        )
    }

    /// Check if this is a building element
    pub fn is_building_element(&self) -> bool {
        matches!(
            self,
            Self::IfcWall
                | Self::IfcWallStandardCase
                | Self::IfcSlab
                | Self::IfcBeam
                | Self::IfcColumn
                | Self::IfcRoof
                | Self::IfcStair
                | Self::IfcStairFlight
                | Self::IfcRamp
                | Self::IfcRailing
                | Self::IfcCurtainWall
                | Self::IfcPlate
                | Self::IfcMember
                | Self::IfcFooting
                | Self::IfcPile
                | Self::IfcCovering
                | Self::IfcBuildingElementProxy
                | Self::IfcDoor
                | Self::IfcWindow
        )
    }

    /// Check if this is a relationship
    pub fn is_relationship(&self) -> bool {
        self.as_str().starts_with("IFCREL")
    }

    /// Property definitions that can be attached through IfcRelDefinesByProperties
    pub fn is_property_set_definition(&self) -> bool {
        matches!(self, Self::IfcPropertySet | Self::IfcElementQuantity)
    }

    /// Physical quantity entity types
    pub fn is_quantity(&self) -> bool {
        matches!(
            self,
            Self::IfcQuantityLength
                | Self::IfcQuantityArea
                | Self::IfcQuantityVolume
                | Self::IfcQuantityCount
                | Self::IfcQuantityWeight
                | Self::IfcQuantityTime
        )
    }

    /// Types derived from IfcRoot: they carry GlobalId, OwnerHistory, Name
    /// and Description as their first four attributes
    pub fn is_rooted(&self) -> bool {
        self.code() <= Self::IfcRelAssignsToGroup.code() || self.is_property_set_definition()
    }

    /// Property entity types
    pub fn is_property(&self) -> bool {
        matches!(
            self,
            Self::IfcPropertySingleValue
                | Self::IfcPropertyEnumeratedValue
                | Self::IfcPropertyBoundedValue
                | Self::IfcPropertyListValue
                | Self::IfcPropertyTableValue
                | Self::IfcComplexProperty
        )
    }
}

impl FromStr for IfcType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IfcType::from_name(s).ok_or_else(|| crate::Error::InvalidIfcType(s.to_string()))
    }
}

impl fmt::Display for IfcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(IfcType::from_name("IFCWALL"), Some(IfcType::IfcWall));
        assert_eq!(IfcType::from_name("IFCDOOR"), Some(IfcType::IfcDoor));
        assert_eq!(IfcType::from_name("IFCPROJECT"), Some(IfcType::IfcProject));
        assert_eq!(IfcType::from_name("IFCCUSTOMTYPE"), None);
    }

    #[test]
    fn test_as_str() {
        assert_eq!(IfcType::IfcWall.as_str(), "IFCWALL");
        assert_eq!(IfcType::IfcDoor.to_string(), "IFCDOOR");
    }

    #[test]
    fn test_codes_follow_all_order() {
        for (i, ty) in IfcType::ALL.iter().enumerate() {
            assert_eq!(ty.code() as usize, i);
            assert_eq!(IfcType::from_name(ty.as_str()), Some(*ty));
        }
    }

    #[test]
    fn test_is_spatial() {
        assert!(IfcType::IfcProject.is_spatial());
        assert!(IfcType::IfcBuilding.is_spatial());
        assert!(!IfcType::IfcWall.is_spatial());
    }

    #[test]
    fn test_categories() {
        assert!(IfcType::IfcWall.is_building_element());
        assert!(!IfcType::IfcProject.is_building_element());
        assert!(IfcType::IfcRelAggregates.is_relationship());
        assert!(!IfcType::IfcPropertySet.is_relationship());
        assert!(IfcType::IfcQuantityArea.is_quantity());
        assert!(IfcType::IfcComplexProperty.is_property());
        assert!(IfcType::IfcSite.is_rooted());
        assert!(IfcType::IfcRelVoidsElement.is_rooted());
        assert!(IfcType::IfcElementQuantity.is_rooted());
        assert!(!IfcType::IfcPropertySingleValue.is_rooted());
        assert!(!IfcType::IfcMaterial.is_rooted());
    }

    #[test]
    fn test_from_str_error() {
        let err = "IFCNOPE".parse::<IfcType>().unwrap_err();
        assert_eq!(err, crate::Error::InvalidIfcType("IFCNOPE".into()));
    }
}
