// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Type registry - maps STEP type names to small dense integer codes.
//!
//! One registry is built per parse and handed around by reference. Codes
//! below [`TypeRegistry::KNOWN`] are the [`IfcType`] discriminants and are the
//! same in every registry; names outside the schema are appended after them
//! in first-seen order. A registry holds at most `u16::MAX + 1` names;
//! [`TypeRegistry::intern`] returns `None` once every code is taken.

use crate::schema::IfcType;
use rustc_hash::FxHashMap;

/// Dense type code stored in the columnar tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TypeCode(pub u16);

impl From<IfcType> for TypeCode {
    #[inline]
    fn from(ty: IfcType) -> Self {
        TypeCode(ty.code())
    }
}

/// Interning table of entity type names
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TypeRegistry {
    names: Vec<Box<str>>,
    lookup: FxHashMap<Box<str>, TypeCode>,
}

impl TypeRegistry {
    /// Number of codes reserved for [`IfcType`]
    pub const KNOWN: usize = IfcType::ALL.len();

    /// Create a registry seeded with every known type
    pub fn new() -> Self {
        let mut registry = Self {
            names: Vec::with_capacity(Self::KNOWN + 64),
            lookup: FxHashMap::with_capacity_and_hasher(Self::KNOWN + 64, Default::default()),
        };
        for ty in IfcType::ALL {
            registry.push(ty.as_str());
        }
        registry
    }

    /// Highest number of distinct names a registry can hold
    pub const CAPACITY: usize = u16::MAX as usize + 1;

    fn push(&mut self, name: &str) -> Option<TypeCode> {
        let code = TypeCode(u16::try_from(self.names.len()).ok()?);
        self.names.push(name.into());
        self.lookup.insert(name.into(), code);
        Some(code)
    }

    /// Get or assign the code for a type name (names are upper-cased);
    /// `None` when the name is new and the registry is full
    pub fn intern(&mut self, name: &str) -> Option<TypeCode> {
        if let Some(&code) = self.lookup.get(name) {
            return Some(code);
        }
        if name.bytes().any(|b| b.is_ascii_lowercase()) {
            let upper = name.to_ascii_uppercase();
            if let Some(&code) = self.lookup.get(upper.as_str()) {
                return Some(code);
            }
            return self.push(&upper);
        }
        self.push(name)
    }

    /// Look up a code without assigning one
    pub fn get(&self, name: &str) -> Option<TypeCode> {
        if let Some(&code) = self.lookup.get(name) {
            return Some(code);
        }
        self.lookup.get(name.to_ascii_uppercase().as_str()).copied()
    }

    /// Type name for a code
    #[inline]
    pub fn name(&self, code: TypeCode) -> Option<&str> {
        self.names.get(code.0 as usize).map(|s| &**s)
    }

    /// Schema type for a code, `None` for types outside the schema
    #[inline]
    pub fn ifc_type(&self, code: TypeCode) -> Option<IfcType> {
        IfcType::ALL.get(code.0 as usize).copied()
    }

    /// Whether the code refers to a type listed in [`IfcType`]
    #[inline]
    pub fn is_known(&self, code: TypeCode) -> bool {
        (code.0 as usize) < Self::KNOWN
    }

    /// Total number of distinct type names
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false: the registry is seeded with the known types
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_types_have_fixed_codes() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.get("IFCWALL"), Some(TypeCode::from(IfcType::IfcWall)));
        assert_eq!(registry.ifc_type(IfcType::IfcSite.into()), Some(IfcType::IfcSite));
        assert_eq!(registry.name(IfcType::IfcProject.into()), Some("IFCPROJECT"));
    }

    #[test]
    fn unknown_types_are_appended() {
        let mut registry = TypeRegistry::new();
        let a = registry.intern("IFCCARTESIANPOINT").unwrap();
        let b = registry.intern("IFCPOLYLOOP").unwrap();
        assert_eq!(a.0 as usize, TypeRegistry::KNOWN);
        assert_eq!(b.0 as usize, TypeRegistry::KNOWN + 1);
        assert_eq!(registry.intern("IFCCARTESIANPOINT"), Some(a));
        assert!(!registry.is_known(a));
        assert_eq!(registry.ifc_type(a), None);
        assert_eq!(registry.name(b), Some("IFCPOLYLOOP"));
    }

    #[test]
    fn lowercase_names_are_normalized() {
        let mut registry = TypeRegistry::new();
        assert_eq!(registry.intern("IfcWall"), Some(IfcType::IfcWall.into()));
        let custom = registry.intern("IfcCustomThing").unwrap();
        assert_eq!(registry.name(custom), Some("IFCCUSTOMTHING"));
        assert_eq!(registry.get("ifccustomthing"), Some(custom));
    }

    #[test]
    fn full_registry_refuses_new_names() {
        let mut registry = TypeRegistry::new();
        for n in TypeRegistry::KNOWN..TypeRegistry::CAPACITY {
            assert!(registry.intern(&format!("IFCVENDOR{}", n)).is_some());
        }
        assert_eq!(registry.len(), TypeRegistry::CAPACITY);
        let last = registry.get(&format!("IFCVENDOR{}", TypeRegistry::CAPACITY - 1));
        assert_eq!(last, Some(TypeCode(u16::MAX)));

        assert_eq!(registry.intern("IFCONEMORE"), None);
        assert_eq!(registry.len(), TypeRegistry::CAPACITY);
        assert_eq!(registry.get("IFCONEMORE"), None);
        // Names already held still resolve
        assert_eq!(registry.intern("IFCWALL"), Some(IfcType::IfcWall.into()));
    }
}
