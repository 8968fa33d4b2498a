// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Columnar entity table
//!
//! One row per extractable entity, in source order. Identity strings of
//! IfcRoot-derived entities (GlobalId, Name, Description, ObjectType) are
//! interned into the table's [`StringTable`]; every other row keeps
//! [`NO_STRING`] in those columns.

use ifc_graph_core::{AttributeValue, ExtractedEntity, TypeCode};
use rustc_hash::FxHashMap;

use crate::strings::{StringId, StringTable, NO_STRING};

/// Length of an IFC GlobalId (compressed GUID)
pub const GLOBAL_ID_LEN: usize = 22;

/// Attribute positions shared by every IfcRoot subtype
const ATTR_GLOBAL_ID: usize = 0;
const ATTR_NAME: usize = 2;
const ATTR_DESCRIPTION: usize = 3;
const ATTR_OBJECT_TYPE: usize = 4;

/// Struct-of-arrays entity table
#[derive(Debug, Clone, Default)]
pub struct EntityTable {
    express_id: Vec<u32>,
    type_code: Vec<TypeCode>,
    global_id: Vec<StringId>,
    name: Vec<StringId>,
    description: Vec<StringId>,
    object_type: Vec<StringId>,
    row_of: FxHashMap<u32, u32>,
    by_type: FxHashMap<TypeCode, Vec<u32>>,
    by_global_id: FxHashMap<StringId, u32>,
    strings: StringTable,
}

/// Whether an entity carries IfcRoot identity attributes
pub fn is_rooted(entity: &ExtractedEntity) -> bool {
    match entity.ifc_type {
        Some(ty) => ty.is_rooted(),
        None => matches!(
            entity.get(ATTR_GLOBAL_ID),
            Some(AttributeValue::String(s)) if s.len() == GLOBAL_ID_LEN
        ),
    }
}

impl EntityTable {
    /// Pre-allocate for an expected number of rows
    pub fn with_capacity(rows: usize) -> Self {
        Self {
            express_id: Vec::with_capacity(rows),
            type_code: Vec::with_capacity(rows),
            global_id: Vec::with_capacity(rows),
            name: Vec::with_capacity(rows),
            description: Vec::with_capacity(rows),
            object_type: Vec::with_capacity(rows),
            row_of: FxHashMap::with_capacity_and_hasher(rows, Default::default()),
            ..Default::default()
        }
    }

    /// Append one entity; a repeated id is ignored
    pub fn push(&mut self, entity: &ExtractedEntity) {
        if self.row_of.contains_key(&entity.id) {
            return;
        }
        let row = self.express_id.len() as u32;
        let rooted = is_rooted(entity);
        let mut column = |index: usize| -> StringId {
            if !rooted {
                return NO_STRING;
            }
            entity
                .get_string(index)
                .map_or(NO_STRING, |s| self.strings.intern(s))
        };
        let global_id = column(ATTR_GLOBAL_ID);
        let name = column(ATTR_NAME);
        let description = column(ATTR_DESCRIPTION);
        let object_type = column(ATTR_OBJECT_TYPE);

        self.express_id.push(entity.id);
        self.type_code.push(entity.type_code);
        self.global_id.push(global_id);
        self.name.push(name);
        self.description.push(description);
        self.object_type.push(object_type);
        self.row_of.insert(entity.id, row);
        self.by_type.entry(entity.type_code).or_default().push(entity.id);
        if global_id != NO_STRING {
            self.by_global_id.entry(global_id).or_insert(entity.id);
        }
    }

    /// Number of rows
    #[inline]
    pub fn len(&self) -> usize {
        self.express_id.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.express_id.is_empty()
    }

    /// Express ids in row order
    #[inline]
    pub fn ids(&self) -> &[u32] {
        &self.express_id
    }

    /// Express id of a row
    #[inline]
    pub fn express_id(&self, row: usize) -> Option<u32> {
        self.express_id.get(row).copied()
    }

    /// Type code of a row
    #[inline]
    pub fn type_code_at(&self, row: usize) -> Option<TypeCode> {
        self.type_code.get(row).copied()
    }

    /// Row of an express id
    #[inline]
    pub fn row_of(&self, id: u32) -> Option<usize> {
        self.row_of.get(&id).map(|&row| row as usize)
    }

    #[inline]
    pub fn contains(&self, id: u32) -> bool {
        self.row_of.contains_key(&id)
    }

    /// Type code of an express id
    pub fn type_code(&self, id: u32) -> Option<TypeCode> {
        self.row_of(id).map(|row| self.type_code[row])
    }

    /// Ids of one type, in row order
    pub fn get_by_type(&self, code: TypeCode) -> &[u32] {
        self.by_type.get(&code).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Types present in the table with their row counts
    pub fn type_counts(&self) -> impl Iterator<Item = (TypeCode, usize)> + '_ {
        self.by_type.iter().map(|(&code, ids)| (code, ids.len()))
    }

    fn string_column(&self, column: &[StringId], id: u32) -> Option<&str> {
        self.row_of(id).and_then(|row| self.strings.resolve(column[row]))
    }

    pub fn get_global_id(&self, id: u32) -> Option<&str> {
        self.string_column(&self.global_id, id)
    }

    pub fn get_name(&self, id: u32) -> Option<&str> {
        self.string_column(&self.name, id)
    }

    pub fn get_description(&self, id: u32) -> Option<&str> {
        self.string_column(&self.description, id)
    }

    pub fn get_object_type(&self, id: u32) -> Option<&str> {
        self.string_column(&self.object_type, id)
    }

    /// Entity carrying a GlobalId (first one wins when a GlobalId repeats)
    pub fn find_by_global_id(&self, global_id: &str) -> Option<u32> {
        let string = self.strings.find(global_id).filter(|&s| s != NO_STRING)?;
        self.by_global_id.get(&string).copied()
    }

    /// Shared string table
    #[inline]
    pub fn strings(&self) -> &StringTable {
        &self.strings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifc_graph_core::{build_entity_index, EntityExtractor, IfcType, ScanMode};

    const CONTENT: &str = r#"
#1=IFCPROJECT('0YvctVUKr0kugbFTf53O9L',$,'Project',$,$,$,$,$,$);
#2=IFCWALL('2O2Fr$t4X7Zf8NOew3FLOH',$,'Wall-001','Load bearing','Basic Wall',$,$,$);
#3=IFCWALL('2O2Fr$t4X7Zf8NOew3FLOI',$,'Wall-001',$,$,$,$,$);
#4=IFCPROPERTYSINGLEVALUE('IsExternal',$,IFCBOOLEAN(.T.),$);
#5=IFCCUSTOMROOTED('1xS3BCk291UvhgP2a6eflK',$,'Custom',$,$);
#6=IFCCARTESIANPOINT((0.,0.,0.));
"#;

    fn table() -> EntityTable {
        let index = build_entity_index(CONTENT.as_bytes(), ScanMode::Strict);
        let extractor = EntityExtractor::new(CONTENT.as_bytes(), &index);
        let mut table = EntityTable::with_capacity(index.len());
        for record in index.records() {
            let entity = extractor.extract(record).unwrap();
            table.push(&entity);
        }
        table
    }

    #[test]
    fn test_rows_follow_source_order() {
        let table = table();
        assert_eq!(table.len(), 6);
        assert_eq!(table.ids(), &[1, 2, 3, 4, 5, 6]);
        assert_eq!(table.express_id(1), Some(2));
        assert_eq!(table.row_of(3), Some(2));
        assert_eq!(table.type_code_at(1), Some(IfcType::IfcWall.into()));
        assert_eq!(table.get_by_type(IfcType::IfcWall.into()), &[2, 3]);
        assert!(table.get_by_type(IfcType::IfcDoor.into()).is_empty());
    }

    #[test]
    fn test_string_columns() {
        let table = table();
        assert_eq!(table.get_name(2), Some("Wall-001"));
        assert_eq!(table.get_description(2), Some("Load bearing"));
        assert_eq!(table.get_object_type(2), Some("Basic Wall"));
        assert_eq!(table.get_global_id(1), Some("0YvctVUKr0kugbFTf53O9L"));
        assert_eq!(table.get_description(3), None);
        assert_eq!(table.find_by_global_id("2O2Fr$t4X7Zf8NOew3FLOI"), Some(3));

        // Shared names are stored once
        assert!(table.strings().find("Wall-001").is_some());
        assert_eq!(
            table.strings().len(),
            1 + ["0YvctVUKr0kugbFTf53O9L", "2O2Fr$t4X7Zf8NOew3FLOH", "2O2Fr$t4X7Zf8NOew3FLOI",
                "1xS3BCk291UvhgP2a6eflK", "Project", "Wall-001", "Load bearing", "Basic Wall",
                "Custom"]
                .len()
        );
    }

    #[test]
    fn test_non_rooted_rows_have_no_strings() {
        let table = table();
        assert_eq!(table.get_global_id(4), None);
        assert_eq!(table.get_name(4), None);
        assert_eq!(table.get_name(6), None);
        assert_eq!(table.get_name(5), Some("Custom"));
        assert_eq!(table.get_name(99), None);
    }
}
