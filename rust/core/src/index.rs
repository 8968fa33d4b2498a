// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity Index - position index over the source buffer
//!
//! Records are added during the scan pass and frozen by
//! [`EntityIndexBuilder::build`] into two lookups: id → record and
//! type → ids in source order. Attributes are never parsed here.

use crate::registry::{TypeCode, TypeRegistry};
use crate::schema::IfcType;
use crate::tokenizer::{scan, EntityRecord, ScanMode};
use rustc_hash::FxHashMap;

/// Sentinel for an empty dense slot
const NO_SLOT: u32 = u32::MAX;

/// Ids may be this many times sparser than the record count before the
/// dense lookup table gives way to a hash map
const DENSITY_FACTOR: usize = 4;

/// An entity record with its type interned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IndexedRecord {
    pub id: u32,
    pub type_code: TypeCode,
    pub offset: usize,
    pub length: usize,
    pub line: u32,
}

impl IndexedRecord {
    /// Exclusive end offset
    #[inline]
    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    /// Raw statement bytes
    #[inline]
    pub fn bytes<'b>(&self, buffer: &'b [u8]) -> &'b [u8] {
        &buffer[self.offset..self.end()]
    }
}

/// A record left out of the index because its type name could not be assigned a code
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnindexedRecord {
    pub id: u32,
    pub line: u32,
    pub type_name: String,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
enum IdLookup {
    /// `slots[id]` is the record position
    Dense(Vec<u32>),
    Sparse(FxHashMap<u32, u32>),
}

impl IdLookup {
    fn build(records: &[IndexedRecord]) -> Self {
        let max_id = records.iter().map(|r| r.id).max().unwrap_or(0) as usize;
        if max_id <= records.len() * DENSITY_FACTOR + 1024 {
            let mut slots = vec![NO_SLOT; max_id + 1];
            for (pos, record) in records.iter().enumerate() {
                slots[record.id as usize] = pos as u32;
            }
            IdLookup::Dense(slots)
        } else {
            let mut map =
                FxHashMap::with_capacity_and_hasher(records.len(), Default::default());
            for (pos, record) in records.iter().enumerate() {
                map.insert(record.id, pos as u32);
            }
            IdLookup::Sparse(map)
        }
    }

    #[inline]
    fn get(&self, id: u32) -> Option<usize> {
        match self {
            IdLookup::Dense(slots) => match slots.get(id as usize) {
                Some(&slot) if slot != NO_SLOT => Some(slot as usize),
                _ => None,
            },
            IdLookup::Sparse(map) => map.get(&id).map(|&p| p as usize),
        }
    }
}

/// Accumulates records during the scan pass
#[derive(Debug, Default)]
pub struct EntityIndexBuilder {
    registry: TypeRegistry,
    records: Vec<IndexedRecord>,
    unindexed: Vec<UnindexedRecord>,
}

impl EntityIndexBuilder {
    /// Create a builder with a fresh type registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-allocate from the buffer size (roughly 1 entity per 50 bytes)
    pub fn with_capacity_for(buffer_len: usize) -> Self {
        Self {
            registry: TypeRegistry::new(),
            records: Vec::with_capacity(buffer_len / 50),
            unindexed: Vec::new(),
        }
    }

    /// Add one scanned record; a record whose type cannot be interned is set aside
    #[inline]
    pub fn add_entity(&mut self, record: &EntityRecord<'_>) {
        let Some(type_code) = self.registry.intern(record.type_name) else {
            self.unindexed.push(UnindexedRecord {
                id: record.id,
                line: record.line,
                type_name: record.type_name.to_string(),
            });
            return;
        };
        self.records.push(IndexedRecord {
            id: record.id,
            type_code,
            offset: record.offset,
            length: record.length,
            line: record.line,
        });
    }

    /// Number of records added so far
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when nothing has been added
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Freeze into an [`EntityIndex`]; a repeated id keeps its last record
    pub fn build(self) -> EntityIndex {
        let Self {
            registry,
            mut records,
            unindexed,
        } = self;
        if !unindexed.is_empty() {
            tracing::warn!(
                records = unindexed.len(),
                limit = TypeRegistry::CAPACITY,
                "Type registry full; records of further types are not indexed"
            );
        }

        let lookup = IdLookup::build(&records);
        let before = records.len();
        let mut pos = 0usize;
        records.retain(|record| {
            let keep = lookup.get(record.id) == Some(pos);
            pos += 1;
            keep
        });
        let lookup = if records.len() != before {
            tracing::warn!(
                duplicates = before - records.len(),
                "Duplicate entity ids; keeping the last record for each"
            );
            IdLookup::build(&records)
        } else {
            lookup
        };

        let mut by_type: FxHashMap<TypeCode, Vec<u32>> = FxHashMap::default();
        for record in &records {
            by_type.entry(record.type_code).or_default().push(record.id);
        }

        EntityIndex {
            registry,
            records,
            lookup,
            by_type,
            unindexed,
        }
    }
}

/// Frozen id → record and type → ids lookups
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityIndex {
    registry: TypeRegistry,
    records: Vec<IndexedRecord>,
    lookup: IdLookup,
    by_type: FxHashMap<TypeCode, Vec<u32>>,
    unindexed: Vec<UnindexedRecord>,
}

impl EntityIndex {
    /// Get record by express id - O(1)
    #[inline]
    pub fn get(&self, id: u32) -> Option<&IndexedRecord> {
        self.lookup.get(id).map(|pos| &self.records[pos])
    }

    /// Position of a record in source order
    #[inline]
    pub fn position(&self, id: u32) -> Option<usize> {
        self.lookup.get(id)
    }

    /// Check whether an id exists
    #[inline]
    pub fn contains(&self, id: u32) -> bool {
        self.lookup.get(id).is_some()
    }

    /// All records in source order
    #[inline]
    pub fn records(&self) -> &[IndexedRecord] {
        &self.records
    }

    /// Ids of a type code, in source order
    pub fn ids_of_code(&self, code: TypeCode) -> &[u32] {
        self.by_type.get(&code).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ids of a schema type, in source order
    pub fn ids_of(&self, ty: IfcType) -> &[u32] {
        self.ids_of_code(ty.into())
    }

    /// Ids of a type name (case-insensitive), in source order
    pub fn ids_of_name(&self, type_name: &str) -> &[u32] {
        match self.registry.get(type_name) {
            Some(code) => self.ids_of_code(code),
            None => &[],
        }
    }

    /// Records left out because the type registry was full
    pub fn unindexed(&self) -> &[UnindexedRecord] {
        &self.unindexed
    }

    /// Type codes that occur in the file
    pub fn type_codes(&self) -> impl Iterator<Item = TypeCode> + '_ {
        self.by_type.keys().copied()
    }

    /// Type registry built during the scan
    #[inline]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Type code of an entity
    #[inline]
    pub fn type_code(&self, id: u32) -> Option<TypeCode> {
        self.get(id).map(|r| r.type_code)
    }

    /// Schema type of an entity (`None` for unknown ids and types outside the schema)
    #[inline]
    pub fn ifc_type(&self, id: u32) -> Option<IfcType> {
        self.type_code(id).and_then(|code| self.registry.ifc_type(code))
    }

    /// Type name of an entity
    pub fn type_name(&self, id: u32) -> Option<&str> {
        self.type_code(id).and_then(|code| self.registry.name(code))
    }

    /// Number of indexed entities
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when the buffer held no records
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Build entity index from a buffer - single O(n) scan
pub fn build_entity_index(buffer: &[u8], mode: ScanMode) -> EntityIndex {
    let mut builder = EntityIndexBuilder::with_capacity_for(buffer.len());
    for record in scan(buffer, mode) {
        builder.add_entity(&record);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTENT: &str = r#"
#1=IFCPROJECT('guid',$,$,$,$,$,$,$,$);
#5=IFCWALL('guid2',$,$,$,'Wall-001',$,$,$);
#10=IFCDOOR('guid3',$,$,$,'Door-001',$,$,$);
#11=IFCWALL('guid4',$,$,$,$,$,$,$);
#12=IFCCARTESIANPOINT((0.,0.,0.));
"#;

    #[test]
    fn test_lookup_by_id() {
        let index = build_entity_index(CONTENT.as_bytes(), ScanMode::Strict);
        assert_eq!(index.len(), 5);

        let wall = index.get(5).unwrap();
        assert_eq!(wall.id, 5);
        assert_eq!(index.ifc_type(5), Some(IfcType::IfcWall));
        assert!(wall.bytes(CONTENT.as_bytes()).starts_with(b"#5=IFCWALL("));

        assert!(index.get(2).is_none());
        assert!(index.get(9999).is_none());
        assert!(!index.contains(0));
    }

    #[test]
    fn test_lookup_by_type() {
        let index = build_entity_index(CONTENT.as_bytes(), ScanMode::Fast);
        assert_eq!(index.ids_of(IfcType::IfcWall), &[5, 11]);
        assert_eq!(index.ids_of_name("IFCDOOR"), &[10]);
        assert_eq!(index.ids_of_name("IfcCartesianPoint"), &[12]);
        assert_eq!(index.type_name(12), Some("IFCCARTESIANPOINT"));
        assert_eq!(index.ifc_type(12), None);
        assert!(index.ids_of(IfcType::IfcSlab).is_empty());
        assert!(index.ids_of_name("IFCNOTHING").is_empty());
    }

    #[test]
    fn test_duplicate_ids_last_write_wins() {
        let content = "#1=IFCWALL('a');\n#2=IFCSLAB('b');\n#1=IFCDOOR('c');";
        let index = build_entity_index(content.as_bytes(), ScanMode::Strict);
        assert_eq!(index.len(), 2);
        assert_eq!(index.ifc_type(1), Some(IfcType::IfcDoor));
        assert!(index.ids_of(IfcType::IfcWall).is_empty());
        assert_eq!(index.ids_of(IfcType::IfcDoor), &[1]);
    }

    #[test]
    fn test_sparse_ids_use_hash_lookup() {
        let content = "#1=IFCWALL('a');\n#4000000=IFCSLAB('b');";
        let index = build_entity_index(content.as_bytes(), ScanMode::Strict);
        assert!(matches!(index.lookup, IdLookup::Sparse(_)));
        assert_eq!(index.ifc_type(4_000_000), Some(IfcType::IfcSlab));
        assert_eq!(index.position(4_000_000), Some(1));
    }

    #[test]
    fn test_records_past_type_capacity_are_set_aside() {
        let fresh = TypeRegistry::CAPACITY - TypeRegistry::KNOWN;
        let mut content = String::from("#1=IFCWALL('a');\n");
        for n in 0..=fresh {
            content.push_str(&format!("#{}=IFCVENDOR{}(1);\n", n + 2, n));
        }
        content.push_str(&format!("#{}=IFCSLAB('b');\n", fresh + 3));

        let index = build_entity_index(content.as_bytes(), ScanMode::Fast);
        assert_eq!(index.registry().len(), TypeRegistry::CAPACITY);
        assert_eq!(index.len(), fresh + 2);
        assert_eq!(
            index.unindexed(),
            &[UnindexedRecord {
                id: fresh as u32 + 2,
                line: fresh as u32 + 2,
                type_name: format!("IFCVENDOR{}", fresh),
            }]
        );
        assert!(!index.contains(fresh as u32 + 2));
        assert_eq!(index.ifc_type(fresh as u32 + 3), Some(IfcType::IfcSlab));
    }
}
