// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Append-only string interning table.
//!
//! Index 0 is reserved for the empty string and stands for "no value".

use rustc_hash::FxHashMap;

/// Index into a [`StringTable`]
pub type StringId = u32;

/// The reserved "no value" index
pub const NO_STRING: StringId = 0;

/// Deduplicating string table
#[derive(Debug, Clone)]
pub struct StringTable {
    strings: Vec<Box<str>>,
    lookup: FxHashMap<Box<str>, StringId>,
}

impl StringTable {
    pub fn new() -> Self {
        Self {
            strings: vec![Box::from("")],
            lookup: FxHashMap::default(),
        }
    }

    /// Index of `s`, adding it on first sight; empty strings map to [`NO_STRING`]
    pub fn intern(&mut self, s: &str) -> StringId {
        if s.is_empty() {
            return NO_STRING;
        }
        if let Some(&id) = self.lookup.get(s) {
            return id;
        }
        let id = self.strings.len() as StringId;
        self.strings.push(Box::from(s));
        self.lookup.insert(Box::from(s), id);
        id
    }

    /// Index of an existing string
    pub fn find(&self, s: &str) -> Option<StringId> {
        if s.is_empty() {
            return Some(NO_STRING);
        }
        self.lookup.get(s).copied()
    }

    /// String at an index (`""` for [`NO_STRING`])
    #[inline]
    pub fn get(&self, id: StringId) -> Option<&str> {
        self.strings.get(id as usize).map(|s| &**s)
    }

    /// String at an index, `None` for [`NO_STRING`]
    #[inline]
    pub fn resolve(&self, id: StringId) -> Option<&str> {
        if id == NO_STRING {
            None
        } else {
            self.get(id)
        }
    }

    /// Number of entries including the reserved empty string
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// True when only the reserved entry exists
    pub fn is_empty(&self) -> bool {
        self.strings.len() == 1
    }
}

impl Default for StringTable {
    fn default() -> Self {
        Self::new()
    }
}
