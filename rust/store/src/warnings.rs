// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Recoverable problems collected during a parse.

use serde::{Deserialize, Serialize};

/// Category of a recoverable problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Record attributes could not be parsed; the record is left out of the store
    UnreadableEntity,
    /// Type name outside the schema while strict type checking is on
    UnknownType,
    /// Relationship without a usable relating or related attribute
    DroppedRelationship,
    /// Type name arrived after the type registry was full; the record is left out
    TooManyTypes,
}

/// One recoverable problem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseWarning {
    pub kind: WarningKind,
    pub entity_id: u32,
    /// Source line of the record
    pub line: u32,
    pub message: String,
}

/// Warning sink that mirrors every entry to the log
#[derive(Debug, Default)]
pub(crate) struct Warnings {
    entries: Vec<ParseWarning>,
}

impl Warnings {
    pub(crate) fn push(&mut self, kind: WarningKind, entity_id: u32, line: u32, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(?kind, entity_id, line, %message, "Recoverable parse problem");
        self.entries.push(ParseWarning {
            kind,
            entity_id,
            line,
            message,
        });
    }

    pub(crate) fn into_vec(self) -> Vec<ParseWarning> {
        self.entries
    }
}
