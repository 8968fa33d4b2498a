// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for scanning and extraction.

use thiserror::Error;

/// Result type for core parsing operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while scanning or extracting STEP records
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Generic parse failure at a byte position
    #[error("Parse error at byte {position}: {message}")]
    Parse { position: usize, message: String },

    /// A quoted string was opened but never closed
    #[error("Unterminated string literal in entity #{id}")]
    UnterminatedString { id: u32 },

    /// Parenthesis nesting never returned to zero
    #[error("Unbalanced parentheses in entity #{id}")]
    UnbalancedParens { id: u32 },

    /// Record bytes are not valid UTF-8
    #[error("Invalid UTF-8 in entity #{id}")]
    InvalidUtf8 { id: u32 },

    /// Type name not known to the schema (only raised when strict type checking is on)
    #[error("Unknown IFC type: {0}")]
    InvalidIfcType(String),

    /// Every type code is taken; the record's type name cannot be registered
    #[error("Entity #{id}: type {type_name} exceeds the limit of {limit} distinct type names")]
    TooManyTypes {
        id: u32,
        type_name: String,
        limit: usize,
    },

    /// Entity id not present in the index
    #[error("Entity #{0} not found")]
    EntityNotFound(u32),

    /// Buffer is shorter than the smallest possible STEP file
    #[error("File too short: {len} bytes is below the minimum of {min} bytes")]
    TooShort { len: usize, min: usize },

    /// Buffer does not look like an ISO-10303-21 file at all
    #[error("Not a STEP file: {0}")]
    NotStepFormat(String),
}

impl Error {
    /// Create a parse error at a byte position
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            position,
            message: message.into(),
        }
    }

    /// True for errors that abort a whole parse rather than a single record
    pub fn is_structural(&self) -> bool {
        matches!(self, Error::TooShort { .. } | Error::NotStepFormat(_))
    }
}
