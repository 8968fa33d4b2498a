// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for building and loading a data store.

use thiserror::Error;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a parse
#[derive(Error, Debug)]
pub enum Error {
    /// Structural scan failure (buffer too short, not a STEP file)
    #[error(transparent)]
    Core(#[from] ifc_graph_core::Error),

    /// The worker stopped without delivering a store
    #[error("Worker failed: {0}")]
    Worker(String),

    /// The blocking parse task panicked or was cancelled
    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
