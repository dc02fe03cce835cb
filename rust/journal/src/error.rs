// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the operation journal.

/// Result type alias for journal operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading or editing a journal.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad input from the user (empty selection, incompatible merge target).
    #[error("{0}")]
    UserInput(String),

    /// The journal and the mesh disagree about who owns what.
    #[error("topology inconsistency: {0}")]
    TopologyInconsistency(String),

    /// A child selection could not be mapped onto a parent's new output.
    #[error("topology warp failed: {0}")]
    Warp(String),

    #[error("unknown operation: op{0}")]
    UnknownOperation(i64),

    /// Following `controlled` edges from this operation revisits a node.
    #[error("dependency cycle through op{0}")]
    Cycle(i64),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
