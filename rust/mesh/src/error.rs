// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for mesh editing.

use crate::keys::{ElementId, FaceKey, VertexKey};

/// Result type alias for mesh operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while editing the mesh.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Vertex key not found in the mesh.
    #[error("vertex not found: {0:?}")]
    VertexNotFound(VertexKey),

    /// Face key not found in the mesh.
    #[error("face not found: {0:?}")]
    FaceNotFound(FaceKey),

    /// A face needs at least 3 distinct vertices.
    #[error("face has fewer than 3 distinct vertices ({0})")]
    DegenerateFace(usize),

    /// Two live elements would share one logical identity.
    #[error("logical id already in use: {0}")]
    DuplicateId(ElementId),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}
