// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during polygon processing
#[derive(Error, Debug)]
pub enum Error {
    #[error("Too few points: need {needed}, got {got}")]
    TooFewPoints { needed: usize, got: usize },

    #[error("Degenerate input: {0}")]
    Degenerate(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Clipping failed: {0}")]
    ClipFailed(String),

    #[error("Triangulation failed: {0}")]
    TriangulationError(String),
}
