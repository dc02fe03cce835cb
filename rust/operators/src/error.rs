// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for operators and the editing session.

/// Result type alias for operator and session calls.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("nothing selected")]
    NothingSelected,

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("unknown operator: {0}")]
    UnknownOperator(String),

    /// A rebuild would orphan geometry another operation depends on.
    #[error("topology inconsistency: {0}")]
    TopologyInconsistency(String),

    /// A child selection could not be mapped onto new parent output.
    #[error("topology warp failed: {0}")]
    Warp(String),

    #[error("replay exceeded {0} operator runs")]
    ReplayLimit(usize),

    #[error(transparent)]
    Mesh(#[from] archkit_mesh::Error),

    #[error(transparent)]
    Geometry(#[from] archkit_geometry::Error),

    #[error(transparent)]
    Journal(archkit_journal::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<archkit_journal::Error> for Error {
    fn from(e: archkit_journal::Error) -> Self {
        match e {
            archkit_journal::Error::Warp(msg) => Error::Warp(msg),
            archkit_journal::Error::TopologyInconsistency(msg) => Error::TopologyInconsistency(msg),
            other => Error::Journal(other),
        }
    }
}

impl Error {
    /// Fatal errors mean the journal and mesh disagree; user errors mean the
    /// request itself was bad. Both abort the action.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::NothingSelected
            | Error::InvalidParameters(_)
            | Error::UnknownOperator(_)
            | Error::Geometry(_)
            | Error::Serialization(_) => false,
            Error::Journal(e) => !matches!(
                e,
                archkit_journal::Error::UserInput(_) | archkit_journal::Error::Io(_)
            ),
            Error::TopologyInconsistency(_)
            | Error::Warp(_)
            | Error::ReplayLimit(_)
            | Error::Mesh(_) => true,
        }
    }
}
