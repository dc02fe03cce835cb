// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # archkit journal
//!
//! Persistent history of parametric operations on one mesh.
//!
//! The [`Journal`] is the source of truth: every operation's parameters
//! ([`OpRecord::properties`]), the faces and vertices it read
//! ([`SelectionInfo`]) and a manifest of the faces it produced
//! ([`TopologyInfo`]). Replaying the journal over the base mesh rebuilds the
//! model. The dependency graph (`controlled`) decides which operations rerun
//! when one of them changes.

pub mod error;
pub mod journal;
pub mod keys;
pub mod library;
pub mod record;
pub mod selection;
pub mod topology_info;

pub use error::{Error, Result};
pub use journal::{Journal, JOURNAL_VERSION};
pub use keys::{op_key, parse_op_key, OpId, ROOT_OP};
pub use library::{ScriptEntry, ScriptLibrary};
pub use record::OpRecord;
pub use selection::{SelectionInfo, SelectionMode};
pub use topology_info::{FaceAddress, TopologyInfo};
