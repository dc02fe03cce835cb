// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # archkit mesh
//!
//! The editable polygon mesh that parametric operations write into.
//!
//! Vertices, faces and point instances live in slot maps with stable,
//! generational keys. On top of the raw keys every element carries a
//! *logical identity*: the id of the operation that created it and a
//! sequence number unique within that operation. Logical identities survive
//! rebuilds, raw keys do not, so everything persistent (selections, the
//! operation journal) refers to elements through [`ElementId`].
//!
//! Per-element attributes are plain typed fields ([`FaceAttrs`], loop
//! `uv_w`) rather than name-addressed layers.

pub mod arena;
pub mod attributes;
pub mod construction;
pub mod error;
pub mod geometry;
pub mod keys;
pub mod removal;
pub mod serialization;
pub mod spatial;

pub use arena::{EditMesh, FaceData, InstanceData, RetiredFace, VertexData};
pub use attributes::{FaceAttrs, FaceTag, UvMode};
pub use error::{Error, Result};
pub use keys::{ElementId, FaceKey, InstanceKey, VertexKey, ROOT_OP};
pub use spatial::SpatialIndex;
