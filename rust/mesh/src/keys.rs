// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Key types for arena-based storage and logical element identities.
//!
//! Slot map keys are only valid for the lifetime of one mesh instance and are
//! invalidated by deletion. [`ElementId`] is the persistent identity written
//! to the journal.

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Key for a vertex (point in 3D space).
    pub struct VertexKey;

    /// Key for a face (ordered loop of vertices).
    pub struct FaceKey;

    /// Key for a lightweight point instance.
    pub struct InstanceKey;
}

/// Operation id that owns geometry not created by any operation.
pub const ROOT_OP: i64 = -1;

/// Logical identity of a mesh element: owning operation and sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId {
    pub op_id: i64,
    pub seq: i32,
}

impl ElementId {
    pub fn new(op_id: i64, seq: i32) -> Self {
        Self { op_id, seq }
    }

    /// Identity for geometry that exists before any operation ran.
    pub fn root(seq: i32) -> Self {
        Self { op_id: ROOT_OP, seq }
    }

    pub fn is_root(&self) -> bool {
        self.op_id == ROOT_OP
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "op{}:{}", self.op_id, self.seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_identity() {
        let id = ElementId::root(4);
        assert!(id.is_root());
        assert_eq!(id.op_id, ROOT_OP);
        assert_eq!(id.to_string(), "op-1:4");
    }

    #[test]
    fn ids_order_by_operation_then_seq() {
        let a = ElementId::new(1, 9);
        let b = ElementId::new(2, 0);
        let c = ElementId::new(2, 1);
        assert!(a < b);
        assert!(b < c);
    }
}
