// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Arena-based storage for the editable mesh.
//!
//! The [`EditMesh`] owns every vertex, face and point instance. Besides the
//! slot maps it maintains two indices:
//!
//! * upward adjacency, vertex → faces using it, for dissolving vertices and
//!   splitting edges shared by neighbouring faces;
//! * logical identity, `(op_id, seq)` → key, so operations can find and move
//!   the elements they created on a previous run.
//!
//! Faces consumed by an operation are not destroyed but *retired*: moved
//! into a stash tagged with the consuming operation, so that re-running or
//! deleting that operation can bring them back.

use nalgebra::Point3;
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SlotMap;

use crate::attributes::FaceAttrs;
use crate::keys::*;

/// Data stored for a vertex.
#[derive(Debug, Clone)]
pub struct VertexData {
    pub position: Point3<f64>,
    pub id: ElementId,
}

/// Data stored for a face: an ordered, consistently wound vertex loop.
#[derive(Debug, Clone)]
pub struct FaceData {
    pub verts: Vec<VertexKey>,
    /// Per-loop oriented-UV depth, parallel to `verts`.
    pub uv_w: Vec<f64>,
    pub attrs: FaceAttrs,
    pub id: ElementId,
}

/// A lightweight placement consumed by an external instancing mechanism.
#[derive(Debug, Clone)]
pub struct InstanceData {
    pub id: ElementId,
    /// Name of the instanced object.
    pub source: String,
    pub position: Point3<f64>,
    /// Rotation as XYZ euler angles in radians.
    pub rotation: [f64; 3],
    pub scale: f64,
}

/// A face removed from the mesh by the operation that consumed it.
#[derive(Debug, Clone)]
pub struct RetiredFace {
    pub face: FaceData,
    pub by_op: i64,
}

/// The central arena that owns all mesh elements and their indices.
///
/// # Example
///
/// ```
/// use archkit_mesh::{EditMesh, FaceAttrs};
/// use nalgebra::Point3;
///
/// let mut mesh = EditMesh::new();
/// let a = mesh.add_root_vertex(Point3::new(0.0, 0.0, 0.0));
/// let b = mesh.add_root_vertex(Point3::new(1.0, 0.0, 0.0));
/// let c = mesh.add_root_vertex(Point3::new(0.0, 1.0, 0.0));
/// mesh.add_root_face(&[a, b, c], FaceAttrs::default()).unwrap();
///
/// assert_eq!(mesh.vertex_count(), 3);
/// assert_eq!(mesh.face_count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct EditMesh {
    pub(crate) vertices: SlotMap<VertexKey, VertexData>,
    pub(crate) faces: SlotMap<FaceKey, FaceData>,
    pub(crate) instances: SlotMap<InstanceKey, InstanceData>,

    pub(crate) vertex_to_faces: FxHashMap<VertexKey, FxHashSet<FaceKey>>,

    pub(crate) vertex_ids: FxHashMap<ElementId, VertexKey>,
    pub(crate) face_ids: FxHashMap<ElementId, FaceKey>,
    pub(crate) instance_ids: FxHashMap<ElementId, InstanceKey>,

    pub(crate) retired: Vec<RetiredFace>,
}

impl EditMesh {
    /// Creates a new, empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    // --- Vertex access ---

    pub fn vertex(&self, key: VertexKey) -> Option<&VertexData> {
        self.vertices.get(key)
    }

    pub fn vertex_position(&self, key: VertexKey) -> Option<Point3<f64>> {
        self.vertices.get(key).map(|v| v.position)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn contains_vertex(&self, key: VertexKey) -> bool {
        self.vertices.contains_key(key)
    }

    /// Looks up a vertex by logical identity.
    pub fn find_vertex(&self, id: ElementId) -> Option<VertexKey> {
        self.vertex_ids.get(&id).copied()
    }

    pub fn vertices(&self) -> impl Iterator<Item = (VertexKey, &VertexData)> {
        self.vertices.iter()
    }

    /// Vertices created by `op_id`, ordered by sequence number.
    pub fn vertices_owned_by(&self, op_id: i64) -> Vec<(i32, VertexKey)> {
        let mut owned: Vec<(i32, VertexKey)> = self
            .vertices
            .iter()
            .filter(|(_, v)| v.id.op_id == op_id)
            .map(|(k, v)| (v.id.seq, k))
            .collect();
        owned.sort_by_key(|(seq, _)| *seq);
        owned
    }

    // --- Face access ---

    pub fn face(&self, key: FaceKey) -> Option<&FaceData> {
        self.faces.get(key)
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn contains_face(&self, key: FaceKey) -> bool {
        self.faces.contains_key(key)
    }

    /// Looks up a face by logical identity.
    pub fn find_face(&self, id: ElementId) -> Option<FaceKey> {
        self.face_ids.get(&id).copied()
    }

    pub fn faces(&self) -> impl Iterator<Item = (FaceKey, &FaceData)> {
        self.faces.iter()
    }

    pub fn face_vertices(&self, key: FaceKey) -> Option<&[VertexKey]> {
        self.faces.get(key).map(|f| f.verts.as_slice())
    }

    /// Faces created by `op_id`, ordered by sequence number.
    pub fn faces_owned_by(&self, op_id: i64) -> Vec<(i32, FaceKey)> {
        let mut owned: Vec<(i32, FaceKey)> = self
            .faces
            .iter()
            .filter(|(_, f)| f.id.op_id == op_id)
            .map(|(k, f)| (f.id.seq, k))
            .collect();
        owned.sort_by_key(|(seq, _)| *seq);
        owned
    }

    /// Faces using the given vertex.
    pub fn vertex_faces(&self, key: VertexKey) -> Vec<FaceKey> {
        self.vertex_to_faces
            .get(&key)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn set_face_attrs(&mut self, key: FaceKey, attrs: FaceAttrs) -> bool {
        match self.faces.get_mut(key) {
            Some(face) => {
                face.attrs = attrs;
                true
            }
            None => false,
        }
    }

    /// Sets the per-loop oriented-UV depth; `values` must match the loop count.
    pub fn set_loop_uv_w(&mut self, key: FaceKey, values: &[f64]) -> bool {
        match self.faces.get_mut(key) {
            Some(face) if face.verts.len() == values.len() => {
                face.uv_w = values.to_vec();
                true
            }
            _ => false,
        }
    }

    // --- Instance access ---

    pub fn instance(&self, key: InstanceKey) -> Option<&InstanceData> {
        self.instances.get(key)
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn instances(&self) -> impl Iterator<Item = (InstanceKey, &InstanceData)> {
        self.instances.iter()
    }

    pub fn instances_owned_by(&self, op_id: i64) -> Vec<(i32, InstanceKey)> {
        let mut owned: Vec<(i32, InstanceKey)> = self
            .instances
            .iter()
            .filter(|(_, i)| i.id.op_id == op_id)
            .map(|(k, i)| (i.id.seq, k))
            .collect();
        owned.sort_by_key(|(seq, _)| *seq);
        owned
    }

    // --- Retired faces ---

    /// Faces currently stashed by `op_id`.
    pub fn retired_by(&self, op_id: i64) -> impl Iterator<Item = &FaceData> {
        self.retired
            .iter()
            .filter(move |r| r.by_op == op_id)
            .map(|r| &r.face)
    }

    pub fn retired_count(&self) -> usize {
        self.retired.len()
    }

    // --- Adjacency index helpers ---

    pub(crate) fn link_face(&mut self, face: FaceKey) {
        if let Some(data) = self.faces.get(face) {
            for &v in &data.verts {
                self.vertex_to_faces.entry(v).or_default().insert(face);
            }
        }
    }

    pub(crate) fn unlink_face(&mut self, face: FaceKey, verts: &[VertexKey]) {
        for v in verts {
            if let Some(set) = self.vertex_to_faces.get_mut(v) {
                set.remove(&face);
                if set.is_empty() {
                    self.vertex_to_faces.remove(v);
                }
            }
        }
    }

    /// Next unused sequence number among root-owned vertices.
    pub(crate) fn next_root_vertex_seq(&self) -> i32 {
        self.vertices
            .values()
            .filter(|v| v.id.is_root())
            .map(|v| v.id.seq + 1)
            .max()
            .unwrap_or(0)
    }

    /// Next unused sequence number among root-owned faces (live or retired).
    pub(crate) fn next_root_face_seq(&self) -> i32 {
        let live = self.faces.values().map(|f| f.id);
        let stashed = self.retired.iter().map(|r| r.face.id);
        live.chain(stashed)
            .filter(|id| id.is_root())
            .map(|id| id.seq + 1)
            .max()
            .unwrap_or(0)
    }
}
