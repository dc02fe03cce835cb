// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Build context: the only way operators write into the mesh.
//!
//! A context is opened for one run of one operation. It tags every new
//! element with `(op_id, seq)`, handing out seqs in creation order, so a
//! rerun with the same inputs produces the same identities. Vertices left
//! over from the previous run are moved into place instead of recreated,
//! and the ones no longer needed are dissolved when the context finishes.

use archkit_geometry::{Frame, SmartVec};
use archkit_journal::{OpId, TopologyInfo};
use archkit_mesh::{
    EditMesh, ElementId, FaceAttrs, FaceKey, InstanceData, InstanceKey, SpatialIndex, UvMode,
    VertexKey,
};
use nalgebra::{Point3, Rotation3, Vector3};
use rustc_hash::FxHashSet;

use crate::config::Config;
use crate::error::Result;

pub struct BuildContext<'a> {
    mesh: &'a mut EditMesh,
    op_id: OpId,
    merge_distance: f64,
    insert_perimeter: bool,
    index: SpatialIndex,
    indexed: FxHashSet<VertexKey>,
    used: FxHashSet<VertexKey>,
    used_instances: FxHashSet<InstanceKey>,
    next_vertex: i32,
    next_face: i32,
    next_instance: i32,
    uv_frame: Option<Frame>,
    info: TopologyInfo,
}

impl<'a> BuildContext<'a> {
    /// Opens a run of `op_id`: faces it retired come back, the faces it
    /// produced last time are removed, and copies of them stashed by its
    /// children are forgotten. Its vertices stay for reuse.
    pub fn begin(mesh: &'a mut EditMesh, op_id: OpId, config: &Config) -> Self {
        let stale = mesh.drop_retired_faces_of(op_id);
        let restored = mesh.restore_retired(op_id);
        let removed = mesh.remove_faces_owned_by(op_id);
        tracing::debug!(op_id, restored, removed, stale, "opened build context");
        Self {
            mesh,
            op_id,
            merge_distance: config.merge_distance,
            insert_perimeter: config.insert_perimeter,
            index: SpatialIndex::new(config.merge_distance),
            indexed: FxHashSet::default(),
            used: FxHashSet::default(),
            used_instances: FxHashSet::default(),
            next_vertex: 0,
            next_face: 0,
            next_instance: 0,
            uv_frame: None,
            info: TopologyInfo::new(),
        }
    }

    pub fn op_id(&self) -> OpId {
        self.op_id
    }

    pub fn mesh(&self) -> &EditMesh {
        &*self.mesh
    }

    pub fn merge_distance(&self) -> f64 {
        self.merge_distance
    }

    /// Default for bridge perimeter insertion.
    pub fn insert_perimeter(&self) -> bool {
        self.insert_perimeter
    }

    fn index_vertex(&mut self, key: VertexKey) {
        if self.indexed.insert(key) {
            if let Some(p) = self.mesh.vertex_position(key) {
                self.index.insert(key, &p);
            }
        }
    }

    /// Makes existing vertices available for merging with new points.
    pub fn share(&mut self, keys: &[VertexKey]) {
        for &key in keys {
            self.index_vertex(key);
        }
    }

    /// Realizes a polygon point as a mesh vertex.
    ///
    /// Linked points resolve to their vertex. Other points merge with a
    /// vertex realized earlier in this run, or take the next seq: the vertex
    /// with that identity is moved if it survives from the previous run,
    /// created otherwise. A new point lying on a mesh edge splits the faces
    /// along that edge.
    pub fn vertex(&mut self, point: &SmartVec) -> Result<VertexKey> {
        if let Some(key) = point.vert.filter(|&v| self.mesh.contains_vertex(v)) {
            self.index_vertex(key);
            return Ok(key);
        }
        if let Some(key) = self.index.find_near(self.mesh, &point.co, self.merge_distance) {
            return Ok(key);
        }

        let key = self.vertex_at(point.co)?;
        if let Some((a, b)) = point.on_edge {
            if self.mesh.contains_vertex(a) && self.mesh.contains_vertex(b) {
                let split = self.mesh.split_edge(a, b, key);
                if split > 0 {
                    tracing::debug!(op_id = self.op_id, faces = split, "split neighbour edge");
                }
            }
        }
        Ok(key)
    }

    /// Creates (or moves) the vertex with the next seq, without merging.
    pub fn vertex_at(&mut self, position: Point3<f64>) -> Result<VertexKey> {
        let id = ElementId::new(self.op_id, self.next_vertex);
        self.next_vertex += 1;
        let key = match self.mesh.find_vertex(id) {
            Some(key) => {
                self.mesh.set_vertex_position(key, position)?;
                key
            }
            None => self.mesh.add_vertex(position, id)?,
        };
        self.used.insert(key);
        self.indexed.insert(key);
        self.index.insert(key, &position);
        Ok(key)
    }

    /// Sets the frame oriented and polar UVs are projected in.
    pub fn set_uv_frame(&mut self, frame: Frame) {
        self.uv_frame = Some(frame);
    }

    /// Realizes the points and adds a face in `slot`.
    ///
    /// A loop with fewer than three distinct vertices is skipped and yields
    /// `None`.
    pub fn face(
        &mut self,
        points: &[SmartVec],
        slot: &str,
        attrs: FaceAttrs,
    ) -> Result<Option<FaceKey>> {
        let keys = points
            .iter()
            .map(|p| self.vertex(p))
            .collect::<Result<Vec<_>>>()?;
        self.face_from_keys(&keys, slot, attrs)
    }

    pub fn face_from_keys(
        &mut self,
        keys: &[VertexKey],
        slot: &str,
        attrs: FaceAttrs,
    ) -> Result<Option<FaceKey>> {
        let mut verts: Vec<VertexKey> = Vec::with_capacity(keys.len());
        for &k in keys {
            if verts.last() != Some(&k) {
                verts.push(k);
            }
        }
        while verts.len() > 1 && verts.first() == verts.last() {
            verts.pop();
        }
        let distinct: FxHashSet<VertexKey> = verts.iter().copied().collect();
        if distinct.len() < 3 {
            tracing::debug!(op_id = self.op_id, slot, verts = distinct.len(), "skipped degenerate face");
            self.info.declare_slot(slot);
            return Ok(None);
        }

        let seq = self.next_face;
        self.next_face += 1;
        let attrs = self.with_uv(attrs);
        let key = self
            .mesh
            .add_face(&verts, ElementId::new(self.op_id, seq), attrs)?;
        if let Some(depths) = self.loop_uv_w(&verts, attrs.uv_mode) {
            self.mesh.set_loop_uv_w(key, &depths);
        }
        self.info.push_face(slot, seq);
        Ok(Some(key))
    }

    fn with_uv(&self, mut attrs: FaceAttrs) -> FaceAttrs {
        let Some(frame) = self.uv_frame else {
            return attrs;
        };
        if matches!(attrs.uv_mode, UvMode::Oriented | UvMode::Polar) {
            attrs.uv_origin = [frame.origin.x, frame.origin.y, frame.origin.z];
            let basis = Rotation3::from_basis_unchecked(&[frame.x_axis, frame.y_axis, frame.normal]);
            let (roll, pitch, yaw) = basis.euler_angles();
            attrs.uv_rotate = [roll, pitch, yaw];
        }
        attrs
    }

    /// Oriented UVs use the depth along the frame normal, polar ones the distance
    /// from its axis.
    fn loop_uv_w(&self, verts: &[VertexKey], mode: UvMode) -> Option<Vec<f64>> {
        let frame = self.uv_frame?;
        if !matches!(mode, UvMode::Oriented | UvMode::Polar) {
            return None;
        }
        verts
            .iter()
            .map(|&v| {
                let p = self.mesh.vertex_position(v)?;
                let d: Vector3<f64> = p - frame.origin;
                Some(match mode {
                    UvMode::Polar => (d - frame.normal * d.dot(&frame.normal)).norm(),
                    _ => d.dot(&frame.normal),
                })
            })
            .collect()
    }

    /// Registers an output slot even when this run fills it with nothing.
    pub fn declare_slot(&mut self, slot: &str) {
        self.info.declare_slot(slot);
    }

    pub fn set_modulus(&mut self, slot: &str, modulus: usize) {
        self.info.set_modulus(slot, modulus as i32);
    }

    /// Faces added to `slot` so far in this run.
    pub fn slot_len(&self, slot: &str) -> usize {
        self.info.faces_in(slot).len()
    }

    /// Places a point instance with the next instance seq.
    pub fn instance(
        &mut self,
        source: &str,
        position: Point3<f64>,
        rotation: [f64; 3],
        scale: f64,
    ) -> InstanceKey {
        let id = ElementId::new(self.op_id, self.next_instance);
        self.next_instance += 1;
        let key = self.mesh.upsert_instance(InstanceData {
            id,
            source: source.to_string(),
            position,
            rotation,
            scale,
        });
        self.used_instances.insert(key);
        key
    }

    /// Takes a control face out of the mesh on behalf of this operation.
    pub fn retire(&mut self, face: FaceKey) -> Result<()> {
        self.mesh.retire_face(face, self.op_id)?;
        Ok(())
    }

    /// Closes the run: vertices and instances of the previous run that were
    /// not reused are deleted. Returns the manifest of this run.
    pub fn finish(self) -> TopologyInfo {
        let mut dissolved = 0;
        for (_, key) in self.mesh.vertices_owned_by(self.op_id) {
            if !self.used.contains(&key) && self.mesh.dissolve_vertex(key).is_ok() {
                dissolved += 1;
            }
        }
        for (_, key) in self.mesh.instances_owned_by(self.op_id) {
            if !self.used_instances.contains(&key) {
                self.mesh.remove_instance(key);
            }
        }
        tracing::debug!(
            op_id = self.op_id,
            vertices = self.next_vertex,
            faces = self.next_face,
            dissolved,
            "closed build context"
        );
        self.info
    }
}
