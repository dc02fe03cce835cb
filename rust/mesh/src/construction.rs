// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Construction methods for mesh elements.
//!
//! Each element is created through the arena, which checks referential
//! integrity, keeps logical identities unique, and maintains the adjacency
//! index.

use nalgebra::Point3;

use crate::arena::*;
use crate::attributes::FaceAttrs;
use crate::error::{Error, Result};
use crate::keys::*;

impl EditMesh {
    /// Creates a vertex with the given logical identity.
    pub fn add_vertex(&mut self, position: Point3<f64>, id: ElementId) -> Result<VertexKey> {
        if self.vertex_ids.contains_key(&id) {
            return Err(Error::DuplicateId(id));
        }
        let key = self.vertices.insert(VertexData { position, id });
        self.vertex_ids.insert(id, key);
        Ok(key)
    }

    /// Creates a root-owned vertex with the next free root sequence number.
    pub fn add_root_vertex(&mut self, position: Point3<f64>) -> VertexKey {
        let id = ElementId::root(self.next_root_vertex_seq());
        let key = self.vertices.insert(VertexData { position, id });
        self.vertex_ids.insert(id, key);
        key
    }

    /// Moves an existing vertex.
    pub fn set_vertex_position(&mut self, key: VertexKey, position: Point3<f64>) -> Result<()> {
        let v = self
            .vertices
            .get_mut(key)
            .ok_or(Error::VertexNotFound(key))?;
        v.position = position;
        Ok(())
    }

    /// Creates a face from an ordered vertex loop.
    ///
    /// Consecutive repeated vertices (including the closing pair) are
    /// collapsed; fewer than 3 remaining vertices is an error.
    pub fn add_face(
        &mut self,
        verts: &[VertexKey],
        id: ElementId,
        attrs: FaceAttrs,
    ) -> Result<FaceKey> {
        if self.face_ids.contains_key(&id) {
            return Err(Error::DuplicateId(id));
        }
        for &v in verts {
            if !self.vertices.contains_key(v) {
                return Err(Error::VertexNotFound(v));
            }
        }

        let loop_verts = collapse_repeats(verts);
        if loop_verts.len() < 3 {
            return Err(Error::DegenerateFace(loop_verts.len()));
        }

        let uv_w = vec![0.0; loop_verts.len()];
        let key = self.faces.insert(FaceData {
            verts: loop_verts,
            uv_w,
            attrs,
            id,
        });
        self.face_ids.insert(id, key);
        self.link_face(key);
        Ok(key)
    }

    /// Creates a root-owned face with the next free root sequence number.
    pub fn add_root_face(&mut self, verts: &[VertexKey], attrs: FaceAttrs) -> Result<FaceKey> {
        let id = ElementId::root(self.next_root_face_seq());
        self.add_face(verts, id, attrs)
    }

    /// Creates root vertices for `points` and a root face through them.
    pub fn add_root_polygon(&mut self, points: &[Point3<f64>], attrs: FaceAttrs) -> Result<FaceKey> {
        if points.len() < 3 {
            return Err(Error::DegenerateFace(points.len()));
        }
        let verts: Vec<VertexKey> = points.iter().map(|p| self.add_root_vertex(*p)).collect();
        self.add_root_face(&verts, attrs)
    }

    /// Inserts `v` between `a` and `b` in every face that has the edge `a-b`
    /// (either direction) and does not already use `v`.
    ///
    /// Returns the number of faces changed.
    pub fn split_edge(&mut self, a: VertexKey, b: VertexKey, v: VertexKey) -> usize {
        let candidates: Vec<FaceKey> = self
            .vertex_faces(a)
            .into_iter()
            .filter(|f| self.vertex_faces(b).contains(f))
            .collect();

        let mut changed = 0;
        for fk in candidates {
            let Some(face) = self.faces.get_mut(fk) else {
                continue;
            };
            if face.verts.contains(&v) {
                continue;
            }
            let n = face.verts.len();
            let position = (0..n).find(|&i| {
                let (p, q) = (face.verts[i], face.verts[(i + 1) % n]);
                (p == a && q == b) || (p == b && q == a)
            });
            if let Some(i) = position {
                face.verts.insert(i + 1, v);
                face.uv_w.insert(i + 1, 0.0);
                changed += 1;
                self.vertex_to_faces.entry(v).or_default().insert(fk);
            }
        }
        changed
    }

    /// Creates a point instance.
    pub fn add_instance(&mut self, data: InstanceData) -> Result<InstanceKey> {
        if self.instance_ids.contains_key(&data.id) {
            return Err(Error::DuplicateId(data.id));
        }
        let id = data.id;
        let key = self.instances.insert(data);
        self.instance_ids.insert(id, key);
        Ok(key)
    }

    /// Creates or updates the instance with the same logical identity.
    pub fn upsert_instance(&mut self, data: InstanceData) -> InstanceKey {
        if let Some(&key) = self.instance_ids.get(&data.id) {
            if let Some(existing) = self.instances.get_mut(key) {
                *existing = data;
                return key;
            }
        }
        let id = data.id;
        let key = self.instances.insert(data);
        self.instance_ids.insert(id, key);
        key
    }
}

/// Drops consecutive duplicates, treating the loop as closed.
fn collapse_repeats(verts: &[VertexKey]) -> Vec<VertexKey> {
    let mut out: Vec<VertexKey> = Vec::with_capacity(verts.len());
    for &v in verts {
        if out.last() != Some(&v) {
            out.push(v);
        }
    }
    while out.len() > 1 && out.first() == out.last() {
        out.pop();
    }
    out
}
