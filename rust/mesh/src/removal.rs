// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Removal, dissolving and retirement of mesh elements.

use crate::arena::*;
use crate::error::{Error, Result};
use crate::keys::*;

/// Counts of elements removed by [`EditMesh::remove_owned`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemovalSummary {
    pub vertices: usize,
    pub faces: usize,
    pub instances: usize,
}

impl EditMesh {
    /// Removes a face, returning its data.
    pub fn remove_face(&mut self, key: FaceKey) -> Option<FaceData> {
        let data = self.faces.remove(key)?;
        self.unlink_face(key, &data.verts);
        if self.face_ids.get(&data.id) == Some(&key) {
            self.face_ids.remove(&data.id);
        }
        Some(data)
    }

    /// Removes every face owned by `op_id`. Returns the number removed.
    pub fn remove_faces_owned_by(&mut self, op_id: i64) -> usize {
        let owned = self.faces_owned_by(op_id);
        for &(_, fk) in &owned {
            self.remove_face(fk);
        }
        owned.len()
    }

    /// Removes a vertex from every face loop that uses it, then deletes it.
    ///
    /// Faces left with fewer than 3 vertices are removed.
    pub fn dissolve_vertex(&mut self, key: VertexKey) -> Result<()> {
        if !self.vertices.contains_key(key) {
            return Err(Error::VertexNotFound(key));
        }

        for fk in self.vertex_faces(key) {
            let degenerate = match self.faces.get_mut(fk) {
                Some(face) => {
                    while let Some(i) = face.verts.iter().position(|&v| v == key) {
                        face.verts.remove(i);
                        face.uv_w.remove(i);
                    }
                    face.verts.len() < 3
                }
                None => false,
            };
            if degenerate {
                self.remove_face(fk);
            }
        }
        self.vertex_to_faces.remove(&key);

        if let Some(data) = self.vertices.remove(key) {
            if self.vertex_ids.get(&data.id) == Some(&key) {
                self.vertex_ids.remove(&data.id);
            }
        }
        Ok(())
    }

    pub fn remove_instance(&mut self, key: InstanceKey) -> Option<InstanceData> {
        let data = self.instances.remove(key)?;
        if self.instance_ids.get(&data.id) == Some(&key) {
            self.instance_ids.remove(&data.id);
        }
        Some(data)
    }

    /// Removes all faces, instances and vertices owned by `op_id`.
    ///
    /// Faces are removed first; owned vertices are then dissolved so that
    /// foreign faces which picked them up through edge splits keep their
    /// remaining corners.
    pub fn remove_owned(&mut self, op_id: i64) -> RemovalSummary {
        let faces = self.remove_faces_owned_by(op_id);

        let instances = self.instances_owned_by(op_id);
        for &(_, ik) in &instances {
            self.remove_instance(ik);
        }

        let vertices = self.vertices_owned_by(op_id);
        for &(_, vk) in &vertices {
            // Keys were just listed from the arena.
            let _ = self.dissolve_vertex(vk);
        }

        RemovalSummary {
            vertices: vertices.len(),
            faces,
            instances: instances.len(),
        }
    }

    /// Moves a face into the retired stash on behalf of `by_op`.
    pub fn retire_face(&mut self, key: FaceKey, by_op: i64) -> Result<()> {
        let face = self.remove_face(key).ok_or(Error::FaceNotFound(key))?;
        self.retired.push(RetiredFace { face, by_op });
        Ok(())
    }

    /// Puts faces retired by `by_op` back into the mesh.
    ///
    /// A stashed face is discarded instead when one of its vertices no longer
    /// exists or its logical id was recreated in the meantime. Returns the
    /// number of faces restored.
    pub fn restore_retired(&mut self, by_op: i64) -> usize {
        let (mine, rest): (Vec<RetiredFace>, Vec<RetiredFace>) = std::mem::take(&mut self.retired)
            .into_iter()
            .partition(|r| r.by_op == by_op);
        self.retired = rest;

        let mut restored = 0;
        for RetiredFace { face, .. } in mine {
            let alive = face.verts.iter().all(|&v| self.vertices.contains_key(v));
            if !alive || self.face_ids.contains_key(&face.id) {
                continue;
            }
            let id = face.id;
            let key = self.faces.insert(face);
            self.face_ids.insert(id, key);
            self.link_face(key);
            restored += 1;
        }
        restored
    }

    /// Forgets stashed copies of faces owned by `op_id`, whoever retired them.
    ///
    /// Called when `op_id` rebuilds its output: faces it still produces are
    /// created again, and the ones it no longer produces must not come back.
    pub fn drop_retired_faces_of(&mut self, op_id: i64) -> usize {
        let before = self.retired.len();
        self.retired.retain(|r| r.face.id.op_id != op_id);
        before - self.retired.len()
    }

    /// Forgets faces retired by `by_op` without restoring them.
    pub fn drop_retired(&mut self, by_op: i64) -> usize {
        let before = self.retired.len();
        self.retired.retain(|r| r.by_op != by_op);
        before - self.retired.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::FaceAttrs;
    use nalgebra::Point3;

    fn square(mesh: &mut EditMesh) -> (FaceKey, Vec<VertexKey>) {
        let verts: Vec<VertexKey> = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ]
        .iter()
        .map(|p| mesh.add_root_vertex(*p))
        .collect();
        let face = mesh.add_root_face(&verts, FaceAttrs::default()).unwrap();
        (face, verts)
    }

    #[test]
    fn dissolve_keeps_face_with_enough_corners() {
        let mut mesh = EditMesh::new();
        let (face, verts) = square(&mut mesh);
        let mid = mesh
            .add_vertex(Point3::new(0.5, 0.0, 0.0), ElementId::new(0, 0))
            .unwrap();
        mesh.split_edge(verts[0], verts[1], mid);

        mesh.dissolve_vertex(mid).unwrap();
        assert_eq!(mesh.face_vertices(face).unwrap().len(), 4);
        assert!(mesh.find_vertex(ElementId::new(0, 0)).is_none());
    }

    #[test]
    fn dissolve_removes_degenerate_face() {
        let mut mesh = EditMesh::new();
        let a = mesh.add_root_vertex(Point3::new(0.0, 0.0, 0.0));
        let b = mesh.add_root_vertex(Point3::new(1.0, 0.0, 0.0));
        let c = mesh.add_root_vertex(Point3::new(0.0, 1.0, 0.0));
        mesh.add_root_face(&[a, b, c], FaceAttrs::default()).unwrap();

        mesh.dissolve_vertex(c).unwrap();
        assert_eq!(mesh.face_count(), 0);
        assert_eq!(mesh.vertex_count(), 2);
    }

    #[test]
    fn retire_and_restore() {
        let mut mesh = EditMesh::new();
        let (face, _) = square(&mut mesh);
        let id = mesh.face(face).unwrap().id;

        mesh.retire_face(face, 5).unwrap();
        assert_eq!(mesh.face_count(), 0);
        assert_eq!(mesh.retired_by(5).count(), 1);

        assert_eq!(mesh.restore_retired(5), 1);
        assert_eq!(mesh.face_count(), 1);
        assert!(mesh.find_face(id).is_some());
        assert_eq!(mesh.retired_count(), 0);
    }

    #[test]
    fn restore_skips_recreated_faces() {
        let mut mesh = EditMesh::new();
        let (face, verts) = square(&mut mesh);
        let id = mesh.face(face).unwrap().id;
        mesh.retire_face(face, 5).unwrap();

        mesh.add_face(&verts, id, FaceAttrs::default()).unwrap();
        assert_eq!(mesh.restore_retired(5), 0);
        assert_eq!(mesh.face_count(), 1);
    }

    #[test]
    fn rebuilt_owner_invalidates_stashed_copies() {
        let mut mesh = EditMesh::new();
        let (_, verts) = square(&mut mesh);
        let piece = mesh
            .add_face(&verts, ElementId::new(2, 0), FaceAttrs::default())
            .unwrap();
        mesh.retire_face(piece, 5).unwrap();
        let (root, _) = square(&mut mesh);
        mesh.retire_face(root, 5).unwrap();

        assert_eq!(mesh.drop_retired_faces_of(2), 1);
        assert_eq!(mesh.retired_by(5).count(), 1);
        assert_eq!(mesh.restore_retired(5), 1);
        assert!(mesh.find_face(ElementId::new(2, 0)).is_none());
    }

    #[test]
    fn remove_owned_clears_operation() {
        let mut mesh = EditMesh::new();
        let (_, verts) = square(&mut mesh);
        let v = mesh
            .add_vertex(Point3::new(0.5, 0.5, 1.0), ElementId::new(2, 0))
            .unwrap();
        mesh.add_face(&[verts[0], verts[1], v], ElementId::new(2, 0), FaceAttrs::default())
            .unwrap();

        let summary = mesh.remove_owned(2);
        assert_eq!(summary.faces, 1);
        assert_eq!(summary.vertices, 1);
        assert_eq!(mesh.face_count(), 1);
        assert_eq!(mesh.vertex_count(), 4);
    }
}
