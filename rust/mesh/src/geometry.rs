// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometric queries on mesh faces.

use nalgebra::{Point3, Vector3};
use rustc_hash::FxHashMap;

use crate::arena::EditMesh;
use crate::keys::*;

impl EditMesh {
    /// Vertex positions of a face in loop order.
    pub fn face_positions(&self, key: FaceKey) -> Option<Vec<Point3<f64>>> {
        let face = self.faces.get(key)?;
        face.verts
            .iter()
            .map(|&v| self.vertex_position(v))
            .collect()
    }

    /// Computes the face normal using Newell's method.
    ///
    /// Works for any planar polygon (convex or concave). The direction
    /// follows the right-hand rule relative to the loop order.
    pub fn face_normal(&self, key: FaceKey) -> Option<Vector3<f64>> {
        let normal = newell(&self.face_positions(key)?);
        let len = normal.norm();
        if len < 1e-15 {
            return None;
        }
        Some(normal / len)
    }

    /// Area of a planar face.
    pub fn face_area(&self, key: FaceKey) -> Option<f64> {
        Some(newell(&self.face_positions(key)?).norm() / 2.0)
    }

    /// Average of the face's vertex positions.
    pub fn face_centroid(&self, key: FaceKey) -> Option<Point3<f64>> {
        let points = self.face_positions(key)?;
        if points.is_empty() {
            return None;
        }
        let sum = points
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.coords);
        Some(Point3::from(sum / points.len() as f64))
    }

    /// Edges used by exactly one of `faces`, oriented as in their face.
    ///
    /// For a connected region this is its outline (and hole outlines).
    pub fn boundary_edges(&self, faces: &[FaceKey]) -> Vec<(VertexKey, VertexKey)> {
        let mut uses: FxHashMap<(VertexKey, VertexKey), usize> = FxHashMap::default();
        let mut ordered = Vec::new();

        for &fk in faces {
            let Some(face) = self.faces.get(fk) else {
                continue;
            };
            let n = face.verts.len();
            for i in 0..n {
                let (a, b) = (face.verts[i], face.verts[(i + 1) % n]);
                let canonical = if a < b { (a, b) } else { (b, a) };
                *uses.entry(canonical).or_insert(0) += 1;
                ordered.push((a, b));
            }
        }

        ordered
            .into_iter()
            .filter(|&(a, b)| {
                let canonical = if a < b { (a, b) } else { (b, a) };
                uses.get(&canonical) == Some(&1)
            })
            .collect()
    }

    /// Chains boundary edges into closed vertex loops.
    pub fn boundary_loops(&self, faces: &[FaceKey]) -> Vec<Vec<VertexKey>> {
        let edges = self.boundary_edges(faces);
        let mut next: FxHashMap<VertexKey, VertexKey> = FxHashMap::default();
        for &(a, b) in &edges {
            next.insert(a, b);
        }

        let mut loops = Vec::new();
        let mut visited = rustc_hash::FxHashSet::default();
        for &(start, _) in &edges {
            if visited.contains(&start) {
                continue;
            }
            let mut chain = vec![start];
            visited.insert(start);
            let mut current = start;
            while let Some(&n) = next.get(&current) {
                if n == start || !visited.insert(n) {
                    break;
                }
                chain.push(n);
                current = n;
            }
            if chain.len() >= 3 {
                loops.push(chain);
            }
        }
        loops
    }
}

fn newell(points: &[Point3<f64>]) -> Vector3<f64> {
    let mut normal = Vector3::zeros();
    let n = points.len();
    for i in 0..n {
        let curr = points[i];
        let next = points[(i + 1) % n];
        normal.x += (curr.y - next.y) * (curr.z + next.z);
        normal.y += (curr.z - next.z) * (curr.x + next.x);
        normal.z += (curr.x - next.x) * (curr.y + next.y);
    }
    normal
}
