// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Spatial index for tolerance-based vertex lookup and merging.
//!
//! A grid-based spatial hash gives O(1) average-case nearest-vertex queries.
//! Operations use it to weld the vertices they emit, so that two generated
//! faces meeting at the same point share one vertex.

use nalgebra::Point3;
use rustc_hash::FxHashMap;

use crate::arena::EditMesh;
use crate::error::Result;
use crate::keys::*;

/// A spatial hash grid for fast tolerance-based vertex lookup.
///
/// Lookups check the 27 neighboring cells (3x3x3 neighborhood), so the
/// tolerance used for queries should not exceed `cell_size`.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    cell_size: f64,
    grid: FxHashMap<(i64, i64, i64), Vec<VertexKey>>,
}

impl SpatialIndex {
    /// Creates a new spatial index with the given cell size.
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size: cell_size.max(1e-12),
            grid: FxHashMap::default(),
        }
    }

    /// Builds a spatial index from all vertices in a mesh.
    pub fn from_mesh(mesh: &EditMesh, cell_size: f64) -> Self {
        let mut index = Self::new(cell_size);
        for (key, data) in mesh.vertices.iter() {
            index.insert(key, &data.position);
        }
        index
    }

    pub fn insert(&mut self, key: VertexKey, position: &Point3<f64>) {
        let cell = self.cell_coords(position);
        self.grid.entry(cell).or_default().push(key);
    }

    pub fn is_empty(&self) -> bool {
        self.grid.is_empty()
    }

    /// Finds the closest live vertex within `tolerance` of `position`.
    pub fn find_near(
        &self,
        mesh: &EditMesh,
        position: &Point3<f64>,
        tolerance: f64,
    ) -> Option<VertexKey> {
        let tol_sq = tolerance * tolerance;
        self.candidates(position)
            .filter_map(|vk| {
                let p = mesh.vertex_position(vk)?;
                let dist_sq = (p - position).norm_squared();
                (dist_sq <= tol_sq).then_some((vk, dist_sq))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(vk, _)| vk)
    }

    /// Finds all live vertices within `tolerance` of `position`.
    pub fn find_all_near(
        &self,
        mesh: &EditMesh,
        position: &Point3<f64>,
        tolerance: f64,
    ) -> Vec<VertexKey> {
        let tol_sq = tolerance * tolerance;
        self.candidates(position)
            .filter(|&vk| {
                mesh.vertex_position(vk)
                    .is_some_and(|p| (p - position).norm_squared() <= tol_sq)
            })
            .collect()
    }

    fn candidates<'a>(&'a self, position: &Point3<f64>) -> impl Iterator<Item = VertexKey> + 'a {
        let (cx, cy, cz) = self.cell_coords(position);
        (-1..=1)
            .flat_map(move |dx| (-1..=1).flat_map(move |dy| (-1..=1).map(move |dz| (dx, dy, dz))))
            .filter_map(move |(dx, dy, dz)| self.grid.get(&(cx + dx, cy + dy, cz + dz)))
            .flatten()
            .copied()
    }

    fn cell_coords(&self, p: &Point3<f64>) -> (i64, i64, i64) {
        (
            (p.x / self.cell_size).floor() as i64,
            (p.y / self.cell_size).floor() as i64,
            (p.z / self.cell_size).floor() as i64,
        )
    }
}

impl EditMesh {
    /// Returns an existing vertex within `tolerance` of `position`, or
    /// creates one with identity `id`.
    ///
    /// The returned flag is `true` when a new vertex was created.
    pub fn find_or_add_vertex(
        &mut self,
        index: &mut SpatialIndex,
        position: Point3<f64>,
        id: ElementId,
        tolerance: f64,
    ) -> Result<(VertexKey, bool)> {
        if let Some(existing) = index.find_near(self, &position, tolerance) {
            return Ok((existing, false));
        }
        let key = self.add_vertex(position, id)?;
        index.insert(key, &position);
        Ok((key, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_within_tolerance() {
        let mut mesh = EditMesh::new();
        let a = mesh.add_root_vertex(Point3::new(0.0, 0.0, 0.0));
        let _b = mesh.add_root_vertex(Point3::new(1.0, 0.0, 0.0));
        let index = SpatialIndex::from_mesh(&mesh, 1e-3);

        assert_eq!(index.find_near(&mesh, &Point3::new(1e-4, 0.0, 0.0), 1e-3), Some(a));
        assert_eq!(index.find_near(&mesh, &Point3::new(0.5, 0.0, 0.0), 1e-3), None);
    }

    #[test]
    fn find_or_add_welds() {
        let mut mesh = EditMesh::new();
        let mut index = SpatialIndex::new(1e-5);
        let (a, created_a) = mesh
            .find_or_add_vertex(&mut index, Point3::new(0.2, 0.3, 0.0), ElementId::new(4, 0), 1e-5)
            .unwrap();
        let (b, created_b) = mesh
            .find_or_add_vertex(&mut index, Point3::new(0.2, 0.3, 1e-7), ElementId::new(4, 1), 1e-5)
            .unwrap();
        assert!(created_a);
        assert!(!created_b);
        assert_eq!(a, b);
        assert_eq!(mesh.vertex_count(), 1);
    }

    #[test]
    fn removed_vertices_are_ignored() {
        let mut mesh = EditMesh::new();
        let a = mesh.add_root_vertex(Point3::new(0.0, 0.0, 0.0));
        let index = SpatialIndex::from_mesh(&mesh, 1e-3);
        mesh.dissolve_vertex(a).unwrap();
        assert!(index.find_near(&mesh, &Point3::origin(), 1e-3).is_none());
    }
}
