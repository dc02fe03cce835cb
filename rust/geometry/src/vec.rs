// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polygon points that remember where they came from.

use archkit_mesh::VertexKey;
use nalgebra::{Point2, Point3};

/// A polygon point: 3D position, 2D position in the owning polygon's frame
/// and an optional back-reference to the mesh vertex it was read from.
///
/// A point without `vert` is *virtual*: realizing it in the mesh creates a
/// new vertex. `on_edge` marks a virtual point that lies on an existing mesh
/// edge, so that neighbouring faces can be split there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmartVec {
    pub co: Point3<f64>,
    pub co2: Point2<f64>,
    pub vert: Option<VertexKey>,
    /// Angle of `co2` around the polygon center, in `[0, 2π)`.
    pub winding: f64,
    pub on_edge: Option<(VertexKey, VertexKey)>,
}

impl SmartVec {
    /// A virtual point at `co`.
    pub fn new(co: Point3<f64>) -> Self {
        Self {
            co,
            co2: Point2::origin(),
            vert: None,
            winding: 0.0,
            on_edge: None,
        }
    }

    /// A point linked to an existing mesh vertex.
    pub fn linked(co: Point3<f64>, vert: VertexKey) -> Self {
        Self {
            vert: Some(vert),
            ..Self::new(co)
        }
    }

    /// A virtual point lying on the mesh edge `a-b`.
    pub fn on_edge(co: Point3<f64>, a: VertexKey, b: VertexKey) -> Self {
        Self {
            on_edge: Some((a, b)),
            ..Self::new(co)
        }
    }

    pub fn is_virtual(&self) -> bool {
        self.vert.is_none()
    }

    /// A copy with the mesh references dropped.
    pub fn unlinked(&self) -> Self {
        Self {
            vert: None,
            on_edge: None,
            ..*self
        }
    }

    /// Whether both points are the same mesh vertex or coincide within `eps`.
    pub fn same_as(&self, other: &SmartVec, eps: f64) -> bool {
        match (self.vert, other.vert) {
            (Some(a), Some(b)) => a == b,
            _ => (self.co - other.co).norm() <= eps,
        }
    }
}

/// Drops consecutive duplicates, treating the loop as closed.
pub fn dedup_loop(points: Vec<SmartVec>, eps: f64) -> Vec<SmartVec> {
    let mut out: Vec<SmartVec> = Vec::with_capacity(points.len());
    for p in points {
        if out.last().is_some_and(|last| last.same_as(&p, eps)) {
            continue;
        }
        out.push(p);
    }
    while out.len() > 1 {
        let (Some(first), Some(last)) = (out.first(), out.last()) else {
            break;
        };
        if !first.same_as(last, eps) {
            break;
        }
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_closes_loop() {
        let p = |x: f64| SmartVec::new(Point3::new(x, 0.0, 0.0));
        let pts = vec![p(0.0), p(1.0), p(1.0), p(2.0), p(0.0)];
        let out = dedup_loop(pts, 1e-9);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn unlinked_is_virtual() {
        let mut mesh = archkit_mesh::EditMesh::new();
        let v = mesh.add_root_vertex(Point3::origin());
        let sv = SmartVec::linked(Point3::origin(), v);
        assert!(!sv.is_virtual());
        assert!(sv.unlinked().is_virtual());
    }
}
