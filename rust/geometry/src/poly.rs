// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Oriented polygons living in a local 2D frame embedded in 3D.
//!
//! A [`SmartPoly`] is an ordered list of [`SmartVec`] plus a derived frame:
//! center, normal and an orthonormal `(x, y, normal)` basis. All 2D
//! coordinates are expressed relative to the center in that basis.
//!
//! The derived state is **not** kept in sync automatically: after mutating
//! `points`, call [`SmartPoly::calculate`] (or [`SmartPoly::refresh`] to keep
//! the current frame).

use std::f64::consts::TAU;

use archkit_mesh::{EditMesh, FaceKey};
use nalgebra::{Point2, Point3, Rotation3, Unit, Vector2, Vector3};

use crate::contour::{self, cross, EPSILON_2D};
use crate::error::{Error, Result};
use crate::vec::SmartVec;

/// Global up direction used to orient frames.
pub const UP: Vector3<f64> = Vector3::new(0.0, 0.0, 1.0);

/// Below this |cross| the frame normal is considered degenerate.
const NORMAL_EPSILON: f64 = 1e-9;

/// A local coordinate frame: origin plus right-handed orthonormal basis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub origin: Point3<f64>,
    pub normal: Vector3<f64>,
    pub x_axis: Vector3<f64>,
    pub y_axis: Vector3<f64>,
}

impl Default for Frame {
    fn default() -> Self {
        Self::from_normal(Point3::origin(), UP)
    }
}

impl Frame {
    /// Builds the basis for `normal` (assumed unit length).
    ///
    /// X is `UP × normal`; when the normal is nearly vertical the cross
    /// product degenerates and X falls back to the global X axis.
    pub fn from_normal(origin: Point3<f64>, normal: Vector3<f64>) -> Self {
        let x_axis = if normal.z.abs() > 1.0 - 1e-6 {
            Vector3::x()
        } else {
            UP.cross(&normal).normalize()
        };
        let y_axis = normal.cross(&x_axis).normalize();
        Self {
            origin,
            normal,
            x_axis,
            y_axis,
        }
    }

    #[inline]
    pub fn make_2d(&self, p: &Point3<f64>) -> Point2<f64> {
        let d = p - self.origin;
        Point2::new(d.dot(&self.x_axis), d.dot(&self.y_axis))
    }

    #[inline]
    pub fn make_3d(&self, p: &Point2<f64>) -> Point3<f64> {
        self.origin + self.x_axis * p.x + self.y_axis * p.y
    }

    /// Like [`Frame::make_3d`], offset by `depth` along the normal.
    #[inline]
    pub fn make_3d_depth(&self, p: &Point2<f64>, depth: f64) -> Point3<f64> {
        self.make_3d(p) + self.normal * depth
    }

    /// Signed distance of `p` from the frame plane.
    #[inline]
    pub fn depth_of(&self, p: &Point3<f64>) -> f64 {
        (p - self.origin).dot(&self.normal)
    }

    /// Converts a 2D direction to 3D.
    #[inline]
    pub fn vector_3d(&self, v: &Vector2<f64>) -> Vector3<f64> {
        self.x_axis * v.x + self.y_axis * v.y
    }
}

/// An ordered polygon with a derived local frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SmartPoly {
    pub points: Vec<SmartVec>,
    pub frame: Frame,
    pub bbox_min: Point2<f64>,
    pub bbox_max: Point2<f64>,
    /// Signed area in the frame; positive when counter-clockwise.
    pub area: f64,
    fallback_normal: Option<Vector3<f64>>,
}

impl SmartPoly {
    /// Builds a polygon from raw 3D points.
    pub fn from_points(points: &[Point3<f64>]) -> Self {
        let vecs = points.iter().map(|p| SmartVec::new(*p)).collect();
        Self::from_vecs(vecs, None)
    }

    /// Builds a polygon from existing points.
    ///
    /// With `break_link` every point becomes virtual, so realizing the new
    /// polygon creates fresh vertices instead of reusing the source's.
    pub fn from_smart_vecs(points: &[SmartVec], break_link: bool) -> Self {
        let vecs = points
            .iter()
            .map(|p| if break_link { p.unlinked() } else { *p })
            .collect();
        Self::from_vecs(vecs, None)
    }

    /// Copies another polygon's points (see [`SmartPoly::from_smart_vecs`]).
    pub fn from_poly(other: &SmartPoly, break_link: bool) -> Self {
        let mut poly = Self::from_smart_vecs(&other.points, break_link);
        poly.fallback_normal = other.fallback_normal;
        poly
    }

    /// Builds a polygon from 2D points in `frame`, keeping that frame.
    pub fn with_frame_of(points: &[Point2<f64>], frame: &Frame) -> Self {
        let vecs = points
            .iter()
            .map(|p| SmartVec::new(frame.make_3d(p)))
            .collect();
        let mut poly = Self::empty(*frame);
        poly.points = vecs;
        poly.refresh();
        poly
    }

    /// A polygon over `points` sharing this polygon's frame.
    pub fn with_points(&self, points: Vec<SmartVec>) -> SmartPoly {
        let mut poly = Self::empty(self.frame);
        poly.points = points;
        poly.fallback_normal = self.fallback_normal;
        poly.refresh();
        poly
    }

    /// Builds a polygon from a mesh face, linked to its vertices.
    pub fn from_face(mesh: &EditMesh, face: FaceKey) -> Result<Self> {
        let verts = mesh
            .face_vertices(face)
            .ok_or_else(|| Error::Degenerate(format!("face {face:?} not found")))?;
        let points = verts
            .iter()
            .filter_map(|&v| mesh.vertex_position(v).map(|co| SmartVec::linked(co, v)))
            .collect::<Vec<_>>();
        if points.len() < 3 {
            return Err(Error::TooFewPoints {
                needed: 3,
                got: points.len(),
            });
        }
        Ok(Self::from_vecs(points, None))
    }

    fn from_vecs(points: Vec<SmartVec>, fallback_normal: Option<Vector3<f64>>) -> Self {
        let mut poly = Self::empty(Frame::default());
        poly.points = points;
        poly.fallback_normal = fallback_normal;
        poly.calculate();
        poly
    }

    fn empty(frame: Frame) -> Self {
        Self {
            points: Vec::new(),
            frame,
            bbox_min: Point2::origin(),
            bbox_max: Point2::origin(),
            area: 0.0,
            fallback_normal: None,
        }
    }

    /// Sets the normal used when the points do not define one, and
    /// recomputes the frame.
    pub fn with_fallback_normal(mut self, normal: Vector3<f64>) -> Self {
        self.fallback_normal = Unit::try_new(normal, 1e-12).map(|n| n.into_inner());
        self.calculate();
        self
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn center(&self) -> Point3<f64> {
        self.frame.origin
    }

    pub fn normal(&self) -> Vector3<f64> {
        self.frame.normal
    }

    /// Recomputes center, frame, 2D coordinates, winding, bbox and area.
    pub fn calculate(&mut self) {
        if self.points.is_empty() {
            return;
        }
        let center = mean(self.points.iter().map(|p| p.co));
        let normal = self.derive_normal(&center);
        self.frame = Frame::from_normal(center, normal);
        self.refresh();
    }

    /// Recomputes the 2D state while keeping the current frame.
    pub fn refresh(&mut self) {
        let frame = self.frame;
        for p in &mut self.points {
            p.co2 = frame.make_2d(&p.co);
            p.winding = winding_of(&p.co2);
        }
        let pts = self.points_2d();
        if let Some((min, max)) = contour::contour_bounds(&pts) {
            self.bbox_min = min;
            self.bbox_max = max;
        }
        self.area = contour::signed_area(&pts);
    }

    /// Cross of the first two center-relative directions, checked against
    /// Newell's normal for orientation; Newell, then the fallback, then +Z
    /// when degenerate.
    fn derive_normal(&self, center: &Point3<f64>) -> Vector3<f64> {
        let newell = newell_normal(self.points.iter().map(|p| &p.co));
        let newell_unit = Unit::try_new(newell, NORMAL_EPSILON).map(|n| n.into_inner());

        if self.points.len() >= 2 {
            let a = self.points[0].co - center;
            let b = self.points[1].co - center;
            if let (Some(a), Some(b)) = (
                Unit::try_new(a, NORMAL_EPSILON),
                Unit::try_new(b, NORMAL_EPSILON),
            ) {
                if let Some(n) = Unit::try_new(a.cross(&b), 1e-6) {
                    let n = n.into_inner();
                    return match newell_unit {
                        Some(nw) if nw.dot(&n) < 0.0 => -n,
                        _ => n,
                    };
                }
            }
        }

        newell_unit.or(self.fallback_normal).unwrap_or(UP)
    }

    pub fn make_2d(&self, p: &Point3<f64>) -> Point2<f64> {
        self.frame.make_2d(p)
    }

    pub fn make_3d(&self, p: &Point2<f64>) -> Point3<f64> {
        self.frame.make_3d(p)
    }

    pub fn make_3d_depth(&self, p: &Point2<f64>, depth: f64) -> Point3<f64> {
        self.frame.make_3d_depth(p, depth)
    }

    pub fn points_2d(&self) -> Vec<Point2<f64>> {
        self.points.iter().map(|p| p.co2).collect()
    }

    pub fn points_3d(&self) -> Vec<Point3<f64>> {
        self.points.iter().map(|p| p.co).collect()
    }

    /// Orders points by winding angle around the center.
    pub fn sort_winding(&mut self) {
        self.points
            .sort_by(|a, b| a.winding.total_cmp(&b.winding));
        self.area = contour::signed_area(&self.points_2d());
    }

    /// Finds the angular sector containing `p`.
    ///
    /// Returns the indices `(i, j)` of the boundary points bounding the
    /// sector when `p` lies in the triangle `(center, i, j)`. Points must be
    /// sorted by winding.
    pub fn pt_inside(&self, p: &Point2<f64>) -> Option<(usize, usize)> {
        let n = self.points.len();
        if n < 3 {
            return None;
        }
        let angle = winding_of(p);
        for i in 0..n {
            let j = (i + 1) % n;
            let (lo, mut hi) = (self.points[i].winding, self.points[j].winding);
            let mut a = angle;
            if j == 0 {
                hi += TAU;
                if a < lo {
                    a += TAU;
                }
            }
            if a >= lo && a <= hi
                && in_triangle(p, &Point2::origin(), &self.points[i].co2, &self.points[j].co2)
            {
                return Some((i, j));
            }
        }
        None
    }

    pub fn bbox_size(&self) -> Vector2<f64> {
        self.bbox_max - self.bbox_min
    }

    pub fn bbox_center(&self) -> Point2<f64> {
        Point2::from((self.bbox_min.coords + self.bbox_max.coords) * 0.5)
    }

    /// Unsigned area.
    pub fn area(&self) -> f64 {
        self.area.abs()
    }

    pub fn is_ccw(&self) -> bool {
        self.area >= 0.0
    }

    pub fn is_convex(&self) -> bool {
        contour::is_convex(&self.points_2d())
    }

    /// 2D vector of edge `i -> i+1`. Zero for an empty polygon.
    pub fn edge_vector(&self, i: usize) -> Vector2<f64> {
        let n = self.points.len();
        if n == 0 {
            return Vector2::zeros();
        }
        self.points[(i + 1) % n].co2 - self.points[i % n].co2
    }

    /// Whether the corner at `i` turns against the polygon's orientation.
    pub fn is_reflex(&self, i: usize) -> bool {
        let n = self.points.len();
        if n < 3 {
            return false;
        }
        let turn = cross(&self.edge_vector((i + n - 1) % n), &self.edge_vector(i));
        if self.is_ccw() {
            turn < -EPSILON_2D
        } else {
            turn > EPSILON_2D
        }
    }

    /// Outward direction at corner `i`: the bisector of the adjacent edges,
    /// flipped at reflex corners.
    pub fn outward_ray(&self, i: usize) -> Vector2<f64> {
        let n = self.points.len();
        if n == 0 {
            return Vector2::zeros();
        }
        let e_in = self.edge_vector((i + n - 1) % n);
        let e_out = self.edge_vector(i);
        let orient = if self.is_ccw() { 1.0 } else { -1.0 };
        // Right-hand normal is outward for a counter-clockwise loop.
        let edge_outward = |e: &Vector2<f64>| Vector2::new(e.y, -e.x) * orient;

        let (Some(a), Some(b)) = (
            Unit::try_new(-e_in, EPSILON_2D),
            Unit::try_new(e_out, EPSILON_2D),
        ) else {
            return edge_outward(&e_out)
                .try_normalize(EPSILON_2D)
                .unwrap_or_else(Vector2::zeros);
        };
        let inward = a.into_inner() + b.into_inner();
        match inward.try_normalize(1e-6) {
            Some(bisector) if self.is_reflex(i) => bisector,
            Some(bisector) => -bisector,
            None => edge_outward(&e_out).normalize(),
        }
    }

    /// Scale factor turning a perpendicular offset into the distance along
    /// [`SmartPoly::outward_ray`] at corner `i`.
    pub fn miter_factor(&self, i: usize) -> f64 {
        let n = self.points.len();
        let e_out = self.edge_vector(i);
        let orient = if self.is_ccw() { 1.0 } else { -1.0 };
        let normal = Vector2::new(e_out.y, -e_out.x) * orient;
        let normal = normal.try_normalize(EPSILON_2D).unwrap_or_else(Vector2::zeros);
        let cos = self.outward_ray(i).dot(&normal);
        if cos.abs() < 0.1 || n < 3 {
            10.0
        } else {
            1.0 / cos
        }
    }

    /// Moves every point by `offset`.
    pub fn translate(&mut self, offset: &Vector3<f64>) {
        for p in &mut self.points {
            p.co += offset;
        }
        self.frame.origin += offset;
        self.refresh();
    }

    /// Scales in the frame about `origin` by `(sx, sy)`.
    pub fn scale_about(&mut self, origin: &Point2<f64>, sx: f64, sy: f64) {
        let frame = self.frame;
        for p in &mut self.points {
            let d = p.co2 - origin;
            let depth = frame.depth_of(&p.co);
            let q = origin + Vector2::new(d.x * sx, d.y * sy);
            p.co = frame.make_3d_depth(&q, depth);
        }
        self.refresh();
    }

    /// Rotates about the frame normal through the center.
    pub fn rotate_about_normal(&mut self, angle: f64) {
        let Some(axis) = Unit::try_new(self.frame.normal, 1e-12) else {
            return;
        };
        let rotation = Rotation3::from_axis_angle(&axis, angle);
        let center = self.frame.origin;
        for p in &mut self.points {
            p.co = center + rotation * (p.co - center);
        }
        self.refresh();
    }

    /// The same polygon with reversed point order.
    pub fn reversed(&self) -> SmartPoly {
        let mut poly = self.clone();
        poly.points.reverse();
        poly.refresh();
        poly
    }

    /// Realigns the frame so that points are counter-clockwise in 2D.
    pub fn ensure_ccw(&mut self) {
        if self.area < 0.0 {
            self.points.reverse();
            self.refresh();
        }
    }
}

/// Angle of `p` around the origin in `[0, 2π)`.
pub fn winding_of(p: &Point2<f64>) -> f64 {
    let a = p.y.atan2(p.x);
    if a < 0.0 {
        a + TAU
    } else {
        a
    }
}

/// Newell's method: robust polygon normal, length is twice the area.
pub fn newell_normal<'a>(points: impl IntoIterator<Item = &'a Point3<f64>>) -> Vector3<f64> {
    let pts: Vec<&Point3<f64>> = points.into_iter().collect();
    let n = pts.len();
    let mut normal = Vector3::zeros();
    for i in 0..n {
        let curr = pts[i];
        let next = pts[(i + 1) % n];
        normal.x += (curr.y - next.y) * (curr.z + next.z);
        normal.y += (curr.z - next.z) * (curr.x + next.x);
        normal.z += (curr.x - next.x) * (curr.y + next.y);
    }
    normal
}

fn mean(points: impl Iterator<Item = Point3<f64>>) -> Point3<f64> {
    let (sum, count) = points.fold((Vector3::zeros(), 0usize), |(s, c), p| (s + p.coords, c + 1));
    if count == 0 {
        Point3::origin()
    } else {
        Point3::from(sum / count as f64)
    }
}

fn in_triangle(p: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> bool {
    let d1 = cross(&(b - a), &(p - a));
    let d2 = cross(&(c - b), &(p - b));
    let d3 = cross(&(a - c), &(p - c));
    let eps = 1e-12;
    let has_neg = d1 < -eps || d2 < -eps || d3 < -eps;
    let has_pos = d1 > eps || d2 > eps || d3 > eps;
    !(has_neg && has_pos)
}
