// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cutting polygons along a frame axis or between two corners.

use nalgebra::{Point2, Point3};

use crate::clip::{overlay, region_polys, ClipOp};
use crate::contour::{self, EPSILON_2D};
use crate::error::{Error, Result};
use crate::poly::SmartPoly;
use crate::vec::{dedup_loop, SmartVec};

/// Frame axis a cut line is perpendicular to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Cut along the line `x = value`.
    X,
    /// Cut along the line `y = value`.
    Y,
}

impl Axis {
    #[inline]
    fn coord(self, p: &Point2<f64>) -> f64 {
        match self {
            Axis::X => p.x,
            Axis::Y => p.y,
        }
    }
}

impl SmartPoly {
    /// Cuts the polygon by an axis-aligned line of its frame.
    ///
    /// Pieces on the low side come first. A line that misses the interior or
    /// runs along an existing edge leaves the polygon whole (one piece).
    pub fn split_xy(&self, axis: Axis, value: f64) -> Result<Vec<SmartPoly>> {
        if self.len() < 3 {
            return Err(Error::TooFewPoints {
                needed: 3,
                got: self.len(),
            });
        }
        let lo = axis.coord(&self.bbox_min);
        let hi = axis.coord(&self.bbox_max);
        if value <= lo + EPSILON_2D || value >= hi - EPSILON_2D {
            tracing::debug!(?axis, value, "cut line misses the polygon");
            return Ok(vec![self.clone()]);
        }

        if self.is_convex() {
            Ok(self.split_convex(axis, value))
        } else {
            self.split_general(axis, value)
        }
    }

    fn split_convex(&self, axis: Axis, value: f64) -> Vec<SmartPoly> {
        let n = self.len();
        let mut low: Vec<SmartVec> = Vec::with_capacity(n + 2);
        let mut high: Vec<SmartVec> = Vec::with_capacity(n + 2);

        for i in 0..n {
            let a = &self.points[i];
            let b = &self.points[(i + 1) % n];
            let da = axis.coord(&a.co2) - value;
            let db = axis.coord(&b.co2) - value;

            if da.abs() <= EPSILON_2D {
                low.push(*a);
                high.push(*a);
            } else if da < 0.0 {
                low.push(*a);
            } else {
                high.push(*a);
            }

            if (da < -EPSILON_2D && db > EPSILON_2D) || (da > EPSILON_2D && db < -EPSILON_2D) {
                let t = da / (da - db);
                let cut = point_on_edge(a, b, t);
                low.push(cut);
                high.push(cut);
            }
        }

        let low = dedup_loop(low, EPSILON_2D);
        let high = dedup_loop(high, EPSILON_2D);
        let pieces: Vec<SmartPoly> = [low, high]
            .into_iter()
            .filter(|pts| pts.len() >= 3)
            .map(|pts| self.with_points(pts))
            .filter(|p| p.area() > EPSILON_2D)
            .collect();

        if pieces.len() < 2 {
            tracing::debug!(?axis, value, "cut along an existing edge ignored");
            return vec![self.clone()];
        }
        pieces
    }

    fn split_general(&self, axis: Axis, value: f64) -> Result<Vec<SmartPoly>> {
        let pad = 1.0 + self.bbox_size().norm();
        let (min, max) = (self.bbox_min, self.bbox_max);
        let half_plane = |low_side: bool| -> Vec<Point2<f64>> {
            let (x0, y0, x1, y1) = match (axis, low_side) {
                (Axis::X, true) => (min.x - pad, min.y - pad, value, max.y + pad),
                (Axis::X, false) => (value, min.y - pad, max.x + pad, max.y + pad),
                (Axis::Y, true) => (min.x - pad, min.y - pad, max.x + pad, value),
                (Axis::Y, false) => (min.x - pad, value, max.x + pad, max.y + pad),
            };
            vec![
                Point2::new(x0, y0),
                Point2::new(x1, y0),
                Point2::new(x1, y1),
                Point2::new(x0, y1),
            ]
        };

        let subject = vec![contour::ensure_ccw(&self.points_2d())];
        let reference = [self.points.as_slice()];
        let mut pieces = Vec::new();
        for low_side in [true, false] {
            for region in overlay(&subject, &[half_plane(low_side)], ClipOp::Intersect) {
                pieces.extend(region_polys(&region, &self.frame, &reference)?);
            }
        }
        if pieces.len() < 2 {
            return Ok(vec![self.clone()]);
        }
        Ok(pieces)
    }

    /// Cuts the polygon along the diagonal between corners `i` and `j`.
    ///
    /// The first piece runs `i..=j`, the second `j..=i` (wrapping).
    /// Adjacent or equal corners would cut along an edge and are rejected.
    pub fn split_points(&self, i: usize, j: usize) -> Result<(SmartPoly, SmartPoly)> {
        let n = self.len();
        if i >= n || j >= n {
            return Err(Error::InvalidParameter(format!(
                "corner index out of range ({i}, {j}) for {n} points"
            )));
        }
        let adjacent = i == j || (i + 1) % n == j || (j + 1) % n == i;
        if adjacent {
            return Err(Error::InvalidParameter(format!(
                "corners {i} and {j} do not define a diagonal"
            )));
        }

        let walk = |from: usize, to: usize| -> Vec<SmartVec> {
            let mut pts = Vec::new();
            let mut k = from;
            loop {
                pts.push(self.points[k]);
                if k == to {
                    break;
                }
                k = (k + 1) % n;
            }
            pts
        };
        Ok((self.with_points(walk(i, j)), self.with_points(walk(j, i))))
    }
}

/// A cut point at fraction `t` along the edge `a-b`.
fn point_on_edge(a: &SmartVec, b: &SmartVec, t: f64) -> SmartVec {
    let co = Point3::from(a.co.coords.lerp(&b.co.coords, t));
    let mut v = match (a.vert, b.vert) {
        (Some(va), Some(vb)) => SmartVec::on_edge(co, va, vb),
        _ => SmartVec::new(co),
    };
    v.co2 = Point2::from(a.co2.coords.lerp(&b.co2.coords, t));
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_square() -> SmartPoly {
        SmartPoly::from_points(&[
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ])
    }

    #[test]
    fn split_square_in_half() {
        let poly = unit_square();
        // Frame origin is the center, so x = 0 is the middle.
        let pieces = poly.split_xy(Axis::X, 0.0).unwrap();
        assert_eq!(pieces.len(), 2);
        for piece in &pieces {
            assert_eq!(piece.len(), 4);
            assert_relative_eq!(piece.area(), 0.5, epsilon = 1e-10);
        }
    }

    #[test]
    fn cut_along_edge_is_ignored() {
        let poly = unit_square();
        let pieces = poly.split_xy(Axis::Y, -0.5).unwrap();
        assert_eq!(pieces.len(), 1);
        let pieces = poly.split_xy(Axis::Y, 3.0).unwrap();
        assert_eq!(pieces.len(), 1);
    }

    #[test]
    fn concave_split_yields_three_pieces() {
        // U shape opening upwards; cutting high crosses both arms.
        let poly = SmartPoly::from_points(&[
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(3.0, 0.0, 0.0),
            Point3::new(3.0, 2.0, 0.0),
            Point3::new(2.0, 2.0, 0.0),
            Point3::new(2.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(1.0, 2.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        ]);
        let y = poly.make_2d(&Point3::new(0.0, 1.5, 0.0)).y;
        let pieces = poly.split_xy(Axis::Y, y).unwrap();
        assert_eq!(pieces.len(), 3);
        let total: f64 = pieces.iter().map(|p| p.area()).sum();
        assert_relative_eq!(total, poly.area(), epsilon = 1e-9);
    }

    #[test]
    fn split_by_diagonal() {
        let poly = unit_square();
        let (a, b) = poly.split_points(0, 2).unwrap();
        assert_eq!(a.len(), 3);
        assert_eq!(b.len(), 3);
        assert_relative_eq!(a.area() + b.area(), 1.0, epsilon = 1e-10);
        assert!(poly.split_points(0, 1).is_err());
        assert!(poly.split_points(3, 0).is_err());
        assert!(poly.split_points(2, 2).is_err());
    }
}
