// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Plain 2D contour helpers shared by the polygon algorithms.

use nalgebra::{Point2, Vector2};

/// Epsilon for floating point comparisons in 2D operations
pub const EPSILON_2D: f64 = 1e-9;

/// Compute the signed area of a 2D contour
/// Positive = counter-clockwise, Negative = clockwise
pub fn signed_area(contour: &[Point2<f64>]) -> f64 {
    if contour.len() < 3 {
        return 0.0;
    }

    let n = contour.len();
    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        area += contour[i].x * contour[j].y;
        area -= contour[j].x * contour[i].y;
    }
    area * 0.5
}

/// Ensure contour has counter-clockwise winding (positive area)
pub fn ensure_ccw(contour: &[Point2<f64>]) -> Vec<Point2<f64>> {
    if signed_area(contour) < 0.0 {
        contour.iter().rev().cloned().collect()
    } else {
        contour.to_vec()
    }
}

/// Ensure contour has clockwise winding (for holes)
pub fn ensure_cw(contour: &[Point2<f64>]) -> Vec<Point2<f64>> {
    if signed_area(contour) > 0.0 {
        contour.iter().rev().cloned().collect()
    } else {
        contour.to_vec()
    }
}

/// Check if a point is inside a contour using ray casting
pub fn point_in_contour(point: &Point2<f64>, contour: &[Point2<f64>]) -> bool {
    if contour.len() < 3 {
        return false;
    }

    let mut inside = false;
    let n = contour.len();
    let mut j = n - 1;
    for i in 0..n {
        let pi = &contour[i];
        let pj = &contour[j];
        if ((pi.y > point.y) != (pj.y > point.y))
            && (point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Compute bounding box of a contour
pub fn contour_bounds(contour: &[Point2<f64>]) -> Option<(Point2<f64>, Point2<f64>)> {
    let first = contour.first()?;
    let mut min = *first;
    let mut max = *first;
    for p in contour.iter().skip(1) {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }
    Some((min, max))
}

#[inline]
pub fn cross(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Intersection of the ray `origin + t * dir` (t > 0) with segment `a-b`.
///
/// Returns `(t, u)` where `u` in `[0, 1]` is the parameter along the segment.
pub fn ray_segment(
    origin: &Point2<f64>,
    dir: &Vector2<f64>,
    a: &Point2<f64>,
    b: &Point2<f64>,
) -> Option<(f64, f64)> {
    let e = b - a;
    let denom = cross(dir, &e);
    if denom.abs() < EPSILON_2D {
        return None;
    }
    let w = a - origin;
    let t = cross(&w, &e) / denom;
    let u = cross(&w, dir) / denom;
    if t > EPSILON_2D && (-EPSILON_2D..=1.0 + EPSILON_2D).contains(&u) {
        Some((t, u.clamp(0.0, 1.0)))
    } else {
        None
    }
}

/// Whether segments `p1-p2` and `q1-q2` cross at a point interior to both.
///
/// Touching at endpoints does not count.
pub fn segments_cross(
    p1: &Point2<f64>,
    p2: &Point2<f64>,
    q1: &Point2<f64>,
    q2: &Point2<f64>,
) -> bool {
    let r = p2 - p1;
    let s = q2 - q1;
    let denom = cross(&r, &s);
    if denom.abs() < EPSILON_2D {
        return false;
    }
    let w = q1 - p1;
    let t = cross(&w, &s) / denom;
    let u = cross(&w, &r) / denom;
    let eps = 1e-7;
    t > eps && t < 1.0 - eps && u > eps && u < 1.0 - eps
}

/// Intersection point of the infinite lines through `a-b` and `c-d`.
pub fn line_intersection(
    a: &Point2<f64>,
    b: &Point2<f64>,
    c: &Point2<f64>,
    d: &Point2<f64>,
) -> Option<Point2<f64>> {
    let r = b - a;
    let s = d - c;
    let denom = cross(&r, &s);
    if denom.abs() < EPSILON_2D {
        return None;
    }
    let t = cross(&(c - a), &s) / denom;
    Some(a + r * t)
}

/// Distance from `p` to the segment `a-b`, and the parameter of the foot.
pub fn point_segment_distance(p: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> (f64, f64) {
    let e = b - a;
    let len_sq = e.norm_squared();
    if len_sq < EPSILON_2D * EPSILON_2D {
        return ((p - a).norm(), 0.0);
    }
    let t = ((p - a).dot(&e) / len_sq).clamp(0.0, 1.0);
    ((p - (a + e * t)).norm(), t)
}

/// Whether every turn of the contour has the same sign.
pub fn is_convex(points: &[Point2<f64>]) -> bool {
    if points.len() < 3 {
        return false;
    }

    let n = points.len();
    let mut sign = 0i8;
    for i in 0..n {
        let p0 = &points[i];
        let p1 = &points[(i + 1) % n];
        let p2 = &points[(i + 2) % n];
        let turn = cross(&(p1 - p0), &(p2 - p1));
        if turn.abs() > 1e-10 {
            let current = if turn > 0.0 { 1i8 } else { -1i8 };
            if sign == 0 {
                sign = current;
            } else if sign != current {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square() -> Vec<Point2<f64>> {
        vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ]
    }

    #[test]
    fn area_and_orientation() {
        assert_relative_eq!(signed_area(&square()), 1.0, epsilon = 1e-12);
        let cw = ensure_cw(&square());
        assert_relative_eq!(signed_area(&cw), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn ray_hits_segment() {
        let hit = ray_segment(
            &Point2::new(0.5, 0.5),
            &Vector2::new(1.0, 0.0),
            &Point2::new(1.0, 0.0),
            &Point2::new(1.0, 1.0),
        )
        .unwrap();
        assert_relative_eq!(hit.0, 0.5, epsilon = 1e-12);
        assert_relative_eq!(hit.1, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn crossing_excludes_endpoints() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(1.0, 1.0);
        assert!(segments_cross(&a, &b, &Point2::new(0.0, 1.0), &Point2::new(1.0, 0.0)));
        assert!(!segments_cross(&a, &b, &b, &Point2::new(2.0, 0.0)));
    }

    #[test]
    fn convexity() {
        assert!(is_convex(&square()));
        let mut dent = square();
        dent.insert(2, Point2::new(0.5, 0.5));
        assert!(!is_convex(&dent));
    }
}
