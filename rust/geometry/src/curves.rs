// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Closed 2D shape generators used as inset silhouettes.

use std::f64::consts::TAU;

use nalgebra::{Point2, Vector2};

use crate::contour::{self, contour_bounds};
use crate::error::{Error, Result};

/// A regular polygon inscribed in the ellipse `(rx, ry)`, counter-clockwise,
/// first corner at angle `rotation`.
pub fn ngon(sides: usize, rx: f64, ry: f64, rotation: f64) -> Result<Vec<Point2<f64>>> {
    if sides < 3 {
        return Err(Error::TooFewPoints {
            needed: 3,
            got: sides,
        });
    }
    Ok((0..sides)
        .map(|k| {
            let a = rotation + TAU * k as f64 / sides as f64;
            Point2::new(rx * a.cos(), ry * a.sin())
        })
        .collect())
}

/// A superellipse `|x/rx|^e + |y/ry|^e = 1` sampled with `points` points.
///
/// `exponent` 2 gives an ellipse, larger values approach a rectangle,
/// values below 1 give a star-like astroid.
pub fn super_curve(points: usize, rx: f64, ry: f64, exponent: f64) -> Result<Vec<Point2<f64>>> {
    if points < 3 {
        return Err(Error::TooFewPoints {
            needed: 3,
            got: points,
        });
    }
    if exponent <= 0.0 {
        return Err(Error::InvalidParameter(format!(
            "super curve exponent must be positive, got {exponent}"
        )));
    }
    let power = 2.0 / exponent;
    Ok((0..points)
        .map(|k| {
            let a = TAU * k as f64 / points as f64;
            let (s, c) = a.sin_cos();
            Point2::new(
                rx * c.signum() * c.abs().powf(power),
                ry * s.signum() * s.abs().powf(power),
            )
        })
        .collect())
}

/// Fits an arbitrary closed curve into the unit box centered on the origin,
/// counter-clockwise, preserving its aspect ratio.
pub fn normalize_curve(points: &[Point2<f64>]) -> Result<Vec<Point2<f64>>> {
    let (min, max) = contour_bounds(points).ok_or(Error::TooFewPoints {
        needed: 3,
        got: 0,
    })?;
    if points.len() < 3 {
        return Err(Error::TooFewPoints {
            needed: 3,
            got: points.len(),
        });
    }
    let size = max - min;
    let scale = size.x.max(size.y);
    if scale <= contour::EPSILON_2D {
        return Err(Error::Degenerate("curve has no extent".into()));
    }
    let center = Point2::from((min.coords + max.coords) * 0.5);
    let fitted: Vec<Point2<f64>> = points
        .iter()
        .map(|p| Point2::from((p - center) / scale))
        .collect();
    Ok(contour::ensure_ccw(&fitted))
}

/// Maps a unit-box curve into the box `size` centered at `center`.
pub fn place_curve(
    unit: &[Point2<f64>],
    center: &Point2<f64>,
    size: &Vector2<f64>,
) -> Vec<Point2<f64>> {
    let (min, max) = contour_bounds(unit).unwrap_or((Point2::origin(), Point2::origin()));
    let extent = max - min;
    let sx = if extent.x > contour::EPSILON_2D { size.x / extent.x } else { 0.0 };
    let sy = if extent.y > contour::EPSILON_2D { size.y / extent.y } else { 0.0 };
    let mid = Point2::from((min.coords + max.coords) * 0.5);
    unit.iter()
        .map(|p| center + Vector2::new((p.x - mid.x) * sx, (p.y - mid.y) * sy))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn square_ngon_area() {
        let pts = ngon(4, 1.0, 1.0, std::f64::consts::FRAC_PI_4).unwrap();
        assert_relative_eq!(contour::signed_area(&pts), 2.0, epsilon = 1e-10);
        assert!(ngon(2, 1.0, 1.0, 0.0).is_err());
    }

    #[test]
    fn super_curve_exponent_two_is_ellipse() {
        let pts = super_curve(64, 2.0, 1.0, 2.0).unwrap();
        for p in &pts {
            assert_relative_eq!((p.x / 2.0).powi(2) + p.y.powi(2), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn normalized_curve_fits_unit_box() {
        let raw = vec![
            Point2::new(10.0, 10.0),
            Point2::new(10.0, 14.0),
            Point2::new(12.0, 14.0),
            Point2::new(12.0, 10.0),
        ];
        let unit = normalize_curve(&raw).unwrap();
        let (min, max) = contour_bounds(&unit).unwrap();
        assert_relative_eq!(max.y - min.y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(max.x - min.x, 0.5, epsilon = 1e-12);
        assert!(contour::signed_area(&unit) > 0.0);

        let placed = place_curve(&unit, &Point2::new(1.0, 1.0), &Vector2::new(2.0, 2.0));
        let (pmin, pmax) = contour_bounds(&placed).unwrap();
        assert_relative_eq!(pmin.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(pmax.y, 2.0, epsilon = 1e-12);
    }
}
