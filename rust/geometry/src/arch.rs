// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Arch silhouettes from classic compass constructions.
//!
//! Every arch spans `width` with its springline on `y = 0` and rises to
//! `height`. Points run counter-clockwise over the top, from the right
//! springline `(width / 2, 0)` to the left one `(-width / 2, 0)`.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use nalgebra::{Point2, Vector2};

use crate::error::{Error, Result};

/// Arch families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ArchKind {
    /// Jack arch: a flat lintel at the full height.
    Flat,
    /// Segmental or semicircular (roman) arch: one center.
    #[default]
    Round,
    /// Pointed arch: two centers on the springline.
    Gothic,
    /// Basket-handle arch: three centers.
    Oval,
    /// Four-centered pointed arch.
    Tudor,
}

impl ArchKind {
    pub fn name(&self) -> &'static str {
        match self {
            ArchKind::Flat => "flat",
            ArchKind::Round => "round",
            ArchKind::Gothic => "gothic",
            ArchKind::Oval => "oval",
            ArchKind::Tudor => "tudor",
        }
    }
}

/// An arch outline and the optional inset contour inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchProfile {
    pub outer: Vec<Point2<f64>>,
    pub inner: Option<Vec<Point2<f64>>>,
}

/// A circular arc from `start` to `end` (radians) about `center`.
#[derive(Debug, Clone, Copy)]
struct Arc {
    center: Point2<f64>,
    radius: f64,
    start: f64,
    end: f64,
}

impl Arc {
    fn sweep(&self) -> f64 {
        (self.end - self.start).abs() * self.radius
    }

    fn point(&self, t: f64) -> (Point2<f64>, Vector2<f64>) {
        let a = self.start + (self.end - self.start) * t;
        let dir = Vector2::new(a.cos(), a.sin());
        (self.center + dir * self.radius, dir)
    }
}

/// Generates an arch outline with `sides` segments in total.
///
/// With `thickness`, the inset contour is offset by that distance towards
/// the arch centers and meets the springline at `±(width / 2 - thickness)`.
pub fn generate_arch(
    kind: ArchKind,
    width: f64,
    height: f64,
    sides: usize,
    thickness: Option<f64>,
) -> Result<ArchProfile> {
    if width <= 0.0 || height < 0.0 {
        return Err(Error::InvalidParameter(format!(
            "arch needs a positive span and non-negative rise (width {width}, height {height})"
        )));
    }
    let sides = sides.max(1);
    let a = width * 0.5;

    let (outer, normals) = if kind == ArchKind::Flat || height <= 1e-9 {
        flat(a, height, sides)
    } else {
        let arcs = match kind {
            ArchKind::Round => round(a, height),
            ArchKind::Gothic => gothic(a, height),
            ArchKind::Oval => oval(a, height).unwrap_or_else(|| round(a, height)),
            ArchKind::Tudor => tudor(a, height).unwrap_or_else(|| gothic(a, height)),
            ArchKind::Flat => Vec::new(),
        };
        sample(&arcs, sides)
    };

    let inner = match thickness {
        Some(t) if t > 0.0 => {
            if t >= a {
                return Err(Error::InvalidParameter(format!(
                    "arch thickness {t} exceeds half the span {a}"
                )));
            }
            let mut inset: Vec<Point2<f64>> = outer
                .iter()
                .zip(&normals)
                .map(|(p, n)| p - n * t)
                .collect();
            // Springline correction: the ends drop back onto y = 0.
            if let Some(first) = inset.first_mut() {
                *first = Point2::new(a - t, 0.0);
            }
            if let Some(last) = inset.last_mut() {
                *last = Point2::new(-(a - t), 0.0);
            }
            Some(inset)
        }
        _ => None,
    };

    Ok(ArchProfile { outer, inner })
}

fn flat(a: f64, height: f64, sides: usize) -> (Vec<Point2<f64>>, Vec<Vector2<f64>>) {
    let mut points = vec![Point2::new(a, 0.0)];
    let mut normals = vec![Vector2::new(1.0, 0.0)];
    for k in 0..=sides {
        let x = a - 2.0 * a * k as f64 / sides as f64;
        points.push(Point2::new(x, height));
        normals.push(Vector2::new(0.0, 1.0));
    }
    points.push(Point2::new(-a, 0.0));
    normals.push(Vector2::new(-1.0, 0.0));
    if height <= 1e-9 {
        // No rise: just the springline.
        points = vec![Point2::new(a, 0.0), Point2::new(-a, 0.0)];
        normals = vec![Vector2::new(0.0, 1.0), Vector2::new(0.0, 1.0)];
    }
    (points, normals)
}

/// One arc through both springline ends and the crown.
fn round(a: f64, h: f64) -> Vec<Arc> {
    let r = (a * a + h * h) / (2.0 * h);
    let center = Point2::new(0.0, h - r);
    let start = (-center.y).atan2(a);
    vec![Arc {
        center,
        radius: r,
        start,
        end: PI - start,
    }]
}

/// Two arcs centered on the springline meeting at the crown.
fn gothic(a: f64, h: f64) -> Vec<Arc> {
    let r = (a * a + h * h) / (2.0 * a);
    let cx = a - r;
    let apex = h.atan2(-cx);
    vec![
        Arc {
            center: Point2::new(cx, 0.0),
            radius: r,
            start: 0.0,
            end: apex,
        },
        Arc {
            center: Point2::new(-cx, 0.0),
            radius: r,
            start: PI - apex,
            end: PI,
        },
    ]
}

/// Small haunch arcs on the springline, one large crown arc below it.
fn oval(a: f64, h: f64) -> Option<Vec<Arc>> {
    let r1 = 0.5 * a.min(h);
    if r1 >= h || r1 >= a {
        return None;
    }
    let r2 = (a * a + h * h - 2.0 * a * r1) / (2.0 * (h - r1));
    if r2 <= r1 {
        return None;
    }
    let c1 = Point2::new(a - r1, 0.0);
    let c2 = Point2::new(0.0, h - r2);
    let d = (c1 - c2).try_normalize(1e-12)?;
    let phi = d.y.atan2(d.x);
    Some(vec![
        Arc {
            center: c1,
            radius: r1,
            start: 0.0,
            end: phi,
        },
        Arc {
            center: c2,
            radius: r2,
            start: phi,
            end: PI - phi,
        },
        Arc {
            center: Point2::new(-c1.x, 0.0),
            radius: r1,
            start: PI - phi,
            end: PI,
        },
    ])
}

/// Haunch arcs turning through 45 degrees, then two flat arcs meeting at a
/// point.
fn tudor(a: f64, h: f64) -> Option<Vec<Arc>> {
    let r1 = 0.5 * a.min(h);
    let c1 = Point2::new(a - r1, 0.0);
    let d = Vector2::new(FRAC_PI_4.cos(), FRAC_PI_4.sin());
    let tangent = c1 + d * r1;
    let apex = Point2::new(0.0, h);
    let to_tangent = tangent - apex;
    let denom = 2.0 * d.dot(&to_tangent);
    if denom <= 1e-9 {
        return None;
    }
    let r2 = to_tangent.norm_squared() / denom;
    let c2 = tangent - d * r2;
    let crown = (apex.y - c2.y).atan2(apex.x - c2.x);
    if crown <= FRAC_PI_4 || crown > FRAC_PI_2 + 1e-9 {
        return None;
    }
    Some(vec![
        Arc {
            center: c1,
            radius: r1,
            start: 0.0,
            end: FRAC_PI_4,
        },
        Arc {
            center: c2,
            radius: r2,
            start: FRAC_PI_4,
            end: crown,
        },
        Arc {
            center: Point2::new(-c2.x, c2.y),
            radius: r2,
            start: PI - crown,
            end: PI - FRAC_PI_4,
        },
        Arc {
            center: Point2::new(-c1.x, 0.0),
            radius: r1,
            start: PI - FRAC_PI_4,
            end: PI,
        },
    ])
}

/// Samples arcs proportionally to their length, sharing joint points.
fn sample(arcs: &[Arc], sides: usize) -> (Vec<Point2<f64>>, Vec<Vector2<f64>>) {
    let total: f64 = arcs.iter().map(Arc::sweep).sum();
    let mut points = Vec::new();
    let mut normals = Vec::new();
    for (idx, arc) in arcs.iter().enumerate() {
        let share = if total > 0.0 { arc.sweep() / total } else { 1.0 };
        let mut steps = ((sides as f64 * share).round() as usize).max(1);
        // A middle arc must sample its crown.
        if arcs.len() % 2 == 1 && idx == arcs.len() / 2 && steps % 2 == 1 {
            steps += 1;
        }
        let first = if idx == 0 { 0 } else { 1 };
        for k in first..=steps {
            let (p, n) = arc.point(k as f64 / steps as f64);
            points.push(p);
            normals.push(n);
        }
    }
    (points, normals)
}
