// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sweeping a section around an axis.

use std::f64::consts::TAU;

use nalgebra::{Point3, Rotation3, Unit, Vector3};

use crate::error::{Error, Result};

/// Rings produced by [`generate_revolve`] and the faces bridging them.
#[derive(Debug, Clone, PartialEq)]
pub struct Revolution {
    /// One copy of the section per angular step.
    pub rings: Vec<Vec<Point3<f64>>>,
    /// Faces as `(ring, point)` index loops.
    pub faces: Vec<Vec<(usize, usize)>>,
    /// The sweep closes on itself; the last step bridges back to ring 0.
    pub full_turn: bool,
}

/// Sweeps `section` about the axis through `axis_point` along `axis_dir`
/// in `steps` equal steps covering `angle` radians.
///
/// A closed `section` is bridged including its closing edge. A full turn
/// does not repeat the first ring.
pub fn generate_revolve(
    section: &[Point3<f64>],
    closed: bool,
    axis_point: &Point3<f64>,
    axis_dir: &Vector3<f64>,
    steps: usize,
    angle: f64,
) -> Result<Revolution> {
    if section.len() < 2 {
        return Err(Error::TooFewPoints {
            needed: 2,
            got: section.len(),
        });
    }
    if steps == 0 {
        return Err(Error::InvalidParameter("revolve needs at least one step".into()));
    }
    let axis = Unit::try_new(*axis_dir, 1e-12)
        .ok_or_else(|| Error::Degenerate("zero revolve axis".into()))?;

    let full_turn = (angle.abs() - TAU).abs() < 1e-9;
    let ring_count = if full_turn { steps } else { steps + 1 };
    let rings: Vec<Vec<Point3<f64>>> = (0..ring_count)
        .map(|k| {
            let rot = Rotation3::from_axis_angle(&axis, angle * k as f64 / steps as f64);
            section
                .iter()
                .map(|p| axis_point + rot * (p - axis_point))
                .collect()
        })
        .collect();

    let m = section.len();
    let edges = if closed { m } else { m - 1 };
    let mut faces = Vec::with_capacity(steps * edges);
    for k in 0..steps {
        let next = (k + 1) % ring_count;
        for e in 0..edges {
            let f = (e + 1) % m;
            faces.push(vec![(k, e), (next, e), (next, f), (k, f)]);
        }
    }

    Ok(Revolution {
        rings,
        faces,
        full_turn,
    })
}
