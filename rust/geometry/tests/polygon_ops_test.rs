// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polygon operations on polygons that do not lie in the XY plane.

use approx::assert_relative_eq;
use archkit_geometry::{
    bridge, straight_skeleton, Axis, BridgeOptions, ClipOp, Point3, SmartPoly, Vector3,
};

/// A `w` by `h` rectangle standing in the plane x = 1, facing +X.
fn wall(w: f64, h: f64) -> SmartPoly {
    SmartPoly::from_points(&[
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(1.0, w, 0.0),
        Point3::new(1.0, w, h),
        Point3::new(1.0, 0.0, h),
    ])
}

#[test]
fn frame_maps_round_trip() {
    let poly = SmartPoly::from_points(&[
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(2.0, 0.0, 1.0),
        Point3::new(2.0, 1.0, 1.5),
        Point3::new(0.0, 1.0, 0.5),
    ]);
    for p in poly.points_3d() {
        let back = poly.make_3d(&poly.make_2d(&p));
        assert!((back - p).norm() < 1e-9);
    }
    let n = poly.normal();
    assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-9);
}

#[test]
fn vertical_wall_has_horizontal_x_axis() {
    let poly = wall(2.0, 1.0);
    assert_relative_eq!(poly.normal().dot(&Vector3::x()).abs(), 1.0, epsilon = 1e-9);
    assert_relative_eq!(poly.frame.x_axis.z, 0.0, epsilon = 1e-9);
    assert_relative_eq!(poly.area(), 2.0, epsilon = 1e-9);
}

#[test]
fn split_keeps_area() {
    let poly = wall(2.0, 1.0);
    let c = poly.bbox_center();
    let pieces = poly.split_xy(Axis::X, c.x + 0.25).unwrap();
    assert_eq!(pieces.len(), 2);
    let total: f64 = pieces.iter().map(|p| p.area()).sum();
    assert_relative_eq!(total, 2.0, epsilon = 1e-9);
    for piece in &pieces {
        for p in piece.points_3d() {
            assert_relative_eq!(p.x, 1.0, epsilon = 1e-9);
        }
    }
}

#[test]
fn window_cut_out_of_wall() {
    let wall = wall(4.0, 3.0);
    let window = SmartPoly::from_points(&[
        Point3::new(1.0, 1.0, 1.0),
        Point3::new(1.0, 2.0, 1.0),
        Point3::new(1.0, 2.0, 2.0),
        Point3::new(1.0, 1.0, 2.0),
    ]);
    let rest = wall.clip_with(&window, ClipOp::Difference).unwrap();
    let area: f64 = rest.iter().map(|p| p.area()).sum();
    assert_relative_eq!(area, 11.0, epsilon = 1e-6);

    let inside = wall.clip_with(&window, ClipOp::Intersect).unwrap();
    assert_eq!(inside.len(), 1);
    assert_relative_eq!(inside[0].area(), 1.0, epsilon = 1e-9);
}

#[test]
fn bridge_tiles_the_gap_around_a_window() {
    let wall = wall(4.0, 3.0);
    let window = SmartPoly::from_points(&[
        Point3::new(1.0, 1.0, 1.0),
        Point3::new(1.0, 2.5, 1.0),
        Point3::new(1.0, 2.5, 2.0),
        Point3::new(1.0, 1.0, 2.0),
    ]);
    let faces = bridge(&wall, &window, &BridgeOptions::default()).unwrap();
    let area: f64 = faces
        .iter()
        .map(|f| SmartPoly::from_smart_vecs(f, true).area())
        .sum();
    assert_relative_eq!(area, 12.0 - 1.5, epsilon = 1e-9);
}

#[test]
fn skeleton_of_a_wall_footprint() {
    let poly = wall(4.0, 2.0);
    let skeleton = straight_skeleton(&poly.points_2d(), &[]).unwrap();
    assert_eq!(skeleton.faces.len(), 4);
    let peak = skeleton
        .faces
        .iter()
        .flat_map(|f| f.nodes.iter().map(|n| n.time))
        .fold(0.0, f64::max);
    assert_relative_eq!(peak, 1.0, epsilon = 1e-9);
}
