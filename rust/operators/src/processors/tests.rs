// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use approx::assert_relative_eq;
use archkit_geometry::Point3;
use archkit_journal::{SelectionInfo, SelectionMode, TopologyInfo};
use archkit_mesh::{EditMesh, ElementId, FaceAttrs, FaceKey, FaceTag};

use super::*;
use crate::config::Config;
use crate::context::BuildContext;
use crate::error::{Error, Result};
use crate::registry::{MeshOperator, OperatorParams};
use crate::style::FaceStyle;

const OP: i64 = 0;

fn rect(mesh: &mut EditMesh, w: f64, h: f64) -> FaceKey {
    let points = [
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(w, 0.0, 0.0),
        Point3::new(w, h, 0.0),
        Point3::new(0.0, h, 0.0),
    ];
    mesh.add_root_polygon(&points, FaceAttrs::default()).unwrap()
}

fn run<O: MeshOperator>(
    op: &O,
    mesh: &mut EditMesh,
    face: FaceKey,
    params: &O::Params,
) -> Result<TopologyInfo> {
    let selection = SelectionInfo::from_faces(mesh, &[face], SelectionMode::Single)?;
    let mut ctx = BuildContext::begin(mesh, OP, &Config::default());
    op.operate(&mut ctx, &selection, params)?;
    Ok(ctx.finish())
}

fn slot_faces(mesh: &EditMesh, info: &TopologyInfo, slot: &str) -> Vec<FaceKey> {
    info.faces_in(slot)
        .into_iter()
        .filter_map(|seq| mesh.find_face(ElementId::new(OP, seq)))
        .collect()
}

fn max_z(mesh: &EditMesh) -> f64 {
    mesh.vertices()
        .map(|(_, v)| v.position.z)
        .fold(f64::MIN, f64::max)
}

#[test]
fn bridged_inset_replaces_control_face() {
    let mut mesh = EditMesh::new();
    let face = rect(&mut mesh, 1.0, 1.0);
    let params = InsetParams {
        position: [0.1, 0.1],
        ..InsetParams::default()
    };
    let info = run(&InsetPolygonProcessor, &mut mesh, face, &params).unwrap();

    assert_eq!(mesh.face_count(), 5);
    assert_eq!(mesh.retired_count(), 1);
    assert_eq!(info.faces_in(inset::BRIDGE).len(), 4);
    let center = slot_faces(&mesh, &info, inset::CENTER);
    assert_eq!(center.len(), 1);
    assert_relative_eq!(mesh.face_area(center[0]).unwrap(), 0.25, epsilon = 1e-9);
    assert_relative_eq!(
        mesh.face_centroid(center[0]).unwrap(),
        Point3::new(0.6, 0.6, 0.0),
        epsilon = 1e-9
    );
    let total: f64 = mesh
        .faces()
        .map(|(k, _)| mesh.face_area(k).unwrap())
        .sum();
    assert_relative_eq!(total, 1.0, epsilon = 1e-9);
}

#[test]
fn floating_inset_keeps_control_face() {
    let mut mesh = EditMesh::new();
    let face = rect(&mut mesh, 2.0, 1.0);
    let params = InsetParams {
        join: InsetJoin::Float,
        shape: InsetShape::Catalog {
            name: "hexagon".into(),
        },
        ..InsetParams::default()
    };
    let info = run(&InsetPolygonProcessor, &mut mesh, face, &params).unwrap();
    assert_eq!(mesh.face_count(), 2);
    assert_eq!(mesh.retired_count(), 0);
    assert_eq!(mesh.face_vertices(slot_faces(&mesh, &info, inset::CENTER)[0]).unwrap().len(), 6);
    // All slots are declared even when empty.
    let slots: Vec<&str> = info.slot_names().collect();
    for slot in [inset::CENTER, inset::BRIDGE, inset::FRAME, inset::SIDES, inset::OUTER] {
        assert!(slots.contains(&slot), "missing slot {slot}");
    }
}

#[test]
fn recessed_inset_builds_sides_and_back() {
    let mut mesh = EditMesh::new();
    let face = rect(&mut mesh, 1.0, 1.0);
    let params = InsetParams {
        depth: 0.2,
        ..InsetParams::default()
    };
    let info = run(&InsetPolygonProcessor, &mut mesh, face, &params).unwrap();
    assert_eq!(info.faces_in(inset::SIDES).len(), 4);
    let back = slot_faces(&mesh, &info, inset::CENTER);
    let z = mesh.face_centroid(back[0]).unwrap().z;
    assert_relative_eq!(z, -0.2, epsilon = 1e-9);
    assert_eq!(mesh.face_count(), 4 + 4 + 1);
}

#[test]
fn arch_with_thickness_gets_a_frame_ring() {
    let mut mesh = EditMesh::new();
    let face = rect(&mut mesh, 1.0, 2.0);
    let params = InsetParams {
        join: InsetJoin::Float,
        shape: InsetShape::Arch {
            kind: ArchStyle::Round,
            sides: 8,
            thickness: 0.05,
        },
        ..InsetParams::default()
    };
    let info = run(&InsetPolygonProcessor, &mut mesh, face, &params).unwrap();
    assert!(!info.faces_in(inset::FRAME).is_empty());
    assert_eq!(info.faces_in(inset::CENTER).len(), 1);
}

#[test]
fn clipped_inset_keeps_only_the_outside() {
    let mut mesh = EditMesh::new();
    let face = rect(&mut mesh, 1.0, 1.0);
    let params = InsetParams {
        join: InsetJoin::ClipOutside,
        ..InsetParams::default()
    };
    let info = run(&InsetPolygonProcessor, &mut mesh, face, &params).unwrap();
    assert!(info.faces_in(inset::CENTER).is_empty());
    let outer = slot_faces(&mesh, &info, inset::OUTER);
    let area: f64 = outer.iter().map(|&k| mesh.face_area(k).unwrap()).sum();
    assert_relative_eq!(area, 0.75, epsilon = 1e-6);
}

#[test]
fn unknown_catalog_curve_is_a_user_error() {
    let mut mesh = EditMesh::new();
    let face = rect(&mut mesh, 1.0, 1.0);
    let params = InsetParams {
        shape: InsetShape::Catalog {
            name: "blob".into(),
        },
        ..InsetParams::default()
    };
    let err = run(&InsetPolygonProcessor, &mut mesh, face, &params).unwrap_err();
    assert!(matches!(err, Error::InvalidParameters(_)));
    assert!(!err.is_fatal());
}

#[test]
fn inset_placement_is_locked_only_when_joined() {
    let floating = InsetParams {
        join: InsetJoin::Float,
        ..InsetParams::default()
    };
    let moved = InsetParams {
        position: [0.2, 0.0],
        ..floating.clone()
    };
    assert!(!moved.topology_changed(&floating));

    let bridged = InsetParams::default();
    let moved = InsetParams {
        size: [0.3, 0.3],
        ..bridged.clone()
    };
    assert!(moved.topology_changed(&bridged));
    let more_sides = InsetParams {
        shape: InsetShape::Ngon {
            sides: 6,
            rotation: 0.0,
        },
        ..bridged.clone()
    };
    assert!(more_sides.topology_changed(&bridged));
}

#[test]
fn styles_override_slot_attributes() {
    let mut mesh = EditMesh::new();
    let face = rect(&mut mesh, 1.0, 1.0);
    let mut params = InsetParams::default();
    params
        .styles
        .insert(inset::CENTER.into(), FaceStyle::tagged(FaceTag::Glass));
    let info = run(&InsetPolygonProcessor, &mut mesh, face, &params).unwrap();
    let center = slot_faces(&mesh, &info, inset::CENTER)[0];
    assert_eq!(mesh.face(center).unwrap().attrs.tag, FaceTag::Glass);
    let bridge = slot_faces(&mesh, &info, inset::BRIDGE)[0];
    assert_eq!(mesh.face(bridge).unwrap().attrs.tag, FaceTag::Wall);
}

#[test]
fn grid_cells_share_vertices() {
    let mut mesh = EditMesh::new();
    let face = rect(&mut mesh, 1.0, 1.0);
    let info = run(&GridDivideProcessor, &mut mesh, face, &GridDivideParams::default()).unwrap();

    let cells = slot_faces(&mesh, &info, grid::CELLS);
    assert_eq!(cells.len(), 4);
    for &cell in &cells {
        assert_relative_eq!(mesh.face_area(cell).unwrap(), 0.25, epsilon = 1e-9);
    }
    assert_eq!(mesh.vertex_count(), 9);
    assert_eq!(info.modulus(grid::CELLS), Some(2));
    let center = mesh
        .vertices()
        .filter(|(_, v)| (v.position - Point3::new(0.5, 0.5, 0.0)).norm() < 1e-9)
        .count();
    assert_eq!(center, 1);
    // Row-major: the first cell is bottom left, the last top right.
    let first = mesh.face_centroid(cells[0]).unwrap();
    let last = mesh.face_centroid(cells[3]).unwrap();
    assert!(first.x < 0.5 && first.y < 0.5);
    assert!(last.x > 0.5 && last.y > 0.5);
}

#[test]
fn grid_rerun_is_idempotent() {
    let mut mesh = EditMesh::new();
    let face = rect(&mut mesh, 1.0, 1.0);
    let params = GridDivideParams {
        count_x: 2,
        count_y: 1,
        ..GridDivideParams::default()
    };
    let selection = SelectionInfo::from_faces(&mesh, &[face], SelectionMode::Single).unwrap();
    let mut ctx = BuildContext::begin(&mut mesh, OP, &Config::default());
    GridDivideProcessor.operate(&mut ctx, &selection, &params).unwrap();
    let first = ctx.finish();
    let snapshot: Vec<_> = mesh.vertices_owned_by(OP);

    let mut ctx = BuildContext::begin(&mut mesh, OP, &Config::default());
    GridDivideProcessor.operate(&mut ctx, &selection, &params).unwrap();
    let second = ctx.finish();

    assert_eq!(first, second);
    assert_eq!(mesh.vertices_owned_by(OP), snapshot);
    assert_eq!(mesh.face_count(), 6);
    assert_eq!(mesh.retired_count(), 1);
}

#[test]
fn split_by_axis_and_by_corners() {
    let mut mesh = EditMesh::new();
    let face = rect(&mut mesh, 1.0, 1.0);
    let info = run(&SplitFaceProcessor, &mut mesh, face, &SplitFaceParams::default()).unwrap();
    let pieces = slot_faces(&mesh, &info, split::PIECES);
    assert_eq!(pieces.len(), 2);
    for piece in pieces {
        assert_relative_eq!(mesh.face_area(piece).unwrap(), 0.5, epsilon = 1e-9);
    }

    let mut mesh = EditMesh::new();
    let face = rect(&mut mesh, 1.0, 1.0);
    let params = SplitFaceParams {
        cut: SplitCut::Points { a: 0, b: 2 },
        ..SplitFaceParams::default()
    };
    let info = run(&SplitFaceProcessor, &mut mesh, face, &params).unwrap();
    assert_eq!(info.faces_in(split::PIECES).len(), 2);
    assert_eq!(mesh.vertex_count(), 4);
}

#[test]
fn each_control_face_passes_on_its_own_tag() {
    let mut mesh = EditMesh::new();
    let wall = rect(&mut mesh, 1.0, 1.0);
    let door = mesh
        .add_root_polygon(
            &[
                Point3::new(2.0, 0.0, 0.0),
                Point3::new(3.0, 0.0, 0.0),
                Point3::new(3.0, 1.0, 0.0),
                Point3::new(2.0, 1.0, 0.0),
            ],
            FaceAttrs {
                tag: FaceTag::Door,
                ..FaceAttrs::default()
            },
        )
        .unwrap();
    let selection = SelectionInfo::from_faces(&mesh, &[wall, door], SelectionMode::Single).unwrap();
    let mut ctx = BuildContext::begin(&mut mesh, OP, &Config::default());
    SplitFaceProcessor
        .operate(&mut ctx, &selection, &SplitFaceParams::default())
        .unwrap();
    let info = ctx.finish();

    let tags: Vec<FaceTag> = slot_faces(&mesh, &info, split::PIECES)
        .into_iter()
        .map(|f| mesh.face(f).unwrap().attrs.tag)
        .collect();
    assert_eq!(tags, vec![FaceTag::Wall, FaceTag::Wall, FaceTag::Door, FaceTag::Door]);
}

#[test]
fn split_between_neighbours_leaves_mesh_alone() {
    let mut mesh = EditMesh::new();
    let face = rect(&mut mesh, 1.0, 1.0);
    let params = SplitFaceParams {
        cut: SplitCut::Points { a: 0, b: 1 },
        ..SplitFaceParams::default()
    };
    let err = run(&SplitFaceProcessor, &mut mesh, face, &params).unwrap_err();
    assert!(matches!(err, Error::Geometry(_)));
    assert_eq!(mesh.retired_count(), 0);
    assert!(mesh.contains_face(face));
}

#[test]
fn fancy_extrude_lofts_rings() {
    let mut mesh = EditMesh::new();
    let face = rect(&mut mesh, 1.0, 1.0);
    let params = ExtrudeFancyParams {
        steps: 2,
        distance: 2.0,
        scale: 0.5,
        ..ExtrudeFancyParams::default()
    };
    let info = run(&ExtrudeFancyProcessor, &mut mesh, face, &params).unwrap();
    assert_eq!(info.faces_in(extrude::SIDES).len(), 8);
    assert_eq!(info.modulus(extrude::SIDES), Some(4));
    let top = slot_faces(&mesh, &info, extrude::TOPS)[0];
    assert_relative_eq!(mesh.face_area(top).unwrap(), 0.25, epsilon = 1e-9);
    assert_relative_eq!(max_z(&mesh), 2.0, epsilon = 1e-9);
    assert!(mesh.face_normal(top).unwrap().z > 0.0);
    assert_eq!(mesh.retired_count(), 1);
}

#[test]
fn sweep_about_an_edge_collapses_the_hinge() {
    let mut mesh = EditMesh::new();
    let face = rect(&mut mesh, 1.0, 1.0);
    let info = run(
        &ExtrudeSweepProcessor,
        &mut mesh,
        face,
        &ExtrudeSweepParams::default(),
    )
    .unwrap();
    // Four steps of four edges, minus the edge lying on the hinge.
    assert_eq!(info.faces_in(sweep::SIDES).len(), 12);
    assert_eq!(info.faces_in(sweep::TOPS).len(), 1);
    assert!(mesh.contains_face(face));
    assert_relative_eq!(max_z(&mesh).abs(), 1.0, epsilon = 1e-9);
}

#[test]
fn full_turn_sweep_has_no_cap() {
    let mut mesh = EditMesh::new();
    let face = rect(&mut mesh, 1.0, 1.0);
    let params = ExtrudeSweepParams {
        pivot: -1.0,
        angle: std::f64::consts::TAU,
        steps: 6,
        ..ExtrudeSweepParams::default()
    };
    let info = run(&ExtrudeSweepProcessor, &mut mesh, face, &params).unwrap();
    assert_eq!(info.faces_in(sweep::SIDES).len(), 24);
    assert!(info.faces_in(sweep::TOPS).is_empty());
    assert_eq!(info.modulus(sweep::SIDES), Some(4));
}

#[test]
fn mitred_rails_close_around_the_face() {
    let mut mesh = EditMesh::new();
    let face = rect(&mut mesh, 1.0, 1.0);
    let info = run(
        &SolidifyEdgesProcessor,
        &mut mesh,
        face,
        &SolidifyEdgesParams::default(),
    )
    .unwrap();
    assert_eq!(info.faces_in(solidify::SIDES).len(), 16);
    assert!(info.faces_in(solidify::CAPS).is_empty());
    assert_eq!(info.modulus(solidify::SIDES), Some(4));
    // Four corner sections, shared by the rails meeting there.
    assert_eq!(mesh.vertices_owned_by(OP).len(), 16);
}

#[test]
fn dashed_rails_are_capped() {
    let mut mesh = EditMesh::new();
    let face = rect(&mut mesh, 1.0, 1.0);
    let params = SolidifyEdgesParams {
        dash: [0.3, 0.2],
        ..SolidifyEdgesParams::default()
    };
    let info = run(&SolidifyEdgesProcessor, &mut mesh, face, &params).unwrap();
    assert_eq!(info.faces_in(solidify::SIDES).len(), 8 * 4);
    assert_eq!(info.faces_in(solidify::CAPS).len(), 8 * 2);
}

#[test]
fn louvers_stack_boxes_and_risers() {
    let mut mesh = EditMesh::new();
    let face = rect(&mut mesh, 1.0, 1.0);
    let params = MakeLouversParams {
        count: 3,
        risers: true,
        ..MakeLouversParams::default()
    };
    let info = run(&MakeLouversProcessor, &mut mesh, face, &params).unwrap();
    assert_eq!(info.faces_in(louvers::BLADES).len(), 18);
    assert_eq!(info.modulus(louvers::BLADES), Some(6));
    assert_eq!(info.faces_in(louvers::RISERS).len(), 2);
    assert!(mesh.contains_face(face));
}

#[test]
fn import_copies_and_instances() {
    let mut mesh = EditMesh::new();
    let face = rect(&mut mesh, 2.0, 1.0);
    let params = ImportMeshParams {
        pattern: ImportPattern::Array {
            count: [2, 1],
            spacing: [1.0, 1.0],
        },
        ..ImportMeshParams::default()
    };
    let info = run(&ImportMeshProcessor, &mut mesh, face, &params).unwrap();
    let copies = slot_faces(&mesh, &info, import::COPIES);
    assert_eq!(copies.len(), 2);
    assert_relative_eq!(
        mesh.face_centroid(copies[0]).unwrap(),
        Point3::new(0.5, 0.5, 0.0),
        epsilon = 1e-9
    );

    let mut mesh = EditMesh::new();
    let face = rect(&mut mesh, 2.0, 2.0);
    let params = ImportMeshParams {
        source: ImportSource::Instance {
            name: "chair".into(),
        },
        pattern: ImportPattern::Orbit {
            count: 3,
            radius: 0.5,
            start_angle: 0.0,
            sweep: std::f64::consts::TAU,
            align: true,
        },
        ..ImportMeshParams::default()
    };
    let info = run(&ImportMeshProcessor, &mut mesh, face, &params).unwrap();
    assert_eq!(info.face_count(), 0);
    assert_eq!(mesh.instance_count(), 3);
    assert_eq!(mesh.instances_owned_by(OP).len(), 3);
}

#[test]
fn roof_rises_to_the_ridge() {
    let mut mesh = EditMesh::new();
    let face = rect(&mut mesh, 2.0, 1.0);
    let params = BuildRoofParams {
        pitch: std::f64::consts::FRAC_PI_4,
        ..BuildRoofParams::default()
    };
    let info = run(&BuildRoofProcessor, &mut mesh, face, &params).unwrap();
    assert_eq!(info.faces_in(roof::ROOF).len(), 4);
    assert_relative_eq!(max_z(&mesh), 0.5, epsilon = 1e-9);
    // Eaves reuse the footprint corners; only the two ridge ends are new.
    assert_eq!(mesh.vertex_count(), 6);
    assert!(mesh.contains_face(face));
}

#[test]
fn roof_fascia_toggle_is_locked() {
    let plain = BuildRoofParams::default();
    let fascia = BuildRoofParams {
        fascia: 0.2,
        eave: 0.2,
        ..plain.clone()
    };
    assert!(fascia.topology_changed(&plain));

    let mut mesh = EditMesh::new();
    let face = rect(&mut mesh, 1.0, 1.0);
    let info = run(&BuildRoofProcessor, &mut mesh, face, &fascia).unwrap();
    assert_eq!(info.faces_in(roof::FASCIA).len(), 4);
}

#[test]
fn projection_onto_tilted_plane() {
    let mut mesh = EditMesh::new();
    let face = rect(&mut mesh, 1.0, 1.0);
    let params = ProjectFaceParams {
        distance: 1.0,
        tilt: [std::f64::consts::FRAC_PI_4, 0.0],
        ..ProjectFaceParams::default()
    };
    let info = run(&ProjectFaceProcessor, &mut mesh, face, &params).unwrap();
    assert_eq!(info.faces_in(project::SIDES).len(), 4);
    assert_eq!(info.modulus(project::SIDES), Some(4));
    assert_relative_eq!(max_z(&mesh), 1.5, epsilon = 1e-9);
    assert_eq!(mesh.retired_count(), 1);
    assert!(!params.topology_changed(&ProjectFaceParams::default()));
}
