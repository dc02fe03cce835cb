// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Editing sessions end to end: operations stacked on each other, adjusted,
//! deleted, exported and replayed.

use approx::assert_relative_eq;
use archkit_geometry::Point3;
use archkit_journal::{SelectionInfo, SelectionMode};
use archkit_mesh::{EditMesh, ElementId, FaceAttrs, FaceKey};
use archkit_operators::{Config, Error, OperatorKind, Session};
use serde_json::json;

fn rect_mesh(w: f64, h: f64) -> (EditMesh, FaceKey) {
    let mut mesh = EditMesh::new();
    let points = [
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(w, 0.0, 0.0),
        Point3::new(w, h, 0.0),
        Point3::new(0.0, h, 0.0),
    ];
    let face = mesh.add_root_polygon(&points, FaceAttrs::default()).unwrap();
    (mesh, face)
}

fn session(w: f64, h: f64) -> (Session, FaceKey) {
    let (mesh, face) = rect_mesh(w, h);
    (Session::new(mesh, Config::default()), face)
}

/// Two cells side by side, then an extrusion of the right one.
fn grid_and_extrude(session: &mut Session, face: FaceKey) -> (i64, i64) {
    let grid = session
        .apply(
            OperatorKind::GridDivide,
            &[face],
            SelectionMode::Single,
            json!({"count_x": 1, "count_y": 0}),
        )
        .unwrap();
    let right = session.face_at(grid, "Cells", 0, 1).unwrap();
    let extrude = session
        .apply(
            OperatorKind::ExtrudeFancy,
            &[right],
            SelectionMode::Single,
            json!({"distance": 1.0}),
        )
        .unwrap();
    (grid, extrude)
}

fn top_centroid(session: &Session, op: i64) -> Point3<f64> {
    let top = session.slot_faces(op, "Tops");
    assert_eq!(top.len(), 1);
    session.mesh().face_centroid(top[0]).unwrap()
}

/// A U opening towards +Y: two 1 by 1 arms on a 3 by 1 base.
fn u_mesh() -> (EditMesh, FaceKey) {
    let mut mesh = EditMesh::new();
    let points = [
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(3.0, 0.0, 0.0),
        Point3::new(3.0, 2.0, 0.0),
        Point3::new(2.0, 2.0, 0.0),
        Point3::new(2.0, 1.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
        Point3::new(1.0, 2.0, 0.0),
        Point3::new(0.0, 2.0, 0.0),
    ];
    let face = mesh.add_root_polygon(&points, FaceAttrs::default()).unwrap();
    (mesh, face)
}

fn cut_at(position: f64) -> serde_json::Value {
    json!({"cut": {"type": "axis", "axis": "y", "position": position}})
}

/// Face identities in the mesh, sorted.
fn face_ids(mesh: &EditMesh) -> Vec<ElementId> {
    let mut ids: Vec<ElementId> = mesh.faces().map(|(_, f)| f.id).collect();
    ids.sort();
    ids
}

/// Vertex identities and positions, in id order.
fn vertex_table(mesh: &EditMesh) -> Vec<(ElementId, [f64; 3])> {
    let mut table: Vec<_> = mesh
        .vertices()
        .map(|(_, v)| (v.id, [v.position.x, v.position.y, v.position.z]))
        .collect();
    table.sort_by_key(|(id, _)| *id);
    table
}

#[test]
fn resizing_an_inset_moves_the_extrusion_on_it() {
    let (mut session, face) = session(1.0, 1.0);
    let inset = session
        .apply(OperatorKind::InsetPolygon, &[face], SelectionMode::Single, json!({}))
        .unwrap();
    let center = session.slot_faces(inset, "Center");
    assert_eq!(center.len(), 1);
    let extrude = session
        .apply(
            OperatorKind::ExtrudeFancy,
            &center,
            SelectionMode::Single,
            json!({"distance": 1.0}),
        )
        .unwrap();
    assert_eq!(session.journal().children(inset), &[extrude]);

    session.adjust(inset, json!({"size": [0.8, 0.8]})).unwrap();

    let top = session.slot_faces(extrude, "Tops")[0];
    assert_relative_eq!(session.mesh().face_area(top).unwrap(), 0.64, epsilon = 1e-9);
    let c = top_centroid(&session, extrude);
    assert_relative_eq!(c.x, 0.5, epsilon = 1e-9);
    assert_relative_eq!(c.z, 1.0, epsilon = 1e-9);
}

#[test]
fn finer_grid_keeps_the_selected_cell_on_the_right() {
    let (mut session, face) = session(2.0, 1.0);
    let (grid, extrude) = grid_and_extrude(&mut session, face);
    assert_relative_eq!(top_centroid(&session, extrude).x, 1.5, epsilon = 1e-9);

    session
        .adjust(grid, json!({"count_x": 3, "count_y": 0}))
        .unwrap();

    let record = session.journal().record(extrude).unwrap();
    assert_eq!(record.control_points.faces_of(grid), &[3]);
    let c = top_centroid(&session, extrude);
    assert_relative_eq!(c.x, 1.75, epsilon = 1e-9);
    assert_relative_eq!(c.z, 1.0, epsilon = 1e-9);
    let top = session.slot_faces(extrude, "Tops")[0];
    assert_relative_eq!(session.mesh().face_area(top).unwrap(), 0.5, epsilon = 1e-9);
}

#[test]
fn adjusting_with_the_same_parameters_changes_nothing() {
    let (mut session, face) = session(2.0, 1.0);
    let (grid, _) = grid_and_extrude(&mut session, face);
    let faces = session.mesh().face_count();
    let vertices = vertex_table(session.mesh());

    let params = session.journal().record(grid).unwrap().properties.clone();
    session.adjust(grid, params.clone()).unwrap();
    session.adjust(grid, params).unwrap();

    assert_eq!(session.mesh().face_count(), faces);
    assert_eq!(vertex_table(session.mesh()), vertices);
}

#[test]
fn coarser_grid_cannot_hold_every_selected_cell() {
    let (mut session, face) = session(4.0, 1.0);
    let grid = session
        .apply(
            OperatorKind::GridDivide,
            &[face],
            SelectionMode::Single,
            json!({"count_x": 3, "count_y": 0}),
        )
        .unwrap();
    let cells = session.slot_faces(grid, "Cells");
    assert_eq!(cells.len(), 4);
    let extrude = session
        .apply(OperatorKind::ExtrudeFancy, &cells[..3], SelectionMode::Single, json!({}))
        .unwrap();
    let faces = face_ids(session.mesh());

    let err = session
        .adjust(grid, json!({"count_x": 1, "count_y": 0}))
        .unwrap_err();
    assert!(matches!(err, Error::TopologyInconsistency(_)));

    let record = session.journal().record(extrude).unwrap();
    assert_eq!(record.control_points.faces_of(grid), &[0, 1, 2]);
    assert_eq!(face_ids(session.mesh()), faces);
}

#[test]
fn moving_a_cut_that_merges_pieces_leaves_no_stale_faces() {
    let (mesh, face) = u_mesh();
    let mut session = Session::new(mesh, Config::default());
    let split = session
        .apply(OperatorKind::SplitFace, &[face], SelectionMode::Single, cut_at(0.75))
        .unwrap();
    let pieces = session.slot_faces(split, "Pieces");
    assert_eq!(pieces.len(), 3);
    let extrude = session
        .apply(
            OperatorKind::ExtrudeFancy,
            &[pieces[2]],
            SelectionMode::Single,
            json!({"distance": 1.0}),
        )
        .unwrap();

    session.adjust(split, cut_at(0.25)).unwrap();

    let gen_info = &session.journal().record(split).unwrap().gen_info;
    assert_eq!(gen_info.faces_in("Pieces"), vec![0, 1]);
    let record = session.journal().record(extrude).unwrap();
    assert_eq!(record.control_points.faces_of(split), &[1]);
    assert!(session.mesh().find_face(ElementId::new(split, 2)).is_none());
    let owned: Vec<i32> = session
        .mesh()
        .faces_owned_by(split)
        .into_iter()
        .map(|(seq, _)| seq)
        .collect();
    assert_eq!(owned, vec![0]);

    // the same journal built from scratch gives the same faces
    let faces = face_ids(session.mesh());
    let retired = session.mesh().retired_count();
    let (_, journal) = session.into_parts();
    let (base, _) = u_mesh();
    let mut replayed = Session::with_journal(EditMesh::new(), journal, Config::default()).unwrap();
    replayed.rebuild(base).unwrap();
    assert_eq!(face_ids(replayed.mesh()), faces);
    assert_eq!(replayed.mesh().retired_count(), retired);
}

#[test]
fn moving_a_cut_that_merges_pieces_under_a_vertex_selection_is_refused() {
    let (mesh, face) = u_mesh();
    let mut session = Session::new(mesh, Config::default());
    let split = session
        .apply(OperatorKind::SplitFace, &[face], SelectionMode::Single, cut_at(0.75))
        .unwrap();
    let mut selection = SelectionInfo::new(SelectionMode::Single);
    selection.add_face(ElementId::new(split, 2));
    selection.add_vert(ElementId::new(split, 0));
    session
        .execute(OperatorKind::ExtrudeFancy, selection, json!({}))
        .unwrap();
    let faces = face_ids(session.mesh());

    let err = session.adjust(split, cut_at(0.25)).unwrap_err();
    assert!(matches!(err, Error::TopologyInconsistency(_)));
    let props = &session.journal().record(split).unwrap().properties;
    assert_eq!(props["cut"]["position"], json!(0.75));
    assert_eq!(face_ids(session.mesh()), faces);
}

#[test]
fn adjusting_runs_inside_one_interactive_loop() {
    let (mut session, face) = session(2.0, 1.0);
    let (grid, extrude) = grid_and_extrude(&mut session, face);

    session.begin_adjust(grid).unwrap();
    assert!(session.is_adjusting(grid));
    session
        .adjust(grid, json!({"count_x": 3, "count_y": 0}))
        .unwrap();
    session
        .adjust(grid, json!({"count_x": 2, "count_y": 0}))
        .unwrap();
    assert_eq!(session.journal().adjusting, vec![grid]);
    let gen_info = &session.journal().record(grid).unwrap().gen_info;
    assert_eq!(gen_info.faces_in("Cells").len(), 3);

    // adjusting another operation closes the loop on the grid
    session.adjust(extrude, json!({"distance": 2.0})).unwrap();
    assert!(!session.is_adjusting(grid));
    assert!(session.is_adjusting(extrude));
    assert_relative_eq!(top_centroid(&session, extrude).z, 2.0, epsilon = 1e-9);

    session.end_adjust(extrude);
    assert!(session.journal().adjusting.is_empty());

    // a failed adjustment leaves the state as it was
    assert!(session.adjust(grid, json!({"count_x": 1000})).is_err());
    assert!(session.journal().adjusting.is_empty());

    session.begin_adjust(grid).unwrap();
    let left = session.face_at(grid, "Cells", 0, 0).unwrap();
    session
        .apply(OperatorKind::ExtrudeFancy, &[left], SelectionMode::Single, json!({}))
        .unwrap();
    assert!(session.journal().adjusting.is_empty());
}

#[test]
fn deleting_a_parent_deletes_its_children_and_restores_the_base() {
    let (mut session, face) = session(1.0, 1.0);
    let grid = session
        .apply(
            OperatorKind::GridDivide,
            &[face],
            SelectionMode::Single,
            json!({"count_x": 1, "count_y": 0}),
        )
        .unwrap();
    let left = session.face_at(grid, "Cells", 0, 0).unwrap();
    let right = session.face_at(grid, "Cells", 0, 1).unwrap();
    let a = session
        .apply(OperatorKind::ExtrudeFancy, &[left], SelectionMode::Single, json!({}))
        .unwrap();
    let b = session
        .apply(OperatorKind::ExtrudeFancy, &[right], SelectionMode::Single, json!({}))
        .unwrap();
    assert_eq!(session.journal().len(), 3);

    let mut removed = session.delete(grid).unwrap();
    removed.sort_unstable();
    assert_eq!(removed, vec![grid, a, b]);

    assert!(session.journal().is_empty());
    let mesh = session.mesh();
    assert_eq!(mesh.face_count(), 1);
    assert_eq!(mesh.vertex_count(), 4);
    assert_eq!(mesh.retired_count(), 0);
    assert!(mesh.find_face(ElementId::root(0)).is_some());
}

#[test]
fn deleting_a_leaf_restores_its_control_face() {
    let (mut session, face) = session(2.0, 1.0);
    let (grid, extrude) = grid_and_extrude(&mut session, face);

    assert_eq!(session.delete(extrude).unwrap(), vec![extrude]);

    assert_eq!(session.journal().len(), 1);
    assert_eq!(session.slot_faces(grid, "Cells").len(), 2);
    assert_eq!(session.mesh().face_count(), 2);
}

#[test]
fn locked_change_under_a_vertex_selection_is_refused() {
    let (mut session, face) = session(2.0, 1.0);
    let grid = session
        .apply(
            OperatorKind::GridDivide,
            &[face],
            SelectionMode::Single,
            json!({"count_x": 1, "count_y": 0}),
        )
        .unwrap();
    let mut selection = SelectionInfo::new(SelectionMode::Single);
    selection.add_face(ElementId::new(grid, 1));
    selection.add_vert(ElementId::new(grid, 0));
    session
        .execute(OperatorKind::ExtrudeFancy, selection, json!({}))
        .unwrap();
    let faces = session.mesh().face_count();

    let err = session
        .adjust(grid, json!({"count_x": 2, "count_y": 0}))
        .unwrap_err();
    assert!(matches!(err, Error::TopologyInconsistency(_)));
    assert!(err.is_fatal());

    let props = &session.journal().record(grid).unwrap().properties;
    assert_eq!(props["count_x"], json!(1));
    assert_eq!(session.mesh().face_count(), faces);
}

#[test]
fn replay_limit_rolls_back() {
    let (mesh, face) = rect_mesh(2.0, 1.0);
    let mut session = Session::new(mesh, Config::default().with_max_replay(0));
    let (grid, _) = grid_and_extrude(&mut session, face);
    let vertices = vertex_table(session.mesh());

    let err = session
        .adjust(grid, json!({"count_x": 1, "count_y": 1}))
        .unwrap_err();
    assert!(matches!(err, Error::ReplayLimit(1)));
    assert_eq!(vertex_table(session.mesh()), vertices);
    assert_eq!(session.slot_faces(grid, "Cells").len(), 2);
}

#[test]
fn invalid_parameters_leave_the_session_untouched() {
    let (mut session, face) = session(1.0, 1.0);
    let (grid, _) = grid_and_extrude(&mut session, face);
    let journal = session.journal().to_json().unwrap();

    let err = session
        .adjust(grid, json!({"count_x": 1000}))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidParameters(_)));
    assert!(!err.is_fatal());
    assert_eq!(session.journal().to_json().unwrap(), journal);
}

#[test]
fn exported_script_replays_on_another_face() {
    let (mut source, face) = session(1.0, 1.0);
    let (grid, _) = grid_and_extrude(&mut source, face);
    let script = source.export(grid).unwrap();
    assert_eq!(script.len(), 2);

    let (mut target, face) = session(2.0, 2.0);
    let selection =
        SelectionInfo::from_faces(target.mesh(), &[face], SelectionMode::Single).unwrap();
    let added = target.import(&script, Some(selection)).unwrap();
    assert_eq!(added.len(), 2);

    let c = top_centroid(&target, added[1]);
    assert_relative_eq!(c.x, 1.5, epsilon = 1e-9);
    assert_relative_eq!(c.y, 1.0, epsilon = 1e-9);
    assert_relative_eq!(c.z, 1.0, epsilon = 1e-9);
}

#[test]
fn import_rejects_mismatched_selection() {
    let (mut source, face) = session(1.0, 1.0);
    let (grid, _) = grid_and_extrude(&mut source, face);
    let script = source.export(grid).unwrap();

    let (mut target, _) = session(1.0, 1.0);
    let err = target
        .import(&script, Some(SelectionInfo::new(SelectionMode::Single)))
        .unwrap_err();
    assert!(!err.is_fatal());
    assert!(target.journal().is_empty());
}

#[test]
fn library_round_trip() {
    let dir = std::env::temp_dir().join(format!("archkit-library-{}", std::process::id()));
    let (mesh, face) = rect_mesh(1.0, 1.0);
    let mut source = Session::new(mesh, Config::default().with_script_dir(&dir));
    let (grid, _) = grid_and_extrude(&mut source, face);
    let path = source
        .export_to_library(grid, "modern", "facade", "bay", None)
        .unwrap();
    assert!(path.exists());

    let (mesh, face) = rect_mesh(1.0, 1.0);
    let mut target = Session::new(mesh, Config::default().with_script_dir(&dir));
    let selection =
        SelectionInfo::from_faces(target.mesh(), &[face], SelectionMode::Single).unwrap();
    let added = target
        .import_from_library("modern", "facade", "bay", Some(selection))
        .unwrap();
    assert_eq!(added.len(), 2);
    assert_eq!(target.mesh().face_count(), source.mesh().face_count());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn rebuild_reproduces_the_session_mesh() {
    let (mut session, face) = session(2.0, 1.0);
    grid_and_extrude(&mut session, face);
    let vertices = vertex_table(session.mesh());
    let faces = session.mesh().face_count();
    let (mesh, journal) = session.into_parts();
    drop(mesh);

    let (base, _) = rect_mesh(2.0, 1.0);
    let mut replayed = Session::with_journal(EditMesh::new(), journal, Config::default()).unwrap();
    replayed.rebuild(base).unwrap();
    assert_eq!(replayed.mesh().face_count(), faces);
    assert_eq!(vertex_table(replayed.mesh()), vertices);
}
