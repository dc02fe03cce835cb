// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Graph-level properties of journals built through the public API.

use archkit_journal::{Journal, OpRecord, SelectionInfo, ROOT_OP};
use archkit_mesh::ElementId;

/// A chain of `depth` operations with `fan` extra children on each level.
fn tree(depth: i64, fan: i64) -> Journal {
    let mut j = Journal::new();
    let mut parent = ROOT_OP;
    for _ in 0..depth {
        let spine = j.next_id();
        let mut rec = OpRecord::new(spine, "inset_polygon");
        rec.control_points.add_face(ElementId::new(parent, 0));
        j.insert(rec);
        j.link_from_controls(spine).unwrap();
        for k in 0..fan {
            let leaf = j.next_id();
            let mut rec = OpRecord::new(leaf, "grid_divide");
            rec.control_points.add_face(ElementId::new(spine, k as i32 + 1));
            j.insert(rec);
            j.link_from_controls(leaf).unwrap();
        }
        parent = spine;
    }
    j
}

/// Walks `controlled` from the root and fails if any path revisits a node.
fn assert_acyclic(j: &Journal) {
    fn walk(j: &Journal, id: i64, path: &mut Vec<i64>) {
        assert!(!path.contains(&id), "cycle through op{id}");
        path.push(id);
        for &kid in j.children(id) {
            walk(j, kid, path);
        }
        path.pop();
    }
    walk(j, ROOT_OP, &mut Vec::new());
}

#[test]
fn journals_stay_acyclic_through_edits() {
    let mut j = tree(4, 2);
    assert_acyclic(&j);
    j.validate().unwrap();

    let removed = j.remove(3).unwrap();
    assert_eq!(removed.len(), 1 + 2 + 3 * 2);
    assert_acyclic(&j);
    j.validate().unwrap();
}

#[test]
fn export_then_merge_is_isomorphic() {
    let source = tree(3, 2);
    let script = source.export_subtree(0).unwrap();

    let text = script.to_json().unwrap();
    let reloaded = Journal::from_json(&text).unwrap();

    let mut target = Journal::new();
    let mut live = SelectionInfo::default();
    live.add_face(ElementId::root(7));
    let added = target.merge(&reloaded, Some(&live)).unwrap();
    assert_eq!(added.len(), source.len());

    // Same parent/child shape, ids only shifted.
    let shape = |j: &Journal| {
        let mut edges: Vec<(usize, usize)> = Vec::new();
        let order = j.topological_order().unwrap();
        let index = |id: i64| order.iter().position(|&o| o == id).unwrap();
        for &id in &order {
            for &kid in j.children(id) {
                edges.push((index(id), index(kid)));
            }
        }
        edges.sort();
        edges
    };
    assert_eq!(shape(&source), shape(&target));
    assert_acyclic(&target);
}
