// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Selections by logical identity.
//!
//! A [`SelectionInfo`] names faces and vertices by `(op_id, seq)` only, so a
//! stored selection stays meaningful after the mesh is rebuilt.

use std::collections::{BTreeMap, BTreeSet};

use archkit_mesh::{EditMesh, ElementId, FaceKey, VertexKey};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::keys::{op_map, OpId};

/// How several selected faces are processed by one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SelectionMode {
    /// Each face independently.
    #[default]
    Single,
    /// All faces as one batch sharing parameters.
    Group,
    /// All faces merged into one region polygon.
    Region,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SelectionInfo {
    #[serde(with = "op_map", default)]
    pub faces: BTreeMap<OpId, Vec<i32>>,
    #[serde(with = "op_map", default)]
    pub verts: BTreeMap<OpId, Vec<i32>>,
    #[serde(default)]
    pub flags: BTreeMap<String, bool>,
    #[serde(default)]
    pub mode: SelectionMode,
}

impl SelectionInfo {
    pub fn new(mode: SelectionMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Builds a selection from live mesh faces.
    pub fn from_faces(mesh: &EditMesh, faces: &[FaceKey], mode: SelectionMode) -> Result<Self> {
        let mut sel = Self::new(mode);
        for &fk in faces {
            let face = mesh
                .face(fk)
                .ok_or_else(|| Error::UserInput(format!("face {fk:?} is not in the mesh")))?;
            sel.add_face(face.id);
        }
        Ok(sel)
    }

    pub fn add_face(&mut self, id: ElementId) {
        let seqs = self.faces.entry(id.op_id).or_default();
        if !seqs.contains(&id.seq) {
            seqs.push(id.seq);
        }
    }

    pub fn add_vert(&mut self, id: ElementId) {
        let seqs = self.verts.entry(id.op_id).or_default();
        if !seqs.contains(&id.seq) {
            seqs.push(id.seq);
        }
    }

    pub fn remove_face(&mut self, id: ElementId) -> bool {
        let Some(seqs) = self.faces.get_mut(&id.op_id) else {
            return false;
        };
        let before = seqs.len();
        seqs.retain(|&s| s != id.seq);
        let removed = seqs.len() != before;
        if seqs.is_empty() {
            self.faces.remove(&id.op_id);
        }
        removed
    }

    pub fn face_count(&self) -> usize {
        self.faces.values().map(Vec::len).sum()
    }

    pub fn vert_count(&self) -> usize {
        self.verts.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.face_count() == 0 && self.vert_count() == 0
    }

    pub fn face_ids(&self) -> Vec<ElementId> {
        flatten(&self.faces)
    }

    pub fn vert_ids(&self) -> Vec<ElementId> {
        flatten(&self.verts)
    }

    /// Face seqs selected from one operation's output.
    pub fn faces_of(&self, op_id: OpId) -> &[i32] {
        self.faces.get(&op_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn set_faces_of(&mut self, op_id: OpId, seqs: Vec<i32>) {
        if seqs.is_empty() {
            self.faces.remove(&op_id);
        } else {
            self.faces.insert(op_id, seqs);
        }
    }

    /// Operations whose faces or vertices this selection references.
    pub fn owners(&self) -> BTreeSet<OpId> {
        self.faces.keys().chain(self.verts.keys()).copied().collect()
    }

    /// Operations whose vertices (not faces) this selection references.
    pub fn vert_owners(&self) -> BTreeSet<OpId> {
        self.verts.keys().copied().collect()
    }

    /// Rewrites owner ids. Lists that land on the same owner are merged; a
    /// seq already taken there is renumbered past the largest one, so every
    /// element stays selected.
    pub fn remap_owners(&mut self, map: impl Fn(OpId) -> OpId) {
        self.faces = remap(std::mem::take(&mut self.faces), &map);
        self.verts = remap(std::mem::take(&mut self.verts), &map);
    }

    pub fn flag(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    pub fn set_flag(&mut self, name: impl Into<String>, value: bool) {
        self.flags.insert(name.into(), value);
    }

    /// Groups of faces processed together, according to the mode.
    pub fn groups(&self) -> Vec<Vec<ElementId>> {
        let ids = self.face_ids();
        if ids.is_empty() {
            return Vec::new();
        }
        match self.mode {
            SelectionMode::Single => ids.into_iter().map(|id| vec![id]).collect(),
            SelectionMode::Group | SelectionMode::Region => vec![ids],
        }
    }

    /// Looks every selected face up in the mesh.
    pub fn resolve_faces(&self, mesh: &EditMesh) -> Result<Vec<FaceKey>> {
        self.face_ids()
            .into_iter()
            .map(|id| {
                mesh.find_face(id).ok_or_else(|| {
                    Error::TopologyInconsistency(format!("selected face {id} is not in the mesh"))
                })
            })
            .collect()
    }

    pub fn resolve_verts(&self, mesh: &EditMesh) -> Result<Vec<VertexKey>> {
        self.vert_ids()
            .into_iter()
            .map(|id| {
                mesh.find_vertex(id).ok_or_else(|| {
                    Error::TopologyInconsistency(format!("selected vertex {id} is not in the mesh"))
                })
            })
            .collect()
    }
}

fn flatten(map: &BTreeMap<OpId, Vec<i32>>) -> Vec<ElementId> {
    map.iter()
        .flat_map(|(&op_id, seqs)| seqs.iter().map(move |&seq| ElementId::new(op_id, seq)))
        .collect()
}

fn remap(
    map: BTreeMap<OpId, Vec<i32>>,
    f: &impl Fn(OpId) -> OpId,
) -> BTreeMap<OpId, Vec<i32>> {
    let mut out: BTreeMap<OpId, Vec<i32>> = BTreeMap::new();
    for (id, seqs) in map {
        let list = out.entry(f(id)).or_default();
        let mut seen: Vec<i32> = Vec::with_capacity(seqs.len());
        for s in seqs {
            if seen.contains(&s) {
                continue;
            }
            seen.push(s);
            if list.contains(&s) {
                let next = list.iter().copied().max().map_or(0, |m| m + 1);
                list.push(next);
            } else {
                list.push(s);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use archkit_mesh::{FaceAttrs, ROOT_OP};
    use nalgebra::Point3;

    #[test]
    fn json_uses_op_keys() {
        let mut sel = SelectionInfo::new(SelectionMode::Region);
        sel.add_face(ElementId::new(3, 7));
        sel.add_face(ElementId::root(0));
        sel.add_vert(ElementId::new(3, 1));
        sel.set_flag("clip_outside", true);

        let json = serde_json::to_value(&sel).unwrap();
        assert_eq!(json["faces"]["op3"], serde_json::json!([7]));
        assert_eq!(json["faces"]["op-1"], serde_json::json!([0]));
        assert_eq!(json["verts"]["op3"], serde_json::json!([1]));
        assert_eq!(json["mode"], "REGION");

        let back: SelectionInfo = serde_json::from_value(json).unwrap();
        assert_eq!(back, sel);
    }

    #[test]
    fn missing_fields_default() {
        let sel: SelectionInfo = serde_json::from_str(r#"{"faces": {"op2": [1, 2]}}"#).unwrap();
        assert_eq!(sel.face_count(), 2);
        assert_eq!(sel.mode, SelectionMode::Single);
        assert!(sel.verts.is_empty());
    }

    #[test]
    fn groups_follow_mode() {
        let mut sel = SelectionInfo::new(SelectionMode::Single);
        sel.add_face(ElementId::new(1, 0));
        sel.add_face(ElementId::new(1, 1));
        assert_eq!(sel.groups().len(), 2);
        sel.mode = SelectionMode::Group;
        assert_eq!(sel.groups().len(), 1);
        assert_eq!(sel.groups()[0].len(), 2);
    }

    #[test]
    fn remap_merges_owners() {
        let mut sel = SelectionInfo::default();
        sel.add_face(ElementId::new(4, 0));
        sel.add_face(ElementId::new(5, 0));
        sel.add_face(ElementId::new(5, 1));
        sel.remap_owners(|_| ROOT_OP);
        assert_eq!(sel.owners().into_iter().collect::<Vec<_>>(), vec![ROOT_OP]);
        // 5:0 collides with 4:0 and is renumbered, pushing 5:1 along
        assert_eq!(sel.faces_of(ROOT_OP), &[0, 1, 2]);
        assert_eq!(sel.face_count(), 3);
    }

    #[test]
    fn resolves_against_mesh() {
        let mut mesh = EditMesh::new();
        let fk = mesh
            .add_root_polygon(
                &[
                    Point3::new(0.0, 0.0, 0.0),
                    Point3::new(1.0, 0.0, 0.0),
                    Point3::new(0.0, 1.0, 0.0),
                ],
                FaceAttrs::default(),
            )
            .unwrap();
        let sel = SelectionInfo::from_faces(&mesh, &[fk], SelectionMode::Single).unwrap();
        assert_eq!(sel.resolve_faces(&mesh).unwrap(), vec![fk]);

        let mut stale = sel.clone();
        stale.add_face(ElementId::new(9, 0));
        assert!(matches!(
            stale.resolve_faces(&mesh),
            Err(Error::TopologyInconsistency(_))
        ));
    }
}
