// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON serialization for edit meshes.
//!
//! Slot-map keys are replaced by sequential indices. Logical identities and
//! face attributes are written under the attribute names the host mesh
//! schema uses (`op_id`, `seq`, `category_tag`, `uv_w`, ...). Hand-written
//! input meshes may leave identities out; such elements become root-owned.

use nalgebra::Point3;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::arena::*;
use crate::attributes::{FaceAttrs, FaceTag, UvMode};
use crate::error::{Error, Result};
use crate::keys::*;

/// Serializable representation of the full mesh.
#[derive(Debug, Serialize, Deserialize)]
pub struct MeshSnapshot {
    pub vertices: Vec<VertexSnapshot>,
    pub faces: Vec<FaceSnapshot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instances: Vec<InstanceSnapshot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub retired: Vec<RetiredSnapshot>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VertexSnapshot {
    pub co: [f64; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FaceSnapshot {
    pub verts: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<i32>,
    #[serde(default)]
    pub category_tag: i32,
    #[serde(default)]
    pub thickness: f64,
    #[serde(default)]
    pub uv_mode: i32,
    #[serde(default)]
    pub uv_origin: [f64; 3],
    #[serde(default)]
    pub uv_rotate: [f64; 3],
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uv_w: Vec<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InstanceSnapshot {
    pub op_id: i64,
    pub seq: i32,
    pub source: String,
    pub co: [f64; 3],
    pub rotation: [f64; 3],
    pub scale: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RetiredSnapshot {
    pub by_op: i64,
    pub face: FaceSnapshot,
}

impl EditMesh {
    /// Serializes the mesh to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        let snapshot = self.to_snapshot();
        serde_json::to_string_pretty(&snapshot).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Creates a serializable snapshot of the mesh.
    pub fn to_snapshot(&self) -> MeshSnapshot {
        let mut vertex_index: FxHashMap<VertexKey, usize> = FxHashMap::default();
        let vertices: Vec<VertexSnapshot> = self
            .vertices
            .iter()
            .enumerate()
            .map(|(i, (k, v))| {
                vertex_index.insert(k, i);
                VertexSnapshot {
                    co: [v.position.x, v.position.y, v.position.z],
                    op_id: Some(v.id.op_id),
                    seq: Some(v.id.seq),
                }
            })
            .collect();

        let faces = self
            .faces
            .values()
            .filter_map(|f| face_snapshot(f, &vertex_index))
            .collect();

        let instances = self
            .instances
            .values()
            .map(|inst| InstanceSnapshot {
                op_id: inst.id.op_id,
                seq: inst.id.seq,
                source: inst.source.clone(),
                co: [inst.position.x, inst.position.y, inst.position.z],
                rotation: inst.rotation,
                scale: inst.scale,
            })
            .collect();

        let retired = self
            .retired
            .iter()
            .filter_map(|r| {
                Some(RetiredSnapshot {
                    by_op: r.by_op,
                    face: face_snapshot(&r.face, &vertex_index)?,
                })
            })
            .collect();

        MeshSnapshot {
            vertices,
            faces,
            instances,
            retired,
        }
    }

    /// Deserializes a mesh from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: MeshSnapshot =
            serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))?;
        Self::from_snapshot(&snapshot)
    }

    /// Reconstructs a mesh from a snapshot.
    pub fn from_snapshot(snap: &MeshSnapshot) -> Result<Self> {
        let mut mesh = EditMesh::new();

        let mut vertex_keys: Vec<VertexKey> = Vec::with_capacity(snap.vertices.len());
        for vs in &snap.vertices {
            let position = Point3::new(vs.co[0], vs.co[1], vs.co[2]);
            let vk = match (vs.op_id, vs.seq) {
                (Some(op_id), Some(seq)) => mesh.add_vertex(position, ElementId::new(op_id, seq))?,
                _ => mesh.add_root_vertex(position),
            };
            vertex_keys.push(vk);
        }

        for fs in &snap.faces {
            let verts = resolve_loop(&fs.verts, &vertex_keys)?;
            let fk = match (fs.op_id, fs.seq) {
                (Some(op_id), Some(seq)) => {
                    mesh.add_face(&verts, ElementId::new(op_id, seq), snapshot_attrs(fs))?
                }
                _ => mesh.add_root_face(&verts, snapshot_attrs(fs))?,
            };
            if !fs.uv_w.is_empty() {
                mesh.set_loop_uv_w(fk, &fs.uv_w);
            }
        }

        for is in &snap.instances {
            mesh.add_instance(InstanceData {
                id: ElementId::new(is.op_id, is.seq),
                source: is.source.clone(),
                position: Point3::new(is.co[0], is.co[1], is.co[2]),
                rotation: is.rotation,
                scale: is.scale,
            })?;
        }

        for rs in &snap.retired {
            let verts = resolve_loop(&rs.face.verts, &vertex_keys)?;
            let id = ElementId::new(
                rs.face.op_id.unwrap_or(ROOT_OP),
                rs.face.seq.unwrap_or_default(),
            );
            let uv_w = if rs.face.uv_w.len() == verts.len() {
                rs.face.uv_w.clone()
            } else {
                vec![0.0; verts.len()]
            };
            mesh.retired.push(RetiredFace {
                face: FaceData {
                    verts,
                    uv_w,
                    attrs: snapshot_attrs(&rs.face),
                    id,
                },
                by_op: rs.by_op,
            });
        }

        Ok(mesh)
    }
}

fn face_snapshot(face: &FaceData, vertex_index: &FxHashMap<VertexKey, usize>) -> Option<FaceSnapshot> {
    let verts = face
        .verts
        .iter()
        .map(|vk| vertex_index.get(vk).copied())
        .collect::<Option<Vec<usize>>>()?;
    Some(FaceSnapshot {
        verts,
        op_id: Some(face.id.op_id),
        seq: Some(face.id.seq),
        category_tag: face.attrs.tag.as_int(),
        thickness: face.attrs.thickness,
        uv_mode: face.attrs.uv_mode.as_int(),
        uv_origin: face.attrs.uv_origin,
        uv_rotate: face.attrs.uv_rotate,
        uv_w: face.uv_w.clone(),
    })
}

fn snapshot_attrs(fs: &FaceSnapshot) -> FaceAttrs {
    FaceAttrs {
        tag: FaceTag::from_int(fs.category_tag),
        thickness: fs.thickness,
        uv_mode: UvMode::from_int(fs.uv_mode),
        uv_origin: fs.uv_origin,
        uv_rotate: fs.uv_rotate,
    }
}

fn resolve_loop(indices: &[usize], vertex_keys: &[VertexKey]) -> Result<Vec<VertexKey>> {
    indices
        .iter()
        .map(|&i| {
            vertex_keys
                .get(i)
                .copied()
                .ok_or_else(|| Error::Serialization(format!("vertex index {i} out of range")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_empty_mesh() {
        let mesh = EditMesh::new();
        let restored = EditMesh::from_json(&mesh.to_json().unwrap()).unwrap();
        assert_eq!(restored.vertex_count(), 0);
        assert_eq!(restored.face_count(), 0);
    }

    #[test]
    fn roundtrip_keeps_identity_and_attrs() {
        let mut mesh = EditMesh::new();
        let verts: Vec<VertexKey> = (0..4)
            .map(|i| {
                let p = Point3::new((i % 2) as f64, (i / 2) as f64, 0.0);
                mesh.add_vertex(p, ElementId::new(3, i)).unwrap()
            })
            .collect();
        let mut attrs = FaceAttrs::tagged(FaceTag::Glass);
        attrs.thickness = 0.2;
        let fk = mesh
            .add_face(&[verts[0], verts[1], verts[3], verts[2]], ElementId::new(3, 7), attrs)
            .unwrap();
        mesh.set_loop_uv_w(fk, &[0.0, 1.0, 2.0, 3.0]);

        let restored = EditMesh::from_json(&mesh.to_json().unwrap()).unwrap();
        let rk = restored.find_face(ElementId::new(3, 7)).unwrap();
        let face = restored.face(rk).unwrap();
        assert_eq!(face.attrs.tag, FaceTag::Glass);
        assert_eq!(face.attrs.thickness, 0.2);
        assert_eq!(face.uv_w, vec![0.0, 1.0, 2.0, 3.0]);
        assert!(restored.find_vertex(ElementId::new(3, 2)).is_some());
    }

    #[test]
    fn plain_input_becomes_root_owned() {
        let json = r#"{
            "vertices": [{"co": [0,0,0]}, {"co": [1,0,0]}, {"co": [1,1,0]}],
            "faces": [{"verts": [0, 1, 2]}]
        }"#;
        let mesh = EditMesh::from_json(json).unwrap();
        assert_eq!(mesh.faces_owned_by(ROOT_OP).len(), 1);
        assert_eq!(mesh.vertices_owned_by(ROOT_OP).len(), 3);
    }

    #[test]
    fn bad_index_is_an_error() {
        let json = r#"{"vertices": [{"co": [0,0,0]}], "faces": [{"verts": [0, 1, 2]}]}"#;
        assert!(matches!(EditMesh::from_json(json), Err(Error::Serialization(_))));
    }
}
