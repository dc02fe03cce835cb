// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Editing session: a mesh, its operation journal and the operators that
//! replay it.
//!
//! Every public action runs as a transaction. The journal and mesh are
//! cloned at the start and put back when the action fails, so a rejected
//! parameter or a broken manifest never leaves half-built geometry behind.
//!
//! Rerunning an operation follows one protocol:
//!
//! 1. normalize the parameters through the operator;
//! 2. if the change is topology-locked, refuse when a child holds vertices
//!    of the operation, otherwise tear its output down;
//! 3. run the operator in a fresh [`BuildContext`]; an unlocked change whose
//!    output counts differ anyway goes through step 2 and runs again;
//! 4. store parameters and manifest;
//! 5. warp the face selections of children onto the new manifest;
//! 6. replay descendants, parents before children.

use std::path::PathBuf;

use archkit_journal::{
    Journal, OpId, OpRecord, ScriptLibrary, SelectionInfo, SelectionMode, TopologyInfo,
};
use archkit_mesh::{EditMesh, ElementId, FaceKey, FaceTag};
use serde_json::Value;

use crate::config::Config;
use crate::context::BuildContext;
use crate::error::{Error, Result};
use crate::registry::{OperatorKind, Registry};

pub struct Session {
    mesh: EditMesh,
    journal: Journal,
    registry: Registry,
    config: Config,
}

impl Session {
    pub fn new(mesh: EditMesh, config: Config) -> Self {
        Self {
            mesh,
            journal: Journal::new(),
            registry: Registry::new(),
            config,
        }
    }

    /// Opens a session over an existing journal, which must validate.
    pub fn with_journal(mesh: EditMesh, journal: Journal, config: Config) -> Result<Self> {
        journal.validate()?;
        Ok(Self {
            mesh,
            journal,
            registry: Registry::new(),
            config,
        })
    }

    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn mesh(&self) -> &EditMesh {
        &self.mesh
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn into_parts(self) -> (EditMesh, Journal) {
        (self.mesh, self.journal)
    }

    fn transact<T>(&mut self, action: &str, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let journal = self.journal.clone();
        let mesh = self.mesh.clone();
        match f(self) {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::warn!(action, fatal = e.is_fatal(), error = %e, "rolled back");
                self.journal = journal;
                self.mesh = mesh;
                Err(e)
            }
        }
    }

    /// Records and runs a new operation on `selection`.
    pub fn execute(
        &mut self,
        kind: OperatorKind,
        selection: SelectionInfo,
        params: Value,
    ) -> Result<OpId> {
        self.transact("execute", |s| {
            if selection.is_empty() {
                return Err(Error::NothingSelected);
            }
            s.journal.clear_adjusting();
            let id = s.journal.next_id();
            let mut record = OpRecord::new(id, kind.name());
            record.control_points = selection;
            s.journal.insert(record);
            s.journal.link_from_controls(id)?;
            s.rerun(id, Some(params))?;
            tracing::info!(op_id = id, operator = kind.name(), "executed operation");
            Ok(id)
        })
    }

    /// Runs `kind` on mesh faces. When every face already comes from one
    /// operation of the same kind, that operation is adjusted instead.
    pub fn apply(
        &mut self,
        kind: OperatorKind,
        faces: &[FaceKey],
        mode: SelectionMode,
        params: Value,
    ) -> Result<OpId> {
        let selection = SelectionInfo::from_faces(&self.mesh, faces, mode)?;
        let owners = selection.owners();
        if let (1, Some(&owner)) = (owners.len(), owners.first()) {
            let same_kind = self
                .journal
                .record(owner)
                .is_some_and(|r| r.op_name == kind.name());
            if same_kind {
                self.adjust(owner, params)?;
                return Ok(owner);
            }
        }
        self.execute(kind, selection, params)
    }

    /// Reruns a committed operation with new parameters.
    ///
    /// Adjusting an operation that is not already in the adjusting state
    /// starts a new interactive loop on it; other loops are closed.
    pub fn adjust(&mut self, op: OpId, params: Value) -> Result<()> {
        self.transact("adjust", |s| {
            if !s.journal.is_adjusting(op) {
                s.begin_adjust(op)?;
            }
            s.rerun(op, Some(params))?;
            s.replay(&[op])
        })
    }

    /// Reruns `op`, with new parameters if given, and replays everything
    /// built on it.
    pub fn redo(&mut self, op: OpId, params: Option<Value>) -> Result<()> {
        self.transact("redo", |s| {
            s.rerun(op, params)?;
            s.replay(&[op])
        })
    }

    fn rerun(&mut self, op: OpId, params: Option<Value>) -> Result<()> {
        let record = self
            .journal
            .record(op)
            .cloned()
            .ok_or(archkit_journal::Error::UnknownOperation(op))?;
        let kind = OperatorKind::from_name(&record.op_name)
            .ok_or_else(|| Error::UnknownOperator(record.op_name.clone()))?;
        let operator = self.registry.get(kind)?;
        let params = operator.normalize(params.as_ref().unwrap_or(&record.properties))?;
        let committed = record.is_committed();

        let locked = committed && operator.topology_changed(&record.properties, &params)?;
        if locked {
            self.tear_down(op)?;
        }

        let mut ctx = BuildContext::begin(&mut self.mesh, op, &self.config);
        operator.run(&mut ctx, &record.control_points, &params)?;
        let mut info = ctx.finish();

        let old_info = record.gen_info;
        if committed && !locked && old_info != info {
            // Unlocked fields can still change the output counts, e.g. a cut
            // moved across a concave face.
            tracing::debug!(op_id = op, "output changed shape, rebuilding from scratch");
            self.tear_down(op)?;
            let mut ctx = BuildContext::begin(&mut self.mesh, op, &self.config);
            operator.run(&mut ctx, &record.control_points, &params)?;
            info = ctx.finish();
        }

        if let Some(stored) = self.journal.record_mut(op) {
            stored.properties = params;
            stored.gen_info = info.clone();
        }
        if committed && old_info != info {
            self.warp_children(op, &old_info, &info)?;
        }
        tracing::debug!(op_id = op, faces = info.face_count(), "ran operation");
        Ok(())
    }

    /// Removes the output of `op` before a rebuild that renumbers it.
    /// Refused while a child holds vertices of `op`.
    fn tear_down(&mut self, op: OpId) -> Result<()> {
        if let Some(&child) = self.journal.children(op).iter().find(|&&child| {
            self.journal
                .record(child)
                .is_some_and(|r| r.control_points.vert_owners().contains(&op))
        }) {
            return Err(Error::TopologyInconsistency(format!(
                "op{child} holds vertices of op{op}; this change would rebuild them"
            )));
        }
        let removed = self.mesh.remove_owned(op);
        tracing::debug!(
            op_id = op,
            vertices = removed.vertices,
            faces = removed.faces,
            "topology changed, tore down output"
        );
        Ok(())
    }

    fn warp_children(&mut self, op: OpId, old: &TopologyInfo, new: &TopologyInfo) -> Result<()> {
        for child in self.journal.children(op).to_vec() {
            let Some(record) = self.journal.record_mut(child) else {
                continue;
            };
            let seqs = record.control_points.faces_of(op).to_vec();
            if seqs.is_empty() {
                continue;
            }
            let warped = TopologyInfo::warp(old, new, &seqs)?;
            tracing::debug!(op_id = op, child, from = seqs.len(), to = warped.len(), "warped selection");
            record.control_points.set_faces_of(op, warped);
        }
        Ok(())
    }

    fn replay(&mut self, changed: &[OpId]) -> Result<()> {
        let order = self.journal.replay_order(changed)?;
        if order.len() > self.config.max_replay {
            return Err(Error::ReplayLimit(order.len()));
        }
        for id in order {
            self.rerun(id, None)?;
        }
        Ok(())
    }

    /// Deletes `op` and everything built on it, restoring the faces they
    /// consumed. Returns the removed ids.
    pub fn delete(&mut self, op: OpId) -> Result<Vec<OpId>> {
        self.transact("delete", |s| {
            let removed = s.journal.remove(op)?;
            for &id in removed.iter().rev() {
                s.mesh.remove_owned(id);
                s.mesh.restore_retired(id);
            }
            tracing::info!(op_id = op, removed = removed.len(), "deleted operations");
            Ok(removed)
        })
    }

    /// Replays the whole journal over `base`.
    pub fn rebuild(&mut self, base: EditMesh) -> Result<()> {
        self.transact("rebuild", |s| {
            s.mesh = base;
            let order = s.journal.topological_order()?;
            if order.len() > s.config.max_replay {
                return Err(Error::ReplayLimit(order.len()));
            }
            for &id in &order {
                s.rerun(id, None)?;
            }
            tracing::info!(operations = order.len(), "rebuilt mesh");
            Ok(())
        })
    }

    /// `op` and its descendants as a standalone script.
    pub fn export(&self, op: OpId) -> Result<Journal> {
        Ok(self.journal.export_subtree(op)?)
    }

    pub fn export_to_library(
        &self,
        op: OpId,
        style: &str,
        category: &str,
        name: &str,
        preview: Option<&[u8]>,
    ) -> Result<PathBuf> {
        let script = self.export(op)?;
        let library = ScriptLibrary::new(&self.config.script_dir);
        Ok(library.save(style, category, name, &script, preview)?)
    }

    /// Grafts a script onto the journal and runs it. With a selection, the
    /// script's first operation is applied to it instead of its recorded
    /// control faces.
    pub fn import(&mut self, script: &Journal, selection: Option<SelectionInfo>) -> Result<Vec<OpId>> {
        self.transact("import", |s| {
            s.journal.clear_adjusting();
            let added = s.journal.merge(script, selection.as_ref())?;
            for &id in &added {
                s.rerun(id, None)?;
            }
            tracing::info!(operations = added.len(), "imported script");
            Ok(added)
        })
    }

    pub fn import_from_library(
        &mut self,
        style: &str,
        category: &str,
        name: &str,
        selection: Option<SelectionInfo>,
    ) -> Result<Vec<OpId>> {
        let script = ScriptLibrary::new(&self.config.script_dir).load(style, category, name)?;
        self.import(&script, selection)
    }

    /// Opens an interactive loop on `op`. Loops on other operations end.
    pub fn begin_adjust(&mut self, op: OpId) -> Result<()> {
        if !self.journal.contains(op) {
            return Err(archkit_journal::Error::UnknownOperation(op).into());
        }
        if !self.journal.is_adjusting(op) {
            self.journal.clear_adjusting();
            self.journal.begin_adjust(op);
            tracing::debug!(op_id = op, "began adjusting");
        }
        Ok(())
    }

    pub fn end_adjust(&mut self, op: OpId) {
        self.journal.end_adjust(op);
    }

    pub fn is_adjusting(&self, op: OpId) -> bool {
        self.journal.is_adjusting(op)
    }

    pub fn resolve_selection(&self, selection: &SelectionInfo) -> Result<Vec<FaceKey>> {
        Ok(selection.resolve_faces(&self.mesh)?)
    }

    /// The face an operation produced at `row`, `col` of `slot`.
    pub fn face_at(&self, op: OpId, slot: &str, row: usize, col: usize) -> Option<FaceKey> {
        let seq = self.journal.record(op)?.gen_info.face_at(slot, row, col)?;
        self.mesh.find_face(ElementId::new(op, seq))
    }

    /// Faces an operation produced in `slot`, in order.
    pub fn slot_faces(&self, op: OpId, slot: &str) -> Vec<FaceKey> {
        let Some(record) = self.journal.record(op) else {
            return Vec::new();
        };
        record
            .gen_info
            .faces_in(slot)
            .into_iter()
            .filter_map(|seq| self.mesh.find_face(ElementId::new(op, seq)))
            .collect()
    }

    /// A custom face tag, registered in the journal vocabulary.
    pub fn add_face_tag(&mut self, name: &str) -> FaceTag {
        FaceTag::Custom(self.journal.add_face_tag(name))
    }
}
