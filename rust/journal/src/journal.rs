// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The operation journal and its dependency graph.
//!
//! `controlled[P]` lists the operations whose control points reference
//! geometry owned by `P`; base geometry is owned by [`ROOT_OP`]. The graph is
//! acyclic because an operation can only reference geometry that existed
//! before it ran.
//!
//! # JSON format
//!
//! ```json
//! {
//!   "max_id": 2,
//!   "controlled": { "op-1": [0], "op0": [1], "op1": [] },
//!   "adjusting": [],
//!   "face_tags": ["brick"],
//!   "version": "1.0",
//!   "op0": { "op_id": 0, "op_name": "inset_polygon", "properties": {...},
//!            "control_points": {...}, "gen_info": {...} },
//!   "op1": { ... }
//! }
//! ```

use std::collections::{BTreeMap, VecDeque};

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::keys::{op_key, op_map, parse_op_key, OpId, ROOT_OP};
use crate::record::OpRecord;
use crate::selection::SelectionInfo;

pub const JOURNAL_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "JournalDoc", into = "JournalDoc")]
pub struct Journal {
    /// Next free operation id.
    pub max_id: OpId,
    pub controlled: BTreeMap<OpId, Vec<OpId>>,
    /// Operations in an interactive re-run loop. Not meaningful across
    /// sessions.
    pub adjusting: Vec<OpId>,
    /// Custom face tag vocabulary, indexed by `FaceTag::Custom`.
    pub face_tags: Vec<String>,
    pub version: String,
    pub records: BTreeMap<OpId, OpRecord>,
}

impl Default for Journal {
    fn default() -> Self {
        Self::new()
    }
}

impl Journal {
    pub fn new() -> Self {
        let mut controlled = BTreeMap::new();
        controlled.insert(ROOT_OP, Vec::new());
        Self {
            max_id: 0,
            controlled,
            adjusting: Vec::new(),
            face_tags: Vec::new(),
            version: JOURNAL_VERSION.to_string(),
            records: BTreeMap::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    // --- Records ---

    /// Reserves the next operation id.
    pub fn next_id(&mut self) -> OpId {
        let id = self.max_id;
        self.max_id += 1;
        id
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: OpId) -> bool {
        self.records.contains_key(&id)
    }

    pub fn record(&self, id: OpId) -> Option<&OpRecord> {
        self.records.get(&id)
    }

    pub fn record_mut(&mut self, id: OpId) -> Option<&mut OpRecord> {
        self.records.get_mut(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = OpId> + '_ {
        self.records.keys().copied()
    }

    /// Stores a record, replacing any record with the same id.
    pub fn insert(&mut self, record: OpRecord) {
        let id = record.op_id;
        self.max_id = self.max_id.max(id + 1);
        self.controlled.entry(id).or_default();
        self.records.insert(id, record);
    }

    // --- Graph ---

    pub fn children(&self, id: OpId) -> &[OpId] {
        self.controlled.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn parents(&self, id: OpId) -> Vec<OpId> {
        self.controlled
            .iter()
            .filter(|(_, kids)| kids.contains(&id))
            .map(|(&p, _)| p)
            .collect()
    }

    fn known(&self, id: OpId) -> bool {
        id == ROOT_OP || self.records.contains_key(&id)
    }

    /// Makes `child` controlled by exactly `parents` (the root when empty).
    pub fn set_parents(&mut self, child: OpId, parents: impl IntoIterator<Item = OpId>) -> Result<()> {
        if !self.contains(child) {
            return Err(Error::UnknownOperation(child));
        }
        let mut parents: Vec<OpId> = parents.into_iter().collect();
        parents.sort_unstable();
        parents.dedup();
        if parents.is_empty() {
            parents.push(ROOT_OP);
        }

        let below = self.descendants(child);
        for &p in &parents {
            if !self.known(p) {
                return Err(Error::UnknownOperation(p));
            }
            if p == child || below.contains(&p) {
                return Err(Error::Cycle(child));
            }
        }

        for kids in self.controlled.values_mut() {
            kids.retain(|&k| k != child);
        }
        for p in parents {
            self.controlled.entry(p).or_default().push(child);
        }
        Ok(())
    }

    /// Links `id` under the owners of its control points.
    pub fn link_from_controls(&mut self, id: OpId) -> Result<()> {
        let owners = self
            .record(id)
            .ok_or(Error::UnknownOperation(id))?
            .control_points
            .owners();
        self.set_parents(id, owners)
    }

    /// Every operation reachable from `id`, breadth first, excluding `id`.
    pub fn descendants(&self, id: OpId) -> Vec<OpId> {
        let mut seen: FxHashSet<OpId> = FxHashSet::default();
        seen.insert(id);
        let mut out = Vec::new();
        let mut queue: VecDeque<OpId> = self.children(id).iter().copied().collect();
        while let Some(next) = queue.pop_front() {
            if !seen.insert(next) {
                continue;
            }
            out.push(next);
            queue.extend(self.children(next).iter().copied());
        }
        out
    }

    /// Descendants of `changed`, ordered so every operation comes after all
    /// of its parents in the set.
    pub fn replay_order(&self, changed: &[OpId]) -> Result<Vec<OpId>> {
        let done: FxHashSet<OpId> = changed.iter().copied().collect();
        let mut pending: Vec<OpId> = Vec::new();
        let mut in_set: FxHashSet<OpId> = FxHashSet::default();
        for &c in changed {
            for d in self.descendants(c) {
                if !done.contains(&d) && in_set.insert(d) {
                    pending.push(d);
                }
            }
        }

        let mut indegree: FxHashMap<OpId, usize> = FxHashMap::default();
        for &id in &pending {
            let count = self
                .parents(id)
                .into_iter()
                .filter(|p| in_set.contains(p))
                .count();
            indegree.insert(id, count);
        }

        let mut ready: VecDeque<OpId> = pending
            .iter()
            .copied()
            .filter(|id| indegree.get(id) == Some(&0))
            .collect();
        let mut order = Vec::with_capacity(pending.len());
        while let Some(id) = ready.pop_front() {
            order.push(id);
            for &kid in self.children(id) {
                if let Some(d) = indegree.get_mut(&kid) {
                    *d = d.saturating_sub(1);
                    if *d == 0 {
                        ready.push_back(kid);
                    }
                }
            }
        }

        if order.len() != pending.len() {
            let stuck = pending
                .into_iter()
                .find(|id| !order.contains(id))
                .unwrap_or(ROOT_OP);
            return Err(Error::Cycle(stuck));
        }
        Ok(order)
    }

    /// All records in an order that respects dependencies.
    pub fn topological_order(&self) -> Result<Vec<OpId>> {
        let order = self.replay_order(&[ROOT_OP])?;
        if order.len() != self.records.len() {
            let orphan = self
                .ids()
                .find(|id| !order.contains(id))
                .unwrap_or(ROOT_OP);
            return Err(Error::TopologyInconsistency(format!(
                "op{orphan} is not reachable from the root"
            )));
        }
        Ok(order)
    }

    /// Checks that every referenced id exists and the graph is acyclic.
    pub fn validate(&self) -> Result<()> {
        for (&id, record) in &self.records {
            if record.op_id != id {
                return Err(Error::TopologyInconsistency(format!(
                    "record {} stored under {}",
                    op_key(record.op_id),
                    op_key(id)
                )));
            }
            for owner in record.control_points.owners() {
                if !self.known(owner) {
                    return Err(Error::UnknownOperation(owner));
                }
            }
        }
        for (&parent, kids) in &self.controlled {
            if !self.known(parent) {
                return Err(Error::UnknownOperation(parent));
            }
            if let Some(&missing) = kids.iter().find(|k| !self.contains(**k)) {
                return Err(Error::UnknownOperation(missing));
            }
        }

        // Depth-first search with colors; a grey node reached again is a cycle.
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Grey,
            Black,
        }
        let mut marks: FxHashMap<OpId, Mark> = FxHashMap::default();
        let starts: Vec<OpId> = std::iter::once(ROOT_OP).chain(self.ids()).collect();
        for start in starts {
            if marks.contains_key(&start) {
                continue;
            }
            let mut stack: Vec<(OpId, usize)> = vec![(start, 0)];
            marks.insert(start, Mark::Grey);
            while let Some((node, next)) = stack.pop() {
                let kids = self.children(node);
                if next < kids.len() {
                    stack.push((node, next + 1));
                    let kid = kids[next];
                    match marks.get(&kid) {
                        Some(Mark::Grey) => return Err(Error::Cycle(kid)),
                        Some(Mark::Black) => {}
                        None => {
                            marks.insert(kid, Mark::Grey);
                            stack.push((kid, 0));
                        }
                    }
                } else {
                    marks.insert(node, Mark::Black);
                }
            }
        }
        Ok(())
    }

    /// Removes `id` and all of its descendants. Returns the removed ids,
    /// breadth first starting with `id`.
    pub fn remove(&mut self, id: OpId) -> Result<Vec<OpId>> {
        if !self.contains(id) {
            return Err(Error::UnknownOperation(id));
        }
        let mut removed = vec![id];
        removed.extend(self.descendants(id));
        let gone: FxHashSet<OpId> = removed.iter().copied().collect();

        for r in &removed {
            self.records.remove(r);
            self.controlled.remove(r);
        }
        for kids in self.controlled.values_mut() {
            kids.retain(|k| !gone.contains(k));
        }
        self.adjusting.retain(|a| !gone.contains(a));
        tracing::debug!(op_id = id, removed = removed.len(), "removed operations from journal");
        Ok(removed)
    }

    // --- Adjusting ---

    pub fn begin_adjust(&mut self, id: OpId) {
        if !self.adjusting.contains(&id) {
            self.adjusting.push(id);
        }
    }

    pub fn end_adjust(&mut self, id: OpId) {
        self.adjusting.retain(|&a| a != id);
    }

    pub fn is_adjusting(&self, id: OpId) -> bool {
        self.adjusting.contains(&id)
    }

    pub fn clear_adjusting(&mut self) {
        self.adjusting.clear();
    }

    // --- Face tags ---

    /// Index of a custom face tag, adding it to the vocabulary if new.
    pub fn add_face_tag(&mut self, name: &str) -> u32 {
        if let Some(i) = self.face_tags.iter().position(|t| t == name) {
            return i as u32;
        }
        self.face_tags.push(name.to_string());
        (self.face_tags.len() - 1) as u32
    }

    pub fn face_tag_name(&self, index: u32) -> Option<&str> {
        self.face_tags.get(index as usize).map(String::as_str)
    }

    // --- Export / merge ---

    /// Extracts `root` and its descendants as a self-contained journal.
    ///
    /// Ids are renumbered from 0 in breadth-first order. References to
    /// geometry outside the subtree become root references.
    pub fn export_subtree(&self, root: OpId) -> Result<Journal> {
        if !self.contains(root) {
            return Err(Error::UnknownOperation(root));
        }
        let mut ids = vec![root];
        ids.extend(self.descendants(root));
        let mapping: FxHashMap<OpId, OpId> = ids
            .iter()
            .enumerate()
            .map(|(new, &old)| (old, new as OpId))
            .collect();

        let mut out = Journal::new();
        out.face_tags = self.face_tags.clone();
        for &old in &ids {
            let mut record = self
                .record(old)
                .cloned()
                .ok_or(Error::UnknownOperation(old))?;
            record.op_id = mapping[&old];
            record
                .control_points
                .remap_owners(|o| mapping.get(&o).copied().unwrap_or(ROOT_OP));
            out.insert(record);
        }
        for new in 0..ids.len() as OpId {
            out.link_from_controls(new)?;
        }
        Ok(out)
    }

    /// Grafts `script` onto this journal with fresh ids.
    ///
    /// The script's first top-level operation takes `selection` as its
    /// control points; the selection must have the same face and vertex
    /// counts as the recorded one. Returns the new ids in dependency order.
    pub fn merge(&mut self, script: &Journal, selection: Option<&SelectionInfo>) -> Result<Vec<OpId>> {
        script.validate()?;
        let order = script.topological_order()?;
        let Some(&first) = script.children(ROOT_OP).iter().min() else {
            return Ok(Vec::new());
        };

        if let Some(sel) = selection {
            let expected = &script.records[&first].control_points;
            if sel.face_count() != expected.face_count() || sel.vert_count() != expected.vert_count() {
                return Err(Error::UserInput(format!(
                    "script expects {} faces and {} vertices, selection has {} and {}",
                    expected.face_count(),
                    expected.vert_count(),
                    sel.face_count(),
                    sel.vert_count()
                )));
            }
        }

        let mut mapping: FxHashMap<OpId, OpId> = FxHashMap::default();
        for &old in &order {
            mapping.insert(old, self.next_id());
        }

        let mut added = Vec::with_capacity(order.len());
        for &old in &order {
            let mut record = script.records[&old].clone();
            record.op_id = mapping[&old];
            match selection {
                Some(sel) if old == first => record.control_points = sel.clone(),
                _ => record
                    .control_points
                    .remap_owners(|o| mapping.get(&o).copied().unwrap_or(ROOT_OP)),
            }
            let id = record.op_id;
            self.insert(record);
            self.link_from_controls(id)?;
            added.push(id);
        }
        for tag in &script.face_tags {
            self.add_face_tag(tag);
        }
        tracing::debug!(operations = added.len(), first = mapping[&first], "merged script");
        Ok(added)
    }
}

/// Wire form: `op<N>` keys for the graph and one top-level key per record.
#[derive(Serialize, Deserialize)]
struct JournalDoc {
    max_id: OpId,
    #[serde(with = "op_map", default)]
    controlled: BTreeMap<OpId, Vec<OpId>>,
    #[serde(default)]
    adjusting: Vec<OpId>,
    #[serde(default)]
    face_tags: Vec<String>,
    #[serde(default = "default_version")]
    version: String,
    #[serde(flatten)]
    records: BTreeMap<String, OpRecord>,
}

fn default_version() -> String {
    JOURNAL_VERSION.to_string()
}

impl From<Journal> for JournalDoc {
    fn from(j: Journal) -> Self {
        Self {
            max_id: j.max_id,
            controlled: j.controlled,
            adjusting: j.adjusting,
            face_tags: j.face_tags,
            version: j.version,
            records: j
                .records
                .into_iter()
                .map(|(id, r)| (op_key(id), r))
                .collect(),
        }
    }
}

impl TryFrom<JournalDoc> for Journal {
    type Error = Error;

    fn try_from(doc: JournalDoc) -> Result<Self> {
        let mut records = BTreeMap::new();
        for (key, record) in doc.records {
            let id = parse_op_key(&key).ok_or_else(|| {
                Error::TopologyInconsistency(format!("unexpected journal key {key:?}"))
            })?;
            records.insert(id, record);
        }
        let mut controlled = doc.controlled;
        controlled.entry(ROOT_OP).or_default();
        Ok(Self {
            max_id: doc.max_id,
            controlled,
            adjusting: doc.adjusting,
            face_tags: doc.face_tags,
            version: doc.version,
            records,
        })
    }
}
