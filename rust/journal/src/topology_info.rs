// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Output manifests.
//!
//! A [`TopologyInfo`] names the faces one operation produced. Each named slot
//! (`"Sides"`, `"Tops"`, `"Center"`, ...) holds half-open ranges `[lo, hi)`
//! of face seqs and optionally a modulus (row length) for row/column
//! addressing.
//!
//! When a parent's output changes shape, a child's selected seqs are warped:
//! each seq becomes a fractional [`FaceAddress`] in the old manifest and is
//! resolved back to a seq in the new one.

use std::collections::BTreeMap;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TopologyInfo {
    #[serde(default)]
    pub ranges: BTreeMap<String, Vec<[i32; 2]>>,
    #[serde(default)]
    pub moduli: BTreeMap<String, i32>,
}

/// Position of a face relative to its manifest, independent of counts.
///
/// Fractions point at the middle of the addressed cell, so resolving an
/// address in the manifest it came from gives back the same seq.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceAddress {
    pub slot: String,
    /// Fraction over the slot's ranges.
    pub range: f64,
    /// Fraction within the range.
    pub offset: f64,
    /// Row fraction when the slot has a modulus.
    pub row: f64,
    /// Column fraction when the slot has a modulus.
    pub col: f64,
}

impl TopologyInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the range `[lo, hi)` to `slot`. Empty ranges are ignored.
    pub fn push_range(&mut self, slot: &str, lo: i32, hi: i32) {
        if hi <= lo {
            return;
        }
        self.ranges.entry(slot.to_string()).or_default().push([lo, hi]);
    }

    /// Adds one face, extending the slot's last range when contiguous.
    pub fn push_face(&mut self, slot: &str, seq: i32) {
        let ranges = self.ranges.entry(slot.to_string()).or_default();
        match ranges.last_mut() {
            Some(last) if last[1] == seq => last[1] = seq + 1,
            _ => ranges.push([seq, seq + 1]),
        }
    }

    /// Registers a slot that may hold no faces, so slot sets stay stable.
    pub fn declare_slot(&mut self, slot: &str) {
        self.ranges.entry(slot.to_string()).or_default();
    }

    pub fn set_modulus(&mut self, slot: &str, modulus: i32) {
        if modulus > 0 {
            self.moduli.insert(slot.to_string(), modulus);
        }
    }

    pub fn modulus(&self, slot: &str) -> Option<i32> {
        self.moduli.get(slot).copied().filter(|&m| m > 0)
    }

    pub fn slot_names(&self) -> impl Iterator<Item = &str> {
        self.ranges.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.values().all(|r| r.is_empty())
    }

    pub fn face_count(&self) -> usize {
        self.ranges
            .values()
            .flatten()
            .map(|[lo, hi]| (hi - lo).max(0) as usize)
            .sum()
    }

    /// All face seqs of `slot`, in range order.
    pub fn faces_in(&self, slot: &str) -> Vec<i32> {
        self.ranges
            .get(slot)
            .map(|ranges| ranges.iter().flat_map(|&[lo, hi]| lo..hi).collect())
            .unwrap_or_default()
    }

    /// Face at `(row, col)` of a slot with a modulus; without one, `row` is
    /// the index into the slot and `col` must be 0.
    pub fn face_at(&self, slot: &str, row: usize, col: usize) -> Option<i32> {
        let faces = self.faces_in(slot);
        let index = match self.modulus(slot) {
            Some(m) if col < m as usize => row * m as usize + col,
            Some(_) => return None,
            None if col == 0 => row,
            None => return None,
        };
        faces.get(index).copied()
    }

    pub fn contains(&self, seq: i32) -> bool {
        self.ranges
            .values()
            .flatten()
            .any(|&[lo, hi]| (lo..hi).contains(&seq))
    }

    /// Both manifests have the same slot names.
    pub fn same_slots(&self, other: &TopologyInfo) -> bool {
        self.ranges.keys().eq(other.ranges.keys())
    }

    pub fn locate(&self, seq: i32) -> Option<FaceAddress> {
        for (slot, ranges) in &self.ranges {
            for (r, &[lo, hi]) in ranges.iter().enumerate() {
                if !(lo..hi).contains(&seq) {
                    continue;
                }
                let len = (hi - lo) as f64;
                let local = seq - lo;
                let (row, col) = match self.modulus(slot) {
                    Some(m) => {
                        let rows = ((hi - lo) as f64 / m as f64).ceil().max(1.0);
                        (
                            ((local / m) as f64 + 0.5) / rows,
                            ((local % m) as f64 + 0.5) / m as f64,
                        )
                    }
                    None => (0.5, 0.5),
                };
                return Some(FaceAddress {
                    slot: slot.clone(),
                    range: (r as f64 + 0.5) / ranges.len() as f64,
                    offset: (local as f64 + 0.5) / len,
                    row,
                    col,
                });
            }
        }
        None
    }

    pub fn resolve(&self, address: &FaceAddress) -> Result<i32> {
        let ranges = self
            .ranges
            .get(&address.slot)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| Error::Warp(format!("slot {:?} has no faces", address.slot)))?;
        let [lo, hi] = ranges[scaled(address.range, ranges.len())];
        let len = (hi - lo).max(0) as usize;
        if len == 0 {
            return Err(Error::Warp(format!("empty range in slot {:?}", address.slot)));
        }
        let local = match self.modulus(&address.slot) {
            Some(m) => {
                let m = m as usize;
                let rows = len.div_ceil(m);
                (scaled(address.row, rows) * m + scaled(address.col, m)).min(len - 1)
            }
            None => scaled(address.offset, len),
        };
        Ok(lo + local as i32)
    }

    /// Maps face seqs selected from `old` onto `new`.
    ///
    /// A range whose faces were all selected maps to the whole range at the
    /// same relative position in `new`. The remaining seqs are mapped one by
    /// one through their addresses; when two land on the same face, the later
    /// one takes the nearest free face of its slot, so every selected face
    /// keeps a distinct counterpart. Fails when the slot sets differ, a seq is
    /// not part of `old`, or `new` has too few faces left to hold the
    /// selection.
    pub fn warp(old: &TopologyInfo, new: &TopologyInfo, seqs: &[i32]) -> Result<Vec<i32>> {
        if !old.same_slots(new) {
            let old_slots: Vec<&str> = old.slot_names().collect();
            let new_slots: Vec<&str> = new.slot_names().collect();
            return Err(Error::Warp(format!(
                "slot set changed from {old_slots:?} to {new_slots:?}"
            )));
        }

        let selected: FxHashSet<i32> = seqs.iter().copied().collect();
        let mut covered: FxHashSet<i32> = FxHashSet::default();
        let mut out: Vec<i32> = Vec::with_capacity(seqs.len());

        for (slot, ranges) in &old.ranges {
            let Some(new_ranges) = new.ranges.get(slot).filter(|r| !r.is_empty()) else {
                continue;
            };
            for (r, &[lo, hi]) in ranges.iter().enumerate() {
                if hi - lo < 2 || !(lo..hi).all(|s| selected.contains(&s)) {
                    continue;
                }
                covered.extend(lo..hi);
                let fraction = (r as f64 + 0.5) / ranges.len() as f64;
                let [nlo, nhi] = new_ranges[scaled(fraction, new_ranges.len())];
                for s in nlo..nhi {
                    if !out.contains(&s) {
                        out.push(s);
                    }
                }
            }
        }

        for &seq in seqs {
            if covered.contains(&seq) {
                continue;
            }
            let address = old
                .locate(seq)
                .ok_or_else(|| Error::Warp(format!("face seq {seq} is not in the manifest")))?;
            let mut mapped = new.resolve(&address)?;
            if out.contains(&mapped) {
                mapped = nearest_free(&new.faces_in(&address.slot), mapped, &out).ok_or_else(|| {
                    Error::TopologyInconsistency(format!(
                        "slot {:?} has too few faces left for face seq {seq}",
                        address.slot
                    ))
                })?;
            }
            if !new.contains(mapped) {
                return Err(Error::TopologyInconsistency(format!(
                    "face seq {seq} resolved to {mapped}, which is not in the new manifest"
                )));
            }
            out.push(mapped);
        }
        Ok(out)
    }
}

/// The face of `faces` closest in slot order to `taken`, skipping those
/// already in `used`. Ties go to the later face.
fn nearest_free(faces: &[i32], taken: i32, used: &[i32]) -> Option<i32> {
    let at = faces.iter().position(|&f| f == taken)?;
    faces
        .iter()
        .enumerate()
        .filter(|(_, f)| !used.contains(*f))
        .min_by_key(|&(i, _)| (i.abs_diff(at), std::cmp::Reverse(i)))
        .map(|(_, &f)| f)
}

/// Index of the cell a fraction in `[0, 1)` falls into, out of `count`.
fn scaled(fraction: f64, count: usize) -> usize {
    ((fraction * count as f64).floor().max(0.0) as usize).min(count.saturating_sub(1))
}
