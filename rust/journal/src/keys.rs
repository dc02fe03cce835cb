// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Operation-keyed maps and their `"op<N>"` string form.
//!
//! Maps are integer keyed in memory. The persisted JSON writes keys as
//! `"op3"`, `"op-1"` for the root.

use std::collections::BTreeMap;

pub use archkit_mesh::ROOT_OP;

/// Identifier of an operation in a journal. `ROOT_OP` stands for the base
/// geometry.
pub type OpId = i64;

pub fn op_key(id: OpId) -> String {
    format!("op{id}")
}

pub fn parse_op_key(key: &str) -> Option<OpId> {
    key.strip_prefix("op")?.parse().ok()
}

/// Serde adapter for `BTreeMap<OpId, V>` with `"op<N>"` keys.
pub mod op_map {
    use super::*;
    use serde::de::Error as _;
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S, V>(map: &BTreeMap<OpId, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        V: Serialize,
    {
        let mut out = serializer.serialize_map(Some(map.len()))?;
        for (id, value) in map {
            out.serialize_entry(&op_key(*id), value)?;
        }
        out.end()
    }

    pub fn deserialize<'de, D, V>(deserializer: D) -> Result<BTreeMap<OpId, V>, D::Error>
    where
        D: Deserializer<'de>,
        V: Deserialize<'de>,
    {
        let raw: BTreeMap<String, V> = BTreeMap::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(key, value)| {
                parse_op_key(&key)
                    .map(|id| (id, value))
                    .ok_or_else(|| D::Error::custom(format!("invalid operation key {key:?}")))
            })
            .collect()
    }
}
