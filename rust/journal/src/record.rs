// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde::{Deserialize, Serialize};

use crate::keys::OpId;
use crate::selection::SelectionInfo;
use crate::topology_info::TopologyInfo;

/// Everything needed to replay one operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpRecord {
    pub op_id: OpId,
    /// Registry name of the operator.
    pub op_name: String,
    /// Operator parameters as written by the operator's parameter struct.
    #[serde(default)]
    pub properties: serde_json::Value,
    /// Faces and vertices the operation reads.
    #[serde(default)]
    pub control_points: SelectionInfo,
    /// Faces the operation produced on its last run.
    #[serde(default)]
    pub gen_info: TopologyInfo,
}

impl OpRecord {
    pub fn new(op_id: OpId, op_name: impl Into<String>) -> Self {
        Self {
            op_id,
            op_name: op_name.into(),
            properties: serde_json::Value::Null,
            control_points: SelectionInfo::default(),
            gen_info: TopologyInfo::default(),
        }
    }

    /// Whether this operation has run and stored its output manifest.
    pub fn is_committed(&self) -> bool {
        !self.properties.is_null()
    }
}
