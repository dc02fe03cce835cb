// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Operator registry - dispatch from journal records to operators.
//!
//! Records name their operator by [`OperatorKind`]. Each operator is a
//! typed [`MeshOperator`] with a plain serde parameter struct; the registry
//! stores them behind the object-safe [`DynOperator`] so records can carry
//! parameters as JSON.

use std::fmt::Debug;
use std::sync::Arc;

use archkit_journal::SelectionInfo;
use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::BuildContext;
use crate::error::{Error, Result};
use crate::processors::{
    BuildRoofProcessor, ExtrudeFancyProcessor, ExtrudeSweepProcessor, GridDivideProcessor,
    ImportMeshProcessor, InsetPolygonProcessor, MakeLouversProcessor, ProjectFaceProcessor,
    SolidifyEdgesProcessor, SplitFaceProcessor,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorKind {
    InsetPolygon,
    GridDivide,
    SplitFace,
    ExtrudeFancy,
    ExtrudeSweep,
    SolidifyEdges,
    MakeLouvers,
    ImportMesh,
    BuildRoof,
    ProjectFace,
}

impl OperatorKind {
    pub const ALL: [OperatorKind; 10] = [
        OperatorKind::InsetPolygon,
        OperatorKind::GridDivide,
        OperatorKind::SplitFace,
        OperatorKind::ExtrudeFancy,
        OperatorKind::ExtrudeSweep,
        OperatorKind::SolidifyEdges,
        OperatorKind::MakeLouvers,
        OperatorKind::ImportMesh,
        OperatorKind::BuildRoof,
        OperatorKind::ProjectFace,
    ];

    /// Name stored in journal records.
    pub fn name(&self) -> &'static str {
        match self {
            OperatorKind::InsetPolygon => "inset_polygon",
            OperatorKind::GridDivide => "grid_divide",
            OperatorKind::SplitFace => "split_face",
            OperatorKind::ExtrudeFancy => "extrude_fancy",
            OperatorKind::ExtrudeSweep => "extrude_sweep",
            OperatorKind::SolidifyEdges => "solidify_edges",
            OperatorKind::MakeLouvers => "make_louvers",
            OperatorKind::ImportMesh => "import_mesh",
            OperatorKind::BuildRoof => "build_roof",
            OperatorKind::ProjectFace => "project_face",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

/// Parameter record of one operator.
pub trait OperatorParams: Serialize + DeserializeOwned + Default + Clone + Debug {
    /// Whether going from `old` to `self` changes how many vertices or
    /// faces the operator creates, so a rerun cannot reuse them in place.
    ///
    /// Fields that change the counts only for some control faces may be left
    /// out: a rerun whose manifest differs from the stored one is torn down
    /// and built again under the same rules.
    fn topology_changed(&self, old: &Self) -> bool;

    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// A typed mesh operator.
pub trait MeshOperator: Send + Sync {
    type Params: OperatorParams;

    fn kind(&self) -> OperatorKind;

    /// Builds the operator's output for `selection` into the context.
    fn operate(
        &self,
        ctx: &mut BuildContext<'_>,
        selection: &SelectionInfo,
        params: &Self::Params,
    ) -> Result<()>;
}

/// Object-safe face of [`MeshOperator`] working on JSON parameters.
pub trait DynOperator: Send + Sync {
    fn kind(&self) -> OperatorKind;

    fn default_params(&self) -> Result<Value>;

    /// Parses, validates and re-serializes parameters, filling defaults.
    fn normalize(&self, params: &Value) -> Result<Value>;

    fn topology_changed(&self, old: &Value, new: &Value) -> Result<bool>;

    fn run(&self, ctx: &mut BuildContext<'_>, selection: &SelectionInfo, params: &Value)
        -> Result<()>;
}

/// Parses a parameter record; `null` means all defaults.
pub fn parse_params<P: OperatorParams>(value: &Value) -> Result<P> {
    if value.is_null() {
        return Ok(P::default());
    }
    P::deserialize(value).map_err(|e| Error::InvalidParameters(e.to_string()))
}

impl<T: MeshOperator> DynOperator for T {
    fn kind(&self) -> OperatorKind {
        MeshOperator::kind(self)
    }

    fn default_params(&self) -> Result<Value> {
        Ok(serde_json::to_value(T::Params::default())?)
    }

    fn normalize(&self, params: &Value) -> Result<Value> {
        let parsed: T::Params = parse_params(params)?;
        parsed.validate()?;
        Ok(serde_json::to_value(parsed)?)
    }

    fn topology_changed(&self, old: &Value, new: &Value) -> Result<bool> {
        let old: T::Params = parse_params(old)?;
        let new: T::Params = parse_params(new)?;
        Ok(new.topology_changed(&old))
    }

    fn run(
        &self,
        ctx: &mut BuildContext<'_>,
        selection: &SelectionInfo,
        params: &Value,
    ) -> Result<()> {
        let params: T::Params = parse_params(params)?;
        params.validate()?;
        self.operate(ctx, selection, &params)
    }
}

/// Registry of operators by kind.
pub struct Registry {
    operators: FxHashMap<OperatorKind, Arc<dyn DynOperator>>,
}

impl Registry {
    /// Creates a registry with every built-in operator.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(InsetPolygonProcessor));
        registry.register(Box::new(GridDivideProcessor));
        registry.register(Box::new(SplitFaceProcessor));
        registry.register(Box::new(ExtrudeFancyProcessor));
        registry.register(Box::new(ExtrudeSweepProcessor));
        registry.register(Box::new(SolidifyEdgesProcessor));
        registry.register(Box::new(MakeLouversProcessor));
        registry.register(Box::new(ImportMeshProcessor));
        registry.register(Box::new(BuildRoofProcessor));
        registry.register(Box::new(ProjectFaceProcessor));
        registry
    }

    pub fn empty() -> Self {
        Self {
            operators: FxHashMap::default(),
        }
    }

    /// Registers an operator, replacing any with the same kind.
    pub fn register(&mut self, operator: Box<dyn DynOperator>) {
        let kind = operator.kind();
        self.operators.insert(kind, Arc::from(operator));
    }

    pub fn get(&self, kind: OperatorKind) -> Result<Arc<dyn DynOperator>> {
        self.operators
            .get(&kind)
            .cloned()
            .ok_or_else(|| Error::UnknownOperator(kind.name().to_string()))
    }

    pub fn by_name(&self, name: &str) -> Result<Arc<dyn DynOperator>> {
        let kind =
            OperatorKind::from_name(name).ok_or_else(|| Error::UnknownOperator(name.to_string()))?;
        self.get(kind)
    }

    pub fn kinds(&self) -> Vec<OperatorKind> {
        let mut kinds: Vec<OperatorKind> = self.operators.keys().copied().collect();
        kinds.sort();
        kinds
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_is_registered() {
        let registry = Registry::new();
        assert_eq!(registry.kinds(), OperatorKind::ALL.to_vec());
        for kind in OperatorKind::ALL {
            assert_eq!(OperatorKind::from_name(kind.name()), Some(kind));
            let op = registry.get(kind).unwrap();
            let defaults = op.default_params().unwrap();
            assert_eq!(op.normalize(&Value::Null).unwrap(), defaults);
            assert!(!op.topology_changed(&defaults, &defaults).unwrap());
        }
    }

    #[test]
    fn unknown_names_are_rejected() {
        let registry = Registry::new();
        assert!(matches!(
            registry.by_name("bevel"),
            Err(Error::UnknownOperator(_))
        ));
        assert!(Registry::empty().get(OperatorKind::GridDivide).is_err());
    }

    #[test]
    fn bad_parameters_are_user_errors() {
        let op = Registry::new().get(OperatorKind::GridDivide).unwrap();
        let err = op
            .normalize(&serde_json::json!({"count_x": "many"}))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameters(_)));
        assert!(!err.is_fatal());
    }
}
