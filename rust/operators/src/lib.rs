// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # archkit operators
//!
//! Parametric mesh operators and the [`Session`] that records them in a
//! journal and replays them.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use archkit_operators::{Config, OperatorKind, Session};
//! use archkit_journal::SelectionMode;
//! use serde_json::json;
//!
//! let mut session = Session::new(mesh, Config::from_env());
//! let op = session.apply(
//!     OperatorKind::GridDivide,
//!     &[wall],
//!     SelectionMode::Single,
//!     json!({"count_x": 3, "count_y": 2}),
//! )?;
//! // Later: change the grid, dependent operations follow.
//! session.adjust(op, json!({"count_x": 4, "count_y": 2}))?;
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod processors;
pub mod registry;
pub mod session;
pub mod style;

pub use config::Config;
pub use context::BuildContext;
pub use error::{Error, Result};
pub use processors::*;
pub use registry::{parse_params, DynOperator, MeshOperator, OperatorKind, OperatorParams, Registry};
pub use session::Session;
pub use style::{slot_attrs, FaceStyle, SlotStyles};
