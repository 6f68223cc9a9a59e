//! ex-graph: the model graph.
//!
//! Provides:
//! - an arena of components addressed by [`ComponentId`] or by name
//! - a two-pass build from a [`Definition`](ex_definition::Definition) with
//!   error accumulation
//! - property resolution and mutation through dotted [`PropertyPath`]s
//! - per-component stepping that exposes the rest of the graph as a
//!   [`Network`](ex_components::Network)
//! - state snapshots and definition-shaped saves
//!
//! # Example
//!
//! ```
//! use ex_definition::{Definition, ModelDef};
//! use ex_graph::ModelGraph;
//!
//! let mut def = Definition::default();
//! def.models.insert("A", ModelDef::new("Capacitance").with("vol", 1.0));
//! let (graph, report) = ModelGraph::from_definition(&def);
//! assert!(report.is_ok());
//! assert_eq!(graph.resolve_str("A.vol").unwrap().as_number(), Some(1.0));
//! ```

pub mod builder;
pub mod error;
pub mod graph;
pub mod path;
pub mod snapshot;

pub use builder::{BuildError, BuildReport};
pub use error::{GraphError, GraphResult};
pub use ex_core::ComponentId;
pub use graph::{Entry, ModelGraph, model_types};
pub use path::PropertyPath;
