//! Sage: a hierarchical directed-graph execution engine, firing engine, validity
//! service, and CPM/PERT timing analysts for discrete-event simulation of
//! industrial processes.
//!
//! This crate implements the core described in `spec.md`: the static
//! [`graph`] structure and its mutation operations, the [`firing`] sequence
//! that walks it, the [`validity`] shadow-graph that tracks which edges are
//! still well-formed, and the [`timing`] analysts that compute critical paths
//! over it. A discrete-event [`executive`] and application-level
//! [`collaborators`] (materials, the modeling host) are consumed as external
//! contracts, not implemented here.

pub mod collaborators;
pub mod config;
pub mod context;
pub mod error;
pub mod executive;
pub mod firing;
pub mod graph;
pub mod ids;
pub mod resource;
pub mod suspension;
pub mod timing;
pub mod validity;

pub use config::EngineConfig;
pub use context::GraphContext;
pub use error::{GraphStructureKind, Result, SageError, TimeCycleOffender};
pub use graph::GraphModel;
