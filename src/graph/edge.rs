//! Edge: an executional path between two vertices. See `spec.md` §3 ("Edge").

use crate::firing::policies::ExecutionDelegate;
use crate::ids::{ChannelId, EdgeId, VertexId};
use std::sync::Arc;

/// An edge between a pre-vertex and a post-vertex, optionally owning children and
/// an application-code execution delegate.
///
/// Pre/post vertices are owned exclusively by this edge — no other edge may
/// reference them (`spec.md` §3, "Edge" invariants).
pub struct Edge {
    pub id: EdgeId,
    pub pre_vertex: VertexId,
    pub post_vertex: VertexId,
    pub parent: Option<EdgeId>,
    /// Ordered child edges.
    pub children: Vec<EdgeId>,
    /// Ligatures wiring this edge's children to its own endpoints (co-start /
    /// co-finish), removed atomically with their owning child.
    pub child_ligatures: Vec<EdgeId>,
    pub channel: ChannelId,
    pub delegate: Option<Arc<dyn ExecutionDelegate>>,
    /// Nominal duration consumed by the PERT/CPM analyst (`spec.md` §4.4.2).
    /// Always `0.0` for a ligature.
    pub nominal_duration: f64,
    pub optimistic_duration: Option<f64>,
    pub pessimistic_duration: Option<f64>,
    /// When set, the PERT/CPM analyst overrides elapsed time at this edge's
    /// pre-vertex to this fixed offset (`spec.md` §4.4.2, "Forward pass").
    pub fixed_offset: Option<f64>,
    is_ligature: bool,
}

impl Edge {
    pub fn new(id: EdgeId, pre_vertex: VertexId, post_vertex: VertexId) -> Self {
        Self {
            id,
            pre_vertex,
            post_vertex,
            parent: None,
            children: Vec::new(),
            child_ligatures: Vec::new(),
            channel: ChannelId::default(),
            delegate: None,
            nominal_duration: 0.0,
            optimistic_duration: None,
            pessimistic_duration: None,
            fixed_offset: None,
            is_ligature: false,
        }
    }

    /// A zero-duration ligature wiring structural dependencies. Never cloneable
    /// (`spec.md` §3, "Ligature").
    pub fn new_ligature(id: EdgeId, pre_vertex: VertexId, post_vertex: VertexId) -> Self {
        let mut e = Self::new(id, pre_vertex, post_vertex);
        e.is_ligature = true;
        e
    }

    pub fn is_ligature(&self) -> bool {
        self.is_ligature
    }

    pub fn has_no_predecessors(&self, pre_edge_count: usize) -> bool {
        pre_edge_count == 0
    }
}
