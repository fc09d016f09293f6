//! Per-execution graph context (`spec.md` §3, "Graph Context").
//!
//! Execution-time state — satisfaction counters, channel bookkeeping, branching
//! state — lives exclusively in a [`GraphContext`]; the static [`GraphModel`] is
//! never mutated while a context is active. Every key created under a context is
//! volatile and never leaked into any other context.

use crate::graph::GraphModel;
use crate::ids::{ChannelId, EdgeId, SynchronizerId, VertexId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

/// Identity of one execution. Fresh per [`GraphContext`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContextId(pub Uuid);

impl ContextId {
    fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Bookkeeping the firing engine itself needs per execution — kept distinct from
/// the application-opaque [`GraphContext::values`] map so engine invariants (like
/// "an edge may only signal satisfaction once") can't be clobbered by application
/// code reusing the same keys.
#[derive(Default)]
pub(crate) struct FiringState {
    /// Edges that have already signaled `PreEdgeSatisfied` on their post-vertex
    /// this execution — the engine error's on a second signal (`spec.md` §4.2,
    /// step 7; §8 "universal invariant").
    pub(crate) satisfied_edges: HashSet<EdgeId>,
    /// Per-vertex set of pre-edges that have satisfied so far (for the default
    /// edge-receipt rule: fire once every pre-edge has signaled).
    pub(crate) satisfied_per_vertex: HashMap<VertexId, HashSet<EdgeId>>,
    /// `CountedBranchManager` per-vertex active channel index and remaining count.
    pub(crate) branch_cursor: HashMap<VertexId, (usize, u32)>,
    /// Per-synchronizer set of members that have reported ready this round.
    pub(crate) synchronizer_ready: HashMap<SynchronizerId, HashSet<VertexId>>,
    /// `MultiChannelEdgeReceiptManager` per-(vertex, channel) satisfied edges.
    pub(crate) satisfied_per_channel: HashMap<(VertexId, ChannelId), HashSet<EdgeId>>,
}

/// Per-execution associative state plus a shared, read-only view of the static
/// graph it is executing against.
pub struct GraphContext {
    id: ContextId,
    graph: Arc<GraphModel>,
    values: HashMap<String, serde_json::Value>,
    pub(crate) firing: FiringState,
}

impl GraphContext {
    pub fn new(graph: Arc<GraphModel>) -> Self {
        Self { id: ContextId::fresh(), graph, values: HashMap::new(), firing: FiringState::default() }
    }

    pub fn id(&self) -> &ContextId {
        &self.id
    }

    pub fn graph(&self) -> &GraphModel {
        &self.graph
    }

    /// Opaque application-level value store. Keys are scoped to this context only.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.values.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.values.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphModel;

    #[test]
    fn fresh_contexts_do_not_share_opaque_state() {
        let graph = Arc::new(GraphModel::new());
        let mut a = GraphContext::new(graph.clone());
        let b = GraphContext::new(graph);
        a.set("count", serde_json::json!(1));
        assert_eq!(a.get("count"), Some(&serde_json::json!(1)));
        assert_eq!(b.get("count"), None);
        assert_ne!(a.id(), b.id());
    }
}
