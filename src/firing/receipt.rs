//! `MultiChannelEdgeReceiptManager` (`spec.md` §4.2).

use crate::context::GraphContext;
use crate::error::{GraphStructureKind, Result, SageError};
use crate::executive::Executive;
use crate::firing::engine::trigger_fire;
use crate::firing::policies::EdgeReceiptManager;
use crate::ids::{EdgeId, VertexId};

/// Accepts a pre-edge as satisfied only once every predecessor edge sharing its
/// channel marker has fired exactly once; the vertex then fires. Rejects duplicate
/// signals with a fatal graph error, same as the default rule.
pub struct MultiChannelEdgeReceiptManager;

impl EdgeReceiptManager for MultiChannelEdgeReceiptManager {
    fn pre_edge_satisfied(&self, ctx: &mut GraphContext, vertex: &VertexId, edge: &EdgeId, exec: &dyn Executive) -> Result<()> {
        if !ctx.firing.satisfied_edges.insert(edge.clone()) {
            return Err(SageError::graph_structure(
                GraphStructureKind::DuplicatePreEdgeSignal,
                format!("{edge} signaled PreEdgeSatisfied twice in one activation"),
            ));
        }

        let channel = ctx.graph().edge(edge)?.channel.clone();
        let channel_members: Vec<EdgeId> = ctx
            .graph()
            .vertex(vertex)?
            .pre_edges
            .iter()
            .filter(|e| ctx.graph().edge(e).map(|ed| ed.channel == channel).unwrap_or(false))
            .cloned()
            .collect();

        let key = (vertex.clone(), channel);
        let satisfied = ctx.firing.satisfied_per_channel.entry(key.clone()).or_default();
        satisfied.insert(edge.clone());
        let all_satisfied = channel_members.iter().all(|e| satisfied.contains(e));

        if all_satisfied {
            if let Some(cleared) = ctx.firing.satisfied_per_channel.remove(&key) {
                for e in &cleared {
                    ctx.firing.satisfied_edges.remove(e);
                }
            }
            trigger_fire(ctx, vertex, exec)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executive::EventKind;
    use crate::graph::GraphModel;
    use crate::ids::ChannelId;
    use std::sync::Arc;

    struct NoopExecutive;
    impl Executive for NoopExecutive {
        fn now(&self) -> f64 {
            0.0
        }
        fn current_priority_level(&self) -> f64 {
            0.0
        }
        fn current_event_type(&self) -> EventKind {
            EventKind::Synchronous
        }
        fn current_event_controller(&self) -> Option<&dyn crate::executive::EventController> {
            None
        }
        fn request_event(&self, _receiver: VertexId, _time: f64, _priority: f64, _kind: EventKind) {}
    }

    #[test]
    fn fires_only_when_whole_channel_group_has_signaled() {
        let mut g = GraphModel::new();
        let a = g.create_edge("a");
        let b = g.create_edge("b");
        let target = g.create_edge("target");
        g.connect(&a, &target).unwrap();
        g.connect(&b, &target).unwrap();

        let target_pre = g.edge(&target).unwrap().pre_vertex.clone();
        g.vertex_mut(&target_pre).unwrap().receipt_manager = Some(Arc::new(MultiChannelEdgeReceiptManager));
        let incoming: Vec<EdgeId> = g.vertex(&target_pre).unwrap().pre_edges.clone();
        for e in &incoming {
            g.edge_mut(e).unwrap().channel = ChannelId::new("grp");
        }

        let graph = Arc::new(g);
        let mut ctx = GraphContext::new(graph.clone());
        let exec = NoopExecutive;

        MultiChannelEdgeReceiptManager.pre_edge_satisfied(&mut ctx, &target_pre, &incoming[0], &exec).unwrap();
        assert!(ctx.firing.satisfied_edges.contains(&incoming[0]));

        MultiChannelEdgeReceiptManager.pre_edge_satisfied(&mut ctx, &target_pre, &incoming[1], &exec).unwrap();
        // Firing clears the group's bookkeeping.
        assert!(!ctx.firing.satisfied_edges.contains(&incoming[0]));
        assert!(!ctx.firing.satisfied_edges.contains(&incoming[1]));
    }

    #[test]
    fn duplicate_signal_is_fatal() {
        let mut g = GraphModel::new();
        let a = g.create_edge("a");
        let target = g.create_edge("target");
        g.connect(&a, &target).unwrap();
        let target_pre = g.edge(&target).unwrap().pre_vertex.clone();
        let incoming = g.vertex(&target_pre).unwrap().pre_edges[0].clone();

        let graph = Arc::new(g);
        let mut ctx = GraphContext::new(graph.clone());
        let exec = NoopExecutive;

        MultiChannelEdgeReceiptManager.pre_edge_satisfied(&mut ctx, &target_pre, &incoming, &exec).unwrap();
        let err = MultiChannelEdgeReceiptManager.pre_edge_satisfied(&mut ctx, &target_pre, &incoming, &exec).unwrap_err();
        assert!(matches!(err, SageError::GraphStructure { kind: GraphStructureKind::DuplicatePreEdgeSignal, .. }));
    }
}
