//! The firing sequence itself (`spec.md` §4.2).
//!
//! `fire_vertex` is `_FireVertex`; `start_edge`/`resume_edge` drive an edge's
//! application-code callback; `pre_edge_satisfied` is the step-7 signal a
//! completed edge sends its post-vertex. None of these functions spawn threads —
//! they run to the first suspension point and return, per `spec.md` §5.

use crate::context::GraphContext;
use crate::error::{GraphStructureKind, Result, SageError};
use crate::executive::Executive;
use crate::firing::events::FiringEvent;
use crate::firing::policies::DelegateOutcome;
use crate::ids::{EdgeId, VertexId};

/// `Start(graphContext)`: begin execution by offering the root edge's pre-vertex
/// to its fire-trigger (`spec.md` §4.2, step 1).
pub fn start(ctx: &mut GraphContext, exec: &dyn Executive) -> Result<()> {
    let root = ctx
        .graph()
        .root()
        .cloned()
        .ok_or_else(|| SageError::config("graph has no root edge set"))?;
    let root_pre = ctx.graph().edge(&root)?.pre_vertex.clone();
    trigger_fire(ctx, &root_pre, exec)
}

/// Offer `vertex_id`'s fire-trigger the chance to intercept firing (`spec.md`
/// §4.2, step 1). Every path that would otherwise fire a vertex directly must
/// go through here instead, so a vertex synchronizer gets the chance to hold a
/// member back until its peers are all ready.
pub fn trigger_fire(ctx: &mut GraphContext, vertex_id: &VertexId, exec: &dyn Executive) -> Result<()> {
    let trigger = ctx.graph().vertex(vertex_id)?.fire_trigger.clone();
    trigger.fire(ctx, vertex_id, exec)
}

/// Step 1's synchronizer branch: register `vertex` as ready and, once every member
/// of its synchronizer has reported ready, schedule each member's `_FireVertex`
/// independently through the executive at the same (time, priority) — required
/// because a firing member may suspend awaiting another member's completion
/// (`spec.md` §4.2, "Vertex synchronizer").
pub fn notify_synchronizer_ready(ctx: &mut GraphContext, vertex: &VertexId, exec: &dyn Executive) -> Result<()> {
    let sync_id = ctx
        .graph()
        .synchronizer_of(vertex)
        .cloned()
        .expect("notify_synchronizer_ready called on a vertex without a synchronizer");
    let members: Vec<VertexId> = ctx
        .graph()
        .synchronizer(&sync_id)
        .map(|s| s.members.iter().cloned().collect())
        .unwrap_or_default();

    let ready = ctx.firing.synchronizer_ready.entry(sync_id.clone()).or_default();
    ready.insert(vertex.clone());
    let all_ready = members.iter().all(|m| ready.contains(m));

    if all_ready {
        let now = exec.now();
        let priority = exec.current_priority_level();
        for member in &members {
            exec.request_event(member.clone(), now, priority, crate::executive::EventKind::Synchronous);
        }
    }
    Ok(())
}

/// `_FireVertex` (`spec.md` §4.2, steps 2-4).
pub fn fire_vertex(ctx: &mut GraphContext, vertex_id: &VertexId, exec: &dyn Executive) -> Result<()> {
    ctx.graph().notify_firing(FiringEvent::BeforeVertexFiring(vertex_id.clone()));

    let (principal, is_pre, firing_manager, post_edges) = {
        let vertex = ctx.graph().vertex(vertex_id)?;
        (vertex.principal_edge.clone(), vertex.is_pre(), vertex.firing_manager.clone(), vertex.post_edges.clone())
    };

    if let Some(fm) = &firing_manager {
        fm.start(ctx, vertex_id)?;
    }

    if is_pre {
        start_edge(ctx, &principal, exec)?;
    }

    for edge_id in &post_edges {
        match &firing_manager {
            Some(fm) => fm.fire_if_appropriate(ctx, vertex_id, edge_id, exec)?,
            None => start_edge(ctx, edge_id, exec)?,
        }
    }

    ctx.graph().notify_firing(FiringEvent::AfterVertexFiring(vertex_id.clone()));
    Ok(())
}

/// Begin an edge's execution-delegate callback (step 5). A ligature, or any edge
/// with no delegate set, completes immediately.
pub fn start_edge(ctx: &mut GraphContext, edge_id: &EdgeId, exec: &dyn Executive) -> Result<()> {
    ctx.graph().notify_firing(FiringEvent::EdgeStarting(edge_id.clone()));
    ctx.graph().notify_firing(FiringEvent::EdgeExecutionStarting(edge_id.clone()));

    let delegate = ctx.graph().edge(edge_id)?.delegate.clone();
    let outcome = match delegate {
        Some(d) => d.start(ctx, edge_id, exec)?,
        None => DelegateOutcome::Completed,
    };

    match outcome {
        DelegateOutcome::Completed => finish_edge(ctx, edge_id, exec),
        DelegateOutcome::Suspended => Ok(()),
    }
}

/// Resume a previously suspended edge (the executive calls this once the edge's
/// wake condition — a `Join` target's completion, or the next scheduled instant
/// after a `Yield` — is met).
pub fn resume_edge(ctx: &mut GraphContext, edge_id: &EdgeId, exec: &dyn Executive) -> Result<()> {
    let delegate = ctx.graph().edge(edge_id)?.delegate.clone();
    let outcome = match delegate {
        Some(d) => d.resume(ctx, edge_id, exec)?,
        None => DelegateOutcome::Completed,
    };
    match outcome {
        DelegateOutcome::Completed => finish_edge(ctx, edge_id, exec),
        DelegateOutcome::Suspended => Ok(()),
    }
}

fn finish_edge(ctx: &mut GraphContext, edge_id: &EdgeId, exec: &dyn Executive) -> Result<()> {
    ctx.graph().notify_firing(FiringEvent::EdgeExecutionFinishing(edge_id.clone()));
    ctx.graph().notify_firing(FiringEvent::EdgeFinishing(edge_id.clone()));
    let post_vertex = ctx.graph().edge(edge_id)?.post_vertex.clone();
    pre_edge_satisfied(ctx, &post_vertex, edge_id, exec)
}

/// Step 6/7: an edge signals its post-vertex that it has been satisfied. Dispatches
/// to the vertex's edge-receipt manager if one is set, else the default rule.
pub fn pre_edge_satisfied(ctx: &mut GraphContext, vertex_id: &VertexId, edge_id: &EdgeId, exec: &dyn Executive) -> Result<()> {
    let receipt_manager = ctx.graph().vertex(vertex_id)?.receipt_manager.clone();
    match receipt_manager {
        Some(rm) => rm.pre_edge_satisfied(ctx, vertex_id, edge_id, exec),
        None => default_pre_edge_satisfied(ctx, vertex_id, edge_id, exec),
    }
}

/// Default edge-receipt rule: fire once every pre-edge of `vertex_id` has signaled
/// satisfaction exactly once. A second signal from the same edge before that
/// happens is fatal.
///
/// Once the vertex fires, its satisfaction bookkeeping for this activation is
/// cleared so a vertex reachable through a loop-back edge (`spec.md` §8, the
/// `CountedBranchManager` scenario) can gather a fresh round of signals next time
/// around rather than being rejected as re-signaling.
fn default_pre_edge_satisfied(ctx: &mut GraphContext, vertex_id: &VertexId, edge_id: &EdgeId, exec: &dyn Executive) -> Result<()> {
    if !ctx.firing.satisfied_edges.insert(edge_id.clone()) {
        return Err(SageError::graph_structure(
            GraphStructureKind::DuplicatePreEdgeSignal,
            format!("{edge_id} signaled PreEdgeSatisfied twice in one activation"),
        ));
    }
    ctx.firing.satisfied_per_vertex.entry(vertex_id.clone()).or_default().insert(edge_id.clone());

    let pre_edges = ctx.graph().vertex(vertex_id)?.pre_edges.clone();
    let satisfied = &ctx.firing.satisfied_per_vertex[vertex_id];
    let all_satisfied = pre_edges.iter().all(|e| satisfied.contains(e));

    if all_satisfied {
        if let Some(cleared) = ctx.firing.satisfied_per_vertex.remove(vertex_id) {
            for e in &cleared {
                ctx.firing.satisfied_edges.remove(e);
            }
        }
        trigger_fire(ctx, vertex_id, exec)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executive::EventKind;
    use crate::firing::policies::ExecutionDelegate;
    use crate::graph::GraphModel;
    use std::cell::RefCell;
    use std::sync::Arc;

    struct RecordingExecutive {
        requested: RefCell<Vec<(VertexId, f64, f64)>>,
    }
    impl Executive for RecordingExecutive {
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
        fn request_event(&self, receiver: VertexId, time: f64, priority: f64, _kind: EventKind) {
            self.requested.borrow_mut().push((receiver, time, priority));
        }
    }

    fn linear_graph() -> (GraphModel, EdgeId, EdgeId) {
        let mut g = GraphModel::new();
        let a = g.create_edge("a");
        let b = g.create_edge("b");
        g.connect(&a, &b).unwrap();
        g.set_root(a.clone());
        (g, a, b)
    }

    #[test]
    fn start_fires_through_to_finish_with_no_delegates() {
        let (g, a, b) = linear_graph();
        let graph = Arc::new(g);
        let mut ctx = GraphContext::new(graph.clone());
        let exec = RecordingExecutive { requested: RefCell::new(Vec::new()) };
        start(&mut ctx, &exec).unwrap();

        assert!(ctx.firing.satisfied_edges.contains(&a));
        assert!(ctx.firing.satisfied_edges.contains(&b));
        assert_eq!(ctx.firing.satisfied_edges.len(), 3, "a, the connecting ligature, and b all signal once");
    }

    #[test]
    fn duplicate_pre_edge_signal_is_fatal() {
        let (g, _a, b) = linear_graph();
        let graph = Arc::new(g);
        let mut ctx = GraphContext::new(graph.clone());
        let exec = RecordingExecutive { requested: RefCell::new(Vec::new()) };
        let b_pre = graph.edge(&b).unwrap().pre_vertex.clone();
        let incoming = graph.vertex(&b_pre).unwrap().pre_edges[0].clone();

        pre_edge_satisfied(&mut ctx, &b_pre, &incoming, &exec).unwrap();
        let err = pre_edge_satisfied(&mut ctx, &b_pre, &incoming, &exec).unwrap_err();
        assert!(matches!(err, SageError::GraphStructure { kind: GraphStructureKind::DuplicatePreEdgeSignal, .. }));
    }

    struct Suspending;
    impl ExecutionDelegate for Suspending {
        fn start(&self, _ctx: &mut GraphContext, _edge: &EdgeId, _exec: &dyn Executive) -> Result<DelegateOutcome> {
            Ok(DelegateOutcome::Suspended)
        }
        fn resume(&self, _ctx: &mut GraphContext, _edge: &EdgeId, _exec: &dyn Executive) -> Result<DelegateOutcome> {
            Ok(DelegateOutcome::Completed)
        }
    }

    #[test]
    fn suspended_edge_does_not_signal_until_resumed() {
        let mut g = GraphModel::new();
        let a = g.create_edge("a");
        let b = g.create_edge("b");
        g.connect(&a, &b).unwrap();
        g.edge_mut(&a).unwrap().delegate = Some(Arc::new(Suspending));
        let graph = Arc::new(g);
        let mut ctx = GraphContext::new(graph.clone());
        let exec = RecordingExecutive { requested: RefCell::new(Vec::new()) };

        start_edge(&mut ctx, &a, &exec).unwrap();
        assert!(ctx.firing.satisfied_edges.is_empty());

        resume_edge(&mut ctx, &a, &exec).unwrap();
        assert!(ctx.firing.satisfied_edges.contains(&a));
    }
}
