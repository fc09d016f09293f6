//! Per-execution firing events (`spec.md` §6, "Observable events emitted by the
//! core"). Distinct from [`StructureEvent`](crate::graph::StructureEvent), which
//! reports mutations to the static graph rather than things that happen during one
//! execution.

use crate::ids::EdgeId;
use crate::ids::VertexId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FiringEvent {
    BeforeVertexFiring(VertexId),
    AfterVertexFiring(VertexId),
    EdgeStarting(EdgeId),
    EdgeExecutionStarting(EdgeId),
    EdgeExecutionFinishing(EdgeId),
    EdgeFinishing(EdgeId),
}

/// Receiver of [`FiringEvent`]s. Registered on the [`GraphModel`](crate::graph::GraphModel)
/// alongside structural [`EventSink`](crate::graph::EventSink)s, since both are
/// read-only observers of a graph that outlives any one execution.
pub trait FiringObserver: Send + Sync {
    fn on_firing_event(&self, event: &FiringEvent);
}
