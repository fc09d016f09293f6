//! Observable structural-mutation events (`spec.md` §4.1).
//!
//! Every structural mutation emits exactly one [`StructureEvent`]. Consumers —
//! chiefly the [`ValidityService`](crate::validity::ValidityService) — subscribe by
//! registering an [`EventSink`].

use super::GraphModel;
use crate::ids::{EdgeId, SynchronizerId, VertexId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StructureEventKind {
    AddPreEdge,
    RemovePreEdge,
    AddPostEdge,
    RemovePostEdge,
    AddCostart,
    RemoveCostart,
    AddCofinish,
    RemoveCofinish,
    AddChildEdge,
    RemoveChildEdge,
    NewSynchronizer,
}

/// `StructureChange(kind, propagated?)` from `spec.md` §6.
#[derive(Clone, Debug)]
pub struct StructureEvent {
    pub kind: StructureEventKind,
    /// The vertex the event is anchored on, when the kind names one directly
    /// (pre/post-edge add-remove and co-start/co-finish events). `None` for
    /// synchronizer-formation events, which name no single vertex.
    pub vertex: Option<VertexId>,
    pub edge: Option<EdgeId>,
    pub synchronizer: Option<SynchronizerId>,
    /// The principal edge that owns `vertex`, when the kind names a vertex. Carried
    /// directly on the event so the Validity Service — which does not hold a
    /// reference to the graph — can resolve Rule S's "downstream of that vertex"
    /// without a lookup.
    pub owner_edge: Option<EdgeId>,
    /// `true` when this event was raised as a side effect of a larger mutation
    /// (e.g. a co-start removed while cascading a child-edge removal) rather than
    /// directly requested by the caller.
    pub propagated: bool,
}

impl StructureEvent {
    pub fn new(kind: StructureEventKind) -> Self {
        Self { kind, vertex: None, edge: None, synchronizer: None, owner_edge: None, propagated: false }
    }

    pub fn with_vertex(mut self, vertex: VertexId) -> Self {
        self.vertex = Some(vertex);
        self
    }

    pub fn with_owner_edge(mut self, owner_edge: EdgeId) -> Self {
        self.owner_edge = Some(owner_edge);
        self
    }

    pub fn with_edge(mut self, edge: EdgeId) -> Self {
        self.edge = Some(edge);
        self
    }

    pub fn with_synchronizer(mut self, synchronizer: SynchronizerId) -> Self {
        self.synchronizer = Some(synchronizer);
        self
    }

    pub fn propagated(mut self) -> Self {
        self.propagated = true;
        self
    }
}

/// Receiver of [`StructureEvent`]s raised by a [`GraphModel`](crate::graph::GraphModel).
///
/// The [`ValidityService`](crate::validity::ValidityService) is the chief consumer,
/// but any observer can be registered — grounded on the teacher's plain-callback
/// observer pattern rather than a full pub/sub bus, since the spec names exactly
/// one structural consumer.
pub trait EventSink: Send + Sync {
    fn on_structure_event(&self, event: &StructureEvent);

    /// Enter a suspension spanning a cascading mutation (`spec.md` §4.1): a single
    /// caller-requested operation that will raise more than one [`StructureEvent`]
    /// as a result, e.g. removing a child edge also removing its child-ligatures.
    /// Default no-op for sinks that don't batch.
    fn suspend_for_cascade(&self) {}

    /// Leave a cascading-mutation suspension, given the graph to re-derive state
    /// from. Default no-op for sinks that don't batch.
    fn resume_for_cascade(&self, _graph: &GraphModel) {}
}
