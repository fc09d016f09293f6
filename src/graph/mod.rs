//! The Graph Model: vertices, edges, ligatures, synchronizers, and the structural
//! mutation operations over them (`spec.md` §3, §4.1).
//!
//! [`GraphModel`] owns every node in an arena keyed by stable ID; parent/principal
//! back-references are IDs resolved through the arena, never direct shared
//! ownership (`spec.md` §9).

mod edge;
mod events;
mod ligature;
mod ops;
mod synchronizer;
mod vertex;

pub use edge::Edge;
pub use events::{EventSink, StructureEvent, StructureEventKind};
pub use synchronizer::Synchronizer;
pub use vertex::{Role, Vertex};

use crate::config::EngineConfig;
use crate::error::{GraphStructureKind, Result, SageError};
use crate::firing::events::{FiringEvent, FiringObserver};
use crate::ids::{EdgeId, SynchronizerId, VertexId};
use std::collections::HashMap;
use std::sync::Arc;

/// The shared, static graph structure. Built up by application code before any
/// [`GraphContext`](crate::context::GraphContext) executes against it.
pub struct GraphModel {
    vertices: HashMap<VertexId, Vertex>,
    edges: HashMap<EdgeId, Edge>,
    synchronizers: HashMap<SynchronizerId, Synchronizer>,
    root: Option<EdgeId>,
    sinks: Vec<Arc<dyn EventSink>>,
    firing_observers: Vec<Arc<dyn FiringObserver>>,
    config: EngineConfig,
    next_ligature_seq: std::cell::Cell<u64>,
}

impl GraphModel {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            vertices: HashMap::new(),
            edges: HashMap::new(),
            synchronizers: HashMap::new(),
            root: None,
            sinks: Vec::new(),
            firing_observers: Vec::new(),
            config,
            next_ligature_seq: std::cell::Cell::new(0),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn register_sink(&mut self, sink: Arc<dyn EventSink>) {
        self.sinks.push(sink);
    }

    pub fn register_firing_observer(&mut self, observer: Arc<dyn FiringObserver>) {
        self.firing_observers.push(observer);
    }

    pub fn set_root(&mut self, edge: EdgeId) {
        self.root = Some(edge);
    }

    pub fn root(&self) -> Option<&EdgeId> {
        self.root.as_ref()
    }

    /// Create a new edge with a fresh `Pre` and `Post` vertex pair, each owned
    /// exclusively by this edge as its principal edge.
    pub fn create_edge(&mut self, name: impl Into<String>) -> EdgeId {
        let name = name.into();
        let edge_id = EdgeId::new(name.clone());
        let pre_id = VertexId::new(format!("{name}.pre"));
        let post_id = VertexId::new(format!("{name}.post"));
        self.edges.insert(edge_id.clone(), Edge::new(edge_id.clone(), pre_id.clone(), post_id.clone()));
        self.vertices.insert(pre_id.clone(), Vertex::new(pre_id, Role::Pre, edge_id.clone()));
        self.vertices.insert(post_id.clone(), Vertex::new(post_id, Role::Post, edge_id.clone()));
        edge_id
    }

    fn fresh_ligature_id(&self) -> EdgeId {
        let seq = self.next_ligature_seq.get();
        self.next_ligature_seq.set(seq + 1);
        EdgeId::new(format!("__ligature_{seq}__"))
    }

    pub fn edge(&self, id: &EdgeId) -> Result<&Edge> {
        self.edges.get(id).ok_or_else(|| missing_edge(id))
    }

    pub fn edge_mut(&mut self, id: &EdgeId) -> Result<&mut Edge> {
        self.edges.get_mut(id).ok_or_else(|| missing_edge(id))
    }

    pub fn vertex(&self, id: &VertexId) -> Result<&Vertex> {
        self.vertices.get(id).ok_or_else(|| missing_vertex(id))
    }

    pub fn vertex_mut(&mut self, id: &VertexId) -> Result<&mut Vertex> {
        self.vertices.get_mut(id).ok_or_else(|| missing_vertex(id))
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub(crate) fn edges_mut(&mut self) -> &mut HashMap<EdgeId, Edge> {
        &mut self.edges
    }

    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.values()
    }

    pub fn synchronizer(&self, id: &SynchronizerId) -> Option<&Synchronizer> {
        self.synchronizers.get(id)
    }

    pub(crate) fn synchronizers_mut(&mut self) -> &mut HashMap<SynchronizerId, Synchronizer> {
        &mut self.synchronizers
    }

    pub fn synchronizer_of(&self, vertex: &VertexId) -> Option<&SynchronizerId> {
        self.vertices.get(vertex).and_then(|v| v.synchronizer.as_ref())
    }

    /// Open a cascading-mutation suspension on every registered sink (`spec.md`
    /// §4.1). Callers must pair this with [`Self::end_cascade`] around any
    /// operation that raises more than one [`StructureEvent`].
    pub(crate) fn begin_cascade(&self) {
        for sink in &self.sinks {
            sink.suspend_for_cascade();
        }
    }

    /// Close the cascading-mutation suspension opened by [`Self::begin_cascade`].
    pub(crate) fn end_cascade(&self) {
        for sink in &self.sinks {
            sink.resume_for_cascade(self);
        }
    }

    pub(crate) fn emit(&self, event: StructureEvent) {
        tracing::debug!(kind = ?event.kind, propagated = event.propagated, "structure event");
        for sink in &self.sinks {
            sink.on_structure_event(&event);
        }
    }

    pub(crate) fn notify_firing(&self, event: FiringEvent) {
        tracing::trace!(?event, "firing event");
        for observer in &self.firing_observers {
            observer.on_firing_event(&event);
        }
    }
}

impl Default for GraphModel {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn missing_edge(id: &EdgeId) -> SageError {
    SageError::graph_structure(GraphStructureKind::InvalidOperation, format!("no such edge: {id}"))
}

pub(crate) fn missing_vertex(id: &VertexId) -> SageError {
    SageError::graph_structure(GraphStructureKind::MissingPostVertex, format!("no such vertex: {id}"))
}
