//! The Validity Service (`spec.md` §4.3): a shadow graph of per-task validity
//! tracking Rule P (self-state change) and Rule S (structural edge change), with
//! re-entrant suspend/resume batching of the observations it emits.

mod node;

pub use node::{ValidityNode, ValidityState};

use crate::graph::{EventSink, GraphModel, StructureEvent, StructureEventKind};
use crate::ids::EdgeId;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Receiver of `ValidityChange(node, state)` observations.
pub trait ValidityObserver: Send + Sync {
    fn on_validity_change(&self, node: &EdgeId, state: ValidityState);
}

/// Maintains the shadow graph and propagates Rule P / Rule S. Registered on a
/// [`GraphModel`] as an [`EventSink`] to pick up Rule S triggers automatically;
/// Rule P is driven explicitly by application code via [`Self::set_self_state`]
/// whenever it recomputes a task's own validity.
pub struct ValidityService {
    nodes: RefCell<HashMap<EdgeId, ValidityNode>>,
    suspend_depth: Cell<u32>,
    snapshot: RefCell<Option<HashMap<EdgeId, ValidityState>>>,
    observers: RefCell<Vec<Arc<dyn ValidityObserver>>>,
}

impl ValidityService {
    pub fn new() -> Self {
        Self {
            nodes: RefCell::new(HashMap::new()),
            suspend_depth: Cell::new(0),
            snapshot: RefCell::new(None),
            observers: RefCell::new(Vec::new()),
        }
    }

    pub fn register_observer(&self, observer: Arc<dyn ValidityObserver>) {
        self.observers.borrow_mut().push(observer);
    }

    pub fn overall(&self, node: &EdgeId) -> Option<ValidityState> {
        self.nodes.borrow().get(node).map(ValidityNode::overall)
    }

    pub fn node(&self, node: &EdgeId) -> Option<ValidityNode> {
        self.nodes.borrow().get(node).cloned()
    }

    /// Rebuild the shadow graph wholesale: depth-first forward walk from the root,
    /// a second pass filling in predecessor/successor lists, then initialization
    /// of invalid counts from each node's current self-state (`spec.md` §4.3).
    pub fn rebuild(&self, graph: &GraphModel) {
        let mut nodes: HashMap<EdgeId, ValidityNode> = HashMap::new();
        if let Some(root) = graph.root() {
            let mut visited = HashSet::new();
            let mut stack = vec![root.clone()];
            while let Some(id) = stack.pop() {
                if !visited.insert(id.clone()) {
                    continue;
                }
                let Ok(edge) = graph.edge(&id) else { continue };
                let preserved_self_state =
                    self.nodes.borrow().get(&id).map(|n| n.self_state).unwrap_or(ValidityState::Valid);
                nodes.insert(
                    id.clone(),
                    ValidityNode {
                        self_state: preserved_self_state,
                        invalid_predecessor_count: 0,
                        invalid_child_count: 0,
                        parent: edge.parent.clone(),
                        predecessors: Vec::new(),
                        successors: Vec::new(),
                        children: edge.children.clone(),
                    },
                );
                for succ in successors_of(graph, &id) {
                    stack.push(succ);
                }
                stack.extend(edge.children.iter().cloned());
            }
        }

        let ids: Vec<EdgeId> = nodes.keys().cloned().collect();
        for id in &ids {
            let preds: Vec<EdgeId> = predecessors_of(graph, id).into_iter().filter(|p| nodes.contains_key(p)).collect();
            let succs: Vec<EdgeId> = successors_of(graph, id).into_iter().filter(|s| nodes.contains_key(s)).collect();
            if let Some(n) = nodes.get_mut(id) {
                n.predecessors = preds;
                n.successors = succs;
            }
        }

        for id in &ids {
            let invalid_preds = nodes[id].predecessors.iter().filter(|p| nodes[*p].self_state == ValidityState::Invalid).count() as u32;
            let invalid_children = nodes[id].children.iter().filter(|c| nodes.get(*c).map(|n| n.self_state == ValidityState::Invalid).unwrap_or(false)).count() as u32;
            if let Some(n) = nodes.get_mut(id) {
                n.invalid_predecessor_count = invalid_preds;
                n.invalid_child_count = invalid_children;
            }
        }

        *self.nodes.borrow_mut() = nodes;
    }

    /// Rule P: the application flips `node`'s own self-state.
    pub fn set_self_state(&self, node_id: &EdgeId, new_state: ValidityState) {
        let others_already_valid = {
            let mut nodes = self.nodes.borrow_mut();
            let Some(n) = nodes.get_mut(node_id) else { return };
            if n.self_state == new_state {
                return;
            }
            n.self_state = new_state;
            n.invalid_predecessor_count == 0 && n.invalid_child_count == 0
        };

        if !others_already_valid {
            // Overall was already invalid (or remains so) regardless of this flip.
            return;
        }

        self.notify(node_id, new_state);
        let delta: i32 = if new_state == ValidityState::Invalid { 1 } else { -1 };
        let (parent, successors) = {
            let nodes = self.nodes.borrow();
            let n = &nodes[node_id];
            (n.parent.clone(), n.successors.clone())
        };
        if let Some(p) = parent {
            self.adjust_invalid_child_count(&p, delta);
        }
        for s in successors {
            self.adjust_invalid_predecessor_count(&s, delta);
        }
    }

    /// Rule S: mark `owner` and everything reachable downstream of it invalid.
    fn invalidate_downstream(&self, owner: &EdgeId) {
        let mut stack = vec![owner.clone()];
        let mut visited = HashSet::new();
        while let Some(id) = stack.pop() {
            if !visited.insert(id.clone()) {
                continue;
            }
            self.set_self_state(&id, ValidityState::Invalid);
            let succs = self.nodes.borrow().get(&id).map(|n| n.successors.clone()).unwrap_or_default();
            stack.extend(succs);
        }
    }

    fn adjust_invalid_child_count(&self, id: &EdgeId, delta: i32) {
        self.adjust_count(id, delta, true);
    }

    fn adjust_invalid_predecessor_count(&self, id: &EdgeId, delta: i32) {
        self.adjust_count(id, delta, false);
    }

    fn adjust_count(&self, id: &EdgeId, delta: i32, is_child_count: bool) {
        let (old, new, parent, successors) = {
            let mut nodes = self.nodes.borrow_mut();
            let Some(n) = nodes.get_mut(id) else { return };
            let old = n.overall();
            let field = if is_child_count { &mut n.invalid_child_count } else { &mut n.invalid_predecessor_count };
            *field = (*field as i32 + delta).max(0) as u32;
            let new = n.overall();
            (old, new, n.parent.clone(), n.successors.clone())
        };
        if old != new {
            self.notify(id, new);
            let next_delta = if new == ValidityState::Invalid { 1 } else { -1 };
            if let Some(p) = parent {
                self.adjust_invalid_child_count(&p, next_delta);
            }
            for s in successors {
                self.adjust_invalid_predecessor_count(&s, next_delta);
            }
        }
    }

    fn notify(&self, node: &EdgeId, state: ValidityState) {
        for o in self.observers.borrow().iter() {
            o.on_validity_change(node, state);
        }
    }

    /// Enter a (re-entrant) suspension. The first call in a nested sequence
    /// snapshots every known node's overall state.
    pub fn suspend(&self) {
        if self.suspend_depth.get() == 0 {
            let snapshot: HashMap<EdgeId, ValidityState> =
                self.nodes.borrow().iter().map(|(id, n)| (id.clone(), n.overall())).collect();
            *self.snapshot.borrow_mut() = Some(snapshot);
        }
        self.suspend_depth.set(self.suspend_depth.get() + 1);
    }

    /// Leave a suspension. Once the outermost `resume` matching the first
    /// `suspend` runs, the shadow graph is rebuilt from the root and
    /// `ValidityChange` is emitted only for nodes whose overall state differs from
    /// the entry snapshot. Mismatched nesting (a `resume` with no matching
    /// `suspend`) is a warning, not an error.
    pub fn resume(&self, graph: &GraphModel) {
        let depth = self.suspend_depth.get();
        if depth == 0 {
            tracing::warn!("Validity Service resume() called without a matching suspend()");
            return;
        }
        self.suspend_depth.set(depth - 1);
        if depth != 1 {
            return;
        }

        self.rebuild(graph);
        let snapshot = self.snapshot.borrow_mut().take().unwrap_or_default();
        let current: Vec<(EdgeId, ValidityState)> = {
            let nodes = self.nodes.borrow();
            nodes.iter().map(|(id, n)| (id.clone(), n.overall())).collect()
        };
        for (id, state) in current {
            if snapshot.get(&id) != Some(&state) {
                self.notify(&id, state);
            }
        }
    }
}

impl Default for ValidityService {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for ValidityService {
    fn on_structure_event(&self, event: &StructureEvent) {
        if self.suspend_depth.get() > 0 {
            return;
        }
        if matches!(event.kind, StructureEventKind::AddPreEdge | StructureEventKind::RemovePreEdge) {
            if let Some(owner) = &event.owner_edge {
                if self.nodes.borrow().contains_key(owner) {
                    self.invalidate_downstream(owner);
                }
            }
        }
    }

    /// `spec.md` §4.1: a cascading mutation spans the whole Validity Service in one
    /// suspension, so the several `StructureEvent`s it raises collapse into a single
    /// batched diff rather than one `ValidityChange` burst per cascaded ligature.
    fn suspend_for_cascade(&self) {
        self.suspend();
    }

    fn resume_for_cascade(&self, graph: &GraphModel) {
        self.resume(graph);
    }
}

fn successors_of(graph: &GraphModel, edge_id: &EdgeId) -> Vec<EdgeId> {
    let Ok(edge) = graph.edge(edge_id) else { return Vec::new() };
    let Ok(post) = graph.vertex(&edge.post_vertex) else { return Vec::new() };
    let mut seen = HashSet::new();
    post.post_edges
        .iter()
        .filter_map(|lig_id| graph.edge(lig_id).ok())
        .filter_map(|lig| graph.vertex(&lig.post_vertex).ok())
        .map(|v| v.principal_edge.clone())
        .filter(|e| e != edge_id && seen.insert(e.clone()))
        .collect()
}

fn predecessors_of(graph: &GraphModel, edge_id: &EdgeId) -> Vec<EdgeId> {
    let Ok(edge) = graph.edge(edge_id) else { return Vec::new() };
    let Ok(pre) = graph.vertex(&edge.pre_vertex) else { return Vec::new() };
    let mut seen = HashSet::new();
    pre.pre_edges
        .iter()
        .filter_map(|lig_id| graph.edge(lig_id).ok())
        .filter_map(|lig| graph.vertex(&lig.pre_vertex).ok())
        .map(|v| v.principal_edge.clone())
        .filter(|e| e != edge_id && seen.insert(e.clone()))
        .collect()
}
