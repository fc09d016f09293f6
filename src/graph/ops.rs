//! Structural mutation operations over a [`GraphModel`] (`spec.md` §4.1).
//!
//! Every public function here emits the `StructureEvent`s the Validity Service
//! listens for, and validates the invariants `spec.md` §4.1 names as fatal: cloning
//! a ligature, and adding a second children-block to an already-parented edge.

use super::events::{EventSink, StructureEvent, StructureEventKind};
use super::ligature::new_ligature_between;
use super::{GraphModel, Synchronizer};
use crate::error::{GraphStructureKind, Result, SageError};
use crate::ids::{EdgeId, SynchronizerId, VertexId};

impl GraphModel {
    /// `A.AddSuccessor(B)`: wire a ligature from `a.post` to `b.pre`, unless one
    /// already links them. Emits `AddPostEdge` on `a.post` and `AddPreEdge` on
    /// `b.pre` — one event per affected vertex's edge list.
    pub fn connect(&mut self, a: &EdgeId, b: &EdgeId) -> Result<EdgeId> {
        let a_post = self.edge(a)?.post_vertex.clone();
        let b_pre = self.edge(b)?.pre_vertex.clone();

        if let Some(existing) = self.find_ligature(&a_post, &b_pre) {
            return Ok(existing);
        }

        self.begin_cascade();

        let ligature_id = self.fresh_ligature_id();
        let ligature = new_ligature_between(ligature_id.clone(), a_post.clone(), b_pre.clone());
        self.insert_edge(ligature);

        self.vertex_mut(&a_post)?.add_post_edge(ligature_id.clone());
        self.vertex_mut(&b_pre)?.add_pre_edge(ligature_id.clone());

        let a_owner = self.vertex(&a_post)?.principal_edge.clone();
        let b_owner = self.vertex(&b_pre)?.principal_edge.clone();
        self.emit(StructureEvent::new(StructureEventKind::AddPostEdge).with_vertex(a_post).with_owner_edge(a_owner).with_edge(ligature_id.clone()));
        self.emit(StructureEvent::new(StructureEventKind::AddPreEdge).with_vertex(b_pre).with_owner_edge(b_owner).with_edge(ligature_id.clone()));

        // `b` just gained a real predecessor; withdraw its co-start, if any
        // (`spec.md` §4.2, "Hierarchical child-edge propagation").
        self.withdraw_costart_on_new_predecessor(b)?;

        self.end_cascade();
        Ok(ligature_id)
    }

    /// Remove every predecessor and successor ligature of `edge` and detach it from
    /// its parent, per `spec.md` §4.1 ("Disconnect").
    pub fn disconnect(&mut self, edge: &EdgeId) -> Result<()> {
        self.begin_cascade();

        let (pre, post) = {
            let e = self.edge(edge)?;
            (e.pre_vertex.clone(), e.post_vertex.clone())
        };

        let incoming: Vec<EdgeId> = self.vertex(&pre)?.pre_edges.clone();
        for lig in incoming {
            if self.edge(&lig)?.is_ligature() {
                self.disconnect_edge(&lig)?;
            }
        }

        let outgoing: Vec<EdgeId> = self.vertex(&post)?.post_edges.clone();
        for lig in outgoing {
            if self.edge(&lig)?.is_ligature() {
                self.disconnect_edge(&lig)?;
            }
        }

        if let Some(parent) = self.edge(edge)?.parent.clone() {
            self.remove_child(&parent, edge)?;
        }

        self.end_cascade();
        Ok(())
    }

    /// Remove the ligature directly linking `a.post` to `b.pre`, if one exists.
    /// The dual of [`Self::connect`]; used when the caller wants to sever exactly
    /// one link rather than every link touching either edge. Unlike the bulk
    /// ligature cleanup inside [`Self::remove_child`]/[`Self::disconnect`], `b`
    /// stays parented here, so losing its last predecessor restores its co-start
    /// (`spec.md` §4.2).
    pub fn disconnect_between(&mut self, a: &EdgeId, b: &EdgeId) -> Result<()> {
        let a_post = self.edge(a)?.post_vertex.clone();
        let b_pre = self.edge(b)?.pre_vertex.clone();
        if let Some(lig) = self.find_ligature(&a_post, &b_pre) {
            self.begin_cascade();
            self.disconnect_edge(&lig)?;
            self.restore_costart_on_predecessors_exhausted(b)?;
            self.end_cascade();
        }
        Ok(())
    }

    /// Remove a single ligature edge, detaching it from both endpoints' edge lists
    /// and the arena. Fatal (`InvalidOperation`) if `edge` is not a ligature.
    pub fn disconnect_edge(&mut self, edge: &EdgeId) -> Result<()> {
        let e = self.edge(edge)?;
        if !e.is_ligature() {
            return Err(SageError::graph_structure(
                GraphStructureKind::InvalidOperation,
                format!("{edge} is not a ligature"),
            ));
        }
        let (pre, post) = (e.pre_vertex.clone(), e.post_vertex.clone());

        let pre_owner = self.vertex(&pre)?.principal_edge.clone();
        let post_owner = self.vertex(&post)?.principal_edge.clone();

        self.vertex_mut(&pre)?.remove_post_edge(edge);
        self.vertex_mut(&post)?.remove_pre_edge(edge);
        self.edges_mut().remove(edge);

        self.emit(StructureEvent::new(StructureEventKind::RemovePostEdge).with_vertex(pre).with_owner_edge(pre_owner).with_edge(edge.clone()));
        self.emit(StructureEvent::new(StructureEventKind::RemovePreEdge).with_vertex(post).with_owner_edge(post_owner).with_edge(edge.clone()));

        Ok(())
    }

    /// `AddChildEdge(parent, child)`: attach `child` under `parent`, wiring a
    /// co-start when `child` has no predecessors and a co-finish when it has no
    /// successors. Fails with `UnsupportedGraphShape` if `child` already has a
    /// parent.
    pub fn add_child(&mut self, parent: &EdgeId, child: &EdgeId) -> Result<()> {
        if self.edge(child)?.parent.is_some() {
            return Err(SageError::graph_structure(
                GraphStructureKind::UnsupportedGraphShape,
                format!("{child} is already parented"),
            ));
        }

        self.begin_cascade();

        self.edge_mut(parent)?.children.push(child.clone());
        self.edge_mut(child)?.parent = Some(parent.clone());
        self.emit(StructureEvent::new(StructureEventKind::AddChildEdge).with_edge(child.clone()));

        let child_has_no_predecessors = self.vertex(&self.edge(child)?.pre_vertex)?.pre_edges.is_empty();
        if child_has_no_predecessors {
            self.add_costart(parent, child)?;
        }

        let child_has_no_successors = self.vertex(&self.edge(child)?.post_vertex)?.post_edges.is_empty();
        if child_has_no_successors {
            self.add_cofinish(parent, child)?;
        }

        self.end_cascade();
        Ok(())
    }

    /// Detach `child` from `parent`, cascading removal of any co-start/co-finish
    /// ligatures the child still owns (`spec.md` §4.1: a cascading mutation takes a
    /// single Validity Service suspension spanning the whole operation).
    pub fn remove_child(&mut self, parent: &EdgeId, child: &EdgeId) -> Result<()> {
        self.begin_cascade();

        let ligatures: Vec<EdgeId> = self.edge(child)?.child_ligatures.clone();
        for lig in ligatures {
            self.disconnect_edge(&lig)?;
        }
        self.edge_mut(child)?.child_ligatures.clear();
        self.edge_mut(child)?.parent = None;
        self.edge_mut(parent)?.children.retain(|c| c != child);

        self.emit(StructureEvent::new(StructureEventKind::RemoveChildEdge).with_edge(child.clone()));

        self.end_cascade();
        Ok(())
    }

    /// `spec.md` §4.1, "Co-start": links `parent.pre` to `child.pre`.
    fn add_costart(&mut self, parent: &EdgeId, child: &EdgeId) -> Result<()> {
        let parent_pre = self.edge(parent)?.pre_vertex.clone();
        let child_pre = self.edge(child)?.pre_vertex.clone();
        let lig_id = self.fresh_ligature_id();
        let lig = new_ligature_between(lig_id.clone(), parent_pre.clone(), child_pre.clone());
        self.insert_edge(lig);
        self.vertex_mut(&parent_pre)?.add_post_edge(lig_id.clone());
        self.vertex_mut(&child_pre)?.add_pre_edge(lig_id.clone());
        self.edge_mut(child)?.child_ligatures.push(lig_id.clone());
        self.emit(StructureEvent::new(StructureEventKind::AddCostart).with_vertex(child_pre).with_edge(lig_id));
        Ok(())
    }

    /// `spec.md` §4.1, "Co-finish": links `child.post` to `parent.post`.
    fn add_cofinish(&mut self, parent: &EdgeId, child: &EdgeId) -> Result<()> {
        let parent_post = self.edge(parent)?.post_vertex.clone();
        let child_post = self.edge(child)?.post_vertex.clone();
        let lig_id = self.fresh_ligature_id();
        let lig = new_ligature_between(lig_id.clone(), child_post.clone(), parent_post.clone());
        self.insert_edge(lig);
        self.vertex_mut(&child_post)?.add_post_edge(lig_id.clone());
        self.vertex_mut(&parent_post)?.add_pre_edge(lig_id.clone());
        self.edge_mut(child)?.child_ligatures.push(lig_id.clone());
        self.emit(StructureEvent::new(StructureEventKind::AddCofinish).with_vertex(child_post).with_edge(lig_id));
        Ok(())
    }

    /// When `child` gains a real external predecessor, its co-start to the parent
    /// must be withdrawn (`spec.md` §4.2, "Hierarchical child-edge propagation").
    pub fn withdraw_costart_on_new_predecessor(&mut self, child: &EdgeId) -> Result<()> {
        let Some(parent) = self.edge(child)?.parent.clone() else { return Ok(()) };
        let parent_pre = self.edge(&parent)?.pre_vertex.clone();
        let child_pre = self.edge(child)?.pre_vertex.clone();
        if let Some(lig) = self.find_ligature(&parent_pre, &child_pre) {
            self.disconnect_edge(&lig)?;
            self.edge_mut(child)?.child_ligatures.retain(|l| l != &lig);
            self.emit(StructureEvent::new(StructureEventKind::RemoveCostart).with_vertex(child_pre).propagated());
        }
        Ok(())
    }

    /// When `child` loses every predecessor again, restore its co-start.
    pub fn restore_costart_on_predecessors_exhausted(&mut self, child: &EdgeId) -> Result<()> {
        let Some(parent) = self.edge(child)?.parent.clone() else { return Ok(()) };
        if self.vertex(&self.edge(child)?.pre_vertex)?.pre_edges.is_empty() {
            self.add_costart(&parent, child)?;
        }
        Ok(())
    }

    /// `AddChainOfChildren(seq)`: link successive elements end to end, then attach
    /// every element as a child of `parent` in sequence order.
    pub fn add_chain_of_children(&mut self, parent: &EdgeId, seq: &[EdgeId]) -> Result<()> {
        for pair in seq.windows(2) {
            self.connect(&pair[0], &pair[1])?;
        }
        for child in seq {
            self.add_child(parent, child)?;
        }
        Ok(())
    }

    /// `InsertEdgeBetween(A, this, B)`: chain `A -> this -> B` via ligatures,
    /// replacing any direct ligature that already linked `A` to `B`.
    pub fn insert_between(&mut self, a: &EdgeId, this: &EdgeId, b: &EdgeId) -> Result<()> {
        self.disconnect_between(a, b)?;
        self.connect(a, this)?;
        self.connect(this, b)?;
        Ok(())
    }

    /// `Synchronize(v1, v2, ...)`: union the existing synchronizers of every named
    /// vertex (each vertex with none contributes just itself) and destroy the old
    /// synchronizers atomically, replacing them with one fresh one.
    pub fn synchronize(&mut self, vertices: &[VertexId]) -> Result<SynchronizerId> {
        for v in vertices {
            if !self.vertex(v)?.is_pre() {
                return Err(SageError::graph_structure(
                    GraphStructureKind::SynchronizerOnPostVertex,
                    format!("{v} is a Post vertex; synchronizers attach only to Pre vertices"),
                ));
            }
        }

        let mut members = std::collections::HashSet::new();
        let mut old: Vec<SynchronizerId> = Vec::new();

        for v in vertices {
            members.insert(v.clone());
            if let Some(existing) = self.synchronizer_of(v).cloned() {
                if !old.contains(&existing) {
                    old.push(existing);
                }
            }
        }
        for old_id in &old {
            if let Some(s) = self.synchronizers_mut().remove(old_id) {
                members.extend(s.members);
            }
        }

        let new_id = SynchronizerId::new(format!("sync-{}", self.fresh_ligature_id()));
        for member in &members {
            self.vertex_mut(member)?.synchronizer = Some(new_id.clone());
        }
        self.synchronizers_mut().insert(new_id.clone(), Synchronizer::with_members(new_id.clone(), members));

        self.emit(StructureEvent::new(StructureEventKind::NewSynchronizer).with_synchronizer(new_id.clone()));
        Ok(new_id)
    }

    fn find_ligature(&self, pre: &VertexId, post: &VertexId) -> Option<EdgeId> {
        self.edges()
            .find(|e| e.is_ligature() && &e.pre_vertex == pre && &e.post_vertex == post)
            .map(|e| e.id.clone())
    }

    fn insert_edge(&mut self, edge: super::Edge) {
        self.edges_mut().insert(edge.id.clone(), edge);
    }
}
