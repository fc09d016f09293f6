//! CPM/PERT analyst with synchronizer coupling (`spec.md` §4.4.2).

use crate::config::EngineConfig;
use crate::error::{Result, SageError, TimeCycleOffender};
use crate::graph::GraphModel;
use crate::ids::{EdgeId, VertexId};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

const EPSILON: f64 = 1e-9;

#[derive(Clone, Copy, Debug, Default)]
struct VertexTicks {
    earliest: f64,
    latest: f64,
}

/// Per-edge summary the query surface hands back (`spec.md` §4.4.2, "Query surface").
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeTiming {
    pub earliest_start: f64,
    pub earliest_finish: f64,
    pub latest_start: f64,
    pub latest_finish: f64,
}

impl EdgeTiming {
    pub fn acceptable_slip(&self) -> f64 {
        self.latest_start - self.earliest_start
    }
}

/// PERT mean/variance for one edge (`spec.md` §4.4.2, "PERT extension").
///
/// The variance formula is carried over literally as `(pessimistic - optimistic)^2`
/// rather than the textbook `/36` divisor — this analyst follows the spec text as
/// written rather than the conventional PERT statistic.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PertStats {
    pub mean: f64,
    pub variance: f64,
}

/// Analyzes a [`GraphModel`] directly, tracking earliest/latest tick counts per
/// vertex and coupling synchronizer members so they release together.
pub struct PertCpmAnalyst<'g> {
    graph: &'g GraphModel,
    config: EngineConfig,
    ticks: RefCell<Option<HashMap<VertexId, VertexTicks>>>,
}

impl<'g> PertCpmAnalyst<'g> {
    pub fn new(graph: &'g GraphModel, config: EngineConfig) -> Self {
        Self { graph, config, ticks: RefCell::new(None) }
    }

    pub fn invalidate(&self) {
        *self.ticks.borrow_mut() = None;
    }

    /// Runs cycle detection, then forward/backward/fix-up/backward, per
    /// `spec.md` §4.4.2.
    pub fn analyze(&self) -> Result<()> {
        super::cycle::check_for_cycles(self.graph)?;

        let root = self.graph.root().ok_or_else(|| SageError::analysis_failed("graph has no root edge"))?.clone();
        let root_edge = self.graph.edge(&root)?;
        let finish = self.finish_vertex(&root)?;

        let mut ticks: HashMap<VertexId, VertexTicks> = HashMap::new();
        let mut synchronizer_visits: HashMap<crate::ids::SynchronizerId, HashSet<VertexId>> = HashMap::new();
        let mut synchronizer_elapsed: HashMap<crate::ids::SynchronizerId, HashMap<VertexId, f64>> = HashMap::new();

        self.forward_visit(&root_edge.pre_vertex, 0.0, &mut ticks, &mut synchronizer_visits, &mut synchronizer_elapsed)?;

        if self.config.diagnostics_mode {
            self.validate(&ticks)?;
        }

        let finish_earliest = ticks.get(&finish).map(|t| t.earliest).unwrap_or(0.0);
        if let Some(t) = ticks.get_mut(&finish) {
            t.latest = t.earliest;
        } else {
            ticks.insert(finish.clone(), VertexTicks { earliest: finish_earliest, latest: finish_earliest });
        }
        self.backward_visit(&finish, &mut ticks, &mut HashSet::new());

        self.fix_up(&mut ticks);
        self.backward_visit(&finish, &mut ticks, &mut HashSet::new());

        if self.config.diagnostics_mode {
            self.validate(&ticks)?;
        }

        *self.ticks.borrow_mut() = Some(ticks);
        Ok(())
    }

    fn finish_vertex(&self, root: &EdgeId) -> Result<VertexId> {
        let mut current = root.clone();
        loop {
            let edge = self.graph.edge(&current)?;
            let post = self.graph.vertex(&edge.post_vertex)?;
            if post.post_edges.is_empty() {
                return Ok(edge.post_vertex.clone());
            }
            let next_ligature = self.graph.edge(&post.post_edges[0])?;
            let next_pre = self.graph.vertex(&next_ligature.post_vertex)?;
            current = next_pre.principal_edge.clone();
        }
    }

    /// Visits one vertex during the forward pass. Pre-vertices additionally gate on
    /// synchronizer membership (`spec.md` §4.4.2, "Forward pass"); every vertex then
    /// advances through its outgoing ligatures (zero duration) and, if it is a
    /// pre-vertex, across its own principal edge into its post-vertex (nominal
    /// duration) via [`Self::advance_from_vertex`].
    fn forward_visit(
        &self,
        vertex_id: &VertexId,
        elapsed: f64,
        ticks: &mut HashMap<VertexId, VertexTicks>,
        sync_visits: &mut HashMap<crate::ids::SynchronizerId, HashSet<VertexId>>,
        sync_elapsed: &mut HashMap<crate::ids::SynchronizerId, HashMap<VertexId, f64>>,
    ) -> Result<()> {
        let vertex = self.graph.vertex(vertex_id)?;
        let principal = self.graph.edge(&vertex.principal_edge)?;

        let elapsed = if let (true, Some(offset)) = (vertex.is_pre(), principal.fixed_offset) { offset } else { elapsed };

        match vertex.synchronizer {
            None => {
                let entry = ticks.entry(vertex_id.clone()).or_insert(VertexTicks { earliest: 0.0, latest: f64::INFINITY });
                entry.earliest = entry.earliest.max(elapsed);
                let released = entry.earliest;
                self.advance_from_vertex(vertex_id, released, ticks, sync_visits, sync_elapsed)
            }
            Some(sync_id) => {
                sync_elapsed.entry(sync_id.clone()).or_default().insert(vertex_id.clone(), elapsed);
                let visited = sync_visits.entry(sync_id.clone()).or_default();
                visited.insert(vertex_id.clone());

                let synchronizer = self
                    .graph
                    .synchronizer(&sync_id)
                    .ok_or_else(|| SageError::analysis_failed(format!("unknown synchronizer {sync_id}")))?;
                if visited.len() < synchronizer.members.len() {
                    return Ok(());
                }

                let group_elapsed = sync_elapsed.get(&sync_id).cloned().unwrap_or_default();
                let released = group_elapsed.values().cloned().fold(0.0_f64, f64::max);

                for member in synchronizer.members.iter().cloned().collect::<Vec<_>>() {
                    let entry = ticks.entry(member.clone()).or_insert(VertexTicks { earliest: 0.0, latest: f64::INFINITY });
                    entry.earliest = entry.earliest.max(released);
                    let member_earliest = entry.earliest;
                    self.advance_from_vertex(&member, member_earliest, ticks, sync_visits, sync_elapsed)?;
                }
                Ok(())
            }
        }
    }

    /// Advances past one already-visited vertex: along its outgoing ligatures
    /// unconditionally, and — only for pre-vertices — across its own principal
    /// edge's nominal duration into its post-vertex.
    fn advance_from_vertex(
        &self,
        vertex_id: &VertexId,
        elapsed: f64,
        ticks: &mut HashMap<VertexId, VertexTicks>,
        sync_visits: &mut HashMap<crate::ids::SynchronizerId, HashSet<VertexId>>,
        sync_elapsed: &mut HashMap<crate::ids::SynchronizerId, HashMap<VertexId, f64>>,
    ) -> Result<()> {
        let vertex = self.graph.vertex(vertex_id)?;
        for lig_id in vertex.post_edges.clone() {
            let ligature = self.graph.edge(&lig_id)?;
            let next_vertex = ligature.post_vertex.clone();
            self.forward_visit(&next_vertex, elapsed, ticks, sync_visits, sync_elapsed)?;
        }
        if vertex.is_pre() {
            let principal = self.graph.edge(&vertex.principal_edge)?;
            let post_vertex = principal.post_vertex.clone();
            let duration = principal.nominal_duration;
            self.forward_visit(&post_vertex, elapsed + duration, ticks, sync_visits, sync_elapsed)?;
        }
        Ok(())
    }

    /// Mirror of [`Self::forward_visit`]/[`Self::advance_from_vertex`]: walks
    /// incoming ligatures (zero duration) and, for post-vertices, back across their
    /// own principal edge into their pre-vertex (nominal duration).
    fn backward_visit(&self, vertex_id: &VertexId, ticks: &mut HashMap<VertexId, VertexTicks>, visited: &mut HashSet<VertexId>) {
        if !visited.insert(vertex_id.clone()) {
            return;
        }
        let Ok(vertex) = self.graph.vertex(vertex_id) else { return };
        let elapsed = ticks.get(vertex_id).map(|t| t.latest).unwrap_or(f64::INFINITY);

        for lig_id in &vertex.pre_edges {
            let Ok(ligature) = self.graph.edge(lig_id) else { continue };
            let pred_vertex = ligature.pre_vertex.clone();
            let entry = ticks.entry(pred_vertex).or_insert(VertexTicks { earliest: 0.0, latest: f64::INFINITY });
            entry.latest = entry.latest.min(elapsed);
        }
        if !vertex.is_pre() {
            if let Ok(principal) = self.graph.edge(&vertex.principal_edge) {
                let pre_vertex = principal.pre_vertex.clone();
                let duration = principal.nominal_duration;
                let entry = ticks.entry(pre_vertex).or_insert(VertexTicks { earliest: 0.0, latest: f64::INFINITY });
                entry.latest = entry.latest.min(elapsed - duration);
            }
        }

        for lig_id in vertex.pre_edges.clone() {
            let Ok(ligature) = self.graph.edge(&lig_id) else { continue };
            self.backward_visit(&ligature.pre_vertex.clone(), ticks, visited);
        }
        if !vertex.is_pre() {
            if let Ok(principal) = self.graph.edge(&vertex.principal_edge) {
                let pre_vertex = principal.pre_vertex.clone();
                self.backward_visit(&pre_vertex, ticks, visited);
            }
        }
    }

    /// Resets every synchronizer member's principal-edge post-vertex latest so
    /// latest-start/latest-finish differ by exactly the edge's own duration,
    /// undoing drift the synchronizer coupling introduces (`spec.md` §4.4.2,
    /// "Fix-up pass").
    fn fix_up(&self, ticks: &mut HashMap<VertexId, VertexTicks>) {
        for vertex in self.graph.vertices() {
            if vertex.synchronizer.is_none() || !vertex.is_pre() {
                continue;
            }
            let Ok(edge) = self.graph.edge(&vertex.principal_edge) else { continue };
            let pre_latest = ticks.get(&vertex.id).map(|t| t.latest).unwrap_or(f64::INFINITY);
            let entry = ticks.entry(edge.post_vertex.clone()).or_insert(VertexTicks { earliest: 0.0, latest: f64::INFINITY });
            entry.latest = pre_latest + edge.nominal_duration;
        }
    }

    fn validate(&self, ticks: &HashMap<VertexId, VertexTicks>) -> Result<()> {
        let mut offenders = Vec::new();
        for edge in self.graph.edges() {
            let Some(pre) = ticks.get(&edge.pre_vertex) else { continue };
            let Some(post) = ticks.get(&edge.post_vertex) else { continue };
            if (pre.earliest + edge.nominal_duration - post.earliest).abs() > EPSILON {
                offenders.push(TimeCycleOffender { edge: edge.id.clone(), description: "earliest-start + duration != earliest-finish".into() });
            }
            if (pre.latest + edge.nominal_duration - post.latest).abs() > EPSILON {
                offenders.push(TimeCycleOffender { edge: edge.id.clone(), description: "latest-start + duration != latest-finish".into() });
            }
            if pre.earliest > pre.latest + EPSILON {
                offenders.push(TimeCycleOffender { edge: edge.id.clone(), description: "earliest-start > latest-start".into() });
            }
            if post.earliest > post.latest + EPSILON {
                offenders.push(TimeCycleOffender { edge: edge.id.clone(), description: "earliest-finish > latest-finish".into() });
            }
        }
        if offenders.is_empty() {
            Ok(())
        } else {
            Err(SageError::time_cycle(offenders))
        }
    }

    fn timing(&self, edge_id: &EdgeId) -> Result<EdgeTiming> {
        self.ensure_analyzed()?;
        let ticks = self.ticks.borrow();
        let ticks = ticks.as_ref().expect("analyze() populates ticks");
        let edge = self.graph.edge(edge_id)?;

        match (ticks.get(&edge.pre_vertex), ticks.get(&edge.post_vertex)) {
            (Some(pre), Some(post)) => {
                Ok(EdgeTiming { earliest_start: pre.earliest, earliest_finish: post.earliest, latest_start: pre.latest, latest_finish: post.latest })
            }
            _ if self.config.permit_unknown_edges => Ok(EdgeTiming { earliest_start: 0.0, earliest_finish: 0.0, latest_start: 0.0, latest_finish: 0.0 }),
            _ => Err(SageError::analysis_failed(format!("edge {edge_id} was never visited by this analyst"))),
        }
    }

    fn ensure_analyzed(&self) -> Result<()> {
        if self.ticks.borrow().is_none() {
            self.analyze()?;
        }
        Ok(())
    }

    pub fn earliest_start(&self, edge: &EdgeId) -> Result<f64> {
        self.timing(edge).map(|t| t.earliest_start)
    }

    pub fn earliest_finish(&self, edge: &EdgeId) -> Result<f64> {
        self.timing(edge).map(|t| t.earliest_finish)
    }

    pub fn latest_start(&self, edge: &EdgeId) -> Result<f64> {
        self.timing(edge).map(|t| t.latest_start)
    }

    pub fn latest_finish(&self, edge: &EdgeId) -> Result<f64> {
        self.timing(edge).map(|t| t.latest_finish)
    }

    pub fn acceptable_slip(&self, edge: &EdgeId) -> Result<f64> {
        self.timing(edge).map(|t| t.acceptable_slip())
    }

    pub fn is_critical(&self, edge: &EdgeId) -> Result<bool> {
        let t = self.timing(edge)?;
        Ok((t.earliest_start - t.latest_start).abs() <= EPSILON)
    }

    /// PERT mean/variance for one edge (`spec.md` §4.4.2, "PERT extension").
    /// Returns `None` when the edge lacks optimistic/pessimistic durations.
    pub fn pert_stats(&self, edge_id: &EdgeId) -> Result<Option<PertStats>> {
        let edge = self.graph.edge(edge_id)?;
        match (edge.optimistic_duration, edge.pessimistic_duration) {
            (Some(optimistic), Some(pessimistic)) => {
                let mean = (optimistic + 4.0 * edge.nominal_duration + pessimistic) / 6.0;
                let variance = (pessimistic - optimistic).powi(2);
                Ok(Some(PertStats { mean, variance }))
            }
            _ => Ok(None),
        }
    }

    /// Mean/variance along the critical path, summed edge by edge (`spec.md`
    /// §4.4.2). Edges without PERT estimates contribute their nominal duration
    /// with zero variance.
    pub fn critical_path_stats(&self) -> Result<PertStats> {
        self.ensure_analyzed()?;
        let critical_edges = self.critical_edges()?;
        let mut mean = 0.0;
        let mut variance = 0.0;
        for edge_id in critical_edges {
            match self.pert_stats(&edge_id)? {
                Some(stats) => {
                    mean += stats.mean;
                    variance += stats.variance;
                }
                None => mean += self.graph.edge(&edge_id)?.nominal_duration,
            }
        }
        Ok(PertStats { mean, variance })
    }

    fn critical_edges(&self) -> Result<Vec<EdgeId>> {
        let mut out = Vec::new();
        for edge in self.graph.edges() {
            if self.is_critical(&edge.id)? {
                out.push(edge.id.clone());
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphModel;

    #[test]
    fn linear_chain_earliest_matches_cumulative_durations() {
        let mut g = GraphModel::new();
        let a = g.create_edge("A");
        let b = g.create_edge("B");
        let c = g.create_edge("C");
        g.edge_mut(&a).unwrap().nominal_duration = 3.0;
        g.edge_mut(&b).unwrap().nominal_duration = 4.0;
        g.edge_mut(&c).unwrap().nominal_duration = 2.0;
        g.connect(&a, &b).unwrap();
        g.connect(&b, &c).unwrap();
        g.set_root(a.clone());

        let analyst = PertCpmAnalyst::new(&g, EngineConfig::default());
        analyst.analyze().unwrap();

        assert_eq!(analyst.earliest_start(&a).unwrap(), 0.0);
        assert_eq!(analyst.earliest_finish(&a).unwrap(), 3.0);
        assert_eq!(analyst.earliest_start(&b).unwrap(), 3.0);
        assert_eq!(analyst.earliest_finish(&c).unwrap(), 9.0);
        assert!(analyst.is_critical(&a).unwrap());
        assert!(analyst.is_critical(&b).unwrap());
        assert!(analyst.is_critical(&c).unwrap());
    }

    #[test]
    fn pert_stats_use_literal_spec_variance_formula() {
        let mut g = GraphModel::new();
        let a = g.create_edge("A");
        {
            let edge = g.edge_mut(&a).unwrap();
            edge.nominal_duration = 5.0;
            edge.optimistic_duration = Some(2.0);
            edge.pessimistic_duration = Some(14.0);
        }
        g.set_root(a.clone());

        let analyst = PertCpmAnalyst::new(&g, EngineConfig::default());
        let stats = analyst.pert_stats(&a).unwrap().unwrap();
        assert_eq!(stats.mean, (2.0 + 4.0 * 5.0 + 14.0) / 6.0);
        assert_eq!(stats.variance, (14.0_f64 - 2.0).powi(2));
    }

    #[test]
    fn unknown_edge_without_permit_flag_is_an_error() {
        let mut g = GraphModel::new();
        let a = g.create_edge("A");
        let ghost = g.create_edge("ghost");
        g.set_root(a.clone());

        let analyst = PertCpmAnalyst::new(&g, EngineConfig::default());
        assert!(analyst.earliest_start(&ghost).is_err());

        let permissive = PertCpmAnalyst::new(&g, EngineConfig::new().with_permit_unknown_edges(true));
        assert_eq!(permissive.earliest_start(&ghost).unwrap(), 0.0);
    }

    #[test]
    fn diagnostics_mode_is_consistent_on_a_well_formed_graph() {
        let mut g = GraphModel::new();
        let a = g.create_edge("A");
        let b = g.create_edge("B");
        g.edge_mut(&a).unwrap().nominal_duration = 3.0;
        g.edge_mut(&b).unwrap().nominal_duration = 4.0;
        g.connect(&a, &b).unwrap();
        g.set_root(a.clone());

        let analyst = PertCpmAnalyst::new(&g, EngineConfig::new().with_diagnostics_mode(true));
        assert!(analyst.analyze().is_ok());
    }
}
