//! Companion cycle checker run before any PERT/CPM analysis (`spec.md` §4.4.2,
//! "Cycle detection").

use crate::error::{GraphStructureKind, Result, SageError};
use crate::graph::GraphModel;
use crate::ids::EdgeId;
use std::collections::HashSet;

/// Depth-first walk marking each edge `on-path` while recursing; re-encountering an
/// `on-path` edge raises a structure error. The offender list is built by
/// appending, at each unwinding frame, the edge that frame was in the middle of
/// visiting when the error propagated up to it — which reproduces the exact
/// "reverse path order from detection point" the seed scenario (`spec.md` §8,
/// scenario 5) calls for.
pub fn check_for_cycles(graph: &GraphModel) -> Result<()> {
    match find_cycle(graph) {
        Some(members) => {
            let path = members.iter().map(|e| e.as_str()).collect::<Vec<_>>().join(" -> ");
            Err(SageError::graph_structure(GraphStructureKind::Cycle, format!("cycle detected: [{path}]")))
        }
        None => Ok(()),
    }
}

/// Returns the offending edges in path order (`spec.md` §8, scenario 5), or
/// `None` if the graph reachable from the root is acyclic.
pub fn find_cycle(graph: &GraphModel) -> Option<Vec<EdgeId>> {
    let root = graph.root()?;
    let mut on_path = Vec::new();
    let mut visited = HashSet::new();
    find_cycle_from(graph, root, &mut on_path, &mut visited)
}

fn find_cycle_from(graph: &GraphModel, edge_id: &EdgeId, on_path: &mut Vec<EdgeId>, visited: &mut HashSet<EdgeId>) -> Option<Vec<EdgeId>> {
    on_path.push(edge_id.clone());
    for succ in successors_of(graph, edge_id) {
        if on_path.contains(&succ) {
            on_path.pop();
            return Some(vec![succ]);
        }
        if !visited.contains(&succ) {
            if let Some(mut members) = find_cycle_from(graph, &succ, on_path, visited) {
                members.push(succ);
                on_path.pop();
                return Some(members);
            }
        }
    }
    on_path.pop();
    visited.insert(edge_id.clone());
    None
}

fn successors_of(graph: &GraphModel, edge_id: &EdgeId) -> Vec<EdgeId> {
    let Ok(edge) = graph.edge(edge_id) else { return Vec::new() };
    let Ok(post) = graph.vertex(&edge.post_vertex) else { return Vec::new() };
    post.post_edges
        .iter()
        .filter_map(|lig_id| graph.edge(lig_id).ok())
        .filter_map(|lig| graph.vertex(&lig.post_vertex).ok())
        .map(|v| v.principal_edge.clone())
        .filter(|e| e != edge_id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphModel;

    #[test]
    fn three_cycle_reports_exact_reverse_path_order() {
        let mut g = GraphModel::new();
        let a = g.create_edge("A");
        let b = g.create_edge("B");
        let c = g.create_edge("C");
        g.connect(&a, &b).unwrap();
        g.connect(&b, &c).unwrap();
        g.connect(&c, &a).unwrap();
        g.set_root(a.clone());

        let members = find_cycle(&g).unwrap();
        assert_eq!(members, vec![a, c, b]);
    }

    #[test]
    fn acyclic_graph_reports_nothing() {
        let mut g = GraphModel::new();
        let a = g.create_edge("A");
        let b = g.create_edge("B");
        g.connect(&a, &b).unwrap();
        g.set_root(a);
        assert!(find_cycle(&g).is_none());
        assert!(check_for_cycles(&g).is_ok());
    }
}
