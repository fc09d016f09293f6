//! Template Critical-Path Analyst (`spec.md` §4.4.1): a node-type-agnostic
//! longest-path analysis driven entirely by caller-supplied callbacks.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

/// Per-node timing data (`spec.md` §3, "Critical-Path Timing Record").
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimingRecord {
    pub early_start: f64,
    pub early_finish: f64,
    pub late_start: f64,
    pub late_finish: f64,
    pub nominal_start: f64,
    pub nominal_duration: f64,
    pub fixed: bool,
}

impl TimingRecord {
    /// `spec.md` §3: critical iff early = late at both ends.
    pub fn is_critical(&self) -> bool {
        self.early_start == self.late_start && self.early_finish == self.late_finish
    }
}

/// Caller-supplied view over an abstract node type `T` (`spec.md` §4.4.1).
pub trait TimingModel<T> {
    fn start_time(&self, node: &T) -> f64;
    fn duration(&self, node: &T) -> f64;
    fn is_fixed(&self, node: &T) -> bool;
    fn successors(&self, node: &T) -> Vec<T>;
    fn predecessors(&self, node: &T) -> Vec<T>;
}

/// Generic forward/backward critical-path analyst over any node type whose model
/// is supplied via [`TimingModel`]. Never mutates the caller's graph. Results are
/// computed on first request and memoized until [`Self::invalidate`] is called.
pub struct CriticalPathAnalyst<T, M> {
    model: M,
    start: T,
    finish: T,
    records: RefCell<Option<HashMap<T, TimingRecord>>>,
}

impl<T, M> CriticalPathAnalyst<T, M>
where
    T: Clone + Eq + Hash,
    M: TimingModel<T>,
{
    pub fn new(model: M, start: T, finish: T) -> Self {
        Self { model, start, finish, records: RefCell::new(None) }
    }

    pub fn invalidate(&self) {
        *self.records.borrow_mut() = None;
    }

    pub fn record(&self, node: &T) -> Option<TimingRecord> {
        self.ensure_computed();
        self.records.borrow().as_ref().and_then(|r| r.get(node)).copied()
    }

    /// Critical nodes ordered by early-start (`spec.md` §4.4.1).
    pub fn critical_path(&self) -> Vec<T> {
        self.ensure_computed();
        let records = self.records.borrow();
        let Some(records) = records.as_ref() else { return Vec::new() };
        let mut critical: Vec<(T, f64)> =
            records.iter().filter(|(_, r)| r.is_critical()).map(|(n, r)| (n.clone(), r.early_start)).collect();
        critical.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());
        critical.into_iter().map(|(n, _)| n).collect()
    }

    fn ensure_computed(&self) {
        if self.records.borrow().is_some() {
            return;
        }
        let all_nodes = self.reachable_nodes();
        let mut records: HashMap<T, TimingRecord> = all_nodes
            .iter()
            .map(|n| {
                let start_time = self.model.start_time(n);
                (
                    n.clone(),
                    TimingRecord {
                        early_start: start_time,
                        early_finish: start_time,
                        late_start: f64::INFINITY,
                        late_finish: f64::INFINITY,
                        nominal_start: start_time,
                        nominal_duration: self.model.duration(n),
                        fixed: self.model.is_fixed(n),
                    },
                )
            })
            .collect();

        self.forward(&all_nodes, &mut records);
        self.backward(&all_nodes, &mut records);
        *self.records.borrow_mut() = Some(records);
    }

    fn reachable_nodes(&self) -> Vec<T> {
        let mut seen: HashMap<T, ()> = HashMap::new();
        let mut queue = VecDeque::new();
        queue.push_back(self.start.clone());
        while let Some(n) = queue.pop_front() {
            if seen.contains_key(&n) {
                continue;
            }
            seen.insert(n.clone(), ());
            for s in self.model.successors(&n) {
                queue.push_back(s);
            }
        }
        seen.into_keys().collect()
    }

    /// A successor is only recursed into once every one of its predecessors (that
    /// are part of this analysis) has "weighed in" — implemented as Kahn's
    /// algorithm over in-degree rather than the source's unconditional recursion,
    /// since the latter only terminates by accident of visitation order.
    fn forward(&self, all_nodes: &[T], records: &mut HashMap<T, TimingRecord>) {
        let set: std::collections::HashSet<T> = all_nodes.iter().cloned().collect();
        let mut indegree: HashMap<T, usize> =
            all_nodes.iter().map(|n| (n.clone(), self.model.predecessors(n).iter().filter(|p| set.contains(p)).count())).collect();
        let mut ready: VecDeque<T> = all_nodes.iter().filter(|n| indegree[*n] == 0).cloned().collect();

        while let Some(n) = ready.pop_front() {
            let fixed = records[&n].fixed;
            if !fixed {
                let mut es = records[&n].early_start;
                for p in self.model.predecessors(&n) {
                    if let Some(pr) = records.get(&p) {
                        es = es.max(pr.early_finish);
                    }
                }
                let rec = records.get_mut(&n).unwrap();
                rec.early_start = es;
                rec.early_finish = es + rec.nominal_duration;
            }
            for s in self.model.successors(&n) {
                if let Some(c) = indegree.get_mut(&s) {
                    *c -= 1;
                    if *c == 0 {
                        ready.push_back(s);
                    }
                }
            }
        }
    }

    fn backward(&self, all_nodes: &[T], records: &mut HashMap<T, TimingRecord>) {
        if let Some(r) = records.get_mut(&self.finish) {
            r.late_start = r.early_start;
            r.late_finish = r.early_finish;
        }

        let set: std::collections::HashSet<T> = all_nodes.iter().cloned().collect();
        let mut outdegree: HashMap<T, usize> =
            all_nodes.iter().map(|n| (n.clone(), self.model.successors(n).iter().filter(|s| set.contains(s)).count())).collect();
        let mut ready: VecDeque<T> = all_nodes.iter().filter(|n| outdegree[*n] == 0).cloned().collect();

        while let Some(n) = ready.pop_front() {
            let fixed = records[&n].fixed;
            if !fixed && n != self.finish {
                let mut lf = records[&n].late_finish;
                for s in self.model.successors(&n) {
                    if let Some(sr) = records.get(&s) {
                        lf = lf.min(sr.late_start);
                    }
                }
                let rec = records.get_mut(&n).unwrap();
                rec.late_finish = lf;
                rec.late_start = lf - rec.nominal_duration;
            }
            for p in self.model.predecessors(&n) {
                if let Some(c) = outdegree.get_mut(&p) {
                    *c -= 1;
                    if *c == 0 {
                        ready.push_back(p);
                    }
                }
            }
        }
    }
}
