//! End-to-end scenarios driven through the real firing pipeline (`engine::start`,
//! `engine::trigger_fire`), using a small discrete-event scheduler double standing
//! in for the executive `spec.md` §6 assumes is externally provided.
//!
//! Colocated unit tests exercise firing-manager and receipt-manager logic by
//! calling their trait methods by hand; these drive the same graphs through the
//! public entry points application code actually uses, so a regression in the
//! fire-trigger indirection (every vertex fires by way of its replaceable
//! `FireTrigger`, not by a direct call to `fire_vertex`) shows up here.

use sage_core::executive::{EventController, EventKind, Executive};
use sage_core::firing::engine;
use sage_core::firing::{ChannelGroup, CountedBranchManager, DelegateOutcome, ExecutionDelegate};
use sage_core::graph::GraphModel;
use sage_core::ids::{ChannelId, EdgeId, VertexId};
use sage_core::{GraphContext, Result};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
enum Job {
    FireVertex(VertexId),
    ResumeEdge(EdgeId),
}

struct QueuedJob {
    time: f64,
    priority: f64,
    seq: u64,
    job: Job,
}

impl PartialEq for QueuedJob {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.priority == other.priority && self.seq == other.seq
    }
}
impl Eq for QueuedJob {}
impl PartialOrd for QueuedJob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for QueuedJob {
    // BinaryHeap is a max-heap; invert so the earliest (time, priority, seq) pops first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .partial_cmp(&self.time)
            .unwrap()
            .then_with(|| other.priority.partial_cmp(&self.priority).unwrap())
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Default)]
struct SchedulerState {
    now: f64,
    priority: f64,
    queue: BinaryHeap<QueuedJob>,
    next_seq: u64,
}

/// Minimal (time, priority)-ordered scheduler double. `request_event` (the only
/// callback the engine itself invokes) queues a direct `_FireVertex` dispatch —
/// matching `spec.md` §4.2's "schedule each member's `_FireVertex` independently"
/// for released synchronizer members, which must not re-enter the fire-trigger a
/// second time or the synchronizer release would loop forever. Duration delegates
/// queue their own `ResumeEdge` job directly against the shared state.
struct Scheduler(Arc<Mutex<SchedulerState>>);

impl Scheduler {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(SchedulerState::default())))
    }

    fn state(&self) -> Arc<Mutex<SchedulerState>> {
        self.0.clone()
    }

    fn schedule(state: &Arc<Mutex<SchedulerState>>, job: Job, time: f64, priority: f64) {
        let mut s = state.lock().unwrap();
        let seq = s.next_seq;
        s.next_seq += 1;
        s.queue.push(QueuedJob { time, priority, seq, job });
    }

    /// Drain the queue in (time, priority, insertion) order until nothing remains
    /// scheduled.
    fn run_to_completion(&self, ctx: &mut GraphContext) {
        loop {
            let next = self.0.lock().unwrap().queue.pop();
            let Some(queued) = next else { break };
            {
                let mut s = self.0.lock().unwrap();
                s.now = queued.time;
                s.priority = queued.priority;
            }
            match queued.job {
                Job::FireVertex(v) => engine::fire_vertex(ctx, &v, self).unwrap(),
                Job::ResumeEdge(e) => engine::resume_edge(ctx, &e, self).unwrap(),
            }
        }
    }
}

impl Executive for Scheduler {
    fn now(&self) -> f64 {
        self.0.lock().unwrap().now
    }
    fn current_priority_level(&self) -> f64 {
        self.0.lock().unwrap().priority
    }
    fn current_event_type(&self) -> EventKind {
        EventKind::Synchronous
    }
    fn current_event_controller(&self) -> Option<&dyn EventController> {
        None
    }
    fn request_event(&self, receiver: VertexId, time: f64, priority: f64, _kind: EventKind) {
        Self::schedule(&self.0, Job::FireVertex(receiver), time, priority);
    }
}

/// An edge with a nominal duration: suspends on `start`, scheduling its own
/// `ResumeEdge` against the shared scheduler state, and records the instant it
/// started and the instant it finished.
struct DurationDelegate {
    label: &'static str,
    duration: f64,
    state: Arc<Mutex<SchedulerState>>,
    log: Arc<Mutex<Vec<(&'static str, &'static str, f64)>>>,
}

impl ExecutionDelegate for DurationDelegate {
    fn start(&self, _ctx: &mut GraphContext, edge: &EdgeId, exec: &dyn Executive) -> Result<DelegateOutcome> {
        let now = exec.now();
        self.log.lock().unwrap().push((self.label, "start", now));
        Scheduler::schedule(&self.state, Job::ResumeEdge(edge.clone()), now + self.duration, exec.current_priority_level());
        Ok(DelegateOutcome::Suspended)
    }

    fn resume(&self, _ctx: &mut GraphContext, _edge: &EdgeId, exec: &dyn Executive) -> Result<DelegateOutcome> {
        self.log.lock().unwrap().push((self.label, "finish", exec.now()));
        Ok(DelegateOutcome::Completed)
    }
}

/// `spec.md` §8, scenario 3: a single vertex feeding a loop edge (channel "loop",
/// count 3) and an exit edge (channel "exit", count 1) fires the loop edge exactly
/// three times and the exit edge exactly once.
///
/// The seed graph is cyclic (the loop edge's completion re-feeds the source
/// vertex); a real executive would re-dispatch the source vertex each time the
/// loop edge's own completion event reaches it. This test plays that executive
/// role explicitly rather than wiring a literal cycle back through the graph,
/// since the cursor update in `CountedBranchManager::fire_if_appropriate` happens
/// only after its nested `start_edge` call returns — a truly self-looping graph
/// would re-enter the same vertex's cursor before that update lands.
#[test]
fn counted_branch_manager_fires_three_loop_and_one_exit_through_the_real_pipeline() {
    let mut g = GraphModel::new();
    let source = g.create_edge("source");
    let loop_edge = g.create_edge("loop");
    let exit_edge = g.create_edge("exit");
    g.connect(&source, &loop_edge).unwrap();
    g.connect(&source, &exit_edge).unwrap();

    let source_post = g.edge(&source).unwrap().post_vertex.clone();
    let loop_ligature = g.vertex(&source_post).unwrap().post_edges[0].clone();
    let exit_ligature = g.vertex(&source_post).unwrap().post_edges[1].clone();
    g.edge_mut(&loop_ligature).unwrap().channel = ChannelId::new("loop");
    g.edge_mut(&exit_ligature).unwrap().channel = ChannelId::new("exit");

    g.vertex_mut(&source_post).unwrap().firing_manager = Some(Arc::new(CountedBranchManager::new(vec![
        ChannelGroup { channel: ChannelId::new("loop"), count: 3 },
        ChannelGroup { channel: ChannelId::new("exit"), count: 1 },
    ])));

    let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    let loop_log = log.clone();
    let exit_log = log.clone();
    struct Fired(&'static str, Arc<Mutex<Vec<&'static str>>>);
    impl ExecutionDelegate for Fired {
        fn start(&self, _ctx: &mut GraphContext, _edge: &EdgeId, _exec: &dyn Executive) -> Result<DelegateOutcome> {
            self.1.lock().unwrap().push(self.0);
            Ok(DelegateOutcome::Completed)
        }
    }
    g.edge_mut(&loop_edge).unwrap().delegate = Some(Arc::new(Fired("loop", loop_log)));
    g.edge_mut(&exit_edge).unwrap().delegate = Some(Arc::new(Fired("exit", exit_log)));

    g.set_root(source.clone());
    let graph = Arc::new(g);
    let mut ctx = GraphContext::new(graph.clone());
    let scheduler = Scheduler::new();

    engine::start(&mut ctx, &scheduler).unwrap();
    // Two further re-dispatches of the source vertex: one more loop round, then
    // the round in which the loop's third firing and the exit's first firing both
    // land (the manager evaluates every outbound edge on each dispatch).
    for _ in 0..2 {
        engine::trigger_fire(&mut ctx, &source_post, &scheduler).unwrap();
    }

    let fired = log.lock().unwrap();
    assert_eq!(fired.iter().filter(|l| **l == "loop").count(), 3);
    assert_eq!(fired.iter().filter(|l| **l == "exit").count(), 1);
    assert_eq!(fired.as_slice(), ["loop", "loop", "loop", "exit"]);
}

/// `spec.md` §8, scenario 4: two edges v1 (duration 5, reached after a 5-unit
/// predecessor) and v2 (duration 10, reached after a 10-unit predecessor), with a
/// synchronizer over their pre-vertices. Without the synchronizer v1 would start
/// at 5; with it, both wait for the slower arrival and start together at 10,
/// finishing at 15 and 20 respectively.
#[test]
fn synchronizer_releases_both_members_at_the_slower_arrival_time() {
    let mut g = GraphModel::new();
    let root = g.create_edge("root");
    let u1 = g.create_edge("u1");
    let u2 = g.create_edge("u2");
    let v1 = g.create_edge("v1");
    let v2 = g.create_edge("v2");
    g.connect(&root, &u1).unwrap();
    g.connect(&root, &u2).unwrap();
    g.connect(&u1, &v1).unwrap();
    g.connect(&u2, &v2).unwrap();
    g.set_root(root.clone());

    let v1_pre = g.edge(&v1).unwrap().pre_vertex.clone();
    let v2_pre = g.edge(&v2).unwrap().pre_vertex.clone();
    g.synchronize(&[v1_pre, v2_pre]).unwrap();

    let log: Arc<Mutex<Vec<(&'static str, &'static str, f64)>>> = Arc::new(Mutex::new(Vec::new()));
    let scheduler = Scheduler::new();
    let state = scheduler.state();
    for (edge, label, duration) in [(&u1, "u1", 5.0), (&u2, "u2", 10.0), (&v1, "v1", 5.0), (&v2, "v2", 10.0)] {
        g.edge_mut(edge).unwrap().delegate =
            Some(Arc::new(DurationDelegate { label, duration, state: state.clone(), log: log.clone() }));
    }

    let graph = Arc::new(g);
    let mut ctx = GraphContext::new(graph.clone());

    engine::start(&mut ctx, &scheduler).unwrap();
    scheduler.run_to_completion(&mut ctx);

    let events = log.lock().unwrap();
    let at = |label: &str, what: &str| events.iter().find(|(l, w, _)| *l == label && *w == what).map(|(_, _, t)| *t).unwrap();

    assert_eq!(at("v1", "start"), 10.0, "v1 waits for v2's slower arrival");
    assert_eq!(at("v2", "start"), 10.0);
    assert_eq!(at("v1", "finish"), 15.0);
    assert_eq!(at("v2", "finish"), 20.0);
}
