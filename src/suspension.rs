//! `Join`/`Yield` suspension primitives exposed to application-code edges
//! (`spec.md` §5, "Suspension points").
//!
//! Both require the executive's current event to be `Detachable`; calling either
//! from a `Synchronous` event context fails with [`SageError::IllegalContext`].
//! Waking a joined caller once the target edge actually finishes is the
//! executive's responsibility — it is the party that owns the event queue and
//! the `EventController` the caller suspended on (`spec.md` §6).

use crate::error::{Result, SageError};
use crate::executive::{EventController, EventKind, Executive};
use crate::graph::GraphModel;
use crate::ids::EdgeId;

/// `Join(otherEdge)`: suspend the current edge until `other_edge` emits its
/// completion event.
pub fn join(exec: &dyn Executive, graph: &GraphModel, other_edge: &EdgeId) -> Result<()> {
    graph.edge(other_edge)?;
    let controller = current_controller(exec)?;
    controller.suspend();
    Ok(())
}

/// `Yield()`: suspend the current edge and re-schedule it at the same simulated
/// time, letting peer edges run first.
pub fn yield_now(exec: &dyn Executive) -> Result<()> {
    let controller = current_controller(exec)?;
    controller.suspend_until(exec.now());
    Ok(())
}

fn current_controller<'a>(exec: &'a dyn Executive) -> Result<&'a dyn EventController> {
    if exec.current_event_type() != EventKind::Detachable {
        return Err(SageError::illegal_context("Join/Yield called outside a Detachable event context"));
    }
    exec.current_event_controller().ok_or_else(|| SageError::illegal_context("Detachable event has no event controller"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphModel;
    use std::cell::Cell;

    struct TestController {
        waiting: Cell<bool>,
    }
    impl EventController for TestController {
        fn suspend(&self) {
            self.waiting.set(true);
        }
        fn resume(&self) {
            self.waiting.set(false);
        }
        fn suspend_until(&self, _time: f64) {
            self.waiting.set(true);
        }
        fn is_waiting(&self) -> bool {
            self.waiting.get()
        }
        fn set_abort_handler(&self, _handler: Box<dyn Fn() + Send + Sync>) {}
    }

    struct TestExecutive {
        kind: EventKind,
        controller: TestController,
    }
    impl Executive for TestExecutive {
        fn now(&self) -> f64 {
            42.0
        }
        fn current_priority_level(&self) -> f64 {
            0.0
        }
        fn current_event_type(&self) -> EventKind {
            self.kind
        }
        fn current_event_controller(&self) -> Option<&dyn EventController> {
            match self.kind {
                EventKind::Detachable => Some(&self.controller),
                EventKind::Synchronous => None,
            }
        }
        fn request_event(&self, _receiver: crate::ids::VertexId, _time: f64, _priority: f64, _kind: EventKind) {}
    }

    #[test]
    fn join_suspends_when_detachable() {
        let mut g = GraphModel::new();
        let a = g.create_edge("a");
        let exec = TestExecutive { kind: EventKind::Detachable, controller: TestController { waiting: Cell::new(false) } };
        join(&exec, &g, &a).unwrap();
        assert!(exec.controller.is_waiting());
    }

    #[test]
    fn join_fails_outside_detachable_context() {
        let mut g = GraphModel::new();
        let a = g.create_edge("a");
        let exec = TestExecutive { kind: EventKind::Synchronous, controller: TestController { waiting: Cell::new(false) } };
        let err = join(&exec, &g, &a).unwrap_err();
        assert!(matches!(err, SageError::IllegalContext(_)));
    }

    #[test]
    fn yield_now_suspends_until_the_current_instant() {
        let exec = TestExecutive { kind: EventKind::Detachable, controller: TestController { waiting: Cell::new(false) } };
        yield_now(&exec).unwrap();
        assert!(exec.controller.is_waiting());
    }
}
