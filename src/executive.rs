//! External contract for the discrete-event executive (`spec.md` §6).
//!
//! The executive itself is out of scope for this core — it is "assumed provided"
//! (`spec.md` §1). What belongs here is the narrow interface the firing engine and
//! suspension primitives call against: a priority-queue-driven scheduler exposing
//! `now()`/`request_event()` and, during a `Detachable` event, a suspend-capable
//! [`EventController`].

use crate::ids::VertexId;

/// Whether an event the executive is currently dispatching can support suspension.
///
/// Only a `Detachable` event exposes a non-`None`
/// [`Executive::current_event_controller`]; a `Synchronous` event cannot be
/// suspended, and `Join`/`Yield` fail with
/// [`SageError::IllegalContext`](crate::error::SageError::IllegalContext) if called
/// from one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Synchronous,
    Detachable,
}

/// The query/command surface the firing engine needs from the executive
/// (`spec.md` §6).
pub trait Executive {
    /// Current simulated instant.
    fn now(&self) -> f64;

    /// Priority level of the event currently being dispatched.
    fn current_priority_level(&self) -> f64;

    /// Kind of the event currently being dispatched.
    fn current_event_type(&self) -> EventKind;

    /// The suspend-capable controller for the event currently being dispatched, if
    /// any. `None` when [`Self::current_event_type`] is [`EventKind::Synchronous`].
    fn current_event_controller(&self) -> Option<&dyn EventController>;

    /// Queue a future event for `receiver` at `(time, priority)`.
    fn request_event(&self, receiver: VertexId, time: f64, priority: f64, kind: EventKind);
}

/// Suspension handle exposed by the executive during a `Detachable` event
/// (`spec.md` §6).
pub trait EventController {
    fn suspend(&self);
    fn resume(&self);
    fn suspend_until(&self, time: f64);
    fn is_waiting(&self) -> bool;
    fn set_abort_handler(&self, handler: Box<dyn Fn() + Send + Sync>);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::sync::Mutex;

    /// Minimal test double exercising the contract surface — not shipped in `src/`.
    struct TestController {
        waiting: Cell<bool>,
        abort_handler: Mutex<Option<Box<dyn Fn() + Send + Sync>>>,
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
        fn set_abort_handler(&self, handler: Box<dyn Fn() + Send + Sync>) {
            *self.abort_handler.lock().unwrap() = Some(handler);
        }
    }

    #[test]
    fn abort_handler_fires_synchronously_on_abort_path() {
        let controller = TestController { waiting: Cell::new(false), abort_handler: Mutex::new(None) };
        let fired = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let fired_clone = fired.clone();
        controller.set_abort_handler(Box::new(move || {
            fired_clone.store(true, std::sync::atomic::Ordering::SeqCst);
        }));
        controller.suspend();
        assert!(controller.is_waiting());
        (controller.abort_handler.lock().unwrap().as_ref().unwrap())();
        assert!(fired.load(std::sync::atomic::Ordering::SeqCst));
    }
}
