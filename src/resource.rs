//! Shared resource pool: FIFO-served acquire/release with bounded overbooking
//! (`spec.md` §5, "Shared-resource policy").

use crate::error::{Result, SageError};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use uuid::Uuid;

/// Identity of one granted or pending acquisition.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

struct Waiter {
    id: RequestId,
    amount: f64,
}

/// A single resource manager serving one pool (`spec.md` §5). Not `Sync` —
/// callers serialize access the same way the rest of the graph does during a
/// single-threaded cooperative execution.
pub struct ResourcePool {
    available: RefCell<f64>,
    /// How far `available` may go negative to service an otherwise-blocked
    /// request at the head of the waiter queue. `0.0` disables overbooking.
    overbook: f64,
    waiters: RefCell<VecDeque<Waiter>>,
    grants: RefCell<HashMap<RequestId, f64>>,
}

impl ResourcePool {
    pub fn new(initial: f64, overbook: f64) -> Self {
        Self { available: RefCell::new(initial), overbook, waiters: RefCell::new(VecDeque::new()), grants: RefCell::new(HashMap::new()) }
    }

    pub fn available(&self) -> f64 {
        *self.available.borrow()
    }

    /// Polling acquire: grants immediately if the pool (plus overbook headroom)
    /// can satisfy `amount` and no one is already waiting ahead of this caller;
    /// otherwise returns `None` without enqueuing anything.
    pub fn try_acquire(&self, amount: f64) -> Option<RequestId> {
        if !self.waiters.borrow().is_empty() {
            return None;
        }
        self.grant_if_satisfiable(amount)
    }

    /// Suspending acquire: grants immediately under the same rule as
    /// [`Self::try_acquire`]; otherwise enqueues FIFO and suspends the caller via
    /// `controller`. The caller resumes (from the executive's side, once this
    /// pool's bookkeeping releases the request) with the same `RequestId`.
    pub fn acquire(&self, amount: f64, controller: &dyn crate::executive::EventController) -> RequestId {
        if let Some(id) = self.try_acquire(amount) {
            return id;
        }
        let id = RequestId::fresh();
        self.waiters.borrow_mut().push_back(Waiter { id: id.clone(), amount });
        controller.suspend();
        id
    }

    fn grant_if_satisfiable(&self, amount: f64) -> Option<RequestId> {
        let mut available = self.available.borrow_mut();
        if *available - amount < -self.overbook {
            return None;
        }
        *available -= amount;
        let id = RequestId::fresh();
        self.grants.borrow_mut().insert(id.clone(), amount);
        Some(id)
    }

    /// Returns `amount` to the pool and releases as many FIFO waiters as the
    /// (possibly overbooked) balance now covers.
    pub fn release(&self, amount: f64) {
        *self.available.borrow_mut() += amount;
        self.drain_waiters();
    }

    fn drain_waiters(&self) {
        loop {
            let head_amount = match self.waiters.borrow().front() {
                Some(w) => w.amount,
                None => return,
            };
            let mut available = self.available.borrow_mut();
            if *available - head_amount < -self.overbook {
                return;
            }
            *available -= head_amount;
            drop(available);
            let waiter = self.waiters.borrow_mut().pop_front().expect("front just matched");
            self.grants.borrow_mut().insert(waiter.id, waiter.amount);
        }
    }

    /// Returns a previously granted reservation. Fails with
    /// [`SageError::ResourceContention`] if `id` names no outstanding grant or the
    /// amount doesn't match what was actually granted.
    pub fn unreserve(&self, id: &RequestId, amount: f64) -> Result<()> {
        let granted = self.grants.borrow_mut().remove(id);
        match granted {
            Some(g) if g == amount => {
                self.release(amount);
                Ok(())
            }
            Some(g) => {
                self.grants.borrow_mut().insert(id.clone(), g);
                Err(SageError::resource_contention(format!("unreserve amount {amount} does not match granted amount {g}")))
            }
            None => Err(SageError::resource_contention("unreserve called with a non-matching request")),
        }
    }

    /// Cancels a still-queued (not yet granted) request. Per `spec.md` §5, any
    /// abort handler installed on the suspended caller's coroutine fires
    /// synchronously on this path — that invocation is the caller's
    /// responsibility via the `EventController` it suspended on.
    pub fn abort(&self, id: &RequestId) -> Result<()> {
        let mut waiters = self.waiters.borrow_mut();
        let before = waiters.len();
        waiters.retain(|w| w.id != *id);
        if waiters.len() == before {
            Err(SageError::resource_contention("abort called for a request that is not queued"))
        } else {
            Ok(())
        }
    }
}
