// The settlement cell shared by a Promise, its Resolvers and the reactions closed over them, and the
// dispatcher which delivers its outcome.
//
// Lock discipline: the cell lock is never held while user code runs, nor while a job is handed to
// the Spawner. Reactions of one cell run one per scheduler turn, strictly in registration order;
// the next turn is only scheduled once the previous reaction has returned.

use std::any;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, error, trace};

use crate::cvmx::CvMx;
use crate::diagnostics;
use crate::error::Reason;
use crate::inner::{Cell, Reaction, Settlement};
use crate::resolution::Resolution;
use crate::spawner::{Job, Scheduler};

pub struct Shared<T> {
    pub cell: CvMx<Cell<T>>,
    pub scheduler: Scheduler,
}

// Whether a settlement comes straight from a producer, or from the promise this cell adopted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Via {
    Direct,
    Adopted,
}

impl<T> Shared<T>
    where T: Clone + Send + 'static
{
    pub fn new(cell: Cell<T>, scheduler: Scheduler) -> Arc<Shared<T>> {
        Arc::new(Shared { cell: CvMx::new(cell), scheduler })
    }

    // Move the cell to its terminal state. Returns false (and changes nothing) if it already
    // settled, or if it adopted another promise and this isn't that promise's outcome.
    pub fn complete(self: &Arc<Self>, outcome: Result<T, Reason>, via: Via) -> bool {
        let (wakers, job) = {
            let mut cell = self.cell.mx.lock();

            if !cell.is_pending() || (cell.locked && via == Via::Direct) {
                debug!(ok = outcome.is_ok(), value_type = any::type_name::<T>(), "ignoring redundant settlement");
                return false;
            }

            trace!(ok = outcome.is_ok(), reactions = cell.queue.len(), "settled");
            cell.state = Settlement::from(outcome);
            (mem::take(&mut cell.wakers), self.next_turn(&mut cell))
        };

        self.cell.cv.notify_all();
        for w in wakers.into_values() {
            w.wake();
        }
        if let Some(job) = job {
            self.scheduler.spawn_job(job);
        }
        true
    }

    // Lock the cell onto another promise. False if it is already settled or locked.
    pub fn lock_in(&self) -> bool {
        let mut cell = self.cell.mx.lock();
        if !cell.is_pending() || cell.locked {
            return false;
        }
        cell.locked = true;
        true
    }

    // Queue a reaction. If the cell has settled it will be dispatched on a later turn.
    pub fn subscribe(self: &Arc<Self>, reaction: Reaction<T>) {
        let job = {
            let mut cell = self.cell.mx.lock();
            cell.observed = true;
            cell.queue.push_back(reaction);
            self.next_turn(&mut cell)
        };
        if let Some(job) = job {
            self.scheduler.spawn_job(job);
        }
    }

    // Run `f` with the outcome: right away if there is one, otherwise once it arrives. Only for
    // internal plumbing; `f` must not call user code.
    pub fn observe<F>(self: &Arc<Self>, f: F)
        where F: FnOnce(Result<T, Reason>) + Send + 'static
    {
        let now = {
            let mut cell = self.cell.mx.lock();
            cell.observed = true;
            cell.outcome()
        };
        match now {
            Some(outcome) => f(outcome),
            None => self.subscribe(Box::new(f)),
        }
    }

    // Claim the dispatch turn if there is work for one. Called with the lock held; the caller
    // spawns the returned job after releasing it.
    fn next_turn(self: &Arc<Self>, cell: &mut Cell<T>) -> Option<Job> {
        if cell.draining || cell.is_pending() || cell.queue.is_empty() {
            return None;
        }
        cell.draining = true;

        let turn = Turn { shared: Some(self.clone()) };
        Some(Box::new(move || turn.run()))
    }

    fn dispatch_one(self: Arc<Self>) {
        let next = {
            let mut cell = self.cell.mx.lock();
            match (cell.outcome(), cell.queue.pop_front()) {
                (Some(outcome), Some(reaction)) => Some((outcome, reaction)),
                _ => None,
            }
        };

        if let Some((outcome, reaction)) = next {
            trace!(ok = outcome.is_ok(), "dispatching reaction");
            // Reactions built by this crate catch their own panics; this guards the dispatcher.
            if panic::catch_unwind(AssertUnwindSafe(move || reaction(outcome))).is_err() {
                error!("reaction panicked during dispatch");
            }
        }

        let job = {
            let mut cell = self.cell.mx.lock();
            cell.draining = false;
            self.next_turn(&mut cell)
        };
        if let Some(job) = job {
            self.scheduler.spawn_job(job);
        }
    }
}

// A claimed dispatch turn. If the Spawner drops it without running it, the claim is released so
// that a later settlement or registration can schedule a fresh turn.
struct Turn<T> {
    shared: Option<Arc<Shared<T>>>,
}

impl<T> Turn<T>
    where T: Clone + Send + 'static
{
    fn run(mut self) {
        if let Some(shared) = self.shared.take() {
            shared.dispatch_one();
        }
    }
}

impl<T> Drop for Turn<T> {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            error!(value_type = any::type_name::<T>(), "dispatch turn dropped by spawner");
            shared.cell.mx.lock().draining = false;
        }
    }
}

impl<T> Drop for Shared<T> {
    fn drop(&mut self) {
        let cell = self.cell.mx.get_mut();
        if let Settlement::Rejected(ref reason) = cell.state {
            if !cell.observed {
                diagnostics::unhandled(reason, any::type_name::<T>());
            }
        }
    }
}

// Run a handler, turning a panic into a rejection.
pub fn guarded<U, F>(handler: F) -> Resolution<U>
    where F: FnOnce() -> Resolution<U>
{
    match panic::catch_unwind(AssertUnwindSafe(handler)) {
        Ok(resolution) => resolution,
        Err(payload) => {
            let reason = Reason::from_panic(payload);
            debug!(%reason, "handler panicked");
            Resolution::Reject(reason)
        },
    }
}
