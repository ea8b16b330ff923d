use std::sync::Arc;

use tracing::trace;

use crate::combinators::all_with;
use crate::dispatch::guarded;
use crate::error::Reason;
use crate::promise::{promise_in, Promise};
use crate::resolution::Resolution;
use crate::spawner::Scheduler;

impl Scheduler {
    /// Run `work` on this scheduler, returning a `Promise` of its result.
    ///
    /// With `same_thread` set the work goes to the pinned lane: one dedicated worker, shared by
    /// every caller, which runs pinned work one job at a time in submission order. That is not
    /// necessarily the calling thread, which may not be a worker at all. If `work` panics the
    /// `Promise` is rejected with `Error::Panicked`.
    pub fn defer<R, F>(&self, same_thread: bool, work: F) -> Promise<R>
        where F: FnOnce() -> R + Send + 'static,
              R: Clone + Send + 'static
    {
        self.try_defer(same_thread, move || Ok::<R, Reason>(work()))
    }

    /// As `defer`, but `work` may fail, rejecting the `Promise`.
    pub fn try_defer<R, E, F>(&self, same_thread: bool, work: F) -> Promise<R>
        where F: FnOnce() -> Result<R, E> + Send + 'static,
              E: Into<Reason>,
              R: Clone + Send + 'static
    {
        // The Promise exists before the job is handed over; the job owns its Resolver.
        let (promise, resolver) = promise_in(self);
        let job = move || {
            trace!("running deferred work");
            resolver.settle(guarded(move || Resolution::from(work())))
        };

        if same_thread {
            self.spawn_pinned(job);
        } else {
            self.spawn(job);
        }
        promise
    }

    /// Apply `func` to every item as deferred work, returning a `Promise` of all the results in
    /// item order.
    pub fn map<I, R, F>(&self, items: I, same_thread: bool, func: F) -> Promise<Vec<R>>
        where I: IntoIterator,
              I::Item: Send + 'static,
              F: Fn(I::Item) -> R + Send + Sync + 'static,
              R: Clone + Send + 'static
    {
        let func = Arc::new(func);
        let promises: Vec<Promise<R>> = items.into_iter()
            .map(|item| {
                let func = func.clone();
                self.defer(same_thread, move || func(item))
            })
            .collect();

        all_with(promises, self)
    }
}

/// Run `work` on the global `Scheduler`, returning a `Promise` of its result.
///
/// ```
/// # use pledge::defer;
/// let p = defer(|| 6 * 7);
/// assert_eq!(p.wait().ok(), Some(42));
/// ```
pub fn defer<R, F>(work: F) -> Promise<R>
    where F: FnOnce() -> R + Send + 'static,
          R: Clone + Send + 'static
{
    Scheduler::global().defer(false, work)
}

/// Run `work` on the global `Scheduler`'s pinned lane.
pub fn defer_pinned<R, F>(work: F) -> Promise<R>
    where F: FnOnce() -> R + Send + 'static,
          R: Clone + Send + 'static
{
    Scheduler::global().defer(true, work)
}

/// Run fallible `work` on the global `Scheduler`.
///
/// ```
/// # use pledge::try_defer;
/// let p = try_defer(|| "12x".parse::<u32>().map_err(|e| e.to_string()));
/// assert!(p.wait().is_err());
/// ```
pub fn try_defer<R, E, F>(work: F) -> Promise<R>
    where F: FnOnce() -> Result<R, E> + Send + 'static,
          E: Into<Reason>,
          R: Clone + Send + 'static
{
    Scheduler::global().try_defer(false, work)
}

/// Apply `func` to every item on the global `Scheduler`; see `Scheduler::map`.
///
/// ```
/// # use pledge::map;
/// let p = map(vec![1, 2, 3], false, |x| x * x);
/// assert_eq!(p.wait().ok(), Some(vec![1, 4, 9]));
/// ```
pub fn map<I, R, F>(items: I, same_thread: bool, func: F) -> Promise<Vec<R>>
    where I: IntoIterator,
          I::Item: Send + 'static,
          F: Fn(I::Item) -> R + Send + Sync + 'static,
          R: Clone + Send + 'static
{
    Scheduler::global().map(items, same_thread, func)
}
