use std::any;
use std::fmt::{self, Formatter, Debug};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use crate::dispatch::{guarded, Shared};
use crate::error::Reason;
use crate::inner::Cell;
use crate::resolution::{Finally, Resolution};
use crate::resolver::Resolver;
use crate::spawner::Scheduler;

/// Where a `Promise` is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Not settled yet.
    Pending,
    /// Settled with a value.
    Fulfilled,
    /// Settled with a `Reason`.
    Rejected,
}

/// An undetermined value.
///
/// A `Promise` is a read handle on a value which is settled exactly once, either *fulfilled* with
/// a value of type `T` or *rejected* with a `Reason`. It is typically created in a pair with a
/// `Resolver` by `promise()`, which settles it.
///
/// `Promise`s are cheap to clone; every clone refers to the same settlement. Reactions are
/// registered with `then` and its relatives, each of which returns a new `Promise` for the
/// reaction's result. Reactions never run inside the call which settles the promise or registers
/// them: they are handed to the promise's `Scheduler`, and the reactions of one promise run one at
/// a time, in the order they were registered, whether that was before or after settlement.
///
/// A panic inside a reaction is caught and rejects the derived promise.
///
/// ```
/// # use pledge::promise;
/// let (p, r) = promise::<String>();
/// let shout = p.then(|v| format!("X:{}", v));
/// r.resolve("foo".into());
/// assert_eq!(shout.wait().ok(), Some("X:foo".to_string()));
/// ```
pub struct Promise<T> {
    pub(crate) shared: Arc<Shared<T>>,
    waker: Option<usize>,               // this handle's slot in the cell's wakers
}

/// Construct a `Promise`/`Resolver` pair using the global `Scheduler`.
///
/// ```
/// # use pledge::{promise, Promise, Resolver};
/// let (p, r): (Promise<i32>, Resolver<i32>) = promise();
/// # drop((p, r));
/// ```
pub fn promise<T>() -> (Promise<T>, Resolver<T>)
    where T: Clone + Send + 'static
{
    promise_in(&Scheduler::global())
}

/// Construct a `Promise`/`Resolver` pair whose reactions run on `scheduler`.
pub fn promise_in<T>(scheduler: &Scheduler) -> (Promise<T>, Resolver<T>)
    where T: Clone + Send + 'static
{
    let shared = Shared::new(Cell::pending(), scheduler.clone());
    (Promise::from_shared(shared.clone()), Resolver::new(shared))
}

impl<T> Promise<T> {
    pub(crate) fn from_shared(shared: Arc<Shared<T>>) -> Promise<T> {
        Promise { shared, waker: None }
    }

    /// The `Scheduler` this promise's reactions run on.
    pub fn scheduler(&self) -> &Scheduler {
        &self.shared.scheduler
    }

    /// Where this promise is in its life.
    pub fn state(&self) -> State {
        use crate::inner::Settlement::*;

        match self.shared.cell.mx.lock().state {
            Pending => State::Pending,
            Fulfilled(_) => State::Fulfilled,
            Rejected(_) => State::Rejected,
        }
    }

    /// True until the promise settles.
    pub fn is_pending(&self) -> bool {
        self.state() == State::Pending
    }
}

impl<T> Promise<T>
    where T: Clone + Send + 'static
{
    /// Construct an already fulfilled `Promise`.
    ///
    /// ```
    /// # use pledge::{Promise, State};
    /// let p = Promise::resolved(123);
    /// assert_eq!(p.state(), State::Fulfilled);
    /// assert_eq!(p.wait().ok(), Some(123));
    /// ```
    pub fn resolved(v: T) -> Promise<T> {
        Promise::resolved_in(v, &Scheduler::global())
    }

    /// As `resolved`, with reactions running on `scheduler`.
    pub fn resolved_in(v: T, scheduler: &Scheduler) -> Promise<T> {
        Promise::settled_in(Ok(v), scheduler)
    }

    /// Construct an already rejected `Promise`. Strings and other plain values are coerced into
    /// `Error::Rejected`.
    ///
    /// ```
    /// # use pledge::{Error, Promise};
    /// let p = Promise::<i32>::rejected("no luck");
    /// let reason = p.wait().unwrap_err();
    /// assert_eq!(reason.downcast_ref::<Error>(), Some(&Error::Rejected("no luck".into())));
    /// ```
    pub fn rejected<R: Into<Reason>>(reason: R) -> Promise<T> {
        Promise::rejected_in(reason, &Scheduler::global())
    }

    /// As `rejected`, with reactions running on `scheduler`.
    pub fn rejected_in<R: Into<Reason>>(reason: R, scheduler: &Scheduler) -> Promise<T> {
        Promise::settled_in(Err(reason.into()), scheduler)
    }

    fn settled_in(outcome: Result<T, Reason>, scheduler: &Scheduler) -> Promise<T> {
        Promise::from_shared(Shared::new(Cell::settled(outcome), scheduler.clone()))
    }

    /// Register a reaction on the raw outcome.
    ///
    /// This is the most general form of reaction; every other chaining method is built on it.
    /// `func` runs once the promise settles, on a later scheduler turn, and its `Resolution`
    /// settles the returned `Promise`.
    pub fn react<U, F>(&self, func: F) -> Promise<U>
        where F: FnOnce(Result<T, Reason>) -> Resolution<U> + Send + 'static,
              U: Clone + Send + 'static
    {
        let (promise, resolver) = promise_in(&self.shared.scheduler);

        self.shared.subscribe(Box::new(move |outcome| {
            resolver.settle(guarded(move || func(outcome)))
        }));

        promise
    }

    /// Register a pair of reactions, one for each outcome.
    ///
    /// Only the one matching the outcome is called. Whatever it returns settles the returned
    /// `Promise`; returning `Resolution::Forward` makes it wait on another promise.
    ///
    /// ```
    /// # use pledge::{Promise, Resolution};
    /// let p = Promise::<u32>::rejected("bad input");
    /// let p = p.then_with(|v| Resolution::Fulfill(v.to_string()),
    ///                     |why| Resolution::Fulfill(format!("recovered from {}", why)));
    /// assert_eq!(p.wait().ok(), Some("recovered from bad input".to_string()));
    /// ```
    pub fn then_with<U, F, G>(&self, on_success: F, on_failure: G) -> Promise<U>
        where F: FnOnce(T) -> Resolution<U> + Send + 'static,
              G: FnOnce(Reason) -> Resolution<U> + Send + 'static,
              U: Clone + Send + 'static
    {
        self.react(move |outcome| match outcome {
            Ok(v) => on_success(v),
            Err(e) => on_failure(e),
        })
    }

    /// Map the value with a function of it. A rejection passes through unchanged.
    pub fn then<U, F>(&self, func: F) -> Promise<U>
        where F: FnOnce(T) -> U + Send + 'static,
              U: Clone + Send + 'static
    {
        self.then_with(move |v| Resolution::Fulfill(func(v)), Resolution::Reject)
    }

    /// As `then`, but `func` may fail, rejecting the returned `Promise`.
    pub fn try_then<U, E, F>(&self, func: F) -> Promise<U>
        where F: FnOnce(T) -> Result<U, E> + Send + 'static,
              E: Into<Reason>,
              U: Clone + Send + 'static
    {
        self.then_with(move |v| Resolution::from(func(v)), Resolution::Reject)
    }

    /// As `then`, but `func` returns a `Promise` whose outcome becomes the outcome of the returned
    /// `Promise`.
    ///
    /// ```
    /// # use pledge::Promise;
    /// let p = Promise::resolved(2).and_then(|v| Promise::resolved(v * 10));
    /// assert_eq!(p.wait().ok(), Some(20));
    /// ```
    pub fn and_then<U, F>(&self, func: F) -> Promise<U>
        where F: FnOnce(T) -> Promise<U> + Send + 'static,
              U: Clone + Send + 'static
    {
        self.then_with(move |v| Resolution::Forward(func(v)), Resolution::Reject)
    }

    /// Map either outcome to a value.
    pub fn then_or<U, F, G>(&self, on_success: F, on_failure: G) -> Promise<U>
        where F: FnOnce(T) -> U + Send + 'static,
              G: FnOnce(Reason) -> U + Send + 'static,
              U: Clone + Send + 'static
    {
        self.then_with(move |v| Resolution::Fulfill(on_success(v)),
                       move |e| Resolution::Fulfill(on_failure(e)))
    }

    /// Recover from a rejection. A value passes through unchanged.
    ///
    /// ```
    /// # use pledge::Promise;
    /// let p = Promise::rejected("nope").catch(|_| 0);
    /// assert_eq!(p.wait().ok(), Some(0));
    /// ```
    pub fn catch<F>(&self, func: F) -> Promise<T>
        where F: FnOnce(Reason) -> T + Send + 'static
    {
        self.catch_with(move |e| Resolution::Fulfill(func(e)))
    }

    /// As `catch`, but recovery may itself fail.
    pub fn try_catch<E, F>(&self, func: F) -> Promise<T>
        where F: FnOnce(Reason) -> Result<T, E> + Send + 'static,
              E: Into<Reason>
    {
        self.catch_with(move |e| Resolution::from(func(e)))
    }

    /// As `catch`, with full control over how the returned `Promise` settles.
    pub fn catch_with<F>(&self, func: F) -> Promise<T>
        where F: FnOnce(Reason) -> Resolution<T> + Send + 'static
    {
        self.then_with(Resolution::Fulfill, func)
    }

    /// Run `func` whatever the outcome, then pass the outcome on.
    ///
    /// If `func` panics, the returned `Promise` is rejected with the panic instead.
    pub fn finally<F>(&self, func: F) -> Promise<T>
        where F: FnOnce() + Send + 'static
    {
        self.finally_with(move || {
            func();
            Finally::Pass
        })
    }

    /// Run `func` whatever the outcome; what it returns decides what happens to the outcome.
    ///
    /// ```
    /// # use pledge::{Finally, Promise};
    /// let cleanup = Promise::resolved(());
    /// let p = Promise::resolved(7).finally_with(move || Finally::After(cleanup));
    /// assert_eq!(p.wait().ok(), Some(7));
    ///
    /// let p = Promise::resolved(7).finally_with(|| Finally::Override(Promise::resolved(8)));
    /// assert_eq!(p.wait().ok(), Some(8));
    /// ```
    pub fn finally_with<F>(&self, func: F) -> Promise<T>
        where F: FnOnce() -> Finally<T> + Send + 'static
    {
        self.react(move |outcome| match func() {
            Finally::Pass => Resolution::from(outcome),
            Finally::Fail(reason) => Resolution::Reject(reason),
            Finally::Override(p) => Resolution::Forward(p),
            Finally::After(cleanup) => {
                Resolution::Forward(cleanup.then_with(move |()| Resolution::from(outcome), Resolution::Reject))
            },
        })
    }

    /// Block until the promise settles, then return its value or rejection reason.
    ///
    /// The calling thread sleeps on a condition variable meanwhile. Calling this from a reaction or
    /// from deferred work can starve the `Scheduler` if it has few workers; prefer chaining or
    /// `.await` there.
    pub fn wait(&self) -> Result<T, Reason> {
        self.shared.cell.wait_map(|cell| {
            cell.observed = true;
            cell.outcome()
        })
    }

    /// As `wait`, but give up after `timeout`, returning `None`.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<T, Reason>> {
        self.shared.cell.wait_map_for(|cell| {
            cell.observed = true;
            cell.outcome()
        }, timeout)
    }

    /// The outcome, if the promise has settled.
    pub fn peek(&self) -> Option<Result<T, Reason>> {
        let mut cell = self.shared.cell.mx.lock();
        let outcome = cell.outcome();
        if outcome.is_some() {
            cell.observed = true;
        }
        outcome
    }

    pub(crate) fn observe<F>(&self, f: F)
        where F: FnOnce(Result<T, Reason>) + Send + 'static
    {
        self.shared.observe(f)
    }
}

/// Type-erased view of a promise.
///
/// Lets promises of different value types be treated alike, for example to wait for all of them
/// with `all`.
///
/// ```
/// # use pledge::{all, Promise, Thenable};
/// let a = Promise::resolved(1u8);
/// let b = Promise::resolved("two");
/// let both: Vec<Box<dyn Thenable>> = vec![Box::new(a), Box::new(b)];
/// assert_eq!(both[1].settlement_type(), "&str");
/// assert!(all(both.iter().map(|p| p.chain())).wait().is_ok());
/// ```
pub trait Thenable: Send + Sync {
    /// Name of the type the promise settles with.
    fn settlement_type(&self) -> &'static str;

    /// A `Promise` which settles when this one does, without its value.
    fn chain(&self) -> Promise<()>;
}

impl<T> Thenable for Promise<T>
    where T: Clone + Send + 'static
{
    fn settlement_type(&self) -> &'static str {
        any::type_name::<T>()
    }

    fn chain(&self) -> Promise<()> {
        self.then(|_| ())
    }
}

impl<T> Future for Promise<T>
    where T: Clone + Send + 'static
{
    type Output = Result<T, Reason>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        let mut cell = this.shared.cell.mx.lock();
        cell.observed = true;

        if let Some(outcome) = cell.outcome() {
            return Poll::Ready(outcome);
        }

        // Each handle keeps only the waker of its latest poll.
        let key = match this.waker {
            Some(key) => key,
            None => {
                let key = cell.next_waker;
                cell.next_waker = cell.next_waker.wrapping_add(1);
                this.waker = Some(key);
                key
            },
        };
        match cell.wakers.get_mut(&key) {
            Some(w) if w.will_wake(cx.waker()) => (),
            Some(w) => *w = cx.waker().clone(),
            None => { cell.wakers.insert(key, cx.waker().clone()); },
        }
        Poll::Pending
    }
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Promise<T> {
        Promise::from_shared(self.shared.clone())
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        if let Some(key) = self.waker.take() {
            self.shared.cell.mx.lock().wakers.remove(&key);
        }
    }
}

impl<T, E> From<Result<T, E>> for Promise<T>
    where T: Clone + Send + 'static, E: Into<Reason>
{
    fn from(res: Result<T, E>) -> Promise<T> {
        match res {
            Ok(v) => Promise::resolved(v),
            Err(e) => Promise::rejected(e),
        }
    }
}

impl<T: Debug> Debug for Promise<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Promise({:?})", *self.shared.cell.mx.lock())
    }
}
