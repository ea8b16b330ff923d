use std::fmt::{self, Formatter, Debug};
use std::sync::Arc;

use tracing::debug;

use crate::dispatch::{Shared, Via};
use crate::error::{Error, Reason};
use crate::promise::Promise;
use crate::resolution::Resolution;

/// The write side of a `Promise`.
///
/// A `Resolver` settles its `Promise` exactly once: the first call to `resolve`, `reject`,
/// `forward` or `settle` wins, and every later call is silently ignored. It may be cloned and the
/// clones handed to competing producers; whichever gets there first decides the outcome.
///
/// It is created in a pair with its `Promise` by `promise()` or `promise_in()`. Dropping every
/// `Resolver` without settling leaves the `Promise` pending forever.
///
/// ```
/// # use pledge::promise;
/// let (p, r) = promise();
/// r.resolve("first");
/// r.resolve("second");
/// r.reject("too late");
/// assert_eq!(p.wait().ok(), Some("first"));
/// ```
pub struct Resolver<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Resolver<T>
    where T: Clone + Send + 'static
{
    pub(crate) fn new(shared: Arc<Shared<T>>) -> Resolver<T> {
        Resolver { shared }
    }

    /// Fulfill the `Promise` with a value.
    pub fn resolve(&self, v: T) {
        self.shared.complete(Ok(v), Via::Direct);
    }

    /// Reject the `Promise`. Strings and other plain values are coerced into `Error::Rejected`.
    pub fn reject<R: Into<Reason>>(&self, reason: R) {
        self.shared.complete(Err(reason.into()), Via::Direct);
    }

    /// Settle the `Promise` the same way `other` eventually settles.
    ///
    /// The `Promise` stays pending until `other` settles, and from now on ignores every other
    /// attempt to settle it. Forwarding a promise to itself rejects it with `Error::Cycle`.
    ///
    /// ```
    /// # use pledge::promise;
    /// let (outer, outer_r) = promise();
    /// let (inner, inner_r) = promise();
    ///
    /// outer_r.forward(inner);
    /// outer_r.resolve(1);         // ignored, outer is waiting on inner
    /// inner_r.resolve(2);
    /// assert_eq!(outer.wait().ok(), Some(2));
    /// ```
    pub fn forward(&self, other: Promise<T>) {
        if Arc::ptr_eq(&self.shared, &other.shared) {
            debug!("promise resolved with itself");
            self.reject(Error::Cycle);
            return;
        }
        if !self.shared.lock_in() {
            debug!("ignoring forward onto a settled or locked promise");
            return;
        }

        let target = self.shared.clone();
        other.shared.observe(move |outcome| {
            target.complete(outcome, Via::Adopted);
        });
    }

    /// Settle the `Promise` according to `resolution`.
    pub fn settle(&self, resolution: Resolution<T>) {
        match resolution {
            Resolution::Fulfill(v) => self.resolve(v),
            Resolution::Reject(r) => self.reject(r),
            Resolution::Forward(p) => self.forward(p),
        }
    }

    /// True once the `Promise` is settled. A promise which is waiting on another one it was
    /// forwarded to is not settled yet.
    pub fn is_settled(&self) -> bool {
        !self.shared.cell.mx.lock().is_pending()
    }

    /// Another handle on the `Promise` this resolves.
    pub fn promise(&self) -> Promise<T> {
        Promise::from_shared(self.shared.clone())
    }
}

impl<T> Clone for Resolver<T> {
    fn clone(&self) -> Resolver<T> {
        Resolver { shared: self.shared.clone() }
    }
}

impl<T: Debug> Debug for Resolver<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Resolver({:?})", *self.shared.cell.mx.lock())
    }
}
