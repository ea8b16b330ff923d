use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tracing::trace;

use crate::error::Error;
use crate::promise::{promise_in, Promise};
use crate::spawner::Scheduler;

// Values gathered so far by `all`, in input order.
struct Gather<T> {
    values: Vec<Option<T>>,
    remaining: usize,
}

/// Return a `Promise` of all values of an iterator of `Promise`s.
///
/// The returned `Promise` is fulfilled with the values in input order, whatever order the inputs
/// settle in, once every input is fulfilled. If any input is rejected, it is rejected with the
/// first rejection it sees; the other inputs still settle on their own, but their outcomes are
/// ignored. No inputs means an immediately fulfilled, empty `Vec`.
///
/// Reactions of the returned `Promise` run on the global `Scheduler`. See also the `all!` macro.
///
/// ```
/// # use pledge::{all, promise, Promise};
/// let (slow, r) = promise();
/// let p = all(vec![Promise::resolved(1), slow, Promise::resolved(3)]);
/// r.resolve(2);
/// assert_eq!(p.wait().ok(), Some(vec![1, 2, 3]));
/// ```
pub fn all<T, I>(promises: I) -> Promise<Vec<T>>
    where I: IntoIterator<Item = Promise<T>>,
          T: Clone + Send + 'static
{
    all_with(promises, &Scheduler::global())
}

/// As `all`, with the returned `Promise`'s reactions running on `scheduler`.
pub fn all_with<T, I>(promises: I, scheduler: &Scheduler) -> Promise<Vec<T>>
    where I: IntoIterator<Item = Promise<T>>,
          T: Clone + Send + 'static
{
    let promises: Vec<Promise<T>> = promises.into_iter().collect();
    let (out, resolver) = promise_in(scheduler);
    let n = promises.len();

    if n == 0 {
        resolver.resolve(Vec::new());
        return out;
    }

    let gather = Arc::new(Mutex::new(Gather {
        values: (0..n).map(|_| None).collect(),
        remaining: n,
    }));

    for (idx, p) in promises.iter().enumerate() {
        let gather = gather.clone();
        let resolver = resolver.clone();

        p.observe(move |outcome| match outcome {
            Ok(v) => {
                let done = {
                    let mut g = gather.lock();
                    g.values[idx] = Some(v);
                    g.remaining -= 1;
                    if g.remaining == 0 {
                        Some(g.values.drain(..).flatten().collect::<Vec<T>>())
                    } else {
                        None
                    }
                };
                if let Some(values) = done {
                    trace!(count = values.len(), "all inputs fulfilled");
                    resolver.resolve(values);
                }
            },
            Err(reason) => {
                trace!(input = idx, "input rejected");
                resolver.reject(reason);
            },
        });
    }

    out
}

/// Return a `Promise` which settles like whichever input settles first.
///
/// Inputs which have already settled are taken in input order, so the earliest of those wins.
/// Racing nothing is an `Error::InvalidArgument`, as the result could never settle. See also the
/// `race!` macro.
///
/// A timeout is a race against a promise a timer settles:
///
/// ```
/// # use pledge::{defer, promise, race, Error};
/// # use std::thread;
/// # use std::time::Duration;
/// let (never, _r) = promise::<u32>();
/// let timer = defer(|| thread::sleep(Duration::from_millis(10)))
///     .try_then(|()| Err::<u32, _>(Error::Rejected("timed out".into())));
///
/// let reason = race(vec![never, timer]).unwrap().wait().unwrap_err();
/// assert_eq!(reason.to_string(), "timed out");
/// ```
pub fn race<T, I>(promises: I) -> Result<Promise<T>, Error>
    where I: IntoIterator<Item = Promise<T>>,
          T: Clone + Send + 'static
{
    race_with(promises, &Scheduler::global())
}

/// As `race`, with the returned `Promise`'s reactions running on `scheduler`.
pub fn race_with<T, I>(promises: I, scheduler: &Scheduler) -> Result<Promise<T>, Error>
    where I: IntoIterator<Item = Promise<T>>,
          T: Clone + Send + 'static
{
    let mut promises = promises.into_iter().peekable();
    if promises.peek().is_none() {
        return Err(Error::InvalidArgument("race needs at least one promise"));
    }

    let (out, resolver) = promise_in(scheduler);
    for p in promises {
        let resolver = resolver.clone();
        p.observe(move |outcome| resolver.settle(outcome.into()));
    }

    Ok(out)
}

/// Return a `Promise` of the first value among an iterator of `Promise`s.
///
/// Rejected inputs are skipped. If every input is rejected (or there are none) the returned
/// `Promise` is rejected with `Error::AllRejected`.
///
/// ```
/// # use pledge::{any, Promise};
/// let p = any(vec![Promise::rejected("a"), Promise::resolved(2), Promise::rejected("c")]);
/// assert_eq!(p.wait().ok(), Some(2));
/// ```
pub fn any<T, I>(promises: I) -> Promise<T>
    where I: IntoIterator<Item = Promise<T>>,
          T: Clone + Send + 'static
{
    any_with(promises, &Scheduler::global())
}

/// As `any`, with the returned `Promise`'s reactions running on `scheduler`.
pub fn any_with<T, I>(promises: I, scheduler: &Scheduler) -> Promise<T>
    where I: IntoIterator<Item = Promise<T>>,
          T: Clone + Send + 'static
{
    let promises: Vec<Promise<T>> = promises.into_iter().collect();
    let (out, resolver) = promise_in(scheduler);
    let n = promises.len();

    if n == 0 {
        resolver.reject(Error::AllRejected(0));
        return out;
    }

    let failed = Arc::new(AtomicUsize::new(0));
    for p in promises {
        let failed = failed.clone();
        let resolver = resolver.clone();

        p.observe(move |outcome| match outcome {
            Ok(v) => resolver.resolve(v),
            Err(_) => {
                if failed.fetch_add(1, Ordering::AcqRel) + 1 == n {
                    resolver.reject(Error::AllRejected(n));
                }
            },
        });
    }

    out
}

/// `all` over a list of promises.
///
/// ```
/// # #[macro_use] extern crate pledge;
/// # use pledge::Promise;
/// # fn main() {
/// let p = all![Promise::resolved("a"), Promise::resolved("b")];
/// assert_eq!(p.wait().ok(), Some(vec!["a", "b"]));
/// # }
/// ```
#[macro_export]
macro_rules! all {
    ($($p:expr),* $(,)?) => {
        $crate::all(::std::vec![$($p),*])
    };
}

/// `race` over a list of promises.
///
/// ```
/// # #[macro_use] extern crate pledge;
/// # use pledge::Promise;
/// # fn main() {
/// let p = race![Promise::resolved(1), Promise::resolved(2)].unwrap();
/// assert_eq!(p.wait().ok(), Some(1));
/// # }
/// ```
#[macro_export]
macro_rules! race {
    ($($p:expr),* $(,)?) => {
        $crate::race(::std::vec![$($p),*])
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Reason;
    use crate::promise::promise;

    #[test]
    fn gather_keeps_input_order() {
        let (a, ra) = promise();
        let (b, rb) = promise();
        let (c, rc) = promise();
        let p = all(vec![a, b, c]);

        rc.resolve(3);
        ra.resolve(1);
        assert!(p.is_pending());
        rb.resolve(2);

        assert_eq!(p.wait().ok(), Some(vec![1, 2, 3]));
    }

    #[test]
    fn empty_all() {
        assert_eq!(all(Vec::<Promise<u8>>::new()).wait().ok(), Some(vec![]));
    }

    #[test]
    fn empty_race() {
        match race(Vec::<Promise<u8>>::new()) {
            Err(Error::InvalidArgument(_)) => (),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn race_settled_inputs_in_order() {
        let p = race(vec![Promise::rejected("first"), Promise::resolved(2)]).expect("race");
        assert_eq!(p.wait().err().map(|r: Reason| r.to_string()), Some("first".to_string()));
    }

    #[test]
    fn any_all_rejected() {
        let p = any(vec![Promise::<u8>::rejected("a"), Promise::rejected("b")]);
        let r = p.wait().unwrap_err();
        assert_eq!(r.downcast_ref::<Error>(), Some(&Error::AllRejected(2)));

        let r = any(Vec::<Promise<u8>>::new()).wait().unwrap_err();
        assert_eq!(r.downcast_ref::<Error>(), Some(&Error::AllRejected(0)));
    }
}
