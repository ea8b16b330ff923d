use crate::error::Reason;
use crate::promise::Promise;

/// How to settle a promise.
///
/// This is what the handlers passed to `Promise::then_with` and friends return, and what
/// `Resolver::settle` accepts. `Forward` is thenable-resolution: the promise being settled adopts
/// the eventual outcome of another promise rather than holding a promise as its value.
#[derive(Debug)]
pub enum Resolution<T> {
    /// Fulfill with a value.
    Fulfill(T),

    /// Reject with a reason.
    Reject(Reason),

    /// Settle however the given promise eventually settles.
    Forward(Promise<T>),
}

impl<T, E> From<Result<T, E>> for Resolution<T>
    where E: Into<Reason>
{
    fn from(res: Result<T, E>) -> Resolution<T> {
        match res {
            Ok(v) => Resolution::Fulfill(v),
            Err(e) => Resolution::Reject(e.into()),
        }
    }
}

impl<T> From<Promise<T>> for Resolution<T> {
    fn from(p: Promise<T>) -> Resolution<T> {
        Resolution::Forward(p)
    }
}

/// What a `Promise::finally_with` callback wants done with the original outcome.
#[derive(Debug)]
pub enum Finally<T> {
    /// Pass the original outcome through unchanged.
    Pass,

    /// Replace the outcome with a rejection.
    Fail(Reason),

    /// Wait for some cleanup work, then pass the original outcome through. If the cleanup is
    /// rejected, its reason becomes the outcome instead.
    After(Promise<()>),

    /// Settle however the given promise settles, discarding the original outcome.
    Override(Promise<T>),
}

impl<T, E> From<Result<(), E>> for Finally<T>
    where E: Into<Reason>
{
    fn from(res: Result<(), E>) -> Finally<T> {
        match res {
            Ok(()) => Finally::Pass,
            Err(e) => Finally::Fail(e.into()),
        }
    }
}
