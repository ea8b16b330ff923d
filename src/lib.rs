//! Promises
//! ========
//!
//! Quick example:
//!
//! ```
//! # use pledge::promise;
//! # use std::time::Duration;
//! # use std::thread;
//! let (p, r) = promise();
//!
//! // A time-consuming process
//! thread::spawn(move || { thread::sleep(Duration::from_millis(100)); r.resolve(123) });
//!
//! // do something when the value is ready
//! let p = p.then(|v| v + 1);
//!
//! // Wait for the final result
//! assert_eq!(p.wait().ok(), Some(124));
//! ```
//!
//! This crate implements a pair of concepts: `Promise`s - a read handle on a value which may not
//! yet be known, and `Resolver`s - the write side which settles it.
//!
//! A `Promise` is either *pending*, *fulfilled* with a value, or *rejected* with a `Reason`. It
//! settles exactly once: the first settlement wins and every later attempt is silently ignored.
//! Settling a `Promise` with another `Promise` (`Resolver::forward`) doesn't nest; the first
//! adopts whatever outcome the second eventually has.
//!
//! A `Promise` can also be created already settled (`Promise::resolved`, `Promise::rejected`).
//! This is useful for lifting known values into the promise domain.
//!
//! Any number of *reactions* may be registered on a `Promise`, before or after it settles, and
//! each returns a new `Promise` for its own result. `then` maps a value, `catch` recovers from a
//! rejection, `finally` runs on either outcome, and `then_with`/`react` give full control.
//! Outcomes flow through links which don't handle them: a rejection passes straight through a
//! `then`, a value straight through a `catch`.
//!
//! Reactions never run inside the call which settles a `Promise`. They are handed to the
//! `Scheduler` the promise was created with, and the reactions of one promise run one at a time,
//! in the order they were registered. A reaction which panics rejects its derived promise; it
//! never takes the dispatcher down.
//!
//! Groups of `Promise`s can be acted upon together. `all` is fulfilled with every value, in input
//! order, or rejected by the first rejection; `race` settles like whichever input settles first;
//! `any` takes the first value, skipping rejections.
//!
//! `defer` runs a closure on the `Scheduler` and returns a `Promise` of its result; `map` does
//! that for every item of a collection. A value can be taken out of a `Promise` by blocking on it
//! with `wait`, or without blocking a thread by `.await`ing it, as `Promise` implements
//! `std::future::Future`.
//!
//! The global `Scheduler` is a `threadpool` sized from `Config::from_env()`; any `Spawner` can
//! be used instead. Rejected promises which nobody ever looked at are logged through `tracing`
//! when dropped, and reported to the hook installed with `set_unhandled_rejection_hook`.

mod combinators;
mod config;
mod cvmx;
mod defer;
mod diagnostics;
mod dispatch;
mod error;
mod inner;
mod promise;
mod resolution;
mod resolver;
mod spawner;

pub use combinators::{all, all_with, any, any_with, race, race_with};
pub use config::{Config, STACK_SIZE_ENV, THREAD_NAME_ENV, WORKERS_ENV};
pub use defer::{defer, defer_pinned, map, try_defer};
pub use diagnostics::{clear_unhandled_rejection_hook, set_unhandled_rejection_hook};
pub use error::{Error, Reason};
pub use promise::{promise, promise_in, Promise, State, Thenable};
pub use resolution::{Finally, Resolution};
pub use resolver::Resolver;
pub use spawner::{Job, Scheduler, SerialSpawner, Spawner, ThreadSpawner};
