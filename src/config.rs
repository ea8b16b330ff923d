use std::env;
use std::str::FromStr;
use std::thread;

use tracing::{debug, warn};

use crate::spawner::Scheduler;
#[cfg(not(feature = "threadpool"))]
use crate::spawner::{SerialSpawner, ThreadSpawner};

/// Environment variable overriding `Config::workers`.
pub const WORKERS_ENV: &str = "PLEDGE_WORKERS";
/// Environment variable overriding `Config::thread_name`.
pub const THREAD_NAME_ENV: &str = "PLEDGE_THREAD_NAME";
/// Environment variable overriding `Config::stack_size`.
pub const STACK_SIZE_ENV: &str = "PLEDGE_STACK_SIZE";

/// How to build a `Scheduler`.
///
/// ```
/// # use pledge::Config;
/// let sched = Config::default().workers(2).thread_name("io").build();
/// let p = sched.defer(false, || 6 * 7);
/// assert_eq!(p.wait().ok(), Some(42));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Number of workers on the general lane. Always at least 1.
    pub workers: usize,
    /// Name given to worker threads; the pinned worker gets a `-pinned` suffix.
    pub thread_name: String,
    /// Stack size for worker threads, or the platform default.
    pub stack_size: Option<usize>,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            workers: thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
            thread_name: String::from("pledge-worker"),
            stack_size: None,
        }
    }
}

impl Config {
    /// The default configuration, overridden by `PLEDGE_WORKERS`, `PLEDGE_THREAD_NAME` and
    /// `PLEDGE_STACK_SIZE` where they are set. Values which don't parse are ignored.
    pub fn from_env() -> Config {
        Config::default().merge(|key| env::var(key).ok())
    }

    // Apply overrides from `lookup`, which maps a variable name to its value.
    fn merge<F>(mut self, lookup: F) -> Config
        where F: Fn(&str) -> Option<String>
    {
        if let Some(n) = parsed::<usize, _>(&lookup, WORKERS_ENV) {
            self = self.workers(n);
        }
        if let Some(name) = lookup(THREAD_NAME_ENV) {
            self = self.thread_name(name);
        }
        if let Some(size) = parsed::<usize, _>(&lookup, STACK_SIZE_ENV) {
            self = self.stack_size(size);
        }
        self
    }

    /// Set the number of general workers; 0 is treated as 1.
    pub fn workers(mut self, workers: usize) -> Config {
        self.workers = workers.max(1);
        self
    }

    /// Set the worker thread name.
    pub fn thread_name<S: Into<String>>(mut self, name: S) -> Config {
        self.thread_name = name.into();
        self
    }

    /// Set the worker stack size in bytes.
    pub fn stack_size(mut self, size: usize) -> Config {
        self.stack_size = Some(size);
        self
    }

    fn pinned_name(&self) -> String {
        format!("{}-pinned", self.thread_name)
    }

    /// Build a `Scheduler` backed by a `ThreadPool` of `workers` threads, plus one pinned worker.
    #[cfg(feature = "threadpool")]
    pub fn build(&self) -> Scheduler {
        debug!(workers = self.workers, name = %self.thread_name, "building thread pool scheduler");

        let mut lane = threadpool::Builder::new()
            .num_threads(self.workers.max(1))
            .thread_name(self.thread_name.clone());
        let mut pinned = threadpool::Builder::new()
            .num_threads(1)
            .thread_name(self.pinned_name());
        if let Some(size) = self.stack_size {
            lane = lane.thread_stack_size(size);
            pinned = pinned.thread_stack_size(size);
        }

        Scheduler::new(lane.build()).with_pinned(pinned.build())
    }

    /// Build a `Scheduler` which starts a thread per job, plus one pinned worker.
    #[cfg(not(feature = "threadpool"))]
    pub fn build(&self) -> Scheduler {
        debug!(name = %self.thread_name, "building thread-per-job scheduler");

        Scheduler::new(ThreadSpawner).with_pinned(SerialSpawner::named(self.pinned_name()))
    }
}

fn parsed<T, F>(lookup: &F, key: &str) -> Option<T>
    where T: FromStr, F: Fn(&str) -> Option<String>
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparsable setting");
            None
        },
    }
}
