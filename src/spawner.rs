use std::fmt::{self, Formatter, Debug};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};
use std::sync::mpsc::{channel, Sender};
use std::thread;

use parking_lot::Mutex;
use tracing::error;

use crate::config::Config;

/// A unit of work handed to a `Spawner`.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// A trait for running work on some other thread.
///
/// This is the host facility every promise relies on: settling a promise never runs its reactions
/// directly, it hands a `Job` to a `Spawner` instead.
pub trait Spawner: Send + Sync + 'static {
    /// Arrange for `job` to run later, on whatever thread the implementation chooses.
    fn spawn(&self, job: Job);
}

/// An implementation of `Spawner` that creates a normal `std::thread` per job.
///
/// If a thread can't be created the job is dropped and an error logged. A dropped dispatch turn
/// leaves its reactions queued; they are retried by the next settlement or registration on the
/// same promise.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSpawner;

impl Spawner for ThreadSpawner {
    fn spawn(&self, job: Job) {
        if let Err(err) = thread::Builder::new().spawn(job) {
            error!(%err, "failed to spawn thread; job dropped");
        }
    }
}

/// An implementation of `Spawner` that runs every job on one dedicated thread, in submission
/// order.
///
/// The thread is started lazily and exits once the spawner is dropped. A job which panics is
/// logged and the thread carries on with the next one.
#[derive(Default)]
pub struct SerialSpawner {
    name: Option<String>,
    tx: Mutex<Option<Sender<Job>>>,
}

impl SerialSpawner {
    /// Create a `SerialSpawner` whose thread carries `name`.
    pub fn named<S: Into<String>>(name: S) -> SerialSpawner {
        SerialSpawner { name: Some(name.into()), tx: Mutex::new(None) }
    }

    fn start(&self) -> Option<Sender<Job>> {
        let (tx, rx) = channel::<Job>();
        let mut builder = thread::Builder::new();
        if let Some(ref name) = self.name {
            builder = builder.name(name.clone());
        }
        let worker = move || {
            for job in rx {
                // A panicking job must not take the worker, and every later job, with it.
                if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                    error!("job panicked on serial worker");
                }
            }
        };
        match builder.spawn(worker) {
            Ok(_) => Some(tx),
            Err(err) => {
                error!(%err, "failed to start serial worker");
                None
            }
        }
    }
}

impl Spawner for SerialSpawner {
    fn spawn(&self, job: Job) {
        let mut tx = self.tx.lock();
        if tx.is_none() {
            *tx = self.start();
        }
        match *tx {
            Some(ref sender) => {
                if sender.send(job).is_err() {
                    error!("serial worker has gone; job dropped");
                }
            },
            None => error!("no serial worker; job dropped"),
        }
    }
}

impl Debug for SerialSpawner {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "SerialSpawner({:?})", self.name)
    }
}

/// An implementation of `Spawner` that runs jobs on a `ThreadPool`.
#[cfg(feature = "threadpool")]
impl Spawner for threadpool::ThreadPool {
    fn spawn(&self, job: Job) {
        self.execute(job)
    }
}

/// Handle on the host scheduling facility.
///
/// A `Scheduler` has two lanes. The general lane runs reactions and deferred work wherever its
/// `Spawner` likes. The pinned lane backs `same_thread` requests: work submitted there always
/// runs on one dedicated worker, one job at a time, in submission order.
///
/// Every promise remembers the `Scheduler` it was created with, and promises derived from it by
/// chaining inherit it.
///
/// ```
/// # use pledge::{Scheduler, ThreadSpawner, promise_in};
/// let sched = Scheduler::new(ThreadSpawner);
/// let (p, r) = promise_in(&sched);
/// let p = p.then(|v: u32| v * 2);
/// r.resolve(21);
/// assert_eq!(p.wait().ok(), Some(42));
/// ```
#[derive(Clone)]
pub struct Scheduler {
    lane: Arc<dyn Spawner>,
    pinned: Arc<dyn Spawner>,
}

static GLOBAL: OnceLock<Scheduler> = OnceLock::new();

impl Scheduler {
    /// Build a `Scheduler` which uses `spawner` for both lanes.
    pub fn new<S: Spawner>(spawner: S) -> Scheduler {
        let lane: Arc<dyn Spawner> = Arc::new(spawner);
        Scheduler { pinned: lane.clone(), lane }
    }

    /// Replace the pinned lane.
    pub fn with_pinned<S: Spawner>(mut self, spawner: S) -> Scheduler {
        self.pinned = Arc::new(spawner);
        self
    }

    /// Run `f` on the general lane.
    pub fn spawn<F>(&self, f: F)
        where F: FnOnce() + Send + 'static
    {
        self.lane.spawn(Box::new(f))
    }

    /// Run `f` on the pinned lane.
    pub fn spawn_pinned<F>(&self, f: F)
        where F: FnOnce() + Send + 'static
    {
        self.pinned.spawn(Box::new(f))
    }

    pub(crate) fn spawn_job(&self, job: Job) {
        self.lane.spawn(job)
    }

    /// The process-wide default `Scheduler`.
    ///
    /// Built from `Config::from_env()` on first use unless one was installed with `set_global`.
    pub fn global() -> Scheduler {
        GLOBAL.get_or_init(|| Config::from_env().build()).clone()
    }

    /// Install the process-wide default `Scheduler`.
    ///
    /// This only works before the default has been used or installed; otherwise `scheduler` is
    /// handed back.
    pub fn set_global(scheduler: Scheduler) -> Result<(), Scheduler> {
        GLOBAL.set(scheduler)
    }
}

impl Debug for Scheduler {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Scheduler {{ .. }}")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::channel;
    use std::thread;
    use std::time::Duration;
    use super::*;

    #[test]
    fn serial_order() {
        let s = SerialSpawner::named("serial-test");
        let (tx, rx) = channel();

        for i in 0..20 {
            let tx = tx.clone();
            s.spawn(Box::new(move || {
                if i % 3 == 0 { thread::sleep(Duration::from_millis(2)) }
                tx.send((i, thread::current().name().map(String::from))).expect("send");
            }));
        }

        let got: Vec<_> = rx.iter().take(20).collect();
        assert_eq!(got.iter().map(|g| g.0).collect::<Vec<_>>(), (0..20).collect::<Vec<_>>());
        assert!(got.iter().all(|g| g.1.as_ref().map(|n| n.as_str()) == Some("serial-test")));
    }

    #[test]
    fn serial_survives_panic() {
        let s = SerialSpawner::named("serial-panic");
        let (tx, rx) = channel();

        s.spawn(Box::new(|| panic!("job failed")));
        s.spawn(Box::new(move || tx.send(1).expect("send")));

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).ok(), Some(1));
    }

    #[test]
    fn pinned_defer_after_panic() {
        let sched = Scheduler::new(ThreadSpawner).with_pinned(SerialSpawner::named("pinned-panic"));

        sched.spawn_pinned(|| panic!("pinned job failed"));
        let p = sched.defer(true, || 5);
        assert_eq!(p.wait_timeout(Duration::from_secs(5)).and_then(|v| v.ok()), Some(5));
    }

    #[test]
    fn lanes() {
        let sched = Scheduler::new(ThreadSpawner).with_pinned(SerialSpawner::default());
        let (tx, rx) = channel();

        let t = tx.clone();
        sched.spawn(move || t.send("lane").expect("send"));
        sched.spawn_pinned(move || tx.send("pinned").expect("send"));

        let mut got: Vec<_> = rx.iter().take(2).collect();
        got.sort();
        assert_eq!(got, vec!["lane", "pinned"]);
    }

    #[cfg(feature = "threadpool")]
    #[test]
    fn pool() {
        let sched = Scheduler::new(threadpool::ThreadPool::new(2));
        let (tx, rx) = channel();

        for i in 0..4 {
            let tx = tx.clone();
            sched.spawn(move || tx.send(i).expect("send"));
        }

        let mut got: Vec<_> = rx.iter().take(4).collect();
        got.sort();
        assert_eq!(got, vec![0, 1, 2, 3]);
    }
}
