use std::collections::{HashMap, VecDeque};
use std::fmt::{self, Formatter, Debug};
use std::task::Waker;

use crate::error::Reason;

// A registered reaction, handed the outcome once the cell settles.
pub type Reaction<T> = Box<dyn FnOnce(Result<T, Reason>) + Send + 'static>;

pub enum Settlement<T> {
    Pending,
    Fulfilled(T),
    Rejected(Reason),
}

// Everything behind a cell's lock.
pub struct Cell<T> {
    pub state: Settlement<T>,
    pub locked: bool,                   // adopting another promise's outcome
    pub queue: VecDeque<Reaction<T>>,   // reactions not yet dispatched, in registration order
    pub draining: bool,                 // a dispatch turn is scheduled or running
    pub wakers: HashMap<usize, Waker>,  // async waiters, one slot per polling handle
    pub next_waker: usize,
    pub observed: bool,                 // someone consumed (or will consume) the outcome
}

impl<T> Cell<T> {
    pub fn pending() -> Cell<T> {
        Cell {
            state: Settlement::Pending,
            locked: false,
            queue: VecDeque::new(),
            draining: false,
            wakers: HashMap::new(),
            next_waker: 0,
            observed: false,
        }
    }

    pub fn settled(outcome: Result<T, Reason>) -> Cell<T> {
        let mut cell = Cell::pending();
        cell.state = Settlement::from(outcome);
        cell
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, Settlement::Pending)
    }
}

impl<T: Clone> Cell<T> {
    pub fn outcome(&self) -> Option<Result<T, Reason>> {
        match self.state {
            Settlement::Pending => None,
            Settlement::Fulfilled(ref v) => Some(Ok(v.clone())),
            Settlement::Rejected(ref r) => Some(Err(r.clone())),
        }
    }
}

impl<T> From<Result<T, Reason>> for Settlement<T> {
    fn from(outcome: Result<T, Reason>) -> Settlement<T> {
        match outcome {
            Ok(v) => Settlement::Fulfilled(v),
            Err(r) => Settlement::Rejected(r),
        }
    }
}

impl<T: Debug> Debug for Cell<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self.state {
            Settlement::Pending if self.locked => write!(f, "Pending(locked, {} reactions)", self.queue.len()),
            Settlement::Pending => write!(f, "Pending({} reactions)", self.queue.len()),
            Settlement::Fulfilled(ref v) => write!(f, "Fulfilled({:?})", v),
            Settlement::Rejected(ref r) => write!(f, "Rejected({})", r),
        }
    }
}
