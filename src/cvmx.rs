use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

// A Condvar and its Mutex
pub struct CvMx<T> {
    pub cv: Condvar,
    pub mx: Mutex<T>,
}

impl<T> CvMx<T> {
    pub fn new(v: T) -> CvMx<T> {
        CvMx {
            cv: Condvar::new(),
            mx: Mutex::new(v),
        }
    }

    // Sleep on the condvar until `probe` yields something.
    pub fn wait_map<R, F>(&self, mut probe: F) -> R
        where F: FnMut(&mut T) -> Option<R>
    {
        let mut lk = self.mx.lock();
        loop {
            if let Some(r) = probe(&mut lk) {
                return r;
            }
            self.cv.wait(&mut lk);
        }
    }

    // As `wait_map`, but give up once `timeout` has passed. A timeout too long to be represented
    // as a deadline waits forever.
    pub fn wait_map_for<R, F>(&self, mut probe: F, timeout: Duration) -> Option<R>
        where F: FnMut(&mut T) -> Option<R>
    {
        let deadline = match Instant::now().checked_add(timeout) {
            Some(deadline) => deadline,
            None => return Some(self.wait_map(probe)),
        };
        let mut lk = self.mx.lock();
        loop {
            if let Some(r) = probe(&mut lk) {
                return Some(r);
            }
            if self.cv.wait_until(&mut lk, deadline).timed_out() {
                return probe(&mut lk);
            }
        }
    }
}
