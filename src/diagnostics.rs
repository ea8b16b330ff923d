//! Reporting of rejections nobody looked at.
//!
//! A rejected promise is *unhandled* if it is dropped without a reaction ever being registered on
//! it, and without anyone having waited on or awaited it. Such a rejection is always logged at
//! `warn` level, and is also passed to the hook installed with `set_unhandled_rejection_hook`, if
//! any.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::{const_rwlock, RwLock};
use tracing::{debug, warn};

use crate::error::Reason;

type Hook = Arc<dyn Fn(&Reason, &'static str) + Send + Sync + 'static>;

static HOOK: RwLock<Option<Hook>> = const_rwlock(None);

/// Install `hook` to be told about unhandled rejections, replacing any previous hook.
///
/// The hook is passed the rejection reason and the name of the promise's value type. It runs on
/// whichever thread drops the last handle to the promise.
///
/// ```
/// # use pledge::{Promise, set_unhandled_rejection_hook, clear_unhandled_rejection_hook};
/// # use std::sync::mpsc::channel;
/// # use std::sync::Mutex;
/// let (tx, rx) = channel();
/// let tx = Mutex::new(tx);
/// set_unhandled_rejection_hook(move |reason, _| {
///     let _ = tx.lock().unwrap().send(reason.to_string());
/// });
///
/// drop(Promise::<u32>::rejected("nobody cares"));
/// assert_eq!(rx.recv().unwrap(), "nobody cares");
/// clear_unhandled_rejection_hook();
/// ```
pub fn set_unhandled_rejection_hook<F>(hook: F)
    where F: Fn(&Reason, &'static str) + Send + Sync + 'static
{
    *HOOK.write() = Some(Arc::new(hook));
}

/// Remove the hook installed by `set_unhandled_rejection_hook`. Rejections are still logged.
pub fn clear_unhandled_rejection_hook() {
    *HOOK.write() = None;
}

pub(crate) fn unhandled(reason: &Reason, value_type: &'static str) {
    warn!(%reason, value_type, "unhandled promise rejection");

    let hook = HOOK.read().clone();
    if let Some(hook) = hook {
        // Called from Drop, so a panicking hook must not escape.
        if panic::catch_unwind(AssertUnwindSafe(|| hook(reason, value_type))).is_err() {
            debug!("unhandled rejection hook panicked");
        }
    }
}
