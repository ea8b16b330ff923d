use std::sync::mpsc::channel;
use std::time::Duration;

use parking_lot::Mutex;

use pledge::{clear_unhandled_rejection_hook, promise, set_unhandled_rejection_hook, Promise};

mod common;
use common::{init_test_logging, sleep_ms};

// The hook is process wide, so everything which depends on it lives in one test.
#[test]
fn unhandled_rejections() {
    init_test_logging();
    let (tx, rx) = channel();
    let tx = Mutex::new(tx);
    set_unhandled_rejection_hook(move |reason, value_type| {
        let _ = tx.lock().send((reason.to_string(), value_type));
    });
    let next = |timeout| rx.recv_timeout(Duration::from_millis(timeout)).ok();

    // Never looked at.
    drop(Promise::<u32>::rejected("ignored rejection"));
    assert_eq!(next(1000), Some(("ignored rejection".to_string(), "u32")));

    // Handled by a reaction, waited on, or peeked at.
    drop(Promise::<u32>::rejected("caught").catch(|_| 0).wait());
    let waited = Promise::<u32>::rejected("waited");
    assert!(waited.wait().is_err());
    drop(waited);
    let (p, r) = promise::<u32>();
    r.reject("peeked");
    assert!(p.peek().is_some());
    drop((p, r));
    sleep_ms(50);
    assert_eq!(next(10), None);

    // The end of an unconsumed chain is reported; its source isn't.
    let (p, r) = promise::<String>();
    drop(p.then(|s| s.len()));
    drop(p);
    r.reject("end of chain");
    drop(r);
    assert_eq!(next(1000), Some(("end of chain".to_string(), "usize")));

    // A panicking hook is contained.
    set_unhandled_rejection_hook(|_, _| panic!("hook failed"));
    drop(Promise::<u8>::rejected("into a broken hook"));

    clear_unhandled_rejection_hook();
    drop(Promise::<u8>::rejected("only logged"));
}
