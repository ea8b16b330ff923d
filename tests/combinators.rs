use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use pledge::{all, all_with, any, defer, promise, promise_in, race, race_with, Config, Error,
             Promise, Thenable};

mod common;
use common::{init_test_logging, sleep_ms};

#[test]
fn all_in_input_order() {
    init_test_logging();
    // Later inputs finish first.
    let work: Vec<_> = (0..5u64)
        .map(|i| defer(move || { sleep_ms((5 - i) * 10); i * 100 }))
        .collect();

    assert_eq!(all(work).wait().ok(), Some(vec![0, 100, 200, 300, 400]));
}

#[test]
fn all_first_rejection_wins() {
    init_test_logging();
    let (a, ra) = promise::<u32>();
    let (b, rb) = promise::<u32>();
    let (c, rc) = promise::<u32>();
    let p = all(vec![a, b, c]);

    rb.reject("b failed");
    rc.reject("c failed");
    ra.resolve(1);

    assert_eq!(p.wait().err().map(|e| e.to_string()), Some("b failed".to_string()));
}

#[test]
fn all_leaves_other_inputs_alone() {
    let finished = Arc::new(AtomicBool::new(false));
    let f = finished.clone();

    let slow = defer(move || { sleep_ms(30); f.store(true, Ordering::SeqCst); 1 });
    let p = all(vec![Promise::rejected("early"), slow.clone()]);

    assert!(p.wait().is_err());
    assert_eq!(slow.wait().ok(), Some(1));
    assert!(finished.load(Ordering::SeqCst));
}

#[test]
fn race_fastest_wins() {
    init_test_logging();
    let slow = defer(|| { sleep_ms(200); "slow" });
    let fast = defer(|| { sleep_ms(10); "fast" });

    let p = race(vec![slow, fast]).expect("inputs");
    assert_eq!(p.wait().ok(), Some("fast"));
}

#[test]
fn race_rejection_can_win() {
    let (never, _r) = promise::<u32>();
    let failing = defer(|| sleep_ms(10)).try_then(|()| Err::<u32, _>(Error::Rejected("timed out".into())));

    let why = race(vec![never, failing]).expect("inputs").wait().unwrap_err();
    assert_eq!(why.downcast_ref::<Error>(), Some(&Error::Rejected("timed out".into())));
}

#[test]
fn race_later_settlements_ignored() {
    let (a, ra) = promise();
    let (b, rb) = promise();
    let p = race(vec![a, b]).expect("inputs");

    rb.resolve(2);
    ra.reject("late");
    assert_eq!(p.wait().ok(), Some(2));
}

#[test]
fn race_nothing() {
    let sched = Config::default().workers(1).build();
    match race_with(Vec::<Promise<()>>::new(), &sched) {
        Err(Error::InvalidArgument(msg)) => assert!(msg.contains("at least one")),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn any_skips_rejections() {
    let (slow, r) = promise();
    let p = any(vec![Promise::rejected("a"), slow, Promise::rejected("c")]);

    sleep_ms(10);
    assert!(p.is_pending());
    r.resolve("b");
    assert_eq!(p.wait().ok(), Some("b"));
}

#[test]
fn combinators_on_own_scheduler() {
    let sched = Config::default().workers(2).thread_name("combine").build();

    let inputs: Vec<_> = (1..=4).map(|i| sched.defer(false, move || i * i)).collect();
    let total = all_with(inputs, &sched).then(|v: Vec<i32>| v.into_iter().sum::<i32>());
    assert_eq!(total.wait().ok(), Some(30));

    let (p, r) = promise_in::<u8>(&sched);
    let first = race_with(vec![p, Promise::resolved_in(9, &sched)], &sched).expect("inputs");
    r.resolve(1);
    assert_eq!(first.wait().ok(), Some(9));
}

#[test]
fn all_of_mixed_types() {
    let words = Promise::resolved(vec!["a", "b"]);
    let count = defer(|| { sleep_ms(10); 2usize });
    let flag = Promise::resolved(true);

    let mixed: Vec<Box<dyn Thenable>> = vec![Box::new(words), Box::new(count), Box::new(flag)];
    let names: Vec<_> = mixed.iter().map(|t| t.settlement_type()).collect();
    assert!(names[0].contains("Vec"));
    assert_eq!(names[1..], ["usize", "bool"]);

    let done = all(mixed.iter().map(|t| t.chain()));
    assert_eq!(done.wait().map(|v| v.len()).ok(), Some(3));
}
