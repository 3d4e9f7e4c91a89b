use super::*;

use std::{sync::Barrier, thread};

#[test]
fn second_begin_is_rejected_until_end() {
    let guard = MutationGuard::new(ActionClass::Register);

    assert!(guard.try_begin(&"X"));
    assert!(!guard.try_begin(&"X"));

    guard.end(&"X");
    assert!(guard.try_begin(&"X"));
}

#[test]
fn entities_are_independent() {
    let guard = MutationGuard::new(ActionClass::Disable);

    assert!(guard.try_begin(&1_i64));
    assert!(guard.try_begin(&2_i64));
    assert_eq!(guard.in_flight_count(), 2);
}

#[test]
fn action_classes_are_independent() {
    let register = MutationGuard::new(ActionClass::Register);
    let disable = MutationGuard::new(ActionClass::Disable);

    assert!(register.try_begin(&"acct-1"));
    assert!(disable.try_begin(&"acct-1"));
    assert!(!register.try_begin(&"acct-1"));
}

#[test]
fn end_without_begin_is_harmless() {
    let guard: MutationGuard<&str> = MutationGuard::new(ActionClass::Enable);
    guard.end(&"ghost");
    assert!(guard.try_begin(&"ghost"));
}

#[test]
fn ticket_clears_marker_on_drop() {
    let guard = MutationGuard::new(ActionClass::Register);

    {
        let ticket = guard.begin(&7_i64).expect("first begin");
        assert_eq!(*ticket.key(), 7);
        assert!(guard.is_in_flight(&7));
        assert!(guard.begin(&7).is_none());
    }

    assert!(!guard.is_in_flight(&7));
    assert!(guard.begin(&7).is_some());
}

#[test]
fn ticket_clears_marker_when_operation_panics() {
    let guard = MutationGuard::new(ActionClass::Enable);
    let worker_guard = guard.clone();

    let result = thread::spawn(move || {
        let _ticket = worker_guard.begin(&"acct").expect("begin");
        panic!("operation blew up");
    })
    .join();

    assert!(result.is_err());
    assert!(!guard.is_in_flight(&"acct"));
}

#[test]
fn concurrent_begins_admit_exactly_one() {
    const CALLERS: usize = 16;
    let guard = MutationGuard::new(ActionClass::Register);
    let barrier = std::sync::Arc::new(Barrier::new(CALLERS));

    let handles: Vec<_> = (0..CALLERS)
        .map(|_| {
            let guard = guard.clone();
            let barrier = std::sync::Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                guard.try_begin(&"shared")
            })
        })
        .collect();

    let admitted = handles
        .into_iter()
        .map(|handle| handle.join().expect("join"))
        .filter(|admitted| *admitted)
        .count();
    assert_eq!(admitted, 1);
}
