//! Miri-compatible tests for detecting undefined behavior.
//!
//! Run with: `cargo +nightly miri test --test miri_tests`
//!
//! These tests exercise the unsafe paths (raw slot copies, the boundary-split
//! wrap copy, the typed adapter's pointer round-trip) single-threaded, where
//! Miri can observe every access.

use ringmpmc_rs::{Behavior, BoxQueue, Flags, Ring};

/// Basic push/pop through the CAS reservation paths.
#[test]
fn miri_basic_push_pop() {
    let ring = Ring::new(4, Flags::empty()).unwrap();

    assert_eq!(ring.push(&[100, 200], Behavior::Fixed), 2);
    let mut out = [0; 2];
    assert_eq!(ring.pop(&mut out, Behavior::Fixed), 2);
    assert_eq!(out, [100, 200]);
}

/// Fill and drain repeatedly to exercise index wrap.
#[test]
fn miri_wrap_rounds() {
    let ring = Ring::new(4, Flags::empty()).unwrap();

    for round in 0..5 {
        let batch = [round * 10, round * 10 + 1, round * 10 + 2];
        assert_eq!(ring.push(&batch, Behavior::Fixed), 3);

        let mut out = [0; 3];
        assert_eq!(ring.pop(&mut out, Behavior::Fixed), 3);
        assert_eq!(out, batch);
    }
}

/// A batch that straddles the array boundary uses the split copy.
#[test]
fn miri_boundary_split_copy() {
    let ring = Ring::new(4, Flags::empty()).unwrap();

    assert_eq!(ring.push(&[1, 2], Behavior::Fixed), 2);
    let mut out = [0; 2];
    assert_eq!(ring.pop(&mut out, Behavior::Fixed), 2);

    // Cursors now sit at 2; a batch of 3 wraps past index 3.
    assert_eq!(ring.push(&[3, 4, 5], Behavior::Fixed), 3);
    let mut out = [0; 3];
    assert_eq!(ring.pop(&mut out, Behavior::Fixed), 3);
    assert_eq!(out, [3, 4, 5]);
}

/// Short counts leave the untouched part of the output buffer alone.
#[test]
fn miri_variable_short_count() {
    let ring = Ring::new(4, Flags::empty()).unwrap();

    assert_eq!(ring.push(&[7, 8, 9, 10, 11], Behavior::Variable), 3);

    let mut out = [0xdead; 5];
    assert_eq!(ring.pop(&mut out, Behavior::Variable), 3);
    assert_eq!(out, [7, 8, 9, 0xdead, 0xdead]);
    assert_eq!(ring.pop(&mut out, Behavior::Variable), 0);
}

/// The typed adapter round-trips box pointers without leaking or
/// double-freeing.
#[test]
fn miri_box_queue_round_trip() {
    let queue = BoxQueue::<String>::new(4, Flags::empty()).unwrap();

    queue.push(Box::new(String::from("hello"))).unwrap();
    queue.push(Box::new(String::from("world"))).unwrap();

    assert_eq!(*queue.pop().unwrap(), "hello");
    assert_eq!(*queue.pop().unwrap(), "world");
    assert!(queue.pop().is_none());
}

/// Values still queued when the adapter drops are freed.
#[test]
fn miri_box_queue_drop_with_items() {
    let queue = BoxQueue::<Vec<u8>>::new(8, Flags::empty()).unwrap();

    for i in 0..5 {
        queue.push(Box::new(vec![i; 16])).unwrap();
    }
    assert_eq!(*queue.pop().unwrap(), vec![0; 16]);
    // Queue drops here with four boxed vectors still inside.
}

/// A push rejected by a full queue hands the box back intact.
#[test]
fn miri_box_queue_full_returns_value() {
    let queue = BoxQueue::<u64>::new(2, Flags::empty()).unwrap();

    queue.push(Box::new(1)).unwrap();
    let err = queue.push(Box::new(2)).unwrap_err();
    assert_eq!(*err.0, 2);
}
