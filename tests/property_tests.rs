//! Property-based tests for the cursor protocol.
//!
//! Random operation sequences are checked against a `VecDeque` reference
//! model, plus targeted properties for batch atomicity, wrap-around, and
//! predicate consistency.

use proptest::prelude::*;
use ringmpmc_rs::{Behavior, Flags, Handle, Ring};
use std::collections::VecDeque;

fn behavior(fixed: bool) -> Behavior {
    if fixed {
        Behavior::Fixed
    } else {
        Behavior::Variable
    }
}

proptest! {
    /// Any single-threaded sequence of pushes and pops behaves exactly like a
    /// bounded FIFO holding at most `capacity - 1` handles.
    #[test]
    fn prop_matches_reference_model(
        ops in prop::collection::vec((prop::bool::ANY, 0usize..20, prop::bool::ANY), 1..200),
    ) {
        let ring = Ring::new(16, Flags::empty()).unwrap();
        let usable = ring.capacity() as usize - 1;
        let mut model: VecDeque<Handle> = VecDeque::new();
        let mut next_value: Handle = 1;

        for (is_push, len, fixed) in ops {
            if is_push {
                let batch: Vec<Handle> = (next_value..next_value + len).collect();
                next_value += len;

                let free = usable - model.len();
                let expected = match behavior(fixed) {
                    Behavior::Fixed => if len <= free { len } else { 0 },
                    Behavior::Variable => len.min(free),
                };

                let pushed = ring.push(&batch, behavior(fixed));
                prop_assert_eq!(pushed, expected);
                model.extend(&batch[..pushed]);
            } else {
                let mut out = vec![0; len];
                let expected = match behavior(fixed) {
                    Behavior::Fixed => if len <= model.len() { len } else { 0 },
                    Behavior::Variable => len.min(model.len()),
                };

                let popped = ring.pop(&mut out, behavior(fixed));
                prop_assert_eq!(popped, expected);
                for v in &out[..popped] {
                    prop_assert_eq!(*v, model.pop_front().unwrap());
                }
            }

            // Conservation: everything pushed and not yet popped is counted.
            prop_assert_eq!(ring.count(), model.len());
            prop_assert_eq!(ring.is_empty(), model.is_empty());
        }
    }

    /// Filling a ring to `capacity - 1` and draining it returns the pushed
    /// handles in order, for every accepted capacity shape.
    #[test]
    fn prop_round_trip(bits in 0u32..8) {
        let capacity = 1u32 << bits;
        let ring = Ring::new(capacity, Flags::empty()).unwrap();

        let batch: Vec<Handle> = (100..100 + capacity as usize - 1).collect();
        prop_assert_eq!(ring.push(&batch, Behavior::Fixed), batch.len());
        prop_assert!(ring.is_full());

        let mut out = vec![0; batch.len()];
        prop_assert_eq!(ring.pop(&mut out, Behavior::Fixed), batch.len());
        prop_assert_eq!(out, batch);
        prop_assert!(ring.is_empty());
    }

    /// Index wrap never reorders or corrupts a batch.
    #[test]
    fn prop_wrap_preserves_order(k in 1usize..7) {
        let ring = Ring::new(8, Flags::empty()).unwrap();

        let first: Vec<Handle> = (1..=k).collect();
        prop_assert_eq!(ring.push(&first, Behavior::Fixed), k);
        let mut out = vec![0; 7];
        prop_assert_eq!(ring.pop(&mut out[..k], Behavior::Fixed), k);

        // The second batch straddles the array boundary for every k.
        let second: Vec<Handle> = (10..17).collect();
        prop_assert_eq!(ring.push(&second, Behavior::Fixed), 7);
        prop_assert_eq!(ring.pop(&mut out, Behavior::Fixed), 7);
        prop_assert_eq!(out, second);
    }

    /// A FIXED batch either transfers completely or not at all.
    #[test]
    fn prop_fixed_batch_atomicity(prefill in 0usize..8, n in 0usize..10) {
        let ring = Ring::new(8, Flags::empty()).unwrap();
        let prefill_batch: Vec<Handle> = (0..prefill).collect();
        let prefilled = ring.push(&prefill_batch, Behavior::Variable);

        let free = 7 - prefilled;
        let batch: Vec<Handle> = (100..100 + n).collect();
        let pushed = ring.push(&batch, Behavior::Fixed);

        if n <= free {
            prop_assert_eq!(pushed, n);
        } else {
            prop_assert_eq!(pushed, 0);
        }
        prop_assert_eq!(ring.count(), prefilled + pushed);
    }

    /// Predicates agree with the committed occupancy after a quiescent push.
    #[test]
    fn prop_predicate_consistency(n in 0usize..10) {
        let ring = Ring::new(8, Flags::empty()).unwrap();
        let batch: Vec<Handle> = (0..n).collect();
        let pushed = ring.push(&batch, Behavior::Variable);

        prop_assert_eq!(pushed, n.min(7));
        prop_assert_eq!(ring.count(), pushed);
        prop_assert_eq!(ring.avail(), 7 - pushed);
        prop_assert_eq!(ring.is_empty(), pushed == 0);
        prop_assert_eq!(ring.is_full(), pushed == 7);
    }

    /// A VARIABLE push against a non-full ring makes progress; against a full
    /// ring it reports 0. Symmetric for pop.
    #[test]
    fn prop_variable_progress(prefill in 0usize..8) {
        let ring = Ring::new(8, Flags::empty()).unwrap();
        let prefill_batch: Vec<Handle> = (0..prefill).collect();
        let prefilled = ring.push(&prefill_batch, Behavior::Variable);

        let pushed = ring.push(&[99, 98], Behavior::Variable);
        if prefilled < 7 {
            prop_assert!(pushed >= 1);
        } else {
            prop_assert_eq!(pushed, 0);
        }

        let mut out = [0; 2];
        let popped = ring.pop(&mut out, Behavior::Variable);
        if prefilled + pushed > 0 {
            prop_assert!(popped >= 1);
        } else {
            prop_assert_eq!(popped, 0);
        }
    }
}
