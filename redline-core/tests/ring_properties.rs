//! Property-based tests for the ingest ring.
//!
//! Any interleaving of pushes and drains must behave like a bounded FIFO
//! that refuses the newest item when full.

use std::collections::VecDeque;

use proptest::prelude::*;
use redline_core::IngestRing;

const SIZE: usize = 16;

#[derive(Debug, Clone)]
enum Op {
    Push(u8),
    Drain(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => any::<u8>().prop_map(Op::Push),
        1 => (0usize..24).prop_map(Op::Drain),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_ring_is_bounded_fifo(ops in proptest::collection::vec(op(), 0..200)) {
        let mut ring: IngestRing<u8, SIZE> = IngestRing::new();
        let capacity = ring.capacity();
        let (mut producer, mut consumer) = ring.split();

        let mut model = VecDeque::new();
        let mut dropped = 0u32;

        for op in ops {
            match op {
                Op::Push(byte) => {
                    let queued = producer.push(byte);
                    if model.len() < capacity {
                        prop_assert!(queued);
                        model.push_back(byte);
                    } else {
                        prop_assert!(!queued);
                        dropped += 1;
                    }
                }
                Op::Drain(budget) => {
                    let mut out = Vec::new();
                    let taken = consumer.drain(budget, |byte| out.push(byte));
                    let expected: Vec<u8> = (0..budget.min(model.len()))
                        .filter_map(|_| model.pop_front())
                        .collect();
                    prop_assert_eq!(taken, expected.len());
                    prop_assert_eq!(out, expected);
                }
            }
            prop_assert_eq!(consumer.len(), model.len());
            prop_assert_eq!(producer.dropped(), dropped);
        }
    }
}
