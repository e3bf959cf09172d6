// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (C) 2025 Shahzad A. Bhatti <bhatti@plexobject.com>
//
// This file is part of LindaSpaces.
//
// LindaSpaces is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 2.1 of the License, or
// (at your option) any later version.
//
// LindaSpaces is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with LindaSpaces. If not, see <https://www.gnu.org/licenses/>.


//! Integration tests for blocking consume/peek semantics
//!
//! Covers the coordination scenarios callers rely on: single delivery of a
//! consumed tuple, non-destructive peeks, rejected malformed inserts, and
//! no lost or duplicated tuples under concurrent producers and consumers.
//! Blocking assertions go through the `_timeout` variants or a channel with a
//! receive timeout so a regression fails instead of hanging.

use lindaspaces_tuplespace::{
    pattern, tuple, Pattern, PatternField, TupleSpace, TupleSpaceConfig, TupleSpaceError,
    WaitRegistry, WakePolicy,
};
use std::collections::HashSet;
use std::sync::{mpsc, Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

const SHORT: Duration = Duration::from_millis(100);
const LONG: Duration = Duration::from_secs(10);

fn space_with(policy: WakePolicy) -> TupleSpace {
    TupleSpace::with_config(TupleSpaceConfig {
        name: format!("test-{:?}", policy).to_lowercase(),
        wake_policy: policy,
        ..TupleSpaceConfig::default()
    })
}

/// Spin until `count` callers are blocked in the space
fn wait_for_blocked(space: &TupleSpace, count: usize) {
    let deadline = Instant::now() + LONG;
    loop {
        let blocked: usize = space.waiting_patterns().iter().map(|(_, refs)| refs).sum();
        if blocked >= count {
            return;
        }
        assert!(Instant::now() < deadline, "expected {} blocked callers, saw {}", count, blocked);
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn test_consume_returns_tuple_once() {
    let space = TupleSpace::new();
    space.insert(tuple!("room1", "msg", "0", "hi")).unwrap();

    let pattern = pattern!("room1", "msg", "0", _);
    let taken = space.consume(&pattern).unwrap();
    assert_eq!(taken.fields(), &["room1", "msg", "0", "hi"]);

    // Nothing left: a second consume must block.
    assert_eq!(space.consume_timeout(&pattern, SHORT).unwrap(), None);
    assert!(space.waiting_patterns().is_empty());
}

#[test]
fn test_single_insert_wakes_exactly_one_of_two_consumers() {
    for policy in [WakePolicy::Broadcast, WakePolicy::Single] {
        let space = space_with(policy);
        let pattern = pattern!("room1", "msg", "0", _);
        let (tx, rx) = mpsc::channel();

        let handles: Vec<_> = (0..2)
            .map(|id| {
                let space = space.clone();
                let pattern = pattern.clone();
                let tx = tx.clone();
                thread::spawn(move || {
                    let tuple = space.consume(&pattern).unwrap();
                    tx.send((id, tuple)).unwrap();
                })
            })
            .collect();
        drop(tx);

        wait_for_blocked(&space, 2);
        space.insert(tuple!("room1", "msg", "0", "hi")).unwrap();

        let (first, tuple) = rx.recv_timeout(LONG).expect("no consumer was woken");
        assert_eq!(tuple, tuple!("room1", "msg", "0", "hi"));
        assert!(rx.recv_timeout(SHORT).is_err(), "second consumer returned without a tuple");

        // Release the other consumer so the thread can be joined.
        space.insert(tuple!("room1", "msg", "0", "bye")).unwrap();
        let (second, tuple) = rx.recv_timeout(LONG).expect("second consumer never woke");
        assert_ne!(first, second);
        assert_eq!(tuple, tuple!("room1", "msg", "0", "bye"));

        for handle in handles {
            handle.join().unwrap();
        }
        assert!(space.is_empty());
        assert!(space.waiting_patterns().is_empty());
    }
}

#[test]
fn test_peek_then_consume_removes_exactly_one() {
    let space = TupleSpace::new();
    space.insert(tuple!("room1", "msg", "0", "hi")).unwrap();
    space.insert(tuple!("room1", "msg", "1", "there")).unwrap();
    assert_eq!(space.len(), 2);

    let pattern = pattern!("room1", "msg", "0", _);
    let peeked = space.peek(&pattern).unwrap();
    assert_eq!(space.len(), 2);

    let consumed = space.consume(&pattern).unwrap();
    assert_eq!(peeked, consumed);
    assert_eq!(space.len(), 1);
}

#[test]
fn test_malformed_insert_stores_nothing() {
    let space = TupleSpace::new();
    let fields = vec![
        Some("room1".to_string()),
        Some("msg".to_string()),
        None,
        Some("hi".to_string()),
    ];

    let err = space.insert_fields(fields).unwrap_err();
    assert!(matches!(err, TupleSpaceError::MalformedTuple { position: 2 }));
    assert!(space.is_empty());
    assert_eq!(space.stats().rejected_inserts(), 1);

    let pattern = pattern!("room1", "msg", _, "hi");
    assert_eq!(space.consume_timeout(&pattern, SHORT).unwrap(), None);
}

#[test]
fn test_blocked_peek_leaves_tuple_for_consumer() {
    let space = TupleSpace::new();
    let peeker = {
        let space = space.clone();
        thread::spawn(move || space.peek(&pattern!("job", _)))
    };
    wait_for_blocked(&space, 1);

    space.insert(tuple!("job", "42")).unwrap();
    assert_eq!(peeker.join().unwrap().unwrap(), tuple!("job", "42"));
    assert_eq!(
        space.consume_timeout(&pattern!("job", "42"), LONG).unwrap(),
        Some(tuple!("job", "42"))
    );
}

#[test]
fn test_differing_arity_never_matches() {
    let space = TupleSpace::new();
    space.insert(tuple!("a", "b")).unwrap();
    space.insert(tuple!("a", "b", "c")).unwrap();

    assert_eq!(space.try_peek(&Pattern::wildcard(1)).unwrap(), None);
    assert_eq!(space.try_peek(&Pattern::wildcard(4)).unwrap(), None);
    assert_eq!(space.count(&Pattern::wildcard(2)), 1);
    assert_eq!(space.count(&Pattern::wildcard(3)), 1);

    let explicit = Pattern::new(vec![PatternField::from("a"), PatternField::Wildcard]);
    assert_eq!(space.try_consume(&explicit).unwrap(), Some(tuple!("a", "b")));
}

/// Producers and consumers race; every tuple is delivered exactly once
fn run_no_loss_no_duplicates(policy: WakePolicy) {
    const PRODUCERS: usize = 4;
    const CONSUMERS: usize = 4;
    const PER_PRODUCER: usize = 250;
    const PER_CONSUMER: usize = PRODUCERS * PER_PRODUCER / CONSUMERS;

    let space = space_with(policy);
    let barrier = Arc::new(Barrier::new(PRODUCERS + CONSUMERS));

    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|_| {
            let space = space.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                let pattern = pattern!("job", _, _);
                (0..PER_CONSUMER)
                    .map(|_| {
                        space
                            .consume_timeout(&pattern, LONG)
                            .unwrap()
                            .expect("consumer starved with tuples outstanding")
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let space = space.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                for i in 0..PER_PRODUCER {
                    space.insert(tuple!("job", p.to_string(), i.to_string())).unwrap();
                }
            })
        })
        .collect();

    for producer in producers {
        producer.join().unwrap();
    }

    let mut seen = HashSet::new();
    for consumer in consumers {
        for tuple in consumer.join().unwrap() {
            assert!(seen.insert(tuple.clone()), "tuple {} delivered twice", tuple);
        }
    }

    assert_eq!(seen.len(), PRODUCERS * PER_PRODUCER);
    assert!(space.is_empty());
    assert!(space.waiting_patterns().is_empty());

    let stats = space.stats();
    assert_eq!(stats.total_inserts(), (PRODUCERS * PER_PRODUCER) as u64);
    assert_eq!(stats.total_consumes(), (PRODUCERS * PER_PRODUCER) as u64);
}

#[test]
fn test_concurrent_consumers_broadcast_policy() {
    run_no_loss_no_duplicates(WakePolicy::Broadcast);
}

#[test]
fn test_concurrent_consumers_single_policy() {
    run_no_loss_no_duplicates(WakePolicy::Single);
}

/// Consumers on distinct but overlapping patterns share every inserted tuple
fn run_overlapping_consumers(policy: WakePolicy) {
    const ROUNDS: usize = 10;
    const TUPLES: usize = 120;

    let patterns = [
        pattern!("a", _),
        pattern!(_, "1"),
        pattern!(_, _),
        pattern!("a", "1"),
        pattern!("a", _),
        pattern!(_, "1"),
    ];

    for round in 0..ROUNDS {
        let space = space_with(policy);
        let (tx, rx) = mpsc::channel();
        let consumers: Vec<_> = patterns
            .iter()
            .cloned()
            .map(|pattern| {
                let space = space.clone();
                let tx = tx.clone();
                thread::spawn(move || {
                    let mut taken = 0;
                    // Stops once the producer is done and nothing more arrives.
                    while let Some(tuple) = space.consume_timeout(&pattern, SHORT * 5).unwrap() {
                        tx.send(tuple).unwrap();
                        taken += 1;
                    }
                    taken
                })
            })
            .collect();
        drop(tx);

        wait_for_blocked(&space, patterns.len());
        for _ in 0..TUPLES {
            space.insert(tuple!("a", "1")).unwrap();
        }

        let delivered: usize = consumers.into_iter().map(|c| c.join().unwrap()).sum();
        assert_eq!(delivered, TUPLES, "round {} ({:?})", round, policy);
        assert_eq!(rx.try_iter().count(), TUPLES);
        assert!(space.is_empty());
        assert!(space.waiting_patterns().is_empty());
    }
}

#[test]
fn test_overlapping_consumers_single_policy() {
    run_overlapping_consumers(WakePolicy::Single);
}

#[test]
fn test_overlapping_consumers_broadcast_policy() {
    run_overlapping_consumers(WakePolicy::Broadcast);
}

#[test]
fn test_one_insert_wakes_every_peeker() {
    for policy in [WakePolicy::Single, WakePolicy::Broadcast] {
        for _ in 0..20 {
            let space = space_with(policy);
            let patterns = [
                pattern!("cfg", _),
                pattern!("cfg", _),
                pattern!(_, "on"),
                pattern!(_, _),
                pattern!("cfg", "on"),
            ];

            let peekers: Vec<_> = patterns
                .iter()
                .cloned()
                .map(|pattern| {
                    let space = space.clone();
                    thread::spawn(move || space.peek_timeout(&pattern, LONG).unwrap())
                })
                .collect();

            wait_for_blocked(&space, patterns.len());
            space.insert(tuple!("cfg", "on")).unwrap();

            for peeker in peekers {
                assert_eq!(peeker.join().unwrap(), Some(tuple!("cfg", "on")), "{:?}", policy);
            }
            assert_eq!(space.len(), 1);
            assert!(space.waiting_patterns().is_empty());
        }
    }
}

#[test]
fn test_consumed_count_never_exceeds_inserted() {
    let space = TupleSpace::new();
    let pattern = pattern!("token", _);
    let barrier = Arc::new(Barrier::new(8));

    let consumers: Vec<_> = (0..8)
        .map(|_| {
            let space = space.clone();
            let pattern = pattern.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                space.consume_timeout(&pattern, Duration::from_secs(2)).unwrap()
            })
        })
        .collect();

    wait_for_blocked(&space, 1);
    for i in 0..3 {
        space.insert(tuple!("token", i.to_string())).unwrap();
    }

    let delivered: Vec<_> = consumers
        .into_iter()
        .filter_map(|handle| handle.join().unwrap())
        .collect();
    assert_eq!(delivered.len(), 3);
    assert!(space.is_empty());
    assert!(space.waiting_patterns().is_empty());
}

#[test]
fn test_unwinding_caller_releases_wait_handle() {
    let registry = Arc::new(WaitRegistry::new(WakePolicy::Broadcast));
    let worker = {
        let registry = registry.clone();
        thread::spawn(move || {
            let _guard = registry.acquire(&pattern!("never", _));
            panic!("caller interrupted while registered");
        })
    };

    assert!(worker.join().is_err());
    assert!(registry.is_empty());
}
