// tests/target_queue.rs

mod common;
use crate::common::builders::{StaticResolver, ids};
use crate::common::init_tracing;

use stampede::dag::{TargetQueue, WorkUnit};
use stampede::errors::StampedeError;

fn unit(names: &[&str]) -> WorkUnit {
    WorkUnit::new(ids(names))
}

/// A -> B -> C -> D, where D is the root and A has no dependencies.
fn linear_chain() -> TargetQueue {
    StaticResolver::new()
        .target("D", &["C"])
        .target("C", &["B"])
        .target("B", &["A"])
        .target("A", &[])
        .queue(&["D"])
}

/// B and C depend on A; D depends on B and C.
fn fan_in() -> TargetQueue {
    StaticResolver::new()
        .target("D", &["B", "C"])
        .target("B", &["A"])
        .target("C", &["A"])
        .target("A", &[])
        .queue(&["D"])
}

#[test]
fn linear_chain_is_fused_into_one_unit() {
    init_tracing();
    let mut queue = linear_chain();

    let units = queue.dequeue_work(&[], 1).unwrap();
    assert_eq!(units, vec![unit(&["A", "B", "C", "D"])]);
    assert!(!queue.has_ready_work());

    for name in ["A", "B", "C", "D"] {
        let state = queue.state_of(name).unwrap();
        assert!(state.claimed, "{name} should be claimed");
        assert!(!state.ready, "{name} should not be ready");
    }
}

#[test]
fn fused_chain_finishes_without_new_work() {
    init_tracing();
    let mut queue = linear_chain();
    queue.dequeue_work(&[], 1).unwrap();

    let units = queue.dequeue_work(&ids(&["A", "B", "C", "D"]), 1).unwrap();
    assert!(units.is_empty());
    assert!(queue.is_complete());

    let stats = queue.stats();
    assert_eq!(stats.total, 4);
    assert_eq!(stats.finished, 4);
    assert_eq!(stats.ready, 0);
}

#[test]
fn fan_in_hands_out_siblings_separately_and_join_last() {
    init_tracing();
    let mut queue = fan_in();

    // A has two dependents, so it cannot be fused with either.
    let units = queue.dequeue_work(&[], 2).unwrap();
    assert_eq!(units, vec![unit(&["A"])]);

    let units = queue.dequeue_work(&ids(&["A"]), 2).unwrap();
    assert_eq!(units, vec![unit(&["B"]), unit(&["C"])]);

    // D still waits for C.
    let units = queue.dequeue_work(&ids(&["B"]), 2).unwrap();
    assert!(units.is_empty());
    assert_eq!(queue.state_of("D").unwrap().unsatisfied, 1);

    let units = queue.dequeue_work(&ids(&["C"]), 2).unwrap();
    assert_eq!(units, vec![unit(&["D"])]);

    queue.dequeue_work(&ids(&["D"]), 0).unwrap();
    assert!(queue.is_complete());
}

#[test]
fn capacity_limits_number_of_units() {
    init_tracing();
    let mut queue = StaticResolver::new()
        .target("a", &[])
        .target("b", &[])
        .target("c", &[])
        .target("d", &[])
        .target("e", &[])
        .queue(&["a", "b", "c", "d", "e"]);

    let units = queue.dequeue_work(&[], 2).unwrap();
    assert_eq!(units, vec![unit(&["a"]), unit(&["b"])]);
    assert_eq!(queue.ready_targets(), vec!["c", "d", "e"]);
    assert_eq!(queue.stats().ready, 3);
}

#[test]
fn zero_capacity_processes_completions_only() {
    init_tracing();
    let mut queue = StaticResolver::new()
        .target("C", &["A", "B"])
        .target("A", &[])
        .target("B", &[])
        .queue(&["C"]);

    let units = queue.dequeue_work(&[], 5).unwrap();
    assert_eq!(units, vec![unit(&["A"]), unit(&["B"])]);

    let units = queue.dequeue_work(&ids(&["A"]), 0).unwrap();
    assert!(units.is_empty());
    assert_eq!(queue.stats().finished, 1);
    assert!(queue.state_of("A").unwrap().finished);
    assert_eq!(queue.state_of("C").unwrap().unsatisfied, 1);

    // Completing the last dependency with a zero-capacity request still readies C.
    let units = queue.dequeue_work(&ids(&["B"]), 0).unwrap();
    assert!(units.is_empty());
    assert!(queue.has_ready_work());
    assert_eq!(queue.ready_targets(), vec!["C"]);
}

#[test]
fn claimed_dependent_is_not_readied_again() {
    init_tracing();
    let mut queue = StaticResolver::new()
        .target("B", &["A"])
        .target("A", &[])
        .queue(&["B"]);

    assert_eq!(queue.dequeue_work(&[], 1).unwrap(), vec![unit(&["A", "B"])]);

    // B becomes resolved, but it is already in the unit being built.
    let units = queue.dequeue_work(&ids(&["A"]), 3).unwrap();
    assert!(units.is_empty());
    let state = queue.state_of("B").unwrap();
    assert_eq!(state.unsatisfied, 0);
    assert!(state.claimed);
    assert!(!state.ready);
}

#[test]
fn double_finish_is_a_protocol_violation() {
    init_tracing();
    let mut queue = fan_in();
    queue.dequeue_work(&[], 1).unwrap();
    queue.dequeue_work(&ids(&["A"]), 0).unwrap();

    let err = queue.dequeue_work(&ids(&["A"]), 0).unwrap_err();
    assert!(matches!(err, StampedeError::ProtocolViolation(_)), "{err:?}");
    assert!(err.is_fatal());
}

#[test]
fn double_finish_within_one_batch_is_a_protocol_violation() {
    let mut queue = fan_in();
    queue.dequeue_work(&[], 1).unwrap();

    let err = queue.dequeue_work(&ids(&["A", "A"]), 1).unwrap_err();
    assert!(matches!(err, StampedeError::ProtocolViolation(_)), "{err:?}");
}

#[test]
fn unknown_finished_target_is_a_protocol_violation() {
    let mut queue = fan_in();

    let err = queue.dequeue_work(&ids(&["//nowhere:x"]), 1).unwrap_err();
    match err {
        StampedeError::ProtocolViolation(msg) => assert!(msg.contains("//nowhere:x")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn chain_from_claimed_target_fails() {
    let mut queue = fan_in();
    queue.dequeue_work(&[], 1).unwrap();

    let err = queue.chain_from("A").unwrap_err();
    match err {
        StampedeError::ProtocolViolation(msg) => {
            assert!(msg.contains("already part of a work unit"), "{msg}")
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn chain_from_unready_target_fails() {
    let mut queue = fan_in();

    let err = queue.chain_from("D").unwrap_err();
    assert!(matches!(err, StampedeError::ProtocolViolation(_)), "{err:?}");
    assert!(!queue.state_of("D").unwrap().claimed);
}

#[test]
fn chain_from_ready_target_claims_it() {
    let mut queue = fan_in();

    let unit_a = queue.chain_from("A").unwrap();
    assert_eq!(unit_a, unit(&["A"]));
    assert!(queue.dequeue_work(&[], 4).unwrap().is_empty());
}

#[test]
fn chain_stops_at_join_point() {
    init_tracing();
    // X -> Y -> Z, and Z also needs W.
    let mut queue = StaticResolver::new()
        .target("Z", &["Y", "W"])
        .target("Y", &["X"])
        .target("X", &[])
        .target("W", &[])
        .queue(&["Z"]);

    let units = queue.dequeue_work(&[], 4).unwrap();
    assert_eq!(units, vec![unit(&["W"]), unit(&["X", "Y"])]);

    let units = queue.dequeue_work(&ids(&["W", "X", "Y"]), 4).unwrap();
    assert_eq!(units, vec![unit(&["Z"])]);
}

#[test]
fn ready_order_follows_encounter_order() {
    // Dependents of A become ready in the order A lists them.
    let mut queue = StaticResolver::new()
        .target("root", &["p", "q", "r"])
        .target("p", &["A"])
        .target("q", &["A"])
        .target("r", &["A"])
        .target("A", &[])
        .queue(&["root"]);

    queue.dequeue_work(&[], 1).unwrap();
    let units = queue.dequeue_work(&ids(&["A"]), 3).unwrap();
    assert_eq!(units, vec![unit(&["p"]), unit(&["q"]), unit(&["r"])]);
}

#[test]
fn empty_queue_is_complete() {
    let mut queue = TargetQueue::empty();
    assert!(queue.is_complete());
    assert!(queue.is_empty());
    assert!(!queue.has_ready_work());
    assert!(queue.dequeue_work(&[], 3).unwrap().is_empty());
}

#[test]
fn state_of_unknown_target_is_none() {
    let queue = fan_in();
    assert!(queue.state_of("nope").is_none());
    assert_eq!(queue.len(), 4);

    let mut names: Vec<&str> = queue.target_names().collect();
    names.sort();
    assert_eq!(names, vec!["A", "B", "C", "D"]);
}
