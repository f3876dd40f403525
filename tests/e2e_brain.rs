//! End-to-end tests for the commit/propagate cycle.
//!
//! Each test builds a brain from a lexicon and a function registry, drives
//! it with writes and commits, and checks committed state and subscribers.

use lark::{
    cast_or, Brain, BrainConfig, Concept, Function, Functions, Json, Lexicon, State,
};
use pretty_assertions::assert_eq;

fn l(s: &str) -> String {
    s.to_string()
}

/// Each node takes the max of its inputs; its own value is the last input,
/// so it can tell when nothing moved.
fn max_function() -> Function<Json> {
    Function::immediate_fn("max", |x| {
        let own = cast_or(x.last().and_then(Option::as_ref), i64::MIN);
        let best = x.iter().map(|s| cast_or(s.as_ref(), i64::MIN)).max().unwrap_or(i64::MIN);
        Ok((best > own).then(|| Json::from(best)))
    })
}

fn ring(nodes: &[&str]) -> Brain<String, Json> {
    let mut lexicon = Lexicon::new();
    for (i, node) in nodes.iter().enumerate() {
        let prev = nodes[(i + nodes.len() - 1) % nodes.len()];
        lexicon.insert(l(node), Concept::new("max", [prev, *node]));
    }
    let mut functions = Functions::new();
    functions.insert(l("max"), max_function());
    Brain::new(lexicon, functions).unwrap()
}

// ============================================================================
// 1. Propagation reaches a fixed point
// ============================================================================

#[test]
fn test_ring_converges_and_settles() {
    let mut brain = ring(&["a", "b", "c", "d"]);
    brain.write(l("a"), Json::from(5));

    let changed = brain.commit(16);
    for node in ["a", "b", "c", "d"] {
        assert_eq!(brain.committed(&l(node)), Some(&Json::from(5)), "node {node}");
    }
    assert_eq!(changed.len(), 4);

    // settled: further commits are no-ops
    assert!(brain.commit(16).is_empty());
    assert!(brain.commit(16).is_empty());
    assert!(!brain.has_pending());
}

#[test]
fn test_one_round_per_commit_still_converges() {
    let mut brain = ring(&["a", "b", "c"]);
    brain.write(l("a"), Json::from(9));

    let mut commits = 0;
    loop {
        commits += 1;
        if brain.commit(1).is_empty() {
            break;
        }
        assert!(commits < 10, "did not settle");
    }
    assert_eq!(brain.committed(&l("c")), Some(&Json::from(9)));
    assert!(commits >= 3);
}

#[test]
fn test_round_budget_bounds_a_single_commit() {
    let mut brain = ring(&["a", "b", "c", "d"]);
    brain.write(l("a"), Json::from(1));

    brain.commit(1);
    assert_eq!(brain.committed(&l("b")), Some(&Json::from(1)));
    assert_eq!(brain.committed(&l("c")), None);

    brain.commit(1);
    assert_eq!(brain.committed(&l("c")), Some(&Json::from(1)));
}

// ============================================================================
// 2. Reads see committed values plus the reader's own queued writes
// ============================================================================

#[test]
fn test_queued_writes_are_invisible_to_propagation() {
    let mut brain = ring(&["a", "b"]);
    brain.write(l("a"), Json::from(3));

    assert_eq!(brain.get(&l("a")), Some(&Json::from(3)));
    assert_eq!(brain.committed(&l("a")), None);
    assert_eq!(brain.committed(&l("b")), None);
    assert_eq!(brain.state().len(), 0);
}

#[test]
fn test_unset_is_not_zero() {
    let mut brain = ring(&["a", "b"]);
    brain.write(l("a"), Json::from(0));
    brain.commit(0);

    assert_eq!(brain.committed(&l("a")), Some(&Json::from(0)));
    assert_eq!(brain.committed(&l("b")), None);
}

#[test]
fn test_initial_state() {
    let mut state = State::new();
    state.insert(l("a"), Json::from(4));
    let mut lexicon = Lexicon::new();
    lexicon.insert(l("b"), Concept::new("max", ["a", "b"]));
    let mut functions = Functions::new();
    functions.insert(l("max"), max_function());

    let mut brain = Brain::with_state(lexicon, functions, state).unwrap();
    assert_eq!(brain.committed(&l("a")), Some(&Json::from(4)));

    brain.write(l("a"), Json::from(6));
    brain.commit(1);
    assert_eq!(brain.committed(&l("b")), Some(&Json::from(6)));
}

// ============================================================================
// 3. Subscriptions
// ============================================================================

#[test]
fn test_subscription_replays_current_value() {
    let mut brain = ring(&["a", "b"]);
    for v in 1..=3 {
        brain.write(l("a"), Json::from(v));
        brain.commit(4);
    }

    let rx = brain.subscribe(&l("b"));
    assert_eq!(*rx.borrow(), Some(Json::from(3)));
}

#[test]
fn test_subscriber_sees_propagated_value() {
    let mut brain = ring(&["a", "b", "c"]);
    let mut rx = brain.subscribe(&l("c"));
    assert_eq!(*rx.borrow_and_update(), None);

    brain.write(l("a"), Json::from(2));
    brain.commit(8);

    assert!(rx.has_changed().unwrap());
    assert_eq!(*rx.borrow_and_update(), Some(Json::from(2)));

    // a commit that leaves c alone does not notify
    brain.write(l("a"), Json::from(1));
    brain.commit(8);
    assert!(!rx.has_changed().unwrap());
}

#[test]
fn test_subscribing_twice_shares_the_channel() {
    let mut brain = ring(&["a", "b"]);
    let first = brain.subscribe(&l("a"));
    let second = brain.subscribe(&l("a"));

    brain.write(l("a"), Json::from(7));
    brain.commit(0);

    assert_eq!(*first.borrow(), Some(Json::from(7)));
    assert_eq!(*second.borrow(), Some(Json::from(7)));
}

// ============================================================================
// 4. Configuration
// ============================================================================

#[test]
fn test_default_rounds_from_config() {
    let mut lexicon = Lexicon::new();
    for (node, prev) in [("a", "c"), ("b", "a"), ("c", "b")] {
        lexicon.insert(l(node), Concept::new("max", [prev, node]));
    }
    let mut functions = Functions::new();
    functions.insert(l("max"), max_function());

    let config: BrainConfig = serde_json::from_str(r#"{ "default_rounds": 8 }"#).unwrap();
    let mut brain = Brain::open(lexicon, functions, State::new(), config).unwrap();

    brain.write(l("a"), Json::from(1));
    brain.commit_default();
    assert_eq!(brain.committed(&l("c")), Some(&Json::from(1)));
    assert!(brain.stats().rounds <= 8);
}

#[test]
fn test_lexicon_from_json_builds_a_brain() {
    let lexicon: Lexicon<String> = lark::lexicon_from_json(
        r#"{ "b": { "function": "max", "inputs": ["a", "b"] } }"#,
    )
    .unwrap();
    let mut functions = Functions::new();
    functions.insert(l("max"), max_function());

    let mut brain = Brain::new(lexicon, functions).unwrap();
    brain.write(l("a"), Json::from(11));
    brain.commit(1);
    assert_eq!(brain.committed(&l("b")), Some(&Json::from(11)));
}
