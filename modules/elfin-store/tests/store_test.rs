//! Behavioural tests for the composed store: dispatch targeting, lazy slot
//! initialisation, drain/dispose lifecycle and scored access.

use std::cell::RefCell;

use anyhow::Result;
use elfin_store::{Action, ActionLike, Reduction, ReducerComposer, State, Store, StoreError};
use serde_json::json;

// ---------------------------------------------------------------------------
// Test fragment + reducers
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, PartialEq)]
struct Slot {
    v: Option<i64>,
}

fn set_reducer(_slot: &Slot, action: &Action) -> Result<Reduction<Slot>> {
    if !action.is("SET") {
        return Ok(Reduction::Keep);
    }
    Ok(Reduction::Replace(Slot {
        v: Some(action.field("val")?),
    }))
}

fn composer() -> ReducerComposer<Action, Slot> {
    ReducerComposer::new()
        .with("a", set_reducer)
        .with("b", set_reducer)
}

fn store() -> Store<Action, Slot> {
    Store::build(composer()).unwrap()
}

fn set(val: i64) -> Action {
    Action::new("SET").with("val", val)
}

fn slot(v: i64) -> Slot {
    Slot { v: Some(v) }
}

// ---------------------------------------------------------------------------
// Typed action family
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Counter {
    Increment(u32),
    Reset,
}

impl ActionLike for Counter {
    fn action_type(&self) -> &str {
        match self {
            Counter::Increment(_) => "INCREMENT",
            Counter::Reset => "RESET",
        }
    }
}

fn count_reducer(total: &u32, action: &Counter) -> Result<Reduction<u32>> {
    Ok(match action {
        Counter::Increment(n) => Reduction::Replace(total + n),
        Counter::Reset => Reduction::Replace(0),
    })
}

// =========================================================================
// Tests
// =========================================================================

#[test]
fn untargeted_then_targeted_dispatch() {
    let mut store = store();

    store.dispatch(&set(5)).unwrap();
    let snapshot = store.snapshot();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot["a"], slot(5));
    assert_eq!(snapshot["b"], slot(5));

    store.dispatch_to(&set(9), &["a"]).unwrap();
    let snapshot = store.snapshot();
    assert_eq!(snapshot["a"], slot(9));
    assert_eq!(snapshot["b"], slot(5));
}

#[test]
fn fresh_store_snapshot_is_empty() {
    let store = store();
    assert!(store.snapshot().is_empty());
    assert!(store.select(|s| s.is_empty()));
}

#[test]
fn first_touch_starts_from_empty_fragment() {
    let mut store = store();
    store.dispatch_to(&Action::new("NOOP"), &["b"]).unwrap();

    let snapshot = store.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot["b"], Slot::default());
    assert!(!snapshot.contains_key("a"));
}

#[test]
fn unknown_target_fails_without_touching_other_slots() {
    let combined = ReducerComposer::<Action, Slot>::new()
        .with("a", set_reducer)
        .compose()
        .unwrap();
    let mut store = Store::new(combined);
    store.dispatch(&set(1)).unwrap();

    let err = store.dispatch_to(&Action::new("X"), &["z"]).unwrap_err();
    assert!(matches!(err, StoreError::KeyNotFound(ref k) if k == "z"));
    assert_eq!(store.snapshot()["a"], slot(1));
    assert!(!store.snapshot().contains_key("z"));
}

#[test]
fn disjoint_targeted_dispatches_commute() {
    let keys_1 = ["a"];
    let keys_2 = ["b"];

    let mut forward = store();
    forward.dispatch_to(&set(1), &keys_1).unwrap();
    forward.dispatch_to(&set(2), &keys_2).unwrap();

    let mut backward = store();
    backward.dispatch_to(&set(2), &keys_2).unwrap();
    backward.dispatch_to(&set(1), &keys_1).unwrap();

    let sorted = |state: State<Slot>| {
        let mut pairs: Vec<_> = state.into_iter().collect();
        pairs.sort_by(|x, y| x.0.cmp(&y.0));
        pairs
    };
    assert_eq!(sorted(forward.snapshot()), sorted(backward.snapshot()));
}

#[test]
fn drain_returns_last_snapshot_and_empties() {
    let mut store = store();
    store.dispatch(&set(3)).unwrap();
    store.dispatch_to(&set(4), &["b"]).unwrap();

    let before = store.snapshot();
    let drained = store.drain();
    assert_eq!(drained, before);
    assert!(store.snapshot().is_empty());
}

#[test]
fn snapshot_is_detached_from_later_dispatches() {
    let mut store = store();
    store.dispatch(&set(1)).unwrap();
    let earlier = store.snapshot();
    store.dispatch(&set(2)).unwrap();
    assert_eq!(earlier["a"], slot(1));
    assert_eq!(store.snapshot()["a"], slot(2));
}

#[test]
fn dispose_twice_is_safe() {
    let mut store = store();
    store.dispatch(&set(1)).unwrap();
    store.dispose();
    store.dispose();
    assert!(store.is_disposed());
    assert!(store.snapshot().is_empty());
    assert!(matches!(store.dispatch(&set(2)), Err(StoreError::Disposed)));
}

#[test]
fn score_delivers_in_request_order() {
    let mut store = store();
    store.dispatch(&set(5)).unwrap();
    store.dispatch_to(&set(7), &["b"]).unwrap();

    let mut seen = Vec::new();
    store
        .score(&["b", "a"], None, |value| {
            seen.push(value.clone());
            Ok(())
        })
        .unwrap();
    assert_eq!(seen, vec![slot(7), slot(5)]);
}

#[test]
fn score_dispatches_action_first() {
    let mut store = store();
    let mut seen = Vec::new();
    store
        .score(&["a", "b"], Some(&set(11)), |value| {
            seen.push(value.v);
            Ok(())
        })
        .unwrap();
    assert_eq!(seen, vec![Some(11), Some(11)]);
}

#[test]
fn score_of_untouched_key_yields_default() {
    let mut store = store();
    let mut seen = Vec::new();
    store
        .score(&["a", "never-registered"], None, |value| {
            seen.push(value.clone());
            Ok(())
        })
        .unwrap();
    assert_eq!(seen, vec![Slot::default(), Slot::default()]);
}

#[test]
fn inspect_sees_whole_tuple_before_collector() {
    let mut store = store();
    let events = RefCell::new(Vec::new());
    store
        .score_inspect(
            &["a", "b"],
            Some(&set(2)),
            |values| {
                events.borrow_mut().push(format!("inspect:{}", values.len()));
                Ok(())
            },
            |value| {
                events.borrow_mut().push(format!("collect:{:?}", value.v));
                Ok(())
            },
        )
        .unwrap();
    assert_eq!(
        events.into_inner(),
        vec!["inspect:2", "collect:Some(2)", "collect:Some(2)"]
    );
}

#[test]
fn collector_failure_keeps_the_dispatch() {
    let mut store = store();
    let mut calls = 0;
    let err = store
        .score(&["a", "b"], Some(&set(8)), |_| {
            calls += 1;
            anyhow::bail!("installer rejected fragment")
        })
        .unwrap_err();

    assert!(matches!(err, StoreError::Collector { ref key, .. } if key == "a"));
    assert_eq!(calls, 1);
    assert_eq!(store.snapshot()["b"], slot(8));
}

#[test]
fn inspect_failure_skips_collector_and_keeps_the_dispatch() {
    let mut store = store();
    let mut collected = 0;
    let err = store
        .score_inspect(
            &["a", "b"],
            Some(&set(6)),
            |_| anyhow::bail!("tuple rejected"),
            |_| {
                collected += 1;
                Ok(())
            },
        )
        .unwrap_err();

    assert!(matches!(err, StoreError::Inspect(_)));
    assert_eq!(collected, 0);
    let snapshot = store.snapshot();
    assert_eq!(snapshot["a"], slot(6));
    assert_eq!(snapshot["b"], slot(6));
}

#[test]
fn failure_chain_names_each_cause_once() {
    fn boom(_: &Slot, _: &Action) -> Result<Reduction<Slot>> {
        anyhow::bail!("boom")
    }
    let mut failing =
        Store::build(ReducerComposer::<Action, Slot>::new().with("a", boom)).unwrap();

    let err = failing.dispatch(&set(1)).unwrap_err();
    let chain = format!("{:#}", anyhow::Error::from(err));
    assert_eq!(chain.matches("boom").count(), 1);
    assert_eq!(chain, "Reducer for slot 'a' failed: boom");

    let err = store()
        .score(&["b"], None, |_| anyhow::bail!("installer down"))
        .unwrap_err();
    let chain = format!("{:#}", anyhow::Error::from(err));
    assert_eq!(chain, "Collector failed for slot 'b': installer down");
}

#[test]
fn fetch_and_connect_read_like_snapshot_and_select() {
    let mut store = store();
    store.dispatch(&set(3)).unwrap();
    assert_eq!(store.fetch(), store.snapshot());
    assert_eq!(
        store.connect(|state| state.keys().cloned().collect::<Vec<_>>()),
        vec!["a", "b"]
    );
}

#[test]
fn reducer_failure_propagates() {
    let mut store = store();
    let bad = Action::new("SET").with("val", json!("not a number"));
    let err = store.dispatch(&bad).unwrap_err();
    assert!(matches!(err, StoreError::Reducer { ref key, .. } if key == "a"));
}

#[test]
fn typed_actions_drive_typed_fragments() {
    let mut store = Store::build(
        ReducerComposer::<Counter, u32>::new()
            .with("hits", count_reducer)
            .with("misses", count_reducer),
    )
    .unwrap();

    store.dispatch(&Counter::Increment(2)).unwrap();
    store.dispatch_to(&Counter::Increment(3), &["hits"]).unwrap();
    assert_eq!(store.values(&["hits", "misses"]), vec![5, 2]);

    store.dispatch_to(&Counter::Reset, &["hits"]).unwrap();
    assert_eq!(store.values(&["hits", "misses"]), vec![0, 2]);
}

#[test]
fn stores_have_distinct_ids() {
    assert_ne!(store().id(), store().id());
}
