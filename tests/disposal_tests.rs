use std::cell::RefCell;
use std::rc::Rc;

use pulse_stream::{combine2, Disposable, Disposer, Stream};

#[test]
fn test_stream_dispose_is_idempotent() {
    let stream = Stream::new();
    stream.trigger(1);
    stream.dispose();
    stream.dispose();
    assert!(stream.is_disposed());
}

#[test]
fn test_disposer_runs_exactly_once() {
    let runs = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&runs);
    let disposer = Disposer::new(move || *counter.borrow_mut() += 1);

    assert!(!disposer.is_disposed());
    disposer.dispose();
    disposer.dispose();
    disposer.dispose();

    assert!(disposer.is_disposed());
    assert_eq!(*runs.borrow(), 1);
}

#[test]
fn test_own_registers_cleanup_on_dispose() {
    let stream = Stream::<i32>::new();
    let runs = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&runs);
    stream.own(Disposer::new(move || *counter.borrow_mut() += 1));

    assert_eq!(*runs.borrow(), 0);
    stream.dispose();
    assert_eq!(*runs.borrow(), 1);
    stream.dispose();
    assert_eq!(*runs.borrow(), 1);
}

#[test]
fn test_own_on_disposed_stream_disposes_immediately() {
    let stream = Stream::<i32>::new();
    stream.dispose();

    let runs = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&runs);
    stream.own(Disposer::new(move || *counter.borrow_mut() += 1));
    assert_eq!(*runs.borrow(), 1);
}

#[test]
fn test_dispose_cascades_through_operator_chain() {
    let root = Stream::new();
    let leaf = root.map(|n: &i32| n + 1).filter(|n| n % 2 == 0).take(10);

    root.trigger(1);
    assert_eq!(leaf.current(), Some(2));

    root.dispose();
    assert!(leaf.is_disposed());
    assert!(!leaf.has_value());
}

#[test]
fn test_mid_chain_dispose_stops_propagation_below() {
    let root = Stream::new();
    let middle = root.map(|n: &i32| n * 2);
    let leaf = middle.map(|n: &i32| n + 1);

    root.trigger(1);
    assert_eq!(leaf.current(), Some(3));

    middle.dispose();
    assert!(leaf.is_disposed());

    // The root stays alive and keeps publishing.
    root.trigger(5);
    assert_eq!(root.current(), Some(5));
    assert_eq!(leaf.current(), None);
}

#[test]
fn test_diamond_topology_collapses_from_the_root() {
    let root = Stream::new();
    let left = root.map(|n: &i32| n + 1);
    let right = root.map(|n: &i32| n * 2);
    let joined = combine2(&left, &right);

    root.trigger(3);
    assert_eq!(joined.current(), Some((4, 6)));

    // Disposing the root disposes both branches; the join waits for both and
    // then collapses too.
    root.dispose();
    assert!(left.is_disposed());
    assert!(right.is_disposed());
    assert!(joined.is_disposed());
}

#[test]
fn test_partial_diamond_dispose_keeps_join_alive() {
    let root_a = Stream::new();
    let root_b = Stream::new();
    let left = root_a.map(|n: &i32| *n);
    let right = root_b.map(|n: &i32| *n);
    let joined = combine2(&left, &right);

    root_a.trigger(1);
    root_b.trigger(2);
    assert_eq!(joined.current(), Some((1, 2)));

    root_a.dispose();
    assert!(left.is_disposed());
    assert!(!joined.is_disposed());

    root_b.dispose();
    assert!(joined.is_disposed());
}

#[test]
fn test_child_dispose_does_not_disturb_siblings() {
    let root = Stream::new();
    let doubled = root.map(|n: &i32| n * 2);
    let tripled = root.map(|n: &i32| n * 3);

    doubled.dispose();
    root.trigger(2);

    assert_eq!(tripled.current(), Some(6));
    assert!(!doubled.has_value());
}

#[test]
fn test_dispose_from_within_a_handler_finishes_the_delivery() {
    let stream = Stream::new();
    let seen = Rc::new(RefCell::new(Vec::new()));

    let target = stream.clone();
    let _killer = stream.subscribe(move |_: &i32| target.dispose());
    let sink = Rc::clone(&seen);
    let _observer = stream.subscribe(move |v: &i32| sink.borrow_mut().push(*v));

    // The snapshot taken at trigger time still runs the second handler even
    // though the first one disposed the stream.
    stream.trigger(1);
    assert_eq!(*seen.borrow(), vec![1]);
    assert!(stream.is_disposed());

    stream.trigger(2);
    assert_eq!(*seen.borrow(), vec![1]);
}

#[test]
fn test_take_self_cutoff_composes_with_stream_disposal() {
    let values = Stream::new();
    let bounded = values.take(0);

    values.trigger(1);
    values.trigger(2);
    assert_eq!(bounded.current(), Some(1));

    // The tap already detached itself; disposing everything afterwards must
    // still be clean.
    values.dispose();
    assert!(bounded.is_disposed());
}
