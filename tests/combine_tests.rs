use std::cell::RefCell;
use std::rc::Rc;

use pulse_stream::{combine2, combine3, combine4, combine5, combine6, Stream};

fn collector<T: Clone + 'static>() -> (Rc<RefCell<Vec<T>>>, impl FnMut(&T)) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    (seen, move |value: &T| sink.borrow_mut().push(value.clone()))
}

#[test]
fn test_combine2_waits_for_all_inputs_then_tracks_every_change() {
    let a: Stream<&'static str> = Stream::new();
    let b: Stream<Option<&'static str>> = Stream::new();
    let joined = combine2(&a, &b);

    let (seen, handler) = collector();
    let _subscription = joined.subscribe(handler);

    a.trigger("1");
    assert!(seen.borrow().is_empty());
    assert!(!joined.has_value());

    b.trigger(None);
    assert_eq!(*seen.borrow(), vec![("1", None)]);

    b.trigger(Some("2"));
    assert_eq!(*seen.borrow(), vec![("1", None), ("1", Some("2"))]);

    // Every input publication re-emits, even without a change in the tuple.
    a.trigger("2");
    a.trigger("2");
    assert_eq!(
        *seen.borrow(),
        vec![
            ("1", None),
            ("1", Some("2")),
            ("2", Some("2")),
            ("2", Some("2")),
        ]
    );
}

#[test]
fn test_combine2_duplicates_collapse_through_distinct() {
    let a: Stream<&'static str> = Stream::new();
    let b: Stream<Option<&'static str>> = Stream::new();
    let joined = combine2(&a, &b).distinct();

    let (seen, handler) = collector();
    let _subscription = joined.subscribe(handler);

    a.trigger("1");
    b.trigger(None);
    b.trigger(Some("2"));
    a.trigger("2");
    a.trigger("2");

    assert_eq!(
        *seen.borrow(),
        vec![("1", None), ("1", Some("2")), ("2", Some("2"))]
    );
}

#[test]
fn test_combine_does_not_emit_for_preexisting_values_until_a_change() {
    let a = Stream::new();
    let b = Stream::new();
    a.trigger(1);
    b.trigger(2);

    let joined = combine2(&a, &b);
    assert!(!joined.has_value());

    a.trigger(3);
    assert_eq!(joined.current(), Some((3, 2)));
}

#[test]
fn test_combine_disposal_waits_for_all_parents() {
    let a = Stream::new();
    let b = Stream::new();
    let joined = combine2(&a, &b);

    a.trigger(1);
    b.trigger(2);
    a.trigger(1);
    assert_eq!(joined.current(), Some((1, 2)));

    a.dispose();
    assert!(!joined.is_disposed());
    assert_eq!(joined.current(), Some((1, 2)));

    // The tuple can no longer be completed, so the join goes silent.
    b.trigger(3);
    assert_eq!(joined.current(), Some((1, 2)));

    b.dispose();
    assert!(joined.is_disposed());
    assert_eq!(joined.current(), None);
}

#[test]
fn test_combine3_through_combine6_arities() {
    let a = Stream::new();
    let b = Stream::new();
    let c = Stream::new();
    let d = Stream::new();
    let e = Stream::new();
    let f = Stream::new();

    let j3 = combine3(&a, &b, &c);
    let j4 = combine4(&a, &b, &c, &d);
    let j5 = combine5(&a, &b, &c, &d, &e);
    let j6 = combine6(&a, &b, &c, &d, &e, &f);

    a.trigger(1);
    b.trigger(2);
    c.trigger(3);
    assert_eq!(j3.current(), Some((1, 2, 3)));
    assert!(!j4.has_value());

    d.trigger(4);
    assert_eq!(j4.current(), Some((1, 2, 3, 4)));
    assert!(!j5.has_value());

    e.trigger(5);
    assert_eq!(j5.current(), Some((1, 2, 3, 4, 5)));
    assert!(!j6.has_value());

    f.trigger(6);
    assert_eq!(j6.current(), Some((1, 2, 3, 4, 5, 6)));

    a.trigger(10);
    assert_eq!(j3.current(), Some((10, 2, 3)));
    assert_eq!(j6.current(), Some((10, 2, 3, 4, 5, 6)));
}

#[test]
fn test_combine_input_order_is_fixed() {
    let left = Stream::new();
    let right = Stream::new();
    let joined = combine2(&left, &right);

    right.trigger("r");
    left.trigger("l");
    assert_eq!(joined.current(), Some(("l", "r")));
}

#[test]
fn test_combined_stream_survives_subscriber_churn() {
    let a = Stream::new();
    let b = Stream::new();
    let joined = combine2(&a, &b);

    let (seen, handler) = collector::<(i32, i32)>();
    let subscription = joined.subscribe(handler);
    a.trigger(1);
    b.trigger(2);
    subscription.dispose();

    // Losing its last subscriber does not dispose a join.
    assert!(!joined.is_disposed());
    a.trigger(3);
    assert_eq!(joined.current(), Some((3, 2)));
    assert_eq!(*seen.borrow(), vec![(1, 2)]);
}

#[test]
fn test_combine_chains_into_operators() {
    let prices = Stream::new();
    let quantities = Stream::new();
    let totals = combine2(&prices, &quantities).map(|(p, q): &(i32, i32)| p * q);

    prices.trigger(3);
    quantities.trigger(4);
    assert_eq!(totals.current(), Some(12));

    quantities.trigger(5);
    assert_eq!(totals.current(), Some(15));
}
