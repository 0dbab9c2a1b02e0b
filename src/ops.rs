//! Derivation operators
//!
//! Each operator builds a child stream wired to its parent with the ownership
//! links the disposal cascade relies on: the parent `own`s the child (so
//! disposing the parent reaches the child), and the child `own`s the internal
//! parent-side subscription (so disposing the child detaches its handler from
//! the parent). Handler closures hold only weak handles to the child.

use std::cell::{Cell, RefCell};
use std::panic::Location;
use std::rc::Rc;

use crate::dispose::Disposer;
use crate::stream::{Stream, Subscription};

impl<T: Clone + 'static> Stream<T> {
    /// Derive a stream of `f(value)` for every value published here.
    ///
    /// If this stream already holds a value, the child starts out seeded with
    /// `f` applied to it, without waiting for a trigger. A panic in `f`
    /// unwinds through the parent's `trigger`.
    #[track_caller]
    pub fn map<U, F>(&self, f: F) -> Stream<U>
    where
        U: Clone + 'static,
        F: FnMut(&T) -> U + 'static,
    {
        self.map_at(Location::caller(), f)
    }

    pub(crate) fn map_at<U, F>(&self, site: &'static Location<'static>, mut f: F) -> Stream<U>
    where
        U: Clone + 'static,
        F: FnMut(&T) -> U + 'static,
    {
        let child = Stream::new_at(site);
        if let Some(value) = self.current() {
            child.seed(f(&value));
        }
        let weak_child = child.downgrade();
        let subscription = self.subscribe_at(site, move |value: &T| {
            if let Some(child) = weak_child.upgrade() {
                child.trigger(f(value));
            }
        });
        self.own(child.clone());
        child.own(subscription);
        child
    }

    /// Derive a stream that drops consecutive duplicates.
    ///
    /// Only *adjacent* repeats collapse: the comparison point is the last
    /// value emitted downstream, so `A A B A` comes out as `A B A`. The first
    /// value always passes.
    #[track_caller]
    pub fn distinct(&self) -> Stream<T>
    where
        T: PartialEq,
    {
        self.distinct_by_at(Location::caller(), |value| value.clone())
    }

    /// Like [`distinct`](Stream::distinct), comparing by a derived key.
    #[track_caller]
    pub fn distinct_by<K, F>(&self, key: F) -> Stream<T>
    where
        K: PartialEq + 'static,
        F: FnMut(&T) -> K + 'static,
    {
        self.distinct_by_at(Location::caller(), key)
    }

    fn distinct_by_at<K, F>(&self, site: &'static Location<'static>, mut key: F) -> Stream<T>
    where
        K: PartialEq + 'static,
        F: FnMut(&T) -> K + 'static,
    {
        let child = Stream::new_at(site);
        let weak_child = child.downgrade();
        // Rolling key of the last value emitted downstream; updated only on
        // emission so an intervening distinct value re-opens the gate.
        let mut last_emitted: Option<K> = None;
        let subscription = self.subscribe_replay_at(site, move |value: &T| {
            let candidate = key(value);
            let changed = match &last_emitted {
                Some(previous) => *previous != candidate,
                None => true,
            };
            if changed {
                last_emitted = Some(candidate);
                if let Some(child) = weak_child.upgrade() {
                    child.trigger(value.clone());
                }
            }
        });
        self.own(child.clone());
        child.own(subscription);
        child
    }

    /// Derive a running reduction over every published value.
    ///
    /// The first emitted value is `f(&initial, &value)` for the first value
    /// observed (including the parent's current value at creation time);
    /// `initial` itself is never emitted on its own.
    #[track_caller]
    pub fn fold<U, F>(&self, initial: U, mut f: F) -> Stream<U>
    where
        U: Clone + 'static,
        F: FnMut(&U, &T) -> U + 'static,
    {
        let site = Location::caller();
        let mut accumulator = initial;
        self.map_at(site, move |value| {
            let next = f(&accumulator, value);
            accumulator = next.clone();
            next
        })
    }

    /// Derive a stream of the values satisfying `predicate`.
    ///
    /// A current value that passes the predicate seeds the child; failing
    /// values are silently dropped.
    #[track_caller]
    pub fn filter<F>(&self, mut predicate: F) -> Stream<T>
    where
        F: FnMut(&T) -> bool + 'static,
    {
        let site = Location::caller();
        let child = Stream::new_at(site);
        let weak_child = child.downgrade();
        let subscription = self.subscribe_replay_at(site, move |value: &T| {
            if predicate(value) {
                if let Some(child) = weak_child.upgrade() {
                    child.trigger(value.clone());
                }
            }
        });
        self.own(child.clone());
        child.own(subscription);
        child
    }

    /// Derive a bounded tap that passes the first `n + 1` values observed
    /// from subscription time (the parent's current value, if any, counts as
    /// the first), then detaches from the parent for good.
    ///
    /// The boundary is deliberately `n + 1`, not `n`: the first value is
    /// counted as 0 and emission continues while the count stays `<= n`.
    /// This off-by-one is long-standing observable behavior and is kept
    /// as-is for compatibility.
    #[track_caller]
    pub fn take(&self, n: usize) -> Stream<T> {
        let site = Location::caller();
        let child = Stream::new_at(site);
        let weak_child = child.downgrade();
        let count = Rc::new(Cell::new(0usize));
        // The cutoff handler must dispose its own subscription, whose handle
        // only exists after subscribe returns; it reads it out of this slot.
        let slot: Rc<RefCell<Option<Subscription<T>>>> = Rc::new(RefCell::new(None));
        let subscription = {
            let count = Rc::clone(&count);
            let slot = Rc::clone(&slot);
            self.subscribe_replay_at(site, move |value: &T| {
                let seen = count.get();
                if seen <= n {
                    if let Some(child) = weak_child.upgrade() {
                        child.trigger(value.clone());
                    }
                }
                count.set(seen + 1);
                if seen + 1 > n {
                    if let Some(subscription) = slot.borrow_mut().take() {
                        subscription.dispose();
                    }
                }
            })
        };
        if count.get() > n {
            // The replayed current value already hit the cutoff before the
            // slot could be filled.
            subscription.dispose();
        } else {
            *slot.borrow_mut() = Some(subscription.clone());
        }
        self.own(child.clone());
        child.own(subscription);
        // The slot participates in a handler -> slot -> handle -> handler
        // reference ring while the tap is live; emptying it on child teardown
        // breaks the ring when the cutoff never fired.
        let slot = Rc::clone(&slot);
        child.own(Disposer::new(move || {
            slot.borrow_mut().take();
        }));
        child
    }
}
