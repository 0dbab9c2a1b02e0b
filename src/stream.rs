//! Core stream type: a single-latest-value synchronous publisher
//!
//! A [`Stream`] holds at most one current value and notifies its subscribers
//! synchronously, on the caller's stack, each time a new value is published
//! with [`Stream::trigger`]. Derived streams (see the operators in
//! [`crate::ops`] and [`crate::combine`]) are wired into an explicit
//! ownership graph so that disposing an ancestor deterministically tears down
//! everything derived from it.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::Location;
use std::rc::{Rc, Weak};

use crate::audit;
use crate::dispose::Disposable;

/// State shared between a stream's subscription list and the [`Subscription`]
/// handles returned to callers. Disposal is tracked here so that whichever
/// side tears down first (the handle or the stream) wins and the other side
/// no-ops.
struct SubState<T> {
    owner: Option<Owner>,
    handler: RefCell<Box<dyn FnMut(&T)>>,
    disposed: Cell<bool>,
    tracked: bool,
    site: &'static Location<'static>,
}

impl<T> SubState<T> {
    /// Mark disposed and balance the audit counter. Returns false if the
    /// subscription was already disposed.
    fn retire(&self) -> bool {
        if self.disposed.replace(true) {
            return false;
        }
        if self.tracked {
            audit::record_release(self.site);
        }
        true
    }
}

struct StreamCore<T> {
    current: Option<T>,
    disposed: bool,
    subscriptions: Vec<Rc<SubState<T>>>,
    owned: Vec<Box<dyn Disposable>>,
    tracked: bool,
    site: &'static Location<'static>,
}

/// A single-latest-value synchronous publisher.
///
/// `Stream<T>` is a cheap clonable handle; clones refer to the same
/// underlying node. The stream holds the most recently triggered value (none
/// until the first [`trigger`](Stream::trigger)) plus an insertion-ordered
/// list of active subscriptions, and owns the disposables (derived streams,
/// internal subscriptions, cleanup hooks) it must tear down when it is
/// disposed itself.
pub struct Stream<T> {
    inner: Rc<RefCell<StreamCore<T>>>,
}

impl<T> Clone for Stream<T> {
    fn clone(&self) -> Self {
        Stream {
            inner: Rc::clone(&self.inner),
        }
    }
}

/// Non-owning handle to a [`Stream`].
///
/// Closures registered on a parent stream capture only weak handles to the
/// derived streams they publish into; ownership lives exclusively in the
/// owned-disposables lists. This keeps the reference graph acyclic.
pub struct WeakStream<T> {
    inner: Weak<RefCell<StreamCore<T>>>,
}

impl<T> Clone for WeakStream<T> {
    fn clone(&self) -> Self {
        WeakStream {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T> WeakStream<T> {
    /// Resolve to a strong handle, or `None` once the stream is gone.
    pub fn upgrade(&self) -> Option<Stream<T>> {
        self.inner.upgrade().map(|inner| Stream { inner })
    }
}

/// Opaque grouping key for bulk unsubscription.
///
/// Owners compare by identity, never by value: two separately created owners
/// are always distinct, and clones of one owner are the same owner.
#[derive(Clone, Debug)]
pub struct Owner(Rc<()>);

impl Owner {
    pub fn new() -> Self {
        Owner(Rc::new(()))
    }
}

impl Default for Owner {
    fn default() -> Self {
        Owner::new()
    }
}

impl PartialEq for Owner {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Owner {}

/// One registered interest in a stream's future values.
///
/// The handle is clonable; all clones refer to the same registration.
/// Dropping a handle does *not* unsubscribe; teardown is always explicit
/// through [`dispose`](Subscription::dispose) (or the owning stream's
/// disposal cascade).
pub struct Subscription<T> {
    stream: Weak<RefCell<StreamCore<T>>>,
    state: Rc<SubState<T>>,
}

impl<T> Clone for Subscription<T> {
    fn clone(&self) -> Self {
        Subscription {
            stream: Weak::clone(&self.stream),
            state: Rc::clone(&self.state),
        }
    }
}

impl<T: 'static> Subscription<T> {
    /// Remove this handler from its stream. Idempotent.
    pub fn dispose(&self) {
        if !self.state.retire() {
            return;
        }
        if let Some(core) = self.stream.upgrade() {
            core.borrow_mut()
                .subscriptions
                .retain(|entry| !Rc::ptr_eq(entry, &self.state));
        }
    }

    /// True once this subscription has been disposed, by either side.
    pub fn is_disposed(&self) -> bool {
        self.state.disposed.get()
    }
}

impl<T: 'static> Disposable for Subscription<T> {
    fn dispose(&self) {
        Subscription::dispose(self);
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("disposed", &self.state.disposed.get())
            .field("owned", &self.state.owner.is_some())
            .finish()
    }
}

impl<T: 'static> Stream<T> {
    /// Create a fresh stream with no value and no subscribers.
    #[track_caller]
    pub fn new() -> Self {
        Stream::new_at(Location::caller())
    }

    pub(crate) fn new_at(site: &'static Location<'static>) -> Self {
        let tracked = audit::tracking_enabled();
        if tracked {
            audit::record_acquire(site);
        }
        Stream {
            inner: Rc::new(RefCell::new(StreamCore {
                current: None,
                disposed: false,
                subscriptions: Vec::new(),
                owned: Vec::new(),
                tracked,
                site,
            })),
        }
    }

    /// True once any value has been published (and the stream is not
    /// disposed).
    pub fn has_value(&self) -> bool {
        self.inner.borrow().current.is_some()
    }

    /// True once [`dispose`](Stream::dispose) has run.
    pub fn is_disposed(&self) -> bool {
        self.inner.borrow().disposed
    }

    /// Downgrade to a non-owning handle.
    pub fn downgrade(&self) -> WeakStream<T> {
        WeakStream {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Register a disposable on this stream's teardown path.
    ///
    /// Derivation operators use this to hand a parent its child stream (so
    /// parent disposal reaches the child) and to hand a child its internal
    /// parent-side subscription (so child disposal detaches its handler).
    /// On an already-disposed stream the disposable is disposed immediately
    /// instead of being parked in a list that will never drain.
    pub fn own<D>(&self, disposable: D)
    where
        D: Disposable + 'static,
    {
        let disposed = self.inner.borrow().disposed;
        if disposed {
            disposable.dispose();
            return;
        }
        self.inner.borrow_mut().owned.push(Box::new(disposable));
    }

    /// Dispose every active subscription and every owned disposable, then
    /// clear the current value. Idempotent; after the first call the stream
    /// is inert and further [`trigger`](Stream::trigger) calls are no-ops.
    pub fn dispose(&self) {
        let (subscriptions, owned, released_site) = {
            let mut core = self.inner.borrow_mut();
            if core.disposed {
                return;
            }
            core.disposed = true;
            core.current = None;
            (
                std::mem::take(&mut core.subscriptions),
                std::mem::take(&mut core.owned),
                core.tracked.then_some(core.site),
            )
        };
        log::trace!(
            "disposing stream: {} subscription(s), {} owned disposable(s)",
            subscriptions.len(),
            owned.len()
        );
        for state in subscriptions {
            state.retire();
        }
        for disposable in owned {
            disposable.dispose();
        }
        if let Some(site) = released_site {
            audit::record_release(site);
        }
    }
}

impl<T: Clone + 'static> Stream<T> {
    /// Clone of the most recently published value, if any.
    pub fn current(&self) -> Option<T> {
        self.inner.borrow().current.clone()
    }

    /// Invoke `callback` with the current value iff one has been published.
    /// Does not subscribe; a valueless stream never invokes the callback.
    pub fn last<F>(&self, callback: F)
    where
        F: FnOnce(&T),
    {
        let current = self.inner.borrow().current.clone();
        if let Some(value) = current {
            callback(&value);
        }
    }

    /// Publish `value`: store it as the current value, then invoke every
    /// currently registered handler in subscription order, synchronously, on
    /// this call stack. Returns `&self` for chaining.
    ///
    /// Delivery iterates a snapshot of the subscription list taken when the
    /// trigger starts, so handlers that subscribe or unsubscribe during
    /// delivery only affect the *next* trigger. A panicking handler unwinds
    /// through this call and aborts delivery to the remaining handlers; there
    /// is no catch-and-continue and no isolation between subscribers.
    ///
    /// Triggering a disposed stream stores nothing and notifies no one.
    pub fn trigger(&self, value: T) -> &Self {
        let snapshot = {
            let mut core = self.inner.borrow_mut();
            if core.disposed {
                log::trace!("trigger on disposed stream ignored");
                return self;
            }
            core.current = Some(value.clone());
            core.subscriptions.clone()
        };
        for state in snapshot {
            let mut handler = state.handler.borrow_mut();
            (&mut *handler)(&value);
        }
        self
    }

    /// Register `handler` for future values. Does not replay the current
    /// value; use [`subscribe_replay`](Stream::subscribe_replay) or the
    /// owner-tagged form for replay-on-subscribe.
    #[track_caller]
    pub fn subscribe<F>(&self, handler: F) -> Subscription<T>
    where
        F: FnMut(&T) + 'static,
    {
        self.register(Location::caller(), None, false, handler)
    }

    /// Register `handler` and, if the stream already holds a value, invoke it
    /// synchronously once with that value before returning.
    #[track_caller]
    pub fn subscribe_replay<F>(&self, handler: F) -> Subscription<T>
    where
        F: FnMut(&T) + 'static,
    {
        self.register(Location::caller(), None, true, handler)
    }

    /// Register `handler` tagged with `owner` for later bulk removal via
    /// [`unsubscribe_owner`](Stream::unsubscribe_owner). Owner-tagged
    /// subscriptions replay the current value by default, unlike the
    /// anonymous form.
    #[track_caller]
    pub fn subscribe_owned<F>(&self, owner: &Owner, handler: F) -> Subscription<T>
    where
        F: FnMut(&T) + 'static,
    {
        self.register(Location::caller(), Some(owner.clone()), true, handler)
    }

    pub(crate) fn subscribe_at<F>(
        &self,
        site: &'static Location<'static>,
        handler: F,
    ) -> Subscription<T>
    where
        F: FnMut(&T) + 'static,
    {
        self.register(site, None, false, handler)
    }

    pub(crate) fn subscribe_replay_at<F>(
        &self,
        site: &'static Location<'static>,
        handler: F,
    ) -> Subscription<T>
    where
        F: FnMut(&T) + 'static,
    {
        self.register(site, None, true, handler)
    }

    fn register<F>(
        &self,
        site: &'static Location<'static>,
        owner: Option<Owner>,
        replay: bool,
        handler: F,
    ) -> Subscription<T>
    where
        F: FnMut(&T) + 'static,
    {
        if self.inner.borrow().disposed {
            // Inert handle: nothing registered, nothing audited.
            return Subscription {
                stream: Weak::new(),
                state: Rc::new(SubState {
                    owner: None,
                    handler: RefCell::new(Box::new(|_: &T| {})),
                    disposed: Cell::new(true),
                    tracked: false,
                    site,
                }),
            };
        }
        let tracked = audit::tracking_enabled();
        if tracked {
            audit::record_acquire(site);
        }
        let state = Rc::new(SubState {
            owner,
            handler: RefCell::new(Box::new(handler)),
            disposed: Cell::new(false),
            tracked,
            site,
        });
        self.inner.borrow_mut().subscriptions.push(Rc::clone(&state));
        let subscription = Subscription {
            stream: Rc::downgrade(&self.inner),
            state,
        };
        if replay {
            let current = self.inner.borrow().current.clone();
            if let Some(value) = current {
                let mut handler = subscription.state.handler.borrow_mut();
                (&mut *handler)(&value);
            }
        }
        subscription
    }

    /// Remove exactly this subscription. Idempotent; equivalent to
    /// [`Subscription::dispose`].
    pub fn unsubscribe(&self, subscription: &Subscription<T>) {
        subscription.dispose();
    }

    /// Remove every active subscription tagged with `owner` (identity match).
    /// Other subscriptions are untouched.
    pub fn unsubscribe_owner(&self, owner: &Owner) {
        let removed = {
            let mut core = self.inner.borrow_mut();
            let mut removed = Vec::new();
            core.subscriptions.retain(|entry| match &entry.owner {
                Some(tag) if tag == owner => {
                    removed.push(Rc::clone(entry));
                    false
                }
                _ => true,
            });
            removed
        };
        if !removed.is_empty() {
            log::trace!("owner unsubscribe removed {} subscription(s)", removed.len());
        }
        for state in removed {
            state.retire();
        }
    }
}

impl<T: 'static> Default for Stream<T> {
    fn default() -> Self {
        Stream::new()
    }
}

impl<T: 'static> Disposable for Stream<T> {
    fn dispose(&self) {
        Stream::dispose(self);
    }
}

impl<T> fmt::Debug for Stream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(core) => f
                .debug_struct("Stream")
                .field("has_value", &core.current.is_some())
                .field("subscriptions", &core.subscriptions.len())
                .field("disposed", &core.disposed)
                .finish(),
            Err(_) => f.debug_struct("Stream").finish_non_exhaustive(),
        }
    }
}

impl<T: Clone + 'static> Stream<T> {
    /// Set the current value without notifying anyone. Used by derivation
    /// operators to seed a freshly created child before it has subscribers.
    pub(crate) fn seed(&self, value: T) {
        let mut core = self.inner.borrow_mut();
        if !core.disposed {
            core.current = Some(value);
        }
    }
}
