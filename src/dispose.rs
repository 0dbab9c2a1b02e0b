//! Disposal primitives for streams and subscriptions
//!
//! Everything in the derivation graph that must release resources on teardown
//! implements [`Disposable`]. Ad-hoc cleanup closures are wrapped in a
//! [`Disposer`] so they can be parked in a stream's owned-disposables list
//! alongside child streams and subscriptions.

use std::cell::Cell;

/// Capability to release resources exactly once.
///
/// `dispose` must be safe to call any number of times; callers routinely
/// dispose something that already disposed itself earlier (for example via a
/// parent stream's teardown cascade).
pub trait Disposable {
    /// Release held resources. Repeated calls are no-ops.
    fn dispose(&self);
}

/// One-shot cleanup closure satisfying [`Disposable`].
///
/// The wrapped closure runs on the first `dispose` call and is dropped
/// afterwards, so repeated disposal is inherently harmless.
pub struct Disposer {
    hook: Cell<Option<Box<dyn FnOnce()>>>,
}

impl Disposer {
    /// Wrap a cleanup closure.
    pub fn new<F>(hook: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Disposer {
            hook: Cell::new(Some(Box::new(hook))),
        }
    }

    /// True once the hook has run.
    pub fn is_disposed(&self) -> bool {
        // Cell<Option<..>> has no borrow; peek by swapping.
        let hook = self.hook.take();
        let disposed = hook.is_none();
        self.hook.set(hook);
        disposed
    }
}

impl Disposable for Disposer {
    fn dispose(&self) {
        if let Some(hook) = self.hook.take() {
            hook();
        }
    }
}

impl std::fmt::Debug for Disposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Disposer")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
