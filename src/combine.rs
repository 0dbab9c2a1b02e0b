//! Multi-source joins
//!
//! `combine2` .. `combine6` join fixed sets of streams into one stream of
//! tuples of latest values. The joined stream stays silent until every input
//! has produced at least one value, then re-emits on every input publication
//! (including publications that do not change the tuple; collapse those with
//! [`distinct`](crate::Stream::distinct) downstream if needed).
//!
//! Ownership is inverted relative to the single-parent operators: each input
//! holds the joined stream alive through a countdown hook on its own disposal
//! path, and the join is disposed exactly when the last input goes away.

use std::cell::Cell;
use std::panic::Location;
use std::rc::Rc;

use crate::dispose::Disposer;
use crate::stream::Stream;

macro_rules! combine_fn {
    (
        $(#[$attr:meta])*
        $name:ident, $arity:expr, $(($T:ident, $input:ident, $latest:ident)),+
    ) => {
        $(#[$attr])*
        #[track_caller]
        pub fn $name<$($T),+>($($input: &Stream<$T>),+) -> Stream<($($T),+)>
        where
            $($T: Clone + 'static),+
        {
            let site = Location::caller();
            let joined = Stream::new_at(site);
            let weak_joined = joined.downgrade();
            $(let $latest = $input.downgrade();)+
            let recompute: Rc<dyn Fn()> = Rc::new(move || {
                let Some(joined) = weak_joined.upgrade() else {
                    return;
                };
                // No partial tuples: bail out while any input is valueless
                // (or already gone).
                $(
                    let Some($latest) = $latest.upgrade().and_then(|input| input.current()) else {
                        return;
                    };
                )+
                joined.trigger(($($latest),+));
            });
            let remaining = Rc::new(Cell::new($arity));
            $(
                {
                    let notify = Rc::clone(&recompute);
                    let subscription = $input.subscribe_at(site, move |_| notify());
                    joined.own(subscription);
                    let remaining = Rc::clone(&remaining);
                    let joined = joined.clone();
                    $input.own(Disposer::new(move || {
                        remaining.set(remaining.get() - 1);
                        if remaining.get() == 0 {
                            joined.dispose();
                        }
                    }));
                }
            )+
            joined
        }
    };
}

combine_fn!(
    /// Join two streams into a stream of pairs of their latest values.
    ///
    /// Nothing is emitted until both inputs have a value; from then on every
    /// publication on either input re-emits the pair. The joined stream is
    /// disposed once *both* inputs have been disposed, so disposing one input
    /// alone leaves it alive (though silent, since the tuple can no longer be
    /// completed).
    combine2, 2usize, (A, a, va), (B, b, vb)
);

combine_fn!(
    /// Join three streams into a stream of triples of their latest values.
    /// Semantics as [`combine2`].
    combine3, 3usize, (A, a, va), (B, b, vb), (C, c, vc)
);

combine_fn!(
    /// Join four streams; semantics as [`combine2`].
    combine4, 4usize, (A, a, va), (B, b, vb), (C, c, vc), (D, d, vd)
);

combine_fn!(
    /// Join five streams; semantics as [`combine2`].
    combine5, 5usize, (A, a, va), (B, b, vb), (C, c, vc), (D, d, vd), (E, e, ve)
);

combine_fn!(
    /// Join six streams; semantics as [`combine2`].
    combine6, 6usize, (A, a, va), (B, b, vb), (C, c, vc), (D, d, vd), (E, e, ve), (F, f, vf)
);
