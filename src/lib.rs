//! pulse-stream - a synchronous, single-latest-value reactive stream
//!
//! A [`Stream`] is a "hot" observable holding at most one current value. Each
//! [`trigger`](Stream::trigger) stores the new value and notifies every
//! active subscriber synchronously, on the caller's stack. Streams compose
//! declaratively through [`map`](Stream::map), [`filter`](Stream::filter),
//! [`distinct`](Stream::distinct), [`fold`](Stream::fold),
//! [`take`](Stream::take), and the [`combine2`]..[`combine6`] joins, and
//! every derived stream and subscription stays reachable for explicit,
//! deterministic teardown: disposing an upstream stream collapses everything
//! derived from it, including diamond topologies through the joins.
//!
//! There is no scheduler and no queue: delivery is depth-first on one
//! thread, and serializing access to a stream graph is the caller's
//! responsibility.
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use pulse_stream::Stream;
//!
//! let numbers = Stream::new();
//! let even_squares = numbers.map(|n: &i32| n * n).filter(|sq| sq % 2 == 0);
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&seen);
//! let subscription = even_squares.subscribe(move |sq: &i32| sink.borrow_mut().push(*sq));
//!
//! numbers.trigger(1).trigger(2).trigger(3).trigger(4);
//! assert_eq!(*seen.borrow(), vec![4, 16]);
//! even_squares.last(|sq| assert_eq!(*sq, 16));
//!
//! subscription.dispose();
//! numbers.dispose();
//! assert!(!even_squares.has_value());
//! ```

pub mod audit;
pub mod combine;
pub mod dispose;
pub mod ops;
pub mod stream;

pub use combine::{combine2, combine3, combine4, combine5, combine6};
pub use dispose::{Disposable, Disposer};
pub use stream::{Owner, Stream, Subscription, WeakStream};
