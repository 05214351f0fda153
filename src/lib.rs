// vim: tw=80
//! A call-expectation and verification engine for test doubles.
//!
//! Understudy is the runtime half of a mocking setup: a test declares, ahead
//! of time, which calls a substitute object should receive, with what
//! arguments, in what order, how many times, and what each call should do or
//! return.  The engine then checks the substitute's actual usage against
//! those declarations and reports precisely where it diverges.  Code
//! generation is deliberately out of scope; the per-method thunks that
//! forward into the engine can be written by hand or by any generator.
//!
//! # Usage
//!
//! The basic idea:
//! * Create a [`Controller`] at test start.
//! * Describe each mocked method once with a [`Method`].
//! * Register expectations with [`Controller::expect`], refining them through
//!   the returned [`CallHandle`].
//! * Have the substitute forward every invocation through
//!   [`Controller::call`].
//! * Finalize with [`Controller::verify`] at teardown.  Any expectation still
//!   short of its minimum call count fails the test.
//!
//! ```
//! use understudy::{args, Arg, Controller, Method};
//!
//! let ctrl = Controller::new();
//! let put = Method::new("Index.Put", 2);
//! ctrl.expect(put.clone(), args!["a", 1]);
//!
//! // What the substitute's thunk does when the code under test calls it:
//! ctrl.call(&put, vec![Arg::of("a"), Arg::of(1)]);
//! ctrl.verify();
//! ```
//!
//! # Matching arguments
//!
//! Raw literal values are shorthand for equality matchers; anything built by
//! the [`matchers`] module can stand in for them, including predicates from
//! the `predicates` crate via [`matchers::pred`].  All expectations set on
//! a method are evaluated in registration order and the first match wins, so
//! narrower expectations should be registered before broader fallbacks.
//!
//! ```should_panic
//! use understudy::{args, Arg, Controller, Method};
//! use understudy::matchers::eq;
//!
//! let ctrl = Controller::new();
//! let put = Method::new("Index.Put", 2);
//! ctrl.expect(put.clone(), args![eq("a"), eq(42)]);
//!
//! ctrl.call(&put, vec![Arg::of("a"), Arg::of(0)]);    // Fails!
//! ```
//!
//! # Return values
//!
//! Fixed values are registered with [`CallHandle::returns`] and checked
//! against the method's declared return types right away; computed values go
//! through [`CallHandle::returning`] and are checked when produced.  A
//! matched call with no registered action yields each return slot's zero
//! value.
//!
//! ```
//! use understudy::{args, rets, Arg, Controller, Method, ReturnType};
//!
//! let ctrl = Controller::new();
//! let get = Method::new("Store.Get", 1).with_return(ReturnType::of::<u32>());
//! ctrl.expect(get.clone(), args!["k"]).returns(rets![7u32]);
//!
//! let got = ctrl.call(&get, vec![Arg::of("k")]).remove(0).take::<u32>();
//! assert_eq!(7, got);
//! ctrl.verify();
//! ```
//!
//! Queued actions are consumed one per matched call, in registration order,
//! with the last action persisting for any further calls the call count
//! allows.
//!
//! # Call counts
//!
//! Every expectation must be called exactly once unless widened with
//! [`times`](CallHandle::times), [`times_any`](CallHandle::times_any),
//! [`times_range`](CallHandle::times_range),
//! [`min_times`](CallHandle::min_times) or
//! [`max_times`](CallHandle::max_times), or forbidden with
//! [`never`](CallHandle::never).
//!
//! ```should_panic
//! use understudy::{args, Arg, Controller, Method};
//!
//! let ctrl = Controller::new();
//! let put = Method::new("Index.Put", 2);
//! ctrl.expect(put.clone(), args!["a", 1]);
//!
//! ctrl.call(&put, vec![Arg::of("a"), Arg::of(1)]);    // Ok
//! ctrl.call(&put, vec![Arg::of("a"), Arg::of(1)]);    // Fails!
//! ```
//!
//! # Ordering
//!
//! [`CallHandle::after`] declares that an expectation must not match until
//! another has been called its minimum number of times; [`in_order`] chains
//! the relation across a whole sequence.
//!
//! ```should_panic
//! use understudy::{args, Arg, Controller, Method};
//!
//! let ctrl = Controller::new();
//! let open = Method::new("File.Open", 0);
//! let read = Method::new("File.Read", 0);
//! let o = ctrl.expect(open.clone(), args![]);
//! ctrl.expect(read.clone(), args![]).after(&o);
//!
//! ctrl.call(&read, vec![]);    // Fails!  Open must come first.
//! ```
//!
//! # Concurrency
//!
//! A substitute may be driven from several threads within one test.
//! Expectation selection and call-count bookkeeping form one critical section
//! under the controller's lock, while registered actions run outside it, so
//! an action may itself call back into the controller.  The engine
//! guarantees internal consistency, not wall-clock ordering beyond the
//! declared `after` relations.
//!
//! # Reporting
//!
//! Failures are routed through the [`TestReporter`] collaborator.  The
//! default [`PanicReporter`] panics on fatal failures, which `#[test]`
//! functions treat as a test failure; [`RecordingReporter`] captures reports
//! for harness tests.

mod action;
mod call;
mod call_set;
mod controller;
pub mod matchers;
mod method;
mod reporter;
mod value;

pub use action::{IntoRet, Ret};
pub use call::{in_order, CallHandle};
pub use controller::Controller;
pub use method::{Method, ReturnType};
pub use reporter::{PanicReporter, RecordingReporter, TestReporter};
pub use value::{Arg, ArgValue, ArgView, IntoValue, Slot, Value};

pub use predicates::prelude::{predicate, Predicate};

/// Build the matcher list for [`Controller::expect`].
///
/// Raw literal values become equality matchers; anything that is already a
/// matcher passes through unchanged.
///
/// ```
/// use understudy::args;
/// use understudy::matchers::any;
///
/// let ms = args!["b", any()];
/// assert_eq!(2, ms.len());
/// ```
#[macro_export]
macro_rules! args {
    ($($m:expr),* $(,)?) => {
        vec![$( $crate::matchers::IntoMatcher::into_matcher($m) ),*]
    };
}

/// Build a [`Value`] list, for variadic tails and computed return values.
///
/// ```
/// use understudy::{values, Arg};
///
/// let tail = Arg::variadic(values![0, 1, 1, 2, 3]);
/// ```
#[macro_export]
macro_rules! values {
    ($($v:expr),* $(,)?) => {
        vec![$( $crate::IntoValue::into_value($v) ),*]
    };
}

/// Build the fixed return values for [`CallHandle::returns`].
///
/// ```
/// use understudy::{rets, Ret};
///
/// let rs = rets![1u32, Ret::nil()];
/// assert_eq!(2, rs.len());
/// ```
#[macro_export]
macro_rules! rets {
    ($($v:expr),* $(,)?) => {
        vec![$( $crate::IntoRet::into_ret($v) ),*]
    };
}
