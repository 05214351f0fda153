// vim: tw=80
//! One registered expectation.

use std::any;
use std::cmp::min;
use std::fmt;
use std::ops::Range;
use std::panic::Location;
use std::sync::{Arc, Weak};

use fragile::Fragile;
use parking_lot::Mutex;
use thiserror::Error;

use crate::action::{Action, Ret, SetArgWrite};
use crate::matchers::Matcher;
use crate::method::Method;
use crate::reporter::TestReporter;
use crate::value::{Arg, Value};

/// How many times a call may and must be made.
///
/// `range` bounds the allowed call count: `start` is the required minimum and
/// `end - 1` the permitted maximum.
#[derive(Debug)]
pub(crate) struct Times {
    count: usize,
    range: Range<usize>,
}

impl Times {
    pub fn increment(&mut self) -> usize {
        self.count += 1;
        self.count
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn minimum(&self) -> usize {
        self.range.start
    }

    pub fn maximum(&self) -> usize {
        self.range.end - 1
    }

    /// Has this expectation already been called the minimum required number
    /// of times?
    pub fn is_satisfied(&self) -> bool {
        self.count >= self.range.start
    }

    /// Has this expectation already been called the maximum allowed number of
    /// times?
    pub fn is_exhausted(&self) -> bool {
        self.count >= self.range.end - 1
    }

    pub fn n(&mut self, n: usize) {
        self.range = n..n + 1;
    }

    pub fn any(&mut self) {
        self.range = 0..usize::MAX;
    }

    pub fn range(&mut self, range: Range<usize>) {
        self.range = range;
    }

    pub fn at_least(&mut self, n: usize) {
        self.range = n..usize::MAX;
    }

    pub fn at_most(&mut self, n: usize) {
        self.range = 0..n + 1;
    }

    pub fn never(&mut self) {
        self.range = 0..1;
    }
}

impl Default for Times {
    fn default() -> Self {
        // An expectation must be called exactly once unless widened.
        Times { count: 0, range: 1..2 }
    }
}

/// Why a candidate expectation did not accept a dispatch.
#[derive(Debug, Error)]
pub(crate) enum Mismatch {
    #[error("must not be called before {predecessor} is satisfied")]
    Ordering { predecessor: String },
    #[error("expected {expected} argument(s), got {actual}")]
    Arity { expected: usize, actual: usize },
    #[error("argument {index} does not match: wanted {wanted}, got {got}{explain}")]
    Argument {
        index: usize,
        wanted: String,
        got: String,
        explain: String,
    },
    #[error("the variadic arguments do not match: wanted {wanted}, got {got}")]
    Variadic { wanted: String, got: String },
    #[error("the expectation is exhausted; at most {max} call(s) are allowed")]
    Exhausted { max: usize },
}

struct CallState {
    times: Times,
    actions: Vec<Arc<Action>>,
    writes: Vec<Arc<SetArgWrite>>,
    after: Option<Weak<Call>>,
}

/// Everything dispatch needs from a matched call once the controller lock has
/// been released: the action for this invocation and the pending out-parameter
/// writes.
pub(crate) struct Dispatched {
    pub(crate) action: Option<Arc<Action>>,
    pub(crate) writes: Vec<Arc<SetArgWrite>>,
}

/// One registered expectation: a method identity, ordered argument matchers,
/// a call-count constraint, an optional ordering predecessor, and a queue of
/// actions.
pub(crate) struct Call {
    method: Method,
    matchers: Vec<Box<dyn Matcher>>,
    origin: &'static Location<'static>,
    reporter: Arc<dyn TestReporter>,
    state: Mutex<CallState>,
}

impl Call {
    pub(crate) fn new(
        method: Method,
        matchers: Vec<Box<dyn Matcher>>,
        origin: &'static Location<'static>,
        reporter: Arc<dyn TestReporter>,
    ) -> Self {
        Call {
            method,
            matchers,
            origin,
            reporter,
            state: Mutex::new(CallState {
                times: Times::default(),
                actions: Vec::new(),
                writes: Vec::new(),
                after: None,
            }),
        }
    }

    pub(crate) fn method(&self) -> &Method {
        &self.method
    }

    /// Would this expectation accept the dispatch right now?  Checks the
    /// ordering predecessor, then the argument matchers, then exhaustion, so
    /// the returned mismatch names the most useful reason.
    pub(crate) fn try_match(&self, args: &[Arg<'_>]) -> Result<(), Mismatch> {
        let st = self.state.lock();
        if let Some(weak) = &st.after {
            // A dropped predecessor belonged to a controller that is gone;
            // treat it as satisfied rather than blocking forever.
            if let Some(pred) = weak.upgrade() {
                let satisfied =
                    if std::ptr::eq(Arc::as_ptr(&pred), self as *const Call) {
                        st.times.is_satisfied()
                    } else {
                        pred.state.lock().times.is_satisfied()
                    };
                if !satisfied {
                    return Err(Mismatch::Ordering {
                        predecessor: pred.to_string(),
                    });
                }
            }
        }
        self.match_args(args)?;
        if st.times.is_exhausted() {
            return Err(Mismatch::Exhausted { max: st.times.maximum() });
        }
        Ok(())
    }

    fn match_args(&self, args: &[Arg<'_>]) -> Result<(), Mismatch> {
        if !self.method.is_variadic() {
            if args.len() != self.matchers.len() {
                return Err(Mismatch::Arity {
                    expected: self.matchers.len(),
                    actual: args.len(),
                });
            }
            for (i, m) in self.matchers.iter().enumerate() {
                check_arg(i, m.as_ref(), &args[i])?;
            }
            return Ok(());
        }

        let arity = self.method.arity();
        let tail = match args.get(arity).and_then(Arg::tail) {
            Some(tail) if args.len() == arity + 1 => tail,
            _ => {
                return Err(Mismatch::Arity {
                    expected: arity,
                    actual: args.len(),
                })
            }
        };
        for (i, m) in self.matchers.iter().take(arity).enumerate() {
            check_arg(i, m.as_ref(), &args[i])?;
        }
        let tail_matchers = &self.matchers[arity..];
        match tail_matchers.len() {
            // No trailing matchers were registered, so only an empty tail
            // matches.
            0 => {
                if !tail.is_empty() {
                    return Err(Mismatch::Variadic {
                        wanted: "no variadic arguments".to_owned(),
                        got: format!("{:?}", args[arity].view()),
                    });
                }
            }
            // A single trailing matcher may match either the sole tail
            // element (direct form) or the whole collected tail, which is how
            // `any()` accepts an empty tail.
            1 => {
                let m = &tail_matchers[0];
                let direct =
                    tail.len() == 1 && m.matches(tail[0].view());
                if !direct && !m.matches(args[arity].view()) {
                    return Err(Mismatch::Variadic {
                        wanted: m.to_string(),
                        got: format!("{:?}", args[arity].view()),
                    });
                }
            }
            // One matcher per tail element.
            n => {
                if tail.len() != n {
                    return Err(Mismatch::Variadic {
                        wanted: format!("{n} variadic argument(s)"),
                        got: format!("{:?}", args[arity].view()),
                    });
                }
                for (j, m) in tail_matchers.iter().enumerate() {
                    if !m.matches(tail[j].view()) {
                        return Err(Mismatch::Argument {
                            index: arity + j,
                            wanted: m.to_string(),
                            got: format!("{:?}", tail[j]),
                            explain: String::new(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Record one matched invocation and snapshot what must run once the
    /// controller lock is released.  The action queue is consumed one action
    /// per call, the last action persisting.
    pub(crate) fn commit(&self) -> Dispatched {
        let mut st = self.state.lock();
        let nth = st.times.increment();
        let action = if st.actions.is_empty() {
            None
        } else {
            Some(st.actions[min(nth - 1, st.actions.len() - 1)].clone())
        };
        Dispatched { action, writes: st.writes.clone() }
    }

    /// A verification failure report, if this expectation has not reached its
    /// minimum call count.
    pub(crate) fn unsatisfied_report(&self) -> Option<String> {
        let st = self.state.lock();
        if st.times.is_satisfied() {
            None
        } else {
            Some(format!(
                "missing call(s) to {self}; \
                 expected at least {} call(s), got {}",
                st.times.minimum(),
                st.times.count(),
            ))
        }
    }
}

fn check_arg(
    index: usize,
    m: &dyn Matcher,
    arg: &Arg<'_>,
) -> Result<(), Mismatch> {
    if m.matches(arg.view()) {
        return Ok(());
    }
    let explain = m
        .explain(arg.view())
        .map(|e| format!("\n{e}"))
        .unwrap_or_default();
    Err(Mismatch::Argument {
        index,
        wanted: m.to_string(),
        got: format!("{arg:?}"),
        explain,
    })
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.method.name())?;
        for (i, m) in self.matchers.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            fmt::Display::fmt(m, f)?;
        }
        write!(f, ") registered at {}", self.origin)
    }
}

/// Handle to a registered expectation, supporting fluent refinement.
///
/// Every method returns the handle, so refinements chain; the handle is
/// `Clone`, so an earlier expectation can still be named as an ordering
/// predecessor of a later one.
#[derive(Clone)]
pub struct CallHandle {
    call: Arc<Call>,
}

impl CallHandle {
    pub(crate) fn new(call: Arc<Call>) -> Self {
        CallHandle { call }
    }

    /// Return fixed values from every matched call.  The values are checked
    /// for count and assignability against the method's declared return types
    /// now, at registration.
    pub fn returns(self, values: Vec<Ret>) -> Self {
        let slots = self.call.method.returns();
        if values.len() != slots.len() {
            self.call.reporter.fatalf(format!(
                "wrong number of return values for {}: \
                 the method returns {} value(s) but {} were registered",
                self.call,
                slots.len(),
                values.len(),
            ));
        }
        for (i, (v, slot)) in values.iter().zip(slots).enumerate() {
            if !slot.admits(v.type_id(), v.is_nil()) {
                self.call.reporter.fatalf(format!(
                    "return value {i} of {} is not assignable: \
                     a {} cannot become a {}",
                    self.call,
                    v.type_name(),
                    slot.type_name(),
                ));
            }
        }
        self.call
            .state
            .lock()
            .actions
            .push(Arc::new(Action::Return(values)));
        self
    }

    /// Compute the return values from the call's arguments.  The produced
    /// count and types are validated against the method's declared return
    /// types at the moment they are produced; a mismatch is fatal.
    pub fn returning<F>(self, f: F) -> Self
    where
        F: FnMut(&[Arg<'_>]) -> Vec<Value> + Send + 'static,
    {
        self.call
            .state
            .lock()
            .actions
            .push(Arc::new(Action::DoAndReturn(Mutex::new(Box::new(f)))));
        self
    }

    /// Single-threaded version of [`returning`](Self::returning), for
    /// closures that aren't `Send`.  It is a runtime error to dispatch the
    /// mocked method from a different thread than the one that registered the
    /// closure.
    pub fn returning_st<F>(self, f: F) -> Self
    where
        F: FnMut(&[Arg<'_>]) -> Vec<Value> + 'static,
    {
        let mut fragile = Fragile::new(f);
        self.returning(move |args| (fragile.get_mut())(args))
    }

    /// Invoke `f` with the call's arguments for its side effect.  The call
    /// still yields each declared return slot's zero value.
    pub fn run<F>(self, f: F) -> Self
    where
        F: FnMut(&[Arg<'_>]) + Send + 'static,
    {
        self.call
            .state
            .lock()
            .actions
            .push(Arc::new(Action::Do(Mutex::new(Box::new(f)))));
        self
    }

    /// Single-threaded version of [`run`](Self::run), for closures that
    /// aren't `Send`.
    pub fn run_st<F>(self, f: F) -> Self
    where
        F: FnMut(&[Arg<'_>]) + 'static,
    {
        let mut fragile = Fragile::new(f);
        self.run(move |args| (fragile.get_mut())(args))
    }

    /// Write `value` through the out-parameter at `index` on every matched
    /// call, before any queued action runs.
    pub fn set_arg<T>(self, index: usize, value: T) -> Self
    where
        T: any::Any + fmt::Debug + Send + Sync + Clone,
    {
        if index >= self.call.method.arity() {
            self.call.reporter.fatalf(format!(
                "set_arg index {index} is out of range for {}: \
                 the method has {} parameter(s)",
                self.call,
                self.call.method.arity(),
            ));
        }
        self.call
            .state
            .lock()
            .writes
            .push(Arc::new(SetArgWrite::new(index, value)));
        self
    }

    /// Require this expectation to be called exactly `n` times.
    pub fn times(self, n: usize) -> Self {
        self.call.state.lock().times.n(n);
        self
    }

    /// Allow this expectation to be called any number of times, including
    /// zero.
    pub fn times_any(self) -> Self {
        self.call.state.lock().times.any();
        self
    }

    /// Allow this expectation to be called any number of times within the
    /// given half-open range.
    pub fn times_range(self, range: Range<usize>) -> Self {
        self.call.state.lock().times.range(range);
        self
    }

    /// Require this expectation to be called at least `n` times.
    pub fn min_times(self, n: usize) -> Self {
        self.call.state.lock().times.at_least(n);
        self
    }

    /// Allow this expectation to be called at most `n` times.
    pub fn max_times(self, n: usize) -> Self {
        self.call.state.lock().times.at_most(n);
        self
    }

    /// Forbid this expectation from ever being called.
    pub fn never(self) -> Self {
        self.call.state.lock().times.never();
        self
    }

    /// Declare that this expectation must not match until `other` has been
    /// called its minimum number of times.  The relation holds a weak
    /// reference, so it does not extend the predecessor's lifetime.
    pub fn after(self, other: &CallHandle) -> Self {
        self.call.state.lock().after = Some(Arc::downgrade(&other.call));
        self
    }
}

/// Declare that the given expectations must be satisfied in order, by
/// chaining [`after`](CallHandle::after) across consecutive pairs.
pub fn in_order(handles: &[&CallHandle]) {
    for pair in handles.windows(2) {
        let _ = pair[1].clone().after(pair[0]);
    }
}
