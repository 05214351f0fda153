// vim: tw=80
//! The controller: registration, dispatch, and verification.

use std::panic::Location;
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::action::Action;
use crate::call::{Call, CallHandle, Dispatched};
use crate::call_set::CallSet;
use crate::matchers::Matcher;
use crate::method::Method;
use crate::reporter::{PanicReporter, TestReporter};
use crate::value::{Arg, Value};

struct Inner {
    calls: CallSet,
    finished: bool,
}

/// Owns every expectation of one test and checks the substitute's actual
/// usage against them.
///
/// A controller is an explicit, passed-around object with no process-wide
/// state behind it, so parallel tests stay isolated.  Create one at test
/// start, register expectations, dispatch the substitute's calls through it,
/// and finalize it with [`verify`](Controller::verify) at teardown.  Using a
/// controller after `verify` is a programmer error and fails fatally.
pub struct Controller {
    inner: Mutex<Inner>,
    reporter: Arc<dyn TestReporter>,
}

impl Controller {
    /// A controller reporting through [`PanicReporter`].
    pub fn new() -> Self {
        Self::with_reporter(Arc::new(PanicReporter))
    }

    /// A controller reporting through the given collaborator.
    pub fn with_reporter(reporter: Arc<dyn TestReporter>) -> Self {
        Controller {
            inner: Mutex::new(Inner {
                calls: CallSet::default(),
                finished: false,
            }),
            reporter,
        }
    }

    /// Register an expectation: the named method will be called with
    /// arguments accepted by `matchers`.  Exactly once by default; refine
    /// through the returned handle.
    ///
    /// For non-variadic methods the matcher count must equal the method's
    /// arity.  A variadic method takes one matcher per declared parameter
    /// plus either one matcher per trailing element or a single matcher
    /// covering the whole tail.
    #[track_caller]
    pub fn expect(
        &self,
        method: Method,
        matchers: Vec<Box<dyn Matcher>>,
    ) -> CallHandle {
        let origin = Location::caller();
        if method.is_variadic() {
            if matchers.len() < method.arity() {
                self.reporter.fatalf(format!(
                    "{origin}: expected call to {} needs at least {} \
                     matcher(s), got {}",
                    method.name(),
                    method.arity(),
                    matchers.len(),
                ));
            }
        } else if matchers.len() != method.arity() {
            self.reporter.fatalf(format!(
                "{origin}: expected call to {} needs {} matcher(s), got {}",
                method.name(),
                method.arity(),
                matchers.len(),
            ));
        }
        let call = Arc::new(Call::new(
            method,
            matchers,
            origin,
            Arc::clone(&self.reporter),
        ));
        let mut inner = self.inner.lock();
        if inner.finished {
            drop(inner);
            self.reporter.fatalf(format!(
                "{origin}: expectation registered after verify()",
            ));
        }
        inner.calls.add(Arc::clone(&call));
        drop(inner);
        CallHandle::new(call)
    }

    /// Dispatch one intercepted invocation and produce its results, one
    /// [`Value`] per declared return slot.
    ///
    /// Selection and call-count mutation happen under the controller lock;
    /// the matched expectation's out-parameter writes and queued action run
    /// after the lock is released, so an action may legally re-enter the
    /// controller.
    #[track_caller]
    pub fn call(
        &self,
        method: &Method,
        mut args: Vec<Arg<'_>>,
    ) -> Vec<Value> {
        let caller = Location::caller();
        let (call, dispatched) = {
            let inner = self.inner.lock();
            if inner.finished {
                drop(inner);
                self.reporter.fatalf(format!(
                    "{caller}: {} called after verify()",
                    method.name(),
                ));
            }
            match inner.calls.find_match(method, &args) {
                Ok(call) => {
                    let dispatched = call.commit();
                    (call, dispatched)
                }
                Err(report) => {
                    drop(inner);
                    self.reporter.fatalf(format!("{caller}: {report}"));
                }
            }
        };
        let Dispatched { action, writes } = dispatched;

        for write in writes {
            if let Err(e) = write.apply(&mut args[write.index]) {
                self.reporter.fatalf(format!(
                    "{caller}: set_arg({}) on {call} cannot be applied: {e}",
                    write.index,
                ));
            }
        }

        let slots = call.method().returns();
        match action.as_deref() {
            None => slots.iter().map(|slot| slot.zero()).collect(),
            Some(Action::Return(rets)) => rets
                .iter()
                .zip(slots)
                .map(|(ret, slot)| slot.conform(ret.produce()))
                .collect(),
            Some(Action::Do(f)) => {
                let mut func = f.lock();
                (*func)(&args);
                drop(func);
                slots.iter().map(|slot| slot.zero()).collect()
            }
            Some(Action::DoAndReturn(f)) => {
                let results = {
                    let mut func = f.lock();
                    (*func)(&args)
                };
                if results.len() != slots.len() {
                    self.reporter.fatalf(format!(
                        "{caller}: wrong number of return values produced \
                         for {call}: the method returns {} value(s) but the \
                         function produced {}",
                        slots.len(),
                        results.len(),
                    ));
                }
                results
                    .into_iter()
                    .zip(slots)
                    .enumerate()
                    .map(|(i, (value, slot))| {
                        if !slot.admits(value.type_id(), value.is_nil()) {
                            self.reporter.fatalf(format!(
                                "{caller}: return value {i} produced for \
                                 {call} is not assignable: a {} cannot \
                                 become a {}",
                                value.type_name(),
                                slot.type_name(),
                            ));
                        }
                        slot.conform(value)
                    })
                    .collect()
            }
        }
    }

    /// Finalize the controller: report every expectation that has not reached
    /// its minimum call count.  All missing calls are reported before the
    /// single fatal failure, so one verification surfaces everything.
    #[track_caller]
    pub fn verify(&self) {
        let failures = {
            let mut inner = self.inner.lock();
            if inner.finished {
                drop(inner);
                self.reporter.fatalf(
                    "verify() called on a controller that is already \
                     finished"
                        .to_owned(),
                );
            }
            inner.finished = true;
            inner.calls.failures()
        };
        for failure in &failures {
            self.reporter.errorf(failure.clone());
        }
        if !failures.is_empty() {
            self.reporter
                .fatalf("aborting test due to missing call(s)".to_owned());
        }
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        // Safety net for tests that forget the explicit verify().  Skipped
        // while panicking so an earlier failure keeps its own message.
        if thread::panicking() {
            return;
        }
        let inner = self.inner.get_mut();
        if inner.finished {
            return;
        }
        inner.finished = true;
        let failures = inner.calls.failures();
        if !failures.is_empty() {
            for failure in &failures {
                self.reporter.errorf(failure.clone());
            }
            self.reporter.fatalf(
                "controller dropped before verify() with missing call(s)"
                    .to_owned(),
            );
        }
    }
}
