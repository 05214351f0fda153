// vim: tw=80
//! The live collection of registered expectations.

use std::collections::HashMap;
use std::sync::Arc;

use crate::call::Call;
use crate::method::Method;
use crate::value::{fmt_args, Arg};

/// All registered expectations of one controller, keyed by method identity.
///
/// Per method the expectations stay in registration order: callers control
/// precedence between overlapping matchers purely through that order.
/// Exhausted expectations are never removed; they still serve as ordering
/// predecessors and appear in diagnostics.
#[derive(Default)]
pub(crate) struct CallSet {
    expected: HashMap<&'static str, Vec<Arc<Call>>>,
}

impl CallSet {
    pub(crate) fn add(&mut self, call: Arc<Call>) {
        self.expected
            .entry(call.method().name())
            .or_default()
            .push(call);
    }

    /// Find the first expectation, in registration order, that accepts this
    /// dispatch.  On failure the error is the complete report: the actual
    /// call, and every registered expectation for the method with the precise
    /// reason it did not match.
    pub(crate) fn find_match(
        &self,
        method: &Method,
        args: &[Arg<'_>],
    ) -> Result<Arc<Call>, String> {
        let calls = self.expected.get(method.name());
        let mut reasons = Vec::new();
        for call in calls.into_iter().flatten() {
            match call.try_match(args) {
                Ok(()) => return Ok(Arc::clone(call)),
                Err(mismatch) => {
                    reasons.push(format!("    {call}: {mismatch}"));
                }
            }
        }
        let mut report = format!(
            "unexpected call to {}({})",
            method.name(),
            fmt_args(args),
        );
        if reasons.is_empty() {
            report.push_str(": there are no expectations registered for \
                             this method");
        } else {
            report.push_str(&format!(
                "\nthe registered expectations for {} are:\n{}",
                method.name(),
                reasons.join("\n"),
            ));
        }
        Err(report)
    }

    /// One report per expectation that has not reached its minimum call
    /// count, in registration order across methods.
    pub(crate) fn failures(&self) -> Vec<String> {
        let mut methods: Vec<_> = self.expected.keys().copied().collect();
        methods.sort_unstable();
        methods
            .iter()
            .flat_map(|name| &self.expected[name])
            .filter_map(|call| call.unsatisfied_report())
            .collect()
    }
}
