// vim: tw=80
//! Argument matchers.
//!
//! A [`Matcher`] answers "does this argument match?" and can describe itself
//! for failure messages.  Matchers are immutable once built and are evaluated
//! while the controller lock is held, so they must not call back into the
//! controller.
//!
//! Literal values become equality matchers through [`IntoMatcher`] and the
//! [`args!`](crate::args) macro; anything that is already a matcher passes
//! through unchanged:
//!
//! ```
//! use understudy::args;
//! use understudy::matchers::any;
//!
//! let ms = args!["a", 1, any()];
//! assert_eq!("is equal to \"a\"", ms[0].to_string());
//! assert_eq!("is anything", ms[2].to_string());
//! ```

use std::any;
use std::fmt;
use std::marker::PhantomData;

use predicates::prelude::*;
use predicates_tree::CaseTreeExt;

use crate::value::{ArgValue, ArgView};

/// The matching capability.
///
/// `Display` is the matcher's self-description, used solely in failure
/// diagnostics.
pub trait Matcher: fmt::Display + Send + Sync {
    /// Does this argument match?  Must not panic for any argument, including
    /// absent values.
    fn matches(&self, arg: ArgView<'_>) -> bool;

    /// A more detailed account of why `arg` failed to match, when the matcher
    /// can produce one.
    fn explain(&self, arg: ArgView<'_>) -> Option<String> {
        let _ = arg;
        None
    }
}

struct EqMatcher<T>(T);

impl<T> Matcher for EqMatcher<T>
where
    T: PartialEq + fmt::Debug + Send + Sync + any::Any,
{
    fn matches(&self, arg: ArgView<'_>) -> bool {
        // Equality never crosses types: an absent interface value does not
        // equal a present zero value, and vice versa.
        arg.downcast_ref::<T>().map_or(false, |v| *v == self.0)
    }
}

impl<T: fmt::Debug> fmt::Display for EqMatcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "is equal to {:?}", self.0)
    }
}

/// Matches a value equal to `expected`, of the same type.
pub fn eq<T>(expected: T) -> Box<dyn Matcher>
where
    T: PartialEq + fmt::Debug + Send + Sync + any::Any,
{
    Box::new(EqMatcher(expected))
}

struct AnyMatcher;

impl Matcher for AnyMatcher {
    fn matches(&self, _: ArgView<'_>) -> bool {
        true
    }
}

impl fmt::Display for AnyMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("is anything")
    }
}

/// Matches any argument, including an absent value and the whole variadic
/// tail of a variadic method.
pub fn any() -> Box<dyn Matcher> {
    Box::new(AnyMatcher)
}

struct NilMatcher;

impl Matcher for NilMatcher {
    fn matches(&self, arg: ArgView<'_>) -> bool {
        arg.is_nil()
    }
}

impl fmt::Display for NilMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("is nil")
    }
}

/// Matches an absent argument, whatever its concrete type: a `None` pointer,
/// channel end, and boxed trait object all match the same `nil()`.
pub fn nil() -> Box<dyn Matcher> {
    Box::new(NilMatcher)
}

struct TypeMatcher<T> {
    _ph: PhantomData<fn(&T)>,
}

impl<T> Matcher for TypeMatcher<T>
where
    T: any::Any + fmt::Debug + Send,
{
    fn matches(&self, arg: ArgView<'_>) -> bool {
        arg.downcast_ref::<T>().is_some()
    }
}

impl<T> fmt::Display for TypeMatcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "is a {}", any::type_name::<T>())
    }
}

/// Matches any argument of type `T`.
pub fn of_type<T>() -> Box<dyn Matcher>
where
    T: any::Any + fmt::Debug + Send,
{
    Box::new(TypeMatcher::<T> { _ph: PhantomData })
}

struct CondMatcher<T, F> {
    f: F,
    _ph: PhantomData<fn(&T)>,
}

impl<T, F> Matcher for CondMatcher<T, F>
where
    T: any::Any + fmt::Debug + Send,
    F: Fn(&T) -> bool + Send + Sync,
{
    fn matches(&self, arg: ArgView<'_>) -> bool {
        arg.downcast_ref::<T>().map_or(false, |v| (self.f)(v))
    }
}

impl<T, F> fmt::Display for CondMatcher<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "satisfies a condition on {}", any::type_name::<T>())
    }
}

/// Matches a `T` for which the supplied function returns `true`.
pub fn cond<T, F>(f: F) -> Box<dyn Matcher>
where
    T: any::Any + fmt::Debug + Send,
    F: Fn(&T) -> bool + Send + Sync + 'static,
{
    Box::new(CondMatcher { f, _ph: PhantomData })
}

struct PredMatcher<T, P> {
    pred: P,
    _ph: PhantomData<fn(&T)>,
}

impl<T, P> Matcher for PredMatcher<T, P>
where
    T: any::Any + fmt::Debug + Send,
    P: Predicate<T> + Send + Sync,
{
    fn matches(&self, arg: ArgView<'_>) -> bool {
        arg.downcast_ref::<T>().map_or(false, |v| self.pred.eval(v))
    }

    fn explain(&self, arg: ArgView<'_>) -> Option<String> {
        let v = arg.downcast_ref::<T>()?;
        self.pred.find_case(false, v).map(|case| case.tree().to_string())
    }
}

impl<T, P: fmt::Display> fmt::Display for PredMatcher<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.pred, f)
    }
}

/// Matches a `T` accepted by any [`Predicate`].
///
/// ```
/// use understudy::matchers::{pred, Matcher};
/// use understudy::{predicate, Arg};
///
/// let m = pred(predicate::gt(5i64));
/// assert!(m.matches(Arg::of(9i64).view()));
/// assert!(!m.matches(Arg::of(3i64).view()));
/// ```
pub fn pred<T, P>(p: P) -> Box<dyn Matcher>
where
    T: any::Any + fmt::Debug + Send,
    P: Predicate<T> + Send + Sync + 'static,
{
    Box::new(PredMatcher { pred: p, _ph: PhantomData })
}

struct NotMatcher(Box<dyn Matcher>);

impl Matcher for NotMatcher {
    fn matches(&self, arg: ArgView<'_>) -> bool {
        !self.0.matches(arg)
    }
}

impl fmt::Display for NotMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "not({})", self.0)
    }
}

/// Inverts a matcher.
pub fn not(inner: Box<dyn Matcher>) -> Box<dyn Matcher> {
    Box::new(NotMatcher(inner))
}

struct AllOfMatcher(Vec<Box<dyn Matcher>>);

impl Matcher for AllOfMatcher {
    fn matches(&self, arg: ArgView<'_>) -> bool {
        self.0.iter().all(|m| m.matches(arg))
    }
}

impl fmt::Display for AllOfMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("all of: ")?;
        fmt_joined(f, &self.0)
    }
}

/// Matches when every inner matcher matches.
pub fn all_of(inner: Vec<Box<dyn Matcher>>) -> Box<dyn Matcher> {
    Box::new(AllOfMatcher(inner))
}

struct AnyOfMatcher(Vec<Box<dyn Matcher>>);

impl Matcher for AnyOfMatcher {
    fn matches(&self, arg: ArgView<'_>) -> bool {
        self.0.iter().any(|m| m.matches(arg))
    }
}

impl fmt::Display for AnyOfMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any of: ")?;
        fmt_joined(f, &self.0)
    }
}

/// Matches when at least one inner matcher matches.
pub fn any_of(inner: Vec<Box<dyn Matcher>>) -> Box<dyn Matcher> {
    Box::new(AnyOfMatcher(inner))
}

fn fmt_joined(
    f: &mut fmt::Formatter<'_>,
    ms: &[Box<dyn Matcher>],
) -> fmt::Result {
    for (i, m) in ms.iter().enumerate() {
        if i > 0 {
            f.write_str("; ")?;
        }
        fmt::Display::fmt(m, f)?;
    }
    Ok(())
}

/// Conversion used by the [`args!`](crate::args) macro: raw literal values
/// become equality matchers, while existing matchers pass through unchanged.
pub trait IntoMatcher {
    fn into_matcher(self) -> Box<dyn Matcher>;
}

impl IntoMatcher for Box<dyn Matcher> {
    fn into_matcher(self) -> Box<dyn Matcher> {
        self
    }
}

macro_rules! literal_into_matcher {
    ($($t:ty),*) => {
        $(
            impl IntoMatcher for $t {
                fn into_matcher(self) -> Box<dyn Matcher> {
                    eq(self)
                }
            }
        )*
    }
}

literal_into_matcher! {
    i8, i16, i32, i64, i128, isize,
    u8, u16, u32, u64, u128, usize,
    f32, f64, bool, char, &'static str, String
}
