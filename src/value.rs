// vim: tw=80
//! Dynamically typed values.
//!
//! Test doubles forward heterogeneous argument lists into the engine, so the
//! engine stores every argument and return value behind the [`ArgValue`]
//! payload trait.  The trait keeps two things that would otherwise be lost to
//! type erasure: the `Debug` rendering (for failure messages) and the concrete
//! type (recovered with `downcast`).

use std::any;
use std::any::TypeId;
use std::fmt;

use downcast::*;

/// Payload stored inside a [`Value`] or behind an out-parameter [`Slot`].
///
/// Implemented for every `'static + Debug + Send` type, so anything a mocked
/// method can carry is already an `ArgValue`.
pub trait ArgValue: Any + Send {
    /// Format the payload the way its `Debug` impl would.
    fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;

    #[doc(hidden)]
    fn into_boxed_any(self: Box<Self>) -> Box<dyn any::Any>;
}
downcast!(dyn ArgValue);

impl<T: any::Any + fmt::Debug + Send> ArgValue for T {
    fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }

    fn into_boxed_any(self: Box<Self>) -> Box<dyn any::Any> {
        self
    }
}

/// The payload of the untyped absent value.
struct Nil;

impl fmt::Debug for Nil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("nil")
    }
}

/// One captured argument or return value.
pub struct Value {
    payload: Box<dyn ArgValue>,
    id: TypeId,
    type_name: &'static str,
    nil: bool,
}

impl Value {
    /// Capture `v` by value.
    pub fn of<T: any::Any + fmt::Debug + Send>(v: T) -> Self {
        Value {
            payload: Box::new(v),
            id: TypeId::of::<T>(),
            type_name: any::type_name::<T>(),
            nil: false,
        }
    }

    /// Capture an optional value, remembering whether it was absent.
    ///
    /// `None` is treated as absent no matter what `T` is, so the `nil()`
    /// matcher accepts a `None` pointer, channel end, or boxed trait object
    /// alike.
    pub fn opt<T: any::Any + fmt::Debug + Send>(v: Option<T>) -> Self {
        let nil = v.is_none();
        Value {
            payload: Box::new(v),
            id: TypeId::of::<Option<T>>(),
            type_name: any::type_name::<Option<T>>(),
            nil,
        }
    }

    /// The untyped absent value.
    ///
    /// As a registered return value it conforms to any nilable return slot by
    /// yielding that slot's zero value.
    pub fn nil() -> Self {
        Value {
            payload: Box::new(Nil),
            id: TypeId::of::<Nil>(),
            type_name: "nil",
            nil: true,
        }
    }

    pub fn is_nil(&self) -> bool {
        self.nil
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn type_id(&self) -> TypeId {
        self.id
    }

    /// Borrow the payload as a `T`, if that is what it is.
    pub fn downcast_ref<T: ArgValue>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>().ok()
    }

    /// Recover the concrete value the producer stored.
    ///
    /// This is the thunk-facing exit point for return values, and the engine
    /// has already validated assignability by the time a `Value` reaches the
    /// thunk, so a type mismatch here is a defect in the thunk itself.
    ///
    /// # Panics
    ///
    /// Panics if the payload is not a `T`.
    pub fn take<T: any::Any>(self) -> T {
        let type_name = self.type_name;
        match self.payload.into_boxed_any().downcast::<T>() {
            Ok(v) => *v,
            Err(_) => panic!(
                "cannot take a {} out of a value of type {}",
                any::type_name::<T>(),
                type_name
            ),
        }
    }

    /// The read-only projection matchers are evaluated against.
    pub fn view(&self) -> ArgView<'_> {
        ArgView {
            payload: &*self.payload,
            type_name: self.type_name,
            nil: self.nil,
            tail: None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.payload.fmt_value(f)
    }
}

/// An out-parameter the engine may write through with
/// [`set_arg`](crate::CallHandle::set_arg).
pub struct Slot<'a> {
    target: &'a mut dyn ArgValue,
    type_name: &'static str,
}

impl Slot<'_> {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Borrow the referenced storage mutably as a `T`.
    pub fn downcast_mut<T: ArgValue>(&mut self) -> Option<&mut T> {
        self.target.downcast_mut::<T>().ok()
    }
}

/// One argument of an intercepted call, as passed to
/// [`Controller::call`](crate::Controller::call).
pub enum Arg<'a> {
    /// An argument captured by value.
    Owned(Value),
    /// An out-parameter argument.
    Slot(Slot<'a>),
    /// The synthetic trailing argument of a variadic method, carrying the
    /// collected variadic tail.  Always passed for variadic methods, even
    /// when the tail is empty.
    Tail(Vec<Value>),
}

static TAIL_PAYLOAD: Nil = Nil;

impl<'a> Arg<'a> {
    /// Capture `v` by value.
    pub fn of<T: any::Any + fmt::Debug + Send>(v: T) -> Self {
        Arg::Owned(Value::of(v))
    }

    /// Capture an optional value, remembering whether it was absent.
    pub fn opt<T: any::Any + fmt::Debug + Send>(v: Option<T>) -> Self {
        Arg::Owned(Value::opt(v))
    }

    /// The untyped absent argument.
    pub fn nil() -> Self {
        Arg::Owned(Value::nil())
    }

    /// An out-parameter argument pointing at the caller's storage.
    pub fn slot<T: any::Any + fmt::Debug + Send>(target: &'a mut T) -> Self {
        Arg::Slot(Slot {
            target,
            type_name: any::type_name::<T>(),
        })
    }

    /// The collected variadic tail.
    pub fn variadic(values: Vec<Value>) -> Self {
        Arg::Tail(values)
    }

    /// Borrow the argument as a `T`, if that is what it is.
    pub fn downcast_ref<T: ArgValue>(&self) -> Option<&T> {
        self.view().downcast_ref::<T>()
    }

    pub fn is_nil(&self) -> bool {
        self.view().is_nil()
    }

    /// The variadic tail, if this is the synthetic trailing argument.
    pub fn tail(&self) -> Option<&[Value]> {
        match self {
            Arg::Tail(values) => Some(values),
            _ => None,
        }
    }

    /// The read-only projection matchers are evaluated against.
    pub fn view(&self) -> ArgView<'_> {
        match self {
            Arg::Owned(v) => v.view(),
            Arg::Slot(s) => ArgView {
                payload: &*s.target,
                type_name: s.type_name,
                nil: false,
                tail: None,
            },
            Arg::Tail(values) => ArgView {
                payload: &TAIL_PAYLOAD,
                type_name: "variadic tail",
                nil: false,
                tail: Some(values),
            },
        }
    }
}

impl fmt::Debug for Arg<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.view(), f)
    }
}

/// Read-only projection of an argument; what matchers are evaluated against.
#[derive(Clone, Copy)]
pub struct ArgView<'a> {
    payload: &'a dyn ArgValue,
    type_name: &'a str,
    nil: bool,
    tail: Option<&'a [Value]>,
}

impl<'a> ArgView<'a> {
    /// Borrow the argument as a `T`, if that is what it is.
    pub fn downcast_ref<T: ArgValue>(self) -> Option<&'a T> {
        self.payload.downcast_ref::<T>().ok()
    }

    /// Whether the argument is an absent value.
    pub fn is_nil(self) -> bool {
        self.nil
    }

    /// The variadic tail, if this view is of the synthetic trailing argument.
    pub fn tail(self) -> Option<&'a [Value]> {
        self.tail
    }

    pub fn type_name(self) -> &'a str {
        self.type_name
    }
}

impl fmt::Debug for ArgView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tail {
            Some(values) => f.debug_list().entries(values).finish(),
            None => self.payload.fmt_value(f),
        }
    }
}

/// Render an argument list the way it appears in failure messages.  The
/// variadic tail is spliced into the list rather than printed as a nested
/// sequence.
pub(crate) fn fmt_args(args: &[Arg<'_>]) -> String {
    let mut parts = Vec::new();
    for arg in args {
        match arg {
            Arg::Tail(values) => {
                parts.extend(values.iter().map(|v| format!("{v:?}")));
            }
            other => parts.push(format!("{other:?}")),
        }
    }
    parts.join(", ")
}

/// Conversions used by the [`values!`](crate::values) macro, so that literal
/// arguments need no explicit [`Value::of`] wrapping.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

macro_rules! literal_into_value {
    ($($t:ty),*) => {
        $(
            impl IntoValue for $t {
                fn into_value(self) -> Value {
                    Value::of(self)
                }
            }
        )*
    }
}

literal_into_value! {
    i8, i16, i32, i64, i128, isize,
    u8, u16, u32, u64, u128, usize,
    f32, f64, bool, char, &'static str, String
}
