// vim: tw=80
//! Actions: what a matched call does.
//!
//! A call's Return/Do/DoAndReturn actions form a queue consumed one action
//! per matched call, the last action persisting for calls beyond the queue
//! length.  `set_arg` writes are kept apart from that queue and applied on
//! every matched call, before the results are produced.

use std::any;
use std::any::TypeId;
use std::fmt;

use parking_lot::Mutex;
use thiserror::Error;

use crate::value::{Arg, Value};

/// A fixed return value that can be produced once per matched call.
///
/// `Return` expectations may be consumed several times (`times(n)`), so the
/// registered values must be re-producible; [`Ret::of`] clones, and
/// [`Ret::with`] runs a producer, which also covers non-`Clone` types.
pub struct Ret {
    produce: Box<dyn Fn() -> Value + Send + Sync>,
    id: TypeId,
    type_name: &'static str,
    nil: bool,
}

impl Ret {
    /// Return a clone of `v` from every matched call.
    pub fn of<T>(v: T) -> Self
    where
        T: any::Any + fmt::Debug + Send + Sync + Clone,
    {
        Ret {
            produce: Box::new(move || Value::of(v.clone())),
            id: TypeId::of::<T>(),
            type_name: any::type_name::<T>(),
            nil: false,
        }
    }

    /// Return a clone of an optional value, remembering whether it was
    /// absent.
    pub fn opt<T>(v: Option<T>) -> Self
    where
        T: any::Any + fmt::Debug + Send + Sync + Clone,
    {
        let nil = v.is_none();
        Ret {
            produce: Box::new(move || Value::opt(v.clone())),
            id: TypeId::of::<Option<T>>(),
            type_name: any::type_name::<Option<T>>(),
            nil,
        }
    }

    /// Return the absent value; conforms to any nilable return slot by
    /// yielding that slot's zero value.
    pub fn nil() -> Self {
        let probe = Value::nil();
        Ret {
            id: probe.type_id(),
            produce: Box::new(Value::nil),
            type_name: "nil",
            nil: true,
        }
    }

    /// Return a freshly produced value from every matched call.
    pub fn with<T, F>(f: F) -> Self
    where
        T: any::Any + fmt::Debug + Send,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Ret {
            produce: Box::new(move || Value::of(f())),
            id: TypeId::of::<T>(),
            type_name: any::type_name::<T>(),
            nil: false,
        }
    }

    pub(crate) fn produce(&self) -> Value {
        (self.produce)()
    }

    pub(crate) fn type_id(&self) -> TypeId {
        self.id
    }

    pub(crate) fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn is_nil(&self) -> bool {
        self.nil
    }
}

/// Conversion used by the [`rets!`](crate::rets) macro, so literal return
/// values need no explicit [`Ret::of`] wrapping.
pub trait IntoRet {
    fn into_ret(self) -> Ret;
}

impl IntoRet for Ret {
    fn into_ret(self) -> Ret {
        self
    }
}

macro_rules! literal_into_ret {
    ($($t:ty),*) => {
        $(
            impl IntoRet for $t {
                fn into_ret(self) -> Ret {
                    Ret::of(self)
                }
            }
        )*
    }
}

literal_into_ret! {
    i8, i16, i32, i64, i128, isize,
    u8, u16, u32, u64, u128, usize,
    f32, f64, bool, char, &'static str, String
}

pub(crate) type DoFn = Box<dyn FnMut(&[Arg<'_>]) + Send>;
pub(crate) type ProduceFn =
    Box<dyn FnMut(&[Arg<'_>]) -> Vec<Value> + Send>;

/// One queued action.  The user closures sit behind their own mutexes (the
/// queue is shared across concurrent dispatches of the same call), acquired
/// only after the controller lock has been released.
pub(crate) enum Action {
    Return(Vec<Ret>),
    Do(Mutex<DoFn>),
    DoAndReturn(Mutex<ProduceFn>),
}

/// Why a `set_arg` write could not be applied.
#[derive(Debug, Error)]
pub(crate) enum WriteError {
    #[error("the argument is not an out-parameter")]
    NotASlot,
    #[error("the out-parameter holds a {got}, not a {want}")]
    TypeMismatch {
        want: &'static str,
        got: &'static str,
    },
}

/// A pending `set_arg` write: the index of the out-parameter and a writer
/// that knows the concrete type.
pub(crate) struct SetArgWrite {
    pub(crate) index: usize,
    apply: Box<dyn Fn(&mut Arg<'_>) -> Result<(), WriteError> + Send + Sync>,
}

impl SetArgWrite {
    pub(crate) fn new<T>(index: usize, value: T) -> Self
    where
        T: any::Any + fmt::Debug + Send + Sync + Clone,
    {
        SetArgWrite {
            index,
            apply: Box::new(move |arg: &mut Arg<'_>| match arg {
                Arg::Slot(slot) => match slot.downcast_mut::<T>() {
                    Some(target) => {
                        *target = value.clone();
                        Ok(())
                    }
                    None => Err(WriteError::TypeMismatch {
                        want: any::type_name::<T>(),
                        got: slot.type_name(),
                    }),
                },
                _ => Err(WriteError::NotASlot),
            }),
        }
    }

    pub(crate) fn apply(&self, arg: &mut Arg<'_>) -> Result<(), WriteError> {
        (self.apply)(arg)
    }
}
