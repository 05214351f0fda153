// vim: tw=80
//! Method descriptors.
//!
//! The engine never sees an interface definition; the mock-generation layer
//! (or a handwritten test double) describes each mocked method with a
//! [`Method`]: its identity, its parameter shape, and the return slots that
//! dispatch must be able to populate.

use std::any;
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use crate::value::Value;

/// One declared return slot of a mocked method.
///
/// Carries everything dispatch needs to type-check a registered or produced
/// return value and to synthesize the slot's zero value when no action
/// provides one.
#[derive(Clone)]
pub struct ReturnType {
    id: TypeId,
    type_name: &'static str,
    nilable: bool,
    zero: Arc<dyn Fn() -> Value + Send + Sync>,
}

impl ReturnType {
    /// A return slot of type `T`, whose zero value is `T::default()`.
    pub fn of<T>() -> Self
    where
        T: any::Any + fmt::Debug + Send + Default,
    {
        ReturnType {
            id: TypeId::of::<T>(),
            type_name: any::type_name::<T>(),
            nilable: false,
            zero: Arc::new(|| Value::of(T::default())),
        }
    }

    /// A return slot that admits the absent value, such as an `Option`.
    ///
    /// [`Value::nil`] and [`Ret::nil`](crate::Ret::nil) conform to a nilable
    /// slot by yielding the slot's zero value.
    pub fn nilable<T>() -> Self
    where
        T: any::Any + fmt::Debug + Send + Default,
    {
        ReturnType {
            nilable: true,
            ..Self::of::<T>()
        }
    }

    /// A return slot of a type without a `Default`, with an explicit zero
    /// value producer.
    pub fn with_zero<T, F>(zero: F) -> Self
    where
        T: any::Any + fmt::Debug + Send,
        F: Fn() -> T + Send + Sync + 'static,
    {
        ReturnType {
            id: TypeId::of::<T>(),
            type_name: any::type_name::<T>(),
            nilable: false,
            zero: Arc::new(move || Value::of(zero())),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn zero(&self) -> Value {
        (self.zero.as_ref())()
    }

    /// The assignability predicate: a value fits this slot when its concrete
    /// type is the slot's type, or when it is absent and the slot is nilable.
    /// There is no numeric widening.
    pub(crate) fn admits(&self, id: TypeId, nil: bool) -> bool {
        id == self.id || (nil && self.nilable)
    }

    /// Convert an admitted value into exactly what the thunk will take out of
    /// the slot.
    pub(crate) fn conform(&self, value: Value) -> Value {
        if value.type_id() == self.id {
            value
        } else {
            // admits() already held, so this is an absent value going into a
            // nilable slot.
            self.zero()
        }
    }
}

/// The identity and signature of a mocked method.
///
/// `name` keys the controller's call set, so it must be unique per substitute
/// method; qualifying it with the interface name (`"Index.Put"`) lets one
/// controller serve several substitutes.
#[derive(Clone)]
pub struct Method {
    name: &'static str,
    arity: usize,
    variadic: bool,
    returns: Vec<ReturnType>,
}

impl Method {
    /// A method with `arity` declared parameters and no return values.  For
    /// variadic methods `arity` counts only the parameters before the
    /// variadic tail.
    pub fn new(name: &'static str, arity: usize) -> Self {
        Method {
            name,
            arity,
            variadic: false,
            returns: Vec::new(),
        }
    }

    /// Mark the method variadic.  Dispatch then expects the collected tail as
    /// a synthetic trailing argument.
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    /// Append a return slot.
    pub fn with_return(mut self, ret: ReturnType) -> Self {
        self.returns.push(ret);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic
    }

    pub fn returns(&self) -> &[ReturnType] {
        &self.returns
    }
}

#[cfg(test)]
mod t {
    use super::*;

    #[test]
    fn admits_same_type_only() {
        let slot = ReturnType::of::<i64>();
        assert!(slot.admits(TypeId::of::<i64>(), false));
        assert!(!slot.admits(TypeId::of::<i32>(), false));
        // An absent value does not fit a non-nilable slot.
        assert!(!slot.admits(TypeId::of::<()>(), true));
    }

    #[test]
    fn nil_conforms_to_a_nilable_slot() {
        let slot = ReturnType::nilable::<Option<String>>();
        let nil = Value::nil();
        assert!(slot.admits(nil.type_id(), nil.is_nil()));
        assert_eq!(None, slot.conform(nil).take::<Option<String>>());
    }

    #[test]
    fn zero_uses_the_explicit_producer() {
        let slot = ReturnType::with_zero(|| Ok::<u32, String>(0));
        assert_eq!(Ok(0), slot.zero().take::<Result<u32, String>>());
    }
}
