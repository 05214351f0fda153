// vim: tw=80
//! Fixed return values are checked for count and assignability at
//! registration, and the absent value conforms to nilable slots only.

use std::sync::mpsc;

use understudy::{args, rets, Controller, Method, Ret, ReturnType};

fn concrete_ret() -> Method {
    Method::new("Index.ConcreteRet", 0)
        .with_return(ReturnType::nilable::<Option<mpsc::Sender<bool>>>())
}

fn next() -> Method {
    Method::new("Counter.Next", 0).with_return(ReturnType::of::<i64>())
}

#[test]
fn a_concrete_value_and_a_nil_both_fit_a_nilable_slot() {
    let (tx, _rx) = mpsc::channel::<bool>();

    let ctrl = Controller::new();
    ctrl.expect(concrete_ret(), args![])
        .returns(rets![Ret::opt(Some(tx))]);
    ctrl.expect(concrete_ret(), args![]).returns(rets![Ret::nil()]);

    let first = ctrl
        .call(&concrete_ret(), vec![])
        .into_iter()
        .next()
        .unwrap()
        .take::<Option<mpsc::Sender<bool>>>();
    let second = ctrl
        .call(&concrete_ret(), vec![])
        .into_iter()
        .next()
        .unwrap()
        .take::<Option<mpsc::Sender<bool>>>();
    assert!(first.is_some());
    assert!(second.is_none());
    ctrl.verify();
}

#[test]
#[should_panic(expected = "is not assignable")]
fn a_wrongly_typed_return_fails_at_registration() {
    let ctrl = Controller::new();
    ctrl.expect(next(), args![]).returns(rets![true]);
}

#[test]
#[should_panic(expected = "is not assignable")]
fn nil_does_not_fit_a_non_nilable_slot() {
    let ctrl = Controller::new();
    ctrl.expect(next(), args![]).returns(rets![Ret::nil()]);
}

#[test]
#[should_panic(expected = "wrong number of return values")]
fn the_return_count_must_match_the_signature() {
    let ctrl = Controller::new();
    ctrl.expect(next(), args![]).returns(rets![1i64, 2i64]);
}

#[test]
fn ret_with_produces_a_fresh_value_per_call() {
    let ctrl = Controller::new();
    ctrl.expect(next(), args![])
        .times(2)
        .returns(rets![Ret::with(|| 5i64)]);

    let first = ctrl.call(&next(), vec![]);
    let second = ctrl.call(&next(), vec![]);
    assert_eq!(5, first.into_iter().next().unwrap().take::<i64>());
    assert_eq!(5, second.into_iter().next().unwrap().take::<i64>());
    ctrl.verify();
}
