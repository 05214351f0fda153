// vim: tw=80
//! Actions: side effects, computed returns, default zero values, and the
//! per-call consumption of the action queue.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use understudy::matchers::any;
use understudy::{args, rets, Arg, Controller, Method, ReturnType, Value};

fn put() -> Method {
    Method::new("Index.Put", 2)
}

fn nillable_ret() -> Method {
    Method::new("Index.NillableRet", 0)
        .with_return(ReturnType::nilable::<Option<String>>())
}

fn next() -> Method {
    Method::new("Counter.Next", 0).with_return(ReturnType::of::<i64>())
}

fn add() -> Method {
    Method::new("Adder.Add", 2).with_return(ReturnType::of::<i64>())
}

#[test]
fn a_call_without_actions_returns_zero_values() {
    let ctrl = Controller::new();
    ctrl.expect(nillable_ret(), args![]);

    let out = ctrl.call(&nillable_ret(), vec![]);
    assert_eq!(
        None,
        out.into_iter().next().unwrap().take::<Option<String>>()
    );
    ctrl.verify();
}

#[test]
fn run_observes_the_call_arguments() {
    let seen = Arc::new(Mutex::new(String::new()));
    let sink = Arc::clone(&seen);

    let ctrl = Controller::new();
    ctrl.expect(put(), args![any(), any()]).run(move |args| {
        let key = args[0].downcast_ref::<&str>().unwrap();
        sink.lock().unwrap().push_str(key);
    });

    ctrl.call(&put(), vec![Arg::of("blah"), Arg::of(7)]);
    assert_eq!("blah", seen.lock().unwrap().as_str());
    ctrl.verify();
}

#[test]
fn run_still_returns_zero_values() {
    let ctrl = Controller::new();
    ctrl.expect(nillable_ret(), args![]).run(|_| {});

    let out = ctrl.call(&nillable_ret(), vec![]);
    assert_eq!(
        None,
        out.into_iter().next().unwrap().take::<Option<String>>()
    );
    ctrl.verify();
}

#[test]
fn run_passes_absent_arguments_through() {
    let ctrl = Controller::new();
    ctrl.expect(put(), args!["nil-key", any()]).run(|args| {
        assert!(args[1].is_nil());
    });

    ctrl.call(&put(), vec![Arg::of("nil-key"), Arg::nil()]);
    ctrl.verify();
}

#[test]
fn returning_computes_results_from_the_arguments() {
    let ctrl = Controller::new();
    ctrl.expect(add(), args![any(), any()]).returning(|args| {
        let x = *args[0].downcast_ref::<i64>().unwrap();
        let y = *args[1].downcast_ref::<i64>().unwrap();
        vec![Value::of(x + y)]
    });

    let out = ctrl.call(&add(), vec![Arg::of(3i64), Arg::of(4i64)]);
    assert_eq!(7, out.into_iter().next().unwrap().take::<i64>());
    ctrl.verify();
}

#[test]
fn the_action_queue_is_consumed_in_order_and_the_last_persists() {
    let ctrl = Controller::new();
    ctrl.expect(next(), args![])
        .times(3)
        .returns(rets![1i64])
        .returning(|_| vec![Value::of(2i64)]);

    let calls: Vec<i64> = (0..3)
        .map(|_| {
            ctrl.call(&next(), vec![])
                .into_iter()
                .next()
                .unwrap()
                .take::<i64>()
        })
        .collect();
    assert_eq!(vec![1, 2, 2], calls);
    ctrl.verify();
}

#[test]
fn a_side_effect_action_is_followed_by_the_next_queued_action() {
    let hits = Arc::new(Mutex::new(0u32));
    let sink = Arc::clone(&hits);

    let ctrl = Controller::new();
    ctrl.expect(next(), args![])
        .times(2)
        .run(move |_| *sink.lock().unwrap() += 1)
        .returns(rets![9i64]);

    let first = ctrl.call(&next(), vec![]);
    let second = ctrl.call(&next(), vec![]);
    assert_eq!(0, first.into_iter().next().unwrap().take::<i64>());
    assert_eq!(9, second.into_iter().next().unwrap().take::<i64>());
    assert_eq!(1, *hits.lock().unwrap());
    ctrl.verify();
}

#[test]
fn run_st_accepts_closures_that_are_not_send() {
    let count = Rc::new(Cell::new(0));
    let sink = Rc::clone(&count);

    let ctrl = Controller::new();
    ctrl.expect(put(), args![any(), any()])
        .run_st(move |_| sink.set(sink.get() + 1));

    ctrl.call(&put(), vec![Arg::of("a"), Arg::of(1)]);
    assert_eq!(1, count.get());
    ctrl.verify();
}

#[test]
fn returning_st_accepts_closures_that_are_not_send() {
    let base = Rc::new(Cell::new(40i64));
    let sink = Rc::clone(&base);

    let ctrl = Controller::new();
    ctrl.expect(next(), args![])
        .returning_st(move |_| vec![Value::of(sink.get() + 2)]);

    let out = ctrl.call(&next(), vec![]);
    assert_eq!(42, out.into_iter().next().unwrap().take::<i64>());
    ctrl.verify();
}
