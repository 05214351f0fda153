// vim: tw=80
//! Variadic methods: direct per-element matchers, a single matcher covering
//! the whole collected tail, and registration-order precedence between
//! overlapping variadic expectations.

use understudy::matchers::{any, eq};
use understudy::{args, rets, values, Arg, Controller, Method, ReturnType};

fn ellip() -> Method {
    Method::new("Index.Ellip", 1).variadic()
}

fn summed() -> Method {
    Method::new("Index.Summed", 1)
        .variadic()
        .with_return(ReturnType::of::<i32>())
}

#[test]
fn the_direct_form_matches_one_element_per_matcher() {
    let ctrl = Controller::new();
    ctrl.expect(ellip(), args!["%d", 0, 1, 1, 2, 3]);

    ctrl.call(
        &ellip(),
        vec![Arg::of("%d"), Arg::variadic(values![0, 1, 1, 2, 3])],
    );
    ctrl.verify();
}

#[test]
fn the_collected_form_matches_any_tail_including_an_empty_one() {
    let ctrl = Controller::new();
    ctrl.expect(ellip(), args!["%d", any()]).times(2);

    ctrl.call(&ellip(), vec![Arg::of("%d"), Arg::variadic(values![])]);
    ctrl.call(
        &ellip(),
        vec![Arg::of("%d"), Arg::variadic(values![5, 6, 7, 8])],
    );
    ctrl.verify();
}

#[test]
fn a_single_trailing_matcher_also_matches_a_single_element() {
    let ctrl = Controller::new();
    ctrl.expect(ellip(), args!["%d", eq(5)]);

    ctrl.call(&ellip(), vec![Arg::of("%d"), Arg::variadic(values![5])]);
    ctrl.verify();
}

#[test]
fn no_trailing_matchers_require_an_empty_tail() {
    let ctrl = Controller::new();
    ctrl.expect(ellip(), args!["%d"]);

    ctrl.call(&ellip(), vec![Arg::of("%d"), Arg::variadic(values![])]);
    ctrl.verify();
}

#[test]
#[should_panic(expected = "unexpected call to Index.Ellip")]
fn no_trailing_matchers_reject_a_populated_tail() {
    let ctrl = Controller::new();
    ctrl.expect(ellip(), args!["%d"]);

    ctrl.call(&ellip(), vec![Arg::of("%d"), Arg::variadic(values![1])]);
}

#[test]
#[should_panic(expected = "unexpected call to Index.Ellip")]
fn a_direct_form_mismatch_is_reported() {
    let ctrl = Controller::new();
    ctrl.expect(ellip(), args!["%d", 0, 1]);

    ctrl.call(
        &ellip(),
        vec![Arg::of("%d"), Arg::variadic(values![0, 2])],
    );
}

#[test]
fn the_first_registered_variadic_expectation_wins() {
    let ctrl = Controller::new();
    ctrl.expect(summed(), args!["%d", 5, 6, 7, 8]).returns(rets![26i32]);
    ctrl.expect(summed(), args!["%d", any()])
        .times(2)
        .returns(rets![10i32])
        .returns(rets![0i32]);

    let first = ctrl.call(
        &summed(),
        vec![Arg::of("%d"), Arg::variadic(values![1, 2, 3, 4])],
    );
    let second = ctrl.call(
        &summed(),
        vec![Arg::of("%d"), Arg::variadic(values![5, 6, 7, 8])],
    );
    let third = ctrl.call(
        &summed(),
        vec![Arg::of("%d"), Arg::variadic(values![])],
    );
    assert_eq!(10, first.into_iter().next().unwrap().take::<i32>());
    assert_eq!(26, second.into_iter().next().unwrap().take::<i32>());
    assert_eq!(0, third.into_iter().next().unwrap().take::<i32>());
    ctrl.verify();
}
