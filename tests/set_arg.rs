// vim: tw=80
//! Out-parameter writes: `set_arg` writes through the caller's storage before
//! the call returns, on every matched call, alongside any queued action.

use understudy::matchers::any;
use understudy::{args, Arg, Controller, Method};

fn ptr() -> Method {
    Method::new("Index.Ptr", 1)
}

#[test]
fn set_arg_writes_through_the_out_parameter() {
    let ctrl = Controller::new();
    ctrl.expect(ptr(), args![any()]).set_arg(0, 7i64);

    let mut target = 0i64;
    ctrl.call(&ptr(), vec![Arg::slot(&mut target)]);
    assert_eq!(7, target);
    ctrl.verify();
}

#[test]
fn set_arg_applies_alongside_a_queued_action() {
    let ctrl = Controller::new();
    ctrl.expect(ptr(), args![any()])
        .set_arg(0, 7i64)
        .run(|args| {
            // The write lands before the action observes the arguments.
            if let Some(v) = args[0].downcast_ref::<i64>() {
                assert_eq!(7, *v);
            } else {
                panic!("out-parameter lost its type");
            }
        });

    let mut target = 0i64;
    ctrl.call(&ptr(), vec![Arg::slot(&mut target)]);
    assert_eq!(7, target);
    ctrl.verify();
}

#[test]
fn set_arg_repeats_on_every_matched_call() {
    let ctrl = Controller::new();
    ctrl.expect(ptr(), args![any()]).times(2).set_arg(0, 7i64);

    let mut first = 0i64;
    let mut second = 1i64;
    ctrl.call(&ptr(), vec![Arg::slot(&mut first)]);
    ctrl.call(&ptr(), vec![Arg::slot(&mut second)]);
    assert_eq!((7, 7), (first, second));
    ctrl.verify();
}

#[test]
#[should_panic(expected = "not an out-parameter")]
fn set_arg_requires_an_out_parameter_argument() {
    let ctrl = Controller::new();
    ctrl.expect(ptr(), args![any()]).set_arg(0, 7i64);

    ctrl.call(&ptr(), vec![Arg::of(0i64)]);
}

#[test]
#[should_panic(expected = "holds a i32, not a i64")]
fn set_arg_requires_the_matching_storage_type() {
    let ctrl = Controller::new();
    ctrl.expect(ptr(), args![any()]).set_arg(0, 7i64);

    let mut target = 0i32;
    ctrl.call(&ptr(), vec![Arg::slot(&mut target)]);
}

#[test]
#[should_panic(expected = "out of range")]
fn set_arg_validates_the_index_at_registration() {
    let ctrl = Controller::new();
    ctrl.expect(ptr(), args![any()]).set_arg(1, 7i64);
}
