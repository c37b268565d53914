//! First-class continuation behavior: escape, re-entry, multi-shot
//! invocation, and arity.

use gisp_engine::utils::sym;
use gisp_engine::{new_interp, Value};

#[test]
fn test_normal_return() {
    let mut interp = new_interp().expect("create interpreter");
    // The thunk returning normally yields the call/cc result.
    let value = interp
        .eval_source("(call/cc (lambda (k) 42))")
        .expect("evaluation");
    assert_eq!(value, Value::Int(42));
}

#[test]
fn test_escape() {
    let mut interp = new_interp().expect("create interpreter");
    // Invoking k abandons the rest of the thunk.
    let value = interp
        .eval_source("(+ 1 (call/cc (lambda (k) (k 10) (error \"unreachable\"))))")
        .expect("evaluation");
    assert_eq!(value, Value::Int(11));
}

#[test]
fn test_reentry_after_escape() {
    let mut interp = new_interp().expect("create interpreter");
    let value = interp
        .eval_source(
            r"
            (define saved #f)
            (define result
              (call/cc (lambda (k)
                         (set! saved k)
                         k)))
            (if (eq saved result) (saved 'second) result)
            ",
        )
        .expect("evaluation");
    assert_eq!(value, sym("second"));
}

#[test]
fn test_multi_shot() {
    let mut interp = new_interp().expect("create interpreter");
    interp
        .eval_source(
            r"
            (define saved #f)
            (call/cc (lambda (k) (set! saved k) 'first))
            ",
        )
        .expect("evaluation");

    // The same continuation can be fired any number of times; every
    // invocation runs on a fresh copy of the captured stack.
    assert_eq!(
        interp.eval_source("(saved 'x)").expect("evaluation"),
        sym("x")
    );
    assert_eq!(
        interp.eval_source("(saved 'x)").expect("evaluation"),
        sym("x")
    );
    assert_eq!(
        interp.eval_source("(saved 'y)").expect("evaluation"),
        sym("y")
    );
}

#[test]
fn test_zero_argument_invocation_delivers_empty() {
    let mut interp = new_interp().expect("create interpreter");
    interp
        .eval_source("(define saved #f) (call/cc (lambda (k) (set! saved k) #t))")
        .expect("evaluation");
    assert_eq!(
        interp.eval_source("(saved)").expect("evaluation"),
        Value::Empty
    );
}

#[test]
fn test_continuation_arity_error() {
    let mut interp = new_interp().expect("create interpreter");
    interp
        .eval_source("(define saved #f) (call/cc (lambda (k) (set! saved k) #t))")
        .expect("evaluation");
    assert!(interp.eval_source("(saved 1 2)").is_err());
}

#[test]
fn test_captured_stack_reruns_pending_work() {
    let mut interp = new_interp().expect("create interpreter");
    // The continuation holds the pending addition and definition; every
    // invocation re-runs them with the delivered value.
    interp
        .eval_source(
            r"
            (define saved #f)
            (define total
              (+ 100 (call/cc (lambda (k) (set! saved k) 0))))
            ",
        )
        .expect("evaluation");
    assert_eq!(
        interp.global().borrow().get("total").expect("total"),
        Value::Int(100)
    );

    assert_eq!(
        interp.eval_source("(saved 7)").expect("evaluation"),
        Value::Int(107)
    );
    // The captured environment is a reference, not a copy: the
    // re-entered define rewrote the same binding.
    assert_eq!(
        interp.global().borrow().get("total").expect("total"),
        Value::Int(107)
    );

    assert_eq!(
        interp.eval_source("(saved 900)").expect("evaluation"),
        Value::Int(1000)
    );
    assert_eq!(
        interp.global().borrow().get("total").expect("total"),
        Value::Int(1000)
    );
}

#[test]
fn test_generator_style_back_and_forth() {
    let mut interp = new_interp().expect("create interpreter");
    let value = interp
        .eval_source(
            r"
            (define out '())
            (define resume #f)
            (define (emit x)
              (call/cc (lambda (k)
                         (set! resume k)
                         (set! out (cons x out)))))
            (emit 1)
            (length out)
            ",
        )
        .expect("evaluation");
    assert_eq!(value, Value::Int(1));
}

#[test]
fn test_callcc_requires_callable() {
    let mut interp = new_interp().expect("create interpreter");
    assert!(interp.eval_source("(call/cc 5)").is_err());
}
