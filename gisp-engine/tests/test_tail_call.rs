//! Deep recursion must run in constant host stack: every tail position
//! installs the next expression instead of growing the control stack.

use gisp_engine::utils::sym;
use gisp_engine::{new_interp, Value};

#[test]
fn test_tail_recursive_loop() {
    let mut interp = new_interp().expect("create interpreter");
    let value = interp
        .eval_source(
            r"
            (define (loop n) (if (= n 0) 'done (loop (- n 1))))
            (loop 1000000)
            ",
        )
        .expect("evaluation");
    assert_eq!(value, sym("done"));
}

#[test]
fn test_accumulating_sum() {
    let mut interp = new_interp().expect("create interpreter");
    let value = interp
        .eval_source(
            r"
            (define (sum n acc) (if (= n 0) acc (sum (- n 1) (+ acc n))))
            (sum 10000 0)
            ",
        )
        .expect("evaluation");
    assert_eq!(value, Value::Int(50005000));
}

#[test]
fn test_tail_position_in_begin() {
    let mut interp = new_interp().expect("create interpreter");
    let value = interp
        .eval_source(
            r"
            (define (spin n)
              (if (= n 0)
                  'ok
                  (begin 'ignored (spin (- n 1)))))
            (spin 200000)
            ",
        )
        .expect("evaluation");
    assert_eq!(value, sym("ok"));
}

#[test]
fn test_tail_position_in_cond_and_let() {
    let mut interp = new_interp().expect("create interpreter");
    let value = interp
        .eval_source(
            r"
            (define (down n)
              (cond ((= n 0) 'zero)
                    (else (let ((next (- n 1))) (down next)))))
            (down 200000)
            ",
        )
        .expect("evaluation");
    assert_eq!(value, sym("zero"));
}

#[test]
fn test_named_let_loop() {
    let mut interp = new_interp().expect("create interpreter");
    let value = interp
        .eval_source(
            r"
            (let walk ((n 100000) (acc 0))
              (if (= n 0) acc (walk (- n 1) (+ acc 1))))
            ",
        )
        .expect("evaluation");
    assert_eq!(value, Value::Int(100000));
}
