use gisp_engine::{new_interp, Value};

/// A lambda call works, and its locals don't leak into the
/// enclosing environment.
#[test]
fn test_lambda_call() {
    let mut interp = new_interp().expect("create interpreter");

    let value = interp
        .eval_source("(define add-self (lambda (x) (+ x x))) (add-self 7)")
        .expect("evaluation");
    assert_eq!(value, Value::Int(14));

    assert!(
        interp.global().borrow().get("x").is_err(),
        "lambda local leaked to global env"
    );
}

#[test]
fn test_closure_captures_environment() {
    let mut interp = new_interp().expect("create interpreter");

    let value = interp
        .eval_source(
            r"
            (define (make-counter)
              (define count 0)
              (lambda () (set! count (+ count 1)) count))
            (define tick (make-counter))
            (tick)
            (tick)
            (tick)
            ",
        )
        .expect("evaluation");
    assert_eq!(value, Value::Int(3));
}

#[test]
fn test_variadic_parameters() {
    let mut interp = new_interp().expect("create interpreter");

    // A bare symbol takes all arguments as a list.
    let value = interp
        .eval_source("((lambda args (length args)) 1 2 3)")
        .expect("evaluation");
    assert_eq!(value, Value::Int(3));

    // A dotted tail takes the surplus.
    let value = interp
        .eval_source("((lambda (a . more) (cons a (length more))) 1 2 3)")
        .expect("evaluation");
    assert_eq!(value.repr().to_string(), "(1 . 2)");
}

#[test]
fn test_arity_errors() {
    let mut interp = new_interp().expect("create interpreter");
    assert!(interp.eval_source("((lambda (a b) a) 1)").is_err());
    assert!(interp.eval_source("((lambda (a b) a) 1 2 3)").is_err());
    // The variadic tail accepts any surplus.
    assert!(interp.eval_source("((lambda (a . b) a) 1 2 3)").is_ok());
}

#[test]
fn test_define_procedure_form() {
    let mut interp = new_interp().expect("create interpreter");
    let value = interp
        .eval_source("(define (second . args) (first (rest args))) (second 1 2 3)")
        .expect("evaluation");
    assert_eq!(value, Value::Int(2));
}

#[test]
fn test_applying_non_callable_fails() {
    let mut interp = new_interp().expect("create interpreter");
    assert!(interp.eval_source("(1 2 3)").is_err());
    assert!(interp.eval_source("(\"not-a-function\")").is_err());
}

#[test]
fn test_apply_primitive() {
    let mut interp = new_interp().expect("create interpreter");
    let value = interp
        .eval_source("(apply + 1 2 '(3 4))")
        .expect("evaluation");
    assert_eq!(value, Value::Int(10));
}
