//! Quasiquotation, observed through evaluation.

use gisp_engine::utils::{list, sym};
use gisp_engine::{new_interp, Value};

fn eval(source: &str) -> Value {
    let mut interp = new_interp().expect("create interpreter");
    interp.eval_source(source).expect("evaluation")
}

#[test]
fn test_plain_template_quotes() {
    assert_eq!(eval("`x"), sym("x"));
    assert_eq!(eval("`5"), Value::Int(5));
    assert_eq!(eval("`()"), Value::Empty);
    assert_eq!(
        eval("`(a b)"),
        list(&[sym("a"), sym("b")])
    );
}

#[test]
fn test_unquote() {
    assert_eq!(
        eval("(define x 42) `(a ,x)"),
        list(&[sym("a"), Value::Int(42)])
    );
    assert_eq!(eval("(define x 1) `,x"), Value::Int(1));
}

#[test]
fn test_unquote_splicing() {
    // Spec scenario: the spliced list is inlined.
    let value = eval(
        r"
        (define rest (list 2 3))
        (quasiquote (1 (unquote-splicing rest) 4))
        ",
    );
    assert_eq!(
        value,
        list(&[Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)])
    );

    assert_eq!(
        eval("(equal `(1 ,@(list 2 3) 4) (list 1 2 3 4))"),
        Value::Bool(true)
    );
}

#[test]
fn test_splicing_requires_proper_list() {
    let mut interp = new_interp().expect("create interpreter");
    assert!(interp
        .eval_source("`(a ,@(cons 1 2) b)")
        .is_err());
}

#[test]
fn test_improper_template_tail() {
    assert_eq!(eval("`(a . b)").repr().to_string(), "(a . b)");
    assert_eq!(
        eval("(define x 9) `(a . ,x)").repr().to_string(),
        "(a . 9)"
    );
}

#[test]
fn test_nested_depth() {
    // The inner quasiquote shields its unquote one level.
    assert_eq!(
        eval("(define x 7) ``,x").repr().to_string(),
        "(quasiquote (unquote x))"
    );
    assert_eq!(
        eval("(define x 7) `(a `(b ,(c ,x)))").repr().to_string(),
        "(a (quasiquote (b (unquote (c 7)))))"
    );
}

#[test]
fn test_template_mixes_sugar_and_long_forms() {
    assert_eq!(
        eval("(quasiquote (1 (unquote (+ 1 1))))"),
        list(&[Value::Int(1), Value::Int(2)])
    );
}
