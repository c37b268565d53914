//! Tests for numbers.

use gisp_engine::{new_interp, Value};

fn eval(source: &str) -> Value {
    let mut interp = new_interp().expect("create interpreter");
    interp.eval_source(source).expect("evaluation")
}

#[test]
fn test_add() {
    assert_eq!(eval("(+ 1 2 3 4)"), Value::Int(10));
    assert_eq!(eval("(+)"), Value::Int(0));
    assert_eq!(eval("(+ 1 2.5)"), Value::Real(3.5));
}

#[test]
fn test_sub() {
    assert_eq!(eval("(- 10 3 2)"), Value::Int(5));
    assert_eq!(eval("(- 7)"), Value::Int(-7));
}

#[test]
fn test_mul() {
    assert_eq!(eval("(* 2 3 4)"), Value::Int(24));
    assert_eq!(eval("(*)"), Value::Int(1));
}

#[test]
fn test_div() {
    assert_eq!(eval("(/ 10 4)"), Value::Real(2.5));
    assert_eq!(eval("(/ 10 2)"), Value::Int(5));
    assert_eq!(eval("(/ 1.0 4)"), Value::Real(0.25));
}

#[test]
fn test_mod_chains() {
    // ((123 mod 45) mod 7) = (33 mod 7) = 5
    assert_eq!(eval("(% 123 45 7)"), Value::Int(5));
}

#[test]
fn test_division_by_zero() {
    let mut interp = new_interp().expect("create interpreter");
    assert!(interp.eval_source("(/ 1 0)").is_err());
    assert!(interp.eval_source("(% 1 0)").is_err());
}

#[test]
fn test_comparisons_chain() {
    assert_eq!(eval("(< 1 2 3)"), Value::Bool(true));
    assert_eq!(eval("(< 1 3 2)"), Value::Bool(false));
    assert_eq!(eval("(<= 1 1 2)"), Value::Bool(true));
    assert_eq!(eval("(= 1 1.0)"), Value::Bool(true));
    assert_eq!(eval("(>= 3 3 2)"), Value::Bool(true));
}

#[test]
fn test_type_errors() {
    let mut interp = new_interp().expect("create interpreter");
    assert!(interp.eval_source("(+ 1 'a)").is_err());
    assert!(interp.eval_source("(< 1 \"x\")").is_err());
}

#[test]
fn test_nan_is_not_equal_to_itself() {
    // IEEE semantics for equal on reals.
    assert_eq!(eval("(equal 0.0 0.0)"), Value::Bool(true));
    assert_eq!(
        eval("(define inf (* 1e308 10.0)) (define nan (- inf inf)) (equal nan nan)"),
        Value::Bool(false)
    );
}

#[test]
fn test_bit_operations() {
    assert_eq!(eval("(<< 1 4)"), Value::Int(16));
    assert_eq!(eval("(>> -8 1)"), Value::Int(-4));
    assert_eq!(eval("(& 6 3)"), Value::Int(2));
    assert_eq!(eval("(| 4 1)"), Value::Int(5));
    assert_eq!(eval("(^ 5 3)"), Value::Int(6));
    assert_eq!(eval("(^ 0)"), Value::Int(-1));
    assert_eq!(eval("(&^ 7 2)"), Value::Int(5));
}
