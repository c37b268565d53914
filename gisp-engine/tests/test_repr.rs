//! Tests for the external display representation of values.

use gisp_engine::utils::{cons, nil};
use gisp_engine::{new_interp, parse, Value};

#[test]
fn test_list_repr() {
    assert_eq!(
        cons(1i64, cons(2i64, nil())).repr().to_string(),
        "(1 2)"
    );
    assert_eq!(
        cons(1i64, cons(2i64, 3i64)).repr().to_string(),
        "(1 2 . 3)"
    );
}

#[test]
fn test_opaque_repr() {
    let mut interp = new_interp().expect("create interpreter");

    let closure = interp.eval_source("(lambda (x) x)").expect("evaluation");
    assert_eq!(closure.repr().to_string(), "<closure>");

    let primitive = interp.eval_source("cons").expect("evaluation");
    assert_eq!(primitive.repr().to_string(), "<primitive>");

    let mac = interp
        .eval_source("(define-macro (m) 1)")
        .expect("evaluation");
    assert_eq!(mac.repr().to_string(), "<macro>");

    let continuation = interp
        .eval_source("(call/cc (lambda (k) k))")
        .expect("evaluation");
    assert_eq!(continuation.repr().to_string(), "<continuation>");
}

/// Values without opaque tags parse back to an equal value.
#[test]
fn test_round_trip() {
    let sources = [
        "()",
        "#t",
        "#f",
        "42",
        "-7",
        "2.5",
        "1.0",
        "\"a\\nb \\\"quoted\\\"\"",
        "some-symbol",
        "(1 2 3)",
        "(1 (2 3) (4 (5)))",
        "(1 . 2)",
        "#(1 two \"three\")",
    ];

    for source in sources {
        let value = parse(source).expect("parse failed").remove(0);
        let printed = value.repr().to_string();
        let reparsed = parse(&printed).expect("reparse failed").remove(0);
        assert_eq!(value, reparsed, "round trip failed for {source}");
    }
}

#[test]
fn test_eof_repr() {
    assert_eq!(Value::Eof.repr().to_string(), "#<eof>");
}
