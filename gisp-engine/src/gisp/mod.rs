//! The curly-brace Gisp surface syntax.
//!
//! A Go-flavored grammar lowered onto the same core forms the
//! s-expression reader produces. The evaluator knows nothing about this
//! surface: `return` becomes a captured continuation, `while` a named
//! let, `switch` a `cond`, and every operator a primitive call.

mod ast;
mod lexer;
mod lower;
mod parser;

use crate::error::Result;
use crate::value::Value;

/// Compile Gisp source text into core forms, one per top-level
/// statement.
pub fn compile(source: &str) -> Result<Vec<Value>> {
    let program = parser::parse(source)?;
    lower::lower_program(&program)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::utils::sym;

    fn compile_one(source: &str) -> Value {
        let mut forms = compile(source).expect("compile failed");
        assert_eq!(forms.len(), 1, "expected exactly one form");
        forms.remove(0)
    }

    #[test]
    fn test_var_lowering() {
        assert_eq!(
            compile_one("var x = 1").repr().to_string(),
            "(define x 1)"
        );
        assert_eq!(compile_one("var x").repr().to_string(), "(define x ())");
    }

    #[test]
    fn test_operator_lowering() {
        assert_eq!(
            compile_one("1 + 2 * 3").repr().to_string(),
            "(+ 1 (* 2 3))"
        );
        assert_eq!(
            compile_one("a == b").repr().to_string(),
            "(equal a b)"
        );
        assert_eq!(
            compile_one("a != b").repr().to_string(),
            "(not (equal a b))"
        );
        assert_eq!(
            compile_one("x && y || z").repr().to_string(),
            "(or (and x y) z)"
        );
        assert_eq!(compile_one("-x").repr().to_string(), "(- x)");
        assert_eq!(compile_one("!x").repr().to_string(), "(not x)");
        assert_eq!(compile_one("^x").repr().to_string(), "(^ x)");
        assert_eq!(compile_one("a &^ b").repr().to_string(), "(&^ a b)");
    }

    #[test]
    fn test_literal_lowering() {
        assert_eq!(
            compile_one("[1, 2, 3]").repr().to_string(),
            "(list 1 2 3)"
        );
        assert_eq!(
            compile_one("#[1, 2]").repr().to_string(),
            "(vector 1 2)"
        );
        assert_eq!(compile_one("nil").repr().to_string(), "()");
        assert_eq!(compile_one("v[i]").repr().to_string(), "(vectorRef v i)");
    }

    #[test]
    fn test_sexpr_literal() {
        assert_eq!(
            compile_one("`(+ 1 2)`").repr().to_string(),
            "(+ 1 2)"
        );
    }

    #[test]
    fn test_assignment_lowering() {
        assert_eq!(
            compile_one("x = 5").repr().to_string(),
            "(set! x 5)"
        );
        assert_eq!(
            compile_one("x += 5").repr().to_string(),
            "(+= (quote x) 5)"
        );
        assert_eq!(compile_one("x++").repr().to_string(), "(++ (quote x))");
        assert_eq!(
            compile_one("v[0] = 9").repr().to_string(),
            "(vectorSet v 0 9)"
        );
        assert_eq!(
            compile_one("v[0] += 9").repr().to_string(),
            "(vectorSet v 0 (+ (vectorRef v 0) 9))"
        );
    }

    #[test]
    fn test_func_lowering() {
        let form = compile_one("func inc(n) { return n + 1 }");
        let parts = form.list_to_vec().unwrap();
        assert_eq!(parts[0], sym("define"));
        assert_eq!(parts[1], sym("inc"));
        assert_eq!(
            parts[2].repr().to_string(),
            "(lambda (n) (call/cc (lambda (__return) (__return (+ n 1)))))"
        );
    }

    #[test]
    fn test_while_lowering() {
        let form = compile_one("while x < 10 { x++ }");
        let text = form.repr().to_string();
        assert!(text.starts_with("(call/cc (lambda (__break)"), "{text}");
        assert!(text.contains("(let __loop ()"), "{text}");
        assert!(text.contains("(call/cc (lambda (__continue)"), "{text}");
        assert!(text.contains("(if (< x 10)"), "{text}");
    }

    #[test]
    fn test_switch_lowering() {
        assert_eq!(
            compile_one("switch { case a: 1; default: 2 }")
                .repr()
                .to_string(),
            "(cond (a 1) (else 2))"
        );
    }

    #[test]
    fn test_if_expression_lowering() {
        assert_eq!(
            compile_one("var m = if a { 1 } else { 2 }")
                .repr()
                .to_string(),
            "(define m (if a 1 2))"
        );
    }

    #[test]
    fn test_incomplete_input() {
        assert!(compile("func f() {").unwrap_err().is_incomplete());
        assert!(compile("1 +").unwrap_err().is_incomplete());
    }

    #[test]
    fn test_break_outside_loop() {
        assert!(compile("break").is_err());
    }
}
