//! Quasiquotation expander.
//!
//! Rewrites `(quasiquote TEMPLATE)` templates into plain `cons`,
//! `append` and `quote` forms before evaluation, so the evaluator never
//! sees `quasiquote` at runtime. Nesting is handled with a depth
//! counter: `unquote` forms only go live at depth 1, otherwise they are
//! rebuilt one level shallower.

use crate::error::{Error, Result};
use crate::utils::{list, sym};
use crate::value::Value;

pub(crate) fn expand(template: &Value) -> Result<Value> {
    expand_at(template, 1)
}

fn expand_at(template: &Value, depth: usize) -> Result<Value> {
    let pair = match template {
        Value::Pair(pair) => pair,
        Value::Symbol(_) | Value::Empty => {
            return Ok(list(&[sym("quote"), template.clone()]))
        }
        // Numbers, strings, booleans, vectors and the opaque tags are
        // self-evaluating.
        atom => return Ok(atom.clone()),
    };

    let (head, tail) = {
        let cell = pair.borrow();
        (cell.first.clone(), cell.rest.clone())
    };

    match head.as_symbol() {
        Some("unquote") => {
            let (form, after) = unary_tag(&tail, "unquote")?;
            if depth == 1 {
                // Evaluate live in the surrounding context.
                Ok(form)
            } else {
                Ok(list(&[
                    sym("cons"),
                    list(&[sym("quote"), sym("unquote")]),
                    cons_form(expand_at(&form, depth - 1)?, expand_at(&after, depth)?),
                ]))
            }
        }
        Some("unquote-splicing") => {
            let (form, after) = unary_tag(&tail, "unquote-splicing")?;
            if depth == 1 {
                // A splice in template position copies the spliced list.
                Ok(list(&[sym("append"), form, expand_at(&after, depth)?]))
            } else {
                Ok(list(&[
                    sym("cons"),
                    list(&[sym("quote"), sym("unquote-splicing")]),
                    cons_form(expand_at(&form, depth - 1)?, expand_at(&after, depth)?),
                ]))
            }
        }
        Some("quasiquote") => {
            let (form, after) = unary_tag(&tail, "quasiquote")?;
            Ok(list(&[
                sym("cons"),
                list(&[sym("quote"), sym("quasiquote")]),
                cons_form(expand_at(&form, depth + 1)?, expand_at(&after, depth)?),
            ]))
        }
        _ => {
            // A splice in element position goes live here: the element's
            // list value is appended onto the expansion of the tail.
            if depth == 1 {
                if let Some(spliced) = splicing_element(&head) {
                    return Ok(list(&[sym("append"), spliced, expand_at(&tail, depth)?]));
                }
            }
            Ok(cons_form(
                expand_at(&head, depth)?,
                expand_at(&tail, depth)?,
            ))
        }
    }
}

fn cons_form(first: Value, rest: Value) -> Value {
    list(&[sym("cons"), first, rest])
}

/// Matches an element of the shape `(unquote-splicing X)` and returns X.
fn splicing_element(element: &Value) -> Option<Value> {
    let pair = element.as_pair()?;
    let (head, tail) = {
        let cell = pair.borrow();
        (cell.first.clone(), cell.rest.clone())
    };
    if head.as_symbol() != Some("unquote-splicing") {
        return None;
    }
    let inner = tail.as_pair()?;
    let result = inner.borrow().first.clone();
    Some(result)
}

/// Splits `(TAG FORM . AFTER)` tails: returns FORM and AFTER.
fn unary_tag(tail: &Value, tag: &str) -> Result<(Value, Value)> {
    match tail.as_pair() {
        Some(pair) => {
            let cell = pair.borrow();
            Ok((cell.first.clone(), cell.rest.clone()))
        }
        None => Err(Error::Syntax(format!("{tag} expects a form"))),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn qq(source: &str) -> Value {
        let template = crate::parser::parse(source)
            .expect("parse failed")
            .remove(0);
        expand(&template).expect("expansion failed")
    }

    #[test]
    fn test_atoms_self_evaluate() {
        assert_eq!(qq("1"), Value::Int(1));
        assert_eq!(qq("\"s\""), Value::string("s"));
        assert_eq!(qq("#t"), Value::Bool(true));
    }

    #[test]
    fn test_symbol_quoted() {
        assert_eq!(qq("x"), list(&[sym("quote"), sym("x")]));
        assert_eq!(qq("()"), list(&[sym("quote"), Value::Empty]));
    }

    #[test]
    fn test_unquote_goes_live() {
        assert_eq!(qq(",x"), sym("x"));
        // `(a ,b) => (cons 'a (cons b '()))
        assert_eq!(
            qq("(a ,b)"),
            list(&[
                sym("cons"),
                list(&[sym("quote"), sym("a")]),
                list(&[
                    sym("cons"),
                    sym("b"),
                    list(&[sym("quote"), Value::Empty])
                ])
            ])
        );
    }

    #[test]
    fn test_splicing_element() {
        // `(,@xs) => (append xs (quote ()))
        assert_eq!(
            qq("(,@xs)"),
            list(&[
                sym("append"),
                sym("xs"),
                list(&[sym("quote"), Value::Empty])
            ])
        );
    }

    #[test]
    fn test_improper_tail_preserved() {
        // `(a . b) => (cons 'a 'b)
        assert_eq!(
            qq("(a . b)"),
            list(&[
                sym("cons"),
                list(&[sym("quote"), sym("a")]),
                list(&[sym("quote"), sym("b")])
            ])
        );
        // `(a . 5) => (cons 'a 5)
        assert_eq!(
            qq("(a . 5)"),
            list(&[sym("cons"), list(&[sym("quote"), sym("a")]), Value::Int(5)])
        );
    }

    #[test]
    fn test_nested_quasiquote_requotes() {
        // The inner quasiquote survives one level down.
        let expansion = qq("`,x");
        assert_eq!(
            expansion,
            list(&[
                sym("cons"),
                list(&[sym("quote"), sym("quasiquote")]),
                list(&[
                    sym("cons"),
                    list(&[
                        sym("cons"),
                        list(&[sym("quote"), sym("unquote")]),
                        list(&[
                            sym("cons"),
                            list(&[sym("quote"), sym("x")]),
                            list(&[sym("quote"), Value::Empty])
                        ])
                    ]),
                    list(&[sym("quote"), Value::Empty])
                ])
            ])
        );
    }

    #[test]
    fn test_naked_splice_copies() {
        // `,@xs => (append xs (quote ()))  -- wrapped in nothing else.
        assert_eq!(
            qq(",@xs"),
            list(&[
                sym("append"),
                sym("xs"),
                list(&[sym("quote"), Value::Empty])
            ])
        );
    }
}
