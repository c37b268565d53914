//! Parser for the s-expression reader.
//!
//! Produces core [`Value`] forms directly; the evaluator consumes the
//! reader's output with no further lowering.

use crate::error::{Error, Result};
use crate::token::{Token, TokenKind};
use crate::token_stream::TokenStream;
use crate::utils::{list, sym};
use crate::value::Value;
use crate::Handle;

/// Parse every top-level form in the source.
pub fn parse(source: &str) -> Result<Vec<Value>> {
    let mut tokens = TokenStream::new(source);
    let mut forms = Vec::new();

    while !tokens.at_end()? {
        forms.push(parse_expr(&mut tokens)?);
    }

    Ok(forms)
}

/// Parse the first form in the source, returning it together with the
/// byte offset one past its final token. The `read` primitive uses
/// this to consume forms from a growing input buffer.
pub(crate) fn parse_partial(source: &str) -> Result<(Value, usize)> {
    let mut tokens = TokenStream::new(source);
    if tokens.at_end()? {
        return Err(Error::reader_incomplete("unexpected end of input"));
    }
    let value = parse_expr(&mut tokens)?;
    Ok((value, tokens.offset()))
}

fn parse_expr(tokens: &mut TokenStream) -> Result<Value> {
    let token = tokens.next_token()?;

    match token.kind {
        TokenKind::LeftParen => parse_list(tokens),
        TokenKind::VectorOpen => parse_vector(tokens),
        TokenKind::QuoteMark => parse_quoted("quote", tokens),
        TokenKind::Quasiquote => parse_quoted("quasiquote", tokens),
        TokenKind::Unquote => parse_quoted("unquote", tokens),
        TokenKind::UnquoteSplicing => parse_quoted("unquote-splicing", tokens),
        TokenKind::String => Ok(Value::string(unescape_string(
            token.fragment(tokens.source()),
        ))),
        TokenKind::Atom => {
            let fragment = token.fragment(tokens.source()).to_string();
            parse_atom(&token, &fragment)
        }
        TokenKind::RightParen => Err(Error::reader(
            "unexpected right parenthesis",
            Some(token.span),
        )),
        TokenKind::EOF => Err(Error::reader_incomplete("unexpected end of input")),
    }
}

fn parse_list(tokens: &mut TokenStream) -> Result<Value> {
    let mut items = Vec::new();

    loop {
        let token = tokens.peek()?.clone();
        match token.kind {
            TokenKind::RightParen => {
                tokens.next_token()?;
                return Ok(list(&items));
            }
            TokenKind::EOF => return Err(Error::reader_incomplete("unterminated list")),
            TokenKind::Atom if token.fragment(tokens.source()) == "." => {
                tokens.next_token()?;
                if items.is_empty() {
                    return Err(Error::reader(
                        "dotted tail requires a leading element",
                        Some(token.span),
                    ));
                }
                let tail = parse_expr(tokens)?;
                tokens.consume(TokenKind::RightParen)?;
                return Ok(Value::list_with_tail(&items, tail));
            }
            _ => items.push(parse_expr(tokens)?),
        }
    }
}

fn parse_vector(tokens: &mut TokenStream) -> Result<Value> {
    let mut items = Vec::new();

    loop {
        match tokens.peek_kind()? {
            TokenKind::RightParen => {
                tokens.next_token()?;
                return Ok(Value::Vector(Handle::new(items)));
            }
            TokenKind::EOF => return Err(Error::reader_incomplete("unterminated vector")),
            _ => items.push(parse_expr(tokens)?),
        }
    }
}

/// Expand `'x`, `` `x ``, `,x` and `,@x` into their list forms.
fn parse_quoted(name: &str, tokens: &mut TokenStream) -> Result<Value> {
    let quoted = parse_expr(tokens)?;
    Ok(list(&[sym(name), quoted]))
}

fn parse_atom(token: &Token, fragment: &str) -> Result<Value> {
    debug_assert_eq!(token.kind, TokenKind::Atom);

    if fragment == "." {
        return Err(Error::reader("unexpected dot", Some(token.span)));
    }

    if looks_numeric(fragment) {
        return parse_number(token, fragment);
    }

    if let Some(dispatch) = fragment.strip_prefix('#') {
        return match dispatch {
            "t" => Ok(Value::Bool(true)),
            "f" => Ok(Value::Bool(false)),
            _ => Err(Error::reader(
                format!("unknown # dispatch: {fragment:?}"),
                Some(token.span),
            )),
        };
    }

    Ok(Value::symbol(fragment))
}

/// An atom is a number candidate when its first character after an
/// optional sign is a digit, or a point followed by a digit. Anything
/// else is a symbol, so `+`, `-` and `...` stay identifiers.
pub(crate) fn looks_numeric(fragment: &str) -> bool {
    let unsigned = fragment
        .strip_prefix(['+', '-'])
        .unwrap_or(fragment);

    let mut chars = unsigned.chars();
    match chars.next() {
        Some(ch) if ch.is_ascii_digit() => true,
        Some('.') => chars.next().is_some_and(|ch| ch.is_ascii_digit()),
        _ => false,
    }
}

fn parse_number(token: &Token, fragment: &str) -> Result<Value> {
    if let Ok(int) = fragment.parse::<i64>() {
        return Ok(Value::Int(int));
    }

    fragment
        .parse::<f64>()
        .map(Value::Real)
        .map_err(|err| Error::reader(format!("malformed number {fragment:?}: {err}"), Some(token.span)))
}

fn unescape_string(raw: &str) -> String {
    // The span includes both quotes.
    let inner = &raw[1..raw.len() - 1];
    let mut text = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => text.push('\n'),
                Some('t') => text.push('\t'),
                // `\"`, `\\` and unknown escapes pass the character through.
                Some(other) => text.push(other),
                None => {}
            }
        } else {
            text.push(ch);
        }
    }

    text
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::utils::cons;

    fn parse_one(source: &str) -> Value {
        let mut forms = parse(source).expect("parse failed");
        assert_eq!(forms.len(), 1, "expected exactly one form");
        forms.remove(0)
    }

    #[test]
    fn test_numbers() {
        assert_eq!(parse_one("42"), Value::Int(42));
        assert_eq!(parse_one("-7"), Value::Int(-7));
        assert_eq!(parse_one("+13"), Value::Int(13));
        assert_eq!(parse_one("2.5"), Value::Real(2.5));
        assert_eq!(parse_one("-1e3"), Value::Real(-1000.0));
        assert_eq!(parse_one(".5"), Value::Real(0.5));
    }

    #[test]
    fn test_symbols() {
        assert_eq!(parse_one("+"), sym("+"));
        assert_eq!(parse_one("set!"), sym("set!"));
        assert_eq!(parse_one("list->vector"), sym("list->vector"));
    }

    #[test]
    fn test_booleans() {
        assert_eq!(parse_one("#t"), Value::Bool(true));
        assert_eq!(parse_one("#f"), Value::Bool(false));
        assert!(parse("#q").is_err());
    }

    #[test]
    fn test_strings() {
        assert_eq!(parse_one(r#""hi there""#), Value::string("hi there"));
        assert_eq!(parse_one(r#""a\n\t\"\\""#), Value::string("a\n\t\"\\"));
    }

    #[test]
    fn test_lists() {
        assert_eq!(
            parse_one("(1 2 3)"),
            list(&[Value::Int(1), Value::Int(2), Value::Int(3)])
        );
        assert_eq!(parse_one("()"), Value::Empty);
        assert_eq!(
            parse_one("(1 . 2)"),
            cons(Value::Int(1), Value::Int(2))
        );
        assert_eq!(
            parse_one("(1 2 . 3)"),
            cons(Value::Int(1), cons(Value::Int(2), Value::Int(3)))
        );
    }

    #[test]
    fn test_quote_sugar() {
        assert_eq!(parse_one("'x"), list(&[sym("quote"), sym("x")]));
        assert_eq!(parse_one("`x"), list(&[sym("quasiquote"), sym("x")]));
        assert_eq!(parse_one(",x"), list(&[sym("unquote"), sym("x")]));
        assert_eq!(
            parse_one(",@xs"),
            list(&[sym("unquote-splicing"), sym("xs")])
        );
    }

    #[test]
    fn test_vector_literal() {
        let vector = parse_one("#(1 2)");
        let handle = vector.as_vector().expect("vector expected").clone();
        assert_eq!(*handle.borrow(), vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn test_incomplete_input() {
        assert!(parse("(1 2").unwrap_err().is_incomplete());
        assert!(parse("\"abc").unwrap_err().is_incomplete());
        assert!(parse("'").unwrap_err().is_incomplete());
        assert!(parse("(1 . ").unwrap_err().is_incomplete());
    }

    #[test]
    fn test_malformed_input() {
        assert!(parse(")").is_err());
        assert!(parse("(.)").is_err());
        assert!(parse("(1 . 2 3)").is_err());
        assert!(parse("12abc").is_err());
    }

    #[test]
    fn test_sequence_of_forms() {
        let forms = parse("(one 1)\n(two 2) 3").expect("parse failed");
        assert_eq!(forms.len(), 3);
        assert_eq!(forms[2], Value::Int(3));
    }
}
