//! Core standard library.
//!
//! Every built-in procedure is a [`NativeFunc`] registered into the
//! root environment by [`init_core`]. Primitives run synchronously and
//! re-enter evaluation only through [`Interp::apply`].

use std::cmp::Ordering;
use std::io::{self, Write};

use rand::Rng;

use crate::env::Env;
use crate::error::{Error, Result};
use crate::eval::Interp;
use crate::handle::Handle;
use crate::value::{NativeFunc, Primitive, Value};

pub fn init_core(env: &Handle<Env>) -> Result<()> {
    let mut frame = env.borrow_mut();
    let mut bind = |name: &'static str, func: NativeFunc| {
        frame.define(name, Value::Primitive(Primitive::new(name, func)));
    };

    // Numbers
    bind("+", number_add);
    bind("-", number_sub);
    bind("*", number_mul);
    bind("/", number_div);
    bind("%", number_mod);
    bind("=", number_eq);
    bind("<", number_lt);
    bind(">", number_gt);
    bind("<=", number_le);
    bind(">=", number_ge);

    // Bits
    bind("<<", bit_shl);
    bind(">>", bit_shr);
    bind("&", bit_and);
    bind("|", bit_or);
    bind("^", bit_xor);
    bind("&^", bit_and_not);

    // Compound assignment; these take a quoted symbol and update the
    // binding in the caller's environment.
    bind("++", assign_incr);
    bind("--", assign_decr);
    bind("+=", assign_add);
    bind("-=", assign_sub);
    bind("*=", assign_mul);
    bind("/=", assign_div);
    bind("%=", assign_mod);
    bind("<<=", assign_shl);
    bind(">>=", assign_shr);
    bind("&=", assign_and);
    bind("|=", assign_or);
    bind("^=", assign_xor);
    bind("&^=", assign_and_not);

    // Pairs and lists
    bind("cons", pair_cons);
    bind("first", pair_first);
    bind("rest", pair_rest);
    bind("set-first!", pair_set_first);
    bind("set-rest!", pair_set_rest);
    bind("list", list_new);
    bind("append", list_append);
    bind("length", list_length);
    bind("reverse", list_reverse);

    // Equality and logic
    bind("eq", value_eq);
    bind("equal", value_equal);
    bind("not", value_not);

    // Predicates
    bind("numberp", is_number);
    bind("symbolp", is_symbol);
    bind("stringp", is_string);
    bind("pairp", is_pair);
    bind("nullp", is_null);
    bind("listp", is_list);
    bind("vectorp", is_vector);
    bind("procedurep", is_procedure);
    bind("booleanp", is_boolean);
    bind("eofp", is_eof);

    // Strings
    bind("string-length", string_length);
    bind("string-append", string_append);
    bind("substring", string_substring);
    bind("string->symbol", string_to_symbol);
    bind("symbol->string", symbol_to_string);
    bind("number->string", number_to_string);
    bind("string->number", string_to_number);

    // Vectors
    bind("vector", vector_new);
    bind("make-vector", vector_make);
    bind("vectorRef", vector_ref);
    bind("vectorSet", vector_set);
    bind("vectorLength", vector_length);
    bind("list->vector", list_to_vector);
    bind("vector->list", vector_to_list);

    // I/O
    bind("display", io_display);
    bind("write", io_write);
    bind("newline", io_newline);
    bind("read", io_read);
    bind("read-line", io_read_line);

    // Control and miscellany
    bind("apply", proc_apply);
    bind("error", user_error);
    bind("assert", misc_assert);
    bind("gensym", misc_gensym);
    bind("random", misc_random);

    Ok(())
}

// ----------------------------------------------------------------------------
// Argument helpers

fn want(args: &[Value], count: usize, name: &str) -> Result<()> {
    if args.len() != count {
        return Err(Error::Arity(format!(
            "{name} expects {count} argument{}, got {}",
            if count == 1 { "" } else { "s" },
            args.len()
        )));
    }
    Ok(())
}

fn want_at_least(args: &[Value], count: usize, name: &str) -> Result<()> {
    if args.len() < count {
        return Err(Error::Arity(format!(
            "{name} expects at least {count} argument{}, got {}",
            if count == 1 { "" } else { "s" },
            args.len()
        )));
    }
    Ok(())
}

fn want_int(arg: &Value, name: &str) -> Result<i64> {
    arg.as_int().ok_or_else(|| {
        Error::Type(format!("{name} expects an integer, got {}", arg.type_name()))
    })
}

fn want_pair(arg: &Value, name: &str) -> Result<Handle<crate::value::Pair>> {
    arg.as_pair().cloned().ok_or_else(|| {
        Error::Type(format!("{name} expects a pair, got {}", arg.type_name()))
    })
}

fn want_string(arg: &Value, name: &str) -> Result<smol_str::SmolStr> {
    match arg {
        Value::String(text) => Ok(text.clone()),
        other => Err(Error::Type(format!(
            "{name} expects a string, got {}",
            other.type_name()
        ))),
    }
}

fn want_vector(arg: &Value, name: &str) -> Result<Handle<Vec<Value>>> {
    arg.as_vector().cloned().ok_or_else(|| {
        Error::Type(format!(
            "{name} expects a vector, got {}",
            arg.type_name()
        ))
    })
}

fn want_proper_list(arg: &Value, name: &str) -> Result<Vec<Value>> {
    arg.list_to_vec()
        .map_err(|_| Error::Type(format!("{name} expects a proper list")))
}

// ----------------------------------------------------------------------------
// Number

fn binary_add(a: Value, b: Value) -> Result<Value> {
    match (&a, &b) {
        (Value::Int(x), Value::Int(y)) => Ok(Value::Int(x.wrapping_add(*y))),
        (Value::String(x), Value::String(y)) => {
            Ok(Value::string(format!("{x}{y}")))
        }
        _ => match (a.as_number(), b.as_number()) {
            (Some(x), Some(y)) => Ok(Value::Real(x + y)),
            _ => Err(Error::Type(format!(
                "+ expects numbers, got {} and {}",
                a.type_name(),
                b.type_name()
            ))),
        },
    }
}

fn binary_sub(a: Value, b: Value) -> Result<Value> {
    match (&a, &b) {
        (Value::Int(x), Value::Int(y)) => Ok(Value::Int(x.wrapping_sub(*y))),
        _ => match (a.as_number(), b.as_number()) {
            (Some(x), Some(y)) => Ok(Value::Real(x - y)),
            _ => Err(Error::Type(format!(
                "- expects numbers, got {} and {}",
                a.type_name(),
                b.type_name()
            ))),
        },
    }
}

fn binary_mul(a: Value, b: Value) -> Result<Value> {
    match (&a, &b) {
        (Value::Int(x), Value::Int(y)) => Ok(Value::Int(x.wrapping_mul(*y))),
        _ => match (a.as_number(), b.as_number()) {
            (Some(x), Some(y)) => Ok(Value::Real(x * y)),
            _ => Err(Error::Type(format!(
                "* expects numbers, got {} and {}",
                a.type_name(),
                b.type_name()
            ))),
        },
    }
}

/// Division stays exact when both operands are integers and divide
/// evenly; otherwise the result is a real.
fn binary_div(a: Value, b: Value) -> Result<Value> {
    match (&a, &b) {
        (Value::Int(x), Value::Int(y)) => {
            if *y == 0 {
                return Err(Error::DivisionByZero);
            }
            if x % y == 0 {
                Ok(Value::Int(x / y))
            } else {
                Ok(Value::Real(*x as f64 / *y as f64))
            }
        }
        _ => match (a.as_number(), b.as_number()) {
            (Some(x), Some(y)) => {
                if y == 0.0 {
                    return Err(Error::DivisionByZero);
                }
                Ok(Value::Real(x / y))
            }
            _ => Err(Error::Type(format!(
                "/ expects numbers, got {} and {}",
                a.type_name(),
                b.type_name()
            ))),
        },
    }
}

fn binary_mod(a: Value, b: Value) -> Result<Value> {
    let x = want_int(&a, "%")?;
    let y = want_int(&b, "%")?;
    if y == 0 {
        return Err(Error::DivisionByZero);
    }
    Ok(Value::Int(x.wrapping_rem(y)))
}

fn fold_binary(
    args: &[Value],
    name: &str,
    at_least: usize,
    op: fn(Value, Value) -> Result<Value>,
) -> Result<Value> {
    want_at_least(args, at_least, name)?;
    let mut acc = args[0].clone();
    for arg in &args[1..] {
        acc = op(acc, arg.clone())?;
    }
    Ok(acc)
}

fn number_add(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    if args.is_empty() {
        return Ok(Value::Int(0));
    }
    if args.len() == 1 {
        return match &args[0] {
            value if value.is_number() => Ok(value.clone()),
            Value::String(_) => Ok(args[0].clone()),
            other => Err(Error::Type(format!(
                "+ expects numbers, got {}",
                other.type_name()
            ))),
        };
    }
    fold_binary(args, "+", 2, binary_add)
}

fn number_sub(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    want_at_least(args, 1, "-")?;
    if args.len() == 1 {
        return match &args[0] {
            Value::Int(n) => Ok(Value::Int(n.wrapping_neg())),
            Value::Real(r) => Ok(Value::Real(-r)),
            other => Err(Error::Type(format!(
                "- expects a number, got {}",
                other.type_name()
            ))),
        };
    }
    fold_binary(args, "-", 2, binary_sub)
}

fn number_mul(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    if args.is_empty() {
        return Ok(Value::Int(1));
    }
    if args.len() == 1 {
        return match &args[0] {
            value if value.is_number() => Ok(value.clone()),
            other => Err(Error::Type(format!(
                "* expects numbers, got {}",
                other.type_name()
            ))),
        };
    }
    fold_binary(args, "*", 2, binary_mul)
}

fn number_div(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    fold_binary(args, "/", 2, binary_div)
}

fn number_mod(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    fold_binary(args, "%", 2, binary_mod)
}

fn chain_compare(
    args: &[Value],
    name: &str,
    pred: fn(Option<Ordering>) -> bool,
) -> Result<Value> {
    want_at_least(args, 2, name)?;
    for pair in args.windows(2) {
        let ordering = match (&pair[0], &pair[1]) {
            (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
            (x, y) => match (x.as_number(), y.as_number()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => {
                    return Err(Error::Type(format!(
                        "{name} expects numbers, got {} and {}",
                        pair[0].type_name(),
                        pair[1].type_name()
                    )))
                }
            },
        };
        if !pred(ordering) {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

fn number_eq(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    chain_compare(args, "=", |ord| matches!(ord, Some(Ordering::Equal)))
}

fn number_lt(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    chain_compare(args, "<", |ord| matches!(ord, Some(Ordering::Less)))
}

fn number_gt(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    chain_compare(args, ">", |ord| matches!(ord, Some(Ordering::Greater)))
}

fn number_le(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    chain_compare(args, "<=", |ord| {
        matches!(ord, Some(Ordering::Less | Ordering::Equal))
    })
}

fn number_ge(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    chain_compare(args, ">=", |ord| {
        matches!(ord, Some(Ordering::Greater | Ordering::Equal))
    })
}

// ----------------------------------------------------------------------------
// Bits

fn binary_shl(a: Value, b: Value) -> Result<Value> {
    let x = want_int(&a, "<<")?;
    let n = want_int(&b, "<<")?;
    if n < 0 {
        return Err(Error::Range(format!("negative shift count {n}")));
    }
    Ok(Value::Int(if n >= 64 { 0 } else { x.wrapping_shl(n as u32) }))
}

fn binary_shr(a: Value, b: Value) -> Result<Value> {
    let x = want_int(&a, ">>")?;
    let n = want_int(&b, ">>")?;
    if n < 0 {
        return Err(Error::Range(format!("negative shift count {n}")));
    }
    // Arithmetic shift: counts past the width keep the sign bit.
    Ok(Value::Int(if n >= 64 { x >> 63 } else { x >> n }))
}

fn binary_and(a: Value, b: Value) -> Result<Value> {
    Ok(Value::Int(want_int(&a, "&")? & want_int(&b, "&")?))
}

fn binary_or(a: Value, b: Value) -> Result<Value> {
    Ok(Value::Int(want_int(&a, "|")? | want_int(&b, "|")?))
}

fn binary_xor(a: Value, b: Value) -> Result<Value> {
    Ok(Value::Int(want_int(&a, "^")? ^ want_int(&b, "^")?))
}

fn binary_and_not(a: Value, b: Value) -> Result<Value> {
    Ok(Value::Int(want_int(&a, "&^")? & !want_int(&b, "&^")?))
}

fn bit_shl(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    fold_binary(args, "<<", 2, binary_shl)
}

fn bit_shr(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    fold_binary(args, ">>", 2, binary_shr)
}

fn bit_and(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    fold_binary(args, "&", 2, binary_and)
}

fn bit_or(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    fold_binary(args, "|", 2, binary_or)
}

/// Binary form is exclusive-or; the unary form complements.
fn bit_xor(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    if args.len() == 1 {
        return Ok(Value::Int(!want_int(&args[0], "^")?));
    }
    fold_binary(args, "^", 2, binary_xor)
}

fn bit_and_not(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    fold_binary(args, "&^", 2, binary_and_not)
}

// ----------------------------------------------------------------------------
// Compound assignment

/// Shared plumbing for `+=` and friends: the first argument is a quoted
/// symbol naming a binding in the caller's environment; the binding is
/// updated through [`Env::update`] so a failing operator leaves it
/// untouched.
fn compound_assign(
    interp: &mut Interp,
    args: &[Value],
    name: &str,
    op: fn(Value, Value) -> Result<Value>,
) -> Result<Value> {
    want(args, 2, name)?;
    let target = args[0].as_symbol().ok_or_else(|| {
        Error::Type(format!(
            "{name} expects a quoted symbol, got {}",
            args[0].type_name()
        ))
    })?;
    let operand = args[1].clone();
    let env = interp.current_env();
    Env::update(&env, target, move |old| op(old, operand))
}

fn step_assign(interp: &mut Interp, args: &[Value], name: &str, delta: i64) -> Result<Value> {
    want(args, 1, name)?;
    let target = args[0].as_symbol().ok_or_else(|| {
        Error::Type(format!(
            "{name} expects a quoted symbol, got {}",
            args[0].type_name()
        ))
    })?;
    let env = interp.current_env();
    Env::update(&env, target, move |old| match old {
        Value::Int(n) => Ok(Value::Int(n.wrapping_add(delta))),
        Value::Real(r) => Ok(Value::Real(r + delta as f64)),
        other => Err(Error::Type(format!(
            "{name} expects a number binding, got {}",
            other.type_name()
        ))),
    })
}

fn assign_incr(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    step_assign(interp, args, "++", 1)
}

fn assign_decr(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    step_assign(interp, args, "--", -1)
}

fn assign_add(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    compound_assign(interp, args, "+=", binary_add)
}

fn assign_sub(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    compound_assign(interp, args, "-=", binary_sub)
}

fn assign_mul(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    compound_assign(interp, args, "*=", binary_mul)
}

fn assign_div(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    compound_assign(interp, args, "/=", binary_div)
}

fn assign_mod(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    compound_assign(interp, args, "%=", binary_mod)
}

fn assign_shl(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    compound_assign(interp, args, "<<=", binary_shl)
}

fn assign_shr(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    compound_assign(interp, args, ">>=", binary_shr)
}

fn assign_and(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    compound_assign(interp, args, "&=", binary_and)
}

fn assign_or(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    compound_assign(interp, args, "|=", binary_or)
}

fn assign_xor(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    compound_assign(interp, args, "^=", binary_xor)
}

fn assign_and_not(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    compound_assign(interp, args, "&^=", binary_and_not)
}

// ----------------------------------------------------------------------------
// Pairs and lists

fn pair_cons(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    want(args, 2, "cons")?;
    Ok(crate::utils::cons(args[0].clone(), args[1].clone()))
}

fn pair_first(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    want(args, 1, "first")?;
    let pair = want_pair(&args[0], "first")?;
    let first = pair.borrow().first.clone();
    Ok(first)
}

fn pair_rest(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    want(args, 1, "rest")?;
    let pair = want_pair(&args[0], "rest")?;
    let rest = pair.borrow().rest.clone();
    Ok(rest)
}

fn pair_set_first(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    want(args, 2, "set-first!")?;
    let pair = want_pair(&args[0], "set-first!")?;
    pair.borrow_mut().first = args[1].clone();
    Ok(args[1].clone())
}

fn pair_set_rest(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    want(args, 2, "set-rest!")?;
    let pair = want_pair(&args[0], "set-rest!")?;
    pair.borrow_mut().rest = args[1].clone();
    Ok(args[1].clone())
}

fn list_new(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    Ok(Value::list(args))
}

fn list_append(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    match args.split_last() {
        None => Ok(Value::Empty),
        Some((last, heads)) => {
            let mut items = Vec::new();
            for head in heads {
                items.extend(want_proper_list(head, "append")?);
            }
            Ok(Value::list_with_tail(&items, last.clone()))
        }
    }
}

fn list_length(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    want(args, 1, "length")?;
    let items = want_proper_list(&args[0], "length")?;
    Ok(Value::Int(items.len() as i64))
}

fn list_reverse(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    want(args, 1, "reverse")?;
    let mut items = want_proper_list(&args[0], "reverse")?;
    items.reverse();
    Ok(Value::list(&items))
}

// ----------------------------------------------------------------------------
// Equality and logic

fn value_eq(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    want(args, 2, "eq")?;
    Ok(Value::Bool(args[0].identical(&args[1])))
}

fn value_equal(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    want(args, 2, "equal")?;
    Ok(Value::Bool(args[0] == args[1]))
}

fn value_not(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    want(args, 1, "not")?;
    Ok(Value::Bool(!args[0].is_truthy()))
}

// ----------------------------------------------------------------------------
// Predicates

fn is_number(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    want(args, 1, "numberp")?;
    Ok(Value::Bool(args[0].is_number()))
}

fn is_symbol(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    want(args, 1, "symbolp")?;
    Ok(Value::Bool(matches!(args[0], Value::Symbol(_))))
}

fn is_string(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    want(args, 1, "stringp")?;
    Ok(Value::Bool(matches!(args[0], Value::String(_))))
}

fn is_pair(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    want(args, 1, "pairp")?;
    Ok(Value::Bool(args[0].is_pair()))
}

fn is_null(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    want(args, 1, "nullp")?;
    Ok(Value::Bool(args[0].is_empty()))
}

fn is_list(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    want(args, 1, "listp")?;
    let mut rest = args[0].clone();
    loop {
        match rest {
            Value::Empty => return Ok(Value::Bool(true)),
            Value::Pair(pair) => {
                let tail = pair.borrow().rest.clone();
                rest = tail;
            }
            _ => return Ok(Value::Bool(false)),
        }
    }
}

fn is_vector(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    want(args, 1, "vectorp")?;
    Ok(Value::Bool(matches!(args[0], Value::Vector(_))))
}

fn is_procedure(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    want(args, 1, "procedurep")?;
    Ok(Value::Bool(matches!(
        args[0],
        Value::Primitive(_) | Value::Closure(_) | Value::Continuation(_)
    )))
}

fn is_boolean(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    want(args, 1, "booleanp")?;
    Ok(Value::Bool(matches!(args[0], Value::Bool(_))))
}

fn is_eof(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    want(args, 1, "eofp")?;
    Ok(Value::Bool(matches!(args[0], Value::Eof)))
}

// ----------------------------------------------------------------------------
// Strings

fn string_length(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    want(args, 1, "string-length")?;
    let text = want_string(&args[0], "string-length")?;
    Ok(Value::Int(text.chars().count() as i64))
}

fn string_append(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let mut out = String::new();
    for arg in args {
        out.push_str(&want_string(arg, "string-append")?);
    }
    Ok(Value::string(out))
}

fn string_substring(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    want(args, 3, "substring")?;
    let text = want_string(&args[0], "substring")?;
    let start = want_int(&args[1], "substring")?;
    let end = want_int(&args[2], "substring")?;

    let length = text.chars().count() as i64;
    if start < 0 || end < start || end > length {
        return Err(Error::Range(format!(
            "substring indices {start}..{end} out of bounds for length {length}"
        )));
    }

    let slice: String = text
        .chars()
        .skip(start as usize)
        .take((end - start) as usize)
        .collect();
    Ok(Value::string(slice))
}

fn string_to_symbol(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    want(args, 1, "string->symbol")?;
    let text = want_string(&args[0], "string->symbol")?;
    Ok(Value::Symbol(text))
}

fn symbol_to_string(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    want(args, 1, "symbol->string")?;
    match &args[0] {
        Value::Symbol(name) => Ok(Value::String(name.clone())),
        other => Err(Error::Type(format!(
            "symbol->string expects a symbol, got {}",
            other.type_name()
        ))),
    }
}

fn number_to_string(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    want(args, 1, "number->string")?;
    if !args[0].is_number() {
        return Err(Error::Type(format!(
            "number->string expects a number, got {}",
            args[0].type_name()
        )));
    }
    Ok(Value::string(args[0].repr().to_string()))
}

fn string_to_number(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    want(args, 1, "string->number")?;
    let text = want_string(&args[0], "string->number")?;
    let trimmed = text.trim();
    if !crate::parser::looks_numeric(trimmed) {
        return Ok(Value::Bool(false));
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return Ok(Value::Int(int));
    }
    match trimmed.parse::<f64>() {
        Ok(real) => Ok(Value::Real(real)),
        Err(_) => Ok(Value::Bool(false)),
    }
}

// ----------------------------------------------------------------------------
// Vectors

fn vector_new(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    Ok(Value::Vector(Handle::new(args.to_vec())))
}

fn vector_make(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    want_at_least(args, 1, "make-vector")?;
    if args.len() > 2 {
        return Err(Error::Arity(format!(
            "make-vector expects 1 or 2 arguments, got {}",
            args.len()
        )));
    }
    let length = want_int(&args[0], "make-vector")?;
    if length < 0 {
        return Err(Error::Range(format!("negative vector length {length}")));
    }
    let fill = args.get(1).cloned().unwrap_or(Value::Empty);
    Ok(Value::Vector(Handle::new(vec![fill; length as usize])))
}

fn vector_index(vector: &Handle<Vec<Value>>, index: i64, name: &str) -> Result<usize> {
    let length = vector.borrow().len() as i64;
    if index < 0 || index >= length {
        return Err(Error::Range(format!(
            "{name}: index {index} out of bounds for length {length}"
        )));
    }
    Ok(index as usize)
}

fn vector_ref(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    want(args, 2, "vectorRef")?;
    let vector = want_vector(&args[0], "vectorRef")?;
    let index = vector_index(&vector, want_int(&args[1], "vectorRef")?, "vectorRef")?;
    let value = vector.borrow()[index].clone();
    Ok(value)
}

fn vector_set(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    want(args, 3, "vectorSet")?;
    let vector = want_vector(&args[0], "vectorSet")?;
    let index = vector_index(&vector, want_int(&args[1], "vectorSet")?, "vectorSet")?;
    vector.borrow_mut()[index] = args[2].clone();
    Ok(args[2].clone())
}

fn vector_length(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    want(args, 1, "vectorLength")?;
    let vector = want_vector(&args[0], "vectorLength")?;
    let length = vector.borrow().len() as i64;
    Ok(Value::Int(length))
}

fn list_to_vector(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    want(args, 1, "list->vector")?;
    let items = want_proper_list(&args[0], "list->vector")?;
    Ok(Value::Vector(Handle::new(items)))
}

fn vector_to_list(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    want(args, 1, "vector->list")?;
    let vector = want_vector(&args[0], "vector->list")?;
    let items = vector.borrow().clone();
    Ok(Value::list(&items))
}

// ----------------------------------------------------------------------------
// I/O

/// Display form: bare text for strings, the printed representation for
/// everything else.
fn display_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.to_string(),
        other => other.repr().to_string(),
    }
}

fn io_display(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (index, arg) in args.iter().enumerate() {
        if index != 0 {
            write!(out, " ")?;
        }
        write!(out, "{}", display_text(arg))?;
    }
    out.flush()?;
    Ok(Value::Empty)
}

fn io_write(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (index, arg) in args.iter().enumerate() {
        if index != 0 {
            write!(out, " ")?;
        }
        write!(out, "{}", arg.repr())?;
    }
    out.flush()?;
    Ok(Value::Empty)
}

fn io_newline(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    want(args, 0, "newline")?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out)?;
    out.flush()?;
    Ok(Value::Empty)
}

fn io_read(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    want(args, 0, "read")?;
    interp.stdin.read_value()
}

fn io_read_line(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    want(args, 0, "read-line")?;
    interp.stdin.read_line_value()
}

// ----------------------------------------------------------------------------
// Control and miscellany

fn proc_apply(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    want_at_least(args, 2, "apply")?;
    let proc = &args[0];
    let mut call_args = args[1..args.len() - 1].to_vec();
    call_args.extend(want_proper_list(&args[args.len() - 1], "apply")?);
    interp.apply(proc, &call_args)
}

fn user_error(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let message = args
        .iter()
        .map(display_text)
        .collect::<Vec<_>>()
        .join(" ");
    Err(Error::User(message))
}

fn misc_assert(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    want_at_least(args, 1, "assert")?;
    if !args[0].is_truthy() {
        let detail = args[1..]
            .iter()
            .map(display_text)
            .collect::<Vec<_>>()
            .join(" ");
        return Err(Error::User(if detail.is_empty() {
            "assertion failed".to_string()
        } else {
            format!("assertion failed: {detail}")
        }));
    }
    Ok(Value::Bool(true))
}

fn misc_gensym(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    want(args, 0, "gensym")?;
    Ok(interp.gensym())
}

/// `(random)` yields a real in [0, 1); `(random n)` an integer in [0, n).
fn misc_random(_interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let mut rng = rand::thread_rng();
    match args {
        [] => Ok(Value::Real(rng.gen::<f64>())),
        [bound] => {
            let n = want_int(bound, "random")?;
            if n <= 0 {
                return Err(Error::Range(format!(
                    "random expects a positive bound, got {n}"
                )));
            }
            Ok(Value::Int(rng.gen_range(0..n)))
        }
        _ => Err(Error::Arity(format!(
            "random expects 0 or 1 arguments, got {}",
            args.len()
        ))),
    }
}

// ----------------------------------------------------------------------------
// Standard input

/// Process-wide reader backing the `read` and `read-line` primitives.
///
/// Input is buffered across calls so a form may span lines; once the
/// stream ends the source is exhausted for good and every further read
/// yields the EOF sentinel.
pub(crate) struct StdinSource {
    pending: String,
    eof: bool,
}

impl StdinSource {
    pub(crate) fn new() -> Self {
        Self {
            pending: String::new(),
            eof: false,
        }
    }

    pub(crate) fn read_value(&mut self) -> Result<Value> {
        loop {
            if !self.pending.trim().is_empty() {
                match crate::parser::parse_partial(&self.pending) {
                    Ok((value, consumed)) => {
                        self.pending.drain(..consumed);
                        return Ok(value);
                    }
                    Err(err) if err.is_incomplete() => {
                        if self.eof {
                            self.pending.clear();
                            return Ok(Value::Eof);
                        }
                        // Fall through and buffer another line.
                    }
                    Err(err) => {
                        self.pending.clear();
                        return Err(err);
                    }
                }
            } else if self.eof {
                return Ok(Value::Eof);
            }

            if !self.fill_line()? {
                self.eof = true;
            }
        }
    }

    pub(crate) fn read_line_value(&mut self) -> Result<Value> {
        if self.pending.is_empty() {
            if self.eof || !self.fill_line()? {
                self.eof = true;
                return Ok(Value::Eof);
            }
        }
        let line = match self.pending.find('\n') {
            Some(pos) => {
                let line: String = self.pending.drain(..=pos).collect();
                line
            }
            None => std::mem::take(&mut self.pending),
        };
        Ok(Value::string(line.trim_end_matches('\n')))
    }

    /// Append one line of standard input to the buffer. Returns false
    /// at end-of-stream.
    fn fill_line(&mut self) -> Result<bool> {
        let mut line = String::new();
        let read = io::stdin().read_line(&mut line)?;
        if read == 0 {
            return Ok(false);
        }
        self.pending.push_str(&line);
        Ok(true)
    }
}
