//! Lowering from the Gisp AST onto core forms.
//!
//! The output uses nothing beyond the evaluator's special forms and the
//! primitive library: `return` escapes through a continuation captured
//! around the function body, `while` loops through a named let with
//! continuations for `break` and `continue`, and `switch` becomes a
//! `cond`.

use crate::error::{Error, Result};
use crate::utils::sym;
use crate::value::Value;

use super::ast::{AssignOp, BinaryOp, Expr, Stmt, Target, UnaryOp};

/// Statement context: which escape continuations are in scope.
#[derive(Debug, Clone, Copy, Default)]
struct Ctx {
    in_func: bool,
    in_loop: bool,
}

pub(crate) fn lower_program(stmts: &[Stmt]) -> Result<Vec<Value>> {
    let ctx = Ctx::default();
    stmts.iter().map(|stmt| lower_stmt(stmt, ctx)).collect()
}

fn lower_stmts(stmts: &[Stmt], ctx: Ctx) -> Result<Vec<Value>> {
    stmts.iter().map(|stmt| lower_stmt(stmt, ctx)).collect()
}

fn lower_stmt(stmt: &Stmt, ctx: Ctx) -> Result<Value> {
    match stmt {
        Stmt::Func { name, params, body } => Ok(Value::list(&[
            sym("define"),
            sym(name.as_str()),
            lambda_form(params, body)?,
        ])),

        Stmt::Var { name, init } => {
            let init = match init {
                Some(expr) => lower_expr(expr, ctx)?,
                None => Value::Empty,
            };
            Ok(Value::list(&[sym("define"), sym(name.as_str()), init]))
        }

        Stmt::Const { name, init } => Ok(Value::list(&[
            sym("define"),
            sym(name.as_str()),
            lower_expr(init, ctx)?,
        ])),

        Stmt::If { cond, then, alt } => {
            let mut form = vec![
                sym("if"),
                lower_expr(cond, ctx)?,
                block_form(then, ctx)?,
            ];
            if let Some(alt) = alt {
                form.push(block_form(alt, ctx)?);
            }
            Ok(Value::list(&form))
        }

        Stmt::While { cond, body } => lower_while(cond, body, ctx),

        Stmt::Return(value) => {
            if !ctx.in_func {
                return Err(Error::parser("return outside a function", None));
            }
            let mut form = vec![sym("__return")];
            if let Some(expr) = value {
                form.push(lower_expr(expr, ctx)?);
            }
            Ok(Value::list(&form))
        }

        Stmt::Break => {
            if !ctx.in_loop {
                return Err(Error::parser("break outside a loop", None));
            }
            Ok(Value::list(&[sym("__break")]))
        }

        Stmt::Continue => {
            if !ctx.in_loop {
                return Err(Error::parser("continue outside a loop", None));
            }
            Ok(Value::list(&[sym("__continue")]))
        }

        Stmt::Assign { target, op, value } => lower_assign(target, *op, value, ctx),

        Stmt::IncDec { name, increment } => Ok(Value::list(&[
            sym(if *increment { "++" } else { "--" }),
            quoted(sym(name.as_str())),
        ])),

        Stmt::Block(stmts) => block_form(stmts, ctx),

        Stmt::Expr(expr) => lower_expr(expr, ctx),
    }
}

/// A block becomes its single statement, or a `begin` sequence.
fn block_form(stmts: &[Stmt], ctx: Ctx) -> Result<Value> {
    let mut forms = lower_stmts(stmts, ctx)?;
    match forms.len() {
        1 => Ok(forms.remove(0)),
        _ => {
            let mut begin = vec![sym("begin")];
            begin.extend(forms);
            Ok(Value::list(&begin))
        }
    }
}

/// Function bodies run inside `(call/cc (lambda (__return) ...))` so a
/// `return` anywhere in the body escapes with its value.
fn lambda_form(params: &[String], body: &[Stmt]) -> Result<Value> {
    let ctx = Ctx {
        in_func: true,
        in_loop: false,
    };
    let mut body_forms = lower_stmts(body, ctx)?;
    if body_forms.is_empty() {
        body_forms.push(Value::Empty);
    }

    let mut escape = vec![sym("lambda"), Value::list(&[sym("__return")])];
    escape.extend(body_forms);
    let wrapped = Value::list(&[sym("call/cc"), Value::list(&escape)]);

    let params: Vec<Value> = params.iter().map(|name| sym(name.as_str())).collect();
    Ok(Value::list(&[sym("lambda"), Value::list(&params), wrapped]))
}

/// ```text
/// (call/cc (lambda (__break)
///   (let __loop ()
///     (if cond
///         (begin
///           (call/cc (lambda (__continue) body...))
///           (__loop))))))
/// ```
///
/// `break` escapes the whole loop; `continue` escapes one iteration and
/// falls into the `(__loop)` tail call.
fn lower_while(cond: &Expr, body: &[Stmt], ctx: Ctx) -> Result<Value> {
    let body_ctx = Ctx {
        in_loop: true,
        ..ctx
    };
    let mut body_forms = lower_stmts(body, body_ctx)?;
    if body_forms.is_empty() {
        body_forms.push(Value::Empty);
    }

    let mut continue_lambda = vec![sym("lambda"), Value::list(&[sym("__continue")])];
    continue_lambda.extend(body_forms);
    let iteration = Value::list(&[sym("call/cc"), Value::list(&continue_lambda)]);

    let repeat = Value::list(&[
        sym("begin"),
        iteration,
        Value::list(&[sym("__loop")]),
    ]);
    let test = Value::list(&[sym("if"), lower_expr(cond, ctx)?, repeat]);
    let named_let = Value::list(&[sym("let"), sym("__loop"), Value::Empty, test]);

    let break_lambda = Value::list(&[sym("lambda"), Value::list(&[sym("__break")]), named_let]);
    Ok(Value::list(&[sym("call/cc"), break_lambda]))
}

fn lower_assign(target: &Target, op: AssignOp, value: &Expr, ctx: Ctx) -> Result<Value> {
    let value = lower_expr(value, ctx)?;

    match target {
        Target::Name(name) => match op.primitive() {
            None => Ok(Value::list(&[sym("set!"), sym(name.as_str()), value])),
            Some(primitive) => Ok(Value::list(&[
                sym(primitive),
                quoted(sym(name.as_str())),
                value,
            ])),
        },
        Target::Index { base, index } => {
            let base = lower_expr(base, ctx)?;
            let index = lower_expr(index, ctx)?;
            let stored = match op.binary() {
                // v[i] op= x reads the slot, combines, writes back.
                Some(binary) => Value::list(&[
                    sym(binary),
                    Value::list(&[sym("vectorRef"), base.clone(), index.clone()]),
                    value,
                ]),
                None => value,
            };
            Ok(Value::list(&[sym("vectorSet"), base, index, stored]))
        }
    }
}

fn lower_expr(expr: &Expr, ctx: Ctx) -> Result<Value> {
    match expr {
        Expr::Int(n) => Ok(Value::Int(*n)),
        Expr::Real(r) => Ok(Value::Real(*r)),
        Expr::Str(text) => Ok(Value::string(text.as_str())),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Nil => Ok(Value::Empty),
        Expr::Ident(name) => Ok(sym(name.as_str())),

        Expr::List(items) => {
            let mut form = vec![sym("list")];
            for item in items {
                form.push(lower_expr(item, ctx)?);
            }
            Ok(Value::list(&form))
        }

        Expr::Vector(items) => {
            let mut form = vec![sym("vector")];
            for item in items {
                form.push(lower_expr(item, ctx)?);
            }
            Ok(Value::list(&form))
        }

        Expr::Sexpr(value) => Ok(value.clone()),

        Expr::Unary { op, operand } => {
            let operand = lower_expr(operand, ctx)?;
            let name = match op {
                UnaryOp::Neg => "-",
                UnaryOp::Not => "not",
                UnaryOp::BitNot => "^",
            };
            Ok(Value::list(&[sym(name), operand]))
        }

        Expr::Binary { op, left, right } => {
            let left = lower_expr(left, ctx)?;
            let right = lower_expr(right, ctx)?;
            let call = Value::list(&[sym(op.primitive()), left, right]);
            if *op == BinaryOp::Ne {
                Ok(Value::list(&[sym("not"), call]))
            } else {
                Ok(call)
            }
        }

        Expr::And(left, right) => Ok(Value::list(&[
            sym("and"),
            lower_expr(left, ctx)?,
            lower_expr(right, ctx)?,
        ])),

        Expr::Or(left, right) => Ok(Value::list(&[
            sym("or"),
            lower_expr(left, ctx)?,
            lower_expr(right, ctx)?,
        ])),

        Expr::Call { callee, args } => {
            let mut form = vec![lower_expr(callee, ctx)?];
            for arg in args {
                form.push(lower_expr(arg, ctx)?);
            }
            Ok(Value::list(&form))
        }

        Expr::Index { base, index } => Ok(Value::list(&[
            sym("vectorRef"),
            lower_expr(base, ctx)?,
            lower_expr(index, ctx)?,
        ])),

        Expr::Lambda { params, body } => lambda_form(params, body),

        Expr::If { cond, then, alt } => Ok(Value::list(&[
            sym("if"),
            lower_expr(cond, ctx)?,
            lower_expr(then, ctx)?,
            lower_expr(alt, ctx)?,
        ])),

        Expr::Switch { cases, default } => {
            let mut form = vec![sym("cond")];
            for (cond, result) in cases {
                form.push(Value::list(&[
                    lower_expr(cond, ctx)?,
                    lower_expr(result, ctx)?,
                ]));
            }
            if let Some(default) = default {
                form.push(Value::list(&[sym("else"), lower_expr(default, ctx)?]));
            }
            Ok(Value::list(&form))
        }
    }
}

fn quoted(value: Value) -> Value {
    Value::list(&[sym("quote"), value])
}
