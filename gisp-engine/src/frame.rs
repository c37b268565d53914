//! Reified control stack.
//!
//! Each frame records one pending step of the computation: an
//! unfinished call, a chosen-branch-to-be, the rest of a `begin`. The
//! trampoline pops a frame whenever a value is produced and lets the
//! frame consume it. Because frames are plain data, the whole stack can
//! be cloned for a continuation and swapped back in later.
//!
//! Cloning a frame copies its mutable bookkeeping (accumulated
//! arguments, remaining forms), so a captured stack and the live stack
//! cannot scribble on each other. Pair cells referenced by the forms
//! stay shared between the copies.

use smol_str::SmolStr;

use crate::env::Env;
use crate::error::{Error, Result};
use crate::eval::{EvalState, Interp};
use crate::handle::Handle;
use crate::value::Value;

/// A `cond` clause with its test evaluated lazily. `test` is `None`
/// for the final `else` clause.
#[derive(Debug, Clone)]
pub(crate) struct CondClause {
    pub(crate) test: Option<Value>,
    pub(crate) body: Value,
}

#[derive(Debug, Clone)]
pub(crate) enum Frame {
    /// Procedure application: evaluates the operator, then each
    /// argument left to right, then invokes.
    Call {
        env: Handle<Env>,
        /// Unevaluated argument forms, a list value.
        remaining: Value,
        operator: Option<Value>,
        args: Vec<Value>,
    },

    /// Pending branch selection.
    If {
        env: Handle<Env>,
        consequent: Value,
        alternate: Value,
    },

    /// Remaining forms of a sequence; the last one is installed in
    /// tail position instead of re-pushing this frame.
    Begin {
        env: Handle<Env>,
        remaining: Vec<Value>,
        next: usize,
    },

    /// Waiting for the value to bind.
    Define { env: Handle<Env>, name: SmolStr },

    /// Waiting for the value to assign.
    Set { env: Handle<Env>, name: SmolStr },

    /// Waiting for the current clause's test value; `body` belongs to
    /// that clause, `clauses[next..]` are still untried.
    Cond {
        env: Handle<Env>,
        body: Value,
        clauses: Vec<CondClause>,
        next: usize,
    },

    /// Waiting for `call/cc`'s procedure value. `snapshot` is the
    /// control stack as it was when the form was entered, without this
    /// frame.
    CallCc {
        env: Handle<Env>,
        snapshot: Vec<Frame>,
    },
}

impl Frame {
    /// Consume a produced value.
    ///
    /// Runs with the frame already popped. A frame either produces a
    /// value of its own (`state.returning` set back to true), installs
    /// a new expression to reduce, or re-pushes itself to wait for the
    /// next intermediate value.
    pub(crate) fn apply(self, interp: &mut Interp, state: &mut EvalState) -> Result<()> {
        match self {
            Frame::Call {
                env,
                remaining,
                operator,
                mut args,
            } => {
                let operator = match operator {
                    None => state.value.clone(),
                    Some(operator) => {
                        args.push(state.value.clone());
                        operator
                    }
                };

                match remaining {
                    Value::Pair(pair) => {
                        let (next, rest) = {
                            let cell = pair.borrow();
                            (cell.first.clone(), cell.rest.clone())
                        };
                        state.expr = next;
                        state.env = env.clone();
                        state.control.push(Frame::Call {
                            env,
                            remaining: rest,
                            operator: Some(operator),
                            args,
                        });
                        Ok(())
                    }
                    Value::Empty => interp.apply_callable(state, operator, args, env),
                    other => Err(Error::Syntax(format!(
                        "improper argument list ending in {}",
                        other.repr()
                    ))),
                }
            }

            Frame::If {
                env,
                consequent,
                alternate,
            } => {
                // Tail position: install the branch, push nothing.
                state.expr = if state.value.is_truthy() {
                    consequent
                } else {
                    alternate
                };
                state.env = env;
                Ok(())
            }

            Frame::Begin {
                env,
                remaining,
                next,
            } => {
                debug_assert!(next < remaining.len());
                state.expr = remaining[next].clone();
                state.env = env.clone();
                if next + 1 < remaining.len() {
                    state.control.push(Frame::Begin {
                        env,
                        remaining,
                        next: next + 1,
                    });
                }
                Ok(())
            }

            Frame::Define { env, name } => {
                let value = state.value.clone();
                env.borrow_mut().define(name, value);
                // The result of a define is the bound value, already in
                // `state.value`.
                state.returning = true;
                Ok(())
            }

            Frame::Set { env, name } => {
                let value = state.value.clone();
                env.borrow_mut().set(&name, value)?;
                state.returning = true;
                Ok(())
            }

            Frame::Cond {
                env,
                body,
                clauses,
                next,
            } => {
                if state.value.is_truthy() {
                    state.expr = body;
                    state.env = env;
                    return Ok(());
                }

                match clauses.get(next).cloned() {
                    None => {
                        state.value = Value::Empty;
                        state.returning = true;
                        Ok(())
                    }
                    Some(CondClause { test: None, body }) => {
                        state.expr = body;
                        state.env = env;
                        Ok(())
                    }
                    Some(CondClause {
                        test: Some(test),
                        body,
                    }) => {
                        state.expr = test;
                        state.env = env.clone();
                        state.control.push(Frame::Cond {
                            env,
                            body,
                            clauses,
                            next: next + 1,
                        });
                        Ok(())
                    }
                }
            }

            Frame::CallCc { env, snapshot } => {
                let proc = state.value.clone();
                let continuation = interp.capture(snapshot, env.clone());
                // The thunk runs in tail position with respect to the
                // call/cc form itself.
                interp.apply_callable(state, proc, vec![continuation], env)
            }
        }
    }
}
