//! Trampolined evaluator.
//!
//! The evaluator is a driver loop over an explicit machine state. Each
//! iteration either reduces the current expression by one step or feeds
//! the produced value to the top control frame. Program recursion grows
//! the heap-allocated control stack, never the host call stack, which
//! is what makes proper tail calls and first-class continuations
//! possible.

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::trace;
use smol_str::SmolStr;

use crate::core::StdinSource;
use crate::env::Env;
use crate::error::{Error, Result};
use crate::frame::{CondClause, Frame};
use crate::handle::Handle;
use crate::quasi;
use crate::value::{Continuation, Lambda, Pair, Value};

/// Counter backing `gensym`. Process-wide so generated names are unique
/// across interpreters.
static GENSYM_COUNTER: AtomicU64 = AtomicU64::new(0);

/// The two macros every interpreter starts with. Everything else in the
/// standard library is a primitive.
const PRELUDE: &str = r#"
(define-macro (and . args)
  (if (nullp args) #t
      (if (nullp (rest args)) (first args)
          (list 'if (first args) (cons 'and (rest args)) '#f))))

(define-macro (or . args)
  (if (nullp args) #f
      (let ((rst (rest args)))
        (if (nullp rst) (first args)
            (let ((sym (gensym)))
              (list 'let (list (list sym (first args)))
                    (list 'if sym sym (cons 'or rst))))))))
"#;

/// The trampoline's working record.
#[derive(Debug)]
pub(crate) struct EvalState {
    /// Expression currently being reduced.
    pub(crate) expr: Value,
    /// Active environment frame.
    pub(crate) env: Handle<Env>,
    /// Last produced result.
    pub(crate) value: Value,
    /// When true the driver feeds `value` to the top frame instead of
    /// reducing `expr`.
    pub(crate) returning: bool,
    /// Control stack, top at the end.
    pub(crate) control: Vec<Frame>,
}

impl EvalState {
    fn new(expr: Value, env: Handle<Env>) -> Self {
        Self {
            expr,
            env,
            value: Value::Empty,
            returning: false,
            control: Vec::new(),
        }
    }
}

/// An evaluator instance: global environment plus the process resources
/// primitives need (standard input, the active-env register).
pub struct Interp {
    global: Handle<Env>,
    /// Environment of the call currently applying a primitive; observed
    /// by compound-assign primitives such as `+=`.
    current: Handle<Env>,
    pub(crate) stdin: StdinSource,
}

impl Interp {
    /// Create an interpreter with the primitive library installed and
    /// the prelude evaluated.
    pub fn new() -> Result<Self> {
        let global = Handle::new(Env::new());
        let mut interp = Self {
            current: global.clone(),
            global,
            stdin: StdinSource::new(),
        };

        crate::core::init_core(&interp.global)?;

        let prelude = crate::parser::parse(PRELUDE)?;
        interp.eval_all(&prelude)?;

        Ok(interp)
    }

    /// The root environment.
    pub fn global(&self) -> Handle<Env> {
        self.global.clone()
    }

    /// The environment of the innermost active call. Outside of a
    /// primitive invocation this is the global environment.
    pub fn current_env(&self) -> Handle<Env> {
        self.current.clone()
    }

    /// Evaluate one form in the global environment.
    pub fn eval(&mut self, expr: &Value) -> Result<Value> {
        let env = self.global.clone();
        self.eval_in(expr, env)
    }

    /// Evaluate one form in the given environment.
    pub fn eval_in(&mut self, expr: &Value, env: Handle<Env>) -> Result<Value> {
        let mut state = EvalState::new(expr.clone(), env);
        self.run(&mut state)
    }

    /// Evaluate forms in order; the result is the last form's value, or
    /// the empty list when there are none.
    pub fn eval_all(&mut self, exprs: &[Value]) -> Result<Value> {
        let mut result = Value::Empty;
        for expr in exprs {
            result = self.eval(expr)?;
        }
        Ok(result)
    }

    /// Read source text and evaluate every form in it.
    pub fn eval_source(&mut self, source: &str) -> Result<Value> {
        let forms = crate::parser::parse(source)?;
        self.eval_all(&forms)
    }

    /// Apply a callable to already-evaluated arguments.
    ///
    /// Runs a fresh trampoline, so primitives may use this to call back
    /// into programs.
    pub fn apply(&mut self, proc: &Value, args: &[Value]) -> Result<Value> {
        let mut state = EvalState::new(Value::Empty, self.global.clone());
        let env = self.current.clone();
        self.apply_callable(&mut state, proc.clone(), args.to_vec(), env)?;
        self.run(&mut state)
    }

    /// Fresh symbol, unique for the process lifetime.
    pub(crate) fn gensym(&mut self) -> Value {
        let n = GENSYM_COUNTER.fetch_add(1, Ordering::Relaxed);
        Value::symbol(format!("#:g{n}"))
    }

    // ------------------------------------------------------------------
    // Driver

    fn run(&mut self, state: &mut EvalState) -> Result<Value> {
        loop {
            if state.returning {
                match state.control.pop() {
                    None => return Ok(std::mem::take(&mut state.value)),
                    Some(frame) => {
                        state.returning = false;
                        frame.apply(self, state)?;
                    }
                }
            } else {
                self.step(state)?;
            }
        }
    }

    /// Reduce the current expression by one step.
    fn step(&mut self, state: &mut EvalState) -> Result<()> {
        match state.expr.clone() {
            Value::Symbol(name) => {
                state.value = state.env.borrow().get(&name)?;
                state.returning = true;
                Ok(())
            }
            Value::Pair(pair) => self.step_form(state, pair),
            // Everything else is self-evaluating.
            other => {
                state.value = other;
                state.returning = true;
                Ok(())
            }
        }
    }

    /// Dispatch a compound form: special form, macro call, or
    /// procedure application.
    ///
    /// Special forms are recognised by the spelling of the head symbol
    /// alone; a user binding named `if` does not shadow the form.
    fn step_form(&mut self, state: &mut EvalState, pair: Handle<Pair>) -> Result<()> {
        let (head, tail) = {
            let cell = pair.borrow();
            (cell.first.clone(), cell.rest.clone())
        };

        if let Value::Symbol(name) = &head {
            match name.as_str() {
                "quote" => return self.form_quote(state, &tail),
                "if" => return self.form_if(state, &tail),
                "begin" => return self.form_begin(state, &tail),
                "cond" => return self.form_cond(state, &tail),
                "lambda" => return self.form_lambda(state, &tail),
                "define" => return self.form_define(state, &tail),
                "define-macro" => return self.form_define_macro(state, &tail),
                "set!" => return self.form_set(state, &tail),
                "let" => return self.form_let(state, &tail),
                "quasiquote" => return self.form_quasiquote(state, &tail),
                "call/cc" => return self.form_call_cc(state, &tail),
                _ => {
                    // A macro binding takes effect before the head is
                    // ever treated as a variable.
                    let binding = state.env.borrow().get(name);
                    if let Ok(Value::Macro(mac)) = binding {
                        let expansion = self.expand_macro(&mac, &tail)?;
                        trace!("macro {name} expanded to {}", expansion.repr());
                        state.expr = expansion;
                        return Ok(());
                    }
                }
            }
        }

        state.control.push(Frame::Call {
            env: state.env.clone(),
            remaining: tail,
            operator: None,
            args: Vec::new(),
        });
        state.expr = head;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Special forms

    fn form_quote(&mut self, state: &mut EvalState, tail: &Value) -> Result<()> {
        let args = form_args(tail, "quote")?;
        if args.len() != 1 {
            return Err(Error::Syntax("quote expects exactly one form".to_string()));
        }
        state.value = args[0].clone();
        state.returning = true;
        Ok(())
    }

    fn form_if(&mut self, state: &mut EvalState, tail: &Value) -> Result<()> {
        let args = form_args(tail, "if")?;
        if args.len() != 2 && args.len() != 3 {
            return Err(Error::Syntax(
                "if expects a test, a consequent and an optional alternate".to_string(),
            ));
        }
        state.control.push(Frame::If {
            env: state.env.clone(),
            consequent: args[1].clone(),
            // A missing alternate produces the empty list.
            alternate: args.get(2).cloned().unwrap_or(Value::Empty),
        });
        state.expr = args[0].clone();
        Ok(())
    }

    fn form_begin(&mut self, state: &mut EvalState, tail: &Value) -> Result<()> {
        let forms = form_args(tail, "begin")?;
        if forms.is_empty() {
            state.value = Value::Empty;
            state.returning = true;
            return Ok(());
        }
        let env = state.env.clone();
        install_body(state, &forms, env);
        Ok(())
    }

    fn form_cond(&mut self, state: &mut EvalState, tail: &Value) -> Result<()> {
        let forms = form_args(tail, "cond")?;

        let mut clauses = Vec::with_capacity(forms.len());
        for (index, form) in forms.iter().enumerate() {
            let parts = form
                .list_to_vec()
                .map_err(|_| Error::Syntax("cond clause must be a proper list".to_string()))?;
            if parts.len() != 2 {
                return Err(Error::Syntax(
                    "cond clause must have exactly a test and a body".to_string(),
                ));
            }
            let is_else = parts[0].as_symbol() == Some("else");
            if is_else && index + 1 != forms.len() {
                return Err(Error::Syntax(
                    "else must be the last cond clause".to_string(),
                ));
            }
            clauses.push(CondClause {
                test: if is_else { None } else { Some(parts[0].clone()) },
                body: parts[1].clone(),
            });
        }

        match clauses.first().cloned() {
            None => {
                state.value = Value::Empty;
                state.returning = true;
            }
            Some(CondClause { test: None, body }) => {
                // A leading else clause fires unconditionally.
                state.expr = body;
            }
            Some(CondClause {
                test: Some(test),
                body,
            }) => {
                state.expr = test;
                state.control.push(Frame::Cond {
                    env: state.env.clone(),
                    body,
                    clauses,
                    next: 1,
                });
            }
        }
        Ok(())
    }

    fn form_lambda(&mut self, state: &mut EvalState, tail: &Value) -> Result<()> {
        let lambda = self.build_lambda(state, tail, "lambda")?;
        state.value = Value::Closure(Rc::new(lambda));
        state.returning = true;
        Ok(())
    }

    fn form_define(&mut self, state: &mut EvalState, tail: &Value) -> Result<()> {
        let forms = form_args(tail, "define")?;

        match forms.first() {
            // (define name value)
            Some(Value::Symbol(name)) => {
                if forms.len() != 2 {
                    return Err(Error::Syntax(
                        "define expects a name and a value".to_string(),
                    ));
                }
                state.control.push(Frame::Define {
                    env: state.env.clone(),
                    name: name.clone(),
                });
                state.expr = forms[1].clone();
                Ok(())
            }
            // (define (name . params) body...) binds without a
            // trampoline round-trip.
            Some(Value::Pair(signature)) => {
                let (name, lambda) = self.build_procedure(state, signature, &forms[1..], "define")?;
                let closure = Value::Closure(Rc::new(lambda));
                state.env.borrow_mut().define(name, closure.clone());
                state.value = closure;
                state.returning = true;
                Ok(())
            }
            _ => Err(Error::Syntax(
                "define expects a symbol or a procedure signature".to_string(),
            )),
        }
    }

    fn form_define_macro(&mut self, state: &mut EvalState, tail: &Value) -> Result<()> {
        let forms = form_args(tail, "define-macro")?;

        match forms.first() {
            Some(Value::Pair(signature)) => {
                let (name, lambda) =
                    self.build_procedure(state, signature, &forms[1..], "define-macro")?;
                let mac = Value::Macro(Rc::new(lambda));
                state.env.borrow_mut().define(name, mac.clone());
                state.value = mac;
                state.returning = true;
                Ok(())
            }
            _ => Err(Error::Syntax(
                "define-macro expects a signature like (name . params)".to_string(),
            )),
        }
    }

    fn form_set(&mut self, state: &mut EvalState, tail: &Value) -> Result<()> {
        let forms = form_args(tail, "set!")?;
        if forms.len() != 2 {
            return Err(Error::Syntax("set! expects a name and a value".to_string()));
        }
        let name = match &forms[0] {
            Value::Symbol(name) => name.clone(),
            other => {
                return Err(Error::Syntax(format!(
                    "set! target must be a symbol, not {}",
                    other.type_name()
                )))
            }
        };
        state.control.push(Frame::Set {
            env: state.env.clone(),
            name,
        });
        state.expr = forms[1].clone();
        Ok(())
    }

    /// `let` and named `let` are rewritten here, not in a macro, so
    /// their bodies stay in tail position.
    fn form_let(&mut self, state: &mut EvalState, tail: &Value) -> Result<()> {
        let forms = form_args(tail, "let")?;
        if forms.is_empty() {
            return Err(Error::Syntax("let expects bindings and a body".to_string()));
        }

        if let Value::Symbol(loop_name) = &forms[0] {
            // (let name ((n v)...) body...) becomes a let over an
            // assigned self-referencing lambda:
            //   (let ((name '())) (set! name (lambda (n...) body...)) (name v...))
            if forms.len() < 3 {
                return Err(Error::Syntax(
                    "named let expects bindings and a body".to_string(),
                ));
            }
            let (names, values) = parse_bindings(&forms[1])?;
            let loop_sym = Value::Symbol(loop_name.clone());

            let mut lambda_form = vec![Value::symbol("lambda"), Value::list(&names)];
            lambda_form.extend_from_slice(&forms[2..]);

            let mut call_form = vec![loop_sym.clone()];
            call_form.extend(values);

            let rewrite = Value::list(&[
                Value::symbol("let"),
                Value::list(&[Value::list(&[loop_sym.clone(), Value::Empty])]),
                Value::list(&[Value::symbol("set!"), loop_sym, Value::list(&lambda_form)]),
                Value::list(&call_form),
            ]);
            state.expr = rewrite;
            return Ok(());
        }

        // ((lambda (n...) body...) v...)
        if forms.len() < 2 {
            return Err(Error::Syntax("let body must not be empty".to_string()));
        }
        let (names, values) = parse_bindings(&forms[0])?;

        let mut lambda_form = vec![Value::symbol("lambda"), Value::list(&names)];
        lambda_form.extend_from_slice(&forms[1..]);

        let mut call_form = vec![Value::list(&lambda_form)];
        call_form.extend(values);

        state.expr = Value::list(&call_form);
        Ok(())
    }

    fn form_quasiquote(&mut self, state: &mut EvalState, tail: &Value) -> Result<()> {
        let forms = form_args(tail, "quasiquote")?;
        if forms.len() != 1 {
            return Err(Error::Syntax(
                "quasiquote expects exactly one template".to_string(),
            ));
        }
        state.expr = quasi::expand(&forms[0])?;
        Ok(())
    }

    fn form_call_cc(&mut self, state: &mut EvalState, tail: &Value) -> Result<()> {
        let forms = form_args(tail, "call/cc")?;
        if forms.len() != 1 {
            return Err(Error::Syntax(
                "call/cc expects exactly one procedure".to_string(),
            ));
        }
        // The continuation is the stack as it stands on entry; the
        // CallCc frame itself is not part of it.
        let snapshot = state.control.clone();
        state.control.push(Frame::CallCc {
            env: state.env.clone(),
            snapshot,
        });
        state.expr = forms[0].clone();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Application

    /// Invoke a callable with evaluated arguments, in tail position:
    /// nothing is pushed on behalf of the call itself.
    pub(crate) fn apply_callable(
        &mut self,
        state: &mut EvalState,
        proc: Value,
        args: Vec<Value>,
        env: Handle<Env>,
    ) -> Result<()> {
        match proc {
            Value::Primitive(primitive) => {
                self.current = env;
                state.value = primitive.call(self, &args)?;
                state.returning = true;
                Ok(())
            }
            Value::Closure(lambda) => {
                let child = bind_args(&lambda, args, "procedure")?;
                install_body(state, &lambda.body, child);
                Ok(())
            }
            Value::Continuation(continuation) => {
                self.reinstate(state, &continuation, args)
            }
            other => Err(Error::Type(format!(
                "{} is not callable",
                other.type_name()
            ))),
        }
    }

    /// Package a stack snapshot as a continuation value.
    pub(crate) fn capture(&mut self, snapshot: Vec<Frame>, env: Handle<Env>) -> Value {
        Value::Continuation(Rc::new(Continuation {
            frames: snapshot,
            env,
        }))
    }

    /// Replace the live control stack with a fresh clone of the
    /// captured one. Cloning keeps the continuation re-invocable.
    fn reinstate(
        &mut self,
        state: &mut EvalState,
        continuation: &Continuation,
        args: Vec<Value>,
    ) -> Result<()> {
        if args.len() > 1 {
            return Err(Error::Arity(format!(
                "continuation accepts zero or one argument, got {}",
                args.len()
            )));
        }
        state.control = continuation.frames.clone();
        state.env = continuation.env.clone();
        state.value = args.into_iter().next().unwrap_or(Value::Empty);
        state.returning = true;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Macros

    /// Expand a macro call: bind the unevaluated argument forms, run
    /// the body in the macro's own environment, and hand back the last
    /// value as the replacement expression.
    fn expand_macro(&mut self, mac: &Rc<Lambda>, tail: &Value) -> Result<Value> {
        let raw_args = tail
            .list_to_vec()
            .map_err(|_| Error::Syntax("improper argument list in macro call".to_string()))?;
        let child = bind_args(mac, raw_args, "macro")?;

        let mut expansion = Value::Empty;
        for form in &mac.body {
            expansion = self.eval_in(form, child.clone())?;
        }
        Ok(expansion)
    }

    // ------------------------------------------------------------------
    // Shared form plumbing

    fn build_lambda(
        &mut self,
        state: &mut EvalState,
        tail: &Value,
        form: &str,
    ) -> Result<Lambda> {
        let forms = form_args(tail, form)?;
        if forms.len() < 2 {
            return Err(Error::Syntax(format!(
                "{form} expects parameters and at least one body form"
            )));
        }
        let (params, rest) = parse_params(&forms[0])?;
        Ok(Lambda {
            params,
            rest,
            body: forms[1..].to_vec(),
            env: state.env.clone(),
        })
    }

    /// Shared shape of `(define (name . params) body...)` and
    /// `(define-macro (name . params) body...)`.
    fn build_procedure(
        &mut self,
        state: &mut EvalState,
        signature: &Handle<Pair>,
        body: &[Value],
        form: &str,
    ) -> Result<(SmolStr, Lambda)> {
        let (name_form, params_form) = {
            let cell = signature.borrow();
            (cell.first.clone(), cell.rest.clone())
        };
        let name = match name_form {
            Value::Symbol(name) => name,
            other => {
                return Err(Error::Syntax(format!(
                    "{form} name must be a symbol, not {}",
                    other.type_name()
                )))
            }
        };
        if body.is_empty() {
            return Err(Error::Syntax(format!("{form} body must not be empty")));
        }
        let (params, rest) = parse_params(&params_form)?;
        Ok((
            name,
            Lambda {
                params,
                rest,
                body: body.to_vec(),
                env: state.env.clone(),
            },
        ))
    }
}

/// Collect a special form's tail into a vector, rejecting improper
/// lists.
fn form_args(tail: &Value, form: &str) -> Result<Vec<Value>> {
    tail.list_to_vec()
        .map_err(|_| Error::Syntax(format!("{form} form must be a proper list")))
}

/// Parse a parameter list: a proper list of symbols, a single symbol
/// (fully variadic), or a dotted list of symbols.
fn parse_params(form: &Value) -> Result<(Vec<SmolStr>, Option<SmolStr>)> {
    let mut params = Vec::new();
    let mut rest = form.clone();
    loop {
        match rest {
            Value::Empty => return Ok((params, None)),
            Value::Symbol(name) => return Ok((params, Some(name))),
            Value::Pair(pair) => {
                let (first, tail) = {
                    let cell = pair.borrow();
                    (cell.first.clone(), cell.rest.clone())
                };
                match first {
                    Value::Symbol(name) => params.push(name),
                    other => {
                        return Err(Error::Syntax(format!(
                            "parameter must be a symbol, not {}",
                            other.type_name()
                        )))
                    }
                }
                rest = tail;
            }
            other => {
                return Err(Error::Syntax(format!(
                    "parameter list expected, found {}",
                    other.type_name()
                )))
            }
        }
    }
}

/// Parse let bindings into parallel name and value-form vectors.
fn parse_bindings(form: &Value) -> Result<(Vec<Value>, Vec<Value>)> {
    let bindings = form
        .list_to_vec()
        .map_err(|_| Error::Syntax("let bindings must be a proper list".to_string()))?;

    let mut names = Vec::with_capacity(bindings.len());
    let mut values = Vec::with_capacity(bindings.len());
    for binding in &bindings {
        let parts = binding
            .list_to_vec()
            .map_err(|_| Error::Syntax("let binding must be a proper list".to_string()))?;
        if parts.len() != 2 || !matches!(parts[0], Value::Symbol(_)) {
            return Err(Error::Syntax(
                "let binding must be a (name value) pair".to_string(),
            ));
        }
        names.push(parts[0].clone());
        values.push(parts[1].clone());
    }
    Ok((names, values))
}

/// Bind evaluated (or, for macros, raw) arguments to a lambda's
/// parameters in a fresh child of its captured environment.
fn bind_args(lambda: &Lambda, args: Vec<Value>, what: &str) -> Result<Handle<Env>> {
    let fixed = lambda.params.len();
    let arity_ok = if lambda.rest.is_some() {
        args.len() >= fixed
    } else {
        args.len() == fixed
    };
    if !arity_ok {
        return Err(Error::Arity(format!(
            "{what} expects {}{} argument{}, got {}",
            if lambda.rest.is_some() { "at least " } else { "" },
            fixed,
            if fixed == 1 { "" } else { "s" },
            args.len()
        )));
    }

    let env = Handle::new(Env::with_parent(lambda.env.clone()));
    {
        let mut frame = env.borrow_mut();
        for (param, arg) in lambda.params.iter().zip(&args) {
            frame.define(param.clone(), arg.clone());
        }
        if let Some(rest) = &lambda.rest {
            frame.define(rest.clone(), Value::list(&args[fixed..]));
        }
    }
    Ok(env)
}

/// Install a body for evaluation: the first form becomes the current
/// expression; the rest wait in a Begin frame. A single-form body
/// pushes nothing, so the form runs in tail position.
fn install_body(state: &mut EvalState, body: &[Value], env: Handle<Env>) {
    debug_assert!(!body.is_empty());
    state.expr = body[0].clone();
    state.env = env.clone();
    if body.len() > 1 {
        state.control.push(Frame::Begin {
            env,
            remaining: body[1..].to_vec(),
            next: 0,
        });
    }
}
