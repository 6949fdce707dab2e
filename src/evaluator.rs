//! Tree-walking evaluator.
//!
//! [`eval`] dispatches on the shape of a value: quoted values and atoms evaluate to
//! themselves, symbols are looked up, and lists are either special forms (`if`,
//! `define`, `defun`, `set!`, `quit`) or procedure applications. Arguments of an
//! application are evaluated left to right before the procedure is applied.
//!
//! A user procedure runs in a fresh call frame parented at the global environment,
//! so it sees globals, its own name and its parameters, and nothing from its caller.

pub mod environment;

use std::fmt;

use tracing::{debug, trace, warn};

pub use environment::Environment;

use crate::Error;
use crate::ast::{Value, ValueKind};
use crate::config::InterpreterConfig;
use crate::natives::{OpKind, find_builtin_op};
use crate::stack::ensure_sufficient_stack;

/// Number of arguments an operation accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    /// Inclusive bounds
    Range(usize, usize),
    Any,
}

impl Arity {
    pub fn validate(self, name: &str, got: usize) -> Result<(), Error> {
        let accepted = match self {
            Arity::Exact(n) => got == n,
            Arity::AtLeast(n) => got >= n,
            Arity::Range(min, max) => (min..=max).contains(&got),
            Arity::Any => true,
        };
        if accepted {
            Ok(())
        } else {
            Err(Error::arity_mismatch(name, self, got))
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(1) => write!(f, "1 argument"),
            Arity::Exact(n) => write!(f, "{n} arguments"),
            Arity::AtLeast(n) => write!(f, "at least {n} argument(s)"),
            Arity::Range(min, max) => write!(f, "{min} to {max} arguments"),
            Arity::Any => write!(f, "any number of arguments"),
        }
    }
}

/// Current nesting level of an evaluation and the level at which it gives up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Depth {
    current: usize,
    max: usize,
}

impl Depth {
    pub fn new(max: usize) -> Self {
        Depth { current: 0, max }
    }

    #[must_use]
    pub fn deeper(self) -> Self {
        Depth {
            current: self.current + 1,
            ..self
        }
    }

    pub fn current(self) -> usize {
        self.current
    }

    fn check(self) -> Result<(), Error> {
        if self.current >= self.max {
            warn!(limit = self.max, "evaluation depth limit reached");
            return Err(Error::RecursionLimitExceeded(self.max));
        }
        Ok(())
    }
}

/// Evaluate an expression in `env`
#[tracing::instrument(level = "debug", skip_all)]
pub fn eval(expr: &Value, env: &Environment) -> Result<Value, Error> {
    eval_with_depth_tracking(expr, env, Depth::new(env.config().max_eval_depth))
}

/// Evaluate an expression, folding any error into an error value
pub fn evaluate(expr: &Value, env: &Environment) -> Value {
    eval(expr, env).unwrap_or_else(Value::error)
}

pub(crate) fn eval_with_depth_tracking(
    expr: &Value,
    env: &Environment,
    depth: Depth,
) -> Result<Value, Error> {
    depth.check()?;
    ensure_sufficient_stack(|| eval_value(expr, env, depth))
}

fn eval_value(expr: &Value, env: &Environment, depth: Depth) -> Result<Value, Error> {
    // Quoting wins over every other rule, lists included
    if expr.is_quoted() {
        return Ok(expr.as_quoted_datum());
    }

    match &expr.kind {
        ValueKind::Number(_)
        | ValueKind::Boolean(_)
        | ValueKind::Error(_)
        | ValueKind::NativeProcedure { .. }
        | ValueKind::UserProcedure { .. } => Ok(expr.clone()),

        ValueKind::Symbol(name) => env.lookup(name),

        ValueKind::List(elements) => eval_list(elements, env, depth),
    }
}

fn eval_list(elements: &[Value], env: &Environment, depth: Depth) -> Result<Value, Error> {
    let [head, arg_exprs @ ..] = elements else {
        return Ok(Value::NIL);
    };

    let Some(name) = head.as_symbol() else {
        return Err(Error::not_a_function(head));
    };

    if !head.is_quoted() {
        if let Some(op) = find_builtin_op(name) {
            if let OpKind::SpecialForm(form) = op.kind {
                op.arity.validate(name, arg_exprs.len())?;
                return form(arg_exprs, env, depth);
            }
        }
    }

    let procedure = eval_with_depth_tracking(head, env, depth.deeper())?;
    if !procedure.is_procedure() {
        return Err(Error::not_a_function(head));
    }

    let args = eval_args(arg_exprs, env, depth)?;
    apply(name, &procedure, &args, env, depth)
}

/// Evaluate arguments left to right, stopping at the first error
fn eval_args(args: &[Value], env: &Environment, depth: Depth) -> Result<Vec<Value>, Error> {
    args.iter()
        .map(|arg| eval_with_depth_tracking(arg, env, depth.deeper()))
        .collect()
}

/// Apply a procedure value to already-evaluated arguments.
///
/// `call_name` is the symbol the procedure was invoked through; a user procedure
/// sees itself bound under that name in its call frame.
fn apply(
    call_name: &str,
    procedure: &Value,
    args: &[Value],
    env: &Environment,
    depth: Depth,
) -> Result<Value, Error> {
    match &procedure.kind {
        ValueKind::NativeProcedure { name, func } => {
            trace!(procedure = %name, args = args.len(), "apply native");
            func(args)
        }
        ValueKind::UserProcedure { params, body } => {
            trace!(
                procedure = call_name,
                args = args.len(),
                depth = depth.current(),
                "apply user procedure"
            );
            let frame = env.call_frame();
            frame.bind(call_name, procedure.clone());
            // Missing arguments leave their parameters unbound; extras are dropped
            for (param, arg) in params.iter().zip(args) {
                frame.bind(param, arg.clone());
            }
            eval_with_depth_tracking(body, &frame, depth.deeper())
        }
        _ => Err(Error::not_a_function(procedure)),
    }
}

fn expect_symbol<'a>(form: &str, value: &'a Value) -> Result<&'a str, Error> {
    value
        .as_symbol()
        .ok_or_else(|| Error::type_mismatch(form, "a symbol", value))
}

/// `(if test consequent alternate)`; only the taken branch is evaluated
pub(crate) fn eval_if(args: &[Value], env: &Environment, depth: Depth) -> Result<Value, Error> {
    let [test, consequent, alternate] = args else {
        return Err(Error::arity_mismatch("if", Arity::Exact(3), args.len()));
    };

    if eval_with_depth_tracking(test, env, depth.deeper())?.is_true() {
        eval_with_depth_tracking(consequent, env, depth.deeper())
    } else {
        eval_with_depth_tracking(alternate, env, depth.deeper())
    }
}

/// `(define name expr)`. Returns the computed value even when the define policy
/// keeps an existing binding.
pub(crate) fn eval_define(
    args: &[Value],
    env: &Environment,
    depth: Depth,
) -> Result<Value, Error> {
    let [target, expr] = args else {
        return Err(Error::arity_mismatch("define", Arity::Exact(2), args.len()));
    };
    let name = expect_symbol("define", target)?;

    let value = eval_with_depth_tracking(expr, env, depth.deeper())?;
    if env.bind(name, value.clone()) {
        debug!(name, %value, "define");
    } else {
        debug!(name, "define kept existing binding");
    }
    Ok(value)
}

/// `(defun name (param...) body)`
pub(crate) fn eval_defun(args: &[Value], env: &Environment, _depth: Depth) -> Result<Value, Error> {
    let [target, param_list, body] = args else {
        return Err(Error::arity_mismatch("defun", Arity::Exact(3), args.len()));
    };
    let name = expect_symbol("defun", target)?;

    let ValueKind::List(param_exprs) = &param_list.kind else {
        return Err(Error::type_mismatch(
            "defun",
            "a parameter list",
            param_list,
        ));
    };
    let params = param_exprs
        .iter()
        .map(|param| expect_symbol("defun", param).map(str::to_owned))
        .collect::<Result<Vec<_>, _>>()?;

    let procedure = Value::user_procedure(params, body.clone());
    if env.bind(name, procedure.clone()) {
        debug!(name, %procedure, "defun");
    } else {
        debug!(name, "defun kept existing binding");
    }
    Ok(procedure)
}

/// `(set! name expr)`; the name must already be bound
pub(crate) fn eval_set(args: &[Value], env: &Environment, depth: Depth) -> Result<Value, Error> {
    let [target, expr] = args else {
        return Err(Error::arity_mismatch("set!", Arity::Exact(2), args.len()));
    };
    let name = expect_symbol("set!", target)?;

    let value = eval_with_depth_tracking(expr, env, depth.deeper())?;
    env.update(name, value.clone())?;
    debug!(name, %value, "set!");
    Ok(value)
}

/// `(quit)` evaluates to the symbol `bye`, which ends a session
pub(crate) fn eval_quit(_args: &[Value], _env: &Environment, _depth: Depth) -> Result<Value, Error> {
    Ok(Value::symbol("bye"))
}

/// Create the global environment, seeded with every native procedure
pub fn create_global_env(config: InterpreterConfig) -> Environment {
    let env = Environment::new(config);
    env.seed_natives();
    env
}
