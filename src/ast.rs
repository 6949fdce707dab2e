//! This module defines the tagged value tree shared by the reader, the evaluator and
//! the printer. A [`Value`] is a [`ValueKind`] plus a `quoted` flag set by the reader
//! on expressions that follow a `'`. Quoting is an annotation on the parsed node,
//! not a wrapper type: a quoted list is still a `ValueKind::List`.
//!
//! Helpers such as [`val`], [`sym`] and [`nil`] build trees concisely in host code
//! and tests, and `From` conversions exist for integers, booleans, arrays and vectors.
//! The `Display` implementation is the printer: lists print as parenthesised,
//! space-separated children, atoms print their literal text and errors print their
//! fixed message.

use std::fmt;
use std::sync::Arc;

use crate::stack::ensure_sufficient_stack;
use crate::{Error, MAX_PRINT_DEPTH};

/// Type alias for number values in the interpreter
pub type NumberType = i64;

/// Canonical signature of a native procedure: already-evaluated arguments in, one
/// value out.
pub type NativeFn = dyn Fn(&[Value]) -> Result<Value, Error> + Send + Sync;

/// The variants a [`Value`] can take.
///
/// `Clone`, `Drop` and equality recurse through nested lists with stack growth, so
/// arbitrarily deep trees are safe to copy, compare and free.
pub enum ValueKind {
    /// Fixed-width integer; arithmetic wraps
    Number(NumberType),
    /// Identifiers, and the decimal text produced by `sqrt` and `pow`
    Symbol(String),
    List(Vec<Value>),
    /// `T` / `NIL`
    Boolean(bool),
    /// Host-implemented procedure, compared by name
    NativeProcedure { name: String, func: Arc<NativeFn> },
    /// Procedure created by `defun`. The body is kept unevaluated.
    UserProcedure {
        params: Vec<String>,
        body: Box<Value>,
    },
    Error(Error),
}

impl Clone for ValueKind {
    fn clone(&self) -> Self {
        match self {
            ValueKind::Number(n) => ValueKind::Number(*n),
            ValueKind::Symbol(s) => ValueKind::Symbol(s.clone()),
            ValueKind::List(items) => ensure_sufficient_stack(|| ValueKind::List(items.clone())),
            ValueKind::Boolean(b) => ValueKind::Boolean(*b),
            ValueKind::NativeProcedure { name, func } => ValueKind::NativeProcedure {
                name: name.clone(),
                func: Arc::clone(func),
            },
            ValueKind::UserProcedure { params, body } => ValueKind::UserProcedure {
                params: params.clone(),
                body: body.clone(),
            },
            ValueKind::Error(e) => ValueKind::Error(e.clone()),
        }
    }
}

impl Drop for ValueKind {
    fn drop(&mut self) {
        if let ValueKind::List(items) = self {
            let items = std::mem::take(items);
            ensure_sufficient_stack(|| drop(items));
        }
    }
}

/// A node of the value tree.
///
/// Equality is structural over [`ValueKind`] and ignores the `quoted` flag, so
/// `'yes` evaluates to something equal to `sym("yes")`. Use [`Value::is_quoted`] to
/// inspect the flag itself.
#[derive(Clone)]
pub struct Value {
    pub kind: ValueKind,
    pub quoted: bool,
}

impl Value {
    /// Boolean true, printed `T`
    pub const T: Value = Value::boolean(true);
    /// Boolean false, printed `NIL`
    pub const NIL: Value = Value::boolean(false);

    pub const fn new(kind: ValueKind) -> Self {
        Value {
            kind,
            quoted: false,
        }
    }

    pub const fn number(n: NumberType) -> Self {
        Value::new(ValueKind::Number(n))
    }

    pub const fn boolean(b: bool) -> Self {
        Value::new(ValueKind::Boolean(b))
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        Value::new(ValueKind::Symbol(name.into()))
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::new(ValueKind::List(items))
    }

    pub fn error(error: Error) -> Self {
        Value::new(ValueKind::Error(error))
    }

    pub fn native(name: impl Into<String>, func: Arc<NativeFn>) -> Self {
        Value::new(ValueKind::NativeProcedure {
            name: name.into(),
            func,
        })
    }

    pub fn user_procedure(params: Vec<String>, body: Value) -> Self {
        Value::new(ValueKind::UserProcedure {
            params,
            body: Box::new(body),
        })
    }

    /// Mark this value as quoted
    #[must_use]
    pub fn quoted(mut self) -> Self {
        self.quoted = true;
        self
    }

    pub fn is_quoted(&self) -> bool {
        self.quoted
    }

    /// `NIL`
    pub fn is_nil(&self) -> bool {
        matches!(self.kind, ValueKind::Boolean(false))
    }

    /// `T`
    pub fn is_true(&self) -> bool {
        matches!(self.kind, ValueKind::Boolean(true))
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, ValueKind::Error(_))
    }

    pub fn is_procedure(&self) -> bool {
        matches!(
            self.kind,
            ValueKind::NativeProcedure { .. } | ValueKind::UserProcedure { .. }
        )
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::Symbol(name) => Some(name),
            _ => None,
        }
    }

    /// A copy of this quoted datum with the flag kept on the outer node and cleared
    /// on every nested node, which is what evaluating a quoted expression yields.
    pub(crate) fn as_quoted_datum(&self) -> Value {
        Value {
            kind: self.kind_without_nested_quotes(),
            quoted: self.quoted,
        }
    }

    fn kind_without_nested_quotes(&self) -> ValueKind {
        match &self.kind {
            ValueKind::List(items) => ensure_sufficient_stack(|| {
                ValueKind::List(
                    items
                        .iter()
                        .map(|item| Value::new(item.kind_without_nested_quotes()))
                        .collect(),
                )
            }),
            other => other.clone(),
        }
    }

    /// Short type description used in error messages
    pub(crate) fn type_name(&self) -> &'static str {
        match self.kind {
            ValueKind::Number(_) => "number",
            ValueKind::Symbol(_) => "symbol",
            ValueKind::List(_) => "list",
            ValueKind::Boolean(_) => "boolean",
            ValueKind::NativeProcedure { .. } | ValueKind::UserProcedure { .. } => "procedure",
            ValueKind::Error(_) => "error",
        }
    }

    fn write_to(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        if depth >= MAX_PRINT_DEPTH {
            return write!(f, "...");
        }
        match &self.kind {
            ValueKind::Number(n) => write!(f, "{n}"),
            ValueKind::Symbol(s) => write!(f, "{s}"),
            ValueKind::Boolean(b) => write!(f, "{}", if *b { "T" } else { "NIL" }),
            ValueKind::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    ensure_sufficient_stack(|| item.write_to(f, depth + 1))?;
                }
                write!(f, ")")
            }
            ValueKind::UserProcedure { params, body } => {
                write!(f, "(({}) ", params.join(" "))?;
                body.write_to(f, depth + 1)?;
                write!(f, ")")
            }
            // Natives never reach the printer in a normal session
            ValueKind::NativeProcedure { .. } => write!(f, "PROC"),
            ValueKind::Error(e) => write!(f, "{e}"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.quoted {
            write!(f, "'")?;
        }
        match &self.kind {
            ValueKind::Number(n) => write!(f, "Number({n})"),
            ValueKind::Symbol(s) => write!(f, "Symbol({s})"),
            ValueKind::Boolean(b) => write!(f, "Boolean({b})"),
            ValueKind::List(items) => {
                write!(f, "List(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    ensure_sufficient_stack(|| write!(f, "{item:?}"))?;
                }
                write!(f, ")")
            }
            ValueKind::NativeProcedure { name, .. } => write!(f, "NativeProcedure({name})"),
            ValueKind::UserProcedure { params, body } => {
                write!(f, "UserProcedure(params={params:?}, body={body:?})")
            }
            ValueKind::Error(e) => write!(f, "Error({e:?})"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_to(f, 0)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (&self.kind, &other.kind) {
            (ValueKind::Number(a), ValueKind::Number(b)) => a == b,
            (ValueKind::Symbol(a), ValueKind::Symbol(b)) => a == b,
            (ValueKind::Boolean(a), ValueKind::Boolean(b)) => a == b,
            (ValueKind::List(a), ValueKind::List(b)) => ensure_sufficient_stack(|| a == b),
            (
                ValueKind::NativeProcedure { name: n1, .. },
                ValueKind::NativeProcedure { name: n2, .. },
            ) => n1 == n2,
            (
                ValueKind::UserProcedure {
                    params: p1,
                    body: b1,
                },
                ValueKind::UserProcedure {
                    params: p2,
                    body: b2,
                },
            ) => p1 == p2 && b1 == b2,
            (ValueKind::Error(a), ValueKind::Error(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::boolean(b)
    }
}

impl From<Error> for Value {
    fn from(error: Error) -> Self {
        Value::error(error)
    }
}

macro_rules! impl_from_integer {
    ($int_type:ty) => {
        impl From<$int_type> for Value {
            fn from(n: $int_type) -> Self {
                Value::number(NumberType::from(n))
            }
        }
    };
}

impl_from_integer!(i8);
impl_from_integer!(i16);
impl_from_integer!(i32);
impl_from_integer!(NumberType);
impl_from_integer!(u8);
impl_from_integer!(u16);
impl_from_integer!(u32);

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::list(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(arr: [T; N]) -> Self {
        Value::list(arr.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value> + Clone> From<&[T]> for Value {
    fn from(slice: &[T]) -> Self {
        Value::list(slice.iter().cloned().map(Into::into).collect())
    }
}

/// Build a symbol
pub fn sym<S: AsRef<str>>(name: S) -> Value {
    Value::symbol(name.as_ref())
}

/// Build any value that has a `From` conversion
pub fn val<T: Into<Value>>(value: T) -> Value {
    value.into()
}

/// Build the empty list
pub fn nil() -> Value {
    Value::list(vec![])
}
