//! Lispi - a minimal Lisp interpreter
//!
//! This crate reads one line of text at a time, turns it into a tree of tagged
//! values, evaluates that tree against a symbol environment and prints the result.
//!
//! ```lisp
//! (+ 1 2 3)                    ; 6
//! (define x 5)                 ; 5
//! (defun sq (n) (* n n))       ; ((n) (* n n))
//! (if (> (sq x) 20) 'big 'small)
//! (car '(a b c))               ; a
//! (quit)                       ; bye
//! ```
//!
//! ## Errors are values
//!
//! Nothing the user types can crash the interpreter. Internally every fallible
//! routine returns `Result<_, Error>`; at the language boundary
//! ([`evaluator::evaluate`], [`session::Interpreter::eval_line`]) an error becomes an
//! ordinary [`ast::Value`] that is printed like any other result, and the session
//! carries on.
//!
//! ## Modules
//!
//! - `ast`: the tagged value tree and its printer
//! - `reader`: tokenizer and recursive-descent reader
//! - `evaluator`: special forms, procedure application and environments
//! - `natives`: the native procedure catalogue
//! - `config`: interpreter settings
//! - `session`: the read-eval-print pipeline and dual console/log output
//! - `stack`: stack growth for the recursive reader and evaluator

use std::fmt;

use crate::evaluator::Arity;

/// Default maximum evaluation depth before `RecursionLimitExceeded` is reported
pub const DEFAULT_MAX_EVAL_DEPTH: usize = 10_000;

/// Nesting depth past which the printer elides structure as `...`
pub const MAX_PRINT_DEPTH: usize = 512;

/// Error kinds produced while reading or evaluating
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A `)` appeared where an expression was expected
    ParseUnexpectedClose,
    /// Tokens ran out inside a list or after a `'`
    UnexpectedEndOfInput,
    /// A token starting with a digit that is not a valid integer
    InvalidNumber(String),
    UnboundVariable(String),
    /// The head of an application does not name a procedure. Holds the printed head,
    /// elided past [`MAX_PRINT_DEPTH`].
    NotAFunction(String),
    DivideByZero,
    /// Evaluation nested deeper than the configured limit
    RecursionLimitExceeded(usize),
    ArityMismatch {
        name: String,
        expected: Arity,
        got: usize,
    },
    TypeMismatch {
        name: String,
        expected: &'static str,
        found: String,
    },
}

impl Error {
    pub fn not_a_function(value: &Value) -> Self {
        Error::NotAFunction(value.to_string())
    }

    pub fn arity_mismatch(name: &str, expected: Arity, got: usize) -> Self {
        Error::ArityMismatch {
            name: name.to_owned(),
            expected,
            got,
        }
    }

    pub fn type_mismatch(name: &str, expected: &'static str, found: &Value) -> Self {
        Error::TypeMismatch {
            name: name.to_owned(),
            expected,
            found: format!("{} {found}", found.type_name()),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ParseUnexpectedClose => write!(f, "An object cannot start with ')'"),
            Error::UnexpectedEndOfInput => write!(f, "Unexpected end of input"),
            Error::InvalidNumber(text) => write!(f, "{text} is not a valid number"),
            Error::UnboundVariable(name) => write!(f, "{name} is not bound to a value"),
            Error::NotAFunction(head) => write!(
                f,
                "{head} is not a function name; try using a symbol instead"
            ),
            Error::DivideByZero => write!(f, "Cannot divide by zero"),
            Error::RecursionLimitExceeded(limit) => {
                write!(f, "Recursion limit of {limit} exceeded")
            }
            Error::ArityMismatch {
                name,
                expected,
                got,
            } => write!(f, "{name} expects {expected}, got {got}"),
            Error::TypeMismatch {
                name,
                expected,
                found,
            } => write!(f, "{name} expects {expected}, got {found}"),
        }
    }
}

impl std::error::Error for Error {}

pub mod ast;
pub mod config;
pub mod evaluator;
pub mod natives;
pub mod reader;
pub mod session;
pub mod stack;

pub use ast::Value;
pub use config::{DefinePolicy, InterpreterConfig};
pub use session::Interpreter;
