//! One line in, printed results out.
//!
//! [`Interpreter`] owns the global environment and runs the read → evaluate
//! pipeline over a line of input. [`Transcript`] writes each printed result to the
//! console and, optionally, to a session log. [`run_script`] ties the two together
//! for non-interactive input.

use std::fmt::Display;
use std::io::{self, BufRead, Write};

use tracing::debug;

use crate::ast::Value;
use crate::config::InterpreterConfig;
use crate::evaluator::{Environment, create_global_env, evaluate};
use crate::reader::{parse, tokenize};

/// The symbol whose evaluation ends a session
pub const TERMINAL_SYMBOL: &str = "bye";

/// An interpreter session: one global environment that lives for the whole session
#[derive(Debug, Clone)]
pub struct Interpreter {
    global: Environment,
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new(InterpreterConfig::default())
    }
}

impl Interpreter {
    pub fn new(config: InterpreterConfig) -> Self {
        Interpreter {
            global: create_global_env(config),
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.global
    }

    /// Read the first expression on `line` and evaluate it.
    ///
    /// Tokens after the first expression are ignored. Errors are returned as error
    /// values. A line with no tokens yields `None`.
    pub fn eval_line(&self, line: &str) -> Option<Value> {
        if tokenize(line).is_empty() {
            return None;
        }
        Some(match parse(line) {
            Ok(expr) => evaluate(&expr, &self.global),
            Err(error) => {
                debug!(%error, "read error");
                Value::error(error)
            }
        })
    }
}

/// Whether `value` is the signal that ends a session
pub fn is_terminal_signal(value: &Value) -> bool {
    value.as_symbol() == Some(TERMINAL_SYMBOL)
}

/// Writes printed results to a console stream and an optional log stream
pub struct Transcript<C, L> {
    console: C,
    log: Option<L>,
}

impl<C: Write, L: Write> Transcript<C, L> {
    pub fn new(console: C, log: Option<L>) -> Self {
        Transcript { console, log }
    }

    /// Write `text` followed by a newline to both streams
    pub fn write_line(&mut self, text: impl Display) -> io::Result<()> {
        writeln!(self.console, "{text}")?;
        self.console.flush()?;
        if let Some(log) = &mut self.log {
            writeln!(log, "{text}")?;
            log.flush()?;
        }
        Ok(())
    }

    pub fn into_parts(self) -> (C, Option<L>) {
        (self.console, self.log)
    }
}

/// Evaluate `input` line by line, writing each result to `transcript`.
///
/// Blank lines are skipped. Returns `true` if the input ended the session with
/// `bye`, in which case the rest of the input is not read.
pub fn run_script<R: BufRead, C: Write, L: Write>(
    interpreter: &Interpreter,
    input: R,
    transcript: &mut Transcript<C, L>,
) -> io::Result<bool> {
    for line in input.lines() {
        let Some(value) = interpreter.eval_line(&line?) else {
            continue;
        };
        transcript.write_line(&value)?;
        if is_terminal_signal(&value) {
            return Ok(true);
        }
    }
    Ok(false)
}
