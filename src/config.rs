//! Interpreter settings.

use crate::DEFAULT_MAX_EVAL_DEPTH;

/// What `define` (and any other binding) does when the name is already bound in
/// the frame it is installed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DefinePolicy {
    /// Leave the existing binding alone. `define` still returns the new value.
    #[default]
    KeepExisting,
    /// Replace the existing binding.
    Overwrite,
}

/// Settings shared by every environment created from one interpreter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpreterConfig {
    /// Evaluation depth at which `RecursionLimitExceeded` is reported
    pub max_eval_depth: usize,
    pub define_policy: DefinePolicy,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        InterpreterConfig {
            max_eval_depth: DEFAULT_MAX_EVAL_DEPTH,
            define_policy: DefinePolicy::default(),
        }
    }
}

impl InterpreterConfig {
    pub fn with_max_eval_depth(mut self, max_eval_depth: usize) -> Self {
        self.max_eval_depth = max_eval_depth;
        self
    }

    pub fn with_define_policy(mut self, define_policy: DefinePolicy) -> Self {
        self.define_policy = define_policy;
        self
    }
}
