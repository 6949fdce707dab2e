use std::cell::RefCell;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::rc::Rc;
use std::sync::Arc;

use crate::Error;
use crate::ast::{NativeFn, Value};
use crate::config::{DefinePolicy, InterpreterConfig};
use crate::evaluator::Arity;
use crate::natives::{NativeImpl, OpKind, get_builtin_ops};

/// A frame of symbol bindings plus an optional parent frame.
///
/// Cloning an `Environment` is cheap and yields a handle to the same frame, so a
/// binding made through one handle is visible through every other. Only two shapes
/// ever occur: the global frame (no parent) and a procedure call frame whose parent
/// is the global frame.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    bindings: Rc<RefCell<HashMap<String, Value>>>,
    parent: Option<Box<Environment>>,
    config: InterpreterConfig,
}

impl Environment {
    /// An empty frame with no parent. See [`crate::evaluator::create_global_env`] for
    /// a frame seeded with the native procedures.
    pub fn new(config: InterpreterConfig) -> Self {
        Environment {
            bindings: Rc::default(),
            parent: None,
            config,
        }
    }

    pub(crate) fn with_parent(parent: Environment) -> Self {
        Environment {
            bindings: Rc::default(),
            config: parent.config,
            parent: Some(Box::new(parent)),
        }
    }

    pub fn config(&self) -> InterpreterConfig {
        self.config
    }

    /// Install `name` in this frame according to the define policy.
    ///
    /// Returns whether the value was stored; under [`DefinePolicy::KeepExisting`] an
    /// existing binding in this frame is left untouched.
    pub fn bind(&self, name: &str, value: Value) -> bool {
        let mut bindings = self.bindings.borrow_mut();
        match self.config.define_policy {
            DefinePolicy::Overwrite => {
                bindings.insert(name.to_owned(), value);
                true
            }
            DefinePolicy::KeepExisting => match bindings.entry(name.to_owned()) {
                Entry::Vacant(slot) => {
                    slot.insert(value);
                    true
                }
                Entry::Occupied(_) => false,
            },
        }
    }

    /// Resolve `name`, searching this frame and then its parent
    pub fn lookup(&self, name: &str) -> Result<Value, Error> {
        self.get(name)
            .ok_or_else(|| Error::UnboundVariable(name.to_owned()))
    }

    fn get(&self, name: &str) -> Option<Value> {
        let local = self.bindings.borrow().get(name).cloned();
        local.or_else(|| self.parent.as_ref().and_then(|parent| parent.get(name)))
    }

    /// Replace the value of an existing binding, in this frame or its parent
    pub fn update(&self, name: &str, value: Value) -> Result<(), Error> {
        if let Some(slot) = self.bindings.borrow_mut().get_mut(name) {
            *slot = value;
            return Ok(());
        }
        match &self.parent {
            Some(parent) => parent.update(name, value),
            None => Err(Error::UnboundVariable(name.to_owned())),
        }
    }

    /// The outermost frame of this chain
    pub fn root(&self) -> Environment {
        match &self.parent {
            Some(parent) => parent.root(),
            None => self.clone(),
        }
    }

    /// A fresh frame for a procedure call: parented at the global frame and seeded
    /// with the native catalogue. Nothing from the caller's frame is visible.
    pub fn call_frame(&self) -> Environment {
        let frame = Environment::with_parent(self.root());
        frame.seed_natives();
        frame
    }

    /// Bind every native procedure of the catalogue in this frame
    pub(crate) fn seed_natives(&self) {
        for op in get_builtin_ops() {
            if let OpKind::Native(func) = op.kind {
                self.bind(op.name, native_value(op.name, op.arity, func));
            }
        }
    }

    /// Register a host function as a native procedure, replacing any binding of
    /// `name` in this frame.
    ///
    /// # Example
    /// ```
    /// use lispi::Error;
    /// use lispi::ast::Value;
    /// use lispi::evaluator::{Arity, create_global_env};
    /// use lispi::config::InterpreterConfig;
    ///
    /// fn answer(_args: &[Value]) -> Result<Value, Error> {
    ///     Ok(Value::number(42))
    /// }
    ///
    /// let env = create_global_env(InterpreterConfig::default());
    /// env.register_native("answer", Arity::Exact(0), answer);
    /// // (answer) now evaluates to 42
    /// ```
    pub fn register_native(&self, name: &str, arity: Arity, func: NativeImpl) {
        self.bindings
            .borrow_mut()
            .insert(name.to_owned(), native_value(name, arity, func));
    }

    /// All bindings of this frame and its parent, sorted by name. Local bindings
    /// shadow the parent's.
    pub fn get_all_bindings(&self) -> Vec<(String, Value)> {
        let mut bindings: HashMap<String, Value> = self
            .parent
            .as_ref()
            .map(|parent| parent.get_all_bindings().into_iter().collect())
            .unwrap_or_default();

        for (name, value) in self.bindings.borrow().iter() {
            bindings.insert(name.clone(), value.clone());
        }

        let mut result: Vec<_> = bindings.into_iter().collect();
        result.sort_by(|a, b| a.0.cmp(&b.0));
        result
    }
}

/// Wrap a native implementation so that its arity is checked on every call
fn native_value(name: &str, arity: Arity, func: NativeImpl) -> Value {
    let owned_name = name.to_owned();
    let wrapped: Arc<NativeFn> = Arc::new(move |args: &[Value]| {
        arity.validate(&owned_name, args.len())?;
        func(args)
    });
    Value::native(name, wrapped)
}
