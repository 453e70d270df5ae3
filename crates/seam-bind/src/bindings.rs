//! Native implementations behind the generated entry points.
//!
//! The binder itself never executes package code; it wires entry
//! points to implementations supplied here. Functions are closures
//! over native values; variables are get/set pairs, with a
//! cell-backed convenience for plain storage.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use seam_core::value::{CallError, Value};

/// A native function or method body.
pub type NativeFn = Arc<dyn Fn(&[Value]) -> Result<Vec<Value>, CallError> + Send + Sync>;

/// Accessor pair for a package-level variable.
#[derive(Clone)]
pub struct VarBinding {
    pub get: Arc<dyn Fn() -> Value + Send + Sync>,
    pub set: Arc<dyn Fn(Value) + Send + Sync>,
}

/// The implementations registered for one bound package.
#[derive(Default, Clone)]
pub struct Bindings {
    funcs: HashMap<String, NativeFn>,
    vars: HashMap<String, VarBinding>,
}

impl Bindings {
    pub fn new() -> Self {
        Bindings::default()
    }

    /// Register the body for the free function `name`.
    pub fn bind_func<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&[Value]) -> Result<Vec<Value>, CallError> + Send + Sync + 'static,
    {
        self.funcs.insert(name.into(), Arc::new(f));
    }

    /// Register explicit accessors for the variable `name`.
    pub fn bind_var(&mut self, name: impl Into<String>, var: VarBinding) {
        self.vars.insert(name.into(), var);
    }

    /// Register the variable `name` backed by a shared cell holding
    /// `initial`.
    pub fn bind_var_cell(&mut self, name: impl Into<String>, initial: Value) {
        let cell = Arc::new(Mutex::new(initial));
        let get_cell = cell.clone();
        self.bind_var(
            name,
            VarBinding {
                get: Arc::new(move || get_cell.lock().expect("var cell poisoned").clone()),
                set: Arc::new(move |v| *cell.lock().expect("var cell poisoned") = v),
            },
        );
    }

    pub fn func(&self, name: &str) -> Option<&NativeFn> {
        self.funcs.get(name)
    }

    pub fn var(&self, name: &str) -> Option<&VarBinding> {
        self.vars.get(name)
    }
}
