use std::collections::HashMap;

use crate::eval::value::Value;

/// Signature for functions callable from expressions. The error string
/// becomes the body of a diagnostic at the call site.
pub type EvalFn = fn(&[Value]) -> Result<Value, String>;

/// Variable and function bindings for expression evaluation.
///
/// Passing no context at all (`None` at the `evaluate` call site) is
/// stricter than passing an empty one: it means variables and function
/// calls are not allowed in that position, not merely undefined.
#[derive(Default)]
pub struct EvalContext {
    variables: HashMap<String, Value>,
    functions: HashMap<String, EvalFn>,
}

impl EvalContext {
    pub fn new() -> Self {
        EvalContext::default()
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    pub fn get_variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn set_function(&mut self, name: impl Into<String>, func: EvalFn) {
        self.functions.insert(name.into(), func);
    }

    pub fn get_function(&self, name: &str) -> Option<EvalFn> {
        self.functions.get(name).copied()
    }
}
