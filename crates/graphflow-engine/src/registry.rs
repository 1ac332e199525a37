//! Function Registry (component E).
//!
//! An async trait object per callable, registered by name into a map built
//! up with explicit `.register(Arc::new(...))` calls rather than a derive
//! or macro.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use graphflow_model::{Args, Value};

use crate::error::FunctionError;

/// A callable a step's `function` name can dispatch to.
#[async_trait]
pub trait Function: Send + Sync {
    async fn call(&self, args: Args) -> Result<Value, FunctionError>;

    /// Functions that suspend the workflow for external input return
    /// `true` here instead of being invoked. Only the built-in
    /// input-request function does.
    fn suspends_execution(&self) -> bool {
        false
    }
}

#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<dyn Function>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry carrying the two built-ins needed for the engine to run
    /// standalone (`util.reply`, `util.request_input`).
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("util.reply", Arc::new(ReplyFunction));
        registry.register("util.request_input", Arc::new(RequestInputFunction));
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, function: Arc<dyn Function>) {
        self.functions.insert(name.into(), function);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Function>> {
        self.functions.get(name).cloned()
    }

    pub fn suspends_execution(&self, name: &str) -> bool {
        self.functions.get(name).map(|f| f.suspends_execution()).unwrap_or(false)
    }
}

/// Echoes its `message` argument back as the step's output. The engine's
/// own message-history bookkeeping recognizes this function by name and
/// appends an `assistant` message alongside its output.
pub struct ReplyFunction;

#[async_trait]
impl Function for ReplyFunction {
    async fn call(&self, mut args: Args) -> Result<Value, FunctionError> {
        Ok(args.remove("message").unwrap_or(Value::Null))
    }
}

/// The distinguished user-input-request function. The engine never invokes
/// it — it checks `suspends_execution()` first and pauses the step instead.
/// Its `call` exists only to satisfy the trait and is unreachable in
/// practice.
pub struct RequestInputFunction;

#[async_trait]
impl Function for RequestInputFunction {
    async fn call(&self, args: Args) -> Result<Value, FunctionError> {
        Ok(Value::Map(args.into_iter().collect()))
    }

    fn suspends_execution(&self) -> bool {
        true
    }
}

pub const REPLY_FUNCTION: &str = "util.reply";
pub const REQUEST_INPUT_FUNCTION: &str = "util.request_input";

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reply_echoes_message_argument() {
        let registry = FunctionRegistry::with_builtins();
        let function = registry.get(REPLY_FUNCTION).unwrap();
        let mut args = Args::new();
        args.insert("message".to_string(), Value::from("hi"));
        assert_eq!(function.call(args).await.unwrap(), Value::from("hi"));
    }

    #[test]
    fn request_input_is_marked_suspending() {
        let registry = FunctionRegistry::with_builtins();
        assert!(registry.suspends_execution(REQUEST_INPUT_FUNCTION));
        assert!(!registry.suspends_execution(REPLY_FUNCTION));
    }

    #[test]
    fn unknown_function_does_not_suspend() {
        let registry = FunctionRegistry::with_builtins();
        assert!(!registry.suspends_execution("nonexistent"));
    }
}
