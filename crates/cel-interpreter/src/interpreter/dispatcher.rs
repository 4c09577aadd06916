//! Overload registry and runtime overload selection.
//!
//! Every operator and function is registered as one or more [`Overload`]s
//! under its function name. A call picks the first candidate whose arity
//! fits and whose operand trait, if any, is advertised by the first
//! argument.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::eval::{EvalError, Traits, Value};

pub type UnaryOp = Arc<dyn Fn(&Value) -> Value + Send + Sync>;
pub type BinaryOp = Arc<dyn Fn(&Value, &Value) -> Value + Send + Sync>;
pub type FunctionOp = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

/// The native code behind an overload.
#[derive(Clone)]
pub enum Implementation {
    Unary(UnaryOp),
    Binary(BinaryOp),
    /// Any arity.
    Function(FunctionOp),
}

/// One implementation of a function for a given arity and operand trait.
#[derive(Clone)]
pub struct Overload {
    /// Unique across the dispatcher.
    pub id: Arc<str>,
    pub function: Arc<str>,
    /// Trait the first argument must advertise.
    pub operand_trait: Option<Traits>,
    /// Non-strict overloads receive error and unknown arguments instead of
    /// having them short-circuit the call.
    pub non_strict: bool,
    pub implementation: Implementation,
}

impl Overload {
    pub fn unary<F>(function: &str, id: &str, f: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        Self::new(function, id, Implementation::Unary(Arc::new(f)))
    }

    pub fn binary<F>(function: &str, id: &str, f: F) -> Self
    where
        F: Fn(&Value, &Value) -> Value + Send + Sync + 'static,
    {
        Self::new(function, id, Implementation::Binary(Arc::new(f)))
    }

    pub fn function<F>(function: &str, id: &str, f: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        Self::new(function, id, Implementation::Function(Arc::new(f)))
    }

    fn new(function: &str, id: &str, implementation: Implementation) -> Self {
        Self {
            id: Arc::from(id),
            function: Arc::from(function),
            operand_trait: None,
            non_strict: false,
            implementation,
        }
    }

    pub fn with_trait(mut self, operand_trait: Traits) -> Self {
        self.operand_trait = Some(operand_trait);
        self
    }

    pub fn non_strict(mut self) -> Self {
        self.non_strict = true;
        self
    }

    /// The fixed arity, or `None` for variadic implementations.
    pub fn arity(&self) -> Option<usize> {
        match self.implementation {
            Implementation::Unary(_) => Some(1),
            Implementation::Binary(_) => Some(2),
            Implementation::Function(_) => None,
        }
    }

    /// Whether this overload accepts `args`.
    pub fn accepts(&self, args: &[Value]) -> bool {
        if self.arity().is_some_and(|arity| arity != args.len()) {
            return false;
        }
        match (self.operand_trait, args.first()) {
            (None, _) => true,
            (Some(required), Some(first)) => first.traits().contains(required),
            (Some(_), None) => false,
        }
    }

    pub fn call(&self, args: &[Value]) -> Value {
        match (&self.implementation, args) {
            (Implementation::Unary(f), [arg]) => f(arg),
            (Implementation::Binary(f), [lhs, rhs]) => f(lhs, rhs),
            (Implementation::Function(f), args) => f(args),
            _ => no_such_overload(&self.function, args),
        }
    }
}

impl fmt::Debug for Overload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Overload")
            .field("id", &self.id)
            .field("function", &self.function)
            .field("operand_trait", &self.operand_trait)
            .field("non_strict", &self.non_strict)
            .field("arity", &self.arity())
            .finish()
    }
}

/// Registration failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("overload '{0}' is already registered")]
    DuplicateOverload(String),
}

/// The error value produced when no overload accepts the arguments.
pub fn no_such_overload(function: &str, args: &[Value]) -> Value {
    let names: Vec<Arc<str>> = args.iter().map(Value::type_name).collect();
    let names: Vec<&str> = names.iter().map(|n| n.as_ref()).collect();
    Value::error(EvalError::no_such_overload(function, &names))
}

/// Picks the first candidate accepting `args` and calls it.
pub fn dispatch_among(function: &str, candidates: &[Arc<Overload>], args: &[Value]) -> Value {
    match candidates.iter().find(|o| o.accepts(args)) {
        Some(overload) => overload.call(args),
        None => {
            tracing::trace!(function, arity = args.len(), "no matching overload");
            no_such_overload(function, args)
        }
    }
}

/// Registry of overloads, indexed by id and by function name.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    overloads: HashMap<Arc<str>, Arc<Overload>>,
    /// Function name to overload ids, in registration order.
    functions: HashMap<Arc<str>, Vec<Arc<str>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, overload: Overload) -> Result<(), DispatchError> {
        if self.overloads.contains_key(&overload.id) {
            return Err(DispatchError::DuplicateOverload(overload.id.to_string()));
        }
        self.functions
            .entry(overload.function.clone())
            .or_default()
            .push(overload.id.clone());
        self.overloads.insert(overload.id.clone(), Arc::new(overload));
        Ok(())
    }

    /// Registers every overload, stopping at the first duplicate.
    pub fn add_all(
        &mut self,
        overloads: impl IntoIterator<Item = Overload>,
    ) -> Result<(), DispatchError> {
        overloads.into_iter().try_for_each(|o| self.add(o))
    }

    pub fn find_overload(&self, id: &str) -> Option<&Arc<Overload>> {
        self.overloads.get(id)
    }

    pub fn has_function(&self, function: &str) -> bool {
        self.functions.contains_key(function)
    }

    /// All overloads registered under `function`, in registration order.
    pub fn overloads_of(&self, function: &str) -> Vec<Arc<Overload>> {
        self.functions
            .get(function)
            .into_iter()
            .flatten()
            .filter_map(|id| self.overloads.get(id).cloned())
            .collect()
    }

    /// Candidate overloads for a call site.
    ///
    /// Overload ids recorded by a checker narrow the set when they are
    /// registered here; otherwise every overload of `function` is a candidate.
    pub fn candidates(&self, function: &str, overload_ids: &[String]) -> Vec<Arc<Overload>> {
        let narrowed: Vec<Arc<Overload>> = overload_ids
            .iter()
            .filter_map(|id| self.overloads.get(id.as_str()).cloned())
            .collect();
        if narrowed.is_empty() {
            self.overloads_of(function)
        } else {
            narrowed
        }
    }

    /// Calls `function` with `args`.
    ///
    /// An `overload_id` that names a registered overload is called directly;
    /// otherwise the candidates for `function` are filtered by arity and
    /// operand trait.
    pub fn dispatch(&self, function: &str, overload_id: Option<&str>, args: &[Value]) -> Value {
        if let Some(overload) = overload_id.and_then(|id| self.overloads.get(id)) {
            return overload.call(args);
        }
        dispatch_among(function, &self.overloads_of(function), args)
    }

    pub fn len(&self) -> usize {
        self.overloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overloads.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::EvalErrorKind;

    fn adder() -> Overload {
        Overload::binary("_+_", "add", |a, b| a.add(b)).with_trait(Traits::ADDER)
    }

    #[test]
    fn test_dispatch_by_trait() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.add(adder()).unwrap();

        assert_eq!(
            dispatcher.dispatch("_+_", None, &[Value::Int(1), Value::Int(2)]),
            Value::Int(3)
        );
        let err = dispatcher.dispatch("_+_", None, &[Value::Bool(true), Value::Bool(false)]);
        assert_eq!(err.as_error().map(|e| e.kind), Some(EvalErrorKind::NoSuchOverload));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.add(adder()).unwrap();
        assert_eq!(
            dispatcher.add(adder()),
            Err(DispatchError::DuplicateOverload("add".to_string()))
        );
    }

    #[test]
    fn test_dispatch_by_arity() {
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .add_all([
                Overload::unary("pick", "pick_one", |_| Value::Int(1)),
                Overload::binary("pick", "pick_two", |_, _| Value::Int(2)),
                Overload::function("pick", "pick_any", |args| Value::from(args.len())),
            ])
            .unwrap();

        assert_eq!(dispatcher.dispatch("pick", None, &[Value::Null]), Value::Int(1));
        assert_eq!(
            dispatcher.dispatch("pick", None, &[Value::Null, Value::Null]),
            Value::Int(2)
        );
        assert_eq!(
            dispatcher.dispatch("pick", None, &[Value::Null, Value::Null, Value::Null]),
            Value::UInt(3)
        );
        assert_eq!(
            dispatcher.dispatch("pick", Some("pick_any"), &[Value::Null]),
            Value::UInt(1)
        );
    }

    #[test]
    fn test_missing_function() {
        let dispatcher = Dispatcher::new();
        let result = dispatcher.dispatch("nope", None, &[Value::Int(1)]);
        assert_eq!(
            result.as_error().map(|e| e.to_string()),
            Some("no such overload: nope(int)".to_string())
        );
    }

    #[test]
    fn test_checker_ids_narrow_candidates() {
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .add_all([
                Overload::unary("f", "f_a", |_| Value::from("a")),
                Overload::unary("f", "f_b", |_| Value::from("b")),
            ])
            .unwrap();
        let narrowed = dispatcher.candidates("f", &["f_b".to_string()]);
        assert_eq!(narrowed.len(), 1);
        assert_eq!(narrowed[0].id.as_ref(), "f_b");
        assert_eq!(dispatcher.candidates("f", &["add_int64".to_string()]).len(), 2);
    }
}
