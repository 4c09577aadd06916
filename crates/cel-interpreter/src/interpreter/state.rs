//! Per-run record of expression values.

use std::collections::HashMap;

use cel_ast::ExprId;
use parking_lot::Mutex;

use crate::eval::Value;

/// The last value each observed expression evaluated to during one run.
///
/// Nodes evaluate through `&self`, so recording goes through a lock. A
/// state-tracking program gives every run its own `EvalState`.
#[derive(Debug, Default)]
pub struct EvalState {
    values: Mutex<HashMap<ExprId, Value>>,
}

impl EvalState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self, id: ExprId) -> Option<Value> {
        self.values.lock().get(&id).cloned()
    }

    pub fn set_value(&self, id: ExprId, value: Value) {
        self.values.lock().insert(id, value);
    }

    /// Observed ids in ascending order.
    pub fn ids(&self) -> Vec<ExprId> {
        let mut ids: Vec<ExprId> = self.values.lock().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }

    pub fn reset(&self) {
        self.values.lock().clear();
    }
}

impl Clone for EvalState {
    fn clone(&self) -> Self {
        Self {
            values: Mutex::new(self.values.lock().clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_value_wins() {
        let state = EvalState::new();
        state.set_value(3, Value::Int(1));
        state.set_value(1, Value::Bool(true));
        state.set_value(3, Value::Int(2));

        assert_eq!(state.value(3), Some(Value::Int(2)));
        assert_eq!(state.value(2), None);
        assert_eq!(state.ids(), vec![1, 3]);

        state.reset();
        assert!(state.is_empty());
    }
}
