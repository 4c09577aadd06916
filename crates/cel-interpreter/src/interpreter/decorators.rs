//! Build-time node decorators.
//!
//! A decorator sees every node right after the planner creates it and
//! returns either the same node or a replacement. The program applies them
//! in a fixed order: host decorators, constant folding, then short-circuit
//! removal and state observation.

use std::sync::Arc;

use cel_ast::ExprId;

use super::{ConstNode, Cost, EvalState, Interpretable, NodeKind};
use crate::eval::{Activation, EmptyActivation, Value};
use crate::issues::Issue;

pub type Decorator =
    Arc<dyn Fn(Box<dyn Interpretable>) -> Result<Box<dyn Interpretable>, Issue> + Send + Sync>;

/// Replaces foldable nodes whose children are all constants by the constant
/// they evaluate to.
///
/// A folded error fails the build: the sub-expression would fail on every run.
pub fn optimize() -> Decorator {
    Arc::new(|node| {
        if !node.kind().is_foldable() || node.children().iter().any(|c| c.as_const().is_none()) {
            return Ok(node);
        }
        let value = node.eval(&EmptyActivation::new());
        if let Some(err) = value.as_error() {
            return Err(Issue::new(format!("constant expression fails: {}", err))
                .with_expr_id(node.id()));
        }
        tracing::debug!(id = node.id(), value = %value, "folded constant expression");
        Ok(Box::new(ConstNode::new(node.id(), value)))
    })
}

/// Disables short-circuiting on logical operators, conditionals and
/// comprehension loop conditions.
pub fn exhaustive_eval() -> Decorator {
    Arc::new(|mut node| {
        node.disable_short_circuit();
        Ok(node)
    })
}

/// Records each node's value into `state` as it is computed.
pub fn observe(state: Arc<EvalState>) -> Decorator {
    Arc::new(move |node| {
        Ok(Box::new(ObserveNode {
            inner: node,
            state: state.clone(),
        }))
    })
}

/// Wraps a node and records its value on every evaluation.
#[derive(Debug)]
pub struct ObserveNode {
    inner: Box<dyn Interpretable>,
    state: Arc<EvalState>,
}

impl Interpretable for ObserveNode {
    fn id(&self) -> ExprId {
        self.inner.id()
    }

    fn eval(&self, activation: &dyn Activation) -> Value {
        let value = self.inner.eval(activation);
        self.state.set_value(self.inner.id(), value.clone());
        value
    }

    fn kind(&self) -> NodeKind {
        self.inner.kind()
    }

    fn as_const(&self) -> Option<&Value> {
        self.inner.as_const()
    }

    fn children(&self) -> Vec<&dyn Interpretable> {
        self.inner.children()
    }

    fn cost(&self) -> Cost {
        self.inner.cost()
    }

    fn disable_short_circuit(&mut self) {
        self.inner.disable_short_circuit();
    }
}
