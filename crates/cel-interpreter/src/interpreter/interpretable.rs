//! The compiled evaluation tree.
//!
//! Each AST node plans into one [`Interpretable`]. Trees are immutable once
//! built and evaluate through `&self`, so one tree serves concurrent runs
//! against distinct activations.

use std::fmt;
use std::sync::Arc;

use cel_ast::{operators, ExprId};

use super::dispatcher::{dispatch_among, no_such_overload, Overload};
use super::{Attribute, Cost};
use crate::eval::{
    Activation, EvalError, HierarchicalActivation, MapKey, TypeProvider, UnknownSet, Value,
    ValueMap,
};

/// Node kinds, as seen by decorators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Const,
    Attribute,
    Call,
    And,
    Or,
    Conditional,
    Equal,
    NotEqual,
    List,
    Map,
    Struct,
    Fold,
    /// Host-provided node.
    Custom,
}

impl NodeKind {
    /// Kinds whose value is fixed once all their children are constants.
    pub fn is_foldable(self) -> bool {
        matches!(
            self,
            NodeKind::Call
                | NodeKind::And
                | NodeKind::Or
                | NodeKind::Conditional
                | NodeKind::Equal
                | NodeKind::NotEqual
                | NodeKind::List
                | NodeKind::Map
        )
    }
}

/// A compiled, evaluable expression node.
pub trait Interpretable: fmt::Debug + Send + Sync {
    /// Id of the expression this node was planned from.
    fn id(&self) -> ExprId;

    fn eval(&self, activation: &dyn Activation) -> Value;

    fn kind(&self) -> NodeKind {
        NodeKind::Custom
    }

    fn as_const(&self) -> Option<&Value> {
        None
    }

    /// Direct operands, in evaluation order.
    fn children(&self) -> Vec<&dyn Interpretable> {
        Vec::new()
    }

    fn cost(&self) -> Cost {
        Cost::UNKNOWN
    }

    /// Makes this node evaluate every operand even when the result is
    /// already decided. Nodes without short-circuit behavior ignore it.
    fn disable_short_circuit(&mut self) {}
}

fn merge_unknown(acc: Option<UnknownSet>, unknown: &UnknownSet) -> Option<UnknownSet> {
    Some(match acc {
        Some(acc) => acc.merge(unknown),
        None => unknown.clone(),
    })
}

/// First error or unknown among `values`, left to right.
fn first_error_or_unknown(values: &[Value]) -> Option<&Value> {
    values.iter().find(|v| v.is_error_or_unknown())
}

// ==================== Leaves ====================

/// A literal, or a folded constant sub-expression.
#[derive(Debug, Clone)]
pub struct ConstNode {
    id: ExprId,
    value: Value,
}

impl ConstNode {
    pub fn new(id: ExprId, value: Value) -> Self {
        Self { id, value }
    }
}

impl Interpretable for ConstNode {
    fn id(&self) -> ExprId {
        self.id
    }

    fn eval(&self, _activation: &dyn Activation) -> Value {
        self.value.clone()
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Const
    }

    fn as_const(&self) -> Option<&Value> {
        Some(&self.value)
    }

    fn cost(&self) -> Cost {
        Cost::ZERO
    }
}

#[derive(Debug)]
pub(crate) struct AttrNode {
    pub(crate) id: ExprId,
    pub(crate) attr: Attribute,
}

impl Interpretable for AttrNode {
    fn id(&self) -> ExprId {
        self.id
    }

    fn eval(&self, activation: &dyn Activation) -> Value {
        self.attr.resolve(activation)
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Attribute
    }

    fn children(&self) -> Vec<&dyn Interpretable> {
        self.attr.children()
    }

    fn cost(&self) -> Cost {
        self.attr.cost()
    }
}

// ==================== Calls ====================

/// A function or operator call dispatched among candidate overloads.
#[derive(Debug)]
pub(crate) struct CallNode {
    pub(crate) id: ExprId,
    pub(crate) function: Arc<str>,
    pub(crate) overloads: Vec<Arc<Overload>>,
    pub(crate) args: Vec<Box<dyn Interpretable>>,
    pub(crate) non_strict: bool,
}

impl Interpretable for CallNode {
    fn id(&self) -> ExprId {
        self.id
    }

    fn eval(&self, activation: &dyn Activation) -> Value {
        let args: Vec<Value> = self.args.iter().map(|a| a.eval(activation)).collect();
        if !self.non_strict {
            if let Some(stop) = first_error_or_unknown(&args) {
                return stop.clone();
            }
        }
        dispatch_among(&self.function, &self.overloads, &args)
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Call
    }

    fn children(&self) -> Vec<&dyn Interpretable> {
        self.args.iter().map(|a| a.as_ref()).collect()
    }

    fn cost(&self) -> Cost {
        Cost::of_all(self.children()).plus(1)
    }
}

/// `_==_` and `_!=_`.
#[derive(Debug)]
pub(crate) struct EqualityNode {
    pub(crate) id: ExprId,
    pub(crate) lhs: Box<dyn Interpretable>,
    pub(crate) rhs: Box<dyn Interpretable>,
    pub(crate) negated: bool,
}

impl Interpretable for EqualityNode {
    fn id(&self) -> ExprId {
        self.id
    }

    fn eval(&self, activation: &dyn Activation) -> Value {
        let lhs = self.lhs.eval(activation);
        let rhs = self.rhs.eval(activation);
        if self.negated {
            lhs.not_equal(&rhs)
        } else {
            lhs.equal(&rhs)
        }
    }

    fn kind(&self) -> NodeKind {
        if self.negated {
            NodeKind::NotEqual
        } else {
            NodeKind::Equal
        }
    }

    fn children(&self) -> Vec<&dyn Interpretable> {
        vec![self.lhs.as_ref(), self.rhs.as_ref()]
    }

    fn cost(&self) -> Cost {
        self.lhs.cost().add(self.rhs.cost()).plus(1)
    }
}

// ==================== Logic ====================

/// `_&&_` and `_||_` over three-valued logic.
///
/// The absorbing value (`false` for and, `true` for or) decides the result
/// whichever side produced it. Otherwise unknowns win over errors, unknown
/// ids merge, and a non-bool operand is a "no such overload" error.
#[derive(Debug)]
pub(crate) struct LogicNode {
    pub(crate) id: ExprId,
    pub(crate) lhs: Box<dyn Interpretable>,
    pub(crate) rhs: Box<dyn Interpretable>,
    /// `false` for and, `true` for or.
    pub(crate) absorbing: bool,
    pub(crate) exhaustive: bool,
}

impl LogicNode {
    fn function(&self) -> &'static str {
        if self.absorbing {
            operators::LOGICAL_OR
        } else {
            operators::LOGICAL_AND
        }
    }

    fn combine(&self, operands: [&Value; 2]) -> Value {
        let mut unknown = None;
        let mut error = None;
        for operand in operands {
            match operand {
                Value::Bool(b) if *b == self.absorbing => return Value::Bool(self.absorbing),
                Value::Bool(_) => {}
                Value::Unknown(u) => unknown = merge_unknown(unknown, u),
                Value::Error(_) => {
                    error.get_or_insert_with(|| operand.clone());
                }
                other => {
                    error.get_or_insert_with(|| {
                        no_such_overload(self.function(), std::slice::from_ref(other))
                    });
                }
            }
        }
        if let Some(unknown) = unknown {
            return Value::Unknown(Arc::new(unknown));
        }
        error.unwrap_or(Value::Bool(!self.absorbing))
    }
}

impl Interpretable for LogicNode {
    fn id(&self) -> ExprId {
        self.id
    }

    fn eval(&self, activation: &dyn Activation) -> Value {
        let lhs = self.lhs.eval(activation);
        if !self.exhaustive && lhs == Value::Bool(self.absorbing) {
            return lhs;
        }
        let rhs = self.rhs.eval(activation);
        self.combine([&lhs, &rhs])
    }

    fn kind(&self) -> NodeKind {
        if self.absorbing {
            NodeKind::Or
        } else {
            NodeKind::And
        }
    }

    fn children(&self) -> Vec<&dyn Interpretable> {
        vec![self.lhs.as_ref(), self.rhs.as_ref()]
    }

    fn cost(&self) -> Cost {
        let lhs = self.lhs.cost();
        let rhs = self.rhs.cost();
        if self.exhaustive {
            return lhs.add(rhs).plus(1);
        }
        Cost::new(lhs.min, lhs.max.saturating_add(rhs.max).saturating_add(1))
    }

    fn disable_short_circuit(&mut self) {
        self.exhaustive = true;
    }
}

/// `cond ? then : else`.
#[derive(Debug)]
pub(crate) struct ConditionalNode {
    pub(crate) id: ExprId,
    pub(crate) cond: Box<dyn Interpretable>,
    pub(crate) then: Box<dyn Interpretable>,
    pub(crate) otherwise: Box<dyn Interpretable>,
    pub(crate) exhaustive: bool,
}

impl Interpretable for ConditionalNode {
    fn id(&self) -> ExprId {
        self.id
    }

    fn eval(&self, activation: &dyn Activation) -> Value {
        let cond = self.cond.eval(activation);
        if self.exhaustive {
            let then = self.then.eval(activation);
            let otherwise = self.otherwise.eval(activation);
            return match cond {
                Value::Bool(true) => then,
                Value::Bool(false) => otherwise,
                _ => select_failure(cond),
            };
        }
        match cond {
            Value::Bool(true) => self.then.eval(activation),
            Value::Bool(false) => self.otherwise.eval(activation),
            _ => select_failure(cond),
        }
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Conditional
    }

    fn children(&self) -> Vec<&dyn Interpretable> {
        vec![self.cond.as_ref(), self.then.as_ref(), self.otherwise.as_ref()]
    }

    fn cost(&self) -> Cost {
        let cond = self.cond.cost();
        let then = self.then.cost();
        let otherwise = self.otherwise.cost();
        if self.exhaustive {
            return cond.add(then).add(otherwise);
        }
        Cost::new(
            cond.min.saturating_add(then.min.min(otherwise.min)),
            cond.max.saturating_add(then.max.max(otherwise.max)),
        )
    }

    fn disable_short_circuit(&mut self) {
        self.exhaustive = true;
    }
}

/// The result of a conditional whose condition is not a bool.
fn select_failure(cond: Value) -> Value {
    if cond.is_error_or_unknown() {
        cond
    } else {
        no_such_overload(operators::CONDITIONAL, &[cond])
    }
}

// ==================== Constructors ====================

#[derive(Debug)]
pub(crate) struct ListNode {
    pub(crate) id: ExprId,
    pub(crate) elements: Vec<Box<dyn Interpretable>>,
}

impl Interpretable for ListNode {
    fn id(&self) -> ExprId {
        self.id
    }

    fn eval(&self, activation: &dyn Activation) -> Value {
        let mut values = Vec::with_capacity(self.elements.len());
        for element in &self.elements {
            let value = element.eval(activation);
            if value.is_error_or_unknown() {
                return value;
            }
            values.push(value);
        }
        Value::list(values)
    }

    fn kind(&self) -> NodeKind {
        NodeKind::List
    }

    fn children(&self) -> Vec<&dyn Interpretable> {
        self.elements.iter().map(|e| e.as_ref()).collect()
    }

    fn cost(&self) -> Cost {
        Cost::of_all(self.children())
    }
}

#[derive(Debug)]
pub(crate) struct MapNode {
    pub(crate) id: ExprId,
    pub(crate) entries: Vec<(Box<dyn Interpretable>, Box<dyn Interpretable>)>,
}

impl Interpretable for MapNode {
    fn id(&self) -> ExprId {
        self.id
    }

    fn eval(&self, activation: &dyn Activation) -> Value {
        let mut map = ValueMap::new();
        for (key, value) in &self.entries {
            let key = key.eval(activation);
            if key.is_error_or_unknown() {
                return key;
            }
            let value = value.eval(activation);
            if value.is_error_or_unknown() {
                return value;
            }
            let Some(map_key) = MapKey::from_value(&key) else {
                return Value::error(EvalError::invalid_argument(format!(
                    "unsupported key type: {}",
                    key.type_name()
                )));
            };
            if map.contains_key(&map_key) {
                return Value::error(EvalError::invalid_argument(format!(
                    "repeated key: {}",
                    key
                )));
            }
            map.insert(map_key, value);
        }
        Value::from(map)
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Map
    }

    fn children(&self) -> Vec<&dyn Interpretable> {
        self.entries
            .iter()
            .flat_map(|(k, v)| [k.as_ref(), v.as_ref()])
            .collect()
    }

    fn cost(&self) -> Cost {
        Cost::of_all(self.children())
    }
}

/// `T{field: value, ...}`, built through the type provider.
#[derive(Debug)]
pub(crate) struct StructNode {
    pub(crate) id: ExprId,
    pub(crate) type_name: Arc<str>,
    pub(crate) fields: Vec<(Arc<str>, Box<dyn Interpretable>)>,
    pub(crate) provider: Arc<dyn TypeProvider>,
}

impl Interpretable for StructNode {
    fn id(&self) -> ExprId {
        self.id
    }

    fn eval(&self, activation: &dyn Activation) -> Value {
        let mut fields = Vec::with_capacity(self.fields.len());
        for (name, node) in &self.fields {
            let value = node.eval(activation);
            if value.is_error_or_unknown() {
                return value;
            }
            fields.push((name.clone(), value));
        }
        self.provider.new_value(&self.type_name, fields)
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Struct
    }

    fn children(&self) -> Vec<&dyn Interpretable> {
        self.fields.iter().map(|(_, v)| v.as_ref()).collect()
    }

    fn cost(&self) -> Cost {
        Cost::of_all(self.children())
    }
}

// ==================== Comprehensions ====================

/// Loop-scoped bindings: the iteration variable shadows the accumulator.
struct FoldScope<'a> {
    iter_var: &'a str,
    iter_value: Option<Value>,
    accu_var: &'a str,
    accu_value: Value,
}

impl Activation for FoldScope<'_> {
    fn resolve(&self, name: &str) -> Option<Value> {
        if name == self.iter_var {
            if let Some(value) = &self.iter_value {
                return Some(value.clone());
            }
        }
        (name == self.accu_var).then(|| self.accu_value.clone())
    }
}

/// A comprehension: the desugared form of `all`, `exists`, `map` and friends.
#[derive(Debug)]
pub(crate) struct FoldNode {
    pub(crate) id: ExprId,
    pub(crate) iter_var: String,
    pub(crate) accu_var: String,
    pub(crate) range: Box<dyn Interpretable>,
    pub(crate) accu_init: Box<dyn Interpretable>,
    pub(crate) cond: Box<dyn Interpretable>,
    pub(crate) step: Box<dyn Interpretable>,
    pub(crate) result: Box<dyn Interpretable>,
    pub(crate) exhaustive: bool,
}

/// Elements a comprehension ranges over: list elements in order, map keys in
/// key order.
fn range_items(range: &Value) -> Result<Vec<Value>, Value> {
    match range {
        Value::List(list) => Ok(list.to_vec()),
        Value::Map(map) => Ok(map.keys().map(MapKey::to_value).collect()),
        other if other.is_error_or_unknown() => Err(other.clone()),
        other => Err(no_such_overload("iterate", std::slice::from_ref(other))),
    }
}

impl Interpretable for FoldNode {
    fn id(&self) -> ExprId {
        self.id
    }

    fn eval(&self, activation: &dyn Activation) -> Value {
        let range = self.range.eval(activation);
        let items = match range_items(&range) {
            Ok(items) => items,
            Err(stop) => return stop,
        };

        let mut scope = FoldScope {
            iter_var: &self.iter_var,
            iter_value: None,
            accu_var: &self.accu_var,
            accu_value: self.accu_init.eval(activation),
        };
        for item in items {
            scope.iter_value = Some(item);
            let next = {
                let layered = HierarchicalActivation::new(activation, &scope);
                let cond = self.cond.eval(&layered);
                if !self.exhaustive && cond == Value::Bool(false) {
                    break;
                }
                self.step.eval(&layered)
            };
            scope.accu_value = next;
        }

        scope.iter_value = None;
        self.result
            .eval(&HierarchicalActivation::new(activation, &scope))
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Fold
    }

    fn children(&self) -> Vec<&dyn Interpretable> {
        vec![
            self.range.as_ref(),
            self.accu_init.as_ref(),
            self.cond.as_ref(),
            self.step.as_ref(),
            self.result.as_ref(),
        ]
    }

    /// Condition and step are charged once per element, so only a constant
    /// range can be bounded.
    fn cost(&self) -> Cost {
        let Some(count) = self
            .range
            .as_const()
            .and_then(|r| range_items(r).ok())
            .map(|items| items.len() as i64)
        else {
            return Cost::UNKNOWN;
        };
        let range = self.range.cost();
        let accu = self.accu_init.cost();
        let cond = self.cond.cost();
        let step = self.step.cost();
        let result = self.result.cost();
        let (cond_min, step_min) = if self.exhaustive {
            (cond.min.saturating_mul(count), step.min.saturating_mul(count))
        } else {
            let runs = count.min(1);
            (cond.min.saturating_mul(runs), step.min.saturating_mul(runs))
        };
        Cost::new(
            range.min + accu.min + cond_min + step_min + result.min,
            range
                .max
                .saturating_add(accu.max)
                .saturating_add(cond.max.saturating_mul(count))
                .saturating_add(step.max.saturating_mul(count))
                .saturating_add(result.max),
        )
    }

    fn disable_short_circuit(&mut self) {
        self.exhaustive = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{EmptyActivation, EvalErrorKind, MapActivation};

    fn constant(id: ExprId, value: impl Into<Value>) -> Box<dyn Interpretable> {
        Box::new(ConstNode::new(id, value.into()))
    }

    fn unknown(id: ExprId) -> Box<dyn Interpretable> {
        Box::new(ConstNode::new(id, Value::unknown(id)))
    }

    fn failing(id: ExprId) -> Box<dyn Interpretable> {
        Box::new(ConstNode::new(id, Value::error(EvalError::division_by_zero())))
    }

    fn and(lhs: Box<dyn Interpretable>, rhs: Box<dyn Interpretable>) -> LogicNode {
        LogicNode {
            id: 100,
            lhs,
            rhs,
            absorbing: false,
            exhaustive: false,
        }
    }

    fn or(lhs: Box<dyn Interpretable>, rhs: Box<dyn Interpretable>) -> LogicNode {
        LogicNode {
            absorbing: true,
            ..and(lhs, rhs)
        }
    }

    #[test]
    fn test_and_absorbs_errors_and_unknowns() {
        let empty = EmptyActivation::new();
        assert_eq!(and(constant(1, false), failing(2)).eval(&empty), Value::Bool(false));
        assert_eq!(and(failing(1), constant(2, false)).eval(&empty), Value::Bool(false));
        assert_eq!(and(unknown(1), constant(2, false)).eval(&empty), Value::Bool(false));
        assert!(and(unknown(1), constant(2, true)).eval(&empty).is_unknown());
        assert!(and(constant(1, true), failing(2)).eval(&empty).is_error());
    }

    #[test]
    fn test_or_absorbs_errors_and_unknowns() {
        let empty = EmptyActivation::new();
        assert_eq!(or(unknown(1), constant(2, true)).eval(&empty), Value::Bool(true));
        assert_eq!(or(failing(1), constant(2, true)).eval(&empty), Value::Bool(true));
        assert_eq!(or(constant(1, false), constant(2, false)).eval(&empty), Value::Bool(false));
    }

    #[test]
    fn test_unknown_preferred_and_merged() {
        let empty = EmptyActivation::new();
        let value = and(failing(1), unknown(2)).eval(&empty);
        assert!(value.is_unknown());

        let value = or(unknown(1), unknown(2)).eval(&empty);
        let ids: Vec<ExprId> = value.as_unknown().unwrap().ids().collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_non_bool_operand() {
        let value = and(constant(1, true), constant(2, 1)).eval(&EmptyActivation::new());
        assert_eq!(value.as_error().map(|e| e.kind), Some(EvalErrorKind::NoSuchOverload));
    }

    #[test]
    fn test_conditional() {
        let empty = EmptyActivation::new();
        let node = |cond| ConditionalNode {
            id: 4,
            cond,
            then: constant(2, "yes"),
            otherwise: failing(3),
            exhaustive: false,
        };
        assert_eq!(node(constant(1, true)).eval(&empty), Value::from("yes"));
        assert!(node(constant(1, false)).eval(&empty).is_error());
        assert!(node(unknown(1)).eval(&empty).is_unknown());
        assert!(node(constant(1, "x")).eval(&empty).is_error());
    }

    #[test]
    fn test_list_propagates_first_failure() {
        let node = ListNode {
            id: 4,
            elements: vec![constant(1, 1), unknown(2), failing(3)],
        };
        assert!(node.eval(&EmptyActivation::new()).is_unknown());
    }

    #[test]
    fn test_map_rejects_repeated_keys() {
        let node = MapNode {
            id: 5,
            entries: vec![(constant(1, "a"), constant(2, 1)), (constant(3, "a"), constant(4, 2))],
        };
        let err = node.eval(&EmptyActivation::new());
        assert_eq!(err.as_error().map(|e| e.kind), Some(EvalErrorKind::InvalidArgument));
    }

    #[derive(Debug)]
    struct Var(&'static str);

    impl Interpretable for Var {
        fn id(&self) -> ExprId {
            0
        }

        fn eval(&self, activation: &dyn Activation) -> Value {
            activation.resolve(self.0).unwrap_or(Value::Null)
        }
    }

    #[test]
    fn test_fold_sums_and_stops_on_false_condition() {
        let sum = |exhaustive| FoldNode {
            id: 10,
            iter_var: "x".to_string(),
            accu_var: "acc".to_string(),
            range: constant(1, vec![1, 2, 3]),
            accu_init: constant(2, 0),
            cond: Box::new(CondBelow(3)),
            step: Box::new(SumStep),
            result: Box::new(Var("acc")),
            exhaustive,
        };
        // Stops once the accumulator reaches 3.
        assert_eq!(sum(false).eval(&MapActivation::new()), Value::Int(3));
        assert_eq!(sum(true).eval(&MapActivation::new()), Value::Int(6));
    }

    #[derive(Debug)]
    struct CondBelow(i64);

    impl Interpretable for CondBelow {
        fn id(&self) -> ExprId {
            0
        }

        fn eval(&self, activation: &dyn Activation) -> Value {
            let acc = activation.resolve("acc").and_then(|v| v.as_int()).unwrap_or(0);
            Value::Bool(acc < self.0)
        }
    }

    #[derive(Debug)]
    struct SumStep;

    impl Interpretable for SumStep {
        fn id(&self) -> ExprId {
            0
        }

        fn eval(&self, activation: &dyn Activation) -> Value {
            let acc = activation.resolve("acc").unwrap_or(Value::Int(0));
            let x = activation.resolve("x").unwrap_or(Value::Int(0));
            acc.add(&x)
        }
    }

    #[test]
    fn test_fold_over_map_keys() {
        let map = Value::map([("b".into(), Value::Int(1)), ("a".into(), Value::Int(2))]);
        let node = FoldNode {
            id: 10,
            iter_var: "k".to_string(),
            accu_var: "acc".to_string(),
            range: constant(1, map),
            accu_init: constant(2, ""),
            cond: constant(3, true),
            step: Box::new(ConcatKeys),
            result: Box::new(Var("acc")),
            exhaustive: false,
        };
        assert_eq!(node.eval(&EmptyActivation::new()), Value::from("ab"));
    }

    #[derive(Debug)]
    struct ConcatKeys;

    impl Interpretable for ConcatKeys {
        fn id(&self) -> ExprId {
            0
        }

        fn eval(&self, activation: &dyn Activation) -> Value {
            let acc = activation.resolve("acc").unwrap_or(Value::Null);
            let k = activation.resolve("k").unwrap_or(Value::Null);
            acc.add(&k)
        }
    }

    #[test]
    fn test_fold_over_non_iterable() {
        let node = FoldNode {
            id: 10,
            iter_var: "x".to_string(),
            accu_var: "acc".to_string(),
            range: constant(1, true),
            accu_init: constant(2, 0),
            cond: constant(3, true),
            step: constant(4, 0),
            result: Box::new(Var("acc")),
            exhaustive: false,
        };
        let err = node.eval(&EmptyActivation::new());
        assert_eq!(err.as_error().map(|e| e.kind), Some(EvalErrorKind::NoSuchOverload));
    }

    #[test]
    fn test_costs() {
        let node = and(constant(1, true), constant(2, true));
        assert_eq!(node.cost(), Cost::new(0, 1));

        let fold = FoldNode {
            id: 10,
            iter_var: "x".to_string(),
            accu_var: "acc".to_string(),
            range: constant(1, vec![1, 2, 3]),
            accu_init: constant(2, 0),
            cond: Box::new(and(constant(3, true), constant(4, true))),
            step: constant(5, 0),
            result: constant(6, 0),
            exhaustive: false,
        };
        assert_eq!(fold.cost(), Cost::new(0, 3));

        let dynamic = FoldNode {
            range: Box::new(Var("xs")),
            ..fold
        };
        assert!(dynamic.cost().is_unknown());
    }

    #[test]
    fn test_cost_of_fold_over_empty_range() {
        let eq = |id| -> Box<dyn Interpretable> {
            Box::new(EqualityNode {
                id,
                lhs: constant(id + 1, 1),
                rhs: constant(id + 2, 1),
                negated: false,
            })
        };
        let fold = |items: Vec<i64>| FoldNode {
            id: 10,
            iter_var: "x".to_string(),
            accu_var: "acc".to_string(),
            range: constant(1, items),
            accu_init: constant(2, 0),
            cond: eq(3),
            step: eq(6),
            result: constant(9, 0),
            exhaustive: false,
        };
        assert_eq!(fold(vec![]).cost(), Cost::ZERO);
        assert_eq!(fold(vec![1, 2]).cost(), Cost::new(2, 4));
    }
}
