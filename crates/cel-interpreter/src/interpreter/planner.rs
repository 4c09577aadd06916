//! Plans an [`Ast`] into an [`Interpretable`] tree.
//!
//! Checked ASTs carry resolved names and overload ids in their reference map
//! and plan without namespace search. Unchecked ASTs resolve identifiers
//! through the container at evaluation time and functions through the
//! dispatcher at plan time.

use std::sync::Arc;

use cel_ast::{operators, Ast, CelType, Expr, ExprId, SpannedExpr};

use super::attributes::{Attribute, AttributeFactory, Qualifier};
use super::decorators::Decorator;
use super::dispatcher::Dispatcher;
use super::interpretable::{
    AttrNode, CallNode, ConditionalNode, ConstNode, EqualityNode, FoldNode, ListNode, LogicNode,
    MapNode, StructNode,
};
use super::Interpretable;
use crate::eval::Value;
use crate::issues::Issue;

/// A planned sub-expression. Attributes stay open so that enclosing selects
/// and indexes extend their qualifier chain instead of wrapping them.
enum Planned {
    Attr { id: ExprId, attr: Attribute },
    Node(Box<dyn Interpretable>),
}

pub(crate) struct Planner<'a> {
    ast: &'a Ast,
    dispatcher: &'a Dispatcher,
    factory: &'a AttributeFactory,
    decorators: &'a [Decorator],
}

impl<'a> Planner<'a> {
    pub(crate) fn new(
        ast: &'a Ast,
        dispatcher: &'a Dispatcher,
        factory: &'a AttributeFactory,
        decorators: &'a [Decorator],
    ) -> Self {
        Self {
            ast,
            dispatcher,
            factory,
            decorators,
        }
    }

    pub(crate) fn plan(&self) -> Result<Box<dyn Interpretable>, Issue> {
        self.plan_node(self.ast.expr())
    }

    fn plan_node(&self, expr: &SpannedExpr) -> Result<Box<dyn Interpretable>, Issue> {
        match self.plan_expr(expr)? {
            Planned::Attr { id, attr } => self.decorate(Box::new(AttrNode { id, attr })),
            Planned::Node(node) => Ok(node),
        }
    }

    fn decorate(&self, node: Box<dyn Interpretable>) -> Result<Box<dyn Interpretable>, Issue> {
        self.decorators
            .iter()
            .try_fold(node, |node, decorator| decorator(node))
    }

    fn node(&self, node: impl Interpretable + 'static) -> Result<Planned, Issue> {
        self.decorate(Box::new(node)).map(Planned::Node)
    }

    fn plan_expr(&self, expr: &SpannedExpr) -> Result<Planned, Issue> {
        let id = expr.id;
        match &expr.node {
            Expr::Null
            | Expr::Bool(_)
            | Expr::Int(_)
            | Expr::UInt(_)
            | Expr::Float(_)
            | Expr::String(_)
            | Expr::Bytes(_) => {
                let value = literal_value(&expr.node)
                    .ok_or_else(|| Issue::at(id, expr.span.clone(), "unsupported literal"))?;
                self.node(ConstNode::new(id, value))
            }
            Expr::Ident(name) => match self.checked_ident(id)? {
                Some(planned) => Ok(planned),
                None => Ok(Planned::Attr {
                    id,
                    attr: self.factory.maybe(id, name),
                }),
            },
            Expr::RootIdent(name) => Ok(Planned::Attr {
                id,
                attr: self.factory.maybe(id, &format!(".{}", name)),
            }),
            Expr::Member {
                expr: operand,
                field,
            } => match self.checked_ident(id)? {
                Some(planned) => Ok(planned),
                None => self.plan_select(id, operand, field, false),
            },
            Expr::MemberTestOnly {
                expr: operand,
                field,
            } => self.plan_select(id, operand, field, true),
            Expr::Index {
                expr: operand,
                index,
            } => self.plan_index(id, operand, index),
            Expr::Unary { op, expr: operand } => {
                let args = vec![self.plan_node(operand)?];
                let function = operators::unary_op_to_function(*op);
                self.plan_function(expr, function, args)
            }
            Expr::Binary { op, left, right } => {
                let args = vec![self.plan_node(left)?, self.plan_node(right)?];
                let function = operators::binary_op_to_function(*op);
                self.plan_function(expr, function, args)
            }
            Expr::Ternary {
                cond,
                then_expr,
                else_expr,
            } => self.node(ConditionalNode {
                id,
                cond: self.plan_node(cond)?,
                then: self.plan_node(then_expr)?,
                otherwise: self.plan_node(else_expr)?,
                exhaustive: false,
            }),
            Expr::Call { expr: callee, args } => self.plan_call(expr, callee, args),
            Expr::List(elements) => {
                let elements = elements
                    .iter()
                    .map(|e| self.plan_node(e))
                    .collect::<Result<_, _>>()?;
                self.node(ListNode { id, elements })
            }
            Expr::Map(entries) => {
                let entries = entries
                    .iter()
                    .map(|e| Ok((self.plan_node(&e.key)?, self.plan_node(&e.value)?)))
                    .collect::<Result<_, Issue>>()?;
                self.node(MapNode { id, entries })
            }
            Expr::Struct { type_name, fields } => {
                let type_name = self.resolve_type_name(expr, type_name)?;
                let fields = fields
                    .iter()
                    .map(|f| Ok((Arc::from(f.name.as_str()), self.plan_node(&f.value)?)))
                    .collect::<Result<_, Issue>>()?;
                self.node(StructNode {
                    id,
                    type_name,
                    fields,
                    provider: self.factory.provider().clone(),
                })
            }
            Expr::Comprehension {
                iter_var,
                iter_range,
                accu_var,
                accu_init,
                loop_condition,
                loop_step,
                result,
            } => self.node(FoldNode {
                id,
                iter_var: iter_var.clone(),
                accu_var: accu_var.clone(),
                range: self.plan_node(iter_range)?,
                accu_init: self.plan_node(accu_init)?,
                cond: self.plan_node(loop_condition)?,
                step: self.plan_node(loop_step)?,
                result: self.plan_node(result)?,
                exhaustive: false,
            }),
        }
    }

    // ==================== Identifiers & Selection ====================

    /// An identifier or select chain the checker already resolved, either to
    /// a constant or to a fully qualified variable name.
    fn checked_ident(&self, id: ExprId) -> Result<Option<Planned>, Issue> {
        let Some(reference) = self.ast.reference(id) else {
            return Ok(None);
        };
        if !reference.overload_ids.is_empty() {
            return Ok(None);
        }
        if let Some(constant) = &reference.value {
            return self
                .node(ConstNode::new(id, Value::from_constant(constant)))
                .map(Some);
        }
        Ok(Some(Planned::Attr {
            id,
            attr: self.factory.absolute(id, vec![reference.name.clone()]),
        }))
    }

    fn plan_select(
        &self,
        id: ExprId,
        operand: &SpannedExpr,
        field: &str,
        presence_test: bool,
    ) -> Result<Planned, Issue> {
        let mut qualifier = Qualifier::field(id, field);
        if presence_test {
            qualifier = qualifier.presence_test();
        }
        Ok(Planned::Attr {
            id,
            attr: self.qualify(operand, qualifier)?,
        })
    }

    fn plan_index(
        &self,
        id: ExprId,
        operand: &SpannedExpr,
        index: &SpannedExpr,
    ) -> Result<Planned, Issue> {
        let index = self.plan_node(index)?;
        let qualifier = match index.as_const() {
            Some(key) => Qualifier::index(id, key.clone()),
            None => Qualifier::computed(id, Arc::from(index)),
        };
        Ok(Planned::Attr {
            id,
            attr: self.qualify(operand, qualifier)?,
        })
    }

    /// Extends the operand's attribute, or starts a relative attribute over
    /// an arbitrary operand expression.
    fn qualify(&self, operand: &SpannedExpr, qualifier: Qualifier) -> Result<Attribute, Issue> {
        let mut attr = match self.plan_expr(operand)? {
            Planned::Attr { attr, .. } => attr,
            Planned::Node(node) => self.factory.relative(operand.id, Arc::from(node)),
        };
        attr.add_qualifier(qualifier);
        Ok(attr)
    }

    // ==================== Calls ====================

    fn plan_call(
        &self,
        expr: &SpannedExpr,
        callee: &SpannedExpr,
        args: &[SpannedExpr],
    ) -> Result<Planned, Issue> {
        let (function, target) = match &callee.node {
            Expr::Ident(name) => (self.global_function(expr.id, name), None),
            Expr::RootIdent(name) => (self.global_function(expr.id, &format!(".{}", name)), None),
            Expr::Member {
                expr: target,
                field,
            } => match self.namespaced_function(expr.id, target, field) {
                Some(function) => (function, None),
                None => (field.clone(), Some(target.as_ref())),
            },
            _ => {
                return Err(Issue::at(
                    expr.id,
                    expr.span.clone(),
                    "unsupported call target",
                ))
            }
        };

        let mut planned = Vec::with_capacity(args.len() + 1);
        if let Some(target) = target {
            planned.push(self.plan_node(target)?);
        }
        for arg in args {
            planned.push(self.plan_node(arg)?);
        }
        self.plan_function(expr, &function, planned)
    }

    /// The registered function a global call refers to: the checker's
    /// resolution when present, else the first container candidate the
    /// dispatcher knows.
    fn global_function(&self, call_id: ExprId, name: &str) -> String {
        if let Some(reference) = self.ast.reference(call_id) {
            if !reference.name.is_empty() {
                return reference.name.clone();
            }
        }
        self.factory
            .container()
            .candidate_names(name)
            .into_iter()
            .find(|candidate| self.dispatcher.has_function(candidate))
            .unwrap_or_else(|| name.trim_start_matches('.').to_string())
    }

    /// `a.b.f(x)` naming the global function `a.b.f` rather than a member
    /// call of `f` on `a.b`.
    fn namespaced_function(
        &self,
        call_id: ExprId,
        target: &SpannedExpr,
        field: &str,
    ) -> Option<String> {
        let qualified = format!("{}.{}", target.node.qualified_name()?, field);
        if let Some(reference) = self.ast.reference(call_id) {
            return (reference.name == qualified.trim_start_matches('.'))
                .then(|| reference.name.clone());
        }
        self.factory
            .container()
            .candidate_names(&qualified)
            .into_iter()
            .find(|candidate| self.dispatcher.has_function(candidate))
    }

    fn plan_function(
        &self,
        expr: &SpannedExpr,
        function: &str,
        args: Vec<Box<dyn Interpretable>>,
    ) -> Result<Planned, Issue> {
        let id = expr.id;
        let args = match function {
            operators::LOGICAL_AND | operators::LOGICAL_OR => {
                match <[Box<dyn Interpretable>; 2]>::try_from(args) {
                    Ok([lhs, rhs]) => {
                        return self.node(LogicNode {
                            id,
                            lhs,
                            rhs,
                            absorbing: function == operators::LOGICAL_OR,
                            exhaustive: false,
                        })
                    }
                    Err(args) => args,
                }
            }
            operators::EQUALS | operators::NOT_EQUALS => {
                match <[Box<dyn Interpretable>; 2]>::try_from(args) {
                    Ok([lhs, rhs]) => {
                        return self.node(EqualityNode {
                            id,
                            lhs,
                            rhs,
                            negated: function == operators::NOT_EQUALS,
                        })
                    }
                    Err(args) => args,
                }
            }
            operators::CONDITIONAL => match <[Box<dyn Interpretable>; 3]>::try_from(args) {
                Ok([cond, then, otherwise]) => {
                    return self.node(ConditionalNode {
                        id,
                        cond,
                        then,
                        otherwise,
                        exhaustive: false,
                    })
                }
                Err(args) => args,
            },
            _ => args,
        };

        let overload_ids = self
            .ast
            .reference(id)
            .map_or(&[][..], |r| r.overload_ids.as_slice());
        let overloads = self.dispatcher.candidates(function, overload_ids);
        if overloads.is_empty() {
            return Err(Issue::at(
                id,
                expr.span.clone(),
                format!("undeclared reference to '{}'", function),
            ));
        }
        let non_strict = overloads.iter().all(|o| o.non_strict);
        self.node(CallNode {
            id,
            function: Arc::from(function),
            overloads,
            args,
            non_strict,
        })
    }

    // ==================== Types ====================

    fn resolve_type_name(&self, expr: &SpannedExpr, written: &str) -> Result<Arc<str>, Issue> {
        if let Some(reference) = self.ast.reference(expr.id) {
            return Ok(Arc::from(reference.name.as_str()));
        }
        if let Some(CelType::Message(name)) = self.ast.type_of(expr.id) {
            return Ok(name.clone());
        }
        let provider = self.factory.provider();
        self.factory
            .container()
            .candidate_names(written)
            .into_iter()
            .find(|candidate| provider.find_type(candidate).is_some())
            .map(Arc::from)
            .ok_or_else(|| {
                Issue::at(
                    expr.id,
                    expr.span.clone(),
                    format!("unknown type '{}'", written),
                )
            })
    }
}

/// The value of a literal expression node.
pub(crate) fn literal_value(expr: &Expr) -> Option<Value> {
    Some(match expr {
        Expr::Null => Value::Null,
        Expr::Bool(b) => Value::Bool(*b),
        Expr::Int(i) => Value::Int(*i),
        Expr::UInt(u) => Value::UInt(*u),
        Expr::Float(d) => Value::Double(*d),
        Expr::String(s) => Value::string(s.as_str()),
        Expr::Bytes(b) => Value::bytes(b.as_slice()),
        _ => return None,
    })
}
