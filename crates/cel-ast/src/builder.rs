//! Id-allocating expression builder.
//!
//! Hosts without a parser (and the residual-AST reconstruction) assemble
//! expression trees through [`ExprBuilder`]. Every constructor hands out the
//! next free id, so a tree built through one builder always has unique ids.
//! Methods take `&self` so that nested calls such as
//! `b.add(b.ident("x"), b.int(1))` compose without borrow juggling.

use std::cell::Cell;

use crate::expr::{
    BinaryOp, Expr, ExprId, MapEntry, Span, Spanned, SpannedExpr, StructField, UnaryOp,
};
use crate::operators::NOT_STRICTLY_FALSE;

/// Accumulator variable used by the standard macro expansions.
pub const ACCU_VAR: &str = "__result__";

/// Builds [`SpannedExpr`] trees with fresh, increasing ids.
#[derive(Debug)]
pub struct ExprBuilder {
    next_id: Cell<ExprId>,
}

impl Default for ExprBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExprBuilder {
    /// A builder whose first node gets id 1.
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first_id: ExprId) -> Self {
        Self {
            next_id: Cell::new(first_id),
        }
    }

    /// Reserve the next id.
    pub fn next_id(&self) -> ExprId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    fn node(&self, node: Expr) -> SpannedExpr {
        Spanned::new(self.next_id(), node, Span::default())
    }

    // ==================== Literals ====================

    pub fn null(&self) -> SpannedExpr {
        self.node(Expr::Null)
    }

    pub fn bool(&self, value: bool) -> SpannedExpr {
        self.node(Expr::Bool(value))
    }

    pub fn int(&self, value: i64) -> SpannedExpr {
        self.node(Expr::Int(value))
    }

    pub fn uint(&self, value: u64) -> SpannedExpr {
        self.node(Expr::UInt(value))
    }

    pub fn double(&self, value: f64) -> SpannedExpr {
        self.node(Expr::Float(value))
    }

    pub fn string(&self, value: impl Into<String>) -> SpannedExpr {
        self.node(Expr::String(value.into()))
    }

    pub fn bytes(&self, value: impl Into<Vec<u8>>) -> SpannedExpr {
        self.node(Expr::Bytes(value.into()))
    }

    // ==================== Names and access ====================

    pub fn ident(&self, name: impl Into<String>) -> SpannedExpr {
        self.node(Expr::Ident(name.into()))
    }

    /// Root-scoped identifier, written `.name` in source.
    pub fn root_ident(&self, name: impl Into<String>) -> SpannedExpr {
        self.node(Expr::RootIdent(name.into()))
    }

    pub fn select(&self, operand: SpannedExpr, field: impl Into<String>) -> SpannedExpr {
        self.node(Expr::Member {
            expr: Box::new(operand),
            field: field.into(),
        })
    }

    pub fn index(&self, operand: SpannedExpr, index: SpannedExpr) -> SpannedExpr {
        self.node(Expr::Index {
            expr: Box::new(operand),
            index: Box::new(index),
        })
    }

    // ==================== Calls and operators ====================

    /// Global function call `function(args)`.
    pub fn call(&self, function: impl Into<String>, args: Vec<SpannedExpr>) -> SpannedExpr {
        let callee = self.ident(function);
        self.node(Expr::Call {
            expr: Box::new(callee),
            args,
        })
    }

    /// Receiver-style call `target.function(args)`.
    pub fn member_call(
        &self,
        target: SpannedExpr,
        function: impl Into<String>,
        args: Vec<SpannedExpr>,
    ) -> SpannedExpr {
        let callee = self.select(target, function);
        self.node(Expr::Call {
            expr: Box::new(callee),
            args,
        })
    }

    pub fn unary(&self, op: UnaryOp, operand: SpannedExpr) -> SpannedExpr {
        self.node(Expr::Unary {
            op,
            expr: Box::new(operand),
        })
    }

    pub fn binary(&self, op: BinaryOp, left: SpannedExpr, right: SpannedExpr) -> SpannedExpr {
        self.node(Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn conditional(
        &self,
        cond: SpannedExpr,
        then_expr: SpannedExpr,
        else_expr: SpannedExpr,
    ) -> SpannedExpr {
        self.node(Expr::Ternary {
            cond: Box::new(cond),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        })
    }

    pub fn not(&self, operand: SpannedExpr) -> SpannedExpr {
        self.unary(UnaryOp::Not, operand)
    }

    pub fn neg(&self, operand: SpannedExpr) -> SpannedExpr {
        self.unary(UnaryOp::Neg, operand)
    }

    pub fn and(&self, left: SpannedExpr, right: SpannedExpr) -> SpannedExpr {
        self.binary(BinaryOp::And, left, right)
    }

    pub fn or(&self, left: SpannedExpr, right: SpannedExpr) -> SpannedExpr {
        self.binary(BinaryOp::Or, left, right)
    }

    pub fn eq(&self, left: SpannedExpr, right: SpannedExpr) -> SpannedExpr {
        self.binary(BinaryOp::Eq, left, right)
    }

    pub fn ne(&self, left: SpannedExpr, right: SpannedExpr) -> SpannedExpr {
        self.binary(BinaryOp::Ne, left, right)
    }

    pub fn lt(&self, left: SpannedExpr, right: SpannedExpr) -> SpannedExpr {
        self.binary(BinaryOp::Lt, left, right)
    }

    pub fn le(&self, left: SpannedExpr, right: SpannedExpr) -> SpannedExpr {
        self.binary(BinaryOp::Le, left, right)
    }

    pub fn gt(&self, left: SpannedExpr, right: SpannedExpr) -> SpannedExpr {
        self.binary(BinaryOp::Gt, left, right)
    }

    pub fn ge(&self, left: SpannedExpr, right: SpannedExpr) -> SpannedExpr {
        self.binary(BinaryOp::Ge, left, right)
    }

    pub fn add(&self, left: SpannedExpr, right: SpannedExpr) -> SpannedExpr {
        self.binary(BinaryOp::Add, left, right)
    }

    pub fn sub(&self, left: SpannedExpr, right: SpannedExpr) -> SpannedExpr {
        self.binary(BinaryOp::Sub, left, right)
    }

    pub fn mul(&self, left: SpannedExpr, right: SpannedExpr) -> SpannedExpr {
        self.binary(BinaryOp::Mul, left, right)
    }

    pub fn div(&self, left: SpannedExpr, right: SpannedExpr) -> SpannedExpr {
        self.binary(BinaryOp::Div, left, right)
    }

    pub fn modulo(&self, left: SpannedExpr, right: SpannedExpr) -> SpannedExpr {
        self.binary(BinaryOp::Mod, left, right)
    }

    pub fn in_(&self, elem: SpannedExpr, container: SpannedExpr) -> SpannedExpr {
        self.binary(BinaryOp::In, elem, container)
    }

    // ==================== Aggregates ====================

    pub fn list(&self, elements: Vec<SpannedExpr>) -> SpannedExpr {
        self.node(Expr::List(elements))
    }

    pub fn map(&self, entries: Vec<(SpannedExpr, SpannedExpr)>) -> SpannedExpr {
        let entries = entries
            .into_iter()
            .map(|(key, value)| MapEntry { key, value })
            .collect();
        self.node(Expr::Map(entries))
    }

    pub fn message(
        &self,
        type_name: impl Into<String>,
        fields: Vec<(&str, SpannedExpr)>,
    ) -> SpannedExpr {
        let fields = fields
            .into_iter()
            .map(|(name, value)| StructField {
                name: name.to_string(),
                value,
            })
            .collect();
        self.node(Expr::Struct {
            type_name: type_name.into(),
            fields,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn fold(
        &self,
        iter_var: impl Into<String>,
        iter_range: SpannedExpr,
        accu_var: impl Into<String>,
        accu_init: SpannedExpr,
        loop_condition: SpannedExpr,
        loop_step: SpannedExpr,
        result: SpannedExpr,
    ) -> SpannedExpr {
        self.node(Expr::Comprehension {
            iter_var: iter_var.into(),
            iter_range: Box::new(iter_range),
            accu_var: accu_var.into(),
            accu_init: Box::new(accu_init),
            loop_condition: Box::new(loop_condition),
            loop_step: Box::new(loop_step),
            result: Box::new(result),
        })
    }

    // ==================== Macros ====================

    /// `has(operand.field)`
    pub fn has(&self, operand: SpannedExpr, field: impl Into<String>) -> SpannedExpr {
        self.node(Expr::MemberTestOnly {
            expr: Box::new(operand),
            field: field.into(),
        })
    }

    /// `range.all(var, predicate)`
    pub fn all(&self, range: SpannedExpr, var: &str, predicate: SpannedExpr) -> SpannedExpr {
        let init = self.bool(true);
        let cond = self.call(NOT_STRICTLY_FALSE, vec![self.ident(ACCU_VAR)]);
        let step = self.and(self.ident(ACCU_VAR), predicate);
        let result = self.ident(ACCU_VAR);
        self.fold(var, range, ACCU_VAR, init, cond, step, result)
    }

    /// `range.exists(var, predicate)`
    pub fn exists(&self, range: SpannedExpr, var: &str, predicate: SpannedExpr) -> SpannedExpr {
        let init = self.bool(false);
        let cond = self.call(NOT_STRICTLY_FALSE, vec![self.not(self.ident(ACCU_VAR))]);
        let step = self.or(self.ident(ACCU_VAR), predicate);
        let result = self.ident(ACCU_VAR);
        self.fold(var, range, ACCU_VAR, init, cond, step, result)
    }

    /// `range.exists_one(var, predicate)`
    pub fn exists_one(&self, range: SpannedExpr, var: &str, predicate: SpannedExpr) -> SpannedExpr {
        let init = self.int(0);
        let cond = self.bool(true);
        let step = self.conditional(
            predicate,
            self.add(self.ident(ACCU_VAR), self.int(1)),
            self.ident(ACCU_VAR),
        );
        let result = self.eq(self.ident(ACCU_VAR), self.int(1));
        self.fold(var, range, ACCU_VAR, init, cond, step, result)
    }

    /// `range.map(var, transform)`
    pub fn map_macro(&self, range: SpannedExpr, var: &str, transform: SpannedExpr) -> SpannedExpr {
        let init = self.list(Vec::new());
        let cond = self.bool(true);
        let step = self.add(self.ident(ACCU_VAR), self.list(vec![transform]));
        let result = self.ident(ACCU_VAR);
        self.fold(var, range, ACCU_VAR, init, cond, step, result)
    }

    /// `range.map(var, filter, transform)`
    pub fn filter_map(
        &self,
        range: SpannedExpr,
        var: &str,
        filter: SpannedExpr,
        transform: SpannedExpr,
    ) -> SpannedExpr {
        let init = self.list(Vec::new());
        let cond = self.bool(true);
        let step = self.conditional(
            filter,
            self.add(self.ident(ACCU_VAR), self.list(vec![transform])),
            self.ident(ACCU_VAR),
        );
        let result = self.ident(ACCU_VAR);
        self.fold(var, range, ACCU_VAR, init, cond, step, result)
    }

    /// `range.filter(var, predicate)`
    pub fn filter(&self, range: SpannedExpr, var: &str, predicate: SpannedExpr) -> SpannedExpr {
        let kept = self.ident(var);
        self.filter_map(range, var, predicate, kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique_and_increasing() {
        let b = ExprBuilder::new();
        let expr = b.add(b.ident("x"), b.mul(b.int(2), b.int(3)));
        let ids = expr.ids();
        let unique: HashSet<_> = ids.iter().copied().collect();
        assert_eq!(unique.len(), ids.len());
        assert_eq!(expr.max_id(), expr.id);
    }

    #[test]
    fn all_macro_shape() {
        let b = ExprBuilder::new();
        let expr = b.all(b.ident("xs"), "x", b.gt(b.ident("x"), b.int(0)));
        let Expr::Comprehension {
            accu_var,
            accu_init,
            loop_condition,
            ..
        } = &expr.node
        else {
            panic!("expected comprehension");
        };
        assert_eq!(accu_var, ACCU_VAR);
        assert_eq!(accu_init.node, Expr::Bool(true));
        let Expr::Call { expr: callee, .. } = &loop_condition.node else {
            panic!("expected call");
        };
        assert_eq!(callee.node, Expr::Ident(NOT_STRICTLY_FALSE.to_string()));
    }

    #[test]
    fn starting_at_offsets_ids() {
        let b = ExprBuilder::starting_at(100);
        assert_eq!(b.int(1).id, 100);
        assert_eq!(b.next_id(), 101);
    }
}
