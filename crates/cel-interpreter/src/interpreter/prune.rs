//! Residual expressions from partial evaluation.
//!
//! After a state-tracking run, every sub-expression whose recorded value is
//! concrete is replaced by a literal, and logical operators and conditionals
//! whose outcome is already decided collapse. What remains depends only on
//! the attributes that were unknown.

use cel_ast::{
    ast_to_string, Ast, BinaryOp, Expr, MapEntry, Span, Spanned, SpannedExpr, StructField,
};

use super::EvalState;
use crate::eval::time::{format_duration, format_timestamp};
use crate::eval::Value;

/// Builds a new [`Ast`] holding only the parts of `ast` that `state` could
/// not evaluate.
///
/// The residual is unchecked and renumbered from 1: its ids have no relation
/// to the ids of `ast`.
pub fn residual_ast(ast: &Ast, state: &EvalState) -> Ast {
    let pruned = prune(ast.expr(), state);
    let mut next = 1;
    let expr = pruned.renumbered(&mut next);
    let source = ast_to_string(&expr);
    Ast::new_unchecked(expr, source)
}

fn prune(expr: &SpannedExpr, state: &EvalState) -> SpannedExpr {
    if let Some(literal) = state
        .value(expr.id)
        .and_then(|value| literal_expr(&value, &expr.span))
    {
        return literal;
    }

    match &expr.node {
        Expr::Binary {
            op: op @ (BinaryOp::And | BinaryOp::Or),
            left,
            right,
        } => {
            let left = prune(left, state);
            let right = prune(right, state);
            let absorbing = *op == BinaryOp::Or;
            for (side, other) in [(&left, &right), (&right, &left)] {
                if let Expr::Bool(b) = side.node {
                    return if b == absorbing {
                        side.clone()
                    } else {
                        other.clone()
                    };
                }
            }
            rebuilt(
                expr,
                Expr::Binary {
                    op: *op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
            )
        }
        Expr::Ternary {
            cond,
            then_expr,
            else_expr,
        } => match state.value(cond.id) {
            Some(Value::Bool(true)) => prune(then_expr, state),
            Some(Value::Bool(false)) => prune(else_expr, state),
            _ => rebuilt(
                expr,
                Expr::Ternary {
                    cond: Box::new(prune(cond, state)),
                    then_expr: Box::new(prune(then_expr, state)),
                    else_expr: Box::new(prune(else_expr, state)),
                },
            ),
        },
        // Loop bodies record one value per iteration; only the parts
        // evaluated once can be replaced.
        Expr::Comprehension {
            iter_var,
            iter_range,
            accu_var,
            accu_init,
            loop_condition,
            loop_step,
            result,
        } => rebuilt(
            expr,
            Expr::Comprehension {
                iter_var: iter_var.clone(),
                iter_range: Box::new(prune(iter_range, state)),
                accu_var: accu_var.clone(),
                accu_init: Box::new(prune(accu_init, state)),
                loop_condition: loop_condition.clone(),
                loop_step: loop_step.clone(),
                result: result.clone(),
            },
        ),
        _ => rebuilt(expr, map_children(&expr.node, |child| prune(child, state))),
    }
}

fn rebuilt(original: &SpannedExpr, node: Expr) -> SpannedExpr {
    Spanned::new(original.id, node, original.span.clone())
}

/// Rebuilds `node` with `f` applied to each direct child.
fn map_children(node: &Expr, mut f: impl FnMut(&SpannedExpr) -> SpannedExpr) -> Expr {
    match node {
        Expr::List(elements) => Expr::List(elements.iter().map(|e| f(e)).collect()),
        Expr::Map(entries) => Expr::Map(
            entries
                .iter()
                .map(|e| MapEntry {
                    key: f(&e.key),
                    value: f(&e.value),
                })
                .collect(),
        ),
        Expr::Unary { op, expr } => Expr::Unary {
            op: *op,
            expr: Box::new(f(expr)),
        },
        Expr::Binary { op, left, right } => Expr::Binary {
            op: *op,
            left: Box::new(f(left)),
            right: Box::new(f(right)),
        },
        Expr::Ternary {
            cond,
            then_expr,
            else_expr,
        } => Expr::Ternary {
            cond: Box::new(f(cond)),
            then_expr: Box::new(f(then_expr)),
            else_expr: Box::new(f(else_expr)),
        },
        Expr::Member { expr, field } => Expr::Member {
            expr: Box::new(f(expr)),
            field: field.clone(),
        },
        Expr::MemberTestOnly { expr, field } => Expr::MemberTestOnly {
            expr: Box::new(f(expr)),
            field: field.clone(),
        },
        Expr::Index { expr, index } => Expr::Index {
            expr: Box::new(f(expr)),
            index: Box::new(f(index)),
        },
        Expr::Call { expr: callee, args } => {
            let callee = match &callee.node {
                Expr::Member { expr: target, field } => Box::new(rebuilt(
                    callee,
                    Expr::Member {
                        expr: Box::new(f(target)),
                        field: field.clone(),
                    },
                )),
                _ => callee.clone(),
            };
            Expr::Call {
                expr: callee,
                args: args.iter().map(|a| f(a)).collect(),
            }
        }
        Expr::Struct { type_name, fields } => Expr::Struct {
            type_name: type_name.clone(),
            fields: fields
                .iter()
                .map(|field| StructField {
                    name: field.name.clone(),
                    value: f(&field.value),
                })
                .collect(),
        },
        leaf => leaf.clone(),
    }
}

/// An expression that evaluates to `value`, when CEL can write one.
fn literal_expr(value: &Value, span: &Span) -> Option<SpannedExpr> {
    let leaf = |node| Some(Spanned::new(0, node, span.clone()));
    let call = |function: &str, arg: String| {
        leaf(Expr::Call {
            expr: Box::new(Spanned::new(0, Expr::Ident(function.to_string()), span.clone())),
            args: vec![Spanned::new(0, Expr::String(arg), span.clone())],
        })
    };
    match value {
        Value::Null => leaf(Expr::Null),
        Value::Bool(b) => leaf(Expr::Bool(*b)),
        Value::Int(i) => leaf(Expr::Int(*i)),
        Value::UInt(u) => leaf(Expr::UInt(*u)),
        Value::Double(d) if d.is_finite() => leaf(Expr::Float(*d)),
        Value::String(s) => leaf(Expr::String(s.to_string())),
        Value::Bytes(b) => leaf(Expr::Bytes(b.to_vec())),
        Value::List(items) => {
            let items = items
                .iter()
                .map(|item| literal_expr(item, span))
                .collect::<Option<_>>()?;
            leaf(Expr::List(items))
        }
        Value::Map(map) => {
            let entries = map
                .iter()
                .map(|(key, value)| {
                    Some(MapEntry {
                        key: literal_expr(&key.to_value(), span)?,
                        value: literal_expr(value, span)?,
                    })
                })
                .collect::<Option<_>>()?;
            leaf(Expr::Map(entries))
        }
        Value::Timestamp(ts) => call("timestamp", format_timestamp(ts)),
        Value::Duration(d) => call("duration", format_duration(d)),
        Value::Type(t) => leaf(Expr::Ident(t.name.to_string())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cel_ast::ExprBuilder;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_known_conjunct_drops_out() {
        let b = ExprBuilder::new();
        // x(1) < 10(2) -> 3; y(4) == 0(5) -> 6; && -> 7
        let expr = b.and(b.lt(b.ident("x"), b.int(10)), b.eq(b.ident("y"), b.int(0)));
        let ast = Ast::new_unchecked(expr, "x < 10 && y == 0");

        let state = EvalState::new();
        state.set_value(1, Value::Int(3));
        state.set_value(2, Value::Int(10));
        state.set_value(3, Value::Bool(true));
        state.set_value(4, Value::unknown(4));
        state.set_value(5, Value::Int(0));
        state.set_value(6, Value::unknown(4));
        state.set_value(7, Value::unknown(4));

        let residual = residual_ast(&ast, &state);
        assert_eq!(residual.to_cel_string(), "y == 0");
        assert_eq!(residual.expr().id, 1);
        assert!(!residual.is_checked());
    }

    #[test]
    fn test_absorbing_conjunct_decides() {
        let b = ExprBuilder::new();
        let expr = b.or(b.ident("a"), b.ident("b"));
        let ast = Ast::new_unchecked(expr, "a || b");
        let state = EvalState::new();
        state.set_value(1, Value::unknown(1));
        state.set_value(2, Value::Bool(true));
        assert_eq!(residual_ast(&ast, &state).to_cel_string(), "true");
    }

    #[test]
    fn test_decided_conditional_keeps_branch() {
        let b = ExprBuilder::new();
        let expr = b.conditional(b.ident("c"), b.ident("u"), b.int(1));
        let ast = Ast::new_unchecked(expr, "c ? u : 1");
        let state = EvalState::new();
        state.set_value(1, Value::Bool(true));
        state.set_value(2, Value::unknown(2));
        assert_eq!(residual_ast(&ast, &state).to_cel_string(), "u");
    }

    #[test]
    fn test_time_values_become_constructor_calls() {
        let b = ExprBuilder::new();
        let expr = b.add(b.ident("d"), b.ident("u"));
        let ast = Ast::new_unchecked(expr, "d + u");
        let state = EvalState::new();
        state.set_value(1, Value::duration(90, 0));
        assert_eq!(
            residual_ast(&ast, &state).to_cel_string(),
            "duration(\"90s\") + u"
        );
    }

    #[test]
    fn test_untouched_ast_is_renumbered_copy() {
        let b = ExprBuilder::starting_at(40);
        let expr = b.select(b.ident("a"), "f");
        let ast = Ast::new_unchecked(expr, "a.f");
        let residual = residual_ast(&ast, &EvalState::new());
        assert_eq!(residual.to_cel_string(), "a.f");
        assert_eq!(residual.expr().ids(), vec![1, 2]);
    }
}
