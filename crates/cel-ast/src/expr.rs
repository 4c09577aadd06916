//! CEL expression tree definitions.

/// Source span for diagnostics. Uses byte offsets into the source string.
pub type Span = std::ops::Range<usize>;

/// Per-node identifier. Unique within one [`crate::Ast`].
pub type ExprId = i64;

/// AST node with source location and unique ID.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    /// Unique identifier for this node (1-indexed)
    pub id: ExprId,
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(id: ExprId, node: T, span: Span) -> Self {
        Self { id, node, span }
    }
}

/// A spanned expression.
pub type SpannedExpr = Spanned<Expr>;

/// A map literal entry.
#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    pub key: SpannedExpr,
    pub value: SpannedExpr,
}

/// A struct literal field initializer.
#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    pub name: String,
    pub value: SpannedExpr,
}

/// CEL expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    // Literals
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),

    // Identifiers
    Ident(String),
    /// Root-scoped identifier (`.name`), never resolved against the container
    RootIdent(String),

    // Collections
    List(Vec<SpannedExpr>),
    Map(Vec<MapEntry>),

    // Operations
    Unary {
        op: UnaryOp,
        expr: Box<SpannedExpr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<SpannedExpr>,
        right: Box<SpannedExpr>,
    },
    Ternary {
        cond: Box<SpannedExpr>,
        then_expr: Box<SpannedExpr>,
        else_expr: Box<SpannedExpr>,
    },

    // Access
    Member {
        expr: Box<SpannedExpr>,
        field: String,
    },
    Index {
        expr: Box<SpannedExpr>,
        index: Box<SpannedExpr>,
    },
    /// Function call. `expr` is an `Ident`/`RootIdent` for global functions and a
    /// `Member` for receiver-style calls (`target.fn(args)`), which may also be a
    /// namespaced global function such as `math.greatest(args)`.
    Call {
        expr: Box<SpannedExpr>,
        args: Vec<SpannedExpr>,
    },
    /// Struct/message literal: `TypeName{field: value, ...}`
    Struct {
        type_name: String,
        fields: Vec<StructField>,
    },

    /// Comprehension expression (result of macro expansion).
    ///
    /// Semantics:
    /// ```text
    /// let accu_var = accu_init
    /// for (let iter_var in iter_range) {
    ///    if (!loop_condition) { break }
    ///    accu_var = loop_step
    /// }
    /// return result
    /// ```
    Comprehension {
        iter_var: String,
        iter_range: Box<SpannedExpr>,
        accu_var: String,
        accu_init: Box<SpannedExpr>,
        loop_condition: Box<SpannedExpr>,
        loop_step: Box<SpannedExpr>,
        result: Box<SpannedExpr>,
    },

    /// Presence test (result of the `has(m.x)` macro).
    MemberTestOnly {
        expr: Box<SpannedExpr>,
        field: String,
    },
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Arithmetic negation (`-`)
    Neg,
    /// Logical negation (`!`)
    Not,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    // Membership
    In,

    // Logical
    And,
    Or,
}

impl Expr {
    /// Returns true for literal nodes.
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Expr::Null
                | Expr::Bool(_)
                | Expr::Int(_)
                | Expr::UInt(_)
                | Expr::Float(_)
                | Expr::String(_)
                | Expr::Bytes(_)
        )
    }

    /// Direct children in evaluation order.
    pub fn children(&self) -> Vec<&SpannedExpr> {
        match self {
            Expr::Null
            | Expr::Bool(_)
            | Expr::Int(_)
            | Expr::UInt(_)
            | Expr::Float(_)
            | Expr::String(_)
            | Expr::Bytes(_)
            | Expr::Ident(_)
            | Expr::RootIdent(_) => Vec::new(),
            Expr::List(elems) => elems.iter().collect(),
            Expr::Map(entries) => entries.iter().flat_map(|e| [&e.key, &e.value]).collect(),
            Expr::Unary { expr, .. } => vec![expr],
            Expr::Binary { left, right, .. } => vec![left, right],
            Expr::Ternary {
                cond,
                then_expr,
                else_expr,
            } => vec![cond, then_expr, else_expr],
            Expr::Member { expr, .. } | Expr::MemberTestOnly { expr, .. } => vec![expr],
            Expr::Index { expr, index } => vec![expr, index],
            Expr::Call { expr, args } => {
                let mut out = Vec::with_capacity(args.len() + 1);
                if let Expr::Member { expr: target, .. } = &expr.node {
                    out.push(target.as_ref());
                }
                out.extend(args.iter());
                out
            }
            Expr::Struct { fields, .. } => fields.iter().map(|f| &f.value).collect(),
            Expr::Comprehension {
                iter_range,
                accu_init,
                loop_condition,
                loop_step,
                result,
                ..
            } => vec![iter_range, accu_init, loop_condition, loop_step, result],
        }
    }

    /// Renders a select chain of plain identifiers (`a.b.c`) as a dotted name.
    ///
    /// Returns `None` when any link is not an identifier or field selection.
    pub fn qualified_name(&self) -> Option<String> {
        match self {
            Expr::Ident(name) => Some(name.clone()),
            Expr::RootIdent(name) => Some(format!(".{}", name)),
            Expr::Member { expr, field } => {
                expr.node.qualified_name().map(|q| format!("{}.{}", q, field))
            }
            _ => None,
        }
    }
}

impl SpannedExpr {
    /// Largest node id in this subtree.
    pub fn max_id(&self) -> ExprId {
        self.ids().into_iter().fold(self.id, ExprId::max)
    }

    /// Collects every node id in this subtree, parents before children.
    pub fn ids(&self) -> Vec<ExprId> {
        let mut out = Vec::new();
        self.collect_ids(&mut out);
        out
    }

    fn collect_ids(&self, out: &mut Vec<ExprId>) {
        out.push(self.id);
        // A call's callee node carries its own id even though it is not a child.
        if let Expr::Call { expr, .. } = &self.node {
            out.push(expr.id);
        }
        for child in self.node.children() {
            child.collect_ids(out);
        }
    }

    /// Returns a copy of this subtree with ids reassigned in pre-order, starting at `next`.
    pub fn renumbered(&self, next: &mut ExprId) -> SpannedExpr {
        let id = *next;
        *next += 1;
        let node = match &self.node {
            Expr::List(elems) => Expr::List(elems.iter().map(|e| e.renumbered(next)).collect()),
            Expr::Map(entries) => Expr::Map(
                entries
                    .iter()
                    .map(|e| MapEntry {
                        key: e.key.renumbered(next),
                        value: e.value.renumbered(next),
                    })
                    .collect(),
            ),
            Expr::Unary { op, expr } => Expr::Unary {
                op: *op,
                expr: Box::new(expr.renumbered(next)),
            },
            Expr::Binary { op, left, right } => Expr::Binary {
                op: *op,
                left: Box::new(left.renumbered(next)),
                right: Box::new(right.renumbered(next)),
            },
            Expr::Ternary {
                cond,
                then_expr,
                else_expr,
            } => Expr::Ternary {
                cond: Box::new(cond.renumbered(next)),
                then_expr: Box::new(then_expr.renumbered(next)),
                else_expr: Box::new(else_expr.renumbered(next)),
            },
            Expr::Member { expr, field } => Expr::Member {
                expr: Box::new(expr.renumbered(next)),
                field: field.clone(),
            },
            Expr::MemberTestOnly { expr, field } => Expr::MemberTestOnly {
                expr: Box::new(expr.renumbered(next)),
                field: field.clone(),
            },
            Expr::Index { expr, index } => Expr::Index {
                expr: Box::new(expr.renumbered(next)),
                index: Box::new(index.renumbered(next)),
            },
            Expr::Call { expr, args } => Expr::Call {
                expr: Box::new(expr.renumbered(next)),
                args: args.iter().map(|a| a.renumbered(next)).collect(),
            },
            Expr::Struct { type_name, fields } => Expr::Struct {
                type_name: type_name.clone(),
                fields: fields
                    .iter()
                    .map(|f| StructField {
                        name: f.name.clone(),
                        value: f.value.renumbered(next),
                    })
                    .collect(),
            },
            Expr::Comprehension {
                iter_var,
                iter_range,
                accu_var,
                accu_init,
                loop_condition,
                loop_step,
                result,
            } => Expr::Comprehension {
                iter_var: iter_var.clone(),
                iter_range: Box::new(iter_range.renumbered(next)),
                accu_var: accu_var.clone(),
                accu_init: Box::new(accu_init.renumbered(next)),
                loop_condition: Box::new(loop_condition.renumbered(next)),
                loop_step: Box::new(loop_step.renumbered(next)),
                result: Box::new(result.renumbered(next)),
            },
            leaf => leaf.clone(),
        };
        Spanned::new(id, node, self.span.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(id: ExprId, node: Expr) -> SpannedExpr {
        Spanned::new(id, node, 0..0)
    }

    #[test]
    fn test_qualified_name() {
        let chain = Expr::Member {
            expr: Box::new(leaf(
                2,
                Expr::Member {
                    expr: Box::new(leaf(1, Expr::Ident("a".into()))),
                    field: "b".into(),
                },
            )),
            field: "c".into(),
        };
        assert_eq!(chain.qualified_name().as_deref(), Some("a.b.c"));

        let indexed = Expr::Index {
            expr: Box::new(leaf(1, Expr::Ident("a".into()))),
            index: Box::new(leaf(2, Expr::Int(0))),
        };
        assert_eq!(indexed.qualified_name(), None);
    }

    #[test]
    fn test_call_ids_include_callee() {
        let call = leaf(
            3,
            Expr::Call {
                expr: Box::new(leaf(
                    2,
                    Expr::Member {
                        expr: Box::new(leaf(1, Expr::Ident("s".into()))),
                        field: "size".into(),
                    },
                )),
                args: vec![],
            },
        );
        let mut ids = call.ids();
        ids.sort();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(call.max_id(), 3);
    }

    #[test]
    fn test_renumbered_is_preorder() {
        let expr = leaf(
            10,
            Expr::Binary {
                op: BinaryOp::Add,
                left: Box::new(leaf(7, Expr::Int(1))),
                right: Box::new(leaf(9, Expr::Ident("x".into()))),
            },
        );
        let mut next = 1;
        let renumbered = expr.renumbered(&mut next);
        assert_eq!(renumbered.id, 1);
        assert_eq!(next, 4);
        let Expr::Binary { left, right, .. } = &renumbered.node else {
            panic!("expected binary");
        };
        assert_eq!((left.id, right.id), (2, 3));
    }
}
