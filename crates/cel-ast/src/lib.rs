//! Expression tree and AST container consumed by the CEL interpreter.
//!
//! This crate carries everything the evaluation engine needs from the
//! front end of a CEL toolchain:
//!
//! - **Expressions**: [`Expr`] nodes with per-node ids and spans.
//! - **Ast**: the immutable [`Ast`] pairing a tree with its source text and the
//!   optional reference/type maps a checker produces.
//! - **Types**: [`CelType`] as recorded in the type map.
//! - **Operators**: overload ids for every built-in operator.
//! - **Builder**: [`ExprBuilder`], an id-allocating constructor with the
//!   standard macro expansions.
//! - **Unparser**: [`ast_to_string`] renders a tree back to CEL source.

mod ast;
pub mod builder;
mod expr;
pub mod operators;
mod types;
pub mod unparser;

pub use ast::{Ast, AstError, CelValue, Reference};
pub use builder::{ExprBuilder, ACCU_VAR};
pub use expr::{
    BinaryOp, Expr, ExprId, MapEntry, Span, Spanned, SpannedExpr, StructField, UnaryOp,
};
pub use types::CelType;
pub use unparser::ast_to_string;
