//! The immutable `Ast` container handed to the interpreter.
//!
//! An `Ast` pairs an expression tree with its source text and, when it has
//! been through a checker, two maps keyed by node id: resolved references and
//! inferred types. An `Ast` counts as checked iff its type map is non-empty.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::expr::{ExprId, SpannedExpr};
use crate::types::CelType;
use crate::unparser::ast_to_string;

/// Structural problems detected when assembling an [`Ast`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AstError {
    /// Two nodes share the same id.
    #[error("duplicate expression id {0}")]
    DuplicateId(ExprId),
    /// A reference or type entry points at an id not present in the tree.
    #[error("{map} entry for unknown expression id {id}")]
    DanglingId { map: &'static str, id: ExprId },
}

/// A compile-time constant, as attached to enum references by a checker.
#[derive(Debug, Clone, PartialEq)]
pub enum CelValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
}

impl CelValue {
    pub fn cel_type(&self) -> CelType {
        match self {
            CelValue::Null => CelType::Null,
            CelValue::Bool(_) => CelType::Bool,
            CelValue::Int(_) => CelType::Int,
            CelValue::UInt(_) => CelType::UInt,
            CelValue::Double(_) => CelType::Double,
            CelValue::String(_) => CelType::String,
            CelValue::Bytes(_) => CelType::Bytes,
        }
    }
}

/// Reference information for a resolved identifier or function.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Reference {
    /// The fully qualified name.
    pub name: String,
    /// Matching overload IDs for function calls.
    pub overload_ids: Vec<String>,
    /// Constant value for enum constants.
    pub value: Option<CelValue>,
}

impl Reference {
    /// Create a new identifier reference.
    pub fn ident(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Create a new function reference with overload IDs.
    pub fn function(name: impl Into<String>, overload_ids: Vec<String>) -> Self {
        Self {
            name: name.into(),
            overload_ids,
            value: None,
        }
    }

    /// Create a reference to a named constant (enum value).
    pub fn constant(name: impl Into<String>, value: CelValue) -> Self {
        Self {
            name: name.into(),
            overload_ids: Vec::new(),
            value: Some(value),
        }
    }
}

/// Parsed, and optionally checked, CEL expression.
#[derive(Debug, Clone)]
pub struct Ast {
    expr: SpannedExpr,
    source: Arc<str>,
    reference_map: HashMap<ExprId, Reference>,
    type_map: HashMap<ExprId, CelType>,
}

impl Ast {
    /// Create an unchecked AST.
    pub fn new_unchecked(expr: SpannedExpr, source: impl Into<Arc<str>>) -> Self {
        Self {
            expr,
            source: source.into(),
            reference_map: HashMap::new(),
            type_map: HashMap::new(),
        }
    }

    /// Create a checked AST from checker output.
    pub fn new_checked(
        expr: SpannedExpr,
        source: impl Into<Arc<str>>,
        reference_map: HashMap<ExprId, Reference>,
        type_map: HashMap<ExprId, CelType>,
    ) -> Self {
        Self {
            expr,
            source: source.into(),
            reference_map,
            type_map,
        }
    }

    /// Returns true if this AST has been type-checked.
    pub fn is_checked(&self) -> bool {
        !self.type_map.is_empty()
    }

    pub fn expr(&self) -> &SpannedExpr {
        &self.expr
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn reference_map(&self) -> &HashMap<ExprId, Reference> {
        &self.reference_map
    }

    pub fn type_map(&self) -> &HashMap<ExprId, CelType> {
        &self.type_map
    }

    pub fn reference(&self, id: ExprId) -> Option<&Reference> {
        self.reference_map.get(&id)
    }

    pub fn type_of(&self, id: ExprId) -> Option<&CelType> {
        self.type_map.get(&id)
    }

    /// Get the result type of the expression (if checked).
    pub fn result_type(&self) -> Option<&CelType> {
        self.type_map.get(&self.expr.id)
    }

    /// Verifies node ids are unique and that both maps only mention ids in the tree.
    pub fn validate(&self) -> Result<(), AstError> {
        let mut seen = HashSet::new();
        for id in self.expr.ids() {
            if !seen.insert(id) {
                return Err(AstError::DuplicateId(id));
            }
        }
        if let Some(id) = self.reference_map.keys().find(|id| !seen.contains(id)) {
            return Err(AstError::DanglingId {
                map: "reference",
                id: *id,
            });
        }
        if let Some(id) = self.type_map.keys().find(|id| !seen.contains(id)) {
            return Err(AstError::DanglingId { map: "type", id: *id });
        }
        Ok(())
    }

    /// Convert the AST back to CEL source text.
    pub fn to_cel_string(&self) -> String {
        ast_to_string(&self.expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ExprBuilder;

    #[test]
    fn checked_iff_type_map_non_empty() {
        let b = ExprBuilder::new();
        let expr = b.ident("x");
        let id = expr.id;

        let unchecked = Ast::new_unchecked(expr.clone(), "x");
        assert!(!unchecked.is_checked());

        let refs_only = Ast::new_checked(
            expr.clone(),
            "x",
            HashMap::from([(id, Reference::ident("x"))]),
            HashMap::new(),
        );
        assert!(!refs_only.is_checked());

        let checked = Ast::new_checked(
            expr,
            "x",
            HashMap::new(),
            HashMap::from([(id, CelType::Int)]),
        );
        assert!(checked.is_checked());
        assert_eq!(checked.result_type(), Some(&CelType::Int));
    }

    #[test]
    fn validate_rejects_duplicate_ids() {
        let b = ExprBuilder::new();
        let mut left = b.int(1);
        let right = b.int(2);
        left.id = right.id;
        let sum = b.add(left, right);
        let ast = Ast::new_unchecked(sum, "1 + 2");
        assert!(matches!(ast.validate(), Err(AstError::DuplicateId(_))));
    }

    #[test]
    fn validate_rejects_dangling_type_entry() {
        let b = ExprBuilder::new();
        let expr = b.int(1);
        let ast = Ast::new_checked(
            expr,
            "1",
            HashMap::new(),
            HashMap::from([(99, CelType::Int)]),
        );
        assert_eq!(
            ast.validate(),
            Err(AstError::DanglingId { map: "type", id: 99 })
        );
    }
}
