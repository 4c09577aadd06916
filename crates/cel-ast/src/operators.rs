//! Operator function names and their mapping to AST operators.
//!
//! These are the overload ids the dispatcher is keyed by and the names a
//! checker records in the reference map.

use crate::expr::{BinaryOp, UnaryOp};

pub const ADD: &str = "_+_";
pub const SUBTRACT: &str = "_-_";
pub const MULTIPLY: &str = "_*_";
pub const DIVIDE: &str = "_/_";
pub const MODULO: &str = "_%_";
pub const NEGATE: &str = "-_";
pub const LOGICAL_NOT: &str = "!_";
pub const EQUALS: &str = "_==_";
pub const NOT_EQUALS: &str = "_!=_";
pub const LESS: &str = "_<_";
pub const LESS_EQUALS: &str = "_<=_";
pub const GREATER: &str = "_>_";
pub const GREATER_EQUALS: &str = "_>=_";
pub const LOGICAL_AND: &str = "_&&_";
pub const LOGICAL_OR: &str = "_||_";
pub const CONDITIONAL: &str = "_?_:_";
pub const INDEX: &str = "_[_]";
pub const IN: &str = "@in";
/// Comprehension loop guard: only a literal `false` stops iteration.
pub const NOT_STRICTLY_FALSE: &str = "@not_strictly_false";

/// Convert a unary operator to its function name.
pub fn unary_op_to_function(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Neg => NEGATE,
        UnaryOp::Not => LOGICAL_NOT,
    }
}

/// Convert a binary operator to its function name.
pub fn binary_op_to_function(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => ADD,
        BinaryOp::Sub => SUBTRACT,
        BinaryOp::Mul => MULTIPLY,
        BinaryOp::Div => DIVIDE,
        BinaryOp::Mod => MODULO,
        BinaryOp::Eq => EQUALS,
        BinaryOp::Ne => NOT_EQUALS,
        BinaryOp::Lt => LESS,
        BinaryOp::Le => LESS_EQUALS,
        BinaryOp::Gt => GREATER,
        BinaryOp::Ge => GREATER_EQUALS,
        BinaryOp::In => IN,
        BinaryOp::And => LOGICAL_AND,
        BinaryOp::Or => LOGICAL_OR,
    }
}

/// Try to convert a function name to a binary operator.
pub fn function_to_binary_op(function: &str) -> Option<BinaryOp> {
    let op = match function {
        ADD => BinaryOp::Add,
        SUBTRACT => BinaryOp::Sub,
        MULTIPLY => BinaryOp::Mul,
        DIVIDE => BinaryOp::Div,
        MODULO => BinaryOp::Mod,
        EQUALS => BinaryOp::Eq,
        NOT_EQUALS => BinaryOp::Ne,
        LESS => BinaryOp::Lt,
        LESS_EQUALS => BinaryOp::Le,
        GREATER => BinaryOp::Gt,
        GREATER_EQUALS => BinaryOp::Ge,
        IN => BinaryOp::In,
        LOGICAL_AND => BinaryOp::And,
        LOGICAL_OR => BinaryOp::Or,
        _ => return None,
    };
    Some(op)
}

/// Binding strength of a binary operator (higher binds tighter).
pub fn precedence(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Or => 1,
        BinaryOp::And => 2,
        BinaryOp::Eq
        | BinaryOp::Ne
        | BinaryOp::Lt
        | BinaryOp::Le
        | BinaryOp::Gt
        | BinaryOp::Ge
        | BinaryOp::In => 3,
        BinaryOp::Add | BinaryOp::Sub => 4,
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 5,
    }
}

/// Source symbol of a binary operator.
pub fn binary_symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::Eq => "==",
        BinaryOp::Ne => "!=",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
        BinaryOp::In => "in",
        BinaryOp::And => "&&",
        BinaryOp::Or => "||",
    }
}

/// Source symbol of a unary operator.
pub fn unary_symbol(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Neg => "-",
        UnaryOp::Not => "!",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_names_round_trip() {
        for op in [
            BinaryOp::Add,
            BinaryOp::Mod,
            BinaryOp::Ge,
            BinaryOp::In,
            BinaryOp::Or,
        ] {
            assert_eq!(function_to_binary_op(binary_op_to_function(op)), Some(op));
        }
        assert_eq!(function_to_binary_op(NEGATE), None);
    }

    #[test]
    fn negation_is_distinct_from_subtraction() {
        assert_ne!(unary_op_to_function(UnaryOp::Neg), SUBTRACT);
    }
}
