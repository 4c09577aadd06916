//! Evaluation error types.
//!
//! An `EvalError` is data, not control flow: it travels inside
//! [`Value::Error`](super::Value::Error) until the program boundary.

/// An error that occurred during CEL evaluation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct EvalError {
    /// The error message.
    pub message: String,
    /// The kind of error.
    pub kind: EvalErrorKind,
}

/// The kind of evaluation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalErrorKind {
    /// Division by zero.
    DivisionByZero,
    /// Modulo by zero.
    ModuloByZero,
    /// Integer overflow or a timestamp/duration outside its valid range.
    Overflow,
    /// Unbound identifier (no candidate name resolved).
    UnknownIdentifier,
    /// Index out of bounds.
    IndexOutOfBounds,
    /// Key not found in map.
    NoSuchKey,
    /// Field not found on a map or object.
    NoSuchField,
    /// Invalid argument.
    InvalidArgument,
    /// No overload accepts the operand types.
    NoSuchOverload,
    /// Invalid type conversion.
    InvalidConversion,
    /// Internal error (unexpected state).
    Internal,
}

impl EvalError {
    pub fn new(kind: EvalErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    pub fn division_by_zero() -> Self {
        Self::new(EvalErrorKind::DivisionByZero, "division by zero")
    }

    pub fn modulo_by_zero() -> Self {
        Self::new(EvalErrorKind::ModuloByZero, "modulus by zero")
    }

    pub fn overflow(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::Overflow, message)
    }

    pub fn unknown_identifier(name: &str) -> Self {
        Self::new(
            EvalErrorKind::UnknownIdentifier,
            format!("no such attribute: {}", name),
        )
    }

    pub fn index_out_of_bounds(index: i64, len: usize) -> Self {
        Self::new(
            EvalErrorKind::IndexOutOfBounds,
            format!("index out of range: {} (size {})", index, len),
        )
    }

    pub fn no_such_key(key: impl std::fmt::Display) -> Self {
        Self::new(EvalErrorKind::NoSuchKey, format!("no such key: {}", key))
    }

    pub fn no_such_field(field: &str) -> Self {
        Self::new(EvalErrorKind::NoSuchField, format!("no such field: {}", field))
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::InvalidArgument, message)
    }

    /// No overload of `function` accepts operands of the given type names.
    pub fn no_such_overload(function: &str, operand_types: &[&str]) -> Self {
        Self::new(
            EvalErrorKind::NoSuchOverload,
            format!("no such overload: {}({})", function, operand_types.join(", ")),
        )
    }

    pub fn invalid_conversion(from: &str, to: &str) -> Self {
        Self::new(
            EvalErrorKind::InvalidConversion,
            format!("type conversion error from '{}' to '{}'", from, to),
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::Internal, message)
    }

    /// True for the error a missing root variable produces.
    pub fn is_missing_attribute(&self) -> bool {
        self.kind == EvalErrorKind::UnknownIdentifier
    }
}

impl From<&str> for EvalError {
    fn from(s: &str) -> Self {
        Self::new(EvalErrorKind::Internal, s)
    }
}

impl From<String> for EvalError {
    fn from(s: String) -> Self {
        Self::new(EvalErrorKind::Internal, s)
    }
}
