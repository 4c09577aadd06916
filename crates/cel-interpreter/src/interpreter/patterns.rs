//! Unknown attribute patterns for partial evaluation.
//!
//! A pattern names a variable and an optional chain of qualifiers, each
//! either a concrete key or a wildcard. An attribute matches when its
//! variable matches and its qualifiers agree with the pattern's for as far
//! as both chains go, so the pattern `a.b` marks `a.b`, `a.b.c` and
//! `a.b[0]` unknown while `a.c` stays resolvable.

use std::fmt;

use crate::eval::Value;

/// One step of an [`AttributePattern`].
#[derive(Debug, Clone, PartialEq)]
pub enum QualifierPattern {
    /// Matches any qualifier.
    Wildcard,
    /// Matches a field name or index key equal to this value.
    Value(Value),
}

impl QualifierPattern {
    pub fn matches(&self, key: &Value) -> bool {
        match self {
            QualifierPattern::Wildcard => true,
            QualifierPattern::Value(expected) => {
                matches!(expected.equal(key), Value::Bool(true))
            }
        }
    }
}

/// A variable plus qualifier chain whose value is declared unknown.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributePattern {
    variable: String,
    qualifiers: Vec<QualifierPattern>,
}

impl AttributePattern {
    /// A pattern for the fully qualified variable `variable`.
    pub fn new(variable: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            qualifiers: Vec::new(),
        }
    }

    pub fn qualify_string(self, field: &str) -> Self {
        self.qualify(QualifierPattern::Value(Value::string(field)))
    }

    pub fn qualify_int(self, index: i64) -> Self {
        self.qualify(QualifierPattern::Value(Value::Int(index)))
    }

    pub fn qualify_uint(self, index: u64) -> Self {
        self.qualify(QualifierPattern::Value(Value::UInt(index)))
    }

    pub fn qualify_bool(self, key: bool) -> Self {
        self.qualify(QualifierPattern::Value(Value::Bool(key)))
    }

    pub fn wildcard(self) -> Self {
        self.qualify(QualifierPattern::Wildcard)
    }

    fn qualify(mut self, qualifier: QualifierPattern) -> Self {
        self.qualifiers.push(qualifier);
        self
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn qualifiers(&self) -> &[QualifierPattern] {
        &self.qualifiers
    }

    pub fn matches_variable(&self, name: &str) -> bool {
        self.variable == name
    }
}

impl fmt::Display for AttributePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.variable)?;
        for qualifier in &self.qualifiers {
            match qualifier {
                QualifierPattern::Wildcard => write!(f, ".*")?,
                QualifierPattern::Value(Value::String(s)) => write!(f, ".{}", s)?,
                QualifierPattern::Value(v) => write!(f, "[{}]", v)?,
            }
        }
        Ok(())
    }
}
