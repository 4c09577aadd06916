//! Build-time problems, collected rather than raised one at a time.

use std::fmt;

use cel_ast::{ExprId, Span};

/// A single problem found while building a program.
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub message: String,
    /// The expression the issue is attached to, when there is one.
    pub expr_id: Option<ExprId>,
    pub span: Option<Span>,
}

impl Issue {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            expr_id: None,
            span: None,
        }
    }

    /// An issue located at an expression node.
    pub fn at(expr_id: ExprId, span: Span, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            expr_id: Some(expr_id),
            span: Some(span),
        }
    }

    pub fn with_expr_id(mut self, expr_id: ExprId) -> Self {
        self.expr_id = Some(expr_id);
        self
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.span, self.expr_id) {
            (Some(span), _) if !span.is_empty() => {
                write!(f, "{}..{}: {}", span.start, span.end, self.message)
            }
            (_, Some(id)) => write!(f, "expr {}: {}", id, self.message),
            _ => write!(f, "{}", self.message),
        }
    }
}

impl From<String> for Issue {
    fn from(message: String) -> Self {
        Issue::new(message)
    }
}

/// All issues found by one build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Issues(Vec<Issue>);

impl Issues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: Issue) {
        self.0.push(issue);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Issue> {
        self.0.iter()
    }

    /// `Ok(())` when nothing was collected.
    pub fn into_result(self) -> Result<(), Issues> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<Issue> for Issues {
    fn from(issue: Issue) -> Self {
        Issues(vec![issue])
    }
}

impl FromIterator<Issue> for Issues {
    fn from_iter<I: IntoIterator<Item = Issue>>(iter: I) -> Self {
        Issues(iter.into_iter().collect())
    }
}

impl fmt::Display for Issues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, issue) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", issue)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefers_span() {
        let issue = Issue::at(4, 2..7, "undeclared reference to 'f'");
        assert_eq!(issue.to_string(), "2..7: undeclared reference to 'f'");
        let issue = Issue::at(4, 0..0, "bad");
        assert_eq!(issue.to_string(), "expr 4: bad");
    }

    #[test]
    fn test_into_result() {
        assert!(Issues::new().into_result().is_ok());
        let issues: Issues = [Issue::new("a"), Issue::new("b")].into_iter().collect();
        assert_eq!(issues.to_string(), "a\nb");
        assert_eq!(issues.into_result().unwrap_err().len(), 2);
    }
}
