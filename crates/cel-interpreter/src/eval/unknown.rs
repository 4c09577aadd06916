//! Unknown values for partial evaluation.

use std::collections::BTreeSet;
use std::fmt;

use cel_ast::ExprId;

/// The set of expression ids whose values were unavailable.
///
/// An unknown flows through an expression like any other value; operators
/// that see two unknowns combine their id sets.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UnknownSet {
    ids: BTreeSet<ExprId>,
}

impl UnknownSet {
    /// An unknown originating at a single expression.
    pub fn new(id: ExprId) -> Self {
        Self {
            ids: BTreeSet::from([id]),
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = ExprId> + '_ {
        self.ids.iter().copied()
    }

    pub fn contains(&self, id: ExprId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Union of both id sets.
    pub fn merge(&self, other: &UnknownSet) -> UnknownSet {
        UnknownSet {
            ids: self.ids.union(&other.ids).copied().collect(),
        }
    }
}

impl fmt::Display for UnknownSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self.ids.iter().map(ToString::to_string).collect();
        write!(f, "unknown{{{}}}", ids.join(", "))
    }
}
