//! Static, data-independent cost estimation.
//!
//! A cost is an interval of abstract work units: constants are free, every
//! attribute lookup and call costs one unit plus its operands, and logical
//! operators and conditionals span the cheapest to the most expensive path.

use std::fmt;

use super::Interpretable;

/// A `[min, max]` interval of evaluation cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cost {
    pub min: i64,
    pub max: i64,
}

impl Cost {
    pub const ZERO: Cost = Cost { min: 0, max: 0 };

    /// Reported when a node cannot bound its own cost.
    pub const UNKNOWN: Cost = Cost {
        min: 0,
        max: i64::MAX,
    };

    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    pub fn fixed(cost: i64) -> Self {
        Self::new(cost, cost)
    }

    pub fn is_unknown(&self) -> bool {
        *self == Cost::UNKNOWN
    }

    /// Both bounds plus `units`.
    pub fn plus(self, units: i64) -> Self {
        Self::new(self.min.saturating_add(units), self.max.saturating_add(units))
    }

    pub fn add(self, other: Cost) -> Self {
        Self::new(
            self.min.saturating_add(other.min),
            self.max.saturating_add(other.max),
        )
    }

    pub fn sum(costs: impl IntoIterator<Item = Cost>) -> Self {
        costs.into_iter().fold(Cost::ZERO, Cost::add)
    }

    /// Combined cost of a set of nodes.
    pub fn of_all<'a>(nodes: impl IntoIterator<Item = &'a dyn Interpretable>) -> Self {
        Self::sum(nodes.into_iter().map(|n| n.cost()))
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// Estimated cost of evaluating `node`, without evaluating it.
pub fn estimate_cost(node: &dyn Interpretable) -> Cost {
    node.cost()
}
