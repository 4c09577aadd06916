//! The evaluation engine: attribute resolution, overload dispatch and the
//! compiled node tree, plus the build-time decorators and the residual
//! reconstruction used by partial evaluation.

mod attributes;
mod coster;
pub mod decorators;
mod dispatcher;
mod interpretable;
mod patterns;
pub(crate) mod planner;
mod prune;
mod state;

pub use attributes::{AbsoluteAttribute, Attribute, AttributeFactory, Qualifier, QualifierKind};
pub use coster::{estimate_cost, Cost};
pub use decorators::Decorator;
pub use dispatcher::{
    dispatch_among, no_such_overload, BinaryOp, DispatchError, Dispatcher, FunctionOp,
    Implementation, Overload, UnaryOp,
};
pub use interpretable::{ConstNode, Interpretable, NodeKind};
pub use patterns::{AttributePattern, QualifierPattern};
pub use prune::residual_ast;
pub use state::EvalState;
