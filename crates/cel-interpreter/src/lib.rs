//! CEL-Interpreter: evaluation engine for the Common Expression Language
//!
//! This crate turns an [`Ast`](cel_ast::Ast), checked or not, into a
//! [`Program`] and evaluates it against host-supplied bindings.
//!
//! # Quick Start
//!
//! ```
//! use cel_ast::{Ast, ExprBuilder};
//! use cel_interpreter::{Env, EvalOptions, MapActivation, ProgramOptions, Value};
//!
//! // size(name) > 3
//! let b = ExprBuilder::new();
//! let expr = b.gt(b.call("size", vec![b.ident("name")]), b.int(3));
//! let ast = Ast::new_unchecked(expr, "size(name) > 3");
//!
//! let options = ProgramOptions::new().with_eval_options(EvalOptions::OPTIMIZE);
//! let program = Env::with_standard_library().program_with(ast, options).unwrap();
//!
//! let activation = MapActivation::new().with("name", "cel-rs");
//! let (value, _) = program.eval(&activation).unwrap();
//! assert_eq!(value, Value::Bool(true));
//! ```
//!
//! # Architecture
//!
//! - **Values**: [`Value`] and the capability [`Traits`] each kind advertises
//! - **Dispatcher**: overloads selected by arity and operand trait
//! - **Attributes**: variable references resolved through the container,
//!   with unknown patterns for partial evaluation
//! - **Interpretables**: the planned node tree, plus build-time decorators
//!   for constant folding, exhaustive evaluation and state tracking
//! - **Programs**: plain programs share one tree; state-tracking programs
//!   plan a fresh tree per call
//!
//! # Modules
//!
//! - `eval`: values, errors, activations and type providers
//! - `interpreter`: attributes, dispatch, nodes, decorators, residuals
//! - `stdlib`: the standard overload table

mod container;
mod env;
mod issues;
mod program;

pub mod eval;
pub mod interpreter;
pub mod stdlib;

pub use container::{Abbreviations, Container, ContainerError};
pub use env::Env;
pub use issues::{Issue, Issues};
pub use program::{EvalDetails, EvalOptions, Program, ProgramError, ProgramOptions};

// Re-export from eval module
pub use eval::{
    Activation, EmptyActivation, EvalError, EvalErrorKind, HierarchicalActivation, MapActivation,
    PartialActivation, Traits, TypeProvider, TypeRegistry, Value,
};

// Re-export from interpreter module
pub use interpreter::{
    estimate_cost, residual_ast, AttributePattern, Cost, Decorator, EvalState, Overload,
};
