//! Built programs and their evaluation entry points.
//!
//! A [`Program`] is immutable and can be shared across threads. Programs
//! without state tracking hold one planned tree. Programs that track state
//! keep the planning inputs instead and plan a fresh tree, observing into a
//! fresh [`EvalState`], on every call.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use cel_ast::Ast;

use crate::eval::{Activation, EvalError, HierarchicalActivation, MapActivation, Value};
use crate::interpreter::decorators::{self, Decorator};
use crate::interpreter::planner::Planner;
use crate::interpreter::{self, AttributeFactory, Cost, Dispatcher, EvalState, Interpretable};
use crate::issues::{Issue, Issues};

bitflags::bitflags! {
    /// Evaluation options, combined with `|`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EvalOptions: u32 {
        /// Record the value of every evaluated expression.
        const TRACK_STATE = 0b0001;
        /// Evaluate every branch of logical operators and conditionals.
        /// Implies `TRACK_STATE`.
        const EXHAUSTIVE_EVAL = 0b0011;
        /// Fold constant sub-expressions at build time.
        const OPTIMIZE = 0b0100;
        /// Honor the unknown attribute patterns of the activation.
        const PARTIAL_EVAL = 0b1000;
    }
}

impl Default for EvalOptions {
    fn default() -> Self {
        EvalOptions::empty()
    }
}

/// Options applied when building a [`Program`].
#[derive(Clone, Default)]
pub struct ProgramOptions {
    eval_options: EvalOptions,
    globals: Option<Arc<dyn Activation>>,
    decorators: Vec<Decorator>,
}

impl ProgramOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_eval_options(mut self, options: EvalOptions) -> Self {
        self.eval_options |= options;
        self
    }

    /// Bindings visible to every evaluation. Per-call bindings shadow them.
    pub fn with_globals(mut self, globals: impl Activation + 'static) -> Self {
        self.globals = Some(Arc::new(globals));
        self
    }

    /// A host decorator, applied before the built-in ones.
    pub fn with_decorator(mut self, decorator: Decorator) -> Self {
        self.decorators.push(decorator);
        self
    }

    pub fn eval_options(&self) -> EvalOptions {
        self.eval_options
    }
}

impl fmt::Debug for ProgramOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgramOptions")
            .field("eval_options", &self.eval_options)
            .field("globals", &self.globals.is_some())
            .field("decorators", &self.decorators.len())
            .finish()
    }
}

/// What a single evaluation left behind.
#[derive(Debug, Clone, Default)]
pub struct EvalDetails {
    state: Arc<EvalState>,
}

impl EvalDetails {
    /// Values recorded during the run. Empty unless the program tracks state.
    pub fn state(&self) -> &EvalState {
        &self.state
    }
}

/// Errors returned when building or running a program.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProgramError {
    /// Problems found while building the program.
    #[error("{0}")]
    Issues(Issues),

    /// The expression evaluated to an error.
    #[error("evaluation failed: {error}")]
    Evaluation {
        error: EvalError,
        details: EvalDetails,
    },

    /// A native function implementation panicked.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl From<Issues> for ProgramError {
    fn from(issues: Issues) -> Self {
        ProgramError::Issues(issues)
    }
}

impl From<Issue> for ProgramError {
    fn from(issue: Issue) -> Self {
        ProgramError::Issues(issue.into())
    }
}

/// Planning inputs retained by state-tracking programs.
struct ProgGen {
    dispatcher: Arc<Dispatcher>,
    factory: AttributeFactory,
    decorators: Vec<Decorator>,
}

impl ProgGen {
    /// Plans a tree that records into `state`.
    fn generate(
        &self,
        ast: &Ast,
        state: Arc<EvalState>,
    ) -> Result<Box<dyn Interpretable>, Issue> {
        let mut decorators = self.decorators.clone();
        decorators.push(decorators::observe(state));
        Planner::new(ast, &self.dispatcher, &self.factory, &decorators).plan()
    }
}

enum Plan {
    Shared(Box<dyn Interpretable>),
    PerCall(ProgGen),
}

/// A compiled CEL expression, ready for evaluation.
///
/// Programs are immutable; `eval` can be called concurrently from many
/// threads, each call supplying its own activation.
pub struct Program {
    ast: Arc<Ast>,
    options: EvalOptions,
    globals: Option<Arc<dyn Activation>>,
    plan: Plan,
}

impl Program {
    pub(crate) fn build(
        ast: Ast,
        dispatcher: Arc<Dispatcher>,
        factory: AttributeFactory,
        options: ProgramOptions,
    ) -> Result<Self, ProgramError> {
        let ProgramOptions {
            eval_options,
            globals,
            mut decorators,
        } = options;

        if eval_options.contains(EvalOptions::OPTIMIZE) {
            decorators.push(decorators::optimize());
        }
        if eval_options.contains(EvalOptions::EXHAUSTIVE_EVAL) {
            decorators.push(decorators::exhaustive_eval());
        }

        let plan = if eval_options.intersects(EvalOptions::TRACK_STATE) {
            let generator = ProgGen {
                dispatcher,
                factory,
                decorators,
            };
            generator.generate(&ast, Arc::new(EvalState::new()))?;
            tracing::debug!(options = ?eval_options, "per-call planning verified");
            Plan::PerCall(generator)
        } else {
            Plan::Shared(Planner::new(&ast, &dispatcher, &factory, &decorators).plan()?)
        };

        Ok(Self {
            ast: Arc::new(ast),
            options: eval_options,
            globals,
            plan,
        })
    }

    /// Evaluates against `activation`.
    ///
    /// An error value is returned as [`ProgramError::Evaluation`]; an unknown
    /// value is a successful result. A panic inside a native function is
    /// caught and returned as [`ProgramError::Internal`].
    pub fn eval(&self, activation: &dyn Activation) -> Result<(Value, EvalDetails), ProgramError> {
        let layered;
        let activation: &dyn Activation = match &self.globals {
            Some(globals) => {
                layered = HierarchicalActivation::new(globals.as_ref(), activation);
                &layered
            }
            None => activation,
        };

        let state = Arc::new(EvalState::new());
        let generated;
        let root: &dyn Interpretable = match &self.plan {
            Plan::Shared(root) => root.as_ref(),
            Plan::PerCall(generator) => {
                generated = generator.generate(&self.ast, state.clone())?;
                generated.as_ref()
            }
        };

        let value = panic::catch_unwind(AssertUnwindSafe(|| root.eval(activation))).map_err(
            |payload| {
                let message = panic_message(payload.as_ref());
                tracing::warn!(%message, "native function panicked during evaluation");
                ProgramError::Internal { message }
            },
        )?;

        let details = EvalDetails { state };
        match value.as_error() {
            Some(error) => Err(ProgramError::Evaluation {
                error: error.clone(),
                details,
            }),
            None => Ok((value, details)),
        }
    }

    /// Evaluates with bindings given as `(name, value)` pairs.
    pub fn eval_bindings<K, V>(
        &self,
        bindings: impl IntoIterator<Item = (K, V)>,
    ) -> Result<(Value, EvalDetails), ProgramError>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let activation: MapActivation = bindings.into_iter().collect();
        self.eval(&activation)
    }

    /// Static `[min, max]` cost of one evaluation.
    pub fn estimate_cost(&self) -> Cost {
        match &self.plan {
            Plan::Shared(root) => interpreter::estimate_cost(root.as_ref()),
            Plan::PerCall(generator) => generator
                .generate(&self.ast, Arc::new(EvalState::new()))
                .map(|root| interpreter::estimate_cost(root.as_ref()))
                .unwrap_or(Cost::UNKNOWN),
        }
    }

    /// The part of this program's expression that `details` could not
    /// evaluate.
    ///
    /// Meaningful only for programs built with `TRACK_STATE` (usually
    /// together with `PARTIAL_EVAL`); otherwise the state is empty and the
    /// residual is a renumbered copy of the whole expression.
    pub fn residual_ast(&self, details: &EvalDetails) -> Ast {
        interpreter::residual_ast(&self.ast, details.state())
    }

    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    pub fn options(&self) -> EvalOptions {
        self.options
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plan = match &self.plan {
            Plan::Shared(_) => "shared",
            Plan::PerCall(_) => "per-call",
        };
        f.debug_struct("Program")
            .field("ast", &self.ast)
            .field("options", &self.options)
            .field("plan", &plan)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{EvalErrorKind, TypeRegistry};
    use crate::interpreter::Overload;
    use crate::stdlib::standard_overloads;
    use crate::Container;
    use cel_ast::ExprBuilder;

    fn build(ast: Ast, options: ProgramOptions) -> Result<Program, ProgramError> {
        let mut dispatcher = Dispatcher::new();
        dispatcher.add_all(standard_overloads()).unwrap();
        dispatcher
            .add(Overload::unary("boom", "boom", |_| panic!("native failure")))
            .unwrap();
        let factory = AttributeFactory::new(Container::root(), Arc::new(TypeRegistry::new()));
        Program::build(ast, Arc::new(dispatcher), factory, options)
    }

    #[test]
    fn test_eval_with_globals() {
        let b = ExprBuilder::new();
        let ast = Ast::new_unchecked(b.add(b.ident("x"), b.ident("y")), "x + y");
        let options = ProgramOptions::new().with_globals(MapActivation::new().with("y", 10));
        let program = build(ast, options).unwrap();

        let (value, details) = program.eval_bindings([("x", 1)]).unwrap();
        assert_eq!(value, Value::Int(11));
        assert!(details.state().is_empty());

        // per-call bindings shadow globals
        let (value, _) = program.eval_bindings([("x", 1), ("y", 2)]).unwrap();
        assert_eq!(value, Value::Int(3));
    }

    #[test]
    fn test_error_value_becomes_evaluation_error() {
        let b = ExprBuilder::new();
        let ast = Ast::new_unchecked(b.div(b.int(1), b.ident("z")), "1 / z");
        let program = build(ast, ProgramOptions::new()).unwrap();
        match program.eval_bindings([("z", 0)]) {
            Err(ProgramError::Evaluation { error, .. }) => {
                assert_eq!(error.kind, EvalErrorKind::DivisionByZero)
            }
            other => panic!("expected evaluation error, got {:?}", other),
        }
    }

    #[test]
    fn test_panic_becomes_internal_error() {
        let b = ExprBuilder::new();
        let ast = Ast::new_unchecked(b.call("boom", vec![b.int(1)]), "boom(1)");
        let program = build(ast, ProgramOptions::new()).unwrap();
        match program.eval_bindings(Vec::<(String, Value)>::new()) {
            Err(ProgramError::Internal { message }) => assert_eq!(message, "native failure"),
            other => panic!("expected internal error, got {:?}", other),
        }
    }

    #[test]
    fn test_tracking_program_records_fresh_state() {
        let b = ExprBuilder::new();
        let ast = Ast::new_unchecked(b.add(b.ident("x"), b.int(1)), "x + 1");
        let options = ProgramOptions::new().with_eval_options(EvalOptions::TRACK_STATE);
        let program = build(ast, options).unwrap();

        let (_, first) = program.eval_bindings([("x", 1)]).unwrap();
        let (_, second) = program.eval_bindings([("x", 5)]).unwrap();
        assert_eq!(first.state().value(3), Some(Value::Int(2)));
        assert_eq!(second.state().value(3), Some(Value::Int(6)));
        assert_eq!(first.state().ids(), vec![1, 2, 3]);
    }

    #[test]
    fn test_build_surfaces_planning_issues() {
        let b = ExprBuilder::new();
        let ast = Ast::new_unchecked(b.call("nope", vec![b.int(1)]), "nope(1)");
        let options = ProgramOptions::new().with_eval_options(EvalOptions::TRACK_STATE);
        match build(ast, options) {
            Err(ProgramError::Issues(issues)) => assert_eq!(issues.len(), 1),
            other => panic!("expected issues, got {:?}", other),
        }
    }

    #[test]
    fn test_exhaustive_implies_tracking() {
        assert!(EvalOptions::EXHAUSTIVE_EVAL.contains(EvalOptions::TRACK_STATE));
        assert!(!EvalOptions::TRACK_STATE.contains(EvalOptions::EXHAUSTIVE_EVAL));
    }
}
