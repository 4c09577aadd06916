use std::sync::Arc;

use cel_ast::Ast;

use crate::container::{Abbreviations, Container};
use crate::eval::{TypeProvider, TypeRegistry};
use crate::interpreter::{AttributeFactory, Dispatcher, Overload};
use crate::issues::{Issue, Issues};
use crate::program::{EvalOptions, Program, ProgramError, ProgramOptions};
use crate::stdlib::standard_overloads;

/// The environment programs are built in.
///
/// An `Env` holds everything a program needs besides its expression:
/// - the overloads available to calls
/// - the container namespace and its aliases
/// - the type provider used for type names, enums and struct construction
///
/// Configuration problems, such as a duplicate overload id or a malformed
/// container name, do not fail the builder call. They are collected and
/// reported together by the first [`program`](Env::program) call.
///
/// # Example
///
/// ```
/// use cel_ast::{Ast, ExprBuilder};
/// use cel_interpreter::{Env, Value};
///
/// let b = ExprBuilder::new();
/// let ast = Ast::new_unchecked(b.add(b.ident("x"), b.int(1)), "x + 1");
///
/// let program = Env::with_standard_library().program(ast).unwrap();
/// let (value, _) = program.eval_bindings([("x", 41)]).unwrap();
/// assert_eq!(value, Value::Int(42));
/// ```
#[derive(Debug, Clone)]
pub struct Env {
    container: Container,
    dispatcher: Arc<Dispatcher>,
    provider: Arc<dyn TypeProvider>,
    issues: Vec<Issue>,
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

impl Env {
    /// An environment without any overloads, in the root namespace.
    pub fn new() -> Self {
        Self {
            container: Container::root(),
            dispatcher: Arc::new(Dispatcher::new()),
            provider: Arc::new(TypeRegistry::new()),
            issues: Vec::new(),
        }
    }

    /// An environment with the standard operators and functions.
    pub fn with_standard_library() -> Self {
        Self::new().with_overloads(standard_overloads())
    }

    /// Sets the container namespace. Replaces any aliases added earlier.
    pub fn with_container(mut self, name: &str) -> Self {
        match Container::new(name) {
            Ok(container) => self.container = container,
            Err(err) => self.issues.push(Issue::new(err.to_string())),
        }
        self
    }

    /// Makes the last segment of each qualified name refer to the full name.
    pub fn with_abbreviations(mut self, qualified_names: &[&str]) -> Self {
        let result = Abbreviations::from_qualified_names(qualified_names)
            .and_then(|abbrevs| self.container.add_abbreviations(&abbrevs));
        if let Err(err) = result {
            self.issues.push(Issue::new(err.to_string()));
        }
        self
    }

    pub fn with_alias(mut self, alias: &str, qualified_name: &str) -> Self {
        if let Err(err) = self.container.add_alias(alias, qualified_name) {
            self.issues.push(Issue::new(err.to_string()));
        }
        self
    }

    pub fn with_overload(mut self, overload: Overload) -> Self {
        if let Err(err) = Arc::make_mut(&mut self.dispatcher).add(overload) {
            self.issues.push(Issue::new(err.to_string()));
        }
        self
    }

    pub fn with_overloads(self, overloads: impl IntoIterator<Item = Overload>) -> Self {
        overloads.into_iter().fold(self, Env::with_overload)
    }

    pub fn with_type_provider(mut self, provider: impl TypeProvider + 'static) -> Self {
        self.provider = Arc::new(provider);
        self
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Configuration problems collected so far.
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// Builds a program with default options.
    pub fn program(&self, ast: Ast) -> Result<Program, ProgramError> {
        self.program_with(ast, ProgramOptions::default())
    }

    /// Builds a program.
    ///
    /// Programs that track state are planned once here to surface planning
    /// problems, and again on every evaluation.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn program_with(&self, ast: Ast, options: ProgramOptions) -> Result<Program, ProgramError> {
        if !self.issues.is_empty() {
            return Err(ProgramError::Issues(self.issues.iter().cloned().collect::<Issues>()));
        }
        ast.validate().map_err(|err| Issue::new(err.to_string()))?;

        let eval_options = options.eval_options();
        let factory = if eval_options.contains(EvalOptions::PARTIAL_EVAL) {
            AttributeFactory::partial(self.container.clone(), self.provider.clone())
        } else {
            AttributeFactory::new(self.container.clone(), self.provider.clone())
        };
        tracing::debug!(
            checked = ast.is_checked(),
            container = self.container.name(),
            options = ?eval_options,
            "planning program"
        );
        Program::build(ast, self.dispatcher.clone(), factory, options)
    }
}
