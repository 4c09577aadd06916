//! Common test utilities for cel-interpreter integration tests.

use cel_ast::{ast_to_string, Ast, SpannedExpr};
use cel_interpreter::{
    Activation, Env, EvalErrorKind, EvalOptions, Program, ProgramError, ProgramOptions, Value,
};

/// Wrap an expression in an unchecked AST whose source is its rendering.
#[allow(dead_code)]
pub fn unchecked(expr: SpannedExpr) -> Ast {
    let source = ast_to_string(&expr);
    Ast::new_unchecked(expr, source)
}

/// Build a program in the standard environment and assert it succeeds.
#[allow(dead_code)]
pub fn assert_builds(env: &Env, expr: SpannedExpr, options: EvalOptions) -> Program {
    let ast = unchecked(expr);
    let source = ast_to_string(ast.expr());
    match env.program_with(ast, ProgramOptions::new().with_eval_options(options)) {
        Ok(program) => program,
        Err(err) => panic!("failed to build '{}': {}", source, err),
    }
}

/// Evaluate with the standard library and default options.
#[allow(dead_code)]
pub fn eval(expr: SpannedExpr, activation: &dyn Activation) -> Result<Value, ProgramError> {
    let program = assert_builds(&Env::with_standard_library(), expr, EvalOptions::empty());
    program.eval(activation).map(|(value, _)| value)
}

/// The error kind of a failed evaluation, if it failed in the value domain.
#[allow(dead_code)]
pub fn error_kind(result: &Result<Value, ProgramError>) -> Option<EvalErrorKind> {
    match result {
        Err(ProgramError::Evaluation { error, .. }) => Some(error.kind),
        _ => None,
    }
}
