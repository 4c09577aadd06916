//! Integration tests for partial evaluation and residual ASTs.

mod common;

use cel_ast::ExprBuilder;
use cel_interpreter::{
    AttributePattern, Env, EvalErrorKind, EvalOptions, MapActivation, PartialActivation,
    ProgramOptions, Value,
};
use pretty_assertions::assert_eq;

fn partial_options() -> EvalOptions {
    EvalOptions::TRACK_STATE | EvalOptions::PARTIAL_EVAL
}

fn unknown_y(bindings: MapActivation) -> PartialActivation<MapActivation> {
    PartialActivation::new(bindings, [AttributePattern::new("y")])
}

#[test]
fn residual_keeps_only_unknown_conjunct() {
    let env = Env::with_standard_library();
    let b = ExprBuilder::new();
    // x < 10 && y == 0
    let expr = b.and(b.lt(b.ident("x"), b.int(10)), b.eq(b.ident("y"), b.int(0)));
    let program = common::assert_builds(&env, expr.clone(), partial_options());

    let (value, details) = program
        .eval(&unknown_y(MapActivation::new().with("x", 3)))
        .unwrap();
    assert!(value.is_unknown());

    let residual = program.residual_ast(&details);
    assert_eq!(residual.to_cel_string(), "y == 0");
    assert_eq!(residual.expr().id, 1);

    // The residual agrees with the original once y is known.
    let full = MapActivation::new().with("x", 3).with("y", 0);
    let direct = common::assert_builds(&env, expr, EvalOptions::empty());
    let (direct_value, _) = direct.eval(&full).unwrap();
    let (residual_value, _) = env.program(residual).unwrap().eval(&full).unwrap();
    assert_eq!(direct_value, Value::Bool(true));
    assert_eq!(residual_value, direct_value);
}

#[test]
fn three_valued_logic() {
    let env = Env::with_standard_library();
    let activation = unknown_y(MapActivation::new());
    let eval = |expr| {
        let program = common::assert_builds(&env, expr, partial_options());
        program.eval(&activation).map(|(value, _)| value).unwrap()
    };

    let b = ExprBuilder::new();
    assert_eq!(eval(b.and(b.ident("y"), b.bool(false))), Value::Bool(false));
    assert_eq!(eval(b.or(b.ident("y"), b.bool(true))), Value::Bool(true));
    assert!(eval(b.and(b.ident("y"), b.bool(true))).is_unknown());
    assert!(eval(b.or(b.bool(false), b.ident("y"))).is_unknown());
}

#[test]
fn unknown_wins_over_error() {
    let env = Env::with_standard_library();
    let b = ExprBuilder::new();
    // y && 1 / 0 == 1
    let expr = b.and(b.ident("y"), b.eq(b.div(b.int(1), b.int(0)), b.int(1)));
    let program = common::assert_builds(&env, expr, partial_options());
    let (value, _) = program.eval(&unknown_y(MapActivation::new())).unwrap();
    let unknown = value.as_unknown().unwrap();
    assert_eq!(unknown.ids().collect::<Vec<_>>(), vec![1]);
}

#[test]
fn qualified_patterns_cover_only_their_subtree() {
    let env = Env::with_standard_library();
    let b = ExprBuilder::new();
    let request: std::collections::HashMap<String, Value> = [
        ("path".to_string(), Value::from("/admin")),
        ("auth".to_string(), Value::Null),
    ]
    .into_iter()
    .collect();
    let activation = PartialActivation::new(
        MapActivation::new().with("req", request),
        [AttributePattern::new("req").qualify_string("auth")],
    );

    // req.path == '/admin' && req.auth.user == 'root'
    let expr = b.and(
        b.eq(b.select(b.ident("req"), "path"), b.string("/admin")),
        b.eq(
            b.select(b.select(b.ident("req"), "auth"), "user"),
            b.string("root"),
        ),
    );
    let program = common::assert_builds(&env, expr, partial_options());
    let (value, details) = program.eval(&activation).unwrap();
    assert!(value.is_unknown());
    assert_eq!(
        program.residual_ast(&details).to_cel_string(),
        "req.auth.user == \"root\""
    );
}

#[test]
fn patterns_are_ignored_without_partial_eval() {
    let b = ExprBuilder::new();
    let result = common::eval(b.eq(b.ident("y"), b.int(0)), &unknown_y(MapActivation::new()));
    assert_eq!(common::error_kind(&result), Some(EvalErrorKind::UnknownIdentifier));
}

#[test]
fn loop_variable_shadows_unknown_pattern() {
    let env = Env::with_standard_library();
    let b = ExprBuilder::new();
    // [1, 2].exists(y, y > 1)
    let expr = b.exists(b.list(vec![b.int(1), b.int(2)]), "y", b.gt(b.ident("y"), b.int(1)));
    let program = common::assert_builds(&env, expr, partial_options());
    let (value, _) = program.eval(&unknown_y(MapActivation::new())).unwrap();
    assert_eq!(value, Value::Bool(true));

    // The outer y is still unknown next to the loop.
    let expr = b.and(
        b.exists(b.list(vec![b.int(1)]), "y", b.gt(b.ident("y"), b.int(0))),
        b.ident("y"),
    );
    let program = common::assert_builds(&env, expr, partial_options());
    let (value, _) = program.eval(&unknown_y(MapActivation::new())).unwrap();
    assert!(value.is_unknown());
}

#[test]
fn global_and_per_call_patterns_combine() {
    let b = ExprBuilder::new();
    // g == 1 && x == 2: g(1) 1(2) ==(3) x(4) 2(5) ==(6) &&(7)
    let expr = b.and(b.eq(b.ident("g"), b.int(1)), b.eq(b.ident("x"), b.int(2)));
    let globals = PartialActivation::new(MapActivation::new(), [AttributePattern::new("g")]);
    let options = ProgramOptions::new()
        .with_eval_options(partial_options())
        .with_globals(globals);
    let program = Env::with_standard_library()
        .program_with(common::unchecked(expr), options)
        .unwrap();

    let input = PartialActivation::new(MapActivation::new(), [AttributePattern::new("x")]);
    let (value, _) = program.eval(&input).unwrap();
    let unknown = value.as_unknown().unwrap();
    assert_eq!(unknown.ids().collect::<Vec<_>>(), vec![1, 4]);
}
