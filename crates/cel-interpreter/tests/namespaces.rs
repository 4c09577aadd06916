//! Integration tests for name resolution through containers, abbreviations
//! and aliases.

mod common;

use std::collections::HashMap;

use cel_ast::{Ast, CelType, CelValue, ExprBuilder, Reference};
use cel_interpreter::{
    Container, EmptyActivation, Env, EvalOptions, MapActivation, Overload, Value,
};
use pretty_assertions::assert_eq;

fn bindings() -> MapActivation {
    MapActivation::new()
        .with("a.b.R", "a.b.R")
        .with("R", "R")
        .with("x.y.R", "x.y.R")
}

fn resolve(env: &Env, expr: cel_ast::SpannedExpr) -> Value {
    let program = common::assert_builds(env, expr, EvalOptions::empty());
    program.eval(&bindings()).unwrap().0
}

#[test]
fn candidates_are_most_qualified_first() {
    let container = Container::new("a.b.c").unwrap();
    assert_eq!(
        container.candidate_names("R"),
        vec!["a.b.c.R", "a.b.R", "a.R", "R"]
    );

    let env = Env::with_standard_library().with_container("a.b.c");
    let b = ExprBuilder::new();
    assert_eq!(resolve(&env, b.ident("R")), Value::from("a.b.R"));
    assert_eq!(resolve(&env, b.root_ident("R")), Value::from("R"));
}

#[test]
fn abbreviation_overrides_container() {
    let env = Env::with_standard_library()
        .with_container("a.b.c")
        .with_abbreviations(&["x.y.R"]);
    let b = ExprBuilder::new();
    assert_eq!(resolve(&env, b.ident("R")), Value::from("x.y.R"));
}

#[test]
fn conflicting_abbreviations_are_reported() {
    let env = Env::with_standard_library().with_abbreviations(&["x.y.R", "p.q.R"]);
    assert_eq!(env.issues().len(), 1);
}

#[test]
fn alias_expands_the_first_segment() {
    let config: HashMap<String, i64> = [("limit".to_string(), 5)].into_iter().collect();
    let env = Env::with_standard_library().with_alias("cfg", "acme.config");
    let b = ExprBuilder::new();
    let expr = b.select(b.ident("cfg"), "limit");
    let program = common::assert_builds(&env, expr, EvalOptions::empty());
    let activation = MapActivation::new().with("acme.config", config);
    assert_eq!(program.eval(&activation).unwrap().0, Value::Int(5));
}

#[test]
fn namespaced_functions_resolve_through_container() {
    let env = Env::with_standard_library()
        .with_container("a.b")
        .with_overload(Overload::unary("a.b.twice", "a_b_twice_int", |v| v.add(v)));
    let b = ExprBuilder::new();

    // a.b.twice(21)
    let qualified = b.member_call(b.select(b.ident("a"), "b"), "twice", vec![b.int(21)]);
    assert_eq!(resolve(&env, qualified), Value::Int(42));

    // twice(21), found as a.b.twice
    let short = b.call("twice", vec![b.int(21)]);
    assert_eq!(resolve(&env, short), Value::Int(42));
}

#[test]
fn checked_references_skip_name_search() {
    let b = ExprBuilder::new();
    // R + "/" + string(Color.RED): R(1) "/"(2) +(3) Color(4) .RED(5) string(7) +(8)
    let expr = b.add(
        b.add(b.ident("R"), b.string("/")),
        b.call("string", vec![b.select(b.ident("Color"), "RED")]),
    );
    let mut refs = HashMap::new();
    refs.insert(1, Reference::ident("x.y.R"));
    refs.insert(3, Reference::function("_+_", vec!["add".to_string()]));
    refs.insert(5, Reference::constant("acme.Color.RED", CelValue::Int(2)));
    let mut types = HashMap::new();
    types.insert(8, CelType::String);
    let ast = Ast::new_checked(expr, "R + \"/\" + string(Color.RED)", refs, types);

    let env = Env::with_standard_library().with_container("a.b.c");
    let program = env.program(ast).unwrap();
    let (value, _) = program.eval(&bindings()).unwrap();
    assert_eq!(value, Value::from("x.y.R/2"));

    // Without the reference map, R is searched for in the container.
    let program = env.program(common::unchecked(b.ident("R"))).unwrap();
    assert!(program.eval(&EmptyActivation).is_err());
}
