//! Operator overloads.

use cel_ast::operators;

use crate::eval::{Traits, Value};
use crate::interpreter::Overload;

pub(super) fn overloads() -> Vec<Overload> {
    let mut overloads = vec![
        Overload::binary(operators::ADD, "add", Value::add).with_trait(Traits::ADDER),
        Overload::binary(operators::SUBTRACT, "subtract", Value::subtract)
            .with_trait(Traits::SUBTRACTOR),
        Overload::binary(operators::MULTIPLY, "multiply", Value::multiply)
            .with_trait(Traits::MULTIPLIER),
        Overload::binary(operators::DIVIDE, "divide", Value::divide).with_trait(Traits::DIVIDER),
        Overload::binary(operators::MODULO, "modulo", Value::modulo).with_trait(Traits::MODDER),
        Overload::unary(operators::NEGATE, "negate", Value::negate).with_trait(Traits::NEGATER),
        Overload::unary(operators::LOGICAL_NOT, "logical_not", Value::logical_not)
            .with_trait(Traits::NEGATER),
        Overload::binary(operators::EQUALS, "equals", Value::equal),
        Overload::binary(operators::NOT_EQUALS, "not_equals", Value::not_equal),
        Overload::binary(operators::INDEX, "index", Value::index).with_trait(Traits::INDEXER),
        Overload::binary(operators::IN, "in", |element, container| {
            container.contains_element(element)
        }),
        Overload::unary(operators::NOT_STRICTLY_FALSE, "not_strictly_false", |value| {
            Value::Bool(!matches!(value, Value::Bool(false)))
        })
        .non_strict(),
    ];

    for (function, id) in [
        (operators::LESS, "less"),
        (operators::LESS_EQUALS, "less_equals"),
        (operators::GREATER, "greater"),
        (operators::GREATER_EQUALS, "greater_equals"),
    ] {
        overloads.push(
            Overload::binary(function, id, move |lhs, rhs| lhs.compare_with(function, rhs))
                .with_trait(Traits::COMPARER),
        );
    }
    overloads
}
