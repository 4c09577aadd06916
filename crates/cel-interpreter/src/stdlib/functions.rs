//! Built-in functions: size, string tests and type conversions.

use crate::eval::{Traits, TypeValue, Value};
use crate::interpreter::Overload;

pub(super) fn overloads() -> Vec<Overload> {
    let mut overloads = vec![
        Overload::unary("size", "size", Value::size).with_trait(Traits::SIZER),
        Overload::binary("matches", "matches", Value::matches).with_trait(Traits::MATCHER),
    ];

    for (function, id) in [
        ("contains", "contains_string"),
        ("startsWith", "starts_with_string"),
        ("endsWith", "ends_with_string"),
    ] {
        overloads.push(
            Overload::binary(function, id, move |s, arg| s.string_test(function, arg))
                .with_trait(Traits::RECEIVER),
        );
    }

    let conversions = [
        ("int", TypeValue::int_type()),
        ("uint", TypeValue::uint_type()),
        ("double", TypeValue::double_type()),
        ("string", TypeValue::string_type()),
        ("bytes", TypeValue::bytes_type()),
        ("bool", TypeValue::bool_type()),
        ("timestamp", TypeValue::timestamp_type()),
        ("duration", TypeValue::duration_type()),
        ("type", TypeValue::type_type()),
        ("dyn", TypeValue::new("dyn")),
    ];
    for (function, target) in conversions {
        overloads.push(Overload::unary(function, function, move |value| {
            value.convert_to_type(&target)
        }));
    }
    overloads
}
