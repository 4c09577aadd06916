//! Operator implementations behind the value traits.
//!
//! Each function is total: operands of a kind the operator does not support
//! produce a "no such overload" error value naming the operator and the
//! operand types.

use std::cmp::Ordering;
use std::sync::Arc;

use cel_ast::operators;

use super::value::{Duration, Timestamp, Value};
use super::EvalError;

fn no_overload(function: &str, args: &[&Value]) -> Value {
    let names: Vec<Arc<str>> = args.iter().map(|v| v.type_name()).collect();
    let names: Vec<&str> = names.iter().map(|n| n.as_ref()).collect();
    Value::error(EvalError::no_such_overload(function, &names))
}

fn checked_timestamp(total: i128) -> Value {
    match Timestamp::from_total_nanos(total).filter(Timestamp::is_valid) {
        Some(ts) => Value::Timestamp(ts),
        None => Value::error(EvalError::overflow("timestamp out of range")),
    }
}

fn checked_duration(total: i128) -> Value {
    match Duration::from_total_nanos(total).filter(Duration::is_valid) {
        Some(d) => Value::Duration(d),
        None => Value::error(EvalError::overflow("duration out of range")),
    }
}

fn concat<T: Clone>(a: &[T], b: &[T]) -> Vec<T> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    out.extend_from_slice(a);
    out.extend_from_slice(b);
    out
}

impl Value {
    /// `_+_`
    pub fn add(&self, rhs: &Value) -> Value {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_add(*b)
                .map(Value::Int)
                .unwrap_or_else(|| Value::error(EvalError::overflow("integer addition overflow"))),
            (Value::UInt(a), Value::UInt(b)) => a
                .checked_add(*b)
                .map(Value::UInt)
                .unwrap_or_else(|| Value::error(EvalError::overflow("unsigned addition overflow"))),
            (Value::Double(a), Value::Double(b)) => Value::Double(a + b),
            (Value::String(a), Value::String(b)) => {
                let mut s = String::with_capacity(a.len() + b.len());
                s.push_str(a);
                s.push_str(b);
                Value::string(s)
            }
            (Value::Bytes(a), Value::Bytes(b)) => Value::bytes(concat(&a[..], &b[..])),
            (Value::List(a), Value::List(b)) => Value::list(concat(&a[..], &b[..])),
            (Value::Timestamp(t), Value::Duration(d))
            | (Value::Duration(d), Value::Timestamp(t)) => {
                checked_timestamp(t.total_nanos() + d.total_nanos())
            }
            (Value::Duration(a), Value::Duration(b)) => {
                checked_duration(a.total_nanos() + b.total_nanos())
            }
            _ => no_overload(operators::ADD, &[self, rhs]),
        }
    }

    /// `_-_`
    pub fn subtract(&self, rhs: &Value) -> Value {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => a.checked_sub(*b).map(Value::Int).unwrap_or_else(|| {
                Value::error(EvalError::overflow("integer subtraction overflow"))
            }),
            (Value::UInt(a), Value::UInt(b)) => a.checked_sub(*b).map(Value::UInt).unwrap_or_else(
                || Value::error(EvalError::overflow("unsigned subtraction overflow")),
            ),
            (Value::Double(a), Value::Double(b)) => Value::Double(a - b),
            (Value::Timestamp(a), Value::Timestamp(b)) => {
                checked_duration(a.total_nanos() - b.total_nanos())
            }
            (Value::Timestamp(t), Value::Duration(d)) => {
                checked_timestamp(t.total_nanos() - d.total_nanos())
            }
            (Value::Duration(a), Value::Duration(b)) => {
                checked_duration(a.total_nanos() - b.total_nanos())
            }
            _ => no_overload(operators::SUBTRACT, &[self, rhs]),
        }
    }

    /// `_*_`
    pub fn multiply(&self, rhs: &Value) -> Value {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => a.checked_mul(*b).map(Value::Int).unwrap_or_else(|| {
                Value::error(EvalError::overflow("integer multiplication overflow"))
            }),
            (Value::UInt(a), Value::UInt(b)) => a.checked_mul(*b).map(Value::UInt).unwrap_or_else(
                || Value::error(EvalError::overflow("unsigned multiplication overflow")),
            ),
            (Value::Double(a), Value::Double(b)) => Value::Double(a * b),
            _ => no_overload(operators::MULTIPLY, &[self, rhs]),
        }
    }

    /// `_/_`
    pub fn divide(&self, rhs: &Value) -> Value {
        match (self, rhs) {
            (Value::Int(_), Value::Int(0)) | (Value::UInt(_), Value::UInt(0)) => {
                Value::error(EvalError::division_by_zero())
            }
            (Value::Int(a), Value::Int(b)) => a.checked_div(*b).map(Value::Int).unwrap_or_else(|| {
                Value::error(EvalError::overflow("integer division overflow"))
            }),
            (Value::UInt(a), Value::UInt(b)) => Value::UInt(a / b),
            (Value::Double(a), Value::Double(b)) => Value::Double(a / b),
            _ => no_overload(operators::DIVIDE, &[self, rhs]),
        }
    }

    /// `_%_`
    pub fn modulo(&self, rhs: &Value) -> Value {
        match (self, rhs) {
            (Value::Int(_), Value::Int(0)) | (Value::UInt(_), Value::UInt(0)) => {
                Value::error(EvalError::modulo_by_zero())
            }
            (Value::Int(a), Value::Int(b)) => a.checked_rem(*b).map(Value::Int).unwrap_or_else(|| {
                Value::error(EvalError::overflow("integer modulus overflow"))
            }),
            (Value::UInt(a), Value::UInt(b)) => Value::UInt(a % b),
            _ => no_overload(operators::MODULO, &[self, rhs]),
        }
    }

    /// `-_`
    pub fn negate(&self) -> Value {
        match self {
            Value::Int(i) => i
                .checked_neg()
                .map(Value::Int)
                .unwrap_or_else(|| Value::error(EvalError::overflow("integer negation overflow"))),
            Value::Double(d) => Value::Double(-d),
            Value::Duration(d) => checked_duration(-d.total_nanos()),
            _ => no_overload(operators::NEGATE, &[self]),
        }
    }

    /// `!_`
    pub fn logical_not(&self) -> Value {
        match self {
            Value::Bool(b) => Value::Bool(!b),
            _ => no_overload(operators::LOGICAL_NOT, &[self]),
        }
    }

    /// One of the ordering operators (`_<_`, `_<=_`, `_>_`, `_>=_`).
    pub fn compare_with(&self, function: &str, rhs: &Value) -> Value {
        let Some(ordering) = self.compare(rhs) else {
            // NaN is unordered against every number.
            if self.is_number() && rhs.is_number() {
                return Value::Bool(false);
            }
            return no_overload(function, &[self, rhs]);
        };
        let result = match function {
            operators::LESS => ordering == Ordering::Less,
            operators::LESS_EQUALS => ordering != Ordering::Greater,
            operators::GREATER => ordering == Ordering::Greater,
            operators::GREATER_EQUALS => ordering != Ordering::Less,
            _ => return no_overload(function, &[self, rhs]),
        };
        Value::Bool(result)
    }

    /// `_!=_`
    pub fn not_equal(&self, rhs: &Value) -> Value {
        match self.equal(rhs) {
            Value::Bool(b) => Value::Bool(!b),
            other => other,
        }
    }

    /// `_[_]`
    pub fn index(&self, key: &Value) -> Value {
        match self {
            Value::List(list) => {
                let Some(i) = list_index(key) else {
                    return no_overload(operators::INDEX, &[self, key]);
                };
                usize::try_from(i)
                    .ok()
                    .and_then(|idx| list.get(idx))
                    .cloned()
                    .unwrap_or_else(|| {
                        Value::error(EvalError::index_out_of_bounds(i, list.len()))
                    })
            }
            Value::Map(map) => match key {
                Value::Bool(_)
                | Value::Int(_)
                | Value::UInt(_)
                | Value::Double(_)
                | Value::String(_) => {
                    map.get_value(key)
                        .cloned()
                        .unwrap_or_else(|| Value::error(EvalError::no_such_key(key)))
                }
                _ => no_overload(operators::INDEX, &[self, key]),
            },
            Value::Object(obj) => match key {
                Value::String(field) => obj.get_field(field),
                _ => no_overload(operators::INDEX, &[self, key]),
            },
            _ => no_overload(operators::INDEX, &[self, key]),
        }
    }

    /// Field selection `x.field` on maps and objects.
    pub fn select_field(&self, field: &str) -> Value {
        match self {
            Value::Map(map) => map
                .get_value(&Value::string(field))
                .cloned()
                .unwrap_or_else(|| Value::error(EvalError::no_such_field(field))),
            Value::Object(obj) => obj.get_field(field),
            _ => Value::error(EvalError::no_such_field(field)),
        }
    }

    /// Presence test `has(x.field)`.
    pub fn has_field(&self, field: &str) -> Value {
        match self {
            Value::Map(map) => Value::Bool(map.get_value(&Value::string(field)).is_some()),
            Value::Object(obj) => obj.is_set(field),
            _ => no_overload("has", &[self]),
        }
    }

    /// `size`
    pub fn size(&self) -> Value {
        match self {
            Value::String(s) => Value::Int(s.chars().count() as i64),
            Value::Bytes(b) => Value::Int(b.len() as i64),
            Value::List(l) => Value::Int(l.len() as i64),
            Value::Map(m) => Value::Int(m.len() as i64),
            _ => no_overload("size", &[self]),
        }
    }

    /// `@in`, with `self` as the container.
    pub fn contains_element(&self, element: &Value) -> Value {
        match self {
            Value::List(list) => {
                let mut found = Value::Bool(false);
                for item in list.iter() {
                    match element.equal(item) {
                        Value::Bool(true) => return Value::Bool(true),
                        Value::Bool(false) => {}
                        other => found = other,
                    }
                }
                found
            }
            Value::Map(map) => Value::Bool(map.get_value(element).is_some()),
            _ => no_overload(operators::IN, &[element, self]),
        }
    }

    /// `matches` with an RE2-style pattern.
    pub fn matches(&self, pattern: &Value) -> Value {
        match (self, pattern) {
            (Value::String(s), Value::String(p)) => match regex::Regex::new(p) {
                Ok(re) => Value::Bool(re.is_match(s)),
                Err(e) => Value::error(EvalError::invalid_argument(format!(
                    "invalid regex '{}': {}",
                    p, e
                ))),
            },
            _ => no_overload("matches", &[self, pattern]),
        }
    }

    /// `contains`, `startsWith` and `endsWith` on strings.
    pub fn string_test(&self, function: &str, arg: &Value) -> Value {
        let (Value::String(s), Value::String(sub)) = (self, arg) else {
            return no_overload(function, &[self, arg]);
        };
        match function {
            "contains" => Value::Bool(s.contains(sub.as_ref())),
            "startsWith" => Value::Bool(s.starts_with(sub.as_ref())),
            "endsWith" => Value::Bool(s.ends_with(sub.as_ref())),
            _ => no_overload(function, &[self, arg]),
        }
    }
}

/// Lists accept int, uint and integral double indexes.
fn list_index(key: &Value) -> Option<i64> {
    match key {
        Value::Int(i) => Some(*i),
        Value::UInt(u) => Some(i64::try_from(*u).unwrap_or(i64::MAX)),
        Value::Double(d) if d.fract() == 0.0 && d.is_finite() => Some(*d as i64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{EvalErrorKind, MapKey};

    fn error_kind(v: &Value) -> EvalErrorKind {
        v.as_error().map(|e| e.kind).expect("expected error value")
    }

    #[test]
    fn test_checked_arithmetic() {
        assert_eq!(Value::Int(2).add(&Value::Int(3)), Value::Int(5));
        assert_eq!(error_kind(&Value::Int(i64::MAX).add(&Value::Int(1))), EvalErrorKind::Overflow);
        assert_eq!(error_kind(&Value::UInt(0).subtract(&Value::UInt(1))), EvalErrorKind::Overflow);
        assert_eq!(error_kind(&Value::Int(i64::MIN).negate()), EvalErrorKind::Overflow);
        assert_eq!(
            error_kind(&Value::Int(1).divide(&Value::Int(0))),
            EvalErrorKind::DivisionByZero
        );
        assert_eq!(error_kind(&Value::Int(1).modulo(&Value::Int(0))), EvalErrorKind::ModuloByZero);
    }

    #[test]
    fn test_mixed_kinds_have_no_overload() {
        let v = Value::Int(1).add(&Value::Double(1.0));
        assert_eq!(error_kind(&v), EvalErrorKind::NoSuchOverload);
        assert_eq!(v.as_error().unwrap().message, "no such overload: _+_(int, double)");
        assert_eq!(error_kind(&Value::Bool(true).negate()), EvalErrorKind::NoSuchOverload);
    }

    #[test]
    fn test_time_arithmetic() {
        let ts = Value::timestamp(100, 900_000_000);
        let d = Value::duration(1, 200_000_000);
        assert_eq!(ts.add(&d), Value::timestamp(102, 100_000_000));
        assert_eq!(ts.subtract(&d), Value::timestamp(99, 700_000_000));
        assert_eq!(
            Value::timestamp(10, 0).subtract(&Value::timestamp(12, 500_000_000)),
            Value::duration(-2, -500_000_000)
        );
        let max = Value::timestamp(253_402_300_799, 0);
        assert_eq!(error_kind(&max.add(&Value::duration(1, 0))), EvalErrorKind::Overflow);
    }

    #[test]
    fn test_compare_with() {
        assert_eq!(Value::Int(1).compare_with(operators::LESS, &Value::UInt(2)), Value::Bool(true));
        assert_eq!(
            Value::Double(2.0).compare_with(operators::GREATER_EQUALS, &Value::Int(2)),
            Value::Bool(true)
        );
        assert_eq!(
            error_kind(&Value::Bool(true).compare_with(operators::LESS, &Value::Int(1))),
            EvalErrorKind::NoSuchOverload
        );
    }

    #[test]
    fn test_index() {
        let list = Value::list(vec![Value::Int(10), Value::Int(20)]);
        assert_eq!(list.index(&Value::Int(1)), Value::Int(20));
        assert_eq!(list.index(&Value::UInt(0)), Value::Int(10));
        assert_eq!(list.index(&Value::Double(1.0)), Value::Int(20));
        assert_eq!(error_kind(&list.index(&Value::Int(-1))), EvalErrorKind::IndexOutOfBounds);
        assert_eq!(error_kind(&list.index(&Value::Int(2))), EvalErrorKind::IndexOutOfBounds);

        let map = Value::map([(MapKey::Int(1), Value::string("one"))]);
        assert_eq!(map.index(&Value::UInt(1)), Value::string("one"));
        assert_eq!(error_kind(&map.index(&Value::Int(2))), EvalErrorKind::NoSuchKey);

        assert_eq!(
            error_kind(&Value::Bool(true).index(&Value::Int(0))),
            EvalErrorKind::NoSuchOverload
        );
    }

    #[test]
    fn test_select_field() {
        let map = Value::map([(MapKey::from("b"), Value::Int(1))]);
        assert_eq!(map.select_field("b"), Value::Int(1));
        assert_eq!(error_kind(&map.select_field("c")), EvalErrorKind::NoSuchField);
        assert_eq!(map.has_field("b"), Value::Bool(true));
        assert_eq!(map.has_field("c"), Value::Bool(false));
    }

    #[test]
    fn test_contains_element() {
        let list = Value::list(vec![Value::Int(1), Value::string("a")]);
        assert_eq!(list.contains_element(&Value::Double(1.0)), Value::Bool(true));
        assert_eq!(list.contains_element(&Value::string("b")), Value::Bool(false));

        let map = Value::map([(MapKey::from("k"), Value::Null)]);
        assert_eq!(map.contains_element(&Value::string("k")), Value::Bool(true));
        assert_eq!(map.contains_element(&Value::Int(3)), Value::Bool(false));
    }

    #[test]
    fn test_string_functions() {
        let s = Value::string("hello world");
        assert_eq!(s.size(), Value::Int(11));
        assert_eq!(s.matches(&Value::string("^h.*d$")), Value::Bool(true));
        assert_eq!(error_kind(&s.matches(&Value::string("("))), EvalErrorKind::InvalidArgument);
        assert_eq!(s.string_test("startsWith", &Value::string("hell")), Value::Bool(true));
        assert_eq!(s.string_test("contains", &Value::string("xyz")), Value::Bool(false));
    }
}
