//! Type conversions: CEL-level (`int(x)`, `string(x)`, ...) and host-level
//! ([`FromValue`]).

use std::collections::HashMap;
use std::sync::Arc;

use super::time::{format_duration, format_timestamp, parse_duration, parse_timestamp};
use super::value::{Duration, Timestamp, TypeValue, Value};
use super::EvalError;

fn conversion_error(value: &Value, target: &str) -> Value {
    Value::error(EvalError::invalid_conversion(&value.type_name(), target))
}

/// Renders a double the way `string(x)` does.
pub(crate) fn format_double(d: f64) -> String {
    if d.is_nan() {
        "NaN".to_string()
    } else if d.is_infinite() {
        let sign = if d.is_sign_positive() { "+" } else { "-" };
        format!("{}infinity", sign)
    } else if d.fract() == 0.0 && d.abs() < 1e15 {
        format!("{:.1}", d)
    } else {
        d.to_string()
    }
}

impl Value {
    /// Converts to the type named by `target`; unsupported conversions are
    /// error values.
    pub fn convert_to_type(&self, target: &TypeValue) -> Value {
        if self.is_error_or_unknown() {
            return self.clone();
        }
        match target.name.as_ref() {
            "int" => self.to_int(),
            "uint" => self.to_uint(),
            "double" => self.to_double(),
            "string" => self.to_cel_string(),
            "bytes" => self.to_cel_bytes(),
            "bool" => self.to_cel_bool(),
            "google.protobuf.Timestamp" => self.to_timestamp(),
            "google.protobuf.Duration" => self.to_duration(),
            "type" => Value::Type(self.type_value()),
            "dyn" => self.clone(),
            name if name == self.type_name().as_ref() => self.clone(),
            name => conversion_error(self, name),
        }
    }

    fn to_int(&self) -> Value {
        match self {
            Value::Int(i) => Value::Int(*i),
            Value::UInt(u) => i64::try_from(*u)
                .map(Value::Int)
                .unwrap_or_else(|_| Value::error(EvalError::overflow("uint to int overflow"))),
            // Truncates toward zero; the range check excludes 2^63 itself.
            Value::Double(d)
                if d.is_finite()
                    && *d > -9.223_372_036_854_776e18
                    && *d < 9.223_372_036_854_776e18 =>
            {
                Value::Int(*d as i64)
            }
            Value::Double(_) => Value::error(EvalError::overflow("double to int overflow")),
            Value::String(s) => s
                .parse::<i64>()
                .map(Value::Int)
                .unwrap_or_else(|_| conversion_error(self, "int")),
            Value::Timestamp(t) => Value::Int(t.seconds),
            _ => conversion_error(self, "int"),
        }
    }

    fn to_uint(&self) -> Value {
        match self {
            Value::UInt(u) => Value::UInt(*u),
            Value::Int(i) => u64::try_from(*i)
                .map(Value::UInt)
                .unwrap_or_else(|_| Value::error(EvalError::overflow("int to uint overflow"))),
            Value::Double(d) if d.is_finite() && *d >= 0.0 && *d < 1.844_674_407_370_955_2e19 => {
                Value::UInt(*d as u64)
            }
            Value::Double(_) => Value::error(EvalError::overflow("double to uint overflow")),
            Value::String(s) => s
                .parse::<u64>()
                .map(Value::UInt)
                .unwrap_or_else(|_| conversion_error(self, "uint")),
            _ => conversion_error(self, "uint"),
        }
    }

    fn to_double(&self) -> Value {
        match self {
            Value::Double(d) => Value::Double(*d),
            Value::Int(i) => Value::Double(*i as f64),
            Value::UInt(u) => Value::Double(*u as f64),
            Value::String(s) => s
                .parse::<f64>()
                .map(Value::Double)
                .unwrap_or_else(|_| conversion_error(self, "double")),
            _ => conversion_error(self, "double"),
        }
    }

    fn to_cel_string(&self) -> Value {
        match self {
            Value::String(s) => Value::String(s.clone()),
            Value::Int(i) => Value::string(i.to_string()),
            Value::UInt(u) => Value::string(u.to_string()),
            Value::Double(d) => Value::string(format_double(*d)),
            Value::Bool(b) => Value::string(b.to_string()),
            Value::Bytes(b) => match std::str::from_utf8(b) {
                Ok(s) => Value::string(s),
                Err(_) => conversion_error(self, "string"),
            },
            Value::Timestamp(t) => Value::string(format_timestamp(t)),
            Value::Duration(d) => Value::string(format_duration(d)),
            _ => conversion_error(self, "string"),
        }
    }

    fn to_cel_bytes(&self) -> Value {
        match self {
            Value::Bytes(b) => Value::Bytes(b.clone()),
            Value::String(s) => Value::bytes(s.as_bytes()),
            _ => conversion_error(self, "bytes"),
        }
    }

    fn to_cel_bool(&self) -> Value {
        match self {
            Value::Bool(b) => Value::Bool(*b),
            Value::String(s) => match s.as_ref() {
                "true" | "True" | "TRUE" | "t" | "1" => Value::Bool(true),
                "false" | "False" | "FALSE" | "f" | "0" => Value::Bool(false),
                _ => conversion_error(self, "bool"),
            },
            _ => conversion_error(self, "bool"),
        }
    }

    fn to_timestamp(&self) -> Value {
        match self {
            Value::Timestamp(t) => Value::Timestamp(*t),
            Value::String(s) => parse_timestamp(s).map_or_else(Value::from, Value::Timestamp),
            Value::Int(i) => {
                let ts = Timestamp::from_seconds(*i);
                if ts.is_valid() {
                    Value::Timestamp(ts)
                } else {
                    Value::error(EvalError::overflow("timestamp out of range"))
                }
            }
            _ => conversion_error(self, "google.protobuf.Timestamp"),
        }
    }

    fn to_duration(&self) -> Value {
        match self {
            Value::Duration(d) => Value::Duration(*d),
            Value::String(s) => parse_duration(s).map_or_else(Value::from, Value::Duration),
            Value::Int(i) => {
                let d = Duration::from_seconds(*i);
                if d.is_valid() {
                    Value::Duration(d)
                } else {
                    Value::error(EvalError::overflow("duration out of range"))
                }
            }
            _ => conversion_error(self, "google.protobuf.Duration"),
        }
    }

    /// Converts into a host type.
    pub fn convert_to_native<T: FromValue>(&self) -> Result<T, EvalError> {
        T::from_value(self)
    }
}

/// Host types a [`Value`] can be converted into.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, EvalError>;
}

fn native_error(value: &Value, target: &str) -> EvalError {
    match value {
        Value::Error(e) => (**e).clone(),
        _ => EvalError::invalid_conversion(&value.type_name(), target),
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, EvalError> {
        Ok(value.clone())
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, EvalError> {
        value.as_bool().ok_or_else(|| native_error(value, "bool"))
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self, EvalError> {
        match value {
            Value::Int(i) => Ok(*i),
            Value::UInt(u) => {
                i64::try_from(*u).map_err(|_| EvalError::overflow("uint to i64 overflow"))
            }
            _ => Err(native_error(value, "i64")),
        }
    }
}

impl FromValue for u64 {
    fn from_value(value: &Value) -> Result<Self, EvalError> {
        match value {
            Value::UInt(u) => Ok(*u),
            Value::Int(i) => {
                u64::try_from(*i).map_err(|_| EvalError::overflow("int to u64 overflow"))
            }
            _ => Err(native_error(value, "u64")),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, EvalError> {
        match value {
            Value::Double(d) => Ok(*d),
            Value::Int(i) => Ok(*i as f64),
            Value::UInt(u) => Ok(*u as f64),
            _ => Err(native_error(value, "f64")),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, EvalError> {
        value
            .as_string()
            .map(str::to_string)
            .ok_or_else(|| native_error(value, "String"))
    }
}

impl FromValue for Arc<str> {
    fn from_value(value: &Value) -> Result<Self, EvalError> {
        match value {
            Value::String(s) => Ok(s.clone()),
            _ => Err(native_error(value, "Arc<str>")),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Result<Self, EvalError> {
        value
            .as_bytes()
            .map(<[u8]>::to_vec)
            .ok_or_else(|| native_error(value, "Vec<u8>"))
    }
}

impl FromValue for Timestamp {
    fn from_value(value: &Value) -> Result<Self, EvalError> {
        value
            .as_timestamp()
            .ok_or_else(|| native_error(value, "Timestamp"))
    }
}

impl FromValue for Duration {
    fn from_value(value: &Value) -> Result<Self, EvalError> {
        value
            .as_duration()
            .ok_or_else(|| native_error(value, "Duration"))
    }
}

impl FromValue for std::time::Duration {
    fn from_value(value: &Value) -> Result<Self, EvalError> {
        let d = value
            .as_duration()
            .ok_or_else(|| native_error(value, "std::time::Duration"))?;
        if d.is_negative() {
            return Err(EvalError::invalid_conversion("negative duration", "std::time::Duration"));
        }
        Ok(std::time::Duration::new(d.seconds as u64, d.nanos as u32))
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Result<Self, EvalError> {
        let list = value
            .as_list()
            .ok_or_else(|| native_error(value, "Vec"))?;
        list.iter().map(T::from_value).collect()
    }
}

impl<T: FromValue> FromValue for HashMap<String, T> {
    fn from_value(value: &Value) -> Result<Self, EvalError> {
        let map = value
            .as_map()
            .ok_or_else(|| native_error(value, "HashMap"))?;
        map.iter()
            .map(|(key, v)| match key.to_value() {
                Value::String(k) => Ok((k.to_string(), T::from_value(v)?)),
                other => Err(EvalError::invalid_conversion(&other.type_name(), "String")),
            })
            .collect()
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, EvalError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{EvalErrorKind, MapKey};

    fn convert(v: Value, to: &str) -> Value {
        v.convert_to_type(&TypeValue::new(to))
    }

    #[test]
    fn test_numeric_conversions() {
        assert_eq!(convert(Value::UInt(7), "int"), Value::Int(7));
        assert_eq!(convert(Value::Double(-3.9), "int"), Value::Int(-3));
        assert!(convert(Value::Double(1e19), "int").is_error());
        assert!(convert(Value::Int(-1), "uint").is_error());
        assert_eq!(convert(Value::string("2.5"), "double"), Value::Double(2.5));
    }

    #[test]
    fn test_string_conversions() {
        assert_eq!(convert(Value::Double(3.0), "string"), Value::string("3.0"));
        assert_eq!(
            convert(Value::timestamp(0, 0), "string"),
            Value::string("1970-01-01T00:00:00Z")
        );
        assert_eq!(convert(Value::string("true"), "bool"), Value::Bool(true));
        assert!(convert(Value::bytes(vec![0xffu8, 0xfe]), "string").is_error());
    }

    #[test]
    fn test_time_conversions() {
        assert_eq!(
            convert(Value::string("1m30s"), "google.protobuf.Duration"),
            Value::duration(90, 0)
        );
        let err = convert(Value::string("nope"), "google.protobuf.Timestamp");
        assert_eq!(err.as_error().map(|e| e.kind), Some(EvalErrorKind::InvalidArgument));
    }

    #[test]
    fn test_type_and_identity() {
        assert_eq!(convert(Value::Int(1), "type"), Value::new_type("int"));
        assert_eq!(convert(Value::Int(1), "dyn"), Value::Int(1));
        assert!(convert(Value::Int(1), "list").is_error());
    }

    #[test]
    fn test_convert_to_native() {
        let list = Value::list(vec![Value::Int(1), Value::UInt(2)]);
        assert_eq!(list.convert_to_native::<Vec<i64>>().unwrap(), vec![1, 2]);

        let map = Value::map([(MapKey::from("a"), Value::string("x"))]);
        let native: HashMap<String, String> = map.convert_to_native().unwrap();
        assert_eq!(native.get("a").map(String::as_str), Some("x"));

        assert!(Value::string("x").convert_to_native::<i64>().is_err());
        assert_eq!(Value::Null.convert_to_native::<Option<bool>>().unwrap(), None);
        assert_eq!(
            Value::duration(2, 0).convert_to_native::<std::time::Duration>().unwrap(),
            std::time::Duration::from_secs(2)
        );
    }
}
