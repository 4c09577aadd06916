//! Timestamp and duration accessors (`getFullYear`, `getHours`, ...).

use chrono::{DateTime, FixedOffset};

use crate::eval::time::{DateField, Zone};
use crate::eval::{EvalError, Traits, Value};
use crate::interpreter::{no_such_overload, Overload};

pub(super) fn overloads() -> Vec<Overload> {
    let mut overloads = Vec::with_capacity(DateField::ALL.len() * 2);
    for field in DateField::ALL {
        let function = field.function();
        overloads.push(
            Overload::unary(function, function, move |target| read_field(field, target, None))
                .with_trait(Traits::RECEIVER),
        );
        overloads.push(
            Overload::binary(function, &format!("{}_with_tz", function), move |target, tz| {
                read_field(field, target, Some(tz))
            })
            .with_trait(Traits::RECEIVER),
        );
    }
    overloads
}

fn read_field(field: DateField, target: &Value, tz: Option<&Value>) -> Value {
    let function = field.function();
    match (target, tz) {
        (Value::Timestamp(ts), None) => {
            let local: Option<DateTime<FixedOffset>> =
                ts.to_datetime_utc().map(|utc| utc.fixed_offset());
            match local {
                Some(dt) => Value::Int(field.of_datetime(&dt)),
                None => Value::error(EvalError::overflow("timestamp out of range")),
            }
        }
        (Value::Timestamp(ts), Some(Value::String(name))) => {
            let zone = match Zone::parse(name) {
                Ok(zone) => zone,
                Err(err) => return Value::error(err),
            };
            match zone.local_time(ts) {
                Some(dt) => Value::Int(field.of_datetime(&dt)),
                None => Value::error(EvalError::overflow("timestamp out of range")),
            }
        }
        (Value::Duration(d), None) => match field.of_duration(d) {
            Some(n) => Value::Int(n),
            None => no_such_overload(function, &[target.clone()]),
        },
        (_, None) => no_such_overload(function, &[target.clone()]),
        (_, Some(tz)) => no_such_overload(function, &[target.clone(), tz.clone()]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::EvalErrorKind;
    use crate::interpreter::Dispatcher;

    fn call(function: &str, args: &[Value]) -> Value {
        let mut dispatcher = Dispatcher::new();
        dispatcher.add_all(overloads()).unwrap();
        dispatcher.dispatch(function, None, args)
    }

    // 2009-02-13T23:31:30Z, a Friday.
    fn friday() -> Value {
        Value::timestamp(1_234_567_890, 0)
    }

    #[test]
    fn test_timestamp_fields_in_utc() {
        assert_eq!(call("getFullYear", &[friday()]), Value::Int(2009));
        assert_eq!(call("getMonth", &[friday()]), Value::Int(1));
        assert_eq!(call("getDate", &[friday()]), Value::Int(13));
        assert_eq!(call("getDayOfMonth", &[friday()]), Value::Int(12));
        assert_eq!(call("getDayOfWeek", &[friday()]), Value::Int(5));
        assert_eq!(call("getHours", &[friday()]), Value::Int(23));
    }

    #[test]
    fn test_timestamp_fields_with_zone() {
        let tz = Value::from("+05:30");
        // 05:01:30 on the next day.
        assert_eq!(call("getHours", &[friday(), tz.clone()]), Value::Int(5));
        assert_eq!(call("getDayOfWeek", &[friday(), tz]), Value::Int(6));
        assert_eq!(
            call("getHours", &[friday(), Value::from("America/New_York")]),
            Value::Int(18)
        );

        let err = call("getHours", &[friday(), Value::from("Mars/Olympus")]);
        assert_eq!(err.as_error().map(|e| e.kind), Some(EvalErrorKind::InvalidArgument));
    }

    #[test]
    fn test_duration_fields() {
        let d = Value::duration(5400, 0);
        assert_eq!(call("getHours", &[d.clone()]), Value::Int(1));
        assert_eq!(call("getMinutes", &[d.clone()]), Value::Int(90));
        let err = call("getFullYear", &[d]);
        assert_eq!(err.as_error().map(|e| e.kind), Some(EvalErrorKind::NoSuchOverload));
    }
}
