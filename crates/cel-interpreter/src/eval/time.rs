//! Timestamp and duration text formats, time zones, and calendar fields.

use chrono::{DateTime, Datelike, FixedOffset, Offset, Timelike};
use chrono_tz::Tz;

use super::value::{Duration, Timestamp};
use super::EvalError;

/// Parses an RFC 3339 timestamp such as `2009-02-13T23:31:30.123Z`.
pub fn parse_timestamp(s: &str) -> Result<Timestamp, EvalError> {
    let dt = DateTime::parse_from_rfc3339(s)
        .map_err(|e| EvalError::invalid_argument(format!("invalid timestamp '{}': {}", s, e)))?;

    let ts = Timestamp::new(dt.timestamp(), dt.timestamp_subsec_nanos() as i32);
    if !ts.is_valid() {
        return Err(EvalError::overflow("timestamp out of range"));
    }
    Ok(ts)
}

/// Parses a duration string: an optional sign followed by one or more
/// `<number><unit>` terms, with units `h m s ms us µs ns` (`1h30m`, `-1.5s`).
pub fn parse_duration(s: &str) -> Result<Duration, EvalError> {
    let invalid = |detail: String| {
        EvalError::invalid_argument(format!("invalid duration '{}': {}", s, detail))
    };

    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    if body.is_empty() {
        return Err(invalid("no value".to_string()));
    }

    let mut total: i128 = 0;
    let mut rest = body;
    while !rest.is_empty() {
        let num_end = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(rest.len());
        if num_end == 0 {
            return Err(invalid(format!("expected number at '{}'", rest)));
        }
        let (number, after) = rest.split_at(num_end);

        let unit_end = after
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(after.len());
        if unit_end == 0 {
            return Err(invalid(format!("missing unit after '{}'", number)));
        }
        let (unit, after) = after.split_at(unit_end);
        rest = after;

        let scale: i128 = match unit {
            "h" => 3_600_000_000_000,
            "m" => 60_000_000_000,
            "s" => 1_000_000_000,
            "ms" => 1_000_000,
            "us" | "\u{00b5}s" => 1_000,
            "ns" => 1,
            _ => return Err(invalid(format!("unknown unit '{}'", unit))),
        };

        let term = if number.contains('.') {
            let n: f64 = number
                .parse()
                .map_err(|_| invalid(format!("bad number '{}'", number)))?;
            (n * scale as f64) as i128
        } else {
            let n: i128 = number
                .parse()
                .map_err(|_| invalid(format!("bad number '{}'", number)))?;
            n.checked_mul(scale)
                .ok_or_else(|| EvalError::overflow("duration out of range"))?
        };
        total = total
            .checked_add(term)
            .ok_or_else(|| EvalError::overflow("duration out of range"))?;
    }

    if negative {
        total = -total;
    }
    Duration::from_total_nanos(total)
        .filter(Duration::is_valid)
        .ok_or_else(|| EvalError::overflow("duration out of range"))
}

/// RFC 3339 in UTC, with the fractional part trimmed of trailing zeros.
pub fn format_timestamp(ts: &Timestamp) -> String {
    let Some(dt) = ts.to_datetime_utc() else {
        return format!("{}s", ts.seconds);
    };
    let frac = format!("{:09}", ts.nanos);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    } else {
        format!("{}.{}Z", dt.format("%Y-%m-%dT%H:%M:%S"), frac)
    }
}

/// Seconds with an optional fraction: `100s`, `1.5s`, `-0.25s`.
pub fn format_duration(d: &Duration) -> String {
    let total = d.total_nanos();
    let sign = if total < 0 { "-" } else { "" };
    let secs = total.abs() / 1_000_000_000;
    let frac = total.abs() % 1_000_000_000;
    if frac == 0 {
        format!("{}{}s", sign, secs)
    } else {
        let digits = format!("{:09}", frac);
        format!("{}{}.{}s", sign, secs, digits.trim_end_matches('0'))
    }
}

/// A time zone argument of a timestamp accessor.
#[derive(Debug, Clone, Copy)]
pub enum Zone {
    Named(Tz),
    Offset(FixedOffset),
}

impl Zone {
    /// Parses an IANA name (`America/New_York`) or a fixed offset
    /// (`+05:30`, `-08:00`, `02:00`).
    pub fn parse(tz: &str) -> Result<Zone, EvalError> {
        if let Ok(named) = tz.parse::<Tz>() {
            return Ok(Zone::Named(named));
        }
        parse_offset(tz).map(Zone::Offset)
    }

    /// The wall-clock reading of `ts` in this zone.
    pub fn local_time(&self, ts: &Timestamp) -> Option<DateTime<FixedOffset>> {
        let utc = ts.to_datetime_utc()?;
        Some(match self {
            Zone::Named(tz) => {
                let local = utc.with_timezone(tz);
                let offset = local.offset().fix();
                local.with_timezone(&offset)
            }
            Zone::Offset(offset) => utc.with_timezone(offset),
        })
    }
}

fn parse_offset(s: &str) -> Result<FixedOffset, EvalError> {
    let bad = || EvalError::invalid_argument(format!("invalid time zone '{}'", s));
    let s = s.trim();
    let (sign, rest) = if let Some(r) = s.strip_prefix('-') {
        (-1, r)
    } else {
        (1, s.strip_prefix('+').unwrap_or(s))
    };
    let (hours, minutes) = rest.split_once(':').ok_or_else(bad)?;
    let hours: i32 = hours.parse().map_err(|_| bad())?;
    let minutes: i32 = minutes.parse().map_err(|_| bad())?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(bad)
}

/// A calendar field read by one of the `get*` accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    FullYear,
    /// 0-11, January is 0.
    Month,
    /// 1-31.
    Date,
    /// 0-30.
    DayOfMonth,
    /// 0-6, Sunday is 0.
    DayOfWeek,
    /// 0-365.
    DayOfYear,
    Hours,
    Minutes,
    Seconds,
    Milliseconds,
}

impl DateField {
    pub const ALL: [DateField; 10] = [
        DateField::FullYear,
        DateField::Month,
        DateField::Date,
        DateField::DayOfMonth,
        DateField::DayOfWeek,
        DateField::DayOfYear,
        DateField::Hours,
        DateField::Minutes,
        DateField::Seconds,
        DateField::Milliseconds,
    ];

    /// The accessor function name, e.g. `getDayOfWeek`.
    pub fn function(&self) -> &'static str {
        match self {
            DateField::FullYear => "getFullYear",
            DateField::Month => "getMonth",
            DateField::Date => "getDate",
            DateField::DayOfMonth => "getDayOfMonth",
            DateField::DayOfWeek => "getDayOfWeek",
            DateField::DayOfYear => "getDayOfYear",
            DateField::Hours => "getHours",
            DateField::Minutes => "getMinutes",
            DateField::Seconds => "getSeconds",
            DateField::Milliseconds => "getMilliseconds",
        }
    }

    /// True for the fields that durations also expose.
    pub fn applies_to_duration(&self) -> bool {
        matches!(
            self,
            DateField::Hours | DateField::Minutes | DateField::Seconds | DateField::Milliseconds
        )
    }

    pub fn of_datetime(&self, dt: &DateTime<FixedOffset>) -> i64 {
        match self {
            DateField::FullYear => dt.year() as i64,
            DateField::Month => dt.month0() as i64,
            DateField::Date => dt.day() as i64,
            DateField::DayOfMonth => dt.day0() as i64,
            DateField::DayOfWeek => dt.weekday().num_days_from_sunday() as i64,
            DateField::DayOfYear => dt.ordinal0() as i64,
            DateField::Hours => dt.hour() as i64,
            DateField::Minutes => dt.minute() as i64,
            DateField::Seconds => dt.second() as i64,
            DateField::Milliseconds => (dt.nanosecond() / 1_000_000) as i64,
        }
    }

    /// Duration fields count whole units of the total length.
    pub fn of_duration(&self, d: &Duration) -> Option<i64> {
        match self {
            DateField::Hours => Some(d.get_hours()),
            DateField::Minutes => Some(d.get_minutes()),
            DateField::Seconds => Some(d.get_seconds()),
            DateField::Milliseconds => Some(d.get_milliseconds()),
            _ => None,
        }
    }
}
