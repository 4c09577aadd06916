//! Runtime values for CEL evaluation.
//!
//! `Value` is the closed set of variants an expression can produce. Errors and
//! unknowns are ordinary variants: they flow through operators as data and only
//! become host-visible failures at the program boundary.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use cel_ast::{CelType, CelValue, ExprId};
use chrono::{DateTime, Utc};

use super::provider::ObjectValue;
use super::time::{format_duration, format_timestamp};
use super::traits::Traits;
use super::unknown::UnknownSet;
use super::EvalError;

/// A CEL runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Double(f64),
    /// Unicode string (Arc for cheap cloning).
    String(Arc<str>),
    Bytes(Arc<[u8]>),
    List(Arc<[Value]>),
    /// Key-value map (BTreeMap-backed, so iteration order is stable).
    Map(Arc<ValueMap>),
    Timestamp(Timestamp),
    Duration(Duration),
    /// A type as a first-class value (`type(x)`, `int`, `acme.Account`).
    Type(TypeValue),
    /// A value produced by a type provider for a registered message type.
    Object(Arc<dyn ObjectValue>),
    Error(Arc<EvalError>),
    /// Depends on input that has not been supplied yet.
    Unknown(Arc<UnknownSet>),
}

/// Seconds bounds of `0001-01-01T00:00:00Z` and `9999-12-31T23:59:59Z`.
const MIN_TIMESTAMP_SECONDS: i64 = -62_135_596_800;
const MAX_TIMESTAMP_SECONDS: i64 = 253_402_300_799;

/// Roughly ten thousand years either way.
const MAX_DURATION_SECONDS: i64 = 315_576_000_000;

/// A CEL timestamp value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp {
    /// Seconds since Unix epoch.
    pub seconds: i64,
    /// Nanoseconds (0..999_999_999).
    pub nanos: i32,
}

impl Timestamp {
    pub fn new(seconds: i64, nanos: i32) -> Self {
        Self { seconds, nanos }
    }

    pub fn from_seconds(seconds: i64) -> Self {
        Self { seconds, nanos: 0 }
    }

    /// Builds a timestamp from a nanosecond offset, normalizing `nanos`
    /// into `0..1_000_000_000`.
    pub fn from_total_nanos(total: i128) -> Option<Self> {
        let seconds = i64::try_from(total.div_euclid(1_000_000_000)).ok()?;
        let nanos = total.rem_euclid(1_000_000_000) as i32;
        Some(Self { seconds, nanos })
    }

    pub fn total_nanos(&self) -> i128 {
        self.seconds as i128 * 1_000_000_000 + self.nanos as i128
    }

    /// True when the timestamp lies within years 0001 through 9999.
    pub fn is_valid(&self) -> bool {
        (MIN_TIMESTAMP_SECONDS..=MAX_TIMESTAMP_SECONDS).contains(&self.seconds)
            && (0..1_000_000_000).contains(&self.nanos)
    }

    pub fn to_datetime_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.seconds, self.nanos as u32)
    }

    pub fn is_before(&self, other: &Timestamp) -> bool {
        self < other
    }

    pub fn is_after(&self, other: &Timestamp) -> bool {
        self > other
    }
}

/// A CEL duration value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Duration {
    pub seconds: i64,
    /// Carries the sign of `seconds` (-999_999_999..=999_999_999).
    pub nanos: i32,
}

impl Duration {
    pub fn new(seconds: i64, nanos: i32) -> Self {
        Self { seconds, nanos }
    }

    pub fn from_seconds(seconds: i64) -> Self {
        Self { seconds, nanos: 0 }
    }

    pub fn from_nanos(nanos: i64) -> Self {
        Self::from_total_nanos(nanos as i128).unwrap_or(Self { seconds: 0, nanos: 0 })
    }

    pub fn from_total_nanos(total: i128) -> Option<Self> {
        let seconds = i64::try_from(total / 1_000_000_000).ok()?;
        let nanos = (total % 1_000_000_000) as i32;
        Some(Self { seconds, nanos })
    }

    pub fn total_nanos(&self) -> i128 {
        self.seconds as i128 * 1_000_000_000 + self.nanos as i128
    }

    /// Total nanoseconds, saturating at the i64 bounds.
    pub fn to_nanos(&self) -> i64 {
        self.seconds
            .saturating_mul(1_000_000_000)
            .saturating_add(self.nanos as i64)
    }

    pub fn is_negative(&self) -> bool {
        self.seconds < 0 || (self.seconds == 0 && self.nanos < 0)
    }

    pub fn is_valid(&self) -> bool {
        (-MAX_DURATION_SECONDS..=MAX_DURATION_SECONDS).contains(&self.seconds)
            && self.nanos.abs() < 1_000_000_000
    }

    pub fn get_hours(&self) -> i64 {
        self.seconds / 3600
    }

    pub fn get_minutes(&self) -> i64 {
        self.seconds / 60
    }

    pub fn get_seconds(&self) -> i64 {
        self.seconds
    }

    pub fn get_milliseconds(&self) -> i64 {
        self.seconds * 1000 + (self.nanos / 1_000_000) as i64
    }
}

/// A CEL type value (runtime representation of types).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeValue {
    /// The type name as it appears in CEL.
    pub name: Arc<str>,
}

impl TypeValue {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self { name: name.into() }
    }

    pub fn null_type() -> Self {
        Self::new("null_type")
    }
    pub fn bool_type() -> Self {
        Self::new("bool")
    }
    pub fn int_type() -> Self {
        Self::new("int")
    }
    pub fn uint_type() -> Self {
        Self::new("uint")
    }
    pub fn double_type() -> Self {
        Self::new("double")
    }
    pub fn string_type() -> Self {
        Self::new("string")
    }
    pub fn bytes_type() -> Self {
        Self::new("bytes")
    }
    pub fn list_type() -> Self {
        Self::new("list")
    }
    pub fn map_type() -> Self {
        Self::new("map")
    }
    pub fn timestamp_type() -> Self {
        Self::new("google.protobuf.Timestamp")
    }
    pub fn duration_type() -> Self {
        Self::new("google.protobuf.Duration")
    }
    pub fn type_type() -> Self {
        Self::new("type")
    }

    /// Capabilities advertised by values of this type.
    pub fn traits(&self) -> Traits {
        Traits::for_type_name(&self.name)
    }
}

/// A CEL map with heterogeneous keys.
#[derive(Debug, Clone, Default)]
pub struct ValueMap {
    entries: BTreeMap<MapKey, Value>,
}

/// CEL allows bool, int, uint, and string as map keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MapKey {
    Bool(bool),
    Int(i64),
    UInt(u64),
    String(Arc<str>),
}

impl MapKey {
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(MapKey::Bool(*b)),
            Value::Int(i) => Some(MapKey::Int(*i)),
            Value::UInt(u) => Some(MapKey::UInt(*u)),
            Value::String(s) => Some(MapKey::String(s.clone())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            MapKey::Bool(b) => Value::Bool(*b),
            MapKey::Int(i) => Value::Int(*i),
            MapKey::UInt(u) => Value::UInt(*u),
            MapKey::String(s) => Value::String(s.clone()),
        }
    }
}

impl From<&str> for MapKey {
    fn from(s: &str) -> Self {
        MapKey::String(Arc::from(s))
    }
}

impl From<i64> for MapKey {
    fn from(i: i64) -> Self {
        MapKey::Int(i)
    }
}

impl ValueMap {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (MapKey, Value)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn get(&self, key: &MapKey) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Looks up a key given as a runtime value.
    ///
    /// Numeric keys match across int, uint and integral double when their
    /// values are equal, so `m[1u]` and `m[1.0]` both find the entry `1`.
    pub fn get_value(&self, key: &Value) -> Option<&Value> {
        if let Some(exact) = MapKey::from_value(key).and_then(|k| self.entries.get(&k)) {
            return Some(exact);
        }
        match key {
            Value::Int(i) => u64::try_from(*i)
                .ok()
                .and_then(|u| self.entries.get(&MapKey::UInt(u))),
            Value::UInt(u) => i64::try_from(*u)
                .ok()
                .and_then(|i| self.entries.get(&MapKey::Int(i))),
            Value::Double(d) if d.fract() == 0.0 && d.is_finite() => {
                let as_int = (*d >= i64::MIN as f64 && *d < i64::MAX as f64)
                    .then(|| self.entries.get(&MapKey::Int(*d as i64)))
                    .flatten();
                as_int.or_else(|| {
                    (*d >= 0.0 && *d < u64::MAX as f64)
                        .then(|| self.entries.get(&MapKey::UInt(*d as u64)))
                        .flatten()
                })
            }
            _ => None,
        }
    }

    pub fn insert(&mut self, key: MapKey, value: Value) {
        self.entries.insert(key, value);
    }

    pub fn contains_key(&self, key: &MapKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MapKey, &Value)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &MapKey> {
        self.entries.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.values()
    }
}

// ==================== Value Constructors ====================

impl Value {
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Value::String(s.into())
    }

    pub fn bytes(b: impl Into<Arc<[u8]>>) -> Self {
        Value::Bytes(b.into())
    }

    pub fn list(elements: impl Into<Arc<[Value]>>) -> Self {
        Value::List(elements.into())
    }

    pub fn map(entries: impl IntoIterator<Item = (MapKey, Value)>) -> Self {
        Value::Map(Arc::new(ValueMap::from_entries(entries)))
    }

    pub fn timestamp(seconds: i64, nanos: i32) -> Self {
        Value::Timestamp(Timestamp::new(seconds, nanos))
    }

    pub fn duration(seconds: i64, nanos: i32) -> Self {
        Value::Duration(Duration::new(seconds, nanos))
    }

    pub fn new_type(name: impl Into<Arc<str>>) -> Self {
        Value::Type(TypeValue::new(name))
    }

    pub fn object(object: impl ObjectValue + 'static) -> Self {
        Value::Object(Arc::new(object))
    }

    pub fn error(err: impl Into<EvalError>) -> Self {
        Value::Error(Arc::new(err.into()))
    }

    /// An unknown originating at expression `id`.
    pub fn unknown(id: ExprId) -> Self {
        Value::Unknown(Arc::new(UnknownSet::new(id)))
    }

    /// The runtime form of a literal constant.
    pub fn from_constant(constant: &CelValue) -> Self {
        match constant {
            CelValue::Null => Value::Null,
            CelValue::Bool(b) => Value::Bool(*b),
            CelValue::Int(i) => Value::Int(*i),
            CelValue::UInt(u) => Value::UInt(*u),
            CelValue::Double(d) => Value::Double(*d),
            CelValue::String(s) => Value::string(s.as_str()),
            CelValue::Bytes(b) => Value::bytes(b.as_slice()),
        }
    }
}

// ==================== Type Information ====================

impl Value {
    pub fn cel_type(&self) -> CelType {
        match self {
            Value::Null => CelType::Null,
            Value::Bool(_) => CelType::Bool,
            Value::Int(_) => CelType::Int,
            Value::UInt(_) => CelType::UInt,
            Value::Double(_) => CelType::Double,
            Value::String(_) => CelType::String,
            Value::Bytes(_) => CelType::Bytes,
            Value::List(_) => CelType::list(CelType::Dyn),
            Value::Map(_) => CelType::map(CelType::Dyn, CelType::Dyn),
            Value::Timestamp(_) => CelType::Timestamp,
            Value::Duration(_) => CelType::Duration,
            Value::Type(_) => CelType::type_of(CelType::Dyn),
            Value::Object(o) => CelType::message(o.type_name()),
            Value::Error(_) => CelType::Error,
            Value::Unknown(_) => CelType::Dyn,
        }
    }

    /// The value returned by `type(x)`.
    pub fn type_value(&self) -> TypeValue {
        match self {
            Value::Null => TypeValue::null_type(),
            Value::Bool(_) => TypeValue::bool_type(),
            Value::Int(_) => TypeValue::int_type(),
            Value::UInt(_) => TypeValue::uint_type(),
            Value::Double(_) => TypeValue::double_type(),
            Value::String(_) => TypeValue::string_type(),
            Value::Bytes(_) => TypeValue::bytes_type(),
            Value::List(_) => TypeValue::list_type(),
            Value::Map(_) => TypeValue::map_type(),
            Value::Timestamp(_) => TypeValue::timestamp_type(),
            Value::Duration(_) => TypeValue::duration_type(),
            Value::Type(_) => TypeValue::type_type(),
            Value::Object(o) => TypeValue::new(o.type_name()),
            Value::Error(_) => TypeValue::new("error"),
            Value::Unknown(_) => TypeValue::new("unknown"),
        }
    }

    /// Name of this value's type, as used in overload error messages.
    pub fn type_name(&self) -> Arc<str> {
        self.type_value().name
    }

    /// Capabilities this value's type declares.
    pub fn traits(&self) -> Traits {
        match self {
            Value::Object(_) => Traits::INDEXER | Traits::FIELD_TESTER,
            Value::Error(_) | Value::Unknown(_) | Value::Null | Value::Type(_) => Traits::empty(),
            other => other.type_value().traits(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Unknown(_))
    }

    /// Error or unknown: values that short-circuit strict operators.
    pub fn is_error_or_unknown(&self) -> bool {
        matches!(self, Value::Error(_) | Value::Unknown(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

// ==================== Value Accessors ====================

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u64> {
        match self {
            Value::UInt(u) => Some(*u),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            Value::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Value::Duration(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&EvalError> {
        match self {
            Value::Error(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_unknown(&self) -> Option<&UnknownSet> {
        match self {
            Value::Unknown(u) => Some(u),
            _ => None,
        }
    }
}

// ==================== Equality ====================

impl Value {
    /// CEL `==`, itself a value.
    ///
    /// Error and unknown operands propagate (left first). Numbers compare
    /// by value across int, uint and double; other kinds that differ are
    /// simply unequal.
    pub fn equal(&self, other: &Value) -> Value {
        match (self, other) {
            (Value::Error(_) | Value::Unknown(_), _) => self.clone(),
            (_, Value::Error(_) | Value::Unknown(_)) => other.clone(),
            _ => Value::Bool(self.equals(other)),
        }
    }

    fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y))
            }
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(key, val_a)| {
                        b.get_value(&key.to_value())
                            .is_some_and(|val_b| val_a.equals(val_b))
                    })
            }
            (Value::Object(a), Value::Object(b)) => a.equal(b.as_ref()),
            _ if self.is_number() && other.is_number() => {
                self.compare(other) == Some(Ordering::Equal)
            }
            _ => self == other,
        }
    }

    pub(crate) fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::UInt(_) | Value::Double(_))
    }
}

/// Structural equality without numeric cross-kind promotion.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::UInt(a), Value::UInt(b)) => a == b,
            // NaN != NaN
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(key, val_a)| b.get(key) == Some(val_a))
            }
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            (Value::Duration(a), Value::Duration(b)) => a == b,
            (Value::Type(a), Value::Type(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.equal(b.as_ref()),
            (Value::Error(a), Value::Error(b)) => a == b,
            (Value::Unknown(a), Value::Unknown(b)) => a == b,
            _ => false,
        }
    }
}

// ==================== Comparison ====================

impl Value {
    /// Ordering between comparable values.
    ///
    /// Values of the same kind compare directly; int, uint and double also
    /// compare with each other by numeric value.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::UInt(a), Value::UInt(b)) => Some(a.cmp(b)),
            (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Bytes(a), Value::Bytes(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            (Value::Duration(a), Value::Duration(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::UInt(b)) => Some(compare_int_uint(*a, *b)),
            (Value::UInt(a), Value::Int(b)) => Some(compare_int_uint(*b, *a).reverse()),
            (Value::Int(a), Value::Double(b)) => compare_int_double(*a, *b),
            (Value::Double(a), Value::Int(b)) => compare_int_double(*b, *a).map(Ordering::reverse),
            (Value::UInt(a), Value::Double(b)) => compare_uint_double(*a, *b),
            (Value::Double(a), Value::UInt(b)) => {
                compare_uint_double(*b, *a).map(Ordering::reverse)
            }
            _ => None,
        }
    }
}

fn compare_int_uint(a: i64, b: u64) -> Ordering {
    if a < 0 {
        Ordering::Less
    } else {
        (a as u64).cmp(&b)
    }
}

fn compare_int_double(a: i64, b: f64) -> Option<Ordering> {
    if b.is_nan() {
        return None;
    }
    if b < i64::MIN as f64 {
        return Some(Ordering::Greater);
    }
    if b >= i64::MAX as f64 {
        return Some(Ordering::Less);
    }
    (a as f64).partial_cmp(&b)
}

fn compare_uint_double(a: u64, b: f64) -> Option<Ordering> {
    if b.is_nan() {
        return None;
    }
    if b < 0.0 {
        return Some(Ordering::Greater);
    }
    if b >= u64::MAX as f64 {
        return Some(Ordering::Less);
    }
    (a as f64).partial_cmp(&b)
}

// ==================== Host Conversions ====================

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(v as i64)
            }
        })*
    };
}

macro_rules! impl_from_uint {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::UInt(v as u64)
            }
        })*
    };
}

impl_from_int!(i8, i16, i32, i64);
impl_from_uint!(u8, u16, u32, u64, usize);

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<Timestamp> for Value {
    fn from(t: Timestamp) -> Self {
        Value::Timestamp(t)
    }
}

impl From<Duration> for Value {
    fn from(d: Duration) -> Self {
        Value::Duration(d)
    }
}

impl From<ValueMap> for Value {
    fn from(m: ValueMap) -> Self {
        Value::Map(Arc::new(m))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<V: Into<Value>> From<std::collections::HashMap<String, V>> for Value {
    fn from(entries: std::collections::HashMap<String, V>) -> Self {
        Value::map(
            entries
                .into_iter()
                .map(|(k, v)| (MapKey::String(Arc::from(k)), v.into())),
        )
    }
}

impl From<EvalError> for Value {
    fn from(e: EvalError) -> Self {
        Value::Error(Arc::new(e))
    }
}

// ==================== Display ====================

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::UInt(v) => write!(f, "{}u", v),
            Value::Double(v) => {
                if v.is_nan() {
                    write!(f, "NaN")
                } else if v.is_infinite() {
                    if v.is_sign_positive() {
                        write!(f, "+infinity")
                    } else {
                        write!(f, "-infinity")
                    }
                } else if v.fract() == 0.0 {
                    write!(f, "{}.0", v)
                } else {
                    write!(f, "{}", v)
                }
            }
            Value::String(v) => write!(f, "{:?}", v),
            Value::Bytes(v) => write!(f, "b\"{}\"", v.escape_ascii()),
            Value::List(v) => {
                write!(f, "[")?;
                for (i, elem) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", elem)?;
                }
                write!(f, "]")
            }
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (key, value)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key.to_value(), value)?;
                }
                write!(f, "}}")
            }
            Value::Timestamp(t) => write!(f, "timestamp(\"{}\")", format_timestamp(t)),
            Value::Duration(d) => write!(f, "duration(\"{}\")", format_duration(d)),
            Value::Type(t) => write!(f, "{}", t.name),
            Value::Object(o) => write!(f, "{}", o),
            Value::Error(e) => write!(f, "error({})", e),
            Value::Unknown(u) => write!(f, "{}", u),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_equality() {
        assert_eq!(Value::Int(42), Value::Int(42));
        assert_ne!(Value::Int(42), Value::Int(43));
        assert_ne!(Value::Int(42), Value::UInt(42));
        assert_eq!(Value::string("hello"), Value::string("hello"));
    }

    #[test]
    fn test_heterogeneous_equal() {
        assert_eq!(Value::Int(1).equal(&Value::Double(1.0)), Value::Bool(true));
        assert_eq!(Value::Int(1).equal(&Value::UInt(1)), Value::Bool(true));
        assert_eq!(Value::Int(-1).equal(&Value::UInt(u64::MAX)), Value::Bool(false));
        assert_eq!(Value::Int(1).equal(&Value::string("1")), Value::Bool(false));
        assert_eq!(
            Value::Double(f64::NAN).equal(&Value::Double(f64::NAN)),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_equal_propagates_unknown_then_error() {
        let unknown = Value::unknown(4);
        let error = Value::error(EvalError::division_by_zero());
        assert_eq!(unknown.equal(&error), unknown);
        assert_eq!(Value::Int(1).equal(&error), error);
    }

    #[test]
    fn test_list_and_map_equal_elementwise() {
        let a = Value::list(vec![Value::Int(1), Value::Double(2.0)]);
        let b = Value::list(vec![Value::UInt(1), Value::Int(2)]);
        assert_eq!(a.equal(&b), Value::Bool(true));

        let m1 = Value::map([(MapKey::Int(1), Value::string("a"))]);
        let m2 = Value::map([(MapKey::UInt(1), Value::string("a"))]);
        assert_eq!(m1.equal(&m2), Value::Bool(true));
    }

    #[test]
    fn test_value_comparison() {
        assert_eq!(Value::Int(1).compare(&Value::Int(2)), Some(Ordering::Less));
        assert_eq!(Value::Int(-1).compare(&Value::UInt(1)), Some(Ordering::Less));
        assert_eq!(
            Value::UInt(u64::MAX).compare(&Value::Int(i64::MAX)),
            Some(Ordering::Greater)
        );
        assert_eq!(
            Value::Int(1).compare(&Value::Double(1.5)),
            Some(Ordering::Less)
        );
        assert_eq!(Value::Int(1).compare(&Value::string("a")), None);
    }

    #[test]
    fn test_numeric_map_lookup() {
        let mut map = ValueMap::new();
        map.insert(MapKey::Int(1), Value::string("one"));
        map.insert(MapKey::from("key"), Value::Int(42));

        assert_eq!(map.get_value(&Value::UInt(1)), Some(&Value::string("one")));
        assert_eq!(map.get_value(&Value::Double(1.0)), Some(&Value::string("one")));
        assert_eq!(map.get_value(&Value::Double(1.5)), None);
        assert_eq!(map.get_value(&Value::string("key")), Some(&Value::Int(42)));
        assert!(!map.contains_key(&MapKey::from("other")));
    }

    #[test]
    fn test_timestamp_range() {
        assert!(Timestamp::new(0, 0).is_valid());
        assert!(Timestamp::new(MAX_TIMESTAMP_SECONDS, 999_999_999).is_valid());
        assert!(!Timestamp::new(MAX_TIMESTAMP_SECONDS + 1, 0).is_valid());
        assert!(Timestamp::new(100, 0).is_before(&Timestamp::new(100, 500)));
    }

    #[test]
    fn test_duration_accessors() {
        let d = Duration::from_nanos(5_400_500_000_000);
        assert_eq!(d.get_hours(), 1);
        assert_eq!(d.get_minutes(), 90);
        assert_eq!(d.get_milliseconds(), 5_400_500);

        let neg = Duration::from_total_nanos(-1_500_000_000).unwrap();
        assert_eq!(neg, Duration::new(-1, -500_000_000));
        assert!(neg.is_negative());
    }

    #[test]
    fn test_traits_by_variant() {
        assert!(Value::Int(1).traits().contains(Traits::NEGATER));
        assert!(Value::Bool(true).traits().contains(Traits::NEGATER));
        assert!(!Value::Bool(true).traits().contains(Traits::INDEXER));
        assert!(Value::list(Vec::<Value>::new()).traits().contains(Traits::ITERABLE));
        assert_eq!(Value::Null.traits(), Traits::empty());
    }

    #[test]
    fn test_host_conversions() {
        assert_eq!(Value::from(42i32), Value::Int(42));
        assert_eq!(Value::from(3usize), Value::UInt(3));
        assert_eq!(
            Value::from(vec!["a", "b"]),
            Value::list(vec![Value::string("a"), Value::string("b")])
        );
        assert_eq!(Value::from(None::<i64>), Value::Null);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::UInt(42).to_string(), "42u");
        assert_eq!(Value::Double(2.0).to_string(), "2.0");
        assert_eq!(Value::string("hello").to_string(), "\"hello\"");
        assert_eq!(Value::duration(90, 0).to_string(), "duration(\"90s\")");
        assert_eq!(Value::unknown(7).to_string(), "unknown{7}");
    }
}
