//! Type providers and adapters.
//!
//! A [`TypeProvider`] answers questions about named types (identifiers,
//! message fields, enum constants) and builds message values for struct
//! construction expressions. A [`TypeAdapter`] turns host values into
//! [`Value`]s. [`TypeRegistry`] implements both for the built-in types plus
//! any message and enum types the host registers.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use cel_ast::CelType;

use super::value::{Duration, MapKey, Timestamp, TypeValue, Value};
use super::EvalError;

/// A value produced by a type provider, such as an instance of a message type.
pub trait ObjectValue: fmt::Debug + fmt::Display + Send + Sync {
    /// Fully qualified type name.
    fn type_name(&self) -> &str;

    /// Reads a field. Unset declared fields yield their zero value; undeclared
    /// fields yield a "no such field" error.
    fn get_field(&self, field: &str) -> Value;

    /// `has(obj.field)`: a bool, or an error for undeclared fields.
    fn is_set(&self, field: &str) -> Value;

    fn equal(&self, other: &dyn ObjectValue) -> bool;

    fn as_any(&self) -> &dyn Any;
}

/// Converts host data into runtime values.
///
/// Adaptation is total: unsupported shapes become error values.
pub trait TypeAdapter: Send + Sync {
    fn native_to_value(&self, native: &dyn Any) -> Value;
}

/// Resolves type names and builds values of named types.
pub trait TypeProvider: TypeAdapter + fmt::Debug {
    /// A value bound to a qualified identifier: a type name or enum constant.
    fn find_ident(&self, name: &str) -> Option<Value>;

    fn find_type(&self, name: &str) -> Option<CelType>;

    fn find_field_type(&self, type_name: &str, field: &str) -> Option<CelType>;

    /// Builds an instance of `type_name`. Failures are error values.
    fn new_value(&self, type_name: &str, fields: Vec<(Arc<str>, Value)>) -> Value;

    /// The integer value of a qualified enum constant.
    fn enum_value(&self, name: &str) -> Value;
}

const TIMESTAMP_TYPE: &str = "google.protobuf.Timestamp";
const DURATION_TYPE: &str = "google.protobuf.Duration";

const BUILTIN_TYPES: [(&str, CelType); 10] = [
    ("bool", CelType::Bool),
    ("int", CelType::Int),
    ("uint", CelType::UInt),
    ("double", CelType::Double),
    ("string", CelType::String),
    ("bytes", CelType::Bytes),
    ("null_type", CelType::Null),
    ("dyn", CelType::Dyn),
    (TIMESTAMP_TYPE, CelType::Timestamp),
    (DURATION_TYPE, CelType::Duration),
];

/// Declared shape of a registered message type.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageType {
    name: Arc<str>,
    fields: BTreeMap<Arc<str>, CelType>,
}

impl MessageType {
    pub fn new<'a>(name: &str, fields: impl IntoIterator<Item = (&'a str, CelType)>) -> Self {
        Self {
            name: Arc::from(name),
            fields: fields
                .into_iter()
                .map(|(field, ty)| (Arc::from(field), ty))
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self, field: &str) -> Option<&CelType> {
        self.fields.get(field)
    }
}

/// An instance of a registered message type.
#[derive(Debug, Clone)]
pub struct StructValue {
    message: Arc<MessageType>,
    values: BTreeMap<Arc<str>, Value>,
}

impl StructValue {
    pub fn message_type(&self) -> &MessageType {
        &self.message
    }
}

impl ObjectValue for StructValue {
    fn type_name(&self) -> &str {
        self.message.name()
    }

    fn get_field(&self, field: &str) -> Value {
        if let Some(value) = self.values.get(field) {
            return value.clone();
        }
        match self.message.field_type(field) {
            Some(ty) => zero_value(ty),
            None => Value::error(EvalError::no_such_field(field)),
        }
    }

    fn is_set(&self, field: &str) -> Value {
        if self.message.field_type(field).is_none() {
            return Value::error(EvalError::no_such_field(field));
        }
        Value::Bool(self.values.contains_key(field))
    }

    fn equal(&self, other: &dyn ObjectValue) -> bool {
        let Some(other) = other.as_any().downcast_ref::<StructValue>() else {
            return false;
        };
        self.message.name == other.message.name
            && self.message.fields.keys().all(|field| {
                self.get_field(field).equal(&other.get_field(field)) == Value::Bool(true)
            })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Display for StructValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{", self.message.name)?;
        for (i, (field, value)) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", field, value)?;
        }
        write!(f, "}}")
    }
}

/// The value an unset field of type `ty` reads as.
pub fn zero_value(ty: &CelType) -> Value {
    match ty {
        CelType::Bool => Value::Bool(false),
        CelType::Int | CelType::Enum(_) => Value::Int(0),
        CelType::UInt => Value::UInt(0),
        CelType::Double => Value::Double(0.0),
        CelType::String => Value::string(""),
        CelType::Bytes => Value::bytes(Vec::<u8>::new()),
        CelType::List(_) => Value::list(Vec::<Value>::new()),
        CelType::Map(_, _) => Value::map([]),
        CelType::Timestamp => Value::timestamp(0, 0),
        CelType::Duration => Value::duration(0, 0),
        _ => Value::Null,
    }
}

/// Built-in types plus host-registered messages and enums.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    messages: HashMap<String, Arc<MessageType>>,
    enums: HashMap<String, i64>,
    enum_types: HashMap<String, Vec<(String, i64)>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_message(&mut self, message: MessageType) {
        self.messages
            .insert(message.name().to_string(), Arc::new(message));
    }

    /// Registers `name` as an enum type; each constant becomes the
    /// identifier `name.CONSTANT`.
    pub fn register_enum(&mut self, name: &str, constants: &[(&str, i64)]) {
        for (constant, value) in constants {
            self.enums.insert(format!("{}.{}", name, constant), *value);
        }
        self.enum_types.insert(
            name.to_string(),
            constants
                .iter()
                .map(|(c, v)| (c.to_string(), *v))
                .collect(),
        );
    }

    pub fn with_message(mut self, message: MessageType) -> Self {
        self.register_message(message);
        self
    }

    pub fn with_enum(mut self, name: &str, constants: &[(&str, i64)]) -> Self {
        self.register_enum(name, constants);
        self
    }

    fn new_timestamp(fields: &[(Arc<str>, Value)]) -> Value {
        let mut ts = Timestamp::new(0, 0);
        for (field, value) in fields {
            match (field.as_ref(), value) {
                ("seconds", Value::Int(s)) => ts.seconds = *s,
                ("nanos", Value::Int(n)) => match i32::try_from(*n) {
                    Ok(n) => ts.nanos = n,
                    Err(_) => return Value::error(EvalError::overflow("nanos out of range")),
                },
                ("seconds" | "nanos", other) => {
                    return Value::error(EvalError::invalid_argument(format!(
                        "field '{}' expects int, got {}",
                        field,
                        other.type_name()
                    )))
                }
                _ => return Value::error(EvalError::no_such_field(field)),
            }
        }
        if !ts.is_valid() {
            return Value::error(EvalError::overflow("timestamp out of range"));
        }
        Value::Timestamp(ts)
    }

    fn new_duration(fields: &[(Arc<str>, Value)]) -> Value {
        let mut d = Duration::new(0, 0);
        for (field, value) in fields {
            match (field.as_ref(), value) {
                ("seconds", Value::Int(s)) => d.seconds = *s,
                ("nanos", Value::Int(n)) => match i32::try_from(*n) {
                    Ok(n) => d.nanos = n,
                    Err(_) => return Value::error(EvalError::overflow("nanos out of range")),
                },
                ("seconds" | "nanos", other) => {
                    return Value::error(EvalError::invalid_argument(format!(
                        "field '{}' expects int, got {}",
                        field,
                        other.type_name()
                    )))
                }
                _ => return Value::error(EvalError::no_such_field(field)),
            }
        }
        if !d.is_valid() {
            return Value::error(EvalError::overflow("duration out of range"));
        }
        Value::Duration(d)
    }
}

impl TypeAdapter for TypeRegistry {
    fn native_to_value(&self, native: &dyn Any) -> Value {
        if let Some(v) = native.downcast_ref::<Value>() {
            return v.clone();
        }
        if let Some(b) = native.downcast_ref::<bool>() {
            return Value::Bool(*b);
        }
        if let Some(i) = native.downcast_ref::<i64>() {
            return Value::Int(*i);
        }
        if let Some(i) = native.downcast_ref::<i32>() {
            return Value::Int(*i as i64);
        }
        if let Some(u) = native.downcast_ref::<u64>() {
            return Value::UInt(*u);
        }
        if let Some(d) = native.downcast_ref::<f64>() {
            return Value::Double(*d);
        }
        if let Some(s) = native.downcast_ref::<String>() {
            return Value::string(s.as_str());
        }
        if let Some(s) = native.downcast_ref::<&str>() {
            return Value::string(*s);
        }
        if let Some(b) = native.downcast_ref::<Vec<u8>>() {
            return Value::bytes(b.as_slice());
        }
        if let Some(list) = native.downcast_ref::<Vec<Value>>() {
            return Value::list(list.clone());
        }
        if let Some(map) = native.downcast_ref::<HashMap<String, Value>>() {
            return Value::map(
                map.iter()
                    .map(|(k, v)| (MapKey::from(k.as_str()), v.clone())),
            );
        }
        Value::error(EvalError::invalid_conversion("native value", "cel value"))
    }
}

impl TypeProvider for TypeRegistry {
    fn find_ident(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.enums.get(name) {
            return Some(Value::Int(*value));
        }
        match name {
            "list" | "map" | "type" => return Some(Value::Type(TypeValue::new(name))),
            _ => {}
        }
        if BUILTIN_TYPES.iter().any(|(n, _)| *n == name)
            || self.messages.contains_key(name)
            || self.enum_types.contains_key(name)
        {
            return Some(Value::Type(TypeValue::new(name)));
        }
        None
    }

    fn find_type(&self, name: &str) -> Option<CelType> {
        if let Some((_, ty)) = BUILTIN_TYPES.iter().find(|(n, _)| *n == name) {
            return Some(ty.clone());
        }
        if self.messages.contains_key(name) {
            return Some(CelType::message(name));
        }
        if self.enum_types.contains_key(name) {
            return Some(CelType::enum_type(name));
        }
        None
    }

    fn find_field_type(&self, type_name: &str, field: &str) -> Option<CelType> {
        match (type_name, field) {
            (TIMESTAMP_TYPE | DURATION_TYPE, "seconds") => Some(CelType::Int),
            (TIMESTAMP_TYPE | DURATION_TYPE, "nanos") => Some(CelType::Int),
            _ => self
                .messages
                .get(type_name)
                .and_then(|m| m.field_type(field).cloned()),
        }
    }

    fn new_value(&self, type_name: &str, fields: Vec<(Arc<str>, Value)>) -> Value {
        match type_name {
            TIMESTAMP_TYPE => return Self::new_timestamp(&fields),
            DURATION_TYPE => return Self::new_duration(&fields),
            _ => {}
        }
        let Some(message) = self.messages.get(type_name) else {
            return Value::error(EvalError::invalid_argument(format!(
                "unknown type: {}",
                type_name
            )));
        };
        let mut values = BTreeMap::new();
        for (field, value) in fields {
            if message.field_type(&field).is_none() {
                return Value::error(EvalError::no_such_field(&field));
            }
            values.insert(field, value);
        }
        Value::object(StructValue {
            message: Arc::clone(message),
            values,
        })
    }

    fn enum_value(&self, name: &str) -> Value {
        match self.enums.get(name) {
            Some(v) => Value::Int(*v),
            None => Value::error(EvalError::unknown_identifier(name)),
        }
    }
}
