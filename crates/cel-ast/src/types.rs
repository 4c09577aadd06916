//! Static CEL types as recorded in a checked AST's type map.

use std::fmt;
use std::sync::Arc;

/// The type a checker assigned to an expression node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CelType {
    Bool,
    Int,
    UInt,
    Double,
    String,
    Bytes,
    /// `list<T>`
    List(Arc<CelType>),
    /// `map<K, V>`
    Map(Arc<CelType>, Arc<CelType>),
    Timestamp,
    Duration,
    Null,
    Dyn,
    /// `type(T)`
    Type(Arc<CelType>),
    /// Message type by fully qualified name
    Message(Arc<str>),
    /// Enum type by fully qualified name
    Enum(Arc<str>),
    Error,
}

impl CelType {
    pub fn list(elem: CelType) -> Self {
        CelType::List(Arc::new(elem))
    }

    pub fn map(key: CelType, value: CelType) -> Self {
        CelType::Map(Arc::new(key), Arc::new(value))
    }

    pub fn type_of(inner: CelType) -> Self {
        CelType::Type(Arc::new(inner))
    }

    pub fn message(name: &str) -> Self {
        CelType::Message(Arc::from(name))
    }

    pub fn enum_type(name: &str) -> Self {
        CelType::Enum(Arc::from(name))
    }

    /// Returns true if this is a numeric type (int, uint, or double).
    pub fn is_numeric(&self) -> bool {
        matches!(self, CelType::Int | CelType::UInt | CelType::Double)
    }

    /// Returns true when the checker could not narrow the node below `dyn`.
    pub fn is_dyn(&self) -> bool {
        matches!(self, CelType::Dyn | CelType::Error)
    }

    /// The canonical CEL spelling of this type, as shown in error messages.
    pub fn display_name(&self) -> String {
        match self {
            CelType::List(elem) => format!("list<{}>", elem.display_name()),
            CelType::Map(key, val) => {
                format!("map<{}, {}>", key.display_name(), val.display_name())
            }
            CelType::Type(inner) => format!("type({})", inner.display_name()),
            CelType::Message(name) | CelType::Enum(name) => name.to_string(),
            other => other.base_name().to_string(),
        }
    }

    /// The type name without parameters (`list` rather than `list<int>`).
    pub fn base_name(&self) -> &'static str {
        match self {
            CelType::Bool => "bool",
            CelType::Int => "int",
            CelType::UInt => "uint",
            CelType::Double => "double",
            CelType::String => "string",
            CelType::Bytes => "bytes",
            CelType::List(_) => "list",
            CelType::Map(_, _) => "map",
            CelType::Timestamp => "google.protobuf.Timestamp",
            CelType::Duration => "google.protobuf.Duration",
            CelType::Null => "null_type",
            CelType::Dyn => "dyn",
            CelType::Type(_) => "type",
            CelType::Message(_) => "message",
            CelType::Enum(_) => "int",
            CelType::Error => "error",
        }
    }
}

impl fmt::Display for CelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
