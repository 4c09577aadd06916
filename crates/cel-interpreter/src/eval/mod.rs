//! The runtime value model.
//!
//! - `Value` and its capability [`Traits`]
//! - operator implementations, conversions and time handling
//! - `Activation`s that bind variables for one evaluation
//! - `TypeProvider`s that resolve named types and build objects

mod activation;
mod convert;
mod error;
mod ops;
mod provider;
pub mod time;
mod traits;
mod unknown;
mod value;

pub use activation::{
    Activation, EmptyActivation, HierarchicalActivation, MapActivation, PartialActivation,
};
pub(crate) use convert::format_double;
pub use convert::FromValue;
pub use error::{EvalError, EvalErrorKind};
pub use provider::{
    zero_value, MessageType, ObjectValue, StructValue, TypeAdapter, TypeProvider, TypeRegistry,
};
pub use traits::Traits;
pub use unknown::UnknownSet;
pub use value::{Duration, MapKey, Timestamp, TypeValue, Value, ValueMap};
