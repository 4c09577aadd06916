//! Capability markers advertised by value types.
//!
//! Trait-restricted overloads consult these before dispatching; a value whose
//! type lacks the required trait yields a "no such overload" error.

use bitflags::bitflags;

bitflags! {
    /// Operations a value type supports.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct Traits: u16 {
        /// `_+_`
        const ADDER = 1 << 0;
        /// `_-_`
        const SUBTRACTOR = 1 << 1;
        /// `_*_`
        const MULTIPLIER = 1 << 2;
        /// `_/_`
        const DIVIDER = 1 << 3;
        /// `_%_`
        const MODDER = 1 << 4;
        /// `-_` and `!_`
        const NEGATER = 1 << 5;
        /// `_<_`, `_<=_`, `_>_`, `_>=_`
        const COMPARER = 1 << 6;
        /// `_[_]` and field selection on maps.
        const INDEXER = 1 << 7;
        /// `size`
        const SIZER = 1 << 8;
        /// Comprehension ranges.
        const ITERABLE = 1 << 9;
        /// Right operand of `@in`.
        const CONTAINER = 1 << 10;
        /// `matches`
        const MATCHER = 1 << 11;
        /// Receiver-style function calls (`ts.getHours()`).
        const RECEIVER = 1 << 12;
        /// Presence tests with `has()`.
        const FIELD_TESTER = 1 << 13;
    }
}

impl Traits {
    /// Traits of a built-in type, looked up by its CEL type name.
    pub fn for_type_name(name: &str) -> Traits {
        match name {
            "bool" => Traits::COMPARER | Traits::NEGATER,
            "int" => {
                Traits::ADDER
                    | Traits::SUBTRACTOR
                    | Traits::MULTIPLIER
                    | Traits::DIVIDER
                    | Traits::MODDER
                    | Traits::NEGATER
                    | Traits::COMPARER
            }
            "uint" => {
                Traits::ADDER
                    | Traits::SUBTRACTOR
                    | Traits::MULTIPLIER
                    | Traits::DIVIDER
                    | Traits::MODDER
                    | Traits::COMPARER
            }
            "double" => {
                Traits::ADDER
                    | Traits::SUBTRACTOR
                    | Traits::MULTIPLIER
                    | Traits::DIVIDER
                    | Traits::NEGATER
                    | Traits::COMPARER
            }
            "string" => {
                Traits::ADDER
                    | Traits::COMPARER
                    | Traits::MATCHER
                    | Traits::RECEIVER
                    | Traits::SIZER
            }
            "bytes" => Traits::ADDER | Traits::COMPARER | Traits::SIZER,
            "list" => {
                Traits::ADDER
                    | Traits::CONTAINER
                    | Traits::INDEXER
                    | Traits::ITERABLE
                    | Traits::SIZER
            }
            "map" => {
                Traits::CONTAINER
                    | Traits::INDEXER
                    | Traits::ITERABLE
                    | Traits::SIZER
                    | Traits::FIELD_TESTER
            }
            "google.protobuf.Duration" => {
                Traits::ADDER
                    | Traits::SUBTRACTOR
                    | Traits::NEGATER
                    | Traits::COMPARER
                    | Traits::RECEIVER
            }
            "google.protobuf.Timestamp" => {
                Traits::ADDER | Traits::SUBTRACTOR | Traits::COMPARER | Traits::RECEIVER
            }
            _ => Traits::empty(),
        }
    }
}
