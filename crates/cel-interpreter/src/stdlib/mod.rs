//! The standard overload table.
//!
//! Every [`Env`](crate::Env) starts with these overloads registered. The
//! operator overloads are restricted by the operand trait the first argument
//! must advertise; the functions check their own operand kinds and return
//! "no such overload" errors for anything else.
//!
//! - arithmetic, logical and comparison operators, indexing and `@in`
//! - `size`, `matches`, `contains`, `startsWith`, `endsWith`
//! - type conversions: `int`, `uint`, `double`, `string`, `bytes`, `bool`,
//!   `timestamp`, `duration`, `type`, `dyn`
//! - timestamp and duration accessors such as `getFullYear` and `getHours`,
//!   with an optional time zone argument

mod functions;
mod operators;
mod time;

use crate::interpreter::Overload;

/// All standard overloads, in registration order.
pub fn standard_overloads() -> Vec<Overload> {
    let mut overloads = operators::overloads();
    overloads.extend(functions::overloads());
    overloads.extend(time::overloads());
    overloads
}
