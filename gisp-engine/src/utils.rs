//! Convenience constructors for building forms from Rust.

use smol_str::SmolStr;

use crate::handle::Handle;
use crate::value::{Pair, Value};

#[inline]
pub fn nil() -> Value {
    Value::Empty
}

pub fn cons(first: impl Into<Value>, rest: impl Into<Value>) -> Value {
    Value::Pair(Handle::new(Pair::new(first.into(), rest.into())))
}

pub fn sym(name: impl Into<SmolStr>) -> Value {
    Value::Symbol(name.into())
}

/// Proper list from a slice of values.
pub fn list(items: &[Value]) -> Value {
    Value::list(items)
}
