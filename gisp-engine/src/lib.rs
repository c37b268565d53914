mod core;
mod cursor;
mod env;
pub mod error;
mod eval;
mod frame;
pub mod gisp;
mod handle;
mod lexer;
mod parser;
mod quasi;
mod repr;
mod span;
mod token;
mod token_stream;
pub mod utils;
mod value;

pub use self::env::Env;
pub use self::eval::Interp;
pub use self::handle::Handle;
pub use self::parser::parse;
pub use self::repr::ValueRepr;
pub use self::span::Span;
pub use self::value::{Continuation, Lambda, NativeFunc, Pair, Primitive, Value};

/// Create a new interpreter loaded with the core library and the
/// prelude macros.
pub fn new_interp() -> error::Result<Interp> {
    Interp::new()
}
