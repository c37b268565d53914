use smol_str::SmolStr;
use thiserror::Error;

use crate::span::Span;

pub type Result<T> = std::result::Result<T, self::Error>;

/// All failure modes of the runtime.
///
/// Every error aborts the current evaluation and unwinds to the caller;
/// nothing in the core catches. Side effects performed before the error
/// (mutated cells, bindings, output) remain visible.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed s-expression text.
    #[error("read error: {message}")]
    Reader {
        message: String,
        span: Option<Span>,
        /// The input ended mid-form; more text may complete it.
        incomplete: bool,
    },

    /// Malformed Gisp surface text.
    #[error("parse error: {message}")]
    Parser {
        message: String,
        span: Option<Span>,
        incomplete: bool,
    },

    /// Malformed special form: wrong arity, wrong shape, misplaced
    /// `else`, non-symbol parameter, improper argument list.
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("unbound variable {0:?}")]
    Unbound(SmolStr),

    #[error("type error: {0}")]
    Type(String),

    #[error("arity error: {0}")]
    Arity(String),

    #[error("range error: {0}")]
    Range(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised by the `error` primitive.
    #[error("{0}")]
    User(String),
}

impl Error {
    pub(crate) fn reader(message: impl Into<String>, span: Option<Span>) -> Self {
        Error::Reader {
            message: message.into(),
            span,
            incomplete: false,
        }
    }

    pub(crate) fn reader_incomplete(message: impl Into<String>) -> Self {
        Error::Reader {
            message: message.into(),
            span: None,
            incomplete: true,
        }
    }

    pub(crate) fn parser(message: impl Into<String>, span: Option<Span>) -> Self {
        Error::Parser {
            message: message.into(),
            span,
            incomplete: false,
        }
    }

    pub(crate) fn parser_incomplete(message: impl Into<String>) -> Self {
        Error::Parser {
            message: message.into(),
            span: None,
            incomplete: true,
        }
    }

    /// Source position of a read or parse error, when one was recorded.
    pub fn span(&self) -> Option<Span> {
        match self {
            Error::Reader { span, .. } | Error::Parser { span, .. } => *span,
            _ => None,
        }
    }

    /// True when the input ended before a form was closed. The REPL uses
    /// this to keep reading lines instead of reporting the error.
    pub fn is_incomplete(&self) -> bool {
        matches!(
            self,
            Error::Reader {
                incomplete: true,
                ..
            } | Error::Parser {
                incomplete: true,
                ..
            }
        )
    }
}
