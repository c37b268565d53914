//! Token definition.

use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    LeftParen,
    RightParen,
    /// `'`
    QuoteMark,
    /// `` ` ``
    Quasiquote,
    /// `,`
    Unquote,
    /// `,@`
    UnquoteSplicing,
    /// `#(`
    VectorOpen,
    /// Double-quoted string, span includes the quotes.
    String,
    /// Number, symbol, `#t`/`#f` or the dot keyword; the parser
    /// classifies atoms by their text.
    Atom,
    EOF,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    /// The slice of source text this token covers.
    pub fn fragment<'a>(&self, source: &'a str) -> &'a str {
        &source[self.span.as_range()]
    }
}
