//! Token stream.

use crate::error::{Error, Result};
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

/// One-token lookahead over the lexer.
pub struct TokenStream<'a> {
    lexer: Lexer<'a>,
    peeked: Option<Token>,
    /// Byte offset one past the last consumed token.
    last_end: usize,
}

impl<'a> TokenStream<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            lexer: Lexer::new(source),
            peeked: None,
            last_end: 0,
        }
    }

    /// Byte offset one past the last token returned by
    /// [`TokenStream::next_token`]. Lookahead does not move it.
    #[inline]
    pub fn offset(&self) -> usize {
        self.last_end
    }

    #[inline]
    pub fn source(&self) -> &'a str {
        self.lexer.source()
    }

    fn fill(&mut self) -> Result<()> {
        if self.peeked.is_none() {
            self.peeked = Some(self.lexer.next_token()?);
        }
        Ok(())
    }

    /// Return the next token without advancing the cursor.
    pub fn peek(&mut self) -> Result<&Token> {
        self.fill()?;
        Ok(self.peeked.as_ref().expect("lookahead was just filled"))
    }

    /// Return the next token kind without advancing the cursor.
    #[inline]
    pub fn peek_kind(&mut self) -> Result<TokenKind> {
        Ok(self.peek()?.kind)
    }

    /// Return the next token and advance the cursor. At the end of the
    /// source this yields `EOF` tokens forever.
    pub fn next_token(&mut self) -> Result<Token> {
        self.fill()?;
        let token = self.peeked.take().expect("lookahead was just filled");
        self.last_end = token.span.high();
        Ok(token)
    }

    /// Return the next token and advance the cursor.
    ///
    /// The consumed token must match the given token type, otherwise
    /// a read error is returned. Running out of input instead is an
    /// incomplete-input error.
    pub fn consume(&mut self, token_kind: TokenKind) -> Result<Token> {
        let token = self.peek()?;
        if token.kind == token_kind {
            self.next_token()
        } else if token.kind == TokenKind::EOF {
            Err(Error::reader_incomplete(format!(
                "expected {token_kind:?} but the input ended"
            )))
        } else {
            Err(Error::reader(
                format!("expected {:?}, found {:?}", token_kind, token.kind),
                Some(token.span),
            ))
        }
    }

    #[inline]
    pub fn at_end(&mut self) -> Result<bool> {
        Ok(self.peek_kind()? == TokenKind::EOF)
    }
}
