//! Lexical analysis for the s-expression reader.
use log::trace;

use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::token::{Token, TokenKind};

pub struct Lexer<'a> {
    cursor: Cursor<'a>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer from the given source code.
    pub fn new(source: &'a str) -> Self {
        Self {
            cursor: Cursor::new(source),
        }
    }

    /// Original source passed into the lexer.
    #[inline]
    pub fn source(&self) -> &'a str {
        self.cursor.source()
    }

    /// Close the token begun at the current atom's first character.
    /// The cursor must be looking at the token's last character.
    fn make_token(&mut self, kind: TokenKind) -> Token {
        let span = self.cursor.take_span();
        let token = Token { kind, span };

        trace!(
            "make_token() -> {:?} {:?}",
            token,
            token.fragment(self.cursor.source())
        );

        token
    }

    /// Scan the source characters and construct the next token. At the
    /// end of the source this yields `EOF` tokens forever.
    pub fn next_token(&mut self) -> Result<Token> {
        // Shorter name for more readable match body.
        use TokenKind as T;

        loop {
            match self.cursor.ch() {
                Some(ch) if ch.is_whitespace() => {
                    self.cursor.advance();
                    continue;
                }
                Some(';') => {
                    self.skip_line();
                    continue;
                }
                _ => {}
            }

            self.cursor.begin();

            let token = match self.cursor.ch() {
                Some('(') => self.make_token(T::LeftParen),
                Some(')') => self.make_token(T::RightParen),
                Some('\'') => self.make_token(T::QuoteMark),
                Some('`') => self.make_token(T::Quasiquote),
                Some(',') => {
                    if self.cursor.lookahead() == Some('@') {
                        self.cursor.advance();
                        self.make_token(T::UnquoteSplicing)
                    } else {
                        self.make_token(T::Unquote)
                    }
                }
                Some('"') => self.consume_string()?,
                Some('#') if self.cursor.lookahead() == Some('(') => {
                    self.cursor.advance();
                    self.make_token(T::VectorOpen)
                }
                Some(_) => self.consume_atom(),
                None => self.make_token(T::EOF),
            };

            return Ok(token);
        }
    }

    /// Skip over the remainder of a line, until we encounter a newline
    /// character, or reach the end of the stream.
    fn skip_line(&mut self) {
        while let Some(ch) = self.cursor.ch() {
            if ch == '\n' {
                break;
            }
            self.cursor.advance();
        }
    }

    /// Consume until whitespace or a delimiter.
    fn consume_atom(&mut self) -> Token {
        while let Some(ch) = self.cursor.lookahead() {
            if ch.is_whitespace() || rules::is_delimiter(ch) {
                break;
            }
            self.cursor.advance();
        }

        self.make_token(TokenKind::Atom)
    }

    /// Consume a double-quoted string, including both quotes.
    ///
    /// Escaped characters are skipped over here and decoded by the
    /// parser.
    ///
    /// # Errors
    ///
    /// An unterminated string is an incomplete-input read error, so the
    /// REPL can prompt for the rest.
    fn consume_string(&mut self) -> Result<Token> {
        debug_assert_eq!(self.cursor.ch(), Some('"'));

        loop {
            match self.cursor.advance() {
                Some('\\') => {
                    if self.cursor.advance().is_none() {
                        return Err(Error::reader_incomplete("unterminated string"));
                    }
                }
                Some('"') => return Ok(self.make_token(TokenKind::String)),
                Some(_) => continue,
                None => return Err(Error::reader_incomplete("unterminated string")),
            }
        }
    }
}

/// Functions for testing characters.
mod rules {
    /// Characters that terminate an atom.
    #[inline(always)]
    pub fn is_delimiter(c: char) -> bool {
        matches!(c, '(' | ')' | '"' | ';' | '\'' | '`' | ',')
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(source);
        let mut kinds = Vec::new();
        loop {
            let token = lexer.next_token().expect("lex failed");
            let done = token.kind == TokenKind::EOF;
            kinds.push(token.kind);
            if done {
                break;
            }
        }
        kinds
    }

    #[test]
    fn test_lexer_pos() {
        let mut lexer = Lexer::new("(a b)");
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::LeftParen);
        let a = lexer.next_token().unwrap();
        assert_eq!(a.kind, TokenKind::Atom);
        assert_eq!(a.fragment(lexer.source()), "a");
        let b = lexer.next_token().unwrap();
        assert_eq!(b.fragment(lexer.source()), "b");
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::RightParen);
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::EOF);
    }

    #[test]
    fn test_quote_sugar() {
        use TokenKind as T;
        assert_eq!(
            kinds("'a `b ,c ,@d"),
            vec![
                T::QuoteMark,
                T::Atom,
                T::Quasiquote,
                T::Atom,
                T::Unquote,
                T::Atom,
                T::UnquoteSplicing,
                T::Atom,
                T::EOF
            ]
        );
    }

    #[test]
    fn test_comments_skipped() {
        use TokenKind as T;
        assert_eq!(kinds("a ; the rest\nb"), vec![T::Atom, T::Atom, T::EOF]);
    }

    #[test]
    fn test_string_token() {
        let mut lexer = Lexer::new(r#""ab \" c" x"#);
        let token = lexer.next_token().unwrap();
        assert_eq!(token.kind, TokenKind::String);
        assert_eq!(token.fragment(lexer.source()), r#""ab \" c""#);
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Atom);
    }

    #[test]
    fn test_unterminated_string() {
        let mut lexer = Lexer::new("\"abc");
        let err = lexer.next_token().unwrap_err();
        assert!(err.is_incomplete());
    }

    #[test]
    fn test_vector_open() {
        use TokenKind as T;
        assert_eq!(
            kinds("#(1) #t"),
            vec![T::VectorOpen, T::Atom, T::RightParen, T::Atom, T::EOF]
        );
    }
}
