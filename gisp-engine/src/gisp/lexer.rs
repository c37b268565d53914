//! Lexical analysis for the Gisp surface.
//!
//! Statements end at newlines Go-style: a semicolon token is inserted
//! automatically when a line ends after a token that can close a
//! statement.

use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::span::Span;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Tok {
    Ident(String),
    Int(i64),
    Real(f64),
    Str(String),
    /// Backtick-quoted inline s-expression, read eagerly.
    Sexpr(Value),

    // Keywords
    Func,
    Var,
    Const,
    If,
    Else,
    While,
    Return,
    Break,
    Continue,
    Switch,
    Case,
    Default,
    True,
    False,
    Nil,

    // Punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    /// `#[`, opening a vector literal.
    HashBracket,
    Comma,
    Semi,
    Colon,

    // Operators
    Assign,
    EqEq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Shl,
    Shr,
    Amp,
    Pipe,
    Caret,
    AmpCaret,
    AndAnd,
    OrOr,
    Bang,
    PlusPlus,
    MinusMinus,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,
    ShlEq,
    ShrEq,
    AmpEq,
    PipeEq,
    CaretEq,
    AmpCaretEq,

    Eof,
}

impl Tok {
    /// Can this token end a statement? Newlines after such tokens
    /// become semicolons.
    fn ends_statement(&self) -> bool {
        matches!(
            self,
            Tok::Ident(_)
                | Tok::Int(_)
                | Tok::Real(_)
                | Tok::Str(_)
                | Tok::Sexpr(_)
                | Tok::True
                | Tok::False
                | Tok::Nil
                | Tok::Return
                | Tok::Break
                | Tok::Continue
                | Tok::RParen
                | Tok::RBracket
                | Tok::RBrace
                | Tok::PlusPlus
                | Tok::MinusMinus
        )
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Token {
    pub(crate) tok: Tok,
    pub(crate) span: Span,
}

pub(crate) fn lex(source: &str) -> Result<Vec<Token>> {
    Lexer::new(source).run()
}

struct Lexer<'a> {
    cursor: Cursor<'a>,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            cursor: Cursor::new(source),
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>> {
        loop {
            let ch = match self.cursor.ch() {
                Some(ch) => ch,
                None => {
                    self.cursor.begin();
                    let span = self.cursor.take_span();
                    self.tokens.push(Token {
                        tok: Tok::Eof,
                        span,
                    });
                    return Ok(self.tokens);
                }
            };

            match ch {
                '\n' => {
                    self.insert_semicolon();
                    self.cursor.advance();
                }
                _ if ch.is_whitespace() => {
                    self.cursor.advance();
                }
                '/' if self.cursor.lookahead() == Some('/') => {
                    // Line comment; leave the newline for semicolon
                    // insertion.
                    while let Some(next) = self.cursor.ch() {
                        if next == '\n' {
                            break;
                        }
                        self.cursor.advance();
                    }
                }
                '(' => self.single(Tok::LParen),
                ')' => self.single(Tok::RParen),
                '{' => self.single(Tok::LBrace),
                '}' => self.single(Tok::RBrace),
                '[' => self.single(Tok::LBracket),
                ']' => self.single(Tok::RBracket),
                ',' => self.single(Tok::Comma),
                ';' => self.single(Tok::Semi),
                ':' => self.single(Tok::Colon),
                '#' if self.cursor.lookahead() == Some('[') => {
                    self.cursor.begin();
                    self.cursor.advance();
                    let span = self.cursor.take_span();
                    self.tokens.push(Token {
                        tok: Tok::HashBracket,
                        span,
                    });
                }
                '"' => self.consume_string()?,
                '`' => self.consume_sexpr()?,
                _ if ch.is_ascii_digit() => self.consume_number(ch)?,
                _ if ch.is_alphabetic() || ch == '_' => self.consume_ident(ch),
                _ => self.consume_operator(ch)?,
            }
        }
    }

    /// Emit a single-character token and advance.
    fn single(&mut self, tok: Tok) {
        self.cursor.begin();
        let span = self.cursor.take_span();
        self.tokens.push(Token { tok, span });
    }

    /// Automatic semicolon insertion at a line end.
    fn insert_semicolon(&mut self) {
        if let Some(last) = self.tokens.last() {
            if last.tok.ends_statement() {
                let span = Span::new(self.cursor.offset(), 0);
                self.tokens.push(Token {
                    tok: Tok::Semi,
                    span,
                });
            }
        }
    }

    fn consume_string(&mut self) -> Result<()> {
        self.cursor.begin();
        let mut text = String::new();
        loop {
            match self.cursor.advance() {
                Some('"') => break,
                Some('\\') => match self.cursor.advance() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some(other) => text.push(other),
                    None => return Err(Error::parser_incomplete("unterminated string")),
                },
                Some(ch) => text.push(ch),
                None => return Err(Error::parser_incomplete("unterminated string")),
            }
        }
        let span = self.cursor.take_span();
        self.tokens.push(Token {
            tok: Tok::Str(text),
            span,
        });
        Ok(())
    }

    /// A backtick-delimited s-expression, handed to the reader whole.
    fn consume_sexpr(&mut self) -> Result<()> {
        self.cursor.begin();
        let mut text = String::new();
        loop {
            match self.cursor.advance() {
                Some('`') => break,
                Some(ch) => text.push(ch),
                None => {
                    return Err(Error::parser_incomplete(
                        "unterminated s-expression literal",
                    ))
                }
            }
        }
        let span = self.cursor.take_span();

        let mut forms = crate::parser::parse(&text)?;
        if forms.len() != 1 {
            return Err(Error::parser(
                "s-expression literal must contain exactly one form",
                Some(span),
            ));
        }
        self.tokens.push(Token {
            tok: Tok::Sexpr(forms.remove(0)),
            span,
        });
        Ok(())
    }

    fn consume_number(&mut self, first: char) -> Result<()> {
        self.cursor.begin();
        let mut text = String::new();
        let mut is_real = false;

        text.push(first);
        while let Some(next) = self.cursor.lookahead() {
            match next {
                '0'..='9' => {
                    text.push(next);
                    self.cursor.advance();
                }
                '.' if !is_real => {
                    is_real = true;
                    text.push(next);
                    self.cursor.advance();
                }
                'e' | 'E' => {
                    is_real = true;
                    text.push(next);
                    self.cursor.advance();
                    if let Some(sign @ ('+' | '-')) = self.cursor.lookahead() {
                        text.push(sign);
                        self.cursor.advance();
                    }
                }
                _ => break,
            }
        }
        let span = self.cursor.take_span();

        let tok = if is_real {
            Tok::Real(text.parse::<f64>().map_err(|err| {
                Error::parser(format!("malformed number {text:?}: {err}"), Some(span))
            })?)
        } else {
            Tok::Int(text.parse::<i64>().map_err(|err| {
                Error::parser(format!("malformed number {text:?}: {err}"), Some(span))
            })?)
        };
        self.tokens.push(Token { tok, span });
        Ok(())
    }

    fn consume_ident(&mut self, first: char) {
        self.cursor.begin();
        let mut text = String::new();
        text.push(first);
        while let Some(next) = self.cursor.lookahead() {
            if next.is_alphanumeric() || next == '_' {
                text.push(next);
                self.cursor.advance();
            } else {
                break;
            }
        }
        let span = self.cursor.take_span();

        let tok = match text.as_str() {
            "func" => Tok::Func,
            "var" => Tok::Var,
            "const" => Tok::Const,
            "if" => Tok::If,
            "else" => Tok::Else,
            "while" => Tok::While,
            "return" => Tok::Return,
            "break" => Tok::Break,
            "continue" => Tok::Continue,
            "switch" => Tok::Switch,
            "case" => Tok::Case,
            "default" => Tok::Default,
            "true" => Tok::True,
            "false" => Tok::False,
            "nil" => Tok::Nil,
            _ => Tok::Ident(text),
        };
        self.tokens.push(Token { tok, span });
    }

    /// Maximal-munch operator scanning.
    fn consume_operator(&mut self, first: char) -> Result<()> {
        self.cursor.begin();
        let tok = match first {
            '+' => match self.cursor.lookahead() {
                Some('+') => self.longer(Tok::PlusPlus),
                Some('=') => self.longer(Tok::PlusEq),
                _ => Tok::Plus,
            },
            '-' => match self.cursor.lookahead() {
                Some('-') => self.longer(Tok::MinusMinus),
                Some('=') => self.longer(Tok::MinusEq),
                _ => Tok::Minus,
            },
            '*' => match self.cursor.lookahead() {
                Some('=') => self.longer(Tok::StarEq),
                _ => Tok::Star,
            },
            '/' => match self.cursor.lookahead() {
                Some('=') => self.longer(Tok::SlashEq),
                _ => Tok::Slash,
            },
            '%' => match self.cursor.lookahead() {
                Some('=') => self.longer(Tok::PercentEq),
                _ => Tok::Percent,
            },
            '<' => match self.cursor.lookahead() {
                Some('<') => {
                    self.cursor.advance();
                    match self.cursor.lookahead() {
                        Some('=') => self.longer(Tok::ShlEq),
                        _ => Tok::Shl,
                    }
                }
                Some('=') => self.longer(Tok::Le),
                _ => Tok::Lt,
            },
            '>' => match self.cursor.lookahead() {
                Some('>') => {
                    self.cursor.advance();
                    match self.cursor.lookahead() {
                        Some('=') => self.longer(Tok::ShrEq),
                        _ => Tok::Shr,
                    }
                }
                Some('=') => self.longer(Tok::Ge),
                _ => Tok::Gt,
            },
            '&' => match self.cursor.lookahead() {
                Some('&') => self.longer(Tok::AndAnd),
                Some('^') => {
                    self.cursor.advance();
                    match self.cursor.lookahead() {
                        Some('=') => self.longer(Tok::AmpCaretEq),
                        _ => Tok::AmpCaret,
                    }
                }
                Some('=') => self.longer(Tok::AmpEq),
                _ => Tok::Amp,
            },
            '|' => match self.cursor.lookahead() {
                Some('|') => self.longer(Tok::OrOr),
                Some('=') => self.longer(Tok::PipeEq),
                _ => Tok::Pipe,
            },
            '^' => match self.cursor.lookahead() {
                Some('=') => self.longer(Tok::CaretEq),
                _ => Tok::Caret,
            },
            '=' => match self.cursor.lookahead() {
                Some('=') => self.longer(Tok::EqEq),
                _ => Tok::Assign,
            },
            '!' => match self.cursor.lookahead() {
                Some('=') => self.longer(Tok::Ne),
                _ => Tok::Bang,
            },
            other => {
                let offset = self.cursor.offset();
                return Err(Error::parser(
                    format!("unexpected character {other:?}"),
                    Some(Span::new(offset, other.len_utf8())),
                ));
            }
        };

        let span = self.cursor.take_span();
        self.tokens.push(Token { tok, span });
        Ok(())
    }

    /// Commit to the longer operator by consuming its next character.
    fn longer(&mut self, tok: Tok) -> Tok {
        self.cursor.advance();
        tok
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn toks(source: &str) -> Vec<Tok> {
        lex(source)
            .expect("lex failed")
            .into_iter()
            .map(|token| token.tok)
            .collect()
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            toks("a <<= 1"),
            vec![Tok::Ident("a".into()), Tok::ShlEq, Tok::Int(1), Tok::Eof]
        );
        assert_eq!(
            toks("a &^ b"),
            vec![
                Tok::Ident("a".into()),
                Tok::AmpCaret,
                Tok::Ident("b".into()),
                Tok::Eof
            ]
        );
        assert_eq!(
            toks("x++"),
            vec![Tok::Ident("x".into()), Tok::PlusPlus, Tok::Eof]
        );
    }

    #[test]
    fn test_operator_spans() {
        let tokens = lex("a <<= 1").expect("lex failed");
        assert_eq!(tokens[1].span.as_range(), 2..5);
    }

    #[test]
    fn test_semicolon_insertion() {
        assert_eq!(
            toks("x = 1\ny = 2"),
            vec![
                Tok::Ident("x".into()),
                Tok::Assign,
                Tok::Int(1),
                Tok::Semi,
                Tok::Ident("y".into()),
                Tok::Assign,
                Tok::Int(2),
                Tok::Eof
            ]
        );
        // No semicolon after an operator: the statement continues.
        assert_eq!(
            toks("x = 1 +\n2"),
            vec![
                Tok::Ident("x".into()),
                Tok::Assign,
                Tok::Int(1),
                Tok::Plus,
                Tok::Int(2),
                Tok::Eof
            ]
        );
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            toks("x // trailing\ny"),
            vec![
                Tok::Ident("x".into()),
                Tok::Semi,
                Tok::Ident("y".into()),
                Tok::Eof
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(toks("42"), vec![Tok::Int(42), Tok::Eof]);
        assert_eq!(toks("2.5"), vec![Tok::Real(2.5), Tok::Eof]);
        assert_eq!(toks("1e3"), vec![Tok::Real(1000.0), Tok::Eof]);
    }

    #[test]
    fn test_keywords_and_literals() {
        assert_eq!(
            toks("func true nil"),
            vec![Tok::Func, Tok::True, Tok::Nil, Tok::Eof]
        );
        assert_eq!(toks(r#""hi\n""#), vec![Tok::Str("hi\n".into()), Tok::Eof]);
    }

    #[test]
    fn test_vector_open() {
        assert_eq!(
            toks("#[1]"),
            vec![Tok::HashBracket, Tok::Int(1), Tok::RBracket, Tok::Eof]
        );
    }

    #[test]
    fn test_unterminated_string_is_incomplete() {
        assert!(lex("\"abc").unwrap_err().is_incomplete());
        assert!(lex("`(+ 1").unwrap_err().is_incomplete());
    }
}
