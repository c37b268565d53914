//! Parser for the Gisp surface.

use crate::error::{Error, Result};
use crate::span::Span;

use super::ast::{AssignOp, BinaryOp, Expr, Stmt, Target, UnaryOp};
use super::lexer::{lex, Tok, Token};

pub(crate) fn parse(source: &str) -> Result<Vec<Stmt>> {
    let tokens = lex(source)?;
    Parser { tokens, pos: 0 }.parse_program()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Tok {
        self.peek_ahead(0)
    }

    fn peek_ahead(&self, offset: usize) -> &Tok {
        self.tokens
            .get(self.pos + offset)
            .map(|token| &token.tok)
            .unwrap_or(&Tok::Eof)
    }

    fn span(&self) -> Option<Span> {
        self.tokens.get(self.pos).map(|token| token.span)
    }

    fn next(&mut self) -> Tok {
        let tok = self.peek().clone();
        if !matches!(tok, Tok::Eof) {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, tok: &Tok) -> bool {
        if self.peek() == tok {
            self.next();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tok: Tok, context: &str) -> Result<()> {
        if self.eat(&tok) {
            return Ok(());
        }
        match self.peek() {
            Tok::Eof => Err(Error::parser_incomplete(format!(
                "expected {tok:?} in {context} but the input ended"
            ))),
            found => Err(Error::parser(
                format!("expected {tok:?} in {context}, found {found:?}"),
                self.span(),
            )),
        }
    }

    fn expect_ident(&mut self, context: &str) -> Result<String> {
        match self.peek().clone() {
            Tok::Ident(name) => {
                self.next();
                Ok(name)
            }
            Tok::Eof => Err(Error::parser_incomplete(format!(
                "expected an identifier in {context} but the input ended"
            ))),
            found => Err(Error::parser(
                format!("expected an identifier in {context}, found {found:?}"),
                self.span(),
            )),
        }
    }

    fn skip_semis(&mut self) {
        while matches!(self.peek(), Tok::Semi) {
            self.next();
        }
    }

    // ------------------------------------------------------------------
    // Statements

    fn parse_program(mut self) -> Result<Vec<Stmt>> {
        let mut stmts = Vec::new();
        loop {
            self.skip_semis();
            if matches!(self.peek(), Tok::Eof) {
                return Ok(stmts);
            }
            stmts.push(self.parse_stmt()?);
        }
    }

    fn parse_stmt(&mut self) -> Result<Stmt> {
        match self.peek() {
            // `func name(...)` declares; bare `func(...)` is a lambda
            // expression and falls through.
            Tok::Func if matches!(self.peek_ahead(1), Tok::Ident(_)) => self.parse_func_decl(),
            Tok::Var => self.parse_var(),
            Tok::Const => self.parse_const(),
            Tok::If => self.parse_if_stmt(),
            Tok::While => self.parse_while(),
            Tok::Return => self.parse_return(),
            Tok::Break => {
                self.next();
                Ok(Stmt::Break)
            }
            Tok::Continue => {
                self.next();
                Ok(Stmt::Continue)
            }
            Tok::LBrace => Ok(Stmt::Block(self.parse_block()?)),
            _ => self.parse_simple_stmt(),
        }
    }

    fn parse_func_decl(&mut self) -> Result<Stmt> {
        self.expect(Tok::Func, "function declaration")?;
        let name = self.expect_ident("function declaration")?;
        let params = self.parse_params()?;
        let body = self.parse_block()?;
        Ok(Stmt::Func { name, params, body })
    }

    fn parse_params(&mut self) -> Result<Vec<String>> {
        self.expect(Tok::LParen, "parameter list")?;
        let mut params = Vec::new();
        if !matches!(self.peek(), Tok::RParen) {
            loop {
                params.push(self.expect_ident("parameter list")?);
                if !self.eat(&Tok::Comma) {
                    break;
                }
            }
        }
        self.expect(Tok::RParen, "parameter list")?;
        Ok(params)
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>> {
        self.expect(Tok::LBrace, "block")?;
        let mut stmts = Vec::new();
        loop {
            self.skip_semis();
            match self.peek() {
                Tok::RBrace => {
                    self.next();
                    return Ok(stmts);
                }
                Tok::Eof => return Err(Error::parser_incomplete("unterminated block")),
                _ => stmts.push(self.parse_stmt()?),
            }
        }
    }

    fn parse_var(&mut self) -> Result<Stmt> {
        self.expect(Tok::Var, "var declaration")?;
        let name = self.expect_ident("var declaration")?;
        let init = if self.eat(&Tok::Assign) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        Ok(Stmt::Var { name, init })
    }

    fn parse_const(&mut self) -> Result<Stmt> {
        self.expect(Tok::Const, "const declaration")?;
        let name = self.expect_ident("const declaration")?;
        self.expect(Tok::Assign, "const declaration")?;
        let init = self.parse_expr()?;
        Ok(Stmt::Const { name, init })
    }

    fn parse_if_stmt(&mut self) -> Result<Stmt> {
        self.expect(Tok::If, "if statement")?;
        let cond = self.parse_expr()?;
        let then = self.parse_block()?;

        self.skip_semis();
        let alt = if self.eat(&Tok::Else) {
            if matches!(self.peek(), Tok::If) {
                Some(vec![self.parse_if_stmt()?])
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };

        Ok(Stmt::If { cond, then, alt })
    }

    fn parse_while(&mut self) -> Result<Stmt> {
        self.expect(Tok::While, "while statement")?;
        let cond = self.parse_expr()?;
        let body = self.parse_block()?;
        Ok(Stmt::While { cond, body })
    }

    fn parse_return(&mut self) -> Result<Stmt> {
        self.expect(Tok::Return, "return statement")?;
        if matches!(self.peek(), Tok::Semi | Tok::RBrace | Tok::Eof) {
            return Ok(Stmt::Return(None));
        }
        Ok(Stmt::Return(Some(self.parse_expr()?)))
    }

    fn parse_simple_stmt(&mut self) -> Result<Stmt> {
        let expr = self.parse_expr()?;

        if let Some(op) = assign_op(self.peek()) {
            self.next();
            let value = self.parse_expr()?;
            let target = match expr {
                Expr::Ident(name) => Target::Name(name),
                Expr::Index { base, index } => Target::Index {
                    base: *base,
                    index: *index,
                },
                _ => {
                    return Err(Error::parser(
                        "cannot assign to this expression",
                        self.span(),
                    ))
                }
            };
            return Ok(Stmt::Assign { target, op, value });
        }

        if matches!(self.peek(), Tok::PlusPlus | Tok::MinusMinus) {
            let increment = matches!(self.peek(), Tok::PlusPlus);
            self.next();
            let name = match expr {
                Expr::Ident(name) => name,
                _ => {
                    return Err(Error::parser(
                        "++/-- target must be an identifier",
                        self.span(),
                    ))
                }
            };
            return Ok(Stmt::IncDec { name, increment });
        }

        Ok(Stmt::Expr(expr))
    }

    // ------------------------------------------------------------------
    // Expressions, lowest precedence first

    fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.eat(&Tok::OrOr) {
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_equality()?;
        while self.eat(&Tok::AndAnd) {
            let right = self.parse_equality()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.peek() {
                Tok::EqEq => BinaryOp::Eq,
                Tok::Ne => BinaryOp::Ne,
                _ => return Ok(left),
            };
            self.next();
            let right = self.parse_comparison()?;
            left = binary(op, left, right);
        }
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let mut left = self.parse_shift_bit()?;
        loop {
            let op = match self.peek() {
                Tok::Lt => BinaryOp::Lt,
                Tok::Le => BinaryOp::Le,
                Tok::Gt => BinaryOp::Gt,
                Tok::Ge => BinaryOp::Ge,
                _ => return Ok(left),
            };
            self.next();
            let right = self.parse_shift_bit()?;
            left = binary(op, left, right);
        }
    }

    fn parse_shift_bit(&mut self) -> Result<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Tok::Shl => BinaryOp::Shl,
                Tok::Shr => BinaryOp::Shr,
                Tok::Amp => BinaryOp::BitAnd,
                Tok::Pipe => BinaryOp::BitOr,
                Tok::Caret => BinaryOp::BitXor,
                Tok::AmpCaret => BinaryOp::AndNot,
                _ => return Ok(left),
            };
            self.next();
            let right = self.parse_additive()?;
            left = binary(op, left, right);
        }
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Tok::Plus => BinaryOp::Add,
                Tok::Minus => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.next();
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Tok::Star => BinaryOp::Mul,
                Tok::Slash => BinaryOp::Div,
                Tok::Percent => BinaryOp::Mod,
                _ => return Ok(left),
            };
            self.next();
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let op = match self.peek() {
            Tok::Minus => Some(UnaryOp::Neg),
            Tok::Bang => Some(UnaryOp::Not),
            Tok::Caret => Some(UnaryOp::BitNot),
            _ => None,
        };
        match op {
            Some(op) => {
                self.next();
                let operand = self.parse_unary()?;
                Ok(Expr::Unary {
                    op,
                    operand: Box::new(operand),
                })
            }
            None => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Tok::LParen => {
                    self.next();
                    let mut args = Vec::new();
                    if !matches!(self.peek(), Tok::RParen) {
                        loop {
                            args.push(self.parse_expr()?);
                            if !self.eat(&Tok::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(Tok::RParen, "call")?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                    };
                }
                Tok::LBracket => {
                    self.next();
                    let index = self.parse_expr()?;
                    self.expect(Tok::RBracket, "index")?;
                    expr = Expr::Index {
                        base: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.peek().clone() {
            Tok::Int(n) => {
                self.next();
                Ok(Expr::Int(n))
            }
            Tok::Real(r) => {
                self.next();
                Ok(Expr::Real(r))
            }
            Tok::Str(text) => {
                self.next();
                Ok(Expr::Str(text))
            }
            Tok::True => {
                self.next();
                Ok(Expr::Bool(true))
            }
            Tok::False => {
                self.next();
                Ok(Expr::Bool(false))
            }
            Tok::Nil => {
                self.next();
                Ok(Expr::Nil)
            }
            Tok::Ident(name) => {
                self.next();
                Ok(Expr::Ident(name))
            }
            Tok::Sexpr(value) => {
                self.next();
                Ok(Expr::Sexpr(value))
            }
            Tok::LParen => {
                self.next();
                let expr = self.parse_expr()?;
                self.expect(Tok::RParen, "parenthesized expression")?;
                Ok(expr)
            }
            Tok::LBracket => {
                self.next();
                let items = self.parse_elements(Tok::RBracket, "list literal")?;
                Ok(Expr::List(items))
            }
            Tok::HashBracket => {
                self.next();
                let items = self.parse_elements(Tok::RBracket, "vector literal")?;
                Ok(Expr::Vector(items))
            }
            Tok::Func => {
                self.next();
                let params = self.parse_params()?;
                let body = self.parse_block()?;
                Ok(Expr::Lambda { params, body })
            }
            Tok::If => self.parse_if_expr(),
            Tok::Switch => self.parse_switch_expr(),
            Tok::Eof => Err(Error::parser_incomplete("unexpected end of input")),
            found => Err(Error::parser(
                format!("unexpected token {found:?}"),
                self.span(),
            )),
        }
    }

    fn parse_elements(&mut self, close: Tok, context: &str) -> Result<Vec<Expr>> {
        let mut items = Vec::new();
        if self.peek() != &close {
            loop {
                items.push(self.parse_expr()?);
                if !self.eat(&Tok::Comma) {
                    break;
                }
            }
        }
        self.expect(close, context)?;
        Ok(items)
    }

    /// `if COND { EXPR } else { EXPR }` in expression position. The
    /// else arm is mandatory so the expression always has a value.
    fn parse_if_expr(&mut self) -> Result<Expr> {
        self.expect(Tok::If, "if expression")?;
        let cond = self.parse_expr()?;
        self.expect(Tok::LBrace, "if expression")?;
        let then = self.parse_expr()?;
        self.expect(Tok::RBrace, "if expression")?;
        self.expect(Tok::Else, "if expression")?;

        let alt = if matches!(self.peek(), Tok::If) {
            self.parse_if_expr()?
        } else {
            self.expect(Tok::LBrace, "if expression")?;
            let alt = self.parse_expr()?;
            self.expect(Tok::RBrace, "if expression")?;
            alt
        };

        Ok(Expr::If {
            cond: Box::new(cond),
            then: Box::new(then),
            alt: Box::new(alt),
        })
    }

    /// `switch { case COND: EXPR; ...; default: EXPR }`.
    fn parse_switch_expr(&mut self) -> Result<Expr> {
        self.expect(Tok::Switch, "switch expression")?;
        self.expect(Tok::LBrace, "switch expression")?;

        let mut cases = Vec::new();
        let mut default = None;
        loop {
            self.skip_semis();
            match self.peek() {
                Tok::RBrace => {
                    self.next();
                    return Ok(Expr::Switch { cases, default });
                }
                Tok::Case => {
                    self.next();
                    let cond = self.parse_expr()?;
                    self.expect(Tok::Colon, "switch case")?;
                    let result = self.parse_expr()?;
                    cases.push((cond, result));
                }
                Tok::Default => {
                    if default.is_some() {
                        return Err(Error::parser(
                            "switch may have only one default",
                            self.span(),
                        ));
                    }
                    self.next();
                    self.expect(Tok::Colon, "switch default")?;
                    default = Some(Box::new(self.parse_expr()?));
                }
                Tok::Eof => {
                    return Err(Error::parser_incomplete("unterminated switch"))
                }
                found => {
                    return Err(Error::parser(
                        format!("expected case or default, found {found:?}"),
                        self.span(),
                    ))
                }
            }
        }
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn assign_op(tok: &Tok) -> Option<AssignOp> {
    match tok {
        Tok::Assign => Some(AssignOp::Set),
        Tok::PlusEq => Some(AssignOp::Add),
        Tok::MinusEq => Some(AssignOp::Sub),
        Tok::StarEq => Some(AssignOp::Mul),
        Tok::SlashEq => Some(AssignOp::Div),
        Tok::PercentEq => Some(AssignOp::Mod),
        Tok::ShlEq => Some(AssignOp::Shl),
        Tok::ShrEq => Some(AssignOp::Shr),
        Tok::AmpEq => Some(AssignOp::And),
        Tok::PipeEq => Some(AssignOp::Or),
        Tok::CaretEq => Some(AssignOp::Xor),
        Tok::AmpCaretEq => Some(AssignOp::AndNot),
        _ => None,
    }
}
