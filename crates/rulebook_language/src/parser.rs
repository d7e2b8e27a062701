//! Parser for constraint expressions and consequence statements.
//!
//! Constraints are single expressions. Consequences are statement lists whose
//! termination rules depend on the [`Dialect`]: the Java dialect requires `;`
//! after every simple statement, the MVEL dialect also accepts a line break.

use rulebook_foundation::{Error, Result};

use crate::ast::{BinaryOp, Expr, Literal, ModifyItem, Stmt, UnaryOp};
use crate::dialect::Dialect;
use crate::lexer::Lexer;
use crate::span::Span;
use crate::token::{Token, TokenKind};

/// Parses a constraint expression embedded at `line`/`column` of a file.
///
/// # Errors
/// Returns a parse error if the text is not exactly one expression.
pub fn parse_expression(text: &str, line: u32, column: u32) -> Result<Expr> {
    Parser::at(text, line, column, Dialect::Java).parse_expression()
}

/// Parses consequence statements embedded at `line`/`column` of a file.
///
/// # Errors
/// Returns a parse error on malformed statements or missing terminators.
pub fn parse_statements(text: &str, dialect: Dialect, line: u32, column: u32) -> Result<Vec<Stmt>> {
    Parser::at(text, line, column, dialect).parse_block()
}

/// Parser for rule code.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    dialect: Dialect,
    /// Depth of enclosing parentheses; line breaks are insignificant inside.
    nesting: u32,
}

impl Parser {
    /// Creates a parser for the given source.
    #[must_use]
    pub fn new(source: &str, dialect: Dialect) -> Self {
        Self::at(source, 1, 1, dialect)
    }

    /// Creates a parser for text embedded at `line`/`column` of a file.
    #[must_use]
    pub fn at(source: &str, line: u32, column: u32, dialect: Dialect) -> Self {
        Self {
            tokens: Lexer::at(source, line, column).collect_tokens(),
            pos: 0,
            dialect,
            nesting: 0,
        }
    }

    /// Parses a single expression spanning the whole input.
    ///
    /// # Errors
    /// Returns an error if the source is not exactly one expression.
    pub fn parse_expression(&mut self) -> Result<Expr> {
        self.nesting += 1;
        let expr = self.parse_expr()?;
        self.nesting -= 1;
        if self.current().kind != TokenKind::Eof {
            return Err(self.error(&format!("unexpected {}", self.current().kind)));
        }
        Ok(expr)
    }

    /// Parses statements until end of input.
    ///
    /// # Errors
    /// Returns an error on the first malformed statement.
    pub fn parse_block(&mut self) -> Result<Vec<Stmt>> {
        let mut stmts = Vec::new();
        while self.current().kind != TokenKind::Eof {
            if let Some(stmt) = self.parse_statement()? {
                stmts.push(stmt);
            }
        }
        Ok(stmts)
    }

    // =========================================================================
    // Token helpers
    // =========================================================================

    fn current(&self) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    fn peek(&self, n: usize) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[(self.pos + n).min(last)]
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.current().kind == kind
    }

    fn check_ident(&self, name: &str) -> bool {
        self.current().ident() == Some(name)
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error(&format!(
                "expected {}, found {}",
                kind.name(),
                self.current().kind
            )))
        }
    }

    fn expect_ident(&mut self) -> Result<(String, Span)> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Ident(name) => {
                self.advance();
                Ok((name, token.span))
            }
            other => Err(self.error(&format!("expected identifier, found {other}"))),
        }
    }

    fn error(&self, message: &str) -> Error {
        if let TokenKind::Error(msg) = &self.current().kind {
            return self.error_at(self.current().span, msg);
        }
        self.error_at(self.current().span, message)
    }

    #[allow(clippy::unused_self)]
    fn error_at(&self, span: Span, message: &str) -> Error {
        Error::parse(message, span.line, span.column)
    }

    fn previous_span(&self) -> Span {
        self.tokens
            .get(self.pos.saturating_sub(1))
            .map_or_else(Span::at_start, |t| t.span)
    }

    /// True if a line break ends the expression at the current token.
    fn stops_at_newline(&self) -> bool {
        self.dialect == Dialect::Mvel && self.nesting == 0 && self.current().newline_before
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn parse_statement(&mut self) -> Result<Option<Stmt>> {
        if self.check(&TokenKind::Semi) {
            self.advance();
            return Ok(None);
        }
        if self.check_ident("if") && self.peek(1).kind == TokenKind::LParen {
            return self.parse_if().map(Some);
        }
        if self.check_ident("modify") && self.peek(1).kind == TokenKind::LParen {
            let stmt = self.parse_modify()?;
            if self.check(&TokenKind::Semi) {
                self.advance();
            }
            return Ok(Some(stmt));
        }
        if self.check_ident("final") && matches!(self.peek(1).kind, TokenKind::Ident(_)) {
            self.advance();
        }
        if let Some(type_len) = self.local_decl_type_len() {
            let stmt = self.parse_local(type_len)?;
            self.end_statement()?;
            return Ok(Some(stmt));
        }

        let expr = self.parse_expr()?;
        let stmt = if self.check(&TokenKind::Assign) && !self.stops_at_newline() {
            let start = expr.span();
            if !matches!(expr, Expr::Name(..) | Expr::Field { .. }) {
                return Err(self.error_at(start, "invalid assignment target"));
            }
            self.advance();
            let value = self.parse_expr()?;
            Stmt::Assign {
                target: expr,
                span: start.to(value.span()),
                value,
            }
        } else {
            Stmt::Expr(expr)
        };
        self.end_statement()?;
        Ok(Some(stmt))
    }

    fn end_statement(&mut self) -> Result<()> {
        if self.check(&TokenKind::Semi) {
            self.advance();
            return Ok(());
        }
        if self.dialect.requires_semicolons() {
            let span = self.previous_span();
            return Err(self.error_at(
                Span::new(span.end, span.end, span.line, span.column + to_u32(span.len())),
                "expected ';'",
            ));
        }
        let token = self.current();
        if token.newline_before || matches!(token.kind, TokenKind::RBrace | TokenKind::Eof) {
            Ok(())
        } else {
            Err(self.error(&format!(
                "expected ';' or line break, found {}",
                token.kind
            )))
        }
    }

    /// Returns the number of tokens in the type name if the statement at the
    /// cursor is a local declaration like `Address a = ...`.
    fn local_decl_type_len(&self) -> Option<usize> {
        let first = self.current().ident()?;
        if matches!(first, "new" | "return" | "if" | "else") || first.starts_with('$') {
            return None;
        }
        let mut len = 1;
        while self.peek(len).kind == TokenKind::Dot && self.peek(len + 1).ident().is_some() {
            len += 2;
        }
        let name = self.peek(len);
        if name.ident().is_none() || name.newline_before {
            return None;
        }
        match self.peek(len + 1).kind {
            TokenKind::Assign | TokenKind::Semi | TokenKind::Eof | TokenKind::RBrace => Some(len),
            _ if self.peek(len + 1).newline_before => Some(len),
            _ => None,
        }
    }

    fn parse_local(&mut self, type_len: usize) -> Result<Stmt> {
        let start = self.current().span;
        let mut ty = String::new();
        for _ in 0..type_len {
            match self.advance().kind {
                TokenKind::Ident(part) => ty.push_str(&part),
                _ => ty.push('.'),
            }
        }
        let (name, name_span) = self.expect_ident()?;
        let init = if self.check(&TokenKind::Assign) {
            self.advance();
            Some(self.parse_expr()?)
        } else {
            None
        };
        let end = init.as_ref().map_or(name_span, Expr::span);
        Ok(Stmt::Local {
            ty,
            name,
            init,
            span: start.to(end),
        })
    }

    fn parse_if(&mut self) -> Result<Stmt> {
        let start = self.advance().span;
        self.expect(&TokenKind::LParen)?;
        self.nesting += 1;
        let cond = self.parse_expr()?;
        self.nesting -= 1;
        self.expect(&TokenKind::RParen)?;
        let then_branch = self.parse_branch()?;
        let else_branch = if self.check_ident("else") {
            self.advance();
            if self.check_ident("if") {
                vec![self.parse_if()?]
            } else {
                self.parse_branch()?
            }
        } else {
            Vec::new()
        };
        Ok(Stmt::If {
            cond,
            then_branch,
            else_branch,
            span: start.to(self.previous_span()),
        })
    }

    fn parse_branch(&mut self) -> Result<Vec<Stmt>> {
        if !self.check(&TokenKind::LBrace) {
            return Ok(self.parse_statement()?.into_iter().collect());
        }
        let open = self.advance().span;
        let saved = std::mem::replace(&mut self.nesting, 0);
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            if self.check(&TokenKind::Eof) {
                return Err(self.error_at(open, "unterminated block"));
            }
            if let Some(stmt) = self.parse_statement()? {
                stmts.push(stmt);
            }
        }
        self.advance();
        self.nesting = saved;
        Ok(stmts)
    }

    fn parse_modify(&mut self) -> Result<Stmt> {
        let start = self.advance().span;
        self.expect(&TokenKind::LParen)?;
        self.nesting += 1;
        let target = self.parse_expr()?;
        self.nesting -= 1;
        self.expect(&TokenKind::RParen)?;
        let open = self.expect(&TokenKind::LBrace)?.span;
        let saved = std::mem::replace(&mut self.nesting, 0);
        let mut items = Vec::new();
        loop {
            while matches!(self.current().kind, TokenKind::Comma | TokenKind::Semi) {
                self.advance();
            }
            if self.check(&TokenKind::RBrace) {
                break;
            }
            if self.check(&TokenKind::Eof) {
                return Err(self.error_at(open, "unterminated modify block"));
            }
            items.push(self.parse_modify_item()?);
            let token = self.current();
            if !(token.newline_before
                || matches!(
                    token.kind,
                    TokenKind::Comma | TokenKind::Semi | TokenKind::RBrace
                ))
            {
                return Err(self.error(&format!(
                    "expected ',' or ';' in modify block, found {}",
                    token.kind
                )));
            }
        }
        let close = self.advance().span;
        self.nesting = saved;
        Ok(Stmt::Modify {
            target,
            items,
            span: start.to(close),
        })
    }

    fn parse_modify_item(&mut self) -> Result<ModifyItem> {
        let (name, span) = self.expect_ident()?;
        if self.check(&TokenKind::LParen) {
            let args = self.parse_args()?;
            return Ok(ModifyItem::Setter {
                name,
                args,
                span: span.to(self.previous_span()),
            });
        }
        if self.check(&TokenKind::Assign) {
            self.advance();
            let value = self.parse_expr()?;
            return Ok(ModifyItem::Assign {
                field: name,
                span: span.to(value.span()),
                value,
            });
        }
        Err(self.error(&format!(
            "expected setter call or assignment in modify block, found {}",
            self.current().kind
        )))
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_binary(0)
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            if self.stops_at_newline() {
                break;
            }
            let Some(op) = binary_op(&self.current().kind) else {
                break;
            };
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.advance();
            let rhs = self.parse_binary(prec + 1)?;
            let span = lhs.span().to(rhs.span());
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span,
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let start = self.current().span;
        let op = match self.current().kind {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Neg,
            _ => return self.parse_postfix(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        let span = start.to(operand.span());
        Ok(match (op, operand) {
            (UnaryOp::Neg, Expr::Literal(Literal::Int(n), _)) => {
                Expr::Literal(Literal::Int(n.wrapping_neg()), span)
            }
            (UnaryOp::Neg, Expr::Literal(Literal::Float(n), _)) => {
                Expr::Literal(Literal::Float(-n), span)
            }
            (op, operand) => Expr::Unary {
                op,
                operand: Box::new(operand),
                span,
            },
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;
        while self.check(&TokenKind::Dot) && !self.stops_at_newline() {
            self.advance();
            let (name, name_span) = self.expect_ident()?;
            if self.check(&TokenKind::LParen) {
                let args = self.parse_args()?;
                let span = expr.span().to(self.previous_span());
                expr = Expr::Call {
                    target: Some(Box::new(expr)),
                    name,
                    args,
                    span,
                };
            } else {
                let span = expr.span().to(name_span);
                expr = Expr::Field {
                    target: Box::new(expr),
                    name,
                    span,
                };
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let token = self.current().clone();
        let span = token.span;
        let literal = match token.kind {
            TokenKind::Null => Literal::Null,
            TokenKind::True => Literal::Bool(true),
            TokenKind::False => Literal::Bool(false),
            TokenKind::Int(n) => Literal::Int(n),
            TokenKind::Float(n) => Literal::Float(n),
            TokenKind::String(s) => Literal::String(s),
            TokenKind::LParen => {
                self.advance();
                self.nesting += 1;
                let expr = self.parse_expr()?;
                self.nesting -= 1;
                self.expect(&TokenKind::RParen)?;
                return Ok(expr);
            }
            TokenKind::Ident(name) => {
                self.advance();
                if name == "new" && self.current().ident().is_some() {
                    return self.parse_new(span);
                }
                if self.check(&TokenKind::LParen) {
                    let args = self.parse_args()?;
                    return Ok(Expr::Call {
                        target: None,
                        name,
                        args,
                        span: span.to(self.previous_span()),
                    });
                }
                return Ok(Expr::Name(name, span));
            }
            TokenKind::Eof => return Err(self.error("unexpected end of input")),
            other => return Err(self.error(&format!("unexpected {other}"))),
        };
        self.advance();
        Ok(Expr::Literal(literal, span))
    }

    fn parse_new(&mut self, start: Span) -> Result<Expr> {
        let (mut type_name, _) = self.expect_ident()?;
        while self.check(&TokenKind::Dot) {
            self.advance();
            let (part, _) = self.expect_ident()?;
            type_name.push('.');
            type_name.push_str(&part);
        }
        let args = self.parse_args()?;
        Ok(Expr::New {
            type_name,
            args,
            span: start.to(self.previous_span()),
        })
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>> {
        self.expect(&TokenKind::LParen)?;
        self.nesting += 1;
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if self.check(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.nesting -= 1;
        self.expect(&TokenKind::RParen)?;
        Ok(args)
    }
}

fn binary_op(kind: &TokenKind) -> Option<BinaryOp> {
    Some(match kind {
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Percent => BinaryOp::Rem,
        TokenKind::EqEq => BinaryOp::Eq,
        TokenKind::NotEq => BinaryOp::Ne,
        TokenKind::Lt => BinaryOp::Lt,
        TokenKind::Le => BinaryOp::Le,
        TokenKind::Gt => BinaryOp::Gt,
        TokenKind::Ge => BinaryOp::Ge,
        TokenKind::AndAnd => BinaryOp::And,
        TokenKind::OrOr => BinaryOp::Or,
        _ => return None,
    })
}

fn to_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
