//! Lexer for constraint and consequence code.
//!
//! The lexer converts source text into a stream of tokens. Whitespace and
//! comments are skipped, but the lexer remembers whether a line break was
//! crossed so the parser can apply newline-terminated statements.

use crate::span::Span;
use crate::token::{Token, TokenKind};

/// Lexer for Java-like rule code.
pub struct Lexer<'src> {
    /// Source text being tokenized.
    source: &'src str,
    /// Remaining source text.
    rest: &'src str,
    /// Current byte offset in source.
    position: usize,
    /// Current line number (1-based).
    line: u32,
    /// Current column number (1-based).
    column: u32,
}

impl<'src> Lexer<'src> {
    /// Creates a new lexer for the given source.
    #[must_use]
    pub fn new(source: &'src str) -> Self {
        Self::at(source, 1, 1)
    }

    /// Creates a lexer for text embedded at `line`/`column` of a larger file.
    #[must_use]
    pub fn at(source: &'src str, line: u32, column: u32) -> Self {
        Self {
            source,
            rest: source,
            position: 0,
            line,
            column,
        }
    }

    /// Returns the next token from the source.
    pub fn next_token(&mut self) -> Token {
        let newline_before = self.skip_trivia();

        let start = self.position;
        let start_line = self.line;
        let start_column = self.column;

        let Some(c) = self.peek_char() else {
            return Token::new(
                TokenKind::Eof,
                Span::new(start, start, start_line, start_column),
                newline_before,
            );
        };

        let kind = match c {
            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            '{' => self.single(TokenKind::LBrace),
            '}' => self.single(TokenKind::RBrace),
            '[' => self.single(TokenKind::LBracket),
            ']' => self.single(TokenKind::RBracket),
            ',' => self.single(TokenKind::Comma),
            ';' => self.single(TokenKind::Semi),
            ':' => self.single(TokenKind::Colon),
            '+' => self.single(TokenKind::Plus),
            '-' => self.single(TokenKind::Minus),
            '*' => self.single(TokenKind::Star),
            '/' => self.single(TokenKind::Slash),
            '%' => self.single(TokenKind::Percent),
            '.' if self.peek_char_n(1).is_some_and(|c| c.is_ascii_digit()) => self.scan_number(),
            '.' => self.single(TokenKind::Dot),
            '=' => self.one_or_two('=', TokenKind::Assign, TokenKind::EqEq),
            '!' => self.one_or_two('=', TokenKind::Bang, TokenKind::NotEq),
            '<' => self.one_or_two('=', TokenKind::Lt, TokenKind::Le),
            '>' => self.one_or_two('=', TokenKind::Gt, TokenKind::Ge),
            '&' => self.pair('&', TokenKind::AndAnd),
            '|' => self.pair('|', TokenKind::OrOr),
            '"' | '\'' => self.scan_string(c),
            c if c.is_ascii_digit() => self.scan_number(),
            c if is_ident_start(c) => self.scan_ident(),
            c => {
                self.advance();
                TokenKind::Error(format!("unexpected character: {c}"))
            }
        };

        Token::new(
            kind,
            Span::new(start, self.position, start_line, start_column),
            newline_before,
        )
    }

    /// Tokenizes all source, ending with an `Eof` token.
    #[must_use]
    pub fn tokenize_all(source: &str) -> Vec<Token> {
        Lexer::new(source).collect_tokens()
    }

    /// Tokenizes the remaining source, ending with an `Eof` token.
    #[must_use]
    pub fn collect_tokens(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    fn peek_char(&self) -> Option<char> {
        self.rest.chars().next()
    }

    fn peek_char_n(&self, n: usize) -> Option<char> {
        self.rest.chars().nth(n)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            let len = c.len_utf8();
            self.rest = &self.rest[len..];
            self.position += len;
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    fn one_or_two(&mut self, second: char, one: TokenKind, two: TokenKind) -> TokenKind {
        self.advance();
        if self.peek_char() == Some(second) {
            self.advance();
            two
        } else {
            one
        }
    }

    fn pair(&mut self, c: char, kind: TokenKind) -> TokenKind {
        self.advance();
        if self.peek_char() == Some(c) {
            self.advance();
            kind
        } else {
            TokenKind::Error(format!("unexpected character: {c}"))
        }
    }

    /// Skips whitespace and comments, returning true if a newline was crossed.
    fn skip_trivia(&mut self) -> bool {
        let mut newline = false;
        loop {
            match self.peek_char() {
                Some('\n') => {
                    newline = true;
                    self.advance();
                }
                Some(c) if c.is_whitespace() => self.advance(),
                Some('/') if self.peek_char_n(1) == Some('/') => {
                    while let Some(c) = self.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some('/') if self.peek_char_n(1) == Some('*') => {
                    self.advance();
                    self.advance();
                    while !self.rest.is_empty() && !self.rest.starts_with("*/") {
                        if self.peek_char() == Some('\n') {
                            newline = true;
                        }
                        self.advance();
                    }
                    self.advance();
                    self.advance();
                }
                _ => return newline,
            }
        }
    }

    fn scan_string(&mut self, quote: char) -> TokenKind {
        self.advance();
        let mut text = String::new();
        loop {
            match self.peek_char() {
                Some(c) if c == quote => {
                    self.advance();
                    return TokenKind::String(text);
                }
                Some('\\') => {
                    self.advance();
                    let escaped = match self.peek_char() {
                        Some('n') => '\n',
                        Some('r') => '\r',
                        Some('t') => '\t',
                        Some(c @ ('\\' | '"' | '\'')) => c,
                        Some(c) => {
                            return TokenKind::Error(format!("invalid escape sequence: \\{c}"));
                        }
                        None => {
                            return TokenKind::Error(
                                "unexpected end of input in string escape".into(),
                            );
                        }
                    };
                    self.advance();
                    text.push(escaped);
                }
                Some('\n') | None => {
                    return TokenKind::Error("unterminated string literal".into());
                }
                Some(c) => {
                    self.advance();
                    text.push(c);
                }
            }
        }
    }

    fn scan_number(&mut self) -> TokenKind {
        let start = self.position;
        let mut is_float = false;

        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                self.advance();
            } else if c == '.'
                && !is_float
                && self.peek_char_n(1).is_some_and(|c| c.is_ascii_digit())
            {
                is_float = true;
                self.advance();
            } else if matches!(c, 'e' | 'E')
                && self
                    .peek_char_n(1)
                    .is_some_and(|c| c.is_ascii_digit() || c == '-' || c == '+')
            {
                is_float = true;
                self.advance();
                self.advance();
            } else {
                break;
            }
        }

        let text = &self.source[start..self.position];
        match self.peek_char() {
            Some('L' | 'l') => {
                self.advance();
                if is_float {
                    return TokenKind::Error(format!("invalid integer: {text}L"));
                }
            }
            Some('d' | 'D' | 'f' | 'F') => {
                self.advance();
                is_float = true;
            }
            _ => {}
        }

        if is_float {
            match text.parse::<f64>() {
                Ok(n) => TokenKind::Float(n),
                Err(e) => TokenKind::Error(format!("invalid float: {e}")),
            }
        } else {
            match text.parse::<i64>() {
                Ok(n) => TokenKind::Int(n),
                Err(e) => TokenKind::Error(format!("invalid integer: {e}")),
            }
        }
    }

    fn scan_ident(&mut self) -> TokenKind {
        let start = self.position;
        while self.peek_char().is_some_and(is_ident_char) {
            self.advance();
        }
        match &self.source[start..self.position] {
            "null" => TokenKind::Null,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            name => TokenKind::Ident(name.to_string()),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}
