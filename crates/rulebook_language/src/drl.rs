//! Front end for DRL rule files.
//!
//! Reads the declarative structure of a rule file (package, imports,
//! `declare` blocks, rules with attributes and patterns) into a
//! [`PackageDescr`]. Constraint and consequence code is not parsed here: it is
//! captured as text together with its position so the compiler can parse it
//! in the rule's dialect and report errors at file coordinates.

use rulebook_foundation::{Error, Result};
use tracing::debug;

use crate::descr::{ConstraintDescr, PackageDescr, PatternDescr, RuleDescr, RuleSource, TypeDeclDescr};
use crate::dialect::Dialect;
use crate::span::Span;

/// Parses a rule source into a package descriptor.
///
/// # Errors
/// Returns a parse error with file coordinates on malformed input.
pub fn parse_source(source: &RuleSource) -> Result<PackageDescr> {
    let mut package = DrlReader::new(&source.text).read_package()?;
    package.resource = Some(source.path.clone());
    debug!(
        resource = %source.path,
        package = %package.name,
        rules = package.rules.len(),
        types = package.types.len(),
        "parsed rule source"
    );
    Ok(package)
}

/// Character cursor over DRL text.
struct DrlReader<'src> {
    source: &'src str,
    pos: usize,
    line: u32,
    column: u32,
}

impl<'src> DrlReader<'src> {
    fn new(source: &'src str) -> Self {
        Self {
            source,
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn read_package(&mut self) -> Result<PackageDescr> {
        let mut package = PackageDescr::default();
        loop {
            self.skip_trivia();
            if self.at_end() {
                return Ok(package);
            }
            let span = self.here();
            let word = self.word();
            match word {
                "package" => {
                    package.name = self.qualified_name()?;
                    self.optional_char(';');
                }
                "import" => {
                    let import = self.qualified_name()?;
                    self.optional_char(';');
                    package.imports.push(import);
                }
                "dialect" => {
                    package.dialect = Some(self.dialect()?);
                    self.optional_char(';');
                }
                "declare" => package.types.push(self.read_declare(span)?),
                "rule" => package.rules.push(self.read_rule(span)?),
                "" => {
                    let c = self.peek().unwrap_or(' ');
                    return Err(self.error_at(span, &format!("unexpected character: {c}")));
                }
                other => {
                    return Err(self.error_at(span, &format!("unsupported construct: {other}")));
                }
            }
        }
    }

    fn read_declare(&mut self, span: Span) -> Result<TypeDeclDescr> {
        self.skip_trivia();
        let mut decl = TypeDeclDescr::new(self.qualified_name()?);
        decl.span = span;
        loop {
            self.skip_trivia();
            self.skip_annotations();
            let field_span = self.here();
            let word = self.word();
            match word {
                "end" => return Ok(decl),
                "extends" if decl.fields.is_empty() && decl.supertype.is_none() => {
                    decl.supertype = Some(self.qualified_name()?);
                }
                "" => {
                    return Err(self.error_at(
                        field_span,
                        &format!("unterminated declare block for {}", decl.name),
                    ));
                }
                field => {
                    let field = field.to_string();
                    self.skip_trivia();
                    self.expect_char(':')?;
                    let ty = self.qualified_name()?;
                    self.optional_char(';');
                    decl.fields.push((field, ty));
                }
            }
        }
    }

    fn read_rule(&mut self, span: Span) -> Result<RuleDescr> {
        self.skip_trivia();
        let name = if self.peek() == Some('"') || self.peek() == Some('\'') {
            self.string()?
        } else {
            let word = self.word();
            if word.is_empty() {
                return Err(self.error("expected rule name"));
            }
            word.to_string()
        };
        let mut rule = RuleDescr::new(name);
        rule.span = span;

        loop {
            self.skip_trivia();
            self.optional_char(',');
            self.skip_trivia();
            let attr_span = self.here();
            match self.word() {
                "when" => break,
                "then" => {
                    self.read_consequence(&mut rule)?;
                    return Ok(rule);
                }
                "attributes" => self.optional_char(':'),
                "salience" => rule.attributes.salience = self.integer()?,
                "dialect" => rule.attributes.dialect = Some(self.dialect()?),
                "no-loop" => rule.attributes.no_loop = self.optional_bool(),
                "enabled" => rule.attributes.enabled = self.optional_bool(),
                "" => return Err(self.error_at(attr_span, "expected 'when' or 'then'")),
                other => {
                    return Err(self.error_at(
                        attr_span,
                        &format!("unsupported rule attribute: {other}"),
                    ));
                }
            }
        }

        loop {
            self.skip_trivia();
            if self.at_end() {
                return Err(self.error_at(span, &format!("rule '{}' is missing 'then'", rule.name)));
            }
            let mark = self.save();
            if self.word() == "then" {
                self.read_consequence(&mut rule)?;
                return Ok(rule);
            }
            self.restore(mark);
            rule.patterns.push(self.read_pattern()?);
        }
    }

    fn read_pattern(&mut self) -> Result<PatternDescr> {
        let span = self.here();
        let first = self.qualified_name()?;
        if matches!(first.as_str(), "not" | "exists" | "forall" | "eval" | "accumulate" | "from" | "or" | "and") {
            return Err(self.error_at(
                span,
                &format!("unsupported conditional element: {first}"),
            ));
        }
        self.skip_trivia();
        let (binding, type_name) = if self.peek() == Some(':') {
            self.advance();
            self.skip_trivia();
            (Some(first), self.qualified_name()?)
        } else {
            (None, first)
        };
        self.skip_trivia();
        self.expect_char('(')?;
        let constraints = self.read_constraints()?;
        self.optional_char(';');
        Ok(PatternDescr {
            binding,
            type_name,
            constraints,
            span,
        })
    }

    /// Reads comma-separated constraints up to the pattern's closing paren.
    fn read_constraints(&mut self) -> Result<Vec<ConstraintDescr>> {
        let open = self.here();
        let mut constraints = Vec::new();
        let mut depth = 0u32;
        let mut start: Option<(usize, Span)> = None;
        loop {
            let Some(c) = self.peek() else {
                return Err(self.error_at(open, "unterminated pattern"));
            };
            if start.is_none() && !c.is_whitespace() && !(depth == 0 && (c == ',' || c == ')')) {
                start = Some((self.pos, self.here()));
            }
            match c {
                '"' | '\'' => {
                    self.string()?;
                    continue;
                }
                '(' | '[' => depth += 1,
                ')' | ']' if depth > 0 => depth -= 1,
                ')' | ',' if depth == 0 => {
                    if let Some((from, span)) = start.take() {
                        constraints.push(constraint(&self.source[from..self.pos], span));
                    }
                    self.advance();
                    if c == ')' {
                        return Ok(constraints);
                    }
                    continue;
                }
                _ => {}
            }
            self.advance();
        }
    }

    fn read_consequence(&mut self, rule: &mut RuleDescr) -> Result<()> {
        let start = self.pos;
        let span = self.here();
        loop {
            let Some(c) = self.peek() else {
                return Err(self.error_at(
                    rule.span,
                    &format!("rule '{}' is missing 'end'", rule.name),
                ));
            };
            match c {
                '"' | '\'' => {
                    self.string()?;
                    continue;
                }
                '/' if self.rest().starts_with("//") || self.rest().starts_with("/*") => {
                    self.skip_trivia();
                    continue;
                }
                c if is_word_char(c) => {
                    let word_start = self.pos;
                    let prev = self.source[..word_start].chars().next_back();
                    let word = self.word();
                    if word == "end" && prev != Some('.') {
                        rule.consequence = self.source[start..word_start].to_string();
                        rule.consequence_span = span;
                        return Ok(());
                    }
                    continue;
                }
                _ => {}
            }
            self.advance();
        }
    }

    // =========================================================================
    // Lexical helpers
    // =========================================================================

    fn rest(&self) -> &'src str {
        &self.source[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn here(&self) -> Span {
        Span::new(self.pos, self.pos, self.line, self.column)
    }

    fn save(&self) -> (usize, u32, u32) {
        (self.pos, self.line, self.column)
    }

    fn restore(&mut self, mark: (usize, u32, u32)) {
        (self.pos, self.line, self.column) = mark;
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    fn skip_trivia(&mut self) {
        loop {
            let rest = self.rest();
            if rest.starts_with("//") || rest.starts_with('#') {
                while self.peek().is_some_and(|c| c != '\n') {
                    self.advance();
                }
            } else if rest.starts_with("/*") {
                self.advance();
                self.advance();
                while !self.at_end() && !self.rest().starts_with("*/") {
                    self.advance();
                }
                self.advance();
                self.advance();
            } else if self.peek().is_some_and(char::is_whitespace) {
                self.advance();
            } else {
                return;
            }
        }
    }

    fn skip_annotations(&mut self) {
        while self.peek() == Some('@') {
            self.advance();
            self.word();
            if self.peek() == Some('(') {
                let mut depth = 0;
                while let Some(c) = self.peek() {
                    self.advance();
                    match c {
                        '(' => depth += 1,
                        ')' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                }
            }
            self.skip_trivia();
        }
    }

    /// Reads a word: identifier characters plus `-` (for `no-loop`).
    fn word(&mut self) -> &'src str {
        let start = self.pos;
        while self.peek().is_some_and(|c| is_word_char(c) || c == '-') {
            self.advance();
        }
        &self.source[start..self.pos]
    }

    fn qualified_name(&mut self) -> Result<String> {
        self.skip_trivia();
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| is_word_char(c) || c == '.' || c == '*')
        {
            self.advance();
        }
        if start == self.pos {
            return Err(self.error("expected name"));
        }
        Ok(self.source[start..self.pos].to_string())
    }

    fn string(&mut self) -> Result<String> {
        let span = self.here();
        let Some(quote) = self.peek() else {
            return Err(self.error("expected string"));
        };
        self.advance();
        let mut text = String::new();
        loop {
            match self.peek() {
                Some('\\') => {
                    text.push('\\');
                    self.advance();
                    if let Some(c) = self.peek() {
                        text.push(c);
                        self.advance();
                    }
                }
                Some(c) if c == quote => {
                    self.advance();
                    return Ok(text);
                }
                Some(c) => {
                    text.push(c);
                    self.advance();
                }
                None => return Err(self.error_at(span, "unterminated string literal")),
            }
        }
    }

    fn dialect(&mut self) -> Result<Dialect> {
        self.skip_trivia();
        let span = self.here();
        let name = self.string()?;
        name.parse()
            .map_err(|_| self.error_at(span, &format!("unknown dialect: {name}")))
    }

    fn integer(&mut self) -> Result<i32> {
        self.skip_trivia();
        let span = self.here();
        let start = self.pos;
        if self.peek() == Some('-') {
            self.advance();
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        self.source[start..self.pos]
            .parse()
            .map_err(|_| self.error_at(span, "expected integer"))
    }

    fn optional_bool(&mut self) -> bool {
        self.skip_trivia();
        let mark = self.save();
        match self.word() {
            "true" => true,
            "false" => false,
            _ => {
                self.restore(mark);
                true
            }
        }
    }

    fn optional_char(&mut self, c: char) {
        self.skip_trivia();
        if self.peek() == Some(c) {
            self.advance();
        }
    }

    fn expect_char(&mut self, c: char) -> Result<()> {
        if self.peek() == Some(c) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(&format!("expected '{c}'")))
        }
    }

    fn error(&self, message: &str) -> Error {
        self.error_at(self.here(), message)
    }

    #[allow(clippy::unused_self)]
    fn error_at(&self, span: Span, message: &str) -> Error {
        Error::parse(message, span.line, span.column)
    }
}

/// Builds a constraint, splitting off a leading `name :` binding.
fn constraint(raw: &str, span: Span) -> ConstraintDescr {
    let text = raw.trim_end();
    if let Some(colon) = text.find(':') {
        let (head, tail) = text.split_at(colon);
        let name = head.trim();
        let is_binding = !name.is_empty()
            && name.chars().all(is_word_char)
            && !tail.starts_with("::");
        if is_binding {
            let expr = &tail[1..];
            let offset = colon + 1 + (expr.len() - expr.trim_start().len());
            let consumed = &text[..offset];
            let lines = u32::try_from(consumed.matches('\n').count()).unwrap_or(0);
            let column = match consumed.rfind('\n') {
                Some(nl) => u32::try_from(consumed[nl + 1..].chars().count()).unwrap_or(0) + 1,
                None => span.column + u32::try_from(consumed.chars().count()).unwrap_or(0),
            };
            return ConstraintDescr {
                binding: Some(name.to_string()),
                text: expr.trim().to_string(),
                span: Span::new(span.start + offset, span.start + text.len(), span.line + lines, column),
            };
        }
    }
    ConstraintDescr {
        binding: None,
        text: text.to_string(),
        span: Span::new(span.start, span.start + text.len(), span.line, span.column),
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}
