//! The interactive REPL.
//!
//! Rule files are loaded with `:load`; every load rebuilds the knowledge base
//! and carries the current facts over into a fresh session. Facts are
//! written as constructor calls with literal arguments, for example
//! `:insert Person("Ann", 30)`.

use std::fs;
use std::path::Path;

use rulebook_engine::KnowledgeBuilder;
use rulebook_foundation::{Error, FactHandle, Result, Value};
use rulebook_language::{Lexer, RuleSource, TokenKind};
use rulebook_storage::ObjectFilter;
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::editor::{LineEditor, ReadResult, RustylineEditor};
use crate::session::Session;

/// The interactive REPL.
pub struct Repl<E: LineEditor = RustylineEditor> {
    editor: E,
    builder: KnowledgeBuilder,
    sources: Vec<RuleSource>,
    config: SessionConfig,
    session: Session,
    show_banner: bool,
    prompt: String,
}

impl Repl<RustylineEditor> {
    /// Creates a REPL with the default rustyline editor.
    ///
    /// # Errors
    ///
    /// Returns an error if the editor fails to initialize or the builder's
    /// own packages do not build.
    pub fn new(builder: KnowledgeBuilder, config: SessionConfig) -> Result<Self> {
        Self::with_editor(RustylineEditor::new()?, builder, config)
    }
}

impl<E: LineEditor> Repl<E> {
    /// Creates a REPL with the given editor.
    ///
    /// # Errors
    ///
    /// Returns an error if the builder's own packages do not build.
    pub fn with_editor(editor: E, builder: KnowledgeBuilder, config: SessionConfig) -> Result<Self> {
        let kb = builder.build()?;
        Ok(Self {
            editor,
            session: Session::with_config(kb.into(), config.clone()),
            builder,
            sources: Vec::new(),
            config,
            show_banner: true,
            prompt: "rulebook> ".to_string(),
        })
    }

    /// Disables the welcome banner.
    #[must_use]
    pub const fn without_banner(mut self) -> Self {
        self.show_banner = false;
        self
    }

    /// Sets the prompt.
    #[must_use]
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Returns the session.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Returns the session.
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Returns the line editor.
    #[must_use]
    pub const fn editor(&self) -> &E {
        &self.editor
    }

    /// Runs the REPL loop until EOF or `:quit`.
    ///
    /// # Errors
    ///
    /// Returns an error if reading input fails. Command errors are printed
    /// and the loop continues.
    pub fn run(&mut self) -> Result<()> {
        if self.show_banner {
            println!("Rulebook {}", env!("CARGO_PKG_VERSION"));
            println!("Type :help for commands, Ctrl+D to exit.\n");
        }
        loop {
            let line = match self.editor.read_line(&self.prompt)? {
                ReadResult::Line(line) => line,
                ReadResult::Interrupted => continue,
                ReadResult::Eof => break,
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            self.editor.add_history(&line);
            if matches!(trimmed, ":quit" | ":q") {
                break;
            }
            match self.eval(trimmed) {
                Ok(lines) => {
                    for line in lines {
                        println!("{line}");
                    }
                }
                Err(e) => eprintln!("\x1b[31mError: {e}\x1b[0m"),
            }
        }
        Ok(())
    }

    /// Loads a rule file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the rules do not build.
    /// A failed load leaves the previous rules in place.
    pub fn eval_file(&mut self, path: &Path) -> Result<usize> {
        let text = fs::read_to_string(path)
            .map_err(|e| Error::internal(format!("cannot read {}: {e}", path.display())))?;
        self.load_source(RuleSource::new(path.display().to_string(), text))
    }

    /// Adds a rule source and restarts the session with the current facts.
    ///
    /// Returns the number of rules now loaded.
    ///
    /// # Errors
    ///
    /// Returns the build error if the rules do not build.
    pub fn load_source(&mut self, source: RuleSource) -> Result<usize> {
        let mut builder = self.builder.clone();
        for existing in &self.sources {
            builder.add_source(existing.clone());
        }
        builder.add_source(source.clone());
        let kb = builder.build()?;
        for diagnostic in kb.diagnostics() {
            info!(%diagnostic, "build note");
        }
        let facts: Vec<Value> = self.session.snapshot().values().cloned().collect();
        let mut session = Session::with_config(kb.into(), self.config.clone());
        for fact in facts {
            session.insert(fact)?;
        }
        debug!(path = %source.path, "rules loaded");
        self.sources.push(source);
        self.session = session;
        Ok(self.session.knowledge_base().rule_count())
    }

    /// Evaluates one command and returns the lines to print.
    ///
    /// # Errors
    ///
    /// Returns an error if the command is malformed or fails.
    pub fn eval(&mut self, line: &str) -> Result<Vec<String>> {
        let (command, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(c, r)| (c, r.trim()));
        match command {
            ":help" | ":h" => Ok(HELP.lines().map(str::to_string).collect()),
            ":load" => {
                let count = self.eval_file(Path::new(rest))?;
                Ok(vec![format!("loaded {rest}, {count} rules")])
            }
            ":insert" => {
                let fact = self.parse_fact(rest)?;
                let handle = self.session.insert(fact)?;
                Ok(vec![handle.to_string()])
            }
            ":update" => {
                let (handle, fact) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| Error::evaluation("usage: :update #N <fact>"))?;
                let handle = parse_handle(handle)?;
                let fact = self.parse_fact(fact.trim())?;
                self.session.update(handle, fact)?;
                Ok(Vec::new())
            }
            ":retract" => {
                self.session.retract(parse_handle(rest)?)?;
                Ok(Vec::new())
            }
            ":fire" => {
                let result = if rest.is_empty() {
                    self.session.fire_all_rules()
                } else {
                    let limit = rest
                        .parse()
                        .map_err(|_| Error::evaluation(format!("invalid firing limit: {rest}")))?;
                    self.session.fire_until_limit(limit)
                };
                let mut lines = self.session.take_output();
                lines.push(format!("fired {} rules", result?));
                Ok(lines)
            }
            ":facts" => {
                let filter = if rest.is_empty() {
                    ObjectFilter::all()
                } else {
                    ObjectFilter::of_type(rest)
                };
                let registry = self.session.knowledge_base().registry().clone();
                Ok(self
                    .session
                    .snapshot()
                    .iter()
                    .filter(|(_, fact)| filter.accepts_in(fact, &registry))
                    .map(|(handle, fact)| format!("{handle} {fact}"))
                    .collect())
            }
            ":agenda" => Ok(self
                .session
                .agenda()
                .iter()
                .map(|a| format!("{a} salience {}", a.salience))
                .collect()),
            ":rules" => Ok(self
                .session
                .knowledge_base()
                .rules()
                .map(|r| {
                    format!(
                        "{} (salience {}, dialect {}{})",
                        r.name(),
                        r.salience(),
                        r.dialect(),
                        if r.enabled() { "" } else { ", disabled" }
                    )
                })
                .collect()),
            ":stats" => {
                let stats = self.session.memory_stats();
                Ok(vec![
                    format!("facts: {}", self.session.fact_count()),
                    format!("alpha entries: {}", stats.alpha_facts),
                    format!("tokens: {}", stats.tokens),
                    format!("index entries: {}", stats.indexed),
                    format!("agenda: {}", self.session.agenda_len()),
                    format!("fired: {}", self.session.fired_count()),
                ])
            }
            other => Err(Error::evaluation(format!(
                "unknown command: {other} (try :help)"
            ))),
        }
    }

    /// Parses a literal or a constructor call with literal arguments.
    fn parse_fact(&self, text: &str) -> Result<Value> {
        let tokens = Lexer::tokenize_all(text);
        let mut kinds = tokens.iter().map(|t| &t.kind).peekable();

        let Some(TokenKind::Ident(first)) = kinds.peek().copied() else {
            let value = literal(&mut kinds)?;
            expect_end(&mut kinds)?;
            return Ok(value);
        };
        kinds.next();
        let mut type_name = first.clone();
        while matches!(kinds.peek(), Some(TokenKind::Dot)) {
            kinds.next();
            match kinds.next() {
                Some(TokenKind::Ident(part)) => {
                    type_name.push('.');
                    type_name.push_str(part);
                }
                _ => return Err(Error::evaluation("expected type name after '.'")),
            }
        }
        if !matches!(kinds.next(), Some(TokenKind::LParen)) {
            return Err(Error::evaluation(format!("expected '(' after {type_name}")));
        }
        let mut args = Vec::new();
        if matches!(kinds.peek(), Some(TokenKind::RParen)) {
            kinds.next();
        } else {
            loop {
                args.push(literal(&mut kinds)?);
                match kinds.next() {
                    Some(TokenKind::Comma) => {}
                    Some(TokenKind::RParen) => break,
                    _ => return Err(Error::evaluation("expected ',' or ')'")),
                }
            }
        }
        expect_end(&mut kinds)?;
        self.session.instantiate(&type_name, args)
    }
}

fn literal<'a>(kinds: &mut impl Iterator<Item = &'a TokenKind>) -> Result<Value> {
    match kinds.next() {
        Some(TokenKind::Int(n)) => Ok(Value::Int(*n)),
        Some(TokenKind::Float(n)) => Ok(Value::Float(*n)),
        Some(TokenKind::String(s)) => Ok(Value::from(s.as_str())),
        Some(TokenKind::True) => Ok(Value::Bool(true)),
        Some(TokenKind::False) => Ok(Value::Bool(false)),
        Some(TokenKind::Null) => Ok(Value::Nil),
        Some(TokenKind::Minus) => match kinds.next() {
            Some(TokenKind::Int(n)) => Ok(Value::Int(-n)),
            Some(TokenKind::Float(n)) => Ok(Value::Float(-n)),
            _ => Err(Error::evaluation("expected a number after '-'")),
        },
        Some(other) => Err(Error::evaluation(format!("expected a literal, found {other}"))),
        None => Err(Error::evaluation("expected a literal")),
    }
}

fn expect_end<'a>(kinds: &mut impl Iterator<Item = &'a TokenKind>) -> Result<()> {
    match kinds.next() {
        None | Some(TokenKind::Eof) => Ok(()),
        Some(other) => Err(Error::evaluation(format!("unexpected {other}"))),
    }
}

fn parse_handle(text: &str) -> Result<FactHandle> {
    text.trim()
        .trim_start_matches('#')
        .parse()
        .map(FactHandle::new)
        .map_err(|_| Error::evaluation(format!("invalid fact handle: {text}")))
}

const HELP: &str = "\
:load <file>            Load a rule file and rebuild
:insert <fact>          Insert a fact, e.g. Person(\"Ann\", 30) or 42
:update #N <fact>       Replace a fact
:retract #N             Retract a fact
:fire [N]               Fire all activations, or at most N
:facts [Type]           List facts, optionally of one type
:agenda                 List queued activations
:rules                  List loaded rules
:stats                  Show memory sizes
:quit                   Exit";
