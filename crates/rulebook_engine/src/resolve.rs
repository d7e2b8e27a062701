//! Name and type resolution.
//!
//! Turns a [`RuleDescr`] into a [`ResolvedRule`]: pattern types are resolved
//! against the registry, identifiers are bound to pattern positions or local
//! slots, getters and setters become field reads and writes, and every
//! constraint is type checked and classified as an alpha test, an indexable
//! equality join, or a plain join test. Both build modes lower from the result.

use std::collections::HashMap;
use std::sync::Arc;

use rulebook_foundation::{
    Diagnostic, Error, ErrorKind, FactType, FieldType, PropertyMask, TypeRegistry, Value,
};
use rulebook_language::parser::{parse_expression, parse_statements};
use rulebook_language::{ast, BinaryOp, Dialect, Literal, ModifyItem, RuleDescr, Span, UnaryOp};

use crate::ir::{self, FieldAssign, Method};

/// A rule after resolution, ready to be lowered.
#[derive(Clone, Debug)]
pub struct ResolvedRule {
    /// Rule name.
    pub name: Arc<str>,
    /// Agenda priority.
    pub salience: i32,
    /// Whether the rule's own consequence may re-activate it.
    pub no_loop: bool,
    /// Whether the rule is wired into the network.
    pub enabled: bool,
    /// Consequence dialect.
    pub dialect: Dialect,
    /// Patterns in join order.
    pub patterns: Vec<ResolvedPattern>,
    /// Consequence statements.
    pub consequence: Vec<ir::Stmt>,
    /// Number of local slots the consequence uses.
    pub locals: usize,
    /// Position of the rule header.
    pub span: Span,
}

/// A pattern after resolution.
#[derive(Clone, Debug)]
pub struct ResolvedPattern {
    /// Qualified type name.
    pub type_name: Arc<str>,
    /// Declaration bound to the whole fact, if any.
    pub binding: Option<String>,
    /// Tests over the tested fact alone.
    pub alpha: Vec<ir::Expr>,
    /// Tests involving earlier patterns.
    pub joins: Vec<ir::Expr>,
    /// Equality joins usable as a hash index: (expression over the tested
    /// fact, expression over earlier facts).
    pub index: Vec<(ir::Expr, ir::Expr)>,
    /// Fields whose change can alter this pattern's matches.
    pub watch: PropertyMask,
    /// Whether the tested fact may also be bound by an earlier pattern.
    pub allow_same_fact: bool,
}

/// Static type of a resolved expression.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Ty {
    Bool,
    Int,
    Float,
    Str,
    Null,
    Object(Arc<str>),
    Any,
}

impl Ty {
    fn of_type(ty: &FactType) -> Self {
        match ty.name() {
            "Integer" | "Long" | "Short" => Self::Int,
            "Double" | "Float" => Self::Float,
            "String" => Self::Str,
            "Boolean" => Self::Bool,
            "Number" | "Object" => Self::Any,
            _ => Self::Object(ty.name_arc()),
        }
    }

    fn of_field(ty: &FieldType) -> Self {
        match ty {
            FieldType::Int => Self::Int,
            FieldType::Float => Self::Float,
            FieldType::String => Self::Str,
            FieldType::Bool => Self::Bool,
            FieldType::Object(name) => Self::Object(name.clone()),
            FieldType::Any => Self::Any,
        }
    }

    const fn is_numeric(&self) -> bool {
        matches!(self, Self::Int | Self::Float | Self::Any)
    }

    const fn is_boolean(&self) -> bool {
        matches!(self, Self::Bool | Self::Any)
    }

    fn describe(&self) -> String {
        match self {
            Self::Bool => "boolean".into(),
            Self::Int => "int".into(),
            Self::Float => "double".into(),
            Self::Str => "String".into(),
            Self::Null => "null".into(),
            Self::Object(name) => name.to_string(),
            Self::Any => "Object".into(),
        }
    }
}

/// A resolution problem, located in rule source.
struct Problem {
    message: String,
    span: Span,
}

impl Problem {
    fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }

    fn into_diagnostic(self, rule: &str) -> Diagnostic {
        Diagnostic::error(self.message)
            .in_rule(rule)
            .at(self.span.line, self.span.column)
    }
}

type Resolved<T> = std::result::Result<T, Problem>;

/// Converts a front end error into a diagnostic, keeping its position.
#[must_use]
pub fn error_diagnostic(err: &Error) -> Diagnostic {
    match &err.kind {
        ErrorKind::ParseError {
            message,
            line,
            column,
        } => Diagnostic::error(message.clone()).at(*line, *column),
        ErrorKind::RuleBuild(diagnostics) if diagnostics.len() == 1 => diagnostics[0].clone(),
        other => Diagnostic::error(other.to_string()),
    }
}

#[derive(Clone, Debug)]
enum Binding {
    /// Bound to the whole fact of a pattern.
    Fact { pattern: usize, ty: Ty },
    /// Bound to an expression over facts, in `Fact(n)` form.
    Expr { expr: ir::Expr, ty: Ty },
}

#[derive(Clone, Debug)]
struct Local {
    slot: usize,
    ty: FieldType,
}

struct Locals {
    scopes: Vec<HashMap<String, Local>>,
    next: usize,
}

impl Locals {
    fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
            next: 0,
        }
    }

    fn get(&self, name: &str) -> Option<&Local> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    fn declare(&mut self, name: &str, ty: FieldType) -> usize {
        let slot = self.next;
        self.next += 1;
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), Local { slot, ty });
        }
        slot
    }
}

/// Resolves rules of one package against a type registry.
pub struct Resolver<'a> {
    registry: &'a TypeRegistry,
    package: &'a str,
    imports: &'a [String],
}

impl<'a> Resolver<'a> {
    /// Creates a resolver for a package.
    #[must_use]
    pub const fn new(registry: &'a TypeRegistry, package: &'a str, imports: &'a [String]) -> Self {
        Self {
            registry,
            package,
            imports,
        }
    }

    /// Resolves a type name as written in this package.
    #[must_use]
    pub fn resolve_type(&self, name: &str) -> Option<Arc<FactType>> {
        self.registry.resolve(name, self.package, self.imports)
    }

    /// Resolves a rule.
    ///
    /// # Errors
    /// Returns every problem found, as error diagnostics tagged with the
    /// rule name.
    pub fn resolve_rule(
        &self,
        rule: &RuleDescr,
        default_dialect: Dialect,
    ) -> std::result::Result<ResolvedRule, Vec<Diagnostic>> {
        let dialect = rule.attributes.dialect.unwrap_or(default_dialect);
        let mut scope = RuleScope {
            resolver: self,
            decls: HashMap::new(),
            problems: Vec::new(),
        };

        let mut patterns = Vec::with_capacity(rule.patterns.len());
        for (position, pattern) in rule.patterns.iter().enumerate() {
            patterns.push(scope.pattern(position, pattern));
        }
        compute_watch_masks(&mut patterns);

        let (consequence, locals) = scope.consequence(rule, dialect);

        if !scope.problems.is_empty() {
            return Err(scope
                .problems
                .into_iter()
                .map(|p| p.into_diagnostic(&rule.name))
                .collect());
        }
        Ok(ResolvedRule {
            name: rule.name.as_str().into(),
            salience: rule.attributes.salience,
            no_loop: rule.attributes.no_loop,
            enabled: rule.attributes.enabled,
            dialect,
            patterns,
            consequence,
            locals,
            span: rule.span,
        })
    }

    fn field_type(&self, ty: &Ty, field: &str) -> Option<Ty> {
        match ty {
            Ty::Any => Some(Ty::Any),
            Ty::Object(name) => self
                .registry
                .field(name, field)
                .map(|def| Ty::of_field(&def.ty)),
            _ => None,
        }
    }

    fn declared_field(&self, ty: &Ty, field: &str) -> Option<FieldType> {
        match ty {
            Ty::Any => Some(FieldType::Any),
            Ty::Object(name) => self.registry.field(name, field).map(|def| def.ty.clone()),
            _ => None,
        }
    }

    fn fits(&self, value: &Ty, field: &FieldType) -> bool {
        match (field, value) {
            (FieldType::Any, _)
            | (_, Ty::Any)
            | (FieldType::Int, Ty::Int)
            | (FieldType::Float, Ty::Int | Ty::Float)
            | (FieldType::String, Ty::Str | Ty::Null)
            | (FieldType::Bool, Ty::Bool)
            | (FieldType::Object(_), Ty::Null) => true,
            (FieldType::Object(expected), Ty::Object(actual)) => {
                expected == actual || self.registry.is_assignable(actual, expected)
            }
            _ => false,
        }
    }

    fn local_type(&self, name: &str, span: Span) -> Resolved<FieldType> {
        match FieldType::from_name(name) {
            FieldType::Object(raw) => self
                .resolve_type(&raw)
                .map(|ty| match Ty::of_type(&ty) {
                    Ty::Int => FieldType::Int,
                    Ty::Float => FieldType::Float,
                    Ty::Str => FieldType::String,
                    Ty::Bool => FieldType::Bool,
                    Ty::Object(name) => FieldType::Object(name),
                    Ty::Null | Ty::Any => FieldType::Any,
                })
                .ok_or_else(|| Problem::new(format!("unknown type '{raw}'"), span)),
            other => Ok(other),
        }
    }
}

struct RuleScope<'r, 'a> {
    resolver: &'r Resolver<'a>,
    decls: HashMap<String, Binding>,
    problems: Vec<Problem>,
}

impl RuleScope<'_, '_> {
    fn report(&mut self, problem: Problem) {
        self.problems.push(problem);
    }

    fn declare(&mut self, name: &str, binding: Binding, span: Span) {
        if self.decls.contains_key(name) {
            self.report(Problem::new(format!("duplicate declaration '{name}'"), span));
            return;
        }
        self.decls.insert(name.to_string(), binding);
    }

    fn cx<'s>(&'s self, this: Option<(usize, Ty)>, locals: Option<&'s Locals>) -> Cx<'s> {
        Cx {
            resolver: self.resolver,
            decls: &self.decls,
            this,
            locals,
        }
    }

    fn pattern(
        &mut self,
        position: usize,
        pattern: &rulebook_language::PatternDescr,
    ) -> ResolvedPattern {
        let (type_name, ty) = match self.resolver.resolve_type(&pattern.type_name) {
            Some(fact_type) => (fact_type.name_arc(), Ty::of_type(&fact_type)),
            None => {
                self.report(Problem::new(
                    format!("unknown type '{}'", pattern.type_name),
                    pattern.span,
                ));
                (Arc::from(pattern.type_name.as_str()), Ty::Any)
            }
        };
        if let Some(binding) = &pattern.binding {
            let fact = Binding::Fact {
                pattern: position,
                ty: ty.clone(),
            };
            self.declare(binding, fact, pattern.span);
        }

        let mut resolved = ResolvedPattern {
            type_name,
            binding: pattern.binding.clone(),
            alpha: Vec::new(),
            joins: Vec::new(),
            index: Vec::new(),
            watch: PropertyMask::empty(),
            allow_same_fact: false,
        };
        for constraint in &pattern.constraints {
            let parsed = match parse_expression(
                &constraint.text,
                constraint.span.line,
                constraint.span.column,
            ) {
                Ok(expr) => expr,
                Err(err) => {
                    let diagnostic = error_diagnostic(&err);
                    self.report(Problem::new(
                        diagnostic.message,
                        Span::new(
                            0,
                            0,
                            diagnostic.line.unwrap_or(constraint.span.line),
                            diagnostic.column.unwrap_or(constraint.span.column),
                        ),
                    ));
                    continue;
                }
            };
            let test = match &constraint.binding {
                Some(name) => self.field_binding(position, &ty, name, &parsed, constraint.span),
                None => Some(parsed),
            };
            let Some(test) = test else { continue };
            let result = self.cx(Some((position, ty.clone())), None).expr(&test);
            match result {
                Ok((expr, expr_ty)) if expr_ty.is_boolean() => classify(&mut resolved, expr),
                Ok((_, expr_ty)) => self.report(Problem::new(
                    format!(
                        "constraint '{}' must be boolean, found {}",
                        constraint.text.trim(),
                        expr_ty.describe()
                    ),
                    test.span(),
                )),
                Err(problem) => self.report(problem),
            }
        }
        resolved
    }

    /// Binds `name : expr` and returns the test it carries, if any.
    ///
    /// `$a : age` only binds; `$a : age > 3` binds `age` and tests the whole.
    fn field_binding(
        &mut self,
        position: usize,
        ty: &Ty,
        name: &str,
        parsed: &ast::Expr,
        span: Span,
    ) -> Option<ast::Expr> {
        let (bound, test) = match parsed {
            ast::Expr::Binary { op, lhs, .. } if op.is_comparison() => {
                (&**lhs, Some(parsed.clone()))
            }
            other => (other, None),
        };
        match self.cx(Some((position, ty.clone())), None).expr(bound) {
            Ok((expr, expr_ty)) => {
                let binding = Binding::Expr {
                    expr: expr.unbase(position),
                    ty: expr_ty,
                };
                self.declare(name, binding, span);
            }
            Err(problem) => self.report(problem),
        }
        test
    }

    fn consequence(&mut self, rule: &RuleDescr, dialect: Dialect) -> (Vec<ir::Stmt>, usize) {
        let parsed = match parse_statements(
            &rule.consequence,
            dialect,
            rule.consequence_span.line,
            rule.consequence_span.column,
        ) {
            Ok(stmts) => stmts,
            Err(err) => {
                let diagnostic = error_diagnostic(&err);
                self.report(Problem::new(
                    diagnostic.message,
                    Span::new(
                        0,
                        0,
                        diagnostic.line.unwrap_or(rule.consequence_span.line),
                        diagnostic.column.unwrap_or(rule.consequence_span.column),
                    ),
                ));
                return (Vec::new(), 0);
            }
        };
        let mut locals = Locals::new();
        let stmts = self.block(&parsed, &mut locals, dialect);
        (stmts, locals.next)
    }

    fn block(
        &mut self,
        stmts: &[ast::Stmt],
        locals: &mut Locals,
        dialect: Dialect,
    ) -> Vec<ir::Stmt> {
        let mut out = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            match self.stmt(stmt, locals, dialect) {
                Ok(Some(stmt)) => out.push(stmt),
                Ok(None) => {}
                Err(problem) => self.report(problem),
            }
        }
        out
    }

    fn nested(
        &mut self,
        stmts: &[ast::Stmt],
        locals: &mut Locals,
        dialect: Dialect,
    ) -> Vec<ir::Stmt> {
        locals.scopes.push(HashMap::new());
        let out = self.block(stmts, locals, dialect);
        locals.scopes.pop();
        out
    }

    fn expr(&self, expr: &ast::Expr, locals: &Locals) -> Resolved<(ir::Expr, Ty)> {
        self.cx(None, Some(locals)).expr(expr)
    }

    fn stmt(
        &mut self,
        stmt: &ast::Stmt,
        locals: &mut Locals,
        dialect: Dialect,
    ) -> Resolved<Option<ir::Stmt>> {
        match stmt {
            ast::Stmt::Expr(expr) => self.expr_stmt(expr, locals).map(Some),
            ast::Stmt::Local {
                ty,
                name,
                init,
                span,
            } => {
                self.check_new_local(name, locals, *span)?;
                let ty = self.resolver.local_type(ty, *span)?;
                let init = match init {
                    Some(init) => {
                        let (value, value_ty) = self.expr(init, locals)?;
                        self.check_fits(&value_ty, &ty, name, init.span())?;
                        value
                    }
                    None => ir::Expr::Const(ty.default_value()),
                };
                let slot = locals.declare(name, ty.clone());
                Ok(Some(ir::Stmt::Let { slot, ty, init }))
            }
            ast::Stmt::Assign {
                target,
                value,
                span,
            } => self.assign(target, value, *span, locals, dialect).map(Some),
            ast::Stmt::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                let (cond_ir, cond_ty) = self.expr(cond, locals)?;
                if !cond_ty.is_boolean() {
                    return Err(Problem::new(
                        format!("condition must be boolean, found {}", cond_ty.describe()),
                        cond.span(),
                    ));
                }
                let then_branch = self.nested(then_branch, locals, dialect);
                let else_branch = self.nested(else_branch, locals, dialect);
                Ok(Some(ir::Stmt::If {
                    cond: cond_ir,
                    then_branch,
                    else_branch,
                }))
            }
            ast::Stmt::Modify {
                target,
                items,
                span,
            } => {
                let (pattern, ty) = self.fact_target(target, "modify", *span)?;
                let mut assigns = Vec::with_capacity(items.len());
                for item in items {
                    let (field, value, span) = match item {
                        ModifyItem::Setter { name, args, span } => {
                            let field = setter_field(name).ok_or_else(|| {
                                Problem::new(format!("'{name}' is not a setter"), *span)
                            })?;
                            let [value] = args.as_slice() else {
                                return Err(Problem::new(
                                    format!("'{name}' takes exactly one argument"),
                                    *span,
                                ));
                            };
                            (field, value, *span)
                        }
                        ModifyItem::Assign { field, value, span } => {
                            (field.clone(), value, *span)
                        }
                    };
                    assigns.push(self.field_assign(&ty, &field, value, span, locals)?);
                }
                Ok(Some(ir::Stmt::Modify { pattern, assigns }))
            }
        }
    }

    fn expr_stmt(&self, expr: &ast::Expr, locals: &Locals) -> Resolved<ir::Stmt> {
        let ast::Expr::Call {
            target,
            name,
            args,
            span,
        } = expr
        else {
            return Ok(ir::Stmt::Expr(self.expr(expr, locals)?.0));
        };
        let span = *span;
        match (target.as_deref(), name.as_str()) {
            (None, "insert" | "insertLogical") => {
                let [fact] = args.as_slice() else {
                    return Err(Problem::new("insert takes exactly one argument", span));
                };
                Ok(ir::Stmt::Insert(self.expr(fact, locals)?.0))
            }
            (None, "update") => {
                let [fact] = args.as_slice() else {
                    return Err(Problem::new("update takes exactly one argument", span));
                };
                let (pattern, _) = self.fact_target(fact, "update", span)?;
                Ok(ir::Stmt::Update(pattern))
            }
            (None, "retract" | "delete") => {
                let [fact] = args.as_slice() else {
                    return Err(Problem::new(format!("{name} takes exactly one argument"), span));
                };
                let (pattern, _) = self.fact_target(fact, name, span)?;
                Ok(ir::Stmt::Retract(pattern))
            }
            (Some(out), "println" | "print")
                if out.dotted_path().as_deref() == Some("System.out") =>
            {
                self.print(args, span, locals)
            }
            (None, "println" | "print") => self.print(args, span, locals),
            (Some(ast::Expr::Name(var, var_span)), setter) if setter_field(setter).is_some() => {
                let field = setter_field(setter).unwrap_or_default();
                let [value] = args.as_slice() else {
                    return Err(Problem::new(
                        format!("'{setter}' takes exactly one argument"),
                        span,
                    ));
                };
                self.set_field(var, *var_span, &field, value, span, locals)
            }
            _ => Ok(ir::Stmt::Expr(self.expr(expr, locals)?.0)),
        }
    }

    fn print(&self, args: &[ast::Expr], span: Span, locals: &Locals) -> Resolved<ir::Stmt> {
        match args {
            [] => Ok(ir::Stmt::Print(ir::Expr::Const(Value::String("".into())))),
            [value] => Ok(ir::Stmt::Print(self.expr(value, locals)?.0)),
            _ => Err(Problem::new("println takes at most one argument", span)),
        }
    }

    fn set_field(
        &self,
        var: &str,
        var_span: Span,
        field: &str,
        value: &ast::Expr,
        span: Span,
        locals: &Locals,
    ) -> Resolved<ir::Stmt> {
        if let Some(local) = locals.get(var) {
            let ty = Ty::of_field(&local.ty);
            let assign = self.field_assign(&ty, field, value, span, locals)?;
            return Ok(ir::Stmt::SetLocalField {
                slot: local.slot,
                assign,
            });
        }
        match self.decls.get(var) {
            Some(Binding::Fact { pattern, ty }) => {
                let assign = self.field_assign(ty, field, value, span, locals)?;
                Ok(ir::Stmt::SetFactField {
                    pattern: *pattern,
                    assign,
                })
            }
            Some(Binding::Expr { .. }) => Err(Problem::new(
                format!("cannot set field '{field}' on field declaration '{var}'"),
                span,
            )),
            None => Err(Problem::new(
                format!("unresolved identifier '{var}'"),
                var_span,
            )),
        }
    }

    fn field_assign(
        &self,
        ty: &Ty,
        field: &str,
        value: &ast::Expr,
        span: Span,
        locals: &Locals,
    ) -> Resolved<FieldAssign> {
        let field_ty = self.resolver.declared_field(ty, field).ok_or_else(|| {
            Problem::new(
                format!("unknown field '{field}' on type {}", ty.describe()),
                span,
            )
        })?;
        let (value_ir, value_ty) = self.expr(value, locals)?;
        self.check_fits(&value_ty, &field_ty, field, value.span())?;
        Ok(FieldAssign {
            field: field.into(),
            ty: field_ty,
            value: value_ir,
        })
    }

    fn check_fits(&self, value: &Ty, target: &FieldType, name: &str, span: Span) -> Resolved<()> {
        if self.resolver.fits(value, target) {
            Ok(())
        } else {
            Err(Problem::new(
                format!(
                    "cannot assign {} to '{name}' of type {target}",
                    value.describe()
                ),
                span,
            ))
        }
    }

    fn check_new_local(&self, name: &str, locals: &Locals, span: Span) -> Resolved<()> {
        if locals.get(name).is_some() || self.decls.contains_key(name) {
            return Err(Problem::new(format!("duplicate local '{name}'"), span));
        }
        Ok(())
    }

    fn assign(
        &self,
        target: &ast::Expr,
        value: &ast::Expr,
        span: Span,
        locals: &mut Locals,
        dialect: Dialect,
    ) -> Resolved<ir::Stmt> {
        match target {
            ast::Expr::Name(name, name_span) => {
                if let Some(local) = locals.get(name).cloned() {
                    let (value_ir, value_ty) = self.expr(value, locals)?;
                    self.check_fits(&value_ty, &local.ty, name, value.span())?;
                    return Ok(ir::Stmt::SetLocal {
                        slot: local.slot,
                        ty: local.ty,
                        value: value_ir,
                    });
                }
                if self.decls.contains_key(name) {
                    return Err(Problem::new(
                        format!("cannot assign to declaration '{name}'"),
                        *name_span,
                    ));
                }
                if dialect == Dialect::Mvel {
                    // MVEL declares untyped variables on first assignment.
                    let (value_ir, _) = self.expr(value, locals)?;
                    let slot = locals.declare(name, FieldType::Any);
                    return Ok(ir::Stmt::Let {
                        slot,
                        ty: FieldType::Any,
                        init: value_ir,
                    });
                }
                Err(Problem::new(
                    format!("unresolved identifier '{name}'"),
                    *name_span,
                ))
            }
            ast::Expr::Field {
                target: object,
                name: field,
                ..
            } => match &**object {
                ast::Expr::Name(var, var_span) => {
                    self.set_field(var, *var_span, field, value, span, locals)
                }
                _ => Err(Problem::new("invalid assignment target", span)),
            },
            _ => Err(Problem::new("invalid assignment target", span)),
        }
    }

    /// Resolves the target of `update`, `retract` or `modify`.
    fn fact_target(&self, target: &ast::Expr, op: &str, span: Span) -> Resolved<(usize, Ty)> {
        let name = target.as_name().ok_or_else(|| {
            Problem::new(format!("{op} target must be a pattern declaration"), span)
        })?;
        match self.decls.get(name) {
            Some(Binding::Fact { pattern, ty }) => Ok((*pattern, ty.clone())),
            Some(Binding::Expr { .. }) => Err(Problem::new(
                format!("{op} target '{name}' is bound to a field, not a fact"),
                target.span(),
            )),
            None => Err(Problem::new(
                format!("unresolved identifier '{name}'"),
                target.span(),
            )),
        }
    }
}

/// Expression resolution context.
struct Cx<'s> {
    resolver: &'s Resolver<'s>,
    decls: &'s HashMap<String, Binding>,
    /// Position and type of the pattern being tested.
    this: Option<(usize, Ty)>,
    locals: Option<&'s Locals>,
}

impl Cx<'_> {
    fn expr(&self, expr: &ast::Expr) -> Resolved<(ir::Expr, Ty)> {
        match expr {
            ast::Expr::Literal(lit, _) => Ok(literal(lit)),
            ast::Expr::Name(name, span) => self.name(name, *span),
            ast::Expr::Field { target, name, span } => {
                let (target, ty) = self.expr(target)?;
                self.field(target, &ty, name, *span)
            }
            ast::Expr::Call {
                target,
                name,
                args,
                span,
            } => match target {
                Some(target) => self.call(target, name, args, *span),
                None => Err(Problem::new(
                    format!("'{name}' cannot be used as an expression"),
                    *span,
                )),
            },
            ast::Expr::Unary { op, operand, span } => {
                let (operand, ty) = self.expr(operand)?;
                let result = match op {
                    UnaryOp::Neg if ty.is_numeric() => ty,
                    UnaryOp::Not if ty.is_boolean() => Ty::Bool,
                    UnaryOp::Neg => {
                        return Err(Problem::new(
                            format!("cannot negate {}", ty.describe()),
                            *span,
                        ))
                    }
                    UnaryOp::Not => {
                        return Err(Problem::new(
                            format!("operator ! requires boolean, found {}", ty.describe()),
                            *span,
                        ))
                    }
                };
                Ok((
                    ir::Expr::Unary {
                        op: *op,
                        operand: Box::new(operand),
                    },
                    result,
                ))
            }
            ast::Expr::Binary { op, lhs, rhs, span } => {
                let (lhs, lhs_ty) = self.expr(lhs)?;
                let (rhs, rhs_ty) = self.expr(rhs)?;
                let ty = binary_type(*op, &lhs_ty, &rhs_ty).ok_or_else(|| {
                    Problem::new(
                        format!(
                            "operator {} cannot be applied to {} and {}",
                            op.symbol(),
                            lhs_ty.describe(),
                            rhs_ty.describe()
                        ),
                        *span,
                    )
                })?;
                Ok((
                    ir::Expr::Binary {
                        op: *op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    },
                    ty,
                ))
            }
            ast::Expr::New {
                type_name,
                args,
                span,
            } => self.new_object(type_name, args, *span),
        }
    }

    fn name(&self, name: &str, span: Span) -> Resolved<(ir::Expr, Ty)> {
        if name == "this" {
            return match &self.this {
                Some((_, ty)) => Ok((ir::Expr::This, ty.clone())),
                None => Err(Problem::new("'this' is only valid inside a pattern", span)),
            };
        }
        if let Some(local) = self.locals.and_then(|locals| locals.get(name)) {
            return Ok((ir::Expr::Local(local.slot), Ty::of_field(&local.ty)));
        }
        let current = self.this.as_ref().map(|(position, _)| *position);
        match self.decls.get(name) {
            Some(Binding::Fact { pattern, ty }) => {
                let expr = if current == Some(*pattern) {
                    ir::Expr::This
                } else {
                    ir::Expr::Fact(*pattern)
                };
                return Ok((expr, ty.clone()));
            }
            Some(Binding::Expr { expr, ty }) => {
                let expr = match current {
                    Some(position) => expr.clone().rebase(position),
                    None => expr.clone(),
                };
                return Ok((expr, ty.clone()));
            }
            None => {}
        }
        if let Some((_, ty)) = &self.this {
            if let Some(field_ty) = self.resolver.field_type(ty, name).filter(|_| *ty != Ty::Any)
            {
                return Ok((ir::Expr::field(ir::Expr::This, name), field_ty));
            }
        }
        Err(Problem::new(
            format!("unresolved identifier '{name}'"),
            span,
        ))
    }

    fn field(&self, target: ir::Expr, ty: &Ty, name: &str, span: Span) -> Resolved<(ir::Expr, Ty)> {
        match self.resolver.field_type(ty, name) {
            Some(field_ty) => Ok((ir::Expr::field(target, name), field_ty)),
            None => Err(Problem::new(
                format!("unknown field '{name}' on type {}", ty.describe()),
                span,
            )),
        }
    }

    fn call(
        &self,
        target: &ast::Expr,
        name: &str,
        args: &[ast::Expr],
        span: Span,
    ) -> Resolved<(ir::Expr, Ty)> {
        let (receiver, ty) = self.expr(target)?;
        let prefers_getter = match ty {
            Ty::Object(_) => true,
            Ty::Any => Method::from_name(name).is_none(),
            _ => false,
        };
        if args.is_empty() && prefers_getter {
            if let Some(field) = getter_field(name) {
                if let Some(field_ty) = self.resolver.field_type(&ty, &field) {
                    return Ok((ir::Expr::field(receiver, field), field_ty));
                }
            }
        }
        let Some(method) = Method::from_name(name).filter(|m| method_applies(*m, &ty)) else {
            return Err(Problem::new(
                format!("unknown method '{name}' on type {}", ty.describe()),
                span,
            ));
        };
        if args.len() != method.arity() {
            return Err(Problem::new(
                format!(
                    "'{name}' takes {} argument(s), found {}",
                    method.arity(),
                    args.len()
                ),
                span,
            ));
        }
        let args = args
            .iter()
            .map(|arg| self.expr(arg).map(|(expr, _)| expr))
            .collect::<Resolved<Vec<_>>>()?;
        Ok((
            ir::Expr::Method {
                target: Box::new(receiver),
                method,
                args,
            },
            method_type(method),
        ))
    }

    fn new_object(
        &self,
        type_name: &str,
        args: &[ast::Expr],
        span: Span,
    ) -> Resolved<(ir::Expr, Ty)> {
        let fact_type = self
            .resolver
            .resolve_type(type_name)
            .ok_or_else(|| Problem::new(format!("unknown type '{type_name}'"), span))?;
        if fact_type.is_builtin() {
            return Err(Problem::new(
                format!("cannot construct built-in type {type_name}"),
                span,
            ));
        }
        let fields = self.resolver.registry.all_fields(fact_type.name());
        if args.len() > fields.len() {
            return Err(Problem::new(
                format!(
                    "constructor of {} takes at most {} argument(s), found {}",
                    fact_type.name(),
                    fields.len(),
                    args.len()
                ),
                span,
            ));
        }
        let mut resolved = Vec::with_capacity(args.len());
        for (arg, def) in args.iter().zip(&fields) {
            let (expr, ty) = self.expr(arg)?;
            if !self.resolver.fits(&ty, &def.ty) {
                return Err(Problem::new(
                    format!(
                        "cannot pass {} as '{}' of type {}",
                        ty.describe(),
                        def.name,
                        def.ty
                    ),
                    arg.span(),
                ));
            }
            resolved.push(expr);
        }
        Ok((
            ir::Expr::New {
                type_name: fact_type.name_arc(),
                fields: fields.into(),
                args: resolved,
            },
            Ty::Object(fact_type.name_arc()),
        ))
    }
}

fn literal(lit: &Literal) -> (ir::Expr, Ty) {
    let (value, ty) = match lit {
        Literal::Null => (Value::Nil, Ty::Null),
        Literal::Bool(b) => (Value::Bool(*b), Ty::Bool),
        Literal::Int(n) => (Value::Int(*n), Ty::Int),
        Literal::Float(n) => (Value::Float(*n), Ty::Float),
        Literal::String(s) => (Value::String(s.as_str().into()), Ty::Str),
    };
    (ir::Expr::Const(value), ty)
}

fn binary_type(op: BinaryOp, lhs: &Ty, rhs: &Ty) -> Option<Ty> {
    match op {
        BinaryOp::And | BinaryOp::Or => (lhs.is_boolean() && rhs.is_boolean()).then_some(Ty::Bool),
        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            Some(Ty::Bool)
        }
        BinaryOp::Add if *lhs == Ty::Str || *rhs == Ty::Str => Some(Ty::Str),
        _ => match (lhs, rhs) {
            (Ty::Int, Ty::Int) => Some(Ty::Int),
            (Ty::Int | Ty::Float, Ty::Int | Ty::Float) => Some(Ty::Float),
            (l, r) if l.is_numeric() && r.is_numeric() => Some(Ty::Any),
            _ => None,
        },
    }
}

const fn method_applies(method: Method, ty: &Ty) -> bool {
    match method {
        Method::Equals | Method::ToString => !matches!(ty, Ty::Null),
        Method::IntValue | Method::DoubleValue => ty.is_numeric(),
        _ => matches!(ty, Ty::Str | Ty::Any),
    }
}

const fn method_type(method: Method) -> Ty {
    match method {
        Method::Length | Method::IntValue => Ty::Int,
        Method::DoubleValue => Ty::Float,
        Method::IsEmpty
        | Method::StartsWith
        | Method::EndsWith
        | Method::Contains
        | Method::Equals => Ty::Bool,
        Method::ToUpperCase | Method::ToLowerCase | Method::Trim | Method::ToString => Ty::Str,
    }
}

fn decapitalize(name: &str) -> Option<String> {
    let mut chars = name.chars();
    let first = chars.next()?;
    if !first.is_uppercase() {
        return None;
    }
    Some(first.to_lowercase().chain(chars).collect())
}

fn getter_field(name: &str) -> Option<String> {
    name.strip_prefix("get")
        .or_else(|| name.strip_prefix("is"))
        .and_then(decapitalize)
}

fn setter_field(name: &str) -> Option<String> {
    name.strip_prefix("set").and_then(decapitalize)
}

/// Files one resolved constraint into the pattern's alpha, index or join
/// lists.
fn classify(pattern: &mut ResolvedPattern, expr: ir::Expr) {
    for conjunct in expr.conjuncts() {
        if !conjunct.reads_facts() {
            pattern.alpha.push(conjunct);
            continue;
        }
        if let ir::Expr::Binary {
            op: BinaryOp::Eq,
            lhs,
            rhs,
        } = &conjunct
        {
            let this_only = |e: &ir::Expr| e.reads_this() && !e.reads_facts();
            let facts_only = |e: &ir::Expr| e.reads_facts() && !e.reads_this();
            let pair = if this_only(lhs) && facts_only(rhs) {
                Some(((**lhs).clone(), (**rhs).clone()))
            } else if facts_only(lhs) && this_only(rhs) {
                Some(((**rhs).clone(), (**lhs).clone()))
            } else {
                None
            };
            if let Some((right, left)) = pair {
                if right == ir::Expr::This && matches!(left, ir::Expr::Fact(_)) {
                    pattern.allow_same_fact = true;
                }
                pattern.index.push((right, left));
            }
        }
        // Indexed equalities are still tested; the index only narrows the
        // candidates.
        pattern.joins.push(conjunct);
    }
}

/// Computes each pattern's watch mask: the fields it reads itself plus the
/// fields later patterns read from its fact.
fn compute_watch_masks(patterns: &mut [ResolvedPattern]) {
    for k in 0..patterns.len() {
        let mut mask = PropertyMask::empty();
        let own = &patterns[k];
        for expr in own.alpha.iter().chain(&own.joins) {
            expr.collect_reads(&ir::Expr::This, &mut mask);
        }
        let subject = ir::Expr::Fact(k);
        for later in &patterns[k + 1..] {
            for expr in later.alpha.iter().chain(&later.joins) {
                expr.collect_reads(&subject, &mut mask);
            }
        }
        patterns[k].watch = mask;
    }
}
