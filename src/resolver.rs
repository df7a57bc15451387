//! Static resolver pass for the **Lox** interpreter.
//!
//! This resolver does three things in one AST walk:
//! 1. Build lexical scopes (stack of `HashMap<&str,bool>` tracking declared/defined).
//! 2. Report static errors (forward‑read in initializer, redeclaration, invalid
//!    `return`, misplaced `this`/`super`, self‑inheritance).
//! 3. Record, for *each* variable occurrence, how many scopes separate it from
//!    its declaration.  Occurrences found in no scope are left out of the map
//!    and looked up in the globals at runtime.
//!
//! The first violation aborts the pass; no partial map is returned.

use crate::ast::{ClassDecl, Expr, ExprId, ExprKind, FunctionDecl, Stmt};
use crate::error::StaticError;
use crate::stack::ensure_sufficient_stack;
use crate::token::Token;
use crate::INITIALIZER_NAME;
use log::{debug, info};
use std::collections::HashMap;

/// Expression identity → number of scopes between use and declaration.
pub type ResolutionMap = HashMap<ExprId, usize>;

type Result<T> = std::result::Result<T, StaticError>;

/// What kind of function body we are inside.  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
}

/// What kind of class body we are inside.  Used to validate `this`/`super`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

/// Resolve `program` in one pass.
pub fn resolve(program: &[Stmt]) -> Result<ResolutionMap> {
    Resolver::new().resolve(program)
}

pub struct Resolver<'a> {
    scopes: Vec<HashMap<&'a str, bool>>, // false=declared, true=defined
    locals: ResolutionMap,
    current_function: FunctionType,
    current_class: ClassType,
}

impl<'a> Default for Resolver<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Resolver<'a> {
    pub fn new() -> Self {
        info!("Resolver instantiated");
        Resolver {
            scopes: Vec::new(),
            locals: ResolutionMap::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
        }
    }

    /// Walk all top‑level statements and hand back the distance map.
    pub fn resolve(mut self, statements: &'a [Stmt]) -> Result<ResolutionMap> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );
        for stmt in statements {
            self.resolve_stmt(stmt)?;
        }
        info!("Resolved {} local reference(s)", self.locals.len());
        Ok(self.locals)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &'a Stmt) -> Result<()> {
        ensure_sufficient_stack(|| self.visit_stmt(stmt))
    }

    fn visit_stmt(&mut self, stmt: &'a Stmt) -> Result<()> {
        match stmt {
            Stmt::Class(class) => self.resolve_class(class)?,

            Stmt::Block(statements) => {
                self.begin_scope();
                let result = statements.iter().try_for_each(|s| self.resolve_stmt(s));
                self.end_scope();
                result?;
            }

            Stmt::Var { name, initializer } => {
                // declare → resolve initializer → define
                self.declare(name)?;
                if let Some(expr) = initializer {
                    self.resolve_expr(expr)?;
                }
                self.define(name);
            }

            Stmt::Function(function) => {
                // the name is visible inside its own body, so recursion works
                self.declare(&function.name)?;
                self.define(&function.name);
                self.resolve_function(function, FunctionType::Function)?;
            }

            Stmt::Expression(expr) | Stmt::Print { value: expr, .. } => self.resolve_expr(expr)?,

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition)?;
                self.resolve_stmt(then_branch)?;
                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb)?;
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition)?;
                self.resolve_stmt(body)?;
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    return Err(StaticError::ReturnOutsideFunction { line: keyword.line });
                }
                if let Some(expr) = value {
                    if self.current_function == FunctionType::Initializer {
                        return Err(StaticError::ReturnValueFromInitializer {
                            line: keyword.line,
                        });
                    }
                    self.resolve_expr(expr)?;
                }
            }
        }
        Ok(())
    }

    fn resolve_class(&mut self, class: &'a ClassDecl) -> Result<()> {
        let enclosing_class = self.current_class;
        self.current_class = ClassType::Class;

        let result = self.resolve_class_body(class);

        self.current_class = enclosing_class;
        result
    }

    fn resolve_class_body(&mut self, class: &'a ClassDecl) -> Result<()> {
        self.declare(&class.name)?;
        self.define(&class.name);

        if let Some(superclass) = &class.superclass {
            if let ExprKind::Variable(super_name) = &superclass.kind {
                if super_name.lexeme == class.name.lexeme {
                    return Err(StaticError::SelfInheritance {
                        name: super_name.lexeme.clone(),
                        line: super_name.line,
                    });
                }
            }

            self.current_class = ClassType::Subclass;
            self.resolve_expr(superclass)?;

            self.begin_scope();
            self.mark_defined("super");
        }

        self.begin_scope();
        self.mark_defined("this");

        let result = class.methods.iter().try_for_each(|method| {
            let kind = if method.name.lexeme == INITIALIZER_NAME {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };
            self.resolve_function(method, kind)
        });

        self.end_scope();
        if class.superclass.is_some() {
            self.end_scope();
        }

        debug!("Resolved class '{}'", class.name.lexeme);
        result
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &'a Expr) -> Result<()> {
        ensure_sufficient_stack(|| self.visit_expr(expr))
    }

    fn visit_expr(&mut self, expr: &'a Expr) -> Result<()> {
        match &expr.kind {
            ExprKind::Literal(_) => {}

            ExprKind::Grouping(inner) => self.resolve_expr(inner)?,

            ExprKind::Unary { right, .. } => self.resolve_expr(right)?,

            ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
                self.resolve_expr(left)?;
                self.resolve_expr(right)?;
            }

            ExprKind::Variable(name) => {
                // Cannot read in own initializer
                if let Some(scope) = self.scopes.last() {
                    if scope.get(name.lexeme.as_str()) == Some(&false) {
                        return Err(StaticError::SelfReferenceInInitializer {
                            name: name.lexeme.clone(),
                            line: name.line,
                        });
                    }
                }
                self.resolve_local(expr.id, &name.lexeme);
            }

            ExprKind::Assign { name, value } => {
                // First resolve RHS, then bind LHS
                self.resolve_expr(value)?;
                self.resolve_local(expr.id, &name.lexeme);
            }

            ExprKind::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee)?;
                for arg in arguments {
                    self.resolve_expr(arg)?;
                }
            }

            ExprKind::Get { object, .. } => self.resolve_expr(object)?,

            ExprKind::Set { object, value, .. } => {
                self.resolve_expr(value)?;
                self.resolve_expr(object)?;
            }

            ExprKind::This(keyword) => {
                if self.current_class == ClassType::None {
                    return Err(StaticError::ThisOutsideClass { line: keyword.line });
                }
                self.resolve_local(expr.id, "this");
            }

            ExprKind::Super { keyword, .. } => {
                match self.current_class {
                    ClassType::None => {
                        return Err(StaticError::SuperOutsideClass { line: keyword.line })
                    }
                    ClassType::Class => {
                        return Err(StaticError::SuperWithoutSuperclass { line: keyword.line })
                    }
                    ClassType::Subclass => {}
                }
                self.resolve_local(expr.id, "super");
            }
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function’s parameters + body.
    fn resolve_function(&mut self, function: &'a FunctionDecl, kind: FunctionType) -> Result<()> {
        let enclosing = self.current_function;
        self.current_function = kind;

        self.begin_scope();
        let result = self.resolve_params_and_body(function);
        self.end_scope();

        self.current_function = enclosing;
        result
    }

    fn resolve_params_and_body(&mut self, function: &'a FunctionDecl) -> Result<()> {
        for param in &function.params {
            self.declare(param)?;
            self.define(param);
        }
        for stmt in &function.body {
            self.resolve_stmt(stmt)?;
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    /// No-op at global scope: globals are resolved dynamically.
    fn declare(&mut self, name: &'a Token) -> Result<()> {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(name.lexeme.as_str()) {
                return Err(StaticError::AlreadyDeclared {
                    name: name.lexeme.clone(),
                    line: name.line,
                });
            }
            scope.insert(name.lexeme.as_str(), false);
        }
        Ok(())
    }

    fn define(&mut self, name: &'a Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.as_str(), true);
        }
    }

    /// Bind one of the implicit names (`this`, `super`) in the innermost scope.
    fn mark_defined(&mut self, name: &'static str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, true);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding‑distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record the distance to the innermost scope declaring `name`; leave
    /// globals unrecorded.
    fn resolve_local(&mut self, id: ExprId, name: &str) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(name) {
                debug!("Resolved '{}' ({}) at depth {}", name, id, depth);
                self.locals.insert(id, depth);
                return;
            }
        }

        debug!("Resolved '{}' ({}) as global", name, id);
    }
}
