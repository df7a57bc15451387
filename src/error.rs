//! Centralised error hierarchy for the **Lox interpreter**.
//!
//! Failures fall into three families:
//!
//! * front-end errors (`Lex`, `Parse`) raised while turning bytes into an AST,
//! * [`StaticError`]s raised by the resolver before any code runs,
//! * [`RuntimeError`]s raised by the interpreter while executing.
//!
//! The `return` statement is **not** an error; it travels as
//! [`Completion::Return`](crate::interpreter::Completion) instead.
//!
//! The module **does not** print diagnostics itself

use std::io;
use thiserror::Error;

use log::info;

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error.
    #[error("[line {line}] Error: {message}")]
    Parse { message: String, line: usize },

    /// Static‑analysis failure reported by the resolver.
    #[error(transparent)]
    Resolve(#[from] StaticError),

    /// Runtime evaluation error.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// UTF‑8 decoding failure when ingesting external text.
    #[error(transparent)]
    Utf8(#[from] std::str::Utf8Error),
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", line, message);

        LoxError::Parse { message, line }
    }

    /// `true` for every error detected before execution starts.
    pub fn is_static(&self) -> bool {
        matches!(
            self,
            LoxError::Lex { .. } | LoxError::Parse { .. } | LoxError::Resolve(_)
        )
    }
}

/// Scope-sensitive rule violations found by the resolver.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StaticError {
    #[error("[line {line}] Error at '{name}': Can't read local variable in its own initializer.")]
    SelfReferenceInInitializer { name: String, line: usize },

    #[error("[line {line}] Error at '{name}': Already a variable with this name in this scope.")]
    AlreadyDeclared { name: String, line: usize },

    #[error("[line {line}] Error at 'return': Can't return from top-level code.")]
    ReturnOutsideFunction { line: usize },

    #[error("[line {line}] Error at 'return': Can't return a value from an initializer.")]
    ReturnValueFromInitializer { line: usize },

    #[error("[line {line}] Error at 'this': Can't use 'this' outside of a class.")]
    ThisOutsideClass { line: usize },

    #[error("[line {line}] Error at 'super': Can't use 'super' outside of a class.")]
    SuperOutsideClass { line: usize },

    #[error("[line {line}] Error at 'super': Can't use 'super' in a class with no superclass.")]
    SuperWithoutSuperclass { line: usize },

    #[error("[line {line}] Error at '{name}': A class can't inherit from itself.")]
    SelfInheritance { name: String, line: usize },
}

/// Errors that abort a running program.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuntimeError {
    /// Wrong operand kind for an operator, property access on a
    /// non-instance, or a superclass that is not a class.
    #[error("{message}\n[line {line}]")]
    TypeError { message: String, line: usize },

    #[error("Undefined variable '{name}'.\n[line {line}]")]
    UndefinedVariable { name: String, line: usize },

    #[error("Undefined property '{name}'.\n[line {line}]")]
    UndefinedProperty { name: String, line: usize },

    #[error("Can only call functions and classes.\n[line {line}]")]
    NotCallable { line: usize },

    #[error("Expected {expected} arguments but got {got}.\n[line {line}]")]
    ArityMismatch {
        expected: usize,
        got: usize,
        line: usize,
    },

    #[error("Stack overflow: call depth exceeded {depth}.\n[line {line}]")]
    StackOverflow { depth: usize, line: usize },

    /// `print` could not write to its sink.
    #[error("Failed to write output: {message}\n[line {line}]")]
    Output { message: String, line: usize },
}

impl RuntimeError {
    /// Helper constructor for operand/target kind mismatches.
    pub fn type_error<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating TypeError: line={}, msg={}", line, message);

        RuntimeError::TypeError { message, line }
    }

    pub fn output(line: usize, err: &std::io::Error) -> Self {
        RuntimeError::Output {
            message: err.to_string(),
            line,
        }
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;
