pub mod ast;
pub mod ast_printer;
pub mod callable;
pub mod class;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod stack;
pub mod token;
pub mod value;

use log::info;

use crate::error::{LoxError, Result};
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::scanner::Scanner;

/// Method name that marks a class's constructor.
pub const INITIALIZER_NAME: &str = "init";

/// Scan, parse, resolve and run `source` on `interpreter`.
///
/// Front-end failures return the first error found; the full list is logged.
/// Nothing executes unless the whole program scans, parses and resolves.
pub fn run_source(source: &str, interpreter: &mut Interpreter) -> Result<()> {
    let tokens = Scanner::new(source).scan_all().map_err(first_error)?;
    let statements = Parser::new(tokens).parse().map_err(first_error)?;
    let locals = resolver::resolve(&statements)?;

    info!("Program resolved; {} local reference(s)", locals.len());

    interpreter.interpret(&statements, locals)?;
    Ok(())
}

fn first_error(errors: Vec<LoxError>) -> LoxError {
    for e in &errors {
        info!("Front-end error: {}", e);
    }

    errors
        .into_iter()
        .next()
        .unwrap_or_else(|| LoxError::parse(0, "Unknown front-end error."))
}
