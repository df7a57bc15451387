#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use loxwalk as lox;

use lox::error::LoxError;
use lox::interpreter::{Interpreter, InterpreterConfig};

/// A `Write` sink whose bytes stay readable after the interpreter takes it.
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub fn interpreter() -> (Interpreter, SharedBuffer) {
    let buffer = SharedBuffer::default();
    let interpreter = Interpreter::with_output(Box::new(buffer.clone()));
    (interpreter, buffer)
}

/// Runs `source` and returns everything it printed.
pub fn run(source: &str) -> String {
    let (mut interpreter, buffer) = interpreter();
    if let Err(e) = lox::run_source(source, &mut interpreter) {
        panic!("program failed: {}\noutput so far:\n{}", e, buffer.contents());
    }
    buffer.contents()
}

/// Runs `source`, expecting it to fail; returns the error and the output
/// printed before it.
pub fn run_err(source: &str) -> (LoxError, String) {
    run_err_with(source, InterpreterConfig::default())
}

pub fn run_err_with(source: &str, config: InterpreterConfig) -> (LoxError, String) {
    let (interpreter, buffer) = interpreter();
    let mut interpreter = interpreter.with_config(config);

    match lox::run_source(source, &mut interpreter) {
        Ok(()) => panic!(
            "program unexpectedly succeeded with output:\n{}",
            buffer.contents()
        ),
        Err(e) => (e, buffer.contents()),
    }
}
