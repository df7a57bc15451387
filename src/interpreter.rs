use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::mem;
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{ClassDecl, Expr, ExprId, ExprKind, LiteralValue, Stmt};
use crate::callable::{Callable, LoxFunction, NativeFunction};
use crate::class::LoxClass;
use crate::environment::{EnvRef, Environment};
use crate::error::RuntimeError;
use crate::resolver::ResolutionMap;
use crate::stack::ensure_sufficient_stack;
use crate::token::{Token, TokenType};
use crate::value::Value;
use crate::INITIALIZER_NAME;

/// Convenient alias for interpreter results.
pub type IResult<T> = Result<T, RuntimeError>;

/// How a statement finished.  `Return` unwinds through blocks and loops to
/// the nearest function call, which turns it back into a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Normal,
    Return(Value),
}

/// Tunables for one interpreter instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpreterConfig {
    /// Nested calls allowed before `StackOverflow`.
    pub max_call_depth: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            max_call_depth: 1024,
        }
    }
}

pub struct Interpreter {
    globals: EnvRef,
    environment: EnvRef,
    locals: ResolutionMap,
    output: Box<dyn Write>,
    config: InterpreterConfig,
    call_depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Creates a new Interpreter printing to stdout, with native functions
    /// such as `clock` already defined.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Creates a new Interpreter whose `print` output goes to `output`.
    pub fn with_output(output: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        let globals = Rc::new(RefCell::new(Environment::new()));

        let mut interpreter = Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            output,
            config: InterpreterConfig::default(),
            call_depth: 0,
        };

        interpreter.define_native("clock", 0, |_args: &[Value]| {
            Value::Number(chrono::Utc::now().timestamp_millis() as f64)
        });

        interpreter
    }

    pub fn with_config(mut self, config: InterpreterConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers a host function in the global scope.
    pub fn define_native(&mut self, name: &str, arity: usize, func: fn(&[Value]) -> Value) {
        debug!("Defining native function '{}'", name);

        let native = NativeFunction {
            name: name.to_string(),
            arity,
            func,
        };

        self.globals
            .borrow_mut()
            .define(name, Value::Callable(Callable::Native(Rc::new(native))));
    }

    /// Runs a resolved program.  `locals` is merged into the distances kept
    /// from earlier runs, so definitions from a previous program stay valid.
    ///
    /// Entries are never pruned: a closure stored in a global may still run
    /// code resolved by an earlier program, so the map grows with every
    /// program this interpreter runs.
    pub fn interpret(&mut self, statements: &[Stmt], locals: ResolutionMap) -> IResult<()> {
        debug!("Interpreting {} statements", statements.len());

        self.locals.extend(locals);

        for stmt in statements {
            if let Completion::Return(_) = self.execute(stmt)? {
                // the resolver rejects top-level `return`
                break;
            }
        }

        info!("Interpretation completed successfully");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────────

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> IResult<Completion> {
        ensure_sufficient_stack(|| self.execute_stmt(stmt))
    }

    fn execute_stmt(&mut self, stmt: &Stmt) -> IResult<Completion> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Completion::Normal)
            }

            Stmt::Print { keyword, value } => {
                let value = self.evaluate(value)?;
                writeln!(self.output, "{}", value)
                    .and_then(|()| self.output.flush())
                    .map_err(|e| RuntimeError::output(keyword.line, &e))?;
                debug!("Printed value: {}", value);
                Ok(Completion::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Defining variable '{}' = {}", name.lexeme, value);
                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(Completion::Normal)
            }

            Stmt::Block(statements) => {
                let env = Environment::child_of(&self.environment);
                self.execute_block(statements, env)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(Completion::Normal)
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let ret @ Completion::Return(_) = self.execute(body)? {
                        return Ok(ret);
                    }
                }
                Ok(Completion::Normal)
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);
                // capture the current environment as the closure
                let function =
                    LoxFunction::new(Rc::clone(declaration), Rc::clone(&self.environment), false);
                self.environment.borrow_mut().define(
                    &declaration.name.lexeme,
                    Value::Callable(Callable::Function(Rc::new(function))),
                );
                Ok(Completion::Normal)
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Returning value: {}", value);
                Ok(Completion::Return(value))
            }

            Stmt::Class(class) => self.execute_class(class),
        }
    }

    /// Runs `statements` inside `env`, restoring the previous environment on
    /// every exit path.
    pub fn execute_block(&mut self, statements: &[Stmt], env: EnvRef) -> IResult<Completion> {
        let previous = mem::replace(&mut self.environment, env);
        let result = self.execute_sequence(statements);
        self.environment = previous;
        result
    }

    fn execute_sequence(&mut self, statements: &[Stmt]) -> IResult<Completion> {
        for stmt in statements {
            if let ret @ Completion::Return(_) = self.execute(stmt)? {
                return Ok(ret);
            }
        }
        Ok(Completion::Normal)
    }

    fn execute_class(&mut self, class: &ClassDecl) -> IResult<Completion> {
        // reserve the name so methods can refer to the class
        self.environment
            .borrow_mut()
            .define(&class.name.lexeme, Value::Nil);

        let superclass = match &class.superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Callable(Callable::Class(superclass)) => Some(superclass),
                _ => {
                    return Err(RuntimeError::type_error(
                        class.name.line,
                        "Superclass must be a class.",
                    ))
                }
            },
            None => None,
        };

        let method_env = match &superclass {
            Some(superclass) => {
                let env = Environment::child_of(&self.environment);
                env.borrow_mut().define(
                    "super",
                    Value::Callable(Callable::Class(Rc::clone(superclass))),
                );
                env
            }
            None => Rc::clone(&self.environment),
        };

        let methods = class
            .methods
            .iter()
            .map(|method| {
                let is_initializer = method.name.lexeme == INITIALIZER_NAME;
                let function =
                    LoxFunction::new(Rc::clone(method), Rc::clone(&method_env), is_initializer);
                (method.name.lexeme.clone(), Rc::new(function))
            })
            .collect();

        let value = LoxClass::new(class.name.lexeme.clone(), superclass, methods);
        info!("Class '{}' defined", class.name.lexeme);

        self.environment.borrow_mut().assign(
            &class.name,
            Value::Callable(Callable::Class(Rc::new(value))),
        )?;

        Ok(Completion::Normal)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────────

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> IResult<Value> {
        ensure_sufficient_stack(|| self.evaluate_expr(expr))
    }

    fn evaluate_expr(&mut self, expr: &Expr) -> IResult<Value> {
        match &expr.kind {
            ExprKind::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(Rc::clone(s)),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            ExprKind::Grouping(inner) => self.evaluate(inner),

            ExprKind::Unary { operator, right } => self.evaluate_unary(operator, right),

            ExprKind::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            ExprKind::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let short_circuits = if operator.token_type == TokenType::OR {
                    left.is_truthy()
                } else {
                    !left.is_truthy()
                };

                if short_circuits {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            ExprKind::Variable(name) => self.look_up_variable(name, expr.id),

            ExprKind::Assign { name, value } => {
                let value = self.evaluate(value)?;

                match self.locals.get(&expr.id) {
                    Some(&distance) => {
                        self.environment
                            .borrow_mut()
                            .assign_at(distance, name, value.clone())?;
                    }
                    None => {
                        self.globals.borrow_mut().assign(name, value.clone())?;
                    }
                }

                Ok(value)
            }

            ExprKind::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;

                let mut values = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.evaluate(argument)?);
                }

                self.call_value(callee, values, paren)
            }

            ExprKind::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => instance.get(name),
                other => Err(RuntimeError::type_error(
                    name.line,
                    format!("Only instances have properties, got {}.", other.type_name()),
                )),
            },

            ExprKind::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(RuntimeError::type_error(
                        name.line,
                        "Only instances have fields.",
                    ));
                };

                let value = self.evaluate(value)?;
                instance.set(name, value.clone());
                Ok(value)
            }

            ExprKind::This(keyword) => self.look_up_variable(keyword, expr.id),

            ExprKind::Super { keyword, method } => self.evaluate_super(expr.id, keyword, method),
        }
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> IResult<Value> {
        let right = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match right {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(RuntimeError::type_error(
                    operator.line,
                    "Operand must be a number.",
                )),
            },
            TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),
            _ => Err(RuntimeError::type_error(
                operator.line,
                format!("Invalid unary operator '{}'.", operator.lexeme),
            )),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> IResult<Value> {
        let left = self.evaluate(left)?;
        let right = self.evaluate(right)?;
        debug!(
            "Binary '{}' on {} and {}",
            operator.lexeme,
            left.type_name(),
            right.type_name()
        );

        match operator.token_type {
            TokenType::PLUS => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => {
                    let mut joined = String::with_capacity(a.len() + b.len());
                    joined.push_str(&a);
                    joined.push_str(&b);
                    Ok(Value::String(Rc::from(joined)))
                }
                _ => Err(RuntimeError::type_error(
                    operator.line,
                    "Operands must be two numbers or two strings.",
                )),
            },

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left == right)),
            TokenType::BANG_EQUAL => Ok(Value::Bool(left != right)),

            _ => {
                let (Value::Number(a), Value::Number(b)) = (&left, &right) else {
                    return Err(RuntimeError::type_error(
                        operator.line,
                        "Operands must be numbers.",
                    ));
                };
                let (a, b) = (*a, *b);

                match operator.token_type {
                    TokenType::MINUS => Ok(Value::Number(a - b)),
                    TokenType::STAR => Ok(Value::Number(a * b)),
                    TokenType::SLASH => Ok(Value::Number(a / b)),
                    TokenType::GREATER => Ok(Value::Bool(a > b)),
                    TokenType::GREATER_EQUAL => Ok(Value::Bool(a >= b)),
                    TokenType::LESS => Ok(Value::Bool(a < b)),
                    TokenType::LESS_EQUAL => Ok(Value::Bool(a <= b)),
                    _ => Err(RuntimeError::type_error(
                        operator.line,
                        format!("Invalid binary operator '{}'.", operator.lexeme),
                    )),
                }
            }
        }
    }

    fn evaluate_super(&mut self, id: ExprId, keyword: &Token, method: &Token) -> IResult<Value> {
        let distance = self.locals.get(&id).copied().ok_or_else(|| {
            RuntimeError::UndefinedVariable {
                name: "super".to_string(),
                line: keyword.line,
            }
        })?;

        let superclass = self
            .environment
            .borrow()
            .get_at(distance, &Token::synthetic("super", keyword.line))?;
        let Value::Callable(Callable::Class(superclass)) = superclass else {
            return Err(RuntimeError::type_error(
                keyword.line,
                "Superclass must be a class.",
            ));
        };

        // `this` lives in the scope just inside the one binding `super`
        let this = Token::synthetic("this", keyword.line);
        let this_distance = distance
            .checked_sub(1)
            .ok_or_else(|| RuntimeError::UndefinedVariable {
                name: this.lexeme.clone(),
                line: this.line,
            })?;
        let object = self.environment.borrow().get_at(this_distance, &this)?;
        let Value::Instance(instance) = object else {
            return Err(RuntimeError::type_error(
                keyword.line,
                "'this' must be an instance.",
            ));
        };

        match superclass.find_method(&method.lexeme) {
            Some(found) => Ok(Value::Callable(Callable::Function(Rc::new(
                found.bind(instance),
            )))),
            None => Err(RuntimeError::UndefinedProperty {
                name: method.lexeme.clone(),
                line: method.line,
            }),
        }
    }

    fn look_up_variable(&self, name: &Token, id: ExprId) -> IResult<Value> {
        match self.locals.get(&id) {
            Some(&distance) => self.environment.borrow().get_at(distance, name),
            None => self.globals.borrow().get(name),
        }
    }

    /// Checks callee kind, arity and depth, then invokes.
    fn call_value(&mut self, callee: Value, arguments: Vec<Value>, paren: &Token) -> IResult<Value> {
        let Value::Callable(callable) = callee else {
            return Err(RuntimeError::NotCallable { line: paren.line });
        };

        if arguments.len() != callable.arity() {
            return Err(RuntimeError::ArityMismatch {
                expected: callable.arity(),
                got: arguments.len(),
                line: paren.line,
            });
        }

        if self.call_depth >= self.config.max_call_depth {
            return Err(RuntimeError::StackOverflow {
                depth: self.config.max_call_depth,
                line: paren.line,
            });
        }

        debug!("Calling {} with {} argument(s)", callable, arguments.len());

        self.call_depth += 1;
        let result = callable.call(self, arguments);
        self.call_depth -= 1;

        result
    }
}
