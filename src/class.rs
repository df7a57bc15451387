use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::callable::{Callable, LoxFunction};
use crate::error::RuntimeError;
use crate::interpreter::Interpreter;
use crate::token::Token;
use crate::value::Value;
use crate::INITIALIZER_NAME;

/// A class value.  Superclasses are shared, never owned, so one class can
/// back any number of subclasses.
pub struct LoxClass {
    name: String,
    superclass: Option<Rc<LoxClass>>,
    methods: HashMap<String, Rc<LoxFunction>>,
}

impl LoxClass {
    pub fn new(
        name: impl Into<String>,
        superclass: Option<Rc<LoxClass>>,
        methods: HashMap<String, Rc<LoxFunction>>,
    ) -> Self {
        Self {
            name: name.into(),
            superclass,
            methods,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn superclass(&self) -> Option<&Rc<LoxClass>> {
        self.superclass.as_ref()
    }

    /// Unbound method lookup: this class first, then each superclass in turn,
    /// stopping at the first match.
    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction>> {
        let mut class = self;

        loop {
            if let Some(method) = class.methods.get(name) {
                return Some(Rc::clone(method));
            }

            match &class.superclass {
                Some(superclass) => class = superclass.as_ref(),
                None => return None,
            }
        }
    }

    /// Arity of the initializer, or 0 without one.
    pub fn arity(&self) -> usize {
        self.find_method(INITIALIZER_NAME)
            .map_or(0, |initializer| initializer.arity())
    }

    /// Calling a class: allocate an instance, run the bound initializer (if
    /// any) and hand back the instance regardless of what it returned.
    pub fn instantiate(
        class: &Rc<LoxClass>,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        debug!("Instantiating class '{}'", class.name);

        let instance = Rc::new(LoxInstance::new(Rc::clone(class)));

        if let Some(initializer) = class.find_method(INITIALIZER_NAME) {
            initializer
                .bind(Rc::clone(&instance))
                .call(interpreter, arguments)?;
        }

        Ok(Value::Instance(instance))
    }
}

impl fmt::Debug for LoxClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxClass")
            .field("name", &self.name)
            .field("superclass", &self.superclass.as_ref().map(|s| s.name()))
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// An object.  Its class never changes; its fields start empty and grow as
/// properties are assigned.
pub struct LoxInstance {
    class: Rc<LoxClass>,
    fields: RefCell<HashMap<String, Value>>,
}

impl LoxInstance {
    pub fn new(class: Rc<LoxClass>) -> Self {
        Self {
            class,
            fields: RefCell::new(HashMap::new()),
        }
    }

    pub fn class(&self) -> &Rc<LoxClass> {
        &self.class
    }

    /// Property read.  Fields shadow methods; a method is bound to this
    /// instance at the moment it is read.
    pub fn get(self: &Rc<Self>, name: &Token) -> Result<Value, RuntimeError> {
        if let Some(value) = self.fields.borrow().get(&name.lexeme) {
            return Ok(value.clone());
        }

        match self.class.find_method(&name.lexeme) {
            Some(method) => Ok(Value::Callable(Callable::Function(Rc::new(
                method.bind(Rc::clone(self)),
            )))),
            None => Err(RuntimeError::UndefinedProperty {
                name: name.lexeme.clone(),
                line: name.line,
            }),
        }
    }

    pub fn set(&self, name: &Token, value: Value) {
        self.fields.borrow_mut().insert(name.lexeme.clone(), value);
    }
}

impl fmt::Debug for LoxInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxInstance")
            .field("class", &self.class.name)
            .field("fields", &self.fields.borrow().keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty(name: &str, superclass: Option<Rc<LoxClass>>) -> Rc<LoxClass> {
        Rc::new(LoxClass::new(name, superclass, HashMap::new()))
    }

    #[test]
    fn class_without_initializer_has_zero_arity() {
        assert_eq!(empty("A", None).arity(), 0);
    }

    #[test]
    fn missing_method_walks_whole_chain() {
        let base = empty("Base", None);
        let derived = empty("Derived", Some(Rc::clone(&base)));

        assert!(derived.find_method("nothing").is_none());
        assert_eq!(derived.superclass().map(|s| s.name()), Some("Base"));
    }

    #[test]
    fn fields_are_created_on_set() {
        let instance = Rc::new(LoxInstance::new(empty("Point", None)));
        let x = Token::synthetic("x", 1);

        assert!(matches!(
            instance.get(&x),
            Err(RuntimeError::UndefinedProperty { .. })
        ));

        instance.set(&x, Value::Number(3.0));
        assert_eq!(instance.get(&x).unwrap(), Value::Number(3.0));
    }

    #[test]
    fn instance_renders_with_class_name() {
        let instance = Rc::new(LoxInstance::new(empty("Point", None)));
        assert_eq!(Value::Instance(instance).to_string(), "Point instance");
    }
}
