use std::{cell::RefCell, collections::HashMap, rc::Rc};

use log::debug;

use crate::{
    error::{name_error, ErrorMsg, Exception},
    stdlib,
    types::Value,
};

#[derive(Debug, Default)]
pub struct Env {
    values: HashMap<String, Value>,
    parent: Option<Rc<RefCell<Env>>>,
    strict: bool,
}

impl Env {
    /// Creates the global environment with the natives registered.
    pub fn new(strict: bool) -> Rc<RefCell<Self>> {
        let mut env = Self {
            strict,
            ..Default::default()
        };
        stdlib::init(&mut env);
        Rc::new(RefCell::new(env))
    }

    pub fn with_parent(parent: Rc<RefCell<Env>>) -> Rc<RefCell<Self>> {
        let strict = parent.borrow().strict;
        Rc::new(RefCell::new(Self {
            parent: Some(parent),
            strict,
            ..Default::default()
        }))
    }

    /// Binds `name` in this frame regardless of strictness.
    pub fn set(&mut self, name: &str, value: Value) -> Option<Value> {
        debug!("Set {name} -> {value}");
        self.values.insert(name.to_string(), value)
    }

    /// Declares `name` in this frame. Redeclaring is an error in strict
    /// mode, otherwise the previous value is returned.
    pub fn define(&mut self, name: &str, value: Value) -> Result<Option<Value>, Exception> {
        debug!("Define {name} -> {value}");
        if value == Value::Void {
            return Err(name_error(ErrorMsg::VoidValue, name));
        }
        if self.strict && self.values.contains_key(name) {
            return Err(name_error(ErrorMsg::RedefinedVar, name));
        }
        Ok(self.set(name, value))
    }

    pub fn get(&self, name: &str) -> Result<Value, Exception> {
        debug!("Get {name}");
        if let Some(value) = self.values.get(name) {
            return Self::initialised(name, value);
        }
        if let Some(parent) = &self.parent {
            debug!("Get {name} from parent");
            return parent.borrow().get(name);
        }
        Err(name_error(ErrorMsg::UndefinedVar, name))
    }

    pub fn assign(&mut self, name: &str, value: Value) -> Result<(), Exception> {
        debug!("Assign {name} -> {value}");
        if value == Value::Void {
            return Err(name_error(ErrorMsg::VoidValue, name));
        }
        if self.values.contains_key(name) {
            self.set(name, value);
            return Ok(());
        }
        if let Some(parent) = &self.parent {
            debug!("Assign {name} in parent");
            return parent.borrow_mut().assign(name, value);
        }
        Err(name_error(ErrorMsg::UndefinedVar, name))
    }

    pub fn get_at_depth(&self, name: &str, depth: usize) -> Result<Value, Exception> {
        debug!("Get {name} at depth {depth}");
        if depth == 0 {
            return match self.values.get(name) {
                Some(value) => Self::initialised(name, value),
                None => Err(name_error(ErrorMsg::MisresolvedVar, name)),
            };
        }
        match &self.parent {
            Some(parent) => parent.borrow().get_at_depth(name, depth - 1),
            None => Err(name_error(ErrorMsg::MisresolvedVar, name)),
        }
    }

    pub fn assign_at_depth(
        &mut self,
        name: &str,
        value: Value,
        depth: usize,
    ) -> Result<(), Exception> {
        debug!("Assign {name} -> {value} at depth {depth}");
        if value == Value::Void {
            return Err(name_error(ErrorMsg::VoidValue, name));
        }
        if depth == 0 {
            if self.values.contains_key(name) {
                self.set(name, value);
                return Ok(());
            }
            return Err(name_error(ErrorMsg::MisresolvedVar, name));
        }
        match &self.parent {
            Some(parent) => parent
                .borrow_mut()
                .assign_at_depth(name, value, depth - 1),
            None => Err(name_error(ErrorMsg::MisresolvedVar, name)),
        }
    }

    /// One line summary of the bindings in this frame, sorted by name,
    /// along with how deeply the frame is nested.
    pub fn describe(&self) -> String {
        let mut depth = 0;
        let mut parent = self.parent.clone();
        while let Some(env) = parent {
            depth += 1;
            parent = env.borrow().parent.clone();
        }
        let mut bindings = self
            .values
            .iter()
            .filter(|(_, value)| !matches!(value, Value::NativeFunc(_)))
            .map(|(name, value)| match value {
                Value::Str(s) => format!("{name} = \"{s}\""),
                _ => format!("{name} = {value}"),
            })
            .collect::<Vec<_>>();
        bindings.sort();
        format!("scope at depth {depth}: {{ {} }}", bindings.join(", "))
    }

    fn initialised(name: &str, value: &Value) -> Result<Value, Exception> {
        match value {
            Value::Uninit => Err(name_error(ErrorMsg::UninitVar, name)),
            _ => Ok(value.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_text(result: Result<impl std::fmt::Debug, Exception>) -> String {
        match result {
            Err(Exception::Error(e)) => e,
            other => panic!("expected an error, found {other:?}"),
        }
    }

    #[test]
    fn define_and_get() {
        let env = Env::new(true);
        env.borrow_mut().define("a", Value::Number(1.0)).unwrap();
        assert_eq!(env.borrow().get("a").unwrap(), Value::Number(1.0));
        assert!(error_text(env.borrow().get("b")).contains("undefined variable 'b'"));
    }

    #[test]
    fn strict_redefinition() {
        let env = Env::new(true);
        env.borrow_mut().define("a", Value::Number(1.0)).unwrap();
        assert!(error_text(env.borrow_mut().define("a", Value::Number(2.0)))
            .contains("variable has already been defined 'a'"));

        let lenient = Env::new(false);
        lenient.borrow_mut().define("a", Value::Number(1.0)).unwrap();
        let previous = lenient
            .borrow_mut()
            .define("a", Value::Number(2.0))
            .unwrap();
        assert_eq!(previous, Some(Value::Number(1.0)));
        assert_eq!(lenient.borrow().get("a").unwrap(), Value::Number(2.0));
    }

    #[test]
    fn shadowing_in_child_is_allowed() {
        let global = Env::new(true);
        global.borrow_mut().define("a", Value::Number(1.0)).unwrap();
        let child = Env::with_parent(Rc::clone(&global));
        child.borrow_mut().define("a", Value::Number(2.0)).unwrap();
        assert_eq!(child.borrow().get("a").unwrap(), Value::Number(2.0));
        assert_eq!(global.borrow().get("a").unwrap(), Value::Number(1.0));
    }

    #[test]
    fn uninitialised_reads_fail() {
        let env = Env::new(true);
        env.borrow_mut().define("a", Value::Uninit).unwrap();
        assert!(error_text(env.borrow().get("a")).contains("used before assignment"));
        env.borrow_mut().assign("a", Value::Number(5.0)).unwrap();
        assert_eq!(env.borrow().get("a").unwrap(), Value::Number(5.0));
    }

    #[test]
    fn void_cannot_be_stored() {
        let env = Env::new(true);
        assert!(error_text(env.borrow_mut().define("a", Value::Void))
            .contains("does not return a value"));
        env.borrow_mut().define("b", Value::Number(1.0)).unwrap();
        assert!(env.borrow_mut().assign("b", Value::Void).is_err());
    }

    #[test]
    fn assign_walks_the_chain() {
        let global = Env::new(true);
        global.borrow_mut().define("a", Value::Number(1.0)).unwrap();
        let child = Env::with_parent(Rc::clone(&global));
        child.borrow_mut().assign("a", Value::Number(3.0)).unwrap();
        assert_eq!(global.borrow().get("a").unwrap(), Value::Number(3.0));
        assert!(child.borrow_mut().assign("z", Value::Number(1.0)).is_err());
    }

    #[test]
    fn depth_access() {
        let global = Env::new(true);
        let outer = Env::with_parent(Rc::clone(&global));
        let inner = Env::with_parent(Rc::clone(&outer));
        outer.borrow_mut().define("a", Value::Number(1.0)).unwrap();
        inner.borrow_mut().define("a", Value::Number(2.0)).unwrap();

        assert_eq!(inner.borrow().get_at_depth("a", 0).unwrap(), Value::Number(2.0));
        assert_eq!(inner.borrow().get_at_depth("a", 1).unwrap(), Value::Number(1.0));
        inner
            .borrow_mut()
            .assign_at_depth("a", Value::Number(7.0), 1)
            .unwrap();
        assert_eq!(outer.borrow().get("a").unwrap(), Value::Number(7.0));
        assert!(error_text(inner.borrow().get_at_depth("a", 2))
            .contains("not present at the resolved depth"));
        assert!(inner.borrow().get_at_depth("a", 5).is_err());
    }

    #[test]
    fn children_inherit_strictness() {
        let global = Env::new(false);
        let child = Env::with_parent(global);
        child.borrow_mut().define("a", Value::Number(1.0)).unwrap();
        assert!(child.borrow_mut().define("a", Value::Number(2.0)).is_ok());
    }

    #[test]
    fn describe() {
        let global = Env::new(true);
        let child = Env::with_parent(global);
        child.borrow_mut().define("b", Value::Str("x".to_owned())).unwrap();
        child.borrow_mut().define("a", Value::Number(1.0)).unwrap();
        assert_eq!(
            child.borrow().describe(),
            "scope at depth 1: { a = 1, b = \"x\" }"
        );
    }
}
