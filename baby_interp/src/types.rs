use std::{
    cell::RefCell,
    fmt::{Debug, Display},
    rc::Rc,
};

use baby_syntax::ast::{Item, Literal};

use crate::{environment::Env, error::Exception, interpret::Interpreter};

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Boolean(bool),
    Number(f64),
    Str(String),
    Func(Func),
    NativeFunc(NativeFunc),
    Class(Class),
    /// Held by a variable that was declared without an initialiser.
    /// Reading it is an error.
    Uninit,
    /// Produced by a call that finished without returning a value.
    /// It cannot be stored or printed.
    Void,
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&match self {
            Self::Boolean(b) => b.to_string(),
            Self::Number(n) => n.to_string(),
            Self::Str(s) => s.to_owned(),
            Self::Func(f) => f.to_string(),
            Self::NativeFunc(f) => f.to_string(),
            Self::Class(c) => c.to_string(),
            Self::Uninit => "<uninitialised>".to_string(),
            Self::Void => "<void>".to_string(),
        })
    }
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Number(n) => Self::Number(*n),
            Literal::Str(s) => Self::Str(s.clone()),
            Literal::Boolean(b) => Self::Boolean(*b),
        }
    }
}

impl Value {
    /// Only `false` and the sentinels are falsy, `0` and `""` are not.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Self::Boolean(false) | Self::Uninit | Self::Void)
    }
}

pub trait Callable {
    fn arity(&self) -> usize;
    fn call(&self, interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, Exception>;
}

#[derive(Clone)]
pub struct Func {
    pub name: String,
    pub args: Vec<String>,
    pub body: Rc<Vec<Item>>,
    /// The environment the function was declared in.
    pub closure: Rc<RefCell<Env>>,
}

/// Functions are equal only to themselves, i.e. to copies
/// of the value created by the same declaration.
impl PartialEq for Func {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.body, &other.body) && Rc::ptr_eq(&self.closure, &other.closure)
    }
}

// The closure may contain the function itself,
// so it is left out to avoid infinite recursion
impl Debug for Func {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Func")
            .field("name", &self.name)
            .field("args", &self.args)
            .finish()
    }
}

impl Display for Func {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<fn {}({})>", self.name, self.args.join(", "))
    }
}

impl Callable for Func {
    fn arity(&self) -> usize {
        self.args.len()
    }

    fn call(&self, interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, Exception> {
        interpreter.call_func(self, args)
    }
}

#[derive(Clone)]
pub struct NativeFunc {
    pub name: String,
    pub args: Vec<String>,
    pub body: fn(&mut Interpreter, Vec<Value>) -> Result<Value, Exception>,
}

impl PartialEq for NativeFunc {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.args == other.args
    }
}

impl Debug for NativeFunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeFunc")
            .field("name", &self.name)
            .field("args", &self.args)
            .finish()
    }
}

impl Display for NativeFunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<native fn {}({})>", self.name, self.args.join(", "))
    }
}

impl Callable for NativeFunc {
    fn arity(&self) -> usize {
        self.args.len()
    }

    fn call(&self, interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, Exception> {
        (self.body)(interpreter, args)
    }
}

/// A declared class. Classes can be printed and passed around,
/// but cannot be instantiated.
#[derive(Clone, Debug, PartialEq)]
pub struct Class {
    pub name: String,
    pub methods: Vec<String>,
}

impl Display for Class {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<class {}>", self.name)
    }
}
