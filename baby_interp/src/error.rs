use std::fmt::Display;

use baby_syntax::ast::Ident;
use thiserror::Error as ThisError;

use crate::types::Value;

/// Control signal unwinding through the interpreter. `Return` carries the
/// value of a `return` statement up to the enclosing call, while `Error`
/// aborts the current input.
#[derive(Debug)]
pub enum Exception {
    Error(String),
    Return(Value),
}

impl Display for Exception {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&match self {
            Self::Return(val) => val.to_string(),
            Self::Error(e) => e.to_owned(),
        })
    }
}

/// The stage of the pipeline that reported a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Scan,
    Parse,
    ResolveVariable,
    Interpret,
}

impl Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Scan => "scan",
            Self::Parse => "parse",
            Self::ResolveVariable => "resolve-variable",
            Self::Interpret => "interpret",
        })
    }
}

/// Returned by the pipeline when a phase fails. Every error of that
/// phase has already been reported to the logger.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("{phase}: {}", .errors.join("\n"))]
pub struct Abort {
    pub phase: Phase,
    pub errors: Vec<String>,
}

#[derive(Debug, ThisError)]
pub enum ErrorMsg {
    // Runtime errors
    #[error("expected numeric operands")]
    ExpectedNumber,
    #[error("operands must be two numbers or two strings")]
    ExpectedNumOrStr,
    #[error("cannot divide by zero")]
    DivideByZero,
    #[error("can only call functions")]
    InvalidCallExpr,
    #[error("expected {0} arguments but got {1}")]
    ArityMismatch(usize, usize),
    #[error("expected a string argument")]
    ExpectedString,
    #[error("infinite loop detected")]
    InfiniteLoop,
    #[error("maximum call depth exceeded")]
    CallDepth,
    #[error("bounds of a range loop must be finite numbers no larger than 2^53 - 1")]
    InvalidRange,
    #[error("function does not return a value")]
    VoidValue,
    // Memory errors
    #[error("undefined variable")]
    UndefinedVar,
    #[error("variable used before assignment")]
    UninitVar,
    #[error("variable has already been defined")]
    RedefinedVar,
    #[error("variable is not present at the resolved depth")]
    MisresolvedVar,
    // Resolution errors
    #[error("cannot read local variable in its own initialiser")]
    SelfInitialiser,
    #[error("variable with this name is already declared in this scope")]
    DuplicateLocal,
    #[error("cannot return from top-level code")]
    ReturnOutsideFunction,
}

pub fn runtime_error(msg: ErrorMsg, found: impl Display) -> Exception {
    Exception::Error(format!("Runtime error: {msg}, found {found}"))
}

pub fn runtime_error_at(line: usize, msg: ErrorMsg, found: impl Display) -> Exception {
    Exception::Error(format!("Runtime error at line {line}: {msg}, found {found}"))
}

/// Errors about a binding, e.g. `Runtime error: undefined variable 'x'`.
pub fn name_error(msg: ErrorMsg, name: &str) -> Exception {
    Exception::Error(format!("Runtime error: {msg} '{name}'"))
}

pub fn resolution_error(msg: ErrorMsg, ident: &Ident) -> String {
    format!(
        "Resolution error at line {} near '{}': {}",
        ident.line, ident.name, msg
    )
}
