use std::{cell::RefCell, collections::HashMap, rc::Rc, time::Duration};

use baby_syntax::ast::{BinOp, Expr, Ident, Item, LogicalOp, UnaryOp};
use log::warn;

use crate::{
    config::Config,
    environment::Env,
    error::{runtime_error, runtime_error_at, ErrorMsg, Exception, Phase},
    output::{Logger, NullLogger},
    resolve::Resolution,
    types::{Callable, Class, Func, Value},
};

/// Largest integer up to which every integer is exactly representable.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

type Task = Box<dyn FnOnce(&mut Interpreter) -> Result<(), Exception>>;

/// Work scheduled by a native to run once `due` has passed.
struct Deferred {
    due: Duration,
    task: Task,
}

pub struct Interpreter {
    globals: Rc<RefCell<Env>>,
    env: Rc<RefCell<Env>>,
    depths: HashMap<Ident, usize>,
    logger: Rc<dyn Logger>,
    config: Config,
    deferred: Vec<Deferred>,
    /// Locals of the current input that no function body refers to.
    transient: Vec<Ident>,
    calls: usize,
    offset: usize,
    debug: bool,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(Config::default(), Rc::new(NullLogger))
    }
}

impl Interpreter {
    pub fn new(config: Config, logger: Rc<dyn Logger>) -> Self {
        let globals = Env::new(config.strict);
        Self {
            env: Rc::clone(&globals),
            globals,
            depths: HashMap::default(),
            logger,
            config,
            deferred: Vec::default(),
            transient: Vec::default(),
            calls: 0,
            offset: 0,
            debug: false,
        }
    }

    pub fn logger(&self) -> Rc<dyn Logger> {
        Rc::clone(&self.logger)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Time since the Unix epoch, according to the configured clock.
    pub fn now(&self) -> Duration {
        (self.config.clock)()
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    /// Reserves the source range for an input of `len` characters and
    /// returns its starting offset.
    pub fn claim_offset(&mut self, len: usize) -> usize {
        let offset = self.offset;
        self.offset += len + 1;
        offset
    }

    /// Adds the depths of the locals of a newly resolved input. Those
    /// outside every function body are dropped once the input has run.
    pub fn resolve(&mut self, resolution: Resolution) {
        self.depths.extend(resolution.depths);
        self.transient = resolution.transient;
    }

    /// Binds `name` in the global environment, replacing any previous value.
    pub fn define_global(&mut self, name: &str, value: Value) {
        self.globals.borrow_mut().set(name, value);
    }

    /// Runs `task` during the first poll at least `delay` from now.
    pub fn defer<F>(&mut self, delay: Duration, task: F)
    where
        F: FnOnce(&mut Interpreter) -> Result<(), Exception> + 'static,
    {
        let due = self.now() + delay;
        self.deferred.push(Deferred {
            due,
            task: Box::new(task),
        });
    }

    pub fn has_deferred(&self) -> bool {
        !self.deferred.is_empty()
    }

    /// Runs every deferred task whose time has come, earliest first.
    /// Failures are reported and do not stop the remaining tasks.
    pub fn poll_deferred(&mut self) -> usize {
        let mut count = 0;
        loop {
            let now = self.now();
            let Some(index) = self
                .deferred
                .iter()
                .enumerate()
                .filter(|(_, d)| d.due <= now)
                .min_by_key(|(_, d)| d.due)
                .map(|(i, _)| i)
            else {
                return count;
            };
            let Deferred { task, .. } = self.deferred.remove(index);
            if let Err(e) = task(self) {
                warn!("Deferred task failed: {e}");
                self.logger.error(Phase::Interpret, &e.to_string());
            }
            count += 1;
        }
    }

    /// Runs a whole input. An input made of a single variable
    /// is echoed as if it were printed.
    pub fn interpret_all(&mut self, items: &[Item]) -> Result<(), Exception> {
        let result = match items {
            [Item::ExprStmt(expr @ Expr::Ident(_))] => self.interpret_print_stmt(expr),
            _ => self.interpret_items(items),
        };
        // Only function bodies can run again after the input is done
        for ident in std::mem::take(&mut self.transient) {
            self.depths.remove(&ident);
        }
        result
    }

    fn interpret_items(&mut self, items: &[Item]) -> Result<(), Exception> {
        items.iter().try_for_each(|item| self.interpret_item(item))
    }

    fn interpret_item(&mut self, item: &Item) -> Result<(), Exception> {
        if self.debug {
            self.logger.debug(Phase::Interpret, &item.summary());
        }
        match item {
            Item::ExprStmt(expr) => self.interpret_expr(expr).map(|_| ()),
            Item::PrintStmt(expr) => self.interpret_print_stmt(expr),
            Item::LetStmt { ident, init } => self.interpret_let_stmt(ident, init.as_ref()),
            Item::IfStmt {
                condition,
                if_item,
                else_item,
            } => self.interpret_if_stmt(condition, if_item, else_item.as_deref()),
            Item::WhileStmt { condition, body } => self.interpret_while_stmt(condition, body),
            Item::RangeFor {
                ident,
                start,
                end,
                inclusive,
                body,
            } => self.interpret_range_for(ident, start, end, *inclusive, body),
            Item::ReturnStmt { value, .. } => self.interpret_return_stmt(value.as_ref()),
            Item::Block(items) => {
                self.interpret_block(items, Env::with_parent(Rc::clone(&self.env)))
            }
            Item::Function { ident, args, body } => self.interpret_function(ident, args, body),
            Item::Class { ident, methods } => self.interpret_class(ident, methods),
        }
    }

    fn interpret_print_stmt(&mut self, expr: &Expr) -> Result<(), Exception> {
        let value = self.interpret_expr(expr)?;
        if value == Value::Void {
            return Err(runtime_error(ErrorMsg::VoidValue, expr));
        }
        self.logger.log(&value.to_string());
        Ok(())
    }

    fn interpret_let_stmt(&mut self, ident: &Ident, init: Option<&Expr>) -> Result<(), Exception> {
        let value = match init {
            Some(expr) => self.interpret_expr(expr)?,
            None => Value::Uninit,
        };
        self.define(&ident.name, value)
    }

    fn interpret_if_stmt(
        &mut self,
        condition: &Expr,
        if_item: &Item,
        else_item: Option<&Item>,
    ) -> Result<(), Exception> {
        if self.interpret_expr(condition)?.is_truthy() {
            self.interpret_item(if_item)
        } else if let Some(item) = else_item {
            self.interpret_item(item)
        } else {
            Ok(())
        }
    }

    fn interpret_while_stmt(&mut self, condition: &Expr, body: &Item) -> Result<(), Exception> {
        let mut count = 0;
        while self.interpret_expr(condition)?.is_truthy() {
            if count >= self.config.loop_limit {
                return Err(runtime_error(
                    ErrorMsg::InfiniteLoop,
                    format_args!("'while {condition}' after {count} iterations"),
                ));
            }
            self.interpret_item(body)?;
            count += 1;
        }
        Ok(())
    }

    fn interpret_range_for(
        &mut self,
        ident: &Ident,
        start: &Expr,
        end: &Expr,
        inclusive: bool,
        body: &Item,
    ) -> Result<(), Exception> {
        let start = self.interpret_expr(start)?;
        let end = self.interpret_expr(end)?;
        let (Value::Number(from), Value::Number(to)) = (&start, &end) else {
            return Err(runtime_error(
                ErrorMsg::InvalidRange,
                format_args!("{start}..{end}"),
            ));
        };
        // Past 2^53 adding one no longer changes the value
        let in_range = |n: f64| n.abs() <= MAX_SAFE_INTEGER;
        if !in_range(*from) || !in_range(*to) {
            return Err(runtime_error(
                ErrorMsg::InvalidRange,
                format_args!("{start}..{end}"),
            ));
        }

        let mut i = *from;
        while if inclusive { i <= *to } else { i < *to } {
            self.assign(ident, Value::Number(i))?;
            self.interpret_item(body)?;
            i += 1.0;
        }
        Ok(())
    }

    fn interpret_return_stmt(&mut self, value: Option<&Expr>) -> Result<(), Exception> {
        let value = match value {
            Some(expr) => self.interpret_expr(expr)?,
            None => Value::Void,
        };
        Err(Exception::Return(value))
    }

    /// Runs `items` with `env` as the active environment. The previous
    /// environment is restored whether or not the items succeed.
    pub(crate) fn interpret_block(
        &mut self,
        items: &[Item],
        env: Rc<RefCell<Env>>,
    ) -> Result<(), Exception> {
        let previous = std::mem::replace(&mut self.env, env);
        self.trace_env();
        let result = self.interpret_items(items);
        self.env = previous;
        result
    }

    fn interpret_function(
        &mut self,
        ident: &Ident,
        args: &[Ident],
        body: &[Item],
    ) -> Result<(), Exception> {
        let func = Func {
            name: ident.name.clone(),
            args: args.iter().map(|arg| arg.name.clone()).collect(),
            body: Rc::new(body.to_vec()),
            closure: Rc::clone(&self.env),
        };
        self.define(&ident.name, Value::Func(func))
    }

    fn interpret_class(&mut self, ident: &Ident, methods: &[Item]) -> Result<(), Exception> {
        // Declared first so that the methods could refer to the class
        self.define(&ident.name, Value::Uninit)?;
        let class = Class {
            name: ident.name.clone(),
            methods: methods
                .iter()
                .filter_map(|method| match method {
                    Item::Function { ident, .. } => Some(ident.name.clone()),
                    _ => None,
                })
                .collect(),
        };
        self.env
            .borrow_mut()
            .assign(&ident.name, Value::Class(class))?;
        self.trace_env();
        Ok(())
    }

    fn interpret_expr(&mut self, expr: &Expr) -> Result<Value, Exception> {
        match expr {
            Expr::Literal(literal) => Ok(Value::from(literal)),
            Expr::Ident(ident) => self.lookup(ident),
            Expr::Assignment { name, value } => self.interpret_assignment(name, value),
            Expr::Unary { op, expr, line } => self.interpret_unary(op, expr, *line),
            Expr::Binary { lhs, op, rhs, line } => self.interpret_binary(lhs, op, rhs, *line),
            Expr::Logical { lhs, op, rhs } => self.interpret_logical(lhs, op, rhs),
            Expr::Ternary {
                condition,
                then_expr,
                else_expr,
            } => {
                if self.interpret_expr(condition)?.is_truthy() {
                    self.interpret_expr(then_expr)
                } else {
                    self.interpret_expr(else_expr)
                }
            }
            Expr::Group(e) => self.interpret_expr(e),
            Expr::Call { func, args, line } => self.interpret_func_call(func, args, *line),
        }
    }

    fn interpret_assignment(&mut self, name: &Ident, expr: &Expr) -> Result<Value, Exception> {
        let value = self.interpret_expr(expr)?;
        self.assign(name, value.clone())?;
        Ok(value)
    }

    fn interpret_unary(&mut self, op: &UnaryOp, expr: &Expr, line: usize) -> Result<Value, Exception> {
        let value = self.interpret_expr(expr)?;
        match op {
            UnaryOp::Bang => Ok(Value::Boolean(!value.is_truthy())),
            UnaryOp::Minus => match value {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(runtime_error_at(
                    line,
                    ErrorMsg::ExpectedNumber,
                    format_args!("-{value}"),
                )),
            },
        }
    }

    fn interpret_logical(&mut self, lhs: &Expr, op: &LogicalOp, rhs: &Expr) -> Result<Value, Exception> {
        let left = self.interpret_expr(lhs)?;
        match (op, left.is_truthy()) {
            (LogicalOp::Or, true) | (LogicalOp::And, false) => Ok(left),
            _ => self.interpret_expr(rhs),
        }
    }

    fn interpret_binary(
        &mut self,
        lhs: &Expr,
        op: &BinOp,
        rhs: &Expr,
        line: usize,
    ) -> Result<Value, Exception> {
        let left = self.interpret_expr(lhs)?;
        let right = self.interpret_expr(rhs)?;
        let error = |msg| runtime_error_at(line, msg, format_args!("{left} {op} {right}"));

        // No implicit conversions: values of different types are never
        // equal, and arithmetic needs operands of the same type
        match (op, &left, &right) {
            (BinOp::EqualEqual, ..) => Ok(Value::Boolean(left == right)),
            (BinOp::BangEqual, ..) => Ok(Value::Boolean(left != right)),
            (BinOp::Plus, Value::Number(m), Value::Number(n)) => Ok(Value::Number(m + n)),
            (BinOp::Plus, Value::Str(m), Value::Str(n)) => Ok(Value::Str(format!("{m}{n}"))),
            (BinOp::Plus, ..) => Err(error(ErrorMsg::ExpectedNumOrStr)),
            (BinOp::Minus, Value::Number(m), Value::Number(n)) => Ok(Value::Number(m - n)),
            (BinOp::Star, Value::Number(m), Value::Number(n)) => Ok(Value::Number(m * n)),
            (BinOp::Slash, Value::Number(_), Value::Number(n)) if *n == 0.0 => {
                Err(error(ErrorMsg::DivideByZero))
            }
            (BinOp::Slash, Value::Number(m), Value::Number(n)) => Ok(Value::Number(m / n)),
            (BinOp::Greater, Value::Number(m), Value::Number(n)) => Ok(Value::Boolean(m > n)),
            (BinOp::GreaterEqual, Value::Number(m), Value::Number(n)) => {
                Ok(Value::Boolean(m >= n))
            }
            (BinOp::Less, Value::Number(m), Value::Number(n)) => Ok(Value::Boolean(m < n)),
            (BinOp::LessEqual, Value::Number(m), Value::Number(n)) => Ok(Value::Boolean(m <= n)),
            _ => Err(error(ErrorMsg::ExpectedNumber)),
        }
    }

    fn interpret_func_call(
        &mut self,
        fn_expr: &Expr,
        arg_exprs: &[Expr],
        line: usize,
    ) -> Result<Value, Exception> {
        let callee = self.interpret_expr(fn_expr)?;
        let mut args = Vec::with_capacity(arg_exprs.len());
        for arg in arg_exprs {
            let value = self.interpret_expr(arg)?;
            if value == Value::Void {
                return Err(runtime_error_at(line, ErrorMsg::VoidValue, arg));
            }
            args.push(value);
        }

        let func: &dyn Callable = match &callee {
            Value::Func(f) => f as &dyn Callable,
            Value::NativeFunc(f) => f as &dyn Callable,
            _ => return Err(runtime_error_at(line, ErrorMsg::InvalidCallExpr, &callee)),
        };
        // Ensure the number of arguments matches the function definition
        if func.arity() != args.len() {
            return Err(runtime_error_at(
                line,
                ErrorMsg::ArityMismatch(func.arity(), args.len()),
                &callee,
            ));
        }

        func.call(self, args)
    }

    /// Calls a guest function in a fresh environment enclosed by its
    /// closure, yielding the returned value or `Void`.
    pub(crate) fn call_func(&mut self, func: &Func, args: Vec<Value>) -> Result<Value, Exception> {
        let env = Env::with_parent(Rc::clone(&func.closure));
        for (name, value) in func.args.iter().zip(args) {
            env.borrow_mut().define(name, value)?;
        }

        if self.calls >= self.config.call_limit {
            return Err(runtime_error(
                ErrorMsg::CallDepth,
                format_args!("{func} after {} nested calls", self.calls),
            ));
        }
        self.calls += 1;
        let body = Rc::clone(&func.body);
        let result = self.interpret_block(&body, env);
        self.calls -= 1;

        match result {
            Ok(()) => Ok(Value::Void),
            Err(Exception::Return(value)) => Ok(value),
            Err(e) => Err(e),
        }
    }

    fn lookup(&self, ident: &Ident) -> Result<Value, Exception> {
        match self.depths.get(ident) {
            Some(&depth) => self.env.borrow().get_at_depth(&ident.name, depth),
            None => self.globals.borrow().get(&ident.name),
        }
    }

    fn assign(&mut self, ident: &Ident, value: Value) -> Result<(), Exception> {
        match self.depths.get(ident) {
            Some(&depth) => self
                .env
                .borrow_mut()
                .assign_at_depth(&ident.name, value, depth),
            None => self.globals.borrow_mut().assign(&ident.name, value),
        }?;
        self.trace_env();
        Ok(())
    }

    fn define(&mut self, name: &str, value: Value) -> Result<(), Exception> {
        let previous = self.env.borrow_mut().define(name, value.clone())?;
        // Declarations without a value have nothing worth reporting
        let previous = previous.filter(|p| *p != Value::Uninit && value != Value::Uninit);
        if let Some(previous) = previous {
            self.logger.info(&format!(
                "'{name}' was already defined as {previous}, it is now redefined as {value}. \
                 consider reassigning it without 'let' instead, e.g. {name} = {value};"
            ));
        }
        self.trace_env();
        Ok(())
    }

    fn trace_env(&self) {
        if self.debug {
            self.logger.environment(&self.env.borrow().describe());
        }
    }
}
