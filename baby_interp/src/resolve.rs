use std::collections::HashMap;

use baby_syntax::ast::{Expr, Ident, Item, Source};
use log::trace;

use crate::error::{resolution_error, ErrorMsg};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Node {
    Function,
    Method,
}

/// The outcome of resolving one input.
#[derive(Debug, Default, PartialEq)]
pub struct Resolution {
    /// Scope distance of every local variable use.
    pub depths: HashMap<Ident, usize>,
    /// Uses outside every function body. They can only run while the
    /// input itself runs.
    pub transient: Vec<Ident>,
}

/// Computes how many scopes separate each local variable use from its
/// declaration. Names that are not found in any local scope are left out
/// and looked up in the global environment at runtime.
#[derive(Debug, Default)]
pub struct Resolver {
    scopes: Vec<HashMap<String, bool>>,
    resolution: Resolution,
    node: Option<Node>,
    errors: Vec<String>,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(mut self, source: &Source) -> Result<Resolution, Vec<String>> {
        self.resolve_all(&source.items);
        trace!(
            "Resolved {} locals with {} errors",
            self.resolution.depths.len(),
            self.errors.len()
        );
        if self.errors.is_empty() {
            Ok(self.resolution)
        } else {
            Err(self.errors)
        }
    }

    fn resolve_all(&mut self, items: &[Item]) {
        items.iter().for_each(|item| self.resolve_item(item))
    }

    fn resolve_item(&mut self, item: &Item) {
        match item {
            Item::ExprStmt(expr) | Item::PrintStmt(expr) => self.resolve_expr(expr),
            Item::LetStmt { ident, init } => self.resolve_let_stmt(ident, init.as_ref()),
            Item::IfStmt {
                condition,
                if_item,
                else_item,
            } => self.resolve_if_stmt(condition, if_item, else_item.as_deref()),
            Item::WhileStmt { condition, body } => self.resolve_while_stmt(condition, body),
            Item::RangeFor {
                ident,
                start,
                end,
                body,
                ..
            } => self.resolve_range_for(ident, start, end, body),
            Item::ReturnStmt { line, value } => self.resolve_return_stmt(*line, value.as_ref()),
            Item::Block(items) => self.resolve_block(items),
            Item::Function { ident, args, body } => self.resolve_func_decl(ident, args, body),
            Item::Class { ident, methods } => self.resolve_class(ident, methods),
        }
    }

    fn resolve_block(&mut self, items: &[Item]) {
        self.init_scope();
        self.resolve_all(items);
        self.end_scope();
    }

    fn resolve_let_stmt(&mut self, ident: &Ident, init: Option<&Expr>) {
        self.declare(ident);
        if let Some(expr) = init {
            self.resolve_expr(expr);
        }
        self.define(ident);
    }

    fn resolve_if_stmt(&mut self, condition: &Expr, if_item: &Item, else_item: Option<&Item>) {
        self.resolve_expr(condition);
        self.resolve_item(if_item);
        if let Some(item) = else_item {
            self.resolve_item(item);
        }
    }

    fn resolve_while_stmt(&mut self, condition: &Expr, body: &Item) {
        self.resolve_expr(condition);
        self.resolve_item(body);
    }

    fn resolve_range_for(&mut self, ident: &Ident, start: &Expr, end: &Expr, body: &Item) {
        self.resolve_expr(start);
        self.resolve_expr(end);
        // The loop assigns the variable declared by the enclosing block
        self.resolve_variable(ident);
        self.resolve_item(body);
    }

    fn resolve_return_stmt(&mut self, line: usize, value: Option<&Expr>) {
        if self.node.is_none() {
            let keyword = Ident {
                name: "return".to_string(),
                range: Default::default(),
                line,
            };
            self.errors
                .push(resolution_error(ErrorMsg::ReturnOutsideFunction, &keyword));
        }
        if let Some(expr) = value {
            self.resolve_expr(expr);
        }
    }

    fn resolve_func_decl(&mut self, ident: &Ident, args: &[Ident], body: &[Item]) {
        // Defined before the body is resolved to allow recursion
        self.declare(ident);
        self.define(ident);
        self.resolve_function(args, body, Node::Function);
    }

    fn resolve_function(&mut self, args: &[Ident], body: &[Item], node: Node) {
        let old = self.node;
        self.node = Some(node);
        self.init_scope();

        for arg in args {
            self.declare(arg);
            self.define(arg);
        }
        self.resolve_all(body);

        self.end_scope();
        self.node = old;
    }

    fn resolve_class(&mut self, ident: &Ident, methods: &[Item]) {
        self.declare(ident);
        self.define(ident);
        self.init_scope();

        for method in methods {
            if let Item::Function { args, body, .. } = method {
                self.resolve_function(args, body, Node::Method);
            }
        }

        self.end_scope();
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) => (),
            Expr::Ident(ident) => self.resolve_ident(ident),
            Expr::Assignment { name, value } => {
                self.resolve_expr(value);
                self.resolve_variable(name);
            }
            Expr::Unary { expr, .. } | Expr::Group(expr) => self.resolve_expr(expr),
            Expr::Binary { lhs, rhs, .. } | Expr::Logical { lhs, rhs, .. } => {
                self.resolve_expr(lhs);
                self.resolve_expr(rhs);
            }
            Expr::Ternary {
                condition,
                then_expr,
                else_expr,
            } => {
                self.resolve_expr(condition);
                self.resolve_expr(then_expr);
                self.resolve_expr(else_expr);
            }
            Expr::Call { func, args, .. } => {
                self.resolve_expr(func);
                args.iter().for_each(|arg| self.resolve_expr(arg));
            }
        }
    }

    fn resolve_ident(&mut self, ident: &Ident) {
        if let Some(false) = self.scopes.last().and_then(|s| s.get(&ident.name)) {
            self.errors
                .push(resolution_error(ErrorMsg::SelfInitialiser, ident));
        }
        self.resolve_variable(ident);
    }

    fn resolve_variable(&mut self, ident: &Ident) {
        if let Some(depth) = self
            .scopes
            .iter()
            .rev()
            .position(|s| s.contains_key(&ident.name))
        {
            if self.node.is_none() {
                self.resolution.transient.push(ident.clone());
            }
            self.resolution.depths.insert(ident.clone(), depth);
        }
    }

    fn init_scope(&mut self) {
        self.scopes.push(HashMap::default());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, ident: &Ident) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };
        if scope.insert(ident.name.clone(), false).is_some() {
            self.errors
                .push(resolution_error(ErrorMsg::DuplicateLocal, ident));
        }
    }

    fn define(&mut self, ident: &Ident) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(ident.name.clone(), true);
        }
    }
}
