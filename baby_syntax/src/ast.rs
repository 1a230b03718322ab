use std::fmt::Display;

use crate::token::{TextRange, Token, TokenKind};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Bang,
    Minus,
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Bang => "!",
            Self::Minus => "-",
        })
    }
}

impl UnaryOp {
    pub fn from_token(t: TokenKind) -> Option<Self> {
        let op = match t {
            TokenKind::BANG => Self::Bang,
            TokenKind::MINUS => Self::Minus,
            _ => return None,
        };
        Some(op)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BinOp {
    Slash,
    Star,
    Plus,
    Minus,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    BangEqual,
    EqualEqual,
}

impl Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Slash => "/",
            Self::Star => "*",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::BangEqual => "!=",
            Self::EqualEqual => "==",
        })
    }
}

impl BinOp {
    pub fn from_token(t: TokenKind) -> Option<Self> {
        let op = match t {
            TokenKind::SLASH => Self::Slash,
            TokenKind::STAR => Self::Star,
            TokenKind::PLUS => Self::Plus,
            TokenKind::MINUS => Self::Minus,
            TokenKind::GREATER => Self::Greater,
            TokenKind::GREATER_EQUAL => Self::GreaterEqual,
            TokenKind::LESS => Self::Less,
            TokenKind::LESS_EQUAL => Self::LessEqual,
            TokenKind::BANG_EQUAL => Self::BangEqual,
            TokenKind::EQUAL_EQUAL => Self::EqualEqual,
            _ => return None,
        };
        Some(op)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl Display for LogicalOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::And => "and",
            Self::Or => "or",
        })
    }
}

impl LogicalOp {
    pub fn from_token(t: TokenKind) -> Option<Self> {
        let op = match t {
            TokenKind::AND => Self::And,
            TokenKind::OR => Self::Or,
            _ => return None,
        };
        Some(op)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Number(f64),
    Str(String),
    Boolean(bool),
}

impl Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "\"{s}\""),
            Self::Boolean(b) => write!(f, "{b}"),
        }
    }
}

/// A name at a specific place in the source. The range makes every
/// occurrence distinct, which is what the resolver keys distances on.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Ident {
    pub name: String,
    pub range: TextRange,
    pub line: usize,
}

impl Display for Ident {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&Token> for Ident {
    fn from(token: &Token) -> Self {
        Self {
            name: token.lexeme.clone(),
            range: token.range,
            line: token.line,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Ident(Ident),
    Assignment {
        name: Ident,
        value: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
        line: usize,
    },
    Binary {
        lhs: Box<Expr>,
        op: BinOp,
        rhs: Box<Expr>,
        line: usize,
    },
    Logical {
        lhs: Box<Expr>,
        op: LogicalOp,
        rhs: Box<Expr>,
    },
    Ternary {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    Group(Box<Expr>),
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        line: usize,
    },
}

/// Renders the expression in a fully parenthesised, lisp-like form.
/// Used for debug tracing of the statements being executed.
impl Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Literal(l) => write!(f, "{l}"),
            Self::Ident(ident) => write!(f, "{ident}"),
            Self::Assignment { name, value } => write!(f, "(= {name} {value})"),
            Self::Unary { op, expr, .. } => write!(f, "({op} {expr})"),
            Self::Binary { lhs, op, rhs, .. } => write!(f, "({op} {lhs} {rhs})"),
            Self::Logical { lhs, op, rhs } => write!(f, "({op} {lhs} {rhs})"),
            Self::Ternary {
                condition,
                then_expr,
                else_expr,
            } => write!(f, "(?: {condition} {then_expr} {else_expr})"),
            Self::Group(e) => write!(f, "(group {e})"),
            Self::Call { func, args, .. } => {
                write!(f, "(call {func}")?;
                for arg in args {
                    write!(f, " {arg}")?;
                }
                f.write_str(")")
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Item {
    ExprStmt(Expr),
    PrintStmt(Expr),
    LetStmt {
        ident: Ident,
        init: Option<Expr>,
    },
    IfStmt {
        condition: Expr,
        if_item: Box<Item>,
        else_item: Option<Box<Item>>,
    },
    WhileStmt {
        condition: Expr,
        body: Box<Item>,
    },
    /// `for (ident in start..end)`. The parser always wraps this in a
    /// block that declares `ident`, so the loop only assigns it.
    RangeFor {
        ident: Ident,
        start: Expr,
        end: Expr,
        inclusive: bool,
        body: Box<Item>,
    },
    ReturnStmt {
        line: usize,
        value: Option<Expr>,
    },
    Block(Vec<Item>),
    Function {
        ident: Ident,
        args: Vec<Ident>,
        body: Vec<Item>,
    },
    Class {
        ident: Ident,
        methods: Vec<Item>,
    },
}

impl Item {
    /// Short, single line description used when tracing execution.
    pub fn summary(&self) -> String {
        match self {
            Self::ExprStmt(e) => format!("expr {e}"),
            Self::PrintStmt(e) => format!("print {e}"),
            Self::LetStmt { ident, init } => match init {
                Some(e) => format!("let {ident} = {e}"),
                None => format!("let {ident}"),
            },
            Self::IfStmt { condition, .. } => format!("if {condition}"),
            Self::WhileStmt { condition, .. } => format!("while {condition}"),
            Self::RangeFor {
                ident,
                start,
                end,
                inclusive,
                ..
            } => format!(
                "for {ident} in {start}{}{end}",
                if *inclusive { "..=" } else { ".." }
            ),
            Self::ReturnStmt { value, .. } => match value {
                Some(e) => format!("return {e}"),
                None => "return".to_string(),
            },
            Self::Block(items) => format!("block of {} items", items.len()),
            Self::Function { ident, args, .. } => format!(
                "fn {ident}({})",
                args.iter()
                    .map(|a| a.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Self::Class { ident, .. } => format!("class {ident}"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Source {
    pub items: Vec<Item>,
}
