use std::{collections::HashSet, iter::Peekable, slice::Iter};

use log::trace;

use crate::{
    ast::{self, Expr, Ident, Item, Literal, Source},
    error::{Error, ErrorMsg},
    token::{Token, TokenKind},
};

const MAX_PARAMS: usize = 255;
/// Deepest allowed nesting of statements and expressions combined.
const MAX_NESTING: usize = 100;

/// Style advice that is legal code but worth pointing out. Each kind
/// is reported at most once per parse.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Advice {
    ChainedTernary,
    ChainedComparison,
}

impl Advice {
    fn message(&self) -> &'static str {
        match self {
            Self::ChainedTernary => "it looks like you're chaining ternary operators, which can make the code harder to read. consider splitting the condition into separate statements, or add parentheses to make the ordering explicit",
            Self::ChainedComparison => "it looks like you're chaining comparison operators, which can make the code harder to read. consider splitting the comparison into separate statements, or add parentheses to make the ordering explicit",
        }
    }
}

#[derive(Debug)]
pub struct Parser<'a> {
    stream: Peekable<Iter<'a, Token>>,
    previous: Option<TokenKind>,
    errors: Vec<Error>,
    notes: Vec<String>,
    advised: HashSet<Advice>,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(stream: &'a [Token]) -> Self {
        Self {
            stream: stream.iter().peekable(),
            previous: None,
            errors: Vec::default(),
            notes: Vec::default(),
            advised: HashSet::default(),
            depth: 0,
        }
    }

    /// Parses every declaration until the end of input. Errors do not stop
    /// the parser; it resynchronises at the next statement boundary and
    /// keeps going so that all independent errors are reported together.
    pub fn parse_all(&mut self) -> Result<Source, Vec<Error>> {
        let mut items: Vec<Item> = Vec::default();
        while !self.is_at_end() {
            if let Some(item) = self.parse_declaration() {
                items.push(item);
            }
        }
        trace!("Parsed {} items with {} errors", items.len(), self.errors.len());

        if self.errors.is_empty() {
            Ok(Source { items })
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }

    /// Advisory notes collected while parsing, such as warnings
    /// about chained operators.
    pub fn take_notes(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notes)
    }

    fn parse_declaration(&mut self) -> Option<Item> {
        match self.parse_item() {
            Ok(item) => Some(item),
            Err(e) => {
                self.errors.push(e);
                self.sync();
                None
            }
        }
    }

    pub fn parse_item(&mut self) -> Result<Item, Error> {
        self.nested(Self::parse_stmt)
    }

    fn parse_stmt(&mut self) -> Result<Item, Error> {
        let item = match self.peek_kind() {
            TokenKind::LET => self.parse_let_stmt(),
            TokenKind::PRINT => self.parse_print_stmt(),
            TokenKind::LBRACE => return self.parse_block(),
            TokenKind::IF => return self.parse_if_stmt(),
            TokenKind::WHILE => return self.parse_while_stmt(),
            TokenKind::FOR => return self.parse_for_stmt(),
            TokenKind::CLASS => return self.parse_class(),
            TokenKind::FN => return self.parse_function(),
            TokenKind::RETURN => return self.parse_return(),
            _ => self.parse_expr_stmt(),
        }?;
        self.advance_or_err(TokenKind::SEMICOLON, ErrorMsg::MissingSemicolon)?;
        Ok(item)
    }

    fn parse_let_stmt(&mut self) -> Result<Item, Error> {
        // Consume the `let` keyword
        self.advance();
        let ident = self.advance_or_err(TokenKind::IDENT, ErrorMsg::InvalidIdent)?;
        let init = if self.advance_if(|t| t.kind == TokenKind::EQUAL).is_some() {
            Some(self.parse_expr()?)
        } else {
            None
        };

        Ok(Item::LetStmt {
            ident: Ident::from(ident),
            init,
        })
    }

    fn parse_print_stmt(&mut self) -> Result<Item, Error> {
        // Consume the `print` keyword
        self.advance();
        Ok(Item::PrintStmt(self.parse_expr()?))
    }

    fn parse_if_stmt(&mut self) -> Result<Item, Error> {
        // Consume the `if` keyword
        self.advance();
        self.advance_or_err(TokenKind::LPAREN, ErrorMsg::MissingOpeningParen)?;
        let condition = self.parse_expr()?;
        self.advance_or_err(TokenKind::RPAREN, ErrorMsg::MissingClosingParen)?;
        let if_item = self.parse_item()?;
        let else_item = if self.advance_if(|t| t.kind == TokenKind::ELSE).is_some() {
            Some(Box::new(self.parse_item()?))
        } else {
            None
        };

        Ok(Item::IfStmt {
            condition,
            if_item: Box::new(if_item),
            else_item,
        })
    }

    fn parse_while_stmt(&mut self) -> Result<Item, Error> {
        // Consume the `while` keyword
        self.advance();
        self.advance_or_err(TokenKind::LPAREN, ErrorMsg::MissingOpeningParen)?;
        let condition = self.parse_expr()?;
        self.advance_or_err(TokenKind::RPAREN, ErrorMsg::MissingClosingParen)?;

        Ok(Item::WhileStmt {
            condition,
            body: Box::new(self.parse_item()?),
        })
    }

    fn parse_for_stmt(&mut self) -> Result<Item, Error> {
        // Consume the `for` keyword
        self.advance();
        self.advance_or_err(TokenKind::LPAREN, ErrorMsg::MissingOpeningParen)?;
        // `for (i in ...)` needs two tokens of lookahead to be
        // told apart from `for (i = 0; ...)`
        let mut ahead = self.stream.clone();
        if matches!(
            (ahead.next().map(|t| t.kind), ahead.next().map(|t| t.kind)),
            (Some(TokenKind::IDENT), Some(TokenKind::IN))
        ) {
            return self.parse_range_for();
        }

        let init = match self.peek_kind() {
            TokenKind::SEMICOLON => None,
            TokenKind::LET => Some(self.parse_let_stmt()?),
            _ => Some(self.parse_expr_stmt()?),
        };
        self.advance_or_err(TokenKind::SEMICOLON, ErrorMsg::MissingSemicolon)?;

        let condition = if self.check(TokenKind::SEMICOLON) {
            Expr::Literal(Literal::Boolean(true))
        } else {
            self.parse_expr()?
        };
        self.advance_or_err(TokenKind::SEMICOLON, ErrorMsg::MissingSemicolon)?;

        let modifier = if self.check(TokenKind::RPAREN) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.advance_or_err(TokenKind::RPAREN, ErrorMsg::MissingClosingParen)?;

        let mut body = self.parse_item()?;
        // If the modifier is present, create
        // a block and place it at the end
        if let Some(m) = modifier {
            body = Item::Block(vec![body, Item::ExprStmt(m)]);
        }
        // Create a while loop with the condition and body
        body = Item::WhileStmt {
            condition,
            body: Box::new(body),
        };
        // If the initialiser is present, create
        // a block and place it at the beginning,
        // followed by the actual while loop block
        if let Some(i) = init {
            body = Item::Block(vec![i, body]);
        }

        Ok(body)
    }

    fn parse_range_for(&mut self) -> Result<Item, Error> {
        let ident = Ident::from(self.advance_or_err(TokenKind::IDENT, ErrorMsg::InvalidIdent)?);
        self.advance_or_err(TokenKind::IN, ErrorMsg::MissingIn)?;
        let start = self.parse_expr()?;
        self.advance_or_err(TokenKind::DOT_DOT, ErrorMsg::MissingRange)?;
        let inclusive = self.advance_if(|t| t.kind == TokenKind::EQUAL).is_some();
        let end = self.parse_expr()?;
        self.advance_or_err(TokenKind::RPAREN, ErrorMsg::MissingClosingParen)?;
        let body = self.parse_item()?;

        // The loop variable lives in its own block so
        // that it does not leak into the enclosing scope
        Ok(Item::Block(vec![
            Item::LetStmt {
                ident: ident.clone(),
                init: None,
            },
            Item::RangeFor {
                ident,
                start,
                end,
                inclusive,
                body: Box::new(body),
            },
        ]))
    }

    fn parse_class(&mut self) -> Result<Item, Error> {
        // Consume the `class` keyword
        self.advance();
        let ident = Ident::from(self.advance_or_err(TokenKind::IDENT, ErrorMsg::InvalidIdent)?);
        self.advance_or_err(TokenKind::LBRACE, ErrorMsg::MissingOpeningBrace)?;
        let mut methods = vec![];
        while !self.check(TokenKind::RBRACE) && !self.is_at_end() {
            // Methods may optionally be introduced with `fn`
            self.advance_if(|t| t.kind == TokenKind::FN);
            methods.push(self.parse_function_signature()?);
        }
        self.advance_or_err(TokenKind::RBRACE, ErrorMsg::MissingClosingBrace)?;

        Ok(Item::Class { ident, methods })
    }

    fn parse_function(&mut self) -> Result<Item, Error> {
        // Consume the `fn` keyword
        self.advance();
        self.parse_function_signature()
    }

    fn parse_function_signature(&mut self) -> Result<Item, Error> {
        let ident = Ident::from(self.advance_or_err(TokenKind::IDENT, ErrorMsg::InvalidIdent)?);
        self.advance_or_err(TokenKind::LPAREN, ErrorMsg::MissingOpeningParen)?;
        let mut args = vec![];
        if !self.check(TokenKind::RPAREN) {
            loop {
                if args.len() >= MAX_PARAMS {
                    return Err(self.error_at_peek(ErrorMsg::TooManyParams(MAX_PARAMS)));
                }
                args.push(Ident::from(
                    self.advance_or_err(TokenKind::IDENT, ErrorMsg::InvalidIdent)?,
                ));
                if self.advance_if(|t| t.kind == TokenKind::COMMA).is_none() {
                    break;
                }
            }
        }
        self.advance_or_err(TokenKind::RPAREN, ErrorMsg::MissingClosingParen)?;
        if !self.check(TokenKind::LBRACE) {
            return Err(self.error_at_peek(ErrorMsg::MissingOpeningBrace));
        }
        let body = self.parse_block_items()?;

        Ok(Item::Function { ident, args, body })
    }

    fn parse_return(&mut self) -> Result<Item, Error> {
        // Consume the `return` keyword
        let line = self.advance().map_or(0, |t| t.line);
        if self.advance_if(|t| t.kind == TokenKind::SEMICOLON).is_some() {
            return Ok(Item::ReturnStmt { line, value: None });
        }
        let value = self.parse_expr()?;
        self.advance_or_err(TokenKind::SEMICOLON, ErrorMsg::MissingSemicolon)?;

        Ok(Item::ReturnStmt {
            line,
            value: Some(value),
        })
    }

    fn parse_expr_stmt(&mut self) -> Result<Item, Error> {
        Ok(Item::ExprStmt(self.parse_expr()?))
    }

    fn parse_block(&mut self) -> Result<Item, Error> {
        Ok(Item::Block(self.parse_block_items()?))
    }

    fn parse_block_items(&mut self) -> Result<Vec<Item>, Error> {
        let mut items = Vec::default();
        // Consume the opening brace
        self.advance_or_err(TokenKind::LBRACE, ErrorMsg::MissingOpeningBrace)?;
        while !self.check(TokenKind::RBRACE) && !self.is_at_end() {
            if let Some(item) = self.parse_declaration() {
                items.push(item);
            }
        }
        // Consume the closing brace
        self.advance_or_err(TokenKind::RBRACE, ErrorMsg::MissingClosingBrace)?;

        Ok(items)
    }

    fn parse_expr(&mut self) -> Result<Expr, Error> {
        self.nested(Self::parse_assignment)
    }

    fn parse_assignment(&mut self) -> Result<Expr, Error> {
        let lhs = self.parse_logical_or()?;
        let Some(eq) = self.advance_if(|t| t.kind == TokenKind::EQUAL) else {
            return Ok(lhs);
        };
        let rhs = self.parse_expr()?;
        match lhs {
            Expr::Ident(name) => Ok(Expr::Assignment {
                name,
                value: Box::new(rhs),
            }),
            _ => Err(Self::error(eq, ErrorMsg::InvalidAssignment)),
        }
    }

    fn parse_logical_or(&mut self) -> Result<Expr, Error> {
        let depth = self.depth;
        let mut lhs = self.parse_logical_and()?;
        while self.advance_if(|t| t.kind == TokenKind::OR).is_some() {
            self.nest()?;
            let rhs = self.parse_logical_and()?;
            lhs = Expr::Logical {
                lhs: Box::new(lhs),
                op: ast::LogicalOp::Or,
                rhs: Box::new(rhs),
            };
        }
        self.depth = depth;
        Ok(lhs)
    }

    fn parse_logical_and(&mut self) -> Result<Expr, Error> {
        let depth = self.depth;
        let mut lhs = self.parse_ternary(0)?;
        while self.advance_if(|t| t.kind == TokenKind::AND).is_some() {
            self.nest()?;
            let rhs = self.parse_ternary(0)?;
            lhs = Expr::Logical {
                lhs: Box::new(lhs),
                op: ast::LogicalOp::And,
                rhs: Box::new(rhs),
            };
        }
        self.depth = depth;
        Ok(lhs)
    }

    /// `condition ? then : else`, associating to the right. The middle is
    /// a full expression; the else branch recurses so that chains nest
    /// as `a ? b : (c ? d : e)`.
    fn parse_ternary(&mut self, chained: usize) -> Result<Expr, Error> {
        let condition = self.parse_eq()?;
        if self.advance_if(|t| t.kind == TokenKind::QUESTION).is_none() {
            return Ok(condition);
        }
        if chained > 0 {
            self.advise(Advice::ChainedTernary);
        }
        let then_expr = self.parse_expr()?;
        self.advance_or_err(TokenKind::COLON, ErrorMsg::MissingColon)?;
        let else_expr = self.nested(|p| p.parse_ternary(chained + 1))?;

        Ok(Expr::Ternary {
            condition: Box::new(condition),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        })
    }

    fn parse_eq(&mut self) -> Result<Expr, Error> {
        self.parse_binary(
            |kind| matches!(kind, TokenKind::EQUAL_EQUAL | TokenKind::BANG_EQUAL),
            Self::parse_cmp,
            true,
        )
    }

    fn parse_cmp(&mut self) -> Result<Expr, Error> {
        self.parse_binary(
            |kind| {
                matches!(
                    kind,
                    TokenKind::GREATER
                        | TokenKind::GREATER_EQUAL
                        | TokenKind::LESS
                        | TokenKind::LESS_EQUAL
                )
            },
            Self::parse_term,
            true,
        )
    }

    fn parse_term(&mut self) -> Result<Expr, Error> {
        self.parse_binary(
            |kind| matches!(kind, TokenKind::PLUS | TokenKind::MINUS),
            Self::parse_factor,
            false,
        )
    }

    fn parse_factor(&mut self) -> Result<Expr, Error> {
        self.parse_binary(
            |kind| matches!(kind, TokenKind::SLASH | TokenKind::STAR),
            Self::parse_unary,
            false,
        )
    }

    /// Left-associative binary operators of one precedence level.
    fn parse_binary<M, N>(&mut self, matches: M, mut next: N, advise: bool) -> Result<Expr, Error>
    where
        M: Fn(TokenKind) -> bool,
        N: FnMut(&mut Self) -> Result<Expr, Error>,
    {
        let depth = self.depth;
        let mut lhs = next(self)?;
        let mut count = 0;
        while let Some(op) = self.advance_if(|t| matches(t.kind)) {
            self.nest()?;
            let Some(bin_op) = ast::BinOp::from_token(op.kind) else {
                return Err(Self::error(op, ErrorMsg::UnexpectedToken));
            };
            let rhs = next(self)?;
            lhs = Expr::Binary {
                lhs: Box::new(lhs),
                op: bin_op,
                rhs: Box::new(rhs),
                line: op.line,
            };
            count += 1;
        }
        if advise && count > 1 {
            self.advise(Advice::ChainedComparison);
        }
        self.depth = depth;
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, Error> {
        let Some(op) = self.advance_if(|t| matches!(t.kind, TokenKind::BANG | TokenKind::MINUS))
        else {
            return self.parse_func_call();
        };
        let Some(unary_op) = ast::UnaryOp::from_token(op.kind) else {
            return Err(Self::error(op, ErrorMsg::UnexpectedToken));
        };

        Ok(Expr::Unary {
            op: unary_op,
            expr: Box::new(self.nested(Self::parse_unary)?),
            line: op.line,
        })
    }

    fn parse_func_call(&mut self) -> Result<Expr, Error> {
        let depth = self.depth;
        let mut expr = self.parse_primary()?;
        while self.advance_if(|t| t.kind == TokenKind::LPAREN).is_some() {
            self.nest()?;
            let mut args = vec![];
            if !self.check(TokenKind::RPAREN) {
                loop {
                    if args.len() >= MAX_PARAMS {
                        return Err(self.error_at_peek(ErrorMsg::TooManyArgs(MAX_PARAMS)));
                    }
                    args.push(self.parse_expr()?);
                    if self.advance_if(|t| t.kind == TokenKind::COMMA).is_none() {
                        break;
                    }
                }
            }
            let paren = self.advance_or_err(TokenKind::RPAREN, ErrorMsg::MissingClosingParen)?;
            expr = Expr::Call {
                func: Box::new(expr),
                args,
                line: paren.line,
            };
        }

        self.depth = depth;
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, Error> {
        let Some(t) = self.stream.peek().copied() else {
            return Err(Self::eof_error(ErrorMsg::UnexpectedToken));
        };
        match t.kind {
            TokenKind::TRUE | TokenKind::FALSE | TokenKind::NUMBER | TokenKind::STRING => {
                self.advance();
                t.literal
                    .clone()
                    .map(Expr::Literal)
                    .ok_or_else(|| Self::error(t, ErrorMsg::UnexpectedToken))
            }
            TokenKind::IDENT => {
                self.advance();
                Ok(Expr::Ident(Ident::from(t)))
            }
            TokenKind::LPAREN => {
                self.advance();
                self.parse_group()
            }
            // Nothing starts with a binary operator, so the
            // left hand operand must have been left out
            kind if ast::BinOp::from_token(kind).is_some()
                || ast::LogicalOp::from_token(kind).is_some() =>
            {
                Err(Self::error(t, ErrorMsg::MissingOperand(t.lexeme.clone())))
            }
            _ => Err(Self::error(t, ErrorMsg::UnexpectedToken)),
        }
    }

    fn parse_group(&mut self) -> Result<Expr, Error> {
        let expr = self.parse_expr()?;
        self.advance_or_err(TokenKind::RPAREN, ErrorMsg::MissingClosingParen)?;
        Ok(Expr::Group(Box::new(expr)))
    }

    /// Counts one more level of nesting. Every chained operator or call
    /// also deepens the tree, so loops building one call this per link.
    fn nest(&mut self) -> Result<(), Error> {
        if self.depth >= MAX_NESTING {
            return Err(self.error_at_peek(ErrorMsg::TooDeep(MAX_NESTING)));
        }
        self.depth += 1;
        Ok(())
    }

    fn nested<T, F>(&mut self, parse: F) -> Result<T, Error>
    where
        F: FnOnce(&mut Self) -> Result<T, Error>,
    {
        let depth = self.depth;
        self.nest()?;
        let result = parse(self);
        self.depth = depth;
        result
    }

    fn advise(&mut self, advice: Advice) {
        if self.advised.insert(advice) {
            self.notes.push(advice.message().to_string());
        }
    }

    fn peek_kind(&mut self) -> TokenKind {
        self.stream.peek().map_or(TokenKind::EOF, |t| t.kind)
    }

    fn check(&mut self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn is_at_end(&mut self) -> bool {
        self.check(TokenKind::EOF)
    }

    /// Consumes the next token. The end of input marker is never consumed.
    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.stream.next_if(|t| t.kind != TokenKind::EOF)?;
        self.previous = Some(token.kind);
        Some(token)
    }

    fn advance_if<F>(&mut self, cond: F) -> Option<&'a Token>
    where
        F: FnOnce(&Token) -> bool,
    {
        if self.stream.peek().filter(|&&t| cond(t)).is_some() {
            self.advance()
        } else {
            None
        }
    }

    fn advance_or_err(&mut self, kind: TokenKind, msg: ErrorMsg) -> Result<&'a Token, Error> {
        match self.stream.peek().copied() {
            Some(t) if t.kind == kind && kind != TokenKind::EOF => {
                self.advance();
                Ok(t)
            }
            Some(t) => Err(Self::error(t, msg)),
            None => Err(Self::eof_error(msg)),
        }
    }

    /// Discards tokens until the start of the next statement: either just
    /// past a semicolon, or right before a statement keyword.
    fn sync(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if self.previous == Some(TokenKind::SEMICOLON) || self.peek_kind().starts_statement() {
                return;
            }
            self.advance();
        }
    }

    fn error_at_peek(&mut self, msg: ErrorMsg) -> Error {
        match self.stream.peek().copied() {
            Some(t) => Self::error(t, msg),
            None => Self::eof_error(msg),
        }
    }

    fn error(token: &Token, msg: ErrorMsg) -> Error {
        if token.kind == TokenKind::EOF {
            return Self::eof_error(msg);
        }
        format!(
            "Parse error at line {} near '{}': {}",
            token.line, token, msg
        )
    }

    fn eof_error(msg: ErrorMsg) -> Error {
        format!("Parse error at end of input: {}", msg)
    }
}
