use std::{fmt::Display, ops::AddAssign};

use crate::ast::Literal;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl AddAssign for TextRange {
    fn add_assign(&mut self, rhs: Self) {
        self.start += rhs.start;
        self.end += rhs.end;
    }
}

/// The enum variants are in SCREAMING_SNAKE_CASE as they technically
/// represent constants, but Rust does not allow const enum variants.
#[allow(nonstandard_style)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TokenKind {
    // Symbols
    LPAREN,
    RPAREN,
    LBRACE,
    RBRACE,
    COMMA,
    DOT,
    DOT_DOT,
    SEMICOLON,
    QUESTION,
    COLON,
    // Arithmetic
    BANG,
    MINUS,
    PLUS,
    SLASH,
    STAR,
    // Comparisons
    BANG_EQUAL,
    EQUAL_EQUAL,
    GREATER,
    GREATER_EQUAL,
    LESS,
    LESS_EQUAL,
    // Literals
    IDENT,
    STRING,
    NUMBER,
    // Keywords
    AND,
    CLASS,
    ELSE,
    FALSE,
    FN,
    FOR,
    IF,
    IN,
    LET,
    OR,
    PRINT,
    RETURN,
    TRUE,
    WHILE,
    // Miscellaneous tokens
    EQUAL,
    COMMENT,
    WHITESPACE,
    EOF,
}

impl TokenKind {
    pub fn from_char(c: char) -> Option<Self> {
        let token = match c {
            '(' => Self::LPAREN,
            ')' => Self::RPAREN,
            '{' => Self::LBRACE,
            '}' => Self::RBRACE,
            ',' => Self::COMMA,
            '-' => Self::MINUS,
            '+' => Self::PLUS,
            ';' => Self::SEMICOLON,
            '*' => Self::STAR,
            '?' => Self::QUESTION,
            ':' => Self::COLON,
            ' ' | '\t' | '\r' | '\n' => Self::WHITESPACE,
            _ => return None,
        };
        Some(token)
    }

    pub fn from_keyword(kw: &str) -> Option<Self> {
        let token = match kw {
            "and" => Self::AND,
            "class" => Self::CLASS,
            "else" => Self::ELSE,
            "false" => Self::FALSE,
            "fn" => Self::FN,
            "for" => Self::FOR,
            "if" => Self::IF,
            "in" => Self::IN,
            "let" => Self::LET,
            "or" => Self::OR,
            "print" => Self::PRINT,
            "return" => Self::RETURN,
            "true" => Self::TRUE,
            "while" => Self::WHILE,
            _ => return None,
        };
        Some(token)
    }

    /// Words borrowed from other languages that are deliberately not part
    /// of Baby. They are rejected with a hint instead of silently becoming
    /// identifiers.
    pub fn accidental_keyword(word: &str) -> Option<&'static str> {
        let hint = match word {
            "null" => {
                "there is no 'null' in Baby, initialise the variable with a sensible default instead"
            }
            "var" | "const" => "did you mean 'let'? e.g. let a = 1;",
            "function" => "did you mean 'fn'? e.g. fn add(a, b) { return a + b; }",
            _ => return None,
        };
        Some(hint)
    }

    /// Keywords that start a statement. The parser resynchronises
    /// on these after an error.
    pub fn starts_statement(&self) -> bool {
        matches!(
            self,
            Self::CLASS
                | Self::FN
                | Self::LET
                | Self::FOR
                | Self::IF
                | Self::WHILE
                | Self::PRINT
                | Self::RETURN
        )
    }

    pub fn is_trivia(&self) -> bool {
        matches!(self, Self::WHITESPACE | Self::COMMENT)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub range: TextRange,
    pub line: usize,
    pub column: usize,
    pub lexeme: String,
    pub literal: Option<Literal>,
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.lexeme)
    }
}

impl Token {
    pub fn new(
        kind: TokenKind,
        range: TextRange,
        line: usize,
        column: usize,
        lexeme: String,
    ) -> Self {
        Self {
            kind,
            range,
            line,
            column,
            lexeme,
            literal: None,
        }
    }

    pub fn with_literal(mut self, literal: Literal) -> Self {
        self.literal = Some(literal);
        self
    }
}
