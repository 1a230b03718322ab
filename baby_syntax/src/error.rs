use thiserror::Error as ThisError;

pub type Error = String;

#[derive(Debug, ThisError)]
pub enum ErrorMsg {
    // Lex errors
    #[error("unexpected character")]
    UnexpectedChar,
    #[error("unterminated string")]
    UnterminatedString,
    #[error("expected digits after the decimal point")]
    MissingFraction,
    #[error("'{0}' is not a keyword, {1}")]
    AccidentalKeyword(String, &'static str),
    // Parse errors
    #[error("unexpected token")]
    UnexpectedToken,
    #[error("expected an operand before '{0}'")]
    MissingOperand(String),
    #[error("invalid assignment target")]
    InvalidAssignment,
    #[error("expected an identifier")]
    InvalidIdent,
    #[error("expected 'in' in range clause of 'for' loop")]
    MissingIn,
    #[error("expected '..' in range clause of 'for' loop")]
    MissingRange,
    #[error("expected ':' after the middle of a ternary expression")]
    MissingColon,
    #[error("expected ';'")]
    MissingSemicolon,
    #[error("expected '('")]
    MissingOpeningParen,
    #[error("expected ')'")]
    MissingClosingParen,
    #[error("expected '{{'")]
    MissingOpeningBrace,
    #[error("expected '}}'")]
    MissingClosingBrace,
    #[error("cannot have more than {0} parameters")]
    TooManyParams(usize),
    #[error("cannot have more than {0} arguments")]
    TooManyArgs(usize),
    #[error("cannot nest more than {0} levels deep")]
    TooDeep(usize),
}
