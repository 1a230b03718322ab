use crate::{
    ast::Literal,
    error::{Error, ErrorMsg},
    token::{TextRange, Token, TokenKind},
};
use log::trace;

#[derive(Debug)]
pub struct Lexer {
    source: Vec<char>,
    offset: usize,
    line: usize,
    line_start: usize,
    start: usize,
    start_column: usize,
    current: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self::with_offset(source, 0)
    }

    /// Creates a lexer whose text ranges are shifted by `offset`. Inputs
    /// of one session use increasing offsets so that identifiers from
    /// different inputs never share a range.
    pub fn with_offset(source: &str, offset: usize) -> Self {
        Self {
            source: source.chars().collect(),
            offset,
            line: 1,
            line_start: 0,
            start: 0,
            start_column: 1,
            current: 0,
        }
    }

    /// Number of characters in the source, i.e. the offset
    /// that the next input of a session should start at.
    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    pub fn lex_all(mut self) -> Result<Vec<Token>, Vec<Error>> {
        let mut tokens: Vec<Token> = Vec::default();
        let mut errors: Vec<Error> = Vec::default();
        loop {
            match self.lex() {
                Ok(t) => {
                    let eof = t.kind == TokenKind::EOF;
                    tokens.push(t);
                    if eof {
                        break;
                    }
                }
                Err(e) => errors.push(e),
            }
        }
        if errors.is_empty() {
            Ok(tokens)
        } else {
            Err(errors)
        }
    }

    /// Lexes the whole source, dropping whitespace and comments.
    pub fn lex_all_sanitised(self) -> Result<Vec<Token>, Vec<Error>> {
        self.lex_all().map(|tokens| {
            tokens
                .into_iter()
                .filter(|t| !t.kind.is_trivia())
                .collect()
        })
    }

    pub fn lex(&mut self) -> Result<Token, Error> {
        self.start = self.current;
        self.start_column = self.current - self.line_start + 1;
        let Some(c) = self.advance() else {
            return Ok(self.make_token(TokenKind::EOF));
        };
        match c {
            '!' => Ok(self.lookahead_for_token('=', TokenKind::BANG_EQUAL, TokenKind::BANG)),
            '=' => Ok(self.lookahead_for_token('=', TokenKind::EQUAL_EQUAL, TokenKind::EQUAL)),
            '>' => Ok(self.lookahead_for_token(
                '=',
                TokenKind::GREATER_EQUAL,
                TokenKind::GREATER,
            )),
            '<' => Ok(self.lookahead_for_token('=', TokenKind::LESS_EQUAL, TokenKind::LESS)),
            '.' => Ok(self.lookahead_for_token('.', TokenKind::DOT_DOT, TokenKind::DOT)),
            '&' => self.lex_doubled('&', TokenKind::AND),
            '|' => self.lex_doubled('|', TokenKind::OR),
            '"' => self.lex_string(),
            '/' => Ok(self.lex_slash_or_comment()),
            '\n' => {
                let token = self.make_token(TokenKind::WHITESPACE);
                self.line += 1;
                self.line_start = self.current;
                Ok(token)
            }
            _ => {
                if let Some(t) = TokenKind::from_char(c) {
                    Ok(self.make_token(t))
                } else if c.is_ascii_alphabetic() || c == '_' {
                    self.lex_ident()
                } else if c.is_ascii_digit() {
                    self.lex_number()
                } else {
                    Err(self.error(ErrorMsg::UnexpectedChar))
                }
            }
        }
    }

    fn lex_ident(&mut self) -> Result<Token, Error> {
        self.advance_while(|c| c.is_ascii_alphanumeric() || c == '_');
        let lexeme = self.lexeme_from_range();
        if let Some(t) = TokenKind::from_keyword(&lexeme) {
            let token = self.make_token(t);
            return Ok(match t {
                TokenKind::TRUE => token.with_literal(Literal::Boolean(true)),
                TokenKind::FALSE => token.with_literal(Literal::Boolean(false)),
                _ => token,
            });
        }
        if let Some(hint) = TokenKind::accidental_keyword(&lexeme) {
            return Err(self.error(ErrorMsg::AccidentalKeyword(lexeme, hint)));
        }
        Ok(self.make_token(TokenKind::IDENT))
    }

    fn lex_number(&mut self) -> Result<Token, Error> {
        // Consume the integral part
        self.advance_while(|c| c.is_ascii_digit());
        // A dot followed by another dot is a range, not a fraction
        if self.peek() == Some('.') && self.peek_next() != Some('.') {
            self.advance();
            if self.advance_while(|c| c.is_ascii_digit()).is_none() {
                return Err(self.error(ErrorMsg::MissingFraction));
            }
        }
        let lexeme = self.lexeme_from_range();
        let value = lexeme
            .parse()
            .map_err(|_| self.error(ErrorMsg::UnexpectedChar))?;
        Ok(self
            .make_token(TokenKind::NUMBER)
            .with_literal(Literal::Number(value)))
    }

    fn lex_string(&mut self) -> Result<Token, Error> {
        loop {
            match self.peek() {
                Some('"') => break,
                Some('\n') | None => return Err(self.error(ErrorMsg::UnterminatedString)),
                Some(_) => {
                    self.advance();
                }
            }
        }
        // Consume the closing quote
        self.advance();
        let text = self.source[self.start + 1..self.current - 1]
            .iter()
            .collect::<String>();
        Ok(self
            .make_token(TokenKind::STRING)
            .with_literal(Literal::Str(text)))
    }

    fn lex_slash_or_comment(&mut self) -> Token {
        if self.advance_if(|c| c == '/').is_some() {
            self.advance_while(|c| c != '\n');
            self.make_token(TokenKind::COMMENT)
        } else {
            self.make_token(TokenKind::SLASH)
        }
    }

    fn lex_doubled(&mut self, second: char, kind: TokenKind) -> Result<Token, Error> {
        if self.advance_if(|c| c == second).is_some() {
            Ok(self.make_token(kind))
        } else {
            Err(self.error(ErrorMsg::UnexpectedChar))
        }
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        let token = Token::new(
            kind,
            self.text_range(),
            self.line,
            self.start_column,
            self.lexeme_from_range(),
        );
        trace!("Lexed {kind:?} {token}");
        token
    }

    fn lexeme_from_range(&self) -> String {
        self.source[self.start..self.current].iter().collect()
    }

    fn text_range(&self) -> TextRange {
        let mut range = TextRange {
            start: self.start,
            end: self.current,
        };
        range += TextRange {
            start: self.offset,
            end: self.offset,
        };
        range
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.current).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.source.get(self.current + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.current += 1;
        Some(c)
    }

    fn advance_if<F>(&mut self, cond: F) -> Option<char>
    where
        F: FnOnce(char) -> bool,
    {
        if self.peek().filter(|&c| cond(c)).is_some() {
            self.advance()
        } else {
            None
        }
    }

    fn advance_while<F>(&mut self, cond: F) -> Option<usize>
    where
        F: Fn(char) -> bool,
    {
        let mut count: usize = 0;
        while self.peek().filter(|&c| cond(c)).is_some() {
            count += 1;
            self.advance();
        }
        count.ne(&0).then_some(count)
    }

    fn lookahead_for_token(
        &mut self,
        match_char: char,
        if_match: TokenKind,
        no_match: TokenKind,
    ) -> Token {
        if self.advance_if(|c| c == match_char).is_some() {
            self.make_token(if_match)
        } else {
            self.make_token(no_match)
        }
    }

    fn error(&self, msg: ErrorMsg) -> Error {
        format!(
            "Scan error at line {}, column {} near '{}': {}",
            self.line,
            self.start_column,
            self.lexeme_from_range(),
            msg
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input)
            .lex_all_sanitised()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn operators() {
        assert_eq!(
            kinds("! != = == > >= < <= && || ? :"),
            vec![
                TokenKind::BANG,
                TokenKind::BANG_EQUAL,
                TokenKind::EQUAL,
                TokenKind::EQUAL_EQUAL,
                TokenKind::GREATER,
                TokenKind::GREATER_EQUAL,
                TokenKind::LESS,
                TokenKind::LESS_EQUAL,
                TokenKind::AND,
                TokenKind::OR,
                TokenKind::QUESTION,
                TokenKind::COLON,
                TokenKind::EOF,
            ]
        );
    }

    #[test]
    fn range_is_not_a_fraction() {
        assert_eq!(
            kinds("0..=5"),
            vec![
                TokenKind::NUMBER,
                TokenKind::DOT_DOT,
                TokenKind::EQUAL,
                TokenKind::NUMBER,
                TokenKind::EOF,
            ]
        );
        let tokens = Lexer::new("2.5").lex_all_sanitised().unwrap();
        assert_eq!(tokens[0].literal, Some(Literal::Number(2.5)));
    }

    #[test]
    fn string_literal() {
        let tokens = Lexer::new("\"hello world\"").lex_all_sanitised().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::STRING);
        assert_eq!(tokens[0].lexeme, "\"hello world\"");
        assert_eq!(tokens[0].literal, Some(Literal::Str("hello world".to_owned())));
    }

    #[test]
    fn keywords_and_comments() {
        assert_eq!(
            kinds("let fn_name = nil; // trailing comment\nprint fn_name;"),
            vec![
                TokenKind::LET,
                TokenKind::IDENT,
                TokenKind::EQUAL,
                TokenKind::IDENT,
                TokenKind::SEMICOLON,
                TokenKind::PRINT,
                TokenKind::IDENT,
                TokenKind::SEMICOLON,
                TokenKind::EOF,
            ]
        );
    }

    #[test]
    fn lines_and_columns() {
        let tokens = Lexer::new("let a;\n  a = 1;").lex_all_sanitised().unwrap();
        let a = &tokens[3];
        assert_eq!(a.lexeme, "a");
        assert_eq!((a.line, a.column), (2, 3));
    }

    #[test]
    fn offset_shifts_ranges() {
        let tokens = Lexer::with_offset("a", 10).lex_all_sanitised().unwrap();
        assert_eq!(tokens[0].range, TextRange { start: 10, end: 11 });
    }

    #[test]
    fn errors_accumulate() {
        let errors = Lexer::new("let a = @;\nlet b = #;").lex_all().unwrap_err();
        assert_eq!(
            errors,
            vec![
                "Scan error at line 1, column 9 near '@': unexpected character".to_owned(),
                "Scan error at line 2, column 9 near '#': unexpected character".to_owned(),
            ]
        );
    }

    #[test]
    fn accidental_keywords() {
        let errors = Lexer::new("let one = null;").lex_all().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Scan error at line 1, column 11 near 'null'"));
        assert!(errors[0].contains("there is no 'null'"));

        let errors = Lexer::new("var a = 1;").lex_all().unwrap_err();
        assert!(errors[0].contains("did you mean 'let'?"));
    }

    #[test]
    fn unterminated_string() {
        let errors = Lexer::new("print \"oops;").lex_all().unwrap_err();
        assert_eq!(
            errors,
            vec!["Scan error at line 1, column 7 near '\"oops;': unterminated string".to_owned()]
        );
    }
}
