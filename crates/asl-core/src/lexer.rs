//! Pull-based tokenizer.
//!
//! [`Lexer`] walks the source once and yields [`Token`]s that borrow their
//! text from the source buffer. The stream always ends with a single
//! [`TokenKind::Eof`] token. Lexical problems do not stop the stream: they
//! surface as [`TokenKind::Error`] tokens and lexing resumes after them, so the
//! parser can report several problems in one pass.

use std::fmt;

use thiserror::Error;

/// 1-based line and column (in characters) of a token or expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Reason attached to a [`TokenKind::Error`] token.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexError {
    #[error("Unknown symbol")]
    UnknownSymbol,
    #[error("Unterminated string")]
    UnterminatedString,
    #[error("Unterminated comment")]
    UnterminatedComment,
    #[error("Invalid variable name")]
    EmptyVariable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Number,
    String,
    Identifier,
    Variable,
    True,
    False,
    Null,
    If,
    Else,
    While,
    Plus,
    Minus,
    Star,
    Slash,
    Assign,
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    And,
    Or,
    Not,
    Colon,
    Dot,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Newline,
    Semicolon,
    Eof,
    Error(LexError),
}

impl TokenKind {
    /// Human-readable name used in diagnostics and the token dump.
    pub fn describe(&self) -> &'static str {
        match self {
            TokenKind::Number => "number",
            TokenKind::String => "string",
            TokenKind::Identifier => "identifier",
            TokenKind::Variable => "variable",
            TokenKind::True | TokenKind::False => "boolean",
            TokenKind::Null => "null",
            TokenKind::If | TokenKind::Else | TokenKind::While => "keyword",
            TokenKind::Newline => "end of line",
            TokenKind::Semicolon => "`;`",
            TokenKind::Eof => "end of input",
            TokenKind::Error(_) => "invalid token",
            _ => "symbol",
        }
    }

    pub fn is_terminator(&self) -> bool {
        matches!(self, TokenKind::Newline | TokenKind::Semicolon)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Raw source text. For strings this is the body between the quotes,
    /// still escaped.
    pub text: &'a str,
    pub position: Position,
}

impl<'a> Token<'a> {
    pub fn eof(position: Position) -> Self {
        Token {
            kind: TokenKind::Eof,
            text: "",
            position,
        }
    }
}

const SYMBOLS: &str = "+-/*:.,()[]=&|!{}\n;<>";

fn is_identifier_char(c: char) -> bool {
    !(c.is_whitespace() || SYMBOLS.contains(c) || c == '"' || c == '$')
}

#[derive(Debug, Clone, Copy)]
enum State {
    Initial,
    StringBody { start: usize, position: Position },
    CommentBody { start: usize, position: Position },
    Done,
}

pub struct Lexer<'a> {
    source: &'a str,
    offset: usize,
    line: usize,
    column: usize,
    state: State,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            offset: 0,
            line: 1,
            column: 1,
            state: State::Initial,
        }
    }

    fn current_position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn peek_char(&self) -> Option<char> {
        self.source[self.offset..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn bump_while(&mut self, predicate: impl Fn(char) -> bool) {
        while self.peek_char().is_some_and(&predicate) {
            self.bump();
        }
    }

    fn token(&self, kind: TokenKind, start: usize, position: Position) -> Token<'a> {
        Token {
            kind,
            text: &self.source[start..self.offset],
            position,
        }
    }

    fn lex_initial(&mut self) -> Option<Token<'a>> {
        self.bump_while(|c| c == ' ' || c == '\t' || c == '\r');

        let start = self.offset;
        let position = self.current_position();
        let Some(c) = self.peek_char() else {
            self.state = State::Done;
            return Some(Token::eof(position));
        };

        if SYMBOLS.contains(c) {
            return self.lex_symbol(c, start, position);
        }

        match c {
            '0'..='9' => {
                self.bump_while(|c| c.is_ascii_digit() || c == '.');
                Some(self.token(TokenKind::Number, start, position))
            }
            '"' => {
                self.bump();
                self.state = State::StringBody {
                    start: self.offset,
                    position,
                };
                None
            }
            '$' => {
                self.bump();
                self.bump_while(is_identifier_char);
                let kind = if self.offset - start == 1 {
                    TokenKind::Error(LexError::EmptyVariable)
                } else {
                    TokenKind::Variable
                };
                Some(self.token(kind, start, position))
            }
            _ => {
                self.bump_while(is_identifier_char);
                let token = self.token(TokenKind::Identifier, start, position);
                let kind = match token.text {
                    "true" => TokenKind::True,
                    "false" => TokenKind::False,
                    "null" => TokenKind::Null,
                    "if" => TokenKind::If,
                    "else" => TokenKind::Else,
                    "while" => TokenKind::While,
                    _ => TokenKind::Identifier,
                };
                Some(Token { kind, ..token })
            }
        }
    }

    fn lex_symbol(&mut self, first: char, start: usize, position: Position) -> Option<Token<'a>> {
        self.bump();
        let second = self.peek_char();
        let kind = match (first, second) {
            ('/', Some('*')) => {
                self.bump();
                self.state = State::CommentBody { start, position };
                return None;
            }
            ('=', Some('=')) => TokenKind::Equal,
            ('!', Some('=')) => TokenKind::NotEqual,
            ('<', Some('=')) => TokenKind::LessEqual,
            ('>', Some('=')) => TokenKind::GreaterEqual,
            ('&', Some('&')) => TokenKind::And,
            ('|', Some('|')) => TokenKind::Or,
            _ => {
                let kind = match first {
                    '+' => TokenKind::Plus,
                    '-' => TokenKind::Minus,
                    '*' => TokenKind::Star,
                    '/' => TokenKind::Slash,
                    ':' => TokenKind::Colon,
                    '.' => TokenKind::Dot,
                    ',' => TokenKind::Comma,
                    '(' => TokenKind::LParen,
                    ')' => TokenKind::RParen,
                    '[' => TokenKind::LBracket,
                    ']' => TokenKind::RBracket,
                    '{' => TokenKind::LBrace,
                    '}' => TokenKind::RBrace,
                    '=' => TokenKind::Assign,
                    '!' => TokenKind::Not,
                    '<' => TokenKind::Less,
                    '>' => TokenKind::Greater,
                    '\n' => TokenKind::Newline,
                    ';' => TokenKind::Semicolon,
                    _ => TokenKind::Error(LexError::UnknownSymbol),
                };
                return Some(self.token(kind, start, position));
            }
        };
        self.bump();
        Some(self.token(kind, start, position))
    }

    fn lex_string(&mut self, start: usize, position: Position) -> Token<'a> {
        loop {
            match self.bump() {
                None => {
                    self.state = State::Initial;
                    return self.token(TokenKind::Error(LexError::UnterminatedString), start, position);
                }
                Some('\\') => {
                    self.bump();
                }
                Some('"') => {
                    self.state = State::Initial;
                    return Token {
                        kind: TokenKind::String,
                        text: &self.source[start..self.offset - 1],
                        position,
                    };
                }
                Some(_) => {}
            }
        }
    }

    fn lex_comment(&mut self, start: usize, position: Position) -> Option<Token<'a>> {
        loop {
            match self.bump() {
                None => {
                    self.state = State::Initial;
                    return Some(self.token(TokenKind::Error(LexError::UnterminatedComment), start, position));
                }
                Some('*') if self.peek_char() == Some('/') => {
                    self.bump();
                    self.state = State::Initial;
                    return None;
                }
                Some(_) => {}
            }
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        loop {
            let token = match self.state {
                State::Done => return None,
                State::Initial => self.lex_initial(),
                State::StringBody { start, position } => Some(self.lex_string(start, position)),
                State::CommentBody { start, position } => self.lex_comment(start, position),
            };
            if token.is_some() {
                return token;
            }
        }
    }
}

/// Collects the whole token stream, including the trailing `Eof`.
pub fn tokenize(source: &str) -> Vec<Token<'_>> {
    Lexer::new(source).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_tokenize_assignment() {
        let tokens = tokenize("a: 100 + 33");
        assert_eq!(tokens.len(), 6);
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].text, "a");
        assert_eq!(tokens[1].kind, TokenKind::Colon);
        assert_eq!(tokens[2].kind, TokenKind::Number);
        assert_eq!(tokens[2].text, "100");
        assert_eq!(tokens[3].kind, TokenKind::Plus);
        assert_eq!(tokens[4].text, "33");
        assert_eq!(tokens[5].kind, TokenKind::Eof);
    }

    #[test]
    fn test_tokenize_maximal_munch() {
        assert_eq!(
            kinds("== != <= >= && || = ! < >"),
            vec![
                TokenKind::Equal,
                TokenKind::NotEqual,
                TokenKind::LessEqual,
                TokenKind::GreaterEqual,
                TokenKind::And,
                TokenKind::Or,
                TokenKind::Assign,
                TokenKind::Not,
                TokenKind::Less,
                TokenKind::Greater,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_keywords() {
        assert_eq!(
            kinds("if else while true false null iffy"),
            vec![
                TokenKind::If,
                TokenKind::Else,
                TokenKind::While,
                TokenKind::True,
                TokenKind::False,
                TokenKind::Null,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_variable_keeps_sigil() {
        let tokens = tokenize("$count.set(1)");
        assert_eq!(tokens[0].kind, TokenKind::Variable);
        assert_eq!(tokens[0].text, "$count");
        assert_eq!(tokens[1].kind, TokenKind::Dot);
        assert_eq!(tokens[2].text, "set");
    }

    #[test]
    fn test_tokenize_empty_variable() {
        let tokens = tokenize("$ + 1");
        assert_eq!(tokens[0].kind, TokenKind::Error(LexError::EmptyVariable));
        assert_eq!(tokens[1].kind, TokenKind::Plus);
    }

    #[test]
    fn test_tokenize_string_keeps_raw_body() {
        let tokens = tokenize(r#"x: "say \"hi\"\n""#);
        assert_eq!(tokens[2].kind, TokenKind::String);
        assert_eq!(tokens[2].text, r#"say \"hi\"\n"#);
        assert_eq!(tokens[2].position, Position::new(1, 4));
        assert_eq!(tokens[3].kind, TokenKind::Eof);
    }

    #[test]
    fn test_tokenize_unterminated_string() {
        let tokens = tokenize("x: \"open");
        assert_eq!(tokens[2].kind, TokenKind::Error(LexError::UnterminatedString));
        assert_eq!(tokens[3].kind, TokenKind::Eof);
    }

    #[test]
    fn test_tokenize_skips_comments() {
        assert_eq!(
            kinds("a /* note\n spanning lines */ : 1"),
            vec![TokenKind::Identifier, TokenKind::Colon, TokenKind::Number, TokenKind::Eof]
        );
    }

    #[test]
    fn test_tokenize_unterminated_comment() {
        let tokens = tokenize("a: 1 /* never closed");
        assert_eq!(tokens[3].kind, TokenKind::Error(LexError::UnterminatedComment));
        assert_eq!(tokens[4].kind, TokenKind::Eof);
    }

    #[test]
    fn test_tokenize_unknown_symbol_continues() {
        assert_eq!(
            kinds("a & b"),
            vec![
                TokenKind::Identifier,
                TokenKind::Error(LexError::UnknownSymbol),
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_positions() {
        let tokens = tokenize("a: 1\n  $b: 2;");
        assert_eq!(tokens[3].kind, TokenKind::Newline);
        assert_eq!(tokens[3].position, Position::new(1, 5));
        assert_eq!(tokens[4].text, "$b");
        assert_eq!(tokens[4].position, Position::new(2, 3));
        assert_eq!(tokens[7].kind, TokenKind::Semicolon);
    }

    #[test]
    fn test_tokenize_number_with_dots() {
        let tokens = tokenize("1.2.3");
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[0].text, "1.2.3");
    }

    #[test]
    fn test_tokenize_empty_source() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_lexer_is_finite() {
        let mut lexer = Lexer::new("a");
        assert!(lexer.next().is_some());
        assert!(lexer.next().is_some());
        assert!(lexer.next().is_none());
        assert!(lexer.next().is_none());
    }
}
