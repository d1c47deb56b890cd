//! Recursive-descent parser.
//!
//! Operators bind, from loosest to tightest: `||`, `&&`, `== !=`,
//! `< <= > >=`, `+ -`, `* /`, then the unary operators and postfix
//! property access / calls. All binary operators are left-associative.
//!
//! Errors do not stop the parse: each one is recorded, the parser skips to the
//! next command terminator and carries on, and [`parse`] returns every error
//! it found.

use std::collections::VecDeque;

use crate::ast::{Argument, BinaryOperator, Command, Expression, ExpressionKind, Script, UnaryOperator};
use crate::error::SyntaxError;
use crate::lexer::{Lexer, Position, Token, TokenKind};

const PRECEDENCE: &[&[(TokenKind, BinaryOperator)]] = &[
    &[(TokenKind::Or, BinaryOperator::Or)],
    &[(TokenKind::And, BinaryOperator::And)],
    &[
        (TokenKind::Equal, BinaryOperator::Equal),
        (TokenKind::NotEqual, BinaryOperator::NotEqual),
    ],
    &[
        (TokenKind::Less, BinaryOperator::Less),
        (TokenKind::LessEqual, BinaryOperator::LessEqual),
        (TokenKind::Greater, BinaryOperator::Greater),
        (TokenKind::GreaterEqual, BinaryOperator::GreaterEqual),
    ],
    &[
        (TokenKind::Plus, BinaryOperator::Add),
        (TokenKind::Minus, BinaryOperator::Subtract),
    ],
    &[
        (TokenKind::Star, BinaryOperator::Multiply),
        (TokenKind::Slash, BinaryOperator::Divide),
    ],
];

/// Parses a whole script.
pub fn parse(source: &str) -> Result<Script, Vec<SyntaxError>> {
    Parser::new(source).parse_script()
}

struct Parser<'a> {
    tokens: Lexer<'a>,
    lookahead: VecDeque<Token<'a>>,
    end: Position,
    errors: Vec<SyntaxError>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            tokens: Lexer::new(source),
            lookahead: VecDeque::new(),
            end: Position::default(),
            errors: Vec::new(),
        }
    }

    fn fill(&mut self, n: usize) {
        while self.lookahead.len() <= n {
            let token = match self.tokens.next() {
                Some(token) => {
                    if token.kind == TokenKind::Eof {
                        self.end = token.position;
                    }
                    token
                }
                None => Token::eof(self.end),
            };
            self.lookahead.push_back(token);
        }
    }

    fn peek_nth(&mut self, n: usize) -> Token<'a> {
        self.fill(n);
        self.lookahead.get(n).copied().unwrap_or(Token::eof(self.end))
    }

    fn peek(&mut self) -> Token<'a> {
        self.peek_nth(0)
    }

    fn check(&mut self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn advance(&mut self) -> Token<'a> {
        self.fill(0);
        self.lookahead.pop_front().unwrap_or(Token::eof(self.end))
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token<'a>, SyntaxError> {
        let token = self.peek();
        if token.kind == kind {
            Ok(self.advance())
        } else {
            Err(self.unexpected(token, &format!("Expected {}", what)))
        }
    }

    /// Error for `token`; lexical error tokens report their own reason.
    fn unexpected(&self, token: Token<'a>, message: &str) -> SyntaxError {
        match token.kind {
            TokenKind::Error(reason) => SyntaxError::new(reason.to_string(), token.position, token.text),
            _ => SyntaxError::new(
                format!("{}, found {}", message, token.kind.describe()),
                token.position,
                token.text,
            ),
        }
    }

    fn skip_newlines(&mut self) {
        while self.eat(TokenKind::Newline) {}
    }

    fn skip_terminators(&mut self) {
        while self.peek().kind.is_terminator() {
            self.advance();
        }
    }

    /// Skips to just past the next terminator, or to the next unmatched `}` /
    /// end of input. Braces opened while skipping are balanced.
    fn synchronize(&mut self) {
        let mut depth = 0usize;
        loop {
            let token = self.peek();
            match token.kind {
                TokenKind::Eof => return,
                TokenKind::RBrace if depth == 0 => return,
                TokenKind::RBrace => depth -= 1,
                TokenKind::LBrace => depth += 1,
                TokenKind::Newline | TokenKind::Semicolon if depth == 0 => {
                    self.advance();
                    return;
                }
                _ => {}
            }
            self.advance();
        }
    }

    fn parse_script(mut self) -> Result<Script, Vec<SyntaxError>> {
        let mut commands = Vec::new();
        loop {
            self.skip_terminators();
            let token = self.peek();
            match token.kind {
                TokenKind::Eof => break,
                TokenKind::RBrace => {
                    self.advance();
                    let error = SyntaxError::new("Unexpected `}`", token.position, token.text);
                    self.errors.push(error);
                }
                _ => match self.parse_command() {
                    Ok(command) => commands.push(command),
                    Err(error) => {
                        self.errors.push(error);
                        self.synchronize();
                    }
                },
            }
        }

        if self.errors.is_empty() {
            Ok(Script { commands })
        } else {
            Err(self.errors)
        }
    }

    fn parse_command(&mut self) -> Result<Command, SyntaxError> {
        match self.peek().kind {
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            _ => {
                let command = self.parse_simple_command()?;
                let token = self.peek();
                match token.kind {
                    TokenKind::Newline | TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof => Ok(command),
                    _ => Err(self.unexpected(token, "Expected end of command")),
                }
            }
        }
    }

    fn parse_simple_command(&mut self) -> Result<Command, SyntaxError> {
        let first = self.peek();
        let second = self.peek_nth(1);
        let is_assignment = matches!(first.kind, TokenKind::Identifier | TokenKind::Variable)
            && matches!(second.kind, TokenKind::Colon | TokenKind::Assign);

        if !is_assignment {
            return Ok(Command::Evaluate(self.parse_expression()?));
        }

        self.advance();
        self.advance();
        let expression = self.parse_expression()?;
        let name = first.text.to_string();
        Ok(match first.kind {
            TokenKind::Variable => Command::AssignVariable { name, expression },
            _ => Command::AssignOutput { name, expression },
        })
    }

    fn parse_if(&mut self) -> Result<Command, SyntaxError> {
        self.expect(TokenKind::If, "`if`")?;
        let condition = self.parse_expression()?;
        let then_commands = self.parse_block()?;

        let mut offset = 0;
        while self.peek_nth(offset).kind == TokenKind::Newline {
            offset += 1;
        }
        let else_commands = if self.peek_nth(offset).kind == TokenKind::Else {
            self.skip_newlines();
            self.advance();
            if self.check(TokenKind::If) {
                vec![self.parse_if()?]
            } else {
                self.parse_block()?
            }
        } else {
            Vec::new()
        };

        Ok(Command::IfThenElse {
            condition,
            then_commands,
            else_commands,
        })
    }

    fn parse_while(&mut self) -> Result<Command, SyntaxError> {
        self.expect(TokenKind::While, "`while`")?;
        let condition = self.parse_expression()?;
        let commands = self.parse_block()?;
        Ok(Command::While { condition, commands })
    }

    fn parse_block(&mut self) -> Result<Vec<Command>, SyntaxError> {
        self.skip_newlines();
        self.expect(TokenKind::LBrace, "`{`")?;
        let mut commands = Vec::new();
        loop {
            self.skip_terminators();
            let token = self.peek();
            match token.kind {
                TokenKind::RBrace => {
                    self.advance();
                    return Ok(commands);
                }
                TokenKind::Eof => return Err(self.unexpected(token, "Expected `}`")),
                _ => match self.parse_command() {
                    Ok(command) => commands.push(command),
                    Err(error) => {
                        self.errors.push(error);
                        self.synchronize();
                    }
                },
            }
        }
    }

    fn parse_expression(&mut self) -> Result<Expression, SyntaxError> {
        self.parse_binary(0)
    }

    fn parse_binary(&mut self, level: usize) -> Result<Expression, SyntaxError> {
        let Some(operators) = PRECEDENCE.get(level) else {
            return self.parse_unary();
        };

        let mut left = self.parse_binary(level + 1)?;
        loop {
            let kind = self.peek().kind;
            let Some(&(_, operator)) = operators.iter().find(|(token, _)| *token == kind) else {
                break;
            };
            self.advance();
            let right = self.parse_binary(level + 1)?;
            let position = left.position;
            left = Expression::new(
                ExpressionKind::Binary {
                    operator,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                position,
            );
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, SyntaxError> {
        let token = self.peek();
        let operator = match token.kind {
            TokenKind::Minus => UnaryOperator::Negate,
            TokenKind::Plus => UnaryOperator::Plus,
            TokenKind::Not => UnaryOperator::Not,
            _ => return self.parse_postfix(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        Ok(Expression::new(
            ExpressionKind::Unary {
                operator,
                operand: Box::new(operand),
            },
            token.position,
        ))
    }

    fn parse_postfix(&mut self) -> Result<Expression, SyntaxError> {
        let mut expression = self.parse_primary()?;
        loop {
            let position = expression.position;
            if self.eat(TokenKind::Dot) {
                let name = self.expect(TokenKind::Identifier, "a property name")?;
                expression = Expression::new(
                    ExpressionKind::Property {
                        target: Box::new(expression),
                        name: name.text.to_string(),
                    },
                    position,
                );
            } else if self.eat(TokenKind::LParen) {
                let arguments = self.parse_arguments()?;
                expression = Expression::new(
                    ExpressionKind::Call {
                        target: Box::new(expression),
                        arguments,
                    },
                    position,
                );
            } else {
                return Ok(expression);
            }
        }
    }

    fn parse_arguments(&mut self) -> Result<Vec<Argument>, SyntaxError> {
        let mut arguments: Vec<Argument> = Vec::new();
        self.skip_newlines();
        if self.eat(TokenKind::RParen) {
            return Ok(arguments);
        }
        loop {
            let first = self.peek();
            let name = if first.kind == TokenKind::Identifier && self.peek_nth(1).kind == TokenKind::Colon {
                self.advance();
                self.advance();
                if arguments.iter().any(|a| a.name.as_deref() == Some(first.text)) {
                    return Err(SyntaxError::new("Duplicate argument", first.position, first.text));
                }
                Some(first.text.to_string())
            } else {
                None
            };
            let value = self.parse_expression()?;
            arguments.push(Argument { name, value });

            self.skip_newlines();
            if self.eat(TokenKind::Comma) {
                self.skip_newlines();
                continue;
            }
            self.expect(TokenKind::RParen, "`,` or `)`")?;
            return Ok(arguments);
        }
    }

    fn parse_primary(&mut self) -> Result<Expression, SyntaxError> {
        let token = self.peek();
        let kind = match token.kind {
            TokenKind::Number => {
                self.advance();
                let value = token
                    .text
                    .parse::<f64>()
                    .map_err(|_| SyntaxError::new("Invalid number", token.position, token.text))?;
                ExpressionKind::Number(value)
            }
            TokenKind::String => {
                self.advance();
                ExpressionKind::String(unescape(token.text))
            }
            TokenKind::True => {
                self.advance();
                ExpressionKind::Boolean(true)
            }
            TokenKind::False => {
                self.advance();
                ExpressionKind::Boolean(false)
            }
            TokenKind::Null => {
                self.advance();
                ExpressionKind::Null
            }
            TokenKind::Variable => {
                self.advance();
                ExpressionKind::Variable(token.text.to_string())
            }
            TokenKind::Identifier if token.text == "storage" => {
                self.advance();
                ExpressionKind::Storage
            }
            TokenKind::Identifier => {
                self.advance();
                ExpressionKind::Property {
                    target: Box::new(Expression::new(ExpressionKind::Global, token.position)),
                    name: token.text.to_string(),
                }
            }
            TokenKind::LParen => {
                self.advance();
                self.skip_newlines();
                let inner = self.parse_expression()?;
                self.skip_newlines();
                self.expect(TokenKind::RParen, "`)`")?;
                return Ok(Expression::new(inner.kind, token.position));
            }
            TokenKind::LBracket => {
                self.advance();
                ExpressionKind::Array(self.parse_array()?)
            }
            TokenKind::LBrace => {
                self.advance();
                ExpressionKind::Map(self.parse_map()?)
            }
            _ => return Err(self.unexpected(token, "Expected an expression")),
        };
        Ok(Expression::new(kind, token.position))
    }

    fn parse_array(&mut self) -> Result<Vec<Expression>, SyntaxError> {
        let mut items = Vec::new();
        self.skip_newlines();
        if self.eat(TokenKind::RBracket) {
            return Ok(items);
        }
        loop {
            items.push(self.parse_expression()?);
            self.skip_newlines();
            if self.eat(TokenKind::Comma) {
                self.skip_newlines();
                continue;
            }
            self.expect(TokenKind::RBracket, "`,` or `]`")?;
            return Ok(items);
        }
    }

    fn parse_map(&mut self) -> Result<Vec<(String, Expression)>, SyntaxError> {
        let mut entries = Vec::new();
        loop {
            self.skip_newlines();
            if self.eat(TokenKind::RBrace) {
                return Ok(entries);
            }
            let token = self.peek();
            let key = match token.kind {
                TokenKind::Identifier => token.text.to_string(),
                TokenKind::String => unescape(token.text),
                _ => return Err(self.unexpected(token, "Expected a map key")),
            };
            self.advance();
            self.expect(TokenKind::Colon, "`:`")?;
            self.skip_newlines();
            let value = self.parse_expression()?;
            entries.push((key, value));
            self.skip_newlines();
            self.eat(TokenKind::Comma);
        }
    }
}

/// `\n`, `\t` and `\r` become control characters; any other escaped
/// character stands for itself.
fn unescape(raw: &str) -> String {
    let mut result = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some(other) => result.push(other),
            None => {}
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> Script {
        match parse(source) {
            Ok(script) => script,
            Err(errors) => panic!("unexpected syntax errors: {:?}", errors),
        }
    }

    fn output_expression(command: &Command) -> &Expression {
        match command {
            Command::AssignOutput { expression, .. } => expression,
            other => panic!("Expected output assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_output_and_variable_assignment() {
        let script = parse_ok("a: 1\n$b = 2");
        assert_eq!(script.commands.len(), 2);
        match &script.commands[0] {
            Command::AssignOutput { name, .. } => assert_eq!(name, "a"),
            _ => panic!("Expected AssignOutput"),
        }
        match &script.commands[1] {
            Command::AssignVariable { name, .. } => assert_eq!(name, "$b"),
            _ => panic!("Expected AssignVariable"),
        }
    }

    #[test]
    fn test_parse_precedence() {
        let script = parse_ok("a: 1 + 2 * 3");
        match &output_expression(&script.commands[0]).kind {
            ExpressionKind::Binary { operator, right, .. } => {
                assert_eq!(*operator, BinaryOperator::Add);
                match &right.kind {
                    ExpressionKind::Binary { operator, .. } => assert_eq!(*operator, BinaryOperator::Multiply),
                    _ => panic!("Expected multiplication on the right"),
                }
            }
            _ => panic!("Expected Binary"),
        }
    }

    #[test]
    fn test_parse_left_associative() {
        let script = parse_ok("a: 10 - 2 - 3");
        match &output_expression(&script.commands[0]).kind {
            ExpressionKind::Binary { left, right, .. } => {
                assert!(matches!(left.kind, ExpressionKind::Binary { .. }));
                assert_eq!(right.kind, ExpressionKind::Number(3.0));
            }
            _ => panic!("Expected Binary"),
        }
    }

    #[test]
    fn test_parse_logical_binds_loosest() {
        let script = parse_ok("a: 1 < 2 && 3 == 3 || false");
        match &output_expression(&script.commands[0]).kind {
            ExpressionKind::Binary { operator, left, .. } => {
                assert_eq!(*operator, BinaryOperator::Or);
                assert!(matches!(
                    left.kind,
                    ExpressionKind::Binary {
                        operator: BinaryOperator::And,
                        ..
                    }
                ));
            }
            _ => panic!("Expected Binary"),
        }
    }

    #[test]
    fn test_parse_identifier_is_global_property() {
        let script = parse_ok("a: now()");
        match &output_expression(&script.commands[0]).kind {
            ExpressionKind::Call { target, arguments } => {
                assert!(arguments.is_empty());
                match &target.kind {
                    ExpressionKind::Property { target, name } => {
                        assert_eq!(name, "now");
                        assert_eq!(target.kind, ExpressionKind::Global);
                    }
                    _ => panic!("Expected Property"),
                }
            }
            _ => panic!("Expected Call"),
        }
    }

    #[test]
    fn test_parse_storage_leaf() {
        let script = parse_ok("storage.set(key: \"k\", value: {a: 1})");
        match &script.commands[0] {
            Command::Evaluate(expression) => match &expression.kind {
                ExpressionKind::Call { target, arguments } => {
                    assert_eq!(arguments.len(), 2);
                    assert_eq!(arguments[0].name.as_deref(), Some("key"));
                    match &target.kind {
                        ExpressionKind::Property { target, .. } => assert_eq!(target.kind, ExpressionKind::Storage),
                        _ => panic!("Expected Property"),
                    }
                }
                _ => panic!("Expected Call"),
            },
            _ => panic!("Expected Evaluate"),
        }
    }

    #[test]
    fn test_parse_if_else_if() {
        let script = parse_ok(
            r#"
if $x > 1 {
    a: 1
}
else if $x > 0 {
    a: 2
} else {
    a: 3
}
"#,
        );
        assert_eq!(script.commands.len(), 1);
        match &script.commands[0] {
            Command::IfThenElse {
                then_commands,
                else_commands,
                ..
            } => {
                assert_eq!(then_commands.len(), 1);
                assert_eq!(else_commands.len(), 1);
                match &else_commands[0] {
                    Command::IfThenElse { else_commands, .. } => assert_eq!(else_commands.len(), 1),
                    _ => panic!("Expected nested IfThenElse"),
                }
            }
            _ => panic!("Expected IfThenElse"),
        }
    }

    #[test]
    fn test_parse_while_single_line() {
        let script = parse_ok("while $i < 3 { $i: $i + 1 }");
        match &script.commands[0] {
            Command::While { commands, .. } => assert_eq!(commands.len(), 1),
            _ => panic!("Expected While"),
        }
    }

    #[test]
    fn test_parse_multiline_literals() {
        let script = parse_ok("a: [\n 1,\n 2\n]\nb: {\n x: 1\n \"y z\": 2,\n}\nc: max(\n 1\n)");
        assert_eq!(script.commands.len(), 3);
        match &output_expression(&script.commands[1]).kind {
            ExpressionKind::Map(entries) => {
                assert_eq!(entries[0].0, "x");
                assert_eq!(entries[1].0, "y z");
            }
            _ => panic!("Expected Map"),
        }
    }

    #[test]
    fn test_parse_semicolon_terminators() {
        let script = parse_ok("a: 1; b: 2;; c: 3");
        assert_eq!(script.commands.len(), 3);
    }

    #[test]
    fn test_parse_string_unescape() {
        let script = parse_ok(r#"a: "tab\there \"q\" \\ \x""#);
        assert_eq!(
            output_expression(&script.commands[0]).kind,
            ExpressionKind::String("tab\there \"q\" \\ x".to_string())
        );
    }

    #[test]
    fn test_parse_collects_multiple_errors() {
        let errors = parse("a: 1 +\nb: * 2").unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].position.line, 1);
        assert_eq!(errors[1].position, Position::new(2, 4));
        assert_eq!(errors[1].snippet, "*");
    }

    #[test]
    fn test_parse_error_message_format() {
        let errors = parse("a: )").unwrap_err();
        assert_eq!(
            errors[0].to_string(),
            "Parse error: Expected an expression, found symbol at line 1:4 (\")\")"
        );
    }

    #[test]
    fn test_parse_lexical_error_reason() {
        let errors = parse("a: 1 & 2").unwrap_err();
        assert_eq!(errors[0].message, "Unknown symbol");
    }

    #[test]
    fn test_parse_invalid_number() {
        let errors = parse("a: 1.2.3").unwrap_err();
        assert_eq!(errors[0].message, "Invalid number");
        assert_eq!(errors[0].snippet, "1.2.3");
    }

    #[test]
    fn test_parse_missing_terminator() {
        let errors = parse("a: 1 b: 2").unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.starts_with("Expected end of command"));
    }

    #[test]
    fn test_parse_unclosed_block() {
        let errors = parse("if true {\n a: 1\n").unwrap_err();
        assert!(errors[0].message.starts_with("Expected `}`"));
    }

    #[test]
    fn test_parse_stray_closing_brace() {
        let errors = parse("a: 1\n}\nb: 2").unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Unexpected `}`");
    }

    #[test]
    fn test_parse_recovers_inside_block() {
        let errors = parse("if true {\n a: *\n b: 2\n}\nc: )").unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[1].position.line, 5);
    }

    #[test]
    fn test_parse_duplicate_named_argument() {
        let errors = parse("a: f(x: 1, x: 2)").unwrap_err();
        assert_eq!(errors[0].message, "Duplicate argument");
    }

    #[test]
    fn test_parse_comments_ignored() {
        let script = parse_ok("/* header */\na: 1 /* trailing */\n");
        assert_eq!(script.commands.len(), 1);
    }

    #[test]
    fn test_parse_empty_script() {
        assert!(parse_ok("").commands.is_empty());
        assert!(parse_ok("\n\n;\n").commands.is_empty());
    }
}
