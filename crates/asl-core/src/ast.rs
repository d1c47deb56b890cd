//! Syntax tree produced by the parser.

use std::fmt;

use crate::lexer::Position;

/// A parsed script: the ordered top-level commands.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Script {
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `$name: expression`. The name keeps its `$`.
    AssignVariable { name: String, expression: Expression },
    /// `name: expression`, written to the output table.
    AssignOutput { name: String, expression: Expression },
    Evaluate(Expression),
    IfThenElse {
        condition: Expression,
        then_commands: Vec<Command>,
        else_commands: Vec<Command>,
    },
    While {
        condition: Expression,
        commands: Vec<Command>,
    },
}

impl Command {
    pub fn position(&self) -> Position {
        match self {
            Command::AssignVariable { expression, .. }
            | Command::AssignOutput { expression, .. }
            | Command::Evaluate(expression) => expression.position,
            Command::IfThenElse { condition, .. } | Command::While { condition, .. } => condition.position,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub position: Position,
}

impl Expression {
    pub fn new(kind: ExpressionKind, position: Position) -> Self {
        Self { kind, position }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    Number(f64),
    String(String),
    Boolean(bool),
    Null,
    Array(Vec<Expression>),
    Map(Vec<(String, Expression)>),
    Variable(String),
    Binary {
        operator: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Unary {
        operator: UnaryOperator,
        operand: Box<Expression>,
    },
    Property {
        target: Box<Expression>,
        name: String,
    },
    Call {
        target: Box<Expression>,
        arguments: Vec<Argument>,
    },
    /// Receiver of every bare identifier: `now` is `Property(Global, "now")`.
    Global,
    /// The reserved `storage` identifier.
    Storage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: Option<String>,
    pub value: Expression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    Plus,
    Not,
}

impl UnaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOperator::Negate => "-",
            UnaryOperator::Plus => "+",
            UnaryOperator::Not => "!",
        }
    }
}

// Renders close to source form; used in error messages.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExpressionKind::Number(n) => write!(f, "{}", n),
            ExpressionKind::String(s) => write!(f, "{:?}", s),
            ExpressionKind::Boolean(b) => write!(f, "{}", b),
            ExpressionKind::Null => write!(f, "null"),
            ExpressionKind::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            ExpressionKind::Map(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
            ExpressionKind::Variable(name) => write!(f, "{}", name),
            ExpressionKind::Binary { operator, left, right } => {
                write!(f, "{} {} {}", left, operator.symbol(), right)
            }
            ExpressionKind::Unary { operator, operand } => write!(f, "{}{}", operator.symbol(), operand),
            ExpressionKind::Property { target, name } => match target.kind {
                ExpressionKind::Global => write!(f, "{}", name),
                _ => write!(f, "{}.{}", target, name),
            },
            ExpressionKind::Call { target, arguments } => {
                write!(f, "{}(", target)?;
                for (i, argument) in arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    if let Some(name) = &argument.name {
                        write!(f, "{}: ", name)?;
                    }
                    write!(f, "{}", argument.value)?;
                }
                write!(f, ")")
            }
            ExpressionKind::Global => write!(f, "Global"),
            ExpressionKind::Storage => write!(f, "storage"),
        }
    }
}
