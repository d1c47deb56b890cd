use thiserror::Error;

use crate::lexer::Position;

const SNIPPET_LIMIT: usize = 30;

/// A problem found while tokenizing or parsing. The parser collects all of
/// them before giving up.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Parse error: {message} at line {position} ({snippet:?})")]
pub struct SyntaxError {
    pub message: String,
    pub position: Position,
    /// Offending token text, cut to 29 characters plus `...` when longer than 30.
    pub snippet: String,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, position: Position, text: &str) -> Self {
        let snippet = if text.chars().count() > SNIPPET_LIMIT {
            let mut cut: String = text.chars().take(SNIPPET_LIMIT - 1).collect();
            cut.push_str("...");
            cut
        } else {
            text.to_string()
        };
        Self {
            message: message.into(),
            position,
            snippet,
        }
    }
}

/// Failures reported by a [`Provider`](crate::provider::Provider).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// The backing store cannot be reached.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("series error: {0}")]
    Series(String),

    /// The HTTP request could not be completed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("file error: {0}")]
    File(String),

    /// A value could not be converted to or from its stored form.
    #[error("invalid data: {0}")]
    Decode(String),
}

/// What went wrong during evaluation. Attach a position with [`ErrorKind::at`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorKind {
    #[error("Invalid numeric value `{0}`")]
    InvalidNumber(String),

    #[error("Invalid boolean value `{0}`")]
    InvalidBoolean(String),

    /// An argument or element had the wrong shape (array, map, ...).
    #[error("Expected {expected}, found `{found}`")]
    TypeMismatch { expected: &'static str, found: String },

    #[error("Value at index {index} is not numeric: {reason}")]
    NonNumericElement { index: usize, reason: String },

    #[error("Unknown variable `{0}`")]
    UnknownVariable(String),

    #[error("Unknown script argument `{0}`")]
    UnknownArgument(String),

    #[error("{target} does not contain a property with the key `{property}`")]
    UnknownProperty { target: String, property: String },

    #[error("{0} is not a function")]
    NotCallable(String),

    #[error("{0} cannot be evaluated")]
    NotEvaluable(String),

    #[error("{function}() is missing the required argument `{argument}`")]
    MissingArgument { function: String, argument: String },

    #[error("{function}() does not accept an argument named `{argument}`")]
    UnexpectedArgument { function: String, argument: String },

    #[error("{function}() only accepts an unnamed argument when it takes exactly one parameter")]
    UnnamedArgument { function: String },

    #[error("{function}() argument `{argument}` is invalid: {reason}")]
    InvalidArgument {
        function: String,
        argument: String,
        reason: String,
    },

    #[error("Invalid index `{0}`")]
    IndexOutOfRange(String),

    #[error("Divide by zero")]
    DivideByZero,

    /// Raised by the script itself through `error(message)`.
    #[error("{0}")]
    Raised(String),

    #[error("{operation} failed: {source}")]
    Provider {
        operation: String,
        #[source]
        source: ProviderError,
    },
}

impl ErrorKind {
    pub fn at(self, position: Position) -> RuntimeError {
        RuntimeError { kind: self, position }
    }

    pub fn provider(operation: impl Into<String>, source: ProviderError) -> Self {
        ErrorKind::Provider {
            operation: operation.into(),
            source,
        }
    }
}

/// A fatal evaluation error. The first one aborts the run.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind} at line {position}")]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub position: Position,
}

/// Everything [`run`](crate::run) can fail with.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    #[error("{}", join_lines(.0))]
    Syntax(Vec<SyntaxError>),

    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

impl From<Vec<SyntaxError>> for ScriptError {
    fn from(errors: Vec<SyntaxError>) -> Self {
        ScriptError::Syntax(errors)
    }
}

fn join_lines(errors: &[SyntaxError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
