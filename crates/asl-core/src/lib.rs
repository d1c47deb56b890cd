//! Core of the ASL expression and scripting language.
//!
//! ASL scripts compute derived values from counters, time series, stored
//! maps and HTTP endpoints. A script is a list of commands:
//!
//! ```text
//! $requests: counter("requests")
//! rate: $requests / 60
//! if rate > 100 {
//!     alert: true
//! }
//! ```
//!
//! Plain names (`rate`) write the output table, `$`-prefixed names are
//! private variables. Everything outside the script is reached through a
//! [`Provider`].
//!
//! # Modules
//!
//! - [`lexer`] - Pull-based tokenizer
//! - [`parser`] - Recursive-descent parser producing a [`Script`]
//! - [`ast`] - Commands and expressions
//! - [`value`] - Runtime values and capability handles
//! - [`coerce`] - Number/boolean/string conversions and equality
//! - [`builtins`] - Method tables for every value kind
//! - [`eval`] - Expression evaluation
//! - [`context`] - Per-run variables, output and arguments
//! - [`provider`] - The capability seam
//! - [`memory`] - In-memory provider
//!
//! # Example
//!
//! ```
//! use asl_core::{run, MemoryProvider, Value};
//!
//! let provider = MemoryProvider::new();
//! let output = run("a: 100 + 33\n$b: 2\nc: $b * 3", &provider).unwrap();
//! assert_eq!(output["a"], Value::Number(133.0));
//! assert_eq!(output["c"], Value::Number(6.0));
//! assert!(!output.contains_key("$b"));
//! ```

pub mod ast;
pub mod builtins;
pub mod coerce;
pub mod context;
pub mod error;
pub mod eval;
mod executor;
pub mod lexer;
pub mod memory;
pub mod parser;
pub mod provider;
pub mod value;

pub use ast::Script;
pub use context::{ExecutionContext, Output};
pub use error::{ErrorKind, ProviderError, RuntimeError, ScriptError, SyntaxError};
pub use executor::{run, run_with_arguments};
pub use memory::{CannedTransport, MemoryProvider, MemoryState};
pub use parser::parse;
pub use provider::{DataPoint, Provider};
pub use value::{Handle, Value};
