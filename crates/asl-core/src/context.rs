use std::collections::{BTreeMap, HashMap};

use crate::provider::Provider;
use crate::value::Value;

/// Named results of a run.
pub type Output = BTreeMap<String, Value>;

/// State of a single run: variables, output and script arguments, plus the
/// provider every capability call goes through.
///
/// Variables and output are separate namespaces; `$a` and `a` never collide.
pub struct ExecutionContext<'p> {
    provider: &'p dyn Provider,
    variables: HashMap<String, Value>,
    output: Output,
    arguments: BTreeMap<String, Value>,
}

impl<'p> ExecutionContext<'p> {
    pub fn new(provider: &'p dyn Provider) -> Self {
        Self::with_arguments(provider, BTreeMap::new())
    }

    pub fn with_arguments(provider: &'p dyn Provider, arguments: BTreeMap<String, Value>) -> Self {
        Self {
            provider,
            variables: HashMap::new(),
            output: Output::new(),
            arguments,
        }
    }

    pub fn provider(&self) -> &'p dyn Provider {
        self.provider
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    pub fn set_output(&mut self, name: impl Into<String>, value: Value) {
        self.output.insert(name.into(), value);
    }

    pub fn output(&self) -> &Output {
        &self.output
    }

    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments.get(name)
    }

    pub fn into_output(self) -> Output {
        self.output
    }
}
