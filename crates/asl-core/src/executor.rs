use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::ast::{Command, Expression, Script};
use crate::coerce::to_boolean;
use crate::context::{ExecutionContext, Output};
use crate::error::{RuntimeError, ScriptError};
use crate::parser::parse;
use crate::provider::Provider;
use crate::value::Value;

fn condition(expression: &Expression, ctx: &mut ExecutionContext<'_>) -> Result<bool, RuntimeError> {
    let value = expression.evaluate_resolved(ctx)?;
    to_boolean(&value).map_err(|e| e.at(expression.position))
}

fn execute_all(commands: &[Command], ctx: &mut ExecutionContext<'_>) -> Result<(), RuntimeError> {
    commands.iter().try_for_each(|command| command.execute(ctx))
}

impl Command {
    pub fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<(), RuntimeError> {
        trace!(line = self.position().line, "executing command");

        match self {
            // Handles are kept so `$c: counter("x")` can be used later.
            Command::AssignVariable { name, expression } => {
                let value = expression.evaluate(ctx)?;
                ctx.set_variable(name.as_str(), value);
            }
            Command::AssignOutput { name, expression } => {
                let value = expression.evaluate_resolved(ctx)?;
                ctx.set_output(name.as_str(), value);
            }
            Command::Evaluate(expression) => {
                expression.evaluate_resolved(ctx)?;
            }
            Command::IfThenElse {
                condition: test,
                then_commands,
                else_commands,
            } => {
                if condition(test, ctx)? {
                    execute_all(then_commands, ctx)?;
                } else {
                    execute_all(else_commands, ctx)?;
                }
            }
            Command::While { condition: test, commands } => {
                while condition(test, ctx)? {
                    execute_all(commands, ctx)?;
                }
            }
        }
        Ok(())
    }
}

impl Script {
    pub fn run(&self, provider: &dyn Provider) -> Result<Output, RuntimeError> {
        self.run_with_arguments(provider, BTreeMap::new())
    }

    /// Runs every command in order against a fresh context. The first
    /// runtime error stops the run.
    pub fn run_with_arguments(
        &self,
        provider: &dyn Provider,
        arguments: BTreeMap<String, Value>,
    ) -> Result<Output, RuntimeError> {
        debug!(commands = self.commands.len(), arguments = arguments.len(), "script started");
        let mut ctx = ExecutionContext::with_arguments(provider, arguments);
        if let Err(e) = execute_all(&self.commands, &mut ctx) {
            debug!(error = %e, "script failed");
            return Err(e);
        }
        let output = ctx.into_output();
        debug!(outputs = output.len(), "script finished");
        Ok(output)
    }
}

/// Parses and runs `source`.
pub fn run(source: &str, provider: &dyn Provider) -> Result<Output, ScriptError> {
    run_with_arguments(source, provider, BTreeMap::new())
}

pub fn run_with_arguments(
    source: &str,
    provider: &dyn Provider,
    arguments: BTreeMap<String, Value>,
) -> Result<Output, ScriptError> {
    let script = parse(source)?;
    Ok(script.run_with_arguments(provider, arguments)?)
}
