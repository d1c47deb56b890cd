//! Expression evaluation.
//!
//! Evaluation is eager: every operand is evaluated before its operator is
//! applied, so `&&` and `||` always evaluate both sides.

use crate::ast::{BinaryOperator, Expression, ExpressionKind, UnaryOperator};
use crate::builtins;
use crate::coerce::{to_boolean, to_number, values_equal};
use crate::context::ExecutionContext;
use crate::error::{ErrorKind, RuntimeError};
use crate::value::{Handle, Value};

/// Turns resolvable handles into plain data, recursing into arrays and maps.
///
/// Counters read their current value, data points yield their value and
/// aggregates the array of their values. Other handles cannot be resolved.
pub fn resolve(value: Value, ctx: &ExecutionContext<'_>) -> Result<Value, ErrorKind> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| resolve(item, ctx))
            .collect::<Result<_, _>>()
            .map(Value::Array),
        Value::Map(map) => map
            .into_iter()
            .map(|(k, v)| resolve(v, ctx).map(|v| (k, v)))
            .collect::<Result<_, _>>()
            .map(Value::Map),
        Value::Handle(Handle::Counter(name)) => ctx
            .provider()
            .counter_value(&name)
            .map(|n| Value::Number(n as f64))
            .map_err(|e| ErrorKind::provider(format!("counter(\"{}\")", name), e)),
        Value::Handle(Handle::DataPoint(point)) => Ok(Value::Number(point.value)),
        Value::Handle(Handle::Aggregate(points)) => {
            Ok(Value::Array(points.iter().map(|p| Value::Number(p.value)).collect()))
        }
        Value::Handle(handle) => Err(ErrorKind::NotEvaluable(handle.to_string())),
        plain => Ok(plain),
    }
}

fn apply_binary(operator: BinaryOperator, left: &Value, right: &Value) -> Result<Value, ErrorKind> {
    use BinaryOperator::*;

    Ok(match operator {
        Add | Subtract | Multiply | Divide => {
            let l = to_number(left)?;
            let r = to_number(right)?;
            Value::Number(match operator {
                Add => l + r,
                Subtract => l - r,
                Multiply => l * r,
                _ if r == 0.0 => return Err(ErrorKind::DivideByZero),
                _ => l / r,
            })
        }
        Equal => Value::Boolean(values_equal(left, right)),
        NotEqual => Value::Boolean(!values_equal(left, right)),
        Less | LessEqual | Greater | GreaterEqual => {
            let l = to_number(left)?;
            let r = to_number(right)?;
            Value::Boolean(match operator {
                Less => l < r,
                LessEqual => l <= r,
                Greater => l > r,
                _ => l >= r,
            })
        }
        And => {
            let l = to_boolean(left)?;
            let r = to_boolean(right)?;
            Value::Boolean(l && r)
        }
        Or => {
            let l = to_boolean(left)?;
            let r = to_boolean(right)?;
            Value::Boolean(l || r)
        }
    })
}

fn apply_unary(operator: UnaryOperator, operand: &Value) -> Result<Value, ErrorKind> {
    Ok(match operator {
        UnaryOperator::Negate => Value::Number(-to_number(operand)?),
        UnaryOperator::Plus => Value::Number(to_number(operand)?),
        UnaryOperator::Not => Value::Boolean(!to_boolean(operand)?),
    })
}

impl Expression {
    pub fn evaluate(&self, ctx: &mut ExecutionContext<'_>) -> Result<Value, RuntimeError> {
        let at = |kind: ErrorKind| kind.at(self.position);

        match &self.kind {
            ExpressionKind::Number(n) => Ok(Value::Number(*n)),
            ExpressionKind::String(s) => Ok(Value::String(s.clone())),
            ExpressionKind::Boolean(b) => Ok(Value::Boolean(*b)),
            ExpressionKind::Null => Ok(Value::Null),
            // Literal elements are snapshots: handles inside them are resolved.
            ExpressionKind::Array(items) => items
                .iter()
                .map(|item| item.evaluate_resolved(ctx))
                .collect::<Result<_, _>>()
                .map(Value::Array),
            ExpressionKind::Map(entries) => entries
                .iter()
                .map(|(key, value)| value.evaluate_resolved(ctx).map(|v| (key.clone(), v)))
                .collect::<Result<_, _>>()
                .map(Value::Map),
            ExpressionKind::Variable(name) => ctx
                .variable(name)
                .cloned()
                .ok_or_else(|| at(ErrorKind::UnknownVariable(name.clone()))),
            ExpressionKind::Binary { operator, left, right } => {
                let left = left.evaluate(ctx)?;
                let right = right.evaluate(ctx)?;
                let left = resolve(left, ctx).map_err(at)?;
                let right = resolve(right, ctx).map_err(at)?;
                apply_binary(*operator, &left, &right).map_err(at)
            }
            ExpressionKind::Unary { operator, operand } => {
                let operand = operand.evaluate(ctx)?;
                let operand = resolve(operand, ctx).map_err(at)?;
                apply_unary(*operator, &operand).map_err(at)
            }
            ExpressionKind::Property { target, name } => target.extract(ctx, name),
            ExpressionKind::Call { target, arguments } => {
                let mut values = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    let value = argument.value.evaluate_resolved(ctx)?;
                    values.push((argument.name.clone(), value));
                }
                target.call(ctx, values)
            }
            ExpressionKind::Global => Ok(Value::Handle(Handle::Global)),
            ExpressionKind::Storage => Ok(Value::Handle(Handle::Storage)),
        }
    }

    pub fn evaluate_resolved(&self, ctx: &mut ExecutionContext<'_>) -> Result<Value, RuntimeError> {
        let value = self.evaluate(ctx)?;
        resolve(value, ctx).map_err(|e| e.at(self.position))
    }

    /// Evaluates this expression and looks `property` up on the result.
    pub fn extract(&self, ctx: &mut ExecutionContext<'_>, property: &str) -> Result<Value, RuntimeError> {
        let origin = match &self.kind {
            ExpressionKind::Variable(name) => Some(name.clone()),
            _ => None,
        };
        let value = self.evaluate(ctx)?;
        builtins::extract(value, property, origin).map_err(|e| e.at(self.position))
    }

    /// Evaluates this expression and calls the result with already
    /// evaluated arguments.
    pub fn call(
        &self,
        ctx: &mut ExecutionContext<'_>,
        arguments: Vec<(Option<String>, Value)>,
    ) -> Result<Value, RuntimeError> {
        match self.evaluate(ctx)? {
            Value::Handle(Handle::Function(function)) => {
                function.call(arguments, ctx).map_err(|e| e.at(self.position))
            }
            _ => Err(ErrorKind::NotCallable(self.to_string()).at(self.position)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryProvider;
    use crate::parser::parse;
    use crate::ast::Command;

    fn eval(source: &str) -> Result<Value, RuntimeError> {
        let provider = MemoryProvider::new();
        let mut ctx = ExecutionContext::new(&provider);
        let script = parse(&format!("x: {}", source)).unwrap();
        match &script.commands[0] {
            Command::AssignOutput { expression, .. } => expression.evaluate(&mut ctx),
            _ => panic!("Expected AssignOutput"),
        }
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("100 + 33").unwrap(), Value::Number(133.0));
        assert_eq!(eval("10 / 4").unwrap(), Value::Number(2.5));
        assert_eq!(eval("\"2\" * 3").unwrap(), Value::Number(6.0));
    }

    #[test]
    fn test_divide_by_zero() {
        assert_eq!(eval("1 / 0").unwrap_err().kind, ErrorKind::DivideByZero);
        assert_eq!(eval("0 / 5").unwrap(), Value::Number(0.0));
    }

    #[test]
    fn test_comparison_forces_numbers() {
        assert_eq!(eval("\"10\" > 9").unwrap(), Value::Boolean(true));
        assert!(eval("true < 1").is_err());
    }

    #[test]
    fn test_logical_operators_do_not_short_circuit() {
        assert_eq!(eval("true || 1").unwrap(), Value::Boolean(true));
        let err = eval("true || $missing").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownVariable("$missing".into()));
        let err = eval("false && error(\"evaluated\")").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Raised("evaluated".into()));
    }

    #[test]
    fn test_not() {
        assert_eq!(eval("!0").unwrap(), Value::Boolean(true));
        assert_eq!(eval("!\"abc\"").unwrap(), Value::Boolean(false));
    }

    #[test]
    fn test_call_on_non_function() {
        let err = eval("5(1)").unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotCallable("5".into()));
    }

    #[test]
    fn test_unknown_global_property() {
        let err = eval("frobnicate()").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnknownProperty { ref property, .. } if property == "frobnicate"));
    }

    #[test]
    fn test_resolve_rejects_capabilities() {
        let provider = MemoryProvider::new();
        let ctx = ExecutionContext::new(&provider);
        assert!(matches!(
            resolve(Value::Handle(Handle::Series("s".into())), &ctx),
            Err(ErrorKind::NotEvaluable(_))
        ));
        assert_eq!(
            resolve(Value::Handle(Handle::Counter("c".into())), &ctx).unwrap(),
            Value::Number(0.0)
        );
    }
}
