use super::{ArgKind, Arguments, Param};
use crate::coerce;
use crate::error::ErrorKind;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayMethod {
    Item,
    Count,
    Sum,
    Min,
    Max,
    Avg,
    StdDev,
}

const ITEM: &[Param] = &[Param::required("index", ArgKind::Numeric)];

impl ArrayMethod {
    pub fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "item" => ArrayMethod::Item,
            "count" => ArrayMethod::Count,
            "sum" => ArrayMethod::Sum,
            "min" => ArrayMethod::Min,
            "max" => ArrayMethod::Max,
            "avg" | "average" => ArrayMethod::Avg,
            "stddev" => ArrayMethod::StdDev,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            ArrayMethod::Item => "item",
            ArrayMethod::Count => "count",
            ArrayMethod::Sum => "sum",
            ArrayMethod::Min => "min",
            ArrayMethod::Max => "max",
            ArrayMethod::Avg => "avg",
            ArrayMethod::StdDev => "stddev",
        }
    }

    pub fn params(&self) -> &'static [Param] {
        match self {
            ArrayMethod::Item => ITEM,
            _ => &[],
        }
    }
}

pub(super) fn call(items: &[Value], method: ArrayMethod, args: &Arguments) -> Result<Value, ErrorKind> {
    let numbers = match method {
        ArrayMethod::Item => return item(items, args.number("index")?),
        ArrayMethod::Count => return Ok(Value::Number(items.len() as f64)),
        _ => coerce::to_numbers(&Value::Array(items.to_vec()))?,
    };
    if numbers.is_empty() {
        return Ok(Value::Number(0.0));
    }

    let count = numbers.len() as f64;
    let sum: f64 = numbers.iter().sum();
    let mean = sum / count;
    Ok(Value::Number(match method {
        ArrayMethod::Sum => sum,
        ArrayMethod::Min => numbers.iter().copied().fold(f64::INFINITY, f64::min),
        ArrayMethod::Max => numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        // Population deviation, unlike the sample deviation used for series.
        ArrayMethod::StdDev => (numbers.iter().map(|n| (n - mean).powi(2)).sum::<f64>() / count).sqrt(),
        ArrayMethod::Avg | ArrayMethod::Item | ArrayMethod::Count => mean,
    }))
}

fn item(items: &[Value], index: f64) -> Result<Value, ErrorKind> {
    if index < 0.0 || index.fract() != 0.0 {
        return Err(ErrorKind::IndexOutOfRange(index.to_string()));
    }
    items
        .get(index as usize)
        .cloned()
        .ok_or_else(|| ErrorKind::IndexOutOfRange(index.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(values: &[f64]) -> Vec<Value> {
        values.iter().copied().map(Value::Number).collect()
    }

    fn run(items: &[Value], method: ArrayMethod) -> Value {
        call(items, method, &Arguments::default()).unwrap()
    }

    #[test]
    fn test_aggregates() {
        let items = numbers(&[10.0, 20.0, 30.0]);
        assert_eq!(run(&items, ArrayMethod::Count), Value::Number(3.0));
        assert_eq!(run(&items, ArrayMethod::Sum), Value::Number(60.0));
        assert_eq!(run(&items, ArrayMethod::Min), Value::Number(10.0));
        assert_eq!(run(&items, ArrayMethod::Max), Value::Number(30.0));
        assert_eq!(run(&items, ArrayMethod::Avg), Value::Number(20.0));
    }

    #[test]
    fn test_stddev_is_population() {
        let items = numbers(&[10.0, 20.0, 30.0]);
        match run(&items, ArrayMethod::StdDev) {
            Value::Number(n) => assert!((n - 8.16496580927726).abs() < 1e-12),
            other => panic!("Expected Number, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_array_aggregates_to_zero() {
        assert_eq!(run(&[], ArrayMethod::Max), Value::Number(0.0));
        assert_eq!(run(&[], ArrayMethod::StdDev), Value::Number(0.0));
    }

    #[test]
    fn test_non_numeric_element() {
        let items = vec![Value::Number(1.0), Value::Boolean(true)];
        assert!(matches!(
            call(&items, ArrayMethod::Sum, &Arguments::default()),
            Err(ErrorKind::NonNumericElement { index: 1, .. })
        ));
    }

    #[test]
    fn test_item_bounds() {
        let items = numbers(&[1.0, 2.0]);
        assert_eq!(item(&items, 1.0).unwrap(), Value::Number(2.0));
        assert!(matches!(item(&items, 2.0), Err(ErrorKind::IndexOutOfRange(_))));
        assert!(item(&items, -1.0).is_err());
        assert!(item(&items, 0.5).is_err());
    }

    #[test]
    fn test_lookup_average_alias() {
        assert_eq!(ArrayMethod::lookup("average"), Some(ArrayMethod::Avg));
        assert_eq!(ArrayMethod::lookup("median"), None);
    }
}
