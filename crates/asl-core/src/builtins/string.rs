use super::{ArgKind, Arguments, Param};
use crate::coerce;
use crate::error::ErrorKind;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringMethod {
    Split,
    ToNumber,
}

const SPLIT: &[Param] = &[Param::required("separator", ArgKind::String)];

impl StringMethod {
    pub fn lookup(name: &str) -> Option<Self> {
        match name {
            "split" => Some(StringMethod::Split),
            "toNumber" => Some(StringMethod::ToNumber),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StringMethod::Split => "split",
            StringMethod::ToNumber => "toNumber",
        }
    }

    pub fn params(&self) -> &'static [Param] {
        match self {
            StringMethod::Split => SPLIT,
            StringMethod::ToNumber => &[],
        }
    }
}

pub(super) fn call(text: &str, method: StringMethod, args: &Arguments) -> Result<Value, ErrorKind> {
    match method {
        StringMethod::Split => {
            let separator = args.str("separator")?;
            let parts: Vec<Value> = if separator.is_empty() {
                text.chars().map(|c| Value::String(c.to_string())).collect()
            } else {
                text.split(separator).map(Value::from).collect()
            };
            Ok(Value::Array(parts))
        }
        StringMethod::ToNumber => coerce::to_number(&Value::from(text)).map(Value::Number),
    }
}

#[cfg(test)]
mod tests {
    use super::super::bind;
    use super::*;

    fn split(text: &str, separator: &str) -> Value {
        let method = StringMethod::Split;
        let args = bind(method.name(), method.params(), vec![(None, Value::from(separator))]).unwrap();
        call(text, method, &args).unwrap()
    }

    #[test]
    fn test_split() {
        assert_eq!(
            split("a,b,,c", ","),
            Value::Array(vec![Value::from("a"), Value::from("b"), Value::from(""), Value::from("c")])
        );
    }

    #[test]
    fn test_split_empty_separator() {
        assert_eq!(split("ab", ""), Value::Array(vec![Value::from("a"), Value::from("b")]));
    }

    #[test]
    fn test_to_number() {
        let args = Arguments::default();
        assert_eq!(call("12.5", StringMethod::ToNumber, &args).unwrap(), Value::Number(12.5));
        assert!(call("twelve", StringMethod::ToNumber, &args).is_err());
    }
}
