//! Reusable validation rules.

use regex::Regex;
use trellis_core::{Error, Result, ValidationRule, Value};

/// At most `n` characters of text.
#[derive(Debug, Clone, Copy)]
pub struct MaxLength(pub usize);

impl ValidationRule for MaxLength {
    fn check(&self, value: &Value) -> bool {
        value.to_string().chars().count() <= self.0
    }

    fn default_message(&self) -> String {
        format!("{{0}} must be at most {} characters.", self.0)
    }
}

/// The whole value must match a regular expression.
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
}

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(&format!("^(?:{pattern})$"))
            .map_err(|err| Error::invalid_argument("pattern", err.to_string()))?;
        Ok(Self { regex })
    }
}

impl ValidationRule for Pattern {
    fn check(&self, value: &Value) -> bool {
        match value {
            Value::List(items) => items.iter().all(|item| self.regex.is_match(item)),
            other => self.regex.is_match(&other.to_string()),
        }
    }

    fn default_message(&self) -> String {
        "{0} has an invalid format.".to_string()
    }
}

/// An integer between `min` and `max`, inclusive. Text is parsed first;
/// text that is not a number fails.
#[derive(Debug, Clone, Copy)]
pub struct Range {
    min: i64,
    max: i64,
}

impl Range {
    pub fn new(min: i64, max: i64) -> Self {
        Self {
            min: min.min(max),
            max: max.max(min),
        }
    }
}

impl ValidationRule for Range {
    fn check(&self, value: &Value) -> bool {
        let number = match value {
            Value::Int(number) => Some(*number),
            Value::Text(text) => text.trim().parse().ok(),
            _ => None,
        };
        number.is_some_and(|number| (self.min..=self.max).contains(&number))
    }

    fn default_message(&self) -> String {
        format!("{{0}} must be between {} and {}.", self.min, self.max)
    }
}
