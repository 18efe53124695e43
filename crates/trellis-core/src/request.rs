//! The slice of an inbound request the pipeline consumes.

use serde::Deserialize;

use crate::collections::map::HashMap;

/// A submitted parameter. An empty `Single` is an explicit clear, which is
/// different from the parameter being absent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Parameter {
    Single(String),
    Multiple(Vec<String>),
}

impl Parameter {
    /// First submitted value, or `""` for an empty multi-value parameter.
    pub fn first(&self) -> &str {
        match self {
            Parameter::Single(value) => value,
            Parameter::Multiple(values) => values.first().map(String::as_str).unwrap_or(""),
        }
    }

    pub fn values(&self) -> Vec<&str> {
        match self {
            Parameter::Single(value) => vec![value.as_str()],
            Parameter::Multiple(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

pub trait Request {
    /// `None` when the request does not mention `id` at all.
    fn parameter(&self, id: &str) -> Option<Parameter>;
}

/// In-memory request keyed by component id.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct MapRequest {
    params: HashMap<String, Parameter>,
}

impl MapRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: impl Into<String>, value: impl Into<String>) -> Self {
        self.params
            .insert(id.into(), Parameter::Single(value.into()));
        self
    }

    pub fn with_values<I, S>(mut self, id: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params.insert(
            id.into(),
            Parameter::Multiple(values.into_iter().map(Into::into).collect()),
        );
        self
    }

    pub fn insert(&mut self, id: impl Into<String>, parameter: Parameter) {
        self.params.insert(id.into(), parameter);
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl Request for MapRequest {
    fn parameter(&self, id: &str) -> Option<Parameter> {
        self.params.get(id).cloned()
    }
}
