use trellis_core::{Component, ComponentModel, NodeRef, Request, Result, Value};
use tracing::debug;

use crate::{input_builders, InputDefaults};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropdownOption {
    pub value: String,
    pub label: String,
}

impl DropdownOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Selection from a fixed option list. A submitted value that is not one of
/// the options is ignored and the current selection kept; an empty
/// submission clears the selection.
#[derive(Debug, Clone, Default)]
pub struct Dropdown {
    defaults: InputDefaults,
    options: Vec<DropdownOption>,
    multiple: bool,
}

impl Dropdown {
    pub fn new<I>(options: I) -> Self
    where
        I: IntoIterator<Item = DropdownOption>,
    {
        Self {
            options: options.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Options whose value and label are the same text.
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(values.into_iter().map(|value| {
            let value = value.into();
            DropdownOption::new(value.clone(), value)
        }))
    }

    /// Accepts several selected values, stored as a list.
    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    pub fn options(&self) -> &[DropdownOption] {
        &self.options
    }

    fn is_option(&self, value: &str) -> bool {
        self.options.iter().any(|option| option.value == value)
    }
}

input_builders!(Dropdown);

impl Component for Dropdown {
    fn kind(&self) -> &'static str {
        "dropdown"
    }

    fn create_model(&self) -> ComponentModel {
        let mut model = ComponentModel::default();
        self.defaults.apply(&mut model);
        model
    }

    fn is_input(&self) -> bool {
        true
    }

    fn read_request(&self, node: &NodeRef<'_>, request: &dyn Request) -> Result<Option<Value>> {
        let Some(parameter) = request.parameter(&node.component_id()?) else {
            return Ok(None);
        };
        let selected: Vec<&str> = parameter
            .values()
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect();
        if let Some(unknown) = selected.iter().find(|value| !self.is_option(value)) {
            debug!(node = node.id(), value = %unknown, "ignoring unknown dropdown value");
            return Ok(None);
        }
        Ok(Some(match (self.multiple, selected.as_slice()) {
            (_, []) => Value::Null,
            (true, values) => Value::List(values.iter().map(|value| value.to_string()).collect()),
            (false, [first, ..]) => Value::text(*first),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Form;
    use trellis_core::MapRequest;

    #[test]
    fn unknown_values_keep_the_selection() {
        let mut form = Form::new();
        let colour = form.add("colour", Dropdown::from_values(["red", "green"]));
        let form = form.lock();
        form.session(|tree, pipeline| {
            pipeline
                .handle_request(tree, &MapRequest::new().with("colour", "green"))
                .unwrap();
            let outcome = pipeline
                .handle_request(tree, &MapRequest::new().with("colour", "purple"))
                .unwrap();
            assert!(outcome.is_empty());
            assert_eq!(tree.node(colour).unwrap().value().unwrap(), Value::text("green"));

            pipeline
                .handle_request(tree, &MapRequest::new().with("colour", ""))
                .unwrap();
            assert_eq!(tree.node(colour).unwrap().value().unwrap(), Value::Null);
        });
    }

    #[test]
    fn multiple_selection_is_a_list() {
        let mut form = Form::new();
        let tags = form.add("tags", Dropdown::from_values(["a", "b", "c"]).multiple());
        let form = form.lock();
        form.session(|tree, pipeline| {
            pipeline
                .handle_request(tree, &MapRequest::new().with_values("tags", ["a", "c"]))
                .unwrap();
            assert_eq!(
                tree.node(tags).unwrap().value().unwrap(),
                Value::List(vec!["a".into(), "c".into()])
            );
        });
    }
}
