use trellis_core::{Component, ComponentModel, NodeRef, Request, Result, Value};

use crate::{input_builders, InputDefaults};

/// Single-line text input. An empty submission clears the value; with
/// several submitted values the first wins.
#[derive(Debug, Clone, Default)]
pub struct TextField {
    defaults: InputDefaults,
    trim: bool,
}

impl TextField {
    pub fn new() -> Self {
        Self::default()
    }

    /// Strips surrounding whitespace before storing, so blank input clears.
    pub fn trimmed(mut self) -> Self {
        self.trim = true;
        self
    }
}

input_builders!(TextField);

impl Component for TextField {
    fn kind(&self) -> &'static str {
        "text_field"
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
        let text = if self.trim {
            parameter.first().trim()
        } else {
            parameter.first()
        };
        Ok(Some(match text {
            "" => Value::Null,
            text => Value::text(text),
        }))
    }
}
