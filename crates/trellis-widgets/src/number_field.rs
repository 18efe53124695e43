use trellis_core::{
    Component, ComponentModel, Diagnostic, Diagnostics, NodeRef, Request, Result, Severity,
    ValidationConfig, Value,
};

use crate::{input_builders, InputDefaults};

/// Integer input. Input that does not parse is kept as text so the user
/// sees what they typed, and is reported at validation.
#[derive(Debug, Clone, Default)]
pub struct NumberField {
    defaults: InputDefaults,
}

impl NumberField {
    pub fn new() -> Self {
        Self::default()
    }
}

input_builders!(NumberField);

impl Component for NumberField {
    fn kind(&self) -> &'static str {
        "number_field"
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
        let text = parameter.first().trim();
        if text.is_empty() {
            return Ok(Some(Value::Null));
        }
        Ok(Some(match text.parse::<i64>() {
            Ok(number) => Value::Int(number),
            Err(_) => Value::text(text),
        }))
    }

    fn validate_component(
        &self,
        node: &NodeRef<'_>,
        value: &Value,
        diagnostics: &mut Diagnostics,
        config: &ValidationConfig,
    ) -> Result<()> {
        if let Value::Text(text) = value {
            if text.trim().parse::<i64>().is_err() {
                diagnostics.push(Diagnostic::for_node(
                    node,
                    Severity::Error,
                    config.invalid_message.clone(),
                    vec![node.display_label()?],
                )?);
            }
        }
        Ok(())
    }
}
