use trellis_core::{
    Component, ComponentModel, Diagnostic, Diagnostics, NodeRef, Request, Result, Severity,
    ValidationConfig, Value,
};

use crate::{input_builders, InputDefaults};

/// Suffix of the hidden marker parameter rendered next to every checkbox.
const MARKER: &str = "h";

/// Boolean input.
///
/// Browsers omit unchecked boxes from a submission entirely, so a rendered
/// checkbox also submits a marker parameter `<id>-h`. With the marker present
/// the box is checked exactly when its own parameter is present; without the
/// marker the box was not part of the submitted form and keeps its value.
#[derive(Debug, Clone, Default)]
pub struct CheckBox {
    defaults: InputDefaults,
    checked: bool,
}

impl CheckBox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn checked(mut self) -> Self {
        self.checked = true;
        self
    }

    /// Id of the marker parameter for the box with id `id`.
    pub fn marker_id(id: &str, separator: &str) -> String {
        format!("{id}{separator}{MARKER}")
    }
}

input_builders!(CheckBox);

impl Component for CheckBox {
    fn kind(&self) -> &'static str {
        "check_box"
    }

    fn create_model(&self) -> ComponentModel {
        let mut model = ComponentModel::default();
        self.defaults.apply(&mut model);
        if self.checked {
            model.data = Some(Value::Bool(true));
        }
        model
    }

    fn is_input(&self) -> bool {
        true
    }

    fn read_request(&self, node: &NodeRef<'_>, request: &dyn Request) -> Result<Option<Value>> {
        let id = node.component_id()?;
        let marker = Self::marker_id(&id, &node.tree().ids().separator);
        if request.parameter(&marker).is_none() {
            return Ok(None);
        }
        Ok(Some(Value::Bool(request.parameter(&id).is_some())))
    }

    /// A mandatory checkbox must be ticked.
    fn validate_component(
        &self,
        node: &NodeRef<'_>,
        value: &Value,
        diagnostics: &mut Diagnostics,
        config: &ValidationConfig,
    ) -> Result<()> {
        let (mandatory, message) =
            node.with_model(|model| (model.mandatory, model.mandatory_message.clone()))?;
        if mandatory && value.as_bool() == Some(false) {
            diagnostics.push(Diagnostic::for_node(
                node,
                Severity::Error,
                message.unwrap_or_else(|| config.mandatory_message.clone()),
                vec![node.display_label()?],
            )?);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Form;
    use trellis_core::MapRequest;

    #[test]
    fn marker_decides_between_unchecked_and_absent() {
        let mut form = Form::new();
        let terms = form.add("terms", CheckBox::new().checked());
        let form = form.lock();
        form.session(|tree, pipeline| {
            let node = tree.node(terms).unwrap();
            assert_eq!(node.value().unwrap(), Value::Bool(true));

            let outcome = pipeline.handle_request(tree, &MapRequest::new()).unwrap();
            assert!(outcome.is_empty());

            let outcome = pipeline
                .handle_request(tree, &MapRequest::new().with("terms-h", ""))
                .unwrap();
            assert!(outcome.is_changed(terms));
            assert_eq!(node.value().unwrap(), Value::Bool(false));

            let request = MapRequest::new().with("terms-h", "").with("terms", "on");
            pipeline.handle_request(tree, &request).unwrap();
            assert_eq!(node.value().unwrap(), Value::Bool(true));
        });
    }

    #[test]
    fn mandatory_box_must_be_ticked() {
        let mut form = Form::new();
        form.add("terms", CheckBox::new().label("Terms").mandatory());
        let form = form.lock();
        form.session(|tree, pipeline| {
            pipeline
                .handle_request(tree, &MapRequest::new().with("terms-h", ""))
                .unwrap();
            assert_eq!(
                pipeline.validate(tree).unwrap().messages(),
                vec!["Terms must be completed."]
            );
        });
    }
}
