use trellis_core::{Component, ComponentModel, Value};

/// Read-only text. Never takes part in request handling or validation.
#[derive(Debug, Clone, Default)]
pub struct Text {
    text: Option<String>,
    bean_property: Option<String>,
}

impl Text {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            bean_property: None,
        }
    }

    /// Text read from a bean property, typically a row bean.
    pub fn bound_to(property: impl Into<String>) -> Self {
        Self {
            text: None,
            bean_property: Some(property.into()),
        }
    }
}

impl Component for Text {
    fn kind(&self) -> &'static str {
        "text"
    }

    fn create_model(&self) -> ComponentModel {
        let mut model = ComponentModel::default();
        model.data = self.text.clone().map(Value::Text);
        model.bean_property = self.bean_property.clone();
        model
    }
}
