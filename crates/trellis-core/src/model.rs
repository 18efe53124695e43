//! The per-node attribute bag.
//!
//! A [`ComponentModel`] is owned either by its node as the shared default or
//! by exactly one session context as that session's overlay. Overlays start
//! life as a clone of the default, so the struct stays a plain `Clone` value.

use std::fmt;
use std::sync::Arc;

use crate::collections::map::HashMap;
use crate::diagnostics::FieldValidator;
use crate::error::{Error, Result};
use crate::repeater::DataSource;

/// Data held by an input component.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Value {
    #[default]
    Null,
    Text(String),
    Bool(bool),
    Int(i64),
    List(Vec<String>),
}

impl Value {
    pub fn text(text: impl Into<String>) -> Self {
        Value::Text(text.into())
    }

    /// `Null`, empty text and empty lists count as "no value".
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(text) => text.is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Bool(_) | Value::Int(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(number) => Some(*number),
            _ => None,
        }
    }

    /// Converts bound bean data into a component value.
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(flag) => Value::Bool(*flag),
            serde_json::Value::Number(number) => match number.as_i64() {
                Some(int) => Value::Int(int),
                None => Value::Text(number.to_string()),
            },
            serde_json::Value::String(text) => Value::Text(text.clone()),
            serde_json::Value::Array(items) => Value::List(
                items
                    .iter()
                    .map(|item| match item {
                        serde_json::Value::String(text) => text.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
            ),
            serde_json::Value::Object(_) => Value::Text(json.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Text(text) => f.write_str(text),
            Value::Bool(flag) => write!(f, "{flag}"),
            Value::Int(number) => write!(f, "{number}"),
            Value::List(items) => f.write_str(&items.join(", ")),
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

impl From<bool> for Value {
    fn from(flag: bool) -> Self {
        Value::Bool(flag)
    }
}

impl From<i64> for Value {
    fn from(number: i64) -> Self {
        Value::Int(number)
    }
}

/// Mutable attributes of one component.
#[derive(Clone)]
pub struct ComponentModel {
    /// Explicitly written value. `None` defers to the bound bean.
    pub data: Option<Value>,
    pub bean: Option<serde_json::Value>,
    /// Property of the bean (or of the enclosing row bean) supplying the
    /// value. `"."` binds the whole bean.
    pub bean_property: Option<String>,
    /// Rows of a repeater. `None` leaves the repeater unbound.
    pub data_source: Option<Arc<dyn DataSource>>,
    pub visible: bool,
    pub disabled: bool,
    pub read_only: bool,
    pub mandatory: bool,
    pub mandatory_message: Option<String>,
    pub validators: Vec<FieldValidator>,
    /// Set when the last handled request changed this component's value.
    pub changed: bool,
    pub attributes: HashMap<String, Value>,
    label: Option<String>,
    margin: u32,
    width_percent: Option<u8>,
}

impl Default for ComponentModel {
    fn default() -> Self {
        Self {
            data: None,
            bean: None,
            bean_property: None,
            data_source: None,
            visible: true,
            disabled: false,
            read_only: false,
            mandatory: false,
            mandatory_message: None,
            validators: Vec::new(),
            changed: false,
            attributes: HashMap::default(),
            label: None,
            margin: 0,
            width_percent: None,
        }
    }
}

impl fmt::Debug for ComponentModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentModel")
            .field("data", &self.data)
            .field("bean", &self.bean)
            .field("bean_property", &self.bean_property)
            .field("bound", &self.data_source.is_some())
            .field("visible", &self.visible)
            .field("disabled", &self.disabled)
            .field("read_only", &self.read_only)
            .field("mandatory", &self.mandatory)
            .field("validators", &self.validators.len())
            .field("changed", &self.changed)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl ComponentModel {
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Blank labels are stored as no label.
    pub fn set_label(&mut self, label: Option<String>) {
        self.label = label.filter(|text| !text.trim().is_empty());
    }

    pub fn margin(&self) -> u32 {
        self.margin
    }

    /// Negative margins floor to zero.
    pub fn set_margin(&mut self, margin: i32) {
        self.margin = u32::try_from(margin).unwrap_or(0);
    }

    pub fn width_percent(&self) -> Option<u8> {
        self.width_percent
    }

    /// Widths are percentages; anything above 100 is rejected.
    pub fn set_width_percent(&mut self, width: Option<u8>) -> Result<()> {
        if let Some(width) = width {
            if width > 100 {
                return Err(Error::invalid_argument(
                    "width_percent",
                    format!("{width} is outside 0..=100"),
                ));
            }
        }
        self.width_percent = width;
        Ok(())
    }
}
